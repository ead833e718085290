use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scraper::error::ScrapeError;

/// Token positions of each record field inside a [`RawRow`].
const SERIAL_NUMBER: usize = 1;
const CITY: usize = 2;
const COMMODITY: usize = 4;
const MIN_PRICE: usize = 7;
const MAX_PRICE: usize = 8;
const MODAL_PRICE: usize = 9;
const DATE: usize = 10;

/// A row must carry at least this many tokens to be mapped.
pub const MIN_ROW_TOKENS: usize = DATE + 1;

/// The three form selections of one scrape. Each value has to match an
/// option label of the remote form exactly; nothing is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParameters {
    pub state: String,
    pub commodity: String,
    pub market: String,
}

impl QueryParameters {
    pub fn new(
        state: impl Into<String>,
        commodity: impl Into<String>,
        market: impl Into<String>,
    ) -> Result<Self, ScrapeError> {
        let query = Self {
            state: state.into(),
            commodity: commodity.into(),
            market: market.into(),
        };

        if query.missing_fields().is_empty() {
            Ok(query)
        } else {
            Err(ScrapeError::MissingParameters)
        }
    }

    /// Names of the fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.state.is_empty() {
            missing.push("state");
        }
        if self.commodity.is_empty() {
            missing.push("commodity");
        }
        if self.market.is_empty() {
            missing.push("market");
        }
        missing
    }
}

impl fmt::Display for QueryParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.state, self.commodity, self.market)
    }
}

/// Tokens of one table row, in cell order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRow(pub Vec<String>);

impl RawRow {
    /// Splits the concatenated text of a row into tokens.
    ///
    /// Line breaks become `_`, double spaces are dropped, and the result is
    /// split on `__`, so a blank line between two cells separates them.
    pub fn from_row_text(text: &str) -> Self {
        let normalized = text
            .replace('\r', "")
            .replace('\n', "_")
            .replace("  ", "");

        Self(normalized.split("__").map(str::to_owned).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }
}

/// One price line of the results table.
///
/// Serialized with the keys the price API has always returned, including
/// its historical spelling of "Prize" and "Model".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    #[serde(rename = "S.No")]
    pub serial_number: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Commodity")]
    pub commodity: String,
    #[serde(rename = "Min Prize")]
    pub min_price: String,
    #[serde(rename = "Max Prize")]
    pub max_price: String,
    #[serde(rename = "Model Prize")]
    pub modal_price: String,
    #[serde(rename = "Date")]
    pub date: String,
}

impl PriceRecord {
    /// Column headers in serialization order.
    pub const HEADERS: [&'static str; 7] = [
        "S.No",
        "City",
        "Commodity",
        "Min Prize",
        "Max Prize",
        "Model Prize",
        "Date",
    ];

    /// Maps a row by fixed token positions. `row` is the index of the row in
    /// the results table and only feeds the error.
    pub fn from_raw(raw: &RawRow, row: usize) -> Result<Self, ScrapeError> {
        let tokens = raw.tokens();
        if tokens.len() < MIN_ROW_TOKENS {
            return Err(ScrapeError::MalformedRow {
                row,
                tokens: tokens.len(),
                required: MIN_ROW_TOKENS,
            });
        }

        Ok(Self {
            serial_number: tokens[SERIAL_NUMBER].clone(),
            city: tokens[CITY].clone(),
            commodity: tokens[COMMODITY].clone(),
            min_price: tokens[MIN_PRICE].clone(),
            max_price: tokens[MAX_PRICE].clone(),
            modal_price: tokens[MODAL_PRICE].clone(),
            date: tokens[DATE].clone(),
        })
    }

    pub fn fields(&self) -> [&str; 7] {
        [
            self.serial_number.as_str(),
            self.city.as_str(),
            self.commodity.as_str(),
            self.min_price.as_str(),
            self.max_price.as_str(),
            self.modal_price.as_str(),
            self.date.as_str(),
        ]
    }
}

/// Records of one scrape together with what was asked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSet {
    pub query: QueryParameters,
    pub report_date: String,
    pub records: Vec<PriceRecord>,
    pub fetched_at: chrono::DateTime<chrono::Local>,
}

impl ResultSet {
    pub fn new(query: QueryParameters, report_date: String, records: Vec<PriceRecord>) -> Self {
        Self {
            query,
            report_date,
            records,
            fetched_at: chrono::Local::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(tokens: &[&str]) -> RawRow {
        RawRow(tokens.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn row_text_splits_on_blank_lines() {
        let raw = RawRow::from_row_text("\n\n    1\n\n    Pune\n\n");
        assert_eq!(raw, row(&["", "1", "Pune", ""]));
    }

    #[test]
    fn single_line_breaks_stay_inside_a_token() {
        let raw = RawRow::from_row_text("\n\nRed\nOnion\n\n");
        assert_eq!(raw, row(&["", "Red_Onion", ""]));
    }

    #[test]
    fn double_spaces_are_removed_single_spaces_kept() {
        let raw = RawRow::from_row_text("\n\n05 Mar  2024\n\n");
        assert_eq!(raw.tokens()[1], "05 Mar2024");
    }

    #[test]
    fn carriage_returns_are_ignored() {
        let raw = RawRow::from_row_text("\r\n\r\n7\r\n\r\n");
        assert_eq!(raw, row(&["", "7", ""]));
    }

    #[test]
    fn positional_mapping_uses_fixed_indices() {
        let raw = row(&[
            "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7", "t8", "t9", "t10", "t11",
        ]);
        let record = PriceRecord::from_raw(&raw, 0).unwrap();

        assert_eq!(
            record.fields(),
            ["t1", "t2", "t4", "t7", "t8", "t9", "t10"]
        );
    }

    #[test]
    fn exactly_eleven_tokens_is_enough() {
        let raw = row(&[
            "", "1", "Pune", "Pune", "Onion", "Red", "FAQ", "1200", "1800", "1500", "05 Mar 2024",
        ]);
        let record = PriceRecord::from_raw(&raw, 4).unwrap();
        assert_eq!(record.date, "05 Mar 2024");
        assert_eq!(record.modal_price, "1500");
    }

    #[test]
    fn short_row_is_malformed() {
        let raw = row(&["", "1", "Pune", "Pune", "Onion", "Red", "FAQ", "1200", "1800", "1500"]);
        let err = PriceRecord::from_raw(&raw, 6).unwrap_err();

        match err {
            ScrapeError::MalformedRow { row, tokens, required } => {
                assert_eq!(row, 6);
                assert_eq!(tokens, 10);
                assert_eq!(required, 11);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn record_serializes_with_api_keys() {
        let raw = row(&[
            "", "1", "Pune", "Pune", "Onion", "Red", "FAQ", "1200", "1800", "1500", "05 Mar 2024",
        ]);
        let record = PriceRecord::from_raw(&raw, 4).unwrap();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["S.No"], "1");
        assert_eq!(json["City"], "Pune");
        assert_eq!(json["Commodity"], "Onion");
        assert_eq!(json["Min Prize"], "1200");
        assert_eq!(json["Max Prize"], "1800");
        assert_eq!(json["Model Prize"], "1500");
        assert_eq!(json["Date"], "05 Mar 2024");
    }

    #[test]
    fn query_requires_all_three_fields() {
        assert!(QueryParameters::new("Maharashtra", "Onion", "Pune").is_ok());

        let err = QueryParameters::new("Maharashtra", "", "Pune").unwrap_err();
        assert_eq!(err.to_string(), "Missing query parameters");
    }

    #[test]
    fn missing_fields_lists_every_empty_value() {
        let query = QueryParameters {
            state: String::new(),
            commodity: "Onion".into(),
            market: String::new(),
        };
        assert_eq!(query.missing_fields(), vec!["state", "market"]);
    }
}
