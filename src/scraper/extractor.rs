use ::scraper::{ElementRef, Html, Selector};
use once_cell::sync::Lazy;
use tracing::debug;

use super::error::ScrapeError;
use super::form::RESULTS_TABLE_ID;
use crate::models::{PriceRecord, RawRow};

/// Label rows above the price lines.
pub const HEADER_ROWS: usize = 4;
/// Total row below the price lines.
pub const FOOTER_ROWS: usize = 1;

static RESULTS_TABLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(&format!("table#{RESULTS_TABLE_ID}"))
        .expect("results table selector should parse")
});
static ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("row selector should parse"));

pub struct PriceTableExtractor;

impl PriceTableExtractor {
    /// Parses the rendered page into price records.
    ///
    /// Only rows of the results table are read; rows of nested or unrelated
    /// tables are skipped. The first [`HEADER_ROWS`] and the last
    /// [`FOOTER_ROWS`] rows are dropped. A row too short to map fails the
    /// whole extraction.
    pub fn extract(page_source: &str) -> Result<Vec<PriceRecord>, ScrapeError> {
        let document = Html::parse_document(page_source);

        let table = document
            .select(&RESULTS_TABLE)
            .next()
            .ok_or_else(|| ScrapeError::ElementNotFound(format!("#{RESULTS_TABLE_ID}")))?;

        let rows = Self::raw_rows(table);
        debug!(rows = rows.len(), "parsed results table");

        let end = rows.len().saturating_sub(FOOTER_ROWS);
        if end <= HEADER_ROWS {
            return Ok(Vec::new());
        }

        rows[HEADER_ROWS..end]
            .iter()
            .enumerate()
            .map(|(i, raw)| PriceRecord::from_raw(raw, HEADER_ROWS + i))
            .collect()
    }

    /// Rows owned by `table`, in document order, tokenized.
    pub fn raw_rows(table: ElementRef<'_>) -> Vec<RawRow> {
        table
            .select(&ROW)
            .filter(|row| Self::owning_table(*row) == Some(table))
            .map(|row| RawRow::from_row_text(&row.text().collect::<String>()))
            .collect()
    }

    fn owning_table(row: ElementRef<'_>) -> Option<ElementRef<'_>> {
        row.ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "table")
    }
}
