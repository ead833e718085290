pub mod csv;
pub mod excel;
pub mod json;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::ResultSet;

pub use self::csv::CsvExporter;
pub use self::excel::ExcelExporter;
pub use self::json::{error_body, JsonExporter};

pub trait Exporter {
    fn export(&self, results: &ResultSet, path: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
    Excel,
}

impl OutputFormat {
    pub fn exporter(self) -> Box<dyn Exporter> {
        match self {
            Self::Json => Box::new(JsonExporter::new()),
            Self::Csv => Box::new(CsvExporter::new()),
            Self::Excel => Box::new(ExcelExporter),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Excel => "xlsx",
        }
    }
}

/// File name for an export of `results`, e.g. `onion_pune_05-Mar-2024.csv`.
pub fn default_file_name(results: &ResultSet, format: OutputFormat) -> String {
    let slug = |s: &str| {
        s.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect::<String>()
    };

    format!(
        "{}_{}_{}.{}",
        slug(&results.query.commodity),
        slug(&results.query.market),
        results.report_date,
        format.extension()
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{PriceRecord, QueryParameters, RawRow, ResultSet};

    pub fn sample_results() -> ResultSet {
        let query = QueryParameters::new("Maharashtra", "Onion", "Pune").unwrap();
        let records = [("1", "1200", "1800", "1500"), ("2", "1000", "1600", "1400")]
            .into_iter()
            .map(|(serial, min, max, modal)| {
                let tokens = [
                    "", serial, "Pune", "Pune", "Onion", "Red", "FAQ", min, max, modal,
                    "05 Mar 2024", "",
                ];
                let raw = RawRow(tokens.iter().map(|t| t.to_string()).collect());
                PriceRecord::from_raw(&raw, 4).unwrap()
            })
            .collect();

        ResultSet::new(query, "05-Mar-2024".to_string(), records)
    }
}
