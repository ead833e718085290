use anyhow::Result;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::Exporter;
use crate::models::{PriceRecord, ResultSet};

/// Writes the records as a JSON array of objects, the shape the price API
/// has always answered with.
pub struct JsonExporter {
    pretty: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn render(&self, records: &[PriceRecord]) -> Result<String> {
        if !self.pretty {
            return Ok(serde_json::to_string(records)?);
        }

        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        records.serialize(&mut ser)?;
        Ok(String::from_utf8(buf)?)
    }
}

impl Exporter for JsonExporter {
    fn export(&self, results: &ResultSet, path: &Path) -> Result<()> {
        let json = self.render(&results.records)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// The `{"error": message}` body returned for any failed request.
pub fn error_body(message: &str) -> serde_json::Value {
    serde_json::json!({ "error": message })
}
