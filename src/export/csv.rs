use anyhow::Result;
use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::Exporter;
use crate::models::{PriceRecord, ResultSet};

pub struct CsvExporter {
    delimiter: u8,
    with_bom: bool,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self {
            delimiter: b',',
            with_bom: false,
        }
    }
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Prefix the file with a UTF-8 BOM so spreadsheet apps pick the encoding.
    pub fn with_bom(mut self, with_bom: bool) -> Self {
        self.with_bom = with_bom;
        self
    }

    pub fn write<W: Write>(&self, mut out: W, records: &[PriceRecord]) -> Result<()> {
        if self.with_bom {
            out.write_all(&[0xEF, 0xBB, 0xBF])?;
        }

        let mut writer = WriterBuilder::new().delimiter(self.delimiter).from_writer(out);
        writer.write_record(PriceRecord::HEADERS)?;

        for record in records {
            writer.write_record(record.fields())?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl Exporter for CsvExporter {
    fn export(&self, results: &ResultSet, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write(file, &results.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::sample_results;

    #[test]
    fn writes_header_and_rows() {
        let mut out = Vec::new();
        CsvExporter::new().write(&mut out, &sample_results().records).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "S.No,City,Commodity,Min Prize,Max Prize,Model Prize,Date");
        assert_eq!(lines[1], "1,Pune,Onion,1200,1800,1500,05 Mar 2024");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn bom_and_delimiter_are_applied() {
        let mut out = Vec::new();
        CsvExporter::new()
            .with_bom(true)
            .with_delimiter(b';')
            .write(&mut out, &sample_results().records)
            .unwrap();

        assert_eq!(&out[..3], &[0xEF, 0xBB, 0xBF]);
        let text = String::from_utf8(out[3..].to_vec()).unwrap();
        assert!(text.starts_with("S.No;City;"));
    }
}
