use anyhow::Result;
use rust_xlsxwriter::Workbook;
use std::path::Path;

use super::Exporter;
use crate::models::{PriceRecord, ResultSet};

pub struct ExcelExporter;

impl Exporter for ExcelExporter {
    fn export(&self, results: &ResultSet, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Prices")?;

        let widths = [8.0, 20.0, 15.0, 12.0, 12.0, 12.0, 14.0];
        for (col, (header, width)) in PriceRecord::HEADERS.iter().zip(widths).enumerate() {
            let col = col as u16;
            worksheet.set_column_width(col, width)?;
            worksheet.write(0, col, *header)?;
        }

        worksheet.set_freeze_panes(1, 0)?;
        worksheet.autofilter(0, 0, results.records.len() as u32, 6)?;

        for (row_num, record) in results.records.iter().enumerate() {
            let row = (row_num + 1) as u32;
            for (col, value) in record.fields().iter().enumerate() {
                worksheet.write(row, col as u16, *value)?;
            }
        }

        let meta_sheet = workbook.add_worksheet();
        meta_sheet.set_name("Query")?;
        meta_sheet.write(0, 0, "State")?;
        meta_sheet.write(0, 1, &results.query.state)?;
        meta_sheet.write(1, 0, "Commodity")?;
        meta_sheet.write(1, 1, &results.query.commodity)?;
        meta_sheet.write(2, 0, "Market")?;
        meta_sheet.write(2, 1, &results.query.market)?;
        meta_sheet.write(3, 0, "Report Date")?;
        meta_sheet.write(3, 1, &results.report_date)?;
        meta_sheet.write(4, 0, "Fetched At")?;
        meta_sheet.write(4, 1, results.fetched_at.to_rfc3339())?;
        meta_sheet.write(5, 0, "Records")?;
        meta_sheet.write(5, 1, results.records.len() as f64)?;

        workbook.save(path)?;

        Ok(())
    }
}
