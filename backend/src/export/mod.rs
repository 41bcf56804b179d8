//! Dataset export to CSV and XLSX.
//!
//! Both formats write one header row followed by the records in dataset
//! order, without an index column. XLSX output is a single worksheet named
//! [`SHEET_NAME`].

use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::Path;

use crate::error::{ExportError, ExportResult};
use crate::models::{Cell, Dataset, FileFormat};

/// Worksheet name used for XLSX output.
pub const SHEET_NAME: &str = "Sorted";

/// Default download name, without extension.
pub const DEFAULT_FILE_STEM: &str = "sorted_plate_layout";

/// Serialize a dataset as comma-separated text.
pub fn to_csv_bytes(dataset: &Dataset) -> ExportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(&dataset.columns)?;
    for row in dataset.rows() {
        writer.write_record(row.iter().map(Cell::to_string))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::IoError(e.into_error()))
}

fn write_worksheet(worksheet: &mut Worksheet, dataset: &Dataset) -> ExportResult<()> {
    worksheet.set_name(SHEET_NAME)?;

    for (col_idx, name) in dataset.columns.iter().enumerate() {
        worksheet.write_string(0, column_index(col_idx)?, name)?;
    }

    for (row_idx, row) in dataset.rows().enumerate() {
        let row_num = u32::try_from(row_idx + 1)
            .map_err(|_| ExportError::TooLarge(format!("{} rows", dataset.len())))?;

        for (col_idx, cell) in row.iter().enumerate() {
            let col_num = column_index(col_idx)?;
            match cell {
                Cell::Empty => {}
                Cell::Bool(b) => {
                    worksheet.write_boolean(row_num, col_num, *b)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(row_num, col_num, *n)?;
                }
                Cell::Text(s) => {
                    worksheet.write_string(row_num, col_num, s)?;
                }
            }
        }
    }

    Ok(())
}

fn column_index(idx: usize) -> ExportResult<u16> {
    u16::try_from(idx).map_err(|_| ExportError::TooLarge(format!("{} columns", idx + 1)))
}

fn build_workbook(dataset: &Dataset) -> ExportResult<Workbook> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    write_worksheet(worksheet, dataset)?;
    Ok(workbook)
}

/// Serialize a dataset as an XLSX workbook.
pub fn to_xlsx_bytes(dataset: &Dataset) -> ExportResult<Vec<u8>> {
    let mut workbook = build_workbook(dataset)?;
    Ok(workbook.save_to_buffer()?)
}

/// Serialize a dataset in the given format.
pub fn to_bytes(dataset: &Dataset, format: FileFormat) -> ExportResult<Vec<u8>> {
    match format {
        FileFormat::Csv => to_csv_bytes(dataset),
        FileFormat::Xlsx => to_xlsx_bytes(dataset),
    }
}

/// Write a dataset to `path` in the given format.
pub fn write_file<P: AsRef<Path>>(dataset: &Dataset, path: P, format: FileFormat) -> ExportResult<()> {
    match format {
        FileFormat::Csv => std::fs::write(path, to_csv_bytes(dataset)?)?,
        FileFormat::Xlsx => build_workbook(dataset)?.save(path.as_ref())?,
    }
    Ok(())
}

/// Download name for a format, e.g. `sorted_plate_layout.xlsx`.
pub fn default_file_name(format: FileFormat) -> String {
    format!("{}.{}", DEFAULT_FILE_STEM, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ViewMode;
    use crate::parser::{parse_bytes, parse_file};
    use crate::transform::{assign_global_positions, sort_by_view_mode};

    fn sample() -> Dataset {
        let sheet = parse_bytes(
            b"Sample,Plate,96 Well,384 Well,Volume\nS1,5,A1,A1,1.5\nS2,,B1,B1,\nS3,1,A2,A2,2\n",
            FileFormat::Csv,
            None,
        )
        .unwrap();
        assign_global_positions(sheet.into_dataset(0).unwrap())
    }

    #[test]
    fn test_csv_export() {
        let sorted = sort_by_view_mode(&sample(), ViewMode::Layout384).unwrap();
        let text = String::from_utf8(to_csv_bytes(&sorted).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Sample,Plate,96 Well,384 Well,Volume,Global_384_Position");
        assert_eq!(lines[1], "S3,1,A2,A2,2,2");
        assert_eq!(lines[2], "S2,,B1,B1,,");
        assert_eq!(lines[3], "S1,5,A1,A1,1.5,385");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_xlsx_export_reloads() {
        let dataset = sample();
        let bytes = to_xlsx_bytes(&dataset).unwrap();

        let sheet = parse_bytes(&bytes, FileFormat::Xlsx, None).unwrap();
        assert_eq!(sheet.rows[0].len(), dataset.columns.len());
        assert_eq!(sheet.rows[1][1], Cell::Number(5.0));
        assert_eq!(sheet.rows[1][5], Cell::Number(385.0));

        let reloaded = assign_global_positions(sheet.into_dataset(0).unwrap());
        assert_eq!(reloaded.columns, dataset.columns);
        assert_eq!(reloaded.records[0].global_384_position, Some(385));
    }

    #[test]
    fn test_write_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = sample();

        for format in [FileFormat::Csv, FileFormat::Xlsx] {
            let path = dir.path().join(default_file_name(format));
            write_file(&dataset, &path, format).unwrap();

            let sheet = parse_file(&path, None, None).unwrap();
            assert_eq!(sheet.format, format);
            let reloaded = sheet.into_dataset(0).unwrap();
            assert_eq!(reloaded.len(), dataset.len());
            assert_eq!(reloaded.records[2].plate, Some(1.0));
        }
    }

    #[test]
    fn test_default_file_name() {
        assert_eq!(default_file_name(FileFormat::Xlsx), "sorted_plate_layout.xlsx");
        assert_eq!(default_file_name(FileFormat::Csv), "sorted_plate_layout.csv");
    }
}
