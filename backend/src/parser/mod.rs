//! Spreadsheet loading with encoding, delimiter and header-row detection.
//!
//! Files are first read into a raw grid of [`Cell`]s with no header. The
//! header row is then located (or chosen by the caller) and everything below
//! it becomes a [`Dataset`].
//!
//! - CSV: encoding detected with `chardet`, decoded with `encoding_rs`,
//!   delimiter guessed from the first line.
//! - XLSX: first worksheet, numeric cells kept numeric.

use calamine::{Data, Reader, Xlsx};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;

use crate::error::{ParseError, ParseResult};
use crate::models::{Cell, Dataset, FileFormat, REQUIRED_COLUMNS};

/// Rows scanned for a header when none is given.
pub const DEFAULT_HEADER_SCAN_ROWS: usize = 20;

/// Raw grid read from a file, before header selection.
#[derive(Debug, Clone)]
pub struct RawSheet {
    /// Non-blank rows, in file order.
    pub rows: Vec<Vec<Cell>>,
    pub format: FileFormat,
    /// Detected encoding (CSV only).
    pub encoding: Option<String>,
    /// Detected or used delimiter (CSV only).
    pub delimiter: Option<char>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Undecodable sequences are replaced; a leading BOM is removed.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let codec = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252,
        _ => encoding_rs::UTF_8,
    };
    codec.decode(bytes).0.into_owned()
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text into rows with an explicit delimiter.
///
/// Rows may have different lengths. Blank rows are dropped.
///
/// # Example
/// ```ignore
/// use platemap::parser::parse_csv_rows;
///
/// let rows = parse_csv_rows("Plate;96 Well\n1;A1", ';').unwrap();
/// assert_eq!(rows.len(), 2);
/// ```
pub fn parse_csv_rows(content: &str, delimiter: char) -> ParseResult<Vec<Vec<Cell>>> {
    if !delimiter.is_ascii() {
        return Err(ParseError::InvalidDelimiter(delimiter));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Vec<Cell> = record.iter().map(Cell::from_csv).collect();
        if row.iter().any(|c| !c.is_empty()) {
            rows.push(row);
        }
    }

    Ok(rows)
}

/// Parse CSV bytes with auto-detection of encoding and (optionally) delimiter.
pub fn parse_csv_bytes(bytes: &[u8], delimiter: Option<char>) -> ParseResult<RawSheet> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    let rows = parse_csv_rows(&content, delimiter)?;

    Ok(RawSheet {
        rows,
        format: FileFormat::Csv,
        encoding: Some(encoding),
        delimiter: Some(delimiter),
    })
}

/// Convert a calamine value into a cell.
fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Bool(b) => Cell::Bool(*b),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::from_csv(s),
        // Excel serial date, kept as a number
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("#ERROR: {:?}", e)),
    }
}

/// Read the first worksheet of an XLSX workbook.
pub fn parse_xlsx_bytes(bytes: &[u8]) -> ParseResult<RawSheet> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| ParseError::XlsxError(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ParseError::EmptyFile)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ParseError::XlsxError(e.to_string()))?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(data_to_cell).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .collect();

    Ok(RawSheet {
        rows,
        format: FileFormat::Xlsx,
        encoding: None,
        delimiter: None,
    })
}

/// Parse bytes of a known format.
pub fn parse_bytes(bytes: &[u8], format: FileFormat, delimiter: Option<char>) -> ParseResult<RawSheet> {
    if bytes.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let sheet = match format {
        FileFormat::Csv => parse_csv_bytes(bytes, delimiter)?,
        FileFormat::Xlsx => parse_xlsx_bytes(bytes)?,
    };

    if sheet.rows.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    Ok(sheet)
}

/// Parse a file, choosing the format from its extension unless given.
pub fn parse_file<P: AsRef<Path>>(
    path: P,
    format: Option<FileFormat>,
    delimiter: Option<char>,
) -> ParseResult<RawSheet> {
    let path = path.as_ref();
    let format = match format {
        Some(f) => f,
        None => FileFormat::from_path(path)
            .ok_or_else(|| ParseError::UnsupportedFormat(path.display().to_string()))?,
    };

    let bytes = std::fs::read(path)?;
    parse_bytes(&bytes, format, delimiter)
}

/// Index of the first row (within `scan_rows`) naming every required column.
pub fn find_header_row(rows: &[Vec<Cell>], scan_rows: usize) -> Option<usize> {
    rows.iter().take(scan_rows).position(|row| {
        REQUIRED_COLUMNS
            .iter()
            .all(|required| row.iter().any(|cell| cell.to_label().as_deref() == Some(*required)))
    })
}

/// Turn a header row into unique column names.
///
/// Blank names become `Unnamed: <index>`; repeated names get `.1`, `.2`, ...
/// skipping any suffixed name already present in the row.
pub fn normalize_headers(row: &[Cell]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::with_capacity(row.len());

    for (i, cell) in row.iter().enumerate() {
        let base = cell.to_label().unwrap_or_else(|| format!("Unnamed: {}", i));
        let mut name = base.clone();

        if used.contains(&name) {
            let counter = counters.entry(base.clone()).or_insert(0);
            loop {
                *counter += 1;
                name = format!("{}.{}", base, counter);
                if !used.contains(&name) {
                    break;
                }
            }
        }

        used.insert(name.clone());
        headers.push(name);
    }

    headers
}

impl RawSheet {
    /// First `n` rows, for display.
    pub fn preview(&self, n: usize) -> &[Vec<Cell>] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn find_header_row(&self, scan_rows: usize) -> Option<usize> {
        find_header_row(&self.rows, scan_rows)
    }

    /// Column names taken from `header_row`.
    pub fn headers(&self, header_row: usize) -> ParseResult<Vec<String>> {
        let row = self.rows.get(header_row).ok_or(ParseError::HeaderRowOutOfRange {
            row: header_row,
            rows: self.rows.len(),
        })?;
        Ok(normalize_headers(row))
    }

    /// Build a dataset from the rows below `header_row`.
    ///
    /// Cells past the last header are dropped; short rows are padded.
    pub fn into_dataset(self, header_row: usize) -> ParseResult<Dataset> {
        let columns = self.headers(header_row)?;
        let width = columns.len();

        let rows = self
            .rows
            .into_iter()
            .skip(header_row + 1)
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();

        Ok(Dataset::from_rows(columns, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_simple_csv() {
        let rows = parse_csv_rows("name;age\nAlice;30\nBob;25", ';').unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], Cell::from("Alice"));
        assert_eq!(rows[2][1], Cell::from("25"));
    }

    #[test]
    fn test_quoted_values() {
        let rows = parse_csv_rows("name,value\n\"Alice\",\"Hello, World\"", ',').unwrap();
        assert_eq!(rows[1][1], Cell::from("Hello, World"));
    }

    #[test]
    fn test_blank_rows_skipped() {
        let rows = parse_csv_rows("a,b\n1,2\n\n,\n3,4\n", ',').unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_ragged_rows_allowed() {
        let rows = parse_csv_rows("a,b,c\n1\n1,2,3,4", ',').unwrap();
        assert_eq!(rows[1].len(), 1);
        assert_eq!(rows[2].len(), 4);
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let err = parse_csv_rows("a§b", '§').unwrap_err();
        assert!(matches!(err, ParseError::InvalidDelimiter('§')));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_bom_stripped() {
        let decoded = decode_content(b"\xEF\xBB\xBFPlate,96 Well", "utf-8");
        assert!(decoded.starts_with("Plate"));
    }

    #[test]
    fn test_find_header_row_after_preamble() {
        let csv = "Run report,,\nOperator,J. Doe,\n,,\nPlate,96 Well,384 Well\n1,A1,A1\n";
        let sheet = parse_csv_bytes(csv.as_bytes(), None).unwrap();

        // Blank line dropped, so header is the third stored row
        assert_eq!(sheet.find_header_row(DEFAULT_HEADER_SCAN_ROWS), Some(2));
        assert_eq!(sheet.delimiter, Some(','));
    }

    #[test]
    fn test_find_header_row_respects_scan_limit() {
        let mut csv = String::new();
        for i in 0..25 {
            csv.push_str(&format!("note {},,\n", i));
        }
        csv.push_str("Plate,96 Well,384 Well\n1,A1,A1\n");
        let sheet = parse_csv_bytes(csv.as_bytes(), None).unwrap();

        assert_eq!(sheet.find_header_row(20), None);
        assert_eq!(sheet.find_header_row(30), Some(25));
    }

    #[test]
    fn test_normalize_headers() {
        let row = vec![Cell::from("Plate"), Cell::Empty, Cell::from("Note"), Cell::from("Note"), Cell::from("Note")];
        assert_eq!(normalize_headers(&row), vec!["Plate", "Unnamed: 1", "Note", "Note.1", "Note.2"]);
    }

    #[test]
    fn test_normalize_headers_skips_taken_suffixes() {
        let row = vec![Cell::from("Note"), Cell::from("Note.1"), Cell::from("Note"), Cell::from("Note")];
        assert_eq!(normalize_headers(&row), vec!["Note", "Note.1", "Note.2", "Note.3"]);
    }

    #[test]
    fn test_duplicate_headers_keep_every_column() {
        let csv = "Plate,96 Well,384 Well,Note,Note.1,Note\n1,A1,A1,first,second,third\n";
        let sheet = parse_csv_bytes(csv.as_bytes(), None).unwrap();
        let dataset = sheet.into_dataset(0).unwrap();

        assert_eq!(dataset.columns, vec!["Plate", "96 Well", "384 Well", "Note", "Note.1", "Note.2"]);
        let row: Vec<String> = dataset.rows().next().unwrap().iter().map(|c| c.to_string()).collect();
        assert_eq!(row, vec!["1", "A1", "A1", "first", "second", "third"]);
    }

    #[test]
    fn test_into_dataset() {
        let csv = "title\nSample,Plate,96 Well,384 Well\nS1,1,A1,A1\nS2,2\n";
        let sheet = parse_csv_bytes(csv.as_bytes(), None).unwrap();
        let header = sheet.find_header_row(DEFAULT_HEADER_SCAN_ROWS).unwrap();
        let dataset = sheet.into_dataset(header).unwrap();

        assert_eq!(dataset.columns, vec!["Sample", "Plate", "96 Well", "384 Well"]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records[0].plate, Some(1.0));
        assert_eq!(dataset.records[1].well_96, None);
        assert!(!dataset.records[1].is_sortable());
    }

    #[test]
    fn test_header_row_out_of_range() {
        let sheet = parse_csv_bytes(b"a,b\n1,2", None).unwrap();
        let err = sheet.into_dataset(5).unwrap_err();
        assert!(matches!(err, ParseError::HeaderRowOutOfRange { row: 5, rows: 2 }));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse_bytes(b"", FileFormat::Csv, None), Err(ParseError::EmptyFile)));
        assert!(matches!(parse_bytes(b"\n\n", FileFormat::Csv, None), Err(ParseError::EmptyFile)));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = parse_file("layout.ods", None, None).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_parse_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.csv");
        std::fs::write(&path, "Plate;96 Well;384 Well\n1;A1;A1\n").unwrap();

        let sheet = parse_file(&path, None, None).unwrap();
        assert_eq!(sheet.format, FileFormat::Csv);
        assert_eq!(sheet.delimiter, Some(';'));
        assert_eq!(sheet.rows.len(), 2);
    }

    #[test]
    fn test_parse_xlsx_bytes() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Plate").unwrap();
        sheet.write_string(0, 1, "96 Well").unwrap();
        sheet.write_string(0, 2, "384 Well").unwrap();
        sheet.write_number(1, 0, 5.0).unwrap();
        sheet.write_string(1, 1, "B3").unwrap();
        sheet.write_string(1, 2, "C6").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let raw = parse_xlsx_bytes(&bytes).unwrap();
        assert_eq!(raw.format, FileFormat::Xlsx);
        assert_eq!(raw.rows[1][0], Cell::Number(5.0));

        let dataset = raw.into_dataset(0).unwrap();
        assert_eq!(dataset.records[0].plate, Some(5.0));
        assert_eq!(dataset.records[0].well_384.as_deref(), Some("C6"));
    }

    #[test]
    fn test_invalid_xlsx() {
        let err = parse_bytes(b"not a zip archive", FileFormat::Xlsx, None).unwrap_err();
        assert!(matches!(err, ParseError::XlsxError(_)));
    }
}
