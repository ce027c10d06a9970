//! CSV decoding with encoding and delimiter auto-detection.
//!
//! Turns uploaded bytes into a [`RawTable`]: header names plus string cells.
//! No healthcare-specific logic here; typing happens in [`crate::validation`].

use std::path::Path;

use crate::error::{IngestError, IngestResult};

/// CSV parsing error with context
#[derive(Debug, Clone)]
pub struct CsvError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for CsvError {}

impl CsvError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line() as usize).unwrap_or(0);
        let message = match err.kind() {
            csv::ErrorKind::Utf8 { err, .. } => format!("invalid UTF-8: {}", err),
            _ => err.to_string(),
        };
        CsvError::new(line, message)
    }
}

/// One data row: its 1-based line number in the file and its trimmed cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: usize,
    pub cells: Vec<String>,
}

/// Header plus rows, every row holding exactly one cell per header.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Position of a column by exact header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed table
    pub table: RawTable,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
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
/// A leading UTF-8 byte order mark is dropped so it never ends up in the
/// first header name.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.to_string()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        // Unknown charsets: UTF-8 with lossy conversion
        _ => String::from_utf8_lossy(bytes).to_string(),
    };

    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Falls back to a comma when none of the candidates appear.
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

/// Returns `None` for cells that mean "no value".
///
/// Besides the empty string this covers the markers spreadsheet exports and
/// dataframe tools write for missing values.
pub fn normalize_cell(cell: &str) -> Option<&str> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "na" | "n/a" | "nan" | "null" | "none" => None,
        _ => Some(trimmed),
    }
}

/// Parse CSV text with an explicit delimiter.
///
/// Blank lines are skipped. Rows shorter than the header are padded with
/// empty cells; a row with more fields than the header is a format error.
///
/// # Example
/// ```ignore
/// use healthdash::parser::parse_str;
///
/// let table = parse_str("Age,Gender\n40,M", ',').unwrap();
/// assert_eq!(table.headers, vec!["Age", "Gender"]);
/// assert_eq!(table.rows[0].cells, vec!["40", "M"]);
/// ```
pub fn parse_str(content: &str, delimiter: char) -> IngestResult<RawTable> {
    if content.trim().is_empty() {
        return Err(IngestError::EmptyFile);
    }
    if !delimiter.is_ascii() {
        return Err(CsvError::new(0, format!("Unsupported delimiter '{}'", delimiter)).into());
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(CsvError::from)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::new(1, "No headers found").into());
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(CsvError::from)?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        if record.len() > headers.len() {
            return Err(CsvError::new(
                line,
                format!("found {} fields, expected {}", record.len(), headers.len()),
            )
            .into());
        }

        let mut cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        cells.resize(headers.len(), String::new());
        rows.push(RawRow { line, cells });
    }

    Ok(RawTable { headers, rows })
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> IngestResult<ParseResult> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let table = parse_str(&content, delimiter)?;

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> IngestResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}
