//! Raw CSV reader with encoding and delimiter auto-detection.
//!
//! Produces a [`RawTable`] of untyped string cells. No happiness-specific
//! logic lives here; header normalization and renaming happen in
//! [`crate::transform`].

use std::path::Path;

use crate::error::CsvError;

/// An untyped table exactly as found in a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column headers (trimmed, BOM removed)
    pub headers: Vec<String>,
    /// Data rows; every row has `headers.len()` cells
    pub rows: Vec<Vec<String>>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

impl RawTable {
    /// Position of a header, exact match.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
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
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "utf-8-sig" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).to_string(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.to_string(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(encoding) => encoding.decode(bytes).0.to_string(),
            // Unknown label: lossy UTF-8
            None => String::from_utf8_lossy(bytes).to_string(),
        },
    };
    decoded.trim_start_matches('\u{feff}').to_string()
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Falls back to `,` when the line holds none of the candidates.
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

/// Parse CSV text with an explicit delimiter.
///
/// Quoted fields may contain the delimiter (`"Hong Kong S.A.R., China"`).
/// Blank lines are skipped; short rows are padded with empty cells and
/// surplus cells are ignored.
pub fn parse_str(content: &str, delimiter: char) -> Result<RawTable, CsvError> {
    parse_with_metadata(content, delimiter, "utf-8".to_string())
}

fn parse_with_metadata(content: &str, delimiter: char, encoding: String) -> Result<RawTable, CsvError> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| parse_error(&e))?
        .iter()
        .map(|h| h.trim_matches('\u{feff}').trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| parse_error(&e))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let row = (0..headers.len())
            .map(|i| record.get(i).unwrap_or("").to_string())
            .collect();
        rows.push(row);
    }

    Ok(RawTable {
        headers,
        rows,
        encoding,
        delimiter,
    })
}

fn parse_error(err: &csv::Error) -> CsvError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    CsvError::ParseError {
        line,
        message: err.to_string(),
    }
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> Result<RawTable, CsvError> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }
    // Valid UTF-8 is taken as is; chardet misreads short UTF-8 input as Latin-1.
    let (content, encoding) = match std::str::from_utf8(bytes) {
        Ok(text) => (text.trim_start_matches('\u{feff}').to_string(), "utf-8".to_string()),
        Err(_) => {
            let encoding = detect_encoding(bytes);
            (decode_content(bytes, &encoding), encoding)
        }
    };
    let delimiter = detect_delimiter(&content);
    parse_with_metadata(&content, delimiter, encoding)
}

/// Read a CSV file with auto-detection of encoding and delimiter.
pub fn read_csv_file<P: AsRef<Path>>(path: P) -> Result<RawTable, CsvError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| CsvError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bytes_auto(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let table = parse_str("country,score\nCanada,7.328\nDenmark,7.555", ',').unwrap();

        assert_eq!(table.headers, vec!["country", "score"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0], vec!["Canada", "7.328"]);
        assert_eq!(table.column_index("score"), Some(1));
    }

    #[test]
    fn test_quoted_delimiter_inside_field() {
        let csv = "Country,Happiness.Rank\n\"Hong Kong S.A.R., China\",71\n";
        let table = parse_str(csv, ',').unwrap();

        assert_eq!(table.rows[0][0], "Hong Kong S.A.R., China");
        assert_eq!(table.rows[0][1], "71");
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = parse_str("a,b\n1,2\n\n3,4\n", ',').unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_short_rows_padded() {
        let table = parse_str("a,b,c\n1,,3\n4", ',').unwrap();

        assert_eq!(table.rows[0], vec!["1", "", "3"]);
        assert_eq!(table.rows[1], vec!["4", "", ""]);
    }

    #[test]
    fn test_bom_stripped_from_first_header() {
        let bytes = "\u{feff}Country,Score\nCanada,7.3".as_bytes();
        let table = parse_bytes_auto(bytes).unwrap();
        assert_eq!(table.headers[0], "Country");
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_str("", ','), Err(CsvError::EmptyFile)));
        assert!(matches!(parse_bytes_auto(b""), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Côte d'Ivoire" in ISO-8859-1
        let bytes: &[u8] = &[0x43, 0xF4, 0x74, 0x65, 0x20, 0x64, 0x27, 0x49, 0x76, 0x6F, 0x69, 0x72, 0x65];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Côte d'Ivoire");
    }

    #[test]
    fn test_utf8_country_names_kept() {
        let csv = "Country,Happiness Score\nCuraçao,5.1\nCôte d'Ivoire,5.2\n";
        let table = parse_bytes_auto(csv.as_bytes()).unwrap();

        assert_eq!(table.encoding, "utf-8");
        assert_eq!(table.rows[0][0], "Curaçao");
        assert_eq!(table.rows[1][0], "Côte d'Ivoire");
    }

    #[test]
    fn test_utf8_with_bom_and_accents() {
        let csv = "\u{feff}Country;Score\nSão Tomé and Príncipe;4.8\n";
        let table = parse_bytes_auto(csv.as_bytes()).unwrap();

        assert_eq!(table.headers, vec!["Country", "Score"]);
        assert_eq!(table.delimiter, ';');
        assert_eq!(table.rows[0][0], "São Tomé and Príncipe");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = read_csv_file("/nonexistent/2015.csv").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/2015.csv"));
    }
}
