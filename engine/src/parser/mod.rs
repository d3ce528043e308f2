//! Delimited-file parsing with encoding and delimiter auto-detection.
//!
//! Produces [`OwnedGrid`]s. Also parses the quoted format written by
//! [`Grid::to_delimited_string`](crate::grid::Grid::to_delimited_string).

use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{ProviderError, ProviderResult};
use crate::grid::OwnedGrid;

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParsedSheet {
    /// Parsed cells, header rows included
    pub grid: OwnedGrid,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        // chardet reports nothing useful for very short inputs
        "" => "utf-8".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let text = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    text.trim_start_matches('\u{feff}').to_string()
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

/// Parse delimited text into a grid. Every line, including the header and
/// type rows, becomes a grid row.
pub fn parse_grid(content: &str, delimiter: char) -> ProviderResult<OwnedGrid> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (line_idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ProviderError::ParseError {
            line: line_idx + 1,
            message: e.to_string(),
        })?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(OwnedGrid::from_rows(rows))
}

/// Parse bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> ProviderResult<ParsedSheet> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let grid = parse_grid(&content, delimiter)?;

    Ok(ParsedSheet {
        grid,
        encoding,
        delimiter,
    })
}

/// Parse a delimited file with auto-detection of encoding and delimiter.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> ProviderResult<ParsedSheet> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Parse the output of `to_delimited_string` back into a grid.
///
/// A literal `\n` in a cell always comes back as a line feed, and CRLF
/// comes back as LF.
pub fn from_delimited_string(text: &str) -> ProviderResult<OwnedGrid> {
    if text.is_empty() {
        return Ok(OwnedGrid::default());
    }

    let mut rows = Vec::new();
    for (line_idx, line) in text.split('\n').enumerate() {
        rows.push(parse_quoted_line(line, line_idx + 1)?);
    }
    Ok(OwnedGrid::from_rows(rows))
}

fn parse_quoted_line(line: &str, line_num: usize) -> ProviderResult<Vec<String>> {
    let error = |message: &str| ProviderError::ParseError {
        line: line_num,
        message: message.to_string(),
    };

    let mut cells = Vec::new();
    let mut chars = line.chars().peekable();

    while chars.peek().is_some() {
        if chars.next() != Some('"') {
            return Err(error("expected opening quote"));
        }

        let mut cell = String::new();
        loop {
            match chars.next() {
                Some('"') if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                Some('"') => break,
                Some(c) => cell.push(c),
                None => return Err(error("unterminated cell")),
            }
        }
        cells.push(cell.replace("\\n", "\n"));

        match (chars.next(), chars.next()) {
            (None, _) => break,
            (Some(','), Some(' ')) => {}
            _ => return Err(error("expected \", \" between cells")),
        }
    }

    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn test_simple_csv() {
        let grid = parse_grid("id,name\nint,string\n1,Sword", ',').unwrap();

        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.cell(0, 1), "name");
        assert_eq!(grid.cell(2, 1), "Sword");
    }

    #[test]
    fn test_quoted_values_with_delimiter() {
        let grid = parse_grid("name;tags\n\"Big; heavy\";\"[a, b]\"", ';').unwrap();
        assert_eq!(grid.cell(1, 0), "Big; heavy");
        assert_eq!(grid.cell(1, 1), "[a, b]");
    }

    #[test]
    fn test_empty_lines_skipped() {
        let grid = parse_grid("a,b\n1,2\n,\n3,4\n", ',').unwrap();
        assert_eq!(grid.row_count(), 3);
    }

    #[test]
    fn test_ragged_rows() {
        let grid = parse_grid("a,b,c\n1", ',').unwrap();
        assert_eq!(grid.column_count(), 3);
        assert_eq!(grid.cell(1, 2), "");
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_auto_parse() {
        let result = parse_bytes_auto("id;name\nint;string\n1;Sword".as_bytes()).unwrap();
        assert_eq!(result.delimiter, ';');
        assert_eq!(result.grid.row_count(), 3);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Épée" in ISO-8859-1
        let bytes: &[u8] = &[0xC9, 0x70, 0xE9, 0x65];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Épée");
    }

    #[test]
    fn test_delimited_round_trip() {
        let original = OwnedGrid::from_rows(vec![
            vec!["id".into(), "quote".into()],
            vec!["1".into(), "he said \"go\"".into()],
            vec!["2".into(), "line one\r\nline two".into()],
        ]);

        let text = original.to_delimited_string();
        let parsed = from_delimited_string(&text).unwrap();

        assert_eq!(parsed.row_count(), 3);
        assert_eq!(parsed.cell(1, 1), "he said \"go\"");
        assert_eq!(parsed.cell(2, 1), "line one\nline two");
        assert_eq!(parsed.cell(0, 0), "id");
    }

    #[test]
    fn test_delimited_rejects_garbage() {
        assert!(from_delimited_string("\"a\" \"b\"").is_err());
        assert!(from_delimited_string("\"open").is_err());
        assert!(from_delimited_string("bare").is_err());
    }
}
