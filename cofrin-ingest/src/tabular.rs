//! CSV/XLSX flattening. Spreadsheets are not assumed to follow any fixed
//! schema: rows become flat comma-delimited text and the oracle's document
//! prompt does the extraction.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};

use crate::types::ParseError;

/// Normalize CSV bytes into flat comma-joined rows.
///
/// Handles both comma- and semicolon-delimited exports (Brazilian banks
/// favor the latter).
pub fn csv_to_text(bytes: &[u8]) -> Result<String, ParseError> {
    let text = rows_to_text(read_rows(bytes, b',')?);
    if !text.is_empty() && !text.lines().any(|l| l.contains(',')) && looks_semicolon(bytes) {
        return Ok(rows_to_text(read_rows(bytes, b';')?));
    }
    if text.trim().is_empty() {
        return Err(ParseError::InvalidDocument("empty CSV".to_string()));
    }
    Ok(text)
}

fn looks_semicolon(bytes: &[u8]) -> bool {
    bytes.iter().take(2_048).filter(|b| **b == b';').count() > 0
}

fn read_rows(bytes: &[u8], delimiter: u8) -> Result<Vec<Vec<String>>, ParseError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| ParseError::InvalidDocument(e.to_string()))?;
        rows.push(record.iter().map(|f| f.trim().to_string()).collect());
    }
    Ok(rows)
}

/// Flatten the first worksheet of an XLSX workbook to CSV-style text.
pub fn xlsx_to_text(bytes: &[u8]) -> Result<String, ParseError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| ParseError::Workbook(e.to_string()))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ParseError::Workbook("workbook has no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ParseError::Workbook(e.to_string()))?;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_str).collect())
        .collect();

    let text = rows_to_text(rows);
    if text.trim().is_empty() {
        return Err(ParseError::InvalidDocument("empty worksheet".to_string()));
    }
    Ok(text)
}

fn cell_str(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                format!("{f}")
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn rows_to_text(rows: Vec<Vec<String>>) -> String {
    rows.into_iter()
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .map(|row| row.join(","))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_rows_joined_with_commas() {
        let text = csv_to_text(b"Data,Descricao,Valor\n2024-03-10,Mercado,-45.00\n").unwrap();
        assert_eq!(text, "Data,Descricao,Valor\n2024-03-10,Mercado,-45.00");
    }

    #[test]
    fn test_semicolon_delimited_csv() {
        let text = csv_to_text(b"Data;Descricao;Valor\n2024-03-10;Mercado;-45,00\n").unwrap();
        assert!(text.starts_with("Data,Descricao,Valor"));
        assert!(text.contains("Mercado"));
    }

    #[test]
    fn test_blank_rows_dropped() {
        let text = csv_to_text(b"a,b\n,\nc,d\n").unwrap();
        assert_eq!(text, "a,b\nc,d");
    }

    #[test]
    fn test_empty_csv_is_invalid() {
        assert!(matches!(
            csv_to_text(b""),
            Err(ParseError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_xlsx_garbage_is_unreadable_workbook() {
        assert!(matches!(
            xlsx_to_text(b"definitely not a zip"),
            Err(ParseError::Workbook(_))
        ));
    }
}
