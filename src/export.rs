//! Serialize the currently displayed record set for download.
//!
//! The CSV layout mirrors the download the web UI offered: it omits the
//! ISBN column. JSON carries full records.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::model::types::Book;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Json => "books.json",
            ExportFormat::Csv => "books.csv",
        }
    }
}

/// Render `books` in the requested format.
pub fn render(books: &[Book], format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Json => {
            let mut bytes = serde_json::to_vec_pretty(books).context("serializing JSON export")?;
            bytes.push(b'\n');
            Ok(bytes)
        }
        ExportFormat::Csv => Ok(render_csv(books).into_bytes()),
    }
}

fn render_csv(books: &[Book]) -> String {
    let mut out = String::from("Entry ID,Title,Author,Genre,Publication Date,Stock\n");
    for book in books {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            book.id,
            csv_field(&book.title),
            csv_field(&book.author),
            csv_field(&book.genre),
            csv_field(&book.publication_date),
            book.stock
        ));
    }
    out
}

/// RFC 4180 quoting: wrap when the value contains a delimiter, quote, or
/// newline, doubling embedded quotes.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i64, title: &str) -> Book {
        Book {
            id,
            title: title.to_string(),
            author: "Le Guin".to_string(),
            genre: "Fiction".to_string(),
            publication_date: "1969-03-01".to_string(),
            isbn: "9780441478125".to_string(),
            stock: 2,
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_book() {
        let bytes = render(&[book(1, "Dispossessed"), book(2, "Lathe")], ExportFormat::Csv)
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Entry ID,Title,Author,Genre,Publication Date,Stock");
        assert_eq!(lines[1], "1,Dispossessed,Le Guin,Fiction,1969-03-01,2");
    }

    #[test]
    fn csv_quotes_embedded_delimiters() {
        let bytes = render(&[book(1, "One, Two \"Three\"")], ExportFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"One, Two \"\"Three\"\"\""));
    }

    #[test]
    fn json_round_trips_full_records() {
        let books = vec![book(7, "Earthsea")];
        let bytes = render(&books, ExportFormat::Json).unwrap();
        let back: Vec<Book> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, books);
    }
}
