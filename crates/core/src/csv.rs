//! Lexical CSV reader for the menu feed.
//!
//! The reader turns raw text into one header-keyed map per data row. It never
//! fails: empty input yields no records, ragged rows are padded with empty
//! strings, and blank lines are skipped. All cells stay strings; typed
//! coercion belongs to [`crate::menu`].

use std::collections::HashMap;

/// One data row keyed by header name.
pub type CsvRecord = HashMap<String, String>;

/// A single lexed cell. Quoted cells are kept verbatim, unquoted cells are
/// trimmed.
#[derive(Debug)]
struct Cell {
    text: String,
    quoted: bool,
}

impl Cell {
    fn finish(self) -> String {
        if self.quoted {
            self.text
        } else {
            self.text.trim().to_string()
        }
    }
}

/// Parse CSV text into records using the first non-blank row as the header.
///
/// Quoting follows RFC 4180: a field wrapped in double quotes may contain the
/// delimiter, line breaks, and `""` for a literal quote.
#[must_use]
pub fn parse_records(text: &str) -> Vec<CsvRecord> {
    let mut rows = lex_rows(text.trim_start_matches('\u{feff}')).into_iter();

    let Some(header) = rows.next() else {
        return Vec::new();
    };

    rows.map(|row| {
        let mut record = CsvRecord::with_capacity(header.len());
        let mut cells = row.into_iter();
        for name in &header {
            let value = cells.next().unwrap_or_default();
            if !name.is_empty() {
                record.entry(name.clone()).or_insert(value);
            }
        }
        record
    })
    .collect()
}

/// Split text into rows of finished cells, dropping blank lines.
fn lex_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<Cell> = Vec::new();
    let mut cell = Cell {
        text: String::new(),
        quoted: false,
    };
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.text.push('"');
                }
                '"' => in_quotes = false,
                _ => cell.text.push(c),
            }
            continue;
        }

        match c {
            '"' if cell.text.trim().is_empty() && !cell.quoted => {
                cell.text.clear();
                cell.quoted = true;
                in_quotes = true;
            }
            ',' => {
                row.push(std::mem::replace(
                    &mut cell,
                    Cell {
                        text: String::new(),
                        quoted: false,
                    },
                ));
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                row.push(std::mem::replace(
                    &mut cell,
                    Cell {
                        text: String::new(),
                        quoted: false,
                    },
                ));
                push_row(&mut rows, std::mem::take(&mut row));
            }
            // Text after a closing quote is kept, as lenient readers do.
            _ => cell.text.push(c),
        }
    }

    if !cell.text.is_empty() || cell.quoted || !row.is_empty() {
        row.push(cell);
        push_row(&mut rows, row);
    }

    rows
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<Cell>) {
    let blank = row.iter().all(|cell| !cell.quoted && cell.text.trim().is_empty());
    if !blank {
        rows.push(row.into_iter().map(Cell::finish).collect());
    }
}
