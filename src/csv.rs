//! One-row CSV parsing and formatting for stream handles.
//!
//! The stream layer reads and writes CSV a row at a time against an open
//! handle, so the parser pulls single bytes from a callback and never reads
//! past the row terminator; the handle position stays exact. Delimiter,
//! enclosure, and escape are single ASCII characters.
//!
//! Formatting applies a spreadsheet formula-injection guard: any field whose
//! string form starts with `=` gets a single leading space, so the value is
//! no longer auto-executed when the CSV is opened in Excel-like tools. The
//! guard runs on every field after string coercion, not just string inputs.

use std::fmt;

use crate::error::{DriverResult, FileSystemError};

/// Parse one CSV row, pulling bytes from `next`.
///
/// Returns `Ok(None)` when the stream is already at end of data — a normal
/// end, not an error. An enclosure left open at end of input is a malformed
/// row and raises. Inside an enclosure the escape byte takes the following
/// byte literally; a doubled enclosure is also a literal enclosure character.
pub fn parse_row<F>(
    mut next: F,
    delimiter: char,
    enclosure: char,
    escape: char,
) -> DriverResult<Option<Vec<String>>>
where
    F: FnMut() -> DriverResult<Option<u8>>,
{
    let delim = delimiter as u8;
    let quote = enclosure as u8;
    let esc = escape as u8;

    let mut fields: Vec<String> = Vec::new();
    let mut field: Vec<u8> = Vec::new();
    let mut pending: Option<u8> = None;
    let mut in_quotes = false;
    let mut saw_any = false;

    loop {
        let byte = match pending.take() {
            Some(b) => Some(b),
            None => next()?,
        };
        let Some(b) = byte else {
            if in_quotes {
                return Err(FileSystemError::MalformedCsv(
                    "enclosure not terminated before end of data".to_string(),
                ));
            }
            if !saw_any {
                return Ok(None);
            }
            break;
        };
        saw_any = true;

        if in_quotes {
            if b == esc {
                match next()? {
                    Some(literal) => field.push(literal),
                    None => {
                        return Err(FileSystemError::MalformedCsv(
                            "escape at end of data".to_string(),
                        ))
                    }
                }
            } else if b == quote {
                match next()? {
                    Some(n) if n == quote => field.push(quote),
                    other => {
                        in_quotes = false;
                        pending = other;
                    }
                }
            } else {
                field.push(b);
            }
            continue;
        }

        if b == delim {
            fields.push(String::from_utf8_lossy(&field).into_owned());
            field.clear();
        } else if b == b'\n' {
            break;
        } else if b == b'\r' {
            match next()? {
                Some(b'\n') | None => break,
                other => {
                    field.push(b'\r');
                    pending = other;
                }
            }
        } else if b == quote && field.is_empty() {
            in_quotes = true;
        } else {
            field.push(b);
        }
    }

    fields.push(String::from_utf8_lossy(&field).into_owned());
    Ok(Some(fields))
}

/// Format one CSV row, terminated with `\n`.
///
/// Fields are string-coerced via `Display`. Values containing the delimiter,
/// the enclosure, or a line break are enclosed, with embedded enclosures
/// doubled. Values starting with `=` get the formula-injection guard space.
pub fn format_row<T: fmt::Display>(fields: &[T], delimiter: char, enclosure: char) -> String {
    let mut out = String::new();
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        let mut value = f.to_string();
        if value.starts_with('=') {
            value.insert(0, ' ');
        }
        let needs_enclosure = value.contains(delimiter)
            || value.contains(enclosure)
            || value.contains('\n')
            || value.contains('\r');
        if needs_enclosure {
            out.push(enclosure);
            for ch in value.chars() {
                if ch == enclosure {
                    out.push(enclosure);
                }
                out.push(ch);
            }
            out.push(enclosure);
        } else {
            out.push_str(&value);
        }
    }
    out.push('\n');
    out
}
