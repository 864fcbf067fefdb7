//! Fixed-width and delimited line parsing, and the lazy record stream that
//! drives the columnar writer.

use std::io::BufRead;

use transformat_data::FieldDefinition;
use transformat_errors::{Error, Result};
use unicode_width::UnicodeWidthChar;

use crate::convert;
use crate::record::Record;

/// Parse one delimited line into a [`Record`].
///
/// Splits on the exact delimiter string — no escaping, no quoting. The
/// token count must equal `field_defs.len()`.
///
/// # Errors
///
/// Returns [`Error::ParseDelimiterFailed`] on a token-count mismatch, or
/// [`Error::TypeConversionFailed`] if a token fails conversion.
pub fn parse_delimited_line(
    line: &str,
    field_defs: &[FieldDefinition],
    delimiter: &str,
    line_number: usize,
) -> Result<Record> {
    let tokens: Vec<&str> = line.split(delimiter).collect();
    if tokens.len() != field_defs.len() {
        return Err(Error::ParseDelimiterFailed {
            line_number,
            found_tokens: tokens.len(),
            expected_tokens: field_defs.len(),
        });
    }

    let mut record = Record::with_capacity(field_defs.len());
    for (field, token) in field_defs.iter().zip(tokens) {
        let value = convert::convert(token, field.field_type, &field.field_name, line_number)?;
        record.push(field.field_name.clone(), value);
    }
    Ok(record)
}

/// Parse one fixed-width line into a [`Record`].
///
/// Positions and lengths are measured in display columns: each character
/// contributes a width of 1 for standard glyphs, 2 for East-Asian wide
/// glyphs, and 1 for any control or ambiguous-width character. Extraction
/// walks the line character-by-character, accumulating display width into
/// the current field while doing so keeps it within `field_length`; the
/// remaining advance then fills any trailing partial display column before
/// moving to the next field.
///
/// # Errors
///
/// Returns [`Error::ParseFixedLengthFailed`] if the line's remaining
/// content is shorter than a field's required display span, or
/// [`Error::TypeConversionFailed`] if an extracted token fails conversion.
pub fn parse_fixed_length_line(
    line: &str,
    field_defs: &[FieldDefinition],
    line_number: usize,
) -> Result<Record> {
    let chars: Vec<char> = line.chars().collect();
    let mut cursor = 0usize;
    let mut record = Record::with_capacity(field_defs.len());

    for field in field_defs {
        let field_length = usize::try_from(field.field_length).unwrap_or(0);
        let field_not_found = || Error::ParseFixedLengthFailed {
            line_number,
            field_name: field.field_name.clone(),
        };

        let remaining_width: usize = chars[cursor..].iter().copied().map(display_width).sum();
        if remaining_width < field_length {
            return Err(field_not_found());
        }

        let mut value = String::new();
        let mut width = 0usize;
        let mut index = cursor;

        while width < field_length && index < chars.len() {
            let ch = chars[index];
            let char_width = display_width(ch);
            if width + char_width > field_length {
                break;
            }
            value.push(ch);
            width += char_width;
            index += 1;
        }

        // Advance the cursor the full field span, consuming any trailing
        // partial display column the capture loop above stopped short of.
        let mut advance_width = width;
        let mut advance_index = index;
        while advance_index < chars.len() && advance_width < field_length {
            let char_width = display_width(chars[advance_index]);
            advance_width += char_width;
            advance_index += 1;
        }
        cursor = advance_index;

        let trimmed = value.trim();
        let converted = convert::convert(trimmed, field.field_type, &field.field_name, line_number)?;
        record.push(field.field_name.clone(), converted);
    }

    Ok(record)
}

fn display_width(ch: char) -> usize {
    ch.width().unwrap_or(1)
}

/// Strategy a file's parser uses to split each line into fields.
#[derive(Clone)]
pub enum Strategy {
    /// Split on an exact delimiter string.
    Delimited {
        /// Delimiter the file declares.
        delimiter: String,
    },
    /// Extract fixed display-column spans.
    FixedLength,
}

/// Build the lazy record stream over a decoded text buffer.
///
/// The stream consumes one line, emits one record, and discards the line —
/// the full input is never materialised. Blank (whitespace-only) lines are
/// skipped silently. Finite and non-restartable.
pub fn parse_stream(
    text: String,
    field_defs: Vec<FieldDefinition>,
    strategy: Strategy,
) -> Box<dyn Iterator<Item = Result<Record>> + Send> {
    let lines = std::io::Cursor::new(text.into_bytes());
    Box::new(
        lines
            .lines()
            .enumerate()
            .filter_map(move |(index, line)| {
                let line_number = index + 1;
                let line = match line {
                    Ok(line) => line,
                    Err(source) => {
                        return Some(Err(Error::FileReadFailed {
                            path: format!("line {line_number}"),
                            source: source.into(),
                        }));
                    }
                };

                if line.trim().is_empty() {
                    return None;
                }

                let result = match &strategy {
                    Strategy::Delimited { delimiter } => {
                        parse_delimited_line(&line, &field_defs, delimiter, line_number)
                    }
                    Strategy::FixedLength => {
                        parse_fixed_length_line(&line, &field_defs, line_number)
                    }
                };
                Some(result)
            }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use transformat_data::{FieldType, TransformType};

    fn field(name: &str, field_type: FieldType, start: i32, length: i32) -> FieldDefinition {
        FieldDefinition {
            id: 1,
            file_name: "sample.txt".to_string(),
            field_name: name.to_string(),
            sequence: 1,
            field_type,
            start_position: start,
            field_length: length,
            transform_type: TransformType::Plain,
        }
    }

    #[test]
    fn delimited_line_mismatched_token_count_fails() {
        let defs = vec![field("a", FieldType::String, 0, 0), field("b", FieldType::String, 0, 0)];
        let err = parse_delimited_line("only-one", &defs, ",", 3).unwrap_err();
        assert_eq!(err.code(), "PARSE_DELIMITER_FAILED");
    }

    #[test]
    fn delimited_line_converts_each_token_in_order() {
        let defs = vec![
            field("id", FieldType::Int, 0, 0),
            field("name", FieldType::String, 0, 0),
        ];
        let record = parse_delimited_line("42,Ada", &defs, ",", 1).unwrap();
        let values: Vec<_> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(values, vec!["id", "name"]);
    }

    #[test]
    fn fixed_width_captures_wide_glyphs_as_two_columns() {
        // "AB" occupies 2 columns, "中" occupies 2 columns on its own.
        let defs = vec![
            field("ascii", FieldType::String, 0, 2),
            field("wide", FieldType::String, 2, 2),
        ];
        let record = parse_fixed_length_line("AB中", &defs, 1).unwrap();
        let mut iter = record.iter();
        let (_, ascii) = iter.next().unwrap();
        let (_, wide) = iter.next().unwrap();
        assert_eq!(ascii, &crate::record::Value::String("AB".to_string()));
        assert_eq!(wide, &crate::record::Value::String("中".to_string()));
    }

    #[test]
    fn fixed_width_line_shorter_than_required_span_fails() {
        let defs = vec![field("a", FieldType::String, 0, 10)];
        let err = parse_fixed_length_line("", &defs, 2).unwrap_err();
        assert_eq!(err.code(), "PARSE_FIXED_LENGTH_FAILED");
    }

    #[test]
    fn stream_skips_blank_lines_and_is_lazy() {
        let defs = vec![field("id", FieldType::Int, 0, 0)];
        let text = "1\n\n   \n2\n".to_string();
        let records: Vec<_> = parse_stream(text, defs, Strategy::Delimited { delimiter: ",".into() })
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(records.len(), 2);
    }
}
