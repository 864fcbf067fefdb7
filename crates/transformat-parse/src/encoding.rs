//! Trial-decode encoding detection and consistency verification.

use transformat_errors::{Error, Result};

/// Candidates tried, in order, by [`detect`].
const CANDIDATES: &[(&str, &encoding_rs::Encoding)] =
    &[("utf-8", encoding_rs::UTF_8), ("big5", encoding_rs::BIG5)];

/// Detect the encoding of `content` by trying each candidate in a fixed
/// order and returning the first that decodes the entire buffer without
/// error. Purely trial-decode; no statistical heuristics.
///
/// # Errors
///
/// Returns [`Error::EncodingDetectionFailed`] if no candidate decodes the
/// buffer cleanly.
pub fn detect(content: &[u8], task_id: &str) -> Result<&'static str> {
    for (label, encoding) in CANDIDATES {
        if decodes_cleanly(content, encoding) {
            tracing::info!(task_id, encoding = *label, "encoding detected");
            return Ok(label);
        }
    }

    tracing::error!(task_id, "encoding detection failed for all candidates");
    Err(Error::EncodingDetectionFailed {
        task_id: task_id.to_string(),
    })
}

/// Verify that `content` decodes cleanly under `expected_encoding`
/// (one of the labels returned by [`detect`]).
///
/// # Errors
///
/// Returns [`Error::EncodingMixed`] if the buffer cannot be decoded by the
/// expected encoding.
pub fn validate_consistency(content: &[u8], expected_encoding: &str, task_id: &str) -> Result<()> {
    let encoding = encoding_rs::Encoding::for_label(expected_encoding.as_bytes())
        .unwrap_or(encoding_rs::UTF_8);

    if decodes_cleanly(content, encoding) {
        tracing::debug!(task_id, expected_encoding, "encoding consistency verified");
        Ok(())
    } else {
        tracing::error!(task_id, expected_encoding, "encoding consistency check failed");
        Err(Error::EncodingMixed {
            expected: expected_encoding.to_string(),
        })
    }
}

/// Decode `content` as `encoding_label` (one of the labels returned by
/// [`detect`]) into an owned `String`.
///
/// # Errors
///
/// Returns [`Error::EncodingMixed`] if the buffer does not decode cleanly
/// under the named encoding.
pub fn decode(content: &[u8], encoding_label: &str, task_id: &str) -> Result<String> {
    let encoding = encoding_rs::Encoding::for_label(encoding_label.as_bytes())
        .unwrap_or(encoding_rs::UTF_8);

    let (text, _, had_errors) = encoding.decode(content);
    if had_errors {
        tracing::error!(task_id, encoding_label, "decode failed after detection");
        return Err(Error::EncodingMixed {
            expected: encoding_label.to_string(),
        });
    }
    Ok(text.into_owned())
}

fn decodes_cleanly(content: &[u8], encoding: &'static encoding_rs::Encoding) -> bool {
    let (_, _, had_errors) = encoding.decode(content);
    !had_errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_plain_ascii_as_utf8() {
        assert_eq!(detect(b"hello,world", "task-1").unwrap(), "utf-8");
    }

    #[test]
    fn detects_big5_when_not_valid_utf8() {
        // 0xA4 0x40 is a valid Big5 sequence but not valid UTF-8.
        let bytes = [0xA4, 0x40];
        assert_eq!(detect(&bytes, "task-2").unwrap(), "big5");
    }

    #[test]
    fn fails_when_no_candidate_decodes() {
        // An unpaired leading UTF-8 continuation byte is invalid in both.
        let bytes = [0xFF, 0xFE, 0x00, 0x01];
        assert!(detect(&bytes, "task-3").is_err());
    }

    #[test]
    fn consistency_check_rejects_mismatched_encoding() {
        let bytes = [0xA4, 0x40];
        assert!(validate_consistency(&bytes, "utf-8", "task-4").is_err());
        assert!(validate_consistency(&bytes, "big5", "task-4").is_ok());
    }

    #[test]
    fn decode_round_trips_utf8_text() {
        assert_eq!(decode(b"hello,world", "utf-8", "task-5").unwrap(), "hello,world");
    }

    #[test]
    fn decode_rejects_a_buffer_that_does_not_match_the_named_encoding() {
        let bytes = [0xA4, 0x40];
        assert!(decode(&bytes, "utf-8", "task-6").is_err());
    }
}
