//! Payload splitting/joining and fixed-width numeric parse/format.
//!
//! A payload is a `:`-separated sequence of text parts. A literal `:`
//! inside a part is escaped by doubling it (`::`). An empty part is
//! encoded as a single space.

use crate::error::{Error, ErrorCode, Result};

/// Numeric wire-width aliases, matching the teacher's primitive-type
/// convention; these carry no validation beyond what the underlying
/// integer type already gives for free.
/// Unsigned 8-bit wire integer.
pub type U8 = u8;
/// Unsigned 16-bit wire integer.
pub type U16 = u16;
/// Signed 32-bit wire integer.
pub type I32 = i32;
/// Unsigned 64-bit wire integer.
pub type U64 = u64;

const EMPTY_PART: &str = " ";

/// Splits `s` on `sep`, undoing doubled-separator escaping.
///
/// `max_parts` bounds the number of returned parts; exceeding it is an
/// overflow error. If `trim` is set, leading/trailing ASCII whitespace
/// is stripped from each part *before* un-escaping.
pub fn split(s: &str, sep: char, max_parts: usize, trim: bool) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == sep {
            if chars.peek() == Some(&sep) {
                // Escaped separator: consume the second one and keep a
                // literal separator in the current part.
                chars.next();
                current.push(sep);
            } else {
                push_part(&mut parts, &current, max_parts)?;
                current.clear();
            }
        } else {
            current.push(c);
        }
    }
    push_part(&mut parts, &current, max_parts)?;

    if trim {
        for p in &mut parts {
            let trimmed = p.trim().to_string();
            *p = trimmed;
        }
    }

    for p in &mut parts {
        if p == EMPTY_PART {
            p.clear();
        }
    }

    Ok(parts)
}

fn push_part(parts: &mut Vec<String>, current: &str, max_parts: usize) -> Result<()> {
    if parts.len() >= max_parts {
        return Err(Error::fatal(ErrorCode::PayloadOverflow));
    }
    parts.push(current.to_string());
    Ok(())
}

/// Joins `parts` with `sep`, escaping a literal `sep` in each part by
/// doubling it, and substituting a single space for an empty part.
///
/// Fails if the joined result would exceed `max_length`, or if a part
/// contains the message terminator byte (`\n`), which cannot be escaped
/// on the wire.
pub fn join(parts: &[impl AsRef<str>], sep: char, max_length: usize) -> Result<String> {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        let part = part.as_ref();
        if part.contains('\n') {
            return Err(Error::fatal(ErrorCode::TerminatorInPayload));
        }
        if i > 0 {
            out.push(sep);
        }
        if part.is_empty() {
            out.push_str(EMPTY_PART);
        } else {
            for c in part.chars() {
                if c == sep {
                    out.push(sep);
                    out.push(sep);
                } else {
                    out.push(c);
                }
            }
        }
        if out.len() > max_length {
            return Err(Error::fatal(ErrorCode::PayloadOverflow));
        }
    }
    Ok(out)
}

/// Parses a decimal, fixed-width unsigned integer. Rejects non-digit
/// characters and values that overflow `u8`.
pub fn parse_u8(s: &str) -> Result<U8> {
    s.parse::<u8>()
        .map_err(|_| Error::request(ErrorCode::ProtocolError))
}

/// Parses a decimal, fixed-width unsigned integer. Rejects non-digit
/// characters and values that overflow `u16`.
pub fn parse_u16(s: &str) -> Result<U16> {
    s.parse::<u16>()
        .map_err(|_| Error::request(ErrorCode::ProtocolError))
}

/// Parses a decimal, signed integer. Rejects non-digit characters (other
/// than a leading `-`) and values that overflow `i32`.
pub fn parse_i32(s: &str) -> Result<I32> {
    s.parse::<i32>()
        .map_err(|_| Error::request(ErrorCode::ProtocolError))
}

/// Parses a decimal, fixed-width unsigned integer. Rejects non-digit
/// characters and values that overflow `u64`.
pub fn parse_u64(s: &str) -> Result<U64> {
    s.parse::<u64>()
        .map_err(|_| Error::request(ErrorCode::ProtocolError))
}

/// Formats any of the fixed-width wire integers in decimal, matching
/// what `parse_*` accepts.
pub fn format_num(n: impl std::fmt::Display) -> String {
    n.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_basic() {
        let parts = split("gDS:D1", ':', 8, false).unwrap();
        assert_eq!(parts, vec!["gDS", "D1"]);
    }

    #[test]
    fn split_escaped_separator() {
        let parts = split("a::b:c", ':', 8, false).unwrap();
        assert_eq!(parts, vec!["a:b", "c"]);
    }

    #[test]
    fn split_empty_part_is_space_sentinel() {
        let parts = split("a: :c", ':', 8, false).unwrap();
        assert_eq!(parts, vec!["a", "", "c"]);
    }

    #[test]
    fn split_overflow() {
        let err = split("a:b:c", ':', 2, false).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PayloadOverflow));
    }

    #[test]
    fn join_roundtrip() {
        let parts = vec!["a:b".to_string(), "".to_string(), "c".to_string()];
        let joined = join(&parts, ':', 512).unwrap();
        assert_eq!(joined, "a::b: :c");
        let back = split(&joined, ':', 8, false).unwrap();
        assert_eq!(back, parts);
    }

    #[test]
    fn join_rejects_terminator() {
        let parts = vec!["a\nb".to_string()];
        let err = join(&parts, ':', 512).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::TerminatorInPayload));
    }

    #[test]
    fn numeric_parse_rejects_garbage() {
        assert!(parse_u8("12x").is_err());
        assert!(parse_u16("-1").is_err());
        assert!(parse_u8("256").is_err());
    }

    #[test]
    fn numeric_parse_accepts_valid() {
        assert_eq!(parse_u8("255").unwrap(), 255);
        assert_eq!(parse_i32("-42").unwrap(), -42);
    }
}
