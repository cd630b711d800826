//! Integer literal parsing and quote-aware string splitting.
//!
//! Mirrors the small set of helpers the original Python implementation
//! keeps in `validators.py`: decimal/hex/binary literals, the `NNbits`
//! mnemonics, and a splitter that treats `'...'`/`"..."` runs as opaque so
//! that delimiters inside quoted arguments aren't split on.
//!
//! Every integer in this crate (argument values, burst durations, rule
//! operands) is an `i128`. The Python source operates on Python's
//! arbitrary-precision `int`; `i128` is the closest practical Rust
//! equivalent that still comfortably holds the `64bits` mnemonic
//! (`2^64 - 1`) as a positive value, which a 64-bit signed type cannot.

use crate::error::{RemoteProtoError, Result};

/// `8bits` through `64bits`, each meaning `2^N - 1`.
const BIT_MNEMONICS: &[(&str, i128)] = &[
    ("8bits", 0xFF),
    ("16bits", 0xFFFF),
    ("24bits", 0xFF_FFFF),
    ("32bits", 0xFFFF_FFFF),
    ("40bits", 0xFF_FFFF_FFFF),
    ("48bits", 0xFFFF_FFFF_FFFF),
    ("56bits", 0xFF_FFFF_FFFF_FFFF),
    ("64bits", 0xFFFF_FFFF_FFFF_FFFF),
];

/// Parses a single integer literal: decimal, `0x...`, `0b...`, or one of the
/// `NNbits` mnemonics. A leading `-` is honored for any base.
pub fn parse_integer(raw: &str) -> Result<i128> {
    let text = remove_quotes(raw.trim());

    if let Some((_, value)) = BIT_MNEMONICS.iter().find(|(name, _)| *name == text) {
        return Ok(*value);
    }

    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (base, digits) = if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (16, rest)
    } else if let Some(rest) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        (2, rest)
    } else {
        (10, text)
    };

    let magnitude = i128::from_str_radix(digits, base).map_err(|_| {
        RemoteProtoError::CommandParse {
            command: raw.to_string(),
            message: format!("cannot parse '{raw}' as an integer"),
            signature: String::new(),
        }
    })?;

    Ok(if negative { -magnitude } else { magnitude })
}

/// Strips a single layer of matching leading/trailing `'` or `"` quotes.
/// Any other value passes through unchanged.
pub fn remove_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'\'' || first == b'"') && first == last {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Splits `text` on `delimiter`, treating any run inside matching `'`/`"`
/// quotes as opaque so delimiters embedded in a quoted argument don't split
/// it. Consecutive delimiters yield empty strings; surrounding whitespace on
/// each piece is trimmed.
pub fn quoted_split(text: &str, delimiter: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in text.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                    current.push(c);
                } else if c == delimiter {
                    parts.push(std::mem::take(&mut current).trim().to_string());
                } else {
                    current.push(c);
                }
            }
        }
    }
    parts.push(current.trim().to_string());

    parts
        .into_iter()
        .map(|p| remove_quotes(&p).to_string())
        .collect()
}

/// Validates that consecutive non-zero elements alternate sign. Used both
/// by catalogue timing-slot validation and by the `duration` raw codec.
pub fn alternating_signs(values: &[i128]) -> std::result::Result<(), String> {
    for i in 1..values.len() {
        if values[i] != 0 && values[i - 1] != 0 && values[i].signum() == values[i - 1].signum() {
            return Err(format!(
                "values must alternate between positive and negative, see index {} and {}",
                i - 1,
                i
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_hex_binary() {
        assert_eq!(parse_integer("42").unwrap(), 42);
        assert_eq!(parse_integer("0x2A").unwrap(), 42);
        assert_eq!(parse_integer("0b101010").unwrap(), 42);
        assert_eq!(parse_integer("-0x10").unwrap(), -16);
    }

    #[test]
    fn parses_bit_mnemonics() {
        assert_eq!(parse_integer("8bits").unwrap(), 0xFF);
        assert_eq!(parse_integer("32bits").unwrap(), 0xFFFF_FFFF);
        assert_eq!(parse_integer("64bits").unwrap(), 0xFFFF_FFFF_FFFF_FFFFi128);
    }

    #[test]
    fn quoted_split_respects_quotes() {
        let parts = quoted_split("nec:0x04:'a:b':0x08", ':');
        assert_eq!(parts, vec!["nec", "0x04", "a:b", "0x08"]);
    }

    #[test]
    fn quoted_split_empty_fields() {
        let parts = quoted_split("a,,b", ',');
        assert_eq!(parts, vec!["a", "", "b"]);
    }

    #[test]
    fn alternating_signs_accepts_good_and_rejects_bad() {
        assert!(alternating_signs(&[100, -200, 100, -200]).is_ok());
        assert!(alternating_signs(&[100, 200]).is_err());
    }
}
