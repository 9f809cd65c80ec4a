//! Conversion between raw record bytes, typed field values and user text.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::schema::{DecodeKind, FieldDescriptor, max_unsigned};

/// Decoded value of one field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Signed(i64),
    Unsigned(u64),
    Flag(bool),
    Enum { raw: u64, label: Option<Arc<str>> },
    Pointer(u64),
    Float(f64),
}

impl FieldValue {
    /// Value equality; floats match when within `epsilon` of each other.
    pub fn approx_eq(&self, other: &FieldValue, epsilon: f64) -> bool {
        match (self, other) {
            (FieldValue::Float(a), FieldValue::Float(b)) => {
                a == b || (a - b).abs() <= epsilon || (a.is_nan() && b.is_nan())
            }
            (FieldValue::Enum { raw: a, .. }, FieldValue::Enum { raw: b, .. }) => a == b,
            _ => self == other,
        }
    }

    /// Raw integer view, used for the alive check
    pub fn is_zero(&self) -> bool {
        match self {
            FieldValue::Signed(v) => *v == 0,
            FieldValue::Unsigned(v) | FieldValue::Pointer(v) => *v == 0,
            FieldValue::Flag(v) => !v,
            FieldValue::Enum { raw, .. } => *raw == 0,
            FieldValue::Float(v) => *v == 0.0,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Signed(v) => write!(f, "{}", v),
            FieldValue::Unsigned(v) => write!(f, "{}", v),
            FieldValue::Flag(v) => write!(f, "{}", v),
            FieldValue::Enum {
                label: Some(label), ..
            } => write!(f, "{}", label),
            FieldValue::Enum { raw, label: None } => write!(f, "{}", raw),
            FieldValue::Pointer(v) => write!(f, "{:#010X}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
        }
    }
}

fn le_unsigned(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

fn sign_extend(raw: u64, width: u8) -> i64 {
    let shift = 64 - width as u32 * 8;
    ((raw << shift) as i64) >> shift
}

/// Decode `field` out of a full record buffer.
pub fn decode_field(field: &FieldDescriptor, record: &[u8]) -> Result<FieldValue> {
    let bytes = record.get(field.span()).ok_or_else(|| {
        Error::InvalidSchema(format!(
            "{} at {:#x} exceeds a {}-byte record",
            field.name,
            field.offset,
            record.len()
        ))
    })?;
    decode_bytes(field, bytes)
}

/// Decode the exact bytes of one field.
pub fn decode_bytes(field: &FieldDescriptor, bytes: &[u8]) -> Result<FieldValue> {
    if bytes.len() != field.width as usize {
        return Err(Error::InvalidSchema(format!(
            "{} expects {} bytes, got {}",
            field.name,
            field.width,
            bytes.len()
        )));
    }

    let raw = le_unsigned(bytes);
    let value = match field.kind {
        DecodeKind::Signed => FieldValue::Signed(sign_extend(raw, field.width)),
        DecodeKind::Unsigned => FieldValue::Unsigned(raw),
        DecodeKind::Flag => FieldValue::Flag(raw != 0),
        DecodeKind::Enum => FieldValue::Enum {
            raw,
            label: field.variant_label(raw).map(Arc::from),
        },
        DecodeKind::Pointer => FieldValue::Pointer(raw),
        DecodeKind::Float => match field.width {
            4 => FieldValue::Float(f32::from_bits(raw as u32) as f64),
            _ => FieldValue::Float(f64::from_bits(raw)),
        },
    };
    Ok(value)
}

/// Parse user text into the little-endian bytes of `field`.
///
/// Nothing is written anywhere; a value that does not fit the field's width
/// or kind is rejected with [`Error::Validation`].
pub fn encode_text(field: &FieldDescriptor, text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    let invalid = |message: String| Error::Validation {
        field: field.name.clone(),
        message,
    };
    if text.is_empty() {
        return Err(invalid("value is empty".to_string()));
    }

    let width = field.width;
    let max = max_unsigned(width);

    let raw: u64 = match field.kind {
        DecodeKind::Signed => {
            let value = parse_signed(text)
                .ok_or_else(|| invalid(format!("{:?} is not an integer", text)))?;
            let bits = width as u32 * 8;
            let (min, max) = if bits >= 64 {
                (i64::MIN, i64::MAX)
            } else {
                (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
            };
            if value < min || value > max {
                return Err(invalid(format!(
                    "{} is outside {}..={} for a {}-byte signed field",
                    value, min, max, width
                )));
            }
            value as u64
        }
        DecodeKind::Unsigned | DecodeKind::Pointer => {
            let value = parse_unsigned(text)
                .ok_or_else(|| invalid(format!("{:?} is not a non-negative integer", text)))?;
            check_unsigned(value, max, width).map_err(invalid)?
        }
        DecodeKind::Flag => match parse_flag(text) {
            Some(flag) => flag as u64,
            None => return Err(invalid(format!("{:?} is not a flag value", text))),
        },
        DecodeKind::Enum => {
            let value = match field.variant_value(text) {
                Some(value) => value,
                None => parse_unsigned(text)
                    .ok_or_else(|| invalid(format!("{:?} is not a known variant", text)))?,
            };
            check_unsigned(value, max, width).map_err(invalid)?
        }
        DecodeKind::Float => {
            let value: f64 = text
                .parse()
                .map_err(|_| invalid(format!("{:?} is not a number", text)))?;
            if !value.is_finite() {
                return Err(invalid("value must be finite".to_string()));
            }
            if width == 4 {
                if value.abs() > f32::MAX as f64 {
                    return Err(invalid(format!("{} does not fit in a 4-byte float", value)));
                }
                (value as f32).to_bits() as u64
            } else {
                value.to_bits()
            }
        }
    };

    Ok(raw.to_le_bytes()[..width as usize].to_vec())
}

fn check_unsigned(value: u64, max: u64, width: u8) -> std::result::Result<u64, String> {
    if value > max {
        Err(format!(
            "{} exceeds the {}-byte maximum of {}",
            value, width, max
        ))
    } else {
        Ok(value)
    }
}

fn parse_unsigned(text: &str) -> Option<u64> {
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

fn parse_signed(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = parse_unsigned(digits)?;
    if negative {
        if magnitude == 1u64 << 63 {
            Some(i64::MIN)
        } else {
            i64::try_from(magnitude).ok().map(|v| -v)
        }
    } else {
        i64::try_from(magnitude).ok()
    }
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
