//! Display formats for fixed-width textual rendering.
//!
//! A [`DisplayFormat`] is a `(width, kind)` pair such as `(25, ".17e")`,
//! written `25.17e`. The kind holds an optional precision and a printf-style
//! conversion character:
//!
//! | Conversion | Meaning                         |
//! |------------|---------------------------------|
//! | `i`, `d`   | integer                         |
//! | `e`, `E`   | exponential (`1.5e+00`)         |
//! | `f`, `F`   | fixed point                     |
//! | `g`, `G`   | shortest of fixed / exponential |
//! | `s`        | string                          |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::element::ElementType;
use crate::error::{ModelError, Result};
use crate::value::Value;

const DEFAULT_PRECISION: usize = 6;

/// Width and kind used to render a column as fixed-width text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayFormat {
    pub width: usize,
    pub kind: String,
}

impl DisplayFormat {
    pub fn new(width: usize, kind: impl Into<String>) -> Self {
        Self {
            width,
            kind: kind.into(),
        }
    }

    /// Parse a format such as `25.17e`, `12i`, or `s`.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let digits = spec.chars().take_while(char::is_ascii_digit).count();
        let (width, kind) = spec.split_at(digits);
        let width = if width.is_empty() {
            0
        } else {
            width
                .parse()
                .map_err(|_| ModelError::invalid_format(spec))?
        };
        let format = Self::new(width, kind);
        if format.conversion().is_none() {
            return Err(ModelError::invalid_format(spec));
        }
        if let Some(precision) = kind.strip_prefix('.') {
            let digits = &precision[..precision.len().saturating_sub(1)];
            if digits.is_empty() || digits.parse::<usize>().is_err() {
                return Err(ModelError::invalid_format(spec));
            }
        } else if kind.len() != 1 {
            return Err(ModelError::invalid_format(spec));
        }
        Ok(format)
    }

    /// Default format for an element type.
    pub fn default_for(element_type: ElementType) -> Self {
        match element_type {
            ElementType::Bool => Self::new(1, "i"),
            ElementType::Int8 | ElementType::UInt8 => Self::new(3, "i"),
            ElementType::Int16 | ElementType::UInt16 => Self::new(5, "i"),
            ElementType::Int32 | ElementType::UInt32 => Self::new(12, "i"),
            ElementType::Int64 => Self::new(22, "i"),
            ElementType::UInt64 => Self::new(23, "i"),
            ElementType::Float32 => Self::new(16, ".8e"),
            ElementType::Float64 => Self::new(25, ".17e"),
            ElementType::Str(width) => Self::new(width, "s"),
        }
    }

    /// Conversion character, if the kind ends in a known one.
    pub fn conversion(&self) -> Option<char> {
        let last = self.kind.chars().last()?;
        matches!(last, 'i' | 'd' | 'e' | 'E' | 'f' | 'F' | 'g' | 'G' | 's').then_some(last)
    }

    pub fn precision(&self) -> Option<usize> {
        let body = self.kind.strip_prefix('.')?;
        body.get(..body.len().saturating_sub(1))?.parse().ok()
    }

    pub fn is_string(&self) -> bool {
        self.conversion() == Some('s')
    }

    /// Render a value right-justified to the format width.
    pub fn render(&self, value: &Value) -> String {
        let text = self.render_unpadded(value);
        format!("{text:>width$}", width = self.width)
    }

    /// Render a value without padding.
    pub fn render_unpadded(&self, value: &Value) -> String {
        if let Value::Array(values) = value {
            return values
                .iter()
                .map(|v| self.render_unpadded(v))
                .collect::<Vec<_>>()
                .join(" ");
        }
        let precision = self.precision().unwrap_or(DEFAULT_PRECISION);
        match (self.conversion().unwrap_or('s'), value) {
            (_, Value::Str(s)) => s.clone(),
            ('i' | 'd', Value::Float32(_) | Value::Float64(_)) => {
                let x = value.as_f64().unwrap_or(f64::NAN);
                if x.is_finite() {
                    format!("{}", x.trunc() as i64)
                } else {
                    non_finite(x, false)
                }
            }
            ('i' | 'd', Value::Bool(v)) => format!("{}", u8::from(*v)),
            ('i' | 'd' | 's', other) => other.to_string(),
            (conv @ ('e' | 'E'), other) => match other.as_f64() {
                Some(x) => format_exponential(x, precision, conv == 'E'),
                None => other.to_string(),
            },
            (conv @ ('f' | 'F'), other) => match other.as_f64() {
                Some(x) if x.is_finite() => format!("{x:.precision$}"),
                Some(x) => non_finite(x, conv == 'F'),
                None => other.to_string(),
            },
            (conv @ ('g' | 'G'), other) => match other.as_f64() {
                Some(x) => format_general(x, precision, conv == 'G'),
                None => other.to_string(),
            },
            (_, other) => other.to_string(),
        }
    }
}

impl fmt::Display for DisplayFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.width, self.kind)
    }
}

fn non_finite(x: f64, upper: bool) -> String {
    let text = if x.is_nan() {
        "nan"
    } else if x.is_sign_negative() {
        "-inf"
    } else {
        "inf"
    };
    if upper {
        text.to_uppercase()
    } else {
        text.to_string()
    }
}

/// printf-style `%.<precision>e`: at least two exponent digits, explicit sign.
pub fn format_exponential(x: f64, precision: usize, upper: bool) -> String {
    if !x.is_finite() {
        return non_finite(x, upper);
    }
    let raw = format!("{x:.precision$e}");
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return raw;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let marker = if upper { 'E' } else { 'e' };
    format!("{mantissa}{marker}{sign}{:02}", exponent.abs())
}

/// printf-style `%.<precision>g`.
pub fn format_general(x: f64, precision: usize, upper: bool) -> String {
    if !x.is_finite() {
        return non_finite(x, upper);
    }
    let precision = precision.max(1);
    let exponent = if x == 0.0 {
        0
    } else {
        let raw = format!("{:.*e}", precision - 1, x);
        raw.split_once('e')
            .and_then(|(_, exp)| exp.parse::<i32>().ok())
            .unwrap_or(0)
    };
    if exponent < -4 || exponent >= precision as i32 {
        let formatted = format_exponential(x, precision - 1, upper);
        let marker = if upper { 'E' } else { 'e' };
        match formatted.split_once(marker) {
            Some((mantissa, exp)) => {
                format!("{}{marker}{exp}", strip_fraction_zeros(mantissa))
            }
            None => formatted,
        }
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        strip_fraction_zeros(&format!("{x:.decimals$}")).to_string()
    }
}

fn strip_fraction_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
