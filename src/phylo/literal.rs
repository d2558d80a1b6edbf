use crate::TreeFloat;
use crate::TreeInt;

use num::BigInt;
use num::Zero;
use num::traits::ToPrimitive;
use std::fmt::Debug;
use std::fmt::Display;
use std::str::FromStr;

/// Exponents beyond this magnitude are not expanded into a [BigDecimal].
const MAX_DECIMAL_EXPONENT: i64 = 100_000;

// =============================================================================
// Type definitions
// =============================================================================

/// Typed value of a literal metadata entry.
#[derive(Clone, PartialEq)]
pub enum LiteralValue {
    Integer(TreeInt),
    Decimal(TreeFloat),
    /// Finite decimal literal too large (or too precise in magnitude) for
    /// [TreeFloat].
    BigDecimal(BigDecimal),
    Text(String),
    List(Vec<LiteralValue>),
}

/// Type signature of a [LiteralValue].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LiteralType {
    Integer,
    Decimal,
    BigDecimal,
    Text,
    List,
}

/// Arbitrary-precision decimal: `digits * 10^(-scale)`.
///
/// Trailing zeros of `digits` are always folded into `scale`, so equal
/// values compare equal.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BigDecimal {
    digits: BigInt,
    scale: i64,
}

/// Converts literal values to and from their textual hot-comment form.
///
/// Readers call [parse](LiteralTranslator::parse) for every unquoted value
/// token; writers call [format](LiteralTranslator::format) for every
/// scalar value. Quoting and list syntax stay with the caller.
pub trait LiteralTranslator: Send + Sync {
    fn parse(&self, text: &str) -> LiteralValue;
    fn format(&self, value: &LiteralValue) -> String;
}

/// Numeric-first translation: integers, then decimals, then
/// [BigDecimal] for finite literals that overflow [TreeFloat], then text.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLiteralTranslator;

// =============================================================================
// Helper functions
// =============================================================================

/// Check if a string is a plain decimal literal: optional sign, digits with
/// an optional fraction, optional exponent.
fn is_decimal_literal(s: &str) -> bool {
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(pos) => (&s[..pos], Some(&s[pos + 1..])),
        None => (s, None),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return false;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return false;
    }

    match exponent {
        None => true,
        Some(exponent) => {
            let exponent =
                exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
            !exponent.is_empty() && exponent.chars().all(|c| c.is_ascii_digit())
        }
    }
}

// =============================================================================
// LiteralValue implementations
// =============================================================================

impl LiteralValue {
    pub fn get_type(&self) -> LiteralType {
        match self {
            LiteralValue::Integer(_) => LiteralType::Integer,
            LiteralValue::Decimal(_) => LiteralType::Decimal,
            LiteralValue::BigDecimal(_) => LiteralType::BigDecimal,
            LiteralValue::Text(_) => LiteralType::Text,
            LiteralValue::List(_) => LiteralType::List,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            LiteralValue::Integer(_)
                | LiteralValue::Decimal(_)
                | LiteralValue::BigDecimal(_)
        )
    }

    pub fn as_f64(&self) -> Option<TreeFloat> {
        match self {
            LiteralValue::Integer(integer) => Some(*integer as TreeFloat),
            LiteralValue::Decimal(decimal) => Some(*decimal),
            _ => None,
        }
    }
}

impl Debug for LiteralValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(arg0) => {
                f.debug_tuple("Integer").field(arg0).finish()
            }
            Self::Decimal(arg0) => {
                f.debug_tuple("Decimal").field(arg0).finish()
            }
            Self::BigDecimal(arg0) => {
                f.debug_tuple("BigDecimal").field(&arg0.to_string()).finish()
            }
            Self::Text(arg0) => f.debug_tuple("Text").field(arg0).finish(),
            Self::List(values) => f.debug_tuple("List").field(values).finish(),
        }
    }
}

impl Display for LiteralValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiteralValue::Integer(integer) => write!(f, "{integer}"),
            LiteralValue::Decimal(decimal) => write!(f, "{decimal:?}"),
            LiteralValue::BigDecimal(big) => write!(f, "{big}"),
            LiteralValue::Text(text) => write!(f, "{text}"),
            LiteralValue::List(values) => {
                let items: Vec<String> =
                    values.iter().map(|v| v.to_string()).collect();
                write!(f, "{{{}}}", items.join(","))
            }
        }
    }
}

impl From<&str> for LiteralValue {
    fn from(s: &str) -> Self {
        DefaultLiteralTranslator.parse(s)
    }
}

impl From<String> for LiteralValue {
    fn from(s: String) -> Self {
        s.as_str().into()
    }
}

impl From<TreeInt> for LiteralValue {
    fn from(integer: TreeInt) -> Self {
        LiteralValue::Integer(integer)
    }
}

impl From<TreeFloat> for LiteralValue {
    fn from(decimal: TreeFloat) -> Self {
        LiteralValue::Decimal(decimal)
    }
}

// =============================================================================
// BigDecimal implementations
// =============================================================================

impl BigDecimal {
    pub fn new(digits: BigInt, scale: i64) -> Self {
        let mut digits = digits;
        let mut scale = scale;
        let ten = BigInt::from(10);
        if digits.is_zero() {
            return Self { digits, scale: 0 };
        }
        while (&digits % &ten).is_zero() {
            digits /= &ten;
            scale -= 1;
        }
        Self { digits, scale }
    }

    pub fn digits(&self) -> &BigInt {
        &self.digits
    }

    pub fn scale(&self) -> i64 {
        self.scale
    }

    /// Lossy conversion; overflowing values become infinite.
    pub fn to_f64(&self) -> TreeFloat {
        self.to_string().parse().unwrap_or(TreeFloat::NAN)
    }
}

impl FromStr for BigDecimal {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_decimal_literal(s) {
            return Err(());
        }

        let (mantissa, exponent) = match s.find(['e', 'E']) {
            Some(pos) => (&s[..pos], &s[pos + 1..]),
            None => (s, "0"),
        };
        let exponent: i64 = exponent.parse().map_err(|_| ())?;
        if exponent.abs() > MAX_DECIMAL_EXPONENT {
            return Err(());
        }

        let (int_part, frac_part) =
            mantissa.split_once('.').unwrap_or((mantissa, ""));
        let digits: BigInt =
            format!("{int_part}{frac_part}").parse().map_err(|_| ())?;
        let frac_len = frac_part.len().to_i64().ok_or(())?;

        Ok(Self::new(digits, frac_len - exponent))
    }
}

impl Display for BigDecimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.scale == 0 {
            write!(f, "{}", self.digits)
        } else {
            write!(f, "{}E{}", self.digits, -self.scale)
        }
    }
}

// =============================================================================
// DefaultLiteralTranslator
// =============================================================================

impl LiteralTranslator for DefaultLiteralTranslator {
    fn parse(&self, text: &str) -> LiteralValue {
        let trimmed = text.trim();
        if !is_decimal_literal(trimmed) {
            return LiteralValue::Text(trimmed.to_owned());
        }

        if let Ok(integer) = trimmed.parse::<TreeInt>() {
            return LiteralValue::Integer(integer);
        }

        match trimmed.parse::<TreeFloat>() {
            Ok(decimal) if decimal.is_finite() => {
                LiteralValue::Decimal(decimal)
            }
            _ => match trimmed.parse::<BigDecimal>() {
                Ok(big) => LiteralValue::BigDecimal(big),
                Err(_) => LiteralValue::Text(trimmed.to_owned()),
            },
        }
    }

    fn format(&self, value: &LiteralValue) -> String {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_translator_parse() {
        let translator = DefaultLiteralTranslator;
        assert_eq!(translator.parse("42"), LiteralValue::Integer(42));
        assert_eq!(translator.parse("-0.5"), LiteralValue::Decimal(-0.5));
        assert_eq!(translator.parse("1e3"), LiteralValue::Decimal(1000.0));
        assert_eq!(
            translator.parse("Homo sapiens"),
            LiteralValue::Text("Homo sapiens".into())
        );
        // Textual specials are not numbers here.
        assert_eq!(translator.parse("inf"), LiteralValue::Text("inf".into()));
        assert_eq!(translator.parse("NaN"), LiteralValue::Text("NaN".into()));
    }

    #[test]
    fn test_overflowing_decimal_becomes_big_decimal() {
        let translator = DefaultLiteralTranslator;
        let value = translator.parse("1.50e400");
        match &value {
            LiteralValue::BigDecimal(big) => {
                assert_eq!(big.digits(), &BigInt::from(15));
                assert_eq!(big.scale(), -399);
                assert_eq!(big.to_string(), "15E399");
            }
            other => panic!("expected BigDecimal, got {other:?}"),
        }
        // Formatting and parsing again yields the same value.
        assert_eq!(translator.parse(&translator.format(&value)), value);
    }

    #[test]
    fn test_decimal_format_keeps_fraction_marker() {
        let translator = DefaultLiteralTranslator;
        let value = LiteralValue::Decimal(1.0);
        assert_eq!(translator.format(&value), "1.0");
        assert_eq!(translator.parse("1.0"), value);
    }

    #[test]
    fn test_is_decimal_literal() {
        assert!(is_decimal_literal("1"));
        assert!(is_decimal_literal(".5"));
        assert!(is_decimal_literal("5."));
        assert!(is_decimal_literal("+1.5E-7"));
        assert!(!is_decimal_literal("."));
        assert!(!is_decimal_literal("1e"));
        assert!(!is_decimal_literal("0x10"));
        assert!(!is_decimal_literal(""));
    }
}
