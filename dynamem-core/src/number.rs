//! Arbitrary-precision decimal numbers
//!
//! Numbers are stored as a canonical decimal string so that the precision
//! given by the caller survives round-trips through items, keys, and
//! expressions. Equality, ordering, and hashing all agree with numeric
//! value; arithmetic is exact digit-string arithmetic, never floating point.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Widest zero-padding allowed before rendering switches to exponent form.
const MAX_PLAIN_PADDING: i64 = 34;

/// Largest absolute base-10 exponent accepted from a literal.
const MAX_EXPONENT: i64 = 1_000_000;

/// Error for a literal that does not parse as a decimal number.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid number literal: {literal:?}")]
pub struct InvalidNumber {
    pub literal: String,
}

/// An arbitrary-precision signed decimal.
///
/// The canonical form is the shortest decimal string that round-trips:
/// `"1.0"` normalises to `"1"`, `"0.500"` to `"0.5"`, `"1e2"` to `"100"`,
/// `"-0"` to `"0"`. Magnitudes that would need more than 34 padding zeros
/// render in exponent form (`"1.2345E40"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number {
    /// Canonical rendering; what `as_str`, `Display`, and serde expose.
    canon: String,
    /// -1, 0, or 1.
    sign: i8,
    /// Significant digits, no leading or trailing zeros; empty iff zero.
    digits: String,
    /// Value is `0.digits * 10^point`.
    point: i64,
}

impl Number {
    /// Parse a decimal literal: `[+-]? digits [. digits]? ([eE][+-]?digits)?`.
    pub fn new(literal: &str) -> Result<Self, InvalidNumber> {
        let err = || InvalidNumber {
            literal: literal.to_string(),
        };

        let mut chars = literal.chars().peekable();

        let mut sign: i8 = 1;
        match chars.peek() {
            Some('-') => {
                sign = -1;
                chars.next();
            }
            Some('+') => {
                chars.next();
            }
            _ => {}
        }

        let mut digits = String::new();
        let mut int_len: i64 = 0;
        let mut saw_mantissa = false;

        while let Some(c) = chars.peek() {
            if c.is_ascii_digit() {
                digits.push(*c);
                int_len += 1;
                saw_mantissa = true;
                chars.next();
            } else {
                break;
            }
        }

        if chars.peek() == Some(&'.') {
            chars.next();
            while let Some(c) = chars.peek() {
                if c.is_ascii_digit() {
                    digits.push(*c);
                    saw_mantissa = true;
                    chars.next();
                } else {
                    break;
                }
            }
        }

        if !saw_mantissa {
            return Err(err());
        }

        let mut exp: i64 = 0;
        if matches!(chars.peek(), Some('e') | Some('E')) {
            chars.next();
            let mut exp_sign: i64 = 1;
            match chars.peek() {
                Some('-') => {
                    exp_sign = -1;
                    chars.next();
                }
                Some('+') => {
                    chars.next();
                }
                _ => {}
            }
            let mut saw_exp = false;
            while let Some(c) = chars.peek() {
                if let Some(d) = c.to_digit(10) {
                    saw_exp = true;
                    exp = exp
                        .checked_mul(10)
                        .and_then(|e| e.checked_add(d as i64))
                        .ok_or_else(err)?;
                    if exp > MAX_EXPONENT {
                        return Err(err());
                    }
                    chars.next();
                } else {
                    break;
                }
            }
            if !saw_exp {
                return Err(err());
            }
            exp *= exp_sign;
        }

        if chars.next().is_some() {
            return Err(err());
        }

        let point = int_len.checked_add(exp).ok_or_else(err)?;
        Ok(Self::from_parts(sign, digits.into_bytes(), point))
    }

    /// Build a number from an integer.
    pub fn from_i64(v: i64) -> Self {
        // i64 always renders as a plain literal, parsing cannot fail.
        Self::new(&v.to_string()).unwrap_or_else(|_| unreachable!())
    }

    /// The canonical decimal string.
    pub fn as_str(&self) -> &str {
        &self.canon
    }

    /// True iff the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.sign == 0
    }

    /// True iff the value is an unsigned integer (usable as a list index).
    pub fn as_index(&self) -> Option<usize> {
        if self.sign < 0 {
            return None;
        }
        if self.sign == 0 {
            return Some(0);
        }
        // Integral iff every significant digit sits left of the point.
        if self.point < self.digits.len() as i64 || self.point > 19 {
            return None;
        }
        let mut v: usize = 0;
        for d in self.digits.bytes() {
            v = v.checked_mul(10)?.checked_add((d - b'0') as usize)?;
        }
        for _ in self.digits.len() as i64..self.point {
            v = v.checked_mul(10)?;
        }
        Some(v)
    }

    /// Exact decimal addition.
    pub fn add(&self, other: &Number) -> Number {
        if self.sign == 0 {
            return other.clone();
        }
        if other.sign == 0 {
            return self.clone();
        }

        let scale_a = self.point - self.digits.len() as i64;
        let scale_b = other.point - other.digits.len() as i64;
        let scale = scale_a.min(scale_b);

        let mut coeff_a = self.digits.clone().into_bytes();
        coeff_a.extend(std::iter::repeat(b'0').take((scale_a - scale) as usize));
        let mut coeff_b = other.digits.clone().into_bytes();
        coeff_b.extend(std::iter::repeat(b'0').take((scale_b - scale) as usize));

        let (sign, magnitude) = if self.sign == other.sign {
            (self.sign, add_magnitude(&coeff_a, &coeff_b))
        } else {
            match cmp_magnitude(&coeff_a, &coeff_b) {
                Ordering::Equal => return Number::zero(),
                Ordering::Greater => (self.sign, sub_magnitude(&coeff_a, &coeff_b)),
                Ordering::Less => (other.sign, sub_magnitude(&coeff_b, &coeff_a)),
            }
        };

        let point = scale + magnitude.len() as i64;
        Number::from_parts(sign, magnitude, point)
    }

    /// Exact decimal subtraction.
    pub fn sub(&self, other: &Number) -> Number {
        self.add(&other.neg())
    }

    /// Negation.
    pub fn neg(&self) -> Number {
        if self.sign == 0 {
            return self.clone();
        }
        Number::from_parts(-self.sign, self.digits.clone().into_bytes(), self.point)
    }

    fn zero() -> Number {
        Number {
            canon: "0".to_string(),
            sign: 0,
            digits: String::new(),
            point: 0,
        }
    }

    /// Normalise raw (sign, digits, point) parts and render the canon form.
    fn from_parts(sign: i8, mut digits: Vec<u8>, mut point: i64) -> Number {
        // Leading zeros shift the point left; trailing zeros are redundant.
        let lead = digits.iter().take_while(|d| **d == b'0').count();
        digits.drain(..lead);
        point -= lead as i64;
        while digits.last() == Some(&b'0') {
            digits.pop();
        }

        if digits.is_empty() {
            return Number::zero();
        }

        let digits = String::from_utf8(digits).unwrap_or_else(|_| unreachable!());
        let canon = render(sign, &digits, point);
        Number {
            canon,
            sign,
            digits,
            point,
        }
    }

    fn cmp_numeric(&self, other: &Number) -> Ordering {
        if self.sign != other.sign {
            return self.sign.cmp(&other.sign);
        }
        if self.sign == 0 {
            return Ordering::Equal;
        }
        let mag = match self.point.cmp(&other.point) {
            Ordering::Equal => self.digits.as_bytes().cmp(other.digits.as_bytes()),
            unequal => unequal,
        };
        if self.sign < 0 {
            mag.reverse()
        } else {
            mag
        }
    }
}

/// Render the canonical string for normalised parts.
fn render(sign: i8, digits: &str, point: i64) -> String {
    let len = digits.len() as i64;
    let prefix = if sign < 0 { "-" } else { "" };

    if point >= len && point - len <= MAX_PLAIN_PADDING {
        let zeros = "0".repeat((point - len) as usize);
        format!("{prefix}{digits}{zeros}")
    } else if point > 0 && point < len {
        let (int_part, frac_part) = digits.split_at(point as usize);
        format!("{prefix}{int_part}.{frac_part}")
    } else if point <= 0 && -point <= MAX_PLAIN_PADDING {
        let zeros = "0".repeat((-point) as usize);
        format!("{prefix}0.{zeros}{digits}")
    } else {
        // Exponent form: d.rest E point-1
        let exp = point - 1;
        let (head, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{prefix}{head}E{exp}")
        } else {
            format!("{prefix}{head}.{rest}E{exp}")
        }
    }
}

fn cmp_magnitude(a: &[u8], b: &[u8]) -> Ordering {
    let a = strip_leading_zeros(a);
    let b = strip_leading_zeros(b);
    match a.len().cmp(&b.len()) {
        Ordering::Equal => a.cmp(b),
        unequal => unequal,
    }
}

fn strip_leading_zeros(d: &[u8]) -> &[u8] {
    let lead = d.iter().take_while(|c| **c == b'0').count();
    &d[lead..]
}

/// Schoolbook addition of two digit strings.
fn add_magnitude(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(a.len().max(b.len()) + 1);
    let mut carry = 0u8;
    let mut ia = a.iter().rev();
    let mut ib = b.iter().rev();
    loop {
        let da = ia.next();
        let db = ib.next();
        if da.is_none() && db.is_none() {
            break;
        }
        let sum = (da.map_or(0, |d| d - b'0')) + (db.map_or(0, |d| d - b'0')) + carry;
        out.push(b'0' + sum % 10);
        carry = sum / 10;
    }
    if carry > 0 {
        out.push(b'0' + carry);
    }
    out.reverse();
    out
}

/// Schoolbook subtraction; requires `a >= b` by magnitude.
fn sub_magnitude(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(a.len());
    let mut borrow = 0i8;
    let mut ia = a.iter().rev();
    let mut ib = b.iter().rev();
    loop {
        let da = match ia.next() {
            Some(d) => (d - b'0') as i8,
            None => break,
        };
        let db = ib.next().map_or(0, |d| (d - b'0') as i8);
        let mut diff = da - db - borrow;
        if diff < 0 {
            diff += 10;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out.push(b'0' + diff as u8);
    }
    out.reverse();
    out
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canon)
    }
}

impl FromStr for Number {
    type Err = InvalidNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Number::new(s)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_numeric(other)
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canon)
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Number::new(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> Number {
        Number::new(s).expect("valid number")
    }

    #[test]
    fn test_canonical_forms() {
        assert_eq!(n("1.0").as_str(), "1");
        assert_eq!(n("0.500").as_str(), "0.5");
        assert_eq!(n("1e2").as_str(), "100");
        assert_eq!(n("-0").as_str(), "0");
        assert_eq!(n("+3.25").as_str(), "3.25");
        assert_eq!(n("007").as_str(), "7");
        assert_eq!(n("0.0").as_str(), "0");
        assert_eq!(n(".5").as_str(), "0.5");
        assert_eq!(n("5.").as_str(), "5");
    }

    #[test]
    fn test_exponent_form_for_wide_magnitudes() {
        assert_eq!(n("1.2345e40").as_str(), "1.2345E40");
        assert_eq!(n("1e-40").as_str(), "1E-40");
        // Round-trips through parsing.
        assert_eq!(n(n("1.2345e40").as_str()), n("1.2345e40"));
        assert_eq!(n(n("1e-40").as_str()), n("1e-40"));
    }

    #[test]
    fn test_invalid_literals() {
        for bad in ["", "-", "+", ".", "1.2.3", "1e", "e4", "1x", "--2", "1 "] {
            assert!(Number::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_equality_is_numeric() {
        assert_eq!(n("1.0"), n("1"));
        assert_eq!(n("0.50"), n(".5"));
        assert_eq!(n("100"), n("1e2"));
        assert_ne!(n("1"), n("1.1"));
    }

    #[test]
    fn test_ordering() {
        assert!(n("2") > n("1"));
        assert!(n("-2") < n("-1"));
        assert!(n("-1") < n("0"));
        assert!(n("0.9") < n("1"));
        assert!(n("10") > n("9.999"));
        assert!(n("1e10") > n("9999999999"));
        assert!(n("0.001") < n("0.01"));
    }

    #[test]
    fn test_add_sub() {
        assert_eq!(n("1").add(&n("2")), n("3"));
        assert_eq!(n("0.1").add(&n("0.2")), n("0.3"));
        assert_eq!(n("1.5").add(&n("-2")), n("-0.5"));
        assert_eq!(n("10").sub(&n("10")), n("0"));
        assert_eq!(n("100").sub(&n("0.01")), n("99.99"));
        assert_eq!(n("-1").add(&n("-1")), n("-2"));
        assert_eq!(n("999").add(&n("1")), n("1000"));
    }

    #[test]
    fn test_precision_survives_addition() {
        // 18 digits, beyond f64 precision
        assert_eq!(
            n("123456789012345678").add(&n("1")),
            n("123456789012345679")
        );
    }

    #[test]
    fn test_as_index() {
        assert_eq!(n("0").as_index(), Some(0));
        assert_eq!(n("42").as_index(), Some(42));
        assert_eq!(n("4e1").as_index(), Some(40));
        assert_eq!(n("-1").as_index(), None);
        assert_eq!(n("1.5").as_index(), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let v = n("3.14");
        let json = serde_json::to_string(&v).expect("serialize");
        assert_eq!(json, "\"3.14\"");
        let back: Number = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, v);
    }
}
