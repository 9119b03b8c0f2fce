// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Float rendering with exact decimal rounding.
//!
//! Every finite double is a dyadic rational and therefore has a finite
//! decimal expansion.  Fixed and exponential formats are produced from that
//! exact expansion, rounding half to even, so the output does not depend on
//! the platform's `printf`.

use num_bigint::BigUint;

use crate::error::{Error, ErrorCode, Result};
use crate::formatter::{group_digits, Number};
use crate::spec::{format_error, FormatSpec};

/// Longest precision accepted by the float formatter.
pub const MAX_PRECISION: usize = 250;

/// Decimal digits `d1 d2 d3 ...` with value `0.d1d2d3... * 10^point`.
/// No trailing zeros; zero has no digits.
#[derive(Clone, PartialEq, Debug)]
struct Decimal {
    digits: Vec<u8>,
    point: i32,
}

impl Decimal {
    /// Exact expansion of a finite, non-negative double.
    fn exact(value: f64) -> Decimal {
        let bits = value.to_bits();
        let biased = ((bits >> 52) & 0x7ff) as i32;
        let fraction = bits & 0x000f_ffff_ffff_ffff;
        let (mantissa, exponent) = if biased == 0 {
            (fraction, -1074)
        } else {
            (fraction | (1 << 52), biased - 1075)
        };
        if mantissa == 0 {
            return Decimal { digits: Vec::new(), point: 0 };
        }
        let mantissa = BigUint::from(mantissa);
        let (text, scale) = if exponent >= 0 {
            ((mantissa << exponent as usize).to_str_radix(10), 0)
        } else {
            // m / 2^k == m * 5^k / 10^k
            let k = (-exponent) as u32;
            ((mantissa * BigUint::from(5u32).pow(k)).to_str_radix(10), k as i32)
        };
        Decimal::from_digits(text.as_bytes(), text.len() as i32 - scale)
    }

    /// Shortest digits that read back as `value` (finite, non-negative).
    fn shortest(value: f64) -> Decimal {
        // `{:e}` yields the shortest round-tripping digits, e.g. "1.2345e-5".
        let text = format!("{:e}", value);
        let (mantissa, exp) = match text.find('e') {
            Some(i) => (&text[..i], text[i + 1..].parse::<i32>().unwrap_or(0)),
            None => (&text[..], 0),
        };
        let digits: Vec<u8> = mantissa.bytes().filter(u8::is_ascii_digit).collect();
        Decimal::from_digits(&digits, exp + 1)
    }

    fn from_digits(ascii: &[u8], point: i32) -> Decimal {
        let mut digits: Vec<u8> = ascii.iter().map(|d| d - b'0').collect();
        let lead = digits.iter().take_while(|&&d| d == 0).count();
        digits.drain(..lead);
        let point = point - lead as i32;
        while digits.last() == Some(&0) {
            digits.pop();
        }
        if digits.is_empty() {
            return Decimal { digits, point: 0 };
        }
        Decimal { digits, point }
    }

    fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    /// Decimal exponent of the leading digit.
    fn exponent(&self) -> i32 {
        if self.is_zero() { 0 } else { self.point - 1 }
    }

    /// Keep `keep` leading digits, rounding half to even.
    fn round_to(&mut self, keep: i32) {
        if keep >= self.digits.len() as i32 {
            return;
        }
        if keep < 0 {
            self.digits.clear();
            self.point = 0;
            return;
        }
        let keep = keep as usize;
        let first = self.digits[keep];
        let rest_nonzero = self.digits[keep + 1..].iter().any(|&d| d != 0);
        let last_odd = keep > 0 && self.digits[keep - 1] % 2 == 1;
        let round_up = first > 5 || (first == 5 && (rest_nonzero || last_odd));
        self.digits.truncate(keep);
        if round_up {
            let mut i = keep;
            loop {
                if i == 0 {
                    self.digits.insert(0, 1);
                    self.point += 1;
                    break;
                }
                i -= 1;
                if self.digits[i] == 9 {
                    self.digits[i] = 0;
                } else {
                    self.digits[i] += 1;
                    break;
                }
            }
        }
        while self.digits.last() == Some(&0) {
            self.digits.pop();
        }
        if self.digits.is_empty() {
            self.point = 0;
        }
    }

    fn digit(&self, i: i32) -> char {
        if i < 0 || i >= self.digits.len() as i32 {
            '0'
        } else {
            (b'0' + self.digits[i as usize]) as char
        }
    }

    /// Whole part and `frac` fractional digits, after rounding.
    fn fixed(&mut self, frac: usize) -> (String, String) {
        self.round_to(self.point + frac as i32);
        let whole: String = if self.point <= 0 {
            "0".into()
        } else {
            (0..self.point).map(|i| self.digit(i)).collect()
        };
        let fraction: String = (0..frac as i32).map(|i| self.digit(self.point + i)).collect();
        (whole, fraction)
    }

    /// Leading digit, `frac` further digits and the exponent, after rounding.
    fn scientific(&mut self, frac: usize) -> (String, String, i32) {
        self.round_to(frac as i32 + 1);
        let fraction: String = (1..=frac as i32).map(|i| self.digit(i)).collect();
        (self.digit(0).to_string(), fraction, self.exponent())
    }
}

fn exponent_text(marker: char, exp: i32) -> String {
    format!("{}{}{:02}", marker, if exp < 0 { '-' } else { '+' }, exp.abs())
}

/// Formats doubles.
pub struct FloatFormatter {
    spec: FormatSpec,
}

impl FloatFormatter {
    pub fn new(spec: FormatSpec) -> FloatFormatter {
        FloatFormatter { spec }
    }

    fn validate(&self) -> Result<char> {
        let spec = &self.spec;
        let kind = match spec.kind {
            None => 'r',
            Some(k @ 'e') | Some(k @ 'E') | Some(k @ 'f') | Some(k @ 'F') | Some(k @ 'g') |
            Some(k @ 'G') | Some(k @ '%') => k,
            Some('n') => 'g',
            Some(k) => return Err(Error::Format(ErrorCode::UnknownFormatCode(k, "float"))),
        };
        if spec.alternate {
            return Err(format_error("Alternate form (#) not allowed in float format specifier"));
        }
        if spec.grouping && spec.kind == Some('n') {
            return Err(format_error("Cannot specify ',' with 'n'."));
        }
        if spec.precision.map_or(false, |p| p > MAX_PRECISION) {
            return Err(Error::Format(ErrorCode::Overflow(
                "formatted float is too long (precision too large?)".into())));
        }
        Ok(kind)
    }

    pub fn format(&self, value: f64) -> Result<String> {
        let kind = self.validate()?;
        let spec = &self.spec;
        let upper = kind.is_ascii_uppercase();
        let mut number = Number::default();

        if value.is_nan() {
            number.whole = (if upper { "NAN" } else { "nan" }).into();
            return Ok(number.pad(spec));
        }
        number.sign.push_str(Number::sign_for(spec, value.is_sign_negative()));
        if value.is_infinite() {
            number.whole = (if upper { "INF" } else { "inf" }).into();
            return Ok(number.pad(spec));
        }

        let marker = if upper { 'E' } else { 'e' };
        let precision = spec.precision;
        let (whole, fraction, suffix) = match kind {
            'e' | 'E' => {
                let (lead, fraction, exp) =
                    Decimal::exact(value.abs()).scientific(precision.unwrap_or(6));
                (lead, fraction, exponent_text(marker, exp))
            }
            'f' | 'F' => {
                let (whole, fraction) = Decimal::exact(value.abs()).fixed(precision.unwrap_or(6));
                (whole, fraction, String::new())
            }
            '%' => {
                let mut decimal = Decimal::exact(value.abs());
                if !decimal.is_zero() {
                    decimal.point += 2;
                }
                let (whole, fraction) = decimal.fixed(precision.unwrap_or(6));
                (whole, fraction, "%".into())
            }
            'r' if precision.is_none() => {
                let mut decimal = Decimal::shortest(value.abs());
                let exp = decimal.exponent();
                if exp < -4 || exp >= 16 {
                    let frac = decimal.digits.len().saturating_sub(1);
                    let (lead, fraction, exp) = decimal.scientific(frac);
                    (lead, fraction, exponent_text(marker, exp))
                } else {
                    let frac = (decimal.digits.len() as i32 - decimal.point).max(1) as usize;
                    let (whole, fraction) = decimal.fixed(frac);
                    (whole, fraction, String::new())
                }
            }
            _ => general(Decimal::exact(value.abs()), precision.unwrap_or(6), kind == 'r', marker),
        };

        number.whole = if spec.grouping { group_digits(&whole) } else { whole };
        if !fraction.is_empty() {
            number.tail.push('.');
            number.tail.push_str(&fraction);
        }
        number.tail.push_str(&suffix);
        Ok(number.pad(spec))
    }
}

/// `g` formatting: `precision` significant digits, exponential outside
/// `-4 <= exp < precision`, trailing zeros removed.  With `add_dot_0` (no
/// presentation type) the fixed range ends one earlier and a fixed result
/// keeps at least one fractional digit.
fn general(mut decimal: Decimal, precision: usize, add_dot_0: bool,
           marker: char) -> (String, String, String) {
    let precision = precision.max(1);
    decimal.round_to(precision as i32);
    let exp = decimal.exponent();
    let limit = if add_dot_0 { precision as i32 - 1 } else { precision as i32 };
    if exp < -4 || exp >= limit {
        let (lead, fraction, exp) = decimal.scientific(precision - 1);
        (lead, fraction.trim_end_matches('0').to_string(), exponent_text(marker, exp))
    } else {
        let (whole, fraction) = decimal.fixed((precision as i32 - 1 - exp) as usize);
        let mut fraction = fraction.trim_end_matches('0').to_string();
        if fraction.is_empty() && add_dot_0 {
            fraction.push('0');
        }
        (whole, fraction, String::new())
    }
}

/// `repr()` of a float: shortest round-tripping digits.
pub fn repr(value: f64) -> String {
    match FloatFormatter::new(FormatSpec::default()).format(value) {
        Ok(s) => s,
        Err(_) => value.to_string(),
    }
}

/// Format a float with a parsed spec.
pub fn format_float(value: f64, spec: &FormatSpec) -> Result<String> {
    FloatFormatter::new(*spec).format(value)
}
