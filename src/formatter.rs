// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Rendering of integers and text according to a [`FormatSpec`], and the
//! padding shared with the float formatter.

use num_bigint::{BigInt, Sign as BigSign};
use num_traits::{Signed, ToPrimitive};

use crate::error::{Error, ErrorCode, Result};
use crate::float;
use crate::spec::{format_error, Align, FormatSpec, Sign};

/// A formatted number before padding: sign and base prefix, the whole part
/// (with separators) and everything after it.
#[derive(Debug, Default)]
pub(crate) struct Number {
    pub sign: String,
    pub whole: String,
    pub tail: String,
}

impl Number {
    pub fn sign_for(spec: &FormatSpec, negative: bool) -> &'static str {
        if negative {
            "-"
        } else {
            match spec.sign {
                Some(Sign::Plus) => "+",
                Some(Sign::Space) => " ",
                _ => "",
            }
        }
    }

    /// Apply width, fill and alignment; numbers align right by default.
    pub fn pad(mut self, spec: &FormatSpec) -> String {
        let len = self.sign.chars().count() + self.whole.chars().count() +
            self.tail.chars().count();
        let n = spec.width.unwrap_or(0).saturating_sub(len);
        if n == 0 {
            return self.sign + &self.whole + &self.tail;
        }
        let align = spec.align_or(Align::Right);
        let fill = spec.fill_or(' ');
        let (leading, trailing) = split_padding(align, n);
        let fill_str = |count: usize| -> String { std::iter::repeat(fill).take(count).collect() };

        let mut out = String::with_capacity(len + n);
        if align == Align::AfterSign {
            self.whole = fill_str(leading) + &self.whole;
            if fill == '0' && spec.grouping {
                self.whole = extend_grouping(&self.whole);
            }
            out.push_str(&self.sign);
        } else {
            out.push_str(&fill_str(leading));
            out.push_str(&self.sign);
        }
        out.push_str(&self.whole);
        out.push_str(&self.tail);
        out.push_str(&fill_str(trailing));
        out
    }
}

fn split_padding(align: Align, n: usize) -> (usize, usize) {
    let leading = match align {
        Align::Left => 0,
        Align::Center => n / 2,
        Align::Right | Align::AfterSign => n,
    };
    (leading, n - leading)
}

/// Pad `value` to the specifier's width.  The first `reserved` characters of
/// `value` are a sign or prefix: `=` alignment puts the fill after them.
pub fn pad(value: &str, spec: &FormatSpec, default_align: Align, reserved: usize) -> String {
    let split = value.char_indices().nth(reserved).map_or(value.len(), |(i, _)| i);
    let number = Number {
        sign: value[..split].to_string(),
        whole: value[split..].to_string(),
        tail: String::new(),
    };
    let spec = FormatSpec { align: Some(spec.align_or(default_align)), ..*spec };
    number.pad(&spec)
}

/// Insert `,` every three digits, counting from the right.
pub(crate) fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Extend the separators of a grouped whole part into its zero padding.
/// Never starts the result with a separator: an extra zero goes first.
fn extend_grouping(whole: &str) -> String {
    let mut chars: Vec<char> = whole.chars().collect();
    let mut p = chars.len() as isize - 4;
    while p >= 0 {
        chars[p as usize] = ',';
        p -= 4;
    }
    if p + 4 == 0 {
        chars.insert(0, '0');
    }
    chars.into_iter().collect()
}

/// Formats integers of arbitrary size.
pub struct IntegerFormatter {
    spec: FormatSpec,
    bytes: bool,
}

impl IntegerFormatter {
    pub fn new(spec: FormatSpec) -> IntegerFormatter {
        IntegerFormatter { spec, bytes: false }
    }

    /// Format for a byte string: `c` is limited to one byte.
    pub fn bytes(mut self, bytes: bool) -> IntegerFormatter {
        self.bytes = bytes;
        self
    }

    pub fn format_i64(&self, value: i64) -> Result<String> {
        self.format(&BigInt::from(value))
    }

    pub fn format(&self, value: &BigInt) -> Result<String> {
        let spec = &self.spec;
        match spec.kind {
            Some('e') | Some('E') | Some('f') | Some('F') | Some('g') | Some('G') | Some('%') => {
                let f = value.to_f64().filter(|f| f.is_finite()).ok_or_else(|| {
                    Error::Format(ErrorCode::Overflow("int too large to convert to float".into()))
                })?;
                return float::FloatFormatter::new(*spec).format(f);
            }
            _ => {}
        }
        self.validate()?;

        let negative = value.sign() == BigSign::Minus;
        let mut number = Number::default();
        if spec.kind == Some('c') {
            number.whole.push(self.to_char(value)?);
            return Ok(number.pad(spec));
        }

        number.sign.push_str(Number::sign_for(spec, negative));
        let magnitude = value.abs();
        let (radix, prefix) = match spec.kind {
            Some('x') => (16, "0x"),
            Some('X') => (16, "0X"),
            Some('o') => (8, "0o"),
            Some('b') => (2, "0b"),
            _ => (10, ""),
        };
        if spec.alternate {
            number.sign.push_str(prefix);
        }
        let mut digits = magnitude.to_str_radix(radix);
        if spec.kind == Some('X') {
            digits.make_ascii_uppercase();
        }
        number.whole = if spec.grouping { group_digits(&digits) } else { digits };
        Ok(number.pad(spec))
    }

    fn validate(&self) -> Result<()> {
        let spec = &self.spec;
        let kind = match spec.kind {
            None => 'd',
            Some(k @ 'd') | Some(k @ 'i') | Some(k @ 'u') | Some(k @ 'n') | Some(k @ 'x') |
            Some(k @ 'X') | Some(k @ 'o') | Some(k @ 'b') | Some(k @ 'c') => k,
            Some(k) => return Err(Error::Format(ErrorCode::UnknownFormatCode(k, "int"))),
        };
        if spec.precision.is_some() {
            return Err(format_error("Precision not allowed in integer format specifier"));
        }
        if kind == 'c' {
            if spec.sign.is_some() {
                return Err(format_error("Sign not allowed with integer format specifier 'c'"));
            }
            if spec.alternate {
                return Err(format_error(
                    "Alternate form (#) not allowed with integer format specifier 'c'"));
            }
        }
        if spec.grouping && "xXobcn".contains(kind) {
            return Err(format_error(format!("Cannot specify ',' with '{}'.", kind)));
        }
        Ok(())
    }

    fn to_char(&self, value: &BigInt) -> Result<char> {
        let limit: u32 = if self.bytes { 0x100 } else { 0x11_0000 };
        let code = match value.to_u32() {
            Some(code) if code < limit => code,
            _ => return Err(Error::Format(ErrorCode::Overflow(
                format!("%c arg not in range({:#x})", limit)))),
        };
        std::char::from_u32(code).ok_or_else(|| Error::Format(ErrorCode::Overflow(
            format!("%c arg is a lone surrogate ({:#x})", code))))
    }
}

/// Formats text values.
pub struct TextFormatter {
    spec: FormatSpec,
}

impl TextFormatter {
    pub fn new(spec: FormatSpec) -> TextFormatter {
        TextFormatter { spec }
    }

    fn validate(&self) -> Result<()> {
        let spec = &self.spec;
        match spec.kind {
            None | Some('s') => {}
            Some(k) => return Err(Error::Format(ErrorCode::UnknownFormatCode(k, "str"))),
        }
        if spec.sign.is_some() {
            return Err(format_error("Sign not allowed in string format specifier"));
        }
        if spec.alternate {
            return Err(format_error("Alternate form (#) not allowed in string format specifier"));
        }
        if spec.align == Some(Align::AfterSign) {
            return Err(format_error("'=' alignment not allowed in string format specifier"));
        }
        if spec.grouping {
            return Err(format_error("Cannot specify ',' with 's'."));
        }
        Ok(())
    }

    /// Truncate to the precision (in characters) and pad, left aligned by
    /// default.
    pub fn format(&self, value: &str) -> Result<String> {
        self.validate()?;
        let value = match self.spec.precision {
            Some(p) => match value.char_indices().nth(p) {
                Some((end, _)) => &value[..end],
                None => value,
            },
            None => value,
        };
        Ok(pad(value, &self.spec, Align::Left, 0))
    }

    /// Like [`format`](Self::format) for UTF-16 text.  Precision and width
    /// count code points, so a surrogate pair is never split.
    pub fn format_utf16(&self, value: &[u16]) -> Result<Vec<u16>> {
        self.validate()?;
        let mut end = value.len();
        let mut count = 0;
        if let Some(p) = self.spec.precision {
            let mut i = 0;
            while i < value.len() && count < p {
                i += if is_high_surrogate(value[i]) && value.get(i + 1).map_or(false, |&u| is_low_surrogate(u)) {
                    2
                } else {
                    1
                };
                count += 1;
            }
            end = i;
        }
        let kept = &value[..end];
        let points = code_points(kept);
        let n = self.spec.width.unwrap_or(0).saturating_sub(points);
        let (leading, trailing) = split_padding(self.spec.align_or(Align::Left), n);
        let mut fill = [0u16; 2];
        let fill = self.spec.fill_or(' ').encode_utf16(&mut fill);
        let mut out = Vec::with_capacity(kept.len() + n * fill.len());
        for _ in 0..leading {
            out.extend_from_slice(fill);
        }
        out.extend_from_slice(kept);
        for _ in 0..trailing {
            out.extend_from_slice(fill);
        }
        Ok(out)
    }
}

fn is_high_surrogate(u: u16) -> bool {
    (0xD800..0xDC00).contains(&u)
}

fn is_low_surrogate(u: u16) -> bool {
    (0xDC00..0xE000).contains(&u)
}

fn code_points(units: &[u16]) -> usize {
    units.len() - units.windows(2)
        .filter(|w| is_high_surrogate(w[0]) && is_low_surrogate(w[1]))
        .count()
}

/// Format an integer with a parsed spec.
pub fn format_integer(value: &BigInt, spec: &FormatSpec) -> Result<String> {
    IntegerFormatter::new(*spec).format(value)
}

/// Format text with a parsed spec.
pub fn format_text(value: &str, spec: &FormatSpec) -> Result<String> {
    TextFormatter::new(*spec).format(value)
}

/// Format UTF-16 text with a parsed spec, never splitting a surrogate pair.
pub fn format_text_utf16(value: &[u16], spec: &FormatSpec) -> Result<Vec<u16>> {
    TextFormatter::new(*spec).format_utf16(value)
}
