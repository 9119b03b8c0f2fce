// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! The format specifier mini-language:
//! `[[fill]align][sign][#][0][width][,][.precision][type]`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ErrorCode, Result};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Align {
    /// `<`
    Left,
    /// `>`
    Right,
    /// `^`
    Center,
    /// `=`, padding goes between sign and digits
    AfterSign,
}

impl Align {
    pub fn from_char(c: char) -> Option<Align> {
        match c {
            '<' => Some(Align::Left),
            '>' => Some(Align::Right),
            '^' => Some(Align::Center),
            '=' => Some(Align::AfterSign),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Align::Left => '<',
            Align::Right => '>',
            Align::Center => '^',
            Align::AfterSign => '=',
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sign {
    /// `+`: sign for positive and negative numbers
    Plus,
    /// `-`: sign for negative numbers only
    Minus,
    /// ` `: space for positive numbers
    Space,
}

impl Sign {
    pub fn as_char(self) -> char {
        match self {
            Sign::Plus => '+',
            Sign::Minus => '-',
            Sign::Space => ' ',
        }
    }
}

/// A parsed format specifier.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct FormatSpec {
    pub fill: Option<char>,
    pub align: Option<Align>,
    pub sign: Option<Sign>,
    /// `#` was given
    pub alternate: bool,
    /// A `0` preceded the width
    pub zero_pad: bool,
    pub width: Option<usize>,
    /// `,` was given
    pub grouping: bool,
    pub precision: Option<usize>,
    /// The presentation type
    pub kind: Option<char>,
}

/// Width and precision saturate here instead of overflowing.
const MAX_NUMBER: usize = i32::MAX as usize;

impl FormatSpec {
    /// Parse a format specifier.
    pub fn parse(spec: &str) -> Result<FormatSpec> {
        let chars: Vec<char> = spec.chars().collect();
        let mut ptr = 0;
        let mut result = FormatSpec::default();

        if let Some(align) = chars.first().and_then(|&c| Align::from_char(c)) {
            result.align = Some(align);
            ptr = 1;
        } else if let Some(align) = chars.get(1).and_then(|&c| Align::from_char(c)) {
            result.fill = Some(chars[0]);
            result.align = Some(align);
            ptr = 2;
        }

        result.sign = match chars.get(ptr) {
            Some('+') => Some(Sign::Plus),
            Some('-') => Some(Sign::Minus),
            Some(' ') => Some(Sign::Space),
            _ => None,
        };
        if result.sign.is_some() {
            ptr += 1;
        }

        result.alternate = scan_past(&chars, &mut ptr, '#');

        if scan_past(&chars, &mut ptr, '0') {
            // Zero fill only where no fill and alignment were given already.
            result.zero_pad = true;
            if result.fill.is_none() {
                result.fill = Some('0');
                if result.align.is_none() {
                    result.align = Some(Align::AfterSign);
                }
            }
        }

        result.width = scan_integer(&chars, &mut ptr);
        result.grouping = scan_past(&chars, &mut ptr, ',');

        if scan_past(&chars, &mut ptr, '.') {
            result.precision = scan_integer(&chars, &mut ptr);
            if result.precision.is_none() {
                return Err(format_error("Format specifier missing precision"));
            }
        }

        if ptr < chars.len() {
            result.kind = Some(chars[ptr]);
            ptr += 1;
        }
        if ptr != chars.len() {
            return Err(format_error("Invalid conversion specification"));
        }
        Ok(result)
    }

    /// Fill character, or the given default.
    pub fn fill_or(&self, default: char) -> char {
        self.fill.unwrap_or(default)
    }

    /// Alignment, or the given default.
    pub fn align_or(&self, default: Align) -> Align {
        self.align.unwrap_or(default)
    }

    /// Whether the specifier is entirely empty, i.e. parsed from `""`.
    pub fn is_empty(&self) -> bool {
        *self == FormatSpec::default()
    }
}

impl FromStr for FormatSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<FormatSpec> {
        FormatSpec::parse(s)
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // The zero flag is folded into fill and align when they came from it.
        let zero_folded = self.zero_pad && self.fill == Some('0') &&
            self.align == Some(Align::AfterSign);
        if let Some(align) = self.align {
            if !zero_folded {
                if let Some(fill) = self.fill {
                    write!(f, "{}", fill)?;
                }
                write!(f, "{}", align.as_char())?;
            }
        }
        if let Some(sign) = self.sign {
            write!(f, "{}", sign.as_char())?;
        }
        if self.alternate {
            f.write_str("#")?;
        }
        if self.zero_pad {
            f.write_str("0")?;
        }
        if let Some(width) = self.width {
            write!(f, "{}", width)?;
        }
        if self.grouping {
            f.write_str(",")?;
        }
        if let Some(precision) = self.precision {
            write!(f, ".{}", precision)?;
        }
        if let Some(kind) = self.kind {
            write!(f, "{}", kind)?;
        }
        Ok(())
    }
}

fn scan_past(chars: &[char], ptr: &mut usize, c: char) -> bool {
    if chars.get(*ptr) == Some(&c) {
        *ptr += 1;
        true
    } else {
        false
    }
}

fn scan_integer(chars: &[char], ptr: &mut usize) -> Option<usize> {
    let start = *ptr;
    let mut value: usize = 0;
    while let Some(d) = chars.get(*ptr).and_then(|c| c.to_digit(10)) {
        value = value.saturating_mul(10).saturating_add(d as usize).min(MAX_NUMBER);
        *ptr += 1;
    }
    if *ptr == start { None } else { Some(value) }
}

pub(crate) fn format_error<S: Into<String>>(msg: S) -> Error {
    Error::Format(ErrorCode::Format(msg.into()))
}
