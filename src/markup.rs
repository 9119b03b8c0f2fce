// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Splitting of format templates into literal text and replacement fields,
//! and of field names into their access path.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, ErrorCode, Result};
use crate::spec::format_error;

/// Automatic field numbering state, shared by a template and the templates
/// nested in its format specifiers.
#[derive(Debug, Default)]
pub struct FieldNumbering {
    manual: Cell<bool>,
    next: Cell<usize>,
}

impl FieldNumbering {
    fn next_automatic(&self) -> Result<String> {
        if self.manual.get() {
            return Err(format_error(
                "cannot switch from manual field specification to automatic field numbering"));
        }
        let n = self.next.get();
        self.next.set(n + 1);
        Ok(n.to_string())
    }

    fn use_manual(&self) -> Result<()> {
        if self.manual.get() {
            return Ok(());
        }
        if self.next.get() != 0 {
            return Err(format_error(
                "cannot switch from automatic field numbering to manual field specification"));
        }
        self.manual.set(true);
        Ok(())
    }
}

/// One piece of a template: literal text optionally followed by a field.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Chunk {
    /// Text before the field, with `{{` and `}}` unescaped.
    pub literal: String,
    /// Field name with automatic numbers filled in, `None` for trailing text.
    pub field_name: Option<String>,
    /// Text after `:`, if present.
    pub format_spec: Option<String>,
    /// Character after `!`, if present.
    pub conversion: Option<char>,
    /// The format spec contains nested fields that must be expanded first.
    pub spec_needs_expanding: bool,
}

/// Iterator over the chunks of a template.
///
/// Iteration stops after the first error.
pub struct MarkupIterator {
    markup: Vec<char>,
    index: usize,
    numbering: Rc<FieldNumbering>,
}

impl MarkupIterator {
    pub fn new(markup: &str) -> MarkupIterator {
        MarkupIterator::with_numbering(markup, Rc::new(FieldNumbering::default()))
    }

    /// Iterator over a template nested in a format spec of this one.  Both
    /// draw automatic field numbers from the same counter.
    pub fn nested(&self, markup: &str) -> MarkupIterator {
        MarkupIterator::with_numbering(markup, self.numbering.clone())
    }

    fn with_numbering(markup: &str, numbering: Rc<FieldNumbering>) -> MarkupIterator {
        MarkupIterator { markup: markup.chars().collect(), index: 0, numbering }
    }

    fn next_chunk(&mut self) -> Result<Chunk> {
        let markup = &self.markup;
        let len = markup.len();
        let mut chunk = Chunk::default();

        // Find the first unescaped brace.
        let mut pos = self.index;
        let brace = loop {
            match (pos..len).find(|&i| markup[i] == '{' || markup[i] == '}') {
                Some(i) if i + 1 < len && markup[i + 1] == markup[i] => pos = i + 2,
                Some(i) if markup[i] == '}' =>
                    return Err(format_error("Single '}' encountered in format string")),
                found => break found,
            }
        };

        let brace = match brace {
            None => {
                chunk.literal = unescape_braces(&markup[self.index..]);
                self.index = len;
                return Ok(chunk);
            }
            Some(brace) => brace,
        };
        chunk.literal = unescape_braces(&markup[self.index..brace]);

        let field_start = brace + 1;
        let mut depth = 1;
        let mut pos = field_start;
        while pos < len {
            match markup[pos] {
                '{' => {
                    depth += 1;
                    chunk.spec_needs_expanding = true;
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            pos += 1;
        }
        if depth > 0 {
            return Err(format_error("Single '{' encountered in format string"));
        }
        let field: String = markup[field_start..pos].iter().collect();
        self.index = pos + 1;
        self.parse_field(&mut chunk, &field)?;
        Ok(chunk)
    }

    fn parse_field(&self, chunk: &mut Chunk, field: &str) -> Result<()> {
        let name = match field.find(|c| c == '!' || c == ':') {
            None => field,
            Some(pos) => {
                let rest = &field[pos + 1..];
                if field[pos..].starts_with('!') {
                    let mut chars = rest.chars();
                    let conversion = chars.next().ok_or_else(|| format_error(
                        "end of format while looking for conversion specifier"))?;
                    chunk.conversion = Some(conversion);
                    let after = chars.as_str();
                    if !after.is_empty() {
                        if !after.starts_with(':') {
                            return Err(format_error("expected ':' after conversion specifier"));
                        }
                        chunk.format_spec = Some(after[1..].to_string());
                    }
                } else {
                    chunk.format_spec = Some(rest.to_string());
                }
                &field[..pos]
            }
        };

        let name = match name.chars().next() {
            None => self.numbering.next_automatic()?,
            Some('.') | Some('[') => self.numbering.next_automatic()? + name,
            Some(c) => {
                if c.is_ascii_digit() {
                    self.numbering.use_manual()?;
                }
                name.to_string()
            }
        };
        chunk.field_name = Some(name);
        Ok(())
    }
}

impl Iterator for MarkupIterator {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Result<Chunk>> {
        if self.index == self.markup.len() {
            return None;
        }
        let chunk = self.next_chunk();
        if chunk.is_err() {
            self.index = self.markup.len();
        }
        Some(chunk)
    }
}

fn unescape_braces(text: &[char]) -> String {
    let text: String = text.iter().collect();
    text.replace("{{", "{").replace("}}", "}")
}

/// A field name head or item key: integer if it parses as one.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum FieldKey {
    Index(i64),
    Name(String),
}

impl FieldKey {
    fn parse(s: &str) -> FieldKey {
        match s.parse() {
            Ok(i) => FieldKey::Index(i),
            Err(_) => FieldKey::Name(s.to_string()),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FieldKey::Index(i) => write!(f, "{}", i),
            FieldKey::Name(ref s) => f.write_str(s),
        }
    }
}

/// One `.attr` or `[key]` step of a field name.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FieldChunk {
    pub is_attr: bool,
    pub value: FieldKey,
}

/// Iterator over the access path of a field name like `0.name[2]`.
pub struct FieldNameIterator {
    name: Vec<char>,
    head: FieldKey,
    index: usize,
}

impl FieldNameIterator {
    pub fn new(field_name: &str) -> FieldNameIterator {
        let name: Vec<char> = field_name.chars().collect();
        let end = name.iter().position(|&c| c == '.' || c == '[').unwrap_or(name.len());
        let head: String = name[..end].iter().collect();
        FieldNameIterator { head: FieldKey::parse(&head), name, index: end }
    }

    /// The leading argument name or index.
    pub fn head(&self) -> &FieldKey {
        &self.head
    }

    fn next_chunk(&mut self) -> Result<FieldChunk> {
        let name = &self.name;
        let start = self.index + 1;
        if name[self.index] == '.' {
            let end = (start..name.len()).find(|&i| name[i] == '.' || name[i] == '[')
                .unwrap_or(name.len());
            if end == start {
                return Err(field_error("Empty attribute in format string"));
            }
            let attr: String = name[start..end].iter().collect();
            self.index = end;
            Ok(FieldChunk { is_attr: true, value: FieldKey::Name(attr) })
        } else {
            let end = match (start..name.len()).find(|&i| name[i] == ']') {
                Some(end) => end,
                None => return Err(field_error("Missing ']' in format string")),
            };
            if end == start {
                return Err(field_error("Empty attribute in format string"));
            }
            let item: String = name[start..end].iter().collect();
            self.index = end + 1;
            if self.index < name.len() && name[self.index] != '.' && name[self.index] != '[' {
                return Err(field_error("Only '.' or '[' may follow ']' in format field specifier"));
            }
            Ok(FieldChunk { is_attr: false, value: FieldKey::parse(&item) })
        }
    }
}

impl Iterator for FieldNameIterator {
    type Item = Result<FieldChunk>;

    fn next(&mut self) -> Option<Result<FieldChunk>> {
        if self.index >= self.name.len() {
            return None;
        }
        let chunk = self.next_chunk();
        if chunk.is_err() {
            self.index = self.name.len();
        }
        Some(chunk)
    }
}

fn field_error(msg: &str) -> Error {
    Error::Format(ErrorCode::FieldName(msg.into()))
}
