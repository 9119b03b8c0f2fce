// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! `str.format` over heap objects.

use num_bigint::BigInt;

use crate::error::{Error, ErrorCode, Result};
use crate::float::FloatFormatter;
use crate::formatter::{IntegerFormatter, TextFormatter};
use crate::markup::{FieldKey, FieldNameIterator, MarkupIterator};
use crate::object::{Heap, Object, ObjRef};
use crate::spec::{format_error, FormatSpec};

/// How many levels of fields nested in format specs are expanded.
const MAX_RECURSION: usize = 2;

/// Renders templates against positional and keyword arguments living in
/// a heap.
pub struct Template<'h> {
    heap: &'h Heap,
}

impl<'h> Template<'h> {
    pub fn new(heap: &'h Heap) -> Template<'h> {
        Template { heap }
    }

    /// Render `markup`, e.g. `"{0:>8.3f} {name!r}"`.
    pub fn render(&self, markup: &str, args: &[ObjRef], kwargs: &[(&str, ObjRef)]) -> Result<String> {
        self.render_chunks(MarkupIterator::new(markup), args, kwargs, MAX_RECURSION)
    }

    fn render_chunks(&self, mut chunks: MarkupIterator, args: &[ObjRef],
                     kwargs: &[(&str, ObjRef)], depth: usize) -> Result<String> {
        if depth == 0 {
            return Err(format_error("Max string recursion exceeded"));
        }
        let mut out = String::new();
        while let Some(chunk) = chunks.next() {
            let chunk = chunk?;
            out.push_str(&chunk.literal);
            let name = match chunk.field_name {
                Some(ref name) => name,
                None => continue,
            };
            let obj = self.resolve(name, args, kwargs)?;
            let spec = match chunk.format_spec {
                Some(ref spec) if chunk.spec_needs_expanding =>
                    self.render_chunks(chunks.nested(spec), args, kwargs, depth - 1)?,
                Some(ref spec) => spec.clone(),
                None => String::new(),
            };
            let spec = FormatSpec::parse(&spec)?;
            let rendered = match chunk.conversion {
                None => self.format_object(obj, &spec)?,
                Some('r') => TextFormatter::new(spec).format(&self.heap.repr(obj))?,
                Some('s') => TextFormatter::new(spec).format(&self.heap.str_of(obj))?,
                Some(c) => return Err(Error::Format(ErrorCode::Conversion(c))),
            };
            out.push_str(&rendered);
        }
        Ok(out)
    }

    /// Format one object according to its kind.
    pub fn format_object(&self, obj: ObjRef, spec: &FormatSpec) -> Result<String> {
        match *self.heap.get(obj) {
            Object::Bool(b) if spec.is_empty() => Ok((if b { "True" } else { "False" }).into()),
            Object::Bool(b) => IntegerFormatter::new(*spec).format_i64(b as i64),
            Object::Int(i) => IntegerFormatter::new(*spec).format_i64(i),
            Object::Long(ref i) => IntegerFormatter::new(*spec).format(i),
            Object::Float(f) => FloatFormatter::new(*spec).format(f),
            Object::Str(ref s) => TextFormatter::new(*spec).format(s),
            _ => TextFormatter::new(*spec).format(&self.heap.str_of(obj)),
        }
    }

    /// Follow a field name like `0.attr[key]` to the object it names.
    fn resolve(&self, name: &str, args: &[ObjRef], kwargs: &[(&str, ObjRef)]) -> Result<ObjRef> {
        let path = FieldNameIterator::new(name);
        let mut obj = match *path.head() {
            FieldKey::Index(i) => match args.get(i as usize).filter(|_| i >= 0) {
                Some(&obj) => obj,
                None => return Err(lookup_error(format!(
                    "Replacement index {} out of range for positional args tuple", i))),
            },
            FieldKey::Name(ref key) => match kwargs.iter().find(|&&(k, _)| k == key.as_str()) {
                Some(&(_, obj)) => obj,
                None => return Err(lookup_error(format!("'{}'", key))),
            },
        };
        for chunk in path {
            let chunk = chunk?;
            obj = if chunk.is_attr {
                self.attribute(obj, &chunk.value.to_string())?
            } else {
                self.item(obj, &chunk.value)?
            };
        }
        Ok(obj)
    }

    fn attribute(&self, obj: ObjRef, attr: &str) -> Result<ObjRef> {
        self.heap.getattr(obj, attr).ok_or_else(|| lookup_error(format!(
            "'{}' object has no attribute '{}'", self.heap.type_name(obj), attr)))
    }

    fn item(&self, obj: ObjRef, key: &FieldKey) -> Result<ObjRef> {
        let heap = self.heap;
        let found = match (heap.get(obj), key) {
            (&Object::List(ref items), &FieldKey::Index(i)) |
            (&Object::Tuple(ref items), &FieldKey::Index(i)) => {
                let len = items.len() as i64;
                let i = if i < 0 { i + len } else { i };
                if i < 0 || i >= len {
                    return Err(lookup_error(format!("{} index out of range",
                                                    heap.type_name(obj))));
                }
                Some(items[i as usize])
            }
            (&Object::Dict(ref d), key) => find_key(heap, d.pairs(), key),
            (&Object::Instance(ref inst), key) => find_key(heap, &inst.dict_items, key),
            _ => return Err(lookup_error(format!("'{}' object is not subscriptable",
                                                 heap.type_name(obj)))),
        };
        found.ok_or_else(|| lookup_error(match *key {
            FieldKey::Index(i) => i.to_string(),
            FieldKey::Name(ref s) => format!("'{}'", s),
        }))
    }
}

/// Value lookup of an integer or text key among dict pairs.
fn find_key(heap: &Heap, pairs: &[(ObjRef, ObjRef)], key: &FieldKey) -> Option<ObjRef> {
    pairs.iter().find(|&&(k, _)| match (heap.get(k), key) {
        (&Object::Str(ref s), &FieldKey::Name(ref name)) => s == name,
        (obj, &FieldKey::Index(i)) => obj.to_bigint() == Some(BigInt::from(i)),
        _ => false,
    }).map(|&(_, v)| v)
}

fn lookup_error(msg: String) -> Error {
    Error::Format(ErrorCode::Lookup(msg))
}

/// Render a template in one call.
pub fn render(heap: &Heap, markup: &str, args: &[ObjRef], kwargs: &[(&str, ObjRef)]) -> Result<String> {
    Template::new(heap).render(markup, args, kwargs)
}
