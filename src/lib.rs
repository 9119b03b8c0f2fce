// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Object pickling and `str.format` for a Python-style object model
//!
//! # Pickle format
//!
//! Please see the [Python docs](http://docs.python.org/library/pickle) for
//! details on the Pickle format.
//!
//! This crate reads and writes protocols 0 (text), 1 and 2.  Objects live in
//! a [`Heap`] and are referenced by [`ObjRef`] handles, which double as
//! object identities.  The [`Pickler`] memoizes every object it writes, so
//! shared and cyclic structures are written once and come back from the
//! [`Unpickler`] with the same shape:
//!
//! * None, booleans, ints of any size, floats
//! * Byte strings and text strings
//! * Tuples, lists and dicts, including self-referencing ones
//! * Classes and functions, referenced by module and name
//! * Instances, either old-style (INST/OBJ) or through the reduce protocol
//!
//! How instances are reduced and rebuilt is configured by a [`Registry`],
//! which takes the place of Python's `copy_reg` module: reducers per type,
//! per-class hooks like `__reduce_ex__` and `__setstate__`, callables that
//! REDUCE may invoke, and the extension code registry.
//!
//! # Formatting
//!
//! [`FormatSpec`] parses the format-spec mini-language
//! `[[fill]align][sign][#][0][width][,][.precision][type]`, and the integer,
//! float and text formatters render values with it.  Floats are rounded
//! exactly, half to even, from their full decimal expansion.  [`Template`]
//! implements `str.format` on top of [`MarkupIterator`] and
//! [`FieldNameIterator`].
//!
//! # Exported API
//!
//! Besides the heap-based `dump_*`/`load_*` functions, `value_to_*` and
//! `value_from_*` pickle [`Value`] trees, owned snapshots that also
//! implement serde's `Serialize` and `Deserialize`.

pub use self::ser::{
    Pickler,
    PickleOptions,
    dump_to_writer,
    dump_to_vec,
    value_to_writer,
    value_to_vec,
};

pub use self::de::{
    Unpickler,
    UnpickleOptions,
    load_from_reader,
    load_from_slice,
    load_from_iter,
    value_from_reader,
    value_from_slice,
    value_from_iter,
};

pub use self::error::{Error, ErrorCode, ErrorKind, Result};
pub use self::float::{format_float, FloatFormatter};
pub use self::formatter::{format_integer, format_text, format_text_utf16, pad,
                          IntegerFormatter, TextFormatter};
pub use self::markup::{Chunk, FieldChunk, FieldKey, FieldNameIterator, MarkupIterator};
pub use self::memo::MemoTable;
pub use self::object::{Dict, Heap, Instance, Native, Object, ObjRef, QualName};
pub use self::registry::{ClassHooks, Registry};
pub use self::spec::{Align, FormatSpec, Sign};
pub use self::template::{render, Template};
pub use self::value::Value;

pub mod ser;
pub mod de;
pub mod error;
pub mod float;
pub mod formatter;
pub mod markup;
pub mod memo;
pub mod object;
pub mod registry;
pub mod spec;
pub mod template;
pub mod value;
mod consts;
mod value_impls;

#[cfg(test)]
#[path = "../test/mod.rs"]
mod test;
