// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Owned, acyclic snapshots of object graphs.

use std::fmt;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::error::{Error, ErrorCode, Result};
use crate::float;
use crate::object::{bytes_repr, str_repr, Heap, Object, ObjRef, QualName};

/// Represents the objects a pickle can hold, as a tree.
///
/// Note on integers: the distinction between the two types (short and long) is
/// very fuzzy in Python, and they can be used interchangeably.  While
/// snapshotting, all integers that fit into an i64 become `I64`, and `BigInt`
/// is used for the rest.
///
/// Dicts keep their insertion order.  Instances keep their class name and
/// attribute dict; items of list-like or dict-like instances are not part of
/// the snapshot.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// None
    None,
    /// Boolean
    Bool(bool),
    /// Short integer
    I64(i64),
    /// Long integer (unbounded length)
    Int(BigInt),
    /// Float
    F64(f64),
    /// Bytestring
    Bytes(Vec<u8>),
    /// Unicode string
    String(String),
    /// List
    List(Vec<Value>),
    /// Tuple
    Tuple(Vec<Value>),
    /// Dictionary (map)
    Dict(Vec<(Value, Value)>),
    /// Class or function, referenced by name
    Global { module: String, name: String },
    /// Instance of a class, with its attributes
    Object { module: String, name: String, attrs: Vec<(Value, Value)> },
}

const MAX_SNAPSHOT_DEPTH: usize = 500;

impl Heap {
    /// Take a snapshot of the graph at `root`.  Shared objects are copied;
    /// a cycle fails with a `Recursive` error.
    pub fn to_value(&self, root: ObjRef) -> Result<Value> {
        self.snapshot(root, &mut Vec::new())
    }

    fn snapshot(&self, r: ObjRef, active: &mut Vec<ObjRef>) -> Result<Value> {
        if active.contains(&r) {
            return Err(Error::Syntax(ErrorCode::Recursive));
        }
        if active.len() >= MAX_SNAPSHOT_DEPTH {
            return Err(Error::Syntax(ErrorCode::MaxDepthExceeded));
        }
        active.push(r);
        let value = match *self.get(r) {
            Object::None => Value::None,
            Object::Bool(b) => Value::Bool(b),
            Object::Int(i) => Value::I64(i),
            Object::Long(ref i) => match i.to_i64() {
                Some(i) => Value::I64(i),
                None => Value::Int(i.clone()),
            },
            Object::Float(f) => Value::F64(f),
            Object::Bytes(ref b) => Value::Bytes(b.clone()),
            Object::Str(ref s) => Value::String(s.clone()),
            Object::Tuple(ref items) => Value::Tuple(self.snapshot_all(items, active)?),
            Object::List(ref items) => Value::List(self.snapshot_all(items, active)?),
            Object::Dict(ref d) => Value::Dict(self.snapshot_pairs(d.pairs(), active)?),
            Object::Global(ref q) => Value::Global { module: q.module.clone(), name: q.name.clone() },
            Object::Instance(ref inst) => {
                let QualName { module, name } = match self.qualname(inst.class) {
                    Some(q) => q.clone(),
                    None => return Err(Error::Syntax(ErrorCode::InvalidStackTop(
                        "class", self.type_name(inst.class)))),
                };
                let attrs = self.snapshot_pairs(self.dict_items(inst.dict), active)?;
                Value::Object { module, name, attrs }
            }
            Object::Native(ref n) => return Err(Error::Syntax(ErrorCode::InvalidValue(
                format!("cannot take a snapshot of native {} object", n.class)))),
        };
        active.pop();
        Ok(value)
    }

    fn snapshot_all(&self, items: &[ObjRef], active: &mut Vec<ObjRef>) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(items.len());
        for &item in items {
            values.push(self.snapshot(item, active)?);
        }
        Ok(values)
    }

    fn snapshot_pairs(&self, pairs: &[(ObjRef, ObjRef)],
                      active: &mut Vec<ObjRef>) -> Result<Vec<(Value, Value)>> {
        let mut values = Vec::with_capacity(pairs.len());
        for &(k, v) in pairs {
            let key = self.snapshot(k, active)?;
            values.push((key, self.snapshot(v, active)?));
        }
        Ok(values)
    }

    /// Build a graph from a snapshot and return its root.  Every container
    /// of the snapshot becomes a distinct object.
    pub fn insert_value(&mut self, value: &Value) -> ObjRef {
        match *value {
            Value::None => self.none(),
            Value::Bool(b) => self.bool(b),
            Value::I64(i) => self.int(i),
            Value::Int(ref i) => self.long(i.clone()),
            Value::F64(f) => self.float(f),
            Value::Bytes(ref b) => self.bytes(b.clone()),
            Value::String(ref s) => self.str(s.clone()),
            Value::List(ref items) => {
                let items = items.iter().map(|item| self.insert_value(item)).collect();
                self.list(items)
            }
            Value::Tuple(ref items) => {
                let items = items.iter().map(|item| self.insert_value(item)).collect();
                self.tuple(items)
            }
            Value::Dict(ref pairs) => {
                let dict = self.dict();
                self.insert_pairs(dict, pairs);
                dict
            }
            Value::Global { ref module, ref name } => self.global(module.clone(), name.clone()),
            Value::Object { ref module, ref name, ref attrs } => {
                let class = self.global(module.clone(), name.clone());
                let inst = self.instance(class, false);
                if let Some(dict) = self.instance_dict(inst) {
                    self.insert_pairs(dict, attrs);
                }
                inst
            }
        }
    }

    // A snapshot taken from a heap never holds unhashable keys; hand-built
    // ones may, and those keys are kept in place.
    fn insert_pairs(&mut self, dict: ObjRef, pairs: &[(Value, Value)]) {
        for (k, v) in pairs {
            let key = self.insert_value(k);
            let value = self.insert_value(v);
            if self.dict_set(dict, key, value).is_err() {
                self.dict_push_unhashable(dict, key, value);
            }
        }
    }
}

fn write_elements(f: &mut fmt::Formatter, items: &[Value], prefix: &'static str,
                  suffix: &'static str) -> fmt::Result {
    f.write_str(prefix)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    // One-element tuples keep their trailing comma.
    if items.len() == 1 && prefix == "(" {
        f.write_str(",")?;
    }
    f.write_str(suffix)
}

fn write_pairs(f: &mut fmt::Formatter, pairs: &[(Value, Value)]) -> fmt::Result {
    f.write_str("{")?;
    for (i, (key, value)) in pairs.iter().enumerate() {
        if i < pairs.len() - 1 {
            write!(f, "{}: {}, ", key, value)?;
        } else {
            write!(f, "{}: {}", key, value)?;
        }
    }
    f.write_str("}")
}

/// Python-style `repr()`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::None          => write!(f, "None"),
            Value::Bool(b)       => write!(f, "{}", if b { "True" } else { "False" }),
            Value::I64(i)        => write!(f, "{}", i),
            Value::Int(ref i)    => write!(f, "{}", i),
            Value::F64(v)        => f.write_str(&float::repr(v)),
            Value::Bytes(ref b)  => write!(f, "b{}", bytes_repr(b)),
            Value::String(ref s) => f.write_str(&str_repr(s)),
            Value::List(ref v)   => write_elements(f, v, "[", "]"),
            Value::Tuple(ref v)  => write_elements(f, v, "(", ")"),
            Value::Dict(ref v)   => write_pairs(f, v),
            Value::Global { ref module, ref name } => write!(f, "<class '{}.{}'>", module, name),
            Value::Object { ref module, ref name, ref attrs } => {
                write!(f, "<{}.{} object ", module, name)?;
                write_pairs(f, attrs)?;
                f.write_str(">")
            }
        }
    }
}
