// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! The object graph that pickles are written from and read into.
//!
//! All objects live in a [`Heap`] and refer to each other through [`ObjRef`]
//! handles.  A handle is the identity of an object: two handles are the same
//! object exactly when they compare equal, which is what the memo tables of
//! the pickler and unpickler key on.  Since children are referenced by handle,
//! cyclic graphs need no special representation.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fmt::Write;
use std::hash::{Hash, Hasher};
use std::result;
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};

use crate::error::ErrorCode;
use crate::float;

/// Result of heap operations.  Callers attach the context (stream offset,
/// pickling or formatting) when converting into a crate error.
pub type HeapResult<T> = result::Result<T, ErrorCode>;

/// Handle of an object inside a [`Heap`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ObjRef(u32);

impl ObjRef {
    /// Index of the object in its heap.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Stable identity key of the object, used by memo tables.
    pub fn identity(self) -> u32 {
        self.0
    }
}

/// Module-qualified name of a class, type or function.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct QualName {
    pub module: String,
    pub name: String,
}

impl QualName {
    pub fn new<M: Into<String>, N: Into<String>>(module: M, name: N) -> QualName {
        QualName { module: module.into(), name: name.into() }
    }
}

impl fmt::Display for QualName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// Instance of a user-defined class.
#[derive(Clone, Debug)]
pub struct Instance {
    /// The class, a `Global` object.
    pub class: ObjRef,
    /// Old-style instance, pickled with INST/OBJ instead of the reduce protocol.
    pub classic: bool,
    /// The attribute dictionary, a `Dict` object.
    pub dict: ObjRef,
    /// Items of list-like instances, restored by APPEND(S).
    pub list_items: Vec<ObjRef>,
    /// Items of dict-like instances, restored by SETITEM(S).
    pub dict_items: Vec<(ObjRef, ObjRef)>,
}

/// Opaque value of a host type; only a registered reducer can pickle it.
#[derive(Clone, PartialEq, Debug)]
pub struct Native {
    pub class: QualName,
    pub data: Vec<u8>,
}

/// Storage of a dict: key/value pairs in insertion order, indexed by the
/// hash of their keys.
///
/// Keys hash by value the way they compare in [`Heap::key_eq`]: equal
/// numbers share a hash whatever their kind.  Entries with the same hash
/// are chained through `next`.
#[derive(Clone, Debug, Default)]
pub struct Dict {
    pairs: Vec<(ObjRef, ObjRef)>,
    heads: HashMap<u64, usize>,
    next: Vec<Option<usize>>,
}

impl Dict {
    pub fn pairs(&self) -> &[(ObjRef, ObjRef)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Position of the entry with hash `hash` whose key satisfies `eq`.
    fn find<F: FnMut(ObjRef) -> bool>(&self, hash: u64, mut eq: F) -> Option<usize> {
        let mut cursor = self.heads.get(&hash).cloned();
        while let Some(i) = cursor {
            if eq(self.pairs[i].0) {
                return Some(i);
            }
            cursor = self.next[i];
        }
        None
    }

    fn push(&mut self, hash: u64, key: ObjRef, value: ObjRef) {
        let position = self.pairs.len();
        self.pairs.push((key, value));
        self.next.push(self.heads.insert(hash, position));
    }
}

#[derive(Clone, Debug)]
pub enum Object {
    None,
    Bool(bool),
    Int(i64),
    Long(BigInt),
    Float(f64),
    /// Byte string
    Bytes(Vec<u8>),
    /// Text string
    Str(String),
    Tuple(Vec<ObjRef>),
    List(Vec<ObjRef>),
    /// Insertion-ordered key/value pairs, keys are unique by value
    Dict(Dict),
    /// Class, type or function, referenced by name
    Global(QualName),
    Instance(Instance),
    Native(Native),
}

const NONE: ObjRef = ObjRef(0);
const TRUE: ObjRef = ObjRef(1);
const FALSE: ObjRef = ObjRef(2);

/// Arena owning an object graph.
#[derive(Clone, Debug)]
pub struct Heap {
    objects: Vec<Object>,
    // Globals handed out by `shared_global`.
    shared: HashMap<QualName, ObjRef>,
}

impl Default for Heap {
    fn default() -> Heap {
        Heap::new()
    }
}

impl Heap {
    /// Create a heap holding only the `None`, `True` and `False` singletons.
    pub fn new() -> Heap {
        Heap {
            objects: vec![Object::None, Object::Bool(true), Object::Bool(false)],
            shared: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Store an object and return its handle.  `None` and booleans resolve
    /// to the singletons.
    pub fn alloc(&mut self, obj: Object) -> ObjRef {
        match obj {
            Object::None => NONE,
            Object::Bool(b) => self.bool(b),
            obj => {
                self.objects.push(obj);
                ObjRef((self.objects.len() - 1) as u32)
            }
        }
    }

    /// Access an object.  Panics on handles from a different heap.
    pub fn get(&self, r: ObjRef) -> &Object {
        &self.objects[r.index()]
    }

    pub fn get_mut(&mut self, r: ObjRef) -> &mut Object {
        &mut self.objects[r.index()]
    }

    pub fn none(&self) -> ObjRef {
        NONE
    }

    pub fn bool(&self, b: bool) -> ObjRef {
        if b { TRUE } else { FALSE }
    }

    pub fn int(&mut self, i: i64) -> ObjRef {
        self.alloc(Object::Int(i))
    }

    pub fn long(&mut self, i: BigInt) -> ObjRef {
        self.alloc(Object::Long(i))
    }

    pub fn float(&mut self, f: f64) -> ObjRef {
        self.alloc(Object::Float(f))
    }

    pub fn bytes<B: Into<Vec<u8>>>(&mut self, b: B) -> ObjRef {
        self.alloc(Object::Bytes(b.into()))
    }

    pub fn str<S: Into<String>>(&mut self, s: S) -> ObjRef {
        self.alloc(Object::Str(s.into()))
    }

    pub fn tuple(&mut self, items: Vec<ObjRef>) -> ObjRef {
        self.alloc(Object::Tuple(items))
    }

    pub fn list(&mut self, items: Vec<ObjRef>) -> ObjRef {
        self.alloc(Object::List(items))
    }

    pub fn dict(&mut self) -> ObjRef {
        self.alloc(Object::Dict(Dict::default()))
    }

    pub fn global<M: Into<String>, N: Into<String>>(&mut self, module: M, name: N) -> ObjRef {
        self.alloc(Object::Global(QualName::new(module, name)))
    }

    /// The `Global` object for `name`, allocated only on first use.  The
    /// pickler takes the classes of its default reductions from here.
    pub fn shared_global(&mut self, name: QualName) -> ObjRef {
        if let Some(&obj) = self.shared.get(&name) {
            return obj;
        }
        let obj = self.alloc(Object::Global(name.clone()));
        self.shared.insert(name, obj);
        obj
    }

    /// Create an instance of `class` with an empty attribute dict.
    pub fn instance(&mut self, class: ObjRef, classic: bool) -> ObjRef {
        let dict = self.dict();
        self.alloc(Object::Instance(Instance {
            class,
            classic,
            dict,
            list_items: Vec::new(),
            dict_items: Vec::new(),
        }))
    }

    pub fn native(&mut self, class: QualName, data: Vec<u8>) -> ObjRef {
        self.alloc(Object::Native(Native { class, data }))
    }

    /// Name of the object's type, as shown in error messages.
    pub fn type_name(&self, r: ObjRef) -> String {
        match *self.get(r) {
            Object::None => "NoneType".into(),
            Object::Bool(_) => "bool".into(),
            Object::Int(_) | Object::Long(_) => "int".into(),
            Object::Float(_) => "float".into(),
            Object::Bytes(_) => "bytes".into(),
            Object::Str(_) => "str".into(),
            Object::Tuple(_) => "tuple".into(),
            Object::List(_) => "list".into(),
            Object::Dict(_) => "dict".into(),
            Object::Global(_) => "type".into(),
            Object::Instance(_) | Object::Native(_) => match self.class_of(r) {
                Some(q) => q.name,
                None => "object".into(),
            },
        }
    }

    /// Qualified name of the class of an instance or native value.
    pub fn class_of(&self, r: ObjRef) -> Option<QualName> {
        match *self.get(r) {
            Object::Instance(ref inst) => match *self.get(inst.class) {
                Object::Global(ref q) => Some(q.clone()),
                _ => None,
            },
            Object::Native(ref n) => Some(n.class.clone()),
            _ => None,
        }
    }

    /// Qualified name of a `Global` object.
    pub fn qualname(&self, r: ObjRef) -> Option<&QualName> {
        match *self.get(r) {
            Object::Global(ref q) => Some(q),
            _ => None,
        }
    }

    /// The attribute dict of an instance.
    pub fn instance_dict(&self, r: ObjRef) -> Option<ObjRef> {
        match *self.get(r) {
            Object::Instance(ref inst) => Some(inst.dict),
            _ => None,
        }
    }

    pub fn getattr(&self, obj: ObjRef, name: &str) -> Option<ObjRef> {
        let dict = self.instance_dict(obj)?;
        self.dict_get_str(dict, name)
    }

    pub fn setattr(&mut self, obj: ObjRef, name: &str, value: ObjRef) -> HeapResult<()> {
        let dict = match self.instance_dict(obj) {
            Some(dict) => dict,
            None => return Err(ErrorCode::InvalidValue(
                format!("'{}' object has no attribute '{}'", self.type_name(obj), name))),
        };
        let key = self.str(name);
        self.dict_set(dict, key, value)
    }

    /// Append to a list, or to the items of a list-like instance.
    pub fn list_append(&mut self, list: ObjRef, item: ObjRef) -> HeapResult<()> {
        match *self.get_mut(list) {
            Object::List(ref mut items) => items.push(item),
            Object::Instance(ref mut inst) => inst.list_items.push(item),
            _ => return Err(ErrorCode::InvalidStackTop("list", self.type_name(list))),
        }
        Ok(())
    }

    /// Set a dict item, replacing the value of an equal key.  Dict-like
    /// instances record the pair in insertion order.
    pub fn dict_set(&mut self, dict: ObjRef, key: ObjRef, value: ObjRef) -> HeapResult<()> {
        match *self.get(dict) {
            Object::Dict(ref d) => {
                if !self.is_hashable(key) {
                    return Err(ErrorCode::ValueNotHashable);
                }
                let hash = self.key_hash(key);
                let existing = d.find(hash, |k| self.key_eq(k, key));
                if let Object::Dict(ref mut d) = *self.get_mut(dict) {
                    match existing {
                        Some(i) => d.pairs[i].1 = value,
                        None => d.push(hash, key, value),
                    }
                }
                Ok(())
            }
            Object::Instance(_) => {
                if let Object::Instance(ref mut inst) = *self.get_mut(dict) {
                    inst.dict_items.push((key, value));
                }
                Ok(())
            }
            _ => Err(ErrorCode::InvalidStackTop("dict", self.type_name(dict))),
        }
    }

    /// Append a pair with an unhashable key.  It keeps its place in the
    /// pairs but no lookup finds it.
    pub(crate) fn dict_push_unhashable(&mut self, dict: ObjRef, key: ObjRef, value: ObjRef) {
        if let Object::Dict(ref mut d) = *self.get_mut(dict) {
            d.pairs.push((key, value));
            d.next.push(None);
        }
    }

    pub fn dict_get(&self, dict: ObjRef, key: ObjRef) -> Option<ObjRef> {
        match *self.get(dict) {
            Object::Dict(ref d) if self.is_hashable(key) => d
                .find(self.key_hash(key), |k| self.key_eq(k, key))
                .map(|i| d.pairs[i].1),
            _ => None,
        }
    }

    /// Look up a text key without allocating it.
    pub fn dict_get_str(&self, dict: ObjRef, key: &str) -> Option<ObjRef> {
        match *self.get(dict) {
            Object::Dict(ref d) => d.find(hash_one(|state| hash_text(key, state)),
                                          |k| match *self.get(k) {
                Object::Str(ref s) => s == key,
                _ => false,
            }).map(|i| d.pairs[i].1),
            _ => None,
        }
    }

    /// Entries of a dict object, empty for anything else.
    pub fn dict_items(&self, dict: ObjRef) -> &[(ObjRef, ObjRef)] {
        match *self.get(dict) {
            Object::Dict(ref d) => d.pairs(),
            _ => &[],
        }
    }

    pub fn is_hashable(&self, r: ObjRef) -> bool {
        self.is_hashable_depth(r, 0)
    }

    fn is_hashable_depth(&self, r: ObjRef, depth: usize) -> bool {
        match *self.get(r) {
            Object::List(_) | Object::Dict(_) => false,
            Object::Tuple(ref items) => depth < MAX_COMPARE_DEPTH &&
                items.iter().all(|&item| self.is_hashable_depth(item, depth + 1)),
            _ => true,
        }
    }

    /// Equality of dict keys: numbers compare by value across int, long,
    /// bool and float, instances by identity.
    pub fn key_eq(&self, a: ObjRef, b: ObjRef) -> bool {
        self.key_eq_depth(a, b, 0)
    }

    fn key_eq_depth(&self, a: ObjRef, b: ObjRef, depth: usize) -> bool {
        if a == b {
            return true;
        }
        if let (&Object::Int(x), &Object::Int(y)) = (self.get(a), self.get(b)) {
            return x == y;
        }
        if let (Some(x), Some(y)) = (self.number(a), self.number(b)) {
            return x == y;
        }
        match (self.get(a), self.get(b)) {
            (&Object::Str(ref x), &Object::Str(ref y)) => x == y,
            (&Object::Bytes(ref x), &Object::Bytes(ref y)) => x == y,
            (&Object::Global(ref x), &Object::Global(ref y)) => x == y,
            (&Object::Tuple(ref x), &Object::Tuple(ref y)) =>
                depth < MAX_COMPARE_DEPTH && x.len() == y.len() &&
                x.iter().zip(y).all(|(&i, &j)| self.key_eq_depth(i, j, depth + 1)),
            _ => false,
        }
    }

    fn number(&self, r: ObjRef) -> Option<Number> {
        match *self.get(r) {
            Object::Bool(b) => Some(Number::Int(BigInt::from(b as i64))),
            Object::Int(i) => Some(Number::Int(BigInt::from(i))),
            Object::Long(ref i) => Some(Number::Int(i.clone())),
            Object::Float(f) => Some(match BigInt::from_f64(f) {
                Some(i) if f.fract() == 0.0 => Number::Int(i),
                _ => Number::Float(f),
            }),
            _ => None,
        }
    }

    /// Hash of a hashable key, consistent with [`key_eq`](Heap::key_eq).
    fn key_hash(&self, key: ObjRef) -> u64 {
        hash_one(|state| self.hash_key(key, state, 0))
    }

    fn hash_key(&self, key: ObjRef, state: &mut DefaultHasher, depth: usize) {
        match *self.get(key) {
            Object::None => state.write_u8(0),
            Object::Bool(b) => hash_int(b as i64, state),
            Object::Int(i) => hash_int(i, state),
            Object::Long(ref i) => match i.to_i64() {
                Some(i) => hash_int(i, state),
                None => hash_long(i, state),
            },
            Object::Float(f) if f.fract() == 0.0 => match f.to_i64() {
                Some(i) => hash_int(i, state),
                None => match BigInt::from_f64(f) {
                    Some(i) => hash_long(&i, state),
                    None => state.write_u64(f.to_bits()),
                },
            },
            Object::Float(f) => {
                state.write_u8(3);
                state.write_u64(f.to_bits());
            }
            Object::Bytes(ref b) => {
                state.write_u8(4);
                b.hash(state);
            }
            Object::Str(ref s) => hash_text(s, state),
            Object::Global(ref q) => {
                state.write_u8(6);
                q.hash(state);
            }
            Object::Tuple(ref items) => {
                state.write_u8(7);
                state.write_usize(items.len());
                if depth < MAX_COMPARE_DEPTH {
                    for &item in items {
                        self.hash_key(item, state, depth + 1);
                    }
                }
            }
            // Compared by identity.
            Object::List(_) | Object::Dict(_) | Object::Instance(_) | Object::Native(_) => {
                state.write_u8(8);
                key.hash(state);
            }
        }
    }

    /// Structural equality of the graph at `a` in this heap and the graph at
    /// `b` in `other`.  Cycles are followed once; NaN equals NaN.
    pub fn equivalent(&self, a: ObjRef, other: &Heap, b: ObjRef) -> bool {
        let mut seen = HashSet::new();
        let mut pending = vec![(a, b)];
        while let Some((a, b)) = pending.pop() {
            if !seen.insert((a, b)) {
                continue;
            }
            let same = match (self.get(a), other.get(b)) {
                (&Object::None, &Object::None) => true,
                (&Object::Bool(x), &Object::Bool(y)) => x == y,
                (&Object::Int(x), &Object::Int(y)) => x == y,
                (&Object::Long(ref x), &Object::Long(ref y)) => x == y,
                (&Object::Float(x), &Object::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
                (&Object::Bytes(ref x), &Object::Bytes(ref y)) => x == y,
                (&Object::Str(ref x), &Object::Str(ref y)) => x == y,
                (&Object::Tuple(ref x), &Object::Tuple(ref y)) |
                (&Object::List(ref x), &Object::List(ref y)) => push_items(&mut pending, x, y),
                (&Object::Dict(ref x), &Object::Dict(ref y)) =>
                    push_pairs(&mut pending, x.pairs(), y.pairs()),
                (&Object::Global(ref x), &Object::Global(ref y)) => x == y,
                (&Object::Instance(ref x), &Object::Instance(ref y)) => {
                    pending.push((x.class, y.class));
                    pending.push((x.dict, y.dict));
                    x.classic == y.classic &&
                        push_items(&mut pending, &x.list_items, &y.list_items) &&
                        push_pairs(&mut pending, &x.dict_items, &y.dict_items)
                }
                (&Object::Native(ref x), &Object::Native(ref y)) => x == y,
                _ => false,
            };
            if !same {
                return false;
            }
        }
        true
    }

    /// Python-style `repr()` of an object.
    pub fn repr(&self, r: ObjRef) -> String {
        let mut out = String::new();
        self.write_repr(r, &mut out, &mut Vec::new());
        out
    }

    /// Python-style `str()` of an object: text as is, everything else as repr.
    pub fn str_of(&self, r: ObjRef) -> String {
        match *self.get(r) {
            Object::Str(ref s) => s.clone(),
            _ => self.repr(r),
        }
    }

    fn write_repr(&self, r: ObjRef, out: &mut String, active: &mut Vec<ObjRef>) {
        let recursive = active.contains(&r);
        let nested = match *self.get(r) {
            Object::Tuple(_) | Object::List(_) | Object::Dict(_) => true,
            _ => false,
        };
        if nested && !recursive && active.len() >= MAX_REPR_DEPTH {
            return out.push_str("...");
        }
        match *self.get(r) {
            Object::None => out.push_str("None"),
            Object::Bool(b) => out.push_str(if b { "True" } else { "False" }),
            Object::Int(i) => { let _ = write!(out, "{}", i); }
            Object::Long(ref i) => { let _ = write!(out, "{}", i); }
            Object::Float(f) => out.push_str(&float::repr(f)),
            Object::Bytes(ref b) => {
                out.push('b');
                out.push_str(&bytes_repr(b));
            }
            Object::Str(ref s) => out.push_str(&str_repr(s)),
            Object::Tuple(ref items) => {
                if recursive {
                    return out.push_str("(...)");
                }
                active.push(r);
                out.push('(');
                self.write_seq(items, out, active);
                if items.len() == 1 {
                    out.push(',');
                }
                out.push(')');
                active.pop();
            }
            Object::List(ref items) => {
                if recursive {
                    return out.push_str("[...]");
                }
                active.push(r);
                out.push('[');
                self.write_seq(items, out, active);
                out.push(']');
                active.pop();
            }
            Object::Dict(ref d) => {
                if recursive {
                    return out.push_str("{...}");
                }
                active.push(r);
                out.push('{');
                for (i, &(k, v)) in d.pairs().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_repr(k, out, active);
                    out.push_str(": ");
                    self.write_repr(v, out, active);
                }
                out.push('}');
                active.pop();
            }
            Object::Global(ref q) => { let _ = write!(out, "<class '{}'>", q); }
            Object::Instance(ref inst) => {
                let kind = if inst.classic { "instance" } else { "object" };
                match *self.get(inst.class) {
                    Object::Global(ref q) => { let _ = write!(out, "<{} {}>", q, kind); }
                    _ => { let _ = write!(out, "<{}>", kind); }
                }
            }
            Object::Native(ref n) => { let _ = write!(out, "<{} object>", n.class); }
        }
    }

    fn write_seq(&self, items: &[ObjRef], out: &mut String, active: &mut Vec<ObjRef>) {
        for (i, &item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_repr(item, out, active);
        }
    }
}

const MAX_COMPARE_DEPTH: usize = 1000;

/// Containers nested deeper than this are shown as `...` by `repr`.
const MAX_REPR_DEPTH: usize = 200;

fn hash_one<F: FnOnce(&mut DefaultHasher)>(f: F) -> u64 {
    let mut state = DefaultHasher::new();
    f(&mut state);
    state.finish()
}

fn hash_int(i: i64, state: &mut DefaultHasher) {
    state.write_u8(1);
    state.write_i64(i);
}

fn hash_long(i: &BigInt, state: &mut DefaultHasher) {
    state.write_u8(2);
    i.hash(state);
}

fn hash_text(s: &str, state: &mut DefaultHasher) {
    state.write_u8(5);
    s.hash(state);
}

/// Queue the element pairs of two sequences; false if their lengths differ.
fn push_items(pending: &mut Vec<(ObjRef, ObjRef)>, xs: &[ObjRef], ys: &[ObjRef]) -> bool {
    if xs.len() != ys.len() {
        return false;
    }
    pending.extend(xs.iter().cloned().zip(ys.iter().cloned()));
    true
}

fn push_pairs(pending: &mut Vec<(ObjRef, ObjRef)>, xs: &[(ObjRef, ObjRef)],
              ys: &[(ObjRef, ObjRef)]) -> bool {
    if xs.len() != ys.len() {
        return false;
    }
    for (&(k1, v1), &(k2, v2)) in xs.iter().zip(ys) {
        pending.push((k1, k2));
        pending.push((v1, v2));
    }
    true
}

#[derive(PartialEq)]
enum Number {
    Int(BigInt),
    Float(f64),
}

fn quote_for(has_single: bool, has_double: bool) -> char {
    if has_single && !has_double { '"' } else { '\'' }
}

/// Quoted repr of a text string.
pub fn str_repr(s: &str) -> String {
    let quote = quote_for(s.contains('\''), s.contains('"'));
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c == quote => { out.push('\\'); out.push(c); }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if c.is_control() => {
                if (c as u32) < 0x100 {
                    let _ = write!(out, "\\x{:02x}", c as u32);
                } else {
                    let _ = write!(out, "\\u{:04x}", c as u32);
                }
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Quoted repr of a byte string (without the `b` prefix).
pub fn bytes_repr(b: &[u8]) -> String {
    let quote = quote_for(b.contains(&b'\''), b.contains(&b'"'));
    let mut out = String::with_capacity(b.len() + 2);
    out.push(quote);
    for &byte in b {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            byte if byte as char == quote => { out.push('\\'); out.push(quote); }
            0x20..=0x7e => out.push(byte as char),
            byte => { let _ = write!(out, "\\x{:02x}", byte); }
        }
    }
    out.push(quote);
    out
}

impl Object {
    /// The value of an integer or bool as a big integer.
    pub fn to_bigint(&self) -> Option<BigInt> {
        match *self {
            Object::Bool(b) => Some(BigInt::from(b as i64)),
            Object::Int(i) => Some(BigInt::from(i)),
            Object::Long(ref i) => Some(i.clone()),
            _ => None,
        }
    }
}
