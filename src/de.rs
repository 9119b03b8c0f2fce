// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! # Pickle deserialization
//!
//! Pickles are not a declarative format, but a program for a stack-based
//! VM.  Each decoded value is pushed on the stack, and some operations pop
//! items from the stack and construct new objects with them.  Objects are
//! allocated in a caller-supplied [`Heap`], so shared and cyclic structures
//! come back with their sharing intact.

use std::char;
use std::collections::HashMap;
use std::io;
use std::str;
use byteorder::{ByteOrder, BigEndian, LittleEndian};
use iter_read::IterRead;
use log::debug;
use num_bigint::BigInt;

use crate::consts::*;
use crate::error::{Error, ErrorCode, Result};
use crate::object::{Heap, Object, ObjRef, QualName};
use crate::registry::Registry;
use crate::value::Value;

/// Options for unpickling.
#[derive(Clone, Debug)]
pub struct UnpickleOptions {
    max_depth: usize,
    check_trailing: bool,
}

impl UnpickleOptions {
    /// Construct with default options: MARK nesting up to 2000, and
    /// trailing bytes after STOP rejected by the `load_from_*` functions.
    pub fn new() -> Self {
        UnpickleOptions { max_depth: 2000, check_trailing: true }
    }

    /// Limit how deeply MARK groups may nest.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Whether to fail if the stream continues after the pickle.
    pub fn check_trailing(mut self, check: bool) -> Self {
        self.check_trailing = check;
        self
    }
}

impl Default for UnpickleOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves a persistent id (a text object for `P`, any object for `Q`)
/// to the object it stands for.
pub type PersistentLoad<'a> = Box<dyn FnMut(&mut Heap, ObjRef) -> Result<ObjRef> + 'a>;

struct CharIter<Iter: Iterator<Item=io::Result<u8>>> {
    rdr: Iter,
    pos: usize,
}

impl<Iter: Iterator<Item=io::Result<u8>>> Iterator for CharIter<Iter> {
    type Item = io::Result<u8>;
    fn next(&mut self) -> Option<io::Result<u8>> {
        let next = self.rdr.next();
        if let Some(Ok(_)) = next {
            self.pos += 1;
        }
        next
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum Slot {
    Mark,
    Obj(ObjRef),
}

/// Decodes pickle streams into objects of a [`Heap`].
///
/// The memo survives between calls to [`load`](Unpickler::load), matching
/// a pickler that dumped several roots in a row.
pub struct Unpickler<'a, R: io::Read> {
    rdr: CharIter<io::Bytes<R>>,
    heap: &'a mut Heap,
    registry: &'a Registry,
    stack: Vec<Slot>,
    marks: usize,
    memo: HashMap<u32, ObjRef>,
    globals: HashMap<QualName, ObjRef>,
    persistent_load: Option<PersistentLoad<'a>>,
    max_depth: usize,
    // Offset of the opcode being executed, reported with errors.
    op_pos: usize,
}

impl<'a, R: io::Read> Unpickler<'a, R> {
    pub fn new(rdr: R, heap: &'a mut Heap, registry: &'a Registry,
               options: UnpickleOptions) -> Self {
        Unpickler {
            rdr: CharIter { rdr: rdr.bytes(), pos: 0 },
            heap,
            registry,
            stack: Vec::with_capacity(128),
            marks: 0,
            memo: HashMap::new(),
            globals: HashMap::new(),
            persistent_load: None,
            max_depth: options.max_depth,
            op_pos: 0,
        }
    }

    /// Install a persistent load hook.
    pub fn persistent_load<F>(&mut self, hook: F)
        where F: FnMut(&mut Heap, ObjRef) -> Result<ObjRef> + 'a
    {
        self.persistent_load = Some(Box::new(hook));
    }

    /// Read one pickle, up to and including its STOP opcode.
    pub fn load(&mut self) -> Result<ObjRef> {
        debug!("unpickling at offset {}", self.rdr.pos);
        self.stack.clear();
        self.marks = 0;
        let result = self.parse();
        self.stack.clear();
        self.marks = 0;
        result
    }

    /// Check that the stream has been consumed completely.
    pub fn end(&mut self) -> Result<()> {
        self.op_pos = self.rdr.pos;
        match self.rdr.next() {
            Some(Err(err)) => Err(Error::Io(err)),
            Some(Ok(_)) => self.error(ErrorCode::TrailingBytes),
            None => Ok(()),
        }
    }

    fn parse(&mut self) -> Result<ObjRef> {
        loop {
            self.op_pos = self.rdr.pos;
            match self.read_byte()? {
                // Specials
                STOP => return self.pop(),
                MARK => {
                    if self.marks >= self.max_depth {
                        return self.error(ErrorCode::MaxDepthExceeded);
                    }
                    self.marks += 1;
                    self.stack.push(Slot::Mark);
                }
                POP => match self.stack.pop() {
                    Some(Slot::Mark) => self.marks -= 1,
                    Some(Slot::Obj(_)) => {}
                    None => return self.error(ErrorCode::StackUnderflow),
                },
                POP_MARK => { self.pop_mark()?; }
                DUP => match self.stack.last().cloned() {
                    Some(Slot::Mark) => {
                        self.marks += 1;
                        self.stack.push(Slot::Mark);
                    }
                    Some(slot) => self.stack.push(slot),
                    None => return self.error(ErrorCode::StackUnderflow),
                },
                PROTO => {
                    let proto = self.read_byte()?;
                    if proto > HIGHEST_PROTOCOL {
                        return self.error(ErrorCode::UnsupportedProtocol(proto));
                    }
                }

                // Persistent references
                PERSID => {
                    let pid = self.read_text_line()?;
                    let pid = self.heap.str(pid);
                    let obj = self.load_persistent(pid)?;
                    self.push(obj);
                }
                BINPERSID => {
                    let pid = self.pop()?;
                    let obj = self.load_persistent(pid)?;
                    self.push(obj);
                }

                // Memo
                PUT => {
                    let index = self.read_index_line()?;
                    self.memoize(index)?;
                }
                BINPUT => {
                    let index = self.read_byte()? as u32;
                    self.memoize(index)?;
                }
                LONG_BINPUT => {
                    let bytes = self.read_bytes(4)?;
                    self.memoize(LittleEndian::read_u32(&bytes))?;
                }
                GET => {
                    let index = self.read_index_line()?;
                    self.fetch(index)?;
                }
                BINGET => {
                    let index = self.read_byte()? as u32;
                    self.fetch(index)?;
                }
                LONG_BINGET => {
                    let bytes = self.read_bytes(4)?;
                    self.fetch(LittleEndian::read_u32(&bytes))?;
                }

                // Singletons
                NONE => self.push(self.heap.none()),
                NEWFALSE => self.push(self.heap.bool(false)),
                NEWTRUE => self.push(self.heap.bool(true)),

                // ASCII-formatted numbers
                INT => {
                    let line = self.read_line()?;
                    // Protocol 0 and 1 way of spelling True and False
                    let obj = if line == b"00" {
                        self.heap.bool(false)
                    } else if line == b"01" {
                        self.heap.bool(true)
                    } else {
                        let text = str::from_utf8(&line).unwrap_or("").trim();
                        match text.parse::<i64>() {
                            Ok(i) => self.heap.int(i),
                            Err(_) => match BigInt::parse_bytes(text.as_bytes(), 10) {
                                Some(i) => self.heap.long(i),
                                None => return self.error(ErrorCode::InvalidLiteral(line)),
                            },
                        }
                    };
                    self.push(obj);
                }
                LONG => {
                    let mut line = self.read_line()?;
                    // Remove "L" suffix.
                    if line.last() == Some(&b'L') {
                        line.pop();
                    }
                    match BigInt::parse_bytes(&line, 10) {
                        Some(i) => {
                            let obj = self.heap.long(i);
                            self.push(obj);
                        }
                        None => return self.error(ErrorCode::InvalidLiteral(line)),
                    }
                }
                FLOAT => {
                    let line = self.read_line()?;
                    match parse_float(&line) {
                        Some(f) => {
                            let obj = self.heap.float(f);
                            self.push(obj);
                        }
                        None => return self.error(ErrorCode::InvalidLiteral(line)),
                    }
                }

                // Binary-coded numbers
                BINFLOAT => {
                    let bytes = self.read_bytes(8)?;
                    let obj = self.heap.float(BigEndian::read_f64(&bytes));
                    self.push(obj);
                }
                BININT => {
                    let bytes = self.read_bytes(4)?;
                    let obj = self.heap.int(LittleEndian::read_i32(&bytes) as i64);
                    self.push(obj);
                }
                BININT1 => {
                    let byte = self.read_byte()?;
                    let obj = self.heap.int(byte as i64);
                    self.push(obj);
                }
                BININT2 => {
                    let bytes = self.read_bytes(2)?;
                    let obj = self.heap.int(LittleEndian::read_u16(&bytes) as i64);
                    self.push(obj);
                }
                // Length-prefixed two's complement longs
                LONG1 => {
                    let bytes = self.read_u8_prefixed_bytes()?;
                    let obj = self.heap.long(BigInt::from_signed_bytes_le(&bytes));
                    self.push(obj);
                }
                LONG4 => {
                    let bytes = self.read_i32_prefixed_bytes()?;
                    let obj = self.heap.long(BigInt::from_signed_bytes_le(&bytes));
                    self.push(obj);
                }

                // Strings
                STRING => {
                    let line = self.read_line()?;
                    let bytes = self.decode_escaped_string(&line)?;
                    let obj = self.heap.bytes(bytes);
                    self.push(obj);
                }
                SHORT_BINSTRING => {
                    let bytes = self.read_u8_prefixed_bytes()?;
                    let obj = self.heap.bytes(bytes);
                    self.push(obj);
                }
                BINSTRING => {
                    let bytes = self.read_i32_prefixed_bytes()?;
                    let obj = self.heap.bytes(bytes);
                    self.push(obj);
                }
                UNICODE => {
                    let line = self.read_line()?;
                    let string = self.decode_escaped_unicode(&line)?;
                    let obj = self.heap.str(string);
                    self.push(obj);
                }
                BINUNICODE => {
                    let bytes = self.read_u32_prefixed_bytes()?;
                    let string = self.decode_unicode(bytes)?;
                    let obj = self.heap.str(string);
                    self.push(obj);
                }

                // Containers
                EMPTY_TUPLE => {
                    let obj = self.heap.tuple(vec![]);
                    self.push(obj);
                }
                TUPLE1 => self.pop_tuple(1)?,
                TUPLE2 => self.pop_tuple(2)?,
                TUPLE3 => self.pop_tuple(3)?,
                TUPLE => {
                    let items = self.pop_mark()?;
                    let obj = self.heap.tuple(items);
                    self.push(obj);
                }
                EMPTY_LIST => {
                    let obj = self.heap.list(vec![]);
                    self.push(obj);
                }
                LIST => {
                    let items = self.pop_mark()?;
                    let obj = self.heap.list(items);
                    self.push(obj);
                }
                APPEND => {
                    let value = self.pop()?;
                    let list = self.top()?;
                    let pos = self.op_pos;
                    self.heap.list_append(list, value).map_err(at(pos))?;
                }
                APPENDS => {
                    let items = self.pop_mark()?;
                    let list = self.top()?;
                    let pos = self.op_pos;
                    for item in items {
                        self.heap.list_append(list, item).map_err(at(pos))?;
                    }
                }
                EMPTY_DICT => {
                    let obj = self.heap.dict();
                    self.push(obj);
                }
                DICT => {
                    let items = self.pop_mark()?;
                    let dict = self.heap.dict();
                    self.set_items(dict, &items)?;
                    self.push(dict);
                }
                SETITEM => {
                    let value = self.pop()?;
                    let key = self.pop()?;
                    let dict = self.top()?;
                    let pos = self.op_pos;
                    self.heap.dict_set(dict, key, value).map_err(at(pos))?;
                }
                SETITEMS => {
                    let items = self.pop_mark()?;
                    let dict = self.top()?;
                    self.set_items(dict, &items)?;
                }

                // Globals and object construction
                GLOBAL => {
                    let module = self.read_text_line()?;
                    let name = self.read_text_line()?;
                    let obj = self.find_global(&module, &name)?;
                    self.push(obj);
                }
                EXT1 => {
                    let code = self.read_byte()? as u32;
                    self.load_extension(code)?;
                }
                EXT2 => {
                    let bytes = self.read_bytes(2)?;
                    self.load_extension(LittleEndian::read_u16(&bytes) as u32)?;
                }
                EXT4 => {
                    let bytes = self.read_bytes(4)?;
                    self.load_extension(LittleEndian::read_u32(&bytes))?;
                }
                REDUCE => {
                    let args = self.pop()?;
                    let args = self.arg_tuple(args)?;
                    let callable = self.pop()?;
                    let obj = self.registry.call(self.heap, callable, &args)
                        .map_err(|e| self.relocate(e))?;
                    self.push(obj);
                }
                NEWOBJ => {
                    let args = self.pop()?;
                    let args = self.arg_tuple(args)?;
                    let cls = self.pop()?;
                    let obj = self.registry.new_object(self.heap, cls, &args)
                        .map_err(|e| self.relocate(e))?;
                    self.push(obj);
                }
                INST => {
                    let module = self.read_text_line()?;
                    let name = self.read_text_line()?;
                    let cls = self.find_global(&module, &name)?;
                    let args = self.pop_mark()?;
                    let obj = self.registry.instantiate(self.heap, cls, &args)
                        .map_err(|e| self.relocate(e))?;
                    self.push(obj);
                }
                OBJ => {
                    let items = self.pop_mark()?;
                    let (cls, args) = match items.split_first() {
                        Some((&cls, args)) => (cls, args.to_vec()),
                        None => return self.error(ErrorCode::StackUnderflow),
                    };
                    let obj = self.registry.instantiate(self.heap, cls, &args)
                        .map_err(|e| self.relocate(e))?;
                    self.push(obj);
                }
                BUILD => {
                    let state = self.pop()?;
                    let inst = self.top()?;
                    self.registry.build(self.heap, inst, state).map_err(|e| self.relocate(e))?;
                }

                code => return self.error(ErrorCode::Unsupported(code as char)),
            }
        }
    }

    /// Replace the top `n` objects by a tuple of them.
    fn pop_tuple(&mut self, n: usize) -> Result<()> {
        let mut items = vec![];
        for _ in 0..n {
            items.push(self.pop()?);
        }
        items.reverse();
        let obj = self.heap.tuple(items);
        self.push(obj);
        Ok(())
    }

    fn push(&mut self, obj: ObjRef) {
        self.stack.push(Slot::Obj(obj));
    }

    fn pop(&mut self) -> Result<ObjRef> {
        match self.stack.pop() {
            Some(Slot::Obj(obj)) => Ok(obj),
            Some(Slot::Mark) => {
                self.marks -= 1;
                self.error(ErrorCode::InvalidStackTop("object", "mark".into()))
            }
            None => self.error(ErrorCode::StackUnderflow),
        }
    }

    fn top(&self) -> Result<ObjRef> {
        match self.stack.last() {
            Some(&Slot::Obj(obj)) => Ok(obj),
            Some(&Slot::Mark) => self.error(ErrorCode::InvalidStackTop("object", "mark".into())),
            None => self.error(ErrorCode::StackUnderflow),
        }
    }

    /// Distance from the top of the stack to the nearest MARK.
    fn marker(&self) -> Result<usize> {
        match self.stack.iter().rev().position(|&slot| slot == Slot::Mark) {
            Some(distance) => Ok(distance),
            None => self.error(ErrorCode::MarkNotFound),
        }
    }

    /// Remove everything up to and including the nearest MARK, returning
    /// the objects above it in stack order.
    fn pop_mark(&mut self) -> Result<Vec<ObjRef>> {
        let distance = self.marker()?;
        let start = self.stack.len() - distance;
        let items = self.stack.split_off(start).into_iter().filter_map(|slot| match slot {
            Slot::Obj(obj) => Some(obj),
            Slot::Mark => None,
        }).collect();
        self.stack.pop();
        self.marks -= 1;
        Ok(items)
    }

    fn memoize(&mut self, index: u32) -> Result<()> {
        let obj = self.top()?;
        self.memo.insert(index, obj);
        Ok(())
    }

    fn fetch(&mut self, index: u32) -> Result<()> {
        match self.memo.get(&index) {
            Some(&obj) => {
                self.push(obj);
                Ok(())
            }
            None => self.error(ErrorCode::MissingMemo(index)),
        }
    }

    fn set_items(&mut self, dict: ObjRef, items: &[ObjRef]) -> Result<()> {
        if items.len() % 2 != 0 {
            return self.error(ErrorCode::InvalidValue("odd number of items for dict".into()));
        }
        let pos = self.op_pos;
        for pair in items.chunks(2) {
            self.heap.dict_set(dict, pair[0], pair[1]).map_err(at(pos))?;
        }
        Ok(())
    }

    /// Arguments of REDUCE and NEWOBJ; `None` counts as no arguments.
    fn arg_tuple(&self, args: ObjRef) -> Result<Vec<ObjRef>> {
        match *self.heap.get(args) {
            Object::Tuple(ref items) => Ok(items.clone()),
            Object::None => Ok(vec![]),
            _ => self.error(ErrorCode::InvalidStackTop("tuple", self.heap.type_name(args))),
        }
    }

    fn find_global(&mut self, module: &str, name: &str) -> Result<ObjRef> {
        let qualname = self.registry.find_class(module, name).map_err(|e| self.relocate(e))?;
        if let Some(&obj) = self.globals.get(&qualname) {
            return Ok(obj);
        }
        let obj = self.heap.alloc(Object::Global(qualname.clone()));
        self.globals.insert(qualname, obj);
        Ok(obj)
    }

    fn load_extension(&mut self, code: u32) -> Result<()> {
        let qualname = match self.registry.extension(code) {
            Some(qualname) => qualname.clone(),
            None => return self.error(ErrorCode::UnregisteredExtension(code)),
        };
        let obj = self.find_global(&qualname.module, &qualname.name)?;
        self.push(obj);
        Ok(())
    }

    fn load_persistent(&mut self, pid: ObjRef) -> Result<ObjRef> {
        let pos = self.op_pos;
        match self.persistent_load.as_mut() {
            Some(hook) => hook(&mut *self.heap, pid).map_err(|e| match e {
                Error::Syntax(code) => Error::Eval(code, pos),
                e => e,
            }),
            None => self.error(ErrorCode::NoPersistentLoad),
        }
    }

    fn read_byte(&mut self) -> Result<u8> {
        match self.rdr.next() {
            Some(Err(err)) => Err(Error::Io(err)),
            Some(Ok(ch)) => Ok(ch),
            None => self.error(ErrorCode::EOFWhileParsing),
        }
    }

    fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut result = Vec::with_capacity(16);
        loop {
            match self.read_byte()? {
                b'\n' => {
                    if result.last() == Some(&b'\r') {
                        result.pop();
                    }
                    return Ok(result);
                }
                ch => result.push(ch),
            }
        }
    }

    fn read_text_line(&mut self) -> Result<String> {
        let line = self.read_line()?;
        match String::from_utf8(line) {
            Ok(s) => Ok(s),
            Err(_) => self.error(ErrorCode::StringNotUTF8),
        }
    }

    fn read_index_line(&mut self) -> Result<u32> {
        let line = self.read_line()?;
        match str::from_utf8(&line).ok().and_then(|s| s.trim().parse::<u32>().ok()) {
            Some(index) => Ok(index),
            None => self.error(ErrorCode::InvalidLiteral(line)),
        }
    }

    fn read_bytes(&mut self, n: u64) -> Result<Vec<u8>> {
        // Lengths come from the stream; allocate as the bytes arrive.
        let mut result = Vec::with_capacity(n.min(1 << 16) as usize);
        for _ in 0..n {
            result.push(self.read_byte()?);
        }
        Ok(result)
    }

    fn read_i32_prefixed_bytes(&mut self) -> Result<Vec<u8>> {
        let lenbytes = self.read_bytes(4)?;
        match LittleEndian::read_i32(&lenbytes) {
            0 => Ok(vec![]),
            l if l < 0 => self.error(ErrorCode::NegativeLength),
            l => self.read_bytes(l as u64),
        }
    }

    fn read_u32_prefixed_bytes(&mut self) -> Result<Vec<u8>> {
        let lenbytes = self.read_bytes(4)?;
        self.read_bytes(LittleEndian::read_u32(&lenbytes) as u64)
    }

    fn read_u8_prefixed_bytes(&mut self) -> Result<Vec<u8>> {
        let lenbyte = self.read_byte()?;
        self.read_bytes(lenbyte as u64)
    }

    fn decode_unicode(&self, string: Vec<u8>) -> Result<String> {
        match String::from_utf8(string) {
            Ok(v) => Ok(v),
            Err(_) => self.error(ErrorCode::StringNotUTF8),
        }
    }

    /// Argument of STRING: a quoted literal with Python string escapes.
    fn decode_escaped_string(&self, line: &[u8]) -> Result<Vec<u8>> {
        let quoted = line.len() >= 2 && line[0] == line[line.len() - 1] &&
            (line[0] == b'"' || line[0] == b'\'');
        if !quoted {
            return self.error(ErrorCode::InvalidLiteral(line.into()));
        }
        let s = &line[1..line.len() - 1];
        let mut result = Vec::with_capacity(s.len());
        let mut i = 0;
        while i < s.len() {
            let b = s[i];
            i += 1;
            if b != b'\\' {
                result.push(b);
                continue;
            }
            let esc = match s.get(i) {
                Some(&esc) => esc,
                None => return self.error(ErrorCode::InvalidLiteral(line.into())),
            };
            i += 1;
            match esc {
                b'\\' | b'\'' | b'"' => result.push(esc),
                b'\n' => {}
                b'a' => result.push(b'\x07'),
                b'b' => result.push(b'\x08'),
                b't' => result.push(b'\x09'),
                b'n' => result.push(b'\x0a'),
                b'v' => result.push(b'\x0b'),
                b'f' => result.push(b'\x0c'),
                b'r' => result.push(b'\x0d'),
                b'x' => {
                    let hex = |j: usize| s.get(j).and_then(|&ch| (ch as char).to_digit(16));
                    match (hex(i), hex(i + 1)) {
                        (Some(v1), Some(v2)) => result.push((16 * v1 + v2) as u8),
                        _ => return self.error(ErrorCode::InvalidLiteral(line.into())),
                    }
                    i += 2;
                }
                b'0'..=b'7' => {
                    let mut value = (esc - b'0') as u32;
                    let mut digits = 1;
                    while digits < 3 && i < s.len() && (b'0'..=b'7').contains(&s[i]) {
                        value = value * 8 + (s[i] - b'0') as u32;
                        i += 1;
                        digits += 1;
                    }
                    result.push(value as u8);
                }
                other => {
                    result.push(b'\\');
                    result.push(other);
                }
            }
        }
        Ok(result)
    }

    /// Argument of UNICODE, encoded with "raw-unicode-escape": Latin-1
    /// bytes plus the `\uXXXX` and `\UXXXXXXXX` escapes.
    fn decode_escaped_unicode(&self, s: &[u8]) -> Result<String> {
        let mut result = String::with_capacity(s.len());
        let mut i = 0;
        while i < s.len() {
            let b = s[i];
            i += 1;
            let nescape = match (b, s.get(i)) {
                (b'\\', Some(&b'u')) => 4,
                (b'\\', Some(&b'U')) => 8,
                _ => {
                    result.push(b as char);
                    continue;
                }
            };
            i += 1;
            let mut accum = 0u32;
            for _ in 0..nescape {
                match s.get(i).and_then(|&ch| (ch as char).to_digit(16)) {
                    Some(v) => accum = accum * 16 + v,
                    None => return self.error(ErrorCode::InvalidLiteral(s.into())),
                }
                i += 1;
            }
            match char::from_u32(accum) {
                Some(v) => result.push(v),
                None => return self.error(ErrorCode::InvalidLiteral(s.into())),
            }
        }
        Ok(result)
    }

    fn relocate(&self, err: Error) -> Error {
        match err {
            Error::Syntax(code) => Error::Eval(code, self.op_pos),
            err => err,
        }
    }

    fn error<T>(&self, reason: ErrorCode) -> Result<T> {
        Err(Error::Eval(reason, self.op_pos))
    }
}

fn at(pos: usize) -> impl Fn(ErrorCode) -> Error {
    move |code| Error::Eval(code, pos)
}

/// Text floats as written by `repr()`, including the special values.
fn parse_float(line: &[u8]) -> Option<f64> {
    let text = str::from_utf8(line).ok()?.trim();
    match &text.to_ascii_lowercase()[..] {
        "nan" | "+nan" | "-nan" => Some(std::f64::NAN),
        "inf" | "+inf" | "infinity" | "+infinity" => Some(std::f64::INFINITY),
        "-inf" | "-infinity" => Some(std::f64::NEG_INFINITY),
        _ => text.parse().ok(),
    }
}

fn load_with<R: io::Read>(rdr: R, heap: &mut Heap, registry: &Registry,
                          options: UnpickleOptions) -> Result<ObjRef> {
    let check_trailing = options.check_trailing;
    let mut unpickler = Unpickler::new(rdr, heap, registry, options);
    let obj = unpickler.load()?;
    if check_trailing {
        unpickler.end()?;
    }
    Ok(obj)
}

/// Decodes an object from a `std::io::Read`.
pub fn load_from_reader<R: io::Read>(rdr: R, heap: &mut Heap, registry: &Registry,
                                     options: UnpickleOptions) -> Result<ObjRef> {
    load_with(io::BufReader::new(rdr), heap, registry, options)
}

/// Decodes an object from a byte slice `&[u8]`.
pub fn load_from_slice(v: &[u8], heap: &mut Heap, registry: &Registry,
                       options: UnpickleOptions) -> Result<ObjRef> {
    load_with(v, heap, registry, options)
}

/// Decodes an object directly from an iterator of bytes.
pub fn load_from_iter<I>(iter: I, heap: &mut Heap, registry: &Registry,
                         options: UnpickleOptions) -> Result<ObjRef>
    where I: IntoIterator<Item=u8>
{
    load_with(IterRead::new(iter.into_iter()), heap, registry, options)
}

/// Decodes a value snapshot from a `std::io::Read`.
pub fn value_from_reader<R: io::Read>(rdr: R, options: UnpickleOptions) -> Result<Value> {
    let mut heap = Heap::new();
    let root = load_from_reader(rdr, &mut heap, &Registry::new(), options)?;
    heap.to_value(root)
}

/// Decodes a value snapshot from a byte slice `&[u8]`.
pub fn value_from_slice(v: &[u8], options: UnpickleOptions) -> Result<Value> {
    let mut heap = Heap::new();
    let root = load_from_slice(v, &mut heap, &Registry::new(), options)?;
    heap.to_value(root)
}

/// Decodes a value snapshot directly from an iterator of bytes.
pub fn value_from_iter<I>(iter: I, options: UnpickleOptions) -> Result<Value>
    where I: IntoIterator<Item=u8>
{
    let mut heap = Heap::new();
    let root = load_from_iter(iter, &mut heap, &Registry::new(), options)?;
    heap.to_value(root)
}
