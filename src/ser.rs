// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Pickle serialization
//!
//! The pickler walks the graph with an explicit work list instead of native
//! recursion: a container writes its opening opcodes, then schedules its
//! children followed by the opcodes that close it.  Deeply nested graphs
//! therefore cost heap memory, and the depth limit is reported as an error.

use std::io;
use byteorder::{LittleEndian, BigEndian, WriteBytesExt};
use log::{debug, trace};
use num_bigint::BigInt;
use num_traits::Zero;

use crate::consts::*;
use crate::error::{Error, ErrorCode, Result};
use crate::float;
use crate::memo::MemoTable;
use crate::object::{bytes_repr, Heap, Object, ObjRef, QualName};
use crate::registry::{newobj_name, object_name, reconstructor_name, Registry};
use crate::value::Value;

/// Options for pickling.
#[derive(Clone, Debug)]
pub struct PickleOptions {
    proto: u8,
    max_depth: usize,
}

impl PickleOptions {
    /// Construct with default options: protocol 2, nesting depth 2000.
    pub fn new() -> Self {
        PickleOptions { proto: HIGHEST_PROTOCOL, max_depth: 2000 }
    }

    /// Select the protocol, 0 (text) through 2.
    pub fn proto(mut self, proto: u8) -> Self {
        self.proto = proto;
        self
    }

    /// Limit how deeply nested the pickled graph may be.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for PickleOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps an object to its persistent id object, or `None` to pickle it
/// normally.
pub type PersistentId<'a> = Box<dyn FnMut(&mut Heap, ObjRef) -> Option<ObjRef> + 'a>;

/// One step of the work list.
enum Task {
    /// Write an object nested `depth` levels deep.  `resolved` objects are
    /// persistent ids and skip the persistent id hook.
    Save { obj: ObjRef, depth: usize, resolved: bool },
    Opcode(u8),
    Memoize(ObjRef),
    /// Memo slot for a tuple that only exists in the stream.
    Put,
    /// Close a heap tuple once its items are written.
    EndTuple { obj: ObjRef, len: usize, small: bool },
    /// INST and the class name.
    Inst(QualName),
}

/// Arguments of a reduction: a heap object, or the items of a tuple that is
/// written to the stream without being allocated.
enum ReduceArgs {
    Object(ObjRef),
    Items(Vec<ObjRef>),
}

/// A validated reduce value.
struct Reduction {
    callable: ObjRef,
    args: ReduceArgs,
    state: Option<ObjRef>,
    list_items: Vec<ObjRef>,
    dict_items: Vec<(ObjRef, ObjRef)>,
}

/// Writes object graphs of a [`Heap`] as a pickle stream.
///
/// The memo is kept across calls to [`dump`](Pickler::dump), so objects
/// shared between several dumped roots are written only once.
pub struct Pickler<'a, W> {
    writer: W,
    heap: &'a mut Heap,
    registry: &'a Registry,
    memo: MemoTable,
    // Memo positions also go to tuples that have no heap object.
    next_position: u32,
    proto: u8,
    max_depth: usize,
    persistent_id: Option<PersistentId<'a>>,
    tasks: Vec<Task>,
}

impl<'a, W: io::Write> Pickler<'a, W> {
    pub fn new(writer: W, heap: &'a mut Heap, registry: &'a Registry,
               options: PickleOptions) -> Result<Self> {
        if options.proto > HIGHEST_PROTOCOL {
            return Err(Error::Pickle(ErrorCode::UnsupportedProtocol(options.proto)));
        }
        Ok(Pickler {
            writer,
            heap,
            registry,
            memo: MemoTable::new(),
            next_position: 0,
            proto: options.proto,
            max_depth: options.max_depth,
            persistent_id: None,
            tasks: Vec::new(),
        })
    }

    /// Install a persistent id hook.
    pub fn persistent_id<F>(&mut self, hook: F)
        where F: FnMut(&mut Heap, ObjRef) -> Option<ObjRef> + 'a
    {
        self.persistent_id = Some(Box::new(hook));
    }

    /// Unwrap the `Writer` from the `Pickler`.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Forget all memoized objects.
    pub fn clear_memo(&mut self) {
        self.memo.clear();
        self.next_position = 0;
    }

    /// Write one complete pickle of the graph rooted at `root`.
    pub fn dump(&mut self, root: ObjRef) -> Result<()> {
        debug!("pickling {} with protocol {}", self.heap.type_name(root), self.proto);
        if self.proto >= 2 {
            self.write_opcode(PROTO)?;
            self.writer.write_u8(self.proto)?;
        }
        self.tasks.clear();
        self.tasks.push(Task::Save { obj: root, depth: 1, resolved: false });
        while let Some(task) = self.tasks.pop() {
            self.run(task)?;
        }
        self.write_opcode(STOP)
    }

    fn run(&mut self, task: Task) -> Result<()> {
        match task {
            Task::Save { obj, depth, resolved } => self.save(obj, depth, resolved),
            Task::Opcode(opcode) => self.write_opcode(opcode),
            Task::Memoize(obj) => self.memoize(obj),
            Task::Put => self.write_put().map(|_| ()),
            Task::EndTuple { obj, len, small } => self.end_tuple(obj, len, small),
            Task::Inst(name) => {
                self.write_opcode(INST)?;
                self.write_name(&name)
            }
        }
    }

    /// Queue `plan` to run next, in order.
    fn schedule(&mut self, plan: Vec<Task>) {
        self.tasks.extend(plan.into_iter().rev());
    }

    #[inline]
    fn write_opcode(&mut self, opcode: u8) -> Result<()> {
        self.writer.write_all(&[opcode]).map_err(From::from)
    }

    fn write_line(&mut self, opcode: u8, text: &[u8]) -> Result<()> {
        self.write_opcode(opcode)?;
        self.writer.write_all(text)?;
        self.writer.write_all(b"\n").map_err(From::from)
    }

    fn write_name(&mut self, name: &QualName) -> Result<()> {
        self.writer.write_all(name.module.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.write_all(name.name.as_bytes())?;
        self.writer.write_all(b"\n").map_err(From::from)
    }

    fn save(&mut self, obj: ObjRef, depth: usize, resolved: bool) -> Result<()> {
        if depth > self.max_depth {
            return Err(Error::Pickle(ErrorCode::MaxDepthExceeded));
        }
        if !resolved {
            if let Some(hook) = self.persistent_id.as_mut() {
                if let Some(pid) = hook(&mut *self.heap, obj) {
                    return self.save_pers(pid, depth);
                }
            }
        }

        if let Object::Tuple(ref items) = *self.heap.get(obj) {
            if items.is_empty() {
                return self.write_opcode(EMPTY_TUPLE);
            }
        }

        if let Some(position) = self.memo.find_position(obj.identity(), obj) {
            return self.write_get(position);
        }

        // Scalars and strings are written while the heap is borrowed;
        // containers copy their handles out before scheduling them.
        let proto = self.proto;
        let writer = &mut self.writer;
        match *self.heap.get(obj) {
            Object::None => return writer.write_all(&[NONE]).map_err(From::from),
            Object::Bool(b) => return write_bool(writer, proto, b),
            Object::Int(i) => return write_int(writer, proto, i),
            Object::Long(ref i) => return write_long(writer, proto, i),
            Object::Float(f) => return write_float(writer, proto, f),
            Object::Bytes(ref b) => write_bytes(writer, proto, b)?,
            Object::Str(ref s) => write_unicode(writer, proto, s)?,
            Object::Tuple(ref items) => {
                let items = items.clone();
                return self.save_tuple(obj, &items, depth);
            }
            Object::List(ref items) => {
                let items = items.clone();
                return self.save_list(obj, &items, depth);
            }
            Object::Dict(ref dict) => {
                let pairs = dict.pairs().to_vec();
                return self.save_dict(obj, &pairs, depth);
            }
            Object::Global(ref name) => {
                let name = name.clone();
                return self.save_global(obj, &name);
            }
            Object::Instance(ref inst) if inst.classic => {
                let (class, dict) = (inst.class, inst.dict);
                return self.save_inst(obj, class, dict, depth);
            }
            Object::Instance(_) | Object::Native(_) => return self.save_reduce_protocol(obj, depth),
        }
        self.memoize(obj)
    }

    fn save_pers(&mut self, pid: ObjRef, depth: usize) -> Result<()> {
        if self.proto == 0 {
            let text = self.heap.str_of(pid);
            if text.contains('\n') {
                return Err(Error::Pickle(ErrorCode::Pickling(
                    "persistent IDs in protocol 0 must not contain newlines".into())));
            }
            self.write_line(PERSID, text.as_bytes())
        } else {
            self.schedule(vec![
                Task::Save { obj: pid, depth: depth + 1, resolved: true },
                Task::Opcode(BINPERSID),
            ]);
            Ok(())
        }
    }

    /// Record `obj` at the next memo position and emit PUT.
    fn memoize(&mut self, obj: ObjRef) -> Result<()> {
        let position = self.write_put()?;
        self.memo.put(obj.identity(), position, obj)
    }

    /// Emit PUT for the next memo position and return that position.
    fn write_put(&mut self) -> Result<u32> {
        let position = self.next_position;
        self.next_position += 1;
        if self.proto > 0 {
            if position < 256 {
                self.write_opcode(BINPUT)?;
                self.writer.write_u8(position as u8)?;
            } else {
                self.write_opcode(LONG_BINPUT)?;
                self.writer.write_u32::<LittleEndian>(position)?;
            }
        } else {
            self.write_line(PUT, position.to_string().as_bytes())?;
        }
        Ok(position)
    }

    fn write_get(&mut self, position: u32) -> Result<()> {
        if self.proto > 0 {
            if position < 256 {
                self.write_opcode(BINGET)?;
                self.writer.write_u8(position as u8).map_err(From::from)
            } else {
                self.write_opcode(LONG_BINGET)?;
                self.writer.write_u32::<LittleEndian>(position).map_err(From::from)
            }
        } else {
            self.write_line(GET, position.to_string().as_bytes())
        }
    }

    fn save_tuple(&mut self, obj: ObjRef, items: &[ObjRef], depth: usize) -> Result<()> {
        let small = self.proto >= 2 && items.len() <= 3;
        if !small {
            self.write_opcode(MARK)?;
        }
        let mut plan: Vec<Task> = items.iter()
            .map(|&item| Task::Save { obj: item, depth: depth + 1, resolved: false })
            .collect();
        plan.push(Task::EndTuple { obj, len: items.len(), small });
        self.schedule(plan);
        Ok(())
    }

    fn end_tuple(&mut self, obj: ObjRef, len: usize, small: bool) -> Result<()> {
        // One of the items referred back to this tuple, which is memoized
        // by now: drop what was written and fetch it from the memo.
        if let Some(position) = self.memo.find_position(obj.identity(), obj) {
            if small {
                for _ in 0..len {
                    self.write_opcode(POP)?;
                }
            } else if self.proto >= 1 {
                self.write_opcode(POP_MARK)?;
            } else {
                for _ in 0..=len {
                    self.write_opcode(POP)?;
                }
            }
            return self.write_get(position);
        }
        self.write_opcode(tuple_opcode(small, len))?;
        self.memoize(obj)
    }

    /// A tuple that only exists in the stream.  It takes a memo slot like
    /// any other tuple, but nothing can refer back to it.
    fn plan_tuple(&self, plan: &mut Vec<Task>, items: &[ObjRef], depth: usize) {
        if items.is_empty() {
            plan.push(Task::Opcode(EMPTY_TUPLE));
            return;
        }
        let small = self.proto >= 2 && items.len() <= 3;
        if !small {
            plan.push(Task::Opcode(MARK));
        }
        plan.extend(items.iter().map(|&obj| Task::Save { obj, depth, resolved: false }));
        plan.push(Task::Opcode(tuple_opcode(small, items.len())));
        plan.push(Task::Put);
    }

    fn save_list(&mut self, obj: ObjRef, items: &[ObjRef], depth: usize) -> Result<()> {
        if self.proto > 0 {
            self.write_opcode(EMPTY_LIST)?;
        } else {
            self.write_opcode(MARK)?;
            self.write_opcode(LIST)?;
        }
        self.memoize(obj)?;
        let mut plan = Vec::with_capacity(items.len() + 2);
        self.plan_appends(&mut plan, items, depth + 1);
        self.schedule(plan);
        Ok(())
    }

    fn plan_appends(&self, plan: &mut Vec<Task>, items: &[ObjRef], depth: usize) {
        let save = |obj| Task::Save { obj, depth, resolved: false };
        if self.proto == 0 {
            for &item in items {
                plan.push(save(item));
                plan.push(Task::Opcode(APPEND));
            }
            return;
        }
        for chunk in items.chunks(BATCHSIZE) {
            if chunk.len() == 1 {
                plan.push(save(chunk[0]));
                plan.push(Task::Opcode(APPEND));
            } else {
                plan.push(Task::Opcode(MARK));
                plan.extend(chunk.iter().map(|&item| save(item)));
                plan.push(Task::Opcode(APPENDS));
            }
        }
    }

    fn save_dict(&mut self, obj: ObjRef, pairs: &[(ObjRef, ObjRef)], depth: usize) -> Result<()> {
        if self.proto > 0 {
            self.write_opcode(EMPTY_DICT)?;
        } else {
            self.write_opcode(MARK)?;
            self.write_opcode(DICT)?;
        }
        self.memoize(obj)?;
        let mut plan = Vec::with_capacity(2 * pairs.len() + 2);
        self.plan_setitems(&mut plan, pairs, depth + 1);
        self.schedule(plan);
        Ok(())
    }

    fn plan_setitems(&self, plan: &mut Vec<Task>, pairs: &[(ObjRef, ObjRef)], depth: usize) {
        let save = |obj| Task::Save { obj, depth, resolved: false };
        if self.proto == 0 {
            for &(key, value) in pairs {
                plan.push(save(key));
                plan.push(save(value));
                plan.push(Task::Opcode(SETITEM));
            }
            return;
        }
        for chunk in pairs.chunks(BATCHSIZE) {
            if chunk.len() == 1 {
                plan.push(save(chunk[0].0));
                plan.push(save(chunk[0].1));
                plan.push(Task::Opcode(SETITEM));
            } else {
                plan.push(Task::Opcode(MARK));
                for &(key, value) in chunk {
                    plan.push(save(key));
                    plan.push(save(value));
                }
                plan.push(Task::Opcode(SETITEMS));
            }
        }
    }

    fn save_global(&mut self, obj: ObjRef, name: &QualName) -> Result<()> {
        if name.module.contains('\n') || name.name.contains('\n') {
            return Err(Error::Pickle(ErrorCode::Pickling(
                format!("Can't pickle {}: bad global name", name))));
        }
        if self.proto >= 2 {
            if let Some(code) = self.registry.extension_code(name) {
                trace!("writing {} as extension code {}", name, code);
                if code <= 0xff {
                    self.write_opcode(EXT1)?;
                    self.writer.write_u8(code as u8)?;
                } else if code <= 0xffff {
                    self.write_opcode(EXT2)?;
                    self.writer.write_u16::<LittleEndian>(code as u16)?;
                } else {
                    self.write_opcode(EXT4)?;
                    self.writer.write_u32::<LittleEndian>(code)?;
                }
                return Ok(());
            }
        }
        self.write_opcode(GLOBAL)?;
        self.write_name(name)?;
        self.memoize(obj)
    }

    /// Old-style instance: class and init args, then its state.
    fn save_inst(&mut self, obj: ObjRef, class: ObjRef, dict: ObjRef, depth: usize) -> Result<()> {
        let name = match self.heap.qualname(class) {
            Some(name) => name.clone(),
            None => return Err(Error::Pickle(ErrorCode::Pickling(
                format!("Can't pickle {}: class is not a global", self.heap.repr(obj))))),
        };
        let registry = self.registry;
        let hooks = registry.hooks(&name);
        let args = match hooks {
            Some(hooks) => match hooks.getinitargs(self.heap, obj)? {
                Some(args) => match *self.heap.get(args) {
                    Object::Tuple(ref items) => items.clone(),
                    _ => return Err(Error::Pickle(ErrorCode::Pickling(
                        format!("__getinitargs__ of {} must return a tuple", name)))),
                },
                None => vec![],
            },
            None => vec![],
        };
        let state = match hooks {
            Some(hooks) => hooks.getstate(self.heap, obj)?.unwrap_or(dict),
            None => dict,
        };

        self.write_opcode(MARK)?;
        let save = |obj| Task::Save { obj, depth: depth + 1, resolved: false };
        let mut plan = Vec::with_capacity(args.len() + 5);
        if self.proto >= 1 {
            plan.push(save(class));
            plan.extend(args.iter().map(|&arg| save(arg)));
            plan.push(Task::Opcode(OBJ));
        } else {
            plan.extend(args.iter().map(|&arg| save(arg)));
            plan.push(Task::Inst(name));
        }
        plan.push(Task::Memoize(obj));
        plan.push(save(state));
        plan.push(Task::Opcode(BUILD));
        self.schedule(plan);
        Ok(())
    }

    /// Everything without a dedicated encoding: ask the dispatch table, then
    /// the class's reduce hooks, then fall back to the default reduction.
    fn save_reduce_protocol(&mut self, obj: ObjRef, depth: usize) -> Result<()> {
        let registry = self.registry;
        let class = self.heap.class_of(obj);
        let reduced = match class.as_ref().and_then(|c| registry.reducer(c)) {
            Some(reducer) => Some(reducer(self.heap, obj)?),
            None => {
                let hooks = class.as_ref().and_then(|c| registry.hooks(c));
                let mut reduced = None;
                if let Some(hooks) = hooks {
                    reduced = hooks.reduce_ex(self.heap, obj, self.proto)?;
                    if reduced.is_none() {
                        reduced = hooks.reduce(self.heap, obj)?;
                    }
                }
                reduced
            }
        };
        let reduced = match reduced {
            Some(reduced) => reduced,
            None => {
                let reduction = match *self.heap.get(obj) {
                    Object::Instance(_) => {
                        trace!("default reduction for {}", self.heap.repr(obj));
                        self.default_reduce(obj)?
                    }
                    _ => return Err(Error::Pickle(ErrorCode::Unpickleable(
                        self.heap.repr(obj)))),
                };
                return self.save_reduce(obj, reduction, depth);
            }
        };

        let what = match class {
            Some(ref c) => format!("the reducer of {}", c),
            None => "reduce".into(),
        };
        let parts = match *self.heap.get(reduced) {
            Object::Str(ref name) => {
                let module = class.map(|c| c.module).unwrap_or_default();
                let name = QualName::new(module, name.clone());
                return self.save_global(obj, &name);
            }
            Object::Tuple(ref parts) => parts.clone(),
            _ => return Err(Error::Pickle(ErrorCode::Pickling(
                format!("Value returned by {} must be a tuple", what)))),
        };
        if parts.len() < 2 || parts.len() > 5 {
            return Err(Error::Pickle(ErrorCode::Pickling(
                format!("tuple returned by {} must contain two to five elements", what))));
        }
        match *self.heap.get(parts[1]) {
            Object::Tuple(_) | Object::None => {}
            _ => return Err(Error::Pickle(ErrorCode::Pickling(
                format!("Second element of tuple returned by {} must be a tuple", what)))),
        }
        let none = self.heap.none();
        let optional = |i: usize| parts.get(i).cloned().filter(|&r| r != none);
        let list_items = match optional(3) {
            Some(items) => match *self.heap.get(items) {
                Object::List(ref items) | Object::Tuple(ref items) => items.clone(),
                _ => return Err(Error::Pickle(ErrorCode::Pickling(
                    "fourth element of the reduce tuple must be a list".into()))),
            },
            None => vec![],
        };
        let dict_items = match optional(4) {
            Some(items) => self.dict_items_of(items)?,
            None => vec![],
        };
        let reduction = Reduction {
            callable: parts[0],
            args: ReduceArgs::Object(parts[1]),
            state: optional(2),
            list_items,
            dict_items,
        };
        self.save_reduce(obj, reduction, depth)
    }

    fn save_reduce(&mut self, obj: ObjRef, reduction: Reduction, depth: usize) -> Result<()> {
        let child = depth + 1;
        let save = |obj| Task::Save { obj, depth: child, resolved: false };
        let is_newobj = self.proto >= 2 &&
            self.heap.qualname(reduction.callable).map_or(false, |q| q.name == "__newobj__");
        let mut plan = Vec::new();
        if is_newobj {
            let args = match reduction.args {
                ReduceArgs::Object(args) => match *self.heap.get(args) {
                    Object::Tuple(ref items) => items.clone(),
                    _ => vec![],
                },
                ReduceArgs::Items(items) => items,
            };
            let cls = match args.first() {
                Some(&cls) => cls,
                None => return Err(Error::Pickle(ErrorCode::Pickling(
                    "__newobj__ arglist is empty".into()))),
            };
            let cls_name = match self.heap.qualname(cls) {
                Some(name) => name.clone(),
                None => return Err(Error::Pickle(ErrorCode::Pickling(
                    "args[0] from __newobj__ args has no __new__".into()))),
            };
            if let Some(class) = self.heap.class_of(obj) {
                if class != cls_name {
                    return Err(Error::Pickle(ErrorCode::Pickling(
                        "args[0] from __newobj__ args has the wrong class".into())));
                }
            }
            plan.push(save(cls));
            self.plan_tuple(&mut plan, &args[1..], child);
            plan.push(Task::Opcode(NEWOBJ));
        } else {
            plan.push(save(reduction.callable));
            match reduction.args {
                ReduceArgs::Object(args) => plan.push(save(args)),
                ReduceArgs::Items(ref items) => self.plan_tuple(&mut plan, items, child),
            }
            plan.push(Task::Opcode(REDUCE));
        }
        plan.push(Task::Memoize(obj));
        self.plan_appends(&mut plan, &reduction.list_items, child);
        self.plan_setitems(&mut plan, &reduction.dict_items, child);
        if let Some(state) = reduction.state {
            plan.push(save(state));
            plan.push(Task::Opcode(BUILD));
        }
        self.schedule(plan);
        Ok(())
    }

    /// Pairs from a dict, or from a list of 2-tuples.
    fn dict_items_of(&self, items: ObjRef) -> Result<Vec<(ObjRef, ObjRef)>> {
        let bad = || Error::Pickle(ErrorCode::Pickling(
            "fifth element of the reduce tuple must be a dict or a list of pairs".into()));
        match *self.heap.get(items) {
            Object::Dict(ref dict) => Ok(dict.pairs().to_vec()),
            Object::List(ref items) => items.iter().map(|&item| match *self.heap.get(item) {
                Object::Tuple(ref pair) if pair.len() == 2 => Ok((pair[0], pair[1])),
                _ => Err(bad()),
            }).collect(),
            _ => Err(bad()),
        }
    }

    /// Reduction of a new-style instance without hooks:
    /// `(copy_reg.__newobj__, (cls,), state, listitems, dictitems)` at
    /// protocol 2, `(copy_reg._reconstructor, (cls, object, None), ...)` below.
    /// Only the shared `copy_reg` globals are ever allocated.
    fn default_reduce(&mut self, obj: ObjRef) -> Result<Reduction> {
        let inst = match *self.heap.get(obj) {
            Object::Instance(ref inst) => inst.clone(),
            _ => return Err(Error::Pickle(ErrorCode::Unpickleable(self.heap.repr(obj)))),
        };
        let registry = self.registry;
        let getstate = match self.heap.class_of(obj).as_ref().and_then(|c| registry.hooks(c)) {
            Some(hooks) => hooks.getstate(self.heap, obj)?,
            None => None,
        };
        let none = self.heap.none();
        let state = match getstate {
            Some(state) if state == none => None,
            Some(state) => Some(state),
            None if self.heap.dict_items(inst.dict).is_empty() => None,
            None => Some(inst.dict),
        };
        let (callable, args) = if self.proto >= 2 {
            (self.heap.shared_global(newobj_name()), vec![inst.class])
        } else {
            let object = self.heap.shared_global(object_name());
            (self.heap.shared_global(reconstructor_name()), vec![inst.class, object, none])
        };
        Ok(Reduction {
            callable,
            args: ReduceArgs::Items(args),
            state,
            list_items: inst.list_items,
            dict_items: inst.dict_items,
        })
    }
}

fn tuple_opcode(small: bool, len: usize) -> u8 {
    match (small, len) {
        (true, 1) => TUPLE1,
        (true, 2) => TUPLE2,
        (true, _) => TUPLE3,
        (false, _) => TUPLE,
    }
}

fn write_bool<W: io::Write>(writer: &mut W, proto: u8, value: bool) -> Result<()> {
    if proto >= 2 {
        writer.write_all(&[if value { NEWTRUE } else { NEWFALSE }])?;
    } else {
        writer.write_all(if value { b"I01\n" } else { b"I00\n" })?;
    }
    Ok(())
}

fn write_int<W: io::Write>(writer: &mut W, proto: u8, value: i64) -> Result<()> {
    if proto > 0 {
        if 0 <= value && value <= 0xff {
            writer.write_all(&[BININT1, value as u8])?;
            return Ok(());
        } else if 0 <= value && value <= 0xffff {
            writer.write_all(&[BININT2])?;
            writer.write_u16::<LittleEndian>(value as u16)?;
            return Ok(());
        } else if -0x8000_0000 <= value && value < 0x8000_0000 {
            writer.write_all(&[BININT])?;
            writer.write_i32::<LittleEndian>(value as i32)?;
            return Ok(());
        }
    }
    write!(writer, "I{}\n", value).map_err(From::from)
}

fn write_long<W: io::Write>(writer: &mut W, proto: u8, value: &BigInt) -> Result<()> {
    if proto < 2 {
        return write!(writer, "L{}L\n", value).map_err(From::from);
    }
    // Little-endian two's complement, with no bytes at all for zero.
    let bytes = if value.is_zero() { vec![] } else { value.to_signed_bytes_le() };
    if bytes.len() < 256 {
        writer.write_all(&[LONG1, bytes.len() as u8])?;
    } else {
        writer.write_all(&[LONG4])?;
        writer.write_u32::<LittleEndian>(bytes.len() as u32)?;
    }
    writer.write_all(&bytes).map_err(From::from)
}

fn write_float<W: io::Write>(writer: &mut W, proto: u8, value: f64) -> Result<()> {
    if proto > 0 {
        writer.write_all(&[BINFLOAT])?;
        // Yes, this one is big endian.
        writer.write_f64::<BigEndian>(value).map_err(From::from)
    } else {
        write!(writer, "F{}\n", float::repr(value)).map_err(From::from)
    }
}

fn write_bytes<W: io::Write>(writer: &mut W, proto: u8, value: &[u8]) -> Result<()> {
    if proto == 0 {
        write!(writer, "S{}\n", bytes_repr(value))?;
    } else if value.len() < 256 {
        writer.write_all(&[SHORT_BINSTRING, value.len() as u8])?;
        writer.write_all(value)?;
    } else {
        writer.write_all(&[BINSTRING])?;
        writer.write_u32::<LittleEndian>(value.len() as u32)?;
        writer.write_all(value)?;
    }
    Ok(())
}

fn write_unicode<W: io::Write>(writer: &mut W, proto: u8, value: &str) -> Result<()> {
    if proto == 0 {
        writer.write_all(&[UNICODE])?;
        writer.write_all(&raw_unicode_escape(value))?;
        writer.write_all(b"\n")?;
    } else {
        writer.write_all(&[BINUNICODE])?;
        writer.write_u32::<LittleEndian>(value.len() as u32)?;
        writer.write_all(value.as_bytes())?;
    }
    Ok(())
}

/// Latin-1 for the first 256 code points, `\uXXXX` and `\UXXXXXXXX` above.
/// Backslash and line breaks are escaped too, since the argument is a line.
fn raw_unicode_escape(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for c in value.chars() {
        let code = c as u32;
        match c {
            '\\' | '\n' | '\r' => out.extend_from_slice(format!("\\u{:04x}", code).as_bytes()),
            _ if code < 0x100 => out.push(code as u8),
            _ if code < 0x10000 => out.extend_from_slice(format!("\\u{:04x}", code).as_bytes()),
            _ => out.extend_from_slice(format!("\\U{:08x}", code).as_bytes()),
        }
    }
    out
}

/// Pickle the graph rooted at `root` into a writer.
pub fn dump_to_writer<W: io::Write>(writer: W, heap: &mut Heap, registry: &Registry,
                                    root: ObjRef, options: PickleOptions) -> Result<()> {
    let mut pickler = Pickler::new(writer, heap, registry, options)?;
    pickler.dump(root)
}

/// Pickle the graph rooted at `root` into a `Vec<u8>` buffer.
pub fn dump_to_vec(heap: &mut Heap, registry: &Registry, root: ObjRef,
                   options: PickleOptions) -> Result<Vec<u8>> {
    let mut writer = Vec::with_capacity(128);
    dump_to_writer(&mut writer, heap, registry, root, options)?;
    Ok(writer)
}

/// Encode a value snapshot into a pickle stream.
pub fn value_to_writer<W: io::Write>(writer: &mut W, value: &Value,
                                     options: PickleOptions) -> Result<()> {
    let mut heap = Heap::new();
    let root = heap.insert_value(value);
    dump_to_writer(writer, &mut heap, &Registry::new(), root, options)
}

/// Encode a value snapshot into a `Vec<u8>` buffer.
#[inline]
pub fn value_to_vec(value: &Value, options: PickleOptions) -> Result<Vec<u8>> {
    let mut writer = Vec::with_capacity(128);
    value_to_writer(&mut writer, value, options)?;
    Ok(writer)
}
