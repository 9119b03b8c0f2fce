// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Class behavior consulted while pickling and unpickling.
//!
//! A [`Registry`] plays the role of the `copy_reg` module: it knows how to
//! reduce objects of a given class, how to call classes and functions named
//! in a pickle, and which globals have compact extension codes.  It is passed
//! explicitly to every pickler and unpickler; nothing here is global state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, ErrorCode, Result};
use crate::object::{Heap, Object, ObjRef, QualName};

/// Turns an object into a reduce value: a module-level name as text, or a
/// tuple `(callable, args[, state[, listitems[, dictitems]]])`.
pub type Reducer = Arc<dyn Fn(&mut Heap, ObjRef) -> Result<ObjRef> + Send + Sync>;

/// A function that can be named by GLOBAL and applied by REDUCE.
pub type Callable = Arc<dyn Fn(&mut Heap, &[ObjRef]) -> Result<ObjRef> + Send + Sync>;

/// Decides whether an unknown global may be loaded.
pub type ModuleLoader = Arc<dyn Fn(&QualName) -> Result<()> + Send + Sync>;

/// Per-class special methods.  Every method returns `Ok(None)` (or
/// `Ok(false)`) when the class does not define it.
#[allow(unused_variables)]
pub trait ClassHooks: Send + Sync {
    /// `__reduce_ex__(proto)`
    fn reduce_ex(&self, heap: &mut Heap, obj: ObjRef, proto: u8) -> Result<Option<ObjRef>> {
        Ok(None)
    }

    /// `__reduce__()`
    fn reduce(&self, heap: &mut Heap, obj: ObjRef) -> Result<Option<ObjRef>> {
        Ok(None)
    }

    /// `__getinitargs__()` of old-style classes; must return a tuple.
    fn getinitargs(&self, heap: &mut Heap, obj: ObjRef) -> Result<Option<ObjRef>> {
        Ok(None)
    }

    /// `__getstate__()`
    fn getstate(&self, heap: &mut Heap, obj: ObjRef) -> Result<Option<ObjRef>> {
        Ok(None)
    }

    /// `__setstate__(state)`; returns whether it handled the state.
    fn setstate(&self, heap: &mut Heap, obj: ObjRef, state: ObjRef) -> Result<bool> {
        Ok(false)
    }

    /// `__setattr__(name, value)`; returns whether it handled the assignment.
    fn setattr(&self, heap: &mut Heap, obj: ObjRef, name: &str, value: ObjRef) -> Result<bool> {
        Ok(false)
    }

    /// Calling the class with arguments.
    fn call(&self, heap: &mut Heap, cls: ObjRef, args: &[ObjRef]) -> Result<Option<ObjRef>> {
        Ok(None)
    }

    /// `cls.__new__(cls, *args)`
    fn new(&self, heap: &mut Heap, cls: ObjRef, args: &[ObjRef]) -> Result<Option<ObjRef>> {
        Ok(None)
    }
}

pub const COPY_REG: &str = "copy_reg";
pub const BUILTIN: &str = "__builtin__";

/// Largest code accepted by the extension registry.
pub const MAX_EXTENSION_CODE: u32 = 0x7fff_ffff;

#[derive(Clone, Default)]
pub struct Registry {
    dispatch: HashMap<QualName, Reducer>,
    classes: HashMap<QualName, Arc<dyn ClassHooks>>,
    callables: HashMap<QualName, Callable>,
    extensions: HashMap<QualName, u32>,
    inverted: HashMap<u32, QualName>,
    loader: Option<ModuleLoader>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Registry")
            .field("dispatch", &self.dispatch.keys().collect::<Vec<_>>())
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .field("callables", &self.callables.keys().collect::<Vec<_>>())
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Reduce objects of `class` with `reducer` instead of their own hooks.
    pub fn register_reducer<F>(&mut self, class: QualName, reducer: F)
        where F: Fn(&mut Heap, ObjRef) -> Result<ObjRef> + Send + Sync + 'static
    {
        self.dispatch.insert(class, Arc::new(reducer));
    }

    pub fn register_class<H: ClassHooks + 'static>(&mut self, class: QualName, hooks: H) {
        self.classes.insert(class, Arc::new(hooks));
    }

    pub fn register_callable<F>(&mut self, name: QualName, callable: F)
        where F: Fn(&mut Heap, &[ObjRef]) -> Result<ObjRef> + Send + Sync + 'static
    {
        self.callables.insert(name, Arc::new(callable));
    }

    /// Give a global a compact extension code.  Re-registering the same
    /// pair is allowed, conflicting registrations are not.
    pub fn add_extension(&mut self, name: QualName, code: u32) -> Result<()> {
        if code == 0 || code > MAX_EXTENSION_CODE {
            return Err(value_error(format!("code out of range: {}", code)));
        }
        if self.extensions.get(&name) == Some(&code) && self.inverted.get(&code) == Some(&name) {
            return Ok(());
        }
        if let Some(other) = self.extensions.get(&name) {
            return Err(value_error(format!("key {} is already registered with code {}",
                                           name, other)));
        }
        if let Some(other) = self.inverted.get(&code) {
            return Err(value_error(format!("code {} is already in use for key {}",
                                           code, other)));
        }
        self.extensions.insert(name.clone(), code);
        self.inverted.insert(code, name);
        Ok(())
    }

    pub fn remove_extension(&mut self, name: &QualName, code: u32) -> Result<()> {
        if self.extensions.get(name) != Some(&code) || self.inverted.get(&code) != Some(name) {
            return Err(value_error(format!("key {} is not registered with code {}", name, code)));
        }
        self.extensions.remove(name);
        self.inverted.remove(&code);
        Ok(())
    }

    /// Install the hook that decides on globals not known to this registry.
    /// Without one, every global resolves.
    pub fn set_module_loader<F>(&mut self, loader: F)
        where F: Fn(&QualName) -> Result<()> + Send + Sync + 'static
    {
        self.loader = Some(Arc::new(loader));
    }

    pub fn reducer(&self, class: &QualName) -> Option<&Reducer> {
        self.dispatch.get(class)
    }

    pub fn hooks(&self, class: &QualName) -> Option<&dyn ClassHooks> {
        self.classes.get(class).map(|h| &**h)
    }

    pub fn extension_code(&self, name: &QualName) -> Option<u32> {
        self.extensions.get(name).cloned()
    }

    pub fn extension(&self, code: u32) -> Option<&QualName> {
        self.inverted.get(&code)
    }

    fn is_known(&self, name: &QualName) -> bool {
        is_builtin(name) || self.classes.contains_key(name) ||
            self.callables.contains_key(name) || self.dispatch.contains_key(name) ||
            self.extensions.contains_key(name)
    }

    /// Resolve a global named in a pickle.
    pub fn find_class(&self, module: &str, name: &str) -> Result<QualName> {
        let qualname = QualName::new(module, name);
        if !self.is_known(&qualname) {
            if let Some(ref loader) = self.loader {
                loader(&qualname).map_err(|_| Error::Syntax(
                    ErrorCode::UnresolvedGlobal(module.into(), name.into())))?;
            }
        }
        Ok(qualname)
    }

    /// Apply a callable named by a global to arguments (REDUCE).
    pub fn call(&self, heap: &mut Heap, callable: ObjRef, args: &[ObjRef]) -> Result<ObjRef> {
        let name = match heap.qualname(callable) {
            Some(q) => q.clone(),
            None => return Err(Error::Syntax(ErrorCode::InvalidStackTop(
                "callable", heap.type_name(callable)))),
        };
        if let Some(f) = self.callables.get(&name) {
            return f(heap, args);
        }
        if name.module == COPY_REG {
            match &name.name[..] {
                "_reconstructor" => return self.reconstruct(heap, args),
                "__newobj__" => match args.split_first() {
                    Some((&cls, rest)) => return self.new_object(heap, cls, rest),
                    None => return Err(value_error("__newobj__ takes at least 1 argument")),
                },
                _ => {}
            }
        }
        if let Some(hooks) = self.hooks(&name) {
            if let Some(obj) = hooks.call(heap, callable, args)? {
                return Ok(obj);
            }
        }
        if args.is_empty() {
            return Ok(heap.instance(callable, false));
        }
        Err(value_error(format!("{}() takes no arguments", name)))
    }

    /// `cls.__new__(cls, *args)`, as done by NEWOBJ.
    pub fn new_object(&self, heap: &mut Heap, cls: ObjRef, args: &[ObjRef]) -> Result<ObjRef> {
        let name = match heap.qualname(cls) {
            Some(q) => q.clone(),
            None => return Err(Error::Syntax(ErrorCode::InvalidStackTop(
                "class", heap.type_name(cls)))),
        };
        if let Some(hooks) = self.hooks(&name) {
            if let Some(obj) = hooks.new(heap, cls, args)? {
                return Ok(obj);
            }
        }
        Ok(heap.instance(cls, false))
    }

    /// Create an old-style instance (INST, OBJ).  Without arguments the
    /// instance is created bare, without calling `__init__`.
    pub fn instantiate(&self, heap: &mut Heap, cls: ObjRef, args: &[ObjRef]) -> Result<ObjRef> {
        let name = match heap.qualname(cls) {
            Some(q) => q.clone(),
            None => return Err(Error::Syntax(ErrorCode::InvalidStackTop(
                "class", heap.type_name(cls)))),
        };
        if args.is_empty() {
            return Ok(heap.instance(cls, true));
        }
        if let Some(hooks) = self.hooks(&name) {
            if let Some(obj) = hooks.call(heap, cls, args)? {
                return Ok(obj);
            }
        }
        Err(value_error(format!("{}() takes no arguments", name)))
    }

    /// `copy_reg._reconstructor(cls, base, state)`
    fn reconstruct(&self, heap: &mut Heap, args: &[ObjRef]) -> Result<ObjRef> {
        let (cls, base, state) = match *args {
            [cls, base, state] => (cls, base, state),
            _ => return Err(value_error("_reconstructor takes exactly 3 arguments")),
        };
        let is_object = heap.qualname(base).map_or(false, |q| *q == object_name());
        if is_object {
            return self.new_object(heap, cls, &[]);
        }
        let state = match *heap.get(state) {
            Object::None => vec![],
            _ => vec![state],
        };
        let base_name = heap.qualname(base).cloned();
        if let Some(hooks) = base_name.as_ref().and_then(|q| self.hooks(q)) {
            if let Some(obj) = hooks.new(heap, cls, &state)? {
                return Ok(obj);
            }
        }
        Err(value_error(format!("cannot reconstruct from base {}",
                               base_name.map_or_else(|| "?".into(), |q| q.to_string()))))
    }

    /// Apply BUILD: `__setstate__`, or merge the state dict and set each
    /// entry of a slot-state dict as an attribute.
    pub fn build(&self, heap: &mut Heap, inst: ObjRef, state: ObjRef) -> Result<()> {
        let class = match heap.class_of(inst) {
            Some(class) => class,
            None => return Err(Error::Syntax(ErrorCode::BadBuildTarget(heap.type_name(inst)))),
        };
        let hooks = self.hooks(&class);
        if let Some(hooks) = hooks {
            if hooks.setstate(heap, inst, state)? {
                return Ok(());
            }
        }
        let (state, slotstate) = match *heap.get(state) {
            Object::Tuple(ref items) if items.len() == 2 => (items[0], Some(items[1])),
            _ => (state, None),
        };
        let dict = heap.instance_dict(inst).ok_or_else(|| Error::Syntax(
            ErrorCode::BadBuildTarget(heap.type_name(inst))))?;
        let pairs = match *heap.get(state) {
            Object::None => vec![],
            Object::Dict(ref d) => d.pairs().to_vec(),
            _ => return Err(Error::Syntax(ErrorCode::InvalidValue(
                format!("state is not a dictionary: {}", heap.repr(state))))),
        };
        for (k, v) in pairs {
            heap.dict_set(dict, k, v).map_err(Error::Syntax)?;
        }
        if let Some(slotstate) = slotstate {
            let pairs = match *heap.get(slotstate) {
                Object::None => vec![],
                Object::Dict(ref d) => d.pairs().to_vec(),
                _ => return Err(Error::Syntax(ErrorCode::InvalidValue(
                    "slot state is not a dictionary".into()))),
            };
            for (k, v) in pairs {
                let name = match *heap.get(k) {
                    Object::Str(ref s) => s.clone(),
                    _ => return Err(Error::Syntax(ErrorCode::InvalidValue(
                        "slot state key is not a string".into()))),
                };
                let handled = match hooks {
                    Some(hooks) => hooks.setattr(heap, inst, &name, v)?,
                    None => false,
                };
                if !handled {
                    heap.setattr(inst, &name, v).map_err(Error::Syntax)?;
                }
            }
        }
        Ok(())
    }
}

pub fn object_name() -> QualName {
    QualName::new(BUILTIN, "object")
}

pub fn newobj_name() -> QualName {
    QualName::new(COPY_REG, "__newobj__")
}

pub fn reconstructor_name() -> QualName {
    QualName::new(COPY_REG, "_reconstructor")
}

fn is_builtin(name: &QualName) -> bool {
    *name == object_name() || *name == newobj_name() || *name == reconstructor_name()
}

fn value_error<S: Into<String>>(msg: S) -> Error {
    Error::Syntax(ErrorCode::InvalidValue(msg.into()))
}

