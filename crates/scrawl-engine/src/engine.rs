//! Engine: native function registry and the fallible call protocol.
//!
//! Natives are the only callable things in this seam; the evaluator and the
//! frame runner are natives the embedding application registers by name.
//! A failed call is a *signal*, not a process fault: [`Engine::call`] returns
//! the diagnostic and leaves the heap in whatever state the native produced.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::heap::{Heap, HeapCell};
use crate::value::{FuncId, Value};

/// Failure signaled by the interpreter during a call.
#[derive(Debug, Clone)]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

type NativeFn = Rc<dyn Fn(&Engine, &[Value]) -> Result<Value, EngineError>>;

struct NativeEntry {
    name: String,
    func: NativeFn,
}

/// Handle to the embedded engine: shared heap plus the native registry.
///
/// Cloning is cheap and yields a handle to the same engine. Single-threaded
/// by design; see the crate docs.
#[derive(Clone)]
pub struct Engine {
    heap: HeapCell,
    natives: Rc<RefCell<Vec<NativeEntry>>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            heap: Heap::shared(),
            natives: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// The shared heap cell. Callers borrow it for the duration of a single
    /// operation only.
    pub fn heap(&self) -> HeapCell {
        Rc::clone(&self.heap)
    }

    /// Register a native function under a symbolic name and return its id.
    ///
    /// The name is what the artifact serializer's dictionary maps function
    /// references to; the embedding application must register the same names
    /// on the encode and decode side.
    pub fn register(
        &self,
        name: &str,
        func: impl Fn(&Engine, &[Value]) -> Result<Value, EngineError> + 'static,
    ) -> FuncId {
        let mut natives = self.natives.borrow_mut();
        let id = FuncId(natives.len() as u32);
        natives.push(NativeEntry {
            name: name.to_string(),
            func: Rc::new(func),
        });
        id
    }

    /// Look up a registered function by symbolic name.
    pub fn resolve(&self, name: &str) -> Option<FuncId> {
        self.natives
            .borrow()
            .iter()
            .position(|entry| entry.name == name)
            .map(|index| FuncId(index as u32))
    }

    /// The symbolic name a function was registered under.
    pub fn function_name(&self, id: FuncId) -> Option<String> {
        self.natives
            .borrow()
            .get(id.0 as usize)
            .map(|entry| entry.name.clone())
    }

    /// Invoke a function. Failure is a recoverable signal carrying the
    /// interpreter's diagnostic.
    pub fn call(&self, id: FuncId, args: &[Value]) -> Result<Value, EngineError> {
        let func = {
            let natives = self.natives.borrow();
            match natives.get(id.0 as usize) {
                Some(entry) => Rc::clone(&entry.func),
                None => {
                    return Err(EngineError::new(format!(
                        "no such function: {:?}",
                        id
                    )))
                }
            }
        };
        func(self, args)
    }

    /// Run a collection cycle. Only valid between operations.
    pub fn collect(&self) -> usize {
        self.heap.borrow_mut().collect()
    }
}
