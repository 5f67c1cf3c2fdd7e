//! Embedded scripting engine seam.
//!
//! The bridge treats the script interpreter as an external collaborator: it
//! hands values across a boundary, calls functions that may signal failure,
//! and tells the collector which values the host still references. This crate
//! is exactly that boundary surface — an interpreter-native [`Value`] model, a
//! [`Heap`] with explicit external roots and mark/sweep collection, and an
//! [`Engine`] holding a registry of named native functions.
//!
//! It deliberately contains no language: evaluators and runners are natives
//! the embedding application registers, and everything the bridge does works
//! the same against a fake runtime registered by tests.
//!
//! # Execution model
//!
//! Single-threaded and cooperative. The heap lives in an `Rc<RefCell<..>>`
//! shared by the engine, the bridge, and every pin guard; no operation blocks
//! or runs concurrently. [`Heap::collect`] only runs when the embedding
//! application calls it between operations.

pub mod engine;
pub mod heap;
pub mod value;

pub use engine::{Engine, EngineError};
pub use heap::{Heap, HeapCell, ObjRef, Object};
pub use value::{FuncId, TableKey, Value};
