//! Bridge context: engine handle, image dictionary, and the resolved
//! runtime entry points.
//!
//! Entry points live in an explicit context object passed to every bridge
//! call rather than in global state, so tests can substitute a fake runtime
//! by handing in a different bootstrap image.

use std::fmt;

use scrawl_engine::{Engine, FuncId, ObjRef, TableKey, Value};

use crate::errors::BridgeError;
use crate::image::{self, ImageDictionary};
use crate::lifecycle::Root;

/// Exported name of the evaluator entry point.
pub const ENTRY_EVALUATE: &str = "evaluator/evaluate";
/// Exported name of the frame-runner entry point.
pub const ENTRY_RUN: &str = "runner/run";
/// Exported name of the background-read entry point.
pub const ENTRY_BACKGROUND: &str = "runner/background";

#[derive(Debug, Default)]
struct EntryPoints {
    evaluate: Option<FuncId>,
    run: Option<FuncId>,
    background: Option<FuncId>,
}

/// The bridge between the host and the embedded runtime.
///
/// Construct with [`Bridge::bootstrap`] to resolve the entry points from a
/// bootstrap image, or with [`Bridge::new`] for an unresolved context whose
/// operations all fail with an uninitialized error (useful in tests and as
/// the pre-bootstrap state).
pub struct Bridge {
    engine: Engine,
    dictionary: ImageDictionary,
    entries: EntryPoints,
    /// Keeps the bootstrap environment alive for the life of the bridge.
    _bootstrap: Option<Root>,
}

impl Bridge {
    /// An unresolved bridge: every operation that needs a runtime entry
    /// point fails with [`BridgeError::Uninitialized`].
    pub fn new(engine: Engine, dictionary: ImageDictionary) -> Self {
        Self {
            engine,
            dictionary,
            entries: EntryPoints::default(),
            _bootstrap: None,
        }
    }

    /// Load a bootstrap image and resolve the three runtime entry points
    /// from its exported-declarations table.
    ///
    /// Absence of an entry point is fatal to bridge construction: a runtime
    /// without its evaluator or runner can never service requests.
    pub fn bootstrap(
        engine: Engine,
        dictionary: ImageDictionary,
        image_bytes: &[u8],
    ) -> Result<Self, BridgeError> {
        let heap = engine.heap();
        let env_value = {
            let mut heap = heap.borrow_mut();
            image::deserialize(&mut heap, image_bytes, &dictionary)?
        };
        let env = env_value
            .as_table()
            .ok_or_else(|| BridgeError::format("bootstrap image root is not a table"))?;

        let entries = {
            let heap = heap.borrow();
            EntryPoints {
                evaluate: Some(env_lookup_function(&heap, env, ENTRY_EVALUATE)?),
                run: Some(env_lookup_function(&heap, env, ENTRY_RUN)?),
                background: Some(env_lookup_function(&heap, env, ENTRY_BACKGROUND)?),
            }
        };
        tracing::debug!(size = image_bytes.len(), "bootstrap image loaded");

        let bootstrap = Root::pin(&heap, env_value);
        Ok(Self {
            engine,
            dictionary,
            entries,
            _bootstrap: Some(bootstrap),
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn dictionary(&self) -> &ImageDictionary {
        &self.dictionary
    }

    pub(crate) fn evaluate_entry(&self) -> Result<FuncId, BridgeError> {
        self.entries
            .evaluate
            .ok_or(BridgeError::Uninitialized {
                entry_point: ENTRY_EVALUATE,
            })
    }

    pub(crate) fn run_entry(&self) -> Result<FuncId, BridgeError> {
        self.entries.run.ok_or(BridgeError::Uninitialized {
            entry_point: ENTRY_RUN,
        })
    }

    pub(crate) fn background_entry(&self) -> Result<FuncId, BridgeError> {
        self.entries
            .background
            .ok_or(BridgeError::Uninitialized {
                entry_point: ENTRY_BACKGROUND,
            })
    }
}

// Engine is not Debug (it holds boxed natives), so render the resolved
// entries only.
impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

/// Look up an exported declaration: `env[name]` must be an entry table whose
/// `:value` key holds the declared value.
fn env_lookup(
    heap: &scrawl_engine::Heap,
    env: ObjRef,
    name: &str,
) -> Result<Value, BridgeError> {
    let entry = heap
        .table_get(env, &TableKey::str(name))
        .ok_or(BridgeError::Uninitialized {
            entry_point: static_entry_name(name),
        })?;
    let entry_table = entry.as_table().ok_or_else(|| {
        BridgeError::format(format!(
            "environment entry `{}` is {}, not a table",
            name,
            entry.type_name()
        ))
    })?;
    heap.table_get(entry_table, &TableKey::keyword("value"))
        .ok_or_else(|| {
            BridgeError::format(format!("environment entry `{}` has no :value", name))
        })
}

fn env_lookup_function(
    heap: &scrawl_engine::Heap,
    env: ObjRef,
    name: &str,
) -> Result<FuncId, BridgeError> {
    let value = env_lookup(heap, env, name)?;
    value.as_function().ok_or_else(|| {
        BridgeError::format(format!(
            "expected `{}` to be a function, got {}",
            name,
            value.type_name()
        ))
    })
}

/// The three entry names are the only ones ever looked up, so the
/// uninitialized variant can carry them as static strings.
fn static_entry_name(name: &str) -> &'static str {
    match name {
        ENTRY_EVALUATE => ENTRY_EVALUATE,
        ENTRY_RUN => ENTRY_RUN,
        ENTRY_BACKGROUND => ENTRY_BACKGROUND,
        _ => "unknown entry point",
    }
}
