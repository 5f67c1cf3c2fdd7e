//! Bootstrap wiring for the demo runtime.
//!
//! The bridge resolves its entry points from a bootstrap image, never from
//! the host directly. This module produces that image: it registers the
//! demo runtime natives with a fresh engine, builds the matching image
//! dictionary (the same registrations drive both the encode and decode
//! side), serializes an exported-declarations environment, and hands the
//! result to [`Bridge::bootstrap`].

use scrawl_bridge::{
    image, Bridge, BridgeError, ImageDictionary, ENTRY_BACKGROUND, ENTRY_EVALUATE, ENTRY_RUN,
};
use scrawl_engine::{Engine, FuncId, TableKey, Value};

use crate::builtins;

/// Well-known filename the standalone CLI loads its bootstrap image from.
pub const BOOTSTRAP_IMAGE_FILE: &str = "scrawl.image";

/// Handles to the registered demo runtime natives.
pub struct InstalledRuntime {
    pub evaluate: FuncId,
    pub run: FuncId,
    pub background: FuncId,
}

/// Register the demo runtime natives under their exported names.
pub fn install_builtins(engine: &Engine) -> InstalledRuntime {
    InstalledRuntime {
        evaluate: engine.register(ENTRY_EVALUATE, builtins::evaluate),
        run: engine.register(ENTRY_RUN, builtins::run),
        background: engine.register(ENTRY_BACKGROUND, builtins::background),
    }
}

/// The image dictionary covering every function the demo runtime exports.
pub fn dictionary(runtime: &InstalledRuntime) -> ImageDictionary {
    let mut dict = ImageDictionary::new();
    dict.register(ENTRY_EVALUATE, runtime.evaluate);
    dict.register(ENTRY_RUN, runtime.run);
    dict.register(ENTRY_BACKGROUND, runtime.background);
    dict
}

/// Build the exported-declarations environment table:
/// `env[name]` → entry table whose `:value` holds the function.
pub fn bootstrap_environment(engine: &Engine, runtime: &InstalledRuntime) -> Value {
    let heap = engine.heap();
    let mut heap = heap.borrow_mut();
    let env = heap.alloc_table();
    let exports = [
        (ENTRY_EVALUATE, runtime.evaluate),
        (ENTRY_RUN, runtime.run),
        (ENTRY_BACKGROUND, runtime.background),
    ];
    for (name, id) in exports {
        let entry = heap.alloc_table();
        heap.table_set(entry, TableKey::keyword("value"), Value::Function(id));
        heap.table_set(env, TableKey::str(name), Value::Table(entry));
    }
    Value::Table(env)
}

/// Serialize the demo runtime's bootstrap environment to image bytes.
pub fn build_bootstrap_image(
    engine: &Engine,
    runtime: &InstalledRuntime,
) -> Result<Vec<u8>, BridgeError> {
    let dict = dictionary(runtime);
    let env = bootstrap_environment(engine, runtime);
    let heap = engine.heap();
    let bytes = image::serialize(&heap.borrow(), &env, &dict)?;
    Ok(bytes)
}

/// A resolved bridge over a fresh engine, bootstrapped from the given image
/// bytes. The decode dictionary is rebuilt from this process's own native
/// registrations, so images written by a different runtime fail to load.
pub fn bridge_from_image(bytes: &[u8]) -> Result<Bridge, BridgeError> {
    let engine = Engine::new();
    let runtime = install_builtins(&engine);
    Bridge::bootstrap(engine, dictionary(&runtime), bytes)
}

/// A resolved bridge over a fresh engine, bootstrapping through an
/// in-memory image round trip.
pub fn fresh_bridge() -> Result<Bridge, BridgeError> {
    let engine = Engine::new();
    let runtime = install_builtins(&engine);
    let bytes = build_bootstrap_image(&engine, &runtime)?;
    Bridge::bootstrap(engine, dictionary(&runtime), &bytes)
}
