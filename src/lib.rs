//! Scrawl
//!
//! A turtle-graphics scripting playground built around an embedded runtime.
//! The heavy lifting lives in the workspace crates:
//!
//! - `scrawl-bridge`: compile pipeline, artifact serializer, lifecycle
//!   pinning, and the frame executor
//! - `scrawl-engine`: the embedded interpreter seam (values, rooted heap,
//!   native calls)
//! - `scrawl-types`: drawing records and host-boundary responses
//!
//! This crate is the embedding application: it registers the demo runtime's
//! exported natives on both the encode and decode side (the serializer's
//! closed-world dictionary guarantee), builds and loads bootstrap images,
//! and fronts everything with a CLI.

pub mod bootstrap;
pub mod builtins;

pub use scrawl_bridge::{Bridge, BridgeError, CompiledImage, Environment};
