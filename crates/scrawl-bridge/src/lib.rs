//! Scrawl Bridge
//!
//! The layer between a host application and the embedded turtle-script
//! runtime. The runtime's evaluator and frame runner are opaque entry points
//! resolved from a bootstrap image; this crate coordinates everything around
//! them:
//!
//! - **compile pipeline**: script source → evaluated program → serialized
//!   image ([`Bridge::compile`])
//! - **frame executor**: image → live environment ([`Bridge::start`]), then
//!   one frame of drawable output per [`Bridge::step`]
//! - **artifact serializer**: reversible, dictionary-based image encoding
//!   ([`image`])
//! - **lifecycle**: RAII pinning of interpreter-owned values for as long as
//!   the host holds a handle ([`lifecycle::Root`])
//! - **value codec**: fallible decoding of interpreter tuples into fixed
//!   [`Point`]/[`Color`]/[`Line`] records ([`codec`])
//!
//! Every interpreter-level failure surfaces as a [`BridgeError`]; none of
//! them terminate the process.
//!
//! [`Point`]: scrawl_types::Point
//! [`Color`]: scrawl_types::Color
//! [`Line`]: scrawl_types::Line

pub mod codec;
pub mod compile;
pub mod context;
pub mod errors;
pub mod executor;
pub mod image;
pub mod lifecycle;

pub use compile::CompiledImage;
pub use context::{Bridge, ENTRY_BACKGROUND, ENTRY_EVALUATE, ENTRY_RUN};
pub use errors::BridgeError;
pub use executor::{Environment, FrameOutput, StartOutput};
pub use image::ImageDictionary;
pub use lifecycle::Root;
