//! Frame executor: load an image into a live environment, then step it one
//! frame at a time.
//!
//! `start` runs once per loaded image; `step` may run an unbounded number of
//! times against the environment it produced. Each step advances the turtle
//! program's internal state and yields the frame's drawable lines plus the
//! background color, read strictly *after* the run call has mutated the
//! environment.

use scrawl_types::{Color, Line};

use scrawl_engine::Value;

use crate::codec;
use crate::compile::CompiledImage;
use crate::context::Bridge;
use crate::errors::BridgeError;
use crate::image;
use crate::lifecycle::Root;

/// A live, interpreter-resident execution context.
///
/// Mutated in place by every [`Bridge::step`] call; destroyed only by
/// dropping the handle. Never serialized back out — only images persist.
pub struct Environment {
    root: Root,
}

impl Environment {
    /// The pinned environment table.
    pub fn value(&self) -> &Value {
        self.root.value()
    }
}

/// Output of loading an image: the environment plus its initial background.
pub struct StartOutput {
    pub environment: Environment,
    pub background: Color,
}

/// One frame's drawable output.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub lines: Vec<Line>,
    pub background: Color,
}

impl Bridge {
    /// Load a compiled image into a fresh environment and read its initial
    /// background color.
    pub fn start(&self, image: &CompiledImage) -> Result<StartOutput, BridgeError> {
        let background_entry = self.background_entry()?;

        let heap = self.engine().heap();
        let bytes = image.bytes();
        let env_value = {
            let mut heap = heap.borrow_mut();
            image::deserialize(&mut heap, &bytes, self.dictionary())?
        };
        let root = Root::pin(&heap, env_value.clone());

        let raw = self
            .engine()
            .call(background_entry, &[env_value])
            .map_err(|signal| BridgeError::evaluation(signal.message()))?;
        let background = codec::decode_color(&raw)?;

        tracing::debug!(size = bytes.len(), "environment started");
        Ok(StartOutput {
            environment: Environment { root },
            background,
        })
    }

    /// Advance the environment by one frame.
    ///
    /// On a runtime signal the environment is left in whatever state the
    /// interpreter produced — there is no rollback — and the error is
    /// reported. A single malformed line element fails the entire step; no
    /// partial frame is ever returned.
    pub fn step(&self, environment: &Environment) -> Result<FrameOutput, BridgeError> {
        let run_entry = self.run_entry()?;
        let background_entry = self.background_entry()?;

        let heap = self.engine().heap();
        let env_value = environment.value().clone();

        let raw_lines = self
            .engine()
            .call(run_entry, &[env_value.clone()])
            .map_err(|signal| BridgeError::evaluation(signal.message()))?;
        // Transient pin: the line records must survive the background call.
        let pinned_lines = Root::pin(&heap, raw_lines);

        let raw_background = self
            .engine()
            .call(background_entry, &[env_value])
            .map_err(|signal| BridgeError::evaluation(signal.message()))?;
        let background = codec::decode_color(&raw_background)?;

        let lines = match pinned_lines.value() {
            Value::Array(r) => {
                let heap = heap.borrow();
                let items = heap.array(*r).ok_or_else(|| {
                    BridgeError::decode("array of line tuples", "dead array reference")
                })?;
                items
                    .iter()
                    .map(codec::decode_line)
                    .collect::<Result<Vec<Line>, BridgeError>>()?
            }
            other => {
                return Err(BridgeError::decode(
                    "array of line tuples",
                    other.type_name(),
                ))
            }
        };

        tracing::debug!(lines = lines.len(), "frame stepped");
        Ok(FrameOutput { lines, background })
    }
}
