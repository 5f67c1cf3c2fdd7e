//! Compile pipeline: script source → evaluated program → serialized image.

use sha2::{Digest, Sha256};

use scrawl_engine::{ObjRef, Value};

use crate::codec;
use crate::context::Bridge;
use crate::errors::BridgeError;
use crate::image;
use crate::lifecycle::Root;

/// An opaque, serialized evaluated program.
///
/// The byte buffer lives on the interpreter heap and stays pinned for the
/// life of this handle; dropping the handle releases the pin. Loading an
/// image does not consume it — the same image may seed any number of
/// independent environments.
#[derive(Debug)]
pub struct CompiledImage {
    root: Root,
    buffer: ObjRef,
    digest: [u8; 32],
}

impl CompiledImage {
    /// The serialized image bytes.
    pub fn bytes(&self) -> Vec<u8> {
        self.root
            .heap()
            .borrow()
            .buffer(self.buffer)
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    }

    /// Hex sha256 of the image bytes, suitable as a cache key.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    pub fn len(&self) -> usize {
        self.root
            .heap()
            .borrow()
            .buffer(self.buffer)
            .map(<[u8]>::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Bridge {
    /// Compile script source into a portable image.
    ///
    /// Invokes the runtime's evaluate entry point, serializes the evaluated
    /// program through the encode dictionary, and pins the resulting buffer.
    /// Interpreter failures come back as [`BridgeError::Evaluation`], never
    /// as a crash.
    pub fn compile(&self, source: &str) -> Result<CompiledImage, BridgeError> {
        let evaluate = self.evaluate_entry()?;

        let started = std::time::Instant::now();
        let evaluated = self
            .engine()
            .call(evaluate, &[codec::encode_source(source)])
            .map_err(|signal| BridgeError::evaluation(signal.message()))?;

        let heap = self.engine().heap();
        let bytes = image::serialize(&heap.borrow(), &evaluated, self.dictionary())?;
        let digest: [u8; 32] = Sha256::digest(&bytes).into();
        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            size = bytes.len(),
            digest = %hex::encode(&digest[..8]),
            "compiled script"
        );

        let buffer = heap.borrow_mut().alloc_buffer(bytes);
        let root = Root::pin(&heap, Value::Buffer(buffer));
        Ok(CompiledImage {
            root,
            buffer,
            digest,
        })
    }
}
