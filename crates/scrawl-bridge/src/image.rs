//! Artifact serializer: reversible, dictionary-based image encoding.
//!
//! An image is a byte buffer holding a fully evaluated program, independent
//! of any particular interpreter process instance. Raw function references
//! are not portable, so the encoder maps them through an [`ImageDictionary`]
//! to stable symbolic names and the decoder maps those names back to live
//! functions. The dictionaries on the two ends may be built separately but
//! must agree on every exported name — a closed-world guarantee the
//! embedding application upholds by registering the same natives on both
//! sides.
//!
//! # Wire format
//!
//! `b"SCRW"` magic, one format-version byte, then a tagged value tree.
//! Strings and aggregates are length-prefixed (u32 LE), numbers are f64 LE.
//! Heap objects (arrays, tables, buffers) are assigned an index the first
//! time they are emitted; later occurrences are encoded as backrefs, which
//! keeps shared and cyclic structure intact across a reload.

use std::collections::HashMap;

use scrawl_engine::{FuncId, Heap, ObjRef, TableKey, Value};

use crate::errors::BridgeError;

pub const IMAGE_MAGIC: [u8; 4] = *b"SCRW";
pub const IMAGE_VERSION: u8 = 1;

const TAG_NIL: u8 = 0;
const TAG_FALSE: u8 = 1;
const TAG_TRUE: u8 = 2;
const TAG_NUMBER: u8 = 3;
const TAG_STRING: u8 = 4;
const TAG_KEYWORD: u8 = 5;
const TAG_TUPLE: u8 = 6;
const TAG_ARRAY: u8 = 7;
const TAG_TABLE: u8 = 8;
const TAG_BUFFER: u8 = 9;
const TAG_FUNCTION: u8 = 10;
const TAG_BACKREF: u8 = 11;

/// Both codec directions recurse once per nesting level; a corrupt image or
/// a pathological evaluator result must surface as a format error, not a
/// stack overflow.
const MAX_NESTING_DEPTH: usize = 1000;

/// Bidirectional map between live function references and the stable
/// symbolic names that stand in for them inside an image.
#[derive(Debug, Clone, Default)]
pub struct ImageDictionary {
    forward: HashMap<FuncId, String>,
    reverse: HashMap<String, FuncId>,
}

impl ImageDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an exported name. Used for both encode (function → name)
    /// and decode (name → function).
    pub fn register(&mut self, name: &str, id: FuncId) {
        self.forward.insert(id, name.to_string());
        self.reverse.insert(name.to_string(), id);
    }

    pub fn name_of(&self, id: FuncId) -> Option<&str> {
        self.forward.get(&id).map(String::as_str)
    }

    pub fn id_of(&self, name: &str) -> Option<FuncId> {
        self.reverse.get(name).copied()
    }
}

/// Encode an evaluated program value into image bytes.
///
/// Fails with a format error if the value graph contains a function with no
/// dictionary entry or a dangling object reference.
pub fn serialize(
    heap: &Heap,
    value: &Value,
    dict: &ImageDictionary,
) -> Result<Vec<u8>, BridgeError> {
    let mut encoder = Encoder {
        heap,
        dict,
        out: Vec::with_capacity(512),
        seen: HashMap::new(),
    };
    encoder.out.extend_from_slice(&IMAGE_MAGIC);
    encoder.out.push(IMAGE_VERSION);
    encoder.write_value(value, 0)?;
    Ok(encoder.out)
}

/// Decode image bytes back into a live value, materializing fresh heap
/// objects.
///
/// Fails with a format error if the header is not a scrawl image, the
/// version is unsupported, the leading type tag does not denote a table, a
/// symbolic reference is unresolved, or the buffer is truncated or carries
/// trailing bytes.
pub fn deserialize(
    heap: &mut Heap,
    bytes: &[u8],
    dict: &ImageDictionary,
) -> Result<Value, BridgeError> {
    if bytes.len() < IMAGE_MAGIC.len() + 1 {
        return Err(BridgeError::format("image shorter than its header"));
    }
    if bytes[..4] != IMAGE_MAGIC {
        return Err(BridgeError::format("not a scrawl image (bad magic)"));
    }
    let version = bytes[4];
    if version != IMAGE_VERSION {
        return Err(BridgeError::format(format!(
            "unsupported image version {}",
            version
        )));
    }

    let mut decoder = Decoder {
        bytes,
        pos: 5,
        dict,
        objects: Vec::new(),
    };
    if decoder.peek_tag()? != TAG_TABLE {
        return Err(BridgeError::format(
            "image root is not an environment table",
        ));
    }
    let value = decoder.read_value(heap, 0)?;
    if decoder.pos != bytes.len() {
        return Err(BridgeError::format(format!(
            "{} trailing bytes after image root",
            bytes.len() - decoder.pos
        )));
    }
    Ok(value)
}

struct Encoder<'a> {
    heap: &'a Heap,
    dict: &'a ImageDictionary,
    out: Vec<u8>,
    seen: HashMap<ObjRef, u32>,
}

impl Encoder<'_> {
    fn write_u32(&mut self, n: u32) {
        self.out.extend_from_slice(&n.to_le_bytes());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.out.extend_from_slice(s.as_bytes());
    }

    fn write_value(&mut self, value: &Value, depth: usize) -> Result<(), BridgeError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(BridgeError::format(format!(
                "value nesting exceeds {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        match value {
            Value::Nil => self.out.push(TAG_NIL),
            Value::Bool(false) => self.out.push(TAG_FALSE),
            Value::Bool(true) => self.out.push(TAG_TRUE),
            Value::Number(n) => {
                self.out.push(TAG_NUMBER);
                self.out.extend_from_slice(&n.to_le_bytes());
            }
            Value::Str(s) => {
                self.out.push(TAG_STRING);
                self.write_str(s);
            }
            Value::Keyword(s) => {
                self.out.push(TAG_KEYWORD);
                self.write_str(s);
            }
            Value::Tuple(items) => {
                self.out.push(TAG_TUPLE);
                self.write_u32(items.len() as u32);
                for item in items.iter() {
                    self.write_value(item, depth + 1)?;
                }
            }
            Value::Function(id) => {
                let name = self.dict.name_of(*id).ok_or_else(|| {
                    BridgeError::format(format!(
                        "function {:?} has no image dictionary entry",
                        id
                    ))
                })?;
                let name = name.to_string();
                self.out.push(TAG_FUNCTION);
                self.write_str(&name);
            }
            Value::Array(r) | Value::Table(r) | Value::Buffer(r) => {
                if let Some(&index) = self.seen.get(r) {
                    self.out.push(TAG_BACKREF);
                    self.write_u32(index);
                    return Ok(());
                }
                // Index assigned before contents so self-references resolve.
                self.seen.insert(*r, self.seen.len() as u32);
                self.write_object(*r, depth)?;
            }
        }
        Ok(())
    }

    fn write_object(&mut self, r: ObjRef, depth: usize) -> Result<(), BridgeError> {
        let heap = self.heap;
        match heap.object(r) {
            Some(scrawl_engine::Object::Buffer(_)) => {
                let bytes = heap.buffer(r).unwrap_or_default().to_vec();
                self.out.push(TAG_BUFFER);
                self.write_u32(bytes.len() as u32);
                self.out.extend_from_slice(&bytes);
            }
            Some(scrawl_engine::Object::Array(_)) => {
                let items = heap.array(r).unwrap_or_default().to_vec();
                self.out.push(TAG_ARRAY);
                self.write_u32(items.len() as u32);
                for item in &items {
                    self.write_value(item, depth + 1)?;
                }
            }
            Some(scrawl_engine::Object::Table(_)) => {
                let entries: Vec<(TableKey, Value)> = heap
                    .table(r)
                    .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                    .unwrap_or_default();
                self.out.push(TAG_TABLE);
                self.write_u32(entries.len() as u32);
                for (key, value) in &entries {
                    match key {
                        TableKey::Str(s) => {
                            self.out.push(TAG_STRING);
                            self.write_str(s);
                        }
                        TableKey::Keyword(s) => {
                            self.out.push(TAG_KEYWORD);
                            self.write_str(s);
                        }
                    }
                    self.write_value(value, depth + 1)?;
                }
            }
            None => {
                return Err(BridgeError::format(format!(
                    "dangling object reference {:?}",
                    r
                )))
            }
        }
        Ok(())
    }
}

struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
    dict: &'a ImageDictionary,
    objects: Vec<Value>,
}

impl Decoder<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8], BridgeError> {
        if self.pos + n > self.bytes.len() {
            return Err(BridgeError::format(format!(
                "truncated image at offset {}",
                self.pos
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn peek_tag(&self) -> Result<u8, BridgeError> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or_else(|| BridgeError::format("truncated image (missing root tag)"))
    }

    fn read_u8(&mut self) -> Result<u8, BridgeError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, BridgeError> {
        let bytes: [u8; 4] = self
            .take(4)?
            .try_into()
            .map_err(|_| BridgeError::format("truncated u32"))?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_f64(&mut self) -> Result<f64, BridgeError> {
        let bytes: [u8; 8] = self
            .take(8)?
            .try_into()
            .map_err(|_| BridgeError::format("truncated f64"))?;
        Ok(f64::from_le_bytes(bytes))
    }

    fn read_str(&mut self) -> Result<String, BridgeError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| BridgeError::format("image string is not valid UTF-8"))
    }

    fn read_value(&mut self, heap: &mut Heap, depth: usize) -> Result<Value, BridgeError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(BridgeError::format(format!(
                "value nesting exceeds {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        let offset = self.pos;
        let tag = self.read_u8()?;
        match tag {
            TAG_NIL => Ok(Value::Nil),
            TAG_FALSE => Ok(Value::Bool(false)),
            TAG_TRUE => Ok(Value::Bool(true)),
            TAG_NUMBER => Ok(Value::Number(self.read_f64()?)),
            TAG_STRING => Ok(Value::string(&self.read_str()?)),
            TAG_KEYWORD => Ok(Value::keyword(&self.read_str()?)),
            TAG_TUPLE => {
                let count = self.read_u32()? as usize;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.read_value(heap, depth + 1)?);
                }
                Ok(Value::tuple(items))
            }
            TAG_ARRAY => {
                let count = self.read_u32()? as usize;
                let r = heap.alloc_array(Vec::with_capacity(count));
                // Registered before the items so backrefs into this array
                // (including self-references) resolve.
                self.objects.push(Value::Array(r));
                for _ in 0..count {
                    let item = self.read_value(heap, depth + 1)?;
                    heap.array_push(r, item);
                }
                Ok(Value::Array(r))
            }
            TAG_TABLE => {
                let count = self.read_u32()? as usize;
                let r = heap.alloc_table();
                self.objects.push(Value::Table(r));
                for _ in 0..count {
                    let key = self.read_table_key()?;
                    let value = self.read_value(heap, depth + 1)?;
                    heap.table_set(r, key, value);
                }
                Ok(Value::Table(r))
            }
            TAG_BUFFER => {
                let len = self.read_u32()? as usize;
                let bytes = self.take(len)?.to_vec();
                let r = heap.alloc_buffer(bytes);
                self.objects.push(Value::Buffer(r));
                Ok(Value::Buffer(r))
            }
            TAG_FUNCTION => {
                let name = self.read_str()?;
                self.dict
                    .id_of(&name)
                    .map(Value::Function)
                    .ok_or_else(|| {
                        BridgeError::format(format!(
                            "unresolved symbolic reference `{}`",
                            name
                        ))
                    })
            }
            TAG_BACKREF => {
                let index = self.read_u32()? as usize;
                self.objects.get(index).cloned().ok_or_else(|| {
                    BridgeError::format(format!("backref {} out of range", index))
                })
            }
            other => Err(BridgeError::format(format!(
                "unknown tag {} at offset {}",
                other, offset
            ))),
        }
    }

    fn read_table_key(&mut self) -> Result<TableKey, BridgeError> {
        let tag = self.read_u8()?;
        let name = self.read_str()?;
        match tag {
            TAG_STRING => Ok(TableKey::str(&name)),
            TAG_KEYWORD => Ok(TableKey::keyword(&name)),
            other => Err(BridgeError::format(format!(
                "invalid table key tag {}",
                other
            ))),
        }
    }
}
