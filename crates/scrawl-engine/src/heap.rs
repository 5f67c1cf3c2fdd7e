//! Heap with explicit external roots and mark/sweep collection.
//!
//! The host keeps interpreter values alive across bridge calls by rooting
//! them: a rooted object is treated as reachable even when nothing inside the
//! interpreter's own object graph references it. Roots are counted, so the
//! same object can be pinned independently by several owners.
//!
//! Collection is explicit. Values held only on the Rust stack are invisible
//! to the collector, so the embedding application must call [`Heap::collect`]
//! only between operations, never while a call is in flight.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::value::{TableKey, Value};

/// Reference to a heap-resident object.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef(u32);

/// A heap-resident object.
#[derive(Debug)]
pub enum Object {
    Array(Vec<Value>),
    Table(BTreeMap<TableKey, Value>),
    Buffer(Vec<u8>),
}

#[derive(Debug)]
struct Entry {
    object: Object,
    roots: u32,
    marked: bool,
}

/// Slot-allocated object heap shared by the engine and the bridge.
#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Option<Entry>>,
    free: Vec<u32>,
}

/// The single-threaded shared heap cell.
pub type HeapCell = Rc<RefCell<Heap>>;

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh heap in the shared cell.
    pub fn shared() -> HeapCell {
        Rc::new(RefCell::new(Heap::new()))
    }

    fn alloc(&mut self, object: Object) -> ObjRef {
        let entry = Entry {
            object,
            roots: 0,
            marked: false,
        };
        match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(entry);
                ObjRef(index)
            }
            None => {
                self.slots.push(Some(entry));
                ObjRef((self.slots.len() - 1) as u32)
            }
        }
    }

    pub fn alloc_array(&mut self, items: Vec<Value>) -> ObjRef {
        self.alloc(Object::Array(items))
    }

    pub fn alloc_table(&mut self) -> ObjRef {
        self.alloc(Object::Table(BTreeMap::new()))
    }

    pub fn alloc_buffer(&mut self, bytes: Vec<u8>) -> ObjRef {
        self.alloc(Object::Buffer(bytes))
    }

    fn entry(&self, r: ObjRef) -> Option<&Entry> {
        self.slots.get(r.0 as usize).and_then(|s| s.as_ref())
    }

    fn entry_mut(&mut self, r: ObjRef) -> Option<&mut Entry> {
        self.slots.get_mut(r.0 as usize).and_then(|s| s.as_mut())
    }

    pub fn object(&self, r: ObjRef) -> Option<&Object> {
        self.entry(r).map(|e| &e.object)
    }

    pub fn array(&self, r: ObjRef) -> Option<&[Value]> {
        match self.object(r) {
            Some(Object::Array(items)) => Some(items),
            _ => None,
        }
    }

    pub fn table(&self, r: ObjRef) -> Option<&BTreeMap<TableKey, Value>> {
        match self.object(r) {
            Some(Object::Table(map)) => Some(map),
            _ => None,
        }
    }

    pub fn buffer(&self, r: ObjRef) -> Option<&[u8]> {
        match self.object(r) {
            Some(Object::Buffer(bytes)) => Some(bytes),
            _ => None,
        }
    }

    pub fn array_push(&mut self, r: ObjRef, value: Value) {
        if let Some(Entry {
            object: Object::Array(items),
            ..
        }) = self.entry_mut(r)
        {
            items.push(value);
        }
    }

    pub fn table_get(&self, r: ObjRef, key: &TableKey) -> Option<Value> {
        self.table(r).and_then(|map| map.get(key).cloned())
    }

    pub fn table_set(&mut self, r: ObjRef, key: TableKey, value: Value) {
        if let Some(Entry {
            object: Object::Table(map),
            ..
        }) = self.entry_mut(r)
        {
            map.insert(key, value);
        }
    }

    /// Establish one external root on a heap-backed value.
    ///
    /// Immediate values have no collector-visible identity; rooting them is a
    /// harmless no-op.
    pub fn root(&mut self, value: &Value) {
        if let Some(r) = heap_ref(value) {
            if let Some(entry) = self.entry_mut(r) {
                entry.roots += 1;
            }
        }
    }

    /// Remove one external root.
    pub fn unroot(&mut self, value: &Value) {
        if let Some(r) = heap_ref(value) {
            match self.entry_mut(r) {
                Some(entry) if entry.roots > 0 => entry.roots -= 1,
                Some(_) => {
                    tracing::warn!(?r, "unroot without a matching root");
                }
                None => {
                    tracing::warn!(?r, "unroot of a dead object");
                }
            }
        }
    }

    /// Number of external roots on an object. Test/diagnostic hook.
    pub fn root_count(&self, r: ObjRef) -> u32 {
        self.entry(r).map(|e| e.roots).unwrap_or(0)
    }

    pub fn is_live(&self, r: ObjRef) -> bool {
        self.entry(r).is_some()
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Mark from the external roots and sweep everything unreachable.
    ///
    /// Returns the number of objects freed.
    pub fn collect(&mut self) -> usize {
        let mut work: Vec<ObjRef> = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(entry) = slot {
                if entry.roots > 0 {
                    work.push(ObjRef(index as u32));
                }
            }
        }

        while let Some(r) = work.pop() {
            let already = match self.entry_mut(r) {
                Some(entry) => std::mem::replace(&mut entry.marked, true),
                None => continue,
            };
            if already {
                continue;
            }
            match self.object(r) {
                Some(Object::Array(items)) => {
                    for item in items {
                        trace_value(item, &mut work);
                    }
                }
                Some(Object::Table(map)) => {
                    for value in map.values() {
                        trace_value(value, &mut work);
                    }
                }
                Some(Object::Buffer(_)) | None => {}
            }
        }

        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            match slot {
                Some(entry) if entry.marked => entry.marked = false,
                Some(_) => {
                    *slot = None;
                    self.free.push(index as u32);
                    freed += 1;
                }
                None => {}
            }
        }
        freed
    }
}

fn heap_ref(value: &Value) -> Option<ObjRef> {
    match value {
        Value::Array(r) | Value::Table(r) | Value::Buffer(r) => Some(*r),
        _ => None,
    }
}

/// Push the heap references reachable from a value, descending into tuples.
fn trace_value(value: &Value, work: &mut Vec<ObjRef>) {
    match value {
        Value::Array(r) | Value::Table(r) | Value::Buffer(r) => work.push(*r),
        Value::Tuple(items) => {
            for item in items.iter() {
                trace_value(item, work);
            }
        }
        _ => {}
    }
}
