// Refcounted heap objects, addressed by arena index.
//
// Compiled code sees object "pointers" as opaque 64-bit cell values; the
// compiler side only ever stores and compares them. Using arena indices
// instead of raw addresses keeps the object table safe to grow and lets
// tests assert on identity directly.

use log::trace;

/// Opaque handle to a heap object. The value written into an 8-byte global
/// slot for a refcounted object is exactly this index.
pub type ObjectRef = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum HeapObject {
    Bytes(Vec<u8>),
    Unicode(String),
    /// Fixed-size item array; items_hold_references marks whether each item
    /// is itself an ObjectRef that must be released with the list.
    List {
        items: Vec<u64>,
        items_hold_references: bool,
    },
}

struct Slot {
    refcount: u64,
    object: HeapObject,
}

/// The object arena. Slots are never reused while a reference is live;
/// freed slots go on a free list.
#[derive(Default)]
pub struct Heap {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    live: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, object: HeapObject) -> ObjectRef {
        let slot = Slot {
            refcount: 1,
            object,
        };
        self.live += 1;
        if let Some(index) = self.free.pop() {
            self.slots[index] = Some(slot);
            index as ObjectRef
        } else {
            self.slots.push(Some(slot));
            (self.slots.len() - 1) as ObjectRef
        }
    }

    /// Allocate a bytes object with one reference.
    pub fn bytes_new(&mut self, data: &[u8]) -> ObjectRef {
        self.insert(HeapObject::Bytes(data.to_vec()))
    }

    /// Allocate a unicode object with one reference.
    pub fn unicode_new(&mut self, data: &str) -> ObjectRef {
        self.insert(HeapObject::Unicode(data.to_string()))
    }

    /// Allocate a list object with one reference. The caller owns the item
    /// references it passes in; they are released when the list dies.
    pub fn list_new(&mut self, items: Vec<u64>, items_hold_references: bool) -> ObjectRef {
        self.insert(HeapObject::List {
            items,
            items_hold_references,
        })
    }

    pub fn get(&self, r: ObjectRef) -> Option<&HeapObject> {
        self.slots
            .get(r as usize)
            .and_then(|s| s.as_ref())
            .map(|s| &s.object)
    }

    pub fn refcount(&self, r: ObjectRef) -> Option<u64> {
        self.slots
            .get(r as usize)
            .and_then(|s| s.as_ref())
            .map(|s| s.refcount)
    }

    pub fn add_reference(&mut self, r: ObjectRef) {
        if let Some(Some(slot)) = self.slots.get_mut(r as usize) {
            slot.refcount += 1;
            trace!("[heap] addref {} -> {}", r, slot.refcount);
        }
    }

    /// Drop one reference; frees the object (and any item references it
    /// holds) when the count reaches zero. Returns true if the object died.
    pub fn delete_reference(&mut self, r: ObjectRef) -> bool {
        let Some(Some(slot)) = self.slots.get_mut(r as usize) else {
            return false;
        };
        slot.refcount -= 1;
        trace!("[heap] delref {} -> {}", r, slot.refcount);
        if slot.refcount > 0 {
            return false;
        }

        let slot = self.slots[r as usize].take();
        self.free.push(r as usize);
        self.live -= 1;

        if let Some(Slot {
            object:
                HeapObject::List {
                    items,
                    items_hold_references: true,
                },
            ..
        }) = slot
        {
            for item in items {
                self.delete_reference(item);
            }
        }
        true
    }

    pub fn live_object_count(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_read() {
        let mut heap = Heap::new();
        let b = heap.bytes_new(b"hello");
        let u = heap.unicode_new("world");
        assert_eq!(heap.get(b), Some(&HeapObject::Bytes(b"hello".to_vec())));
        assert_eq!(heap.get(u), Some(&HeapObject::Unicode("world".to_string())));
        assert_eq!(heap.refcount(b), Some(1));
    }

    #[test]
    fn test_refcounting() {
        let mut heap = Heap::new();
        let b = heap.bytes_new(b"x");
        heap.add_reference(b);
        assert_eq!(heap.refcount(b), Some(2));
        assert!(!heap.delete_reference(b));
        assert!(heap.delete_reference(b));
        assert_eq!(heap.get(b), None);
        assert_eq!(heap.live_object_count(), 0);
    }

    #[test]
    fn test_list_releases_items() {
        let mut heap = Heap::new();
        let a = heap.bytes_new(b"a");
        let b = heap.bytes_new(b"b");
        let l = heap.list_new(vec![a, b], true);
        assert_eq!(heap.live_object_count(), 3);
        assert!(heap.delete_reference(l));
        assert_eq!(heap.live_object_count(), 0);
    }

    #[test]
    fn test_plain_value_list() {
        let mut heap = Heap::new();
        let l = heap.list_new(vec![1, 2, 3], false);
        assert!(heap.delete_reference(l));
        assert_eq!(heap.live_object_count(), 0);
    }

    #[test]
    fn test_slot_reuse() {
        let mut heap = Heap::new();
        let a = heap.bytes_new(b"a");
        heap.delete_reference(a);
        let b = heap.bytes_new(b"b");
        // the slot is reused once the old object is gone
        assert_eq!(a, b);
        assert_eq!(heap.get(b), Some(&HeapObject::Bytes(b"b".to_vec())));
    }
}
