//! # Foreign heap
//!
//! Linear memory shared with the cost kernel. Buffers are addressed by plain
//! integer handles ([`HeapPtr`]), `0` being the null address; the heap owns the
//! bytes and nothing is freed unless asked.
//!
//! [`ArenaHeap`] is the in-process implementation. Fresh blocks are filled with
//! `NaN` so that a buffer read before being written is visible as such.
use std::collections::BTreeMap;

use thiserror::Error;

/// Byte size of one element: every buffer exchanged with the kernel holds `f64`.
pub const ELEMENT_SIZE: usize = std::mem::size_of::<f64>();

/// Address of a block in a [`ForeignHeap`]. `0` is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HeapPtr(usize);

impl HeapPtr {
    pub const NULL: HeapPtr = HeapPtr(0);

    pub fn new(address: usize) -> Self {
        HeapPtr(address)
    }

    pub fn address(&self) -> usize {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for HeapPtr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    #[error("Out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },

    #[error("Zero-sized allocation")]
    ZeroSize,

    #[error("Null pointer")]
    NullPointer,

    #[error("Invalid pointer {0}")]
    InvalidPointer(HeapPtr),

    #[error("Double free of {0}")]
    DoubleFree(HeapPtr),

    #[error("Access of {len} elements at {ptr} exceeds the block size ({capacity})")]
    OutOfBounds {
        ptr: HeapPtr,
        len: usize,
        capacity: usize,
    },
}

/// Manually managed memory of the numeric boundary.
///
/// Every method takes the address returned by [`ForeignHeap::malloc`]; lengths
/// are counted in `f64` elements.
pub trait ForeignHeap {
    /// Allocate `bytes` bytes and return the address of the block.
    fn malloc(&mut self, bytes: usize) -> Result<HeapPtr, HeapError>;

    /// Release a block. Freeing it twice is an error.
    fn free(&mut self, ptr: HeapPtr) -> Result<(), HeapError>;

    /// `true` while `ptr` is the address of an allocated, not yet freed block.
    fn is_live(&self, ptr: HeapPtr) -> bool;

    /// Number of allocated blocks.
    fn live_blocks(&self) -> usize;

    /// View the first `len` elements of a block.
    fn slice(&self, ptr: HeapPtr, len: usize) -> Result<&[f64], HeapError>;

    /// Mutable view of the first `len` elements of a block.
    fn slice_mut(&mut self, ptr: HeapPtr, len: usize) -> Result<&mut [f64], HeapError>;

    /// Copy `values` at the start of a block.
    fn write(&mut self, ptr: HeapPtr, values: &[f64]) -> Result<(), HeapError> {
        self.slice_mut(ptr, values.len())?.copy_from_slice(values);
        Ok(())
    }

    /// Copy the first `len` elements of a block out of the heap.
    fn read(&self, ptr: HeapPtr, len: usize) -> Result<Vec<f64>, HeapError> {
        Ok(self.slice(ptr, len)?.to_vec())
    }
}

/// Bump-allocated in-process heap.
///
/// Addresses start at 8, are 8-byte aligned and never reused, so a stale handle
/// can always be told apart from a live one: any non-live address below the
/// bump pointer has been freed.
#[derive(Debug)]
pub struct ArenaHeap {
    blocks: BTreeMap<usize, Vec<f64>>,
    next_address: usize,
    capacity: Option<usize>,
    used: usize,
}

impl ArenaHeap {
    pub fn new() -> Self {
        ArenaHeap {
            blocks: BTreeMap::new(),
            next_address: ELEMENT_SIZE,
            capacity: None,
            used: 0,
        }
    }

    /// Heap refusing any allocation past `capacity` bytes in use.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        ArenaHeap {
            capacity: Some(capacity),
            ..ArenaHeap::new()
        }
    }

    /// Bytes currently allocated.
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    fn block(&self, ptr: HeapPtr) -> Result<&Vec<f64>, HeapError> {
        if ptr.is_null() {
            return Err(HeapError::NullPointer);
        }
        self.blocks
            .get(&ptr.address())
            .ok_or(HeapError::InvalidPointer(ptr))
    }
}

impl Default for ArenaHeap {
    fn default() -> Self {
        ArenaHeap::new()
    }
}

impl ForeignHeap for ArenaHeap {
    fn malloc(&mut self, bytes: usize) -> Result<HeapPtr, HeapError> {
        if bytes == 0 {
            return Err(HeapError::ZeroSize);
        }
        let out_of_memory = HeapError::OutOfMemory {
            requested: bytes,
            available: 0,
        };
        let elements = bytes.div_ceil(ELEMENT_SIZE);
        let size = elements
            .checked_mul(ELEMENT_SIZE)
            .ok_or(out_of_memory.clone())?;

        if let Some(capacity) = self.capacity {
            let available = capacity.saturating_sub(self.used);
            if size > available {
                return Err(HeapError::OutOfMemory {
                    requested: bytes,
                    available,
                });
            }
        }

        let address = self.next_address;
        let next_address = address.checked_add(size).ok_or(out_of_memory.clone())?;

        let mut block = Vec::new();
        block
            .try_reserve_exact(elements)
            .map_err(|_| out_of_memory)?;
        block.resize(elements, f64::NAN);

        self.next_address = next_address;
        self.blocks.insert(address, block);
        self.used += size;
        Ok(HeapPtr(address))
    }

    fn free(&mut self, ptr: HeapPtr) -> Result<(), HeapError> {
        if ptr.is_null() {
            return Err(HeapError::NullPointer);
        }
        match self.blocks.remove(&ptr.address()) {
            Some(block) => {
                self.used -= block.len() * ELEMENT_SIZE;
                Ok(())
            }
            None if ptr.address() < self.next_address => Err(HeapError::DoubleFree(ptr)),
            None => Err(HeapError::InvalidPointer(ptr)),
        }
    }

    fn is_live(&self, ptr: HeapPtr) -> bool {
        !ptr.is_null() && self.blocks.contains_key(&ptr.address())
    }

    fn live_blocks(&self) -> usize {
        self.blocks.len()
    }

    fn slice(&self, ptr: HeapPtr, len: usize) -> Result<&[f64], HeapError> {
        let block = self.block(ptr)?;
        block.get(..len).ok_or(HeapError::OutOfBounds {
            ptr,
            len,
            capacity: block.len(),
        })
    }

    fn slice_mut(&mut self, ptr: HeapPtr, len: usize) -> Result<&mut [f64], HeapError> {
        if ptr.is_null() {
            return Err(HeapError::NullPointer);
        }
        let block = self
            .blocks
            .get_mut(&ptr.address())
            .ok_or(HeapError::InvalidPointer(ptr))?;
        let capacity = block.len();
        block
            .get_mut(..len)
            .ok_or(HeapError::OutOfBounds { ptr, len, capacity })
    }
}

#[cfg(test)]
mod heap_test {
    use super::*;

    #[test]
    fn test_malloc_addresses() {
        let mut heap = ArenaHeap::new();
        let a = heap.malloc(24).unwrap();
        let b = heap.malloc(5).unwrap();
        assert!(!a.is_null());
        assert_eq!(a.address() % ELEMENT_SIZE, 0);
        assert_eq!(b.address() % ELEMENT_SIZE, 0);
        assert_eq!(b.address(), a.address() + 24);
        assert_eq!(heap.live_blocks(), 2);
        assert_eq!(heap.used_bytes(), 32);
    }

    #[test]
    fn test_fresh_block_is_uninitialized() {
        let mut heap = ArenaHeap::new();
        let ptr = heap.malloc(16).unwrap();
        assert!(heap.read(ptr, 2).unwrap().iter().all(|v| v.is_nan()));

        heap.write(ptr, &[1.0, 2.0]).unwrap();
        assert_eq!(heap.read(ptr, 2).unwrap(), vec![1.0, 2.0]);
        assert!(matches!(
            heap.read(ptr, 3),
            Err(HeapError::OutOfBounds { capacity: 2, .. })
        ));
    }

    #[test]
    fn test_free() {
        let mut heap = ArenaHeap::new();
        let ptr = heap.malloc(8).unwrap();
        heap.free(ptr).unwrap();
        assert!(!heap.is_live(ptr));
        assert_eq!(heap.live_blocks(), 0);
        assert_eq!(heap.free(ptr), Err(HeapError::DoubleFree(ptr)));
        assert_eq!(heap.free(HeapPtr::NULL), Err(HeapError::NullPointer));
        assert_eq!(
            heap.free(HeapPtr::new(4096)),
            Err(HeapError::InvalidPointer(HeapPtr::new(4096)))
        );
        assert!(heap.read(ptr, 1).is_err());
    }

    #[test]
    fn test_capacity_limit() {
        let mut heap = ArenaHeap::with_capacity_limit(32);
        let a = heap.malloc(24).unwrap();
        assert!(matches!(
            heap.malloc(16),
            Err(HeapError::OutOfMemory { available: 8, .. })
        ));
        heap.free(a).unwrap();
        assert!(heap.malloc(32).is_ok());
        assert_eq!(heap.malloc(0), Err(HeapError::ZeroSize));
    }

    #[test]
    fn test_unbounded_heap_refuses_huge_block() {
        let mut heap = ArenaHeap::new();
        let live = heap.malloc(8).unwrap();
        assert!(matches!(
            heap.malloc(1 << 63),
            Err(HeapError::OutOfMemory { requested, .. }) if requested == 1 << 63
        ));
        assert_eq!(heap.live_blocks(), 1);
        assert_eq!(heap.used_bytes(), 8);

        let next = heap.malloc(8).unwrap();
        assert_eq!(next.address(), live.address() + 8);
    }

    #[test]
    fn test_double_free_across_reuse() {
        let mut heap = ArenaHeap::new();
        let stale: Vec<HeapPtr> = (0..100).map(|_| heap.malloc(16).unwrap()).collect();
        for &ptr in &stale {
            heap.free(ptr).unwrap();
        }
        let live = heap.malloc(16).unwrap();
        assert!(stale.iter().all(|&ptr| heap.free(ptr) == Err(HeapError::DoubleFree(ptr))));
        assert!(heap.is_live(live));
        assert_eq!(heap.used_bytes(), 16);
    }
}
