//! Receive ring and cursor math
//!
//! The ring is written by the DMA engine and read by the receive worker.
//! Neither side keeps read/write pointers in the ring itself: the engine
//! reports how far it has got, and [`Cursor`] remembers how far software
//! has read. The difference is handed out as at most two contiguous
//! [`Spans`], oldest first.
//!
//! # Sizing precondition
//!
//! The engine must not wrap past the cursor between two drains. Nothing
//! here can detect that; overwritten bytes are silently lost. Size the
//! ring with [`crate::config::min_ring_capacity`].

#![allow(unsafe_code)]

use core::cell::UnsafeCell;
use core::ops::Range;
use core::sync::atomic::{compiler_fence, Ordering};

use atlink_hal::RxBuffer;

/// Byte ranges written since the last drain, in arrival order
///
/// Holds zero, one or two ranges. Two ranges means the engine wrapped:
/// the tail of the ring comes first, then the head.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spans {
    first: Option<Range<usize>>,
    second: Option<Range<usize>>,
}

impl Spans {
    fn one(range: Range<usize>) -> Self {
        Self {
            first: Some(range),
            second: None,
        }
    }

    fn two(tail: Range<usize>, head: Range<usize>) -> Self {
        Self {
            first: Some(tail),
            second: Some(head),
        }
    }

    /// Total number of bytes covered
    pub fn total_len(&self) -> usize {
        self.first.as_ref().map_or(0, |r| r.len()) + self.second.as_ref().map_or(0, |r| r.len())
    }

    /// True when nothing arrived (a spurious wake)
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }
}

impl Iterator for Spans {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        self.first.take().or_else(|| self.second.take())
    }
}

/// Ranges written between positions `old` and `new` of a ring of `capacity`
///
/// `old` must lie in `[0, capacity)` and `new` in `[0, capacity]`. Anything
/// else is a driver or configuration defect and panics.
pub fn spans_between(old: usize, new: usize, capacity: usize) -> Spans {
    assert!(old < capacity, "cursor {} outside ring of {}", old, capacity);
    assert!(new <= capacity, "DMA position {} outside ring of {}", new, capacity);

    if new > old {
        Spans::one(old..new)
    } else if new < old {
        if new > 0 {
            Spans::two(old..capacity, 0..new)
        } else {
            Spans::one(old..capacity)
        }
    } else {
        Spans::default()
    }
}

/// Software read position inside the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    position: usize,
    capacity: usize,
}

impl Cursor {
    /// Cursor at the start of a ring of `capacity` bytes
    pub const fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");
        Self {
            position: 0,
            capacity,
        }
    }

    /// Last position handed out, always in `[0, capacity)`
    pub fn position(&self) -> usize {
        self.position
    }

    /// Ring capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forget everything read so far (receive restarted)
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Move to the engine position `new` and return what lies between
    pub fn advance(&mut self, new: usize) -> Spans {
        let spans = spans_between(self.position, new, self.capacity);
        self.position = if new == self.capacity { 0 } else { new };
        spans
    }
}

/// Fixed ring the DMA engine writes into
///
/// Lives in a `static` (or other `'static` storage) so the engine can keep
/// writing while software reads behind it.
pub struct DmaRing<const N: usize> {
    storage: UnsafeCell<[u8; N]>,
}

// SAFETY: the only shared access is `span`, which reads bytes the engine
// has already written and will not touch again before the cursor moves
// past them (sizing precondition above). Writes come from hardware.
unsafe impl<const N: usize> Sync for DmaRing<N> {}

impl<const N: usize> Default for DmaRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DmaRing<N> {
    /// Create a zeroed ring
    pub const fn new() -> Self {
        assert!(N > 0, "The value of `N` must be non-zero");
        Self {
            storage: UnsafeCell::new([0; N]),
        }
    }

    /// Ring capacity in bytes
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Descriptor to program into the transfer engine
    pub fn descriptor(&self) -> RxBuffer {
        RxBuffer::new(self.storage.get() as usize, N)
    }

    /// Bytes in `range`, which must come from [`Spans`] of this ring
    pub fn span(&self, range: Range<usize>) -> &[u8] {
        assert!(
            range.start <= range.end && range.end <= N,
            "span {}..{} outside ring of {}",
            range.start,
            range.end,
            N
        );

        // Keep the reads below after the DMA position query
        compiler_fence(Ordering::Acquire);

        // SAFETY: bounds checked above. The engine writes ahead of the
        // cursor, never inside a span that has not been consumed yet.
        unsafe {
            let base = self.storage.get() as *const u8;
            core::slice::from_raw_parts(base.add(range.start), range.len())
        }
    }
}
