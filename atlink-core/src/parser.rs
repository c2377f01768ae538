//! Seams toward the AT-command parser
//!
//! The parser itself lives elsewhere. The port needs three things from it:
//! somewhere to deliver received bytes, a home for its memory pool, and a
//! way to tell it which low-level hooks are available.

use crate::error::PoolError;

/// Receiver of raw byte spans, called from the receive worker
///
/// Spans arrive in wire order. A single logical message may be split
/// across calls (for example at ring wraparound).
pub trait Ingest {
    /// Hand over one contiguous span
    fn ingest(&mut self, data: &[u8]);
}

impl<T: Ingest + ?Sized> Ingest for &mut T {
    fn ingest(&mut self, data: &[u8]) {
        (**self).ingest(data)
    }
}

/// Low-level hooks the port offers the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkCaps {
    /// A hardware reset line is wired up
    pub reset: bool,
}

/// Memory region handed back by a parser that refused it
#[derive(Debug)]
pub struct PoolRejected {
    /// Why the region was refused
    pub error: PoolError,
    /// The untouched region, kept for the next attempt
    pub region: &'static mut [u8],
}

/// Upper-layer setup performed once, during the first `init`
pub trait ParserHost {
    /// Give the parser's allocator its memory region
    ///
    /// On refusal the region comes back so a later `init` can retry.
    fn assign_memory(&mut self, region: &'static mut [u8]) -> Result<(), PoolRejected>;

    /// Register the send hook, and the reset hook when `caps.reset` is set
    fn attach(&mut self, caps: LinkCaps);
}
