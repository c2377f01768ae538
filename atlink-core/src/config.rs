//! Port configuration
//!
//! The runtime surface is just the baud rate and transmit timeout. Buffer
//! and pool sizes are compile-time constants.

use crate::error::ConfigError;

/// Receive ring capacity in bytes
pub const RX_BUFFER_SIZE: usize = 0x1000;

/// Size of the memory region handed to the parser's allocator on first init
pub const MEM_POOL_SIZE: usize = 0x1000;

/// Depth of the interrupt-to-worker notification queue
pub const NOTIFY_QUEUE_DEPTH: usize = 10;

/// Default blocking transmit timeout
pub const TX_TIMEOUT_MS: u32 = 1000;

/// Quiet time before tearing the peripheral down for a baud change
pub const RECONFIGURE_PAUSE_MS: u32 = 10;

/// Default baud rate of AT-command modems out of reset
pub const DEFAULT_BAUDRATE: u32 = 115_200;

/// Bits on the wire per byte (start + 8 data + stop)
const BITS_PER_FRAME: u64 = 10;

/// Port configuration passed to `init`/`configure`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Upper bound on a single blocking transmit
    pub tx_timeout_ms: u32,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            baudrate: DEFAULT_BAUDRATE,
            tx_timeout_ms: TX_TIMEOUT_MS,
        }
    }
}

impl PortConfig {
    /// Configuration at the given baud rate with the default timeout
    pub const fn with_baudrate(baudrate: u32) -> Self {
        Self {
            baudrate,
            tx_timeout_ms: TX_TIMEOUT_MS,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baudrate == 0 {
            return Err(ConfigError::InvalidBaudrate);
        }
        if self.tx_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }
}

/// Smallest ring that survives `max_latency_us` between two drains
///
/// The ring must not wrap more than once between consecutive cursor
/// checks, otherwise bytes are overwritten before they are read. Size it
/// for the worst-case gap between interrupts plus worker scheduling
/// latency at the highest baud rate in use.
pub const fn min_ring_capacity(baudrate: u32, max_latency_us: u32) -> usize {
    let bytes_per_sec = baudrate as u64 / BITS_PER_FRAME;
    let bytes = (bytes_per_sec * max_latency_us as u64 + 999_999) / 1_000_000;
    // One extra byte: a ring that fills exactly looks empty to the cursor
    bytes as usize + 1
}
