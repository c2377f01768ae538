//! atlink Hardware Abstraction Layer
//!
//! Traits the receive pipeline in `atlink-core` needs from the chip. A board
//! crate implements them on top of its vendor HAL; everything above this
//! line is portable.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  AT-command parser (upper layer)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  atlink-core (ring, worker, port)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  atlink-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  board crate (USART + DMA + GPIO)       │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`dma::CircularRx`] - Continuous DMA receive into a ring
//! - [`uart::SerialTx`] - Blocking transmit with timeout
//! - [`gpio::OutputPin`] - Device reset line

#![no_std]
#![deny(unsafe_code)]

pub mod dma;
pub mod gpio;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use dma::{CircularRx, RxBuffer, RxEvent};
pub use gpio::{NoPin, OutputPin};
pub use uart::{SerialError, SerialTx};
