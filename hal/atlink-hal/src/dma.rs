//! Circular DMA receive abstractions
//!
//! The transfer engine writes continuously into a fixed ring supplied by
//! the caller. Software never learns about individual bytes; it only asks
//! how far the engine has got ([`CircularRx::bytes_consumed`]).

use crate::uart::SerialError;

/// Memory region handed to the transfer engine
///
/// A plain address/length pair, the form DMA address registers take. The
/// region is owned by the caller for as long as the transfer runs; the
/// driver must only program it into the hardware, never hand out
/// references to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxBuffer {
    /// Start address of the ring
    pub addr: usize,
    /// Ring capacity in bytes
    pub len: usize,
}

impl RxBuffer {
    /// Create a descriptor for `len` bytes starting at `addr`
    pub const fn new(addr: usize, len: usize) -> Self {
        Self { addr, len }
    }
}

/// Interrupt condition that woke the receive path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxEvent {
    /// Receive line went idle after activity
    Idle,
    /// Transfer engine reached the middle of the ring
    HalfTransfer,
    /// Transfer engine reached the end of the ring and wrapped
    TransferComplete,
    /// Line error (framing, noise, overrun, parity) was flagged and cleared
    Error,
}

/// Circular receive engine (USART RX + DMA stream in circular mode)
pub trait CircularRx {
    /// One-time hardware bring-up
    ///
    /// Pins, clocks, DMA stream and interrupt lines. Called once per port
    /// lifetime, before the first [`begin_continuous_receive`].
    ///
    /// [`begin_continuous_receive`]: CircularRx::begin_continuous_receive
    fn bring_up(&mut self, baudrate: u32) -> Result<(), SerialError>;

    /// Tear down and rebuild the serial peripheral at a new baud rate
    fn set_baudrate(&mut self, baudrate: u32) -> Result<(), SerialError>;

    /// Start continuous reception into `buffer`, wrapping at its end
    ///
    /// The write position restarts at 0.
    fn begin_continuous_receive(&mut self, buffer: RxBuffer) -> Result<(), SerialError>;

    /// Stop the transfer engine
    ///
    /// Must be harmless when no transfer is running.
    fn stop(&mut self);

    /// Current write position inside the ring
    ///
    /// This is `capacity - remaining` in DMA counter terms, so it lies in
    /// `[0, capacity]`; `capacity` is reported for the instant between
    /// the last byte landing and the counter reloading.
    fn bytes_consumed(&self) -> usize;
}
