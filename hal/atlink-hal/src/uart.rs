//! UART transmit abstractions
//!
//! Receive goes through [`crate::dma::CircularRx`]; this module covers the
//! synchronous transmit half and the error type shared by both.

/// Error from UART operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialError {
    /// Framing error
    Framing,
    /// Noise error
    Noise,
    /// Overrun error
    Overrun,
    /// Parity error
    Parity,
    /// Operation did not finish before its deadline
    Timeout,
    /// Requested baud rate cannot be generated from the peripheral clock
    InvalidBaudrate,
    /// Other error
    Other,
}

/// UART transmitter
///
/// Blocking transmit bounded by a timeout, as used by the transport facade.
pub trait SerialTx {
    /// Write data to the UART, giving up after `timeout_ms`
    ///
    /// Returns the number of bytes that actually left the transmitter. On
    /// timeout this may be fewer than `data.len()`; that is reported as
    /// `Ok(n)` so the caller can retry the remainder. Hard line faults are
    /// reported as errors.
    fn write_timeout(&mut self, data: &[u8], timeout_ms: u32) -> Result<usize, SerialError>;

    /// Change the transmit baud rate of an already configured peripheral
    fn set_baudrate(&mut self, baudrate: u32) -> Result<(), SerialError>;
}
