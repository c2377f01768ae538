//! Transport facade
//!
//! The two synchronous hooks the parser calls downward: send bytes and
//! toggle the device reset line.

use atlink_hal::{NoPin, OutputPin, SerialError, SerialTx};

use crate::config::TX_TIMEOUT_MS;
use crate::error::TransportError;

/// Blocking transmit plus optional reset line
pub struct Transport<T, P> {
    tx: T,
    reset: Option<P>,
    timeout_ms: u32,
}

impl<T: SerialTx> Transport<T, NoPin> {
    /// Transport for boards without a reset line
    pub fn without_reset(tx: T) -> Self {
        Self::new(tx, None)
    }
}

impl<T, P> Transport<T, P>
where
    T: SerialTx,
    P: OutputPin,
{
    /// Create a transport with the default transmit timeout
    pub fn new(tx: T, reset: Option<P>) -> Self {
        Self {
            tx,
            reset,
            timeout_ms: TX_TIMEOUT_MS,
        }
    }

    /// Transmit `data`, blocking for at most the configured timeout
    ///
    /// Returns the number of bytes actually sent. A timeout part way
    /// through yields a short count; the caller retries the remainder.
    /// A timeout before the first byte is [`TransportError::Timeout`].
    pub fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if data.is_empty() {
            return Ok(0);
        }

        let sent = self.tx.write_timeout(data, self.timeout_ms)?;
        if sent == 0 {
            warn!("TX timeout after {} ms, nothing sent", self.timeout_ms);
            return Err(TransportError::Timeout);
        }
        if sent < data.len() {
            warn!("TX timeout: {} of {} bytes sent", sent, data.len());
        }
        Ok(sent)
    }

    /// Drive the reset line; `assert` pulls the active-low line down
    ///
    /// Returns false when no reset line is wired.
    pub fn reset(&mut self, assert: bool) -> bool {
        match self.reset.as_mut() {
            Some(pin) => {
                pin.set_state(!assert);
                true
            }
            None => false,
        }
    }

    /// Whether a reset line is available
    pub fn has_reset(&self) -> bool {
        self.reset.is_some()
    }

    /// Current transmit timeout
    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Access the underlying transmitter
    pub fn tx(&self) -> &T {
        &self.tx
    }

    pub(crate) fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }

    pub(crate) fn set_baudrate(&mut self, baudrate: u32) -> Result<(), SerialError> {
        self.tx.set_baudrate(baudrate)
    }
}

impl<T, P> embedded_io::ErrorType for Transport<T, P> {
    type Error = TransportError;
}

impl<T, P> embedded_io::Write for Transport<T, P>
where
    T: SerialTx,
    P: OutputPin,
{
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.send(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        // write_timeout returns once the bytes are in the shift register
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimPin, SimTx};
    use embedded_io::Write;

    #[test]
    fn test_send_reports_full_count() {
        let mut transport = Transport::without_reset(SimTx::new());
        assert_eq!(transport.send(b"AT\r\n"), Ok(4));
        assert_eq!(transport.tx().sent, b"AT\r\n");
    }

    #[test]
    fn test_send_reports_partial_count() {
        let mut tx = SimTx::new();
        tx.budget = Some(3);
        let mut transport = Transport::without_reset(tx);

        assert_eq!(transport.send(b"AT+GMR\r\n"), Ok(3));
        assert_eq!(transport.tx().sent, b"AT+");
    }

    #[test]
    fn test_send_nothing_sent_is_timeout() {
        let mut tx = SimTx::new();
        tx.budget = Some(0);
        let mut transport = Transport::without_reset(tx);
        assert_eq!(transport.send(b"AT\r\n"), Err(TransportError::Timeout));
    }

    #[test]
    fn test_send_empty_skips_hardware() {
        let mut transport = Transport::without_reset(SimTx::new());
        assert_eq!(transport.send(&[]), Ok(0));
        assert_eq!(transport.tx().calls, 0);
    }

    #[test]
    fn test_line_fault_is_error() {
        let mut tx = SimTx::new();
        tx.fault = Some(SerialError::Framing);
        let mut transport = Transport::without_reset(tx);
        assert_eq!(
            transport.send(b"AT\r\n"),
            Err(TransportError::Serial(SerialError::Framing))
        );
    }

    #[test]
    fn test_timeout_is_passed_down() {
        let mut transport = Transport::without_reset(SimTx::new());
        transport.set_timeout(250);
        transport.send(b"A").unwrap();
        assert_eq!(transport.tx().last_timeout_ms, 250);
    }

    #[test]
    fn test_reset_is_active_low() {
        let mut transport = Transport::new(SimTx::new(), Some(SimPin::new()));
        assert!(transport.has_reset());

        assert!(transport.reset(true));
        assert!(!transport.reset.as_ref().unwrap().is_set_high());

        assert!(transport.reset(false));
        assert!(transport.reset.as_ref().unwrap().is_set_high());
    }

    #[test]
    fn test_reset_without_pin() {
        let mut transport = Transport::without_reset(SimTx::new());
        assert!(!transport.has_reset());
        assert!(!transport.reset(true));
    }

    #[test]
    fn test_write_all_retries_remainder() {
        let mut tx = SimTx::new();
        tx.per_call_limit = Some(2);
        let mut transport = Transport::without_reset(tx);

        transport.write_all(b"AT+CWMODE=1\r\n").unwrap();
        assert_eq!(transport.tx().sent, b"AT+CWMODE=1\r\n");
        assert_eq!(transport.tx().calls, 7);
    }
}
