//! Error types for the receive pipeline and transport

use atlink_hal::SerialError;

/// Invalid configuration values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Baud rate of zero
    InvalidBaudrate,
    /// Transmit timeout of zero
    InvalidTimeout,
}

/// Parser memory pool rejected the region it was given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PoolError {
    /// Region too small for the allocator's bookkeeping
    TooSmall,
    /// Allocator already has memory assigned
    AlreadyAssigned,
}

/// The receive worker task could not be started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpawnError;

/// Port lifecycle errors
///
/// Everything here is a configuration failure: fatal for the port and
/// surfaced from `init`/`configure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortError {
    /// Invalid configuration values
    Config(ConfigError),
    /// Parser memory pool initialization failed
    MemoryPool(PoolError),
    /// First-time peripheral bring-up or receive start failed
    BringUp(SerialError),
    /// Baud-rate change of a running port failed
    Reconfigure(SerialError),
    /// Receive worker could not be started
    Spawn,
    /// Operation requires a completed `init`
    NotInitialized,
}

impl From<ConfigError> for PortError {
    fn from(e: ConfigError) -> Self {
        PortError::Config(e)
    }
}

impl From<PoolError> for PortError {
    fn from(e: PoolError) -> Self {
        PortError::MemoryPool(e)
    }
}

impl From<SpawnError> for PortError {
    fn from(_: SpawnError) -> Self {
        PortError::Spawn
    }
}

/// Transmit-side errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// `send` called before `init` completed
    NotInitialized,
    /// Nothing was transmitted before the timeout expired
    Timeout,
    /// Line fault reported by the UART
    Serial(SerialError),
}

impl From<SerialError> for TransportError {
    fn from(e: SerialError) -> Self {
        match e {
            SerialError::Timeout => TransportError::Timeout,
            other => TransportError::Serial(other),
        }
    }
}

impl embedded_io::Error for TransportError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            TransportError::NotInitialized => embedded_io::ErrorKind::NotConnected,
            TransportError::Timeout => embedded_io::ErrorKind::TimedOut,
            TransportError::Serial(_) => embedded_io::ErrorKind::Other,
        }
    }
}
