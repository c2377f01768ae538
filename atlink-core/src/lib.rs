//! Serial transport bridge between an AT-command modem and its parser
//!
//! Bytes from the modem land in a fixed ring via circular DMA. Idle-line
//! and DMA interrupts push a wake-up token into a small lossy queue; a
//! single receive worker wakes, asks the DMA engine how far it has got,
//! and hands the new span(s) to the parser. Transmit is a plain blocking
//! write with a timeout.
//!
//! ```text
//!  DMA ──writes──► DmaRing ◄──reads── ReceiveWorker ──ingest──► parser
//!   │                                     ▲
//!   └─IRQ─► Port::on_interrupt ──token──► Notifier
//!
//!  parser ──send/reset──► PortController ──► Transport ──► UART TX / GPIO
//! ```
//!
//! - [`ring`] - ring storage and cursor/wraparound math
//! - [`notify`] - interrupt-to-worker notification channel
//! - [`worker`] - the receive worker
//! - [`port`] - shared port state and the lifecycle controller
//! - [`transport`] - send/reset hooks
//! - [`config`] - configuration and sizing constants

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod error;
pub mod notify;
pub mod parser;
pub mod port;
pub mod ring;
pub mod transport;
pub mod worker;

#[cfg(test)]
mod sim;

pub use config::PortConfig;
pub use error::{ConfigError, PoolError, PortError, SpawnError, TransportError};
pub use notify::{Notification, Notifier, WorkerState};
pub use parser::{Ingest, LinkCaps, ParserHost, PoolRejected};
pub use port::{DefaultPort, Port, PortController, PortState, RxStats, WorkerSpawner};
pub use ring::{Cursor, DmaRing, Spans};
pub use transport::Transport;
pub use worker::ReceiveWorker;
