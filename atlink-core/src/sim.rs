//! Simulated platform for host tests

#![allow(unsafe_code)]

use atlink_hal::{CircularRx, OutputPin, RxBuffer, SerialError, SerialTx};
use embedded_hal::delay::DelayNs;

use crate::error::{PoolError, SpawnError};
use crate::parser::{Ingest, LinkCaps, ParserHost, PoolRejected};

/// DMA engine that writes whatever the test feeds it
#[derive(Debug, Default)]
pub struct SimDma {
    buffer: Option<RxBuffer>,
    position: usize,
    receiving: bool,
    pub baudrate: u32,
    pub bring_ups: u32,
    pub starts: u32,
    pub stops: u32,
    pub fail_bring_up: bool,
    pub fail_baudrate: bool,
}

impl SimDma {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes arriving on the wire. Lost if reception is stopped.
    pub fn feed(&mut self, data: &[u8]) {
        let Some(buffer) = self.buffer.filter(|_| self.receiving) else {
            return;
        };
        for &byte in data {
            // SAFETY: position < buffer.len, and the buffer is a live DmaRing
            unsafe { (buffer.addr as *mut u8).add(self.position).write_volatile(byte) };
            self.position = (self.position + 1) % buffer.len;
        }
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving
    }
}

impl CircularRx for SimDma {
    fn bring_up(&mut self, baudrate: u32) -> Result<(), SerialError> {
        if self.fail_bring_up {
            return Err(SerialError::Other);
        }
        self.bring_ups += 1;
        self.baudrate = baudrate;
        Ok(())
    }

    fn set_baudrate(&mut self, baudrate: u32) -> Result<(), SerialError> {
        if self.fail_baudrate {
            return Err(SerialError::InvalidBaudrate);
        }
        self.baudrate = baudrate;
        Ok(())
    }

    fn begin_continuous_receive(&mut self, buffer: RxBuffer) -> Result<(), SerialError> {
        self.buffer = Some(buffer);
        self.position = 0;
        self.receiving = true;
        self.starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        if self.receiving {
            self.receiving = false;
            self.stops += 1;
        }
    }

    fn bytes_consumed(&self) -> usize {
        self.position
    }
}

/// Transmitter recording everything it sends
#[derive(Debug, Default)]
pub struct SimTx {
    pub sent: Vec<u8>,
    pub calls: usize,
    pub baudrate: u32,
    pub last_timeout_ms: u32,
    /// Total bytes the line accepts before timing out
    pub budget: Option<usize>,
    /// Bytes accepted per call
    pub per_call_limit: Option<usize>,
    pub fault: Option<SerialError>,
}

impl SimTx {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SerialTx for SimTx {
    fn write_timeout(&mut self, data: &[u8], timeout_ms: u32) -> Result<usize, SerialError> {
        self.calls += 1;
        self.last_timeout_ms = timeout_ms;
        if let Some(fault) = self.fault {
            return Err(fault);
        }

        let mut n = data.len();
        if let Some(limit) = self.per_call_limit {
            n = n.min(limit);
        }
        if let Some(budget) = self.budget.as_mut() {
            n = n.min(*budget);
            *budget -= n;
        }
        self.sent.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn set_baudrate(&mut self, baudrate: u32) -> Result<(), SerialError> {
        self.baudrate = baudrate;
        Ok(())
    }
}

/// Reset line
#[derive(Debug, Default)]
pub struct SimPin {
    high: bool,
}

impl SimPin {
    pub fn new() -> Self {
        Self { high: true }
    }
}

impl OutputPin for SimPin {
    fn set_high(&mut self) {
        self.high = true;
    }

    fn set_low(&mut self) {
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

/// Counts worker spawns instead of starting tasks
#[derive(Debug, Default)]
pub struct SimSpawner {
    pub spawned: u32,
    pub fail: bool,
}

impl crate::port::WorkerSpawner for SimSpawner {
    fn spawn_worker(&mut self) -> Result<(), SpawnError> {
        if self.fail {
            return Err(SpawnError);
        }
        self.spawned += 1;
        Ok(())
    }
}

/// Delay that returns immediately and remembers how long it was asked for
#[derive(Debug, Default)]
pub struct NoDelay {
    pub total_ns: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}

/// Parser stand-in that collects ingested bytes
#[derive(Debug, Default)]
pub struct Collect {
    pub bytes: Vec<u8>,
    pub calls: usize,
}

impl Ingest for Collect {
    fn ingest(&mut self, data: &[u8]) {
        self.calls += 1;
        self.bytes.extend_from_slice(data);
    }
}

/// Parser stand-in for the init-time hooks
#[derive(Debug, Default)]
pub struct SimHost {
    pub memory_len: Option<usize>,
    pub caps: Option<LinkCaps>,
    pub attaches: u32,
    pub reject_memory: bool,
}

impl ParserHost for SimHost {
    fn assign_memory(&mut self, region: &'static mut [u8]) -> Result<(), PoolRejected> {
        let error = if self.reject_memory {
            PoolError::TooSmall
        } else if self.memory_len.is_some() {
            PoolError::AlreadyAssigned
        } else {
            self.memory_len = Some(region.len());
            return Ok(());
        };
        Err(PoolRejected { error, region })
    }

    fn attach(&mut self, caps: LinkCaps) {
        self.attaches += 1;
        self.caps = Some(caps);
    }
}
