//! Port state and lifecycle
//!
//! [`Port`] is the state shared between the interrupt handler, the receive
//! worker and the controller: the ring, the notification channel, the DMA
//! driver with the read cursor, and the running flag. It lives in `'static`
//! storage (a `static` or a `StaticCell`) and is handed out by reference.
//!
//! [`PortController`] owns the lifecycle. It runs in the caller's context
//! and is not re-entrant.
//!
//! ```text
//!   init ──► Configuring ──► Running ──► deinit ──► Uninitialized
//!                               │  ▲
//!                               └──┘ configure(baudrate)
//! ```

use core::cell::RefCell;
use core::sync::atomic::Ordering;

use atlink_hal::{CircularRx, OutputPin, RxEvent, SerialError, SerialTx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;
use portable_atomic::{AtomicBool, AtomicU32};

use crate::config::{PortConfig, NOTIFY_QUEUE_DEPTH, RECONFIGURE_PAUSE_MS, RX_BUFFER_SIZE};
use crate::error::{ConfigError, PortError, SpawnError, TransportError};
use crate::notify::{Claim, Notifier};
use crate::parser::{LinkCaps, ParserHost};
use crate::ring::{Cursor, DmaRing, Spans};
use crate::transport::Transport;

/// Port with the reference buffer and queue sizes
pub type DefaultPort<D> = Port<D, RX_BUFFER_SIZE, NOTIFY_QUEUE_DEPTH>;

/// Port lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortState {
    /// Never initialized, or torn down by `deinit`
    Uninitialized,
    /// Peripheral being brought up; receive not armed
    Configuring,
    /// DMA and interrupts armed, worker serving
    Running,
}

/// Receive counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxStats {
    /// Interrupts reported through [`Port::on_interrupt`]
    pub interrupts: u32,
    /// Of those, line-error interrupts
    pub line_errors: u32,
    /// Notifications dropped on a full queue
    pub dropped: u32,
    /// Bytes handed to the parser
    pub ingested: u32,
    /// Bytes skipped because the port was stopped
    pub discarded: u32,
}

struct RxState<D> {
    driver: D,
    cursor: Cursor,
}

/// State shared by interrupt handler, receive worker and controller
pub struct Port<D, const N: usize, const Q: usize> {
    ring: DmaRing<N>,
    notifier: Notifier<Q>,
    rx: Mutex<CriticalSectionRawMutex, RefCell<RxState<D>>>,
    running: AtomicBool,
    interrupts: AtomicU32,
    line_errors: AtomicU32,
    ingested: AtomicU32,
    discarded: AtomicU32,
}

impl<D, const N: usize, const Q: usize> Port<D, N, Q> {
    /// Create a stopped port around a receive driver
    pub const fn new(driver: D) -> Self {
        Self {
            ring: DmaRing::new(),
            notifier: Notifier::new(),
            rx: Mutex::new(RefCell::new(RxState {
                driver,
                cursor: Cursor::new(N),
            })),
            running: AtomicBool::new(false),
            interrupts: AtomicU32::new(0),
            line_errors: AtomicU32::new(0),
            ingested: AtomicU32::new(0),
            discarded: AtomicU32::new(0),
        }
    }

    /// Interrupt entry point for idle-line, DMA and error interrupts
    ///
    /// Call after clearing the peripheral flags. Never blocks, never
    /// allocates, never calls into the parser.
    pub fn on_interrupt(&self, event: RxEvent) {
        self.interrupts.fetch_add(1, Ordering::Relaxed);
        if event == RxEvent::Error {
            self.line_errors.fetch_add(1, Ordering::Relaxed);
        }
        self.notifier.notify();
    }

    /// Run `f` with exclusive access to the receive driver
    ///
    /// Runs inside a critical section; keep it short.
    pub fn with_driver<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        self.rx.lock(|rx| f(&mut rx.borrow_mut().driver))
    }

    /// Whether received bytes are currently forwarded
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Software read position inside the ring
    pub fn cursor_position(&self) -> usize {
        self.rx.lock(|rx| rx.borrow().cursor.position())
    }

    /// The notification channel
    pub fn notifier(&self) -> &Notifier<Q> {
        &self.notifier
    }

    /// The receive ring
    pub fn ring(&self) -> &DmaRing<N> {
        &self.ring
    }

    /// Snapshot of the receive counters
    pub fn stats(&self) -> RxStats {
        RxStats {
            interrupts: self.interrupts.load(Ordering::Relaxed),
            line_errors: self.line_errors.load(Ordering::Relaxed),
            dropped: self.notifier.dropped(),
            ingested: self.ingested.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }

    fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub(crate) fn record_ingested(&self, bytes: usize) {
        self.ingested.fetch_add(bytes as u32, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self, bytes: usize) {
        self.discarded.fetch_add(bytes as u32, Ordering::Relaxed);
    }
}

impl<D: CircularRx, const N: usize, const Q: usize> Port<D, N, Q> {
    /// Advance the cursor to the DMA position
    ///
    /// The position query, cursor update and running check happen in one
    /// critical section, so a concurrent restart cannot interleave.
    pub(crate) fn take_spans(&self) -> (Spans, bool) {
        self.rx.lock(|rx| {
            let mut rx = rx.borrow_mut();
            let rx = &mut *rx;
            let position = rx.driver.bytes_consumed();
            let spans = rx.cursor.advance(position);
            (spans, self.is_running())
        })
    }

    /// Stop the engine, optionally change baud rate, rewind and restart
    fn restart_receive(&self, baudrate: Option<u32>) -> Result<(), SerialError> {
        let descriptor = self.ring.descriptor();
        self.rx.lock(|rx| {
            let mut rx = rx.borrow_mut();
            rx.driver.stop();
            if let Some(baudrate) = baudrate {
                rx.driver.set_baudrate(baudrate)?;
            }
            rx.cursor.reset();
            rx.driver.begin_continuous_receive(descriptor)
        })
    }

    fn stop_receive(&self) {
        self.with_driver(|driver| driver.stop());
    }
}

/// Starts the task that runs [`crate::ReceiveWorker::run`]
///
/// On target this wraps an embassy `Spawner` and a task bound to the
/// board's `static` port; the port calls it at most once per lifecycle.
pub trait WorkerSpawner {
    /// Spawn the receive worker task
    fn spawn_worker(&mut self) -> Result<(), SpawnError>;
}

/// Owns the serial port lifecycle and the transport facade
pub struct PortController<'a, D, T, P, S, W, const N: usize, const Q: usize> {
    port: &'a Port<D, N, Q>,
    transport: Transport<T, P>,
    spawner: S,
    delay: W,
    memory: Option<&'static mut [u8]>,
    state: PortState,
    initialized: bool,
    attached: bool,
    hw_ready: bool,
    baudrate: u32,
}

impl<'a, D, T, P, S, W, const N: usize, const Q: usize> PortController<'a, D, T, P, S, W, N, Q>
where
    D: CircularRx,
    T: SerialTx,
    P: OutputPin,
    S: WorkerSpawner,
    W: DelayNs,
{
    /// Create a controller for `port`
    pub fn new(port: &'a Port<D, N, Q>, transport: Transport<T, P>, spawner: S, delay: W) -> Self {
        Self {
            port,
            transport,
            spawner,
            delay,
            memory: None,
            state: PortState::Uninitialized,
            initialized: false,
            attached: false,
            hw_ready: false,
            baudrate: 0,
        }
    }

    /// Hand this region to the parser's allocator on first `init`
    ///
    /// The reference pool is [`crate::config::MEM_POOL_SIZE`] bytes. Leave
    /// unset when the parser brings its own allocator. A refused region is
    /// kept and offered again by the next `init`.
    pub fn with_memory_pool(mut self, region: &'static mut [u8]) -> Self {
        self.memory = Some(region);
        self
    }

    /// Initialize the port
    ///
    /// The first call assigns the memory pool and registers the transport
    /// hooks with the parser; every call (re)configures the peripheral.
    pub fn init<H: ParserHost>(&mut self, config: &PortConfig, host: &mut H) -> Result<(), PortError> {
        config.validate()?;

        if let Some(region) = self.memory.take() {
            let len = region.len();
            if let Err(rejected) = host.assign_memory(region) {
                error!("parser refused memory pool: {:?}", rejected.error);
                self.memory = Some(rejected.region);
                return Err(rejected.error.into());
            }
            debug!("parser memory pool: {} bytes", len);
        }

        if !self.attached {
            host.attach(LinkCaps {
                reset: self.transport.has_reset(),
            });
            self.attached = true;
        }

        self.transport.set_timeout(config.tx_timeout_ms);
        self.configure(config.baudrate)?;
        self.initialized = true;

        info!("port initialized at {} baud", config.baudrate);
        Ok(())
    }

    /// Bring the port up at `baudrate`, or switch a running port to it
    ///
    /// Switching is a clean restart: reception pauses, the peripheral is
    /// rebuilt, and the cursor rewinds to 0. Bytes not yet drained when
    /// the switch starts are discarded.
    pub fn configure(&mut self, baudrate: u32) -> Result<(), PortError> {
        if baudrate == 0 {
            return Err(ConfigError::InvalidBaudrate.into());
        }

        match self.state {
            PortState::Running => self.reconfigure(baudrate),
            PortState::Uninitialized | PortState::Configuring => self.start(baudrate),
        }
    }

    /// Tear down the worker and channel and stop reception
    ///
    /// Safe to call repeatedly and after a failed or partial `init`.
    pub fn deinit(&mut self) {
        self.port.set_running(false);

        if self.state != PortState::Uninitialized {
            self.port.stop_receive();
        }

        let stopping = self.port.notifier().request_stop();
        if stopping || self.port.notifier().is_open() {
            self.port.notifier().close();
        }
        if stopping {
            debug!("receive worker stop requested");
        }

        self.state = PortState::Uninitialized;
        self.initialized = false;
        self.attached = false;
    }

    /// Send hook: blocking transmit with the configured timeout
    pub fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if !self.initialized {
            return Err(TransportError::NotInitialized);
        }
        self.transport.send(data)
    }

    /// Reset hook: drive the device reset line
    ///
    /// Returns false before `init` or when no reset line is wired.
    pub fn reset(&mut self, assert: bool) -> bool {
        if !self.initialized {
            return false;
        }
        self.transport.reset(assert)
    }

    /// Transport facade, available once `init` has completed
    pub fn transport(&mut self) -> Result<&mut Transport<T, P>, PortError> {
        if !self.initialized {
            return Err(PortError::NotInitialized);
        }
        Ok(&mut self.transport)
    }

    /// Current lifecycle state
    pub fn state(&self) -> PortState {
        self.state
    }

    /// Whether `init` has completed since the last `deinit`
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Baud rate of the last successful configuration
    pub fn baudrate(&self) -> u32 {
        self.baudrate
    }

    /// The shared port state
    pub fn port(&self) -> &'a Port<D, N, Q> {
        self.port
    }

    fn start(&mut self, baudrate: u32) -> Result<(), PortError> {
        self.state = PortState::Configuring;
        self.port.set_running(false);

        if let Err(e) = self.arm(baudrate) {
            error!("port bring-up failed: {:?}", e);
            self.port.stop_receive();
            self.state = PortState::Uninitialized;
            return Err(e);
        }

        self.ensure_worker()?;

        self.port.set_running(true);
        self.state = PortState::Running;
        self.baudrate = baudrate;
        Ok(())
    }

    fn arm(&mut self, baudrate: u32) -> Result<(), PortError> {
        if !self.hw_ready {
            self.port
                .with_driver(|driver| driver.bring_up(baudrate))
                .map_err(PortError::BringUp)?;
            self.hw_ready = true;
            self.port.restart_receive(None).map_err(PortError::BringUp)
        } else {
            self.port
                .restart_receive(Some(baudrate))
                .and_then(|()| self.transport.set_baudrate(baudrate))
                .map_err(PortError::BringUp)
        }
    }

    fn reconfigure(&mut self, baudrate: u32) -> Result<(), PortError> {
        debug!("switching {} -> {} baud", self.baudrate, baudrate);

        self.port.set_running(false);
        self.delay.delay_ms(RECONFIGURE_PAUSE_MS);

        let result = self
            .port
            .restart_receive(Some(baudrate))
            .and_then(|()| self.transport.set_baudrate(baudrate));
        if let Err(e) = result {
            error!("baud rate switch failed: {:?}", e);
            self.port.stop_receive();
            self.state = PortState::Configuring;
            return Err(PortError::Reconfigure(e));
        }

        self.port.set_running(true);
        self.baudrate = baudrate;
        Ok(())
    }

    fn ensure_worker(&mut self) -> Result<(), PortError> {
        let notifier = self.port.notifier();
        match notifier.claim_worker() {
            Claim::Spawn => {
                notifier.open();
                if let Err(e) = self.spawner.spawn_worker() {
                    error!("failed to spawn receive worker");
                    notifier.abandon_worker();
                    notifier.close();
                    self.port.stop_receive();
                    self.state = PortState::Uninitialized;
                    return Err(e.into());
                }
                debug!("receive worker spawned");
            }
            Claim::Reclaimed => {
                notifier.open();
                debug!("receive worker reclaimed");
            }
            Claim::Existing => {
                if !notifier.is_open() {
                    notifier.open();
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
impl<D: CircularRx, const N: usize, const Q: usize> Port<D, N, Q> {
    /// Armed port without a controller, for worker tests
    pub(crate) fn arm_for_test(&self) {
        self.restart_receive(None).unwrap();
        self.notifier.open();
        self.set_running(true);
    }

    pub(crate) fn disarm_for_test(&self) {
        self.set_running(false);
    }
}
