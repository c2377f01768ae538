//! Receive worker
//!
//! The single consumer of the notification channel. Each wake re-reads the
//! DMA position, so however many notifications were coalesced or dropped,
//! one drain picks up everything written since the last one.

use atlink_hal::CircularRx;

use crate::parser::Ingest;
use crate::port::Port;

/// Drains the ring into the parser
pub struct ReceiveWorker<'a, D, I, const N: usize, const Q: usize> {
    port: &'a Port<D, N, Q>,
    sink: I,
}

impl<'a, D, I, const N: usize, const Q: usize> ReceiveWorker<'a, D, I, N, Q>
where
    D: CircularRx,
    I: Ingest,
{
    /// Create a worker for `port` delivering into `sink`
    pub fn new(port: &'a Port<D, N, Q>, sink: I) -> Self {
        Self { port, sink }
    }

    /// Serve notifications until the port is torn down
    ///
    /// Suspends only on the notification channel. Returns after `deinit`
    /// once the shutdown token (or any later token) is observed.
    pub async fn run(&mut self) {
        debug!("receive worker started");

        loop {
            let _token = self.port.notifier().receive().await;

            if self.port.notifier().retire_if_stopping() {
                break;
            }

            self.drain();
        }

        debug!("receive worker stopped");
    }

    /// Forward everything written since the last drain
    ///
    /// Returns the number of bytes handed to the sink. While the port is
    /// stopped the cursor still advances but the bytes are discarded.
    pub fn drain(&mut self) -> usize {
        let (spans, running) = self.port.take_spans();
        let total = spans.total_len();
        if total == 0 {
            return 0;
        }

        if !running {
            trace!("port stopped, discarding {} bytes", total);
            self.port.record_discarded(total);
            return 0;
        }

        for range in spans {
            self.sink.ingest(self.port.ring().span(range));
        }
        self.port.record_ingested(total);
        trace!("RX: {} bytes", total);
        total
    }

    /// The sink bytes are delivered to
    pub fn sink(&self) -> &I {
        &self.sink
    }

    /// Consume the worker, returning its sink
    pub fn into_sink(self) -> I {
        self.sink
    }
}
