//! A scriptable [`Transport`] fake with an external control handle.
//!
//! Counts come from a scripted result queue, falling back to a settable
//! default once the queue drains. The change channel is fed on demand
//! through the handle, so tests decide exactly when the channel joins,
//! delivers a change, or dies.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::Filter;
use crate::error::TransportError;
use crate::transport::{ChangeChannel, ChannelEvent, Transport};

struct Shared {
    count_results: Mutex<VecDeque<Result<u64, TransportError>>>,
    default_count: AtomicU64,
    open_results: Mutex<VecDeque<Result<(), TransportError>>>,
    open_delay: Mutex<Option<Duration>>,
    stall_opens: AtomicBool,
    count_calls: AtomicU32,
    open_calls: AtomicU32,
    close_calls: AtomicU32,
    last_watch: Mutex<Option<(String, Option<Filter>)>>,
}

/// Fake transport handed to the synchronizer under test.
pub struct FakeTransport {
    shared: Arc<Shared>,
    event_rx: Mutex<Option<mpsc::Receiver<ChannelEvent>>>,
}

/// Control handle kept by the test.
pub struct FakeTransportHandle {
    shared: Arc<Shared>,
    event_tx: mpsc::Sender<ChannelEvent>,
}

/// Create a fake transport and its control handle.
pub fn fake_transport(buffer: usize) -> (Arc<FakeTransport>, FakeTransportHandle) {
    let (tx, rx) = mpsc::channel(buffer);
    let shared = Arc::new(Shared {
        count_results: Mutex::new(VecDeque::new()),
        default_count: AtomicU64::new(0),
        open_results: Mutex::new(VecDeque::new()),
        open_delay: Mutex::new(None),
        stall_opens: AtomicBool::new(false),
        count_calls: AtomicU32::new(0),
        open_calls: AtomicU32::new(0),
        close_calls: AtomicU32::new(0),
        last_watch: Mutex::new(None),
    });
    (
        Arc::new(FakeTransport {
            shared: shared.clone(),
            event_rx: Mutex::new(Some(rx)),
        }),
        FakeTransportHandle {
            shared,
            event_tx: tx,
        },
    )
}

impl FakeTransportHandle {
    /// Value returned by `count_rows` once the scripted queue is empty.
    pub fn set_count(&self, count: u64) {
        self.shared.default_count.store(count, Ordering::SeqCst);
    }

    /// Queue one count result ahead of the default.
    pub fn push_count_result(&self, result: Result<u64, TransportError>) {
        self.shared.count_results.lock().push_back(result);
    }

    /// Queue one `open_channel` outcome (defaults to success when empty).
    pub fn push_open_result(&self, result: Result<(), TransportError>) {
        self.shared.open_results.lock().push_back(result);
    }

    /// Make every `open_channel` call hang forever, as a blackholed
    /// websocket connect would. The call is still counted.
    pub fn stall_opens(&self) {
        self.shared.stall_opens.store(true, Ordering::SeqCst);
    }

    /// Delay each `open_channel` call by `delay` before it resolves.
    pub fn set_open_delay(&self, delay: Duration) {
        *self.shared.open_delay.lock() = Some(delay);
    }

    /// Deliver an event on the change channel.
    pub async fn send(&self, event: ChannelEvent) {
        let _ = self.event_tx.send(event).await;
    }

    pub fn count_calls(&self) -> u32 {
        self.shared.count_calls.load(Ordering::SeqCst)
    }

    pub fn open_calls(&self) -> u32 {
        self.shared.open_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> u32 {
        self.shared.close_calls.load(Ordering::SeqCst)
    }

    /// Table and filter of the last `open_channel` call.
    pub fn last_watch(&self) -> Option<(String, Option<Filter>)> {
        self.shared.last_watch.lock().clone()
    }
}

struct FakeChannel {
    event_rx: mpsc::Receiver<ChannelEvent>,
    shared: Arc<Shared>,
    closed: bool,
}

#[async_trait]
impl ChangeChannel for FakeChannel {
    async fn next_event(&mut self) -> Option<ChannelEvent> {
        if self.closed {
            return None;
        }
        self.event_rx.recv().await
    }

    async fn close(&mut self) {
        self.shared.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed = true;
        self.event_rx.close();
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn count_rows(
        &self,
        _table: &str,
        _filter: Option<&Filter>,
    ) -> Result<u64, TransportError> {
        self.shared.count_calls.fetch_add(1, Ordering::SeqCst);
        match self.shared.count_results.lock().pop_front() {
            Some(result) => result,
            None => Ok(self.shared.default_count.load(Ordering::SeqCst)),
        }
    }

    async fn open_channel(
        &self,
        table: &str,
        filter: Option<&Filter>,
    ) -> Result<Box<dyn ChangeChannel>, TransportError> {
        self.shared.open_calls.fetch_add(1, Ordering::SeqCst);
        *self.shared.last_watch.lock() = Some((table.to_string(), filter.cloned()));

        if self.shared.stall_opens.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }
        let delay = *self.shared.open_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(Err(e)) = self.shared.open_results.lock().pop_front() {
            return Err(e);
        }

        let rx = self.event_rx.lock().take().ok_or_else(|| {
            TransportError::Protocol("fake channel already taken".into())
        })?;
        Ok(Box::new(FakeChannel {
            event_rx: rx,
            shared: self.shared.clone(),
            closed: false,
        }))
    }
}
