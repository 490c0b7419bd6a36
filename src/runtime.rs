use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};
use log::{debug, error};

pub const TICK_RATE_MS: u64 = 100;

/// How long the input reader blocks before re-checking for cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Unified event type consumed by the session loop
#[derive(Debug)]
pub enum SessionEvent {
    Key(KeyEvent),
    /// Status refresh is due
    Tick,
    /// The input stream failed; the session cannot continue
    ReadFailed(io::Error),
    /// The input source went away without reporting an error
    Closed,
}

/// Session-scoped cancellation signal shared by the loop and the input reader
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Source of terminal input events
pub trait EventSource {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError>;
}

/// Production event source: a reader thread feeding crossterm key events into a channel.
///
/// The thread polls so that it notices the cancel token and stops reading
/// from the terminal once the session is over.
pub struct CrosstermEventSource {
    rx: Receiver<SessionEvent>,
    cancel: CancelToken,
    reader: Option<JoinHandle<()>>,
}

impl CrosstermEventSource {
    pub fn new(cancel: CancelToken) -> Self {
        let (tx, rx) = mpsc::channel();
        let token = cancel.clone();

        let reader = std::thread::spawn(move || {
            while !token.is_cancelled() {
                let ready = match event::poll(POLL_INTERVAL) {
                    Ok(ready) => ready,
                    Err(e) => {
                        error!("polling terminal input failed: {e}");
                        let _ = tx.send(SessionEvent::ReadFailed(e));
                        break;
                    }
                };
                if !ready {
                    continue;
                }
                match event::read() {
                    Ok(CtEvent::Key(key)) => {
                        if tx.send(SessionEvent::Key(key)).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("reading terminal input failed: {e}");
                        let _ = tx.send(SessionEvent::ReadFailed(e));
                        break;
                    }
                }
            }
            debug!("input reader stopped");
        });

        Self {
            rx,
            cancel,
            reader: Some(reader),
        }
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

impl Drop for CrosstermEventSource {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<SessionEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<SessionEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedTicker {
    fn default() -> Self {
        Self::new(Duration::from_millis(TICK_RATE_MS))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Runner that advances the session one event/tick at a time.
///
/// Ticks follow a deadline, so a steady stream of keys cannot starve them.
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    next_tick: Instant,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        let next_tick = Instant::now() + ticker.interval();
        Self {
            event_source,
            ticker,
            next_tick,
        }
    }

    /// Blocks until the next event or the next tick deadline, whichever is first
    pub fn step(&mut self) -> SessionEvent {
        let now = Instant::now();
        if now >= self.next_tick {
            self.next_tick = now + self.ticker.interval();
            return SessionEvent::Tick;
        }
        match self.event_source.recv_timeout(self.next_tick - now) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => {
                self.next_tick = Instant::now() + self.ticker.interval();
                SessionEvent::Tick
            }
            Err(RecvTimeoutError::Disconnected) => SessionEvent::Closed,
        }
    }
}
