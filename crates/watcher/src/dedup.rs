//! Write-event deduplication for a single log file
//!
//! Providers emit one event per write syscall, and every event we forward
//! makes the consumer re-check the file (and usually whether the process
//! writing it is still alive). The dedup loop sits between the raw stream and
//! the consumer and forwards only what the consumer needs:
//!
//! - events for other files in the directory are dropped
//! - a Write is dropped if the consumer has not caught up yet, or if the
//!   previous forwarded Write is younger than the debounce window
//! - a Create is preceded by a synthetic Write, so lines written just before
//!   the file was recreated are not missed
//! - everything else passes through
//!
//! The loop owns all of its state and stops when the raw source closes.
//! Dropping its senders closes the output queues, after which the consumer
//! can still read whatever was buffered.

use crate::config::DedupConfig;
use crate::error::{Result, WatchError};
use crate::source::RawSource;
use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tail_core::{FsEvent, Op};
use tracing::{debug, trace, warn};

/// Capacity of the coalesced event queue
///
/// Only the latest signal matters to the consumer, so this stays small.
pub const EVENT_QUEUE_CAPACITY: usize = 4;

/// Capacity of the relayed error queue
pub const ERROR_QUEUE_CAPACITY: usize = 4;

/// What to do with one raw event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Drop the event
    Discard,
    /// Forward the event as-is
    Forward,
    /// Forward a synthetic Write for the same path, then the event
    ForwardWithWrite,
}

/// Filtering and coalescing policy for one target file
///
/// Pure state machine: the caller supplies the queue depth and the clock.
#[derive(Debug, Clone)]
pub struct DedupPolicy {
    target: String,
    window: Duration,
    /// When the last Write for the target was forwarded
    last_forward: Option<Instant>,
}

impl DedupPolicy {
    pub fn new(target: impl Into<String>, window: Duration) -> Self {
        Self {
            target: target.into(),
            window,
            last_forward: None,
        }
    }

    /// Base name of the file this policy filters for
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide the fate of `event`
    ///
    /// `pending` is the number of unread items in the output event queue.
    pub fn decide(&mut self, event: &FsEvent, pending: usize, now: Instant) -> Decision {
        if !event.is_named(&self.target) {
            return Decision::Discard;
        }

        match event.op {
            Op::Write => {
                // A queued Write or Create already makes the consumer look at the file
                if pending > 0 || self.within_window(now) {
                    return Decision::Discard;
                }
                self.last_forward = Some(now);
                Decision::Forward
            }
            Op::Create => {
                self.last_forward = Some(now);
                Decision::ForwardWithWrite
            }
            _ => Decision::Forward,
        }
    }

    fn within_window(&self, now: Instant) -> bool {
        self.last_forward
            .is_some_and(|last| now.saturating_duration_since(last) < self.window)
    }
}

/// Handle to a running dedup loop
///
/// The loop runs on its own thread until the [`RawSource`] it was given is
/// closed by its owner. There is no close on this handle: close the source,
/// then read the queues to the end (or call [`DedupEvents::drain`]).
#[derive(Debug)]
pub struct DedupEvents {
    target: String,
    events: Receiver<FsEvent>,
    errors: Receiver<WatchError>,
    worker: JoinHandle<()>,
}

impl DedupEvents {
    /// Start deduplicating `source` for the file named `target`
    pub fn spawn(target: impl Into<String>, source: RawSource) -> Result<Self> {
        Self::spawn_with_config(target, source, &DedupConfig::default())
    }

    /// Like [`DedupEvents::spawn`] with an explicit configuration
    pub fn spawn_with_config(
        target: impl Into<String>,
        source: RawSource,
        config: &DedupConfig,
    ) -> Result<Self> {
        let target = target.into();
        let (event_tx, event_rx) = bounded(EVENT_QUEUE_CAPACITY);
        let (error_tx, error_rx) = bounded(ERROR_QUEUE_CAPACITY);

        let dedup = DedupLoop {
            policy: DedupPolicy::new(target.clone(), config.debounce_window()),
            source,
            events: event_tx,
            errors: error_tx,
        };

        let worker = thread::Builder::new()
            .name(format!("dedup-{}", target))
            .spawn(move || dedup.run())
            .map_err(WatchError::Spawn)?;

        Ok(Self {
            target,
            events: event_rx,
            errors: error_rx,
            worker,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Coalesced events, disconnected once the loop has stopped and the
    /// buffer is empty
    pub fn events(&self) -> &Receiver<FsEvent> {
        &self.events
    }

    /// Relayed provider errors
    pub fn errors(&self) -> &Receiver<WatchError> {
        &self.errors
    }

    /// Read both queues to the end and wait for the loop to exit
    ///
    /// Blocks until the raw source has been closed.
    pub fn drain(self) -> (Vec<FsEvent>, Vec<WatchError>) {
        let mut events = Vec::new();
        let mut errors = Vec::new();
        let no_events = never();
        let no_errors = never();
        let mut events_open = true;
        let mut errors_open = true;

        // Both queues disconnect together, but events may still be buffered
        // when the error queue first reports the disconnect
        while events_open || errors_open {
            let event_rx = if events_open { &self.events } else { &no_events };
            let error_rx = if errors_open { &self.errors } else { &no_errors };
            select! {
                recv(event_rx) -> msg => match msg {
                    Ok(event) => events.push(event),
                    Err(_) => events_open = false,
                },
                recv(error_rx) -> msg => match msg {
                    Ok(error) => errors.push(error),
                    Err(_) => errors_open = false,
                },
            }
        }

        if self.worker.join().is_err() {
            warn!("Dedup loop for {} panicked", self.target);
        }

        (events, errors)
    }
}

/// State owned by the dedup worker thread
struct DedupLoop {
    policy: DedupPolicy,
    source: RawSource,
    events: Sender<FsEvent>,
    errors: Sender<WatchError>,
}

/// The consumer dropped its end of the output queues
struct Disconnected;

impl DedupLoop {
    fn run(mut self) {
        debug!(
            "Dedup loop started for {} (window: {:?})",
            self.policy.target(),
            self.policy.window()
        );

        if self.pump().is_err() {
            warn!(
                "Consumer of {} went away, stopping dedup loop",
                self.policy.target()
            );
            return;
        }

        debug!("Raw source for {} closed, dedup loop stopped", self.policy.target());
        // Dropping self closes the output queues
    }

    /// Relay until the raw event stream disconnects
    fn pump(&mut self) -> std::result::Result<(), Disconnected> {
        // A provider that shuts its error stream down early must not make
        // the loop spin on a disconnected channel
        let closed = never();
        let mut errors_open = true;

        loop {
            let raw_errors = if errors_open { &self.source.errors } else { &closed };
            select! {
                recv(raw_errors) -> msg => match msg {
                    Ok(err) => relay_error(&self.errors, err)?,
                    Err(_) => errors_open = false,
                },
                recv(self.source.events) -> msg => match msg {
                    Ok(event) => handle_event(&mut self.policy, &self.events, event)?,
                    Err(_) => break,
                },
            }
        }

        // Errors that raced with the close still reach the consumer
        for err in self.source.errors.try_iter() {
            relay_error(&self.errors, err)?;
        }
        Ok(())
    }
}

fn handle_event(
    policy: &mut DedupPolicy,
    events: &Sender<FsEvent>,
    event: FsEvent,
) -> std::result::Result<(), Disconnected> {
    match policy.decide(&event, events.len(), Instant::now()) {
        Decision::Discard => {
            trace!("Discarding {}", event);
            Ok(())
        }
        Decision::Forward => forward(events, event),
        Decision::ForwardWithWrite => {
            forward(events, FsEvent::new(event.path.clone(), Op::Write))?;
            forward(events, event)
        }
    }
}

fn forward(events: &Sender<FsEvent>, event: FsEvent) -> std::result::Result<(), Disconnected> {
    events.send(event).map_err(|_| Disconnected)
}

fn relay_error(errors: &Sender<WatchError>, err: WatchError) -> std::result::Result<(), Disconnected> {
    errors.send(err).map_err(|_| Disconnected)
}
