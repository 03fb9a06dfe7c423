//! Playback event stream.
//!
//! The player consumes `PlaybackEvent`s and never touches OS signals itself.
//! `SignalEvents` is the production source: a fixed-rate tick merged with
//! SIGINT/SIGTERM (terminate) and SIGWINCH (resize).

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use signal_hook::consts::{SIGINT, SIGTERM, SIGWINCH};
use signal_hook::iterator::{Handle, Signals};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Tick,
    ResizeRequested,
    Terminate,
}

pub struct SignalEvents {
    rx: Receiver<PlaybackEvent>,
    interval: Duration,
    next_tick: Instant,
    handle: Option<Handle>,
}

impl SignalEvents {
    /// Start listening for signals and ticking `fps` times per second.
    pub fn install(fps: u32) -> io::Result<Self> {
        let mut signals = Signals::new([SIGINT, SIGTERM, SIGWINCH])?;
        let handle = signals.handle();
        let (tx, rx) = mpsc::channel();

        thread::Builder::new()
            .name("brrtfetch-signals".to_owned())
            .spawn(move || {
                for signal in signals.forever() {
                    let event = match signal {
                        SIGWINCH => PlaybackEvent::ResizeRequested,
                        _ => PlaybackEvent::Terminate,
                    };
                    debug!(signal, ?event, "signal received");
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            })?;

        let mut events = Self::from_receiver(rx, Duration::from_secs(1) / fps.max(1));
        events.handle = Some(handle);
        Ok(events)
    }

    /// Tick every `interval`, interleaved with whatever arrives on `rx`.
    /// The stream reports `Terminate` once every sender is gone.
    pub fn from_receiver(rx: Receiver<PlaybackEvent>, interval: Duration) -> Self {
        SignalEvents {
            rx,
            interval,
            next_tick: Instant::now() + interval,
            handle: None,
        }
    }

    fn tick(&mut self, now: Instant) -> PlaybackEvent {
        self.next_tick += self.interval;
        // Drop ticks we fell behind on instead of bursting to catch up.
        if self.next_tick < now {
            self.next_tick = now + self.interval;
        }
        PlaybackEvent::Tick
    }
}

impl Iterator for SignalEvents {
    type Item = PlaybackEvent;

    fn next(&mut self) -> Option<PlaybackEvent> {
        let now = Instant::now();
        if now >= self.next_tick {
            return Some(self.tick(now));
        }
        match self.rx.recv_timeout(self.next_tick - now) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => Some(self.tick(Instant::now())),
            Err(RecvTimeoutError::Disconnected) => Some(PlaybackEvent::Terminate),
        }
    }
}

impl Drop for SignalEvents {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.close();
        }
    }
}
