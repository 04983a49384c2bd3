// THEORY:
// The event log is the engine's only narrative output: a short, bounded queue of
// human-readable lines the renderer prints in its side panel. Discrete engagement
// events (launch, hit, lost) and a periodic heartbeat share the same FIFO
// discipline, so the log can never grow past its capacity no matter how long the
// session runs.
//
// The heartbeat value is cosmetic (a fake link latency). Its randomness sits behind
// `PingSource` so tests can pin it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use tracing::trace;

pub const LAUNCH_MESSAGE: &str = "LAUNCH DETECTED!";
pub const HIT_MESSAGE: &str = "TARGET HIT!!";
pub const LOST_MESSAGE: &str = "MISSILE LOST";

/// Supplies the synthetic latency printed by the heartbeat.
pub trait PingSource {
    fn sample_ms(&mut self) -> u32;
}

impl<F: FnMut() -> u32> PingSource for F {
    fn sample_ms(&mut self) -> u32 {
        self()
    }
}

/// Uniform pings in [10, 99] ms.
pub struct RandomPing {
    rng: StdRng,
}

impl RandomPing {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPing {
    fn default() -> Self {
        Self::new()
    }
}

impl PingSource for RandomPing {
    fn sample_ms(&mut self) -> u32 {
        self.rng.random_range(10..100)
    }
}

/// Always reports the same latency.
#[derive(Debug, Clone, Copy)]
pub struct FixedPing(pub u32);

impl PingSource for FixedPing {
    fn sample_ms(&mut self) -> u32 {
        self.0
    }
}

/// Ordered, size-bounded message queue. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<String>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// A log pre-seeded with `messages`, subject to the same capacity.
    pub fn with_entries<I, S>(capacity: usize, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut log = Self::new(capacity);
        for message in messages {
            log.append(message);
        }
        log
    }

    /// Pushes to the back, evicting from the front past capacity. Always succeeds.
    pub fn append(&mut self, message: impl Into<String>) {
        self.entries.push_back(message.into());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Appends a `PING` line when `frame_counter` lands on the interval.
    /// Returns whether an entry was written.
    pub fn heartbeat(
        &mut self,
        frame_counter: u64,
        interval: u64,
        ping: &mut dyn PingSource,
    ) -> bool {
        if interval == 0 || frame_counter % interval != 0 {
            return false;
        }
        let ms = ping.sample_ms();
        trace!(frame_counter, ms, "heartbeat");
        self.append(format!("PING: {ms}ms"));
        true
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn contains(&self, message: &str) -> bool {
        self.entries.iter().any(|entry| entry == message)
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
