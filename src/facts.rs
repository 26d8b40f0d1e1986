use std::time::{Duration, Instant};

use crate::format;
use crate::telemetry::IssSample;

pub const DEFAULT_FACT_INTERVAL: Duration = Duration::from_millis(3500);

pub const WAITING: &str = "Waiting for telemetry...";

const BASE_FACTS: [&str; 10] = [
    "The ISS orbits Earth ~15–16 times per day.",
    "The first ISS module (Zarya) launched in 1998.",
    "The ISS travels ~28,000 km/h relative to Earth’s surface.",
    "Solar arrays on the ISS span ~73 meters tip-to-tip.",
    "Crew see a sunrise/sunset about every 45 minutes.",
    "Microgravity research on the ISS spans biology to materials.",
    "The ISS is a partnership between NASA, Roscosmos, ESA, JAXA, and CSA.",
    "Atmospheric drag slowly lowers ISS altitude—reboosts are needed.",
    "The cupola’s 7 windows give astronauts panoramic Earth views.",
    "ISS mass is ~420,000 kg (about a fully loaded 747).",
];

/// Rotating one-line feed: a live readout of the latest sample followed by
/// fixed station facts.
#[derive(Debug, Clone)]
pub struct FactTicker {
    live: Option<String>,
    index: usize,
    interval: Duration,
    last_advance: Instant,
    paused: bool,
}

impl FactTicker {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            live: None,
            index: 0,
            interval,
            last_advance: now,
            paused: false,
        }
    }

    /// Refresh the live line from a sample, or drop it when there is none
    pub fn set_sample(&mut self, sample: Option<&IssSample>) {
        self.live = sample.map(live_fact);
    }

    fn len(&self) -> usize {
        BASE_FACTS.len() + usize::from(self.live.is_some())
    }

    fn fact(&self, idx: usize) -> Option<&str> {
        match (&self.live, idx) {
            (Some(live), 0) => Some(live.as_str()),
            (Some(_), i) => BASE_FACTS.get(i - 1).copied(),
            (None, i) => BASE_FACTS.get(i).copied(),
        }
    }

    /// Current line
    pub fn current(&self) -> &str {
        let len = self.len();
        if len == 0 {
            return WAITING;
        }
        self.fact(self.index % len).unwrap_or(WAITING)
    }

    /// Advance when the interval has elapsed. Returns true if the line changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_advance) < self.interval {
            return false;
        }
        self.last_advance = now;
        if self.paused {
            return false;
        }
        self.advance();
        true
    }

    /// Skip to the next line immediately
    pub fn advance(&mut self) {
        let len = self.len().max(1);
        self.index = (self.index + 1) % len;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

/// `Live: Lat 51.64°, Lng -12.25° | Alt 418.9 km | Vel 27,580 km/h`
pub fn live_fact(sample: &IssSample) -> String {
    format!(
        "Live: Lat {}°, Lng {}° | Alt {} km | Vel {} km/h",
        format::number(Some(sample.latitude), 2),
        format::number(Some(sample.longitude), 2),
        format::number(Some(sample.altitude), 1),
        format::number(sample.velocity, 0),
    )
}
