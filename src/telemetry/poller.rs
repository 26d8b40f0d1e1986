use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{info, warn};

use super::{IssSample, TelemetrySource};

/// Outcome of one poll tick
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    Sample(IssSample),
    /// The backend answered without a row
    Empty,
    Failed(String),
}

/// Fetches from a source on a fixed-rate timer in a background thread
pub struct Poller {
    events: Receiver<PollEvent>,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Start polling: one fetch right away, then one per `interval`.
    pub fn spawn<S>(mut source: S, interval: Duration) -> Self
    where
        S: TelemetrySource + Send + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            poll_loop(&mut source, interval, &event_tx, &stop_rx);
            info!("telemetry poller stopped");
        });

        Self {
            events: event_rx,
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Take every event received since the last call (non-blocking)
    pub fn drain(&self) -> Vec<PollEvent> {
        self.events.try_iter().collect()
    }

    /// Stop the thread and wait for it. An in-flight request finishes first.
    pub fn shutdown(mut self) {
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        // Dropping the stop sender wakes the thread; it exits on its own
        self.stop.take();
    }
}

fn poll_loop<S: TelemetrySource>(
    source: &mut S,
    interval: Duration,
    events: &Sender<PollEvent>,
    stop: &Receiver<()>,
) {
    loop {
        let started = Instant::now();

        let event = match source.fetch() {
            Ok(Some(sample)) => PollEvent::Sample(sample),
            Ok(None) => PollEvent::Empty,
            Err(e) => {
                warn!("poll failed: {}", e);
                PollEvent::Failed(e.to_string())
            }
        };

        if events.send(event).is_err() {
            return;
        }

        // Fixed rate: a slow fetch shortens the wait instead of stretching the period
        let wait = interval.saturating_sub(started.elapsed());
        match stop.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::FetchError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct Scripted {
        replies: VecDeque<Result<Option<IssSample>, FetchError>>,
    }

    impl TelemetrySource for Scripted {
        fn fetch(&mut self) -> Result<Option<IssSample>, FetchError> {
            self.replies.pop_front().unwrap_or(Ok(None))
        }
    }

    fn sample(ts: f64) -> IssSample {
        IssSample {
            latitude: 10.0,
            longitude: 20.0,
            altitude: 420.0,
            velocity: Some(27_600.0),
            timestamp: Some(ts),
            fetched_at: None,
        }
    }

    fn collect(poller: &Poller, want: usize) -> Vec<PollEvent> {
        let mut events = Vec::new();
        while events.len() < want {
            match poller.events.recv_timeout(Duration::from_secs(5)) {
                Ok(event) => events.push(event),
                Err(_) => break,
            }
        }
        events
    }

    #[test]
    fn test_events_follow_source_replies() {
        let source = Scripted {
            replies: VecDeque::from(vec![
                Ok(Some(sample(1.0))),
                Err(FetchError::Status(502)),
                Ok(None),
            ]),
        };
        let poller = Poller::spawn(source, Duration::from_millis(5));
        let events = collect(&poller, 3);

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], PollEvent::Sample(sample(1.0)));
        assert_eq!(events[1], PollEvent::Failed("backend returned HTTP 502".to_string()));
        assert_eq!(events[2], PollEvent::Empty);
        poller.shutdown();
    }

    #[test]
    fn test_first_fetch_is_immediate() {
        let source = Scripted {
            replies: VecDeque::from(vec![Ok(Some(sample(5.0)))]),
        };
        let poller = Poller::spawn(source, Duration::from_secs(3600));
        let events = collect(&poller, 1);
        assert_eq!(events, vec![PollEvent::Sample(sample(5.0))]);
        poller.shutdown();
    }

    #[test]
    fn test_shutdown_interrupts_wait() {
        let source = Scripted {
            replies: VecDeque::new(),
        };
        let poller = Poller::spawn(source, Duration::from_secs(3600));
        collect(&poller, 1);

        let started = Instant::now();
        poller.shutdown();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    /// Takes `delay` per fetch and records when each fetch started
    struct Slow {
        delay: Duration,
        starts: Arc<Mutex<Vec<Instant>>>,
    }

    impl TelemetrySource for Slow {
        fn fetch(&mut self) -> Result<Option<IssSample>, FetchError> {
            self.starts.lock().unwrap().push(Instant::now());
            thread::sleep(self.delay);
            Ok(None)
        }
    }

    #[test]
    fn test_slow_fetch_shortens_wait() {
        let starts = Arc::new(Mutex::new(Vec::new()));
        let source = Slow {
            delay: Duration::from_millis(120),
            starts: Arc::clone(&starts),
        };
        let poller = Poller::spawn(source, Duration::from_millis(200));
        assert_eq!(collect(&poller, 3).len(), 3);
        poller.shutdown();

        // Fetch starts stay one interval apart; delay + interval would be 320ms
        let starts = starts.lock().unwrap();
        for pair in starts.windows(2).take(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(gap >= Duration::from_millis(190), "gap {:?}", gap);
            assert!(gap < Duration::from_millis(290), "gap {:?}", gap);
        }
    }

    #[test]
    fn test_drain_is_non_blocking() {
        let source = Scripted {
            replies: VecDeque::new(),
        };
        let poller = Poller::spawn(source, Duration::from_secs(3600));
        collect(&poller, 1);
        assert!(poller.drain().is_empty());
    }
}
