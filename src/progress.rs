//! # Progress — Atomic Iteration Counters
//!
//! Thread-safe progress tracking shared between the driver loop and the
//! background status reporter. Counters are atomics so the reporter never
//! blocks the squaring loop; the only Mutex guards the current-activity
//! string, updated once per checkpoint block rather than per iteration.
//!
//! ## Background Reporter
//!
//! A dedicated thread prints progress to stderr every 30 seconds:
//! iterations done, rate (iterations/sec), and estimated time remaining.
//! Shuts down cleanly via the `shutdown` atomic flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub struct Progress {
    pub done: AtomicU64,
    pub total: AtomicU64,
    pub current: Mutex<String>,
    start: Instant,
    shutdown: AtomicBool,
}

impl Progress {
    pub fn new() -> Arc<Self> {
        Arc::new(Progress {
            done: AtomicU64::new(0),
            total: AtomicU64::new(0),
            current: Mutex::new(String::new()),
            start: Instant::now(),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn start_reporter(self: &Arc<Self>) -> thread::JoinHandle<()> {
        let progress = Arc::clone(self);
        thread::spawn(move || loop {
            thread::sleep(Duration::from_secs(30));
            if progress.shutdown.load(Ordering::Relaxed) {
                break;
            }
            progress.print_status();
        })
    }

    pub fn print_status(&self) {
        let elapsed = self.start.elapsed();
        let done = self.done.load(Ordering::Relaxed);
        let total = self.total.load(Ordering::Relaxed);
        let current = self.current.lock().unwrap().clone();
        let rate = if elapsed.as_secs() > 0 {
            done as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let eta_secs = if rate > 0.0 && total > done {
            ((total - done) as f64 / rate) as u64
        } else {
            0
        };
        let h = elapsed.as_secs() / 3600;
        let m = (elapsed.as_secs() % 3600) / 60;
        let s = elapsed.as_secs() % 60;
        eprintln!(
            "[{:02}:{:02}:{:02}] {} | {}/{} iterations | {:.0}/s | ETA {}m",
            h,
            m,
            s,
            current,
            done,
            total,
            rate,
            eta_secs / 60
        );
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
