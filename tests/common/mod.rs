//! Shared utilities for integration tests.

#![allow(dead_code)]

pub mod harness;
pub mod remote;

use std::time::{Duration, Instant};

/// Polls `done` until it holds, panicking after five seconds.
pub fn wait_for(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        if Instant::now() >= deadline {
            panic!("timed out waiting for {}", what);
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}
