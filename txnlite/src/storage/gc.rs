// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Garbage collection of obsolete row versions
//!
//! A version is obsolete once its delete marker committed at or below the
//! horizon: the oldest boundary pinned by a live snapshot, or the last
//! commit when nothing is pinned. No current or future reader can see it.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rayon::prelude::*;
use serde::Serialize;

use super::store::VersionStore;
use super::table::Table;
use crate::exec::error::ExecutionError;
use crate::txn::{CommitClock, CommitSeq};

/// Outcome of one collection pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GcStats {
    pub horizon: CommitSeq,
    pub tables_scanned: usize,
    pub versions_removed: usize,
    pub chains_removed: usize,
}

impl GcStats {
    pub fn removed_anything(&self) -> bool {
        self.versions_removed > 0 || self.chains_removed > 0
    }
}

/// Prune every table in parallel
pub(crate) fn sweep(tables: &[Arc<Table>], horizon: CommitSeq) -> GcStats {
    let (versions_removed, chains_removed) = tables
        .par_iter()
        .map(|table| {
            let counts = table.prune(horizon);
            (counts.versions, counts.chains)
        })
        .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

    GcStats {
        horizon,
        tables_scanned: tables.len(),
        versions_removed,
        chains_removed,
    }
}

/// Background thread that sweeps the store at a fixed interval
///
/// Stopped and joined when dropped.
#[derive(Debug)]
pub struct GarbageCollector {
    shutdown: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl GarbageCollector {
    pub fn start(
        store: Arc<VersionStore>,
        clock: Arc<CommitClock>,
        interval: Duration,
    ) -> Result<Self, ExecutionError> {
        let shutdown = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("txnlite-gc".to_string())
            .spawn(move || run(store, clock, interval, signal))
            .map_err(|e| {
                ExecutionError::RuntimeError(format!("Failed to start garbage collector: {}", e))
            })?;

        log::info!("Garbage collector started (interval {:?})", interval);
        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        {
            let (stopped, wake) = &*self.shutdown;
            *stopped.lock() = true;
            wake.notify_all();
        }
        if handle.join().is_err() {
            log::warn!("Garbage collector thread panicked");
        }
        log::info!("Garbage collector stopped");
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for GarbageCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    store: Arc<VersionStore>,
    clock: Arc<CommitClock>,
    interval: Duration,
    shutdown: Arc<(Mutex<bool>, Condvar)>,
) {
    let (stopped, wake) = &*shutdown;
    loop {
        {
            let mut stopped = stopped.lock();
            let deadline = Instant::now() + interval;
            while !*stopped {
                if wake.wait_until(&mut stopped, deadline).timed_out() {
                    break;
                }
            }
            if *stopped {
                return;
            }
        }

        let stats = store.collect_garbage(clock.gc_horizon());
        if stats.removed_anything() {
            log::debug!(
                "GC at {}: removed {} versions, {} chains across {} tables",
                stats.horizon,
                stats.versions_removed,
                stats.chains_removed,
                stats.tables_scanned
            );
        }
    }
}
