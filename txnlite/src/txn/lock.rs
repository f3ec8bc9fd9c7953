// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row write locks
//!
//! One exclusive lock per row identity, held from the first write until the
//! owning transaction commits or rolls back. A transaction that finds the row
//! held by someone else waits on a condition variable until the holder ends.
//! Before waiting, the wait-for chain starting at the holder is followed; if
//! it leads back to the waiter the request fails with `Deadlock` instead of
//! blocking forever.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::state::TransactionId;
use crate::exec::error::ExecutionError;
use crate::storage::{RowId, TableId};

/// Identity of a lockable row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub table: TableId,
    pub row: RowId,
}

impl RowKey {
    pub fn new(table: TableId, row: RowId) -> Self {
        Self { table, row }
    }
}

/// Outcome of a successful acquire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAcquisition {
    /// The lock was free (or became free) and now belongs to the caller
    Acquired,
    /// The caller already held the lock
    AlreadyHeld,
}

#[derive(Debug, Default)]
struct LockState {
    holders: HashMap<RowKey, TransactionId>,
    owned: HashMap<TransactionId, HashSet<RowKey>>,
    /// waiter -> holder it is blocked on
    waits_for: HashMap<TransactionId, TransactionId>,
}

impl LockState {
    fn grant(&mut self, key: RowKey, txn: TransactionId) {
        self.holders.insert(key, txn);
        self.owned.entry(txn).or_default().insert(key);
    }

    /// Whether following waits-for edges from `holder` reaches `waiter`
    fn closes_cycle(&self, waiter: TransactionId, holder: TransactionId) -> bool {
        let mut current = holder;
        let mut hops = 0;
        while hops <= self.waits_for.len() {
            if current == waiter {
                return true;
            }
            match self.waits_for.get(&current) {
                Some(next) => current = *next,
                None => return false,
            }
            hops += 1;
        }
        false
    }
}

/// Table of row write locks shared by all transactions
#[derive(Debug, Default)]
pub struct RowLockTable {
    state: Mutex<LockState>,
    released: Condvar,
}

impl RowLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the write lock on `key` for `txn`
    ///
    /// Blocks while another transaction holds the lock. `timeout` bounds the
    /// total wait; `None` waits until the holder ends. `table_name` is only
    /// used for error messages.
    pub fn acquire(
        &self,
        key: RowKey,
        txn: TransactionId,
        table_name: &str,
        timeout: Option<Duration>,
    ) -> Result<LockAcquisition, ExecutionError> {
        let started = Instant::now();
        let deadline = timeout.map(|t| started + t);
        let mut state = self.state.lock();

        loop {
            let holder = match state.holders.get(&key) {
                None => {
                    state.waits_for.remove(&txn);
                    state.grant(key, txn);
                    return Ok(LockAcquisition::Acquired);
                }
                Some(holder) if *holder == txn => {
                    state.waits_for.remove(&txn);
                    return Ok(LockAcquisition::AlreadyHeld);
                }
                Some(holder) => *holder,
            };

            if state.closes_cycle(txn, holder) {
                state.waits_for.remove(&txn);
                log::warn!(
                    "Deadlock: {} waiting for {} on {} row {}",
                    txn,
                    holder,
                    table_name,
                    key.row
                );
                return Err(ExecutionError::Deadlock {
                    table: table_name.to_string(),
                    row: key.row.get(),
                    waiter: txn,
                    holder,
                });
            }

            state.waits_for.insert(txn, holder);
            log::debug!(
                "{} waiting for {} to release {} row {}",
                txn,
                holder,
                table_name,
                key.row
            );

            match deadline {
                Some(deadline) => {
                    let timed_out = self.released.wait_until(&mut state, deadline).timed_out();
                    if timed_out && state.holders.get(&key).is_some_and(|h| *h != txn) {
                        state.waits_for.remove(&txn);
                        let waited = started.elapsed();
                        log::warn!(
                            "Lock timeout after {:?}: {} on {} row {} held by {}",
                            waited,
                            txn,
                            table_name,
                            key.row,
                            holder
                        );
                        return Err(ExecutionError::LockTimeout {
                            table: table_name.to_string(),
                            row: key.row.get(),
                            holder,
                            waited,
                        });
                    }
                }
                None => self.released.wait(&mut state),
            }
        }
    }

    /// Release every lock held by `txn` and wake all waiters
    pub fn release_all(&self, txn: TransactionId) -> usize {
        let mut state = self.state.lock();
        state.waits_for.remove(&txn);
        let keys = state.owned.remove(&txn).unwrap_or_default();
        for key in &keys {
            state.holders.remove(key);
        }
        drop(state);

        if !keys.is_empty() {
            self.released.notify_all();
        }
        keys.len()
    }

    pub fn holder(&self, key: RowKey) -> Option<TransactionId> {
        self.state.lock().holders.get(&key).copied()
    }

    pub fn held_count(&self, txn: TransactionId) -> usize {
        self.state
            .lock()
            .owned
            .get(&txn)
            .map_or(0, |keys| keys.len())
    }

    pub fn total_locked(&self) -> usize {
        self.state.lock().holders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn key(row: u64) -> RowKey {
        RowKey::new(TableId::from_u64(1), RowId::from_u64(row))
    }

    fn txn(id: u64) -> TransactionId {
        TransactionId::from_u64(id)
    }

    #[test]
    fn test_acquire_is_reentrant() {
        let locks = RowLockTable::new();
        assert_eq!(
            locks.acquire(key(1), txn(1), "t", None).unwrap(),
            LockAcquisition::Acquired
        );
        assert_eq!(
            locks.acquire(key(1), txn(1), "t", None).unwrap(),
            LockAcquisition::AlreadyHeld
        );
        assert_eq!(locks.held_count(txn(1)), 1);
        assert_eq!(locks.release_all(txn(1)), 1);
        assert_eq!(locks.total_locked(), 0);
    }

    #[test]
    fn test_timeout_when_held() {
        let locks = RowLockTable::new();
        locks.acquire(key(1), txn(1), "t", None).unwrap();

        let err = locks
            .acquire(key(1), txn(2), "t", Some(Duration::from_millis(20)))
            .unwrap_err();
        assert!(matches!(err, ExecutionError::LockTimeout { holder, .. } if holder == txn(1)));
        assert_eq!(locks.holder(key(1)), Some(txn(1)));
    }

    #[test]
    fn test_waiter_proceeds_after_release() {
        let locks = Arc::new(RowLockTable::new());
        locks.acquire(key(7), txn(1), "t", None).unwrap();

        let waiter = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || locks.acquire(key(7), txn(2), "t", Some(Duration::from_secs(5))))
        };

        thread::sleep(Duration::from_millis(30));
        locks.release_all(txn(1));

        let acquired = waiter.join().unwrap().unwrap();
        assert_eq!(acquired, LockAcquisition::Acquired);
        assert_eq!(locks.holder(key(7)), Some(txn(2)));
    }

    #[test]
    fn test_cycle_is_reported_as_deadlock() {
        let locks = Arc::new(RowLockTable::new());
        locks.acquire(key(1), txn(1), "t", None).unwrap();
        locks.acquire(key(2), txn(2), "t", None).unwrap();

        // txn 1 blocks on row 2 in the background
        let blocked = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || locks.acquire(key(2), txn(1), "t", Some(Duration::from_secs(5))))
        };
        thread::sleep(Duration::from_millis(50));

        // txn 2 asking for row 1 would close the cycle
        let err = locks.acquire(key(1), txn(2), "t", None).unwrap_err();
        assert!(matches!(err, ExecutionError::Deadlock { waiter, holder, .. }
            if waiter == txn(2) && holder == txn(1)));

        locks.release_all(txn(2));
        assert_eq!(
            blocked.join().unwrap().unwrap(),
            LockAcquisition::Acquired
        );
    }
}
