//! Registration ledger.
//!
//! An append-only, deduplicated record of every `(caller_id, group_id)` that
//! issued `Register`, kept in lock-acquisition order.
//!
//! The dedup scan and the append form one critical section under a single
//! mutex: scanning outside the lock would let two callers both miss the
//! same key and insert it twice. The snapshot returned to the caller is
//! built after the lock is released since it touches no shared state.
//!
//! Entries live in an owned vector, so there is no hand-managed tail
//! pointer and teardown cannot skip or double-release an entry.

use std::sync::Mutex;

use tracing::{debug, info};

use qctl_core::SnapshotRecord;

use crate::context::CallerContext;
use crate::error::GatewayError;

/// One registered caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedgerEntry {
    pub caller_id: i32,
    pub group_id: i32,
}

impl From<&CallerContext> for LedgerEntry {
    fn from(ctx: &CallerContext) -> Self {
        Self {
            caller_id: ctx.caller_id,
            group_id: ctx.group_id,
        }
    }
}

/// What [`Ledger::drain`] released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub released: usize,
}

#[derive(Debug, Default)]
pub struct Ledger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `ctx` unless already present, then return its snapshot.
    ///
    /// A duplicate is not an error: the caller still gets a fresh snapshot.
    pub fn register(&self, ctx: &CallerContext) -> Result<SnapshotRecord, GatewayError> {
        let inserted = self.append_if_absent(LedgerEntry::from(ctx))?;
        if !inserted {
            debug!(
                caller_id = ctx.caller_id,
                group_id = ctx.group_id,
                "Caller already registered"
            );
        }
        Ok(ctx.snapshot())
    }

    /// Append `entry` if no entry with the same key exists.
    ///
    /// Returns whether the entry was inserted.
    pub fn append_if_absent(&self, entry: LedgerEntry) -> Result<bool, GatewayError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if entries.contains(&entry) {
            return Ok(false);
        }

        entries
            .try_reserve(1)
            .map_err(|_| GatewayError::AllocationFailure)?;
        entries.push(entry);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the entries in insertion order.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Log and release every entry, head to tail.
    ///
    /// Takes the ledger by value: nothing can register while it drains.
    pub fn drain(self) -> DrainReport {
        let entries = self.entries.into_inner().unwrap_or_else(|e| e.into_inner());

        if entries.is_empty() {
            info!("Ledger is empty");
            return DrainReport { released: 0 };
        }

        info!(count = entries.len(), "Releasing ledger");
        let mut released = 0;
        for (idx, entry) in entries.into_iter().enumerate() {
            info!(
                task = idx + 1,
                caller_id = entry.caller_id,
                group_id = entry.group_id,
                "Task {}: PID: {}; TID: {}",
                idx + 1,
                entry.caller_id,
                entry.group_id
            );
            released += 1;
        }

        DrainReport { released }
    }
}
