//! Concurrency limit for running tool processes, plus the set of live
//! tool process groups.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Counting semaphore shared by every executor in the process.
///
/// Cloning shares the same counter.
#[derive(Debug, Clone)]
pub struct ProcessSlots {
    state: Arc<(Mutex<usize>, Condvar)>,
    limit: usize,
    groups: Arc<Mutex<BTreeSet<u32>>>,
}

impl ProcessSlots {
    /// Create a limit of `limit` concurrent processes (at least one).
    pub fn new(limit: usize) -> Self {
        Self {
            state: Arc::new((Mutex::new(0), Condvar::new())),
            limit: limit.max(1),
            groups: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of slots currently held.
    pub fn in_use(&self) -> usize {
        let (lock, _) = &*self.state;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a slot if one is free.
    pub fn try_acquire(&self) -> Option<SlotGuard> {
        let (lock, _) = &*self.state;
        let mut used = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if *used < self.limit {
            *used += 1;
            Some(SlotGuard {
                state: Arc::clone(&self.state),
            })
        } else {
            None
        }
    }

    /// Block until a slot is free.
    ///
    /// Returns `None` if `cancelled` is raised while waiting.
    pub fn acquire(&self, cancelled: &AtomicBool) -> Option<SlotGuard> {
        let (lock, cv) = &*self.state;
        let mut used = lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if cancelled.load(Ordering::SeqCst) {
                return None;
            }
            if *used < self.limit {
                *used += 1;
                return Some(SlotGuard {
                    state: Arc::clone(&self.state),
                });
            }
            let (guard, _) = cv
                .wait_timeout(used, WAIT_SLICE)
                .unwrap_or_else(PoisonError::into_inner);
            used = guard;
        }
    }
}

impl ProcessSlots {
    /// Record a running process group until the guard drops.
    pub fn track_group(&self, pgid: u32) -> GroupGuard {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pgid);
        GroupGuard {
            groups: Arc::clone(&self.groups),
            pgid,
        }
    }

    /// Process groups currently running, sorted.
    pub fn running_groups(&self) -> Vec<u32> {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    /// SIGKILL every tracked process group. Returns how many were signalled.
    pub fn kill_groups(&self) -> usize {
        let groups = self.running_groups();
        for pgid in &groups {
            kill_group(*pgid);
        }
        groups.len()
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    // ESRCH means the group already exited.
    let _ = killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL);
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

impl Default for ProcessSlots {
    fn default() -> Self {
        Self::new(4)
    }
}

/// A held slot; released on drop.
#[derive(Debug)]
pub struct SlotGuard {
    state: Arc<(Mutex<usize>, Condvar)>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let (lock, cv) = &*self.state;
        {
            let mut used = lock.lock().unwrap_or_else(PoisonError::into_inner);
            *used = used.saturating_sub(1);
        }
        cv.notify_one();
    }
}

/// A tracked process group; untracked on drop.
#[derive(Debug)]
pub struct GroupGuard {
    groups: Arc<Mutex<BTreeSet<u32>>>,
    pgid: u32,
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.pgid);
    }
}
