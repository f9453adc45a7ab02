//! Leadership capability.
//!
//! When several workers share a rule set, an external lock decides which one
//! runs the jobs. The controller only needs to ask "am I leader right now" and,
//! if the implementation supports it, be told when the answer changes.

use std::path::PathBuf;

use tokio::sync::watch;

pub trait Leadership: Send + Sync {
    fn is_leader(&self) -> bool;

    /// Change notifications. Implementations without push support return
    /// `None` and are polled instead.
    fn subscribe(&self) -> Option<watch::Receiver<bool>> {
        None
    }
}

/// Single-instance deployments: always leader.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysLeader;

impl Leadership for AlwaysLeader {
    fn is_leader(&self) -> bool {
        true
    }
}

/// Leadership owned by another component (a lock client, a test) that flips
/// it with [`LeaderFlag::set`].
#[derive(Debug)]
pub struct LeaderFlag {
    tx: watch::Sender<bool>,
}

impl LeaderFlag {
    pub fn new(initial: bool) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn set(&self, leader: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != leader;
            *current = leader;
            changed
        });
    }
}

impl Leadership for LeaderFlag {
    fn is_leader(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> Option<watch::Receiver<bool>> {
        Some(self.tx.subscribe())
    }
}

/// Leader while `path` exists. Intended for a sidecar that holds the
/// distributed lock and materializes it as a file.
#[derive(Debug, Clone)]
pub struct LockFileLeadership {
    path: PathBuf,
}

impl LockFileLeadership {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Leadership for LockFileLeadership {
    fn is_leader(&self) -> bool {
        self.path.exists()
    }
}
