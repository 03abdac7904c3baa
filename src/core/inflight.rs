//! # In-flight task registry.
//!
//! Tracks which tasks have been submitted but whose driver has not finished yet.
//! Used by [`Runtime::shutdown`](crate::Runtime::shutdown) to name the tasks still
//! pending when the grace period runs out.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Thread-safe map of `task id → task name` for running drivers.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    tasks: Mutex<BTreeMap<u64, Arc<str>>>,
}

impl InFlight {
    /// Registers a task; it stays registered until the returned guard is dropped.
    pub(crate) fn enter(self: &Arc<Self>, id: u64, name: Arc<str>) -> InFlightGuard {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, name);
        InFlightGuard {
            owner: Arc::clone(self),
            id,
        }
    }

    /// Returns sorted names of currently registered tasks.
    pub(crate) fn snapshot(&self) -> Vec<String> {
        let tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = tasks.values().map(|n| n.to_string()).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Removes its task from the registry on drop.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    owner: Arc<InFlight>,
    id: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.owner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_removes_on_drop() {
        let reg = Arc::new(InFlight::default());
        let a = reg.enter(1, Arc::from("zeta"));
        let b = reg.enter(2, Arc::from("alpha"));
        assert_eq!(reg.snapshot(), vec!["alpha".to_string(), "zeta".to_string()]);

        drop(b);
        assert_eq!(reg.snapshot(), vec!["zeta".to_string()]);
        drop(a);
        assert_eq!(reg.len(), 0);
    }
}
