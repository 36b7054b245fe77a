//! Single-slot handoff between the import worker and the render thread.
//!
//! A newer value replaces an unconsumed older one; nothing is ever queued.

use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deposit `value`, returning the unconsumed value it replaced
    pub fn put(&self, value: T) -> Option<T> {
        self.lock().replace(value)
    }

    /// Take ownership of the pending value, leaving the slot empty
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        // The slot holds plain data, so a panic elsewhere cannot leave it torn
        self.slot.lock().unwrap_or_else(|e| {
            tracing::warn!("Mailbox mutex poisoned; continuing");
            e.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_replace_not_queue() {
        let mailbox = Mailbox::new();
        assert!(mailbox.is_empty());
        assert_eq!(mailbox.put(1), None);
        assert_eq!(mailbox.put(2), Some(1));
        assert_eq!(mailbox.take(), Some(2));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_cross_thread_handoff() {
        let mailbox = Arc::new(Mailbox::new());
        let sender = Arc::clone(&mailbox);
        std::thread::spawn(move || {
            sender.put(String::from("mesh"));
        })
        .join()
        .unwrap();
        assert_eq!(mailbox.take().as_deref(), Some("mesh"));
    }
}
