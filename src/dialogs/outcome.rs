//! Settle-once result cell
//!
//! The writer half ([`SettleOnce`]) stays with the dialog controller; readers
//! get an [`Outcome`] they can clone and await any number of times.

use tokio::sync::watch;

/// Writer half of a single-settlement result
#[derive(Debug)]
pub struct SettleOnce<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> SettleOnce<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Store the value; returns false (and drops `value`) if already settled
    pub fn complete(&self, value: T) -> bool {
        self.tx.send_if_modified(move |slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
            true
        })
    }

    pub fn is_settled(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Read-only awaitable view
    pub fn outcome(&self) -> Outcome<T> {
        Outcome {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone> Default for SettleOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a [`SettleOnce`]
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> Outcome<T> {
    /// Wait for the value
    ///
    /// Returns `None` if the writer was dropped without settling.
    pub async fn wait(&self) -> Option<T> {
        let mut rx = self.rx.clone();
        let settled = rx.wait_for(Option::is_some).await.ok()?;
        settled.clone()
    }

    /// The value, if already settled
    pub fn try_get(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    pub fn is_settled(&self) -> bool {
        self.rx.borrow().is_some()
    }
}
