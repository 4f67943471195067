//! Disposable registrations for pushed notifications.
//!
//! A registration hands the consumer a [`Subscription`] and keeps a
//! [`Delivery`] for itself. Every callback runs through
//! [`Delivery::deliver`], which holds the delivery gate for the duration of
//! the callback, so once [`Subscription::dispose`] returns no callback is
//! running and none will run again.
//!
//! Callbacks must not dispose their own subscription: the gate is not
//! reentrant.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct Shared {
    cancel: CancellationToken,
    /// `true` while deliveries are allowed.
    gate: Mutex<bool>,
}

/// Consumer handle. Disposing (or dropping) it tears the registration down.
#[derive(Debug)]
pub struct Subscription {
    shared: Arc<Shared>,
}

/// Producer handle used to push values to the consumer.
#[derive(Debug, Clone)]
pub struct Delivery {
    shared: Arc<Shared>,
}

impl Subscription {
    /// Creates a live subscription and the producer side that feeds it.
    pub fn new() -> (Self, Delivery) {
        let shared = Arc::new(Shared {
            cancel: CancellationToken::new(),
            gate: Mutex::new(true),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            Delivery { shared },
        )
    }

    /// Stops deliveries and signals the producer to release its resources.
    ///
    /// Idempotent. Blocks until an in-flight callback has returned.
    pub fn dispose(&self) {
        self.shared.cancel.cancel();
        let mut open = self
            .shared
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *open = false;
    }

    pub fn is_active(&self) -> bool {
        !self.shared.cancel.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Delivery {
    /// Runs `f` unless the subscription has been disposed.
    ///
    /// Returns `false` when the delivery was dropped.
    pub fn deliver(&self, f: impl FnOnce()) -> bool {
        let open = self
            .shared
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !*open {
            return false;
        }
        f();
        true
    }

    pub fn is_active(&self) -> bool {
        !self.shared.cancel.is_cancelled()
    }

    /// Resolves once the consumer disposes the subscription.
    pub async fn cancelled(&self) {
        self.shared.cancel.cancelled().await;
    }

    /// Token cancelled on dispose, for producers that select on it.
    pub fn token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }
}

/// Delivers the current value of `rx`, then every change, until disposed
/// or until the sender is dropped.
///
/// Must be called from within a tokio runtime.
pub fn spawn_watch<T, F>(mut rx: watch::Receiver<T>, on_value: F) -> Subscription
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    let (subscription, delivery) = Subscription::new();
    tokio::spawn(async move {
        let initial = rx.borrow_and_update().clone();
        if !delivery.deliver(|| on_value(initial)) {
            return;
        }
        loop {
            tokio::select! {
                () = delivery.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let value = rx.borrow_and_update().clone();
                    if !delivery.deliver(|| on_value(value)) {
                        break;
                    }
                }
            }
        }
    });
    subscription
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_dispose_is_idempotent() {
        let (sub, delivery) = Subscription::new();
        assert!(sub.is_active());
        assert!(delivery.is_active());

        sub.dispose();
        sub.dispose();

        assert!(!sub.is_active());
        assert!(!delivery.is_active());
    }

    #[test]
    fn test_no_delivery_after_dispose() {
        let (sub, delivery) = Subscription::new();
        let count = AtomicUsize::new(0);

        assert!(delivery.deliver(|| {
            count.fetch_add(1, Ordering::SeqCst);
        }));
        sub.dispose();
        assert!(!delivery.deliver(|| {
            count.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_disposes() {
        let (sub, delivery) = Subscription::new();
        drop(sub);
        assert!(!delivery.is_active());
        assert!(!delivery.deliver(|| panic!("delivered after drop")));
    }

    #[test]
    fn test_dispose_waits_for_in_flight_delivery() {
        let (sub, delivery) = Subscription::new();
        let started = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let handle = {
            let started = Arc::clone(&started);
            let finished = Arc::clone(&finished);
            std::thread::spawn(move || {
                delivery.deliver(|| {
                    started.store(true, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(50));
                    finished.store(true, Ordering::SeqCst);
                });
            })
        };

        while !started.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }
        sub.dispose();
        assert!(finished.load(Ordering::SeqCst));
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_spawn_watch_delivers_current_then_changes() {
        let (tx, rx) = watch::channel(1);
        let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();

        let sub = spawn_watch(rx, move |v| {
            let _ = seen_tx.send(v);
        });

        assert_eq!(seen_rx.recv().await, Some(1));
        tx.send(2).unwrap();
        assert_eq!(seen_rx.recv().await, Some(2));

        sub.dispose();
        let _ = tx.send(3);
        // task exits and drops the sender side of the test channel
        assert_eq!(seen_rx.recv().await, None);
    }
}
