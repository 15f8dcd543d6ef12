use tokio::sync::watch;

/// A cancellable change-feed subscription.
///
/// The first `next` resolves immediately with the snapshot current at
/// subscription time; each later `next` resolves with the latest snapshot
/// once it differs from the one already seen. Intermediate states between
/// polls coalesce into the newest value. Dropping the subscription
/// unsubscribes.
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
    primed: bool,
}

impl<T: Clone> Subscription<T> {
    pub(crate) fn new(rx: watch::Receiver<T>) -> Self {
        Subscription { rx, primed: false }
    }

    /// Waits for the next snapshot. Returns `None` once the store side of
    /// the feed is gone.
    pub async fn next(&mut self) -> Option<T> {
        if self.primed {
            self.rx.changed().await.ok()?;
        } else {
            self.primed = true;
        }
        Some(self.rx.borrow_and_update().clone())
    }
}
