use async_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// Writes evict the oldest item when full, reads never wait.
pub(crate) fn latest<T>(capacity: usize) -> (LatestSender<T>, LatestReceiver<T>) {
    assert!(capacity > 0, "queue capacity must be at least 1");
    let (sender, receiver) = async_channel::bounded(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        LatestSender {
            inner: sender,
            capacity,
            dropped,
        },
        LatestReceiver { inner: receiver },
    )
}

#[derive(Debug)]
pub(crate) struct LatestSender<T> {
    inner: Sender<T>,
    capacity: usize,
    dropped: Arc<AtomicU64>,
}

impl<T> LatestSender<T> {
    // Once the reader is gone the item is discarded.
    pub(crate) fn push(&self, item: T) {
        if let Ok(Some(_evicted)) = self.inner.force_send(item) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    pub(crate) fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub(crate) struct LatestReceiver<T> {
    inner: Receiver<T>,
}

impl<T> LatestReceiver<T> {
    pub(crate) fn try_pop(&self) -> Option<T> {
        self.inner.try_recv().ok()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
