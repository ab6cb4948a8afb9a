//! Watch subscriptions
//!
//! Provides the [`WatchStrategy`] a backend implements and the
//! [`WatchHandle`] it returns. The handle can be stopped at any time, from
//! any task, any number of times; the backend side observes the stop through
//! its [`WatchSender`] and releases its resources.

use admit_rest::{RequestContext, StatusError};
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::sync::{mpsc, Notify};

/// Options of a list/watch request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListOptions {
    /// Label selector expression
    pub label_selector: Option<String>,
    /// Field selector expression
    pub field_selector: Option<String>,
    /// Resource version to start from
    pub resource_version: Option<String>,
    /// Server-side timeout
    pub timeout_seconds: Option<u64>,
    /// Whether bookmark events are wanted
    pub allow_watch_bookmarks: bool,
}

/// Change notification delivered over a watch
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent<O> {
    /// Object created
    Added(O),
    /// Object updated
    Modified(O),
    /// Object removed
    Deleted(O),
    /// Progress marker carrying a resource version
    Bookmark(String),
    /// Backend-side failure; the stream ends after it
    Error(String),
}

#[derive(Debug, Default)]
struct StopSignal {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.notify.notify_waiters();
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}

/// Cloneable stop control for a [`WatchHandle`]
///
/// `Send + Sync`, so a watch can be stopped from a different task than the
/// one consuming it.
#[derive(Debug, Clone)]
pub struct Stopper(Arc<StopSignal>);

impl Stopper {
    /// Stop the watch; repeated calls are no-ops
    #[inline]
    pub fn stop(&self) {
        self.0.stop();
    }

    /// Check if stopped
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.is_stopped()
    }
}

/// Create a connected sender/handle pair with a bounded buffer
#[must_use]
pub fn channel<O: Send + 'static>(capacity: usize) -> (WatchSender<O>, WatchHandle<O>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let signal = Arc::new(StopSignal::default());
    let wait_signal = signal.clone();
    let handle = WatchHandle {
        rx,
        signal: signal.clone(),
        stop_wait: Box::pin(async move { wait_signal.wait().await }),
    };
    (WatchSender { tx, signal }, handle)
}

/// Backend side of a watch
#[derive(Debug)]
pub struct WatchSender<O> {
    tx: mpsc::Sender<WatchEvent<O>>,
    signal: Arc<StopSignal>,
}

impl<O> Clone for WatchSender<O> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            signal: self.signal.clone(),
        }
    }
}

impl<O: Send> WatchSender<O> {
    /// Deliver an event, waiting for buffer space
    ///
    /// Returns `false` once the consumer has stopped or dropped the handle;
    /// the backend should then release the subscription.
    pub async fn send(&self, event: WatchEvent<O>) -> bool {
        if self.is_stopped() {
            return false;
        }
        tokio::select! {
            sent = self.tx.send(event) => sent.is_ok(),
            () = self.signal.wait() => false,
        }
    }

    /// Deliver an event without waiting
    ///
    /// Returns `false` when the buffer is full or the consumer is gone. A
    /// backend should then drop this sender; the consumer still drains the
    /// events already buffered before the watch ends.
    #[must_use]
    pub fn try_send(&self, event: WatchEvent<O>) -> bool {
        !self.is_stopped() && self.tx.try_send(event).is_ok()
    }

    /// Check if the consumer is gone
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.signal.is_stopped() || self.tx.is_closed()
    }

    /// Resolve once the consumer stops or drops the handle
    pub async fn stopped(&self) {
        tokio::select! {
            () = self.tx.closed() => {}
            () = self.signal.wait() => {}
        }
    }
}

/// Consumer side of a watch
///
/// Yields events until the backend ends the stream or the handle is stopped.
/// Dropping the handle stops it.
pub struct WatchHandle<O> {
    rx: mpsc::Receiver<WatchEvent<O>>,
    signal: Arc<StopSignal>,
    stop_wait: Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl<O> WatchHandle<O> {
    /// Next event, or `None` when the watch has ended
    pub async fn next(&mut self) -> Option<WatchEvent<O>> {
        std::future::poll_fn(|cx| self.poll_event(cx)).await
    }

    /// Stop the watch; repeated calls are no-ops
    pub fn stop(&mut self) {
        self.signal.stop();
        self.rx.close();
    }

    /// Stop control usable from other tasks
    #[must_use]
    pub fn stopper(&self) -> Stopper {
        Stopper(self.signal.clone())
    }

    /// Check if stopped
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.signal.is_stopped()
    }

    fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<Option<WatchEvent<O>>> {
        if self.signal.is_stopped() || self.stop_wait.as_mut().poll(cx).is_ready() {
            self.rx.close();
            return Poll::Ready(None);
        }
        let event = ready!(self.rx.poll_recv(cx));
        if matches!(event, Some(WatchEvent::Error(_))) {
            self.signal.stop();
            self.rx.close();
        }
        Poll::Ready(event)
    }
}

impl<O> Stream for WatchHandle<O> {
    type Item = WatchEvent<O>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_event(cx)
    }
}

impl<O> Drop for WatchHandle<O> {
    fn drop(&mut self) {
        self.signal.stop();
    }
}

impl<O> fmt::Debug for WatchHandle<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("stopped", &self.signal.is_stopped())
            .finish_non_exhaustive()
    }
}

/// Backend subscription primitive
#[async_trait]
pub trait WatchStrategy: fmt::Debug + Send + Sync {
    /// Object type delivered in events
    type Object: Send + 'static;

    /// Open a subscription, or fail if the backend cannot establish one
    async fn watch(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<WatchHandle<Self::Object>, StatusError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn events_flow_until_sender_dropped() {
        let (tx, mut handle) = channel::<u32>(4);
        assert!(tx.send(WatchEvent::Added(1)).await);
        assert!(tx.send(WatchEvent::Modified(2)).await);
        drop(tx);

        assert_eq!(handle.next().await, Some(WatchEvent::Added(1)));
        assert_eq!(handle.next().await, Some(WatchEvent::Modified(2)));
        assert_eq!(handle.next().await, None);
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_seen_by_sender() {
        let (tx, mut handle) = channel::<u32>(4);
        handle.stop();
        handle.stop();

        assert!(handle.is_stopped());
        assert!(tx.is_stopped());
        assert!(!tx.send(WatchEvent::Added(1)).await);
        assert_eq!(handle.next().await, None);
    }

    #[tokio::test]
    async fn stopper_wakes_pending_consumer_from_other_task() {
        let (tx, handle) = channel::<u32>(4);
        let stopper = handle.stopper();

        let consumer = tokio::spawn(async move {
            let mut handle = handle;
            handle.next().await
        });
        tokio::task::yield_now().await;

        stopper.stop();
        stopper.stop();
        assert_eq!(consumer.await.unwrap(), None);
        tx.stopped().await;
    }

    #[tokio::test]
    async fn try_send_refuses_when_buffer_full() {
        let (tx, mut handle) = channel::<u32>(1);
        assert!(tx.try_send(WatchEvent::Added(1)));
        assert!(!tx.try_send(WatchEvent::Added(2)));
        drop(tx);

        assert_eq!(handle.next().await, Some(WatchEvent::Added(1)));
        assert_eq!(handle.next().await, None);
    }

    #[tokio::test]
    async fn stream_ends_after_error_event() {
        let (tx, mut handle) = channel::<u32>(4);
        assert!(tx.send(WatchEvent::Error("compacted".to_string())).await);
        assert!(tx.send(WatchEvent::Added(1)).await);

        assert_eq!(handle.next().await, Some(WatchEvent::Error("compacted".to_string())));
        assert_eq!(handle.next().await, None);
        assert!(tx.is_stopped());
    }

    #[tokio::test]
    async fn try_send_refuses_after_stop() {
        let (tx, mut handle) = channel::<u32>(4);
        handle.stop();
        assert!(!tx.try_send(WatchEvent::Added(1)));
    }

    #[tokio::test]
    async fn dropping_handle_releases_sender() {
        let (tx, handle) = channel::<u32>(1);
        drop(handle);

        tx.stopped().await;
        assert!(tx.is_stopped());
    }

    #[tokio::test]
    async fn handle_is_a_stream() {
        let (tx, handle) = channel::<u32>(4);
        tokio::spawn(async move {
            for i in 0..3 {
                tx.send(WatchEvent::Added(i)).await;
            }
        });

        let events: Vec<_> = handle.collect().await;
        assert_eq!(events.len(), 3);
    }
}
