//! Session change notifications (subscribe/notify).
//!
//! Every observer gets its own channel and a copy of every event published
//! after it subscribed. Dropped subscriptions are pruned on the next publish.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use serde::Serialize;

use labtrack_auth::Identity;

/// What changed in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A login replaced the session (or created one).
    LoggedIn { identity: Identity },

    /// The session was restored from storage at startup.
    Rehydrated { identity: Identity },

    /// The session was destroyed.
    LoggedOut,
}

/// A subscription to session events.
///
/// Messages arrive in publication order. Intended for a single consumer.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything already delivered, without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Fan-out list of observer channels. Not synchronized on its own; the
/// session context keeps it under the same lock as the session.
#[derive(Debug)]
pub(crate) struct Observers<M> {
    subscribers: Vec<Sender<M>>,
}

impl<M> Default for Observers<M> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<M: Clone> Observers<M> {
    pub(crate) fn subscribe(&mut self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        Subscription::new(rx)
    }

    pub(crate) fn publish(&mut self, message: M) {
        // Drop any dead subscribers while publishing.
        self.subscribers.retain(|tx| tx.send(message.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }
}
