//! Bounded receive queue that drops the oldest message when full

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use msgbridge_core::Message;

/// Producer half, shared by every reader thread of one subscriber
#[derive(Clone)]
pub(crate) struct Inbox {
    tx: Sender<Message>,
    // Used to evict the oldest message when the queue is full
    evict: Receiver<Message>,
}

impl Inbox {
    /// Create an inbox and the receiver the subscriber reads from
    pub(crate) fn new(capacity: usize) -> (Self, Receiver<Message>) {
        let (tx, rx) = bounded(capacity.max(1));
        (
            Self {
                tx,
                evict: rx.clone(),
            },
            rx,
        )
    }

    /// Queue a message. Returns how many older messages were dropped.
    pub(crate) fn push(&self, msg: Message) -> usize {
        let mut msg = msg;
        let mut dropped = 0;
        loop {
            match self.tx.try_send(msg) {
                Ok(()) => return dropped,
                Err(TrySendError::Full(back)) => {
                    if self.evict.try_recv().is_ok() {
                        dropped += 1;
                    }
                    msg = back;
                }
                // Cannot happen while the inbox holds `evict`
                Err(TrySendError::Disconnected(_)) => return dropped,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_within_capacity() {
        let (inbox, rx) = Inbox::new(4);
        assert_eq!(inbox.push(Message::from(&b"a"[..])), 0);
        assert_eq!(inbox.push(Message::from(&b"b"[..])), 0);
        assert_eq!(rx.try_recv().unwrap().as_bytes(), b"a");
        assert_eq!(rx.try_recv().unwrap().as_bytes(), b"b");
    }

    #[test]
    fn test_full_inbox_drops_oldest() {
        let (inbox, rx) = Inbox::new(1);
        inbox.push(Message::from(&b"old"[..]));
        assert_eq!(inbox.push(Message::from(&b"new"[..])), 1);
        assert_eq!(rx.try_recv().unwrap().as_bytes(), b"new");
        assert!(rx.try_recv().is_err());
    }
}
