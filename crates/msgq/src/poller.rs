//! Readiness polling across subscribers
//!
//! Segments carry no wakeup mechanism, so the poller re-checks every
//! registered subscriber in short sleeps until one has data or the timeout
//! runs out.

use crate::socket::MsgqSubscriber;
use msgbridge_ports::{Poller, SocketId};
use std::thread;
use std::time::{Duration, Instant};

const POLL_STEP: Duration = Duration::from_micros(500);

/// Poller over shared-memory subscribers
#[derive(Default)]
pub struct MsgqPoller {
    sockets: Vec<MsgqSubscriber>,
}

impl MsgqPoller {
    pub fn new() -> Self {
        Self::default()
    }

    fn ready(&self) -> Vec<SocketId> {
        self.sockets
            .iter()
            .enumerate()
            .filter(|(_, socket)| socket.has_pending())
            .map(|(i, _)| SocketId(i))
            .collect()
    }
}

impl Poller for MsgqPoller {
    type Socket = MsgqSubscriber;

    fn register(&mut self, socket: MsgqSubscriber) -> SocketId {
        self.sockets.push(socket);
        SocketId(self.sockets.len() - 1)
    }

    fn poll(&mut self, timeout: Duration) -> Vec<SocketId> {
        let deadline = Instant::now() + timeout;
        loop {
            let ready = self.ready();
            let now = Instant::now();
            if !ready.is_empty() || now >= deadline {
                return ready;
            }
            thread::sleep((deadline - now).min(POLL_STEP));
        }
    }

    fn socket_mut(&mut self, id: SocketId) -> Option<&mut MsgqSubscriber> {
        self.sockets.get_mut(id.0)
    }

    fn len(&self) -> usize {
        self.sockets.len()
    }
}
