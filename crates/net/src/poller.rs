//! Readiness polling across network subscribers

use crate::subscriber::NetSubscriber;
use crossbeam_channel::Select;
use msgbridge_ports::{Poller, SocketId};
use std::thread;
use std::time::Duration;

/// Poller over network subscribers, backed by a crossbeam `Select`
#[derive(Default)]
pub struct NetPoller {
    sockets: Vec<NetSubscriber>,
}

impl NetPoller {
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

impl Poller for NetPoller {
    type Socket = NetSubscriber;

    fn register(&mut self, socket: NetSubscriber) -> SocketId {
        self.sockets.push(socket);
        SocketId(self.sockets.len() - 1)
    }

    fn poll(&mut self, timeout: Duration) -> Vec<SocketId> {
        if self.sockets.is_empty() {
            thread::sleep(timeout);
            return Vec::new();
        }

        let ready = self.ready();
        if !ready.is_empty() {
            return ready;
        }

        let mut select = Select::new();
        for socket in &self.sockets {
            select.recv(socket.receiver());
        }
        match select.ready_timeout(timeout) {
            Ok(_) => self.ready(),
            Err(_) => Vec::new(),
        }
    }

    fn socket_mut(&mut self, id: SocketId) -> Option<&mut NetSubscriber> {
        self.sockets.get_mut(id.0)
    }

    fn len(&self) -> usize {
        self.sockets.len()
    }
}
