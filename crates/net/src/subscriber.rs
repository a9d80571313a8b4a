//! Network subscriber
//!
//! Background threads own the TCP connections and push decoded payloads into
//! an [`Inbox`]; the socket itself only drains that queue, so `receive` never
//! blocks. Dropping the subscriber stops and joins its threads.

use crate::config::NetConfig;
use crate::frame::{FrameReader, Hello};
use crate::inbox::Inbox;
use crossbeam_channel::Receiver;
use log::{debug, info, warn};
use msgbridge_core::Message;
use msgbridge_ports::{InboundSocket, TransportError, TransportResult};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const ACCEPT_IDLE: Duration = Duration::from_millis(20);

/// State handed to every connection thread
#[derive(Clone)]
struct Feed {
    service: String,
    inbox: Inbox,
    stop: Arc<AtomicBool>,
    config: NetConfig,
}

impl Feed {
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Sleep up to `duration`, waking early on stop
    fn pause(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.stopped() {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep((deadline - now).min(Duration::from_millis(10)));
        }
    }

    /// Read frames from one connection until it closes or we are stopped
    fn pump(&self, mut stream: TcpStream, peer: SocketAddr) -> TransportResult<()> {
        stream.set_read_timeout(Some(self.config.read_timeout))?;
        stream.set_nodelay(true)?;
        let mut reader = FrameReader::new();
        let mut greeted = false;

        while !self.stopped() {
            let frame = match reader.next_frame(&mut stream) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    debug!("net {}: peer {} closed the connection", self.service, peer);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            if !greeted {
                let hello = Hello::decode(&frame)?;
                if hello.service != self.service {
                    return Err(TransportError::Handshake(format!(
                        "peer {} publishes {}, expected {}",
                        peer, hello.service, self.service
                    )));
                }
                info!("net {}: publisher {} connected", self.service, peer);
                greeted = true;
                continue;
            }

            let dropped = self.inbox.push(Message::new(frame));
            if dropped > 0 {
                debug!(
                    "net {}: receive queue full, dropped {} old message(s)",
                    self.service, dropped
                );
            }
        }
        Ok(())
    }

    /// Keep a connection to a binding publisher, reconnecting as needed
    fn run_connect(self, addr: SocketAddr) {
        while !self.stopped() {
            match TcpStream::connect_timeout(&addr, self.config.connect_timeout) {
                Ok(stream) => {
                    if let Err(e) = self.pump(stream, addr) {
                        warn!("net {}: connection to {} failed: {}", self.service, addr, e);
                    }
                }
                Err(e) => debug!("net {}: cannot reach {}: {}", self.service, addr, e),
            }
            self.pause(self.config.reconnect_interval);
        }
    }

    /// Accept publishers on `listener`, one reader thread each
    fn run_serve(self, listener: TcpListener) {
        let mut connections: Vec<JoinHandle<()>> = Vec::new();
        while !self.stopped() {
            match listener.accept() {
                Ok((stream, peer)) => {
                    // Accepted sockets may inherit non-blocking mode
                    if let Err(e) = stream.set_nonblocking(false) {
                        warn!("net {}: rejecting {}: {}", self.service, peer, e);
                        continue;
                    }
                    let feed = self.clone();
                    let spawned = thread::Builder::new()
                        .name(format!("net-sub-{}", self.service))
                        .spawn(move || {
                            if let Err(e) = feed.pump(stream, peer) {
                                warn!("net {}: publisher {} dropped: {}", feed.service, peer, e);
                            }
                        });
                    match spawned {
                        Ok(handle) => connections.push(handle),
                        Err(e) => warn!("net {}: cannot spawn reader: {}", self.service, e),
                    }
                    connections.retain(|handle| !handle.is_finished());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => self.pause(ACCEPT_IDLE),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("net {}: accept failed: {}", self.service, e);
                    self.pause(ACCEPT_IDLE);
                }
            }
        }
        for handle in connections {
            let _ = handle.join();
        }
    }
}

/// Subscribing end of one service on the network transport
pub struct NetSubscriber {
    service: String,
    endpoint: SocketAddr,
    rx: Receiver<Message>,
    conflate: bool,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    // Keeps the queue connected even when every reader thread has exited
    _inbox: Inbox,
}

impl NetSubscriber {
    fn start(
        service: &str,
        endpoint: SocketAddr,
        conflate: bool,
        config: &NetConfig,
        run: impl FnOnce(Feed) + Send + 'static,
    ) -> TransportResult<Self> {
        let capacity = if conflate { 1 } else { config.queue_size };
        let (inbox, rx) = Inbox::new(capacity);
        let stop = Arc::new(AtomicBool::new(false));
        let feed = Feed {
            service: service.to_string(),
            inbox: inbox.clone(),
            stop: stop.clone(),
            config: config.clone(),
        };

        let worker = thread::Builder::new()
            .name(format!("net-sub-{}", service))
            .spawn(move || run(feed))
            .map_err(|e| TransportError::Io(format!("cannot spawn subscriber thread: {}", e)))?;

        Ok(Self {
            service: service.to_string(),
            endpoint,
            rx,
            conflate,
            stop,
            worker: Some(worker),
            _inbox: inbox,
        })
    }

    /// Subscribe by connecting to a publisher bound at `addr`
    pub fn connect(
        service: &str,
        addr: SocketAddr,
        conflate: bool,
        config: &NetConfig,
    ) -> TransportResult<Self> {
        debug!("net {}: subscribing to {}", service, addr);
        Self::start(service, addr, conflate, config, move |feed| {
            feed.run_connect(addr)
        })
    }

    /// Subscribe by listening on `port` for publishers to connect
    pub fn serve(
        service: &str,
        port: u16,
        conflate: bool,
        config: &NetConfig,
    ) -> TransportResult<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port)).map_err(|e| {
            TransportError::Connection(format!("cannot listen on port {}: {}", port, e))
        })?;
        listener.set_nonblocking(true)?;
        let endpoint = listener.local_addr()?;
        debug!("net {}: serving on {}", service, endpoint);
        Self::start(service, endpoint, conflate, config, move |feed| {
            feed.run_serve(listener)
        })
    }

    /// Address this subscriber connects to or listens on
    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    /// Whether a message is waiting
    pub fn has_pending(&self) -> bool {
        !self.rx.is_empty()
    }

    pub(crate) fn receiver(&self) -> &Receiver<Message> {
        &self.rx
    }
}

impl InboundSocket for NetSubscriber {
    fn service(&self) -> &str {
        &self.service
    }

    fn receive(&mut self) -> TransportResult<Option<Message>> {
        let mut latest = self.rx.try_recv().ok();
        if self.conflate {
            while let Ok(msg) = self.rx.try_recv() {
                latest = Some(msg);
            }
        }
        Ok(latest)
    }
}

impl Drop for NetSubscriber {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("net {}: subscriber thread panicked", self.service);
            }
        }
    }
}
