//! Network publisher
//!
//! ```text
//!   send() ──try_send──▶ [bounded queue] ──▶ writer thread ──▶ TcpStream
//!      │                                          │
//!      └── queue full: frame dropped              └── connect / reconnect
//! ```
//!
//! `send` never touches the socket. Frames go through a queue of
//! `send_queue` entries to a writer thread that owns the connection, so a
//! subscriber that stops reading only stalls its own writer. A full queue
//! drops the frame, and so does a writer with no subscriber connected, as
//! with any publish/subscribe socket that has nobody listening.

use crate::config::NetConfig;
use crate::frame::{Hello, MAX_FRAME_SIZE, write_frame};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use log::{debug, info, warn};
use msgbridge_core::Message;
use msgbridge_ports::{OutboundSocket, PublishOptions, TransportError, TransportResult};
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// State shared between the publisher and its writer thread
#[derive(Debug, Default)]
struct Link {
    connected: AtomicBool,
    dropped: AtomicU64,
}

impl Link {
    fn drop_frames(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }
}

/// Publishing end of one service on the network transport
pub struct NetPublisher {
    service: String,
    addr: SocketAddr,
    frames: Option<Sender<Vec<u8>>>,
    /// Dropped to wake the writer while it waits between attempts
    closing: Option<Sender<()>>,
    link: Arc<Link>,
    writer: Option<JoinHandle<()>>,
}

impl NetPublisher {
    /// Publish towards a subscriber at `addr`.
    ///
    /// Returns at once; the writer thread connects in the background. With
    /// `wait_for_subscriber`, frames sent during the first `retries`
    /// connection attempts are held in the queue instead of dropped, so the
    /// first messages survive a peer that is still coming up.
    pub fn connect(
        service: &str,
        addr: SocketAddr,
        options: &PublishOptions,
        config: &NetConfig,
    ) -> Self {
        let (frames, queue) = bounded(config.send_queue.max(1));
        let (closing, closed) = bounded::<()>(0);
        let link = Arc::new(Link::default());
        let hold_attempts = if options.wait_for_subscriber {
            options.retries.max(1)
        } else {
            0
        };

        let writer = Writer {
            service: service.to_string(),
            addr,
            config: config.clone(),
            link: link.clone(),
            stream: None,
            attempts: 0,
            hold_attempts,
            next_attempt: Instant::now(),
        };
        let handle = thread::Builder::new()
            .name(format!("net-pub-{}", service))
            .spawn(move || writer.run(queue, closed))
            .map_err(|e| warn!("net {}: cannot start writer thread: {}", service, e))
            .ok();

        Self {
            service: service.to_string(),
            addr,
            frames: handle.as_ref().map(|_| frames),
            closing: Some(closing),
            link,
            writer: handle,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.connected.load(Ordering::Relaxed)
    }

    /// Peer address this publisher sends to
    pub fn peer(&self) -> SocketAddr {
        self.addr
    }

    /// Frames dropped so far: queue full, no subscriber, or peer gone
    pub fn dropped(&self) -> u64 {
        self.link.dropped.load(Ordering::Relaxed)
    }
}

impl OutboundSocket for NetPublisher {
    fn service(&self) -> &str {
        &self.service
    }

    fn send(&mut self, msg: &Message) -> TransportResult<()> {
        if msg.len() > MAX_FRAME_SIZE {
            return Err(TransportError::MessageTooLarge {
                size: msg.len(),
                limit: MAX_FRAME_SIZE,
            });
        }
        let Some(frames) = self.frames.as_ref() else {
            return Err(TransportError::Closed);
        };

        match frames.try_send(msg.as_bytes().to_vec()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.link.drop_frames(1);
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(TransportError::Closed),
        }
    }

    fn dropped(&self) -> u64 {
        NetPublisher::dropped(self)
    }
}

impl Drop for NetPublisher {
    fn drop(&mut self) {
        self.frames.take();
        self.closing.take();
        if let Some(handle) = self.writer.take() {
            let _ = handle.join();
        }
    }
}

/// Errors meaning the peer is gone rather than that the socket is unusable
fn is_disconnect(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::WriteZero
            | io::ErrorKind::TimedOut
            | io::ErrorKind::WouldBlock
    )
}

/// Owner of the connection, running on its own thread
struct Writer {
    service: String,
    addr: SocketAddr,
    config: NetConfig,
    link: Arc<Link>,
    stream: Option<TcpStream>,
    attempts: u32,
    hold_attempts: u32,
    next_attempt: Instant,
}

impl Writer {
    fn run(mut self, queue: Receiver<Vec<u8>>, closed: Receiver<()>) {
        loop {
            if self.stream.is_none() && Instant::now() >= self.next_attempt {
                self.try_connect();
            }

            // Still inside the initial connection window: leave frames queued
            if self.stream.is_none() && self.attempts < self.hold_attempts {
                match closed.recv_timeout(self.until_next_attempt()) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    _ => break,
                }
            }

            let wait = if self.stream.is_some() {
                self.config.reconnect_interval
            } else {
                self.until_next_attempt()
            };
            match queue.recv_timeout(wait) {
                // A closed publisher does not flush: the peer may be stalled
                Ok(_) if closed.try_recv().is_err_and(|e| e.is_disconnected()) => {
                    self.link.drop_frames(1);
                    break;
                }
                Ok(frame) => self.write(&frame),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let unsent = queue.try_iter().count() as u64;
        if unsent > 0 {
            debug!("net {}: {} frame(s) unsent at close", self.service, unsent);
            self.link.drop_frames(unsent);
        }
        self.link.connected.store(false, Ordering::Relaxed);
    }

    fn until_next_attempt(&self) -> Duration {
        self.next_attempt
            .saturating_duration_since(Instant::now())
            .max(Duration::from_millis(1))
    }

    fn try_connect(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
        let delay = if self.attempts < self.hold_attempts {
            self.config.retry_delay
        } else {
            self.config.reconnect_interval
        };
        self.next_attempt = Instant::now() + delay;

        match self.open() {
            Ok(stream) => {
                info!("net {}: connected to subscriber {}", self.service, self.addr);
                self.stream = Some(stream);
                self.link.connected.store(true, Ordering::Relaxed);
            }
            Err(e) => {
                debug!("net {}: cannot reach {}: {}", self.service, self.addr, e);
                if self.attempts == self.hold_attempts {
                    warn!(
                        "net {}: no subscriber at {} after {} attempt(s), will keep retrying",
                        self.service, self.addr, self.attempts
                    );
                }
            }
        }
    }

    fn open(&self) -> TransportResult<TcpStream> {
        let mut stream = TcpStream::connect_timeout(&self.addr, self.config.connect_timeout)
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(self.config.write_timeout))?;
        let hello = Hello::new(&self.service).encode()?;
        write_frame(&mut stream, &hello)?;
        Ok(stream)
    }

    fn write(&mut self, frame: &[u8]) {
        let Some(stream) = self.stream.as_mut() else {
            self.link.drop_frames(1);
            return;
        };
        match write_frame(stream, frame) {
            Ok(()) => {}
            Err(e) => {
                if is_disconnect(e.kind()) {
                    warn!(
                        "net {}: subscriber {} went away ({}), reconnecting",
                        self.service, self.addr, e
                    );
                } else {
                    warn!("net {}: write to {} failed: {}", self.service, self.addr, e);
                }
                // A partly written frame leaves the stream unusable
                self.stream = None;
                self.link.connected.store(false, Ordering::Relaxed);
                self.link.drop_frames(1);
                self.next_attempt = Instant::now() + self.config.reconnect_interval;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn closed_port() -> SocketAddr {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    fn fast_config() -> NetConfig {
        NetConfig {
            retry_delay: Duration::from_millis(5),
            reconnect_interval: Duration::from_millis(20),
            ..Default::default()
        }
    }

    fn wait_until(timeout: Duration, done: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        done()
    }

    #[test]
    fn test_send_without_subscriber_drops() {
        let options = PublishOptions::new("127.0.0.1").wait_for_subscriber(false);
        let mut publisher =
            NetPublisher::connect("carState", closed_port(), &options, &fast_config());

        publisher.send(&Message::from(&b"lost"[..])).unwrap();
        assert!(wait_until(Duration::from_secs(2), || publisher.dropped() == 1));
        assert!(!publisher.is_connected());
    }

    #[test]
    fn test_connect_returns_without_waiting_for_subscriber() {
        let config = NetConfig {
            retry_delay: Duration::from_millis(100),
            ..Default::default()
        };
        let options = PublishOptions::new("127.0.0.1").retries(10);

        let start = Instant::now();
        let publisher = NetPublisher::connect("carState", closed_port(), &options, &config);
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(!publisher.is_connected());

        // Dropping joins the writer promptly even while it is still retrying
        let start = Instant::now();
        drop(publisher);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_frames_held_until_retries_run_out() {
        let options = PublishOptions::new("127.0.0.1").retries(3);
        let mut publisher =
            NetPublisher::connect("carState", closed_port(), &options, &fast_config());

        publisher.send(&Message::from(&b"early"[..])).unwrap();
        // Three attempts 5 ms apart, then the held frame is discarded
        assert!(wait_until(Duration::from_secs(2), || publisher.dropped() == 1));
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let config = NetConfig {
            send_queue: 2,
            retry_delay: Duration::from_secs(10),
            ..Default::default()
        };
        // Holding frames for a long time keeps the queue full
        let options = PublishOptions::new("127.0.0.1").retries(2);
        let mut publisher = NetPublisher::connect("carState", closed_port(), &options, &config);

        for _ in 0..5 {
            publisher.send(&Message::from(&b"x"[..])).unwrap();
        }
        assert_eq!(publisher.dropped(), 3);
    }

    #[test]
    fn test_stalled_subscriber_does_not_block_send() {
        let _ = env_logger::try_init();
        // Accepts the connection but never reads from it
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let acceptor = thread::spawn(move || listener.accept().map(|(stream, _)| stream));

        let options = PublishOptions::new("127.0.0.1").wait_for_subscriber(false);
        let mut publisher = NetPublisher::connect("carState", addr, &options, &fast_config());
        assert!(wait_until(Duration::from_secs(2), || publisher.is_connected()));
        let _held = acceptor.join().unwrap().unwrap();

        let big = Message::new(vec![7; 1024 * 1024]);
        let mut worst = Duration::ZERO;
        for _ in 0..20 {
            let start = Instant::now();
            publisher.send(&big).unwrap();
            worst = worst.max(start.elapsed());
        }
        assert!(worst < Duration::from_millis(50), "slowest send took {:?}", worst);
    }

    #[test]
    fn test_rejects_oversized_message() {
        let options = PublishOptions::new("127.0.0.1").wait_for_subscriber(false);
        let mut publisher =
            NetPublisher::connect("carState", closed_port(), &options, &fast_config());
        let huge = Message::new(vec![0; MAX_FRAME_SIZE + 1]);
        assert!(matches!(
            publisher.send(&huge),
            Err(TransportError::MessageTooLarge { .. })
        ));
    }
}
