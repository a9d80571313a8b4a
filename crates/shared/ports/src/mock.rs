//! In-memory mock transport
//!
//! Every socket created by a [`MockContext`] shares state with the context,
//! so a test can keep a clone of the context, feed inbound messages, script
//! send failures and inspect what was published while the relay owns the
//! sockets.

use crate::error::{TransportError, TransportResult};
use crate::socket::{
    Context, InboundSocket, OutboundSocket, Poller, PublishOptions, SocketId, SubscribeOptions,
};
use msgbridge_core::Message;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Per-service state shared between the context and its sockets
#[derive(Debug, Default)]
struct Topic {
    /// Messages waiting on the inbound side
    pending: VecDeque<Message>,
    /// Ready reports with nothing to receive
    spurious: usize,
    /// Messages accepted on the outbound side
    sent: Vec<Message>,
    /// Errors returned by the next sends, in order
    send_script: VecDeque<TransportError>,
    /// Error returned by every send once the script is exhausted
    fail_always: Option<TransportError>,
    send_attempts: usize,
}

#[derive(Debug, Default)]
struct MockState {
    topics: HashMap<String, Topic>,
    fail_subscribe: HashSet<String>,
    fail_publish: HashSet<String>,
    subscriptions: Vec<(String, SubscribeOptions)>,
    publications: Vec<(String, PublishOptions)>,
}

type Shared = Arc<Mutex<MockState>>;

/// Mock transport context
#[derive(Debug, Clone, Default)]
pub struct MockContext {
    name: String,
    state: Shared,
}

impl MockContext {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Shared::default(),
        }
    }

    /// Queue a message on the inbound side of `service`
    pub fn inject(&self, service: &str, data: &[u8]) {
        let mut state = self.state.lock();
        let topic = state.topics.entry(service.to_string()).or_default();
        topic.pending.push_back(Message::from_slice(data));
    }

    /// Make `service` report ready `count` times without a message
    pub fn add_spurious_wakeups(&self, service: &str, count: usize) {
        let mut state = self.state.lock();
        state.topics.entry(service.to_string()).or_default().spurious += count;
    }

    /// Return these errors from the next sends on `service`, in order
    pub fn script_send_errors(&self, service: &str, errors: Vec<TransportError>) {
        let mut state = self.state.lock();
        let topic = state.topics.entry(service.to_string()).or_default();
        topic.send_script.extend(errors);
    }

    /// Fail every send on `service` with `error`
    pub fn fail_sends_always(&self, service: &str, error: TransportError) {
        let mut state = self.state.lock();
        state.topics.entry(service.to_string()).or_default().fail_always = Some(error);
    }

    /// Make subscribing to `service` fail
    pub fn fail_subscribe(&self, service: &str) {
        self.state.lock().fail_subscribe.insert(service.to_string());
    }

    /// Make publishing `service` fail
    pub fn fail_publish(&self, service: &str) {
        self.state.lock().fail_publish.insert(service.to_string());
    }

    /// Messages successfully sent on `service`
    pub fn sent(&self, service: &str) -> Vec<Message> {
        self.state
            .lock()
            .topics
            .get(service)
            .map(|t| t.sent.clone())
            .unwrap_or_default()
    }

    /// Number of send calls made on `service`, failed ones included
    pub fn send_attempts(&self, service: &str) -> usize {
        self.state
            .lock()
            .topics
            .get(service)
            .map_or(0, |t| t.send_attempts)
    }

    /// Messages not yet received on `service`
    pub fn pending(&self, service: &str) -> usize {
        self.state
            .lock()
            .topics
            .get(service)
            .map_or(0, |t| t.pending.len())
    }

    /// Every successful subscribe call, in order
    pub fn subscriptions(&self) -> Vec<(String, SubscribeOptions)> {
        self.state.lock().subscriptions.clone()
    }

    /// Every successful publish call, in order
    pub fn publications(&self) -> Vec<(String, PublishOptions)> {
        self.state.lock().publications.clone()
    }
}

impl Context for MockContext {
    type Inbound = MockInbound;
    type Outbound = MockOutbound;
    type Poller = MockPoller;

    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(
        &self,
        service: &str,
        options: &SubscribeOptions,
    ) -> TransportResult<Self::Inbound> {
        let mut state = self.state.lock();
        if state.fail_subscribe.contains(service) {
            return Err(TransportError::Connection(format!(
                "mock subscribe refused for {}",
                service
            )));
        }
        state.topics.entry(service.to_string()).or_default();
        state
            .subscriptions
            .push((service.to_string(), options.clone()));
        Ok(MockInbound {
            service: service.to_string(),
            state: self.state.clone(),
        })
    }

    fn publish(&self, service: &str, options: &PublishOptions) -> TransportResult<Self::Outbound> {
        let mut state = self.state.lock();
        if state.fail_publish.contains(service) {
            return Err(TransportError::Connection(format!(
                "mock publish refused for {}",
                service
            )));
        }
        state.topics.entry(service.to_string()).or_default();
        state
            .publications
            .push((service.to_string(), options.clone()));
        Ok(MockOutbound {
            service: service.to_string(),
            state: self.state.clone(),
        })
    }

    fn poller(&self) -> Self::Poller {
        MockPoller {
            sockets: Vec::new(),
            state: self.state.clone(),
        }
    }
}

/// Mock inbound socket
#[derive(Debug)]
pub struct MockInbound {
    service: String,
    state: Shared,
}

impl InboundSocket for MockInbound {
    fn service(&self) -> &str {
        &self.service
    }

    fn receive(&mut self) -> TransportResult<Option<Message>> {
        let mut state = self.state.lock();
        let Some(topic) = state.topics.get_mut(&self.service) else {
            return Ok(None);
        };
        if let Some(msg) = topic.pending.pop_front() {
            return Ok(Some(msg));
        }
        topic.spurious = topic.spurious.saturating_sub(1);
        Ok(None)
    }
}

/// Mock outbound socket
#[derive(Debug)]
pub struct MockOutbound {
    service: String,
    state: Shared,
}

impl OutboundSocket for MockOutbound {
    fn service(&self) -> &str {
        &self.service
    }

    fn send(&mut self, msg: &Message) -> TransportResult<()> {
        let mut state = self.state.lock();
        let topic = state.topics.entry(self.service.clone()).or_default();
        topic.send_attempts += 1;
        if let Some(err) = topic.send_script.pop_front() {
            return Err(err);
        }
        if let Some(err) = &topic.fail_always {
            return Err(err.clone());
        }
        topic.sent.push(msg.clone());
        Ok(())
    }
}

/// Mock poller: a socket is ready while its topic has pending messages
/// or spurious wakeups left
#[derive(Debug)]
pub struct MockPoller {
    sockets: Vec<MockInbound>,
    state: Shared,
}

impl MockPoller {
    fn ready(&self) -> Vec<SocketId> {
        let state = self.state.lock();
        self.sockets
            .iter()
            .enumerate()
            .filter(|(_, socket)| {
                state
                    .topics
                    .get(&socket.service)
                    .is_some_and(|t| !t.pending.is_empty() || t.spurious > 0)
            })
            .map(|(i, _)| SocketId(i))
            .collect()
    }
}

impl Poller for MockPoller {
    type Socket = MockInbound;

    fn register(&mut self, socket: MockInbound) -> SocketId {
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
            thread::sleep((deadline - now).min(Duration::from_millis(1)));
        }
    }

    fn socket_mut(&mut self, id: SocketId) -> Option<&mut MockInbound> {
        self.sockets.get_mut(id.0)
    }

    fn len(&self) -> usize {
        self.sockets.len()
    }
}
