//! Publisher and subscriber sockets

use crate::ring::{RingReader, RingWriter};
use msgbridge_core::Message;
use msgbridge_ports::{InboundSocket, OutboundSocket, TransportResult};

/// Publishing end of one service's segment
pub struct MsgqPublisher {
    service: String,
    writer: RingWriter,
}

impl MsgqPublisher {
    pub(crate) fn new(service: &str, writer: RingWriter) -> Self {
        Self {
            service: service.to_string(),
            writer,
        }
    }
}

impl OutboundSocket for MsgqPublisher {
    fn service(&self) -> &str {
        &self.service
    }

    fn send(&mut self, msg: &Message) -> TransportResult<()> {
        self.writer.write(msg.as_bytes())
    }
}

/// Subscribing end of one service's segment
pub struct MsgqSubscriber {
    service: String,
    reader: RingReader,
    conflate: bool,
}

impl MsgqSubscriber {
    pub(crate) fn new(service: &str, reader: RingReader, conflate: bool) -> Self {
        Self {
            service: service.to_string(),
            reader,
            conflate,
        }
    }

    /// Whether a message is waiting
    pub fn has_pending(&self) -> bool {
        self.reader.has_pending()
    }
}

impl InboundSocket for MsgqSubscriber {
    fn service(&self) -> &str {
        &self.service
    }

    fn receive(&mut self) -> TransportResult<Option<Message>> {
        if self.conflate {
            Ok(self.reader.read_latest())
        } else {
            Ok(self.reader.read())
        }
    }
}
