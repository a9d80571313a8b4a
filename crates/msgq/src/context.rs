//! Transport context: creates sockets on segment files

use crate::config::MsgqConfig;
use crate::poller::MsgqPoller;
use crate::ring::{RingReader, RingWriter};
use crate::segment::Segment;
use crate::socket::{MsgqPublisher, MsgqSubscriber};
use log::debug;
use msgbridge_ports::{
    Context, PublishOptions, SubscribeOptions, TransportError, TransportResult,
};
use std::path::PathBuf;

/// Shared-memory transport context
#[derive(Debug, Clone, Default)]
pub struct MsgqContext {
    config: MsgqConfig,
}

impl MsgqContext {
    pub fn new(config: MsgqConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MsgqConfig {
        &self.config
    }

    fn open_segment(&self, service: &str) -> TransportResult<Segment> {
        let path = self.segment_path(service)?;
        std::fs::create_dir_all(&self.config.path).map_err(|e| {
            TransportError::Io(format!(
                "cannot create segment directory {}: {}",
                self.config.path.display(),
                e
            ))
        })?;
        Segment::open(&path, self.config.segment_size)
    }

    fn segment_path(&self, service: &str) -> TransportResult<PathBuf> {
        if service.is_empty() || service.contains(['/', '\\']) || service.starts_with('.') {
            return Err(TransportError::Config(format!(
                "invalid service name for a segment: {:?}",
                service
            )));
        }
        Ok(self.config.segment_path(service))
    }
}

impl Context for MsgqContext {
    type Inbound = MsgqSubscriber;
    type Outbound = MsgqPublisher;
    type Poller = MsgqPoller;

    fn name(&self) -> &str {
        "msgq"
    }

    /// Segments are host-local, so the address is not used
    fn subscribe(
        &self,
        service: &str,
        options: &SubscribeOptions,
    ) -> TransportResult<MsgqSubscriber> {
        let segment = self.open_segment(service)?;
        debug!(
            "msgq subscriber on {} (conflate={})",
            segment.path().display(),
            options.conflate
        );
        Ok(MsgqSubscriber::new(
            service,
            RingReader::new(segment),
            options.conflate,
        ))
    }

    /// Publishers never wait for readers, so retry options are not used
    fn publish(&self, service: &str, _options: &PublishOptions) -> TransportResult<MsgqPublisher> {
        let segment = self.open_segment(service)?;
        debug!("msgq publisher on {}", segment.path().display());
        Ok(MsgqPublisher::new(service, RingWriter::new(segment)))
    }

    fn poller(&self) -> MsgqPoller {
        MsgqPoller::new()
    }
}
