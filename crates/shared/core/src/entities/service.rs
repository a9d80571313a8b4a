use serde::{Deserialize, Serialize};

/// A named logical message stream
///
/// Identity is by name only. The remaining fields are registry metadata:
/// the bridge reads `name`, and the network transport resolves `port`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Unique service name (e.g., "carState")
    pub name: String,
    /// TCP port used by the network transport
    pub port: u16,
    /// Whether the service is recorded by loggers
    pub should_log: bool,
    /// Expected publish frequency in Hz (0 = event driven)
    pub frequency: f64,
    /// Keep one in `decimation` messages when logging a reduced stream
    pub decimation: Option<u32>,
}

impl Service {
    pub fn new(name: &str, port: u16) -> Self {
        Self {
            name: name.to_string(),
            port,
            should_log: true,
            frequency: 0.0,
            decimation: None,
        }
    }

    /// Whether the service publishes on a fixed schedule
    pub fn is_periodic(&self) -> bool {
        self.frequency > 0.0
    }
}
