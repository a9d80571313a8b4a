use clap::Parser;
use msgbridge_relay::BridgeConfig;

/// Forward local shared-memory services to a network peer
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "bridge", version, about)]
pub struct Args {
    /// Address of the peer receiving the bridged services
    #[arg(default_value = "127.0.0.1")]
    pub peer_address: String,

    /// Services to bridge, matched as substrings of this string.
    /// Empty bridges every service.
    #[arg(default_value = "")]
    pub allow_list: String,
}

impl Args {
    pub fn to_config(&self) -> BridgeConfig {
        BridgeConfig::new(&self.peer_address, &self.allow_list)
    }
}
