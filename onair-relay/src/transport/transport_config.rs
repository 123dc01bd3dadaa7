use onair_core::IceServerConfig;

/// WebRTC settings. Only STUN discovery is expected; no relay servers.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::public_stun()],
        }
    }
}

impl TransportConfig {
    /// Host candidates only. Used for loopback and LAN setups.
    pub fn host_only() -> Self {
        Self {
            ice_servers: Vec::new(),
        }
    }
}
