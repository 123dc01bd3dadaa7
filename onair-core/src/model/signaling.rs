use crate::utils::DEFAULT_STUN_SERVERS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(urls: Vec<String>) -> Self {
        Self {
            urls,
            username: None,
            credential: None,
        }
    }

    /// Public reflection servers used when nothing else is configured.
    pub fn public_stun() -> Self {
        Self::stun(DEFAULT_STUN_SERVERS.iter().map(|s| s.to_string()).collect())
    }
}
