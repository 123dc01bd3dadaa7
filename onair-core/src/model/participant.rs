use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ParticipantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Cohost,
    Listener,
}

impl Role {
    /// Hosts and cohosts may broadcast; listeners only receive.
    pub fn is_speaker(self) -> bool {
        matches!(self, Role::Host | Role::Cohost)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub role: Role,
    pub active: bool,
}

impl Participant {
    pub fn new(id: ParticipantId, role: Role) -> Self {
        Self {
            id,
            role,
            active: true,
        }
    }

    pub fn is_active_speaker(&self) -> bool {
        self.active && self.role.is_speaker()
    }

    pub fn is_active_listener(&self) -> bool {
        self.active && self.role == Role::Listener
    }
}
