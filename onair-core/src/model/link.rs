use serde::{Deserialize, Serialize};
use std::fmt;

/// Local identity of one peer link. Never reused within an orchestrator, so a
/// link recreated for the same remote is always distinguishable from the old one.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    /// Local participant speaks to the remote.
    Outbound,
    /// Local participant listens to the remote.
    Inbound,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Idle,
    Offering,
    AwaitingAnswer,
    Negotiating,
    Connected,
    Closed,
    Failed,
}

impl LinkState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LinkState::Closed | LinkState::Failed)
    }

    pub fn can_transition_to(self, next: LinkState) -> bool {
        use LinkState::*;

        if self.is_terminal() {
            return false;
        }
        if next.is_terminal() {
            return true;
        }

        matches!(
            (self, next),
            (Idle, Offering)
                | (Idle, Negotiating)
                | (Offering, AwaitingAnswer)
                | (AwaitingAnswer, Negotiating)
                | (Negotiating, Connected)
        )
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Idle => "Idle",
            LinkState::Offering => "Offering",
            LinkState::AwaitingAnswer => "AwaitingAnswer",
            LinkState::Negotiating => "Negotiating",
            LinkState::Connected => "Connected",
            LinkState::Closed => "Closed",
            LinkState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// What the presentation layer sees for one remote participant.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct LinkStatus {
    pub link_id: LinkId,
    pub direction: LinkDirection,
    pub state: LinkState,
    pub receiving_audio: bool,
}
