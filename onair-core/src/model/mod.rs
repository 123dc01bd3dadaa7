mod api;
mod link;
mod participant;
mod session;
mod signal;
mod signaling;

pub use api::{ParticipantUpdate, PurgeQuery, PurgeResponse, SendSignalRequest, SignalQuery};
pub use link::{LinkDirection, LinkId, LinkState, LinkStatus};
pub use participant::{Participant, ParticipantId, Role};
pub use session::SessionId;
pub use signal::{NewSignal, ProcessedSignalKey, Signal, SignalId, SignalKind};
pub use signaling::IceServerConfig;
