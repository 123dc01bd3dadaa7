mod link_event;
mod link_worker;
mod orchestrator;
mod peer_link;
mod status;
mod topology;

pub use link_event::*;
pub use orchestrator::*;
pub use peer_link::*;
pub use status::*;
pub use topology::*;
