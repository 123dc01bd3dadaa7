mod connection_wrapper;
mod local_audio;
mod peer_transport;
mod transport_config;
mod transport_event;

pub use connection_wrapper::*;
pub use local_audio::*;
pub use peer_transport::*;
pub use transport_config::*;
pub use transport_event::*;
