mod backend;
mod config;
mod directory;
mod orchestrator;
mod pipeline;
mod session;
mod store;
mod transport;

pub use backend::*;
pub use config::*;
pub use directory::*;
pub use orchestrator::*;
pub use pipeline::*;
pub use session::*;
pub use store::*;
pub use transport::*;
