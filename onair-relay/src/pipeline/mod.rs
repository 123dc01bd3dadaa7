mod dedup;
mod poller;
mod sweeper;

pub use dedup::*;
pub use poller::*;
pub use sweeper::*;
