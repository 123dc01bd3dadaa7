mod memory_store;
mod signal_store;

pub use memory_store::*;
pub use signal_store::*;
