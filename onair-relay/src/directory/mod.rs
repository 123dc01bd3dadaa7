mod memory_directory;
mod role_directory;

pub use memory_directory::*;
pub use role_directory::*;
