mod session_driver;
mod session_handle;

pub use session_driver::*;
pub use session_handle::*;
