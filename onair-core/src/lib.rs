pub mod clock;
pub mod model;
pub mod utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use model::*;
