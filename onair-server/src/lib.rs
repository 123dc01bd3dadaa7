mod api;
mod retention;
mod state;

pub use api::*;
pub use retention::*;
pub use state::*;
