pub mod blocklist;
pub mod count;
pub mod embed;
pub mod error;
pub mod legacy;
pub mod router;
pub mod state;
pub mod submissions;

pub use router::router;
pub use state::{AppState, AppStateInner};
