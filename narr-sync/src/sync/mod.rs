//! Token highlight synchronization
//!
//! Media clock adapter, nearest-token search and the controller that keeps
//! the published hit in step with a host clock.

pub mod clock;
pub mod controller;
pub mod diagnostics;
pub mod search;

pub use clock::MediaClock;
pub use controller::{SyncController, SyncState};
pub use diagnostics::SyncDiagnostics;
pub use search::{find_nearest_token, is_large_seek};
