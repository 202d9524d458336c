//! CLI commands for the reconciliation service.

pub mod context;
pub mod decode_ticker;
pub mod normalize;
pub mod reconcile;
pub mod watch;

pub use decode_ticker::{run_decode_ticker, DecodeTickerArgs};
pub use normalize::{run_normalize, NormalizeArgs};
pub use reconcile::{run_reconcile, ReconcileArgs};
pub use watch::{run_watch, WatchArgs};
