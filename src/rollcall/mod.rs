pub mod audit;
pub mod classify;
pub mod config;
pub mod daemon_lock;
pub mod engine;
pub mod ledger;
pub mod paths;
pub mod payload;
pub mod queue;
pub mod reconcile;
pub mod store;
pub mod timestamp;
pub mod util;
pub mod watcher;
