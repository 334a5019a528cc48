//! CLI command implementations

pub mod cache;
pub mod config;
pub mod fingerprint;
pub mod lifecycle;

pub use cache::execute as cache;
pub use config::execute as config;
pub use fingerprint::execute as fingerprint;
pub use lifecycle::{bootstrap, deploy, destroy, synth};
