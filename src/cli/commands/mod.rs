//! CLI command implementations

pub mod cache;
pub mod config;
pub mod convert;
pub mod profile;

pub use cache::execute as cache;
pub use config::execute as config;
pub use convert::execute as convert;
pub use profile::execute as profile;
