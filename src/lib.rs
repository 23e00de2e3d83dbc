pub mod categories;
pub mod config;
pub mod constants;
#[cfg(feature = "db")]
pub mod db;
pub mod domain;
pub mod error;
pub mod export;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod registry;
pub mod resolution;
pub mod sources;
pub mod storage;
