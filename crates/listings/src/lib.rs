//! Property listing marketplace core: listing lifecycle, engagement counters, search, and
//! response assembly over pluggable store, identity, and object storage collaborators.

pub mod catalog;
pub mod config;
pub mod error;
pub mod identity;
pub mod storage;
pub mod telemetry;
