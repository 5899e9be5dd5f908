pub mod cache;
pub mod conflict;
pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod hash;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod sufficiency;
