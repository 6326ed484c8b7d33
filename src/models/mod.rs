//! Data models

pub mod event;
pub mod stats;

pub use event::*;
pub use stats::*;
