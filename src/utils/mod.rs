//! Utility functions for cdn-resolver

pub mod cache;
pub mod retry;

pub use cache::*;
pub use retry::*;
