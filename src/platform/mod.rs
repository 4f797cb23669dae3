//! Player scripts, HTTP fetching and backend responses

pub mod client;
pub mod player;
pub mod sources;

pub use client::*;
pub use player::*;
pub use sources::*;
