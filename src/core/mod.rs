//! Key recovery and decryption pipeline

pub mod decrypt;
pub mod key;
pub mod resolver;
pub mod table;

pub use decrypt::*;
pub use key::*;
pub use resolver::*;
pub use table::*;
