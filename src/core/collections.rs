//! Collection aliases and small containers used throughout the crate.

mod aliases;
mod helpers;

pub use aliases::*;
pub use helpers::*;
