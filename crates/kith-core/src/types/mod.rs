//! Core types for kith.

mod action;
mod contact;
mod signals;

pub use action::*;
pub use contact::*;
pub use signals::*;
