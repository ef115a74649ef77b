//! Data models

mod classification;
mod fact;
mod hierarchy;
mod rule;

pub use classification::*;
pub use fact::*;
pub use hierarchy::*;
pub use rule::*;
