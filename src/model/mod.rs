pub mod items;
pub mod support;

pub use items::*;
pub use support::*;
