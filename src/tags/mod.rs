pub mod meta;
pub mod resolver;
pub mod table;

pub use meta::*;
pub use resolver::*;
pub use table::*;
