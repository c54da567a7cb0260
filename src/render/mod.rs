pub mod command;
pub mod format;
pub mod gravity;
pub mod linker;
pub mod table;

pub use command::*;
pub use format::*;
pub use gravity::*;
pub use linker::*;
pub use table::*;
