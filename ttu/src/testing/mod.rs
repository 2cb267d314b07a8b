pub mod context;
pub use context::*;

pub mod temp;
pub use temp::*;
