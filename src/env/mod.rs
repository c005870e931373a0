pub mod environment;
pub mod var;

pub use environment::*;
pub use var::*;
