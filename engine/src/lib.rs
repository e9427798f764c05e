pub mod action;
pub mod board;
pub mod value;

pub use crate::action::*;
pub use crate::board::*;
pub use crate::value::*;
