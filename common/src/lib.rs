pub mod config;
pub mod env;
pub mod fs;
pub mod math;

pub use config::*;
pub use env::*;
pub use fs::*;
pub use math::*;
