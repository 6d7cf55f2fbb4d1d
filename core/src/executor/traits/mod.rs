pub mod prompt;
pub mod runner;

pub use prompt::*;
pub use runner::*;
