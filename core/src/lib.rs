pub mod agent;
pub mod config;
pub mod error;
pub mod executor;
pub mod retry;
pub mod tasks;
pub mod util;
pub mod workflow;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
