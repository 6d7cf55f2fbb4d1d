pub mod agent;
pub mod factory;
pub mod runner;
pub mod validation;
