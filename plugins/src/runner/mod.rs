mod agent;

pub use agent::{implement_prompt, AgentTaskRunner};
