mod personas;
mod registry;

pub use personas::Critic;
pub use registry::{Agent, AgentRegistry};
