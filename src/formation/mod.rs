pub mod agent;
pub mod constants;
pub mod events;
pub mod lifecycle;
pub mod pattern;
pub mod registry;
pub mod state;
pub mod steering;
pub mod template;

pub use agent::{Agent, AgentHandle, AgentId};
pub use events::FormationEvent;
pub use pattern::FormationType;
pub use registry::{FormationError, FormationRegistry};
pub use state::FormationId;
