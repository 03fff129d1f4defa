mod agent_handlers;
mod events_handlers;

pub use self::agent_handlers::*;
pub use self::events_handlers::*;
