//! Built-in command handlers and the startup registration table.

use std::sync::Arc;

use crate::{
    command::Tier,
    registry::CommandRegistry,
    Result,
};

mod broadcast;
mod menu;
mod ping;
mod shutdown;
mod stats;

pub use broadcast::Broadcast;
pub use menu::{render_menu, Menu};
pub use ping::Ping;
pub use shutdown::Shutdown;
pub use stats::{format_uptime, process_memory_mb, Stats};

/// Register every built-in command in its tier.
pub fn builtin_registry() -> Result<CommandRegistry> {
    let mut registry = CommandRegistry::new();

    registry.register(Tier::User, Arc::new(Menu))?;
    registry.register(Tier::User, Arc::new(Ping))?;
    registry.register(Tier::User, Arc::new(Stats))?;

    registry.register(Tier::Admin, Arc::new(Broadcast::default()))?;
    registry.register(Tier::Admin, Arc::new(Shutdown::default()))?;

    Ok(registry)
}
