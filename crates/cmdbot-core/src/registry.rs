use std::{collections::HashMap, sync::Arc};

use crate::{
    command::{Command, CommandSpec, Tier},
    errors::Error,
    Result,
};

#[derive(Default)]
struct Partition {
    by_name: HashMap<String, Arc<dyn Command>>,
    aliases: HashMap<String, String>,
    order: Vec<String>,
}

impl Partition {
    fn primary(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.by_name.get(name).cloned()
    }

    fn alias(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.aliases.get(name).and_then(|primary| self.primary(primary))
    }
}

/// A command found by [`CommandRegistry::resolve`].
#[derive(Clone)]
pub struct Resolved {
    pub tier: Tier,
    pub command: Arc<dyn Command>,
}

/// Command table with two disjoint partitions, built once at startup.
///
/// Resolution order: admin primary names, user primary names, admin aliases,
/// user aliases. Admin names therefore shadow user names with the same label,
/// and an alias never hides a primary name.
#[derive(Default)]
pub struct CommandRegistry {
    users: Partition,
    admins: Partition,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tier: Tier, command: Arc<dyn Command>) -> Result<()> {
        let spec = command.spec();
        let name = spec.name.trim().to_lowercase();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(Error::Config(format!(
                "invalid command name {:?}",
                spec.name
            )));
        }

        let part = self.partition_mut(tier);
        if part.by_name.contains_key(&name) {
            return Err(Error::Config(format!(
                "duplicate {} command: {name}",
                tier.as_str()
            )));
        }

        for alias in spec.aliases {
            let alias = alias.trim().to_lowercase();
            if alias.is_empty() || alias == name {
                continue;
            }
            if let Some(existing) = part.aliases.get(&alias) {
                tracing::warn!(
                    %alias,
                    %existing,
                    command = %name,
                    "alias already taken, ignoring"
                );
                continue;
            }
            part.aliases.insert(alias, name.clone());
        }

        part.order.push(name.clone());
        part.by_name.insert(name, command);
        Ok(())
    }

    /// `name` must already be lower-cased.
    pub fn resolve(&self, name: &str) -> Option<Resolved> {
        if name.is_empty() {
            return None;
        }

        let hit = |tier: Tier, command: Option<Arc<dyn Command>>| {
            command.map(|command| Resolved { tier, command })
        };

        hit(Tier::Admin, self.admins.primary(name))
            .or_else(|| hit(Tier::User, self.users.primary(name)))
            .or_else(|| hit(Tier::Admin, self.admins.alias(name)))
            .or_else(|| hit(Tier::User, self.users.alias(name)))
    }

    /// Specs of one tier in registration order.
    pub fn specs(&self, tier: Tier) -> Vec<CommandSpec> {
        let part = self.partition(tier);
        part.order
            .iter()
            .filter_map(|name| part.by_name.get(name))
            .map(|c| c.spec())
            .collect()
    }

    pub fn len(&self, tier: Tier) -> usize {
        self.partition(tier).by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.by_name.is_empty() && self.admins.by_name.is_empty()
    }

    fn partition(&self, tier: Tier) -> &Partition {
        match tier {
            Tier::User => &self.users,
            Tier::Admin => &self.admins,
        }
    }

    fn partition_mut(&mut self, tier: Tier) -> &mut Partition {
        match tier {
            Tier::User => &mut self.users,
            Tier::Admin => &mut self.admins,
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{command::CommandContext, messaging::types::IncomingMessage};

    struct Named(CommandSpec);

    #[async_trait]
    impl Command for Named {
        fn spec(&self) -> CommandSpec {
            self.0
        }

        async fn execute(
            &self,
            _msg: &IncomingMessage,
            _args: &[String],
            _ctx: &CommandContext,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn cmd(name: &'static str, aliases: &'static [&'static str]) -> Arc<dyn Command> {
        Arc::new(Named(CommandSpec {
            name,
            description: "",
            usage: name,
            aliases,
        }))
    }

    fn registry() -> CommandRegistry {
        let mut r = CommandRegistry::new();
        r.register(Tier::User, cmd("ping", &["p"])).unwrap();
        r.register(Tier::User, cmd("menu", &["help", "bc"])).unwrap();
        r.register(Tier::User, cmd("status", &[])).unwrap();
        r.register(Tier::Admin, cmd("broadcast", &["bc"])).unwrap();
        r.register(Tier::Admin, cmd("status", &["p"])).unwrap();
        r
    }

    #[test]
    fn admin_names_shadow_user_names() {
        let r = registry();
        let hit = r.resolve("status").unwrap();
        assert_eq!(hit.tier, Tier::Admin);
        assert_eq!(hit.command.spec().name, "status");
        assert_eq!(r.resolve("ping").unwrap().tier, Tier::User);
    }

    #[test]
    fn primary_names_win_over_aliases() {
        let r = registry();
        // "p" is an admin alias of status and a user alias of ping: admin alias wins,
        // but only because no primary name "p" exists.
        assert_eq!(r.resolve("p").unwrap().command.spec().name, "status");
        assert_eq!(r.resolve("bc").unwrap().command.spec().name, "broadcast");
        assert_eq!(r.resolve("help").unwrap().command.spec().name, "menu");
    }

    #[test]
    fn unknown_and_empty_names_are_not_found() {
        let r = registry();
        assert!(r.resolve("nope").is_none());
        assert!(r.resolve("").is_none());
    }

    #[test]
    fn duplicate_primary_in_same_tier_is_rejected() {
        let mut r = registry();
        assert!(matches!(
            r.register(Tier::User, cmd("ping", &[])),
            Err(Error::Config(_))
        ));
        assert!(r.register(Tier::Admin, cmd("ping", &[])).is_ok());
    }

    #[test]
    fn specs_keep_registration_order() {
        let r = registry();
        let names: Vec<_> = r.specs(Tier::User).iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["ping", "menu", "status"]);
        assert_eq!(r.len(Tier::Admin), 2);
    }
}
