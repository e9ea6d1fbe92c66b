//! `anvil environments` command

use std::sync::Arc;

use anyhow::Result;

use anvil::builder::SystemRunner;
use anvil::bundle::{default_providers, BundleProviderRegistry};
use anvil::core::environment::EnvironmentRegistry;

pub fn execute() -> Result<()> {
    let providers = BundleProviderRegistry::new(default_providers(Arc::new(SystemRunner)));
    let mut registry = EnvironmentRegistry::new();
    providers.register_environments(&mut registry)?;

    for env in registry.environments() {
        let aliases = registry.aliases_of(&env);
        if aliases.is_empty() {
            println!("{}", env.name());
        } else {
            println!("{} ({})", env.name(), aliases.join(", "));
        }
    }

    Ok(())
}
