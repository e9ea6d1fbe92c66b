//! Target and host environments.
//!
//! An [`Environment`] names a platform a build can run on or produce code
//! for. The [`EnvironmentRegistry`] holds every environment known to one build
//! invocation, keyed by lower-cased canonical name plus any aliases.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use thiserror::Error;

/// Discriminator used for architecture-independent content.
pub const NOARCH_NAME: &str = "noarch";

/// Error raised by environment registration and lookup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("duplicate environment name `{0}`")]
    DuplicateName(String),

    #[error("alias `{alias}` provided for unknown environment `{target}`")]
    UnknownTarget { alias: String, target: String },

    #[error("couldn't find any environment matching `{0}`")]
    NotFound(String),
}

#[derive(Debug)]
struct EnvironmentInner {
    name: String,
    canonical: String,
    shared_suffix: String,
    aliases: Vec<String>,
}

/// A named platform descriptor.
///
/// Cheap to clone. Two environments are equal when their canonical names are
/// equal.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvironmentInner>,
}

impl Environment {
    /// Create an environment with the given display name and shared library
    /// suffix (including the leading dot).
    pub fn new(name: impl Into<String>, shared_suffix: impl Into<String>) -> Self {
        Self::with_aliases(name, shared_suffix, Vec::<String>::new())
    }

    /// Create an environment that also answers to the given aliases.
    pub fn with_aliases(
        name: impl Into<String>,
        shared_suffix: impl Into<String>,
        aliases: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let name = name.into();
        Environment {
            inner: Arc::new(EnvironmentInner {
                canonical: name.to_lowercase(),
                name,
                shared_suffix: shared_suffix.into(),
                aliases: aliases.into_iter().map(|a| a.into().to_lowercase()).collect(),
            }),
        }
    }

    pub fn linux_32() -> Self {
        Self::new("Linux_32", ".so")
    }

    pub fn linux_64() -> Self {
        Self::new("Linux_64", ".so")
    }

    pub fn win_32() -> Self {
        Self::new("Win_32", ".dll")
    }

    pub fn win_64() -> Self {
        Self::new("Win_64", ".dll")
    }

    pub fn solaris_32() -> Self {
        Self::new("Solaris_32", ".so")
    }

    pub fn solaris_64() -> Self {
        Self::new("Solaris_64", ".so")
    }

    pub fn solaris_sparc() -> Self {
        Self::new("Solaris_sparc", ".so")
    }

    pub fn macosx_32() -> Self {
        Self::new("MacOSX_32", ".dylib")
    }

    pub fn macosx_64() -> Self {
        Self::new("MacOSX_64", ".dylib")
    }

    /// Display name, e.g. `Linux_64`.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Lower-cased canonical name, e.g. `linux_64`.
    pub fn canonical_name(&self) -> &str {
        &self.inner.canonical
    }

    /// Shared library suffix including the dot, e.g. `.so`.
    pub fn shared_library_suffix(&self) -> &str {
        &self.inner.shared_suffix
    }

    /// Names under which per-environment content may be stored: the canonical
    /// name first, then every alias registered on the value itself.
    pub fn candidate_names(&self) -> Vec<&str> {
        std::iter::once(self.canonical_name())
            .chain(self.inner.aliases.iter().map(String::as_str))
            .collect()
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        self.inner.canonical == other.inner.canonical
    }
}

impl Eq for Environment {}

impl Hash for Environment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.canonical.hash(state);
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment({})", self.inner.canonical)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

/// Registry of known environments and aliases for one build invocation.
#[derive(Debug, Default)]
pub struct EnvironmentRegistry {
    environments: HashMap<String, Environment>,
}

impl EnvironmentRegistry {
    /// Create an empty registry.
    pub fn empty() -> Self {
        EnvironmentRegistry {
            environments: HashMap::new(),
        }
    }

    /// Create a registry with the well-known environments pre-registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        // Fresh registry, so none of these can collide.
        let builtin = [
            Environment::linux_32(),
            Environment::linux_64(),
            Environment::win_32(),
            Environment::win_64(),
            Environment::solaris_32(),
            Environment::solaris_64(),
            Environment::solaris_sparc(),
        ];
        for env in builtin {
            registry
                .environments
                .insert(env.canonical_name().to_string(), env);
        }
        let aliases = [
            ("linux_i386", Environment::linux_32()),
            ("linux_x64", Environment::linux_64()),
        ];
        for (alias, env) in aliases {
            registry.environments.insert(alias.to_string(), env);
        }

        registry
    }

    /// Register one or more environments.
    ///
    /// Fails on the first canonical name that is already registered (either
    /// as an environment or as an alias). Environments before the failing one
    /// stay registered.
    pub fn register(
        &mut self,
        envs: impl IntoIterator<Item = Environment>,
    ) -> Result<(), EnvironmentError> {
        for env in envs {
            let key = env.canonical_name().to_string();
            if self.environments.contains_key(&key) {
                return Err(EnvironmentError::DuplicateName(env.name().to_string()));
            }
            tracing::debug!("Added environment: {}", env.name());
            self.environments.insert(key, env);
        }
        Ok(())
    }

    /// Register `alias` as another name for the environment `target`.
    pub fn add_alias(&mut self, alias: &str, target: &str) -> Result<(), EnvironmentError> {
        let env = self
            .lookup(target)
            .ok_or_else(|| EnvironmentError::UnknownTarget {
                alias: alias.to_string(),
                target: target.to_string(),
            })?;

        let key = alias.to_lowercase();
        if self.environments.contains_key(&key) {
            return Err(EnvironmentError::DuplicateName(alias.to_string()));
        }

        tracing::debug!("Added environment alias: {} = {}", alias, env.name());
        self.environments.insert(key, env);
        Ok(())
    }

    /// Case-insensitive lookup by canonical name or alias.
    pub fn lookup(&self, name: &str) -> Option<Environment> {
        self.environments.get(&name.to_lowercase()).cloned()
    }

    /// Lookup that requires the environment to exist.
    pub fn get(&self, name: &str) -> Result<Environment, EnvironmentError> {
        self.lookup(name)
            .ok_or_else(|| EnvironmentError::NotFound(name.to_string()))
    }

    /// Resolve several names at once, failing on the first unknown one.
    pub fn get_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Environment>, EnvironmentError> {
        names.iter().map(|n| self.get(n.as_ref().trim())).collect()
    }

    /// Aliases registered for the given environment (excluding its canonical
    /// name), sorted.
    pub fn aliases_of(&self, env: &Environment) -> Vec<String> {
        let mut aliases: Vec<String> = self
            .environments
            .iter()
            .filter(|(key, value)| *value == env && key.as_str() != env.canonical_name())
            .map(|(key, _)| key.clone())
            .collect();
        aliases.sort();
        aliases
    }

    /// All distinct registered environments, sorted by canonical name.
    pub fn environments(&self) -> Vec<Environment> {
        let mut envs: Vec<Environment> = self
            .environments
            .iter()
            .filter(|(key, env)| key.as_str() == env.canonical_name())
            .map(|(_, env)| env.clone())
            .collect();
        envs.sort_by(|a, b| a.canonical_name().cmp(b.canonical_name()));
        envs
    }
}
