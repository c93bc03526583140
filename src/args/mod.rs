//! Command and option registry.
//!
//! # Responsibilities
//! - Hold named command and option descriptors for an external CLI layer
//! - Resolve descriptors by name or by invocation token
//!
//! # Design Decisions
//! - Commands and options live in two disjoint maps; names are unique per map
//! - Registration happens before `Orchestrator::run`; hooks only see the
//!   orchestrator immutably, so the registry cannot change while it runs
//! - Callbacks receive the orchestrator so they can read identity and flags

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::app::Orchestrator;
use crate::BoxError;

/// Callback run when a command or option is invoked.
pub type ArgCallback =
    Arc<dyn Fn(&Orchestrator, &ArgDescriptor, &[String]) -> Result<(), BoxError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    Command,
    Option,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArgKind::Command => "command",
            ArgKind::Option => "option",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{kind} name must not be empty")]
    EmptyName { kind: ArgKind },

    #[error("{kind} `{name}` is already defined")]
    DuplicateName { kind: ArgKind, name: String },

    #[error("{kind} token `{token}` is already bound to `{existing}`")]
    DuplicateToken {
        kind: ArgKind,
        token: String,
        existing: String,
    },

    #[error("no command or option is bound to `{token}`")]
    UnknownToken { token: String },
}

/// Immutable `{name, invocation token, callback}` record.
#[derive(Clone)]
pub struct ArgDescriptor {
    kind: ArgKind,
    name: String,
    token: String,
    callback: ArgCallback,
}

impl ArgDescriptor {
    pub fn kind(&self) -> ArgKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// What the user types to invoke it (e.g. `migrate`, `--dry-run`).
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn invoke(&self, app: &Orchestrator, values: &[String]) -> Result<(), BoxError> {
        tracing::debug!(kind = %self.kind, name = %self.name, "Invoking argument callback");
        (self.callback)(app, self, values)
    }
}

impl fmt::Debug for ArgDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgDescriptor")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Name → descriptor lookup for commands and options.
#[derive(Debug, Default, Clone)]
pub struct ArgRegistry {
    commands: HashMap<String, ArgDescriptor>,
    options: HashMap<String, ArgDescriptor>,
}

impl ArgRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_command<F>(
        &mut self,
        name: impl Into<String>,
        token: impl Into<String>,
        callback: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&Orchestrator, &ArgDescriptor, &[String]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.define(ArgKind::Command, name.into(), token.into(), Arc::new(callback))
    }

    pub fn define_option<F>(
        &mut self,
        name: impl Into<String>,
        token: impl Into<String>,
        callback: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&Orchestrator, &ArgDescriptor, &[String]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.define(ArgKind::Option, name.into(), token.into(), Arc::new(callback))
    }

    fn define(
        &mut self,
        kind: ArgKind,
        name: String,
        token: String,
        callback: ArgCallback,
    ) -> Result<(), RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName { kind });
        }

        let map = match kind {
            ArgKind::Command => &mut self.commands,
            ArgKind::Option => &mut self.options,
        };
        if map.contains_key(&name) {
            return Err(RegistryError::DuplicateName { kind, name });
        }
        if let Some(existing) = map.values().find(|d| d.token == token) {
            return Err(RegistryError::DuplicateToken {
                kind,
                token,
                existing: existing.name.clone(),
            });
        }

        tracing::debug!(kind = %kind, name = %name, token = %token, "Argument defined");
        map.insert(
            name.clone(),
            ArgDescriptor {
                kind,
                name,
                token,
                callback,
            },
        );
        Ok(())
    }

    pub fn command(&self, name: &str) -> Option<&ArgDescriptor> {
        self.commands.get(name)
    }

    pub fn option(&self, name: &str) -> Option<&ArgDescriptor> {
        self.options.get(name)
    }

    /// Resolve an invocation token; commands are searched before options.
    pub fn find_by_token(&self, token: &str) -> Option<&ArgDescriptor> {
        self.commands
            .values()
            .chain(self.options.values())
            .find(|d| d.token == token)
    }

    pub fn commands(&self) -> impl Iterator<Item = &ArgDescriptor> {
        self.commands.values()
    }

    pub fn options(&self) -> impl Iterator<Item = &ArgDescriptor> {
        self.options.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len() + self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InMemoryConfigurationStore;

    fn noop(_: &Orchestrator, _: &ArgDescriptor, _: &[String]) -> Result<(), BoxError> {
        Ok(())
    }

    #[test]
    fn test_commands_and_options_are_disjoint() {
        let mut registry = ArgRegistry::new();
        registry.define_command("migrate", "migrate", noop).unwrap();
        registry.define_option("migrate", "--migrate", noop).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.command("migrate").unwrap().kind(), ArgKind::Command);
        assert_eq!(registry.option("migrate").unwrap().token(), "--migrate");
        assert!(registry.command("--migrate").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ArgRegistry::new();
        registry.define_command("serve", "serve", noop).unwrap();
        let err = registry.define_command("serve", "run", noop).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateName {
                kind: ArgKind::Command,
                name: "serve".into()
            }
        );
    }

    #[test]
    fn test_duplicate_token_rejected() {
        let mut registry = ArgRegistry::new();
        registry.define_option("verbose", "-v", noop).unwrap();
        let err = registry.define_option("version", "-v", noop).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateToken { existing, .. } if existing == "verbose"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = ArgRegistry::new();
        assert_eq!(
            registry.define_command("", "x", noop).unwrap_err(),
            RegistryError::EmptyName {
                kind: ArgKind::Command
            }
        );
    }

    #[test]
    fn test_find_by_token_and_invoke() {
        let mut app = Orchestrator::new(InMemoryConfigurationStore::default());
        app.set("svc1", "Service", "", false, "");
        app.define_command("greet", "hello", |app, descriptor, values| {
            if app.name_id() != "svc1" || descriptor.name() != "greet" || values != ["world"] {
                return Err("unexpected callback arguments".into());
            }
            Ok(())
        })
        .unwrap();

        let descriptor = app.args().find_by_token("hello").unwrap();
        descriptor.invoke(&app, &["world".to_string()]).unwrap();
        assert!(app.args().find_by_token("bye").is_none());
    }
}
