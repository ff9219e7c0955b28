//! Shared execution context and the command builder registry.
//!
//! A builder advertises one or more logical names; the external pipeline
//! compiler resolves a name through [`Context::command_builder`] and invokes
//! the builder with the command's configuration slice, the parent's
//! diagnostic name, the pre-built child chain, and the context itself.
//! Registration is explicit — there is no runtime scanning.

use crate::command::Command;
use crate::error::{ConfigError, Result};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Factory for one kind of pipeline command.
pub trait CommandBuilder: Send + Sync {
    /// Logical names under which this builder can be referenced.
    fn names(&self) -> Vec<&'static str>;

    /// Build a command from its configuration slice.
    ///
    /// `parent` is the upstream command's logical name, carried for
    /// diagnostics only; `child` is the exclusively owned downstream chain.
    fn build(
        &self,
        config: &Json,
        parent: Option<&str>,
        child: Box<dyn Command>,
        context: &Context,
    ) -> Result<Box<dyn Command>>;
}

impl std::fmt::Debug for dyn CommandBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("names", &self.names())
            .finish_non_exhaustive()
    }
}

/// Shared execution context handed to every command builder.
#[derive(Default)]
pub struct Context {
    builders: HashMap<String, Arc<dyn CommandBuilder>>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder under every name it advertises.
    pub fn register(&mut self, builder: Arc<dyn CommandBuilder>) -> Result<()> {
        for name in builder.names() {
            if self.builders.contains_key(name) {
                return Err(ConfigError::AlreadyRegistered {
                    name: name.to_string(),
                }
                .into());
            }
        }
        for name in builder.names() {
            debug!(name, "command builder registered");
            self.builders.insert(name.to_string(), Arc::clone(&builder));
        }
        Ok(())
    }

    /// Look up a builder by logical name.
    pub fn command_builder(&self, name: &str) -> Result<Arc<dyn CommandBuilder>> {
        self.builders.get(name).cloned().ok_or_else(|| {
            ConfigError::UnknownCommand {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Number of registered logical names.
    pub fn builder_count(&self) -> usize {
        self.builders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::DropRecord;
    use crate::error::Error;

    struct NoopBuilder;

    impl CommandBuilder for NoopBuilder {
        fn names(&self) -> Vec<&'static str> {
            vec!["noop", "doNothing"]
        }

        fn build(
            &self,
            _config: &Json,
            _parent: Option<&str>,
            _child: Box<dyn Command>,
            _context: &Context,
        ) -> Result<Box<dyn Command>> {
            Ok(Box::new(DropRecord))
        }
    }

    #[test]
    fn test_register_and_lookup_by_any_name() {
        let mut context = Context::new();
        context.register(Arc::new(NoopBuilder)).unwrap();
        assert_eq!(context.builder_count(), 2);
        assert!(context.command_builder("noop").is_ok());
        assert!(context.command_builder("doNothing").is_ok());
    }

    #[test]
    fn test_unknown_command() {
        let context = Context::new();
        let err = context.command_builder("missing").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::UnknownCommand { name }) if name == "missing"
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut context = Context::new();
        context.register(Arc::new(NoopBuilder)).unwrap();
        let err = context.register(Arc::new(NoopBuilder)).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::AlreadyRegistered { .. })
        ));
    }
}
