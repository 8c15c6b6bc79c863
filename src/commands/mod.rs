//! Command registry
//!
//! Maps an action name from the sheet to the handler that performs it.
//! Built-in handlers are looked up first, user handlers second. Registering a
//! user handler under a built-in name is an explicit override: from then on
//! that name resolves to the user handler only.

pub mod builtin;

use crate::driver::traits::{DriverResult, DriverSession, ElementHandle};
use crate::error::StepError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Whether a command only acts, or also produces a value to check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Action,
    /// The returned value is compared against the statement's expected result
    Assertion,
}

/// Which namespace a name resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    BuiltIn,
    User,
}

/// A resolved element bound to the session that owns it
pub struct Element<'a> {
    session: &'a dyn DriverSession,
    handle: ElementHandle,
}

impl<'a> Element<'a> {
    pub fn new(session: &'a dyn DriverSession, handle: ElementHandle) -> Self {
        Self { session, handle }
    }

    pub fn handle(&self) -> &ElementHandle {
        &self.handle
    }

    pub async fn click(&self) -> DriverResult<()> {
        self.session.click(&self.handle).await
    }

    pub async fn scroll_into_view(&self) -> DriverResult<()> {
        self.session.scroll_into_view(&self.handle).await
    }

    pub async fn set_value(&self, text: &str) -> DriverResult<()> {
        self.session.set_value(&self.handle, text).await
    }

    pub async fn get_text(&self) -> DriverResult<String> {
        self.session.get_text(&self.handle).await
    }

    pub async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        self.session.screenshot(&self.handle).await
    }
}

/// An executable action
///
/// Handlers must let driver errors propagate; the step executor is the only
/// place that turns them into failures.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn kind(&self) -> CommandKind {
        CommandKind::Action
    }

    /// Run the command. Returns the observed value, if the command has one.
    async fn execute(&self, element: &Element<'_>, args: &[String]) -> DriverResult<Option<String>>;
}

/// Action names that are always checked against the expected value, even
/// when a user handler overrides them
pub const ASSERTION_ACTIONS: &[&str] = &["verifyText", "assert"];

/// Name → handler lookup for both namespaces
pub struct CommandRegistry {
    builtins: HashMap<String, Arc<dyn CommandHandler>>,
    user: HashMap<String, Arc<dyn CommandHandler>>,
    overrides: HashSet<String>,
}

impl CommandRegistry {
    /// Registry with the built-in commands. Relative screenshot paths resolve
    /// against the current directory.
    pub fn new() -> Self {
        Self::with_output_dir(Path::new("."))
    }

    /// Registry with the built-in commands, writing artifacts under `output_dir`
    pub fn with_output_dir(output_dir: &Path) -> Self {
        let mut registry = Self::empty();
        builtin::register_builtins(&mut registry, output_dir);
        registry
    }

    /// Registry with no commands at all
    pub fn empty() -> Self {
        Self {
            builtins: HashMap::new(),
            user: HashMap::new(),
            overrides: HashSet::new(),
        }
    }

    pub(crate) fn register_builtin(&mut self, name: &str, handler: Arc<dyn CommandHandler>) {
        self.builtins.insert(name.to_string(), handler);
    }

    /// Install a user command, replacing any earlier user command of the same
    /// name. Returns `true` when the name shadows a built-in.
    pub fn register(&mut self, name: &str, handler: impl CommandHandler + 'static) -> bool {
        self.register_arc(name, Arc::new(handler))
    }

    pub fn register_arc(&mut self, name: &str, handler: Arc<dyn CommandHandler>) -> bool {
        let shadows = self.builtins.contains_key(name);
        if shadows {
            log::warn!("User command '{}' overrides the built-in command", name);
            self.overrides.insert(name.to_string());
        }
        self.user.insert(name.to_string(), handler);
        shadows
    }

    /// Find the handler for an action name
    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn CommandHandler>, StepError> {
        if !self.overrides.contains(name) {
            if let Some(handler) = self.builtins.get(name) {
                return Ok(handler);
            }
        }
        self.user
            .get(name)
            .ok_or_else(|| StepError::UnknownCommand(name.to_string()))
    }

    /// Whether the observed value of `name` is compared against the expected
    /// value. Assertion action names stay assertions when overridden.
    pub fn is_assertion(&self, name: &str) -> bool {
        ASSERTION_ACTIONS.contains(&name)
            || self
                .resolve(name)
                .map_or(false, |handler| handler.kind() == CommandKind::Assertion)
    }

    /// Namespace an action name currently resolves to
    pub fn origin(&self, name: &str) -> Option<Namespace> {
        if self.overrides.contains(name) {
            Some(Namespace::User)
        } else if self.builtins.contains_key(name) {
            Some(Namespace::BuiltIn)
        } else if self.user.contains_key(name) {
            Some(Namespace::User)
        } else {
            None
        }
    }

    /// All resolvable command names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .builtins
            .keys()
            .chain(self.user.keys())
            .map(|s| s.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
