//! # Action Registry
//!
//! Capability-based replacement for loading code by name at request time.
//!
//! Applications register [`Module`]s at startup; each module exports named
//! [`Export`]s. A symbolic action reference `"module.function"` is split at
//! its **last** `.` and looked up through a [`ModuleLoader`], so
//! `"shop.cart.add"` means export `add` of module `shop.cart`.
//!
//! ```rust
//! use webdispatch::registry::{ActionRegistry, Module};
//!
//! let registry = ActionRegistry::new().with_module(
//!     Module::new("greet").action("hello", |_req, res, groups| {
//!         res.writeln(&[&"Hello", &groups[0].as_deref().unwrap_or("world")]);
//!         Ok(())
//!     }),
//! );
//! assert!(registry.contains("greet"));
//! ```

use crate::error::{ConfigurationError, DispatchError, ResolutionError};
use crate::router::ActionRef;
use crate::server::{Request, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Signature every action shares: request, response, then capture groups.
pub type ActionFn =
    dyn Fn(&Request, &mut Response, &[Option<String>]) -> anyhow::Result<()> + Send + Sync;

/// A callable route target.
#[derive(Clone)]
pub struct Action {
    name: Arc<str>,
    func: Arc<ActionFn>,
}

impl Action {
    /// Wrap an anonymous closure.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Request, &mut Response, &[Option<String>]) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        Self::named("<closure>", func)
    }

    /// Wrap a closure under a name shown in logs.
    pub fn named<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Request, &mut Response, &[Option<String>]) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the action with `(request, response, group1, group2, ...)`.
    ///
    /// # Errors
    ///
    /// Whatever the action itself returns.
    pub fn invoke(
        &self,
        req: &Request,
        res: &mut Response,
        groups: &[Option<String>],
    ) -> anyhow::Result<()> {
        (self.func)(req, res, groups)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish()
    }
}

/// Named value exported by a module.
#[derive(Clone, Debug)]
pub enum Export {
    Action(Action),
    /// Plain data; never invoked
    Value(serde_json::Value),
}

/// A named unit of code exposing exports by key.
#[derive(Clone, Debug)]
pub struct Module {
    name: String,
    exports: HashMap<String, Export>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exports: HashMap::new(),
        }
    }

    /// Export `func` as `symbol`. The action is named `module.symbol`.
    #[must_use]
    pub fn action<F>(mut self, symbol: &str, func: F) -> Self
    where
        F: Fn(&Request, &mut Response, &[Option<String>]) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        let action = Action::named(&format!("{}.{symbol}", self.name), func);
        self.exports.insert(symbol.to_string(), Export::Action(action));
        self
    }

    /// Export a non-callable value as `symbol`.
    #[must_use]
    pub fn value(mut self, symbol: &str, value: serde_json::Value) -> Self {
        self.exports.insert(symbol.to_string(), Export::Value(value));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&Export> {
        self.exports.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }
}

/// Loads a named module.
pub trait ModuleLoader: Send + Sync {
    /// # Errors
    ///
    /// [`ResolutionError::ModuleNotFound`] when nothing answers to `identifier`.
    fn load(&self, identifier: &str) -> Result<Arc<Module>, ResolutionError>;
}

/// In-memory module table, populated at startup and read-only afterwards.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    modules: HashMap<String, Arc<Module>>,
}

impl ActionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` under its name, replacing any previous module of the same name.
    pub fn register(&mut self, module: Module) {
        let name = module.name().to_string();
        let symbols = module.exports.len();
        if self.modules.insert(name.clone(), Arc::new(module)).is_some() {
            warn!(module = %name, "Replaced existing module");
        }
        info!(
            module = %name,
            symbols,
            total_modules = self.modules.len(),
            "Module registered"
        );
    }

    #[must_use]
    pub fn with_module(mut self, module: Module) -> Self {
        self.register(module);
        self
    }

    #[must_use]
    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModuleLoader for ActionRegistry {
    fn load(&self, identifier: &str) -> Result<Arc<Module>, ResolutionError> {
        self.modules
            .get(identifier)
            .map(Arc::clone)
            .ok_or_else(|| ResolutionError::ModuleNotFound {
                module: identifier.to_string(),
            })
    }
}

/// What to do when a symbolic reference does not name a callable export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPolicy {
    /// Treat the entry as not matching and keep scanning the table
    #[default]
    Permissive,
    /// Fail the request with a configuration or resolution error
    Strict,
}

/// Split `module.function` at the last `.`.
///
/// # Errors
///
/// [`ConfigurationError::MalformedActionRef`] when there is no `.`.
pub fn split_symbolic(reference: &str) -> Result<(&str, &str), ConfigurationError> {
    reference
        .rsplit_once('.')
        .ok_or_else(|| ConfigurationError::MalformedActionRef {
            action: reference.to_string(),
        })
}

/// Turn the action half of a route entry into something callable.
///
/// Returns `Ok(None)` when, under [`ResolutionPolicy::Permissive`], the
/// reference names a missing or non-callable export.
///
/// # Errors
///
/// Configuration errors for malformed or mistyped references, resolution
/// errors for unknown modules, and (strict policy) for missing or
/// non-callable exports.
pub fn resolve_action(
    action: &ActionRef,
    loader: &dyn ModuleLoader,
    policy: ResolutionPolicy,
) -> Result<Option<Action>, DispatchError> {
    let reference = match action {
        ActionRef::Callable(action) => return Ok(Some(action.clone())),
        ActionRef::Invalid(found) => {
            return Err(ConfigurationError::InvalidActionType {
                found: found.clone(),
            }
            .into())
        }
        ActionRef::Symbolic(reference) => reference,
    };

    let (module_path, symbol) = split_symbolic(reference)?;
    let module = loader.load(module_path)?;
    match (module.get(symbol), policy) {
        (Some(Export::Action(action)), _) => {
            debug!(action = %reference, "Resolved action");
            Ok(Some(action.clone()))
        }
        (Some(Export::Value(_)), ResolutionPolicy::Permissive) => {
            debug!(action = %reference, "Export is not callable");
            Ok(None)
        }
        (None, ResolutionPolicy::Permissive) => {
            debug!(action = %reference, "Export not found");
            Ok(None)
        }
        (Some(Export::Value(_)), ResolutionPolicy::Strict) => Err(ConfigurationError::NotCallable {
            action: reference.clone(),
        }
        .into()),
        (None, ResolutionPolicy::Strict) => Err(ResolutionError::SymbolNotFound {
            module: module_path.to_string(),
            symbol: symbol.to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> ActionRegistry {
        ActionRegistry::new().with_module(
            Module::new("shop.cart")
                .action("add", |_req, res, _groups| {
                    res.write(&[&"added"]);
                    Ok(())
                })
                .value("title", json!("Cart")),
        )
    }

    #[test]
    fn test_split_at_last_dot() {
        assert_eq!(split_symbolic("shop.cart.add").unwrap(), ("shop.cart", "add"));
        assert_eq!(split_symbolic("m.f").unwrap(), ("m", "f"));
        assert!(matches!(
            split_symbolic("nodot"),
            Err(ConfigurationError::MalformedActionRef { .. })
        ));
    }

    #[test]
    fn test_resolves_exported_action() {
        let action = resolve_action(
            &ActionRef::from("shop.cart.add"),
            &registry(),
            ResolutionPolicy::Permissive,
        )
        .unwrap()
        .unwrap();
        assert_eq!(action.name(), "shop.cart.add");
        let mut res = Response::new();
        action.invoke(&Request::get("/"), &mut res, &[]).unwrap();
        assert_eq!(res.body(), "added");
    }

    #[test]
    fn test_permissive_missing_or_value_falls_through() {
        let reg = registry();
        for reference in ["shop.cart.title", "shop.cart.remove"] {
            let resolved =
                resolve_action(&ActionRef::from(reference), &reg, ResolutionPolicy::Permissive)
                    .unwrap();
            assert!(resolved.is_none(), "{reference} should fall through");
        }
    }

    #[test]
    fn test_strict_missing_or_value_fails() {
        let reg = registry();
        let err = resolve_action(&ActionRef::from("shop.cart.title"), &reg, ResolutionPolicy::Strict)
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Configuration(ConfigurationError::NotCallable { .. })
        ));
        let err = resolve_action(&ActionRef::from("shop.cart.remove"), &reg, ResolutionPolicy::Strict)
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Resolution(ResolutionError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn test_unknown_module_is_resolution_error() {
        let err = resolve_action(&ActionRef::from("nope.f"), &registry(), ResolutionPolicy::Permissive)
            .unwrap_err();
        assert_eq!(err.to_string(), "Module 'nope' not found");
    }

    #[test]
    fn test_invalid_action_type() {
        let err = resolve_action(
            &ActionRef::Invalid("number".into()),
            &registry(),
            ResolutionPolicy::Permissive,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Configuration(ConfigurationError::InvalidActionType { .. })
        ));
    }

    #[test]
    fn test_register_replaces_module() {
        let mut reg = registry();
        reg.register(Module::new("shop.cart"));
        assert_eq!(reg.len(), 1);
        assert!(reg.load("shop.cart").unwrap().get("add").is_none());
    }
}
