//! Lookup of model families by netlist kind.
//!
//! Front ends create models by the kind written on a `.MODEL` card
//! (`nmos`, `pmf`, ...). Each kind maps to a factory that builds an empty
//! model with that name. The process-wide registry starts empty; call
//! [`register_builtin_models`] at startup to add the built-in families.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::compact::CompactModel;
use crate::error::{Error, Result};
use crate::mesfet::MesfetModel;
use crate::mosfet::MosfetModel;

/// Builds an empty model with the given name.
pub type ModelFactory = Box<dyn Fn(&str) -> Box<dyn CompactModel> + Send + Sync>;

/// Factories keyed by lowercase model kind, in registration order.
#[derive(Default)]
pub struct ModelRegistry {
    factories: IndexMap<String, ModelFactory>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in families.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry);
        registry
    }

    /// Register `factory` under `kind`, replacing any earlier entry.
    pub fn register<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(&str) -> Box<dyn CompactModel> + Send + Sync + 'static,
    {
        let kind = kind.to_ascii_lowercase();
        if self.factories.insert(kind.clone(), Box::new(factory)).is_some() {
            log::debug!("model kind {kind} re-registered");
        }
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(&kind.to_ascii_lowercase())
    }

    /// Registered kinds, in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build an empty model of `kind` named `name`.
    pub fn create(&self, kind: &str, name: &str) -> Result<Box<dyn CompactModel>> {
        let factory = self
            .factories
            .get(&kind.to_ascii_lowercase())
            .ok_or_else(|| Error::UnknownModel(kind.to_string()))?;
        Ok(factory(name))
    }
}

/// Add the built-in families to `registry`.
pub fn register_builtins(registry: &mut ModelRegistry) {
    registry.register("nmos", |name| Box::new(MosfetModel::nmos(name)));
    registry.register("pmos", |name| Box::new(MosfetModel::pmos(name)));
    registry.register("nmf", |name| Box::new(MesfetModel::nmf(name)));
    registry.register("pmf", |name| Box::new(MesfetModel::pmf(name)));
}

fn global() -> &'static RwLock<ModelRegistry> {
    static REGISTRY: OnceLock<RwLock<ModelRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(ModelRegistry::new()))
}

/// Read access to the process-wide registry.
pub fn registry() -> RwLockReadGuard<'static, ModelRegistry> {
    // A panic while registering cannot leave the map half-updated.
    global().read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Write access to the process-wide registry.
pub fn registry_mut() -> RwLockWriteGuard<'static, ModelRegistry> {
    global().write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Make sure the built-in families are present in the process-wide
/// registry. Idempotent.
pub fn register_builtin_models() {
    let mut registry = registry_mut();
    if !registry.contains("nmos") {
        register_builtins(&mut registry);
    }
}

/// Build a model from the process-wide registry.
pub fn create_model(kind: &str, name: &str) -> Result<Box<dyn CompactModel>> {
    registry().create(kind, name)
}
