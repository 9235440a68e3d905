//! Sealed modules.
//!
//! An [`OpenModule`] accepts definitions while it is being populated.
//! Reclassifying it produces a [`LockedModule`] whose attributes are as
//! immutable as those of a sealed class:
//!
//! ```rust
//! use lockup::{ErrorKind, MutableAttributeGuard, OpenModule, Value};
//!
//! let mut math = OpenModule::new("math");
//! math.define("pi", 3.141592653589793);
//! let math = math.reclassify();
//!
//! let err = math.assign_attribute("pi", Value::Float(2.718281828459045)).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::ImpermissibleAttributeOperation);
//! assert_eq!(err.to_string(), "Attempt to assign immutable attribute 'pi' on module 'math'.");
//! assert_eq!(math.attribute("pi").unwrap(), Value::Float(3.141592653589793));
//! ```

use crate::definitions::ARGUMENT_VALIDATION;
use crate::{
    arguments, BoundaryError, ClassPath, Descriptor, Interceptor, MutableAttributeGuard, Seal,
    Signature, Subject, Value, PACKAGE_NAME,
};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

type Entries = Vec<(Cow<'static, str>, Value)>;

// ============================================================================
// Open Modules
// ============================================================================

/// Module under construction.
#[derive(Debug, Clone, Default)]
pub struct OpenModule {
    name: Cow<'static, str>,
    attributes: Entries,
}

impl OpenModule {
    /// Empty module.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Module name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Define an attribute, replacing any earlier definition.
    pub fn define(&mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    /// Remove an attribute.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(index).1)
    }

    /// Attribute, if defined.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Seal the module.
    pub fn reclassify(self) -> Arc<LockedModule> {
        tracing::trace!(module = %self.name, attributes = self.attributes.len(), "module reclassified");
        Arc::new(LockedModule {
            name: self.name,
            attributes: self.attributes,
        })
    }
}

impl Seal for OpenModule {
    type Sealed = Arc<LockedModule>;

    fn seal(self) -> Result<Arc<LockedModule>, BoundaryError> {
        Ok(self.reclassify())
    }
}

// ============================================================================
// Locked Modules
// ============================================================================

/// Sealed module.
#[derive(Debug)]
pub struct LockedModule {
    name: Cow<'static, str>,
    attributes: Entries,
}

impl LockedModule {
    /// Module name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy of every attribute.
    ///
    /// Mutating the copy leaves the module untouched.
    pub fn attributes(&self) -> Entries {
        self.attributes.clone()
    }
}

impl MutableAttributeGuard for LockedModule {
    fn subject(&self) -> Subject {
        Subject::Module(self.name.clone())
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn stored_names(&self) -> Vec<String> {
        self.attributes.iter().map(|(name, _)| name.to_string()).collect()
    }

    fn factory_path(&self) -> ClassPath {
        ClassPath::new(PACKAGE_NAME, "Module")
    }
}

impl Seal for Arc<LockedModule> {
    type Sealed = Arc<LockedModule>;

    fn seal(self) -> Result<Arc<LockedModule>, BoundaryError> {
        Ok(self)
    }
}

/// Seal a module; sealing a sealed module returns it unchanged.
pub fn reclassify_module<M>(module: M) -> Arc<LockedModule>
where
    M: Into<ModuleEntry>,
{
    match module.into() {
        ModuleEntry::Open(module) => module.reclassify(),
        ModuleEntry::Locked(module) => module,
    }
}

// ============================================================================
// Module Table
// ============================================================================

/// Module in either state.
#[derive(Debug, Clone)]
pub enum ModuleEntry {
    /// Under construction.
    Open(OpenModule),
    /// Sealed.
    Locked(Arc<LockedModule>),
}

impl ModuleEntry {
    /// Module name.
    pub fn name(&self) -> &str {
        match self {
            Self::Open(module) => module.name(),
            Self::Locked(module) => module.name(),
        }
    }

    /// Is the module sealed?
    #[inline]
    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::Locked(_))
    }
}

impl From<OpenModule> for ModuleEntry {
    fn from(module: OpenModule) -> Self {
        Self::Open(module)
    }
}

impl From<Arc<LockedModule>> for ModuleEntry {
    fn from(module: Arc<LockedModule>) -> Self {
        Self::Locked(module)
    }
}

/// Table of loaded modules, by name.
#[derive(Debug, Clone, Default)]
pub struct ModuleTable {
    modules: BTreeMap<String, ModuleEntry>,
}

impl ModuleTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, replacing any module of the same name.
    pub fn insert(&mut self, module: impl Into<ModuleEntry>) {
        let module = module.into();
        self.modules.insert(module.name().to_owned(), module);
    }

    /// Module by name.
    pub fn get(&self, name: &str) -> Option<&ModuleEntry> {
        self.modules.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Seal a registered module in place.
    ///
    /// Idempotent: a sealed module is returned as is.
    pub fn reclassify(&mut self, name: &str) -> Result<Arc<LockedModule>, BoundaryError> {
        let Some(entry) = self.modules.remove(name) else {
            let operation = Arc::new(
                Descriptor::method(ClassPath::new(PACKAGE_NAME, "ModuleTable"), "reclassify")
                    .with_signature(Signature::new().positional("module")),
            );
            return Err(Interceptor::ours().registry().raise(
                &ARGUMENT_VALIDATION,
                arguments![
                    "module",
                    Subject::Invocable(operation),
                    "module or name of module in module table"
                ],
            ));
        };
        let locked = reclassify_module(entry);
        self.modules
            .insert(name.to_owned(), ModuleEntry::Locked(Arc::clone(&locked)));
        Ok(locked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn inventory() -> OpenModule {
        let mut module = OpenModule::new("inventory");
        module.define("stock", 7).define("_ledger", Value::Unit);
        module
    }

    #[test]
    fn open_modules_accept_changes() {
        let mut module = inventory();
        module.define("stock", 8);
        assert_eq!(module.attribute("stock"), Some(&Value::Integer(8)));
        assert_eq!(module.remove("stock"), Some(Value::Integer(8)));
        assert!(module.attribute("stock").is_none());
    }

    #[test]
    fn locked_modules_reject_changes() {
        let module = inventory().reclassify();
        let err = module.assign_attribute("stock", Value::Integer(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImpermissibleAttributeOperation);

        let err = module.delete_attribute("stock").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Attempt to delete indelible attribute 'stock' on module 'inventory'."
        );

        let err = module.delete_attribute("price").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InaccessibleAttribute);
        assert_eq!(module.attribute("stock").unwrap(), Value::Integer(7));
    }

    #[test]
    fn attribute_copies_are_detached() {
        let module = inventory().reclassify();
        let mut copy = module.attributes();
        copy.clear();
        assert_eq!(module.attributes().len(), 2);
    }

    #[test]
    fn directory_lists_public_names() {
        let module = inventory().reclassify();
        assert_eq!(module.directory(), vec!["stock"]);
    }

    #[test]
    fn reclassification_is_idempotent() {
        let module = inventory().reclassify();
        let again = reclassify_module(Arc::clone(&module));
        assert!(Arc::ptr_eq(&module, &again));
        let sealed = Arc::clone(&module).seal().unwrap();
        assert!(Arc::ptr_eq(&module, &sealed));
    }

    #[test]
    fn table_reclassifies_by_name() {
        let mut table = ModuleTable::new();
        table.insert(inventory());
        assert!(!table.get("inventory").unwrap().is_locked());

        let first = table.reclassify("inventory").unwrap();
        assert!(table.get("inventory").unwrap().is_locked());
        let second = table.reclassify("inventory").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["inventory"]);
    }

    #[test]
    fn table_rejects_unknown_names() {
        let mut table = ModuleTable::new();
        let err = table.reclassify("missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncorrectData);
        assert!(err.to_string().ends_with("must be module or name of module in module table"));
    }
}
