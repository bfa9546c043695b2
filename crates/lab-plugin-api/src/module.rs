//! Module descriptors.
//!
//! A plugin describes itself with a [`ModuleDescriptor`]: its identity, the
//! other modules it references, and the types it exports in declaration order.

use crate::identity::ModuleIdentity;
use crate::types::TypeDefinition;
use std::sync::Arc;

/// Everything a module contributes to the host.
#[derive(Debug)]
pub struct ModuleDescriptor {
    identity: ModuleIdentity,
    references: Vec<String>,
    types: Vec<Arc<TypeDefinition>>,
}

impl ModuleDescriptor {
    /// Starts a descriptor for module `name` at `version`.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            identity: ModuleIdentity::new(name, version),
            references: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Declares a reference to another module by full identity
    /// (`"<name>, version=<version>"`). The host binds references when the
    /// module is loaded.
    pub fn reference(mut self, full_name: impl Into<String>) -> Self {
        self.references.push(full_name.into());
        self
    }

    /// Exports a type. Declaration order is the enumeration order used for
    /// class-name lookup.
    pub fn export(mut self, definition: TypeDefinition) -> Self {
        self.types.push(Arc::new(definition));
        self
    }

    /// Module identity.
    pub fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    /// Referenced module identities.
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Exported types in declaration order.
    pub fn types(&self) -> &[Arc<TypeDefinition>] {
        &self.types
    }

    /// Splits the descriptor into its parts.
    pub fn into_parts(self) -> (ModuleIdentity, Vec<String>, Vec<Arc<TypeDefinition>>) {
        (self.identity, self.references, self.types)
    }
}
