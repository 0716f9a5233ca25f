//! Process-local mapping from participant id to live handle.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::component::TccComponent;
use crate::error::RegistryError;

/// Holds the live set of participants. Read-mostly: tolerates many
/// concurrent `resolve` calls against at most one `register`. Participants
/// are never removed; deregistration is out of scope.
#[derive(Default)]
pub struct Registry {
    components: RwLock<HashMap<String, Arc<dyn TccComponent>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a participant. Fails with `DuplicateId` if one with the same
    /// id is already present; there is no implicit replacement.
    pub fn register(&self, component: Arc<dyn TccComponent>) -> Result<(), RegistryError> {
        let mut components = self.components.write().expect("registry lock poisoned");
        let id = component.id().to_string();
        if components.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        components.insert(id, component);
        Ok(())
    }

    /// Resolve ids to participants in the same order as requested. Fails
    /// with `UnknownId` on the first missing id.
    pub fn resolve(
        &self,
        ids: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Vec<Arc<dyn TccComponent>>, RegistryError> {
        let components = self.components.read().expect("registry lock poisoned");
        ids.into_iter()
            .map(|id| {
                let id = id.as_ref();
                components
                    .get(id)
                    .cloned()
                    .ok_or_else(|| RegistryError::UnknownId(id.to_string()))
            })
            .collect()
    }

    /// Resolve a single id, used by second-phase advancement.
    pub fn resolve_one(&self, id: &str) -> Result<Arc<dyn TccComponent>, RegistryError> {
        let components = self.components.read().expect("registry lock poisoned");
        components
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownId(id.to_string()))
    }
}
