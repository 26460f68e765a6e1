//! Module registry.
//!
//! An ordered name -> module map built once at start-up. Registration order is
//! significant: it is the input order of the dependency planner, and the
//! synthesizer treats the first-discovered insight as canonical.

use super::AnalysisModule;
use crate::models::ModuleCategory;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Default, Clone)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn AnalysisModule>>,
    index: HashMap<String, usize>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. An existing module with the same name is replaced
    /// in place, keeping its original position.
    pub fn register(&mut self, module: Arc<dyn AnalysisModule>) {
        let name = module.name().to_string();
        match self.index.get(&name) {
            Some(&position) => {
                debug!("Replacing registered module: {}", name);
                self.modules[position] = module;
            }
            None => {
                debug!("Registering module: {}", name);
                self.index.insert(name, self.modules.len());
                self.modules.push(module);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AnalysisModule>> {
        self.index.get(name).map(|&i| Arc::clone(&self.modules[i]))
    }

    /// All modules in registration order.
    pub fn all(&self) -> Vec<Arc<dyn AnalysisModule>> {
        self.modules.clone()
    }

    pub fn by_category(&self, category: ModuleCategory) -> Vec<Arc<dyn AnalysisModule>> {
        self.modules
            .iter()
            .filter(|m| m.metadata().category == category)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.modules.iter().map(|m| m.name()))
            .finish()
    }
}
