//! Dependency planner.
//!
//! Groups modules into stages by repeated leveling: a module joins the next
//! stage once every one of its dependencies sits in an earlier stage. Input
//! order is preserved inside a stage. Modules that can never be placed
//! (missing or cyclic dependencies) are reported as unscheduled instead of
//! failing the plan.

use crate::modules::AnalysisModule;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Modules that can run concurrently once all earlier stages have settled.
#[derive(Clone)]
pub struct Stage {
    pub modules: Vec<Arc<dyn AnalysisModule>>,
    /// Dependency names of this stage's modules, all resolved by earlier stages.
    pub satisfied_dependencies: Vec<String>,
}

impl Stage {
    pub fn module_names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name().to_string()).collect()
    }
}

#[derive(Clone, Default)]
pub struct ExecutionPlan {
    pub stages: Vec<Stage>,
    /// Modules excluded because their dependencies can never be met.
    pub unscheduled: Vec<UnscheduledModule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnscheduledModule {
    pub name: String,
    pub missing: Vec<String>,
}

impl ExecutionPlan {
    pub fn stage_names(&self) -> Vec<Vec<String>> {
        self.stages.iter().map(Stage::module_names).collect()
    }

    pub fn scheduled_count(&self) -> usize {
        self.stages.iter().map(|s| s.modules.len()).sum()
    }
}

impl std::fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("stages", &self.stage_names())
            .field("unscheduled", &self.unscheduled)
            .finish()
    }
}

/// Build a staged execution plan for `modules`.
pub fn build_plan(modules: &[Arc<dyn AnalysisModule>]) -> ExecutionPlan {
    let mut seen = HashSet::new();
    let mut pending: Vec<Arc<dyn AnalysisModule>> = modules
        .iter()
        .filter(|m| seen.insert(m.name().to_string()))
        .cloned()
        .collect();

    let mut processed: HashSet<String> = HashSet::new();
    let mut stages = Vec::new();

    while !pending.is_empty() {
        let (ready, blocked): (Vec<_>, Vec<_>) = pending.into_iter().partition(|m| {
            m.metadata()
                .dependencies
                .iter()
                .all(|dep| processed.contains(dep))
        });
        pending = blocked;

        if ready.is_empty() {
            break;
        }

        let mut satisfied_dependencies: Vec<String> = Vec::new();
        for module in &ready {
            for dep in &module.metadata().dependencies {
                if !satisfied_dependencies.contains(dep) {
                    satisfied_dependencies.push(dep.clone());
                }
            }
        }

        processed.extend(ready.iter().map(|m| m.name().to_string()));
        debug!(
            "Stage {}: {:?}",
            stages.len(),
            ready.iter().map(|m| m.name()).collect::<Vec<_>>()
        );

        stages.push(Stage {
            modules: ready,
            satisfied_dependencies,
        });
    }

    let unscheduled: Vec<UnscheduledModule> = pending
        .iter()
        .map(|m| UnscheduledModule {
            name: m.name().to_string(),
            missing: m
                .metadata()
                .dependencies
                .iter()
                .filter(|dep| !processed.contains(*dep))
                .cloned()
                .collect(),
        })
        .collect();

    for module in &unscheduled {
        warn!(
            module = %module.name,
            missing = ?module.missing,
            "Module unscheduled: unmet or cyclic dependencies"
        );
    }

    ExecutionPlan {
        stages,
        unscheduled,
    }
}
