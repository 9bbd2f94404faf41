//! License compatibility across the module tree and its dependencies.

pub mod engine;
pub mod hierarchy;

use serde::Serialize;

use crate::license::SupportedLicense;
use crate::models::{CompatibilityIssueData, ProjectModule, ProjectSnapshot};

pub use engine::{modules_compatible_licenses, CompatibilityEngine};

/// Per-module view of one analysis run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCompatibility {
    pub module: ProjectModule,
    pub own_license: SupportedLicense,
    pub inherited_license: SupportedLicense,
    pub compatible_with_submodules: Vec<SupportedLicense>,
    pub compatible_with_packages: Vec<SupportedLicense>,
    /// Licenses satisfying both constraints, highest priority first.
    pub compatible: Vec<SupportedLicense>,
}

impl ModuleCompatibility {
    pub fn recommended(&self) -> Option<SupportedLicense> {
        self.compatible.first().copied()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityReport {
    pub modules: Vec<ModuleCompatibility>,
    pub issues: CompatibilityIssueData,
}

impl CompatibilityReport {
    pub fn module(&self, name: &str) -> Option<&ModuleCompatibility> {
        self.modules.iter().find(|m| m.module.name == name)
    }

    /// Modules left with no license satisfying both constraints.
    pub fn modules_without_compatible_license(&self) -> impl Iterator<Item = &ModuleCompatibility> {
        self.modules.iter().filter(|m| m.compatible.is_empty())
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty() || self.modules_without_compatible_license().next().is_some()
    }
}

/// Run every compatibility computation over `snapshot`.
pub fn analyze(snapshot: &ProjectSnapshot) -> CompatibilityReport {
    let engine = CompatibilityEngine::new(snapshot);
    let tree = engine.tree();

    let mut with_submodules = engine.compatible_with_submodules();
    let mut with_packages = engine.compatible_with_packages();
    let mut compatible = modules_compatible_licenses(&with_submodules, &with_packages);

    let modules = snapshot
        .modules
        .iter()
        .map(|module| ModuleCompatibility {
            module: module.clone(),
            own_license: tree.license_of(module),
            inherited_license: tree.inherited_license(module),
            compatible_with_submodules: with_submodules.remove(&module.name).unwrap_or_default(),
            compatible_with_packages: with_packages.remove(&module.name).unwrap_or_default(),
            compatible: compatible.remove(&module.name).unwrap_or_default(),
        })
        .collect();

    CompatibilityReport {
        modules,
        issues: CompatibilityIssueData {
            package_dependency_issues: engine.check_package_dependency_licenses(),
            submodule_issues: engine.check_submodule_licenses(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_analyze_collects_every_module() {
        let mut module_licenses = BTreeMap::new();
        module_licenses.insert("app".to_string(), SupportedLicense::Mit);
        module_licenses.insert("gpl".to_string(), SupportedLicense::Gpl3Only);
        let snapshot = ProjectSnapshot {
            root: "/w".into(),
            modules: vec![
                ProjectModule::new("app", "/w"),
                ProjectModule::new("gpl", "/w/gpl"),
            ],
            module_licenses,
            ..ProjectSnapshot::default()
        };

        let report = analyze(&snapshot);
        assert_eq!(report.modules.len(), 2);
        assert_eq!(report.issues.submodule_issues.len(), 1);
        assert!(report.has_issues());

        let app = report.module("app").unwrap();
        assert_eq!(app.own_license, SupportedLicense::Mit);
        assert_eq!(app.recommended(), Some(SupportedLicense::Gpl3Only));

        let gpl = report.module("gpl").unwrap();
        assert_eq!(gpl.inherited_license, SupportedLicense::Gpl3Only);
    }

    #[test]
    fn test_empty_snapshot() {
        let report = analyze(&ProjectSnapshot::default());
        assert!(report.modules.is_empty());
        assert!(!report.has_issues());
    }
}
