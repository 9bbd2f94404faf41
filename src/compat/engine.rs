use std::collections::{BTreeMap, BTreeSet};

use crate::compat::hierarchy::ModuleTree;
use crate::license::catalog::sort_by_priority;
use crate::license::SupportedLicense;
use crate::models::{
    PackageDependencyIssue, PackageDependencyIssueGroup, ProjectModule, ProjectSnapshot,
    SubmoduleIssue, SubmoduleIssueGroup,
};

/// Compatible-license lists, by module name, highest priority first.
pub type ModuleLicenseSets = BTreeMap<String, Vec<SupportedLicense>>;

/// Compatibility computations over one snapshot. Every method is total and
/// recomputes from scratch.
pub struct CompatibilityEngine<'a> {
    tree: ModuleTree<'a>,
    snapshot: &'a ProjectSnapshot,
}

impl<'a> CompatibilityEngine<'a> {
    pub fn new(snapshot: &'a ProjectSnapshot) -> Self {
        Self {
            tree: ModuleTree::new(&snapshot.modules, &snapshot.module_licenses),
            snapshot,
        }
    }

    pub fn tree(&self) -> &ModuleTree<'a> {
        &self.tree
    }

    /// Licenses `module` could adopt given its direct licensed submodules and
    /// the license it sits under.
    fn compatible_with_submodules_of(&self, module: &ProjectModule) -> Vec<SupportedLicense> {
        let mut candidates: BTreeSet<SupportedLicense> = SupportedLicense::known().collect();
        for submodule in self.tree.direct_licensed_submodules(module) {
            let allowed = self
                .tree
                .license_of(submodule)
                .compatible_module_licenses_by_submodule_license();
            candidates.retain(|c| allowed.contains(c));
        }

        let parent = self.tree.parent_license(module);
        if parent != SupportedLicense::NoLicense {
            candidates.retain(|c| c.allows_parent_as_submodule(parent));
        }

        sorted(candidates)
    }

    pub fn compatible_with_submodules(&self) -> ModuleLicenseSets {
        self.tree
            .modules()
            .iter()
            .map(|m| (m.name.clone(), self.compatible_with_submodules_of(m)))
            .collect()
    }

    /// Known licenses of every dependency installed into `module` or one of
    /// its rolled-up unlicensed submodules.
    fn package_licenses_of(&self, module: &ProjectModule) -> BTreeSet<SupportedLicense> {
        let mut installers = vec![module.name.as_str()];
        installers.extend(
            self.tree
                .rolled_up_submodules(module)
                .into_iter()
                .map(|m| m.name.as_str()),
        );

        self.snapshot.dependencies
            .iter()
            .filter(|d| installers.iter().any(|name| d.is_installed_in(name)))
            .flat_map(|d| d.all_licenses())
            .filter_map(|l| l.as_known())
            .collect()
    }

    fn compatible_with_packages_of(&self, module: &ProjectModule) -> Vec<SupportedLicense> {
        compatible_with_package_licenses(&self.package_licenses_of(module))
    }

    pub fn compatible_with_packages(&self) -> ModuleLicenseSets {
        self.tree
            .modules()
            .iter()
            .map(|m| (m.name.clone(), self.compatible_with_packages_of(m)))
            .collect()
    }

    /// Dependencies whose licenses do not allow the inherited license of the
    /// module they are installed into. Ignored dependencies are skipped.
    pub fn check_package_dependency_licenses(&self) -> Vec<PackageDependencyIssueGroup> {
        let mut groups = Vec::new();
        for module in self.tree.modules() {
            let inherited = self.tree.inherited_license(module);
            if inherited == SupportedLicense::NoLicense {
                continue;
            }

            let mut issues: Vec<PackageDependencyIssue> = Vec::new();
            let installed = self
                .snapshot
                .dependencies
                .iter()
                .filter(|d| d.is_installed_in(&module.name) && !self.snapshot.is_ignored(d));
            for dependency in installed {
                for license in dependency.all_licenses() {
                    let Some(known) = license.as_known() else {
                        continue;
                    };
                    if known.allows_module_as_library(inherited) {
                        continue;
                    }
                    let issue = PackageDependencyIssue {
                        dependency_identifier: dependency.identifier(),
                        license_name: known.name().to_string(),
                    };
                    if !issues.contains(&issue) {
                        issues.push(issue);
                    }
                }
            }

            if !issues.is_empty() {
                groups.push(PackageDependencyIssueGroup {
                    module_name: module.name.clone(),
                    module_license_name: inherited.name().to_string(),
                    issues,
                });
            }
        }
        groups
    }

    /// Direct licensed submodules that may not be nested under their module's license.
    pub fn check_submodule_licenses(&self) -> Vec<SubmoduleIssueGroup> {
        let mut groups = Vec::new();
        for module in self.tree.modules() {
            let own = self.tree.license_of(module);
            if own == SupportedLicense::NoLicense {
                continue;
            }

            let issues: Vec<SubmoduleIssue> = self
                .tree
                .direct_licensed_submodules(module)
                .into_iter()
                .filter_map(|submodule| {
                    let license = self.tree.license_of(submodule);
                    (!license.allows_parent_as_submodule(own)).then(|| SubmoduleIssue {
                        submodule_name: submodule.name.clone(),
                        license_name: license.name().to_string(),
                    })
                })
                .collect();

            if !issues.is_empty() {
                groups.push(SubmoduleIssueGroup {
                    module_name: module.name.clone(),
                    module_license_name: own.name().to_string(),
                    issues,
                });
            }
        }
        groups
    }
}

/// Per-module intersection of the submodule and package constraints, keeping
/// the submodule order (highest priority first).
pub fn modules_compatible_licenses(
    submodules: &ModuleLicenseSets,
    packages: &ModuleLicenseSets,
) -> ModuleLicenseSets {
    submodules
        .iter()
        .map(|(name, candidates)| {
            let allowed = packages.get(name);
            let both = candidates
                .iter()
                .copied()
                .filter(|l| allowed.is_some_and(|a| a.contains(l)))
                .collect();
            (name.clone(), both)
        })
        .collect()
}

/// Module licenses under which every license in `licenses` may be used as a library.
///
/// An empty input is unconstrained and yields the whole catalog (without
/// `NoLicense`). `NoLicense` in the input allows nothing.
pub fn compatible_with_package_licenses(
    licenses: &BTreeSet<SupportedLicense>,
) -> Vec<SupportedLicense> {
    let mut iter = licenses.iter();
    let Some(first) = iter.next() else {
        return sorted(SupportedLicense::known().collect());
    };

    let compatible = iter.fold(
        first.compatible_module_licenses_by_library_license(),
        |acc, license| {
            let allowed = license.compatible_module_licenses_by_library_license();
            acc.intersection(&allowed).copied().collect()
        },
    );
    sorted(compatible)
}

fn sorted(set: BTreeSet<SupportedLicense>) -> Vec<SupportedLicense> {
    let mut licenses: Vec<SupportedLicense> = set.into_iter().collect();
    sort_by_priority(&mut licenses);
    licenses
}
