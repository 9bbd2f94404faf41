use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::license::SupportedLicense;
use crate::models::ProjectModule;

/// Module ancestry resolved from path prefixes over a flat module list.
///
/// `a` is an ancestor of `b` when `b.path` starts with `a.path` component-wise
/// and the two differ. Upward walks follow `Path::parent`, so they always end
/// at the filesystem root.
pub struct ModuleTree<'a> {
    modules: &'a [ProjectModule],
    licenses: &'a BTreeMap<String, SupportedLicense>,
    by_path: HashMap<&'a Path, &'a ProjectModule>,
}

impl<'a> ModuleTree<'a> {
    pub fn new(
        modules: &'a [ProjectModule],
        licenses: &'a BTreeMap<String, SupportedLicense>,
    ) -> Self {
        let by_path = modules.iter().map(|m| (m.path.as_path(), m)).collect();
        Self {
            modules,
            licenses,
            by_path,
        }
    }

    pub fn modules(&self) -> &'a [ProjectModule] {
        self.modules
    }

    pub fn license_of(&self, module: &ProjectModule) -> SupportedLicense {
        self.licenses
            .get(&module.name)
            .copied()
            .unwrap_or(SupportedLicense::NoLicense)
    }

    fn is_licensed(&self, module: &ProjectModule) -> bool {
        self.license_of(module) != SupportedLicense::NoLicense
    }

    pub fn is_ancestor(ancestor: &ProjectModule, descendant: &ProjectModule) -> bool {
        ancestor.path != descendant.path && descendant.path.starts_with(&ancestor.path)
    }

    /// Strict ancestors of `module`, nearest first.
    pub fn ancestors<'s>(
        &'s self,
        module: &'s ProjectModule,
    ) -> impl Iterator<Item = &'a ProjectModule> + 's {
        let by_path = &self.by_path;
        module
            .path
            .ancestors()
            .skip(1)
            .filter_map(move |p| by_path.get(p).copied())
    }

    /// Nearest strict ancestor carrying a license.
    pub fn nearest_licensed_ancestor(&self, module: &ProjectModule) -> Option<&'a ProjectModule> {
        self.ancestors(module).find(|m| self.is_licensed(m))
    }

    /// The module's own license, or else the nearest licensed ancestor's.
    pub fn inherited_license(&self, module: &ProjectModule) -> SupportedLicense {
        match self.license_of(module) {
            SupportedLicense::NoLicense => self.parent_license(module),
            own => own,
        }
    }

    /// License inherited from above, ignoring the module's own license.
    pub fn parent_license(&self, module: &ProjectModule) -> SupportedLicense {
        self.nearest_licensed_ancestor(module)
            .map(|m| self.license_of(m))
            .unwrap_or(SupportedLicense::NoLicense)
    }

    /// Whether walking up from `descendant` reaches `module` before any
    /// other licensed module.
    fn reports_to(&self, descendant: &ProjectModule, module: &ProjectModule) -> bool {
        if !Self::is_ancestor(module, descendant) {
            return false;
        }
        self.ancestors(descendant)
            .find(|m| m.path == module.path || self.is_licensed(m))
            .is_some_and(|m| m.path == module.path)
    }

    /// Licensed descendants not separated from `module` by another licensed module.
    pub fn direct_licensed_submodules(&self, module: &ProjectModule) -> Vec<&'a ProjectModule> {
        self.modules
            .iter()
            .filter(|d| self.is_licensed(d) && self.reports_to(d, module))
            .collect()
    }

    /// Unlicensed descendants whose dependencies count as `module`'s own.
    pub fn rolled_up_submodules(&self, module: &ProjectModule) -> Vec<&'a ProjectModule> {
        self.modules
            .iter()
            .filter(|d| !self.is_licensed(d) && self.reports_to(d, module))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Vec<ProjectModule>, BTreeMap<String, SupportedLicense>) {
        let modules = vec![
            ProjectModule::new("root", "/p"),
            ProjectModule::new("mid", "/p/mid"),
            ProjectModule::new("leaf", "/p/mid/leaf"),
            ProjectModule::new("deep", "/p/mid/leaf/x/deep"),
            ProjectModule::new("side", "/p/side"),
            ProjectModule::new("sidecar", "/p/sidecar"),
        ];
        let mut licenses = BTreeMap::new();
        licenses.insert("mid".to_string(), SupportedLicense::Mit);
        licenses.insert("deep".to_string(), SupportedLicense::Apache2);
        licenses.insert("root".to_string(), SupportedLicense::NoLicense);
        (modules, licenses)
    }

    fn find<'a>(modules: &'a [ProjectModule], name: &str) -> &'a ProjectModule {
        modules.iter().find(|m| m.name == name).unwrap()
    }

    #[test]
    fn test_inherited_license() {
        let (modules, licenses) = fixture();
        let tree = ModuleTree::new(&modules, &licenses);
        assert_eq!(tree.inherited_license(find(&modules, "leaf")), SupportedLicense::Mit);
        assert_eq!(tree.inherited_license(find(&modules, "root")), SupportedLicense::NoLicense);
        assert_eq!(tree.inherited_license(find(&modules, "mid")), SupportedLicense::Mit);
        assert_eq!(tree.parent_license(find(&modules, "mid")), SupportedLicense::NoLicense);
        assert_eq!(tree.parent_license(find(&modules, "deep")), SupportedLicense::Mit);
    }

    #[test]
    fn test_prefix_is_component_wise() {
        let (modules, _) = fixture();
        assert!(!ModuleTree::is_ancestor(find(&modules, "side"), find(&modules, "sidecar")));
        assert!(ModuleTree::is_ancestor(find(&modules, "root"), find(&modules, "sidecar")));
        assert!(!ModuleTree::is_ancestor(find(&modules, "root"), find(&modules, "root")));
    }

    #[test]
    fn test_direct_licensed_submodules_skip_unlicensed_levels() {
        let (modules, licenses) = fixture();
        let tree = ModuleTree::new(&modules, &licenses);

        let names = |v: Vec<&ProjectModule>| v.iter().map(|m| m.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(tree.direct_licensed_submodules(find(&modules, "root"))), vec!["mid"]);
        assert_eq!(names(tree.direct_licensed_submodules(find(&modules, "mid"))), vec!["deep"]);
        assert!(tree.direct_licensed_submodules(find(&modules, "leaf")).len() == 1);
        assert!(tree.direct_licensed_submodules(find(&modules, "deep")).is_empty());
    }

    #[test]
    fn test_rolled_up_submodules() {
        let (modules, licenses) = fixture();
        let tree = ModuleTree::new(&modules, &licenses);

        let names = |v: Vec<&ProjectModule>| v.iter().map(|m| m.name.clone()).collect::<Vec<_>>();
        assert_eq!(
            names(tree.rolled_up_submodules(find(&modules, "root"))),
            vec!["side", "sidecar"]
        );
        assert_eq!(names(tree.rolled_up_submodules(find(&modules, "mid"))), vec!["leaf"]);
    }
}
