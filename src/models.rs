use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::license::{License, SupportedLicense};

/// A build module of the scanned project. Hierarchy is derived from `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectModule {
    pub name: String,
    pub path: PathBuf,
}

impl ProjectModule {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// One module installing a dependency, at one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationInformation {
    pub module_name: String,
    pub version: String,
}

/// License metadata fetched from the package registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteInfo {
    pub main_license: Option<License>,
    pub other_licenses: Vec<License>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub installation_information: Vec<InstallationInformation>,
    pub remote_info: Option<RemoteInfo>,
    /// Licenses declared by the packaged artifact itself; preferred over `remote_info`.
    pub licenses_from_jar_meta_info: Vec<License>,
}

impl PackageDependency {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            installation_information: Vec::new(),
            remote_info: None,
            licenses_from_jar_meta_info: Vec::new(),
        }
    }

    /// `groupId:artifactId`, lowercased.
    pub fn identifier(&self) -> String {
        identifier(&self.group_id, &self.artifact_id)
    }

    /// `groupId:artifactId` as declared; repository paths are case-sensitive.
    pub fn coordinate(&self) -> String {
        format!("{}:{}", self.group_id.trim(), self.artifact_id.trim())
    }

    pub fn is_installed(&self) -> bool {
        !self.installation_information.is_empty()
    }

    pub fn is_installed_in(&self, module_name: &str) -> bool {
        self.installation_information
            .iter()
            .any(|i| i.module_name == module_name)
    }

    /// Record an installation, ignoring repeats for the same module.
    pub fn install(&mut self, module_name: &str, version: &str) {
        if !self.is_installed_in(module_name) {
            self.installation_information.push(InstallationInformation {
                module_name: module_name.to_string(),
                version: version.to_string(),
            });
        }
    }

    pub fn main_license(&self) -> Option<&License> {
        self.licenses_from_jar_meta_info.first().or_else(|| {
            self.remote_info
                .as_ref()
                .and_then(|info| info.main_license.as_ref())
        })
    }

    /// Every other known license of this dependency, without duplicates.
    pub fn other_licenses(&self) -> Vec<License> {
        let main = self.main_license();
        let remote = self.remote_info.iter().flat_map(|info| {
            info.main_license
                .iter()
                .chain(info.other_licenses.iter())
        });

        let mut others: Vec<License> = Vec::new();
        for license in self.licenses_from_jar_meta_info.iter().chain(remote) {
            if Some(license) != main && !others.contains(license) {
                others.push(license.clone());
            }
        }
        others
    }

    /// Main license followed by [`other_licenses`](Self::other_licenses).
    pub fn all_licenses(&self) -> Vec<License> {
        let mut all: Vec<License> = self.main_license().cloned().into_iter().collect();
        all.extend(self.other_licenses());
        all
    }
}

pub fn identifier(group_id: &str, artifact_id: &str) -> String {
    format!("{}:{}", group_id.trim(), artifact_id.trim()).to_lowercase()
}

/// Everything the compatibility engine reads, captured at one point in time.
#[derive(Debug, Clone, Default)]
pub struct ProjectSnapshot {
    pub root: PathBuf,
    pub modules: Vec<ProjectModule>,
    /// Licenses detected from module license files, by module name.
    pub module_licenses: BTreeMap<String, SupportedLicense>,
    pub dependencies: Vec<PackageDependency>,
    /// Lowercased identifiers excluded from dependency issues only.
    pub ignored_dependencies: BTreeSet<String>,
}

impl ProjectSnapshot {
    pub fn license_of(&self, module: &ProjectModule) -> SupportedLicense {
        self.module_licenses
            .get(&module.name)
            .copied()
            .unwrap_or(SupportedLicense::NoLicense)
    }

    pub fn root_module(&self) -> Option<&ProjectModule> {
        self.modules.iter().find(|m| m.path == self.root)
    }

    pub fn dependencies_of<'a>(
        &'a self,
        module_name: &'a str,
    ) -> impl Iterator<Item = &'a PackageDependency> + 'a {
        self.dependencies
            .iter()
            .filter(move |d| d.is_installed_in(module_name))
    }

    /// Whether `dependency` is left out of dependency issues.
    pub fn is_ignored(&self, dependency: &PackageDependency) -> bool {
        self.ignored_dependencies.contains(&dependency.identifier())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDependencyIssue {
    pub dependency_identifier: String,
    pub license_name: String,
}

/// Dependencies installed into one module whose licenses do not permit the
/// module's inherited license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDependencyIssueGroup {
    pub module_name: String,
    pub module_license_name: String,
    pub issues: Vec<PackageDependencyIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmoduleIssue {
    pub submodule_name: String,
    pub license_name: String,
}

/// Direct licensed submodules whose licenses may not be nested under the module's license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmoduleIssueGroup {
    pub module_name: String,
    pub module_license_name: String,
    pub issues: Vec<SubmoduleIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityIssueData {
    pub package_dependency_issues: Vec<PackageDependencyIssueGroup>,
    pub submodule_issues: Vec<SubmoduleIssueGroup>,
}

impl CompatibilityIssueData {
    pub fn is_empty(&self) -> bool {
        self.package_dependency_issues.is_empty() && self.submodule_issues.is_empty()
    }

    pub fn issue_count(&self) -> usize {
        self.package_dependency_issues
            .iter()
            .map(|g| g.issues.len())
            .sum::<usize>()
            + self
                .submodule_issues
                .iter()
                .map(|g| g.issues.len())
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::UnsupportedLicense;

    fn remote(main: Option<License>, others: Vec<License>) -> Option<RemoteInfo> {
        Some(RemoteInfo {
            main_license: main,
            other_licenses: others,
        })
    }

    #[test]
    fn test_identifier_is_lowercased() {
        let dep = PackageDependency::new("Org.Example", "My-Lib");
        assert_eq!(dep.identifier(), "org.example:my-lib");
        assert_eq!(dep.coordinate(), "Org.Example:My-Lib");
    }

    #[test]
    fn test_installed_is_derived() {
        let mut dep = PackageDependency::new("g", "a");
        assert!(!dep.is_installed());
        dep.install("core", "1.0");
        dep.install("core", "1.0");
        assert!(dep.is_installed());
        assert_eq!(dep.installation_information.len(), 1);
    }

    #[test]
    fn test_jar_meta_info_is_preferred() {
        let mut dep = PackageDependency::new("g", "a");
        dep.remote_info = remote(Some(SupportedLicense::Mit.into()), vec![]);
        assert_eq!(dep.main_license(), Some(&License::from(SupportedLicense::Mit)));

        dep.licenses_from_jar_meta_info = vec![SupportedLicense::Apache2.into()];
        assert_eq!(dep.main_license(), Some(&License::from(SupportedLicense::Apache2)));
        assert_eq!(dep.other_licenses(), vec![License::from(SupportedLicense::Mit)]);
    }

    #[test]
    fn test_other_licenses_exclude_main_and_duplicates() {
        let mut dep = PackageDependency::new("g", "a");
        let custom = License::Unsupported(UnsupportedLicense::from_name("Custom"));
        dep.remote_info = remote(
            Some(SupportedLicense::Epl2.into()),
            vec![
                SupportedLicense::Lgpl21Only.into(),
                SupportedLicense::Epl2.into(),
                custom.clone(),
                SupportedLicense::Lgpl21Only.into(),
            ],
        );
        assert_eq!(
            dep.other_licenses(),
            vec![License::from(SupportedLicense::Lgpl21Only), custom]
        );
        assert_eq!(dep.all_licenses().len(), 3);
    }

    #[test]
    fn test_unknown_main_license() {
        let dep = PackageDependency::new("g", "a");
        assert!(dep.main_license().is_none());
        assert!(dep.all_licenses().is_empty());
    }
}
