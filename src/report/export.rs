use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::compat::CompatibilityReport;
use crate::license::{License, SupportedLicense};
use crate::models::{CompatibilityIssueData, ProjectSnapshot};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    pub name: String,
    pub spdx_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

impl From<&License> for LicenseInfo {
    fn from(license: &License) -> Self {
        Self {
            name: license.name().to_string(),
            spdx_id: license.spdx_id().map(str::to_string),
            url: license.url().map(str::to_string),
            html_url: license.html_url().map(str::to_string),
        }
    }
}

impl From<SupportedLicense> for LicenseInfo {
    fn from(license: SupportedLicense) -> Self {
        Self::from(&License::from(license))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootModuleInfo {
    pub name: String,
    pub path: String,
    pub license: LicenseInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyInfo {
    pub name: String,
    pub main_license: Option<LicenseInfo>,
    pub other_licenses: Vec<LicenseInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub name: String,
    pub path: String,
    pub dependencies: Vec<DependencyInfo>,
    pub compatible_licenses: Vec<SupportedLicense>,
}

/// Machine-readable analysis result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub root_module: Option<RootModuleInfo>,
    pub modules_info: Vec<ModuleInfo>,
    pub compatibility_issues: CompatibilityIssueData,
}

impl ExportDocument {
    pub fn new(snapshot: &ProjectSnapshot, report: &CompatibilityReport) -> Self {
        let root_module = snapshot.root_module().map(|root| RootModuleInfo {
            name: root.name.clone(),
            path: root.path.display().to_string(),
            license: snapshot.license_of(root).into(),
        });

        let modules_info = snapshot
            .modules
            .iter()
            .map(|module| ModuleInfo {
                name: module.name.clone(),
                path: module.path.display().to_string(),
                dependencies: snapshot
                    .dependencies_of(&module.name)
                    .map(|dep| DependencyInfo {
                        name: dep.identifier(),
                        main_license: dep.main_license().map(LicenseInfo::from),
                        other_licenses: dep
                            .other_licenses()
                            .iter()
                            .map(LicenseInfo::from)
                            .collect(),
                    })
                    .collect(),
                compatible_licenses: report
                    .module(&module.name)
                    .map(|m| m.compatible.clone())
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            root_module,
            modules_info,
            compatibility_issues: report.issues.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing report")
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("writing report to {}", path.display()))
    }
}
