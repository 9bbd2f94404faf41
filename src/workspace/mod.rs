//! Discovers modules, their license files and their declared dependencies on disk.

pub mod gradle;
pub mod jar_meta;
pub mod pom;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::WorkspaceConfig;
use crate::license::detection::{is_license_file, DetectionManager};
use crate::license::SupportedLicense;
use crate::models::{identifier, PackageDependency, ProjectModule, ProjectSnapshot};

use jar_meta::LocalRepository;

/// Files whose presence makes a directory a module.
pub const BUILD_MANIFESTS: &[&str] = &["pom.xml", "build.gradle", "build.gradle.kts"];

/// Files that declare dependencies.
pub const DEPENDENCY_FILES: &[&str] =
    &["pom.xml", "build.gradle", "build.gradle.kts", "gradle.lockfile"];

/// A `group:artifact:version` coordinate as written in a build file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

/// Builds [`ProjectSnapshot`]s from a project directory.
pub struct WorkspaceScanner {
    root: PathBuf,
    exclude_dirs: Vec<String>,
    detection: DetectionManager,
    local_repository: Option<LocalRepository>,
}

impl WorkspaceScanner {
    pub fn new(
        root: impl Into<PathBuf>,
        config: &WorkspaceConfig,
        detection: DetectionManager,
    ) -> Self {
        Self {
            root: root.into(),
            exclude_dirs: config.exclude_dirs.clone(),
            detection,
            local_repository: config.maven_repository().map(LocalRepository::new),
        }
    }

    pub fn detection(&self) -> &DetectionManager {
        &self.detection
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        name.starts_with('.') || self.exclude_dirs.iter().any(|d| d == name)
    }

    fn keep_entry(&self, entry: &DirEntry) -> bool {
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || !self.is_excluded_dir(&entry.file_name().to_string_lossy())
    }

    /// The root plus every directory below it holding a build manifest, ordered by path.
    pub fn discover_modules(&self) -> Vec<ProjectModule> {
        let mut modules = vec![ProjectModule::new(self.root_name(), self.root.clone())];

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.keep_entry(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if entry.file_type().is_dir() && is_module_dir(entry.path()) {
                modules.push(ProjectModule::new(
                    self.module_name(entry.path()),
                    entry.path().to_path_buf(),
                ));
            }
        }
        modules
    }

    fn root_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    /// Root-relative path with `/` separators; `./`-prefixed when it would
    /// collide with the root module's name.
    fn module_name(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(relative) if !relative.as_os_str().is_empty() => {
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if name == self.root_name() {
                    format!("./{name}")
                } else {
                    name
                }
            }
            _ => self.root_name(),
        }
    }

    /// License of the first license file in `dir` that detects as a catalog license.
    pub fn detect_module_license(&self, dir: &Path) -> SupportedLicense {
        for file in license_files(dir) {
            let text = match std::fs::read_to_string(&file) {
                Ok(text) => text,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "cannot read license file");
                    continue;
                }
            };
            let license = self.detection.detect_full_text(&text);
            if license != SupportedLicense::NoLicense {
                debug!(file = %file.display(), license = %license, "detected module license");
                return license;
            }
        }
        SupportedLicense::NoLicense
    }

    /// Licenses declared by an artifact in the local repository, resolved against the catalog.
    fn jar_meta_licenses(&self, dep: &DeclaredDependency) -> Vec<crate::license::License> {
        let Some(repo) = &self.local_repository else {
            return Vec::new();
        };
        repo.license_names(&dep.group_id, &dep.artifact_id, &dep.version)
            .iter()
            .map(|name| self.detection.detect_by_name_or_spdx(name))
            .filter(|l| !l.is_no_license())
            .collect()
    }

    pub fn scan(&self) -> ProjectSnapshot {
        let modules = self.discover_modules();

        let mut module_licenses = BTreeMap::new();
        let mut dependencies: Vec<PackageDependency> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for module in &modules {
            module_licenses.insert(module.name.clone(), self.detect_module_license(&module.path));

            for declared in declared_dependencies(&module.path) {
                let id = identifier(&declared.group_id, &declared.artifact_id);
                let slot = *index.entry(id).or_insert_with(|| {
                    dependencies.push(PackageDependency::new(
                        declared.group_id.clone(),
                        declared.artifact_id.clone(),
                    ));
                    dependencies.len() - 1
                });

                let dependency = &mut dependencies[slot];
                dependency.install(&module.name, &declared.version);
                if dependency.licenses_from_jar_meta_info.is_empty() {
                    dependency.licenses_from_jar_meta_info = self.jar_meta_licenses(&declared);
                }
            }
        }

        debug!(
            modules = modules.len(),
            dependencies = dependencies.len(),
            "scanned workspace"
        );

        ProjectSnapshot {
            root: self.root.clone(),
            modules,
            module_licenses,
            dependencies,
            ignored_dependencies: BTreeSet::new(),
        }
    }
}

pub fn is_module_dir(dir: &Path) -> bool {
    BUILD_MANIFESTS.iter().any(|m| dir.join(m).is_file())
}

/// License candidate files directly inside `dir`, by name.
pub fn license_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|e| is_license_file(&e.file_name().to_string_lossy()))
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

/// Dependencies declared by the build files in `dir`, deduplicated by identifier.
pub fn declared_dependencies(dir: &Path) -> Vec<DeclaredDependency> {
    let mut declared: Vec<DeclaredDependency> = Vec::new();

    for file in DEPENDENCY_FILES {
        let path = dir.join(file);
        if !path.is_file() {
            continue;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "cannot read build file");
                continue;
            }
        };
        let parsed = match *file {
            "pom.xml" => pom::parse_dependencies(&content).unwrap_or_else(|e| {
                warn!(file = %path.display(), error = %e, "cannot parse POM");
                Vec::new()
            }),
            "gradle.lockfile" => gradle::parse_lockfile(&content),
            _ => gradle::parse_build_script(&content),
        };

        for dep in parsed {
            let id = identifier(&dep.group_id, &dep.artifact_id);
            match declared
                .iter_mut()
                .find(|d| identifier(&d.group_id, &d.artifact_id) == id)
            {
                // A lockfile pins the version a build script may leave open.
                Some(existing) if existing.version.is_empty() => existing.version = dep.version,
                Some(_) => {}
                None => declared.push(dep),
            }
        }
    }
    declared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DetectionConfig, WorkspaceConfig};

    fn scanner(root: &Path, repo: &Path) -> WorkspaceScanner {
        let config = WorkspaceConfig {
            maven_local_repository: Some(repo.to_path_buf()),
            ..WorkspaceConfig::default()
        };
        WorkspaceScanner::new(
            root,
            &config,
            DetectionManager::from_config(&DetectionConfig::default()),
        )
    }

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    const POM: &str = r#"<project>
  <dependencies>
    <dependency>
      <groupId>org.gnu</groupId>
      <artifactId>readline</artifactId>
      <version>8.0</version>
    </dependency>
  </dependencies>
</project>"#;

    #[test]
    fn test_discover_modules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("shop");
        write(&root.join("pom.xml"), "<project/>");
        write(&root.join("api/pom.xml"), "<project/>");
        write(&root.join("api/impl/build.gradle"), "");
        write(&root.join("docs/readme.md"), "");
        write(&root.join("target/generated/pom.xml"), "<project/>");
        write(&root.join(".hidden/pom.xml"), "<project/>");

        let repo = tempfile::tempdir().unwrap();
        let names: Vec<String> = scanner(&root, repo.path())
            .discover_modules()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["shop", "api", "api/impl"]);
    }

    #[test]
    fn test_submodule_named_like_root_gets_distinct_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("core");
        write(&root.join("pom.xml"), "<project/>");
        write(&root.join("core/pom.xml"), POM);
        write(&root.join("core/LICENSE"), SupportedLicense::Mit.full_text());

        let repo = tempfile::tempdir().unwrap();
        let snapshot = scanner(&root, repo.path()).scan();
        let names: Vec<&str> = snapshot.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["core", "./core"]);
        assert_eq!(snapshot.module_licenses["core"], SupportedLicense::NoLicense);
        assert_eq!(snapshot.module_licenses["./core"], SupportedLicense::Mit);
        assert!(snapshot.dependencies[0].is_installed_in("./core"));
        assert!(!snapshot.dependencies[0].is_installed_in("core"));
    }

    #[test]
    fn test_scan_builds_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("app");
        write(&root.join("pom.xml"), "<project/>");
        write(&root.join("LICENSE"), SupportedLicense::Apache2.full_text());
        write(&root.join("cli/pom.xml"), POM);
        write(&root.join("cli/README.md"), "not a license");

        let repo = tempfile::tempdir().unwrap();
        write(
            &repo.path().join("org/gnu/readline/8.0/readline-8.0.pom"),
            "<project><licenses><license><name>GPL-3.0-only</name></license></licenses></project>",
        );

        let snapshot = scanner(&root, repo.path()).scan();
        assert_eq!(snapshot.modules.len(), 2);
        assert_eq!(snapshot.module_licenses["app"], SupportedLicense::Apache2);
        assert_eq!(snapshot.module_licenses["cli"], SupportedLicense::NoLicense);

        let dep = &snapshot.dependencies[0];
        assert_eq!(dep.identifier(), "org.gnu:readline");
        assert!(dep.is_installed_in("cli"));
        assert_eq!(
            dep.main_license().and_then(|l| l.as_known()),
            Some(SupportedLicense::Gpl3Only)
        );
    }

    #[test]
    fn test_lockfile_pins_open_versions() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("build.gradle"),
            "dependencies {\n    implementation 'org.yaml:snakeyaml'\n}\n",
        );
        write(
            &dir.path().join("gradle.lockfile"),
            "org.yaml:snakeyaml:2.2=runtimeClasspath\n",
        );
        let deps = declared_dependencies(dir.path());
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].version, "2.2");
    }

    #[test]
    fn test_license_files_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("LICENSE.md"), "");
        write(&dir.path().join("COPYING"), "");
        write(&dir.path().join("main.rs"), "");
        let names: Vec<String> = license_files(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["COPYING", "LICENSE.md"]);
    }
}
