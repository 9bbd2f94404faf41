use std::path::{Path, PathBuf};

use tracing::debug;

use super::pom;

/// Reads license declarations from artifacts already present in a local Maven repository.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/<group as path>/<artifact>/<version>/<artifact>-<version>.pom`
    pub fn pom_path(&self, group_id: &str, artifact_id: &str, version: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(group_id.split('.'));
        path.push(artifact_id);
        path.push(version);
        path.push(format!("{artifact_id}-{version}.pom"));
        path
    }

    /// License names of the installed artifact; empty when it is absent or unreadable.
    pub fn license_names(&self, group_id: &str, artifact_id: &str, version: &str) -> Vec<String> {
        if version.is_empty() || version.contains("${") {
            return Vec::new();
        }
        let path = self.pom_path(group_id, artifact_id, version);
        read_license_names(&path)
    }
}

fn read_license_names(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    match pom::license_names(&content) {
        Ok(names) => names,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "skipping unparsable packaged POM");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_installed_pom() {
        let dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(dir.path());
        let path = repo.pom_path("org.apache.commons", "commons-lang3", "3.12.0");
        assert!(path.ends_with("org/apache/commons/commons-lang3/3.12.0/commons-lang3-3.12.0.pom"));

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "<project><licenses><license><name>Apache-2.0</name></license></licenses></project>",
        )
        .unwrap();

        assert_eq!(
            repo.license_names("org.apache.commons", "commons-lang3", "3.12.0"),
            vec!["Apache-2.0".to_string()]
        );
    }

    #[test]
    fn test_missing_or_unresolved_versions() {
        let dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(dir.path());
        assert!(repo.license_names("g", "a", "1.0").is_empty());
        assert!(repo.license_names("g", "a", "").is_empty());
        assert!(repo.license_names("g", "a", "${v}").is_empty());
    }
}
