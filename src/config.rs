use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::registry::MAX_BATCH_SIZE;

/// Root configuration structure, deserialized from `.license-compat/config.toml`.
///
/// Every section and field is optional; missing values take the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub remote: RemoteConfig,
    pub workspace: WorkspaceConfig,
    pub watch: WatchConfig,
    pub check: CheckConfig,
}

/// Thresholds of the two detection stages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum probability of the predicted class for the classifier to accept it.
    pub classifier_confidence: f32,
    /// A similarity match must score strictly above this Sørensen–Dice value.
    pub similarity_threshold: f64,
    /// Pretrained linear model (JSON). The built-in model is used when unset.
    pub model_path: Option<PathBuf>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            classifier_confidence: 0.8,
            similarity_threshold: 0.95,
            model_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    /// Identifiers per metadata request. Values above 25 are clamped.
    pub batch_size: usize,
    pub max_concurrent_batches: usize,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://repo1.maven.org/maven2".to_string(),
            batch_size: MAX_BATCH_SIZE,
            max_concurrent_batches: 4,
            timeout_secs: 10,
        }
    }
}

impl RemoteConfig {
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory names never descended into while discovering modules.
    pub exclude_dirs: Vec<String>,
    /// Local Maven repository used to read packaged dependency POMs.
    pub maven_local_repository: Option<PathBuf>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: ["target", "build", "node_modules", ".git", ".gradle", ".idea", "out"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            maven_local_repository: None,
        }
    }
}

impl WorkspaceConfig {
    pub fn maven_repository(&self) -> Option<PathBuf> {
        self.maven_local_repository
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".m2").join("repository")))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub structure_debounce_ms: u64,
    pub query_debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            structure_debounce_ms: 100,
            query_debounce_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Exit with code 1 when the check finds any issue.
    pub fail_on_issues: bool,
    /// `groupId:artifactId` identifiers left out of dependency issues.
    pub ignored_dependencies: Vec<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            fail_on_issues: true,
            ignored_dependencies: Vec::new(),
        }
    }
}

impl CheckConfig {
    /// Ignored identifiers, trimmed and lowercased like `PackageDependency::identifier`.
    pub fn ignored_identifiers(&self) -> BTreeSet<String> {
        self.ignored_dependencies
            .iter()
            .map(|i| i.trim().to_lowercase())
            .filter(|i| !i.is_empty())
            .collect()
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`: path passed via `--config`
/// 2. `<project_path>/.license-compat/config.toml`
/// 3. `~/.config/license-compat/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path.join(".license-compat").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("license-compat")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.detection.classifier_confidence, 0.8);
        assert_eq!(cfg.detection.similarity_threshold, 0.95);
        assert_eq!(cfg.remote.batch_size, 25);
        assert_eq!(cfg.watch.structure_debounce_ms, 100);
        assert_eq!(cfg.watch.query_debounce_ms, 200);
        assert!(cfg.check.fail_on_issues);
        assert!(cfg.workspace.exclude_dirs.contains(&"node_modules".to_string()));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [detection]
            similarity_threshold = 0.98

            [check]
            ignored_dependencies = ["org.example:lib"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.detection.similarity_threshold, 0.98);
        assert_eq!(cfg.detection.classifier_confidence, 0.8);
        assert!(cfg.check.fail_on_issues);
        assert!(cfg.check.ignored_identifiers().contains("org.example:lib"));
        assert_eq!(cfg.remote.max_concurrent_batches, 4);
    }

    #[test]
    fn test_batch_size_is_clamped() {
        let remote = RemoteConfig {
            batch_size: 500,
            ..RemoteConfig::default()
        };
        assert_eq!(remote.effective_batch_size(), 25);
        let remote = RemoteConfig {
            batch_size: 0,
            ..RemoteConfig::default()
        };
        assert_eq!(remote.effective_batch_size(), 1);
    }

    #[test]
    fn test_project_config_is_found() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_dir = dir.path().join(".license-compat");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[watch]\nstructure_debounce_ms = 5\n",
        )
        .unwrap();

        let cfg = load_config(dir.path(), None).unwrap();
        assert_eq!(cfg.watch.structure_debounce_ms, 5);
        assert_eq!(cfg.watch.query_debounce_ms, 200);
    }

    #[test]
    fn test_override_wins_and_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[detection\n").unwrap();
        assert!(load_config(dir.path(), Some(&path)).is_err());
    }
}
