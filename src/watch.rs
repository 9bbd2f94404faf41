use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::license::detection::is_license_file;
use crate::refresh::RefreshTrigger;
use crate::workspace::DEPENDENCY_FILES;

/// File-system watcher over a project tree, reporting changes that need a refresh.
pub struct ProjectWatcher {
    _watcher: RecommendedWatcher,
    events: mpsc::Receiver<notify::Result<Event>>,
    root: PathBuf,
    exclude_dirs: Vec<String>,
}

impl ProjectWatcher {
    pub fn start(root: &Path, exclude_dirs: &[String]) -> Result<Self> {
        let (tx, events) = mpsc::channel(1024);
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.blocking_send(res);
            },
            notify::Config::default(),
        )
        .context("creating file watcher")?;
        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("watching {}", root.display()))?;
        debug!(root = %root.display(), "watching project");

        Ok(Self {
            _watcher: watcher,
            events,
            root: root.to_path_buf(),
            exclude_dirs: exclude_dirs.to_vec(),
        })
    }

    /// Wait for the next relevant change. `None` once the watcher has shut down.
    pub async fn next_trigger(&mut self) -> Option<RefreshTrigger> {
        while let Some(result) = self.events.recv().await {
            match result {
                Ok(event) => {
                    if let Some(trigger) = classify_event(&event, &self.root, &self.exclude_dirs) {
                        debug!(?trigger, paths = ?event.paths, "project change");
                        return Some(trigger);
                    }
                }
                Err(e) => warn!(error = %e, "file watcher error"),
            }
        }
        None
    }
}

/// The refresh an event calls for; `Structure` wins over `Query` when paths disagree.
pub fn classify_event(
    event: &Event,
    root: &Path,
    exclude_dirs: &[String],
) -> Option<RefreshTrigger> {
    if matches!(event.kind, EventKind::Access(_)) {
        return None;
    }
    let structural_kind = matches!(
        event.kind,
        EventKind::Create(CreateKind::Folder)
            | EventKind::Remove(RemoveKind::Folder)
            | EventKind::Modify(ModifyKind::Name(_))
    );

    let mut trigger = None;
    for path in &event.paths {
        if is_excluded(path, root, exclude_dirs) {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if structural_kind || DEPENDENCY_FILES.contains(&name.as_str()) {
            return Some(RefreshTrigger::Structure);
        }
        if is_license_file(&name) {
            trigger = Some(RefreshTrigger::Query);
        }
    }
    trigger
}

fn is_excluded(path: &Path, root: &Path, exclude_dirs: &[String]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        // The last component is the file itself.
        if components.peek().is_none() {
            break;
        }
        if let Component::Normal(dir) = component {
            let dir = dir.to_string_lossy();
            if dir.starts_with('.') || exclude_dirs.iter().any(|d| *d == dir) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use notify::event::{AccessKind, CreateKind, DataChange};

    use super::*;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    fn excludes() -> Vec<String> {
        vec!["target".to_string()]
    }

    #[test]
    fn test_classify_event() {
        let root = Path::new("/p");
        let modify = EventKind::Modify(ModifyKind::Data(DataChange::Content));

        assert_eq!(
            classify_event(&event(modify, "/p/core/pom.xml"), root, &excludes()),
            Some(RefreshTrigger::Structure)
        );
        assert_eq!(
            classify_event(&event(modify, "/p/core/LICENSE"), root, &excludes()),
            Some(RefreshTrigger::Query)
        );
        let new_folder = EventKind::Create(CreateKind::Folder);
        assert_eq!(
            classify_event(&event(new_folder, "/p/newmod"), root, &excludes()),
            Some(RefreshTrigger::Structure)
        );
        assert_eq!(
            classify_event(&event(modify, "/p/core/src/Main.java"), root, &excludes()),
            None
        );
        assert_eq!(
            classify_event(&event(modify, "/p/target/pom.xml"), root, &excludes()),
            None
        );
        assert_eq!(
            classify_event(&event(modify, "/p/.git/LICENSE"), root, &excludes()),
            None
        );
        let access = EventKind::Access(AccessKind::Any);
        assert_eq!(
            classify_event(&event(access, "/p/pom.xml"), root, &excludes()),
            None
        );
    }

    #[test]
    fn test_structure_wins_over_query() {
        let ev = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/p/LICENSE"))
            .add_path(PathBuf::from("/p/build.gradle"));
        assert_eq!(
            classify_event(&ev, Path::new("/p"), &[]),
            Some(RefreshTrigger::Structure)
        );
    }

    #[tokio::test]
    async fn test_watcher_reports_license_change() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let mut watcher = ProjectWatcher::start(&root, &excludes()).unwrap();

        std::fs::write(root.join("LICENSE"), "MIT").unwrap();
        let trigger = tokio::time::timeout(Duration::from_secs(10), watcher.next_trigger())
            .await
            .unwrap();
        assert_eq!(trigger, Some(RefreshTrigger::Query));
    }
}
