use notify::{recommended_watcher, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;

use crate::store::{Collection, Store};
use crate::Result;

/// Live subscription to collection changes. Dropping it unsubscribes.
pub struct CollectionWatcher {
    _watcher: RecommendedWatcher,
}

/// Map a changed file to its collection. Temp files and strangers map to `None`.
pub fn collection_for_path(path: &Path) -> Option<Collection> {
    let name = path.file_name()?.to_str()?;
    Collection::from_file_name(name)
}

/// Call `on_change` whenever a collection file is created, rewritten or removed.
///
/// Writes land as a rename, so one logical write usually yields one call, but
/// some platforms report more; callers should treat a call as "re-read".
pub fn watch<F>(store: &Store, on_change: F) -> Result<CollectionWatcher>
where
    F: Fn(Collection) + Send + 'static,
{
    let dir = store.collections_dir();
    std::fs::create_dir_all(&dir)?;

    let mut watcher = recommended_watcher(move |res: notify::Result<notify::Event>| {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "collection watcher error");
                return;
            }
        };
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return;
        }
        for path in &event.paths {
            if let Some(collection) = collection_for_path(path) {
                tracing::debug!(collection = collection.name(), "collection changed");
                on_change(collection);
            }
        }
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    tracing::info!(dir = %dir.display(), "watching collections");

    Ok(CollectionWatcher { _watcher: watcher })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    #[test]
    fn paths_map_to_collections() {
        let p = PathBuf::from("/data/collections/groups.json");
        assert_eq!(collection_for_path(&p), Some(Collection::Groups));

        let tmp = PathBuf::from("/data/collections/.groups.json.tmp");
        assert_eq!(collection_for_path(&tmp), None);

        let other = PathBuf::from("/data/config.json");
        assert_eq!(collection_for_path(&other), None);
    }

    #[test]
    fn writes_are_delivered_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let (tx, rx) = mpsc::channel();
        let watcher = watch(&store, move |c| {
            let _ = tx.send(c);
        })
        .unwrap();

        store
            .write(Collection::Groups, &vec![serde_json::json!({"id": "group-1"})])
            .unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut got = None;
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            match rx.recv_timeout(left) {
                Ok(Collection::Groups) => {
                    got = Some(Collection::Groups);
                    break;
                }
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        assert_eq!(got, Some(Collection::Groups));

        // Dropping the watcher drops the callback and its sender.
        drop(watcher);
        let deadline = Instant::now() + Duration::from_secs(5);
        let disconnected = loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(left) {
                Ok(_) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => break true,
                Err(mpsc::RecvTimeoutError::Timeout) => break false,
            }
        };
        assert!(disconnected);
    }
}
