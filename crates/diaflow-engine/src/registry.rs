use indexmap::IndexMap;

use crate::path::{Path, PathId};

/// Live paths of one session, in insertion order.
#[derive(Debug, Default)]
pub struct FlowRegistry {
    paths: IndexMap<PathId, Path>,
}

impl FlowRegistry {
    pub fn insert(&mut self, path: Path) {
        self.paths.insert(path.id(), path);
    }

    pub fn remove(&mut self, id: PathId) -> Option<Path> {
        self.paths.shift_remove(&id)
    }

    pub fn get(&self, id: PathId) -> Option<&Path> {
        self.paths.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: PathId) -> Option<&mut Path> {
        self.paths.get_mut(&id)
    }

    /// Snapshot of the current ids, used to iterate while paths are added or removed.
    pub fn ids(&self) -> Vec<PathId> {
        self.paths.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.values()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub(crate) fn adopt(&mut self, paths: Vec<Path>) {
        for path in paths {
            self.insert(path);
        }
    }
}
