// ── Project collection ──
//
// Insertion-ordered project map plus the version counter and pending
// simulator transitions. Always accessed under the store's state lock.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::Project;
use crate::simulator::Transitions;
use crate::stream::Snapshot;

#[derive(Default)]
pub(crate) struct Collection {
    pub(super) projects: IndexMap<String, Project>,
    pub(super) transitions: Transitions,
    version: u64,
}

impl Collection {
    pub(super) fn get(&self, id: &str) -> Option<&Project> {
        self.projects.get(id)
    }

    pub(super) fn contains(&self, id: &str) -> bool {
        self.projects.contains_key(id)
    }

    /// Insert or replace by id. Replacing keeps the original position.
    /// Returns `true` if anything changed.
    pub(super) fn upsert(&mut self, project: Project) -> bool {
        if self.projects.get(&project.id) == Some(&project) {
            return false;
        }
        self.projects.insert(project.id.clone(), project);
        true
    }

    /// Remove by id, cancelling any pending transition for it.
    pub(super) fn remove(&mut self, id: &str) -> Option<Project> {
        self.transitions.cancel(id);
        self.projects.shift_remove(id)
    }

    /// Remove every project called `name`. Returns how many were removed.
    pub(super) fn remove_named(&mut self, name: &str) -> usize {
        let ids: Vec<String> = self
            .projects
            .values()
            .filter(|p| p.name == name)
            .map(|p| p.id.clone())
            .collect();
        for id in &ids {
            self.remove(id);
        }
        ids.len()
    }

    /// Replace the whole list. Returns `true` if it differs from the current one.
    pub(super) fn replace_all(&mut self, projects: Vec<Project>) -> bool {
        if self.projects.len() == projects.len()
            && self.projects.values().zip(&projects).all(|(a, b)| a == b)
        {
            return false;
        }
        self.projects = projects.into_iter().map(|p| (p.id.clone(), p)).collect();
        true
    }

    pub(super) fn to_vec(&self) -> Vec<Project> {
        self.projects.values().cloned().collect()
    }

    /// Bump the version and take a snapshot of the current list.
    pub(super) fn commit(&mut self) -> (u64, Snapshot) {
        self.version += 1;
        (self.version, Arc::new(self.to_vec()))
    }
}
