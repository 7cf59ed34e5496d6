//! Shared job registry and dependency linking.
//!
//! The registry is the single map from job id to job handle, shared by every
//! timer task and firing. It is read-mostly after registration: the only
//! later mutation is appending to a parent's dependent list, which happens
//! under the owning job's state lock.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::error::SchedulerError;
use crate::job::JobHandle;

pub(crate) struct Registry {
    jobs: RwLock<HashMap<Uuid, Arc<JobHandle>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn insert(&self, job: Arc<JobHandle>) {
        self.jobs.write().unwrap().insert(job.id, job);
    }

    pub(crate) fn get(&self, id: &Uuid) -> Option<Arc<JobHandle>> {
        self.jobs.read().unwrap().get(id).cloned()
    }

    pub(crate) fn all(&self) -> Vec<Arc<JobHandle>> {
        self.jobs.read().unwrap().values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.read().unwrap().len()
    }

    /// Resolve every parent id, failing on the first unknown one.
    ///
    /// Runs before any edge is added so that a creation with a bad parent
    /// list leaves the graph untouched.
    pub(crate) fn resolve_parents(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<Arc<JobHandle>>, SchedulerError> {
        ids.iter()
            .map(|id| {
                self.get(id)
                    .ok_or(SchedulerError::UnresolvedParent { id: *id })
            })
            .collect()
    }

    /// Append `child` to `parent`'s dependent list.
    ///
    /// Fails with `UnresolvedParent` if the parent is unknown and with
    /// `CyclicDependency` if the new edge would close a cycle in the
    /// dependent graph.
    pub(crate) fn link_dependent(&self, parent: Uuid, child: Uuid) -> Result<(), SchedulerError> {
        let parent_job = self
            .get(&parent)
            .ok_or(SchedulerError::UnresolvedParent { id: parent })?;
        if self.reaches(child, parent) {
            return Err(SchedulerError::CyclicDependency { id: parent });
        }
        parent_job.state.lock().unwrap().dependent_jobs.push(child);
        Ok(())
    }

    /// Walk dependent edges from `from`; true when `target` is reachable.
    fn reaches(&self, from: Uuid, target: Uuid) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(job) = self.get(&id) {
                stack.extend(job.state.lock().unwrap().dependent_jobs.iter().copied());
            }
        }
        false
    }
}
