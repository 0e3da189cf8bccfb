//! In-memory entity archive.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::catalog::MaterializedEntity;
use crate::ports::{ArchiveError, CommitRequest, EntityArchive};

/// Entity archive backed by a process-local list.
///
/// Supports failure injection for exercising commit error paths.
#[derive(Debug, Default)]
pub struct InMemoryEntityArchive {
    committed: Mutex<Vec<MaterializedEntity>>,
    failure: Option<String>,
}

impl InMemoryEntityArchive {
    /// Creates an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an archive whose `materialize` always fails with the given
    /// message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            committed: Mutex::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    /// Returns the committed entities, oldest first.
    pub fn committed(&self) -> Vec<MaterializedEntity> {
        self.committed.lock().expect("archive poisoned").clone()
    }

    /// Returns the number of committed entities.
    pub fn len(&self) -> usize {
        self.committed.lock().expect("archive poisoned").len()
    }

    /// Returns true if nothing has been committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EntityArchive for InMemoryEntityArchive {
    async fn materialize(&self, request: CommitRequest) -> Result<MaterializedEntity, ArchiveError> {
        if let Some(message) = &self.failure {
            return Err(ArchiveError::storage(message.clone()));
        }

        let id = request.entity_id.unwrap_or_default();
        let entity = MaterializedEntity::new(id, request.fields, request.session_id);
        self.committed
            .lock()
            .expect("archive poisoned")
            .push(entity.clone());
        Ok(entity)
    }
}
