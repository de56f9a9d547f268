//! Persistence collaborators for assessment aggregates.
//!
//! The engine never touches storage itself; the service loads an aggregate,
//! runs the engine and saves the result through one of these stores.

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::{MasteryError, Result};
use crate::models::AssessmentAggregate;

pub trait AssessmentStore: Send + Sync {
    fn load(
        &self,
        student_id: &str,
    ) -> impl Future<Output = Result<Option<AssessmentAggregate>>> + Send;

    fn save(&self, aggregate: &AssessmentAggregate) -> impl Future<Output = Result<()>> + Send;
}

/// Student ids become file names, so only a conservative character set is allowed.
pub fn validate_student_id(student_id: &str) -> Result<()> {
    let valid = !student_id.is_empty()
        && student_id.len() <= 128
        && !student_id.starts_with('.')
        && student_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));
    if valid {
        Ok(())
    } else {
        Err(MasteryError::InvalidStudentId(student_id.to_string()))
    }
}

/// One pretty-printed JSON file per student under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, student_id: &str) -> Result<PathBuf> {
        validate_student_id(student_id)?;
        Ok(self.dir.join(format!("{student_id}.json")))
    }

    /// Ids of every stored student, sorted.
    pub async fn list_students(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut students = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                students.push(stem.to_string());
            }
        }
        students.sort();
        Ok(students)
    }
}

impl AssessmentStore for JsonFileStore {
    #[instrument(level = "debug", skip(self))]
    async fn load(&self, student_id: &str) -> Result<Option<AssessmentAggregate>> {
        let path = self.path_for(student_id)?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut aggregate: AssessmentAggregate = serde_json::from_str(&raw)?;
        aggregate.validate()?;
        aggregate.normalize_order();
        debug!(target: "skill_mastery", path = %path.display(), "Loaded assessment");
        Ok(Some(aggregate))
    }

    #[instrument(level = "debug", skip(self, aggregate), fields(student_id = %aggregate.student_id))]
    async fn save(&self, aggregate: &AssessmentAggregate) -> Result<()> {
        let path = self.path_for(&aggregate.student_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_vec_pretty(aggregate)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(target: "skill_mastery", path = %path.display(), "Saved assessment");
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    aggregates: Arc<RwLock<HashMap<String, AssessmentAggregate>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.aggregates.read().await.len()
    }
}

impl AssessmentStore for MemoryStore {
    async fn load(&self, student_id: &str) -> Result<Option<AssessmentAggregate>> {
        Ok(self.aggregates.read().await.get(student_id).cloned())
    }

    async fn save(&self, aggregate: &AssessmentAggregate) -> Result<()> {
        validate_student_id(&aggregate.student_id)?;
        self.aggregates
            .write()
            .await
            .insert(aggregate.student_id.clone(), aggregate.clone());
        Ok(())
    }
}
