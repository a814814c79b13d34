use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::api::Backend;
use crate::error::Result;
use crate::filter::TaskFilter;
use crate::task::{Label, Task, TaskCreate, TaskPatch};

/// Counts derived from the held collection. Recomputed on every call and
/// never stored, so `overdue` tracks the clock without a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub overdue: usize,
}

/// Handle for one outstanding load. Completions commit in any order; a
/// ticket older than the latest issued one is discarded, so a superseded
/// load can never overwrite a newer result.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    filter: TaskFilter,
}

impl LoadTicket {
    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }
}

/// Owns the visible task collection and label vocabulary for one
/// authenticated session. Every mutation goes through the server and, on
/// success, triggers a full reload under the current filter -- no
/// incremental patching.
#[derive(Debug)]
pub struct TaskList<B: Backend> {
    backend: B,
    filter: TaskFilter,
    tasks: Vec<Task>,
    labels: Vec<Label>,
    generation: u64,
    loaded: bool,
    notices: Vec<String>,
}

impl<B: Backend> TaskList<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            filter: TaskFilter::default(),
            tasks: vec![],
            labels: vec![],
            generation: 0,
            loaded: false,
            notices: vec![],
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    /// False until the first successful load, so an empty collection is
    /// distinguishable from "never loaded" or "failed to load".
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Drain accumulated human-readable notifications. Every failed
    /// mutation contributes exactly one.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> Summary {
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        let overdue = self.tasks.iter().filter(|t| t.is_overdue(now)).count();
        Summary {
            total: self.tasks.len(),
            pending: self.tasks.len() - completed,
            completed,
            overdue,
        }
    }

    /// Start a load under the current filter. Surfaces that schedule their
    /// own fetches pair this with [`commit_load`](Self::commit_load);
    /// [`load`](Self::load) composes the two for sequential callers.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket {
            generation: self.generation,
            filter: self.filter.clone(),
        }
    }

    /// Apply a completed load. Returns false when the ticket was
    /// superseded and the response discarded.
    pub fn commit_load(&mut self, ticket: LoadTicket, tasks: Vec<Task>, labels: Vec<Label>) -> bool {
        if ticket.generation < self.generation {
            debug!(
                stale = ticket.generation,
                latest = self.generation,
                "discarding superseded load response"
            );
            return false;
        }

        self.tasks = tasks;
        self.labels = labels;
        self.loaded = true;
        true
    }

    /// Fetch tasks (under the current filter) and the full label
    /// vocabulary concurrently. Both must succeed or neither result is
    /// applied; on failure the prior state stays untouched.
    #[instrument(skip(self), fields(label = ?self.filter.label, completion = ?self.filter.completion))]
    pub async fn load(&mut self) -> Result<()> {
        let ticket = self.begin_load();

        let fetched = tokio::try_join!(
            self.backend
                .list_tasks(ticket.filter.label.as_deref(), ticket.filter.completion.param()),
            self.backend.list_labels(),
        );

        match fetched {
            Ok((tasks, labels)) => {
                debug!(tasks = tasks.len(), labels = labels.len(), "loaded");
                self.commit_load(ticket, tasks, labels);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "load failed; keeping prior state");
                self.notices.push(format!("failed to load tasks: {err}"));
                Err(err)
            }
        }
    }

    pub async fn set_filter(&mut self, filter: TaskFilter) -> Result<()> {
        self.filter = filter;
        self.load().await
    }

    /// Create failures propagate so the originating form can stay open.
    #[instrument(skip(self, create), fields(title = %create.title))]
    pub async fn create(&mut self, create: TaskCreate) -> Result<Task> {
        match self.backend.create_task(&create).await {
            Ok(task) => {
                self.notices.push("task created".to_string());
                let _ = self.load().await;
                Ok(task)
            }
            Err(err) => {
                self.notices.push(format!("failed to create task: {err}"));
                Err(err)
            }
        }
    }

    /// Update failures propagate, like create.
    #[instrument(skip(self, patch))]
    pub async fn update(&mut self, id: &str, patch: TaskPatch) -> Result<Task> {
        match self.backend.update_task(id, &patch).await {
            Ok(task) => {
                self.notices.push("task updated".to_string());
                let _ = self.load().await;
                Ok(task)
            }
            Err(err) => {
                self.notices.push(format!("failed to update task: {err}"));
                Err(err)
            }
        }
    }

    /// Delete failures are reported but swallowed so the list view never
    /// blocks on them. Returns whether the delete succeeded.
    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: &str) -> bool {
        match self.backend.delete_task(id).await {
            Ok(()) => {
                self.notices.push("task deleted".to_string());
                let _ = self.load().await;
                true
            }
            Err(err) => {
                self.notices.push(format!("failed to delete task: {err}"));
                false
            }
        }
    }

    /// Sends a patch carrying only `completed`; failures are reported but
    /// swallowed, like delete.
    #[instrument(skip(self))]
    pub async fn toggle_complete(&mut self, id: &str, completed: bool) -> bool {
        let patch = TaskPatch {
            completed: Some(completed),
            ..TaskPatch::default()
        };

        match self.backend.update_task(id, &patch).await {
            Ok(_) => {
                let _ = self.load().await;
                true
            }
            Err(err) => {
                self.notices.push(format!("failed to update task: {err}"));
                false
            }
        }
    }
}
