use anyhow::bail;
use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::api::Backend;
use crate::datetime::{default_deadline, format_local, parse_local};
use crate::list::TaskList;
use crate::task::{Priority, Task, TaskCreate, TaskPatch};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    Create,
    Edit(String),
}

/// One editable task draft, either a fresh create or an edit seeded from
/// an existing task. The deadline is held in its local editable form and
/// only converted to an absolute instant on submit.
#[derive(Debug, Clone)]
pub struct TaskForm {
    mode: FormMode,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub deadline: String,
    pub labels: Vec<String>,
}

impl TaskForm {
    pub fn create(now: DateTime<Utc>) -> Self {
        Self {
            mode: FormMode::Create,
            title: String::new(),
            description: String::new(),
            priority: Priority::Medium,
            deadline: format_local(default_deadline(now)),
            labels: vec![],
        }
    }

    pub fn edit(task: &Task) -> Self {
        Self {
            mode: FormMode::Edit(task.id.clone()),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            priority: task.priority,
            deadline: format_local(task.deadline),
            labels: task.labels.clone(),
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.mode, FormMode::Edit(_))
    }

    /// Symmetric add/remove on the selected-labels set; order is not
    /// meaningful.
    pub fn toggle_label(&mut self, name: &str) {
        if let Some(pos) = self.labels.iter().position(|label| label == name) {
            self.labels.remove(pos);
        } else {
            self.labels.push(name.to_string());
        }
    }

    /// Discard the draft and return to a default create state.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        *self = TaskForm::create(now);
    }

    /// Validate the draft and build the submission payload. A blank title
    /// or an unparseable deadline fails here, before any network traffic.
    pub fn payload(&self) -> anyhow::Result<TaskCreate> {
        let title = self.title.trim();
        if title.is_empty() {
            bail!("title must not be empty");
        }

        let deadline = parse_local(&self.deadline)?;
        let description = self.description.trim();

        Ok(TaskCreate {
            title: title.to_string(),
            description: if description.is_empty() {
                None
            } else {
                Some(description.to_string())
            },
            priority: self.priority,
            deadline,
            completed: false,
            labels: self.labels.clone(),
        })
    }

    /// Dispatch the draft to the list controller as a create or update
    /// depending on mode. On success the form resets to its default
    /// create state; on failure the draft is left intact for retry.
    #[instrument(skip(self, list), fields(edit = self.is_edit()))]
    pub async fn submit<B: Backend>(&mut self, list: &mut TaskList<B>) -> anyhow::Result<Task> {
        let payload = self.payload()?;

        let task = match self.mode.clone() {
            FormMode::Create => list.create(payload).await?,
            FormMode::Edit(id) => list.update(&id, edit_patch(payload)).await?,
        };

        self.reset(Utc::now());
        Ok(task)
    }
}

/// An edit submits every draft field except `completed`, which only the
/// toggle path changes. An emptied description is omitted rather than
/// cleared, matching the server's treat-missing-as-unchanged contract.
fn edit_patch(payload: TaskCreate) -> TaskPatch {
    TaskPatch {
        title: Some(payload.title),
        description: payload.description,
        priority: Some(payload.priority),
        deadline: Some(payload.deadline),
        completed: None,
        labels: Some(payload.labels),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().expect("date")
    }

    fn sample_task() -> Task {
        Task {
            id: "t7".to_string(),
            title: "Renew passport".to_string(),
            description: Some("bring photos".to_string()),
            priority: Priority::High,
            deadline: now(),
            completed: false,
            labels: vec!["errand".to_string()],
            user_id: "u1".to_string(),
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn create_mode_seeds_defaults() {
        let form = TaskForm::create(now());
        assert_eq!(form.mode(), &FormMode::Create);
        assert_eq!(form.priority, Priority::Medium);
        assert!(form.labels.is_empty());
        assert_eq!(parse_local(&form.deadline).expect("parse"), default_deadline(now()));
    }

    #[test]
    fn edit_mode_seeds_every_field_from_the_task() {
        let task = sample_task();
        let form = TaskForm::edit(&task);
        assert_eq!(form.mode(), &FormMode::Edit("t7".to_string()));
        assert_eq!(form.title, "Renew passport");
        assert_eq!(form.description, "bring photos");
        assert_eq!(form.priority, Priority::High);
        assert_eq!(form.labels, vec!["errand".to_string()]);
        assert_eq!(parse_local(&form.deadline).expect("parse"), task.deadline);
    }

    #[test]
    fn toggle_label_is_symmetric() {
        let mut form = TaskForm::create(now());
        form.toggle_label("home");
        form.toggle_label("errand");
        form.toggle_label("home");
        assert_eq!(form.labels, vec!["errand".to_string()]);
    }

    #[test]
    fn blank_title_fails_validation() {
        let mut form = TaskForm::create(now());
        form.title = "   ".to_string();
        assert!(form.payload().is_err());
    }

    #[test]
    fn unparseable_deadline_fails_validation() {
        let mut form = TaskForm::create(now());
        form.title = "Water plants".to_string();
        form.deadline = "someday".to_string();
        assert!(form.payload().is_err());
    }

    #[test]
    fn payload_trims_and_omits_empty_description() {
        let mut form = TaskForm::create(now());
        form.title = "  Water plants  ".to_string();
        form.description = "   ".to_string();
        let payload = form.payload().expect("payload");
        assert_eq!(payload.title, "Water plants");
        assert_eq!(payload.description, None);
        assert!(!payload.completed);
    }

    #[test]
    fn edit_patch_never_touches_completed() {
        let task = sample_task();
        let form = TaskForm::edit(&task);
        let patch = edit_patch(form.payload().expect("payload"));
        assert_eq!(patch.completed, None);
        assert_eq!(patch.title.as_deref(), Some("Renew passport"));
        assert_eq!(patch.labels, Some(vec!["errand".to_string()]));
    }
}
