use anyhow::anyhow;

use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Completion {
    #[default]
    All,
    Pending,
    Completed,
}

impl Completion {
    /// The value sent as the `completed` query parameter; `All` sends
    /// nothing so the server returns every task.
    pub fn param(self) -> Option<bool> {
        match self {
            Completion::All => None,
            Completion::Pending => Some(false),
            Completion::Completed => Some(true),
        }
    }
}

/// Transient, UI-only narrowing of which tasks are loaded. Filtering
/// itself happens server-side; `matches` mirrors the server's rules so
/// tests can cross-check the returned set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskFilter {
    pub label: Option<String>,
    pub completion: Completion,
}

impl TaskFilter {
    /// Parse CLI filter terms: `+name` selects a label, and a bare
    /// `all`, `pending` or `completed` selects a completion state.
    pub fn parse(terms: &[String]) -> anyhow::Result<Self> {
        let mut filter = TaskFilter::default();

        for term in terms {
            if let Some(label) = term.strip_prefix('+') {
                if label.is_empty() {
                    return Err(anyhow!("empty label filter: {term}"));
                }
                filter.label = Some(label.to_string());
                continue;
            }

            filter.completion = match term.to_ascii_lowercase().as_str() {
                "all" => Completion::All,
                "pending" => Completion::Pending,
                "completed" | "done" => Completion::Completed,
                other => return Err(anyhow!("unknown filter term: {other}")),
            };
        }

        Ok(filter)
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(label) = self.label.as_ref()
            && !task.labels.iter().any(|name| name == label)
        {
            return false;
        }

        match self.completion.param() {
            None => true,
            Some(completed) => task.completed == completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;
    use chrono::{TimeZone, Utc};

    fn task(completed: bool, labels: &[&str]) -> Task {
        let when = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).single().expect("date");
        Task {
            id: "t1".to_string(),
            title: "Pay rent".to_string(),
            description: None,
            priority: Priority::High,
            deadline: when,
            completed,
            labels: labels.iter().map(|name| name.to_string()).collect(),
            user_id: "u1".to_string(),
            created_at: when,
            updated_at: when,
        }
    }

    #[test]
    fn parse_label_and_completion_terms() {
        let filter = TaskFilter::parse(&["+errand".to_string(), "pending".to_string()])
            .expect("parse");
        assert_eq!(filter.label.as_deref(), Some("errand"));
        assert_eq!(filter.completion, Completion::Pending);
    }

    #[test]
    fn parse_rejects_unknown_terms() {
        assert!(TaskFilter::parse(&["overdue".to_string()]).is_err());
        assert!(TaskFilter::parse(&["+".to_string()]).is_err());
    }

    #[test]
    fn default_filter_matches_everything() {
        let filter = TaskFilter::default();
        assert!(filter.matches(&task(false, &[])));
        assert!(filter.matches(&task(true, &["home"])));
    }

    #[test]
    fn label_filter_requires_exact_name() {
        let filter = TaskFilter {
            label: Some("errand".to_string()),
            completion: Completion::All,
        };
        assert!(filter.matches(&task(false, &["errand", "home"])));
        assert!(!filter.matches(&task(false, &["errands"])));
    }

    #[test]
    fn completion_param_mapping() {
        assert_eq!(Completion::All.param(), None);
        assert_eq!(Completion::Pending.param(), Some(false));
        assert_eq!(Completion::Completed.param(), Some(true));
    }
}
