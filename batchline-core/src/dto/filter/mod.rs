//! Execution query filter

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::execution::ExecutionRecord;
use crate::domain::status::ExecutionStatus;

/// Filter for repository lookups
///
/// Every criterion is optional; an empty filter matches everything.
/// An empty status list means "any status".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFilter {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(default)]
    pub statuses: Vec<ExecutionStatus>,
}

impl ExecutionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_status(mut self, status: ExecutionStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = ExecutionStatus>) -> Self {
        self.statuses.extend(statuses);
        self
    }

    pub fn matches(&self, record: &ExecutionRecord) -> bool {
        if self.id.is_some_and(|id| id != record.id()) {
            return false;
        }
        if self.name.as_deref().is_some_and(|name| name != record.name()) {
            return false;
        }
        self.statuses.is_empty() || self.statuses.contains(&record.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_all() {
        let record = ExecutionRecord::new("anything");
        assert!(ExecutionFilter::new().matches(&record));
    }

    #[test]
    fn test_criteria_are_combined() {
        let mut record = ExecutionRecord::new("import");
        record.transition_status(ExecutionStatus::Starting).unwrap();

        assert!(ExecutionFilter::new().with_name("import").matches(&record));
        assert!(!ExecutionFilter::new().with_name("export").matches(&record));
        assert!(
            ExecutionFilter::new()
                .with_id(record.id())
                .with_statuses([ExecutionStatus::Created, ExecutionStatus::Starting])
                .matches(&record)
        );
        assert!(
            !ExecutionFilter::new()
                .with_name("import")
                .with_status(ExecutionStatus::Failed)
                .matches(&record)
        );
        assert!(!ExecutionFilter::new().with_id(uuid::Uuid::new_v4()).matches(&record));
    }
}
