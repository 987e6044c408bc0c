#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use plaintrack::model::{ChangeKind, Issue, IssueField, PropertyChange};
use plaintrack::record;

/// Fixed base time so fixtures are deterministic.
pub fn base_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_735_689_600, 0).unwrap() // 2025-01-01 00:00:00 UTC
}

/// `base_time()` plus `secs` seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    base_time() + chrono::Duration::seconds(secs)
}

pub fn issue(id: &str, title: &str) -> Issue {
    Issue::new(id, title)
}

/// Encode one issue as a container line.
pub fn line(issue: &Issue) -> String {
    record::encode(issue).expect("encode issue")
}

pub struct IssueBuilder {
    issue: Issue,
}

impl IssueBuilder {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            issue: issue(id, title),
        }
    }

    /// Record a change to `field` at `at(secs)`.
    pub fn changed(mut self, field: IssueField, secs: i64) -> Self {
        self.issue
            .record_change(PropertyChange::field(field, ChangeKind::Update, at(secs)));
        self
    }

    pub fn with(mut self, edit: impl FnOnce(&mut Issue)) -> Self {
        edit(&mut self.issue);
        self
    }

    pub fn build(self) -> Issue {
        self.issue
    }

    pub fn line(self) -> String {
        line(&self.issue)
    }
}
