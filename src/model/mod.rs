//! Core data types for `plaintrack`.
//!
//! This module defines the fundamental types used throughout the application:
//! - `Issue` - The core work item
//! - `Status` - Issue lifecycle states
//! - `IssueType` - Categories of issues
//! - `IssueField` - The static table of reconcilable fields
//! - `PropertyChange` - Per-field change history entries
//! - `ParentIssueRef` - Ordered parent links
//! - `ConflictRecord` - Values discarded during reconciliation

use crate::error::TrackError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Issue lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Open,
    Draft,
    InProgress,
    InReview,
    Complete,
    Closed,
    Archived,
    Deleted,
}

impl Status {
    pub const ALL: [Self; 8] = [
        Self::Open,
        Self::Draft,
        Self::InProgress,
        Self::InReview,
        Self::Complete,
        Self::Closed,
        Self::Archived,
        Self::Deleted,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Draft => "draft",
            Self::InProgress => "in-progress",
            Self::InReview => "in-review",
            Self::Complete => "complete",
            Self::Closed => "closed",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::Closed | Self::Archived | Self::Deleted
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = TrackError;

    /// Parses canonical names and remaps legacy values.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" | "idea" | "spec" | "next" => Ok(Self::Open),
            "draft" => Ok(Self::Draft),
            "in-progress" | "in_progress" | "wip" => Ok(Self::InProgress),
            "in-review" | "review" => Ok(Self::InReview),
            "complete" | "done" => Ok(Self::Complete),
            "closed" => Ok(Self::Closed),
            "archived" => Ok(Self::Archived),
            "deleted" => Ok(Self::Deleted),
            _ => Err(TrackError::InvalidStatus {
                status: s.to_string(),
            }),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Issue type category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IssueType {
    #[default]
    Task,
    Bug,
    Chore,
    Idea,
    Feature,
}

impl IssueType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Chore => "chore",
            Self::Idea => "idea",
            Self::Feature => "feature",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "task" => Ok(Self::Task),
            "bug" => Ok(Self::Bug),
            "chore" => Ok(Self::Chore),
            "idea" => Ok(Self::Idea),
            "feature" | "enhancement" | "feat" => Ok(Self::Feature),
            _ => Err(TrackError::InvalidType {
                issue_type: s.to_string(),
            }),
        }
    }
}

impl Serialize for IssueType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IssueType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Issue priority (1 = most urgent).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "i64", into = "i64")]
pub struct Priority(u8);

impl Priority {
    pub const MAX: u8 = 9;

    /// Build a priority, rejecting values outside `1..=9`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPriority` when out of range.
    pub fn new(value: i64) -> Result<Self, TrackError> {
        u8::try_from(value)
            .ok()
            .filter(|p| (1..=Self::MAX).contains(p))
            .map(Self)
            .ok_or(TrackError::InvalidPriority { priority: value })
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Priority {
    type Error = TrackError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for i64 {
    fn from(p: Priority) -> Self {
        Self::from(p.0)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A reconcilable issue field.
///
/// This is the static field table: every field the merge engine compares,
/// in canonical order, with its stable wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueField {
    Title,
    Description,
    Status,
    Type,
    Priority,
    Group,
    Assignee,
    Tags,
    Pr,
    Linked,
    Parents,
}

impl IssueField {
    pub const ALL: [Self; 11] = [
        Self::Title,
        Self::Description,
        Self::Status,
        Self::Type,
        Self::Priority,
        Self::Group,
        Self::Assignee,
        Self::Tags,
        Self::Pr,
        Self::Linked,
        Self::Parents,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Status => "status",
            Self::Type => "type",
            Self::Priority => "priority",
            Self::Group => "group",
            Self::Assignee => "assignee",
            Self::Tags => "tags",
            Self::Pr => "pr",
            Self::Linked => "linked",
            Self::Parents => "parents",
        }
    }
}

impl fmt::Display for IssueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueField {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| TrackError::Config(format!("Unknown issue field: {s}")))
    }
}

/// Kind of a recorded change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

/// One entry of an issue's change history.
///
/// `field` is absent on legacy whole-record entries, which only say that
/// *something* changed at `at`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyChange {
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<IssueField>,
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,
}

impl PropertyChange {
    #[must_use]
    pub fn field(field: IssueField, kind: ChangeKind, at: DateTime<Utc>) -> Self {
        Self {
            at,
            field: Some(field),
            kind,
            by: None,
        }
    }

    #[must_use]
    pub fn with_actor(mut self, by: impl Into<String>) -> Self {
        self.by = Some(by.into());
        self
    }
}

/// A directed parent link with an explicit ordering key among siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentIssueRef {
    pub id: String,
    pub key: String,
}

impl ParentIssueRef {
    #[must_use]
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
        }
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::from(self.id.as_str()));
        map.insert("key".to_string(), Value::from(self.key.as_str()));
        Value::Object(map)
    }
}

impl fmt::Display for ParentIssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.key)
    }
}

/// The primary issue entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    /// Stable identifier, never reused.
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub status: Status,

    #[serde(rename = "type")]
    pub issue_type: IssueType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    /// Linked pull request number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr: Option<u64>,

    /// Linked issue identifiers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<ParentIssueRef>,

    /// Legacy whole-issue "last updated" timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<PropertyChange>,
}

impl Issue {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            status: Status::default(),
            issue_type: IssueType::default(),
            priority: None,
            group: None,
            assignee: None,
            tags: BTreeSet::new(),
            pr: None,
            linked: Vec::new(),
            parents: Vec::new(),
            updated_at: None,
            history: Vec::new(),
        }
    }

    /// JSON view of one field, used for diffs and conflict records.
    #[must_use]
    pub fn field_value(&self, field: IssueField) -> Value {
        fn opt_str(value: Option<&String>) -> Value {
            value.map_or(Value::Null, |s| Value::from(s.as_str()))
        }
        fn strings<'a>(values: impl Iterator<Item = &'a String>) -> Value {
            Value::Array(values.map(|s| Value::from(s.as_str())).collect())
        }

        match field {
            IssueField::Title => Value::from(self.title.as_str()),
            IssueField::Description => opt_str(self.description.as_ref()),
            IssueField::Status => Value::from(self.status.as_str()),
            IssueField::Type => Value::from(self.issue_type.as_str()),
            IssueField::Priority => self.priority.map_or(Value::Null, |p| Value::from(p.get())),
            IssueField::Group => opt_str(self.group.as_ref()),
            IssueField::Assignee => opt_str(self.assignee.as_ref()),
            IssueField::Tags => strings(self.tags.iter()),
            IssueField::Pr => self.pr.map_or(Value::Null, Value::from),
            IssueField::Linked => strings(self.linked.iter()),
            IssueField::Parents => {
                Value::Array(self.parents.iter().map(ParentIssueRef::to_value).collect())
            }
        }
    }

    /// Whether `field` holds the same value on both issues.
    #[must_use]
    pub fn field_eq(&self, other: &Self, field: IssueField) -> bool {
        match field {
            IssueField::Title => self.title == other.title,
            IssueField::Description => self.description == other.description,
            IssueField::Status => self.status == other.status,
            IssueField::Type => self.issue_type == other.issue_type,
            IssueField::Priority => self.priority == other.priority,
            IssueField::Group => self.group == other.group,
            IssueField::Assignee => self.assignee == other.assignee,
            IssueField::Tags => self.tags == other.tags,
            IssueField::Pr => self.pr == other.pr,
            IssueField::Linked => self.linked == other.linked,
            IssueField::Parents => self.parents == other.parents,
        }
    }

    /// Overwrite `field` with the value held by `other`.
    pub fn copy_field_from(&mut self, other: &Self, field: IssueField) {
        match field {
            IssueField::Title => self.title.clone_from(&other.title),
            IssueField::Description => self.description.clone_from(&other.description),
            IssueField::Status => self.status = other.status,
            IssueField::Type => self.issue_type = other.issue_type,
            IssueField::Priority => self.priority = other.priority,
            IssueField::Group => self.group.clone_from(&other.group),
            IssueField::Assignee => self.assignee.clone_from(&other.assignee),
            IssueField::Tags => self.tags.clone_from(&other.tags),
            IssueField::Pr => self.pr = other.pr,
            IssueField::Linked => self.linked.clone_from(&other.linked),
            IssueField::Parents => self.parents.clone_from(&other.parents),
        }
    }

    /// True when `field` carries no value. Status and type are never empty.
    #[must_use]
    pub fn is_field_empty(&self, field: IssueField) -> bool {
        match field {
            IssueField::Title => self.title.is_empty(),
            IssueField::Description => self.description.as_deref().is_none_or(str::is_empty),
            IssueField::Status | IssueField::Type => false,
            IssueField::Priority => self.priority.is_none(),
            IssueField::Group => self.group.as_deref().is_none_or(str::is_empty),
            IssueField::Assignee => self.assignee.as_deref().is_none_or(str::is_empty),
            IssueField::Tags => self.tags.is_empty(),
            IssueField::Pr => self.pr.is_none(),
            IssueField::Linked => self.linked.is_empty(),
            IssueField::Parents => self.parents.is_empty(),
        }
    }

    /// Latest recorded change touching `field`, if any.
    #[must_use]
    pub fn last_changed(&self, field: IssueField) -> Option<DateTime<Utc>> {
        self.history
            .iter()
            .filter(|change| change.field == Some(field))
            .map(|change| change.at)
            .max()
    }

    /// True when at least one history entry names a specific field.
    #[must_use]
    pub fn has_field_history(&self) -> bool {
        self.history.iter().any(|change| change.field.is_some())
    }

    /// Append a per-field change entry.
    pub fn record_change(&mut self, change: PropertyChange) {
        self.history.push(change);
    }

    /// Union another history into this one, ordered by time, without duplicates.
    pub fn absorb_history(&mut self, other: &[PropertyChange]) {
        self.history.extend(other.iter().cloned());
        self.history.sort();
        self.history.dedup();
    }
}

/// What a conflict record preserves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConflictValue {
    /// A single losing field value.
    Field {
        field: IssueField,
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        changed_at: Option<DateTime<Utc>>,
        winning_value: Value,
    },
    /// A whole losing issue.
    Snapshot { issue: Box<Issue> },
}

/// A value discarded during reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    #[serde(rename = "id")]
    pub issue_id: String,
    pub superseded_at: DateTime<Utc>,
    /// Container the losing value came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub loser: ConflictValue,
}

impl ConflictRecord {
    #[must_use]
    pub fn field(&self) -> Option<IssueField> {
        match &self.loser {
            ConflictValue::Field { field, .. } => Some(*field),
            ConflictValue::Snapshot { .. } => None,
        }
    }
}
