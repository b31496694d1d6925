//! Completion profiling
//!
//! Computes per-field fill rates and choice histograms over the submissions
//! of one form, plus the share of submissions with every required field
//! answered.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::payload::{is_filled, normalize_value, Payload};
use crate::schema::{FieldDescriptor, FieldType, FormSchema};
use serde_json::Value;

/// The parts of a submission the profiler looks at
#[derive(Debug, Clone)]
pub struct SubmissionSnapshot {
    pub payload: Payload,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SubmissionSnapshot {
    pub fn new(payload: Payload, created_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            user_id: None,
            created_at,
            updated_at: None,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    fn last_touched(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Value histogram ordered by descending count, then ascending value.
///
/// Serialized as a JSON object whose keys keep that order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueHistogram(Vec<ValueCount>);

impl ValueHistogram {
    fn from_counts(counts: BTreeMap<String, usize>) -> Self {
        let mut buckets: Vec<ValueCount> = counts
            .into_iter()
            .map(|(value, count)| ValueCount { value, count })
            .collect();
        // BTreeMap already yields ascending values; a stable sort keeps them
        // ordered within equal counts.
        buckets.sort_by_key(|bucket| Reverse(bucket.count));
        Self(buckets)
    }

    pub fn buckets(&self) -> &[ValueCount] {
        &self.0
    }

    pub fn count_of(&self, value: &str) -> Option<usize> {
        self.0.iter().find(|b| b.value == value).map(|b| b.count)
    }
}

impl Serialize for ValueHistogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for bucket in &self.0 {
            map.serialize_entry(&bucket.value, &bucket.count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldProfile {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub filled_count: usize,
    pub missing_count: usize,
    pub filled_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_counts: Option<ValueHistogram>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataFrameProfile {
    pub total_submissions: usize,
    pub fields: Vec<FieldProfile>,
}

/// Completion statistics of one form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormProfile {
    pub submissions_count: usize,
    pub contributors_count: usize,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub required_fields_count: usize,
    pub complete_submissions_count: usize,
    pub completion_rate_pct: f64,
    pub dataframe_profile: DataFrameProfile,
}

impl FormProfile {
    pub fn field(&self, name: &str) -> Option<&FieldProfile> {
        self.dataframe_profile.fields.iter().find(|f| f.name == name)
    }
}

/// Percentage rounded to one decimal; zero when `total` is zero
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = part as f64 / total as f64;
    (ratio * 1000.0).round() / 10.0
}

/// Profile a form over a set of its submissions
pub fn profile_form(schema: &FormSchema, submissions: &[SubmissionSnapshot]) -> FormProfile {
    let total = submissions.len();

    let fields = schema
        .fields()
        .iter()
        .map(|field| profile_field(field, submissions))
        .collect();

    let required: Vec<&str> = schema.required_fields().map(|f| f.name.as_str()).collect();
    let complete = submissions
        .iter()
        .filter(|s| required.iter().all(|name| is_filled(s.payload.get(*name))))
        .count();

    let contributors: HashSet<Uuid> = submissions.iter().filter_map(|s| s.user_id).collect();
    let last_updated_at = submissions.iter().map(SubmissionSnapshot::last_touched).max();

    FormProfile {
        submissions_count: total,
        contributors_count: contributors.len(),
        last_updated_at,
        required_fields_count: required.len(),
        complete_submissions_count: complete,
        completion_rate_pct: percentage(complete, total),
        dataframe_profile: DataFrameProfile {
            total_submissions: total,
            fields,
        },
    }
}

fn profile_field(field: &FieldDescriptor, submissions: &[SubmissionSnapshot]) -> FieldProfile {
    let total = submissions.len();
    let mut filled = 0usize;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let track_values = field.field_type.is_choice();

    for submission in submissions {
        let value = submission.payload.get(&field.name);
        if !is_filled(value) {
            continue;
        }
        filled += 1;

        if track_values {
            if let Some(value) = value {
                for bucket in histogram_values(value) {
                    *counts.entry(bucket).or_insert(0) += 1;
                }
            }
        }
    }

    FieldProfile {
        name: field.name.clone(),
        label: field.label.clone(),
        field_type: field.field_type.clone(),
        required: field.required,
        filled_count: filled,
        missing_count: total.saturating_sub(filled),
        filled_pct: percentage(filled, total),
        value_counts: track_values.then(|| ValueHistogram::from_counts(counts)),
    }
}

/// Multi-select answers count once per selected option
fn histogram_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(normalize_value)
            .filter(|v| !v.is_empty())
            .collect(),
        other => normalize_value(other)
            .filter(|v| !v.is_empty())
            .into_iter()
            .collect(),
    }
}
