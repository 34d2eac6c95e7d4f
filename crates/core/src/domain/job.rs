// Job Domain Model

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Result};

/// Job ID (UUID v4)
pub type JobId = String;

/// Job priority. Serialized lowercase; ordered by [`JobPriority::weight`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl JobPriority {
    /// Numeric weight used for dispatch ordering (higher runs first)
    pub const fn weight(self) -> u8 {
        match self {
            JobPriority::Low => 25,
            JobPriority::Normal => 50,
            JobPriority::High => 75,
            JobPriority::Critical => 100,
        }
    }
}

impl std::fmt::Display for JobPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPriority::Low => write!(f, "low"),
            JobPriority::Normal => write!(f, "normal"),
            JobPriority::High => write!(f, "high"),
            JobPriority::Critical => write!(f, "critical"),
        }
    }
}

/// Job Payload (opaque JSON, owned by the handler)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobPayload(serde_json::Value);

impl JobPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Tracing identifiers carried through the engine untouched.
///
/// Keys other than the three known ids are kept in `extra` and serialized
/// back at the same level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_job_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Producer-side description of a job.
///
/// Identity, creation time and the attempt counter are not part of the spec;
/// the queue assigns them at enqueue time.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub name: String,
    pub category: String,
    pub priority: JobPriority,
    pub payload: JobPayload,
    pub version: u32,
    pub scheduled_at: Option<i64>,
    pub correlation: Option<Correlation>,
}

impl JobSpec {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        priority: JobPriority,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            priority,
            payload: JobPayload::new(payload),
            version: 1,
            scheduled_at: None,
            correlation: None,
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Earliest eligible time (epoch ms)
    pub fn with_scheduled_at(mut self, scheduled_at: i64) -> Self {
        self.scheduled_at = Some(scheduled_at);
        self
    }

    pub fn with_correlation(mut self, correlation: Correlation) -> Self {
        self.correlation = Some(correlation);
        self
    }

    /// Structural check of the required metadata. The payload is never inspected.
    pub fn validate(&self) -> Result<()> {
        if let Some(problem) = job_name_problem(&self.name) {
            return Err(DomainError::Validation(format!("job name {}", problem)));
        }
        if self.category.trim().is_empty() {
            return Err(DomainError::Validation(
                "job category must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Why `name` cannot be used to route jobs, if it cannot.
///
/// Shared by job validation and handler registration so both sides agree on
/// what a routable name is.
pub fn job_name_problem(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        Some("must not be empty")
    } else if name.trim() != name {
        Some("must not have leading or trailing whitespace")
    } else {
        None
    }
}

/// Job Entity
///
/// `id` and `name` are fixed at creation and `attempts` only grows; fields are
/// read through accessors so nothing outside the queue can rewrite them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    id: JobId,
    name: String,
    category: String,
    priority: JobPriority,
    payload: JobPayload,
    version: u32,
    created_at: i64, // epoch ms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scheduled_at: Option<i64>,
    attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation: Option<Correlation>,
}

impl Job {
    /// Create a new Job
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `spec` - Producer-supplied description
    pub fn from_spec(id: impl Into<String>, created_at: i64, spec: JobSpec) -> Self {
        Self {
            id: id.into(),
            name: spec.name,
            category: spec.category,
            priority: spec.priority,
            payload: spec.payload,
            version: spec.version,
            created_at,
            scheduled_at: spec.scheduled_at,
            attempts: 0,
            correlation: spec.correlation,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn priority(&self) -> JobPriority {
        self.priority
    }

    pub fn payload(&self) -> &JobPayload {
        &self.payload
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn scheduled_at(&self) -> Option<i64> {
        self.scheduled_at
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn correlation(&self) -> Option<&Correlation> {
        self.correlation.as_ref()
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.correlation.as_ref().and_then(|c| c.trace_id.as_deref())
    }

    /// Rebuild the producer spec, e.g. for operator replay
    pub fn to_spec(&self) -> JobSpec {
        JobSpec {
            name: self.name.clone(),
            category: self.category.clone(),
            priority: self.priority,
            payload: self.payload.clone(),
            version: self.version,
            scheduled_at: None,
            correlation: self.correlation.clone(),
        }
    }

    /// Count one failed execution; returns the post-increment attempt number
    pub(crate) fn record_failure(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }
}
