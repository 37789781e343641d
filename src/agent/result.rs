//! Outcome of answering a question.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of [`QueryAgent::answer`](super::QueryAgent::answer).
///
/// Exactly one of `output` and `error` is set, matching `success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Whether the question was answered.
    pub success: bool,
    /// The answer text, on success.
    pub output: Option<String>,
    /// The error description, on failure.
    pub error: Option<String>,
    /// Wall-clock time spent, serialized as fractional seconds.
    #[serde(with = "duration_secs")]
    pub execution_time: Duration,
}

impl QueryResult {
    /// A successful result.
    pub fn success(output: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
            execution_time,
        }
    }

    /// A failed result.
    pub fn failure(error: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            execution_time,
        }
    }

    /// Execution time formatted with two decimals, e.g. `0.42`.
    pub fn seconds_display(&self) -> String {
        format!("{:.2}", self.execution_time.as_secs_f64())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
