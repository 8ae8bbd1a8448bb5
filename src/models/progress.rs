use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Snapshot of backend job progress.
///
/// Each successful poll produces a fresh snapshot that replaces the previous
/// one wholesale. `percentage` is reported by the backend independently of
/// `current`/`total` and may lag or lead them slightly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    pub status: String,
    pub current: u64,
    pub total: u64,
    pub percentage: f64,
    #[serde(alias = "imagesPerSecond", alias = "images_per_second")]
    pub items_per_second: f64,
    /// Seconds since the job started
    #[serde(alias = "elapsed_time", deserialize_with = "de_seconds")]
    pub elapsed_time: f64,
    /// Seconds until completion, absent when unknown
    #[serde(
        default,
        alias = "estimated_remaining",
        deserialize_with = "de_optional_seconds"
    )]
    pub estimated_remaining: Option<f64>,
}

impl ProgressInfo {
    /// Percentage at or above which a job is considered finished
    pub const COMPLETE_PERCENTAGE: f64 = 100.0;

    pub fn new(status: impl Into<String>, current: u64, total: u64, percentage: f64) -> Self {
        Self {
            status: status.into(),
            current,
            total,
            percentage,
            items_per_second: 0.0,
            elapsed_time: 0.0,
            estimated_remaining: None,
        }
    }

    /// True once the reported percentage reaches 100
    pub fn is_complete(&self) -> bool {
        self.percentage >= Self::COMPLETE_PERCENTAGE
    }

    pub fn elapsed(&self) -> Duration {
        seconds_to_duration(self.elapsed_time).unwrap_or_default()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.estimated_remaining.and_then(seconds_to_duration)
    }
}

fn seconds_to_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

/// Durations arrive either as plain seconds or as `{secs, nanos}`
#[derive(Deserialize)]
#[serde(untagged)]
enum WireSeconds {
    Float(f64),
    Split { secs: u64, nanos: u32 },
}

impl From<WireSeconds> for f64 {
    fn from(value: WireSeconds) -> Self {
        match value {
            WireSeconds::Float(secs) => secs,
            WireSeconds::Split { secs, nanos } => Duration::new(secs, nanos).as_secs_f64(),
        }
    }
}

fn de_seconds<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    WireSeconds::deserialize(deserializer).map(f64::from)
}

fn de_optional_seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<WireSeconds>::deserialize(deserializer)?.map(f64::from))
}
