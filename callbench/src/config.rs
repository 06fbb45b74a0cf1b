use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use callbench_core::load::Scenario;
use callbench_core::query::QueryProbe;
use callbench_core::report::ReportThresholds;
use serde::{Deserialize, Serialize};

use crate::cli::ThresholdArgs;

/// Optional YAML config. Every field may be omitted; CLI flags win over it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct ConfigFile {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub login_path: Option<String>,
    pub token_field: Option<String>,
    pub tiers: Option<Vec<u64>>,
    pub duration: Option<YamlDuration>,
    pub delay: Option<YamlDuration>,
    pub settle: Option<YamlDuration>,
    pub timeout: Option<YamlDuration>,

    /// Replaces the built-in call-center scenarios when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenarios: Vec<Scenario>,

    /// Replaces the built-in query probes when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub probes: Vec<QueryProbe>,

    #[serde(default)]
    pub thresholds: ReportThresholds,
}

impl ConfigFile {
    pub(crate) async fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        serde_yaml::from_slice(&bytes)
            .with_context(|| format!("failed to parse YAML: {}", path.display()))
    }

    pub(crate) async fn load_opt(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None => Ok(Self::default()),
        }
    }
}

/// Resolves report limits: CLI flag, then config file, then built-in default.
pub(crate) fn resolve_thresholds(
    file: &ReportThresholds,
    cli: &ThresholdArgs,
) -> ReportThresholds {
    ReportThresholds {
        min_success_rate: cli.min_success_rate.unwrap_or(file.min_success_rate),
        max_avg_latency_ms: cli.max_avg_latency_ms.unwrap_or(file.max_avg_latency_ms),
        slow_query_ms: cli.slow_query_ms.unwrap_or(file.slow_query_ms),
        max_cpu_percent: cli.max_cpu_percent.unwrap_or(file.max_cpu_percent),
        max_memory_percent: cli.max_memory_percent.unwrap_or(file.max_memory_percent),
        max_heap_mb: cli.max_heap_mb.unwrap_or(file.max_heap_mb),
        top_slowest: cli.top_slowest.unwrap_or(file.top_slowest),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    pub(crate) fn into_inner(self) -> Duration {
        self.0
    }
}

impl From<Duration> for YamlDuration {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl Serialize for YamlDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(self.0).to_string())
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl<'de> serde::de::Visitor<'de> for V {
            type Value = YamlDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 10s), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v < 0 {
                    return Err(E::custom("duration must not be negative"));
                }
                Ok(YamlDuration(Duration::from_secs(v as u64)))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if !v.is_finite() || v < 0.0 {
                    return Err(E::custom("duration must be a non-negative, finite number"));
                }
                Ok(YamlDuration(Duration::from_secs_f64(v)))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let d = humantime::parse_duration(v).map_err(E::custom)?;
                Ok(YamlDuration(d))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                self.visit_str(&v)
            }
        }

        deserializer.deserialize_any(V)
    }
}
