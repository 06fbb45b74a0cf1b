use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use callbench_http::HttpRequest;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("path `{path}` references unknown param `{key}`")]
    MissingParam { path: String, key: String },

    #[error("invalid request url: `{0}`")]
    InvalidUrl(String),

    #[error("failed to encode request body: {0}")]
    Body(#[from] serde_json::Error),
}

/// A named request template picked at random by virtual users.
///
/// `path` may contain `{key}` placeholders filled from `params`. Params not consumed by the
/// path become the query string of a GET or the JSON object body of a POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub method: Method,
    pub path: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl Scenario {
    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: Method::Get,
            path: path.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn post(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(name, path)
        }
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Builds the concrete request against `base_url` (no trailing slash required).
    pub fn build_request(&self, base_url: &str) -> std::result::Result<HttpRequest, ScenarioError> {
        let (segments, rest) = self.render_path()?;
        let invalid = || {
            ScenarioError::InvalidUrl(format!("{}{}", base_url.trim_end_matches('/'), self.path))
        };
        let mut url = url::Url::parse(base_url).map_err(|_| invalid())?;
        // Pushed segments are percent-encoded, `/` included.
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(&segments);

        match self.method {
            Method::Get => {
                if !rest.is_empty() {
                    let mut pairs = url.query_pairs_mut();
                    for (k, v) in &rest {
                        pairs.append_pair(k, v);
                    }
                }
                Ok(HttpRequest::get_owned(url.into()))
            }
            Method::Post => {
                let body = serde_json::to_vec(&rest)?;
                Ok(HttpRequest::post_json(url.into(), Bytes::from(body)))
            }
        }
    }

    /// Path segments with placeholders filled in, plus the params they did not consume.
    fn render_path(
        &self,
    ) -> std::result::Result<(Vec<String>, BTreeMap<&str, &str>), ScenarioError> {
        let mut rest: BTreeMap<&str, &str> = self
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let mut segments = Vec::new();
        for template in self.path.trim_start_matches('/').split('/') {
            let mut segment = String::with_capacity(template.len());
            let mut tail = template;
            while let Some(open) = tail.find('{') {
                let Some(close) = tail[open..].find('}').map(|i| open + i) else {
                    break;
                };

                let key = &tail[open + 1..close];
                let value = self
                    .params
                    .get(key)
                    .ok_or_else(|| ScenarioError::MissingParam {
                        path: self.path.clone(),
                        key: key.to_string(),
                    })?;

                segment.push_str(&tail[..open]);
                segment.push_str(value);
                rest.remove(key);
                tail = &tail[close + 1..];
            }
            segment.push_str(tail);
            segments.push(segment);
        }

        Ok((segments, rest))
    }
}

/// Immutable scenario list shared by every virtual user.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    scenarios: Arc<[Scenario]>,
}

impl ScenarioCatalog {
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self> {
        if scenarios.is_empty() {
            return Err(Error::EmptyScenarioCatalog);
        }

        Ok(Self {
            scenarios: Arc::from(scenarios.into_boxed_slice()),
        })
    }

    /// Read-heavy dashboard traffic against the call-center API.
    pub fn call_center() -> Self {
        let scenarios = vec![
            Scenario::get("list calls", "/api/calls")
                .param("page", "1")
                .param("limit", "20"),
            Scenario::get("list missed calls", "/api/calls")
                .param("status", "missed")
                .param("page", "1")
                .param("limit", "20"),
            Scenario::get("call details", "/api/calls/{id}").param("id", "42"),
            Scenario::get("list orders", "/api/orders")
                .param("page", "1")
                .param("limit", "20"),
            Scenario::get("list accounts", "/api/accounts")
                .param("page", "1")
                .param("limit", "50"),
            Scenario::get("open tickets", "/api/tickets")
                .param("status", "open")
                .param("page", "1")
                .param("limit", "20"),
            Scenario::get("recent chats", "/api/chats")
                .param("sort", "-createdAt")
                .param("page", "1")
                .param("limit", "20"),
            Scenario::post("search calls", "/api/calls/search")
                .param("status", "answered")
                .param("direction", "inbound"),
        ];

        Self {
            scenarios: Arc::from(scenarios.into_boxed_slice()),
        }
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Uniform pick. The catalog is never empty.
    pub fn pick(&self, rng: &mut fastrand::Rng) -> &Scenario {
        &self.scenarios[rng.usize(..self.scenarios.len())]
    }
}

impl Default for ScenarioCatalog {
    fn default() -> Self {
        Self::call_center()
    }
}
