use async_trait::async_trait;
use serde_derive::{Deserialize, Serialize};

use crate::Result;

#[cfg(test)]
pub mod fake;
mod rest;

pub use rest::RestClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
    pub name: String,
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub labels: Vec<String>,
    pub html_url: String,
}

impl Issue {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l == name)
    }
}

/// Label as defined in `labels.json` and as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Label {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub description: String,
}

impl Label {
    pub fn new(name: &str, color: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            description: description.to_string(),
        }
    }

    /// Same color (ignoring case and `#`) and description.
    pub fn matches(&self, other: &Label) -> bool {
        self.color
            .trim_start_matches('#')
            .eq_ignore_ascii_case(other.color.trim_start_matches('#'))
            && self.description == other.description
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateStatus {
    pub limit: u64,
    pub remaining: u64,
    /// Unix timestamp (seconds) at which `remaining` is refilled.
    pub reset: u64,
}

/// The slice of the GitHub REST API this tool talks to, scoped to one organization.
#[async_trait]
pub trait GitHub: Send + Sync {
    fn org(&self) -> &str;

    async fn org_repos(&self) -> Result<Vec<Repo>>;

    async fn open_issues(&self, repo: &str) -> Result<Vec<Issue>>;

    async fn open_issues_with(&self, repo: &str, creator: &str, label: &str)
        -> Result<Vec<Issue>>;

    async fn labels(&self, repo: &str) -> Result<Vec<Label>>;

    async fn create_label(&self, repo: &str, label: &Label) -> Result<()>;

    async fn update_label(&self, repo: &str, label: &Label) -> Result<()>;

    async fn delete_label(&self, repo: &str, name: &str) -> Result<()>;

    /// Returns the HTML URL of the new issue.
    async fn create_issue(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<String>;

    async fn rate_limit(&self) -> Result<RateStatus>;
}
