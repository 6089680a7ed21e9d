use anyhow::Context as _;
use async_trait::async_trait;
use octocrab::{Octocrab, Page};
use serde::de::DeserializeOwned;
use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use super::{GitHub, Issue, Label, RateStatus, Repo};
use crate::Result;

const PER_PAGE: u8 = 100;

/// Octocrab-backed client, scoped to an organization.
#[derive(Clone)]
pub struct RestClient {
    octo: Octocrab,
    org: String,
}

impl RestClient {
    pub fn new(token: &str, org: &str) -> Result<Self> {
        let octo = octocrab::OctocrabBuilder::default()
            .personal_token(token.to_string())
            .build()?;

        Ok(Self::from_octocrab(octo, org))
    }

    pub fn from_octocrab(octo: Octocrab, org: &str) -> Self {
        Self {
            octo,
            org: org.to_string(),
        }
    }

    fn repo_route(&self, repo: &str, tail: &str) -> String {
        format!("/repos/{}/{}/{}", self.org, repo, tail)
    }

    async fn all<T: DeserializeOwned>(&self, route: &str, params: &ListParams<'_>) -> Result<Vec<T>> {
        let first: Page<T> = self
            .octo
            .get(route, Some(params))
            .await
            .with_context(|| format!("GET {route}"))?;
        let items = self
            .octo
            .all_pages(first)
            .await
            .with_context(|| format!("GET {route} (next pages)"))?;

        debug!("GET {route}: {} items", items.len());
        Ok(items)
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("org", &self.org)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Default)]
struct ListParams<'a> {
    per_page: u8,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    creator: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<&'a str>,
}

impl ListParams<'_> {
    fn new() -> Self {
        Self {
            per_page: PER_PAGE,
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
struct RawRepo {
    name: String,
    #[serde(default)]
    private: bool,
}

#[derive(Deserialize)]
struct RawLabelRef {
    name: String,
}

#[derive(Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    body: Option<String>,
    #[serde(default)]
    labels: Vec<RawLabelRef>,
    #[serde(default)]
    html_url: String,
}

#[derive(Deserialize)]
struct RawLabel {
    name: String,
    color: String,
    description: Option<String>,
}

#[derive(Deserialize)]
struct RawRate {
    limit: u64,
    remaining: u64,
    reset: u64,
}

#[derive(Deserialize)]
struct RawResources {
    core: RawRate,
}

#[derive(Deserialize)]
struct RawRateLimit {
    resources: RawResources,
}

#[derive(Serialize)]
struct LabelBody<'a> {
    name: &'a str,
    color: &'a str,
    description: &'a str,
}

impl From<RawRepo> for Repo {
    fn from(r: RawRepo) -> Self {
        Self {
            name: r.name,
            private: r.private,
        }
    }
}

impl From<RawIssue> for Issue {
    fn from(i: RawIssue) -> Self {
        Self {
            number: i.number,
            title: i.title,
            body: i.body,
            labels: i.labels.into_iter().map(|l| l.name).collect(),
            html_url: i.html_url,
        }
    }
}

impl From<RawLabel> for Label {
    fn from(l: RawLabel) -> Self {
        Self {
            name: l.name,
            color: l.color,
            description: l.description.unwrap_or_default(),
        }
    }
}

impl<'a> From<&'a Label> for LabelBody<'a> {
    fn from(l: &'a Label) -> Self {
        Self {
            name: &l.name,
            color: l.color.trim_start_matches('#'),
            description: &l.description,
        }
    }
}

#[async_trait]
impl GitHub for RestClient {
    fn org(&self) -> &str {
        &self.org
    }

    async fn org_repos(&self) -> Result<Vec<Repo>> {
        let params = ListParams {
            kind: Some("all"),
            ..ListParams::new()
        };
        let repos: Vec<RawRepo> = self.all(&format!("/orgs/{}/repos", self.org), &params).await?;
        Ok(repos.into_iter().map(Repo::from).collect())
    }

    async fn open_issues(&self, repo: &str) -> Result<Vec<Issue>> {
        let params = ListParams {
            state: Some("open"),
            ..ListParams::new()
        };
        let issues: Vec<RawIssue> = self.all(&self.repo_route(repo, "issues"), &params).await?;
        Ok(issues.into_iter().map(Issue::from).collect())
    }

    async fn open_issues_with(
        &self,
        repo: &str,
        creator: &str,
        label: &str,
    ) -> Result<Vec<Issue>> {
        let params = ListParams {
            state: Some("open"),
            creator: Some(creator),
            labels: Some(label),
            ..ListParams::new()
        };
        let issues: Vec<RawIssue> = self.all(&self.repo_route(repo, "issues"), &params).await?;
        Ok(issues.into_iter().map(Issue::from).collect())
    }

    async fn labels(&self, repo: &str) -> Result<Vec<Label>> {
        let labels: Vec<RawLabel> = self
            .all(&self.repo_route(repo, "labels"), &ListParams::new())
            .await?;
        Ok(labels.into_iter().map(Label::from).collect())
    }

    async fn create_label(&self, repo: &str, label: &Label) -> Result<()> {
        let route = self.repo_route(repo, "labels");
        let _: RawLabel = self
            .octo
            .post(&route, Some(&LabelBody::from(label)))
            .await
            .with_context(|| format!("POST {route}"))?;
        Ok(())
    }

    async fn update_label(&self, repo: &str, label: &Label) -> Result<()> {
        let route = self.repo_route(repo, &format!("labels/{}", urlencoding::encode(&label.name)));
        let _: RawLabel = self
            .octo
            .patch(&route, Some(&LabelBody::from(label)))
            .await
            .with_context(|| format!("PATCH {route}"))?;
        Ok(())
    }

    async fn delete_label(&self, repo: &str, name: &str) -> Result<()> {
        let route = self.repo_route(repo, &format!("labels/{}", urlencoding::encode(name)));
        let response = self
            .octo
            ._delete(route.as_str(), None::<&()>)
            .await
            .with_context(|| format!("DELETE {route}"))?;
        // `_delete` hands back error statuses as plain responses.
        octocrab::map_github_error(response)
            .await
            .with_context(|| format!("DELETE {route}"))?;
        Ok(())
    }

    async fn create_issue(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<String> {
        let issue = self
            .octo
            .issues(&self.org, repo)
            .create(title)
            .body(body.to_string())
            .labels(labels.to_vec())
            .send()
            .await
            .with_context(|| format!("Creating issue in {}/{repo}", self.org))?;

        Ok(issue.html_url.to_string())
    }

    async fn rate_limit(&self) -> Result<RateStatus> {
        let raw: RawRateLimit = self
            .octo
            .get("/rate_limit", None::<&()>)
            .await
            .context("GET /rate_limit")?;
        let core = raw.resources.core;

        Ok(RateStatus {
            limit: core.limit,
            remaining: core.remaining,
            reset: core.reset,
        })
    }
}
