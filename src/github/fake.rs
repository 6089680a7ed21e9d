//! In-memory `GitHub` used by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use anyhow::bail;
use async_trait::async_trait;

use super::{GitHub, Issue, Label, RateStatus, Repo};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateLabel(String, String),
    UpdateLabel(String, String),
    DeleteLabel(String, String),
    CreateIssue(String, String),
}

#[derive(Debug, Default)]
struct State {
    repos: Vec<Repo>,
    issues: HashMap<String, Vec<Issue>>,
    labels: HashMap<String, Vec<Label>>,
    calls: Vec<Call>,
    warning_lookups: Vec<(String, String, String)>,
    broken_repos: HashSet<String>,
    broken_label: Option<String>,
    org_down: bool,
    rate: Option<RateStatus>,
}

#[derive(Debug, Default)]
pub struct FakeGitHub {
    state: Mutex<State>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(self, name: &str, private: bool) -> Self {
        self.state.lock().unwrap().repos.push(Repo {
            name: name.to_string(),
            private,
        });
        self
    }

    pub fn with_issues(self, repo: &str, issues: Vec<Issue>) -> Self {
        self.state
            .lock()
            .unwrap()
            .issues
            .insert(repo.to_string(), issues);
        self
    }

    pub fn with_labels(self, repo: &str, labels: Vec<Label>) -> Self {
        self.state
            .lock()
            .unwrap()
            .labels
            .insert(repo.to_string(), labels);
        self
    }

    /// Every call touching `repo` fails.
    pub fn with_broken_repo(self, repo: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .broken_repos
            .insert(repo.to_string());
        self
    }

    /// Any mutation of the label called `name` fails.
    pub fn with_broken_label(self, name: &str) -> Self {
        self.state.lock().unwrap().broken_label = Some(name.to_string());
        self
    }

    pub fn with_org_down(self) -> Self {
        self.state.lock().unwrap().org_down = true;
        self
    }

    pub fn with_rate(self, rate: RateStatus) -> Self {
        self.state.lock().unwrap().rate = Some(rate);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// `(repo, creator, label)` of every filtered issue lookup.
    pub fn warning_lookups(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().warning_lookups.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn label_names(&self, repo: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .labels
            .get(repo)
            .map(|ls| ls.iter().map(|l| l.name.clone()).collect())
            .unwrap_or_default()
    }

    fn check(state: &State, repo: &str) -> Result<()> {
        if state.broken_repos.contains(repo) {
            bail!("GitHub said no for {repo}");
        }
        Ok(())
    }

    fn check_label(state: &State, repo: &str, name: &str) -> Result<()> {
        Self::check(state, repo)?;
        if state.broken_label.as_deref() == Some(name) {
            bail!("GitHub refused label {name}");
        }
        Ok(())
    }
}

pub fn issue(number: u64, title: &str, labels: &[&str]) -> Issue {
    Issue {
        number,
        title: title.to_string(),
        body: None,
        labels: labels.iter().map(|l| l.to_string()).collect(),
        html_url: format!("https://github.com/acme/repo/issues/{number}"),
    }
}

#[async_trait]
impl GitHub for FakeGitHub {
    fn org(&self) -> &str {
        "acme"
    }

    async fn org_repos(&self) -> Result<Vec<Repo>> {
        let state = self.state.lock().unwrap();
        if state.org_down {
            bail!("organization listing failed");
        }
        Ok(state.repos.clone())
    }

    async fn open_issues(&self, repo: &str) -> Result<Vec<Issue>> {
        let state = self.state.lock().unwrap();
        Self::check(&state, repo)?;
        Ok(state.issues.get(repo).cloned().unwrap_or_default())
    }

    async fn open_issues_with(
        &self,
        repo: &str,
        creator: &str,
        label: &str,
    ) -> Result<Vec<Issue>> {
        let mut state = self.state.lock().unwrap();
        Self::check(&state, repo)?;
        state
            .warning_lookups
            .push((repo.to_string(), creator.to_string(), label.to_string()));
        Ok(state
            .issues
            .get(repo)
            .map(|is| is.iter().filter(|i| i.has_label(label)).cloned().collect())
            .unwrap_or_default())
    }

    async fn labels(&self, repo: &str) -> Result<Vec<Label>> {
        let state = self.state.lock().unwrap();
        Self::check(&state, repo)?;
        Ok(state.labels.get(repo).cloned().unwrap_or_default())
    }

    async fn create_label(&self, repo: &str, label: &Label) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_label(&state, repo, &label.name)?;
        state
            .calls
            .push(Call::CreateLabel(repo.to_string(), label.name.clone()));
        state
            .labels
            .entry(repo.to_string())
            .or_default()
            .push(label.clone());
        Ok(())
    }

    async fn update_label(&self, repo: &str, label: &Label) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_label(&state, repo, &label.name)?;
        state
            .calls
            .push(Call::UpdateLabel(repo.to_string(), label.name.clone()));
        if let Some(existing) = state
            .labels
            .entry(repo.to_string())
            .or_default()
            .iter_mut()
            .find(|l| l.name == label.name)
        {
            *existing = label.clone();
        }
        Ok(())
    }

    async fn delete_label(&self, repo: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_label(&state, repo, name)?;
        state
            .calls
            .push(Call::DeleteLabel(repo.to_string(), name.to_string()));
        state
            .labels
            .entry(repo.to_string())
            .or_default()
            .retain(|l| l.name != name);
        Ok(())
    }

    async fn create_issue(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        Self::check(&state, repo)?;
        state
            .calls
            .push(Call::CreateIssue(repo.to_string(), title.to_string()));
        let issues = state.issues.entry(repo.to_string()).or_default();
        let number = issues.iter().map(|i| i.number).max().unwrap_or(0) + 1;
        let url = format!("https://github.com/acme/{repo}/issues/{number}");
        issues.push(Issue {
            number,
            title: title.to_string(),
            body: Some(body.to_string()),
            labels: labels.to_vec(),
            html_url: url.clone(),
        });
        Ok(url)
    }

    async fn rate_limit(&self) -> Result<RateStatus> {
        match self.state.lock().unwrap().rate {
            Some(rate) => Ok(rate),
            None => bail!("rate limit unavailable"),
        }
    }
}
