use async_trait::async_trait;
use itertools::Itertools;
use tracing::{error, info, warn};

use crate::{
    calendar::CalendarSync,
    github::{GitHub, Issue},
    org::RepoTask,
    settings::{IssueLimits, WarningIssue},
};

pub const SPRINT_LABEL: &str = "sprint-current";
pub const IN_PROGRESS_LABEL: &str = "in-progress";
pub const WARNING_LABEL: &str = "automated-warning";
pub const WARNING_TITLE: &str = "Issue Limits Exceeded - Action Required";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueCounts {
    pub total: usize,
    pub sprint: usize,
    pub in_progress: usize,
}

impl IssueCounts {
    pub fn tally(issues: &[Issue]) -> Self {
        Self {
            total: issues.len(),
            sprint: issues.iter().filter(|i| i.has_label(SPRINT_LABEL)).count(),
            in_progress: issues
                .iter()
                .filter(|i| i.has_label(IN_PROGRESS_LABEL))
                .count(),
        }
    }

    /// One message per limit strictly exceeded.
    pub fn warnings(&self, limits: &IssueLimits) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.total > limits.max_open_issues_per_repo {
            warnings.push(format!(
                "Too many open issues: {}/{}",
                self.total, limits.max_open_issues_per_repo
            ));
        }
        if self.sprint > limits.max_sprint_current {
            warnings.push(format!(
                "Too many sprint issues: {}/{}",
                self.sprint, limits.max_sprint_current
            ));
        }
        if self.in_progress > limits.max_in_progress {
            warnings.push(format!(
                "Too many in-progress issues: {}/{}",
                self.in_progress, limits.max_in_progress
            ));
        }

        warnings
    }
}

/// What happened to the warning issue for a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NotNeeded,
    AlreadyOpen,
    Created(String),
    DryRun,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitStatus {
    Checked {
        counts: IssueCounts,
        warnings: Vec<String>,
        notice: Notice,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitResult {
    pub repo: String,
    pub status: LimitStatus,
}

impl LimitResult {
    pub fn has_warnings(&self) -> bool {
        matches!(&self.status, LimitStatus::Checked { warnings, .. } if !warnings.is_empty())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, LimitStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitSummary {
    pub checked: usize,
    pub warned: usize,
    pub failed: usize,
}

impl LimitSummary {
    pub fn of(results: &[LimitResult]) -> Self {
        Self {
            checked: results.len(),
            warned: results.iter().filter(|r| r.has_warnings()).count(),
            failed: results.iter().filter(|r| r.is_failed()).count(),
        }
    }
}

pub fn warning_body(org: &str, warnings: &[String], limits: &IssueLimits) -> String {
    let listed = warnings.iter().map(|w| format!("- {w}")).join("\n");

    format!(
        "# Issue Limits Exceeded

This repository has exceeded the organization's issue limits:

{listed}

## Recommended Actions:

1. **Review Open Issues**: Close completed or outdated issues
2. **Prioritize Work**: Move low-priority items to backlog
3. **Focus Sprint**: Limit active sprint work to maintain velocity
4. **Complete In-Progress**: Finish work before starting new items

## Current Limits:
- Maximum open issues: {}
- Maximum sprint-current: {}
- Maximum in-progress: {}

*Automated by {org} productivity system*
",
        limits.max_open_issues_per_repo, limits.max_sprint_current, limits.max_in_progress
    )
}

pub struct LimitChecker<'a> {
    gh: &'a dyn GitHub,
    limits: IssueLimits,
    warning: WarningIssue,
    dry_run: bool,
}

impl<'a> LimitChecker<'a> {
    pub fn new(gh: &'a dyn GitHub, limits: IssueLimits, warning: WarningIssue, dry_run: bool) -> Self {
        Self {
            gh,
            limits,
            warning,
            dry_run,
        }
    }

    pub async fn check(&self, repo: &str) -> LimitResult {
        info!("Checking issue limits for {}/{}", self.gh.org(), repo);

        let issues = match self.gh.open_issues(repo).await {
            Ok(issues) => issues,
            Err(e) => {
                error!("Error checking {repo}: {e:#}");
                return LimitResult {
                    repo: repo.to_string(),
                    status: LimitStatus::Failed {
                        error: format!("{e:#}"),
                    },
                };
            }
        };

        let counts = IssueCounts::tally(&issues);
        let warnings = counts.warnings(&self.limits);

        let notice = if warnings.is_empty() {
            info!("{repo}: all limits within bounds");
            Notice::NotNeeded
        } else {
            for w in &warnings {
                warn!("{repo}: {w}");
            }
            self.file_warning(repo, &warnings).await
        };

        LimitResult {
            repo: repo.to_string(),
            status: LimitStatus::Checked {
                counts,
                warnings,
                notice,
            },
        }
    }

    /// Opens the warning issue unless one from the bot is still open.
    async fn file_warning(&self, repo: &str, warnings: &[String]) -> Notice {
        match self
            .gh
            .open_issues_with(repo, &self.warning.creator, WARNING_LABEL)
            .await
        {
            Ok(existing) if !existing.is_empty() => {
                info!("{repo}: warning issue already open (#{})", existing[0].number);
                return Notice::AlreadyOpen;
            }
            Ok(_) => {}
            Err(e) => {
                error!("{repo}: failed to look up warning issues: {e:#}");
                return Notice::Failed(format!("{e:#}"));
            }
        }

        if self.dry_run {
            info!("{repo}: would create warning issue (dry run)");
            return Notice::DryRun;
        }

        let body = warning_body(self.gh.org(), warnings, &self.limits);
        match self
            .gh
            .create_issue(repo, WARNING_TITLE, &body, &self.warning_labels())
            .await
        {
            Ok(url) => {
                info!("{repo}: created warning issue {url}");
                Notice::Created(url)
            }
            Err(e) => {
                error!("{repo}: failed to create warning issue: {e:#}");
                Notice::Failed(format!("{e:#}"))
            }
        }
    }

    fn warning_labels(&self) -> Vec<String> {
        let mut labels = self.warning.labels.clone();
        if !labels.iter().any(|l| l == WARNING_LABEL) {
            labels.insert(0, WARNING_LABEL.to_string());
        }
        labels
    }
}

/// Limit check followed by the calendar scan, per repository.
pub struct LimitTask<'a> {
    checker: LimitChecker<'a>,
    calendar: Option<CalendarSync<'a>>,
}

impl<'a> LimitTask<'a> {
    pub fn new(checker: LimitChecker<'a>, calendar: Option<CalendarSync<'a>>) -> Self {
        Self { checker, calendar }
    }
}

#[async_trait]
impl RepoTask for LimitTask<'_> {
    type Outcome = LimitResult;

    fn name(&self) -> &'static str {
        "issue limits"
    }

    async fn run(&self, repo: &str) -> LimitResult {
        let result = self.checker.check(repo).await;
        if let Some(calendar) = &self.calendar {
            calendar.sync(repo).await;
        }
        result
    }
}
