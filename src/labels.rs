use std::collections::{HashMap, HashSet};

use anyhow::Context as _;
use async_trait::async_trait;
use tracing::{error, info};

use crate::{
    github::{GitHub, Label},
    org::RepoTask,
    Result,
};

/// GitHub defaults that survive a sync even when not configured.
pub const PROTECTED_LABELS: [&str; 3] = ["duplicate", "invalid", "wontfix"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPlan {
    pub update: Vec<Label>,
    pub create: Vec<Label>,
    pub delete: Vec<String>,
}

impl LabelPlan {
    pub fn new(existing: &[Label], desired: &[Label]) -> Self {
        let current: HashMap<&str, &Label> =
            existing.iter().map(|l| (l.name.as_str(), l)).collect();
        let wanted: HashSet<&str> = desired.iter().map(|l| l.name.as_str()).collect();

        let mut plan = Self::default();
        for label in desired {
            match current.get(label.name.as_str()) {
                Some(have) if label.matches(have) => {}
                Some(_) => plan.update.push(label.clone()),
                None => plan.create.push(label.clone()),
            }
        }

        plan.delete = existing
            .iter()
            .map(|l| l.name.as_str())
            .filter(|name| !wanted.contains(name) && !PROTECTED_LABELS.contains(name))
            .map(String::from)
            .collect();

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.update.is_empty() && self.create.is_empty() && self.delete.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub updated: usize,
    pub created: usize,
    pub deleted: usize,
}

pub struct LabelSyncer<'a> {
    gh: &'a dyn GitHub,
    labels: Vec<Label>,
    dry_run: bool,
}

impl<'a> LabelSyncer<'a> {
    pub fn new(gh: &'a dyn GitHub, labels: Vec<Label>, dry_run: bool) -> Self {
        Self {
            gh,
            labels,
            dry_run,
        }
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Brings `repo`'s labels in line with the configured set.
    ///
    /// Stops at the first failing call; changes already made stay in place.
    pub async fn sync_repo(&self, repo: &str) -> Result<SyncReport> {
        info!("Syncing labels to {}/{}", self.gh.org(), repo);

        let existing = self
            .gh
            .labels(repo)
            .await
            .with_context(|| format!("Listing labels of {repo}"))?;
        let plan = LabelPlan::new(&existing, &self.labels);

        if plan.is_empty() {
            info!("{repo}: labels already in sync");
            return Ok(SyncReport::default());
        }

        if self.dry_run {
            for l in &plan.update {
                info!("{repo}: would update {}", l.name);
            }
            for l in &plan.create {
                info!("{repo}: would create {}", l.name);
            }
            for name in &plan.delete {
                info!("{repo}: would delete {name}");
            }
            return Ok(SyncReport::default());
        }

        let mut report = SyncReport::default();

        // Configured labels first, in file order, then the leftovers.
        for label in &self.labels {
            if plan.update.contains(label) {
                self.gh
                    .update_label(repo, label)
                    .await
                    .with_context(|| format!("Updating label '{}' in {repo}", label.name))?;
                info!("{repo}: updated {}", label.name);
                report.updated += 1;
            } else if plan.create.contains(label) {
                self.gh
                    .create_label(repo, label)
                    .await
                    .with_context(|| format!("Creating label '{}' in {repo}", label.name))?;
                info!("{repo}: created {}", label.name);
                report.created += 1;
            }
        }

        for name in &plan.delete {
            self.gh
                .delete_label(repo, name)
                .await
                .with_context(|| format!("Deleting label '{name}' in {repo}"))?;
            info!("{repo}: deleted {name}");
            report.deleted += 1;
        }

        Ok(report)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl SyncSummary {
    pub fn of(outcomes: &[bool]) -> Self {
        let succeeded = outcomes.iter().filter(|ok| **ok).count();
        Self {
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }
}

pub struct LabelSyncTask<'a> {
    syncer: LabelSyncer<'a>,
}

impl<'a> LabelSyncTask<'a> {
    pub fn new(syncer: LabelSyncer<'a>) -> Self {
        Self { syncer }
    }
}

#[async_trait]
impl RepoTask for LabelSyncTask<'_> {
    type Outcome = bool;

    fn name(&self) -> &'static str {
        "label sync"
    }

    async fn run(&self, repo: &str) -> bool {
        match self.syncer.sync_repo(repo).await {
            Ok(_) => true,
            Err(e) => {
                error!("Error syncing {repo}: {e:#}");
                false
            }
        }
    }
}
