use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    github::{GitHub, Repo},
    pacing::Pacer,
    settings::RepositoryFilters,
    Result,
};

/// Work done once per eligible repository.
///
/// `run` must not fail: per-repository errors belong in the outcome so one
/// broken repository never stops the batch.
#[async_trait]
pub trait RepoTask: Send + Sync {
    type Outcome: Send;

    fn name(&self) -> &'static str;
    async fn run(&self, repo: &str) -> Self::Outcome;
}

#[derive(Debug, Clone)]
pub struct RepoFilter {
    filters: RepositoryFilters,
}

impl RepoFilter {
    pub fn new(filters: RepositoryFilters) -> Self {
        Self { filters }
    }

    pub fn admits(&self, repo: &Repo) -> bool {
        if self.filters.exclude_repos.contains(&repo.name) {
            return false;
        }
        if repo.private && !self.filters.include_private {
            return false;
        }
        if !repo.private && !self.filters.include_public {
            return false;
        }
        true
    }
}

pub struct OrgWalker<'a> {
    gh: &'a dyn GitHub,
    filter: RepoFilter,
    pacer: Pacer,
}

impl<'a> OrgWalker<'a> {
    pub fn new(gh: &'a dyn GitHub, filter: RepoFilter, pacer: Pacer) -> Self {
        Self { gh, filter, pacer }
    }

    pub async fn eligible_repos(&self) -> Result<Vec<String>> {
        let repos = self.gh.org_repos().await?;
        let total = repos.len();

        let names: Vec<String> = repos
            .into_iter()
            .filter(|r| {
                let keep = self.filter.admits(r);
                if !keep {
                    debug!("Skipping {}", r.name);
                }
                keep
            })
            .map(|r| r.name)
            .collect();

        debug!("{} of {} repositories pass the filters", names.len(), total);
        Ok(names)
    }

    /// Runs `task` against every eligible repository, one at a time.
    ///
    /// Only a failure to list the organization's repositories is an error.
    pub async fn walk<T: RepoTask>(&self, task: &T) -> Result<Vec<T::Outcome>> {
        let repos = self.eligible_repos().await?;
        info!(
            "{}: {} repositories in {}",
            task.name(),
            repos.len(),
            self.gh.org()
        );

        let mut outcomes = Vec::with_capacity(repos.len());
        for (i, repo) in repos.iter().enumerate() {
            outcomes.push(task.run(repo).await);

            if i + 1 < repos.len() {
                self.pacer.wait(self.gh).await;
            }
        }

        Ok(outcomes)
    }
}
