use std::{collections::HashSet, fs, path::Path};

use anyhow::{bail, Context as _};
use config::{Config, Environment, File};
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use serde_derive::Deserialize;
use tracing::debug;

use crate::{github::Label, Result};

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct IssueLimits {
    pub max_open_issues_per_repo: usize,
    pub max_sprint_current: usize,
    pub max_in_progress: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RepositoryFilters {
    #[serde(default)]
    pub exclude_repos: Vec<String>,
    pub include_private: bool,
    pub include_public: bool,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct CalendarSync {
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WarningIssue {
    /// Value of the `creator` filter used to find an already open warning.
    pub creator: String,
    pub labels: Vec<String>,
}

impl Default for WarningIssue {
    fn default() -> Self {
        Self {
            creator: String::from("app/github-actions[bot]"),
            labels: vec![String::from("automated-warning"), String::from("blocked")],
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Pacing {
    pub delay_ms: u64,
    /// Remaining core requests at or below which we wait for the reset.
    pub low_watermark: u64,
    pub max_wait_secs: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            delay_ms: 200,
            low_watermark: 50,
            max_wait_secs: 900,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub issue_limits: IssueLimits,
    pub repository_filters: RepositoryFilters,
    #[serde(default)]
    pub calendar_sync: CalendarSync,
    #[serde(default)]
    pub warning_issue: WarningIssue,
    #[serde(default)]
    pub pacing: Pacing,
}

impl Settings {
    pub fn new(config_dir: &Path) -> Result<Self> {
        let base = config_dir.join("settings");

        debug!("Looking for configuration file {}", base.display());

        let config = Config::builder()
            .add_source(File::with_name(&base.to_string_lossy()))
            .add_source(Environment::with_prefix("ORGKEEPER").separator("__"))
            .build()
            .with_context(|| format!("Failed to read settings from {}", base.display()))?;

        config
            .get::<Settings>("settings")
            .context("Invalid settings document")
    }
}

pub fn load_labels(config_dir: &Path) -> Result<Vec<Label>> {
    let path = config_dir.join("labels.json");

    debug!("Loading label definitions from {}", path.display());

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read label definitions from {}", path.display()))?;
    let labels: Vec<Label> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid label definitions in {}", path.display()))?;

    validate_labels(labels)
}

fn validate_labels(labels: Vec<Label>) -> Result<Vec<Label>> {
    lazy_static! {
        static ref COLOR: Regex = Regex::new(r"^[0-9a-fA-F]{6}$").unwrap();
    }

    let labels: Vec<Label> = labels
        .into_iter()
        .map(|l| Label {
            color: l.color.trim_start_matches('#').to_string(),
            ..l
        })
        .collect();

    if let Some(bad) = labels.iter().find(|l| !COLOR.is_match(&l.color)) {
        bail!("Label '{}' has invalid color '{}'", bad.name, bad.color);
    }

    let dupes: HashSet<&str> = labels.iter().map(|l| l.name.as_str()).duplicates().collect();
    if !dupes.is_empty() {
        bail!(
            "Duplicate label definitions: {}",
            dupes.into_iter().sorted().join(", ")
        );
    }

    Ok(labels)
}
