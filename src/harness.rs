use std::collections::HashSet;

use anyhow::Context as _;

use crate::{
    github::{GitHub, Label},
    labels::LabelSyncer,
    Result,
};

pub const DEFAULT_REPO: &str = "Earth";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Validation {
    /// Configured labels absent after the sync.
    pub missing: Vec<String>,
    /// Labels present after the sync that the configuration doesn't name.
    pub extra: Vec<String>,
}

impl Validation {
    pub fn new(configured: &[Label], after: &[Label]) -> Self {
        let present: HashSet<&str> = after.iter().map(|l| l.name.as_str()).collect();
        let wanted: HashSet<&str> = configured.iter().map(|l| l.name.as_str()).collect();

        Self {
            missing: configured
                .iter()
                .filter(|l| !present.contains(l.name.as_str()))
                .map(|l| l.name.clone())
                .collect(),
            extra: after
                .iter()
                .filter(|l| !wanted.contains(l.name.as_str()))
                .map(|l| l.name.clone())
                .collect(),
        }
    }
}

/// Syncs one repository and prints what it looked like before and after.
pub async fn try_labels(gh: &dyn GitHub, syncer: &LabelSyncer<'_>, repo: &str) -> Result<Validation> {
    println!("Testing label sync on a single repository");
    println!("Organization: {}", gh.org());
    println!("Repository: {repo}");
    println!();

    let before = gh
        .labels(repo)
        .await
        .with_context(|| format!("Listing labels of {repo}"))?;
    println!("Found {} existing labels:", before.len());
    for l in &before {
        println!("  - {} ({})", l.name, l.color);
    }
    println!();

    println!("Labels from config to sync:");
    for l in syncer.labels() {
        println!("  - {}: \"{}\" ({})", l.name, l.description, l.color);
    }
    println!();

    let report = syncer.sync_repo(repo).await?;
    println!(
        "Sync completed: {} updated, {} created, {} deleted",
        report.updated, report.created, report.deleted
    );
    println!();

    let after = gh
        .labels(repo)
        .await
        .with_context(|| format!("Listing labels of {repo}"))?;
    println!("Total labels: {}", after.len());
    for l in &after {
        println!("  - {}: \"{}\" ({})", l.name, l.description, l.color);
    }
    println!();

    let validation = Validation::new(syncer.labels(), &after);
    println!("Validation results:");
    if validation.missing.is_empty() {
        println!("  All configured labels exist in repository");
    }
    for name in &validation.missing {
        println!("  Missing: {name}");
    }
    if !validation.extra.is_empty() {
        println!("  Extra labels not in config: {}", validation.extra.join(", "));
    }

    Ok(validation)
}
