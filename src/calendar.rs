use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info};

use crate::github::{GitHub, Issue};

lazy_static! {
    static ref DUE_IN_BODY: Regex = Regex::new(r"(?i)due:\s*\d{1,2}/\d{1,2}/\d{2,4}").unwrap();
    static ref DUE_IN_TITLE: Regex = Regex::new(r"\[\d{1,2}/\d{1,2}(?:/\d{2,4})?\]").unwrap();
}

pub fn has_due_date(issue: &Issue) -> bool {
    DUE_IN_TITLE.is_match(&issue.title)
        || issue
            .body
            .as_deref()
            .is_some_and(|body| DUE_IN_BODY.is_match(body))
}

/// Finds issues carrying a due date. Nothing is written to any calendar yet.
pub struct CalendarSync<'a> {
    gh: &'a dyn GitHub,
}

impl<'a> CalendarSync<'a> {
    pub fn new(gh: &'a dyn GitHub) -> Self {
        Self { gh }
    }

    pub async fn sync(&self, repo: &str) -> Vec<Issue> {
        info!("Syncing calendar events for {}/{}", self.gh.org(), repo);

        let issues = match self.gh.open_issues(repo).await {
            Ok(issues) => issues,
            Err(e) => {
                error!("Error syncing calendar for {repo}: {e:#}");
                return Vec::new();
            }
        };

        let due: Vec<Issue> = issues.into_iter().filter(has_due_date).collect();
        info!("{repo}: found {} issues with due dates", due.len());
        for issue in &due {
            info!("{repo}: would sync: {} ({})", issue.title, issue.html_url);
        }

        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::fake::{issue, FakeGitHub};

    fn with_body(title: &str, body: &str) -> Issue {
        Issue {
            body: Some(body.to_string()),
            ..issue(1, title, &[])
        }
    }

    #[test]
    fn title_dates() {
        assert!(has_due_date(&issue(1, "Ship release [3/11]", &[])));
        assert!(has_due_date(&issue(1, "[12/1/25] Board meeting", &[])));
        assert!(has_due_date(&issue(1, "Taxes [30/4/2026]", &[])));
        assert!(!has_due_date(&issue(1, "Ship release 3/11", &[])));
        assert!(!has_due_date(&issue(1, "Ship release [3/11/2]", &[])));
    }

    #[test]
    fn body_dates() {
        assert!(has_due_date(&with_body("Report", "Due: 1/2/26")));
        assert!(has_due_date(&with_body("Report", "notes\ndue:15/10/2026")));
        assert!(!has_due_date(&with_body("Report", "due: 1/2")));
        assert!(!has_due_date(&with_body("Report", "due tomorrow")));
    }

    #[tokio::test]
    async fn sync_returns_dated_issues_only() {
        let gh = FakeGitHub::new().with_issues(
            "web",
            vec![
                issue(1, "Launch [1/12]", &[]),
                issue(2, "Refactor", &[]),
                with_body("Invoice", "due: 5/5/26"),
            ],
        );

        let due = CalendarSync::new(&gh).sync("web").await;

        assert_eq!(due.len(), 2);
        assert_eq!(due[0].title, "Launch [1/12]");
        assert_eq!(due[1].title, "Invoice");
    }

    #[tokio::test]
    async fn sync_swallows_errors() {
        let gh = FakeGitHub::new().with_broken_repo("web");
        assert!(CalendarSync::new(&gh).sync("web").await.is_empty());
    }
}
