use crate::error::Result;
use crate::incident::model::Commit;
use crate::sources::rules::{Fallback, FieldRule};
use crate::sources::DataSources;
use crate::tooling::Capability;
use serde_json::{json, Value};

const COLLECTION_KEYS: &[&str] = &["commits", "items"];

pub const COMMIT_ID: FieldRule = FieldRule::new("id", &["/sha", "/id"], Fallback::Literal("unknown"));
pub const COMMIT_MESSAGE: FieldRule = FieldRule::new(
    "message",
    &["/commit/message", "/message"],
    Fallback::Literal("No message"),
);
pub const COMMIT_AUTHOR: FieldRule = FieldRule::new(
    "author",
    &["/commit/author/name", "/author", "/author/login", "/author/name"],
    Fallback::Literal("Unknown"),
);
pub const COMMIT_DATE: FieldRule =
    FieldRule::new("date", &["/commit/author/date", "/date"], Fallback::Now);
pub const COMMIT_URL: FieldRule =
    FieldRule::new("url", &["/html_url", "/url"], Fallback::Literal("#"));

/// Split an `owner/repo` hint. A hint without `/` takes the default owner.
pub fn split_repo<'a>(hint: &'a str, default_owner: &'a str) -> (&'a str, &'a str) {
    match hint.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => (owner, repo),
        Some((_, repo)) if !repo.is_empty() => (default_owner, repo),
        Some((owner, _)) => (default_owner, owner),
        None => (default_owner, hint),
    }
}

pub fn normalize_commit(record: &Value) -> Commit {
    Commit {
        id: COMMIT_ID.extract(record, ""),
        message: COMMIT_MESSAGE.extract(record, ""),
        author: COMMIT_AUTHOR.extract(record, ""),
        date: COMMIT_DATE.extract(record, ""),
        url: COMMIT_URL.extract(record, ""),
    }
}

impl DataSources {
    /// Recent commits for `repo` (`owner/repo` or bare `repo`).
    pub async fn recent_commits(&self, repo: &str) -> Result<Vec<Commit>> {
        let settings = self.settings();
        let (owner, name) = split_repo(repo, &settings.default_repo_owner);
        let arguments = json!({
            "owner": owner,
            "repo": name,
            "limit": settings.commit_limit,
        });

        let records = self
            .fetch_records(&Capability::COMMITS, COLLECTION_KEYS, arguments)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, repo, "Fetching commits failed");
                e
            })?;

        Ok(records.iter().map(normalize_commit).collect())
    }
}
