//! Client for the snippet service.
//!
//! The service stores submissions and serves them back; this crate only
//! lists them, downloads the file a snippet points at, and posts new ones.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;
use crate::io::fetch_bytes;
use crate::language::snippet_language;

/// One shared snippet as listed by `GET /write-get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: u64,
    pub title: String,
    /// Where the submitted file (plain text or ZIP) is hosted.
    pub file_path: String,
    #[serde(default)]
    pub user_ip: Option<String>,
    pub created_at: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub delete_after: Option<serde_json::Value>,
}

/// Minutes the service keeps a snippet before deleting it.
pub const SNIPPET_TTL_MINUTES: i64 = 20;

impl Snippet {
    pub fn is_archive(&self) -> bool {
        self.file_path.to_ascii_lowercase().ends_with(".zip")
    }

    /// Category match on the `type` field, e.g. `ZIP 파일` or `코드`.
    pub fn is_of_type(&self, kind: &str) -> bool {
        self.kind.as_deref().map(str::trim) == Some(kind.trim())
    }

    pub fn created_at_time(&self) -> Option<DateTime<Utc>> {
        parse_created_at(&self.created_at)
    }

    /// Whole minutes left before the service deletes this snippet; zero or
    /// less once it is due. `None` when `createdAt` cannot be parsed.
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        let created = self.created_at_time()?;
        Some(SNIPPET_TTL_MINUTES - (now - created).num_minutes())
    }

    pub fn remaining_time(&self, now: DateTime<Utc>) -> String {
        match self.remaining_minutes(now) {
            Some(minutes) if minutes > 0 => format!("deleted in {minutes} min"),
            Some(_) => "deleting soon".to_string(),
            None => "unknown".to_string(),
        }
    }

    /// `createdAt` relative to `now`, e.g. `5 minutes ago`.
    pub fn created_ago(&self, now: DateTime<Utc>) -> String {
        match self.created_at_time() {
            Some(created) => relative_time(created, now),
            None => self.created_at.clone(),
        }
    }
}

/// Parse a `createdAt` value. The service sends either RFC 3339 or a
/// locale string like `2025. 01. 02 13:04:05` in local time.
pub fn parse_created_at(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Some(time.with_timezone(&Utc));
    }
    let naive = ["%Y. %m. %d %H:%M:%S", "%Y.%m.%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|time| time.with_timezone(&Utc))
}

/// Coarse "time ago" text: seconds, minutes, hours, days, months (30 days)
/// and years (12 months).
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    fn ago(n: i64, unit: &str) -> String {
        if n == 1 {
            format!("1 {unit} ago")
        } else {
            format!("{n} {unit}s ago")
        }
    }

    let seconds = (now - then).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let months = days / 30;

    if seconds < 60 {
        ago(seconds, "second")
    } else if minutes < 60 {
        ago(minutes, "minute")
    } else if hours < 24 {
        ago(hours, "hour")
    } else if days < 30 {
        ago(days, "day")
    } else if months < 12 {
        ago(months, "month")
    } else {
        ago(months / 12, "year")
    }
}

#[derive(Debug, Deserialize)]
struct SnippetList {
    items: Vec<Snippet>,
}

/// A new snippet for `POST /write`.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub title: String,
    /// Raw code when no file is attached.
    pub code: Option<String>,
    /// File name and bytes: a ZIP for archive submissions, otherwise a
    /// single source file.
    pub file: Option<(String, Vec<u8>)>,
    pub language: Option<String>,
    pub delete_after: Option<String>,
}

impl Submission {
    /// A pasted or uploaded single file.
    pub fn code(title: impl Into<String>, code: impl Into<String>, filename: Option<&str>) -> Self {
        let code = code.into();
        let language = snippet_language(filename, &code).to_string();
        Self {
            title: title.into(),
            code: Some(code),
            language: Some(language),
            ..Self::default()
        }
    }

    /// An archive, typically produced by `ArchiveSession::serialize`.
    pub fn archive(title: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            title: title.into(),
            file: Some((file_name.into(), bytes)),
            ..Self::default()
        }
    }

    pub fn with_delete_after(mut self, delete_after: impl Into<String>) -> Self {
        self.delete_after = Some(delete_after.into());
        self
    }

    fn into_form(self) -> Result<Form> {
        let mut form = Form::new().text("title", self.title);
        if let Some(code) = self.code {
            form = form.text("code", code);
        }
        if let Some(language) = self.language {
            form = form.text("language", language);
        }
        if let Some(delete_after) = self.delete_after {
            form = form.text("deleteAfter", delete_after);
        }
        if let Some((name, bytes)) = self.file {
            let mime = if name.to_ascii_lowercase().ends_with(".zip") {
                "application/zip"
            } else {
                "text/plain"
            };
            form = form.part("file", Part::bytes(bytes).file_name(name).mime_str(mime)?);
        }
        Ok(form)
    }
}

pub struct ApiClient {
    client: Client,
    base: String,
    max_retry: u32,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            max_retry: 10,
        })
    }

    /// Attempts for file downloads that hit connection errors.
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry.max(1);
        self
    }

    /// Absolute URL for a snippet's `filePath`, which may be relative to the
    /// service.
    pub fn resolve_url(&self, file_path: &str) -> String {
        if file_path.starts_with("http://") || file_path.starts_with("https://") {
            file_path.to_string()
        } else {
            format!("{}/{}", self.base, file_path.trim_start_matches('/'))
        }
    }

    pub async fn list_snippets(&self) -> Result<Vec<Snippet>> {
        let url = format!("{}/write-get", self.base);
        let list: SnippetList = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        tracing::debug!(count = list.items.len(), "listed snippets");
        Ok(list.items)
    }

    /// Snippets whose `type` is `kind`, in listing order.
    pub async fn list_snippets_of_type(&self, kind: &str) -> Result<Vec<Snippet>> {
        let mut snippets = self.list_snippets().await?;
        snippets.retain(|s| s.is_of_type(kind));
        Ok(snippets)
    }

    pub async fn find_snippet(&self, id: u64) -> Result<Option<Snippet>> {
        let snippets = self.list_snippets().await?;
        Ok(snippets.into_iter().find(|s| s.id == id))
    }

    /// Download the file a snippet points at, as raw bytes.
    pub async fn fetch_file(&self, file_path: &str) -> Result<Vec<u8>> {
        let url = self.resolve_url(file_path);
        fetch_bytes(&self.client, &url, self.max_retry).await
    }

    /// Post a new snippet. Returns the service's JSON reply.
    pub async fn submit(&self, submission: Submission) -> Result<serde_json::Value> {
        let url = format!("{}/write", self.base);
        let title = submission.title.clone();
        let form = submission.into_form()?;

        let reply = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        tracing::info!(title = %title, "submitted snippet");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_listing() {
        let body = r#"{
            "items": [
                { "id": 7, "title": "zip demo", "filePath": "https://cdn.example.com/u/7.zip",
                  "userIp": "1.2.3.4", "createdAt": "2025-01-01T00:00:00Z",
                  "type": "zip", "deleteAfter": 3600 },
                { "id": 8, "title": "hello", "filePath": "uploads/8.py",
                  "createdAt": "2025-01-02T00:00:00Z", "language": "python" }
            ]
        }"#;
        let list: SnippetList = serde_json::from_str(body).unwrap();

        assert_eq!(list.items.len(), 2);
        assert!(list.items[0].is_archive());
        assert_eq!(list.items[0].kind.as_deref(), Some("zip"));
        assert_eq!(list.items[0].delete_after, Some(serde_json::json!(3600)));
        assert!(!list.items[1].is_archive());
        assert_eq!(list.items[1].user_ip, None);
        assert_eq!(list.items[1].language.as_deref(), Some("python"));
    }

    fn snippet(created_at: &str, kind: Option<&str>) -> Snippet {
        Snippet {
            id: 1,
            title: "t".to_string(),
            file_path: "uploads/1.py".to_string(),
            user_ip: None,
            created_at: created_at.to_string(),
            kind: kind.map(str::to_string),
            language: None,
            delete_after: None,
        }
    }

    fn at(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn parses_both_created_at_forms() {
        assert_eq!(
            parse_created_at("2025-01-02T03:04:05Z"),
            Some(at("2025-01-02T03:04:05Z"))
        );
        let local = Local
            .with_ymd_and_hms(2025, 1, 2, 13, 4, 5)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_created_at("2025. 01. 02 13:04:05"), Some(local));
        assert_eq!(parse_created_at("2025.01.02 13:04:05"), Some(local));
        assert_eq!(parse_created_at("yesterday"), None);
    }

    #[test]
    fn counts_down_to_deletion() {
        let s = snippet("2025-01-01T00:00:00Z", None);
        assert_eq!(s.remaining_minutes(at("2025-01-01T00:00:00Z")), Some(20));
        assert_eq!(s.remaining_time(at("2025-01-01T00:05:30Z")), "deleted in 15 min");
        assert_eq!(s.remaining_time(at("2025-01-01T00:19:59Z")), "deleted in 1 min");
        assert_eq!(s.remaining_time(at("2025-01-01T00:20:00Z")), "deleting soon");
        assert_eq!(s.remaining_time(at("2025-01-02T00:00:00Z")), "deleting soon");

        let unparsable = snippet("sometime", None);
        assert_eq!(unparsable.remaining_minutes(at("2025-01-01T00:00:00Z")), None);
        assert_eq!(unparsable.remaining_time(at("2025-01-01T00:00:00Z")), "unknown");
    }

    #[test]
    fn relative_times() {
        let then = at("2025-01-01T00:00:00Z");
        let cases = [
            ("2025-01-01T00:00:42Z", "42 seconds ago"),
            ("2025-01-01T00:01:00Z", "1 minute ago"),
            ("2025-01-01T00:59:59Z", "59 minutes ago"),
            ("2025-01-01T03:00:00Z", "3 hours ago"),
            ("2025-01-02T00:00:00Z", "1 day ago"),
            ("2025-03-02T00:00:00Z", "2 months ago"),
            ("2027-01-01T00:00:00Z", "2 years ago"),
        ];
        for (now, expected) in cases {
            assert_eq!(relative_time(then, at(now)), expected, "{now}");
        }
        // Clock skew never yields a negative age.
        assert_eq!(relative_time(at("2025-01-01T00:01:00Z"), then), "0 seconds ago");
        assert_eq!(
            snippet("2025-01-01T00:00:00Z", None).created_ago(at("2025-01-01T00:10:00Z")),
            "10 minutes ago"
        );
    }

    #[test]
    fn filters_by_type() {
        let zip = snippet("2025-01-01T00:00:00Z", Some("ZIP 파일"));
        let code = snippet("2025-01-01T00:00:00Z", Some("코드"));
        let untyped = snippet("2025-01-01T00:00:00Z", None);
        assert!(zip.is_of_type("ZIP 파일"));
        assert!(!zip.is_of_type("코드"));
        assert!(code.is_of_type("코드"));
        assert!(!untyped.is_of_type("코드"));
    }

    #[test]
    fn resolves_relative_file_paths() {
        let api = ApiClient::new("https://api.example.com/").unwrap();
        assert_eq!(
            api.resolve_url("/uploads/1.zip"),
            "https://api.example.com/uploads/1.zip"
        );
        assert_eq!(
            api.resolve_url("https://cdn.example.com/1.zip"),
            "https://cdn.example.com/1.zip"
        );
    }

    #[test]
    fn code_submission_detects_language() {
        let named = Submission::code("t", "print(1)", Some("x.rs"));
        assert_eq!(named.language.as_deref(), Some("rust"));
        let pasted = Submission::code("t", "print(1)", None);
        assert_eq!(pasted.language.as_deref(), Some("python"));
        assert!(pasted.file.is_none());
    }

    #[tokio::test]
    async fn unreachable_service_is_an_error() {
        let api = ApiClient::new("http://127.0.0.1:1").unwrap().with_max_retry(1);
        assert!(api.list_snippets().await.is_err());
        assert!(api.list_snippets_of_type("코드").await.is_err());
        assert!(api.fetch_file("a.zip").await.is_err());
        let submission = Submission::archive("t", "a.zip", vec![1, 2, 3]);
        assert!(api.submit(submission).await.is_err());
    }
}
