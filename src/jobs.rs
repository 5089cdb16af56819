//! Job status listing against the platform's REST API

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{ReelError, ReelResult};

const JOBS_PATH: &str = "/api/v1/jobs";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    Failed,
    Running,
    Pending,
}

impl JobStatus {
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" => JobStatus::Completed,
            "FAILED" | "ERROR" => JobStatus::Failed,
            "IN_PROGRESS" | "RUNNING" => JobStatus::Running,
            _ => JobStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Running => "running",
            JobStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row as the API returns it
#[derive(Debug, Clone, Deserialize)]
struct RawJob {
    #[serde(alias = "job_id")]
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    owner_email: Option<String>,
    status: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    started_at: Option<String>,
    #[serde(default)]
    finished_at: Option<String>,
    #[serde(default)]
    result_path: Option<String>,
    #[serde(default)]
    payload: Option<Value>,
    #[serde(default)]
    result_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub id: String,
    pub title: String,
    pub owner_email: String,
    pub status: JobStatus,
    pub raw_status: String,
}

impl JobSummary {
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(8) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

/// Structured result attached to a finished job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResultContent {
    Missing,
    Json(Value),
    /// Stored text that is not valid JSON, kept verbatim
    Invalid(String),
}

impl ResultContent {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
            None => ResultContent::Missing,
            Some(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Null) => ResultContent::Missing,
                Ok(value) => ResultContent::Json(value),
                Err(_) => ResultContent::Invalid(raw.to_string()),
            },
        }
    }
}

/// Everything the detail view shows for one job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub summary: JobSummary,
    pub created_at: Option<String>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub result_path: Option<String>,
    pub input_key: Option<String>,
    pub result: ResultContent,
}

impl From<RawJob> for JobDetail {
    fn from(raw: RawJob) -> Self {
        let input_key = raw
            .payload
            .as_ref()
            .and_then(|payload| payload.get("input_key"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let result = ResultContent::parse(raw.result_content.as_deref());
        Self {
            summary: JobSummary {
                status: JobStatus::classify(&raw.status),
                id: raw.id,
                title: raw.title.unwrap_or_default(),
                owner_email: raw.owner_email.unwrap_or_default(),
                raw_status: raw.status,
            },
            created_at: raw.created_at,
            started_at: raw.started_at,
            finished_at: raw.finished_at,
            result_path: raw.result_path.filter(|path| !path.is_empty()),
            input_key,
            result,
        }
    }
}

pub fn parse_job_details(body: &str) -> ReelResult<Vec<JobDetail>> {
    let raw: Vec<RawJob> = serde_json::from_str(body)
        .map_err(|err| ReelError::invalid(format!("unexpected jobs payload: {err}")))?;
    Ok(raw.into_iter().map(JobDetail::from).collect())
}

pub fn parse_jobs(body: &str) -> ReelResult<Vec<JobSummary>> {
    Ok(parse_job_details(body)?
        .into_iter()
        .map(|detail| detail.summary)
        .collect())
}

/// Exact id first, then a unique id prefix (the table shows 8 characters)
pub fn find_job(jobs: Vec<JobDetail>, id: &str) -> ReelResult<JobDetail> {
    let id = id.trim().trim_end_matches("...");
    if id.is_empty() {
        return Err(ReelError::invalid("empty job id"));
    }
    if let Some(job) = jobs.iter().find(|job| job.summary.id == id) {
        return Ok(job.clone());
    }
    let mut matches = jobs.into_iter().filter(|job| job.summary.id.starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(job), None) => Ok(job),
        (Some(_), Some(_)) => Err(ReelError::invalid(format!("job id prefix '{id}' is ambiguous"))),
        (None, _) => Err(ReelError::NotFound(format!("Could not find job with ID: {id}"))),
    }
}

/// Local, human-readable timestamp; unparseable values are shown as given
fn format_timestamp(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
        return "N/A".to_string();
    };
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string();
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}

pub fn render_detail(job: &JobDetail) -> String {
    let summary = &job.summary;
    let mut out = format!("Job {}\n\n", summary.id);
    out.push_str(&format!("  Title:       {}\n", summary.title));
    out.push_str(&format!("  Owner:       {}\n", summary.owner_email));
    out.push_str(&format!("  Status:      {} ({})\n", summary.status, summary.raw_status));
    out.push_str(&format!("  Created at:  {}\n", format_timestamp(job.created_at.as_deref())));
    out.push_str(&format!("  Started at:  {}\n", format_timestamp(job.started_at.as_deref())));
    out.push_str(&format!("  Finished at: {}\n", format_timestamp(job.finished_at.as_deref())));
    out.push_str(&format!(
        "  Result key:  {}\n",
        job.result_path.as_deref().unwrap_or("Not yet available")
    ));
    out.push_str(&format!(
        "  Input key:   {}\n",
        job.input_key.as_deref().unwrap_or("N/A")
    ));

    out.push_str("\nResult content:\n");
    match &job.result {
        ResultContent::Missing => out.push_str("  No structured result content available.\n"),
        ResultContent::Json(value) => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            out.push_str(&pretty);
            out.push('\n');
        }
        ResultContent::Invalid(raw) => {
            out.push_str(&format!("  Error parsing result content JSON: {raw}\n"));
        }
    }
    out
}

/// Plain-text table, one job per line
pub fn render_table(jobs: &[JobSummary]) -> String {
    if jobs.is_empty() {
        return "No active jobs found.\n".to_string();
    }
    let title_width = jobs
        .iter()
        .map(|job| job.title.chars().count())
        .max()
        .unwrap_or(0)
        .max("TITLE".len());
    let owner_width = jobs
        .iter()
        .map(|job| job.owner_email.chars().count())
        .max()
        .unwrap_or(0)
        .max("OWNER".len());

    let mut out = format!(
        "{:<11} {:<title_width$} {:<owner_width$} STATUS\n",
        "ID", "TITLE", "OWNER"
    );
    for job in jobs {
        out.push_str(&format!(
            "{:<11} {:<title_width$} {:<owner_width$} {} ({})\n",
            format!("{}...", job.short_id()),
            job.title,
            job.owner_email,
            job.status,
            job.raw_status,
        ));
    }
    out
}

pub struct JobsClient {
    http: reqwest::Client,
}

impl JobsClient {
    pub fn new() -> ReelResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    pub async fn list(&self, base_url: &str, token: &str) -> ReelResult<Vec<JobSummary>> {
        let jobs = self.fetch(base_url, token).await?;
        info!(count = jobs.len(), "Jobs listed");
        Ok(jobs.into_iter().map(|job| job.summary).collect())
    }

    /// Detail for one job, looked up in the listing by id or unique id prefix
    pub async fn get(&self, base_url: &str, token: &str, id: &str) -> ReelResult<JobDetail> {
        let job = find_job(self.fetch(base_url, token).await?, id)?;
        info!(id = %job.summary.id, status = %job.summary.status, "Job fetched");
        Ok(job)
    }

    async fn fetch(&self, base_url: &str, token: &str) -> ReelResult<Vec<JobDetail>> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), JOBS_PATH);
        debug!(%url, "Fetching jobs");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(token)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ReelError::Api {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        parse_job_details(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const BODY: &str = r#"[
        {"id": "3f2a9c1e-7b44-4d2b-9e61-0c5f2d8a1b77", "title": "Postcards", "owner_email": "nino@helix.local", "status": "COMPLETED"},
        {"job_id": "a1b2", "status": "in_progress"},
        {"id": "c0ffee00-1111", "title": "Flyers", "owner_email": "simona@helix.local", "status": "PENDING (SHIM)"},
        {"id": "dead", "status": "ERROR"}
    ]"#;

    #[test]
    fn statuses_are_classified() {
        assert_eq!(JobStatus::classify("COMPLETED"), JobStatus::Completed);
        assert_eq!(JobStatus::classify("failed"), JobStatus::Failed);
        assert_eq!(JobStatus::classify("ERROR"), JobStatus::Failed);
        assert_eq!(JobStatus::classify("RUNNING"), JobStatus::Running);
        assert_eq!(JobStatus::classify("QUEUED"), JobStatus::Pending);
        assert_eq!(JobStatus::classify(""), JobStatus::Pending);
    }

    #[test]
    fn payload_parses_and_tables() {
        let jobs = parse_jobs(BODY).unwrap();
        assert_eq!(jobs.len(), 4);
        assert_eq!(jobs[0].short_id(), "3f2a9c1e");
        assert_eq!(jobs[1].short_id(), "a1b2");
        assert_eq!(jobs[1].status, JobStatus::Running);
        assert_eq!(jobs[2].status, JobStatus::Pending);
        assert_eq!(jobs[2].raw_status, "PENDING (SHIM)");

        let table = render_table(&jobs);
        assert!(table.starts_with("ID"));
        assert!(table.contains("3f2a9c1e..."));
        assert!(table.contains("failed (ERROR)"));
        assert_eq!(table.lines().count(), 5);
        assert_eq!(render_table(&[]), "No active jobs found.\n");
        assert!(parse_jobs("{\"detail\": \"nope\"}").is_err());
    }

    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).into_owned();
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (format!("http://{addr}/"), handle)
    }

    #[tokio::test]
    async fn list_sends_bearer_token() {
        let (base, server) = serve_once("200 OK", BODY).await;
        let jobs = JobsClient::new().unwrap().list(&base, "tok-123").await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(jobs.len(), 4);
        assert!(request.starts_with("GET /api/v1/jobs "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer tok-123"));
    }

    const DETAIL_BODY: &str = r#"[
        {"id": "3f2a9c1e-7b44-4d2b-9e61-0c5f2d8a1b77", "title": "Postcards", "owner_email": "nino@helix.local",
         "status": "COMPLETED", "created_at": "2026-01-12T09:30:00", "started_at": "2026-01-12T09:30:04.250",
         "finished_at": "yesterday", "result_path": "results/3f2a9c1e.json",
         "payload": {"input_key": "uploads/postcards.csv"}, "result_content": "{\"pages\": 4, \"ok\": true}"},
        {"id": "3f2b0000", "status": "FAILED", "result_content": "{not json"},
        {"id": "a1b2", "status": "RUNNING", "result_path": ""}
    ]"#;

    #[test]
    fn detail_fields_are_parsed() {
        let jobs = parse_job_details(DETAIL_BODY).unwrap();

        let done = &jobs[0];
        assert_eq!(done.input_key.as_deref(), Some("uploads/postcards.csv"));
        assert_eq!(done.result_path.as_deref(), Some("results/3f2a9c1e.json"));
        assert_eq!(done.result, ResultContent::Json(serde_json::json!({"pages": 4, "ok": true})));
        let text = render_detail(done);
        assert!(text.contains("Created at:  2026-01-12 09:30:00"));
        assert!(text.contains("Started at:  2026-01-12 09:30:04"));
        assert!(text.contains("Finished at: yesterday"));
        assert!(text.contains("\"pages\": 4"));

        let failed = &jobs[1];
        assert_eq!(failed.result, ResultContent::Invalid("{not json".into()));
        let text = render_detail(failed);
        assert!(text.contains("Error parsing result content JSON: {not json"));
        assert!(text.contains("Created at:  N/A"));
        assert!(text.contains("Input key:   N/A"));

        let running = &jobs[2];
        assert_eq!(running.result, ResultContent::Missing);
        assert!(running.result_path.is_none());
        assert!(render_detail(running).contains("Result key:  Not yet available"));
        assert!(render_detail(running).contains("No structured result content available."));
    }

    #[test]
    fn jobs_are_found_by_id_or_unique_prefix() {
        let jobs = || parse_job_details(DETAIL_BODY).unwrap();

        assert_eq!(find_job(jobs(), "a1b2").unwrap().summary.status, JobStatus::Running);
        assert_eq!(find_job(jobs(), "3f2a9c1e...").unwrap().summary.title, "Postcards");
        assert_eq!(find_job(jobs(), "3f2b0000").unwrap().summary.status, JobStatus::Failed);
        assert!(matches!(find_job(jobs(), "3f2"), Err(ReelError::InvalidInput(_))));
        let missing = find_job(jobs(), "zzz").unwrap_err();
        assert!(matches!(missing, ReelError::NotFound(_)));
        assert!(missing.to_string().contains("Could not find job with ID: zzz"));
    }

    #[tokio::test]
    async fn get_returns_one_job() {
        let (base, server) = serve_once("200 OK", DETAIL_BODY).await;
        let job = JobsClient::new()
            .unwrap()
            .get(&base, "tok-123", "3f2a9c1e")
            .await
            .unwrap();
        server.await.unwrap();
        assert_eq!(job.summary.id, "3f2a9c1e-7b44-4d2b-9e61-0c5f2d8a1b77");
    }

    #[tokio::test]
    async fn non_success_names_the_status() {
        let (base, server) = serve_once("401 Unauthorized", r#"{"detail":"bad token"}"#).await;
        let err = JobsClient::new().unwrap().list(&base, "x").await.unwrap_err();
        server.await.unwrap();

        match err {
            ReelError::Api { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("bad token"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
