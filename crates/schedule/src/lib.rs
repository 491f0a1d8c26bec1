//! Schedule registration used by the workbench shell.
//! 工作台外殼使用的排程註冊模組。
//!
//! The cron expression is forwarded verbatim; the receiving service owns its
//! validation.

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Endpoint the schedule form posts to when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/tasks";

/// Schedule form values as typed by the user; blank fields take defaults.
/// 使用者輸入的排程表單；空白欄位會套用預設值。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleDraft {
    pub name: String,
    pub cron: String,
    pub next_run: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// JSON body accepted by the schedule endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub name: String,
    pub cron: String,
    pub next_run: String,
    pub start_date: String,
    pub end_date: String,
}

impl ScheduleDraft {
    pub fn into_request(self) -> Result<ScheduleRequest, ScheduleError> {
        self.into_request_at(Utc::now())
    }

    /// Fills defaults relative to `now`: next run is `now`, the window starts
    /// today and ends one year later.
    /// 以 `now` 為基準補上預設值。
    pub fn into_request_at(self, now: DateTime<Utc>) -> Result<ScheduleRequest, ScheduleError> {
        if self.name.trim().is_empty() {
            return Err(ScheduleError::MissingField("name"));
        }
        if self.cron.trim().is_empty() {
            return Err(ScheduleError::MissingField("cron"));
        }
        let today = now.date_naive();
        Ok(ScheduleRequest {
            name: self.name,
            cron: self.cron,
            next_run: non_blank(self.next_run)
                .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            start_date: non_blank(self.start_date).unwrap_or_else(|| format_date(today)),
            end_date: non_blank(self.end_date)
                .unwrap_or_else(|| format_date(one_year_after(today))),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Same month and day next year; Feb 29 rolls over to Mar 1.
fn one_year_after(date: NaiveDate) -> NaiveDate {
    let year = date.year() + 1;
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .unwrap_or(date)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Record echoed back by the endpoint after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    pub name: String,
    pub cron: String,
}

/// Blocking client posting schedule requests to the endpoint.
/// 將排程請求送往服務端的同步用戶端。
#[derive(Debug, Clone)]
pub struct ScheduleClient {
    endpoint: String,
    http: reqwest::blocking::Client,
}

impl ScheduleClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::blocking::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submits one request; failures are reported to the caller, never retried.
    pub fn submit(&self, request: &ScheduleRequest) -> Result<ScheduleRecord, ScheduleError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(|err| {
                warn!(endpoint = %self.endpoint, error = %err, "schedule request failed");
                ScheduleError::Http(err)
            })?;
        let status = response.status();
        if !status.is_success() {
            warn!(endpoint = %self.endpoint, status = status.as_u16(), "schedule rejected");
            return Err(ScheduleError::Rejected {
                status: status.as_u16(),
            });
        }
        let record: ScheduleRecord = response.json().map_err(ScheduleError::Http)?;
        info!(
            name = %record.name,
            id = record.id.as_deref().unwrap_or_default(),
            "schedule created"
        );
        Ok(record)
    }
}

impl Default for ScheduleClient {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule {0} is required")]
    MissingField(&'static str),
    #[error("schedule request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("schedule endpoint rejected the request with status {status}")]
    Rejected { status: u16 },
}
