//! Arbeitnow job board provider
//!
//! Walks `links.next` from `/api/job-board-api` page by page and maps each
//! page's entries to canonical [`Job`]s as it goes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{Provider, ProviderError};
use crate::models::{Channel, Job, JobStatus, PublishStatus};

const ENDPOINT_JOB_BOARD: &str = "/api/job-board-api";

/// Header carrying the channel id on every upstream request
pub const CHANNEL_HEADER: &str = "X-Channel-Id";

#[derive(Debug, Deserialize)]
struct JobBoardResponse {
    #[serde(default)]
    data: Vec<JobEntry>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct JobEntry {
    slug: String,
    #[serde(default)]
    company_name: String,
    title: String,
    #[serde(default)]
    description: String,
    url: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    job_types: Vec<String>,
    created_at: i64,
    #[serde(default)]
    remote: bool,
}

pub struct ArbeitnowProvider {
    client: reqwest::Client,
    base_url: String,
    channel: Channel,
}

impl ArbeitnowProvider {
    pub fn new(client: reqwest::Client, base_url: &str, channel: Channel) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            channel,
        }
    }

    async fn job_board(&self, endpoint: &str) -> Result<JobBoardResponse, ProviderError> {
        let response = self
            .client
            .get(endpoint)
            .header(CHANNEL_HEADER, self.channel.id.to_string())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if body.is_empty() {
                return Err(ProviderError::EmptyStatus {
                    code: status.as_u16(),
                });
            }
            return Err(ProviderError::Status {
                code: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Decode {
            reason: e.to_string(),
            body,
        })
    }

    fn to_job(&self, entry: JobEntry) -> Result<Job, ProviderError> {
        let posted_at = DateTime::from_timestamp(entry.created_at, 0).ok_or_else(|| {
            ProviderError::Decode {
                reason: format!("invalid created_at {}", entry.created_at),
                body: entry.slug.clone(),
            }
        })?;
        let now = Utc::now();

        Ok(Job {
            id: Job::job_id(self.channel.id, &entry.slug),
            channel_id: self.channel.id,
            status: JobStatus::Active,
            publish_status: PublishStatus::Unpublished,
            url: entry.url,
            title: entry.title,
            description: entry.description,
            source: self.channel.integration.as_str().to_string(),
            location: entry.location,
            remote: entry.remote,
            posted_at,
            created_at: now,
            updated_at: now,
        })
    }
}

#[async_trait]
impl Provider for ArbeitnowProvider {
    fn channel(&self) -> &Channel {
        &self.channel
    }

    async fn get_jobs(&self) -> Result<Vec<Job>, ProviderError> {
        let mut jobs = Vec::new();
        let mut page = 1;
        let mut endpoint = format!("{}{ENDPOINT_JOB_BOARD}", self.base_url);

        loop {
            let on_page = |e: ProviderError| ProviderError::Page {
                page,
                channel_id: self.channel.id,
                source: Box::new(e),
            };
            let response = self.job_board(&endpoint).await.map_err(on_page)?;

            for entry in response.data {
                jobs.push(self.to_job(entry).map_err(on_page)?);
            }

            match response.links.next {
                Some(next) if !next.is_empty() => {
                    endpoint = next;
                    page += 1;
                }
                _ => break,
            }
        }

        tracing::debug!(
            channel_id = %self.channel.id,
            pages = page,
            jobs = jobs.len(),
            "fetched arbeitnow job board"
        );

        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Integration;

    #[test]
    fn test_decode_job_board_response() {
        let body = r#"{
            "data": [{
                "slug": "rust-engineer-berlin-42",
                "company_name": "Acme",
                "title": "Rust Engineer",
                "description": "<p>Build things</p>",
                "url": "https://www.arbeitnow.com/jobs/rust-engineer-berlin-42",
                "location": "Berlin",
                "tags": ["rust"],
                "job_types": ["full time"],
                "created_at": 1700000000,
                "remote": true
            }],
            "links": {"next": null}
        }"#;

        let response: JobBoardResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.data.len(), 1);
        assert!(response.links.next.is_none());

        let channel = Channel::new("arbeitnow", Integration::Arbeitnow);
        let provider = ArbeitnowProvider::new(reqwest::Client::new(), "http://localhost/", channel.clone());
        let job = provider
            .to_job(response.data.into_iter().next().unwrap())
            .unwrap();

        assert_eq!(job.id, Job::job_id(channel.id, "rust-engineer-berlin-42"));
        assert_eq!(job.source, "arbeitnow");
        assert_eq!(job.posted_at.timestamp(), 1_700_000_000);
        assert!(job.remote);
        assert_eq!(job.status, JobStatus::Active);
        assert_eq!(job.publish_status, PublishStatus::Unpublished);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let channel = Channel::new("arbeitnow", Integration::Arbeitnow);
        let provider = ArbeitnowProvider::new(reqwest::Client::new(), "http://localhost:8080/", channel);
        assert_eq!(provider.base_url, "http://localhost:8080");
    }
}
