//! Test fixtures for integration tests
//!
//! Provides a mock Arbeitnow job board and a log capture helper

use std::io;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tracing_subscriber::fmt::MakeWriter;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One job board entry as Arbeitnow serves it
pub fn board_entry(slug: &str) -> serde_json::Value {
    json!({
        "slug": slug,
        "company_name": "Acme",
        "title": format!("Title {slug}"),
        "description": "<p>desc</p>",
        "url": format!("https://www.arbeitnow.com/jobs/{slug}"),
        "location": "Berlin",
        "tags": ["rust"],
        "job_types": ["full time"],
        "created_at": 1_700_000_000,
        "remote": true
    })
}

/// Mount a three page board whose second page answers with a server error
pub async fn mount_board_failing_on_page_two(server: &MockServer) {
    let page = |n: u32| format!("{}/api/job-board-api?page={n}", server.uri());

    Mock::given(method("GET"))
        .and(path("/api/job-board-api"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/job-board-api"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [board_entry("c")],
            "links": {"next": null}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/job-board-api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [board_entry("a"), board_entry("b")],
            "links": {"next": page(2)}
        })))
        .mount(server)
        .await;
}

/// Mount a single page board
pub async fn mount_board(server: &MockServer, slugs: &[&str]) {
    let data: Vec<_> = slugs.iter().map(|slug| board_entry(slug)).collect();
    Mock::given(method("GET"))
        .and(path("/api/job-board-api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": data,
            "links": {"next": null}
        })))
        .mount(server)
        .await;
}

/// Collects formatted log lines in memory
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
