//! Shared test utilities: a temporary tickets home and a local HTTP server built on `hyper`.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::config::DEFAULT_API_BASE_URL;
use crate::Config;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// Test environment with an initialized tickets home directory.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("tickets");
        let config = Config::create(&root, DEFAULT_API_BASE_URL).await.unwrap();
        Self { temp_dir, config }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    /// The tickets home.
    pub fn home(&self) -> PathBuf {
        self.config.root().unwrap().to_path_buf()
    }

    /// A scratch directory outside the tickets home.
    pub fn scratch(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` to `name` in the scratch directory and returns its path.
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }
}

/// A request as the test server received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// The path and query, e.g. `/clasificaciones/?x=1`.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// The first header named `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Answers each request with the next canned `(status, json body)` response, in order, and records
/// every request it receives.
pub struct TestServer {
    url: Url,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

type Responses = Arc<Mutex<VecDeque<(u16, String)>>>;

impl TestServer {
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses: Responses = Arc::new(Mutex::new(responses.into()));

        let recorded = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = Arc::clone(&recorded);
                let responses = Arc::clone(&responses);
                tokio::spawn(async move {
                    let service = service_fn(move |request| {
                        respond(request, Arc::clone(&recorded), Arc::clone(&responses))
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });
        Self {
            url,
            requests,
            task,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn respond(
    request: Request<Incoming>,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    responses: Responses,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = request.into_parts();
    let body = body.collect().await?.to_bytes().to_vec();
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());
    let headers = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).to_string(),
            )
        })
        .collect();
    recorded.lock().unwrap().push(RecordedRequest {
        method: parts.method.to_string(),
        target,
        headers,
        body,
    });

    let next = responses.lock().unwrap().pop_front();
    let (status, body) =
        next.unwrap_or_else(|| (500, r#"{"error": "no response queued"}"#.to_string()));
    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_env() {
        let env = TestEnv::new().await;
        assert!(env.home().join("config.json").is_file());
        assert!(env.config().history().is_some());
        let path = env.write_file("a.csv", "x");
        assert!(path.starts_with(env.scratch()));
    }

    #[tokio::test]
    async fn test_server_records_and_answers_in_order() {
        let server = TestServer::start(vec![
            (200, r#"{"n": 1}"#.to_string()),
            (404, r#"{"n": 2}"#.to_string()),
        ])
        .await;
        let client = reqwest::Client::new();

        let first = client
            .post(server.url().join("a/?x=1").unwrap())
            .body("hola")
            .send()
            .await
            .unwrap();
        assert_eq!(first.status().as_u16(), 200);
        assert_eq!(first.text().await.unwrap(), r#"{"n": 1}"#);

        let second = client
            .delete(server.url().join("b").unwrap())
            .send()
            .await
            .unwrap();
        assert_eq!(second.status().as_u16(), 404);

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/a/?x=1");
        assert_eq!(requests[0].body, b"hola");
        assert_eq!(requests[0].header("Content-Length"), Some("4"));
        assert_eq!(requests[1].method, "DELETE");
        assert_eq!(requests[1].target, "/b");
    }
}
