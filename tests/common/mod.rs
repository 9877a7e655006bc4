#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use figure_sentiment::config::Config;
use figure_sentiment::error::ProviderError;
use figure_sentiment::llm::{Completion, Provider};

pub fn config_with(pairs: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [("OPENAI_API_KEY", "sk-test"), ("HF_API_KEY", "hf-test")]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    for (k, v) in pairs {
        vars.insert(k.to_string(), v.to_string());
    }
    Config::from_lookup(|key| vars.get(key).cloned()).expect("test config")
}

// --- Scripted provider ---

/// Answers prompts from a queue and records what it was asked.
pub struct ScriptedProvider {
    answers: Mutex<VecDeque<Result<String, ProviderError>>>,
    pub calls: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedProvider {
    pub fn new(answers: Vec<Result<&str, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(
                answers
                    .into_iter()
                    .map(|a| a.map(str::to_string))
                    .collect(),
            ),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    async fn generate(
        &self,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<Completion, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), model.map(str::to_string)));
        let answer = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Unknown("script exhausted".to_string())))?;
        Ok(Completion {
            content: answer,
            model: model.unwrap_or("scripted-1").to_string(),
            ..Default::default()
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-1"
    }
}

// --- Stub HTTP server ---

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
}

impl StubResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn unavailable() -> Self {
        Self::json(
            503,
            serde_json::json!({"error": "Model is currently loading", "estimated_time": 20.0}),
        )
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: serde_json::Value,
}

/// Serves canned responses in order, one per connection; the last one repeats.
pub struct StubServer {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl StubServer {
    pub async fn start(responses: Vec<StubResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let captured = requests.clone();

        tokio::spawn(async move {
            let mut served = 0usize;
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let response = responses
                    .get(served)
                    .or_else(|| responses.last())
                    .cloned()
                    .expect("at least one stub response");
                served += 1;
                let captured = captured.clone();
                tokio::spawn(async move {
                    let _ = handle(stream, response, captured).await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, i: usize) -> CapturedRequest {
        self.requests.lock().unwrap()[i].clone()
    }
}

async fn handle(
    mut stream: TcpStream,
    response: StubResponse,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
) -> std::io::Result<()> {
    let request = read_request(&mut stream).await?;
    captured.lock().unwrap().push(request);

    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }

    let reason = match response.status {
        200 => "OK",
        401 => "Unauthorized",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let raw = format!(
        "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        response.status,
        reason,
        response.body.len(),
        response.body
    );
    stream.write_all(raw.as_bytes()).await?;
    stream.shutdown().await
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let path = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();
    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let end = (header_end + content_length).min(buf.len());
    let body = serde_json::from_slice(&buf[header_end..end]).unwrap_or(serde_json::Value::Null);

    Ok(CapturedRequest {
        path,
        headers,
        body,
    })
}
