//! HTTP transport over reqwest.

use crate::config::ClientConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tempo_core::{Method, RequestBody, Transport, TransportError, TransportResult};
use tracing::{debug, warn};

/// Shared handle to the session credential.
///
/// The session store writes it, the transport reads it on every request.
#[derive(Debug, Clone, Default)]
pub struct CredentialSlot {
    token: Arc<RwLock<Option<String>>>,
}

impl CredentialSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        match self.token.read() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut slot) => *slot = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    pub fn clear(&self) {
        self.set(None);
    }

    pub fn is_present(&self) -> bool {
        self.get().is_some()
    }
}

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
    credential: CredentialSlot,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig, credential: CredentialSlot) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.request_timeout_ms,
            credential,
        })
    }

    pub fn credential(&self) -> &CredentialSlot {
        &self.credential
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.url(path);
        let request = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };
        match self.credential.get() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> TransportResult<Value> {
        let response = request.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;
        debug!(%method, path, status = status.as_u16(), "request completed");

        if status.is_success() {
            return parse_body(&bytes);
        }

        let body = serde_json::from_slice::<Value>(&bytes).ok();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            warn!(timeout_ms = self.timeout_ms, "request timed out");
            return TransportError::Timeout {
                after_ms: self.timeout_ms,
            };
        }
        if err.is_decode() {
            return TransportError::Decode {
                reason: err.to_string(),
            };
        }
        warn!(error = %err, "request failed without a response");
        TransportError::NoResponse {
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> TransportResult<Value> {
        let request = self.request(Method::Get, path).query(query);
        self.send(Method::Get, path, request).await
    }

    async fn post(&self, path: &str, body: RequestBody) -> TransportResult<Value> {
        let request = with_body(self.request(Method::Post, path), &body);
        self.send(Method::Post, path, request).await
    }

    async fn put(&self, path: &str, body: Value) -> TransportResult<Value> {
        let request = self.request(Method::Put, path).json(&body);
        self.send(Method::Put, path, request).await
    }

    async fn delete(&self, path: &str, query: &[(String, String)]) -> TransportResult<Value> {
        let request = self.request(Method::Delete, path).query(query);
        self.send(Method::Delete, path, request).await
    }
}

/// JSON bodies go out as `application/json`, forms url-encoded.
fn with_body(request: reqwest::RequestBuilder, body: &RequestBody) -> reqwest::RequestBuilder {
    match body {
        RequestBody::Json(value) => request.json(value),
        RequestBody::Form(fields) => request.form(fields),
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn parse_body(bytes: &[u8]) -> TransportResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| TransportError::Decode {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogConfig, LogFormat};
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
    use serde_json::json;
    use std::path::PathBuf;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config(base_url: &str, timeout_ms: u64) -> ClientConfig {
        ClientConfig {
            api_base_url: base_url.to_string(),
            request_timeout_ms: timeout_ms,
            session_path: PathBuf::from("session.json"),
            log: LogConfig {
                filter: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }

    fn transport(credential: CredentialSlot) -> HttpTransport {
        HttpTransport::new(&config("http://localhost:8000/api/v1/", 10_000), credential).unwrap()
    }

    /// Serve one connection with a canned response, returning the raw request.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api/v1", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf[..n]).to_lowercase()
        });
        (base, handle)
    }

    #[test]
    fn test_bearer_attached_when_credential_present() {
        let credential = CredentialSlot::new();
        credential.set(Some("tok".to_string()));
        let request = transport(credential)
            .request(Method::Get, "projects")
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer tok"
        );
        assert_eq!(
            request.url().as_str(),
            "http://localhost:8000/api/v1/projects"
        );
    }

    #[test]
    fn test_bearer_omitted_without_credential() {
        let credential = CredentialSlot::new();
        let transport = transport(credential.clone());
        credential.set(Some("tok".to_string()));
        credential.clear();
        let request = transport.request(Method::Delete, "tasks/1").build().unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_form_body_is_url_encoded() {
        let transport = transport(CredentialSlot::new());
        let form = RequestBody::Form(vec![
            ("username".to_string(), "ada".to_string()),
            ("password".to_string(), "secret".to_string()),
        ]);
        let request = with_body(transport.request(Method::Post, "auth/login"), &form)
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, b"username=ada&password=secret");
    }

    #[test]
    fn test_json_body_content_type() {
        let transport = transport(CredentialSlot::new());
        let request = with_body(
            transport.request(Method::Post, "projects"),
            &RequestBody::Json(json!({"name": "A"})),
        )
        .build()
        .unwrap();
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let transport = HttpTransport::new(&config(&base, 100), CredentialSlot::new()).unwrap();
        let err = transport.get("projects", &[]).await.unwrap_err();
        assert_eq!(err, TransportError::Timeout { after_ms: 100 });
        server.abort();
    }

    #[tokio::test]
    async fn test_refused_connection_is_no_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let transport = HttpTransport::new(&config(&base, 2_000), CredentialSlot::new()).unwrap();
        let err = transport.get("projects", &[]).await.unwrap_err();
        assert!(err.is_network());
        assert!(matches!(err, TransportError::NoResponse { .. }));
    }

    #[tokio::test]
    async fn test_failure_status_keeps_body_and_sends_credential() {
        let (base, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\ncontent-type: application/json\r\ncontent-length: 27\r\nconnection: close\r\n\r\n{\"detail\":\"Task not found\"}",
        )
        .await;
        let credential = CredentialSlot::new();
        credential.set(Some("tok".to_string()));
        let transport = HttpTransport::new(&config(&base, 2_000), credential).unwrap();

        let err = transport.get("tasks/9", &[]).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.detail().as_deref(), Some("Task not found"));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("get /api/v1/tasks/9 "));
        assert!(raw.contains("authorization: bearer tok"));
    }

    #[tokio::test]
    async fn test_empty_success_body_is_null() {
        let (base, server) = serve_once(
            "HTTP/1.1 204 No Content\r\nconnection: close\r\n\r\n",
        )
        .await;
        let transport = HttpTransport::new(&config(&base, 2_000), CredentialSlot::new()).unwrap();

        let value = transport.delete("tasks/9", &[]).await.unwrap();
        assert_eq!(value, Value::Null);
        let raw = server.await.unwrap();
        assert!(raw.starts_with("delete /api/v1/tasks/9 "));
        assert!(!raw.contains("authorization"));
    }

    #[test]
    fn test_join_url_normalizes_slashes() {
        assert_eq!(
            join_url("http://localhost:8000/api/v1/", "/projects"),
            "http://localhost:8000/api/v1/projects"
        );
        assert_eq!(
            join_url("http://localhost:8000/api/v1", "tasks/3"),
            "http://localhost:8000/api/v1/tasks/3"
        );
    }

    #[test]
    fn test_empty_body_is_null() {
        assert_eq!(parse_body(b"").unwrap(), Value::Null);
        assert_eq!(parse_body(b" \n").unwrap(), Value::Null);
    }

    #[test]
    fn test_json_body_is_parsed() {
        assert_eq!(parse_body(br#"{"id": 1}"#).unwrap(), json!({"id": 1}));
    }

    #[test]
    fn test_non_json_success_body_is_decode_error() {
        assert!(matches!(
            parse_body(b"<html>"),
            Err(TransportError::Decode { .. })
        ));
    }

    #[test]
    fn test_credential_slot_is_shared() {
        let slot = CredentialSlot::new();
        let other = slot.clone();
        assert!(!slot.is_present());
        other.set(Some("abc".to_string()));
        assert_eq!(slot.get().as_deref(), Some("abc"));
        slot.clear();
        assert!(!other.is_present());
    }
}
