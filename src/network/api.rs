use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};

use super::MessageSource;
use crate::common::{ChatMessage, Identity};
use crate::error::{AuthError, FetchError};

/// Client for the chat server's JSON HTTP API.
pub struct ApiClient {
    http: Client,
    base_url: String,
    fetch_timeout: Duration,
    auth_timeout: Duration,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// `{id, username, token}` as returned by `/login` and `/signup`.
#[derive(Deserialize)]
struct AuthResponse {
    #[serde(default, alias = "Id", deserialize_with = "id_as_string")]
    id: String,
    #[serde(default, alias = "Username")]
    username: String,
    #[serde(default, alias = "Token")]
    token: String,
}

// The server sends numeric ids; the client treats them as opaque strings.
fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(id) => id,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

impl ApiClient {
    /// `fetch_timeout` bounds `GET /messages`; `auth_timeout` bounds login
    /// and signup.
    pub fn new(
        base_url: &str,
        fetch_timeout: Duration,
        auth_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            fetch_timeout,
            auth_timeout,
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{route}", self.base_url)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        self.authenticate("login", username, password).await
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        self.authenticate("signup", username, password).await
    }

    async fn authenticate(
        &self,
        route: &str,
        username: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let response = self
            .http
            .post(self.url(route))
            .timeout(self.auth_timeout)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            log::warn!("/{route} rejected for {username}: {status}");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let body: AuthResponse = response.json().await?;
        if body.token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let username = if body.username.is_empty() {
            username.to_string()
        } else {
            body.username
        };
        log::info!("/{route} succeeded for {username}");
        Ok(Identity::new(body.id, username, body.token))
    }
}

#[async_trait]
impl MessageSource for ApiClient {
    async fn fetch_messages(&self, credential: &str) -> Result<Vec<ChatMessage>, FetchError> {
        if credential.is_empty() {
            return Err(FetchError::Unauthorized);
        }

        let response = self
            .http
            .get(self.url("messages"))
            .timeout(self.fetch_timeout)
            .header(AUTHORIZATION, credential)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        // An empty history may be encoded as `null`.
        let messages: Option<Vec<ChatMessage>> = response.json().await?;
        Ok(messages.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serves exactly one HTTP response and hands back the raw request head.
    async fn one_shot_server(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (request_tx, request_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = request_tx.send(request);
        });

        (format!("http://{addr}/"), request_rx)
    }

    /// Reads the head and, when announced, the body of one request.
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        let mut expected = None;
        loop {
            if let Some(total) = expected {
                if request.len() >= total {
                    break;
                }
            }
            let read = socket.read(&mut buf).await.unwrap();
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buf[..read]);
            if expected.is_none() {
                if let Some(end) = request.windows(4).position(|window| window == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
                    let body_len = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|len| len.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    expected = Some(end + 4 + body_len);
                }
            }
        }
        String::from_utf8_lossy(&request).to_lowercase()
    }

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(base_url, Duration::from_secs(5), Duration::from_secs(5)).unwrap()
    }

    /// Accepts one connection and never answers.
    async fn silent_server() -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let _ = read_request(&mut socket).await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });
        (format!("http://{addr}/"), server)
    }

    #[tokio::test]
    async fn fetch_sends_credential_and_no_store() {
        let (url, request) = one_shot_server(
            "200 OK",
            r#"[{"sender":"a","payload":"hi","datetime":"t1"}]"#,
        )
        .await;

        let messages = client(&url).fetch_messages("tok1").await.unwrap();
        assert_eq!(messages, vec![ChatMessage::new("a", "hi", "t1")]);

        let request = request.await.unwrap();
        assert!(request.starts_with("get /messages "));
        assert!(request.contains("authorization: tok1"));
        assert!(request.contains("cache-control: no-store"));
    }

    #[tokio::test]
    async fn fetch_treats_null_body_as_empty() {
        let (url, _request) = one_shot_server("200 OK", "null").await;
        let messages = client(&url).fetch_messages("tok1").await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn fetch_non_200_is_an_error() {
        let (url, _request) = one_shot_server("400 Bad Request", r#"{"error":"bad"}"#).await;
        let err = client(&url).fetch_messages("tok1").await.unwrap_err();
        assert!(matches!(err, FetchError::Status(400)));
    }

    #[tokio::test]
    async fn fetch_without_credential_skips_network() {
        let api = client("http://127.0.0.1:9");
        let err = api.fetch_messages("").await.unwrap_err();
        assert!(matches!(err, FetchError::Unauthorized));
    }

    #[tokio::test]
    async fn login_accepts_numeric_id() {
        let (url, request) = one_shot_server(
            "200 OK",
            r#"{"id":42,"username":"bob","token":"tok1"}"#,
        )
        .await;

        let identity = client(&url).login("bob", "hunter2").await.unwrap();
        assert_eq!(identity, Identity::new("42", "bob", "tok1"));

        let request = request.await.unwrap();
        assert!(request.starts_with("post /login "));
    }

    #[tokio::test]
    async fn signup_without_token_fails() {
        let (url, request) = one_shot_server("200 OK", r#"{"id":0,"username":"bob"}"#).await;
        let err = client(&url).signup("bob", "hunter2").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
        assert!(request.await.unwrap().starts_with("post /signup "));
    }

    #[tokio::test]
    async fn login_rejection_carries_status() {
        let (url, _request) =
            one_shot_server("401 Unauthorized", r#"{"error":"invalid credentials"}"#).await;
        let err = client(&url).login("bob", "wrong").await.unwrap_err();
        match err {
            AuthError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid credentials"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_uses_auth_timeout() {
        let (url, server) = silent_server().await;
        let api = ApiClient::new(&url, Duration::from_secs(30), Duration::from_millis(100))
            .unwrap();

        let err = tokio::time::timeout(Duration::from_secs(5), api.login("bob", "hunter2"))
            .await
            .expect("login should be bounded by the auth timeout")
            .unwrap_err();
        match err {
            AuthError::Http(err) => assert!(err.is_timeout()),
            other => panic!("unexpected error: {other:?}"),
        }
        server.abort();
    }

    #[tokio::test]
    async fn fetch_uses_fetch_timeout() {
        let (url, server) = silent_server().await;
        let api = ApiClient::new(&url, Duration::from_millis(100), Duration::from_secs(30))
            .unwrap();

        let err = tokio::time::timeout(Duration::from_secs(5), api.fetch_messages("tok1"))
            .await
            .expect("fetch should be bounded by the fetch timeout")
            .unwrap_err();
        match err {
            FetchError::Http(err) => assert!(err.is_timeout()),
            other => panic!("unexpected error: {other:?}"),
        }
        server.abort();
    }
}
