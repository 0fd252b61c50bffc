//! Devin 세션 REST API 전송 구현.

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};
use tracing::debug;

use crate::application::config::AgentSettings;
use crate::application::error::AgentError;
use crate::application::ports::AgentGateway;

/// 경로 세그먼트에서 그대로 둘 문자(RFC 3986 unreserved).
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub struct DevinClient {
    client: Client,
    api_base: String,
    ui_base: String,
    api_key: String,
}

impl DevinClient {
    /// 자격 증명이 확정된 설정으로만 생성한다.
    pub fn new(settings: AgentSettings) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| AgentError::Transport {
                action: "build HTTP client",
                message: err.to_string(),
            })?;

        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            ui_base: settings.ui_base,
            api_key: settings.api_key,
        })
    }

    fn sessions_endpoint(&self) -> String {
        format!("{}/sessions", self.api_base)
    }

    fn session_url(&self, session_id: &str) -> String {
        format!(
            "{}/{}",
            self.sessions_endpoint(),
            utf8_percent_encode(session_id, PATH_SEGMENT)
        )
    }

    /// 요청을 보내고 2xx가 아니거나 JSON이 아니면 분류된 오류로 돌려준다.
    async fn send_json(&self, action: &'static str, request: RequestBuilder) -> Result<Value, AgentError> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| AgentError::Transport {
                action,
                message: err.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| AgentError::Transport {
            action,
            message: err.to_string(),
        })?;
        debug!(action, status = status.as_u16(), "agent API responded");

        if !status.is_success() {
            return Err(AgentError::Status {
                action,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|err| AgentError::InvalidJson {
            action,
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl AgentGateway for DevinClient {
    async fn create_session(&self, prompt: &str) -> Result<Value, AgentError> {
        let req = self
            .client
            .post(self.sessions_endpoint())
            .json(&json!({ "prompt": prompt }));
        self.send_json("create session", req).await
    }

    async fn send_message(&self, session_id: &str, message: &str) -> Result<Value, AgentError> {
        let url = format!("{}/message", self.session_url(session_id));
        let req = self.client.post(url).json(&json!({ "message": message }));
        self.send_json("send message", req).await
    }

    async fn fetch_session(&self, session_id: &str) -> Result<Value, AgentError> {
        let req = self.client.get(self.session_url(session_id));
        self.send_json("fetch session", req).await
    }

    fn session_endpoint(&self, session_id: &str) -> String {
        self.session_url(session_id)
    }

    fn ui_base(&self) -> &str {
        &self.ui_base
    }
}
