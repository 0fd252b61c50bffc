//! 에이전트 세션 클라이언트: 생성, 후속 메시지, 종료 조건까지 폴링.

mod poll;

use std::time::Duration;

use serde_json::Value;
use tracing::info;

use crate::application::error::AgentError;
use crate::application::ports::{AgentGateway, Reporter};
use crate::domain::session::{OutputValidator, SessionHandle, SessionSnapshot, TerminalSet};

/// 폴링 간격 정책(지수 증가 + 상한).
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

/// 폴링 1회 호출의 종료 조건.
#[derive(Debug, Clone)]
pub struct PollRequest {
    pub max_wait: Duration,
    pub validator: Option<OutputValidator>,
    pub terminal: TerminalSet,
}

impl PollRequest {
    /// 검증기 없이 기본 종료 집합({finished, blocked})을 쓴다.
    pub fn new(max_wait: Duration) -> Self {
        Self {
            max_wait,
            validator: None,
            terminal: TerminalSet::default(),
        }
    }

    pub fn with_validator(mut self, validator: OutputValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_terminal(mut self, terminal: TerminalSet) -> Self {
        self.terminal = terminal;
        self
    }
}

/// 전송 포트 위에 세션 수명주기 규칙을 얹은 클라이언트.
pub struct SessionClient<'a> {
    gateway: &'a dyn AgentGateway,
    reporter: &'a dyn Reporter,
    backoff: Backoff,
}

impl<'a> SessionClient<'a> {
    pub fn new(gateway: &'a dyn AgentGateway, reporter: &'a dyn Reporter) -> Self {
        Self {
            gateway,
            reporter,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// 프롬프트로 새 대화를 연다. 응답에 세션 id가 없으면 오류다.
    pub async fn create(&self, prompt: &str) -> Result<SessionHandle, AgentError> {
        let response = self.gateway.create_session(prompt).await?;
        let session_id = ["session_id", "id"]
            .iter()
            .filter_map(|key| response.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|id| !id.is_empty())
            .ok_or_else(|| AgentError::MissingSessionId {
                body: response.to_string(),
            })?;

        let handle = SessionHandle::new(session_id, self.gateway.ui_base());
        info!(session_id = %handle.session_id, "agent session created");
        Ok(handle)
    }

    /// 기존 대화에 메시지를 덧붙인다.
    pub async fn send(&self, session_id: &str, message: &str) -> Result<Value, AgentError> {
        let ack = self.gateway.send_message(session_id, message).await?;
        info!(session_id, "message sent to agent session");
        Ok(ack)
    }

    pub fn session_endpoint(&self, session_id: &str) -> String {
        self.gateway.session_endpoint(session_id)
    }

    async fn fetch(&self, session_id: &str) -> Result<SessionSnapshot, AgentError> {
        let raw = self.gateway.fetch_session(session_id).await?;
        Ok(SessionSnapshot::from_value(raw))
    }
}
