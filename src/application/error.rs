//! 에이전트 세션 계층의 치명적 오류 분류.

/// 세션 생성/메시지/폴링 중 복구하지 않는 오류.
/// 코어는 프로세스를 종료하지 않고 이 값을 돌려주며, 종료 여부는 최상위에서 결정한다.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent API key is missing. Set {env} in your environment or agent.api_key in config")]
    MissingCredential { env: String },

    #[error("agent: failed to {action}: {message}")]
    Transport { action: &'static str, message: String },

    #[error("agent: {action} failed ({status}): {body}")]
    Status {
        action: &'static str,
        status: u16,
        body: String,
    },

    #[error("agent: invalid JSON response while {action}: {message}")]
    InvalidJson { action: &'static str, message: String },

    #[error("agent response missing session_id: {body}")]
    MissingSessionId { body: String },
}
