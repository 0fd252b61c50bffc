//! 설정 값(inline/env)을 실제 자격 증명으로 해석한다.
//!
//! - 환경변수 접근은 인프라 계층에서만 수행한다.

use std::env;

use crate::application::config::{AgentConfig, AgentSettings, Config, GitHubConfig};
use crate::application::error::AgentError;

/// 자격 증명 해석 결과. `source`는 값 없이 출처만 기록한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialResolution {
    pub value: Option<String>,
    pub source: Option<String>,
}

/// 에이전트 API key를 해석한다.
pub fn resolve_agent_key(cfg: &AgentConfig) -> CredentialResolution {
    resolve_with(cfg.api_key.as_deref(), cfg.api_key_env(), |name| {
        env::var(name).ok()
    })
}

/// GitHub 토큰을 해석한다. 토큰이 없어도 공개 저장소는 조회할 수 있다.
pub fn resolve_github_token(cfg: &GitHubConfig) -> CredentialResolution {
    resolve_with(cfg.token.as_deref(), cfg.token_env(), |name| env::var(name).ok())
}

/// 에이전트 HTTP 게이트웨이 생성에 필요한 값을 한 번에 확정한다.
pub fn agent_settings(config: &Config) -> Result<AgentSettings, AgentError> {
    let Some(api_key) = resolve_agent_key(&config.agent).value else {
        return Err(AgentError::MissingCredential {
            env: config.agent.api_key_env().to_string(),
        });
    };

    Ok(AgentSettings {
        api_base: config.agent.api_base(),
        ui_base: config.agent.ui_base(),
        api_key,
        request_timeout: config.agent.request_timeout(),
    })
}

fn resolve_with(
    inline: Option<&str>,
    env_name: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> CredentialResolution {
    if let Some(value) = inline.map(str::trim).filter(|v| !v.is_empty()) {
        return CredentialResolution {
            value: Some(value.to_string()),
            source: Some("inline".to_string()),
        };
    }

    match lookup(env_name).map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => CredentialResolution {
            value: Some(v),
            source: Some(format!("env:{env_name}")),
        },
        _ => CredentialResolution {
            value: None,
            source: Some(format!("env:{env_name} (missing)")),
        },
    }
}
