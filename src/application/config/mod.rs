//! 애플리케이션이 사용하는 설정 스키마(순수 데이터).
//!
//! 주의: 파일/환경변수 접근은 `infrastructure`에서만 수행한다.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::selection::DEFAULT_MAX_COMMENTS;

pub const DEFAULT_AGENT_API_BASE: &str = "https://api.devin.ai/v1";
pub const DEFAULT_AGENT_UI_BASE: &str = "https://app.devin.ai/sessions";
pub const DEFAULT_AGENT_KEY_ENV: &str = "DEVIN_API_KEY";
pub const DEFAULT_AGENT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const DEFAULT_WORKSPACE_DIR: &str = ".devin-workspace";
pub const DEFAULT_ISSUE_LIMIT: usize = 10;
pub const DEFAULT_PLAN_MAX_WAIT_SECS: u64 = 300;
pub const DEFAULT_EXECUTE_MAX_WAIT_SECS: u64 = 600;
pub const DEFAULT_PR_MAX_WAIT_SECS: u64 = 3600;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// 전역 기본값
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// 에이전트(Devin) API 설정
    #[serde(default)]
    pub agent: AgentConfig,
    /// GitHub API 설정
    #[serde(default)]
    pub github: GitHubConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DefaultsConfig {
    /// 산출물 저장 루트 디렉터리
    pub workspace_dir: Option<String>,
    /// 프롬프트에 넣을 코멘트 최대 개수
    pub max_comments: Option<usize>,
    /// 대화형 모드에서 나열할 오픈 이슈 수
    pub issue_limit: Option<usize>,
    /// plan/revise/clarify 폴링 대기 한도(초)
    pub plan_max_wait_secs: Option<u64>,
    /// patch 실행 폴링 대기 한도(초)
    pub execute_max_wait_secs: Option<u64>,
    /// PR 실행 폴링 대기 한도(초)
    pub pr_max_wait_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AgentConfig {
    /// API base URL override(선택)
    pub api_base: Option<String>,
    /// 세션 UI base URL override(선택)
    pub ui_base: Option<String>,
    /// 고정 API 키(민감정보: 권장하지 않음)
    pub api_key: Option<String>,
    /// API 키를 읽을 환경변수 이름
    pub api_key_env: Option<String>,
    /// 요청 1회 타임아웃(초)
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GitHubConfig {
    /// API base URL override(선택, Enterprise 등)
    pub api_base: Option<String>,
    /// 고정 토큰(민감정보: 권장하지 않음)
    pub token: Option<String>,
    /// 토큰을 읽을 환경변수 이름
    pub token_env: Option<String>,
}

/// 시작 시점에 한 번 해석되어 에이전트 클라이언트에 주입되는 값.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub api_base: String,
    pub ui_base: String,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl Config {
    pub fn workspace_dir(&self) -> PathBuf {
        PathBuf::from(
            self.defaults
                .workspace_dir
                .as_deref()
                .unwrap_or(DEFAULT_WORKSPACE_DIR),
        )
    }

    pub fn max_comments(&self) -> usize {
        self.defaults.max_comments.unwrap_or(DEFAULT_MAX_COMMENTS)
    }

    pub fn issue_limit(&self) -> usize {
        self.defaults.issue_limit.unwrap_or(DEFAULT_ISSUE_LIMIT).max(1)
    }

    pub fn plan_max_wait(&self) -> Duration {
        Duration::from_secs(
            self.defaults
                .plan_max_wait_secs
                .unwrap_or(DEFAULT_PLAN_MAX_WAIT_SECS),
        )
    }

    pub fn execute_max_wait(&self) -> Duration {
        Duration::from_secs(
            self.defaults
                .execute_max_wait_secs
                .unwrap_or(DEFAULT_EXECUTE_MAX_WAIT_SECS),
        )
    }

    pub fn pr_max_wait(&self) -> Duration {
        Duration::from_secs(
            self.defaults
                .pr_max_wait_secs
                .unwrap_or(DEFAULT_PR_MAX_WAIT_SECS),
        )
    }

    /// 후순위(나중 파일) 값으로 덮어쓰는 병합 규칙.
    pub fn merge_from(&mut self, other: Config) {
        self.defaults.merge_from(other.defaults);
        self.agent.merge_from(other.agent);
        self.github.merge_from(other.github);
    }
}

impl DefaultsConfig {
    pub fn merge_from(&mut self, other: DefaultsConfig) {
        if other.workspace_dir.is_some() {
            self.workspace_dir = other.workspace_dir;
        }
        if other.max_comments.is_some() {
            self.max_comments = other.max_comments;
        }
        if other.issue_limit.is_some() {
            self.issue_limit = other.issue_limit;
        }
        if other.plan_max_wait_secs.is_some() {
            self.plan_max_wait_secs = other.plan_max_wait_secs;
        }
        if other.execute_max_wait_secs.is_some() {
            self.execute_max_wait_secs = other.execute_max_wait_secs;
        }
        if other.pr_max_wait_secs.is_some() {
            self.pr_max_wait_secs = other.pr_max_wait_secs;
        }
    }
}

impl AgentConfig {
    pub fn api_base(&self) -> String {
        self.api_base
            .as_deref()
            .unwrap_or(DEFAULT_AGENT_API_BASE)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn ui_base(&self) -> String {
        self.ui_base
            .as_deref()
            .unwrap_or(DEFAULT_AGENT_UI_BASE)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_AGENT_KEY_ENV)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_AGENT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn merge_from(&mut self, other: AgentConfig) {
        if other.api_base.is_some() {
            self.api_base = other.api_base;
        }
        if other.ui_base.is_some() {
            self.ui_base = other.ui_base;
        }
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.api_key_env.is_some() {
            self.api_key_env = other.api_key_env;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
    }
}

impl GitHubConfig {
    pub fn api_base(&self) -> String {
        self.api_base
            .as_deref()
            .unwrap_or(DEFAULT_GITHUB_API_BASE)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn token_env(&self) -> &str {
        self.token_env
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_GITHUB_TOKEN_ENV)
    }

    pub fn merge_from(&mut self, other: GitHubConfig) {
        if other.api_base.is_some() {
            self.api_base = other.api_base;
        }
        if other.token.is_some() {
            self.token = other.token;
        }
        if other.token_env.is_some() {
            self.token_env = other.token_env;
        }
    }
}
