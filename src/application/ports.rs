//! 애플리케이션 계층이 의존하는 포트(추상 인터페이스) 모음.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::application::config::Config;
use crate::application::error::AgentError;
use crate::domain::issue::{CommentFetch, CommentRecord, IssueRecord, RepoSlug};

/// 설정 로딩/점검을 담당하는 저장소 포트.
pub trait ConfigRepository: Send + Sync {
    fn load(&self) -> Result<Config>;
    fn inspect_pretty_json(&self) -> Result<String>;
}

/// 이슈 트래커(GitHub) 조회 포트.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// PR을 제외한 오픈 이슈를 최대 `limit`개 조회한다.
    async fn list_open_issues(&self, repo: &RepoSlug, limit: usize) -> Result<Vec<IssueRecord>>;
    async fn fetch_issue(&self, repo: &RepoSlug, number: u64) -> Result<IssueRecord>;
    /// 조회 실패는 오류 대신 `CommentFetch::Failed`로 돌려준다.
    async fn fetch_comments(&self, repo: &RepoSlug, number: u64) -> CommentFetch;
}

/// 에이전트 세션 API 전송 포트. 응답은 해석 전 JSON 그대로 돌려준다.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    async fn create_session(&self, prompt: &str) -> Result<Value, AgentError>;
    async fn send_message(&self, session_id: &str, message: &str) -> Result<Value, AgentError>;
    async fn fetch_session(&self, session_id: &str) -> Result<Value, AgentError>;
    /// 사람이 직접 확인할 수 있는 세션 조회 endpoint.
    fn session_endpoint(&self, session_id: &str) -> String;
    /// 세션 UI base URL.
    fn ui_base(&self) -> &str;
}

/// (저장소, 이슈 번호)별 산출물 저장소 포트. 모든 쓰기는 전체 덮어쓰기다.
pub trait WorkspaceStore: Send + Sync {
    fn load_issue(&self, repo: &RepoSlug, issue: u64) -> Result<Option<IssueRecord>>;
    fn load_comments(&self, repo: &RepoSlug, issue: u64) -> Result<Option<Vec<CommentRecord>>>;
    fn save_issue_context(
        &self,
        repo: &RepoSlug,
        issue: &IssueRecord,
        comments: &[CommentRecord],
    ) -> Result<()>;

    fn load_plan(&self, repo: &RepoSlug, issue: u64) -> Result<Option<String>>;
    fn save_plan(&self, repo: &RepoSlug, issue: u64, plan: &str) -> Result<PathBuf>;
    fn delete_plan(&self, repo: &RepoSlug, issue: u64) -> Result<()>;

    fn load_session_id(&self, repo: &RepoSlug, issue: u64) -> Result<Option<String>>;
    fn save_session_id(&self, repo: &RepoSlug, issue: u64, session_id: &str) -> Result<()>;

    fn save_clarifying_questions(&self, repo: &RepoSlug, issue: u64, text: &str)
    -> Result<PathBuf>;
    fn save_final_output(&self, repo: &RepoSlug, issue: u64, text: &str) -> Result<PathBuf>;
    fn save_pr_url(&self, repo: &RepoSlug, issue: u64, url: &str) -> Result<PathBuf>;
    fn save_patch(&self, repo: &RepoSlug, issue: u64, diff: &str) -> Result<PathBuf>;
}

/// 대화형 입력 포트. `None`은 입력 스트림 종료를 뜻한다.
pub trait UserPrompter: Send + Sync {
    fn ask(&self, prompt: &str) -> Result<Option<String>>;
}

/// 콘솔/로그 출력 추상화 포트.
pub trait Reporter: Send + Sync {
    fn section(&self, name: &str);
    fn kv(&self, key: &str, value: &str);
    fn status(&self, scope: &str, message: &str);
    fn raw(&self, line: &str);
}
