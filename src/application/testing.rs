//! 유스케이스/세션 테스트용 포트 대역.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::application::error::AgentError;
use crate::application::ports::{
    AgentGateway, IssueTracker, Reporter, UserPrompter, WorkspaceStore,
};
use crate::domain::issue::{CommentFetch, CommentRecord, IssueRecord, RepoSlug};

const TEST_API_BASE: &str = "https://api.devin.ai/v1";
const TEST_UI_BASE: &str = "https://app.devin.ai/sessions";

/// 정해진 응답을 순서대로 돌려주는 에이전트 게이트웨이. 소진되면 마지막 응답을 반복한다.
pub struct ScriptedGateway {
    fetches: Mutex<VecDeque<Value>>,
    last_fetch: Mutex<Value>,
    fetch_count: AtomicUsize,
    fail_fetch_after: Option<usize>,
    create_responses: Mutex<VecDeque<Value>>,
    created_prompts: Mutex<Vec<String>>,
    sent_messages: Mutex<Vec<(String, String)>>,
}

impl ScriptedGateway {
    pub fn new(fetches: Vec<Value>) -> Self {
        Self {
            fetches: Mutex::new(fetches.into()),
            last_fetch: Mutex::new(json!({})),
            fetch_count: AtomicUsize::new(0),
            fail_fetch_after: None,
            create_responses: Mutex::new(VecDeque::new()),
            created_prompts: Mutex::new(Vec::new()),
            sent_messages: Mutex::new(Vec::new()),
        }
    }

    /// 세션 생성 응답을 큐에 추가한다. 비어 있으면 `devin-test`를 돌려준다.
    pub fn with_create_response(self, response: Value) -> Self {
        self.create_responses.lock().unwrap().push_back(response);
        self
    }

    /// `count`번 조회에 성공한 뒤부터 500 응답으로 실패한다.
    pub fn failing_fetch_after(mut self, count: usize) -> Self {
        self.fail_fetch_after = Some(count);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn created_prompts(&self) -> Vec<String> {
        self.created_prompts.lock().unwrap().clone()
    }

    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent_messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentGateway for ScriptedGateway {
    async fn create_session(&self, prompt: &str) -> Result<Value, AgentError> {
        self.created_prompts.lock().unwrap().push(prompt.to_string());
        let response = self
            .create_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| json!({ "session_id": "devin-test" }));
        Ok(response)
    }

    async fn send_message(&self, session_id: &str, message: &str) -> Result<Value, AgentError> {
        self.sent_messages
            .lock()
            .unwrap()
            .push((session_id.to_string(), message.to_string()));
        Ok(json!({}))
    }

    async fn fetch_session(&self, _session_id: &str) -> Result<Value, AgentError> {
        let served = self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch_after.is_some_and(|limit| served >= limit) {
            return Err(AgentError::Status {
                action: "fetch session",
                status: 500,
                body: "boom".to_string(),
            });
        }

        let mut last = self.last_fetch.lock().unwrap();
        if let Some(next) = self.fetches.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }

    fn session_endpoint(&self, session_id: &str) -> String {
        format!("{TEST_API_BASE}/sessions/{session_id}")
    }

    fn ui_base(&self) -> &str {
        TEST_UI_BASE
    }
}

/// 출력된 줄을 모아 두는 리포터.
#[derive(Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }

    fn push(&self, line: String) {
        self.lines.lock().unwrap().push(line);
    }
}

impl Reporter for RecordingReporter {
    fn section(&self, name: &str) {
        self.push(format!("== {name} =="));
    }

    fn kv(&self, key: &str, value: &str) {
        self.push(format!("{key}: {value}"));
    }

    fn status(&self, scope: &str, message: &str) {
        self.push(format!("[{scope}] {message}"));
    }

    fn raw(&self, line: &str) {
        self.push(line.to_string());
    }
}

/// 미리 정한 답을 순서대로 돌려주고, 소진되면 입력 종료(`None`)를 알린다.
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl UserPrompter for ScriptedPrompter {
    fn ask(&self, prompt: &str) -> Result<Option<String>> {
        self.asked.lock().unwrap().push(prompt.to_string());
        Ok(self.answers.lock().unwrap().pop_front())
    }
}

/// 고정된 이슈/코멘트를 돌려주는 트래커.
pub struct FakeTracker {
    pub issues: Vec<IssueRecord>,
    pub comments: Option<Vec<CommentRecord>>,
    pub comment_calls: AtomicUsize,
}

impl FakeTracker {
    /// `comments`가 `None`이면 코멘트 조회가 실패한 것으로 응답한다.
    pub fn new(issues: Vec<IssueRecord>, comments: Option<Vec<CommentRecord>>) -> Self {
        Self {
            issues,
            comments,
            comment_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn list_open_issues(&self, _repo: &RepoSlug, limit: usize) -> Result<Vec<IssueRecord>> {
        Ok(self.issues.iter().take(limit).cloned().collect())
    }

    async fn fetch_issue(&self, repo: &RepoSlug, number: u64) -> Result<IssueRecord> {
        self.issues
            .iter()
            .find(|issue| issue.number == number)
            .cloned()
            .ok_or_else(|| anyhow!("issue {repo}#{number} not found"))
    }

    async fn fetch_comments(&self, _repo: &RepoSlug, _number: u64) -> CommentFetch {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        match &self.comments {
            Some(comments) => CommentFetch::Fetched(comments.clone()),
            None => CommentFetch::Failed,
        }
    }
}

/// 파일 대신 메모리에 산출물을 보관하는 작업공간.
#[derive(Default)]
pub struct MemoryWorkspace {
    files: Mutex<HashMap<String, String>>,
    pub context_reads: AtomicUsize,
}

impl MemoryWorkspace {
    fn key(repo: &RepoSlug, issue: u64, file: &str) -> String {
        format!("{}/issue-{issue}/{file}", repo.dir_slug())
    }

    pub fn seed(&self, repo: &RepoSlug, issue: u64, file: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(Self::key(repo, issue, file), content.to_string());
    }

    pub fn file(&self, repo: &RepoSlug, issue: u64, file: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(&Self::key(repo, issue, file))
            .cloned()
    }

    fn write(&self, repo: &RepoSlug, issue: u64, file: &str, content: &str) -> PathBuf {
        self.seed(repo, issue, file, content);
        PathBuf::from(Self::key(repo, issue, file))
    }
}

impl WorkspaceStore for MemoryWorkspace {
    fn load_issue(&self, repo: &RepoSlug, issue: u64) -> Result<Option<IssueRecord>> {
        self.file(repo, issue, "issue.json")
            .map(|raw| serde_json::from_str(&raw).map_err(Into::into))
            .transpose()
    }

    fn load_comments(&self, repo: &RepoSlug, issue: u64) -> Result<Option<Vec<CommentRecord>>> {
        self.context_reads.fetch_add(1, Ordering::SeqCst);
        let Some(raw) = self.file(repo, issue, "context.json") else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(&raw)?;
        let comments = value.get("comments").cloned().unwrap_or_else(|| json!([]));
        Ok(Some(serde_json::from_value(comments)?))
    }

    fn save_issue_context(
        &self,
        repo: &RepoSlug,
        issue: &IssueRecord,
        comments: &[CommentRecord],
    ) -> Result<()> {
        self.write(repo, issue.number, "issue.json", &serde_json::to_string(issue)?);
        let context = json!({ "comments": comments });
        self.write(repo, issue.number, "context.json", &context.to_string());
        Ok(())
    }

    fn load_plan(&self, repo: &RepoSlug, issue: u64) -> Result<Option<String>> {
        Ok(self.file(repo, issue, "plan.md"))
    }

    fn save_plan(&self, repo: &RepoSlug, issue: u64, plan: &str) -> Result<PathBuf> {
        Ok(self.write(repo, issue, "plan.md", plan))
    }

    fn delete_plan(&self, repo: &RepoSlug, issue: u64) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .remove(&Self::key(repo, issue, "plan.md"));
        Ok(())
    }

    fn load_session_id(&self, repo: &RepoSlug, issue: u64) -> Result<Option<String>> {
        let Some(raw) = self.file(repo, issue, "session.json") else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(&raw)?;
        Ok(value
            .get("session_id")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn save_session_id(&self, repo: &RepoSlug, issue: u64, session_id: &str) -> Result<()> {
        let body = json!({ "session_id": session_id }).to_string();
        self.write(repo, issue, "session.json", &body);
        Ok(())
    }

    fn save_clarifying_questions(
        &self,
        repo: &RepoSlug,
        issue: u64,
        text: &str,
    ) -> Result<PathBuf> {
        Ok(self.write(repo, issue, "clarifying_questions.md", text))
    }

    fn save_final_output(&self, repo: &RepoSlug, issue: u64, text: &str) -> Result<PathBuf> {
        Ok(self.write(repo, issue, "devin_final.md", text))
    }

    fn save_pr_url(&self, repo: &RepoSlug, issue: u64, url: &str) -> Result<PathBuf> {
        Ok(self.write(repo, issue, "pr.txt", url))
    }

    fn save_patch(&self, repo: &RepoSlug, issue: u64, diff: &str) -> Result<PathBuf> {
        Ok(self.write(repo, issue, "devin.patch", diff))
    }
}
