//! 파일시스템 기반 산출물 저장소.
//!
//! 레이아웃: `<root>/<owner_repo>/issue-<n>/{issue.json, context.json, plan.md, ...}`

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::ports::WorkspaceStore;
use crate::domain::issue::{CommentRecord, IssueRecord, RepoSlug};

const ISSUE_FILE: &str = "issue.json";
const CONTEXT_FILE: &str = "context.json";
const PLAN_FILE: &str = "plan.md";
const SESSION_FILE: &str = "session.json";
const QUESTIONS_FILE: &str = "clarifying_questions.md";
const FINAL_OUTPUT_FILE: &str = "devin_final.md";
const PR_FILE: &str = "pr.txt";
const PATCH_FILE: &str = "devin.patch";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ContextFile {
    #[serde(default)]
    comments: Vec<CommentRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    session_id: Option<String>,
}

pub struct FileWorkspaceStore {
    root: PathBuf,
}

impl FileWorkspaceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn issue_dir(&self, repo: &RepoSlug, issue: u64) -> PathBuf {
        self.root.join(repo.dir_slug()).join(format!("issue-{issue}"))
    }

    fn path(&self, repo: &RepoSlug, issue: u64, file: &str) -> PathBuf {
        self.issue_dir(repo, issue).join(file)
    }

    /// 디렉터리를 만들고 파일 전체를 덮어쓴다.
    fn write(&self, repo: &RepoSlug, issue: u64, file: &str, content: &str) -> Result<PathBuf> {
        let dir = self.issue_dir(repo, issue);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
        let path = dir.join(file);
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
        debug!(path = %path.display(), "workspace artifact written");
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, repo: &RepoSlug, issue: u64, file: &str, value: &T) -> Result<PathBuf> {
        let rendered = serde_json::to_string_pretty(value)?;
        self.write(repo, issue, file, &rendered)
    }

    fn read(&self, repo: &RepoSlug, issue: u64, file: &str) -> Result<Option<String>> {
        read_optional(&self.path(repo, issue, file))
    }

    fn read_json<T: for<'de> Deserialize<'de>>(
        &self,
        repo: &RepoSlug,
        issue: u64,
        file: &str,
    ) -> Result<Option<T>> {
        let path = self.path(repo, issue, file);
        let Some(raw) = read_optional(&path)? else {
            return Ok(None);
        };
        let parsed = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse JSON in {}", path.display()))?;
        Ok(Some(parsed))
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

impl WorkspaceStore for FileWorkspaceStore {
    fn load_issue(&self, repo: &RepoSlug, issue: u64) -> Result<Option<IssueRecord>> {
        self.read_json(repo, issue, ISSUE_FILE)
    }

    fn load_comments(&self, repo: &RepoSlug, issue: u64) -> Result<Option<Vec<CommentRecord>>> {
        Ok(self
            .read_json::<ContextFile>(repo, issue, CONTEXT_FILE)?
            .map(|ctx| ctx.comments))
    }

    fn save_issue_context(
        &self,
        repo: &RepoSlug,
        issue: &IssueRecord,
        comments: &[CommentRecord],
    ) -> Result<()> {
        self.write_json(repo, issue.number, ISSUE_FILE, issue)?;
        let context = ContextFile {
            comments: comments.to_vec(),
        };
        self.write_json(repo, issue.number, CONTEXT_FILE, &context)?;
        Ok(())
    }

    fn load_plan(&self, repo: &RepoSlug, issue: u64) -> Result<Option<String>> {
        self.read(repo, issue, PLAN_FILE)
    }

    fn save_plan(&self, repo: &RepoSlug, issue: u64, plan: &str) -> Result<PathBuf> {
        self.write(repo, issue, PLAN_FILE, plan)
    }

    fn delete_plan(&self, repo: &RepoSlug, issue: u64) -> Result<()> {
        let path = self.path(repo, issue, PLAN_FILE);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to delete {}", path.display())),
        }
    }

    fn load_session_id(&self, repo: &RepoSlug, issue: u64) -> Result<Option<String>> {
        // 손상된 session.json은 세션 없음으로 취급한다.
        match self.read_json::<SessionFile>(repo, issue, SESSION_FILE) {
            Ok(file) => Ok(file
                .and_then(|f| f.session_id)
                .filter(|id| !id.trim().is_empty())),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "ignoring unreadable session.json");
                Ok(None)
            }
        }
    }

    fn save_session_id(&self, repo: &RepoSlug, issue: u64, session_id: &str) -> Result<()> {
        let file = SessionFile {
            session_id: Some(session_id.to_string()),
        };
        self.write_json(repo, issue, SESSION_FILE, &file)?;
        Ok(())
    }

    fn save_clarifying_questions(
        &self,
        repo: &RepoSlug,
        issue: u64,
        text: &str,
    ) -> Result<PathBuf> {
        self.write(repo, issue, QUESTIONS_FILE, text)
    }

    fn save_final_output(&self, repo: &RepoSlug, issue: u64, text: &str) -> Result<PathBuf> {
        self.write(repo, issue, FINAL_OUTPUT_FILE, text)
    }

    fn save_pr_url(&self, repo: &RepoSlug, issue: u64, url: &str) -> Result<PathBuf> {
        self.write(repo, issue, PR_FILE, url)
    }

    fn save_patch(&self, repo: &RepoSlug, issue: u64, diff: &str) -> Result<PathBuf> {
        self.write(repo, issue, PATCH_FILE, diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoSlug {
        RepoSlug::parse("octo/widgets").unwrap()
    }

    #[test]
    fn issue_context_round_trips_under_issue_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWorkspaceStore::new(dir.path());
        let issue = IssueRecord {
            number: 42,
            title: "Crash".to_string(),
            ..IssueRecord::default()
        };
        let comments = vec![CommentRecord {
            author_login: "alice".to_string(),
            body: "repro steps".to_string(),
            ..CommentRecord::default()
        }];

        store.save_issue_context(&repo(), &issue, &comments).unwrap();

        assert!(dir.path().join("octo_widgets/issue-42/issue.json").is_file());
        assert_eq!(store.load_issue(&repo(), 42).unwrap(), Some(issue));
        assert_eq!(store.load_comments(&repo(), 42).unwrap(), Some(comments));
    }

    #[test]
    fn missing_files_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWorkspaceStore::new(dir.path());

        assert_eq!(store.load_issue(&repo(), 1).unwrap(), None);
        assert_eq!(store.load_comments(&repo(), 1).unwrap(), None);
        assert_eq!(store.load_plan(&repo(), 1).unwrap(), None);
        assert_eq!(store.load_session_id(&repo(), 1).unwrap(), None);
    }

    #[test]
    fn legacy_snapshot_with_partial_fields_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWorkspaceStore::new(dir.path());
        let issue_dir = store.issue_dir(&repo(), 7);
        fs::create_dir_all(&issue_dir).unwrap();
        fs::write(
            issue_dir.join("issue.json"),
            r#"{"title": "Old", "body": null, "number": 7, "url": null}"#,
        )
        .unwrap();
        fs::write(issue_dir.join("context.json"), "{}").unwrap();

        let issue = store.load_issue(&repo(), 7).unwrap().unwrap();
        assert_eq!(issue.title, "Old");
        assert!(issue.labels.is_empty());
        assert_eq!(store.load_comments(&repo(), 7).unwrap(), Some(Vec::new()));
    }

    #[test]
    fn plan_is_overwritten_and_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWorkspaceStore::new(dir.path());

        store.save_plan(&repo(), 3, "first").unwrap();
        let path = store.save_plan(&repo(), 3, "second").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "second");

        store.delete_plan(&repo(), 3).unwrap();
        assert_eq!(store.load_plan(&repo(), 3).unwrap(), None);
        // 없는 plan 삭제는 오류가 아니다.
        store.delete_plan(&repo(), 3).unwrap();
    }

    #[test]
    fn session_id_round_trips_and_tolerates_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWorkspaceStore::new(dir.path());

        store.save_session_id(&repo(), 5, "devin-abc").unwrap();
        assert_eq!(
            store.load_session_id(&repo(), 5).unwrap().as_deref(),
            Some("devin-abc")
        );

        fs::write(store.issue_dir(&repo(), 5).join("session.json"), "not json").unwrap();
        assert_eq!(store.load_session_id(&repo(), 5).unwrap(), None);
    }

    #[test]
    fn execution_artifacts_use_fixed_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWorkspaceStore::new(dir.path());

        let patch = store.save_patch(&repo(), 9, "diff --git").unwrap();
        let final_output = store.save_final_output(&repo(), 9, "done").unwrap();
        let pr = store
            .save_pr_url(&repo(), 9, "https://github.com/octo/widgets/pull/1")
            .unwrap();
        let questions = store.save_clarifying_questions(&repo(), 9, "- q").unwrap();

        assert!(patch.ends_with("octo_widgets/issue-9/devin.patch"));
        assert!(final_output.ends_with("devin_final.md"));
        assert!(pr.ends_with("pr.txt"));
        assert!(questions.ends_with("clarifying_questions.md"));
    }
}
