//! 이슈/코멘트 컨텍스트 준비 단계.

use anyhow::{Context, Result};
use tracing::warn;

use crate::application::usecases::plan_issue::PlanIssueUseCase;
use crate::domain::issue::{CommentFetch, CommentRecord, IssueRecord, RepoSlug};
use crate::domain::prompt::PromptContext;
use crate::domain::selection::select_relevant_comments;

/// 한 이슈에 대한 계획/실행 요청에 공통으로 들어가는 입력.
pub(super) struct IssueContext {
    pub repo: RepoSlug,
    pub number: u64,
    pub issue: Option<IssueRecord>,
    pub comments: Vec<CommentRecord>,
}

impl IssueContext {
    pub fn prompt_context<'c>(&'c self, approved_plan: Option<&'c str>) -> PromptContext<'c> {
        PromptContext {
            repo: &self.repo,
            issue: self.issue.as_ref(),
            comments: &self.comments,
            approved_plan,
        }
    }
}

/// 코멘트를 조회해 관련도 상위만 남기고, 조회에 성공했으면 스냅샷을 저장한다.
pub(super) async fn collect_issue_context(
    use_case: &PlanIssueUseCase<'_>,
    repo: &RepoSlug,
    issue: IssueRecord,
) -> Result<IssueContext> {
    let comments = match use_case.tracker.fetch_comments(repo, issue.number).await {
        CommentFetch::Fetched(all) => {
            let selected = select_relevant_comments(&all, use_case.config.max_comments());
            use_case.reporter.status(
                "GitHub",
                &format!("Fetched {} comments, selected {}", all.len(), selected.len()),
            );
            use_case
                .workspace
                .save_issue_context(repo, &issue, &selected)
                .context("failed to save issue snapshot")?;
            selected
        }
        CommentFetch::Failed => {
            warn!(repo = %repo, issue = issue.number, "comment fetch failed; planning without discussion");
            use_case
                .reporter
                .status("GitHub", "Could not fetch comments; continuing without them");
            Vec::new()
        }
    };

    Ok(IssueContext {
        repo: repo.clone(),
        number: issue.number,
        issue: Some(issue),
        comments,
    })
}

/// 저장된 이슈/코멘트 스냅샷. 각 파일이 없으면 `None`.
pub(super) struct SavedContext {
    pub issue: Option<IssueRecord>,
    pub comments: Option<Vec<CommentRecord>>,
}

impl SavedContext {
    /// 이슈와 코멘트 스냅샷이 모두 있을 때만 캐시로 쓸 수 있다.
    pub fn is_complete(&self) -> bool {
        self.issue.is_some() && self.comments.is_some()
    }

    pub fn into_context(self, repo: &RepoSlug, number: u64) -> IssueContext {
        IssueContext {
            repo: repo.clone(),
            number,
            issue: self.issue,
            comments: self.comments.unwrap_or_default(),
        }
    }
}

pub(super) fn load_saved_context(
    use_case: &PlanIssueUseCase<'_>,
    repo: &RepoSlug,
    number: u64,
) -> Result<SavedContext> {
    let issue = use_case
        .workspace
        .load_issue(repo, number)
        .context("failed to read saved issue.json")?;
    let comments = use_case
        .workspace
        .load_comments(repo, number)
        .context("failed to read saved context.json")?;

    Ok(SavedContext { issue, comments })
}
