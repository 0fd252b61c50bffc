//! 이슈 선택부터 plan 검토, 패치/PR 실행까지의 대화형 흐름.

mod context;
mod execute;
mod menu;
mod planning;

use anyhow::{Context, Result, bail};

use crate::application::config::Config;
use crate::application::ports::{
    AgentGateway, IssueTracker, Reporter, UserPrompter, WorkspaceStore,
};
use crate::application::session::SessionClient;
use crate::domain::issue::{IssueRecord, RepoSlug};
use crate::domain::run::{RunMode, RunOptions};
use crate::domain::session::{SessionSnapshot, SessionStatus};

use context::{collect_issue_context, load_saved_context};
use execute::{run_execute_patch, run_execute_pr};
use menu::{PlanConversation, run_menu};
use planning::run_plan_flow;

/// GitHub 이슈를 에이전트 세션에 연결하는 유스케이스.
pub struct PlanIssueUseCase<'a> {
    pub config: &'a Config,
    pub tracker: &'a dyn IssueTracker,
    pub agent: &'a dyn AgentGateway,
    pub workspace: &'a dyn WorkspaceStore,
    pub prompter: &'a dyn UserPrompter,
    pub reporter: &'a dyn Reporter,
}

impl<'a> PlanIssueUseCase<'a> {
    /// 인자 없이 실행된 경우: 저장소를 묻고 오픈 이슈 목록에서 하나를 고른다.
    pub async fn run_interactive(&self) -> Result<()> {
        let repo_input = self.prompter.ask("Repo (owner/name): ")?.unwrap_or_default();
        if repo_input.trim().is_empty() {
            self.reporter.raw("Repo is required.");
            return Ok(());
        }
        let repo = RepoSlug::parse(&repo_input)?;

        let issues = self
            .tracker
            .list_open_issues(&repo, self.config.issue_limit())
            .await
            .with_context(|| format!("failed to list open issues of {repo}"))?;
        if issues.is_empty() {
            self.reporter.raw("No open issues found.");
            return Ok(());
        }
        self.print_issue_table(&issues);

        let prompt = format!("\nSelect an issue to analyze by index (1-{}): ", issues.len());
        let choice = self.prompter.ask(&prompt)?.unwrap_or_default();
        let Some(selected) = self.pick_issue(&issues, choice.trim()) else {
            return Ok(());
        };

        self.reporter.raw("\nSelected issue:");
        self.reporter
            .raw(&format!("#{}  {}", selected.number, selected.title));

        let ctx = collect_issue_context(self, &repo, selected.clone()).await?;
        run_plan_flow(self, &ctx).await
    }

    /// `--mode`가 지정된 비대화형 진입점.
    pub async fn execute(&self, options: RunOptions) -> Result<()> {
        match options.mode {
            RunMode::Plan => self.run_plan_mode(&options).await,
            RunMode::Execute => {
                let (ctx, plan) = self.load_approved_plan(&options)?;
                run_execute_patch(self, &ctx, &plan).await
            }
            RunMode::ExecutePr => {
                let (ctx, plan) = self.load_approved_plan(&options)?;
                run_execute_pr(self, &ctx, &plan).await
            }
        }
    }

    async fn run_plan_mode(&self, options: &RunOptions) -> Result<()> {
        let repo = &options.repo;
        let mut cached_issue = None;

        if !options.fresh {
            let saved = load_saved_context(self, repo, options.issue)?;
            if saved.is_complete() {
                let saved = saved.into_context(repo, options.issue);
                if let Some(plan) = self.workspace.load_plan(repo, options.issue)? {
                    self.reporter.raw("\nCurrent plan:\n");
                    self.reporter.raw(&plan);
                    let conversation = PlanConversation {
                        session_id: self.workspace.load_session_id(repo, options.issue)?,
                        status: SessionStatus::Blocked,
                        plan: SessionSnapshot::from_text(&plan),
                    };
                    return run_menu(self, &saved, conversation).await;
                }
                cached_issue = saved.issue;
            }
        }

        let issue = match cached_issue {
            Some(issue) => issue,
            None => self
                .tracker
                .fetch_issue(repo, options.issue)
                .await
                .with_context(|| format!("failed to fetch issue {repo}#{}", options.issue))?,
        };

        let ctx = collect_issue_context(self, repo, issue).await?;
        run_plan_flow(self, &ctx).await
    }

    fn load_approved_plan(&self, options: &RunOptions) -> Result<(context::IssueContext, String)> {
        let Some(plan) = self.workspace.load_plan(&options.repo, options.issue)? else {
            bail!("No saved plan found. Run with --mode plan first.");
        };
        let ctx = load_saved_context(self, &options.repo, options.issue)?
            .into_context(&options.repo, options.issue);
        Ok((ctx, plan))
    }

    fn print_issue_table(&self, issues: &[IssueRecord]) {
        self.reporter.raw("\nIndex | GitHub # | Title");
        self.reporter.raw("------+----------+---------------------------");
        for (index, issue) in issues.iter().enumerate() {
            self.reporter
                .raw(&format!("{:^5} | {:^8} | {}", index + 1, issue.number, issue.title));
        }
    }

    fn pick_issue<'i>(&self, issues: &'i [IssueRecord], choice: &str) -> Option<&'i IssueRecord> {
        if choice.starts_with('#') {
            self.reporter
                .raw("Provide issue by list index, not issue number.");
            return None;
        }
        let Ok(index) = choice.parse::<usize>() else {
            self.reporter.raw("Invalid input.");
            return None;
        };
        let picked = index.checked_sub(1).and_then(|i| issues.get(i));
        if picked.is_none() {
            self.reporter.raw("Selection out of range.");
        }
        picked
    }

    fn sessions(&self) -> SessionClient<'a> {
        SessionClient::new(self.agent, self.reporter)
    }
}
