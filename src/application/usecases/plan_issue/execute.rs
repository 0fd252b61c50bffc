//! 승인된 plan을 패치 또는 PR로 실행하는 단계. 매 실행마다 새 세션을 연다.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::application::session::PollRequest;
use crate::application::usecases::plan_issue::PlanIssueUseCase;
use crate::application::usecases::plan_issue::context::IssueContext;
use crate::domain::output::{
    extract_final_text, extract_pr_failure_reason, extract_pr_url, reports_repo_access_failure,
};
use crate::domain::prompt::{PromptKind, build_prompt};
use crate::domain::session::{PollOutcome, SessionStatus};

/// plan을 unified diff로 받아 `devin.patch`에 저장한다.
pub(super) async fn run_execute_patch(
    use_case: &PlanIssueUseCase<'_>,
    ctx: &IssueContext,
    plan: &str,
) -> Result<()> {
    use_case.reporter.section("Execute");
    let prompt = build_prompt(PromptKind::Execute, &ctx.prompt_context(Some(plan)));
    let (ui_url, outcome) =
        run_execution_session(use_case, &prompt, use_case.config.execute_max_wait()).await?;

    if outcome.status == SessionStatus::Timeout {
        use_case
            .reporter
            .status("Execute", "Execution did not finish in time. No patch was written.");
        use_case.reporter.kv("Session URL", &ui_url);
        return Ok(());
    }

    let output = extract_final_text(&outcome.snapshot.raw);
    if reports_repo_access_failure(&output) {
        use_case
            .reporter
            .status("Execute", "Repo access failed. Execution aborted.");
        use_case.reporter.raw(&output);
        return Ok(());
    }

    let path = use_case
        .workspace
        .save_patch(&ctx.repo, ctx.number, &output)
        .context("failed to save devin.patch")?;
    info!(path = %path.display(), "patch saved");
    use_case.reporter.kv("Saved patch", &path.display().to_string());
    use_case.reporter.raw("Inspect: git apply --stat devin.patch");
    use_case.reporter.raw("Apply: git apply devin.patch");
    Ok(())
}

/// plan을 PR로 올리도록 요청한다. PR URL을 찾지 못하면 패치 생성으로 대체할지 묻는다.
pub(super) async fn run_execute_pr(
    use_case: &PlanIssueUseCase<'_>,
    ctx: &IssueContext,
    plan: &str,
) -> Result<()> {
    use_case.reporter.section("Pull Request");
    let prompt = build_prompt(PromptKind::ExecutePr, &ctx.prompt_context(Some(plan)));
    let (_, outcome) = run_execution_session(use_case, &prompt, use_case.config.pr_max_wait()).await?;

    let output = extract_final_text(&outcome.snapshot.raw);
    use_case
        .workspace
        .save_final_output(&ctx.repo, ctx.number, &output)
        .context("failed to save devin_final.md")?;

    if let Some(pr_url) = extract_pr_url(&output) {
        use_case
            .workspace
            .save_pr_url(&ctx.repo, ctx.number, &pr_url)
            .context("failed to save pr.txt")?;
        use_case.reporter.kv("PR URL", &pr_url);
        return Ok(());
    }

    use_case.reporter.status("PR", "PR creation failed.");
    use_case
        .reporter
        .kv("Reason", &extract_pr_failure_reason(&output));

    let answer = use_case
        .prompter
        .ask("Would you like to generate a patch instead using the existing plan? [y/N] ")?
        .unwrap_or_default();
    if answer.trim().eq_ignore_ascii_case("y") {
        return run_execute_patch(use_case, ctx, plan).await;
    }
    Ok(())
}

async fn run_execution_session(
    use_case: &PlanIssueUseCase<'_>,
    prompt: &str,
    max_wait: Duration,
) -> Result<(String, PollOutcome)> {
    use_case
        .reporter
        .status("Agent", "Starting execution session...");
    let sessions = use_case.sessions();
    let handle = sessions
        .create(prompt)
        .await
        .context("failed to create execution session")?;
    use_case.reporter.kv("Session URL", &handle.ui_url);

    let outcome = sessions
        .poll(&handle.session_id, &PollRequest::new(max_wait))
        .await?;
    use_case.reporter.kv("Final status", outcome.status.as_str());
    Ok((handle.ui_url, outcome))
}
