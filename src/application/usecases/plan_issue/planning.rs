//! 최초 plan 세션 생성 단계.

use anyhow::{Context, Result};

use crate::application::session::PollRequest;
use crate::application::usecases::plan_issue::PlanIssueUseCase;
use crate::application::usecases::plan_issue::context::IssueContext;
use crate::application::usecases::plan_issue::menu::{PlanConversation, run_menu};
use crate::domain::output::{extract_plan_text, render_snapshot};
use crate::domain::prompt::{PromptKind, build_prompt};
use crate::domain::session::OutputValidator;

/// 새 세션에 plan을 요청하고, 결과를 저장한 뒤 검토 메뉴로 넘어간다.
pub(super) async fn run_plan_flow(use_case: &PlanIssueUseCase<'_>, ctx: &IssueContext) -> Result<()> {
    let prompt = build_prompt(PromptKind::Plan, &ctx.prompt_context(None));
    let sessions = use_case.sessions();

    use_case.reporter.section("Plan");
    let handle = sessions
        .create(&prompt)
        .await
        .context("failed to create planning session")?;
    use_case.reporter.kv("Devin session created", &handle.session_id);
    use_case.reporter.kv("Session URL", &handle.ui_url);
    use_case
        .workspace
        .save_session_id(&ctx.repo, ctx.number, &handle.session_id)
        .context("failed to save session.json")?;

    let request = PollRequest::new(use_case.config.plan_max_wait()).with_validator(OutputValidator::Plan);
    let outcome = sessions.poll(&handle.session_id, &request).await?;

    use_case.reporter.raw(&render_snapshot(&outcome.snapshot));
    use_case
        .workspace
        .save_plan(&ctx.repo, ctx.number, &extract_plan_text(&outcome.snapshot))
        .context("failed to save plan.md")?;
    use_case.reporter.kv("Final status", outcome.status.as_str());

    let conversation = PlanConversation {
        session_id: Some(handle.session_id),
        status: outcome.status,
        plan: outcome.snapshot,
    };
    run_menu(use_case, ctx, conversation).await
}
