//! plan 검토 메뉴 구동부. 전이 규칙은 `domain::menu`에 있고 여기서는 입출력과 원격 호출만 한다.

use anyhow::{Context, Result};

use crate::application::session::PollRequest;
use crate::application::usecases::plan_issue::PlanIssueUseCase;
use crate::application::usecases::plan_issue::context::IssueContext;
use crate::application::usecases::plan_issue::execute::{run_execute_patch, run_execute_pr};
use crate::domain::menu::{MenuState, Transition};
use crate::domain::output::{extract_clarifying_questions, extract_plan_text, render_snapshot};
use crate::domain::prompt::{PromptKind, build_prompt};
use crate::domain::session::{OutputValidator, SessionSnapshot, SessionStatus, TerminalSet};

const NO_SESSION_HINT: &str = "No active planning session. Run with --fresh to regenerate.";

/// 검토 중인 planning 대화 상태.
pub(super) struct PlanConversation {
    pub session_id: Option<String>,
    pub status: SessionStatus,
    /// 승인 시 실행에 넘길 최신 plan 응답
    pub plan: SessionSnapshot,
}

/// 세션이 `blocked`(사용자 입력 대기)인 동안 메뉴를 반복한다.
pub(super) async fn run_menu(
    use_case: &PlanIssueUseCase<'_>,
    ctx: &IssueContext,
    mut conversation: PlanConversation,
) -> Result<()> {
    let mut state = MenuState::AwaitingDecision;

    while conversation.status == SessionStatus::Blocked {
        let Some(input) = use_case.prompter.ask(state.prompt())? else {
            return Ok(());
        };
        let transition = state.transition(&input);

        match transition {
            Transition::Approve => use_case.reporter.raw("Approved."),
            Transition::Deny => {
                use_case.reporter.raw("Denied.");
                use_case
                    .workspace
                    .delete_plan(&ctx.repo, ctx.number)
                    .context("failed to delete plan.md")?;
            }
            Transition::Revise => revise(use_case, ctx, &mut conversation).await?,
            Transition::AskQuestions => ask_questions(use_case, ctx, &mut conversation).await?,
            Transition::Execute => {
                let plan = extract_plan_text(&conversation.plan);
                run_execute_patch(use_case, ctx, &plan).await?;
            }
            Transition::OpenPr => {
                let plan = extract_plan_text(&conversation.plan);
                run_execute_pr(use_case, ctx, &plan).await?;
            }
            Transition::Exit => {}
            Transition::Invalid => use_case.reporter.raw(state.invalid_hint()),
        }

        match transition.next_state(state) {
            Some(next) => state = next,
            None => return Ok(()),
        }
    }

    Ok(())
}

fn follow_up_request(use_case: &PlanIssueUseCase<'_>, validator: OutputValidator) -> PollRequest {
    PollRequest::new(use_case.config.plan_max_wait())
        .with_validator(validator)
        .with_terminal(TerminalSet::new([SessionStatus::Blocked, SessionStatus::Finished]))
}

async fn revise(
    use_case: &PlanIssueUseCase<'_>,
    ctx: &IssueContext,
    conversation: &mut PlanConversation,
) -> Result<()> {
    let Some(session_id) = conversation.session_id.as_deref() else {
        use_case.reporter.raw(NO_SESSION_HINT);
        return Ok(());
    };

    let feedback = use_case
        .prompter
        .ask("Enter revision feedback: ")?
        .unwrap_or_default();
    let feedback = feedback.trim();
    if feedback.is_empty() {
        use_case.reporter.raw("No feedback provided, skipping.");
        return Ok(());
    }

    let message = build_prompt(PromptKind::Revise { feedback }, &ctx.prompt_context(None));
    let sessions = use_case.sessions();
    sessions
        .send(session_id, &message)
        .await
        .context("failed to send revision feedback")?;
    let outcome = sessions
        .poll(session_id, &follow_up_request(use_case, OutputValidator::Plan))
        .await?;

    use_case.reporter.raw(&render_snapshot(&outcome.snapshot));
    use_case
        .workspace
        .save_plan(&ctx.repo, ctx.number, &extract_plan_text(&outcome.snapshot))
        .context("failed to save plan.md")?;
    use_case.reporter.kv("Status", outcome.status.as_str());

    conversation.status = outcome.status;
    conversation.plan = outcome.snapshot;
    Ok(())
}

async fn ask_questions(
    use_case: &PlanIssueUseCase<'_>,
    ctx: &IssueContext,
    conversation: &mut PlanConversation,
) -> Result<()> {
    let Some(session_id) = conversation.session_id.as_deref() else {
        use_case.reporter.raw(NO_SESSION_HINT);
        return Ok(());
    };

    let message = build_prompt(PromptKind::Clarify, &ctx.prompt_context(None));
    let sessions = use_case.sessions();
    sessions
        .send(session_id, &message)
        .await
        .context("failed to request clarifying questions")?;
    let outcome = sessions
        .poll(session_id, &follow_up_request(use_case, OutputValidator::Clarify))
        .await?;

    use_case.reporter.raw(&render_snapshot(&outcome.snapshot));
    let path = use_case
        .workspace
        .save_clarifying_questions(
            &ctx.repo,
            ctx.number,
            &extract_clarifying_questions(&outcome.snapshot),
        )
        .context("failed to save clarifying_questions.md")?;
    use_case.reporter.kv("Saved questions", &path.display().to_string());
    use_case.reporter.kv("Status", outcome.status.as_str());

    // 질문 응답은 plan을 대체하지 않는다.
    conversation.status = outcome.status;
    Ok(())
}
