//! 세션 폴링 상태 기계.
//!
//! - `working`을 한 번 관측하기 전의 종료 상태는 믿지 않는다(has-started gate).
//! - 종료 후보를 보면 한 번 더 조회(final fetch)해 그 결과를 기준으로 판단한다.
//! - 검증기가 final fetch의 구조화 출력을 거부하면 계속 폴링한다.
//! - `max_wait`를 넘기면 마지막 응답과 함께 `timeout`을 돌려준다.

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::application::error::AgentError;
use crate::application::session::{PollRequest, SessionClient};
use crate::domain::session::{PollOutcome, SessionStatus};

impl SessionClient<'_> {
    /// 종료 조건을 만족할 때까지 세션을 폴링한다.
    pub async fn poll(
        &self,
        session_id: &str,
        request: &PollRequest,
    ) -> Result<PollOutcome, AgentError> {
        let started_at = Instant::now();
        let mut delay = self.backoff.initial;
        let mut has_started = false;
        let mut cycle = 0u32;

        loop {
            cycle += 1;
            let mut last = self.fetch(session_id).await?;
            let status = last.status.clone();
            debug!(session_id, cycle, status = ?status, "polled agent session");

            if status == Some(SessionStatus::Working) {
                has_started = true;
            }

            if let Some(candidate) = status.filter(|s| has_started && request.terminal.contains(s)) {
                let confirmed = self.fetch(session_id).await?;
                let final_status = confirmed.status.clone().unwrap_or(candidate);
                let accepted = request
                    .validator
                    .is_none_or(|v| v.accepts(confirmed.structured_output.as_ref()));

                if accepted {
                    debug!(session_id, status = %final_status, "agent session reached terminal state");
                    return Ok(PollOutcome {
                        status: final_status,
                        snapshot: confirmed,
                    });
                }

                debug!(
                    session_id,
                    status = %final_status,
                    "structured output not ready yet; continuing to poll"
                );
                last = confirmed;
            }

            if started_at.elapsed() > request.max_wait {
                let endpoint = self.session_endpoint(session_id);
                warn!(session_id, max_wait = ?request.max_wait, "agent session polling timed out");
                self.reporter
                    .status("Poll", "Polling timed out. You can check the session here:");
                self.reporter.raw(&endpoint);
                return Ok(PollOutcome {
                    status: SessionStatus::Timeout,
                    snapshot: last,
                });
            }

            sleep(delay).await;
            delay = (delay * 2).min(self.backoff.max);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{Value, json};

    use super::*;
    use crate::application::session::Backoff;
    use crate::application::testing::{RecordingReporter, ScriptedGateway};
    use crate::domain::session::{OutputValidator, TerminalSet};

    fn valid_plan() -> Value {
        json!({
            "mode": "plan",
            "plan": {
                "summary": "Fix cookie merge",
                "plan_steps": ["Add test", "Patch Session.prepare_request"],
                "risks": [],
                "confidence": 0.7
            }
        })
    }

    fn reading(status: &str, marker: &str) -> Value {
        json!({ "status_enum": status, "marker": marker })
    }

    fn marker(outcome: &PollOutcome) -> &str {
        outcome.snapshot.raw["marker"].as_str().unwrap_or_default()
    }

    #[tokio::test(start_paused = true)]
    async fn returns_payload_from_final_fetch() {
        let mut final_fetch = reading("finished", "final");
        final_fetch["structured_output"] = valid_plan();
        let mut first_finished = reading("finished", "candidate");
        first_finished["structured_output"] = valid_plan();

        let gateway = ScriptedGateway::new(vec![
            reading("queued", "q"),
            reading("working", "w"),
            first_finished,
            final_fetch,
        ]);
        let reporter = RecordingReporter::default();
        let request = PollRequest::new(Duration::from_secs(300)).with_validator(OutputValidator::Plan);

        let outcome = SessionClient::new(&gateway, &reporter)
            .poll("s-1", &request)
            .await
            .unwrap();

        assert_eq!(outcome.status, SessionStatus::Finished);
        assert_eq!(marker(&outcome), "final");
        assert_eq!(gateway.fetch_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_status_before_work_starts_is_ignored() {
        let gateway = ScriptedGateway::new(vec![
            reading("finished", "premature"),
            reading("working", "w"),
            reading("finished", "second"),
            reading("finished", "second-final"),
        ]);
        let reporter = RecordingReporter::default();

        let outcome = SessionClient::new(&gateway, &reporter)
            .poll("s-1", &PollRequest::new(Duration::from_secs(300)))
            .await
            .unwrap();

        assert_eq!(outcome.status, SessionStatus::Finished);
        assert_eq!(marker(&outcome), "second-final");
        assert_eq!(gateway.fetch_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn never_validating_blocked_session_times_out() {
        let gateway = ScriptedGateway::new(vec![
            reading("working", "w"),
            json!({ "status_enum": "blocked", "structured_output": { "mode": "plan", "plan": {} } }),
        ]);
        let reporter = RecordingReporter::default();
        let request = PollRequest::new(Duration::from_secs(60)).with_validator(OutputValidator::Plan);

        let outcome = SessionClient::new(&gateway, &reporter)
            .poll("s-1", &request)
            .await
            .unwrap();

        assert_eq!(outcome.status, SessionStatus::Timeout);
        assert_eq!(outcome.snapshot.status, Some(SessionStatus::Blocked));
        assert!(reporter.lines().iter().any(|l| l.contains("/sessions/s-1")));
    }

    #[tokio::test(start_paused = true)]
    async fn final_fetch_without_status_keeps_candidate_status() {
        let gateway = ScriptedGateway::new(vec![
            reading("working", "w"),
            reading("blocked", "candidate"),
            json!({ "marker": "final" }),
        ]);
        let reporter = RecordingReporter::default();

        let outcome = SessionClient::new(&gateway, &reporter)
            .poll("s-1", &PollRequest::new(Duration::from_secs(300)))
            .await
            .unwrap();

        assert_eq!(outcome.status, SessionStatus::Blocked);
        assert_eq!(marker(&outcome), "final");
    }

    #[tokio::test(start_paused = true)]
    async fn custom_terminal_set_is_respected() {
        let gateway = ScriptedGateway::new(vec![
            reading("working", "w"),
            reading("blocked", "b"),
            reading("blocked", "b-final"),
            reading("finished", "f"),
            reading("finished", "f-final"),
        ]);
        let reporter = RecordingReporter::default();
        let request = PollRequest::new(Duration::from_secs(300))
            .with_terminal(TerminalSet::new([SessionStatus::Finished]));

        let outcome = SessionClient::new(&gateway, &reporter)
            .poll("s-1", &request)
            .await
            .unwrap();

        assert_eq!(outcome.status, SessionStatus::Finished);
        assert_eq!(marker(&outcome), "f-final");
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_doubles_up_to_the_cap() {
        let gateway = ScriptedGateway::new(vec![reading("working", "w")]);
        let reporter = RecordingReporter::default();
        let started = Instant::now();

        let outcome = SessionClient::new(&gateway, &reporter)
            .with_backoff(Backoff {
                initial: Duration::from_secs(1),
                max: Duration::from_secs(4),
            })
            .poll("s-1", &PollRequest::new(Duration::from_secs(10)))
            .await
            .unwrap();

        assert_eq!(outcome.status, SessionStatus::Timeout);
        // 1 + 2 + 4 + 4 = 11초 뒤 5번째 조회에서 한도를 넘긴다.
        assert_eq!(gateway.fetch_count(), 5);
        assert_eq!(started.elapsed(), Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_fatal() {
        let gateway = ScriptedGateway::new(vec![reading("working", "w")]).failing_fetch_after(1);
        let reporter = RecordingReporter::default();

        let err = SessionClient::new(&gateway, &reporter)
            .poll("s-1", &PollRequest::new(Duration::from_secs(300)))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Status { status: 500, .. }));
    }
}
