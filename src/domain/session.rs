//! 에이전트 세션 상태와 구조화 출력(plan/clarify) 모델.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

/// 원격 세션이 보고하는 상태. `Timeout`은 로컬 폴러만 만든다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    Queued,
    Working,
    Blocked,
    Finished,
    Timeout,
    Other(String),
}

impl SessionStatus {
    /// `status_enum` 값을 상태로 변환한다. 알 수 없는 값은 `Other`로 보존한다.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" => Self::Queued,
            "working" => Self::Working,
            "blocked" => Self::Blocked,
            "finished" => Self::Finished,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Working => "working",
            Self::Blocked => "blocked",
            Self::Finished => "finished",
            Self::Timeout => "timeout",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 폴링 종료로 인정할 상태 집합.
#[derive(Debug, Clone)]
pub struct TerminalSet(HashSet<SessionStatus>);

impl TerminalSet {
    pub fn new(statuses: impl IntoIterator<Item = SessionStatus>) -> Self {
        Self(statuses.into_iter().collect())
    }

    pub fn contains(&self, status: &SessionStatus) -> bool {
        self.0.contains(status)
    }
}

impl Default for TerminalSet {
    fn default() -> Self {
        Self::new([SessionStatus::Finished, SessionStatus::Blocked])
    }
}

/// 하나의 대화 세션 식별자와 사람이 열어볼 UI 주소.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub session_id: String,
    pub ui_url: String,
}

impl SessionHandle {
    pub fn new(session_id: impl Into<String>, ui_base: &str) -> Self {
        let session_id = session_id.into();
        let ui_url = session_ui_url(ui_base, &session_id);
        Self { session_id, ui_url }
    }
}

/// 세션 id에서 경로 접두어와 `devin-` 접두어를 제거해 UI 주소를 만든다.
pub fn session_ui_url(ui_base: &str, session_id: &str) -> String {
    let sid = session_id.rsplit('/').next().unwrap_or(session_id);
    let sid = sid.strip_prefix("devin-").unwrap_or(sid);
    format!("{}/{}", ui_base.trim_end_matches('/'), sid)
}

/// 검증을 통과한 plan 페이로드.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOutput {
    pub summary: String,
    pub plan_steps: Vec<String>,
    pub risks: Vec<String>,
    pub confidence: f64,
}

/// 검증을 통과한 clarify 페이로드.
#[derive(Debug, Clone, PartialEq)]
pub struct ClarifyOutput {
    pub questions: Vec<String>,
    pub why_needed: Vec<String>,
    pub confidence: f64,
}

/// API 경계에서 한 번 해석한 구조화 출력.
/// `mode`와 일치하는 슬롯만 읽으며, 검증에 실패하면 원본을 `Unrecognized`로 보관한다.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredOutput {
    Plan(PlanOutput),
    Clarify(ClarifyOutput),
    Unrecognized(Value),
}

impl StructuredOutput {
    /// `structured_output` 값을 해석한다. null/누락이면 `None`.
    pub fn from_value(value: Option<&Value>) -> Option<Self> {
        let value = value.filter(|v| !v.is_null())?;

        let parsed = match value.get("mode").and_then(Value::as_str) {
            Some("plan") => value.get("plan").and_then(parse_plan).map(Self::Plan),
            Some("clarify") => value.get("clarify").and_then(parse_clarify).map(Self::Clarify),
            _ => None,
        };

        Some(parsed.unwrap_or_else(|| Self::Unrecognized(value.clone())))
    }

    pub fn as_plan(&self) -> Option<&PlanOutput> {
        match self {
            Self::Plan(plan) => Some(plan),
            _ => None,
        }
    }

    pub fn as_clarify(&self) -> Option<&ClarifyOutput> {
        match self {
            Self::Clarify(clarify) => Some(clarify),
            _ => None,
        }
    }
}

/// 폴링 종료를 막는 구조 검증기.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputValidator {
    Plan,
    Clarify,
}

impl OutputValidator {
    pub fn accepts(self, output: Option<&StructuredOutput>) -> bool {
        match (self, output) {
            (Self::Plan, Some(StructuredOutput::Plan(_))) => true,
            (Self::Clarify, Some(StructuredOutput::Clarify(_))) => true,
            _ => false,
        }
    }
}

/// 세션 조회 1회의 결과.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub status: Option<SessionStatus>,
    pub structured_output: Option<StructuredOutput>,
    pub raw: Value,
}

impl SessionSnapshot {
    pub fn from_value(raw: Value) -> Self {
        let status = raw
            .get("status_enum")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(SessionStatus::parse);
        let structured_output = StructuredOutput::from_value(raw.get("structured_output"));

        Self {
            status,
            structured_output,
            raw,
        }
    }

    /// 저장된 텍스트만으로 스냅샷을 만든다(캐시된 plan 재사용 시).
    pub fn from_text(text: &str) -> Self {
        Self::from_value(serde_json::json!({ "output_text": text }))
    }
}

/// 폴링 최종 결과.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub status: SessionStatus,
    pub snapshot: SessionSnapshot,
}

fn parse_plan(plan: &Value) -> Option<PlanOutput> {
    let summary = plan
        .get("summary")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())?;
    let plan_steps = string_items(plan.get("plan_steps")?)?;
    if plan_steps.is_empty() {
        return None;
    }
    let risks = string_items(plan.get("risks")?)?;
    let confidence = unit_confidence(plan.get("confidence")?)?;

    Some(PlanOutput {
        summary: summary.to_string(),
        plan_steps,
        risks,
        confidence,
    })
}

fn parse_clarify(clarify: &Value) -> Option<ClarifyOutput> {
    let questions = string_items(clarify.get("questions")?)?;
    if !(5..=10).contains(&questions.len()) {
        return None;
    }
    let why_needed = string_items(clarify.get("why_needed")?)?;
    if why_needed.len() != questions.len() {
        return None;
    }
    let confidence = unit_confidence(clarify.get("confidence")?)?;

    Some(ClarifyOutput {
        questions,
        why_needed,
        confidence,
    })
}

/// 배열 원소를 문자열로 모은다. 문자열이 아닌 원소는 JSON 표기로 보존한다.
pub(crate) fn string_items(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(items.iter().map(value_text).collect())
}

pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn unit_confidence(value: &Value) -> Option<f64> {
    // bool은 숫자로 인정하지 않는다.
    let confidence = value.as_f64()?;
    (0.0..=1.0).contains(&confidence).then_some(confidence)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: Value) -> Option<StructuredOutput> {
        StructuredOutput::from_value(Some(&value))
    }

    fn plan_accepts(value: Value) -> bool {
        OutputValidator::Plan.accepts(parse(value).as_ref())
    }

    fn clarify_accepts(value: Value) -> bool {
        OutputValidator::Clarify.accepts(parse(value).as_ref())
    }

    fn clarify_with(count: usize, why_count: usize) -> Value {
        json!({
            "mode": "clarify",
            "clarify": {
                "questions": (0..count).map(|i| format!("q{i}")).collect::<Vec<_>>(),
                "why_needed": (0..why_count).map(|i| format!("w{i}")).collect::<Vec<_>>(),
                "confidence": 0.4
            }
        })
    }

    #[test]
    fn plan_validator_accepts_well_formed_plan() {
        let value = json!({
            "mode": "plan",
            "plan": {
                "summary": "Fix cookie merge",
                "plan_steps": ["Add test", "Patch Session.prepare_request"],
                "risks": [],
                "confidence": 0.7
            }
        });
        assert!(plan_accepts(value.clone()));

        let plan = parse(value).unwrap();
        let plan = plan.as_plan().unwrap();
        assert_eq!(plan.summary, "Fix cookie merge");
        assert_eq!(plan.plan_steps.len(), 2);
        assert!(plan.risks.is_empty());
    }

    #[test]
    fn plan_validator_rejects_malformed_plans() {
        let base = |plan: Value| json!({ "mode": "plan", "plan": plan });
        let good_plan = json!({
            "summary": "s", "plan_steps": ["a"], "risks": [], "confidence": 0.5
        });

        assert!(!plan_accepts(json!({ "plan": good_plan.clone() })));
        assert!(!plan_accepts(json!({ "mode": "clarify", "plan": good_plan })));
        assert!(!plan_accepts(base(json!({
            "summary": "s", "plan_steps": [], "risks": [], "confidence": 0.5
        }))));
        assert!(!plan_accepts(base(json!({
            "summary": "s", "plan_steps": ["a"], "risks": [], "confidence": 1.5
        }))));
        assert!(!plan_accepts(base(json!({
            "summary": "s", "plan_steps": ["a"], "risks": [], "confidence": "high"
        }))));
        assert!(!plan_accepts(base(json!({
            "summary": "", "plan_steps": ["a"], "risks": [], "confidence": 0.5
        }))));
        assert!(!plan_accepts(base(json!({
            "summary": "s", "plan_steps": ["a"], "confidence": 0.5
        }))));
        assert!(!OutputValidator::Plan.accepts(None));
    }

    #[test]
    fn clarify_validator_enforces_question_bounds() {
        assert!(!clarify_accepts(clarify_with(4, 4)));
        assert!(!clarify_accepts(clarify_with(11, 11)));
        assert!(clarify_accepts(clarify_with(5, 5)));
        assert!(clarify_accepts(clarify_with(10, 10)));
        assert!(!clarify_accepts(clarify_with(6, 5)));
    }

    #[test]
    fn stale_slot_is_ignored() {
        // mode=clarify인데 clarify 슬롯이 비어 있으면 plan 슬롯이 유효해도 plan으로 보지 않는다.
        let value = json!({
            "mode": "clarify",
            "plan": { "summary": "s", "plan_steps": ["a"], "risks": [], "confidence": 0.5 }
        });
        let parsed = parse(value).unwrap();
        assert!(matches!(parsed, StructuredOutput::Unrecognized(_)));
        assert!(!OutputValidator::Plan.accepts(Some(&parsed)));
    }

    #[test]
    fn null_structured_output_is_absent() {
        assert!(StructuredOutput::from_value(Some(&Value::Null)).is_none());
        assert!(StructuredOutput::from_value(None).is_none());
    }

    #[test]
    fn snapshot_reads_status_enum() {
        let snapshot = SessionSnapshot::from_value(json!({ "status_enum": "blocked" }));
        assert_eq!(snapshot.status, Some(SessionStatus::Blocked));
        assert!(snapshot.structured_output.is_none());

        let missing = SessionSnapshot::from_value(json!({}));
        assert!(missing.status.is_none());

        let unknown = SessionSnapshot::from_value(json!({ "status_enum": "suspend_requested" }));
        assert_eq!(unknown.status, Some(SessionStatus::Other("suspend_requested".to_string())));
    }

    #[test]
    fn ui_url_strips_prefixes() {
        let base = "https://app.devin.ai/sessions/";
        assert_eq!(session_ui_url(base, "devin-abc123"), "https://app.devin.ai/sessions/abc123");
        assert_eq!(session_ui_url(base, "org/devin-xyz"), "https://app.devin.ai/sessions/xyz");
        assert_eq!(session_ui_url(base, "plain"), "https://app.devin.ai/sessions/plain");
    }

    #[test]
    fn default_terminal_set_is_finished_or_blocked() {
        let set = TerminalSet::default();
        assert!(set.contains(&SessionStatus::Finished));
        assert!(set.contains(&SessionStatus::Blocked));
        assert!(!set.contains(&SessionStatus::Working));
    }
}
