//! 에이전트 응답에서 최종 텍스트를 뽑고 사람이 읽을 형태로 렌더링하는 규칙.

use serde_json::{Map, Value};

use crate::domain::session::{
    ClarifyOutput, PlanOutput, SessionSnapshot, StructuredOutput, string_items, value_text,
};

/// 실행 결과에 포함되면 저장소 접근 실패로 간주하는 표식.
pub const REPO_ACCESS_FAILED: &str = "REPO_ACCESS: FAILED";

const FINAL_TEXT_FIELDS: [&str; 4] = ["output_text", "completion_text", "output", "response"];

/// 응답 형태(구조화/자유 텍스트/레거시 메시지 목록)와 무관하게 최종 텍스트를 추출한다.
pub fn extract_final_text(raw: &Value) -> String {
    for field in FINAL_TEXT_FIELDS {
        if let Some(text) = raw.get(field).and_then(non_empty_text) {
            return text;
        }
    }

    match last_message(raw) {
        Some(message) => message_text(message),
        None => String::new(),
    }
}

/// 승인/저장에 쓰는 plan 본문. 구조화 출력이 있으면 렌더링 결과를 우선한다.
pub fn extract_plan_text(snapshot: &SessionSnapshot) -> String {
    if let Some(rendered) = snapshot.structured_output.as_ref().and_then(format_structured_output) {
        return rendered.trim().to_string();
    }
    extract_final_text(&snapshot.raw)
}

/// clarify 질문 목록 산출물. 질문 목록이 없으면 최종 텍스트로 대체한다.
pub fn extract_clarifying_questions(snapshot: &SessionSnapshot) -> String {
    let questions = match snapshot.structured_output.as_ref() {
        Some(StructuredOutput::Clarify(clarify)) => Some(clarify.questions.clone()),
        Some(StructuredOutput::Unrecognized(value))
            if value.get("mode").and_then(Value::as_str) == Some("clarify") =>
        {
            value.pointer("/clarify/questions").and_then(string_items)
        }
        _ => None,
    };

    match questions.filter(|q| !q.is_empty()) {
        Some(questions) => questions
            .iter()
            .map(|q| format!("- {q}"))
            .collect::<Vec<_>>()
            .join("\n"),
        None => extract_final_text(&snapshot.raw),
    }
}

/// 콘솔 출력용 본문. 구조화 출력 → 마지막 메시지 → 안내 문구 순으로 고른다.
pub fn render_snapshot(snapshot: &SessionSnapshot) -> String {
    if let Some(rendered) = snapshot.structured_output.as_ref().and_then(format_structured_output) {
        return rendered;
    }

    if let Some(message) = last_message(&snapshot.raw) {
        return format!("\nLatest Devin message:\n\n{}", message_text(message));
    }

    "\nNo output returned.".to_string()
}

/// 구조화 출력을 사람이 읽을 텍스트로 만든다.
pub fn format_structured_output(output: &StructuredOutput) -> Option<String> {
    let mut lines = Vec::new();
    match output {
        StructuredOutput::Plan(plan) => push_plan(&mut lines, plan),
        StructuredOutput::Clarify(clarify) => push_clarify(&mut lines, clarify),
        StructuredOutput::Unrecognized(value) => {
            let object = value.as_object()?;
            push_lenient(&mut lines, object);
        }
    }

    if lines.is_empty() {
        return None;
    }
    Some(format!("\n{}", lines.join("\n")))
}

/// 실행 결과에서 PR URL(`https://.../pull/<n>`)을 찾는다.
pub fn extract_pr_url(text: &str) -> Option<String> {
    text.split_whitespace().find_map(pr_url_in_token)
}

/// `reason:`으로 시작하는 첫 줄에서 PR 실패 사유를 읽는다.
pub fn extract_pr_failure_reason(text: &str) -> String {
    const UNKNOWN: &str = "unknown reason";

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.to_ascii_lowercase().starts_with("reason:") {
            let reason = trimmed["reason:".len()..].trim();
            return if reason.is_empty() {
                UNKNOWN.to_string()
            } else {
                reason.to_string()
            };
        }
    }

    UNKNOWN.to_string()
}

/// 원문 어디에든 표식이 있으면 true. 인용된 diff 안의 표식도 걸러내지 않는다.
pub fn reports_repo_access_failure(text: &str) -> bool {
    text.contains(REPO_ACCESS_FAILED)
}

/// `1.`, `(2)`, `Step 3:` 같은 선행 번호를 제거한다.
pub fn strip_leading_number(step: &str) -> String {
    let original = step.trim();
    let mut rest = original;

    if rest.get(..4).is_some_and(|head| head.eq_ignore_ascii_case("step")) {
        rest = rest[4..].trim_start();
    }
    let rest = rest.strip_prefix('(').unwrap_or(rest);

    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits == 0 {
        return original.to_string();
    }

    let after_digits = &rest[digits..];
    after_digits
        .strip_prefix(')')
        .and_then(after_separator)
        .or_else(|| after_separator(after_digits))
        .map(str::to_string)
        .unwrap_or_else(|| original.to_string())
}

fn after_separator(text: &str) -> Option<&str> {
    let text = text.trim_start();
    let sep = text.chars().next()?;
    matches!(sep, '.' | ')' | ':' | '-').then(|| text[1..].trim())
}

fn push_plan(lines: &mut Vec<String>, plan: &PlanOutput) {
    lines.push("== Plan ==".to_string());
    lines.push(format!("Summary: {}", plan.summary));
    push_list(lines, "Steps", &plan.plan_steps, true);
    push_list(lines, "Risks", &plan.risks, false);
    lines.push(format!("Confidence: {:.2}", plan.confidence));
}

fn push_clarify(lines: &mut Vec<String>, clarify: &ClarifyOutput) {
    lines.push("== Clarifying Questions ==".to_string());
    for (idx, (question, why)) in clarify.questions.iter().zip(&clarify.why_needed).enumerate() {
        lines.push(format!("{}. {}", idx + 1, question));
        lines.push(format!("   why: {why}"));
    }
    lines.push(format!("Confidence: {:.2}", clarify.confidence));
}

fn push_lenient(lines: &mut Vec<String>, object: &Map<String, Value>) {
    let mode = object.get("mode").and_then(Value::as_str);
    let slot = |name: &str| object.get(name).filter(|v| v.is_object());

    if mode == Some("clarify") {
        lines.push("== Clarifying Questions ==".to_string());
        let clarify = slot("clarify");
        let questions = clarify.and_then(|c| c.get("questions")).and_then(string_items);
        let whys = clarify.and_then(|c| c.get("why_needed")).and_then(string_items);
        match (questions, whys) {
            (Some(qs), Some(ws)) if qs.len() == ws.len() => {
                for (idx, (q, w)) in qs.iter().zip(&ws).enumerate() {
                    lines.push(format!("{}. {q}", idx + 1));
                    lines.push(format!("   why: {w}"));
                }
            }
            (Some(qs), _) => push_list(lines, "Questions", &qs, false),
            _ => {}
        }
        push_confidence(lines, clarify);
        return;
    }

    // mode가 plan이거나 없으면 plan 슬롯만 표시용으로 읽는다.
    lines.push("== Plan ==".to_string());
    let plan = slot("plan");
    if let Some(summary) = plan
        .and_then(|p| p.get("summary"))
        .and_then(non_empty_text)
    {
        lines.push(format!("Summary: {summary}"));
    }
    if let Some(steps) = plan.and_then(|p| p.get("plan_steps")).and_then(string_items) {
        push_list(lines, "Steps", &steps, true);
    }
    if let Some(risks) = plan.and_then(|p| p.get("risks")).and_then(string_items) {
        push_list(lines, "Risks", &risks, false);
    }
    push_confidence(lines, plan);
}

fn push_list(lines: &mut Vec<String>, name: &str, items: &[String], strip_numbers: bool) {
    if items.is_empty() {
        return;
    }
    lines.push(format!("{name}:"));
    for (idx, item) in items.iter().enumerate() {
        let text = if strip_numbers {
            strip_leading_number(item)
        } else {
            item.clone()
        };
        lines.push(format!("  {}. {}", idx + 1, text));
    }
}

fn push_confidence(lines: &mut Vec<String>, slot: Option<&Value>) {
    if let Some(confidence) = slot.and_then(|s| s.get("confidence")).and_then(Value::as_f64) {
        lines.push(format!("Confidence: {confidence:.2}"));
    }
}

fn last_message(raw: &Value) -> Option<&Value> {
    raw.get("messages").and_then(Value::as_array)?.last()
}

fn message_text(message: &Value) -> String {
    if message.is_object() {
        for field in ["content", "message"] {
            if let Some(text) = message.get(field).and_then(non_empty_text) {
                return text;
            }
        }
        return serde_json::to_string_pretty(message).unwrap_or_else(|_| message.to_string());
    }
    value_text(message)
}

fn non_empty_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(value_text(other)),
    }
}

fn pr_url_in_token(token: &str) -> Option<String> {
    let start = ["http://", "https://"]
        .iter()
        .filter_map(|scheme| token.find(scheme))
        .min()?;
    let token = &token[start..];
    let host_start = token.find("://")? + 3;

    // 토큰 안에서 마지막 `/pull/<숫자>`까지를 URL로 본다.
    let mut found = None;
    let mut search_from = host_start;
    while let Some(pos) = token[search_from..].find("/pull/") {
        let pull_at = search_from + pos;
        let digits_start = pull_at + "/pull/".len();
        let digits = token[digits_start..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(token.len() - digits_start);
        if digits > 0 && pull_at > host_start {
            found = Some(&token[..digits_start + digits]);
        }
        search_from = digits_start;
    }

    let candidate = found?;
    url::Url::parse(candidate).ok()?;
    Some(candidate.to_string())
}
