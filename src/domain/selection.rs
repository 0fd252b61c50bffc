//! 토론 코멘트 관련도 점수화와 프롬프트용 본문 정리 규칙.

use std::cmp::Ordering;

use crate::domain::issue::CommentRecord;

pub const DEFAULT_MAX_COMMENTS: usize = 3;

const REPRO_KEYWORDS: [&str; 16] = [
    "repro",
    "reproduce",
    "steps",
    "example",
    "curl",
    "snippet",
    "traceback",
    "stack trace",
    "error",
    "failing",
    "regression",
    "bisect",
    "workaround",
    "patch",
    "fix",
    "pr",
];

const CODE_FENCE: &str = "```";
const BODY_LIMIT: usize = 800;
const BODY_LIMIT_WITH_CODE: usize = 2000;

/// 점수가 매겨진 코멘트. 원본에서 언제든 다시 계산할 수 있는 값이다.
#[derive(Debug, Clone)]
pub struct ScoredComment {
    pub score: u32,
    pub comment: CommentRecord,
}

/// 자동화 계정(bot)이 작성한 코멘트인지 판별한다.
pub fn is_automation_author(comment: &CommentRecord) -> bool {
    comment.is_bot || comment.author_login.to_lowercase().contains("bot")
}

/// 코멘트 하나의 관련도 점수를 계산한다.
pub fn score_comment(comment: &CommentRecord) -> u32 {
    let body = comment.body.as_str();
    let body_lower = body.to_lowercase();
    let mut score = 0;

    if comment.author_association.is_maintainer() {
        score += 5;
    }
    if REPRO_KEYWORDS.iter().any(|k| body_lower.contains(k)) {
        score += 3;
    }
    if body.contains(CODE_FENCE)
        || body_lower.contains("traceback")
        || body_lower.contains("exception")
    {
        score += 2;
    }
    let len = body.chars().count();
    if 40 < len && len < 4000 {
        score += 1;
    }

    score
}

/// bot을 제외한 코멘트를 점수화하고 (점수 desc, 작성시각 desc) 순으로 정렬한다.
pub fn rank_comments(comments: &[CommentRecord]) -> Vec<ScoredComment> {
    let mut scored: Vec<ScoredComment> = comments
        .iter()
        .filter(|c| !is_automation_author(c))
        .map(|c| ScoredComment {
            score: score_comment(c),
            comment: c.clone(),
        })
        .collect();

    scored.sort_by(compare_ranked);
    scored
}

/// 에이전트에 넘길 코멘트를 최대 `max_count`개 고른다.
pub fn select_relevant_comments(comments: &[CommentRecord], max_count: usize) -> Vec<CommentRecord> {
    rank_comments(comments)
        .into_iter()
        .take(max_count)
        .map(|s| s.comment)
        .collect()
}

fn compare_ranked(a: &ScoredComment, b: &ScoredComment) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.comment.created_at.cmp(&a.comment.created_at))
}

/// 줄 끝 공백을 지우고 3줄 이상 연속 빈 줄을 한 줄로 줄인다.
pub fn normalize_comment_body(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newline_run = 0usize;

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if idx > 0 {
            newline_run += 1;
        }
        if line.is_empty() {
            continue;
        }
        // 연속 개행은 최대 2개(빈 줄 하나)까지만 남긴다.
        for _ in 0..newline_run.min(2) {
            out.push('\n');
        }
        newline_run = 0;
        out.push_str(line);
    }

    out.trim().to_string()
}

/// 본문 길이를 제한한다. 코드 블록/Traceback이 있으면 더 길게 허용한다.
pub fn truncate_comment_body(text: &str) -> String {
    let max_len = if text.contains(CODE_FENCE) || text.contains("Traceback") {
        BODY_LIMIT_WITH_CODE
    } else {
        BODY_LIMIT
    };

    if text.chars().count() <= max_len {
        return text.to_string();
    }

    let mut out: String = text.chars().take(max_len - 3).collect();
    out.push_str("...");
    out
}
