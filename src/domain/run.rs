//! 실행 모드/옵션 값 객체.

use crate::domain::issue::RepoSlug;

/// `--mode`로 선택하는 비대화형 실행 흐름.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Plan,
    Execute,
    ExecutePr,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: RunMode,
    pub repo: RepoSlug,
    pub issue: u64,
    /// 저장된 plan/이슈 스냅샷을 무시하고 새로 계획한다.
    pub fresh: bool,
}
