//! 병합된 설정과 자격 증명 출처를 확인하는 유스케이스.

use anyhow::{Context, Result};

use crate::application::ports::ConfigRepository;

/// `issuepilot config` 출력 본문을 만든다. 자격 증명 값 자체는 포함하지 않는다.
pub struct InspectConfigUseCase<'a> {
    pub config_repo: &'a dyn ConfigRepository,
}

impl InspectConfigUseCase<'_> {
    pub fn execute(&self) -> Result<String> {
        self.config_repo
            .inspect_pretty_json()
            .context("failed to inspect issuepilot config")
    }
}
