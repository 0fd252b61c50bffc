//! 적용 설정 진단(inspection) 뷰 모델.

use serde::Serialize;

use super::loader::LoadedConfig;
use super::resolve::{CredentialResolution, resolve_agent_key, resolve_github_token};
use crate::application::config::DefaultsConfig;

#[derive(Debug, Clone, Serialize)]
pub struct ConfigInspection {
    pub searched_paths: Vec<String>,
    pub loaded_paths: Vec<String>,
    pub defaults: DefaultsConfig,
    pub effective: EffectiveSettings,
    pub agent_key: CredentialInspection,
    pub github_token: CredentialInspection,
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveSettings {
    pub workspace_dir: String,
    pub max_comments: usize,
    pub issue_limit: usize,
    pub plan_max_wait_secs: u64,
    pub execute_max_wait_secs: u64,
    pub pr_max_wait_secs: u64,
    pub agent_api_base: String,
    pub agent_ui_base: String,
    pub agent_request_timeout_secs: u64,
    pub github_api_base: String,
}

/// 자격 증명의 출처와 해석 여부. 값은 담지 않는다.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialInspection {
    pub source: Option<String>,
    pub resolved: bool,
}

impl From<CredentialResolution> for CredentialInspection {
    fn from(resolution: CredentialResolution) -> Self {
        Self {
            resolved: resolution.value.is_some(),
            source: resolution.source,
        }
    }
}

impl ConfigInspection {
    pub(crate) fn from_loaded(loaded: LoadedConfig) -> Self {
        let config = &loaded.config;
        Self {
            searched_paths: loaded
                .searched_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            loaded_paths: loaded
                .loaded_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            defaults: config.defaults.clone(),
            effective: EffectiveSettings {
                workspace_dir: config.workspace_dir().display().to_string(),
                max_comments: config.max_comments(),
                issue_limit: config.issue_limit(),
                plan_max_wait_secs: config.plan_max_wait().as_secs(),
                execute_max_wait_secs: config.execute_max_wait().as_secs(),
                pr_max_wait_secs: config.pr_max_wait().as_secs(),
                agent_api_base: config.agent.api_base(),
                agent_ui_base: config.agent.ui_base(),
                agent_request_timeout_secs: config.agent.request_timeout().as_secs(),
                github_api_base: config.github.api_base(),
            },
            agent_key: resolve_agent_key(&config.agent).into(),
            github_token: resolve_github_token(&config.github).into(),
        }
    }
}
