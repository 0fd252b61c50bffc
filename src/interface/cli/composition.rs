//! 애플리케이션 조립(composition root) 모듈.

use anyhow::{Context, Result};

use crate::application::config::Config;
use crate::application::ports::ConfigRepository;
use crate::application::usecases::inspect_config::InspectConfigUseCase;
use crate::application::usecases::plan_issue::PlanIssueUseCase;
use crate::infrastructure::adapters::{ConsoleReporter, JsonConfigRepository, StdinPrompter};
use crate::infrastructure::config::{agent_settings, resolve_github_token};
use crate::infrastructure::devin::DevinClient;
use crate::infrastructure::github::GitHubClient;
use crate::infrastructure::workspace::FileWorkspaceStore;

/// 실행 시점 의존성을 한 곳에서 조립하는 컨테이너.
pub struct AppComposition {
    config_repo: JsonConfigRepository,
    reporter: ConsoleReporter,
    prompter: StdinPrompter,
}

impl Default for AppComposition {
    fn default() -> Self {
        Self {
            config_repo: JsonConfigRepository,
            reporter: ConsoleReporter::new(),
            prompter: StdinPrompter,
        }
    }
}

impl AppComposition {
    /// 설정 점검 유스케이스를 생성한다. 자격 증명은 요구하지 않는다.
    pub fn inspect_config_usecase(&self) -> InspectConfigUseCase<'_> {
        InspectConfigUseCase {
            config_repo: &self.config_repo,
        }
    }

    /// 설정을 읽고 외부 클라이언트를 만든다. 에이전트 키가 없으면 여기서 실패한다.
    pub fn plan_runtime(&self) -> Result<PlanRuntime> {
        let config = self
            .config_repo
            .load()
            .context("failed to load issuepilot config")?;

        let agent = DevinClient::new(agent_settings(&config)?)?;
        let tracker = GitHubClient::new(
            config.github.api_base(),
            resolve_github_token(&config.github).value,
        )?;
        let workspace = FileWorkspaceStore::new(config.workspace_dir());

        Ok(PlanRuntime {
            config,
            tracker,
            agent,
            workspace,
        })
    }
}

/// 이슈 계획/실행 흐름에 필요한 설정과 클라이언트 묶음.
pub struct PlanRuntime {
    config: Config,
    tracker: GitHubClient,
    agent: DevinClient,
    workspace: FileWorkspaceStore,
}

impl PlanRuntime {
    /// 이슈 계획/실행 유스케이스를 생성한다.
    pub fn plan_issue_usecase<'a>(&'a self, app: &'a AppComposition) -> PlanIssueUseCase<'a> {
        PlanIssueUseCase {
            config: &self.config,
            tracker: &self.tracker,
            agent: &self.agent,
            workspace: &self.workspace,
            prompter: &app.prompter,
            reporter: &app.reporter,
        }
    }
}
