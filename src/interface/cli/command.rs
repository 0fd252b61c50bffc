//! CLI 명령 파싱 모듈.

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::issue::RepoSlug;
use crate::domain::run::{RunMode, RunOptions};

#[derive(Debug, Parser)]
#[command(name = "issuepilot")]
#[command(about = "Plan, revise and execute GitHub issues with a Devin session")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Repository in owner/name form
    #[arg(long)]
    repo: Option<String>,

    /// Issue number
    #[arg(long)]
    issue: Option<u64>,

    /// Run one flow non-interactively
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Ignore the saved issue snapshot and plan
    #[arg(long)]
    fresh: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show effective merged config and credential sources
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Plan,
    Execute,
    ExecutePr,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Plan => Self::Plan,
            ModeArg::Execute => Self::Execute,
            ModeArg::ExecutePr => Self::ExecutePr,
        }
    }
}

pub enum CliAction {
    Interactive,
    InspectConfig,
    Run(RunOptions),
}

/// 인자 조합 오류. `exit_code`로 종료 코드를 구분한다.
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: i32,
}

impl Cli {
    pub fn parse_action() -> Result<CliAction, CliError> {
        Cli::parse().into_action()
    }

    fn into_action(self) -> Result<CliAction, CliError> {
        if let Some(Commands::Config) = self.command {
            return Ok(CliAction::InspectConfig);
        }

        let Some(mode) = self.mode else {
            return Ok(CliAction::Interactive);
        };

        let (Some(repo), Some(issue)) = (self.repo, self.issue) else {
            return Err(CliError {
                message: "Both --repo and --issue are required when --mode is set.".to_string(),
                exit_code: 1,
            });
        };

        let repo = RepoSlug::parse(&repo).map_err(|err| CliError {
            message: format!("{err:#}"),
            exit_code: 2,
        })?;

        Ok(CliAction::Run(RunOptions {
            mode: mode.into(),
            repo,
            issue,
            fresh: self.fresh,
        }))
    }
}
