//! `issuepilot` 바이너리 진입점.

use issuepilot::interface::cli::{AppComposition, Cli, CliAction};

#[tokio::main]
async fn main() {
    // .env가 없어도 정상 동작한다.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let action = match Cli::parse_action() {
        Ok(action) => action,
        Err(err) => {
            eprintln!("error: {}", err.message);
            std::process::exit(err.exit_code);
        }
    };

    let composition = AppComposition::default();

    let result = match action {
        CliAction::InspectConfig => composition
            .inspect_config_usecase()
            .execute()
            .map(|json| println!("{json}")),
        CliAction::Interactive => match composition.plan_runtime() {
            Ok(runtime) => runtime.plan_issue_usecase(&composition).run_interactive().await,
            Err(err) => Err(err),
        },
        CliAction::Run(options) => match composition.plan_runtime() {
            Ok(runtime) => runtime.plan_issue_usecase(&composition).execute(options).await,
            Err(err) => Err(err),
        },
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
