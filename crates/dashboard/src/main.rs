//! Credit Scoring Dashboard - Main Entry Point

use dashboard::command::HELP;
use dashboard::render;
use dashboard::{
    Command, Dashboard, DashboardConfig, DashboardError, HttpScoringApi, PredictionOutcome, MODIFIABLE_VARS,
    VARIABLES_TO_PLOT,
};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = DashboardConfig::load()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("=== Credit Scoring Dashboard v{} ===", env!("CARGO_PKG_VERSION"));

    let mut dashboard = Dashboard::from_config(&config)?;
    println!("Credit scoring dashboard. Service: {}", config.base_url);
    println!("Selected client {}. Type `help` for commands.", config.default_client_id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Command::parse(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => {
                if let Err(e) = execute(&mut dashboard, command).await {
                    println!("Error: {}", e);
                }
            }
            Err(e) => println!("{}", e),
        }
    }

    info!("Dashboard closed");
    Ok(())
}

async fn execute(dashboard: &mut Dashboard<HttpScoringApi>, command: Command) -> Result<(), DashboardError> {
    match command {
        Command::Load(client_id) => {
            let record = dashboard.load_client(client_id).await?;
            println!("{}", render::render_profile(client_id, record));
        }
        Command::Select(client_id) => {
            dashboard.select(client_id);
            println!("Selected client {}", client_id);
        }
        Command::Show => {
            let (client_id, record) = dashboard.session().loaded().ok_or(DashboardError::NoClientLoaded)?;
            println!("{}", render::render_profile(client_id, record));
        }
        Command::Compare(variable) => {
            let comparison = dashboard.compare(&variable).await?;
            println!("{}", render::render_comparison(&comparison));
        }
        Command::Vars => {
            println!("Comparison variables: {}", VARIABLES_TO_PLOT.join(", "));
            println!("Modifiable variables: {}", MODIFIABLE_VARS.join(", "));
        }
        Command::Predict => {
            let outcome = dashboard.predict().await?;
            let origin = match outcome {
                PredictionOutcome::Fresh(_) => "",
                PredictionOutcome::Cached(_) => " [cached]",
            };
            println!("{}{}", render::render_prediction(outcome.result()), origin);
        }
        Command::Simulate(edits) => match dashboard.simulate(&edits).await? {
            Some(result) => println!("Simulation: {}", render::render_prediction(&result)),
            None => println!("No variable changed, nothing to simulate"),
        },
        Command::Explain => {
            let features = dashboard.explain()?;
            let client_id = dashboard.session().selected().ok_or(DashboardError::NoClientLoaded)?;
            println!("{}", render::render_importances(client_id, &features));
        }
        Command::Raw => {
            let (_, record) = dashboard.session().loaded().ok_or(DashboardError::NoClientLoaded)?;
            println!("{}", render::render_raw(record)?);
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}
