use std::path::Path;
use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use ticket_watcher::notify::{
    DingTalkConfig, DingTalkNotifier, NoopNotifier, Notify, ReportScheduler,
};
use ticket_watcher::page::{BoardConfig, BoardQuery, QueryClient};
use ticket_watcher::watch::{Outcome, RunParams, WatchPlan, Watcher};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: ticket-watcher <params.toml>");
        eprintln!();
        eprintln!("Environment:");
        eprintln!("  TICKET_SESSION    session cookie for the booking site (required)");
        eprintln!("  DINGTALK_TOKEN    DingTalk robot access token (optional)");
        eprintln!("  DINGTALK_SECRET   DingTalk robot signing secret (optional)");
        return ExitCode::from(2);
    };

    // Configuration problems are fatal before any polling starts.
    let params = match RunParams::load(Path::new(&path)) {
        Ok(params) => params,
        Err(err) => {
            error!(error = %err, "failed to load run parameters");
            return ExitCode::from(2);
        }
    };
    let plan = match params.validate() {
        Ok(plan) => plan,
        Err(err) => {
            error!(error = %err, "invalid run parameters");
            return ExitCode::from(2);
        }
    };

    // The session is established out of band (log in, export the
    // cookie); this process only borrows it for the run.
    let Ok(session_cookie) = std::env::var("TICKET_SESSION") else {
        error!("TICKET_SESSION is not set; log in first and export the session cookie");
        return ExitCode::from(2);
    };

    let query = BoardQuery {
        travel_date: plan.travel_date,
        from: plan.from,
        to: plan.to,
        fare: plan.fare,
    };
    let client = match QueryClient::new(BoardConfig::new(session_cookie), query) {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "failed to build query client");
            return ExitCode::from(2);
        }
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping after the current attempt");
                cancel.cancel();
            }
        });
    }

    let outcome = match DingTalkConfig::from_env() {
        Some(config) => match DingTalkNotifier::new(config) {
            Ok(notifier) => watch(&client, &plan, notifier, cancel).await,
            Err(err) => {
                error!(error = %err, "failed to build DingTalk notifier");
                return ExitCode::from(2);
            }
        },
        None => {
            info!("DINGTALK_TOKEN not set, notifications disabled");
            watch(&client, &plan, NoopNotifier, cancel).await
        }
    };

    match outcome {
        Outcome::Booked(_) => ExitCode::SUCCESS,
        Outcome::Exhausted { .. } | Outcome::Aborted(_) => ExitCode::FAILURE,
    }
}

async fn watch<N: Notify>(
    client: &QueryClient,
    plan: &WatchPlan,
    notifier: N,
    cancel: CancellationToken,
) -> Outcome {
    let scheduler = ReportScheduler::new(notifier);
    Watcher::new(client, client, scheduler, plan, cancel)
        .run()
        .await
}
