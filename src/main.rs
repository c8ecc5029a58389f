use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reftrack::link::{NatsLink, PhoneLink, PhoneMessage};
use reftrack::phase::{MatchCommand, MatchSnapshot, MatchSummary};
use reftrack::session::{Authorization, LiveMatch, MatchDeps, MatchInfo, SessionConfig};
use reftrack::submit::{HttpSubmitter, SubmissionOutbox};
use reftrack::{create_router, AppState, Config, MatchTimerSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn, Level};

#[derive(Parser)]
#[command(name = "reftrack")]
#[command(about = "Match timer and tracker for football referees")]
struct Args {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/reftrack")]
    config: String,

    /// 10 second halves and pause
    #[arg(long)]
    quick: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Officiate one match from the terminal
    Run {
        #[arg(long)]
        match_id: String,

        #[arg(long)]
        home: String,

        #[arg(long)]
        away: String,

        /// Signed-in referee
        #[arg(short, long)]
        user: String,
    },
    /// Serve the control API
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    if args.quick {
        cfg.timing = MatchTimerSettings::quick();
    }

    info!("RefTrack v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Halves {}s/{}s, pause {}s ({:?})",
        cfg.timing.first_half_secs,
        cfg.timing.second_half_secs,
        cfg.timing.half_time_pause_secs,
        cfg.timing.pause_expiry
    );

    match args.command {
        Command::Run {
            match_id,
            home,
            away,
            user,
        } => run_match(cfg, MatchInfo::new(match_id, home, away), user).await,
        Command::Serve => serve(cfg).await,
    }
}

async fn connect_link(cfg: &Config, user_id: &str) -> Option<Arc<NatsLink>> {
    let url = cfg.link.nats_url.as_deref()?;
    match NatsLink::connect(url, user_id.to_string()).await {
        Ok(link) => Some(Arc::new(link)),
        Err(e) => {
            warn!("Phone link unavailable: {:#}", e);
            None
        }
    }
}

async fn run_match(cfg: Config, info: MatchInfo, user: String) -> Result<()> {
    let link = connect_link(&cfg, &user)
        .await
        .map(|link| link as Arc<dyn PhoneLink>);

    let deps = MatchDeps::from_config(&cfg, link);
    let live = LiveMatch::start(
        SessionConfig::from_config(&cfg),
        info,
        &Authorization::signed_in(user.clone()),
        deps,
    )
    .await?;

    info!("Commands: end, skip, yes, no, go, goal|yellow|red home|away (prefix - to undo)");

    let printer = tokio::spawn(print_snapshots(live.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let summary = loop {
        tokio::select! {
            summary = live.wait_for_summary() => break summary,
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match line.parse::<MatchCommand>() {
                    Ok(command) => live.send(command).await?,
                    Err(e) => warn!("{:#}", e),
                },
                None => {
                    info!("Input closed, leaving the match");
                    live.dismiss().await;
                    break None;
                }
            },
        }
    };
    printer.abort();

    let Some(summary) = summary else {
        return Ok(());
    };
    print_summary(&summary);

    let submitter = HttpSubmitter::new(&cfg.submission, &user)?;
    let mut outbox = SubmissionOutbox::new(summary);
    if let Err(e) = outbox
        .submit_with_retry(&submitter, cfg.submission.max_attempts, Duration::from_secs(2))
        .await
    {
        error!("Result not submitted: {:#}", e);
        println!("{}", serde_json::to_string_pretty(outbox.summary())?);
    }

    Ok(())
}

async fn print_snapshots(mut snapshots: tokio::sync::watch::Receiver<MatchSnapshot>) {
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();

        let mut line = format!("[{}] {}", snapshot.half_label, snapshot.main_clock);
        if let Some(overtime) = &snapshot.overtime_clock {
            line.push_str(&format!(" {}", overtime));
        }
        if let Some(remaining) = &snapshot.pause_remaining {
            line.push_str(&format!(" pause {}", remaining));
        }
        if snapshot.ready_for_second_half {
            line.push_str(" ready for second half");
        }
        line.push_str(&format!(
            " | {} {}:{} {} | {:.0}m",
            snapshot.home_team,
            snapshot.tally.goals.home,
            snapshot.tally.goals.away,
            snapshot.away_team,
            snapshot.total_distance_meters
        ));
        if let Some(prompt) = &snapshot.prompt {
            line.push_str(&format!(" | {} (yes/no)", prompt));
        }

        println!("{}", line);
    }
}

fn print_summary(summary: &MatchSummary) {
    println!();
    println!("{} {}:{} {}", summary.home_team, summary.home_score, summary.away_score, summary.away_team);
    println!("1st half  {}", summary.first_half_display());
    println!("2nd half  {}", summary.second_half_display());
    println!("Distance  {}", summary.distance_display());
    println!(
        "Cards     yellow {}/{}  red {}/{}",
        summary.yellow_cards.home,
        summary.yellow_cards.away,
        summary.red_cards.home,
        summary.red_cards.away
    );
}

async fn serve(cfg: Config) -> Result<()> {
    let cfg = Arc::new(cfg);
    let addr = format!("{}:{}", cfg.http.bind, cfg.http.port);

    // The phone link needs a user; the API runs on behalf of one referee
    let link_user = std::env::var("REFTRACK_USER").ok();
    let link = match &link_user {
        Some(user) => connect_link(&cfg, user).await,
        None => None,
    };

    let state = AppState::from_config(
        Arc::clone(&cfg),
        link.clone().map(|link| link as Arc<dyn PhoneLink>),
    );

    if let (Some(link), Some(user)) = (link, link_user) {
        let phone_rx = link.subscribe().await?;
        tokio::spawn(listen_to_phone(state.clone(), phone_rx, user));
    }

    let app = create_router(state);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Start matches the phone asks for, as whoever the phone says is signed in.
async fn listen_to_phone(state: AppState, mut phone_rx: mpsc::Receiver<PhoneMessage>, user: String) {
    let mut auth = Authorization::signed_in(user);

    while let Some(message) = phone_rx.recv().await {
        match message {
            PhoneMessage::SignedIn { user_id } => {
                info!("Phone signed in as {}", user_id);
                auth = Authorization::signed_in(user_id);
            }
            PhoneMessage::SignedOut => {
                info!("Phone signed out");
                auth = Authorization::default();
            }
            PhoneMessage::StartMatch {
                match_id,
                home_team,
                away_team,
            } => {
                let info = MatchInfo::new(match_id, home_team, away_team);
                if let Err(e) = state.start_match(info, &auth).await {
                    warn!("Phone start refused: {:#}", e);
                }
            }
        }
    }

    info!("Phone link closed");
}
