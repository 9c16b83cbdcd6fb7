//! Rinkside - Entry Point
//!
//! Runs one replay session from the command line and prints the event
//! stream: per-window traffic lights, alerts as they fire, and the
//! post-game summary.

use clap::Parser;
use tokio::runtime::Runtime;
use uuid::Uuid;

use rinkside::core::config::MonitorConfig;
use rinkside::core::error::Result;
use rinkside::core::types::{DayOfWeek, Game, GameId};
use rinkside::forecast::profiles::derive_archetype;
use rinkside::forecast::provider::BaselineForecastProvider;
use rinkside::scenario::{self, Override, OverrideKind, Scenario};
use rinkside::session::events::SessionEvent;
use rinkside::session::orchestrator::{Orchestrator, SessionOptions};
use rinkside::traffic;

/// Replay a game and watch demand drift against the forecast
#[derive(Parser, Debug)]
#[command(name = "rinkside")]
#[command(about = "Concession demand drift monitor: replay a game against its forecast")]
struct Args {
    /// Scenario key (see --list-scenarios)
    #[arg(long, default_value = "normal")]
    scenario: String,

    /// Replay speed multiplier (1 = real time)
    #[arg(long, default_value_t = 60.0)]
    speed: f64,

    /// Disable the remote reasoning capability (rule-based alerts only)
    #[arg(long)]
    skip_ai: bool,

    /// List available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Expected attendance
    #[arg(long, default_value_t = 4200)]
    attendance: u32,

    /// Opponent name
    #[arg(long, default_value = "Kamloops")]
    opponent: String,

    /// Treat as a playoff game
    #[arg(long)]
    playoff: bool,

    /// Mean game-day temperature in Celsius
    #[arg(long, default_value_t = 8.0)]
    temp: f32,

    /// Fixed seed for reproducible replays
    #[arg(long)]
    seed: Option<u64>,

    /// Inject a demand spike mid-run: STAND:FACTOR:WINDOW
    #[arg(long)]
    spike: Option<String>,

    /// Inject a global volume shift mid-run: FACTOR:WINDOW
    #[arg(long)]
    volume: Option<String>,

    /// Print raw JSON events instead of formatted lines
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rinkside=info".into()),
        )
        .init();

    let args = Args::parse();

    if args.list_scenarios {
        for info in scenario::catalog() {
            println!("{:<22} {}", info.key, info.description);
        }
        return Ok(());
    }

    let rt = Runtime::new()?;
    rt.block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    let scenario = Scenario::from_key(&args.scenario)?;

    let game_id = match args.seed {
        Some(seed) => GameId(Uuid::from_u64_pair(seed, seed)),
        None => GameId::new(),
    };
    let game = Game {
        id: game_id,
        opponent: args.opponent.clone(),
        date: "2026-01-16".into(),
        day_of_week: DayOfWeek::Fri,
        puck_drop_hour: 19,
        attendance: args.attendance,
        archetype: derive_archetype(args.attendance, 19, args.playoff, args.temp, DayOfWeek::Fri),
        is_playoff: args.playoff,
        temp_mean_c: args.temp,
        outcome: None,
    };

    let orchestrator = Orchestrator::new(MonitorConfig::default(), BaselineForecastProvider::new())?;
    let mut handle = orchestrator.start(
        game,
        SessionOptions {
            scenario,
            speed: args.speed,
            skip_ai: args.skip_ai,
            ..Default::default()
        },
    )?;

    // Queue any demo injections up front; they activate at their window.
    if let Some(spec) = &args.spike {
        handle.inject(parse_spike(spec)?)?;
    }
    if let Some(spec) = &args.volume {
        handle.inject(parse_volume(spec)?)?;
    }

    while let Some(event) = handle.next_event().await {
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }
        print_event(&event);
        if event.is_terminal() {
            break;
        }
    }
    handle.join().await;
    Ok(())
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::SessionStarted { game, baseline, .. } => {
            println!(
                "=== vs {} | {} expected | {} crowd | scenario: {} ===",
                game.opponent,
                game.attendance,
                game.archetype.as_str(),
                baseline.scenario
            );
            println!(
                "Forecast: {:.0} units across {} stands, peak at {} | {} prep actions",
                baseline.total_forecast_qty,
                baseline.stand_totals.len(),
                baseline.peak_window.label,
                baseline.prep_action_count
            );
        }
        SessionEvent::WindowUpdate {
            window,
            venue,
            stand_statuses,
            alert,
            ..
        } => {
            println!("{}", traffic::summary_line(&window.label, venue));
            for status in stand_statuses {
                println!(
                    "  [{}] {:<16} {:+6.0}% | F:{:>4} A:{:>4} | {:?}",
                    status.status.label(),
                    status.stand,
                    status.drift_pct * 100.0,
                    status.forecast_qty,
                    status.actual_qty,
                    status.trend
                );
            }
            if let Some(alert) = alert {
                println!(
                    "  !! ALERT {} ({:?}, {:.0}%): {}",
                    alert.stand,
                    alert.cause,
                    alert.confidence * 100.0,
                    alert.alert_text
                );
                for action in &alert.actions {
                    match &action.item {
                        Some(item) => println!(
                            "     -> {:?} {} {} ({:+}%)",
                            action.action, action.stand, item, action.quantity_change_pct
                        ),
                        None => println!(
                            "     -> {:?} {} ({:+}%)",
                            action.action, action.stand, action.quantity_change_pct
                        ),
                    }
                }
            }
        }
        SessionEvent::OverrideApplied {
            applied,
            applied_at_window,
        } => {
            println!("  >> override live at window {}: {}", applied_at_window, applied);
        }
        SessionEvent::SessionError { component, message } => {
            println!("SESSION ERROR in {}: {}", component, message);
        }
        SessionEvent::SessionComplete { summary, alerts } => {
            println!(
                "=== complete: {}/{} windows | cumulative {:+.1}% | {} alerts ({} warning, {} critical signals){} ===",
                summary.drift.windows_processed,
                summary.drift.total_windows,
                summary.drift.cumulative_drift * 100.0,
                alerts.len(),
                summary.drift.warning_signals,
                summary.drift.critical_signals,
                if summary.stopped_early { " | stopped early" } else { "" }
            );
            if let Some(report) = &summary.post_game_report {
                println!("{}", report);
            }
        }
    }
}

/// Parse "STAND:FACTOR:WINDOW" into a demand-spike override.
fn parse_spike(spec: &str) -> Result<Override> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 3 {
        return Err(rinkside::core::error::RinksideError::InvalidScenario(
            format!("--spike expects STAND:FACTOR:WINDOW, got {}", spec),
        ));
    }
    let factor: f64 = parts[1].parse().map_err(|_| {
        rinkside::core::error::RinksideError::InvalidScenario(format!(
            "bad spike factor: {}",
            parts[1]
        ))
    })?;
    let from_window: usize = parts[2].parse().map_err(|_| {
        rinkside::core::error::RinksideError::InvalidScenario(format!(
            "bad spike window: {}",
            parts[2]
        ))
    })?;
    Ok(Override {
        kind: OverrideKind::DemandSpike {
            stand: parts[0].to_string(),
            factor,
        },
        from_window,
        to_window: None,
    })
}

/// Parse "FACTOR:WINDOW" into a global-volume override.
fn parse_volume(spec: &str) -> Result<Override> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 2 {
        return Err(rinkside::core::error::RinksideError::InvalidScenario(
            format!("--volume expects FACTOR:WINDOW, got {}", spec),
        ));
    }
    let factor: f64 = parts[0].parse().map_err(|_| {
        rinkside::core::error::RinksideError::InvalidScenario(format!(
            "bad volume factor: {}",
            parts[0]
        ))
    })?;
    let from_window: usize = parts[1].parse().map_err(|_| {
        rinkside::core::error::RinksideError::InvalidScenario(format!(
            "bad volume window: {}",
            parts[1]
        ))
    })?;
    Ok(Override {
        kind: OverrideKind::GlobalVolume { factor },
        from_window,
        to_window: None,
    })
}
