//! Hex Empires headless runner.
//!
//! Output (stdout): JSON lines, see the protocol module.
//! Logs (stderr): human-readable.

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use empire_core::replay::{Replay, Verification};
use empire_core::scenario::{ring_galaxy, Scenario};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use empire_headless::{
    emit, run_game, verify_determinism, Event, HeadlessError, RunConfig, Strategy,
};

#[derive(Parser)]
#[command(name = "empire_headless")]
#[command(about = "Headless Hex Empires runner for CI and balance testing")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the scenario comes from.
#[derive(Args)]
struct ScenarioArgs {
    /// Scenario RON file; a generated ring galaxy when absent
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Radius of the generated ring galaxy
    #[arg(long, default_value = "5")]
    ring: u32,

    /// Players in the generated ring galaxy
    #[arg(long, default_value = "2")]
    players: u32,

    /// Maximum cycles to play
    #[arg(short, long, default_value = "200")]
    cycles: u64,

    /// Strategies dealt to players in id order (built-in name or .ron path)
    #[arg(long = "strategy", default_values_t = vec!["balanced".to_string()])]
    strategies: Vec<String>,
}

impl ScenarioArgs {
    fn scenario(&self) -> Result<Scenario, HeadlessError> {
        match &self.scenario {
            Some(path) => Ok(Scenario::load(path)?),
            None => Ok(ring_galaxy(self.ring, self.players)),
        }
    }

    fn config(&self, record: bool) -> Result<RunConfig, HeadlessError> {
        let strategies = self
            .strategies
            .iter()
            .map(|name| Strategy::resolve(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RunConfig {
            cycles: self.cycles,
            strategies,
            record,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Play one game and print every cycle
    Run {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Write a replay of the run here
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Play the same game several times in parallel and compare checksums
    Verify {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Number of parallel runs
        #[arg(short, long, default_value = "4")]
        runs: usize,
    },

    /// Re-run a recorded game and compare every checksum
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Write a generated ring galaxy scenario as RON
    Generate {
        /// Ring radius
        #[arg(long, default_value = "5")]
        ring: u32,

        /// Players
        #[arg(long, default_value = "2")]
        players: u32,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr, stdout is for the protocol
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = match cli.command {
        Commands::Run { scenario, record } => cmd_run(&mut out, &scenario, record),
        Commands::Verify { scenario, runs } => cmd_verify(&mut out, &scenario, runs),
        Commands::Replay { file } => cmd_replay(&mut out, file),
        Commands::Generate {
            ring,
            players,
            output,
        } => cmd_generate(ring, players, output),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            tracing::error!("{err}");
            let _ = emit(
                &mut out,
                &Event::Error {
                    message: err.to_string(),
                },
            );
            std::process::exit(2);
        }
    }
}

/// Play one game.
fn cmd_run(
    out: &mut impl Write,
    args: &ScenarioArgs,
    record: Option<PathBuf>,
) -> Result<bool, HeadlessError> {
    let scenario = args.scenario()?;
    let config = args.config(record.is_some())?;

    let initial = scenario.build()?;
    emit(
        out,
        &Event::Ready {
            version: empire_headless::protocol::PROTOCOL_VERSION.to_string(),
            scenario: scenario.name.clone(),
            players: initial.players.len(),
            planets: initial.planets.len(),
            checksum: empire_core::canonical::checksum(&initial)?.to_string(),
        },
    )?;

    let run = run_game(&scenario, &config, |report| {
        emit(
            &mut *out,
            &Event::Cycle {
                cycle: report.cycle,
                checksum: report.checksum.to_string(),
                rejected: report.rejected.len(),
                notifications: report.notifications.len(),
            },
        )
    })?;

    emit(
        out,
        &Event::GameOver {
            cycle: run.cycles,
            finished: run.finished,
            scores: run.scores.clone(),
        },
    )?;

    if let (Some(path), Some(replay)) = (record, run.replay.as_ref()) {
        replay.save(&path)?;
        tracing::info!(path = %path.display(), cycles = replay.len(), "Replay saved");
    }
    Ok(true)
}

/// Parallel determinism check.
fn cmd_verify(out: &mut impl Write, args: &ScenarioArgs, runs: usize) -> Result<bool, HeadlessError> {
    let scenario = args.scenario()?;
    let config = args.config(false)?;
    let report = verify_determinism(&scenario, &config, runs)?;
    emit(
        out,
        &Event::Verified {
            runs: report.runs,
            cycles: report.cycles,
            deterministic: report.is_deterministic(),
            checksum: report.checksum.as_ref().map(ToString::to_string),
            divergence: report.divergence,
        },
    )?;
    Ok(report.is_deterministic())
}

/// Replay verification.
fn cmd_replay(out: &mut impl Write, file: PathBuf) -> Result<bool, HeadlessError> {
    let replay = Replay::load(&file)?;
    tracing::info!(
        path = %file.display(),
        scenario = %replay.scenario,
        cycles = replay.len(),
        "Verifying replay"
    );
    let event = match replay.verify()? {
        Verification::Match { cycles } => Event::Replay {
            cycles,
            matched: true,
            divergence: None,
            expected: None,
            actual: None,
        },
        Verification::Diverged {
            cycle,
            expected,
            actual,
        } => Event::Replay {
            cycles: replay.len(),
            matched: false,
            divergence: Some(cycle),
            expected: Some(expected.to_string()),
            actual: Some(actual.to_string()),
        },
    };
    let matched = matches!(event, Event::Replay { matched: true, .. });
    emit(out, &event)?;
    Ok(matched)
}

/// Write a generated scenario.
fn cmd_generate(ring: u32, players: u32, output: PathBuf) -> Result<bool, HeadlessError> {
    let text = ring_galaxy(ring, players).to_ron_string()?;
    std::fs::write(&output, text)?;
    tracing::info!(path = %output.display(), "Scenario written");
    Ok(true)
}
