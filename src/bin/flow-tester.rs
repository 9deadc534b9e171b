//! Flow Tester CLI Tool
//!
//! Command-line tool for driving full lifecycle scenarios against the
//! in-memory service: seed profiles, propose a match, answer the ready
//! check, report a winner, and print the resulting state.
//!
//! Usage:
//!   cargo run --bin flow-tester -- --help
//!   cargo run --bin flow-tester run-scenario --scenario accept-all
//!   cargo run --bin flow-tester run-scenario --scenario one-decline --team-size 2
//!   cargo run --bin flow-tester run-scenario --scenario timeout

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use ready_room::config::AppConfig;
use ready_room::ladder::{Division, Tier};
use ready_room::service::AppState;
use ready_room::types::{ChangeEvent, ChangeKind, PlayerProfile};
use ready_room::utils::current_timestamp;
use serde_json::json;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "flow-tester")]
#[command(about = "Lifecycle scenario driver for the ready-room service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a predefined lifecycle scenario
    RunScenario {
        /// Scenario name (accept-all, one-decline, timeout)
        #[arg(short, long)]
        scenario: String,
        /// Players per team
        #[arg(short, long, default_value = "2")]
        team_size: usize,
    },
    /// Run all scenarios back to back
    RunAllScenarios {
        /// Players per team
        #[arg(short, long, default_value = "2")]
        team_size: usize,
    },
}

fn seed_profile(index: usize) -> PlayerProfile {
    PlayerProfile {
        player_id: format!("player-{}", index),
        name: format!("Player {}", index),
        tag: format!("#P{}", index),
        tier: Tier::Ouro,
        division: Division::III,
        xp: 80,
        wins: 0,
        losses: 0,
        mvp_awards: 0,
        primary_role: Some(["Top", "Jungle", "Mid", "Adc", "Sup"][index % 5].to_string()),
        chat_user_id: Some(format!("chat-{}", index)),
        notify_ready_check: true,
        notify_result: true,
        cooldown_until: None,
    }
}

struct FlowTester {
    state: AppState,
}

impl FlowTester {
    async fn new(accept_timeout_seconds: u64) -> Result<Self> {
        let mut config = AppConfig::default();
        config.ready_check.accept_timeout_seconds = accept_timeout_seconds;
        let state = AppState::new(config).await?;
        state.start().await?;
        Ok(Self { state })
    }

    /// Seed profiles and propose one match via the change feed.
    async fn propose_match(&self, match_id: &str, team_size: usize) -> Result<Vec<String>> {
        let profiles = self.state.profile_store();
        let mut ids = Vec::new();
        for index in 0..team_size * 2 {
            let profile = seed_profile(index);
            ids.push(profile.player_id.clone());
            profiles.put(profile)?;
        }

        let team = |range: std::ops::Range<usize>| -> Vec<serde_json::Value> {
            range
                .map(|i| {
                    json!({
                        "player_id": format!("player-{}", i),
                        "name": format!("Player {}", i),
                        "role": (["Top", "Jungle", "Mid", "Adc", "Sup"][i % 5]),
                    })
                })
                .collect()
        };

        let doc = json!({
            "status": "readyCheck",
            "teams": [
                {"name": "Time 1", "players": team(0..team_size)},
                {"name": "Time 2", "players": team(team_size..team_size * 2)},
            ],
            "created_at": current_timestamp().to_rfc3339(),
        });

        self.state
            .pending_feed()
            .send(ChangeEvent {
                doc_id: match_id.to_string(),
                kind: ChangeKind::Added,
                data: Some(doc),
            })
            .map_err(|_| anyhow!("feed channel closed"))?;

        // Let the listener adopt and announce the document.
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(ids)
    }

    async fn report_winner(&self, match_id: &str, winner: &str, mvp: &str) -> Result<()> {
        let history = self.state.history_store();
        if !history.set_winner(match_id, winner, [Some(mvp.to_string()), None])? {
            return Err(anyhow!("winner already set for {}", match_id));
        }
        let record = history
            .get(match_id)?
            .ok_or_else(|| anyhow!("history record {} missing", match_id))?;

        self.state
            .history_feed()
            .send(ChangeEvent {
                doc_id: match_id.to_string(),
                kind: ChangeKind::Modified,
                data: Some(serde_json::to_value(&record)?),
            })
            .map_err(|_| anyhow!("feed channel closed"))?;

        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }

    fn print_state(&self, match_id: &str, participants: &[String]) -> Result<()> {
        if let Some(doc) = self.state.pending_store().get(match_id)? {
            println!("  Match {}: {}", match_id, doc.status);
        }
        if let Some(record) = self.state.history_store().get(match_id)? {
            println!("  History winner: {}", record.winner);
        }
        let waiting = self.state.queue_store().list_ordered(Some(10))?;
        println!(
            "  Queue ({} waiting): {}",
            self.state.queue_store().len()?,
            waiting
                .iter()
                .map(|e| e.player_id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        for player_id in participants {
            if let Some(profile) = self.state.profile_store().get(player_id)? {
                println!(
                    "  {}: {} {} ({} XP) {}W/{}L mvp={}",
                    profile.player_id,
                    profile.tier,
                    profile.division,
                    profile.xp,
                    profile.wins,
                    profile.losses,
                    profile.mvp_awards
                );
            }
        }
        Ok(())
    }

    async fn run_accept_all(&self, team_size: usize) -> Result<()> {
        println!("▶ Scenario: accept-all");
        let match_id = "flow-accept-all";
        let participants = self.propose_match(match_id, team_size).await?;

        let machine = self.state.machine();
        for player_id in &participants {
            machine.accept(match_id, player_id).await?;
        }

        self.report_winner(match_id, "Time 1", "Player 0").await?;
        self.print_state(match_id, &participants)?;
        Ok(())
    }

    async fn run_one_decline(&self, team_size: usize) -> Result<()> {
        println!("▶ Scenario: one-decline");
        let match_id = "flow-one-decline";
        let participants = self.propose_match(match_id, team_size).await?;

        let machine = self.state.machine();
        for player_id in participants.iter().skip(1) {
            machine.accept(match_id, player_id).await?;
        }
        machine.decline(match_id, &participants[0]).await?;

        self.print_state(match_id, &participants)?;
        Ok(())
    }

    async fn run_timeout(&self, team_size: usize) -> Result<()> {
        println!("▶ Scenario: timeout (1s window)");
        let match_id = "flow-timeout";
        let participants = self.propose_match(match_id, team_size).await?;

        // First half accepts, the rest never answers.
        let machine = self.state.machine();
        for player_id in participants.iter().take(team_size) {
            machine.accept(match_id, player_id).await?;
        }

        tokio::time::sleep(Duration::from_millis(1500)).await;
        self.print_state(match_id, &participants)?;
        Ok(())
    }
}

async fn run_scenario(name: &str, team_size: usize) -> Result<()> {
    match name {
        "accept-all" => {
            FlowTester::new(60).await?.run_accept_all(team_size).await?;
        }
        "one-decline" => {
            FlowTester::new(60).await?.run_one_decline(team_size).await?;
        }
        "timeout" => {
            FlowTester::new(1).await?.run_timeout(team_size).await?;
        }
        other => {
            return Err(anyhow!(
                "unknown scenario '{}', expected accept-all, one-decline or timeout",
                other
            ));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.as_str().into()),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::RunScenario { scenario, team_size } => {
            run_scenario(&scenario, team_size).await?;
        }
        Commands::RunAllScenarios { team_size } => {
            for scenario in ["accept-all", "one-decline", "timeout"] {
                run_scenario(scenario, team_size).await?;
                println!();
            }
        }
    }

    println!("Done.");
    Ok(())
}
