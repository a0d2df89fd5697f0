use breakout_express_sim::config::SimConfig;
use breakout_express_sim::constants::TICK_MS;
use breakout_express_sim::engine::{Simulation, SimulationOptions};
use breakout_express_sim::subject::ScriptedSubject;
use breakout_express_sim::types::{RunOutcome, RuntimeEvent, Snapshot, SpawnSide};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Run one custom scenario instead of the built-in set.
    #[arg(long)]
    single: bool,
    #[arg(long)]
    seconds: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    /// JSON file with simulation settings; missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// left, right or random
    #[arg(long)]
    side: Option<String>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug)]
struct Scenario {
    name: String,
    seconds: u32,
    seed: u32,
    config: SimConfig,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    seconds: u32,
    outcome: RunOutcome,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    detections: u32,
    #[serde(rename = "finalTier")]
    final_tier: usize,
    #[serde(rename = "timeLeftSecs")]
    time_left_secs: f32,
    #[serde(rename = "totalPenaltySecs")]
    total_penalty_secs: f32,
    spawned: u32,
    despawned: u32,
    pauses: u32,
    #[serde(rename = "maxAgents")]
    max_agents: usize,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummaryFile {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "generatedAtIso")]
    generated_at_iso: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDetections")]
    average_detections: f32,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

#[derive(Debug, Default)]
struct AnomalyTracker {
    last_detections: u32,
    last_tier: usize,
    detections_this_pause: HashMap<String, u32>,
}

fn main() {
    let cli = Cli::parse();
    let run_started_at_ms = now_ms();
    let base_config = match load_base_config(&cli) {
        Ok(config) => config,
        Err(error) => {
            emit_log(
                "error",
                "config_invalid",
                cli.run_id.as_deref().unwrap_or("sim"),
                None,
                None,
                None,
                json!({ "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    };
    let scenarios = resolve_scenarios(&cli, &base_config);
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "seconds": scenario.seconds,
                "side": scenario.config.spawner.side,
                "tiers": scenario.config.tiers.len(),
            }),
        );
        let scenario_run = match run_scenario(&scenario) {
            Ok(run) => run,
            Err(error) => {
                emit_log(
                    "error",
                    "scenario_config_invalid",
                    &run_id,
                    Some(&scenario.name),
                    Some(scenario.seed),
                    None,
                    json!({ "error": error.to_string() }),
                );
                std::process::exit(2);
            }
        };

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &run_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *outcome_counts
            .entry(outcome_key(scenario_run.result.outcome))
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.finished_tick),
            json!({
                "outcome": scenario_run.result.outcome,
                "detections": scenario_run.result.detections,
                "finalTier": scenario_run.result.final_tier,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => emit_log(
                "error",
                "result_serialize_failed",
                &run_id,
                Some(&scenario.name),
                Some(scenario.seed),
                None,
                json!({ "error": error.to_string() }),
            ),
        }
        scenario_results.push(scenario_run.result);
    }

    let run_finished_at_ms = now_ms();
    let summary = build_run_summary(
        run_id.clone(),
        run_started_at_ms,
        run_finished_at_ms,
        scenario_results,
        outcome_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &run_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &run_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageDetections": summary.average_detections,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn load_base_config(cli: &Cli) -> breakout_express_sim::error::Result<SimConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(side) = cli.side.as_deref().and_then(SpawnSide::parse) {
        config.spawner.side = side;
    }
    Ok(config)
}

fn run_scenario(scenario: &Scenario) -> breakout_express_sim::error::Result<ScenarioRunResult> {
    let subject = ScriptedSubject::new(scenario.config.subject.clone(), scenario.seed ^ 0x5eed);
    let mut sim = Simulation::new(
        scenario.config.clone(),
        subject,
        scenario.seed,
        SimulationOptions {
            duration_ms: Some(scenario.seconds as u64 * 1_000),
        },
    )?;

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut tracker = AnomalyTracker::default();
    let mut max_agents = 0usize;
    let mut tick_safety = 0u64;
    let mut last_tick = 0u64;
    let tick_limit = (scenario.seconds as u64 * 1_000 / TICK_MS.max(1)) + 600;

    while !sim.is_ended() {
        sim.step(TICK_MS);
        let snapshot = sim.build_snapshot(true);
        last_tick = snapshot.tick;
        max_agents = max_agents.max(snapshot.agents.len());
        for message in collect_snapshot_anomalies(&snapshot, &mut tracker) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        tick_safety += 1;
        if tick_safety > tick_limit {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                "tick safety limit exceeded".to_string(),
            );
            break;
        }
    }

    let summary = sim.build_summary();
    Ok(ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            seconds: scenario.seconds,
            outcome: summary.outcome,
            duration_ms: summary.duration_ms,
            detections: summary.detections,
            final_tier: summary.final_tier,
            time_left_secs: (summary.time_left_secs * 10.0).round() / 10.0,
            total_penalty_secs: summary.total_penalty_secs,
            spawned: summary.spawned,
            despawned: summary.despawned,
            pauses: summary.pauses,
            max_agents,
            anomalies,
        },
        anomaly_records,
        finished_tick: last_tick,
    })
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, tracker: &mut AnomalyTracker) -> Vec<String> {
    let mut anomalies = Vec::new();
    if !snapshot.time_left_secs.is_finite() || snapshot.time_left_secs < 0.0 {
        anomalies.push(format!("invalid time left: {}", snapshot.time_left_secs));
    }
    if snapshot.detections < tracker.last_detections {
        anomalies.push(format!(
            "detection count went backwards: {} -> {}",
            tracker.last_detections, snapshot.detections
        ));
    }
    if snapshot.tier < tracker.last_tier {
        anomalies.push(format!(
            "tier went backwards: {} -> {}",
            tracker.last_tier, snapshot.tier
        ));
    }
    tracker.last_detections = snapshot.detections;
    tracker.last_tier = snapshot.tier;

    if snapshot.agents.len() > 1 {
        anomalies.push(format!(
            "spawner let {} agents onto the screen",
            snapshot.agents.len()
        ));
    }
    for agent in &snapshot.agents {
        if agent.pause_count > agent.max_pauses {
            anomalies.push(format!(
                "agent paused past budget: {} {}/{}",
                agent.id, agent.pause_count, agent.max_pauses
            ));
        }
    }

    for event in &snapshot.events {
        match event {
            RuntimeEvent::AgentPaused { agent_id, .. } => {
                tracker.detections_this_pause.insert(agent_id.clone(), 0);
            }
            RuntimeEvent::Detected { agent_id, .. } => {
                let count = tracker
                    .detections_this_pause
                    .entry(agent_id.clone())
                    .or_insert(0);
                *count += 1;
                if *count > 1 {
                    anomalies.push(format!("agent reported twice in one pause: {agent_id}"));
                }
            }
            RuntimeEvent::AgentDespawned { agent_id } => {
                tracker.detections_this_pause.remove(agent_id);
            }
            _ => {}
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli, base: &SimConfig) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(|| rand::random::<u32>() as u64));

    if cli.single || cli.seconds.is_some() || cli.config.is_some() {
        return vec![Scenario {
            name: "custom".to_string(),
            seconds: cli.seconds.unwrap_or(60).clamp(1, 3_600),
            seed,
            config: base.clone(),
        }];
    }

    let mut reckless = base.clone();
    reckless.subject.min_still_secs = 0.1;
    reckless.subject.max_still_secs = 0.4;
    reckless.subject.min_walk_secs = 1.0;
    reckless.subject.max_walk_secs = 4.0;

    let mut both_sides = base.clone();
    both_sides.spawner.side = SpawnSide::Random;

    vec![
        Scenario {
            name: "cautious-player".to_string(),
            seconds: 60,
            seed,
            config: base.clone(),
        },
        Scenario {
            name: "reckless-player".to_string(),
            seconds: 60,
            seed: normalize_seed(seed as u64 + 1),
            config: reckless,
        },
        Scenario {
            name: "both-sides".to_string(),
            seconds: 90,
            seed: normalize_seed(seed as u64 + 2),
            config: both_sides,
        },
    ]
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_run_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummaryFile {
    let scenario_count = scenarios.len();
    let average_detections = if scenario_count == 0 {
        0.0
    } else {
        scenarios.iter().map(|s| s.detections as f32).sum::<f32>() / scenario_count as f32
    };
    RunSummaryFile {
        run_id,
        generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_detections,
        outcome_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    run_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    match serde_json::to_string(&log_line) {
        Ok(line) => eprintln!("{line}"),
        Err(error) => eprintln!("{{\"level\":\"error\",\"event\":\"log_serialize_failed\",\"error\":\"{error}\"}}"),
    }
}

fn outcome_key(outcome: RunOutcome) -> String {
    match outcome {
        RunOutcome::Survived => "survived",
        RunOutcome::TimeUp => "time_up",
    }
    .to_string()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummaryFile) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}
