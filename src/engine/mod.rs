use crate::agent::{Agent, TickContext};
use crate::config::SimConfig;
use crate::error::Result;
use crate::escalation::EscalationTracker;
use crate::rng::Rng;
use crate::subject::SubjectProvider;
use crate::timer::{CountdownTimer, EscapeTimer, TimerStatus};
use crate::types::{RunOutcome, RunSummary, RuntimeEvent, Snapshot};

mod spawn_system;
mod utils;

pub use self::spawn_system::SpawnerState;

#[derive(Clone, Debug, Default)]
struct RunStats {
    spawned: u32,
    despawned: u32,
    pauses: u32,
    total_penalty_secs: f32,
}

#[derive(Clone, Debug, Default)]
pub struct SimulationOptions {
    pub duration_ms: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct Simulation<S> {
    pub config: SimConfig,

    rng: Rng,
    subject: S,
    agents: Vec<Agent>,
    tracker: EscalationTracker,
    timer: EscapeTimer,
    spawner: SpawnerState,
    events: Vec<RuntimeEvent>,
    stats: RunStats,
    duration_ms: Option<u64>,

    elapsed_ms: u64,
    tick_counter: u64,
    ended: bool,
    outcome: Option<RunOutcome>,
    next_id_counter: u64,
}

impl<S: SubjectProvider> Simulation<S> {
    pub fn new(
        config: SimConfig,
        subject: S,
        seed: u32,
        options: SimulationOptions,
    ) -> Result<Self> {
        config.validate()?;
        let tracker = EscalationTracker::new(config.tiers.clone());
        let timer = EscapeTimer::new(&config.timer);
        Ok(Self {
            rng: Rng::new(seed),
            subject,
            agents: Vec::new(),
            tracker,
            timer,
            spawner: SpawnerState::WaitingForClear,
            events: Vec::new(),
            stats: RunStats::default(),
            duration_ms: options.duration_ms,
            elapsed_ms: 0,
            tick_counter: 0,
            ended: false,
            outcome: None,
            next_id_counter: 1,
            config,
        })
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn tracker(&self) -> &EscalationTracker {
        &self.tracker
    }

    pub fn timer(&self) -> &EscapeTimer {
        &self.timer
    }

    pub fn subject(&self) -> &S {
        &self.subject
    }

    pub fn subject_mut(&mut self) -> &mut S {
        &mut self.subject
    }

    pub fn modify_time(&mut self, delta_secs: f32) {
        self.timer.modify_time(delta_secs);
    }

    pub fn escape(&mut self) {
        if self.ended {
            return;
        }
        self.timer.stop();
        self.finish(RunOutcome::Survived);
    }

    pub fn step(&mut self, dt_ms: u64) {
        if self.ended {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        let dt_secs = dt_ms as f32 / 1000.0;
        let view = self.config.view;

        self.subject.tick(dt_secs, &view);
        let sample = self.subject.sample();

        let first_new_event = self.events.len();
        self.update_spawner(dt_secs);

        for agent in &mut self.agents {
            let mut ctx = TickContext {
                rng: &mut self.rng,
                tracker: &mut self.tracker,
                timer: &mut self.timer,
                events: &mut self.events,
            };
            agent.tick(dt_secs, sample, &view, &mut ctx);
        }
        self.agents.retain(|agent| !agent.is_despawned());
        self.record_stats(first_new_event);

        if self.timer.tick(dt_secs) == TimerStatus::TimeUp {
            self.events.push(RuntimeEvent::TimeUp);
            self.finish(RunOutcome::TimeUp);
            return;
        }
        if let Some(duration_ms) = self.duration_ms {
            if self.elapsed_ms >= duration_ms {
                self.finish(RunOutcome::Survived);
            }
        }
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick_counter,
            elapsed_ms: self.elapsed_ms,
            time_left_secs: self.timer.remaining_secs(),
            clock: self.timer.format_clock(),
            warning: self.timer.is_warning(),
            detections: self.tracker.detections(),
            tier: self.tracker.current_tier(),
            subject_x: self.subject.sample().map(|sample| sample.position.x),
            agents: self.agents.iter().map(Agent::view).collect(),
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    pub fn build_summary(&self) -> RunSummary {
        RunSummary {
            outcome: self.outcome.unwrap_or(RunOutcome::Survived),
            duration_ms: self.elapsed_ms,
            detections: self.tracker.detections(),
            final_tier: self.tracker.current_tier(),
            time_left_secs: self.timer.remaining_secs(),
            total_penalty_secs: self.stats.total_penalty_secs,
            spawned: self.stats.spawned,
            despawned: self.stats.despawned,
            pauses: self.stats.pauses,
        }
    }

    fn finish(&mut self, outcome: RunOutcome) {
        self.ended = true;
        self.outcome = Some(outcome);
    }

    fn record_stats(&mut self, from: usize) {
        for event in &self.events[from..] {
            match event {
                RuntimeEvent::AgentDespawned { .. } => self.stats.despawned += 1,
                RuntimeEvent::AgentPaused { .. } => self.stats.pauses += 1,
                RuntimeEvent::TimePenalty { seconds } => {
                    self.stats.total_penalty_secs += *seconds;
                }
                _ => {}
            }
        }
    }

    fn make_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}_{}", self.next_id_counter);
        self.next_id_counter += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SimConfig;
    use crate::constants::TICK_MS;
    use crate::engine::{Simulation, SimulationOptions};
    use crate::error::ConfigError;
    use crate::subject::{FixedSubject, ScriptedSubject, SubjectConfig};
    use crate::types::{AgentPhase, RunOutcome, RuntimeEvent, Vec2};

    fn quiet_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.spawner.min_spawn_delay_secs = 0.5;
        config.spawner.max_spawn_delay_secs = 0.5;
        config
    }

    fn run_until<S: crate::subject::SubjectProvider>(
        sim: &mut Simulation<S>,
        max_ticks: usize,
        mut done: impl FnMut(&Simulation<S>) -> bool,
    ) -> bool {
        for _ in 0..max_ticks {
            sim.step(TICK_MS);
            if done(sim) {
                return true;
            }
        }
        false
    }

    #[test]
    fn same_seed_produces_same_progression() {
        let config = SimConfig::default();
        let mut a = Simulation::new(
            config.clone(),
            ScriptedSubject::new(SubjectConfig::default(), 9),
            1234,
            SimulationOptions::default(),
        )
        .expect("valid config");
        let mut b = Simulation::new(
            config,
            ScriptedSubject::new(SubjectConfig::default(), 9),
            1234,
            SimulationOptions::default(),
        )
        .expect("valid config");

        for _ in 0..3_000 {
            a.step(TICK_MS);
            b.step(TICK_MS);
        }
        let sa = a.build_snapshot(false);
        let sb = b.build_snapshot(false);
        assert_eq!(sa.detections, sb.detections);
        assert_eq!(sa.time_left_secs.to_bits(), sb.time_left_secs.to_bits());
        assert_eq!(sa.agents.len(), sb.agents.len());
        assert_eq!(a.subject().position(), b.subject().position());
        for (x, y) in sa.agents.iter().zip(sb.agents.iter()) {
            assert_eq!(x.x.to_bits(), y.x.to_bits());
            assert_eq!(x.phase, y.phase);
        }
    }

    #[test]
    fn invalid_config_fails_at_construction() {
        let mut config = SimConfig::default();
        config.view.half_width = 0.0;
        let result = Simulation::new(
            config,
            FixedSubject::absent(),
            1,
            SimulationOptions::default(),
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                field: "view.halfWidth",
                ..
            })
        ));
    }

    #[test]
    fn spawner_waits_for_delay_then_spawns_one_agent_at_left_edge() {
        let mut sim = Simulation::new(
            quiet_config(),
            FixedSubject::absent(),
            5,
            SimulationOptions::default(),
        )
        .expect("valid config");

        for _ in 0..25 {
            sim.step(TICK_MS);
        }
        assert!(sim.agents().is_empty());

        assert!(run_until(&mut sim, 20, |sim| !sim.agents().is_empty()));
        let agent = &sim.agents()[0];
        let view = sim.config.view;
        assert!(agent.position().x < view.left_edge());
        assert_eq!(agent.direction(), Vec2::RIGHT);
        assert_eq!(agent.params().max_pauses, 3);
        assert_eq!(agent.params().pause_chance, 30);
        assert_eq!(agent.params().detection.width, 31.0);

        for _ in 0..200 {
            sim.step(TICK_MS);
            assert!(sim.agents().len() <= 1);
        }
    }

    #[test]
    fn agent_crosses_view_and_despawns_without_subject() {
        let mut sim = Simulation::new(
            quiet_config(),
            FixedSubject::absent(),
            5,
            SimulationOptions::default(),
        )
        .expect("valid config");
        assert!(run_until(&mut sim, 60, |sim| !sim.agents().is_empty()));
        assert!(run_until(&mut sim, 60 * 20, |sim| sim.agents().is_empty()));

        let summary = sim.build_summary();
        assert_eq!(summary.spawned, 1);
        assert_eq!(summary.despawned, 1);
        assert_eq!(summary.pauses, 0);
        assert_eq!(summary.detections, 0);
    }

    #[test]
    fn detection_escalates_tier_and_costs_time() {
        let mut config = quiet_config();
        config.timer.initial_secs = 600.0;
        config.agent.min_pause_interval_secs = 0.0;
        let mut tiers: Vec<crate::escalation::TierDescriptor> = config.tiers.clone().into();
        for tier in &mut tiers {
            tier.pause_chance = 100;
            tier.max_pauses = 50;
        }
        config.tiers = crate::escalation::TierTable::new(tiers).expect("valid tiers");

        let mut sim = Simulation::new(
            config,
            FixedSubject::at(Vec2::new(0.0, 0.0)),
            8,
            SimulationOptions::default(),
        )
        .expect("valid config");

        let mut detections_seen = 0;
        let mut tier_changes = Vec::new();
        for _ in 0..60 * 120 {
            // Jitter the subject whenever someone is watching.
            let watching = sim
                .agents()
                .iter()
                .any(|agent| agent.phase() == AgentPhase::Observing);
            sim.subject_mut().position.x = if watching { 0.5 } else { 0.0 };
            sim.step(TICK_MS);
            for event in sim.build_snapshot(true).events {
                match event {
                    RuntimeEvent::Detected { .. } => detections_seen += 1,
                    RuntimeEvent::TierChanged { from, to } => tier_changes.push((from, to)),
                    _ => {}
                }
            }
            if sim.tracker().detections() >= 9 {
                break;
            }
        }

        assert_eq!(sim.tracker().detections(), 9);
        assert_eq!(detections_seen, 9);
        assert_eq!(sim.tracker().current_tier(), 3);
        assert_eq!(tier_changes, vec![(0, 1), (1, 2), (2, 3)]);
        // Two detections at 3 s, three at 5 s, three at 7 s, the ninth at 10 s.
        let summary = sim.build_summary();
        assert!((summary.total_penalty_secs - 52.0).abs() < 1e-3);
        let expected_left = 600.0 - 52.0 - summary.duration_ms as f32 / 1000.0;
        assert!((sim.timer().remaining_secs() - expected_left).abs() < 0.1);
    }

    #[test]
    fn timer_running_out_ends_the_run() {
        let mut config = quiet_config();
        config.timer.initial_secs = 1.0;
        let mut sim = Simulation::new(
            config,
            FixedSubject::absent(),
            2,
            SimulationOptions::default(),
        )
        .expect("valid config");
        assert!(run_until(&mut sim, 120, |sim| sim.is_ended()));
        let summary = sim.build_summary();
        assert_eq!(summary.outcome, RunOutcome::TimeUp);
        let snapshot = sim.build_snapshot(true);
        assert!(snapshot
            .events
            .iter()
            .any(|event| matches!(event, RuntimeEvent::TimeUp)));

        let tick = sim.tick_count();
        sim.step(TICK_MS);
        assert_eq!(sim.tick_count(), tick);
    }

    #[test]
    fn duration_limit_ends_as_survived() {
        let mut sim = Simulation::new(
            quiet_config(),
            FixedSubject::absent(),
            2,
            SimulationOptions {
                duration_ms: Some(2_000),
            },
        )
        .expect("valid config");
        assert!(run_until(&mut sim, 200, |sim| sim.is_ended()));
        assert_eq!(sim.build_summary().outcome, RunOutcome::Survived);
        assert!(sim.build_summary().duration_ms >= 2_000);
    }

    #[test]
    fn escape_stops_the_clock() {
        let mut sim = Simulation::new(
            quiet_config(),
            FixedSubject::absent(),
            2,
            SimulationOptions::default(),
        )
        .expect("valid config");
        sim.step(TICK_MS);
        sim.escape();
        assert!(sim.is_ended());
        assert_eq!(sim.build_summary().outcome, RunOutcome::Survived);
    }

    #[test]
    fn disabling_spawner_clears_agents() {
        let mut sim = Simulation::new(
            quiet_config(),
            FixedSubject::absent(),
            5,
            SimulationOptions::default(),
        )
        .expect("valid config");
        assert!(run_until(&mut sim, 60, |sim| !sim.agents().is_empty()));
        sim.set_spawning(false);
        assert!(sim.agents().is_empty());
        for _ in 0..300 {
            sim.step(TICK_MS);
        }
        assert!(sim.agents().is_empty());

        sim.set_spawning(true);
        assert!(run_until(&mut sim, 60, |sim| !sim.agents().is_empty()));
    }

    #[test]
    fn snapshot_drains_events_only_when_requested() {
        let mut sim = Simulation::new(
            quiet_config(),
            FixedSubject::absent(),
            5,
            SimulationOptions::default(),
        )
        .expect("valid config");
        assert!(run_until(&mut sim, 60, |sim| !sim.agents().is_empty()));

        let peek = sim.build_snapshot(false);
        assert!(peek.events.is_empty());
        let drained = sim.build_snapshot(true);
        assert!(drained
            .events
            .iter()
            .any(|event| matches!(event, RuntimeEvent::AgentSpawned { .. })));
        assert!(sim.build_snapshot(true).events.is_empty());
    }
}
