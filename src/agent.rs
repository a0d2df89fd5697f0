//! Patrolling NPCs and their pause-and-observe behavior.
//!
//! An agent walks across the view in a straight line. When the subject is
//! inside its detection zone it may stop, wait a moment for the subject to
//! settle, then watch. Any movement while it watches is reported to the
//! escalation tracker once, after which the agent sits out the rest of the
//! pause and walks on.

use crate::config::AgentConfig;
use crate::detection::DetectionZone;
use crate::escalation::{EscalationTracker, TierDescriptor};
use crate::rng::Rng;
use crate::subject::SubjectSample;
use crate::timer::CountdownTimer;
use crate::types::{AgentPhase, AgentView, RuntimeEvent, Vec2, ViewBounds};

#[derive(Clone, Debug, PartialEq)]
pub struct AgentParams {
    pub speed: f32,
    pub detection: DetectionZone,
    pub max_pauses: u32,
    pub pause_chance: u32,
    pub vignette_intensity: f32,
    pub pause_duration_secs: f32,
    pub detection_start_delay_secs: f32,
    pub min_pause_interval_secs: f32,
    pub movement_threshold: f32,
    pub min_lifetime_secs: f32,
    pub despawn_margin: f32,
}

impl AgentParams {
    pub fn for_tier(base: &AgentConfig, tier: &TierDescriptor) -> Self {
        Self {
            speed: base.speed,
            detection: base.detection.widened(tier.width_bonus),
            max_pauses: tier.max_pauses,
            pause_chance: tier.pause_chance.min(100),
            vignette_intensity: tier.peak_vignette(),
            pause_duration_secs: base.pause_duration_secs,
            detection_start_delay_secs: base.detection_start_delay_secs,
            min_pause_interval_secs: base.min_pause_interval_secs,
            movement_threshold: base.movement_threshold,
            min_lifetime_secs: base.min_lifetime_secs,
            despawn_margin: base.despawn_margin,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObservationSample {
    pub subject_position: Vec2,
}

/// Countdown shared by every phase of one pause.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PauseWindow {
    pub elapsed: f32,
    pub resume_speed: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AgentState {
    Patrolling,
    Paused(PauseWindow),
    Observing {
        window: PauseWindow,
        sample: ObservationSample,
    },
    Fleeing(PauseWindow),
    Despawned,
}

impl AgentState {
    pub fn phase(&self) -> AgentPhase {
        match self {
            AgentState::Patrolling => AgentPhase::Patrolling,
            AgentState::Paused(_) => AgentPhase::Paused,
            AgentState::Observing { .. } => AgentPhase::Observing,
            AgentState::Fleeing(_) => AgentPhase::Fleeing,
            AgentState::Despawned => AgentPhase::Despawned,
        }
    }
}

pub struct TickContext<'a> {
    pub rng: &'a mut Rng,
    pub tracker: &'a mut EscalationTracker,
    pub timer: &'a mut dyn CountdownTimer,
    pub events: &'a mut Vec<RuntimeEvent>,
}

#[derive(Clone, Debug)]
pub struct Agent {
    id: String,
    position: Vec2,
    direction: Vec2,
    speed: f32,
    state: AgentState,
    pause_count: u32,
    last_pause_at: Option<f32>,
    age: f32,
    eyes_following: bool,
    params: AgentParams,
}

impl Agent {
    pub fn new(id: String, position: Vec2, direction: Vec2, params: AgentParams) -> Self {
        Self {
            id,
            position,
            direction: direction.normalize_or(Vec2::RIGHT),
            speed: params.speed.max(0.0),
            state: AgentState::Patrolling,
            pause_count: 0,
            last_pause_at: None,
            age: 0.0,
            eyes_following: false,
            params,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn phase(&self) -> AgentPhase {
        self.state.phase()
    }

    pub fn pause_count(&self) -> u32 {
        self.pause_count
    }

    pub fn age(&self) -> f32 {
        self.age
    }

    pub fn eyes_following(&self) -> bool {
        self.eyes_following
    }

    pub fn params(&self) -> &AgentParams {
        &self.params
    }

    pub fn is_despawned(&self) -> bool {
        self.state == AgentState::Despawned
    }

    pub fn facing_sign(&self) -> f32 {
        if self.direction.x > 0.0 {
            1.0
        } else {
            -1.0
        }
    }

    pub fn advance(&mut self, dt_secs: f32) {
        let step = self.direction * (self.speed.max(0.0) * dt_secs.max(0.0));
        self.position = self.position + step;
    }

    /// True once the agent has walked past the far edge plus margin and has
    /// been alive for at least its minimum lifetime.
    pub fn should_despawn(&self, view: &ViewBounds) -> bool {
        if self.age < self.params.min_lifetime_secs {
            return false;
        }
        if self.facing_sign() > 0.0 {
            self.position.x > view.right_edge() + self.params.despawn_margin
        } else {
            self.position.x < view.left_edge() - self.params.despawn_margin
        }
    }

    pub fn sees(&self, subject: &SubjectSample) -> bool {
        self.params
            .detection
            .contains(subject.position, self.position, self.facing_sign())
    }

    pub fn despawn(&mut self) {
        self.state = AgentState::Despawned;
    }

    pub fn view(&self) -> AgentView {
        AgentView {
            id: self.id.clone(),
            x: self.position.x,
            y: self.position.y,
            facing_sign: self.facing_sign(),
            speed: self.speed,
            phase: self.phase(),
            pause_count: self.pause_count,
            max_pauses: self.params.max_pauses,
            eyes_following: self.eyes_following,
        }
    }

    pub fn tick(
        &mut self,
        dt_secs: f32,
        subject: Option<SubjectSample>,
        view: &ViewBounds,
        ctx: &mut TickContext<'_>,
    ) -> AgentPhase {
        if self.is_despawned() {
            return AgentPhase::Despawned;
        }
        let dt_secs = if dt_secs.is_finite() {
            dt_secs.max(0.0)
        } else {
            0.0
        };
        self.age += dt_secs;

        let state = self.state;
        self.state = match state {
            AgentState::Patrolling => self.tick_patrol(dt_secs, subject, view, ctx),
            AgentState::Paused(window) => self.tick_paused(window, dt_secs, subject, ctx),
            AgentState::Observing { window, sample } => {
                self.tick_observing(window, sample, dt_secs, subject, ctx)
            }
            AgentState::Fleeing(window) => self.tick_fleeing(window, dt_secs, ctx),
            AgentState::Despawned => AgentState::Despawned,
        };
        self.phase()
    }

    fn should_pause(&self, subject: &SubjectSample, rng: &mut Rng) -> bool {
        if self.pause_count >= self.params.max_pauses {
            return false;
        }
        if let Some(last) = self.last_pause_at {
            if self.age - last < self.params.min_pause_interval_secs {
                return false;
            }
        }
        if !rng.percent(self.params.pause_chance) {
            return false;
        }
        self.sees(subject)
    }

    fn tick_patrol(
        &mut self,
        dt_secs: f32,
        subject: Option<SubjectSample>,
        view: &ViewBounds,
        ctx: &mut TickContext<'_>,
    ) -> AgentState {
        if let Some(subject) = subject {
            if self.should_pause(&subject, ctx.rng) {
                let window = PauseWindow {
                    elapsed: 0.0,
                    resume_speed: self.speed,
                };
                self.speed = 0.0;
                self.pause_count += 1;
                self.last_pause_at = Some(self.age);
                ctx.events.push(RuntimeEvent::AgentPaused {
                    agent_id: self.id.clone(),
                    pause_count: self.pause_count,
                    max_pauses: self.params.max_pauses,
                });
                return AgentState::Paused(window);
            }
        }

        self.advance(dt_secs);
        if self.should_despawn(view) {
            ctx.events.push(RuntimeEvent::AgentDespawned {
                agent_id: self.id.clone(),
            });
            return AgentState::Despawned;
        }
        AgentState::Patrolling
    }

    fn tick_paused(
        &mut self,
        mut window: PauseWindow,
        dt_secs: f32,
        subject: Option<SubjectSample>,
        ctx: &mut TickContext<'_>,
    ) -> AgentState {
        window.elapsed += dt_secs;
        if window.elapsed >= self.params.pause_duration_secs {
            return self.resume(window, false, ctx);
        }
        if window.elapsed < self.params.detection_start_delay_secs {
            return AgentState::Paused(window);
        }
        let Some(subject) = subject else {
            return AgentState::Paused(window);
        };
        ctx.events.push(RuntimeEvent::ObservationStarted {
            agent_id: self.id.clone(),
            subject_x: subject.position.x,
            subject_y: subject.position.y,
        });
        AgentState::Observing {
            window,
            sample: ObservationSample {
                subject_position: subject.position,
            },
        }
    }

    fn tick_observing(
        &mut self,
        mut window: PauseWindow,
        sample: ObservationSample,
        dt_secs: f32,
        subject: Option<SubjectSample>,
        ctx: &mut TickContext<'_>,
    ) -> AgentState {
        window.elapsed += dt_secs;
        if window.elapsed >= self.params.pause_duration_secs {
            return self.resume(window, false, ctx);
        }
        let Some(subject) = subject else {
            return AgentState::Observing { window, sample };
        };
        let threshold = self.params.movement_threshold;
        let moved = subject.position.distance(sample.subject_position) > threshold
            || subject.velocity_x.abs() > threshold;
        if !moved {
            return AgentState::Observing { window, sample };
        }

        let report = ctx.tracker.report_detection(&mut *ctx.timer);
        self.eyes_following = true;
        ctx.events.push(RuntimeEvent::Detected {
            agent_id: self.id.clone(),
            detections: report.detections,
            tier: report.tier,
            vignette_intensity: self.params.vignette_intensity,
        });
        ctx.events.push(RuntimeEvent::TimePenalty {
            seconds: report.penalty_secs,
        });
        if report.tier_changed() {
            ctx.events.push(RuntimeEvent::TierChanged {
                from: report.previous_tier,
                to: report.tier,
            });
        }
        AgentState::Fleeing(window)
    }

    fn tick_fleeing(
        &mut self,
        mut window: PauseWindow,
        dt_secs: f32,
        ctx: &mut TickContext<'_>,
    ) -> AgentState {
        window.elapsed += dt_secs;
        if window.elapsed >= self.params.pause_duration_secs {
            return self.resume(window, true, ctx);
        }
        AgentState::Fleeing(window)
    }

    fn resume(
        &mut self,
        window: PauseWindow,
        detected: bool,
        ctx: &mut TickContext<'_>,
    ) -> AgentState {
        self.speed = window.resume_speed;
        ctx.events.push(RuntimeEvent::AgentResumed {
            agent_id: self.id.clone(),
            detected,
        });
        if !detected && self.eyes_following {
            self.eyes_following = false;
            ctx.events.push(RuntimeEvent::EyesCleared {
                agent_id: self.id.clone(),
            });
        }
        AgentState::Patrolling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::TierTable;

    const DT: f32 = 1.0 / 60.0;

    #[derive(Default)]
    struct Clock {
        applied: Vec<f32>,
    }

    impl CountdownTimer for Clock {
        fn modify_time(&mut self, delta_secs: f32) {
            self.applied.push(delta_secs);
        }
    }

    struct Harness {
        rng: Rng,
        tracker: EscalationTracker,
        clock: Clock,
        events: Vec<RuntimeEvent>,
        view: ViewBounds,
    }

    impl Harness {
        fn new(seed: u32) -> Self {
            Self {
                rng: Rng::new(seed),
                tracker: EscalationTracker::new(TierTable::default()),
                clock: Clock::default(),
                events: Vec::new(),
                view: ViewBounds {
                    center_x: 0.0,
                    half_width: 8.0,
                },
            }
        }

        fn tick(&mut self, agent: &mut Agent, subject: Option<SubjectSample>) -> AgentPhase {
            let mut ctx = TickContext {
                rng: &mut self.rng,
                tracker: &mut self.tracker,
                timer: &mut self.clock,
                events: &mut self.events,
            };
            agent.tick(DT, subject, &self.view, &mut ctx)
        }

        fn detections_reported(&self) -> usize {
            self.events
                .iter()
                .filter(|event| matches!(event, RuntimeEvent::Detected { .. }))
                .count()
        }
    }

    fn params() -> AgentParams {
        AgentParams {
            speed: 2.0,
            detection: DetectionZone::new(30.0, 2.0, Vec2::ZERO),
            max_pauses: 3,
            pause_chance: 100,
            vignette_intensity: 0.3,
            pause_duration_secs: 1.0,
            detection_start_delay_secs: 0.2,
            min_pause_interval_secs: 2.0,
            movement_threshold: 0.1,
            min_lifetime_secs: 0.5,
            despawn_margin: 2.0,
        }
    }

    fn still_at(x: f32) -> Option<SubjectSample> {
        Some(SubjectSample {
            position: Vec2::new(x, 0.0),
            velocity_x: 0.0,
        })
    }

    fn agent_with(params: AgentParams) -> Agent {
        Agent::new("agent_1".to_string(), Vec2::ZERO, Vec2::RIGHT, params)
    }

    #[test]
    fn advance_moves_along_direction() {
        let mut agent = agent_with(params());
        agent.advance(0.5);
        assert_eq!(agent.position(), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn degenerate_direction_and_negative_speed_are_normalized() {
        let mut p = params();
        p.speed = -4.0;
        let agent = Agent::new("a".to_string(), Vec2::ZERO, Vec2::ZERO, p);
        assert_eq!(agent.direction(), Vec2::RIGHT);
        assert_eq!(agent.speed(), 0.0);

        let left = Agent::new("b".to_string(), Vec2::ZERO, Vec2::new(-5.0, 0.0), params());
        assert_eq!(left.direction(), Vec2::LEFT);
        assert_eq!(left.facing_sign(), -1.0);
    }

    #[test]
    fn despawn_waits_for_minimum_lifetime() {
        let mut harness = Harness::new(1);
        let mut agent = Agent::new(
            "late".to_string(),
            Vec2::new(50.0, 0.0),
            Vec2::RIGHT,
            params(),
        );
        assert!(!agent.should_despawn(&harness.view));
        for _ in 0..20 {
            assert_eq!(harness.tick(&mut agent, None), AgentPhase::Patrolling);
        }
        assert!(agent.age() < 0.5);
        let mut phase = AgentPhase::Patrolling;
        for _ in 0..20 {
            phase = harness.tick(&mut agent, None);
        }
        assert_eq!(phase, AgentPhase::Despawned);
        assert!(agent.age() >= 0.5);
    }

    #[test]
    fn leftward_agent_despawns_past_left_edge() {
        let mut agent = Agent::new(
            "west".to_string(),
            Vec2::new(-10.5, 0.0),
            Vec2::LEFT,
            params(),
        );
        let view = ViewBounds {
            center_x: 0.0,
            half_width: 8.0,
        };
        agent.age = 1.0;
        assert!(agent.should_despawn(&view));
        agent.position = Vec2::new(9.5, 0.0);
        assert!(!agent.should_despawn(&view));
    }

    #[test]
    fn still_subject_is_never_detected_and_speed_is_restored() {
        let mut harness = Harness::new(7);
        let mut agent = agent_with(params());

        assert_eq!(harness.tick(&mut agent, still_at(5.0)), AgentPhase::Paused);
        assert_eq!(agent.speed(), 0.0);

        let mut saw_observing = false;
        for _ in 0..70 {
            if harness.tick(&mut agent, still_at(5.0)) == AgentPhase::Observing {
                saw_observing = true;
            }
        }
        assert!(saw_observing);
        assert_eq!(agent.phase(), AgentPhase::Patrolling);
        assert_eq!(agent.speed(), 2.0);
        assert_eq!(harness.tracker.detections(), 0);
        assert_eq!(harness.detections_reported(), 0);
        assert!(harness.clock.applied.is_empty());
        assert!(harness.events.iter().any(|event| matches!(
            event,
            RuntimeEvent::AgentResumed {
                detected: false,
                ..
            }
        )));
    }

    #[test]
    fn moving_subject_is_reported_once_per_pause() {
        let mut harness = Harness::new(7);
        let mut agent = agent_with(params());

        assert_eq!(harness.tick(&mut agent, still_at(5.0)), AgentPhase::Paused);
        while agent.phase() == AgentPhase::Paused {
            harness.tick(&mut agent, still_at(5.0));
        }
        assert_eq!(agent.phase(), AgentPhase::Observing);

        // Subject steps 0.5 units and keeps standing there.
        let mut fled = false;
        while agent.phase() != AgentPhase::Patrolling {
            if harness.tick(&mut agent, still_at(5.5)) == AgentPhase::Fleeing {
                fled = true;
            }
        }
        assert!(fled);
        assert_eq!(harness.tracker.detections(), 1);
        assert_eq!(harness.detections_reported(), 1);
        assert_eq!(harness.clock.applied, vec![-3.0]);
        assert!(agent.eyes_following());
        assert_eq!(agent.speed(), 2.0);
    }

    #[test]
    fn horizontal_velocity_alone_triggers_detection() {
        let mut harness = Harness::new(7);
        let mut agent = agent_with(params());
        harness.tick(&mut agent, still_at(5.0));
        while agent.phase() == AgentPhase::Paused {
            harness.tick(&mut agent, still_at(5.0));
        }
        let running_in_place = Some(SubjectSample {
            position: Vec2::new(5.0, 0.0),
            velocity_x: -0.5,
        });
        assert_eq!(
            harness.tick(&mut agent, running_in_place),
            AgentPhase::Fleeing
        );
        assert_eq!(harness.tracker.detections(), 1);
    }

    #[test]
    fn eyes_clear_after_a_quiet_pause() {
        let mut harness = Harness::new(7);
        let mut p = params();
        p.min_pause_interval_secs = 0.0;
        let mut agent = agent_with(p);

        harness.tick(&mut agent, still_at(5.0));
        while agent.phase() != AgentPhase::Patrolling {
            let x = if agent.phase() == AgentPhase::Observing {
                6.0
            } else {
                5.0
            };
            harness.tick(&mut agent, still_at(x));
        }
        assert!(agent.eyes_following());

        assert_eq!(harness.tick(&mut agent, still_at(6.0)), AgentPhase::Paused);
        while agent.phase() != AgentPhase::Patrolling {
            harness.tick(&mut agent, still_at(6.0));
        }
        assert!(!agent.eyes_following());
        assert!(harness
            .events
            .iter()
            .any(|event| matches!(event, RuntimeEvent::EyesCleared { .. })));
    }

    #[test]
    fn subject_outside_zone_never_pauses_agent() {
        let mut harness = Harness::new(3);
        let mut agent = agent_with(params());
        for _ in 0..30 {
            assert_eq!(
                harness.tick(&mut agent, still_at(100.0)),
                AgentPhase::Patrolling
            );
        }
        assert_eq!(agent.pause_count(), 0);
    }

    #[test]
    fn missing_subject_skips_pause_and_sampling() {
        let mut harness = Harness::new(3);
        let mut agent = agent_with(params());
        for _ in 0..10 {
            assert_eq!(harness.tick(&mut agent, None), AgentPhase::Patrolling);
        }

        let x = agent.position().x;
        harness.tick(&mut agent, still_at(x));
        assert_eq!(agent.phase(), AgentPhase::Paused);
        assert!(matches!(agent.state(), AgentState::Paused(_)));
        for _ in 0..30 {
            harness.tick(&mut agent, None);
        }
        assert_eq!(agent.phase(), AgentPhase::Paused);
        assert_eq!(harness.tracker.detections(), 0);
    }

    #[test]
    fn minimum_interval_separates_pauses() {
        let mut harness = Harness::new(11);
        let mut agent = agent_with(params());
        let mut pause_started_at = Vec::new();
        for _ in 0..600 {
            let before = agent.pause_count();
            let x = agent.position().x;
            harness.tick(&mut agent, still_at(x));
            if agent.pause_count() > before {
                pause_started_at.push(agent.age());
            }
        }
        assert_eq!(pause_started_at.len(), 3);
        for pair in pause_started_at.windows(2) {
            assert!(pair[1] - pair[0] >= 2.0 - 1e-3);
        }
    }

    #[test]
    fn pauses_never_exceed_budget_for_any_seed() {
        for seed in 1..=200u32 {
            let mut harness = Harness::new(seed);
            let mut p = params();
            p.pause_chance = 50;
            p.min_pause_interval_secs = 0.0;
            p.max_pauses = seed % 5;
            let mut agent = agent_with(p);
            let mut paused_transitions = 0;
            let mut previous = agent.phase();
            for tick in 0..2_000 {
                let x = agent.position().x + if tick % 7 == 0 { 1.0 } else { 0.0 };
                let phase = harness.tick(&mut agent, still_at(x));
                if phase == AgentPhase::Paused && previous == AgentPhase::Patrolling {
                    paused_transitions += 1;
                }
                previous = phase;
            }
            assert!(paused_transitions <= seed % 5, "seed {seed}");
            assert!(agent.pause_count() <= seed % 5);
        }
    }

    #[test]
    fn tier_params_widen_zone_and_apply_tier_budgets() {
        let table = TierTable::default();
        let base = AgentConfig::default();
        let scaled = AgentParams::for_tier(&base, table.descriptor(2));
        assert_eq!(scaled.detection.width, base.detection.width + 1.0);
        assert_eq!(scaled.max_pauses, 5);
        assert_eq!(scaled.pause_chance, 60);
        assert!((scaled.vignette_intensity - 0.7).abs() < 1e-6);
    }
}
