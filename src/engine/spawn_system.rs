use super::*;

use crate::engine::utils::spawn_point;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpawnerState {
    WaitingForClear,
    Delaying { remaining_secs: f32 },
    Disabled,
}

impl<S: SubjectProvider> Simulation<S> {
    pub fn set_spawning(&mut self, enabled: bool) {
        if enabled {
            if self.spawner == SpawnerState::Disabled {
                self.spawner = SpawnerState::WaitingForClear;
            }
            return;
        }
        self.spawner = SpawnerState::Disabled;
        self.clear_agents();
    }

    pub fn spawner_state(&self) -> SpawnerState {
        self.spawner
    }

    pub fn clear_agents(&mut self) {
        for agent in &mut self.agents {
            agent.despawn();
            self.events.push(RuntimeEvent::AgentDespawned {
                agent_id: agent.id().to_string(),
            });
            self.stats.despawned += 1;
        }
        self.agents.clear();
    }

    pub(super) fn update_spawner(&mut self, dt_secs: f32) {
        let state = self.spawner;
        self.spawner = match state {
            SpawnerState::Disabled => SpawnerState::Disabled,
            SpawnerState::WaitingForClear => {
                if self.agents.is_empty() {
                    let spawner = &self.config.spawner;
                    SpawnerState::Delaying {
                        remaining_secs: self
                            .rng
                            .range_f32(spawner.min_spawn_delay_secs, spawner.max_spawn_delay_secs),
                    }
                } else {
                    SpawnerState::WaitingForClear
                }
            }
            SpawnerState::Delaying { remaining_secs } => {
                let remaining_secs = remaining_secs - dt_secs;
                if remaining_secs > 0.0 {
                    SpawnerState::Delaying { remaining_secs }
                } else {
                    self.spawn_agent();
                    SpawnerState::WaitingForClear
                }
            }
        };
    }

    pub(super) fn spawn_agent(&mut self) {
        let tier = self.tracker.current_tier();
        let params = self.tracker.agent_params(&self.config.agent);
        let (position, direction) = spawn_point(
            &self.config.view,
            self.config.spawner.side,
            self.config.agent.despawn_margin,
            self.config.spawner.spawn_y,
            &mut self.rng,
        );
        let id = self.make_id("agent");
        self.events.push(RuntimeEvent::AgentSpawned {
            agent_id: id.clone(),
            x: position.x,
            y: position.y,
            tier,
            detection_width: params.detection.width,
        });
        self.agents.push(Agent::new(id, position, direction, params));
        self.stats.spawned += 1;
    }
}
