use arcade_racer_core::{uniform, Event, Road, Timer, Vehicle};
use log::debug;
use rand::Rng;

use crate::{spawn_vehicle, update_all, update_vehicle};

const SLOW_PLAYER_SPEED: f32 = 20.0;
const LOOKAHEAD: f32 = 160_000.0;
const VEHICLES_PER_DENSITY: f32 = 10.0;
const SPAWN_BEHIND: f32 = -1_300.0;
const SPAWN_AHEAD_MIN: f32 = 50_000.0;
const SPAWN_AHEAD_MAX: f32 = 60_000.0;

/// Session conditions that block or reshape spawning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpawnGate {
    /// The attract loop is running behind the title screen.
    pub title_screen: bool,
    /// The race has ended.
    pub game_over: bool,
}

/// Keeps the road populated according to the level's traffic density.
#[derive(Clone, Debug, Default)]
pub struct TrafficSpawner {
    cooldown: Timer,
}

impl TrafficSpawner {
    /// Creates a spawner that may spawn on its first step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the spawn cooldown by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.cooldown.advance(dt);
    }

    /// Reports whether the spawn cooldown is still running.
    #[must_use]
    pub fn cooling_down(&self) -> bool {
        self.cooldown.active()
    }

    /// Spawns at most one vehicle and then advances all traffic by one tick.
    ///
    /// Density is read ahead of a moving player and at the player's position
    /// when it is slow, in which case new vehicles appear just behind it.
    /// Destroyed vehicles are left in place for the caller to remove.
    pub fn step<R: Rng>(
        &mut self,
        vehicles: &mut Vec<Vehicle>,
        player: &Vehicle,
        gate: SpawnGate,
        road: &Road<'_>,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) {
        let player_is_slow = gate.title_screen || player.velocity.z < SLOW_PLAYER_SPEED;
        let lookahead = if player_is_slow { 0.0 } else { LOOKAHEAD };
        let density = road.level_at(player.position.z + lookahead).traffic_density;

        let room = (vehicles.len() as f32) < VEHICLES_PER_DENSITY * density;
        if density > 0.0
            && room
            && !gate.game_over
            && !self.cooldown.active()
            && !road.rules.disable_traffic
        {
            let offset = if player_is_slow {
                SPAWN_BEHIND
            } else {
                uniform(rng, SPAWN_AHEAD_MIN, SPAWN_AHEAD_MAX)
            };
            let z = player.position.z + offset;
            vehicles.push(spawn_vehicle(z, player, gate.title_screen, road, rng));
            let last = vehicles.len() - 1;
            update_vehicle(vehicles, last, player.position.z, road);
            self.cooldown.set(uniform(rng, 1.0, 2.0) / density);
            debug!("traffic spawned at z={z:.0} ({} vehicles)", vehicles.len());
            out.push(Event::TrafficSpawned { z });
        }

        update_all(vehicles, player.position.z, road);
    }
}
