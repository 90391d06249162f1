#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative simulation state for the arcade racer.
//!
//! [`SimulationContext`] owns every piece of mutable race state: the session
//! clock, the player, the traffic collection, the weather and the random
//! number generator. Static track, level and rule data are only borrowed.
//! Adapters mutate the context exclusively through [`apply`] and read it back
//! through the [`query`] module.

use std::collections::HashSet;

use arcade_racer_core::{
    Command, Event, InputSample, Road, Session, SoundCue, TrackObjectKey, Vehicle, TICK_SECONDS,
};
use arcade_racer_player::{Player, Surroundings};
use arcade_racer_traffic::{remove_destroyed, SpawnGate, TrafficSpawner};
use arcade_racer_weather::{GovernorConfig, SpeedGovernor, Weather};
use log::{debug, error, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

const RAIN_VOLUME: f32 = 0.5;

/// A vehicle whose physical state stopped being finite during a tick.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum VehicleFault {
    /// A traffic vehicle faulted and was removed.
    #[error("traffic vehicle {index} reached a non-finite state on tick {tick}")]
    Traffic {
        /// Position of the vehicle in the traffic collection.
        index: usize,
        /// Tick during which the fault was detected.
        tick: u64,
    },
    /// The player faulted; the player update of that tick was undone.
    #[error("player reached a non-finite state on tick {tick}")]
    Player {
        /// Tick during which the fault was detected.
        tick: u64,
    },
}

/// State the player update may touch, captured so a faulted tick can be undone.
struct Rollback {
    player: Player,
    session: Session,
    traffic: Vec<Vehicle>,
    consumed: HashSet<TrackObjectKey>,
    events: usize,
}

/// Everything a running race mutates, plus borrowed static race content.
#[derive(Debug)]
pub struct SimulationContext<'a> {
    road: Road<'a>,
    seed: u64,
    rng: ChaCha8Rng,
    session: Session,
    player: Player,
    traffic: Vec<Vehicle>,
    consumed: HashSet<TrackObjectKey>,
    weather: Weather,
    governor: SpeedGovernor,
    spawner: TrafficSpawner,
    speed_limited: bool,
    tick_index: u64,
}

impl<'a> SimulationContext<'a> {
    /// Creates a context showing the title screen attract loop.
    #[must_use]
    pub fn new(road: Road<'a>, seed: u64) -> Self {
        Self::with_governor(road, seed, GovernorConfig::default())
    }

    /// Creates a context with a custom wet-weather speed governor.
    #[must_use]
    pub fn with_governor(road: Road<'a>, seed: u64, governor: GovernorConfig) -> Self {
        Self {
            road,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            session: Session::title(road.rules, None),
            player: Player::new(0.0),
            traffic: Vec::new(),
            consumed: HashSet::new(),
            weather: Weather::new(),
            governor: SpeedGovernor::new(governor),
            speed_limited: false,
            spawner: TrafficSpawner::new(),
            tick_index: 0,
        }
    }

    fn reset(&mut self, session: Session) {
        self.session = session;
        self.player = Player::new(0.0);
        self.traffic.clear();
        self.consumed.clear();
        self.weather = Weather::new();
        self.spawner = TrafficSpawner::new();
        self.speed_limited = false;
    }

    fn tick(&mut self, input: InputSample, out_events: &mut Vec<Event>) {
        let road = self.road;

        self.session.advance(TICK_SECONDS, out_events);
        self.player.advance(TICK_SECONDS);
        self.spawner.advance(TICK_SECONDS);
        self.governor.advance(TICK_SECONDS);
        self.weather.update(TICK_SECONDS);

        let snapshot = Rollback {
            player: self.player.clone(),
            session: self.session.clone(),
            traffic: self.traffic.clone(),
            consumed: self.consumed.clone(),
            events: out_events.len(),
        };
        {
            let mut surroundings = Surroundings {
                road,
                session: &mut self.session,
                traffic: &mut self.traffic,
                consumed: &mut self.consumed,
            };
            self.player
                .update(input, &mut surroundings, &mut self.rng, out_events);
        }

        if !self.player.vehicle().is_finite() {
            let fault = VehicleFault::Player {
                tick: self.tick_index,
            };
            error!("{fault}, restoring the previous tick");
            self.player = snapshot.player;
            self.session = snapshot.session;
            self.traffic = snapshot.traffic;
            self.consumed = snapshot.consumed;
            out_events.truncate(snapshot.events);
        } else if out_events[snapshot.events..].contains(&Event::RainForced) {
            self.weather.force_start();
            out_events.push(Event::SoundRequested {
                cue: SoundCue::Rain,
                volume: RAIN_VOLUME,
                pitch: 1.0,
            });
        }

        let gate = SpawnGate {
            title_screen: self.session.is_title(),
            game_over: self.session.is_over(),
        };
        self.spawner.step(
            &mut self.traffic,
            self.player.vehicle(),
            gate,
            &road,
            &mut self.rng,
            out_events,
        );

        self.speed_limited = self.governor.enforce(
            self.player.vehicle_mut(),
            self.weather.raining(),
            out_events,
        );

        for (index, vehicle) in self.traffic.iter_mut().enumerate() {
            if vehicle.destroyed || vehicle.is_finite() {
                continue;
            }
            let fault = VehicleFault::Traffic {
                index,
                tick: self.tick_index,
            };
            warn!("{fault}, removing it");
            vehicle.destroyed = true;
            out_events.push(Event::VehicleFaulted);
        }
        let _ = remove_destroyed(&mut self.traffic);

        self.tick_index = self.tick_index.saturating_add(1);
        out_events.push(Event::TimeAdvanced {
            tick: self.tick_index,
        });
    }
}

/// Applies the provided command to the context, mutating state deterministically.
pub fn apply(ctx: &mut SimulationContext<'_>, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartRace { modifiers } => {
            debug!("race started with {modifiers:?}");
            let session = Session::race(ctx.road.rules, modifiers, ctx.session.best_time);
            ctx.reset(session);
        }
        Command::EnterTitleScreen => {
            let session = Session::title(ctx.road.rules, ctx.session.best_time);
            ctx.reset(session);
        }
        Command::Tick { input } => ctx.tick(input, out_events),
        Command::ToggleRain => {
            let was_raining = ctx.weather.raining();
            if ctx.weather.toggle() && !was_raining {
                out_events.push(Event::SoundRequested {
                    cue: SoundCue::Rain,
                    volume: RAIN_VOLUME,
                    pitch: 1.0,
                });
            }
        }
        Command::SetFreeCamera { enabled } => {
            ctx.session.modifiers.free_camera = enabled;
        }
        Command::DisengageTestDrive => {
            ctx.session.modifiers.test_drive = false;
        }
        Command::LoadBestTime { best_time } => {
            ctx.session.best_time = best_time;
        }
    }
}

/// Read-only queries over the simulation context.
pub mod query {
    use std::{
        collections::hash_map::DefaultHasher,
        hash::{Hash, Hasher},
    };

    use arcade_racer_core::{Session, SessionPhase, Vehicle};
    use arcade_racer_player::Player;
    use arcade_racer_weather::Weather;

    use super::SimulationContext;

    /// Race bookkeeping.
    #[must_use]
    pub fn session<'c>(ctx: &'c SimulationContext<'_>) -> &'c Session {
        &ctx.session
    }

    /// Current session phase.
    #[must_use]
    pub fn phase(ctx: &SimulationContext<'_>) -> SessionPhase {
        ctx.session.phase
    }

    /// The driver-controlled vehicle.
    #[must_use]
    pub fn player<'c>(ctx: &'c SimulationContext<'_>) -> &'c Player {
        &ctx.player
    }

    /// Live traffic in insertion order.
    #[must_use]
    pub fn traffic<'c>(ctx: &'c SimulationContext<'_>) -> &'c [Vehicle] {
        &ctx.traffic
    }

    /// Weather state.
    #[must_use]
    pub fn weather<'c>(ctx: &'c SimulationContext<'_>) -> &'c Weather {
        &ctx.weather
    }

    /// Whether it is raining.
    #[must_use]
    pub fn raining(ctx: &SimulationContext<'_>) -> bool {
        ctx.weather.raining()
    }

    /// Whether the wet-weather governor clamped the player on the last tick.
    #[must_use]
    pub fn speed_limited(ctx: &SimulationContext<'_>) -> bool {
        ctx.speed_limited
    }

    /// Number of ticks executed since the context was created.
    #[must_use]
    pub fn tick_index(ctx: &SimulationContext<'_>) -> u64 {
        ctx.tick_index
    }

    /// Seed the context's random number generator started from.
    #[must_use]
    pub fn seed(ctx: &SimulationContext<'_>) -> u64 {
        ctx.seed
    }

    /// Best race time known to the session.
    #[must_use]
    pub fn best_time(ctx: &SimulationContext<'_>) -> Option<f32> {
        ctx.session.best_time
    }

    /// Checkpoints crossed so far.
    #[must_use]
    pub fn level(ctx: &SimulationContext<'_>) -> u32 {
        ctx.session.level
    }

    /// Remaining checkpoint time budget in seconds.
    #[must_use]
    pub fn time_left(ctx: &SimulationContext<'_>) -> f32 {
        ctx.session.time_left
    }

    /// Seconds spent racing since the countdown ended.
    #[must_use]
    pub fn race_time(ctx: &SimulationContext<'_>) -> f32 {
        ctx.session.race_time
    }

    /// Hash of the physical state of every vehicle and the session counters.
    ///
    /// Two contexts fed the same seed and commands report the same value.
    #[must_use]
    pub fn fingerprint(ctx: &SimulationContext<'_>) -> u64 {
        let mut hasher = DefaultHasher::new();
        ctx.tick_index.hash(&mut hasher);
        ctx.session.phase.hash(&mut hasher);
        ctx.session.level.hash(&mut hasher);
        ctx.session.time_left.to_bits().hash(&mut hasher);
        hash_vehicle(ctx.player.vehicle(), &mut hasher);
        ctx.traffic.len().hash(&mut hasher);
        for vehicle in &ctx.traffic {
            hash_vehicle(vehicle, &mut hasher);
        }
        ctx.weather.raining().hash(&mut hasher);
        hasher.finish()
    }

    fn hash_vehicle(vehicle: &Vehicle, hasher: &mut DefaultHasher) {
        for value in vehicle
            .position
            .to_array()
            .into_iter()
            .chain(vehicle.velocity.to_array())
        {
            value.to_bits().hash(hasher);
        }
        vehicle.lane.hash(hasher);
        vehicle.braking.hash(hasher);
        vehicle.lane_offset.to_bits().hash(hasher);
    }
}
