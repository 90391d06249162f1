#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Driver-controlled vehicle: physics, collisions and checkpoint progress.
//!
//! [`Player::update`] runs one tick in a fixed order: checkpoint bookkeeping,
//! traffic collisions, input overrides, engine cadence, integration, ground
//! response, steering, session overrides and finally track objects. Later
//! steps deliberately override earlier ones.

pub mod input;

use std::collections::HashSet;

use arcade_racer_core::{
    lerp, percent, sign, uniform, Event, InputSample, Road, Session, SessionPhase, SoundCue,
    Timer, TrackObjectKey, TrackObjectKind, TrackSample, Vehicle, VehicleColor,
};
use glam::Vec3;
use log::debug;
use rand::Rng;

/// Paint of the player's car.
pub const PLAYER_COLOR: VehicleColor = VehicleColor::hsl(0.0, 1.0, 0.5);

const TITLE_SPEED: f32 = 20.0;

const GRAVITY: f32 = 3.0;
const FORWARD_DAMPING: f32 = 0.998;
const LATERAL_DAMPING: f32 = 0.5;
const ACCELERATION: f32 = 1.0;
const BRAKING: f32 = 2.0;
const MAX_SPEED: f32 = 200.0;
const CRAWL_SPEED: f32 = 30.0;
const CRAWL_DAMPING: f32 = 0.9;
const ELASTICITY: f32 = 1.2;

const HEADING_SCALE: f32 = 20.0;
const ROAD_MARGIN: f32 = 1_000.0;
const CENTRIFUGAL: f32 = 0.5;
const STATIC_FRICTION: f32 = 30.0;
const TURN_STRENGTH: f32 = 0.8;
const TURN_INPUT_SCALE: f32 = 0.4;
const TURN_VISUAL_START: f32 = 50.0;
const AUTOPILOT_RANGE: f32 = 2_000.0;

const SIDE_IMPULSE: f32 = 99.0;
const HIT_COOLDOWN: f32 = 0.5;
const CHECKPOINT_BEEPS: u32 = 3;
const CHECKPOINT_BEEP_INTERVAL: f32 = 0.26;

const OBJECT_SCAN_SEGMENTS: i64 = 20;
const OBJECT_REACH: f32 = 430.0;
const OBJECT_SIDE_MARGIN: f32 = 200.0;

/// Mutable state a running race shares with the player update.
pub struct Surroundings<'a> {
    /// Static track, level and rule data.
    pub road: Road<'a>,
    /// Race bookkeeping.
    pub session: &'a mut Session,
    /// Traffic the player can collide with.
    pub traffic: &'a mut [Vehicle],
    /// One-shot track objects already hit this race.
    pub consumed: &'a mut HashSet<TrackObjectKey>,
}

/// Per-tick memory of the player beyond the shared vehicle record.
#[derive(Clone, Debug, Default, PartialEq)]
struct DrivingState {
    player_turn: f32,
    on_ground: bool,
    engine_time: f32,
    bump_time: f32,
    hit_timer: Timer,
    checkpoint_beeps: u32,
    checkpoint_timer: Timer,
}

/// The single driver-controlled vehicle.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    vehicle: Vehicle,
    state: DrivingState,
}

impl Player {
    /// Creates a player at rest at longitudinal position `z`.
    #[must_use]
    pub fn new(z: f32) -> Self {
        Self {
            vehicle: Vehicle::player(z, PLAYER_COLOR),
            state: DrivingState::default(),
        }
    }

    /// Shared vehicle record.
    #[must_use]
    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    /// Mutable access to the shared vehicle record.
    pub fn vehicle_mut(&mut self) -> &mut Vehicle {
        &mut self.vehicle
    }

    /// Whether the car touched the road surface on the last tick.
    #[must_use]
    pub fn on_ground(&self) -> bool {
        self.state.on_ground
    }

    /// Advances the player's second-based timers by `dt`.
    pub fn advance(&mut self, dt: f32) {
        self.state.hit_timer.advance(dt);
        self.state.checkpoint_timer.advance(dt);
    }

    /// Runs one physics tick.
    pub fn update<R: Rng>(
        &mut self,
        input: InputSample,
        world: &mut Surroundings<'_>,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) {
        if world.session.is_title() {
            self.vehicle.velocity.z = TITLE_SPEED;
            self.vehicle.position.z += TITLE_SPEED;
            return;
        }

        let modifiers = world.session.modifiers;
        self.state.bump_time -= self.vehicle.velocity.z;

        if !modifiers.free_ride
            && self.state.checkpoint_beeps > 0
            && !self.state.checkpoint_timer.active()
        {
            out.push(sound(SoundCue::Checkpoint, 1.0, 1.0));
            self.state.checkpoint_timer.set(CHECKPOINT_BEEP_INTERVAL);
            self.state.checkpoint_beeps -= 1;
        }

        if !world.session.is_over() && self.vehicle.position.z > world.session.next_checkpoint {
            self.cross_checkpoint(world, out);
        }

        if !modifiers.test_drive {
            self.collide_with_traffic(world.traffic, out);
        }

        let game_over = world.session.is_over();
        let mut input = input;
        if modifiers.free_camera {
            input = InputSample::IDLE;
        }
        if modifiers.test_drive {
            input.gas = 1.0;
            input.turn = 0.0;
        }
        if game_over {
            input = InputSample::IDLE;
        }
        self.vehicle.braking = u32::from(input.brake > 0.0);

        self.run_engine(input, rng, out);

        let road = world.road;
        let here = road.track.sample(self.vehicle.position.z);
        let vehicle = &mut self.vehicle;

        vehicle.velocity.y -= GRAVITY;
        let speed_percent = vehicle.velocity.z / MAX_SPEED;

        let track_heading = (HEADING_SCALE * here.curvature).atan2(road.track.segment_length());
        let lane_span = 2.0 * road.rules.lane_width;
        let track_scaling = 1.0 / (1.0 + (vehicle.position.x / lane_span) * (-track_heading).tan());
        let mut adjusted = vehicle.velocity;
        adjusted.z *= track_scaling;
        vehicle.position += adjusted;

        if let Some(segment) = road.track.segment(here.segment_index) {
            let limit = segment.visual_width / 2.0 + ROAD_MARGIN;
            vehicle.position.x = vehicle.position.x.clamp(-limit, limit);
        }

        let was_on_ground = self.state.on_ground;
        self.state.on_ground = vehicle.position.y < here.height;
        if self.state.on_ground {
            vehicle.position.y = here.height;
            vehicle.pose.pitch = lerp(0.2, vehicle.pose.pitch, here.pitch);

            let normal = Vec3::new(0.0, here.pitch.cos(), here.pitch.sin());
            let reflect = normal * (-ELASTICITY * vehicle.velocity.dot(normal));
            if !game_over {
                vehicle.velocity += reflect;
            }
            if !was_on_ground {
                let volume = percent(reflect.length(), 20.0, 80.0) * 2.0;
                out.push(sound(SoundCue::Bump, volume, 0.5));
            }

            let off_road = road
                .track
                .segment(here.segment_index)
                .is_some_and(|segment| !segment.side_street)
                && vehicle.position.x.abs() > here.width - vehicle.collision_half_extents.x;
            if off_road && !modifiers.test_drive {
                hit_bump(vehicle, &mut self.state, 0.98, rng, out);
            }

            if input.brake > 0.0 {
                vehicle.velocity.z -= BRAKING * input.brake;
            } else if input.gas > 0.0 {
                let low_speed = percent(vehicle.velocity.z, 150.0, 0.0).powi(2);
                vehicle.velocity.z += input.gas
                    * ACCELERATION
                    * lerp(speed_percent, 1.0, 0.5)
                    * lerp(low_speed, 1.0, 3.0);
            } else if vehicle.velocity.z < CRAWL_SPEED {
                vehicle.velocity.z *= CRAWL_DAMPING;
            }

            vehicle.velocity.z = (vehicle.velocity.z * FORWARD_DAMPING).max(0.0);
            vehicle.velocity.x *= LATERAL_DAMPING;
        } else {
            vehicle.pose.pitch *= 0.99;
        }

        self.steer(input, &here, adjusted.z, world.session);

        let vehicle = &mut self.vehicle;
        if world.session.phase == SessionPhase::Won {
            vehicle.pose.turn = lerp(world.session.game_over.elapsed(), vehicle.pose.turn, -1.0);
        }
        if world.session.counting_down() {
            vehicle.velocity.z = 0.0;
        }
        if game_over {
            vehicle.velocity *= 0.95;
        }

        if !modifiers.test_drive {
            self.collide_with_objects(&here, world, rng, out);
        }
    }

    fn cross_checkpoint(&mut self, world: &mut Surroundings<'_>, out: &mut Vec<Event>) {
        let rules = world.road.rules;
        let session = &mut *world.session;

        let previous = session.level;
        session.level += 1;
        session.next_checkpoint += rules.checkpoint_distance;
        session.time_left += rules.extra_checkpoint_time;
        if session.modifiers.enhanced {
            session.time_left = session.time_left.min(rules.enhanced_time_cap);
        }
        debug!(
            "checkpoint {} reached with {:.1}s left",
            session.level, session.time_left
        );
        out.push(Event::CheckpointReached {
            level: session.level,
            time_left: session.time_left,
        });

        if previous == 1 && session.level == 2 {
            out.push(Event::RainForced);
        }

        if session.level < rules.level_goal {
            self.state.checkpoint_beeps = CHECKPOINT_BEEPS;
            return;
        }

        session.finish(SessionPhase::Won);
        out.push(sound(SoundCue::Win, 1.0, 1.0));
        let persist = !session.modifiers.debug_skipped && !session.modifiers.free_ride;
        if persist {
            if session.best_time.map_or(true, |best| session.race_time < best) {
                session.best_time = Some(session.race_time);
                session.new_record = true;
            }
            out.push(Event::SaveRequested {
                best_time: session.best_time,
            });
        }
        debug!("race won in {:.2}s", session.race_time);
        out.push(Event::RaceWon {
            race_time: session.race_time,
            new_record: session.new_record,
        });
    }

    /// Resolves box overlaps against `traffic`, pushing both vehicles apart.
    pub fn collide_with_traffic(&mut self, traffic: &mut [Vehicle], out: &mut Vec<Event>) {
        for other in traffic.iter_mut() {
            let delta = self.vehicle.position - other.position;
            let reach = self.vehicle.collision_half_extents + other.collision_half_extents;
            if delta.x.abs() >= reach.x || delta.z.abs() >= reach.z {
                continue;
            }

            let speed = self.vehicle.velocity.z;
            let reference = if other.velocity.z > 0.0 {
                other.velocity.z
            } else {
                speed
            };
            self.vehicle.velocity.z = 0.5 * reference;
            other.velocity.z = other.velocity.z.max(0.9 * speed);
            self.vehicle.velocity.x = SIDE_IMPULSE * sign(delta.x);
            play_hit(&self.vehicle, &mut self.state, out);
            out.push(Event::CollisionPenalty);
        }
    }

    fn run_engine<R: Rng>(&mut self, input: InputSample, rng: &mut R, out: &mut Vec<Event>) {
        let revs = (40.0 + input.gas * 50.0).max(self.vehicle.velocity.z);
        self.state.engine_time += revs * revs / 5e4;
        if self.state.engine_time > 1.0 {
            self.state.engine_time -= 1.0;
            if self.state.engine_time > 1.0 {
                self.state.engine_time = 0.0;
            }
            let pitch = revs * revs / 4e3 + uniform(rng, 0.0, 0.1);
            out.push(sound(SoundCue::Engine, 0.1, pitch));
        }
    }

    fn steer(
        &mut self,
        input: InputSample,
        here: &TrackSample,
        forward: f32,
        session: &Session,
    ) {
        let vehicle = &mut self.vehicle;
        let mut desired = if session.counting_down() {
            0.0
        } else {
            input.turn
        };
        if session.modifiers.test_drive {
            desired = (-vehicle.position.x / AUTOPILOT_RANGE).clamp(-1.0, 1.0);
            vehicle.position.x = vehicle.position.x.clamp(-here.width, here.width);
        }
        desired *= TURN_INPUT_SCALE;

        let visual_ramp = (vehicle.velocity.z / TURN_VISUAL_START).clamp(0.0, 0.1);
        vehicle.pose.wheel_turn = lerp(0.1, vehicle.pose.wheel_turn, 1.3 * desired);
        self.state.player_turn = lerp(0.05, self.state.player_turn, desired);
        vehicle.pose.turn = lerp(visual_ramp, vehicle.pose.turn, self.state.player_turn);

        let centripetal = -forward * here.curvature * CENTRIFUGAL;
        vehicle.position.x += centripetal;

        let physics_turn = if self.state.on_ground {
            self.state.player_turn
        } else {
            0.0
        };
        let slip = STATIC_FRICTION / STATIC_FRICTION.max(centripetal.abs());
        vehicle.velocity.x += TURN_STRENGTH * physics_turn * vehicle.velocity.z * slip;
    }

    fn collide_with_objects<R: Rng>(
        &mut self,
        here: &TrackSample,
        world: &mut Surroundings<'_>,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) {
        let track = world.road.track;
        for offset in -OBJECT_SCAN_SEGMENTS..OBJECT_SCAN_SEGMENTS {
            let segment_index = here.segment_index + offset;
            let Some(segment) = track.segment(segment_index) else {
                continue;
            };

            for (object_index, object) in segment.objects.iter().enumerate() {
                let key = TrackObjectKey::new(segment_index, object_index);
                if object.collide_size == 0.0 || world.consumed.contains(&key) {
                    continue;
                }

                let position = segment.origin + object.offset;
                let delta = self.vehicle.position - position;
                let reach = self.vehicle.collision_half_extents.x + object.collide_size;
                if delta.z.abs() > OBJECT_REACH || delta.x.abs() > reach {
                    continue;
                }

                match object.kind {
                    TrackObjectKind::Bump => {
                        let _ = world.consumed.insert(key);
                        hit_bump(&mut self.vehicle, &mut self.state, 0.8, rng, out);
                    }
                    TrackObjectKind::Slow => {
                        let _ = world.consumed.insert(key);
                        let volume = percent(self.vehicle.velocity.z, 0.0, 50.0) * 3.0;
                        out.push(sound(SoundCue::Bump, volume, 0.2));
                        self.vehicle.velocity.z *= 0.85;
                    }
                    TrackObjectKind::Solid => {
                        let on_side =
                            position.x.abs() + reach + OBJECT_SIDE_MARGIN > here.width;
                        let push = if on_side { -position.x } else { delta.x };
                        self.vehicle.velocity.x = SIDE_IMPULSE * sign(push);
                        self.vehicle.velocity.z *= 0.7;
                        play_hit(&self.vehicle, &mut self.state, out);
                    }
                }
            }
        }
    }
}

fn sound(cue: SoundCue, volume: f32, pitch: f32) -> Event {
    Event::SoundRequested { cue, volume, pitch }
}

fn play_hit(vehicle: &Vehicle, state: &mut DrivingState, out: &mut Vec<Event>) {
    if state.hit_timer.active() {
        return;
    }
    out.push(sound(
        SoundCue::Hit,
        percent(vehicle.velocity.z, 0.0, 50.0),
        1.0,
    ));
    state.hit_timer.set(HIT_COOLDOWN);
}

/// Scales forward speed by `amount` and, outside the bump cooldown, kicks the car upwards.
fn hit_bump<R: Rng>(
    vehicle: &mut Vehicle,
    state: &mut DrivingState,
    amount: f32,
    rng: &mut R,
    out: &mut Vec<Event>,
) {
    vehicle.velocity.z *= amount;
    if state.bump_time >= 0.0 {
        return;
    }
    out.push(sound(
        SoundCue::Bump,
        percent(vehicle.velocity.z, 0.0, 50.0),
        1.0,
    ));
    state.bump_time = 500.0 * uniform(rng, 1.0, 1.5);
    vehicle.velocity.y += vehicle.velocity.z.min(50.0) * uniform(rng, 0.1, 0.2);
}
