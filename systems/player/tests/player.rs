use std::collections::HashSet;

use arcade_racer_core::{
    Event, InputSample, LevelInfo, LevelTable, Modifiers, RaceRules, Road, Session, SessionPhase,
    SoundCue, TrackObject, TrackObjectKey, TrackObjectKind, TrackQuery, TrackSample, TrackSegment,
    Vehicle, VehicleClass, VehicleColor, TICK_SECONDS,
};
use arcade_racer_player::{Player, Surroundings};
use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const SEGMENT_LENGTH: f32 = 100.0;
const HALF_WIDTH: f32 = 2_000.0;

struct FlatTrack {
    segments: Vec<TrackSegment>,
    curvature: f32,
}

impl FlatTrack {
    fn new() -> Self {
        let segments = (0..200)
            .map(|index| TrackSegment {
                origin: Vec3::new(0.0, 0.0, index as f32 * SEGMENT_LENGTH),
                visual_width: 6_000.0,
                side_street: false,
                objects: Vec::new(),
            })
            .collect();
        Self {
            segments,
            curvature: 0.0,
        }
    }

    fn with_curvature(mut self, curvature: f32) -> Self {
        self.curvature = curvature;
        self
    }

    fn with_object(mut self, segment: usize, object: TrackObject) -> Self {
        self.segments[segment].objects.push(object);
        self
    }
}

impl TrackQuery for FlatTrack {
    fn segment_length(&self) -> f32 {
        SEGMENT_LENGTH
    }

    fn sample(&self, z: f32) -> TrackSample {
        let mut sample = TrackSample::flat(z, SEGMENT_LENGTH);
        sample.width = HALF_WIDTH;
        sample.curvature = self.curvature;
        sample
    }

    fn segment(&self, index: i64) -> Option<&TrackSegment> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.segments.get(index))
    }
}

struct OneLevel;

impl LevelTable for OneLevel {
    fn level_info(&self, _progress: f32) -> LevelInfo {
        LevelInfo {
            lane_count: 3,
            traffic_density: 1.0,
        }
    }
}

struct Rig {
    rules: RaceRules,
    track: FlatTrack,
    session: Session,
    traffic: Vec<Vehicle>,
    consumed: HashSet<TrackObjectKey>,
    rng: ChaCha8Rng,
    events: Vec<Event>,
}

impl Rig {
    fn racing(modifiers: Modifiers) -> Self {
        Self::with_rules(RaceRules::default(), modifiers)
    }

    fn with_rules(rules: RaceRules, modifiers: Modifiers) -> Self {
        let mut session = Session::race(&rules, modifiers, None);
        session.phase = SessionPhase::Racing;
        session.countdown.clear();
        Self {
            rules,
            track: FlatTrack::new(),
            session,
            traffic: Vec::new(),
            consumed: HashSet::new(),
            rng: ChaCha8Rng::seed_from_u64(42),
            events: Vec::new(),
        }
    }

    fn tick(&mut self, player: &mut Player, input: InputSample) {
        let road = Road::new(&self.rules, &OneLevel, &self.track);
        let mut world = Surroundings {
            road,
            session: &mut self.session,
            traffic: &mut self.traffic,
            consumed: &mut self.consumed,
        };
        player.update(input, &mut world, &mut self.rng, &mut self.events);
        player.advance(TICK_SECONDS);
    }

    fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }

    fn sounds(&self, cue: SoundCue) -> usize {
        self.count(|event| matches!(event, Event::SoundRequested { cue: c, .. } if *c == cue))
    }
}

fn player_at(z: f32, speed: f32) -> Player {
    let mut player = Player::new(z);
    player.vehicle_mut().velocity.z = speed;
    player
}

#[test]
fn only_the_second_checkpoint_forces_rain() {
    let mut rig = Rig::racing(Modifiers::default());
    let distance = rig.rules.checkpoint_distance;
    let mut player = player_at(distance + 1.0, 0.0);

    rig.tick(&mut player, InputSample::IDLE);
    assert_eq!(rig.session.level, 1);
    assert_eq!(rig.count(|event| *event == Event::RainForced), 0);

    player.vehicle_mut().position.z = 2.0 * distance + 1.0;
    rig.tick(&mut player, InputSample::IDLE);
    assert_eq!(rig.session.level, 2);
    assert_eq!(rig.count(|event| *event == Event::RainForced), 1);

    player.vehicle_mut().position.z = 3.0 * distance + 1.0;
    rig.tick(&mut player, InputSample::IDLE);
    assert_eq!(rig.session.level, 3);
    assert_eq!(rig.count(|event| *event == Event::RainForced), 1);
    assert_eq!(
        rig.count(|event| matches!(event, Event::CheckpointReached { .. })),
        3
    );
}

#[test]
fn checkpoints_extend_the_time_bank_and_beep_three_times() {
    let mut rig = Rig::racing(Modifiers::default());
    rig.session.time_left = 10.0;
    let mut player = player_at(rig.rules.checkpoint_distance + 1.0, 0.0);

    rig.tick(&mut player, InputSample::IDLE);
    assert_eq!(rig.session.time_left, 50.0);

    for _ in 0..60 {
        rig.tick(&mut player, InputSample::IDLE);
    }
    assert_eq!(rig.sounds(SoundCue::Checkpoint), 3);
}

#[test]
fn enhanced_mode_caps_the_time_bank() {
    let modifiers = Modifiers {
        enhanced: true,
        ..Modifiers::default()
    };
    let mut rig = Rig::racing(modifiers);
    rig.session.time_left = 90.0;
    let mut player = player_at(rig.rules.checkpoint_distance + 1.0, 0.0);

    rig.tick(&mut player, InputSample::IDLE);
    assert_eq!(rig.session.time_left, 100.0);
}

#[test]
fn reaching_the_goal_wins_and_records_the_best_time() {
    let rules = RaceRules {
        level_goal: 2,
        ..RaceRules::default()
    };
    let mut rig = Rig::with_rules(rules, Modifiers::default());
    rig.session.level = 1;
    rig.session.next_checkpoint = 2.0 * rig.rules.checkpoint_distance;
    rig.session.race_time = 55.0;
    rig.session.best_time = Some(60.0);
    let mut player = player_at(2.0 * rig.rules.checkpoint_distance + 1.0, 0.0);

    rig.tick(&mut player, InputSample::IDLE);

    assert_eq!(rig.session.phase, SessionPhase::Won);
    assert!(rig.session.is_over());
    assert_eq!(rig.session.best_time, Some(55.0));
    assert!(rig.events.contains(&Event::SaveRequested {
        best_time: Some(55.0)
    }));
    assert!(rig.events.contains(&Event::RaceWon {
        race_time: 55.0,
        new_record: true
    }));
    assert_eq!(rig.sounds(SoundCue::Win), 1);
}

#[test]
fn free_ride_wins_are_not_persisted() {
    let rules = RaceRules {
        level_goal: 1,
        ..RaceRules::default()
    };
    let modifiers = Modifiers {
        free_ride: true,
        ..Modifiers::default()
    };
    let mut rig = Rig::with_rules(rules, modifiers);
    let mut player = player_at(rig.rules.checkpoint_distance + 1.0, 0.0);

    rig.tick(&mut player, InputSample::IDLE);

    assert_eq!(rig.session.phase, SessionPhase::Won);
    assert_eq!(
        rig.count(|event| matches!(event, Event::SaveRequested { .. })),
        0
    );
    assert!(rig.events.contains(&Event::RaceWon {
        race_time: 0.0,
        new_record: false
    }));
}

#[test]
fn collision_halves_speed_and_shoves_both_cars() {
    let mut player = player_at(1_000.0, 100.0);
    player.vehicle_mut().position.x = 10.0;
    let mut traffic = vec![Vehicle::traffic(
        1_000.0,
        VehicleClass::Car,
        VehicleColor::WHITE,
    )];
    let mut events = Vec::new();

    player.collide_with_traffic(&mut traffic, &mut events);

    assert_eq!(player.vehicle().velocity.z, 50.0);
    assert_eq!(traffic[0].velocity.z, 90.0);
    assert_eq!(player.vehicle().velocity.x, 99.0);
    assert!(events.contains(&Event::CollisionPenalty));

    let mut fast = vec![Vehicle::traffic(
        1_000.0,
        VehicleClass::Car,
        VehicleColor::WHITE,
    )];
    fast[0].velocity.z = 150.0;
    fast[0].position.x = 50.0;
    player.collide_with_traffic(&mut fast, &mut events);
    assert_eq!(player.vehicle().velocity.z, 75.0);
    assert_eq!(fast[0].velocity.z, 150.0);
    assert_eq!(player.vehicle().velocity.x, -99.0);
}

#[test]
fn rear_ending_moving_traffic_drops_to_half_its_speed() {
    let mut player = player_at(1_000.0, 200.0);
    let mut traffic = vec![Vehicle::traffic(
        1_300.0,
        VehicleClass::Car,
        VehicleColor::WHITE,
    )];
    traffic[0].velocity.z = 120.0;
    let mut events = Vec::new();

    player.collide_with_traffic(&mut traffic, &mut events);

    assert_eq!(player.vehicle().velocity.z, 60.0);
    assert_eq!(traffic[0].velocity.z, 180.0);
    assert_eq!(player.vehicle().velocity.x, 99.0);
    assert_eq!(events.iter().filter(|e| **e == Event::CollisionPenalty).count(), 1);
}

#[test]
fn separated_cars_do_not_collide() {
    let mut player = player_at(1_000.0, 100.0);
    let mut traffic = vec![Vehicle::traffic(
        1_800.0,
        VehicleClass::Car,
        VehicleColor::WHITE,
    )];
    let mut events = Vec::new();

    player.collide_with_traffic(&mut traffic, &mut events);

    assert_eq!(player.vehicle().velocity.z, 100.0);
    assert!(events.is_empty());
}

#[test]
fn test_drive_ignores_traffic() {
    let modifiers = Modifiers {
        test_drive: true,
        ..Modifiers::default()
    };
    let mut rig = Rig::racing(modifiers);
    rig.traffic
        .push(Vehicle::traffic(1_000.0, VehicleClass::Car, VehicleColor::WHITE));
    let mut player = player_at(1_000.0, 100.0);

    rig.tick(&mut player, InputSample::IDLE);

    assert_eq!(rig.traffic[0].velocity.z, 0.0);
    assert_eq!(rig.count(|event| *event == Event::CollisionPenalty), 0);
    assert!(player.vehicle().velocity.z > 99.0);
}

#[test]
fn countdown_pins_the_player_in_place() {
    let mut rig = Rig::racing(Modifiers::default());
    rig.session = Session::race(&rig.rules, Modifiers::default(), None);
    let mut player = player_at(0.0, 0.0);

    for _ in 0..30 {
        rig.tick(&mut player, InputSample::full_gas());
    }
    assert_eq!(player.vehicle().velocity.z, 0.0);
    assert_eq!(player.vehicle().position.z, 0.0);
}

#[test]
fn title_screen_cruises_at_fixed_speed() {
    let mut rig = Rig::racing(Modifiers::default());
    rig.session = Session::title(&rig.rules, None);
    let mut player = player_at(500.0, 90.0);

    rig.tick(&mut player, InputSample::full_gas());

    assert_eq!(player.vehicle().velocity.z, 20.0);
    assert_eq!(player.vehicle().position.z, 520.0);
    assert!(rig.events.is_empty());
}

#[test]
fn full_throttle_accelerates_and_revs_the_engine() {
    let mut rig = Rig::racing(Modifiers::default());
    let mut player = player_at(0.0, 0.0);

    for _ in 0..60 {
        rig.tick(&mut player, InputSample::full_gas());
    }
    let speed = player.vehicle().velocity.z;
    assert!(speed > 50.0 && speed < 200.0, "speed {speed}");
    assert!(player.on_ground());
    assert!(rig.sounds(SoundCue::Engine) >= 8);
}

#[test]
fn brakes_bring_the_car_to_a_stop() {
    let mut rig = Rig::racing(Modifiers::default());
    let mut player = player_at(0.0, 40.0);
    let brake = InputSample {
        brake: 1.0,
        ..InputSample::IDLE
    };

    for _ in 0..30 {
        rig.tick(&mut player, brake);
    }
    assert_eq!(player.vehicle().velocity.z, 0.0);
    assert_eq!(player.vehicle().braking, 1);
}

#[test]
fn leaving_the_road_costs_speed() {
    let mut rig = Rig::racing(Modifiers::default());
    let mut player = player_at(1_000.0, 60.0);
    player.vehicle_mut().position.x = 1_900.0;

    rig.tick(&mut player, InputSample::IDLE);

    assert!(player.vehicle().velocity.z < 60.0 * 0.99);
    assert!(rig.count(|event| matches!(
        event,
        Event::SoundRequested { cue: SoundCue::Bump, pitch, .. } if *pitch == 1.0
    )) == 1);
}

#[test]
fn slow_patches_only_act_once() {
    let mut rig = Rig::racing(Modifiers::default());
    rig.track = FlatTrack::new().with_object(
        10,
        TrackObject {
            offset: Vec3::ZERO,
            collide_size: 100.0,
            kind: TrackObjectKind::Slow,
        },
    );
    let mut player = player_at(1_000.0, 50.0);

    rig.tick(&mut player, InputSample::IDLE);
    let after_first = player.vehicle().velocity.z;
    assert!((after_first - 50.0 * 0.998 * 0.85).abs() < 1e-3);
    assert!(rig.consumed.contains(&TrackObjectKey::new(10, 0)));

    rig.tick(&mut player, InputSample::IDLE);
    let slow_sounds = rig.count(|event| matches!(
        event,
        Event::SoundRequested { cue: SoundCue::Bump, pitch, .. } if *pitch == 0.2
    ));
    assert_eq!(slow_sounds, 1);
    assert!(player.vehicle().velocity.z > after_first * 0.99);
}

#[test]
fn solid_objects_push_the_player_away() {
    let mut rig = Rig::racing(Modifiers::default());
    rig.track = FlatTrack::new().with_object(
        10,
        TrackObject {
            offset: Vec3::ZERO,
            collide_size: 100.0,
            kind: TrackObjectKind::Solid,
        },
    );
    let mut player = player_at(1_000.0, 50.0);
    player.vehicle_mut().position.x = 50.0;

    rig.tick(&mut player, InputSample::IDLE);

    assert_eq!(player.vehicle().velocity.x, 99.0);
    assert!((player.vehicle().velocity.z - 50.0 * 0.998 * 0.7).abs() < 1e-3);
    assert_eq!(rig.sounds(SoundCue::Hit), 1);
    assert!(rig.consumed.is_empty());
}

#[test]
fn finished_races_ignore_input_and_coast_down() {
    let mut rig = Rig::racing(Modifiers::default());
    rig.session.finish(SessionPhase::TimedOut);
    let mut player = player_at(0.0, 100.0);

    for _ in 0..10 {
        rig.tick(&mut player, InputSample::full_gas());
    }
    assert!(player.vehicle().velocity.z < 100.0 * 0.95_f32.powi(9));
}

fn close(actual: f32, expected: f32) -> bool {
    (actual - expected).abs() < 1e-3
}

#[test]
fn steering_smooths_the_wheel_and_builds_lateral_speed() {
    let mut rig = Rig::racing(Modifiers::default());
    let mut player = player_at(1_000.0, 100.0);
    let right = InputSample {
        turn: 1.0,
        ..InputSample::IDLE
    };

    rig.tick(&mut player, right);

    let vehicle = player.vehicle();
    assert!(close(vehicle.pose.wheel_turn, 0.052), "{}", vehicle.pose.wheel_turn);
    assert!(close(vehicle.velocity.z, 99.8));
    assert!(close(vehicle.velocity.x, 1.5968), "{}", vehicle.velocity.x);
    assert_eq!(vehicle.position.x, 0.0);
}

#[test]
fn curves_push_outwards_and_cap_the_turn_force() {
    let mut rig = Rig::racing(Modifiers::default());
    rig.track = FlatTrack::new().with_curvature(2.0);
    let mut player = player_at(1_000.0, 150.0);
    let right = InputSample {
        turn: 1.0,
        ..InputSample::IDLE
    };

    rig.tick(&mut player, right);

    let vehicle = player.vehicle();
    assert!(close(vehicle.position.x, -150.0), "{}", vehicle.position.x);
    assert!(close(vehicle.velocity.x, 0.8 * 0.02 * 149.7 * 0.2), "{}", vehicle.velocity.x);
}

#[test]
fn curve_heading_scales_forward_progress_off_centre() {
    let mut rig = Rig::racing(Modifiers::default());
    rig.track = FlatTrack::new().with_curvature(2.0);
    let mut player = player_at(1_000.0, 60.0);
    player.vehicle_mut().position.x = 2.0 * rig.rules.lane_width;

    rig.tick(&mut player, InputSample::IDLE);

    let travelled = player.vehicle().position.z - 1_000.0;
    assert!(close(travelled, 100.0), "travelled {travelled}");
}

#[test]
fn lateral_position_is_clamped_beside_the_road() {
    let mut rig = Rig::racing(Modifiers::default());
    let mut player = player_at(1_000.0, 0.0);
    player.vehicle_mut().position.x = 5_000.0;

    rig.tick(&mut player, InputSample::IDLE);
    assert_eq!(player.vehicle().position.x, 4_000.0);

    player.vehicle_mut().position.x = -3_900.0;
    player.vehicle_mut().velocity.x = -500.0;
    rig.tick(&mut player, InputSample::IDLE);
    assert_eq!(player.vehicle().position.x, -4_000.0);
}

#[test]
fn landing_bounces_once_then_pitch_levels_out_in_the_air() {
    let mut rig = Rig::racing(Modifiers::default());
    let mut player = player_at(1_000.0, 0.0);
    player.vehicle_mut().velocity.y = -40.0;

    rig.tick(&mut player, InputSample::IDLE);
    assert!(player.on_ground());
    assert!(close(player.vehicle().velocity.y, 8.6), "{}", player.vehicle().velocity.y);
    assert_eq!(player.vehicle().position.y, 0.0);
    assert_eq!(rig.sounds(SoundCue::Bump), 1);

    player.vehicle_mut().pose.pitch = 0.5;
    let right = InputSample {
        turn: 1.0,
        ..InputSample::IDLE
    };
    rig.tick(&mut player, right);
    assert!(!player.on_ground());
    assert!(close(player.vehicle().pose.pitch, 0.495));
    assert_eq!(player.vehicle().velocity.x, 0.0);
    assert_eq!(rig.sounds(SoundCue::Bump), 1);
}

#[test]
fn winning_spins_the_car_out() {
    let mut rig = Rig::racing(Modifiers::default());
    rig.session.finish(SessionPhase::Won);
    let mut player = player_at(1_000.0, 0.0);

    rig.session.game_over.advance(0.5);
    rig.tick(&mut player, InputSample::IDLE);
    assert!(close(player.vehicle().pose.turn, -0.5));

    rig.session.game_over.advance(1.0);
    rig.tick(&mut player, InputSample::IDLE);
    assert_eq!(player.vehicle().pose.turn, -1.0);
}
