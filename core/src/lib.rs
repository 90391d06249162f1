#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the arcade racer simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative simulation context, and the per-concern systems. Adapters
//! submit [`Command`] values describing desired mutations, the world executes
//! those commands via its `apply` entry point, and then reports [`Event`]
//! values for sound, weather, persistence and HUD collaborators to consume.
//! Track geometry and level data are borrowed through the [`TrackQuery`] and
//! [`LevelTable`] traits so the simulation never owns static content.

use std::str::FromStr;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of simulation ticks executed per simulated second.
pub const TICK_RATE: u32 = 60;

/// Duration of a single simulation tick expressed in seconds.
pub const TICK_SECONDS: f32 = 1.0 / TICK_RATE as f32;

/// Collision half extents shared by every passenger car.
pub const CAR_HALF_EXTENTS: Vec3 = Vec3::new(230.0, 200.0, 380.0);

/// Longitudinal collision half extent of a truck.
pub const TRUCK_HALF_LENGTH: f32 = 450.0;

/// Top-level phase of the racing session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Attract loop shown behind the title screen; the player auto-drives.
    Title,
    /// Pre-race countdown; the player is pinned in place.
    Countdown,
    /// Active race with checkpoints and a time budget.
    Racing,
    /// The level goal was reached.
    Won,
    /// The checkpoint time budget ran out.
    TimedOut,
}

impl SessionPhase {
    /// Reports whether the session has ended and the game-over timer applies.
    #[must_use]
    pub const fn is_over(self) -> bool {
        matches!(self, Self::Won | Self::TimedOut)
    }
}

/// Orthogonal session flags that suppress specific transitions.
///
/// Precedence when several flags touch the same control is fixed: free camera
/// zeroes input first, test drive then forces its autopilot input, and a
/// finished session finally zeroes everything again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    /// No time budget, no checkpoint beeps and no best-time persistence.
    pub free_ride: bool,
    /// Autopilot drives the player and skips collision checks.
    pub test_drive: bool,
    /// Detached camera; the player receives no input.
    pub free_camera: bool,
    /// Caps the checkpoint time bank.
    pub enhanced: bool,
    /// Set when a debug level skip was used; disables best-time persistence.
    pub debug_skipped: bool,
}

/// Normalized driver controls for a single tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSample {
    /// Steering in `[-1, 1]`, positive to the right.
    pub turn: f32,
    /// Throttle in `[0, 1]`.
    pub gas: f32,
    /// Brake in `[0, 1]`.
    pub brake: f32,
}

impl InputSample {
    /// Input with every control released.
    pub const IDLE: Self = Self {
        turn: 0.0,
        gas: 0.0,
        brake: 0.0,
    };

    /// Full throttle with centred steering.
    #[must_use]
    pub const fn full_gas() -> Self {
        Self {
            turn: 0.0,
            gas: 1.0,
            brake: 0.0,
        }
    }
}

/// Commands that express all permissible simulation mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Resets the session and begins the pre-race countdown.
    StartRace {
        /// Flags applied for the whole race.
        modifiers: Modifiers,
    },
    /// Resets the session into the attract loop behind the title screen.
    EnterTitleScreen,
    /// Advances the simulation by exactly one tick.
    Tick {
        /// Merged driver input sampled by the host for this tick.
        input: InputSample,
    },
    /// Toggles rain unless it has been forced on by the course.
    ToggleRain,
    /// Enables or disables the detached free camera.
    SetFreeCamera {
        /// Whether the free camera should be active.
        enabled: bool,
    },
    /// Hands control back to the driver while test drive is active.
    DisengageTestDrive,
    /// Seeds the best time restored by the save collaborator.
    LoadBestTime {
        /// Previously persisted best race time in seconds.
        best_time: Option<f32>,
    },
}

/// Sound effects the simulation may request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SoundCue {
    /// Countdown beep.
    Beep,
    /// Engine pulse.
    Engine,
    /// Vehicle or obstacle crash.
    Hit,
    /// Bump, landing or rough ground.
    Bump,
    /// Checkpoint chime.
    Checkpoint,
    /// Victory fanfare.
    Win,
    /// Time-out jingle.
    Lose,
    /// Ambient rain.
    Rain,
    /// Rain splash.
    Splash,
    /// Wet-weather speed limit warning.
    SpeedLimit,
}

impl SoundCue {
    /// Every cue in declaration order.
    pub const ALL: [SoundCue; 10] = [
        SoundCue::Beep,
        SoundCue::Engine,
        SoundCue::Hit,
        SoundCue::Bump,
        SoundCue::Checkpoint,
        SoundCue::Win,
        SoundCue::Lose,
        SoundCue::Rain,
        SoundCue::Splash,
        SoundCue::SpeedLimit,
    ];

    /// Stable lowercase name of the cue.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Beep => "beep",
            Self::Engine => "engine",
            Self::Hit => "hit",
            Self::Bump => "bump",
            Self::Checkpoint => "checkpoint",
            Self::Win => "win",
            Self::Lose => "lose",
            Self::Rain => "rain",
            Self::Splash => "splash",
            Self::SpeedLimit => "speed-limit",
        }
    }
}

impl FromStr for SoundCue {
    type Err = UnknownSoundCue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cue| cue.name() == value)
            .ok_or_else(|| UnknownSoundCue(value.to_owned()))
    }
}

/// Error returned when parsing a [`SoundCue`] from an unknown name.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown sound cue `{0}`")]
pub struct UnknownSoundCue(pub String);

/// Events reported by the simulation after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced by one tick.
    TimeAdvanced {
        /// Index of the tick that just completed.
        tick: u64,
    },
    /// Requests playback of a pre-synthesized sound.
    SoundRequested {
        /// Sound to play.
        cue: SoundCue,
        /// Playback volume multiplier.
        volume: f32,
        /// Playback pitch multiplier before per-sound randomness.
        pitch: f32,
    },
    /// The pre-race countdown expired and racing began.
    CountdownFinished,
    /// The player crossed a checkpoint.
    CheckpointReached {
        /// Level counter after the crossing.
        level: u32,
        /// Remaining time budget after the bonus was applied.
        time_left: f32,
    },
    /// The weather collaborator must start rain immediately.
    RainForced,
    /// The player collided with traffic; the scoring display applies a penalty.
    CollisionPenalty,
    /// The player reached the level goal.
    RaceWon {
        /// Total race time in seconds.
        race_time: f32,
        /// Whether the race time beat the stored best time.
        new_record: bool,
    },
    /// The save collaborator should persist the best time.
    SaveRequested {
        /// Best time to persist, if any.
        best_time: Option<f32>,
    },
    /// The checkpoint time budget ran out.
    RaceTimedOut,
    /// The wet-weather governor clamped the player's speed.
    SpeedLimited {
        /// Forward speed before clamping.
        speed: f32,
    },
    /// A traffic vehicle entered the simulation.
    TrafficSpawned {
        /// Longitudinal spawn position.
        z: f32,
    },
    /// A traffic vehicle reached a non-finite state and was removed.
    VehicleFaulted,
}

/// Broad body class of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum VehicleClass {
    /// Passenger car.
    Car,
    /// Truck carrying a cargo box painted in its own colour.
    Truck {
        /// Colour of the cargo box.
        cargo: VehicleColor,
    },
}

/// HSL paint colour applied to a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleColor {
    /// Hue in `[0, 1)`.
    pub hue: f32,
    /// Saturation in `[0, 1]`.
    pub saturation: f32,
    /// Lightness in `[0, 1]`.
    pub lightness: f32,
}

impl VehicleColor {
    /// Pure white paint.
    pub const WHITE: Self = Self::hsl(0.0, 0.0, 1.0);

    /// Creates a colour from HSL components.
    #[must_use]
    pub const fn hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        Self {
            hue,
            saturation,
            lightness,
        }
    }
}

/// Which update algorithm drives a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Controller {
    /// Lane-following traffic.
    Traffic,
    /// The single driver-controlled vehicle.
    Player,
}

/// Visual orientation derived from physics; never fed back into the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Body heading in radians.
    pub turn: f32,
    /// Body pitch in radians.
    pub pitch: f32,
    /// Front wheel steering angle in radians.
    pub wheel_turn: f32,
}

/// Shared vehicle record used for traffic and the player alike.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Lateral x, vertical y and longitudinal z (race progress) position.
    pub position: Vec3,
    /// Per-tick velocity; z is forward speed.
    pub velocity: Vec3,
    /// Half extents used for box overlap tests.
    pub collision_half_extents: Vec3,
    /// Lane index on the current segment.
    pub lane: u32,
    /// Smoothed lateral offset of the lane from the centreline.
    pub lane_offset: f32,
    /// Remaining braking ticks; non-zero lights the brake lamps.
    pub braking: u32,
    /// Marks the vehicle for removal at the end of the tick.
    pub destroyed: bool,
    /// Visual orientation.
    pub pose: Pose,
    /// Body class.
    pub class: VehicleClass,
    /// Body paint.
    pub color: VehicleColor,
    /// Update algorithm tag.
    pub controller: Controller,
}

impl Vehicle {
    /// Creates a traffic vehicle at rest at the provided longitudinal position.
    #[must_use]
    pub fn traffic(z: f32, class: VehicleClass, color: VehicleColor) -> Self {
        let mut collision_half_extents = CAR_HALF_EXTENTS;
        if matches!(class, VehicleClass::Truck { .. }) {
            collision_half_extents.z = TRUCK_HALF_LENGTH;
        }
        Self {
            position: Vec3::new(0.0, 0.0, z),
            velocity: Vec3::ZERO,
            collision_half_extents,
            lane: 0,
            lane_offset: 0.0,
            braking: 0,
            destroyed: false,
            pose: Pose::default(),
            class,
            color,
            controller: Controller::Traffic,
        }
    }

    /// Creates the player vehicle at rest at the provided longitudinal position.
    #[must_use]
    pub fn player(z: f32, color: VehicleColor) -> Self {
        Self {
            controller: Controller::Player,
            ..Self::traffic(z, VehicleClass::Car, color)
        }
    }

    /// Reports whether the vehicle is a truck.
    #[must_use]
    pub const fn is_truck(&self) -> bool {
        matches!(self.class, VehicleClass::Truck { .. })
    }

    /// Reports whether every physical quantity is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.lane_offset.is_finite()
    }
}

/// Kind of collidable object placed along the track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackObjectKind {
    /// Speed bump; one-shot jolt.
    Bump,
    /// Puddle or gravel patch; one-shot slowdown.
    Slow,
    /// Solid scenery the player is pushed away from.
    Solid,
}

/// Object placed on a track segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackObject {
    /// Offset from the owning segment's origin.
    pub offset: Vec3,
    /// Lateral collision radius; zero disables collisions.
    pub collide_size: f32,
    /// Collision response.
    pub kind: TrackObjectKind,
}

/// Identifies a single track object for one-shot bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackObjectKey {
    segment: i64,
    index: usize,
}

impl TrackObjectKey {
    /// Creates a key for the object at `index` on segment `segment`.
    #[must_use]
    pub const fn new(segment: i64, index: usize) -> Self {
        Self { segment, index }
    }

    /// Segment that owns the object.
    #[must_use]
    pub const fn segment(&self) -> i64 {
        self.segment
    }

    /// Position of the object within its segment.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}

/// Static description of a discrete slice of track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    /// Centreline position at the start of the segment.
    pub origin: Vec3,
    /// Full visual road width.
    pub visual_width: f32,
    /// Side streets never count as off-road.
    pub side_street: bool,
    /// Objects anchored to the segment.
    pub objects: Vec<TrackObject>,
}

/// Interpolated track geometry at a longitudinal position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackSample {
    /// Centreline position.
    pub center: Vec3,
    /// Lateral curvature; positive bends to the right.
    pub curvature: f32,
    /// Road surface height.
    pub height: f32,
    /// Road pitch in radians.
    pub pitch: f32,
    /// Drivable half-width.
    pub width: f32,
    /// Index of the segment containing the position.
    pub segment_index: i64,
}

impl TrackSample {
    /// Flat, straight geometry used where no track data exists.
    #[must_use]
    pub fn flat(z: f32, segment_length: f32) -> Self {
        let segment_index = if segment_length > 0.0 {
            (z / segment_length).floor() as i64
        } else {
            0
        };
        Self {
            center: Vec3::new(0.0, 0.0, z),
            curvature: 0.0,
            height: 0.0,
            pitch: 0.0,
            width: 0.0,
            segment_index,
        }
    }
}

/// Geometry lookup over static track data.
pub trait TrackQuery {
    /// Longitudinal length of a single segment.
    fn segment_length(&self) -> f32;

    /// Interpolated geometry at `z`; flat geometry where no data exists.
    fn sample(&self, z: f32) -> TrackSample;

    /// Segment at `index`, or `None` beyond the ends of the track.
    fn segment(&self, index: i64) -> Option<&TrackSegment>;
}

/// Lane and traffic configuration of a level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelInfo {
    /// Number of lanes; always at least one.
    pub lane_count: u32,
    /// Traffic density multiplier; zero disables spawning.
    pub traffic_density: f32,
}

/// Level lookup keyed by race progress measured in checkpoints.
pub trait LevelTable {
    /// Level configuration at the fractional checkpoint `progress`.
    fn level_info(&self, progress: f32) -> LevelInfo;
}

/// Numeric rules of a race, independent of track geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceRules {
    /// Lateral distance between adjacent lane centres.
    pub lane_width: f32,
    /// Longitudinal distance between checkpoints.
    pub checkpoint_distance: f32,
    /// Level counter value that wins the race.
    pub level_goal: u32,
    /// Time budget granted at the start line, in seconds.
    pub starting_time: f32,
    /// Time added at every checkpoint, in seconds.
    pub extra_checkpoint_time: f32,
    /// Time bank ceiling applied in enhanced mode, in seconds.
    pub enhanced_time_cap: f32,
    /// Length of the start countdown, in seconds.
    pub countdown_seconds: f32,
    /// Disables traffic spawning entirely.
    pub disable_traffic: bool,
}

impl Default for RaceRules {
    fn default() -> Self {
        Self {
            lane_width: 1_400.0,
            checkpoint_distance: 300_000.0,
            level_goal: 10,
            starting_time: 45.0,
            extra_checkpoint_time: 40.0,
            enhanced_time_cap: 100.0,
            countdown_seconds: 3.0,
            disable_traffic: false,
        }
    }
}

impl RaceRules {
    /// Level configuration at longitudinal position `z`.
    #[must_use]
    pub fn level_at(&self, levels: &dyn LevelTable, z: f32) -> LevelInfo {
        let mut info = levels.level_info(z / self.checkpoint_distance);
        info.lane_count = info.lane_count.max(1);
        info
    }

    /// Lateral offset of `lane` on a road with `lane_count` lanes.
    #[must_use]
    pub fn lane_offset(&self, lane: u32, lane_count: u32) -> f32 {
        let centre = lane_count.saturating_sub(1) as f32 * self.lane_width / 2.0;
        lane as f32 * self.lane_width - centre
    }
}

/// Static race content borrowed by every vehicle update.
#[derive(Clone, Copy)]
pub struct Road<'a> {
    /// Numeric race rules.
    pub rules: &'a RaceRules,
    /// Level lookup.
    pub levels: &'a dyn LevelTable,
    /// Track geometry lookup.
    pub track: &'a dyn TrackQuery,
}

impl<'a> Road<'a> {
    /// Bundles the borrowed race content.
    #[must_use]
    pub fn new(rules: &'a RaceRules, levels: &'a dyn LevelTable, track: &'a dyn TrackQuery) -> Self {
        Self {
            rules,
            levels,
            track,
        }
    }

    /// Level configuration at longitudinal position `z`.
    #[must_use]
    pub fn level_at(&self, z: f32) -> LevelInfo {
        self.rules.level_at(self.levels, z)
    }
}

impl std::fmt::Debug for Road<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Road")
            .field("rules", self.rules)
            .field("segment_length", &self.track.segment_length())
            .finish_non_exhaustive()
    }
}

/// Countdown measured in simulated seconds and advanced once per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Timer {
    remaining: Option<f32>,
}

impl Timer {
    /// Creates a timer that has never been set.
    #[must_use]
    pub const fn new() -> Self {
        Self { remaining: None }
    }

    /// Arms the timer to expire after `seconds`.
    pub fn set(&mut self, seconds: f32) {
        self.remaining = Some(seconds);
    }

    /// Disarms the timer.
    pub fn clear(&mut self) {
        self.remaining = None;
    }

    /// Reports whether the timer has been armed.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.remaining.is_some()
    }

    /// Reports whether the timer is armed and has not yet expired.
    #[must_use]
    pub fn active(&self) -> bool {
        self.remaining.is_some_and(|remaining| remaining > 0.0)
    }

    /// Seconds elapsed since expiry; negative while active, zero when unset.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.remaining.map_or(0.0, |remaining| -remaining)
    }

    /// Advances the timer by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= dt;
        }
    }
}

/// Race bookkeeping shared by the session clock and the player update.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    /// Current phase.
    pub phase: SessionPhase,
    /// Flags fixed at race start.
    pub modifiers: Modifiers,
    /// Checkpoints crossed so far.
    pub level: u32,
    /// Longitudinal position of the next checkpoint.
    pub next_checkpoint: f32,
    /// Remaining checkpoint time budget in seconds.
    pub time_left: f32,
    /// Seconds spent racing since the countdown ended.
    pub race_time: f32,
    /// Best persisted race time.
    pub best_time: Option<f32>,
    /// Set when the finished race beat the best time.
    pub new_record: bool,
    /// Runs while the start countdown is shown.
    pub countdown: Timer,
    /// Armed at zero when the race ends; its elapsed time drives the outro.
    pub game_over: Timer,
}

impl Session {
    /// Attract-loop session shown behind the title screen.
    #[must_use]
    pub fn title(rules: &RaceRules, best_time: Option<f32>) -> Self {
        Self {
            phase: SessionPhase::Title,
            modifiers: Modifiers::default(),
            level: 0,
            next_checkpoint: rules.checkpoint_distance,
            time_left: rules.starting_time,
            race_time: 0.0,
            best_time,
            new_record: false,
            countdown: Timer::new(),
            game_over: Timer::new(),
        }
    }

    /// Fresh race waiting on its start countdown.
    #[must_use]
    pub fn race(rules: &RaceRules, modifiers: Modifiers, best_time: Option<f32>) -> Self {
        let mut countdown = Timer::new();
        countdown.set(rules.countdown_seconds);
        Self {
            phase: SessionPhase::Countdown,
            modifiers,
            countdown,
            ..Self::title(rules, best_time)
        }
    }

    /// Whether the attract loop is running.
    #[must_use]
    pub fn is_title(&self) -> bool {
        self.phase == SessionPhase::Title
    }

    /// Whether the start countdown is still pinning the player.
    #[must_use]
    pub fn counting_down(&self) -> bool {
        self.phase == SessionPhase::Countdown
    }

    /// Whether the race has ended.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.game_over.is_set()
    }

    /// Ends the race in `phase` and starts the game-over timer.
    pub fn finish(&mut self, phase: SessionPhase) {
        debug_assert!(phase.is_over(), "{phase:?} does not end a race");
        self.phase = phase;
        self.game_over.set(0.0);
    }

    /// Runs the race clock for `dt` seconds.
    pub fn advance(&mut self, dt: f32, out: &mut Vec<Event>) {
        self.countdown.advance(dt);
        self.game_over.advance(dt);

        match self.phase {
            SessionPhase::Countdown if !self.countdown.active() => {
                self.phase = SessionPhase::Racing;
                self.countdown.clear();
                out.push(Event::CountdownFinished);
                out.push(Event::SoundRequested {
                    cue: SoundCue::Beep,
                    volume: 1.0,
                    pitch: 2.0,
                });
            }
            SessionPhase::Racing => {
                self.race_time += dt;
                if self.modifiers.free_ride {
                    return;
                }
                self.time_left -= dt;
                if self.time_left <= 0.0 {
                    self.time_left = 0.0;
                    self.finish(SessionPhase::TimedOut);
                    out.push(Event::RaceTimedOut);
                    out.push(Event::SoundRequested {
                        cue: SoundCue::Lose,
                        volume: 1.0,
                        pitch: 1.0,
                    });
                }
            }
            _ => {}
        }
    }
}

/// Linear interpolation from `a` to `b` with `t` clamped to `[0, 1]`.
#[must_use]
pub fn lerp(t: f32, a: f32, b: f32) -> f32 {
    a + t.clamp(0.0, 1.0) * (b - a)
}

/// Position of `value` between `low` and `high`, clamped to `[0, 1]`.
///
/// `low` may exceed `high` for a falling ramp. A degenerate range yields zero.
#[must_use]
pub fn percent(value: f32, low: f32, high: f32) -> f32 {
    if (high - low).abs() <= f32::EPSILON {
        return 0.0;
    }
    ((value - low) / (high - low)).clamp(0.0, 1.0)
}

/// Sign of `value`, treating zero as positive.
#[must_use]
pub fn sign(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Uniform sample in `[low, high)`; tolerates `low >= high`.
pub fn uniform<R: Rng>(rng: &mut R, low: f32, high: f32) -> f32 {
    low + (high - low) * rng.gen::<f32>()
}
