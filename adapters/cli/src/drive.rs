use std::{collections::BTreeMap, fmt};

use arcade_racer_core::{Command, Event, InputSample, Modifiers, Road, SessionPhase};
use arcade_racer_synth::{AudioOutput, SoundBank, SoundSettings, VoiceHandle};
use arcade_racer_track::{RaceConfig, SegmentTrack};
use arcade_racer_world::{self as world, query, SimulationContext};
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Switches of a headless drive.
#[derive(Clone, Debug)]
pub(crate) struct DriveOptions {
    pub(crate) ticks: u64,
    pub(crate) seed: u64,
    pub(crate) test_drive: bool,
    pub(crate) free_ride: bool,
    pub(crate) rain: bool,
    pub(crate) mute: bool,
}

/// Audio device that accepts every voice and only counts what it was given.
#[derive(Debug, Default)]
struct CountingOutput {
    voices: u64,
    samples: u64,
}

impl AudioOutput for CountingOutput {
    fn is_ready(&self) -> bool {
        true
    }

    fn resume(&mut self) {}

    fn schedule(&mut self, samples: &[f32], _volume: f32, _rate: f32) -> Option<VoiceHandle> {
        self.voices += 1;
        self.samples += samples.len() as u64;
        Some(VoiceHandle::new(self.voices))
    }
}

/// Outcome of a headless drive.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DriveSummary {
    ticks: u64,
    phase: SessionPhase,
    distance_km: f32,
    speed_kmh: f32,
    level: u32,
    time_left: f32,
    traffic: usize,
    raining: bool,
    voices: u64,
    audio_seconds: f32,
    events: BTreeMap<&'static str, usize>,
}

impl fmt::Display for DriveSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ticks:     {}", self.ticks)?;
        writeln!(f, "phase:     {:?}", self.phase)?;
        writeln!(f, "distance:  {:.2} km", self.distance_km)?;
        writeln!(f, "speed:     {:.0} km/h", self.speed_kmh)?;
        writeln!(f, "level:     {}", self.level)?;
        writeln!(f, "time left: {:.1} s", self.time_left)?;
        writeln!(f, "traffic:   {}", self.traffic)?;
        writeln!(f, "raining:   {}", self.raining)?;
        writeln!(
            f,
            "sounds:    {} voices, {:.1} s of audio",
            self.voices, self.audio_seconds
        )?;
        writeln!(f, "events:")?;
        for (name, count) in &self.events {
            writeln!(f, "  {name:<18} {count}")?;
        }
        Ok(())
    }
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::TimeAdvanced { .. } => "time-advanced",
        Event::SoundRequested { .. } => "sound-requested",
        Event::CountdownFinished => "countdown-finished",
        Event::CheckpointReached { .. } => "checkpoint-reached",
        Event::RainForced => "rain-forced",
        Event::CollisionPenalty => "collision-penalty",
        Event::RaceWon { .. } => "race-won",
        Event::SaveRequested { .. } => "save-requested",
        Event::RaceTimedOut => "race-timed-out",
        Event::SpeedLimited { .. } => "speed-limited",
        Event::TrafficSpawned { .. } => "traffic-spawned",
        Event::VehicleFaulted => "vehicle-faulted",
    }
}

/// Runs `options.ticks` ticks of a race on the track described by `config`.
pub(crate) fn run(config: &RaceConfig, options: &DriveOptions) -> DriveSummary {
    let levels = config.level_list();
    let track = SegmentTrack::generate(config);
    let road = Road::new(&config.rules, &levels, &track);
    let mut ctx = SimulationContext::new(road, options.seed);

    let bank = SoundBank::new(SoundSettings {
        enabled: !options.mute,
        ..SoundSettings::default()
    });
    let mut sound_rng = ChaCha8Rng::seed_from_u64(options.seed.wrapping_add(1));
    let mut output = CountingOutput::default();

    let mut events = Vec::new();
    let modifiers = Modifiers {
        test_drive: options.test_drive,
        free_ride: options.free_ride,
        ..config.modifiers()
    };
    info!("starting a {}-tick drive with {modifiers:?}", options.ticks);
    world::apply(&mut ctx, Command::StartRace { modifiers }, &mut events);
    if options.rain {
        world::apply(&mut ctx, Command::ToggleRain, &mut events);
    }

    let mut tally = BTreeMap::new();
    for _ in 0..options.ticks {
        world::apply(
            &mut ctx,
            Command::Tick {
                input: InputSample::full_gas(),
            },
            &mut events,
        );
        for event in events.drain(..) {
            *tally.entry(event_name(&event)).or_insert(0) += 1;
            let _ = bank.play_event(&event, &mut sound_rng, &mut output);
        }
    }

    let player = query::player(&ctx).vehicle();
    DriveSummary {
        ticks: query::tick_index(&ctx),
        phase: query::phase(&ctx),
        distance_km: player.position.z / 1_000.0,
        speed_kmh: player.velocity.z,
        level: query::level(&ctx),
        time_left: query::time_left(&ctx),
        traffic: query::traffic(&ctx).len(),
        raining: query::raining(&ctx),
        voices: output.voices,
        audio_seconds: output.samples as f32 / arcade_racer_synth::SAMPLE_RATE as f32,
        events: tally,
    }
}

#[cfg(test)]
mod tests {
    use arcade_racer_track::TrackConfig;

    use super::*;

    fn short_config() -> RaceConfig {
        RaceConfig {
            track: TrackConfig {
                segment_count: 2_000,
                ..TrackConfig::default()
            },
            ..RaceConfig::default()
        }
    }

    fn options(ticks: u64) -> DriveOptions {
        DriveOptions {
            ticks,
            seed: 7,
            test_drive: true,
            free_ride: false,
            rain: false,
            mute: true,
        }
    }

    #[test]
    fn drives_are_reproducible() {
        let config = short_config();
        assert_eq!(run(&config, &options(600)), run(&config, &options(600)));
    }

    #[test]
    fn autopilot_leaves_the_start_line() {
        let summary = run(&short_config(), &options(600));
        assert_eq!(summary.ticks, 600);
        assert_eq!(summary.phase, SessionPhase::Racing);
        assert!(summary.distance_km > 1.0, "{summary}");
        assert_eq!(summary.events.get("countdown-finished"), Some(&1));
        assert_eq!(summary.voices, 0, "muted drives schedule nothing");
    }

    #[test]
    fn rain_caps_the_speed() {
        let summary = run(
            &short_config(),
            &DriveOptions {
                rain: true,
                ..options(900)
            },
        );
        assert!(summary.raining);
        assert!(summary.speed_kmh <= 110.0);
        assert!(summary.events.contains_key("speed-limited"));
    }

    #[test]
    fn audible_drives_schedule_voices() {
        let summary = run(
            &short_config(),
            &DriveOptions {
                mute: false,
                ..options(300)
            },
        );
        assert!(summary.voices > 0);
        assert!(summary.audio_seconds > 0.0);
    }

    #[test]
    fn summary_lists_event_counts() {
        let summary = run(&short_config(), &options(10));
        let text = summary.to_string();
        assert!(text.contains("time-advanced"));
        assert!(text.contains("km/h"));
    }
}
