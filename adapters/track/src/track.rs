use std::f32::consts::TAU;

use arcade_racer_core::{
    lerp, uniform, TrackObject, TrackObjectKind, TrackQuery, TrackSample, TrackSegment,
};
use glam::Vec3;
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::RaceConfig;

const EDGE_MARGIN: f32 = 600.0;
const SIDE_STREET_SEGMENTS: u32 = 12;
const ROADSIDE_OFFSET: f32 = 400.0;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Profile {
    curvature: f32,
    pitch: f32,
    width: f32,
}

/// Procedurally generated road made of equally long segments.
///
/// The centreline is straight in x; curvature only feeds the lateral push
/// felt by the player, and hills move the surface up and down.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentTrack {
    segment_length: f32,
    fallback_width: f32,
    segments: Vec<TrackSegment>,
    profiles: Vec<Profile>,
}

impl SegmentTrack {
    /// Builds the track described by `config`.
    ///
    /// Generation is deterministic for a given configuration.
    #[must_use]
    pub fn generate(config: &RaceConfig) -> Self {
        let shape = &config.track;
        let levels = config.level_list();
        let mut rng = ChaCha8Rng::seed_from_u64(shape.seed);
        let count = shape.segment_count as usize;

        let hill = |index: usize| {
            shape.hill_amplitude * (TAU * index as f32 / shape.hill_wavelength).sin()
        };

        let mut segments = Vec::with_capacity(count);
        let mut profiles = Vec::with_capacity(count);
        for index in 0..count {
            let z = index as f32 * shape.segment_length;
            let height = hill(index);
            let pitch = ((hill(index + 1) - height) / shape.segment_length).atan();
            let curvature =
                shape.curve_amplitude * (TAU * index as f32 / shape.curve_wavelength).sin();

            let lanes = config.rules.level_at(&levels, z).lane_count;
            let width = shape
                .road_width
                .max(lanes as f32 * config.rules.lane_width / 2.0 + EDGE_MARGIN);

            let position = index as u32;
            let side_street = shape.side_street_spacing > 0
                && position >= shape.side_street_spacing
                && position % shape.side_street_spacing < SIDE_STREET_SEGMENTS;
            let mut objects = Vec::new();
            if shape.object_spacing > 0 && position > 0 && position % shape.object_spacing == 0 {
                objects.push(place_object(&mut rng, width, shape.segment_length));
            }

            segments.push(TrackSegment {
                origin: Vec3::new(0.0, height, z),
                visual_width: 2.0 * width,
                side_street,
                objects,
            });
            profiles.push(Profile {
                curvature,
                pitch,
                width,
            });
        }
        debug!(
            "generated {count} track segments spanning {:.0} units",
            count as f32 * shape.segment_length
        );

        Self {
            segment_length: shape.segment_length,
            fallback_width: shape.road_width,
            segments,
            profiles,
        }
    }

    /// Number of generated segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Longitudinal extent of the generated road.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.segments.len() as f32 * self.segment_length
    }
}

fn place_object(rng: &mut ChaCha8Rng, width: f32, segment_length: f32) -> TrackObject {
    let z = uniform(rng, 0.0, segment_length);
    match rng.gen_range(0..4) {
        0 => TrackObject {
            offset: Vec3::new(uniform(rng, -0.5, 0.5) * width, 0.0, z),
            collide_size: 250.0,
            kind: TrackObjectKind::Bump,
        },
        1 => TrackObject {
            offset: Vec3::new(uniform(rng, -0.6, 0.6) * width, 0.0, z),
            collide_size: 400.0,
            kind: TrackObjectKind::Slow,
        },
        _ => {
            let side = if rng.gen::<bool>() { 1.0 } else { -1.0 };
            TrackObject {
                offset: Vec3::new(side * (width + ROADSIDE_OFFSET), 0.0, z),
                collide_size: 200.0,
                kind: TrackObjectKind::Solid,
            }
        }
    }
}

impl TrackQuery for SegmentTrack {
    fn segment_length(&self) -> f32 {
        self.segment_length
    }

    fn sample(&self, z: f32) -> TrackSample {
        let mut sample = TrackSample::flat(z, self.segment_length);
        sample.width = self.fallback_width;

        let Ok(index) = usize::try_from(sample.segment_index) else {
            return sample;
        };
        let (Some(segment), Some(profile)) = (self.segments.get(index), self.profiles.get(index))
        else {
            return sample;
        };
        let next_segment = self.segments.get(index + 1).unwrap_or(segment);
        let next_profile = self.profiles.get(index + 1).unwrap_or(profile);

        let t = (z - segment.origin.z) / self.segment_length;
        sample.height = lerp(t, segment.origin.y, next_segment.origin.y);
        sample.center.y = sample.height;
        sample.curvature = lerp(t, profile.curvature, next_profile.curvature);
        sample.pitch = lerp(t, profile.pitch, next_profile.pitch);
        sample.width = lerp(t, profile.width, next_profile.width);
        sample
    }

    fn segment(&self, index: i64) -> Option<&TrackSegment> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.segments.get(index))
    }
}
