#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Race content for the arcade racer: configuration, levels and track.
//!
//! A [`RaceConfig`] is read from TOML, validated, and then used to build the
//! [`LevelList`] and [`SegmentTrack`] that the simulation borrows through the
//! core [`LevelTable`](arcade_racer_core::LevelTable) and
//! [`TrackQuery`](arcade_racer_core::TrackQuery) traits.

mod config;
mod levels;
mod track;

pub use config::{ConfigError, RaceConfig, TrackConfig};
pub use levels::LevelList;
pub use track::SegmentTrack;
