#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Lane-following traffic: vehicle spawning, per-tick updates and spacing.
//!
//! Traffic vehicles hold a lane, ease towards its lateral offset, cruise at a
//! lane-dependent target speed and brake behind slower neighbours. Vehicles
//! that overlap a neighbour or drift too far from the player are flagged as
//! destroyed; removing them is left to the caller.

mod spawner;

use arcade_racer_core::{lerp, uniform, Controller, Road, Vehicle, VehicleClass, VehicleColor};
use rand::Rng;

pub use spawner::{SpawnGate, TrafficSpawner};

const BASE_SPEED: f32 = 120.0;
const LANE_SPEED_STEP: f32 = 20.0;
const SPEED_TOLERANCE: f32 = 10.0;
const CRUISE_ACCEL: f32 = 0.5;
const BRAKE_DECEL: f32 = 1.0;
const BRAKE_TICKS: u32 = 30;
const LANE_BLEND: f32 = 0.01;

const FOLLOW_AHEAD: f32 = 500.0;
const FOLLOW_BEHIND: f32 = 2_000.0;
const LANE_BAND: f32 = 500.0;
const NEIGHBOUR_PUSH: f32 = 1.0;

const DESPAWN_AHEAD: f32 = 70_000.0;
const DESPAWN_BEHIND: f32 = 2_000.0;

/// Cruise speed of `lane` on a road with `lane_count` lanes.
///
/// Lanes further to the left are faster; lanes beyond the road edge fall
/// back to the base speed.
#[must_use]
pub fn target_speed(lane: u32, lane_count: u32) -> f32 {
    let lanes_to_the_left = i64::from(lane_count) - 1 - i64::from(lane);
    BASE_SPEED.max(BASE_SPEED + lanes_to_the_left as f32 * LANE_SPEED_STEP)
}

/// Creates a fresh traffic vehicle at longitudinal position `z`.
///
/// Vehicles spawned behind the player outside the title screen take the
/// outermost lane on the side the player is not on.
pub fn spawn_vehicle<R: Rng>(
    z: f32,
    player: &Vehicle,
    title_screen: bool,
    road: &Road<'_>,
    rng: &mut R,
) -> Vehicle {
    let color = if rng.gen_range(0..9) != 0 {
        VehicleColor::hsl(rng.gen(), uniform(rng, 0.5, 0.9), 0.5)
    } else if rng.gen_range(0..2) != 0 {
        VehicleColor::WHITE
    } else {
        VehicleColor::hsl(0.0, 0.0, 0.1)
    };

    let class = if rng.gen_range(0..2) != 0 {
        let cargo = VehicleColor::hsl(rng.gen(), uniform(rng, 0.5, 1.0), uniform(rng, 0.2, 1.0));
        VehicleClass::Truck { cargo }
    } else {
        VehicleClass::Car
    };

    let mut vehicle = Vehicle::traffic(z, class, color);
    let lane_count = road.level_at(z).lane_count;
    vehicle.lane = rng.gen_range(0..lane_count);
    if !title_screen && z < player.position.z {
        vehicle.lane = if player.position.x > 0.0 {
            0
        } else {
            lane_count - 1
        };
    }
    vehicle.lane_offset = road.rules.lane_offset(vehicle.lane, lane_count);
    vehicle.velocity.z = target_speed(vehicle.lane, lane_count);
    vehicle
}

/// Advances the traffic vehicle at `index` by one tick.
///
/// The spacing rule visits the other vehicles in slice order and reacts to
/// the first one inside the follow window: the follower is clamped to the
/// leader's speed and starts braking, while the leader gets a unit push.
/// A follower that has already caught up with its leader is destroyed.
pub fn update_vehicle(vehicles: &mut [Vehicle], index: usize, player_z: f32, road: &Road<'_>) {
    let Some(&current) = vehicles.get(index) else {
        return;
    };
    debug_assert_eq!(
        current.controller,
        Controller::Traffic,
        "traffic update invoked on a non-traffic vehicle"
    );
    if current.controller != Controller::Traffic {
        return;
    }

    let mut vehicle = current;
    let level = road.level_at(vehicle.position.z);
    let target = target_speed(vehicle.lane, level.lane_count);
    let accel = if vehicle.braking > 0 {
        vehicle.braking -= 1;
        -BRAKE_DECEL
    } else if vehicle.velocity.z < target {
        CRUISE_ACCEL
    } else if vehicle.velocity.z > target + SPEED_TOLERANCE {
        -CRUISE_ACCEL
    } else {
        0.0
    };

    vehicle.lane = vehicle.lane.min(level.lane_count - 1);
    let lane_target = road.rules.lane_offset(vehicle.lane, level.lane_count);
    vehicle.lane_offset = lerp(LANE_BLEND, vehicle.lane_offset, lane_target);
    vehicle.position.x = vehicle.lane_offset;

    vehicle.velocity.z = (vehicle.velocity.z + accel).max(0.0);
    vehicle.position.z += vehicle.velocity.z;

    for (other_index, other) in vehicles.iter_mut().enumerate() {
        if other_index == index || other.controller != Controller::Traffic {
            continue;
        }
        let following = vehicle.position.z < other.position.z + FOLLOW_AHEAD
            && vehicle.position.z > other.position.z - FOLLOW_BEHIND;
        if !following || (vehicle.lane_offset - other.lane_offset).abs() >= LANE_BAND {
            continue;
        }
        if vehicle.position.z >= other.position.z {
            vehicle.destroyed = true;
        }
        vehicle.velocity.z = vehicle.velocity.z.min(other.velocity.z);
        other.velocity.z += NEIGHBOUR_PUSH;
        vehicle.braking = BRAKE_TICKS;
        break;
    }

    let here = road.track.sample(vehicle.position.z);
    vehicle.position.x = here.center.x + vehicle.lane_offset;
    vehicle.position.y = here.height;

    let ahead = road
        .track
        .sample(vehicle.position.z + road.track.segment_length());
    let heading = ahead.center - here.center;
    vehicle.pose.turn = heading.x.atan2(heading.z);
    vehicle.pose.wheel_turn = vehicle.pose.turn / 2.0;
    vehicle.pose.pitch = here.pitch;

    let player_delta = vehicle.position.z - player_z;
    if player_delta > DESPAWN_AHEAD || player_delta < -DESPAWN_BEHIND {
        vehicle.destroyed = true;
    }

    vehicles[index] = vehicle;
}

/// Advances every traffic vehicle once, in slice order.
pub fn update_all(vehicles: &mut [Vehicle], player_z: f32, road: &Road<'_>) {
    for index in 0..vehicles.len() {
        update_vehicle(vehicles, index, player_z, road);
    }
}

/// Drops every vehicle flagged as destroyed. Returns how many were removed.
pub fn remove_destroyed(vehicles: &mut Vec<Vehicle>) -> usize {
    let before = vehicles.len();
    vehicles.retain(|vehicle| !vehicle.destroyed);
    before - vehicles.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_lanes_cruise_faster() {
        assert_eq!(target_speed(0, 3), 160.0);
        assert_eq!(target_speed(1, 3), 140.0);
        assert_eq!(target_speed(2, 3), 120.0);
        assert_eq!(target_speed(0, 1), 120.0);
    }

    #[test]
    fn lanes_beyond_the_road_use_base_speed() {
        assert_eq!(target_speed(5, 2), 120.0);
    }

    #[test]
    fn removal_keeps_live_vehicles_in_order() {
        let mut vehicles: Vec<Vehicle> = (0..4)
            .map(|i| Vehicle::traffic(i as f32, VehicleClass::Car, VehicleColor::WHITE))
            .collect();
        vehicles[1].destroyed = true;
        vehicles[3].destroyed = true;

        assert_eq!(remove_destroyed(&mut vehicles), 2);
        let positions: Vec<f32> = vehicles.iter().map(|v| v.position.z).collect();
        assert_eq!(positions, vec![0.0, 2.0]);
    }
}
