use std::{f32::consts::PI, ops::RangeInclusive};

use common::{
    capability::straight_ahead,
    math::{angle_of, unsigned_normalize},
    robot::{Command, ProximityReading},
};
use nalgebra::Vector2;

/// How strongly nearby obstacles push the robot away from the attraction direction.
const OBSTACLE_GAIN: f32 = 5.0;

/// Resultant vectors shorter than this have no reliable heading.
const STALL_THRESHOLD: f32 = 0.1;

/// Widens the straight-ahead cone by the rounding error of an `f32` angle taken back out of a
/// vector, so an obstacle built at exactly `alpha` still counts as inside.
const CONE_TOLERANCE: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Pursue the attraction vector, nudged away from obstacles.
    Follow,
    /// Pivot in place away from a close or off-axis obstacle.
    Avoid,
}

/// The result of one motion decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub behavior: Behavior,
    pub obstacle: Vector2<f32>,
    pub command: Command,
}

/// Turns the attraction towards the swarm and the proximity readings into wheel speeds.
#[derive(Debug, Clone)]
pub struct MotionController {
    go_straight: RangeInclusive<f32>,
    delta: f32,
    wheel_velocity: f32,
}

impl MotionController {
    pub fn new(alpha_degrees: f32, delta: f32, wheel_velocity: f32) -> Self {
        let alpha = alpha_degrees.to_radians() + CONE_TOLERANCE;
        Self {
            go_straight: -alpha..=alpha,
            delta,
            wheel_velocity,
        }
    }

    /// Mean of all readings taken as vectors. No readings means no obstacle.
    pub fn obstacle_vector(readings: &[ProximityReading]) -> Vector2<f32> {
        if readings.is_empty() {
            return Vector2::zeros();
        }

        let sum: Vector2<f32> = readings.iter().map(|r| r.to_vector()).sum();
        sum / readings.len() as f32
    }

    pub fn behavior(&self, obstacle: &Vector2<f32>) -> Behavior {
        self.behavior_for(angle_of(obstacle), obstacle.norm())
    }

    /// Follow only while the obstacle sits within the straight-ahead cone (bounds included)
    /// and is weaker than `delta`.
    pub fn behavior_for(&self, bearing: f32, magnitude: f32) -> Behavior {
        if self.go_straight.contains(&bearing) && magnitude < self.delta {
            Behavior::Follow
        } else {
            Behavior::Avoid
        }
    }

    /// The heading to follow: attraction minus the scaled obstacle vector.
    pub fn follow_vector(attraction: &Vector2<f32>, obstacle: &Vector2<f32>) -> Vector2<f32> {
        let result = attraction - obstacle * OBSTACLE_GAIN;
        if result.norm() < STALL_THRESHOLD {
            straight_ahead()
        } else {
            result
        }
    }

    /// Spins on one wheel, away from the side the obstacle is on.
    pub fn avoid(&self, obstacle: &Vector2<f32>) -> Command {
        if angle_of(obstacle) > 0.0 {
            Command::new(self.wheel_velocity, 0.0)
        } else {
            Command::new(0.0, self.wheel_velocity)
        }
    }

    /// Differential wheel speeds steering towards `direction`. The faster wheel always runs at
    /// the maximum wheel velocity; the slower one is scaled by the cosine of the heading error
    /// and may turn backwards.
    pub fn wheel_speeds(&self, direction: &Vector2<f32>) -> Command {
        if direction.x == 0.0 && direction.y == 0.0 {
            return Command::STOP;
        }

        let angle = unsigned_normalize(angle_of(direction));

        // the open interval puts headings of exactly 0 and PI on the right-hand branch
        let (left, right) = if angle > 0.0 && angle < PI {
            (angle.cos(), 1.0)
        } else {
            (1.0, angle.cos())
        };

        let factor = self.wheel_velocity / left.abs().max(right.abs());
        Command::new(factor * left, factor * right)
    }

    pub fn decide(&self, attraction: &Vector2<f32>, readings: &[ProximityReading]) -> Decision {
        let obstacle = Self::obstacle_vector(readings);
        let behavior = self.behavior(&obstacle);

        let command = match behavior {
            Behavior::Follow => self.wheel_speeds(&Self::follow_vector(attraction, &obstacle)),
            Behavior::Avoid => self.avoid(&obstacle),
        };

        Decision {
            behavior,
            obstacle,
            command,
        }
    }
}
