use nalgebra::{Point2, Vector2};

use crate::math::polar;

/// The pose of a robot in the 2D plane.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Pose {
    /// The x position of the robot
    pub x: f32,

    /// The y position of the robot
    pub y: f32,

    /// The rotation of the robot, measured in radians counter-clockwise from the positive x-axis.
    pub theta: f32,
}

impl Pose {
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self { x, y, theta }
    }

    pub fn position(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }
}

impl From<Pose> for (f32, f32) {
    fn from(val: Pose) -> Self {
        (val.x, val.y)
    }
}

/// A single reading of the proximity sensor ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityReading {
    /// Closeness of the obstacle, 0 meaning nothing in range.
    pub value: f32,

    /// The angle of the sensor relative to the robot heading in radians.
    pub angle: f32,
}

impl ProximityReading {
    pub fn new(value: f32, angle: f32) -> Self {
        Self { value, angle }
    }

    pub fn to_vector(&self) -> Vector2<f32> {
        polar(self.value, self.angle)
    }
}

/// One buffered packet of the range-and-bearing medium. The medium itself measures the
/// distance and direction towards the robot that sent the packet.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeAndBearingPacket {
    pub data: Vec<u8>,

    /// The measured distance to the sender.
    pub range: f32,

    /// The direction of the sender relative to the receiver heading in radians.
    pub bearing: f32,
}

/// A Command to move the robot by setting the desired left and right wheel speed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Command {
    /// The target speed of the left wheel.
    pub speed_left: f32,

    /// The target speed of the right wheel.
    pub speed_right: f32,
}

impl Command {
    pub const STOP: Command = Command {
        speed_left: 0.0,
        speed_right: 0.0,
    };

    pub fn new(speed_left: f32, speed_right: f32) -> Self {
        Self {
            speed_left,
            speed_right,
        }
    }
}
