//! The interfaces through which a controller senses and acts. They are supplied by whatever
//! hosts the controller, be it a simulator or the robot firmware.

use std::sync::{
    mpsc::{Receiver, Sender},
    Arc,
};

use nalgebra::Vector2;
use parking_lot::RwLock;

use crate::robot::{Command, ProximityReading, RangeAndBearingPacket};

pub trait ProximitySensor {
    /// The current readings of every proximity sensor, queried once per tick.
    fn readings(&mut self) -> Vec<ProximityReading>;
}

pub trait RangeAndBearingSensor {
    /// All packets buffered by the medium since the previous tick. May be empty.
    fn packets(&mut self) -> Vec<RangeAndBearingPacket>;
}

pub trait RangeAndBearingActuator {
    /// Sets the data that is broadcast to every robot in range.
    fn send(&mut self, data: Vec<u8>);
}

pub trait DifferentialSteering {
    fn set_velocity(&mut self, command: Command);
}

pub trait AttractionSource {
    /// A consistent snapshot of the desired heading towards the swarm, in the robot frame.
    fn get(&self) -> Vector2<f32>;
}

/// One-way, fire-and-forget reporting of records to whoever is listening.
pub trait TelemetrySink<T> {
    fn publish(&mut self, record: T);
}

/// The unit vector pointing along the robot heading.
pub fn straight_ahead() -> Vector2<f32> {
    Vector2::new(1.0, 0.0)
}

/// A single attraction vector that is written by an external party and read by the controller.
/// Cloning gives another handle to the same value.
#[derive(Clone)]
pub struct SharedAttraction {
    value: Arc<RwLock<Vector2<f32>>>,
}

impl Default for SharedAttraction {
    fn default() -> Self {
        Self::new(straight_ahead())
    }
}

impl SharedAttraction {
    pub fn new(initial: Vector2<f32>) -> Self {
        Self {
            value: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn set(&self, value: Vector2<f32>) {
        *self.value.write() = value;
    }

    pub fn reset(&self) {
        self.set(straight_ahead());
    }
}

impl AttractionSource for SharedAttraction {
    fn get(&self) -> Vector2<f32> {
        *self.value.read()
    }
}

/// Forwards every published record into a channel. Records are silently dropped once the
/// receiving end is gone.
#[derive(Clone)]
pub struct ChannelSink<T> {
    send: Sender<T>,
}

impl<T> ChannelSink<T> {
    pub fn new() -> (Self, Receiver<T>) {
        let (send, recv) = std::sync::mpsc::channel();
        (Self { send }, recv)
    }
}

impl<T> TelemetrySink<T> for ChannelSink<T> {
    fn publish(&mut self, record: T) {
        let _ = self.send.send(record);
    }
}
