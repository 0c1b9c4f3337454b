use std::sync::Arc;

use common::{
    capability::{
        DifferentialSteering, ProximitySensor, RangeAndBearingActuator, RangeAndBearingSensor,
    },
    robot::{Command, ProximityReading, RangeAndBearingPacket},
};
use parking_lot::Mutex;

/// The simulated devices of one robot.
#[derive(Debug, Default)]
struct RobotIo {
    readings: Vec<ProximityReading>,
    inbox: Vec<RangeAndBearingPacket>,
    /// Stays on the air until overwritten.
    outbox: Option<Vec<u8>>,
    command: Command,
}

/// The connection between a controller and the arena. The controller owns one handle per
/// capability while the arena keeps another to feed sensors and read actuators.
#[derive(Debug, Clone, Default)]
pub struct RobotPort(Arc<Mutex<RobotIo>>);

impl RobotPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces what the sensors report on the next tick.
    pub fn deliver(&self, readings: Vec<ProximityReading>, inbox: Vec<RangeAndBearingPacket>) {
        let mut io = self.0.lock();
        io.readings = readings;
        io.inbox = inbox;
    }

    pub fn outbox(&self) -> Option<Vec<u8>> {
        self.0.lock().outbox.clone()
    }

    pub fn command(&self) -> Command {
        self.0.lock().command
    }
}

impl ProximitySensor for RobotPort {
    fn readings(&mut self) -> Vec<ProximityReading> {
        self.0.lock().readings.clone()
    }
}

impl RangeAndBearingSensor for RobotPort {
    fn packets(&mut self) -> Vec<RangeAndBearingPacket> {
        std::mem::take(&mut self.0.lock().inbox)
    }
}

impl RangeAndBearingActuator for RobotPort {
    fn send(&mut self, data: Vec<u8>) {
        self.0.lock().outbox = Some(data);
    }
}

impl DifferentialSteering for RobotPort {
    fn set_velocity(&mut self, command: Command) {
        self.0.lock().command = command;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packets_are_consumed_once() {
        let port = RobotPort::new();
        let packet = RangeAndBearingPacket {
            data: vec![b'A', b'B'],
            range: 3.0,
            bearing: 0.0,
        };
        port.deliver(vec![ProximityReading::new(0.2, 0.0)], vec![packet.clone()]);

        let mut sensor = port.clone();
        assert_eq!(sensor.packets(), vec![packet]);
        assert!(sensor.packets().is_empty());

        // readings are a level, not a queue
        assert_eq!(sensor.readings().len(), 1);
        assert_eq!(sensor.readings().len(), 1);
    }

    #[test]
    fn actuators_are_visible_to_the_arena() {
        let port = RobotPort::new();
        assert_eq!(port.outbox(), None);
        assert_eq!(port.command(), Command::STOP);

        let mut actuator = port.clone();
        actuator.send(vec![1, 2, 3]);
        actuator.set_velocity(Command::new(1.0, -1.0));

        assert_eq!(port.outbox(), Some(vec![1, 2, 3]));
        assert_eq!(port.outbox(), Some(vec![1, 2, 3]));
        assert_eq!(port.command(), Command::new(1.0, -1.0));
    }
}
