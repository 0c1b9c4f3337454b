use common::{
    capability::{
        AttractionSource, DifferentialSteering, ProximitySensor, RangeAndBearingActuator,
        RangeAndBearingSensor, TelemetrySink,
    },
    robot::{Command, RangeAndBearingPacket},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{
    config::{ConfigError, ControllerConfig},
    motion::{Behavior, MotionController},
    peer::PeerId,
    protocol::{self, CodecError, Header},
    table::DistanceTable,
    telemetry::{NullSink, StagedTelemetry, TelemetryRecord},
};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("required capability '{0}' was not provided")]
    MissingCapability(&'static str),

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

/// Only `Move` is ever entered; further states would extend the tick here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Move,
}

/// What happened during a single tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// The peer whose packet was taken into account, if any.
    pub received_from: Option<PeerId>,
    /// Number of bytes handed to the medium, `None` if the broadcast was skipped.
    pub broadcast: Option<usize>,
    pub behavior: Behavior,
    pub command: Command,
}

/// The aggregation controller of a single robot.
pub struct Controller {
    id: PeerId,
    config: ControllerConfig,
    state: ControllerState,
    table: DistanceTable,
    motion: MotionController,
    rng: StdRng,
    staged: StagedTelemetry,
    overflow_reported: bool,

    proximity: Box<dyn ProximitySensor>,
    rab_sensor: Box<dyn RangeAndBearingSensor>,
    rab_actuator: Box<dyn RangeAndBearingActuator>,
    wheels: Box<dyn DifferentialSteering>,
    attraction: Box<dyn AttractionSource>,
    telemetry: Box<dyn TelemetrySink<TelemetryRecord>>,
}

/// Collects the capabilities a [`Controller`] needs. Building fails if any sensor, actuator or
/// the attraction source is missing; telemetry is optional.
pub struct ControllerBuilder {
    config: ControllerConfig,
    proximity: Option<Box<dyn ProximitySensor>>,
    rab_sensor: Option<Box<dyn RangeAndBearingSensor>>,
    rab_actuator: Option<Box<dyn RangeAndBearingActuator>>,
    wheels: Option<Box<dyn DifferentialSteering>>,
    attraction: Option<Box<dyn AttractionSource>>,
    telemetry: Option<Box<dyn TelemetrySink<TelemetryRecord>>>,
}

impl ControllerBuilder {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            proximity: None,
            rab_sensor: None,
            rab_actuator: None,
            wheels: None,
            attraction: None,
            telemetry: None,
        }
    }

    pub fn proximity(mut self, sensor: impl ProximitySensor + 'static) -> Self {
        self.proximity = Some(Box::new(sensor));
        self
    }

    pub fn range_and_bearing_sensor(mut self, sensor: impl RangeAndBearingSensor + 'static) -> Self {
        self.rab_sensor = Some(Box::new(sensor));
        self
    }

    pub fn range_and_bearing_actuator(
        mut self,
        actuator: impl RangeAndBearingActuator + 'static,
    ) -> Self {
        self.rab_actuator = Some(Box::new(actuator));
        self
    }

    pub fn wheels(mut self, actuator: impl DifferentialSteering + 'static) -> Self {
        self.wheels = Some(Box::new(actuator));
        self
    }

    pub fn attraction(mut self, source: impl AttractionSource + 'static) -> Self {
        self.attraction = Some(Box::new(source));
        self
    }

    pub fn telemetry(mut self, sink: impl TelemetrySink<TelemetryRecord> + 'static) -> Self {
        self.telemetry = Some(Box::new(sink));
        self
    }

    pub fn build(self) -> Result<Controller, BuildError> {
        self.config.validate()?;
        let id = self
            .config
            .peer_id()
            .ok_or(ConfigError::Id(self.config.id))?;

        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Controller {
            id,
            state: ControllerState::Move,
            table: DistanceTable::new(self.config.robot_count),
            motion: MotionController::new(
                self.config.alpha_degrees,
                self.config.delta,
                self.config.wheel_velocity,
            ),
            rng,
            staged: StagedTelemetry::default(),
            overflow_reported: false,
            proximity: self
                .proximity
                .ok_or(BuildError::MissingCapability("proximity"))?,
            rab_sensor: self
                .rab_sensor
                .ok_or(BuildError::MissingCapability("range_and_bearing_sensor"))?,
            rab_actuator: self
                .rab_actuator
                .ok_or(BuildError::MissingCapability("range_and_bearing_actuator"))?,
            wheels: self.wheels.ok_or(BuildError::MissingCapability("wheels"))?,
            attraction: self
                .attraction
                .ok_or(BuildError::MissingCapability("attraction"))?,
            telemetry: self.telemetry.unwrap_or_else(|| Box::new(NullSink)),
            config: self.config,
        })
    }
}

impl Controller {
    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn table(&self) -> &DistanceTable {
        &self.table
    }

    /// Restores the state right after construction. The attraction vector belongs to its
    /// writer and is left alone.
    pub fn reset(&mut self) {
        self.table.reset(self.config.robot_count);
        self.state = ControllerState::Move;
        self.staged.clear();
        self.overflow_reported = false;
    }

    /// Runs one complete control tick.
    pub fn control_step(&mut self) -> TickReport {
        let span = tracing::debug_span!("control_step", robot = %self.id);
        let _enter = span.enter();

        match self.state {
            ControllerState::Move => self.step_move(),
        }
    }

    fn step_move(&mut self) -> TickReport {
        self.table.decay();

        // the medium is read before our own packet is written
        let packets = self.rab_sensor.packets();
        let received_from = if packets.is_empty() {
            None
        } else {
            let selected = self.rng.gen_range(0..packets.len());
            self.receive(&packets[selected])
        };

        let broadcast = self.broadcast();

        let readings = self.proximity.readings();
        let attraction = self.attraction.get();
        let decision = self.motion.decide(&attraction, &readings);
        trace!(
            "{:?} obstacle={:?} command={:?}",
            decision.behavior,
            decision.obstacle,
            decision.command
        );
        self.wheels.set_velocity(decision.command);

        self.staged.flush(self.id, self.telemetry.as_mut());

        TickReport {
            received_from,
            broadcast,
            behavior: decision.behavior,
            command: decision.command,
        }
    }

    /// Takes in a single packet of a peer: its measured range goes into the table and its
    /// announced table is staged for telemetry.
    fn receive(&mut self, packet: &RangeAndBearingPacket) -> Option<PeerId> {
        let (header, payload) = match protocol::decode_header(&packet.data) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!("dropping packet: {e}");
                return None;
            }
        };

        if header.is_null() {
            return None;
        }

        let responder = header.responder;
        if self.table.update(responder, packet.range) {
            self.staged.stage_measurement(responder, packet.range);
        } else {
            debug!("ignoring range to unknown peer {responder}");
        }

        self.staged.stage_announced(
            responder,
            protocol::decode_entries(payload, self.config.robot_count),
        );

        Some(responder)
    }

    fn broadcast(&mut self) -> Option<usize> {
        let header = Header::broadcast_from(self.id);
        match protocol::encode(header, self.table.entries(), self.config.bandwidth) {
            Ok(data) => {
                let len = data.len();
                self.rab_actuator.send(data);
                Some(len)
            }
            Err(e @ CodecError::CapacityExceeded { .. }) if !self.overflow_reported => {
                warn!("skipping broadcast: {e}");
                self.overflow_reported = true;
                None
            }
            Err(e) => {
                debug!("skipping broadcast: {e}");
                None
            }
        }
    }
}
