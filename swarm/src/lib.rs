//! The control loop run on every robot of an aggregating swarm.
//!
//! Each tick a robot ages its table of distance estimates, takes in one packet from the
//! broadcast medium, announces its own table, and steers towards its peers while keeping clear
//! of obstacles.

pub mod config;
pub mod controller;
pub mod motion;
pub mod peer;
pub mod protocol;
pub mod table;
pub mod telemetry;

pub use config::{ConfigError, ControllerConfig};
pub use controller::{BuildError, Controller, ControllerBuilder, ControllerState, TickReport};
pub use motion::{Behavior, Decision, MotionController};
pub use peer::PeerId;
pub use protocol::{CodecError, Header, Packet};
pub use table::{Confidence, DistanceEntry, DistanceTable};
pub use telemetry::{DistanceRecord, DistancesRecord, TelemetryRecord};
