use std::{fs, path::Path};

use anyhow::anyhow;
use serde::Deserialize;
use thiserror::Error;

use crate::peer::{PeerId, ID_BASE};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("num_robots must be between 1 and {max}, got {got}")]
    RobotCount { got: usize, max: usize },

    #[error("{name} must be positive, got {got}")]
    NotPositive { name: &'static str, got: f32 },

    #[error("alpha must be within [0, 180] degrees, got {0}")]
    Alpha(f32),

    #[error("size must be at most {max} bytes, got {got}")]
    Bandwidth { got: usize, max: usize },

    #[error("robot id {0:?} is not a single byte ID")]
    Id(char),
}

/// Parameters of one aggregation controller. Field names in files follow the historical
/// attribute names (`velocity`, `size`, `num_robots`).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    /// This robot's own ID character.
    pub id: char,

    /// Half-angle of the straight-ahead cone, in degrees.
    #[serde(rename = "alpha")]
    pub alpha_degrees: f32,

    /// Obstacle strength at which the robot stops following and pivots away.
    pub delta: f32,

    /// Maximum wheel speed.
    #[serde(rename = "velocity")]
    pub wheel_velocity: f32,

    /// Size in bytes of every broadcast packet.
    #[serde(rename = "size")]
    pub bandwidth: usize,

    #[serde(rename = "num_robots")]
    pub robot_count: usize,

    /// Seed of the packet sampling, random if absent.
    pub seed: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            id: ID_BASE as char,
            alpha_degrees: 10.0,
            delta: 0.5,
            wheel_velocity: 2.5,
            bandwidth: 10,
            robot_count: 10,
            seed: None,
        }
    }
}

impl ControllerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        // read file contents
        let contents = fs::read_to_string(path)?;

        Self::from_contents(&contents)
    }

    pub fn from_contents(contents: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(contents).map_err(|e| anyhow!(e))?;
        config.validate()?;
        Ok(config)
    }

    /// The largest packet the medium can be configured for.
    pub fn max_bandwidth() -> usize {
        usize::from(u16::MAX)
    }

    /// The largest swarm whose IDs still fit in a byte, `'A'` through `0xFF`.
    pub fn max_robot_count() -> usize {
        usize::from(u8::MAX - ID_BASE) + 1
    }

    pub fn peer_id(&self) -> Option<PeerId> {
        PeerId::from_char(self.id).filter(|id| !id.is_null())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = Self::max_robot_count();
        if self.robot_count == 0 || self.robot_count > max {
            return Err(ConfigError::RobotCount {
                got: self.robot_count,
                max,
            });
        }

        if self.bandwidth > Self::max_bandwidth() {
            return Err(ConfigError::Bandwidth {
                got: self.bandwidth,
                max: Self::max_bandwidth(),
            });
        }

        if !(self.wheel_velocity > 0.0) {
            return Err(ConfigError::NotPositive {
                name: "velocity",
                got: self.wheel_velocity,
            });
        }

        if !(self.delta > 0.0) {
            return Err(ConfigError::NotPositive {
                name: "delta",
                got: self.delta,
            });
        }

        if !(0.0..=180.0).contains(&self.alpha_degrees) {
            return Err(ConfigError::Alpha(self.alpha_degrees));
        }

        if self.peer_id().is_none() {
            return Err(ConfigError::Id(self.id));
        }

        Ok(())
    }
}
