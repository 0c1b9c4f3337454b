//! A kinematic arena in which a swarm of aggregation controllers can be run without hardware.
//!
//! The arena stands in for everything outside a controller: it measures ranges and bearings
//! between robots, casts the proximity rays, writes every robot's attraction vector and moves
//! the robots according to their last wheel command. There are no collisions.

use std::{f32::consts::TAU, fs, path::Path, sync::mpsc::Receiver};

use anyhow::{anyhow, bail};
use common::{
    capability::{straight_ahead, ChannelSink, SharedAttraction},
    math::{angle_of, polar, signed_normalize},
    robot::{Pose, ProximityReading, RangeAndBearingPacket},
};
use nalgebra::{Point2, Vector2};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Deserialize;
use statrs::distribution::Normal;
use swarm::{Controller, ControllerBuilder, ControllerConfig, TelemetryRecord};

use scene::ray::{Circle, Intersect, Ray, Scene};

pub mod port;
pub mod scene;

use port::RobotPort;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Applied to every robot, with `id` and `seed` replaced per robot.
    pub controller: ControllerConfig,
    pub robots: usize,

    /// Side length of the square arena.
    pub arena_size: f32,
    pub robot_radius: f32,
    pub wheel_base: f32,

    /// Duration of one tick.
    pub dt: f32,

    pub rab_range: f32,
    /// Standard deviation of the range measurement noise, 0 for exact ranges.
    pub range_noise: f32,

    pub proximity_range: f32,
    pub proximity_sensors: usize,

    pub seed: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            robots: 10,
            arena_size: 300.0,
            robot_radius: 8.5,
            wheel_base: 14.0,
            dt: 0.1,
            rab_range: 300.0,
            range_noise: 0.0,
            proximity_range: 10.0,
            proximity_sensors: 24,
            seed: 0,
        }
    }
}

impl ArenaConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        // read file contents
        let contents = fs::read_to_string(path)?;

        Self::from_contents(&contents)
    }

    pub fn from_contents(contents: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(contents).map_err(|e| anyhow!(e))
    }

    /// The controller configuration of the `index`th robot.
    fn controller_config(&self, index: usize) -> anyhow::Result<ControllerConfig> {
        let id = u8::try_from(index)
            .ok()
            .and_then(|i| b'A'.checked_add(i))
            .ok_or_else(|| anyhow!("no robot ID for index {index}"))?;

        Ok(ControllerConfig {
            id: id as char,
            seed: Some(
                self.controller
                    .seed
                    .unwrap_or(self.seed)
                    .wrapping_add(index as u64),
            ),
            ..self.controller.clone()
        })
    }
}

/// A snapshot of the arena after a tick.
#[derive(Debug, Clone)]
pub struct Statistics {
    pub tick: u64,
    pub positions: Vec<Pose>,
    pub mean_pairwise_distance: f32,
    /// Number of robots that took in a packet during the tick.
    pub exchanged: usize,
}

struct Robot {
    pose: Pose,
    port: RobotPort,
    attraction: SharedAttraction,
    controller: Controller,
}

pub struct Arena {
    config: ArenaConfig,
    scene: Scene,
    robots: Vec<Robot>,
    telemetry: Receiver<TelemetryRecord>,
    telemetry_count: usize,
    noise: Option<Normal>,
    rng: StdRng,
    tick: u64,
}

impl Arena {
    pub fn new(config: ArenaConfig) -> anyhow::Result<Self> {
        if config.robots > config.controller.robot_count {
            bail!(
                "{} robots do not fit a distance table of {}",
                config.robots,
                config.controller.robot_count
            );
        }
        if !(config.arena_size > 2.0 * config.robot_radius) {
            bail!("arena of size {} is too small", config.arena_size);
        }

        let noise = if config.range_noise > 0.0 {
            Some(Normal::new(0.0, config.range_noise as f64).map_err(|e| anyhow!(e))?)
        } else {
            None
        };

        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut scene = Scene::new();
        scene.add_rect(
            Point2::new(0.0, 0.0),
            Vector2::new(config.arena_size, config.arena_size),
        );

        let (sink, telemetry) = ChannelSink::<TelemetryRecord>::new();

        let low = config.robot_radius;
        let high = config.arena_size - config.robot_radius;
        let mut robots = Vec::with_capacity(config.robots);
        for i in 0..config.robots {
            let port = RobotPort::new();
            let attraction = SharedAttraction::default();

            let controller = ControllerBuilder::new(config.controller_config(i)?)
                .proximity(port.clone())
                .range_and_bearing_sensor(port.clone())
                .range_and_bearing_actuator(port.clone())
                .wheels(port.clone())
                .attraction(attraction.clone())
                .telemetry(sink.clone())
                .build()?;

            let pose = Pose::new(
                rng.gen_range(low..high),
                rng.gen_range(low..high),
                rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI),
            );

            robots.push(Robot {
                pose,
                port,
                attraction,
                controller,
            });
        }

        tracing::info!("created arena with {} robots", robots.len());

        Ok(Self {
            config,
            scene,
            robots,
            telemetry,
            telemetry_count: 0,
            noise,
            rng,
            tick: 0,
        })
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.robots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }

    pub fn controller(&self, index: usize) -> Option<&Controller> {
        self.robots.get(index).map(|r| &r.controller)
    }

    pub fn poses(&self) -> Vec<Pose> {
        self.robots.iter().map(|r| r.pose).collect()
    }

    pub fn set_pose(&mut self, index: usize, pose: Pose) {
        if let Some(r) = self.robots.get_mut(index) {
            r.pose = pose;
        }
    }

    /// Total number of telemetry records published so far.
    pub fn telemetry_count(&self) -> usize {
        self.telemetry_count
    }

    /// Resets every controller and attraction vector, poses are kept.
    pub fn reset(&mut self) {
        for r in &mut self.robots {
            r.controller.reset();
            r.attraction.reset();
        }
        self.tick = 0;
    }

    /// Senses, runs every controller once and moves the robots.
    pub fn tick(&mut self) -> Statistics {
        let poses = self.poses();

        // what is on the air at the start of the tick
        let outboxes: Vec<Option<Vec<u8>>> = self.robots.iter().map(|r| r.port.outbox()).collect();

        for i in 0..self.robots.len() {
            let packets = self.packets_for(i, &poses, &outboxes);
            let readings = self.readings_for(i, &poses);
            let attraction = self.attraction_for(i, &poses);

            let robot = &self.robots[i];
            robot.port.deliver(readings, packets);
            robot.attraction.set(attraction);
        }

        let mut exchanged = 0;
        for robot in &mut self.robots {
            let report = robot.controller.control_step();
            if report.received_from.is_some() {
                exchanged += 1;
            }
        }

        let low = self.config.robot_radius;
        let high = self.config.arena_size - self.config.robot_radius;
        for robot in &mut self.robots {
            let command = robot.port.command();
            motion_model(
                &mut robot.pose,
                command.speed_left * self.config.dt,
                command.speed_right * self.config.dt,
                self.config.wheel_base,
            );
            robot.pose.x = robot.pose.x.clamp(low, high);
            robot.pose.y = robot.pose.y.clamp(low, high);
        }

        self.telemetry_count += self.telemetry.try_iter().count();
        self.tick += 1;

        let positions = self.poses();
        let statistics = Statistics {
            tick: self.tick,
            mean_pairwise_distance: mean_pairwise_distance(&positions),
            positions,
            exchanged,
        };
        tracing::trace!("{statistics:?}");
        statistics
    }

    /// The packets robot `i` receives: those of every other robot within range that has
    /// broadcast at least once.
    fn packets_for(
        &mut self,
        i: usize,
        poses: &[Pose],
        outboxes: &[Option<Vec<u8>>],
    ) -> Vec<RangeAndBearingPacket> {
        let me = poses[i];
        let mut packets = Vec::new();

        for (j, (other, data)) in poses.iter().zip(outboxes).enumerate() {
            let Some(data) = data else {
                continue;
            };
            if i == j {
                continue;
            }

            let delta = other.position() - me.position();
            let distance = delta.norm();
            if distance > self.config.rab_range {
                continue;
            }

            let range = match &self.noise {
                Some(noise) => (distance + self.rng.sample(noise) as f32).max(0.0),
                None => distance,
            };

            packets.push(RangeAndBearingPacket {
                data: data.clone(),
                range,
                bearing: signed_normalize(angle_of(&delta) - me.theta),
            });
        }

        packets
    }

    /// Casts the ring of proximity rays of robot `i` against the walls and the other robots.
    fn readings_for(&self, i: usize, poses: &[Pose]) -> Vec<ProximityReading> {
        let me = poses[i];
        let bodies: Vec<Circle> = poses
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, p)| Circle::new(p.position(), self.config.robot_radius))
            .collect();

        let n = self.config.proximity_sensors;
        (0..n)
            .map(|k| {
                let angle = signed_normalize((k as f32 + 0.5) * TAU / n as f32);
                let ray = Ray::from_origin_angle(me.position(), me.theta + angle);

                let hit = bodies
                    .iter()
                    .filter_map(|b| b.intersect(&ray))
                    .chain(self.scene.intersect(&ray))
                    .fold(f32::INFINITY, f32::min);

                // measured from the hull of the robot
                let distance = (hit - self.config.robot_radius).max(0.0);
                let value = if distance < self.config.proximity_range {
                    1.0 - distance / self.config.proximity_range
                } else {
                    0.0
                };

                ProximityReading::new(value, angle)
            })
            .collect()
    }

    /// Unit vector in the frame of robot `i` towards the centroid of the peers it can hear.
    fn attraction_for(&self, i: usize, poses: &[Pose]) -> Vector2<f32> {
        let me = poses[i].position();

        let (sum, count) = poses
            .iter()
            .enumerate()
            .filter(|(j, p)| *j != i && (p.position() - me).norm() <= self.config.rab_range)
            .fold((Vector2::zeros(), 0), |(sum, count), (_, p)| {
                (sum + p.position().coords, count + 1)
            });

        if count == 0 {
            return straight_ahead();
        }

        let towards = sum / count as f32 - me.coords;
        if towards.norm() == 0.0 {
            return straight_ahead();
        }

        polar(1.0, signed_normalize(angle_of(&towards) - poses[i].theta))
    }
}

/// Moves a differential drive robot whose wheels travelled `sl` and `sr`.
fn motion_model(pose: &mut Pose, sl: f32, sr: f32, wheel_base: f32) {
    // from https://rossum.sourceforge.net/papers/DiffSteer/DiffSteer.html
    let sbar = (sr + sl) / 2.0;
    pose.theta = signed_normalize(pose.theta + (sr - sl) / wheel_base);
    pose.x += sbar * pose.theta.cos();
    pose.y += sbar * pose.theta.sin();
}

pub fn mean_pairwise_distance(poses: &[Pose]) -> f32 {
    let mut sum = 0.0;
    let mut pairs = 0;
    for (i, a) in poses.iter().enumerate() {
        for b in &poses[i + 1..] {
            sum += (a.position() - b.position()).norm();
            pairs += 1;
        }
    }

    if pairs == 0 {
        0.0
    } else {
        sum / pairs as f32
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, PI};

    use super::*;

    fn config(robots: usize) -> ArenaConfig {
        ArenaConfig {
            controller: ControllerConfig {
                bandwidth: 2 + 8 * 4,
                robot_count: 4,
                ..Default::default()
            },
            robots,
            arena_size: 1000.0,
            ..Default::default()
        }
    }

    #[test]
    fn motion_model_straight_and_turn() {
        let mut pose = Pose::new(0.0, 0.0, 0.0);
        motion_model(&mut pose, 1.0, 1.0, 0.1);
        assert_relative_eq!(pose.x, 1.0);
        assert_relative_eq!(pose.y, 0.0);

        let mut pose = Pose::new(0.0, 0.0, 0.0);
        motion_model(&mut pose, -0.05, 0.05, 0.1);
        assert_relative_eq!(pose.theta, 1.0);
        assert_relative_eq!(pose.x, 0.0);
    }

    #[test]
    fn pairwise_distance() {
        assert_eq!(mean_pairwise_distance(&[]), 0.0);
        assert_eq!(mean_pairwise_distance(&[Pose::default()]), 0.0);

        let poses = [
            Pose::new(0.0, 0.0, 0.0),
            Pose::new(3.0, 4.0, 0.0),
            Pose::new(0.0, 4.0, 0.0),
        ];
        assert_relative_eq!(mean_pairwise_distance(&poses), (5.0 + 4.0 + 3.0) / 3.0);
    }

    #[test]
    fn parse_config() {
        let c = ArenaConfig::from_contents(
            "robots: 3\nrab_range: 50\ncontroller:\n  size: 26\n  num_robots: 3\n",
        )
        .unwrap();
        assert_eq!(c.robots, 3);
        assert_eq!(c.rab_range, 50.0);
        assert_eq!(c.controller.bandwidth, 26);
        assert_eq!(c.controller.robot_count, 3);
        assert_eq!(c.proximity_sensors, 24);

        let r = c.controller_config(2).unwrap();
        assert_eq!(r.id, 'C');
        assert_eq!(r.seed, Some(2));
    }

    #[test]
    fn too_many_robots_are_rejected() {
        assert!(Arena::new(config(5)).is_err());
        assert!(Arena::new(config(4)).is_ok());
    }

    #[test]
    fn sensing_between_two_robots() {
        let mut arena = Arena::new(config(2)).unwrap();
        arena.set_pose(0, Pose::new(100.0, 100.0, FRAC_PI_2));
        arena.set_pose(1, Pose::new(200.0, 100.0, PI));
        let poses = arena.poses();

        // nothing broadcast yet
        assert!(arena.packets_for(0, &poses, &[None, None]).is_empty());

        let outboxes = [Some(vec![b'A', b'A']), Some(vec![b'A', b'B'])];
        let packets = arena.packets_for(0, &poses, &outboxes);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].data, vec![b'A', b'B']);
        assert_relative_eq!(packets[0].range, 100.0);
        assert_relative_eq!(packets[0].bearing, -FRAC_PI_2, epsilon = 1e-6);

        let attraction = arena.attraction_for(1, &poses);
        assert_relative_eq!(attraction.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(attraction.y, 0.0, epsilon = 1e-6);

        // out of earshot
        arena.config.rab_range = 50.0;
        assert!(arena.packets_for(0, &poses, &outboxes).is_empty());
        assert_eq!(arena.attraction_for(0, &poses), straight_ahead());
    }

    #[test]
    fn proximity_sees_walls_and_robots() {
        let mut arena = Arena::new(config(2)).unwrap();
        arena.set_pose(0, Pose::new(500.0, 500.0, 0.0));
        arena.set_pose(1, Pose::new(900.0, 900.0, 0.0));
        let poses = arena.poses();
        let readings = arena.readings_for(0, &poses);
        assert_eq!(readings.len(), 24);
        assert!(readings.iter().all(|r| r.value == 0.0));

        // a peer right in front of the first robot
        arena.set_pose(1, Pose::new(500.0 + 2.0 * 8.5 + 5.0, 500.0, 0.0));
        let poses = arena.poses();
        let readings = arena.readings_for(0, &poses);
        let strongest = readings
            .iter()
            .max_by(|a, b| a.value.total_cmp(&b.value))
            .unwrap();
        assert!(strongest.value > 0.4);
        assert!(strongest.angle.abs() < FRAC_PI_2);

        // close to the left wall
        arena.set_pose(0, Pose::new(10.0, 500.0, 0.0));
        let poses = arena.poses();
        let readings = arena.readings_for(0, &poses);
        assert!(readings
            .iter()
            .filter(|r| r.angle.abs() > PI - 0.8)
            .all(|r| r.value > 0.0));
    }

    #[test]
    fn ticks_keep_robots_inside() {
        let mut arena = Arena::new(config(4)).unwrap();
        for _ in 0..200 {
            let stats = arena.tick();
            for p in &stats.positions {
                assert!((8.5..=991.5).contains(&p.x));
                assert!((8.5..=991.5).contains(&p.y));
            }
        }
        assert_eq!(arena.tick().tick, 201);

        arena.reset();
        assert_eq!(arena.tick().tick, 1);
    }
}
