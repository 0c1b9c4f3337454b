use common::capability::TelemetrySink;

use crate::{peer::PeerId, table::DistanceEntry};

/// Percent certainty reported for a distance that was just measured.
const MEASURED_CERTAINTY: i32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceRecord {
    pub other_robot_id: PeerId,
    pub distance: f32,
    /// Whole percent.
    pub certainty: i32,
}

/// The table a peer announced, as decoded from its packet.
#[derive(Debug, Clone, PartialEq)]
pub struct DistancesRecord {
    pub robot_id: PeerId,
    pub ranges: Vec<DistanceRecord>,
}

/// What a controller reports, tagged with the robot that reports it.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryRecord {
    Distance {
        robot: PeerId,
        record: DistanceRecord,
    },
    Distances {
        robot: PeerId,
        record: DistancesRecord,
    },
}

impl TelemetryRecord {
    pub fn robot(&self) -> PeerId {
        match self {
            TelemetryRecord::Distance { robot, .. } | TelemetryRecord::Distances { robot, .. } => {
                *robot
            }
        }
    }
}

/// Discards everything. Used when the host does not listen for telemetry.
pub struct NullSink;

impl TelemetrySink<TelemetryRecord> for NullSink {
    fn publish(&mut self, _record: TelemetryRecord) {}
}

/// Records collected during a tick, handed off once at its end.
#[derive(Debug, Default)]
pub struct StagedTelemetry {
    distance: Option<DistanceRecord>,
    distances: Option<DistancesRecord>,
}

impl StagedTelemetry {
    pub fn stage_measurement(&mut self, other: PeerId, range: f32) {
        self.distance = Some(DistanceRecord {
            other_robot_id: other,
            distance: range,
            certainty: MEASURED_CERTAINTY,
        });
    }

    /// Stages the entries of a peer's packet, slot `k` belonging to robot `'A' + k`.
    pub fn stage_announced(&mut self, peer: PeerId, entries: impl IntoIterator<Item = DistanceEntry>) {
        let ranges = entries
            .into_iter()
            .enumerate()
            .filter_map(|(k, e)| {
                PeerId::from_index(k).map(|id| DistanceRecord {
                    other_robot_id: id,
                    distance: e.range,
                    certainty: e.confidence.percent(),
                })
            })
            .collect();

        self.distances = Some(DistancesRecord {
            robot_id: peer,
            ranges,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.distance.is_none() && self.distances.is_none()
    }

    pub fn clear(&mut self) {
        self.distance = None;
        self.distances = None;
    }

    /// Publishes whatever is staged and leaves nothing behind.
    pub fn flush(&mut self, robot: PeerId, sink: &mut dyn TelemetrySink<TelemetryRecord>) {
        if let Some(record) = self.distances.take() {
            sink.publish(TelemetryRecord::Distances { robot, record });
        }
        if let Some(record) = self.distance.take() {
            sink.publish(TelemetryRecord::Distance { robot, record });
        }
    }
}

#[cfg(test)]
mod tests {
    use common::capability::ChannelSink;

    use super::*;
    use crate::table::Confidence;

    fn peer(c: char) -> PeerId {
        PeerId::from_char(c).unwrap()
    }

    #[test]
    fn flush_publishes_once() {
        let (mut sink, recv) = ChannelSink::<TelemetryRecord>::new();
        let mut staged = StagedTelemetry::default();

        staged.stage_measurement(peer('B'), 12.5);
        staged.stage_announced(
            peer('B'),
            [
                DistanceEntry::new(3.0, Confidence::new(0.5)),
                DistanceEntry::new(0.0, Confidence::new(0.987)),
            ],
        );
        assert!(!staged.is_empty());

        staged.flush(peer('A'), &mut sink);
        assert!(staged.is_empty());
        staged.flush(peer('A'), &mut sink);

        let records: Vec<_> = recv.try_iter().collect();
        assert_eq!(
            records,
            vec![
                TelemetryRecord::Distances {
                    robot: peer('A'),
                    record: DistancesRecord {
                        robot_id: peer('B'),
                        ranges: vec![
                            DistanceRecord {
                                other_robot_id: peer('A'),
                                distance: 3.0,
                                certainty: 50,
                            },
                            DistanceRecord {
                                other_robot_id: peer('B'),
                                distance: 0.0,
                                certainty: 98,
                            },
                        ],
                    },
                },
                TelemetryRecord::Distance {
                    robot: peer('A'),
                    record: DistanceRecord {
                        other_robot_id: peer('B'),
                        distance: 12.5,
                        certainty: 100,
                    },
                },
            ]
        );
        assert!(records.iter().all(|r| r.robot() == peer('A')));
    }

    #[test]
    fn announced_certainty_stays_in_percent_range() {
        let (mut sink, recv) = ChannelSink::<TelemetryRecord>::new();
        let mut staged = StagedTelemetry::default();
        staged.stage_announced(
            peer('B'),
            [
                DistanceEntry::new(1.0, Confidence::new_unchecked(7.0)),
                DistanceEntry::new(2.0, Confidence::new_unchecked(-1.0)),
            ],
        );
        staged.flush(peer('A'), &mut sink);

        let Ok(TelemetryRecord::Distances { record, .. }) = recv.try_recv() else {
            panic!("expected the announced table");
        };
        let certainties: Vec<i32> = record.ranges.iter().map(|r| r.certainty).collect();
        assert_eq!(certainties, vec![100, 0]);
    }

    #[test]
    fn clear_drops_staged_records() {
        let (mut sink, recv) = ChannelSink::<TelemetryRecord>::new();
        let mut staged = StagedTelemetry::default();
        staged.stage_measurement(peer('C'), 1.0);
        staged.clear();
        staged.flush(peer('A'), &mut sink);
        assert!(recv.try_recv().is_err());
    }
}
