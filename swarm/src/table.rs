use std::ops::Mul;

use crate::peer::PeerId;

/// Multiplicative decay applied to every confidence once per tick.
pub const DECAY_FACTOR: f32 = 0.99;

/// Trust in a distance estimate, nominally in the range 0-1.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Confidence(f32);

impl Mul<f32> for Confidence {
    type Output = Confidence;

    fn mul(self, rhs: f32) -> Self::Output {
        Confidence(self.0 * rhs)
    }
}

impl Confidence {
    pub const CERTAIN: Confidence = Confidence(1.0);

    /// Values received from peers are taken as they are.
    pub const fn new_unchecked(value: f32) -> Confidence {
        Confidence(value)
    }

    pub fn new(value: f32) -> Confidence {
        assert!(
            (0.0..=1.0).contains(&value),
            "A confidence needs to be in the interval [0.0, 1.0], got: {value}"
        );
        Confidence(value)
    }

    pub fn value(&self) -> f32 {
        self.0
    }

    /// Whole percent, truncated towards zero. Values received from peers outside 0-1 are
    /// clamped into 0-100.
    pub fn percent(&self) -> i32 {
        (self.0.clamp(0.0, 1.0) * 100.0) as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceEntry {
    pub range: f32,
    pub confidence: Confidence,
}

impl Default for DistanceEntry {
    fn default() -> Self {
        Self {
            range: 0.0,
            confidence: Confidence::CERTAIN,
        }
    }
}

impl DistanceEntry {
    pub fn new(range: f32, confidence: Confidence) -> Self {
        Self { range, confidence }
    }

    /// A fresh measurement, fully trusted.
    pub fn measured(range: f32) -> Self {
        Self::new(range, Confidence::CERTAIN)
    }
}

/// Latest known distance to every robot of the swarm, indexed by peer.
/// The number of slots only changes through [`DistanceTable::reset`].
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceTable {
    entries: Vec<DistanceEntry>,
}

impl DistanceTable {
    pub fn new(size: usize) -> Self {
        Self {
            entries: vec![DistanceEntry::default(); size],
        }
    }

    pub fn reset(&mut self, size: usize) {
        self.entries.clear();
        self.entries.resize(size, DistanceEntry::default());
    }

    /// Ages all entries by one tick.
    pub fn decay(&mut self) {
        for e in self.entries.iter_mut() {
            e.confidence = e.confidence * DECAY_FACTOR;
        }
    }

    /// Stores a fresh measurement for `peer`. IDs outside the table are ignored and `false` is returned.
    pub fn update(&mut self, peer: PeerId, range: f32) -> bool {
        match peer.index().and_then(|i| self.entries.get_mut(i)) {
            Some(entry) => {
                *entry = DistanceEntry::measured(range);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, peer: PeerId) -> Option<&DistanceEntry> {
        peer.index().and_then(|i| self.entries.get(i))
    }

    pub fn entries(&self) -> &[DistanceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn peer(c: char) -> PeerId {
        PeerId::from_char(c).unwrap()
    }

    #[test]
    fn new_table_is_certain() {
        let table = DistanceTable::new(4);
        assert_eq!(table.len(), 4);
        assert!(table
            .entries()
            .iter()
            .all(|e| *e == DistanceEntry::new(0.0, Confidence::CERTAIN)));
    }

    #[test]
    fn decay_is_multiplicative() {
        let mut table = DistanceTable::new(3);
        table.decay();
        for e in table.entries() {
            assert_relative_eq!(e.confidence.value(), 0.99);
        }

        let before: Vec<f32> = table.entries().iter().map(|e| e.confidence.value()).collect();
        table.decay();
        for (e, b) in table.entries().iter().zip(before) {
            assert_relative_eq!(e.confidence.value(), b * 0.99);
            assert!(e.confidence.value() < b);
        }
    }

    #[test]
    fn update_resets_confidence() {
        let mut table = DistanceTable::new(3);
        for _ in 0..50 {
            table.decay();
        }

        assert!(table.update(peer('B'), 1.5));
        assert_eq!(table.get(peer('B')), Some(&DistanceEntry::measured(1.5)));

        // the other slots keep their decayed value
        assert!(table.get(peer('A')).unwrap().confidence.value() < 1.0);
        assert!(table.get(peer('C')).unwrap().confidence.value() < 1.0);
    }

    #[test]
    fn out_of_range_update_is_ignored() {
        let mut table = DistanceTable::new(3);
        let before = table.clone();

        assert!(!table.update(peer('D'), 2.0));
        assert!(!table.update(PeerId::from_byte(b'0'), 2.0));
        assert!(!table.update(PeerId::NULL, 2.0));
        assert_eq!(table, before);
    }

    #[test]
    fn reset_changes_size_and_restores_entries() {
        let mut table = DistanceTable::new(3);
        table.update(peer('A'), 4.0);
        table.decay();

        table.reset(5);
        assert_eq!(table.len(), 5);
        assert!(table.entries().iter().all(|e| *e == DistanceEntry::default()));
    }

    #[test]
    fn confidence_percent_truncates() {
        assert_eq!(Confidence::CERTAIN.percent(), 100);
        assert_eq!(Confidence::new(0.999).percent(), 99);
        assert_eq!(Confidence::new(0.0).percent(), 0);
    }

    #[test]
    fn corrupt_confidence_reports_within_bounds() {
        assert_eq!(Confidence::new_unchecked(3.5).percent(), 100);
        assert_eq!(Confidence::new_unchecked(-0.2).percent(), 0);
        assert_eq!(Confidence::new_unchecked(f32::NAN).percent(), 0);
    }
}
