use crate::base::Epoch;
use derive_more::{Deref, IntoIterator};
use itertools::zip_eq;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A single computed delay of one beam at one epoch.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Delay {
    /// Unit direction vector of the beam in the Earth-fixed frame.
    pub direction: Vector3<f64>,

    /// Arrival time difference of the wavefront w.r.t. the reference phase centre (in seconds).
    pub geometric_delay: f64,

    /// Fixed instrumental delay of the station (in seconds).
    pub clock_correction: f64,
}

impl Default for Delay {
    fn default() -> Self {
        Self {
            direction: Vector3::zeros(),
            geometric_delay: 0.0,
            clock_correction: 0.0,
        }
    }
}

impl Delay {
    /// Returns the delay that must be compensated, the sum of the geometric delay and the clock
    /// correction.
    pub fn total_delay(&self) -> f64 {
        self.geometric_delay + self.clock_correction
    }
}

/// The delays of one sub-array pointing: the station beam and its coherent tied-array beams.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SapDelays {
    /// Delay of the station beam, i.e. of the SAP direction itself.
    pub sap: Delay,

    /// Delays of the coherent tied-array beams, in configuration order.
    pub tabs: Vec<Delay>,
}

impl SapDelays {
    /// Iterate over all beams in output order: the station beam first, followed by the TABs.
    pub fn beams(&self) -> impl Iterator<Item = &Delay> {
        std::iter::once(&self.sap).chain(self.tabs.iter())
    }

    /// Returns the number of beams (station beam and TABs).
    pub fn nr_beams(&self) -> usize {
        self.tabs.len() + 1
    }
}

/// A snapshot of all delays at a single epoch.
///
/// The number of SAPs and the number of TABs per SAP are fixed when the snapshot is created, so
/// that snapshots can be overwritten in place without reallocation.
#[derive(Clone, Debug, Default, Deref, Deserialize, IntoIterator, PartialEq, Serialize)]
pub struct AllDelays {
    /// The epoch for which the delays were computed.
    epoch: Epoch,

    /// Per SAP delays.
    #[deref]
    #[into_iterator(ref)]
    saps: Vec<SapDelays>,
}

impl AllDelays {
    /// Create a new zero'd [`AllDelays`] with `tab_counts[i]` TABs for the i-th SAP.
    pub fn new(tab_counts: &[usize]) -> Self {
        Self {
            epoch: Epoch::default(),
            saps: tab_counts
                .iter()
                .map(|count| SapDelays {
                    sap: Delay::default(),
                    tabs: vec![Delay::default(); *count],
                })
                .collect(),
        }
    }

    /// Overwrite `self` with the contents of `other`, without reallocating.
    ///
    /// Panics if the two snapshots have different shapes.
    pub fn copy_from(&mut self, other: &Self) {
        assert!(
            self.same_shape(other),
            "snapshots must have the same number of saps and tabs"
        );

        self.epoch = other.epoch;

        for (lhs, rhs) in zip_eq(self.saps.iter_mut(), other.saps.iter()) {
            lhs.sap = rhs.sap;
            lhs.tabs.copy_from_slice(&rhs.tabs);
        }
    }

    /// Returns the epoch of the snapshot.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Returns `true` if both snapshots have the same number of SAPs and TABs per SAP.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.saps.len() == other.saps.len()
            && self
                .saps
                .iter()
                .zip(other.saps.iter())
                .all(|(lhs, rhs)| lhs.tabs.len() == rhs.tabs.len())
    }

    /// Returns a mutable slice over the per SAP delays.
    pub fn saps_mut(&mut self) -> &mut [SapDelays] {
        &mut self.saps
    }

    /// Set the epoch of the snapshot.
    pub fn set_epoch(&mut self, epoch: Epoch) {
        self.epoch = epoch;
    }

    /// Returns the number of TABs per SAP.
    pub fn tab_counts(&self) -> Vec<usize> {
        self.saps.iter().map(|sap| sap.tabs.len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delay(geometric_delay: f64, clock_correction: f64) -> Delay {
        Delay {
            direction: Vector3::z(),
            geometric_delay,
            clock_correction,
        }
    }

    #[test]
    fn test_total_delay() {
        assert_eq!(delay(1.5e-3, 2.0e-6).total_delay(), 1.5e-3 + 2.0e-6);
    }

    #[test]
    fn test_snapshot_shape() {
        let snapshot = AllDelays::new(&[2, 0, 3]);

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.tab_counts(), vec![2, 0, 3]);
        assert_eq!(snapshot[1].nr_beams(), 1);
        assert_eq!(snapshot[2].beams().count(), 4);
        assert!(!snapshot.same_shape(&AllDelays::new(&[2, 1, 3])));
    }

    #[test]
    fn test_copy_from() {
        let mut source = AllDelays::new(&[1]);

        source.set_epoch(Epoch::new(42));
        source.saps_mut()[0].sap = delay(1.0, 0.5);
        source.saps_mut()[0].tabs[0] = delay(2.0, 0.5);

        let mut target = AllDelays::new(&[1]);

        target.copy_from(&source);

        assert_eq!(target, source);
        assert_eq!(target.epoch(), Epoch::new(42));
        assert_eq!(target[0].beams().map(Delay::total_delay).sum::<f64>(), 4.0);
    }

    #[test]
    #[should_panic]
    fn test_copy_from_mismatched_shape() {
        AllDelays::new(&[1]).copy_from(&AllDelays::new(&[2]));
    }
}
