use crate::{
    base::{AllDelays, ConfigError, ObservationSettings},
    metadata::{CoarseDelay, FineDelay, SubbandMetaData},
};
use itertools::zip_eq;

/// Generates per subband [`SubbandMetaData`] from two delay snapshots bracketing a block.
///
/// The decomposition is computed once per SAP and copied to every subband of that SAP. All
/// buffers are allocated at construction, [`MetaDataGenerator::generate`] does not allocate.
#[derive(Clone, Debug)]
pub struct MetaDataGenerator {
    per_sap: Vec<SubbandMetaData>,
    sample_rate: f64,
    subband_to_sap: Vec<usize>,
}

impl MetaDataGenerator {
    /// Create a new [`MetaDataGenerator`].
    ///
    /// The i-th SAP carries `tab_counts[i]` coherent TABs, the j-th subband belongs to the SAP
    /// `subband_to_sap[j]`. Panics if a subband refers to an unknown SAP.
    pub fn new(sample_rate: f64, tab_counts: &[usize], subband_to_sap: &[usize]) -> Self {
        assert!(
            subband_to_sap.iter().all(|sap| *sap < tab_counts.len()),
            "subband refers to an unknown sap"
        );

        Self {
            per_sap: tab_counts
                .iter()
                .map(|count| SubbandMetaData::new(count + 1))
                .collect(),
            sample_rate,
            subband_to_sap: subband_to_sap.to_vec(),
        }
    }

    /// Create a new [`MetaDataGenerator`] for an observation.
    pub fn from_settings(settings: &ObservationSettings) -> Result<Self, ConfigError> {
        settings.validate()?;

        Ok(Self::new(
            settings.subband_sample_rate,
            &settings.tab_counts(),
            &settings.subband_to_sap,
        ))
    }

    /// Compute the metadata of all subbands from the snapshots at the begin and at the end of a
    /// block.
    ///
    /// Panics if the snapshots do not match the SAP/TAB layout of the generator, or if `output`
    /// does not match [`MetaDataGenerator::template`].
    pub fn generate(&mut self, begin: &AllDelays, end: &AllDelays, output: &mut [SubbandMetaData]) {
        assert_eq!(
            begin.len(),
            self.per_sap.len(),
            "snapshot has the wrong number of saps"
        );
        assert!(begin.same_shape(end), "snapshots have different shapes");
        assert_eq!(
            output.len(),
            self.subband_to_sap.len(),
            "output has the wrong number of subbands"
        );

        for (metadata, (sap_begin, sap_end)) in zip_eq(&mut self.per_sap, zip_eq(begin, end)) {
            assert_eq!(
                metadata.beams.len(),
                sap_begin.nr_beams(),
                "snapshot has the wrong number of tabs"
            );

            let coarse = CoarseDelay::from_bracket(
                sap_begin.sap.total_delay(),
                sap_end.sap.total_delay(),
                self.sample_rate,
            );

            metadata.read_offset = coarse.read_offset();

            for (fine, (beam_begin, beam_end)) in
                zip_eq(&mut metadata.beams, zip_eq(sap_begin.beams(), sap_end.beams()))
            {
                *fine = FineDelay {
                    delay_at_begin: beam_begin.total_delay() - coarse.seconds,
                    delay_after_end: beam_end.total_delay() - coarse.seconds,
                };
            }
        }

        for (subband, sap) in zip_eq(output, &self.subband_to_sap) {
            let metadata = &self.per_sap[*sap];

            assert_eq!(
                subband.beams.len(),
                metadata.beams.len(),
                "output has the wrong number of beams"
            );

            subband.read_offset = metadata.read_offset;
            subband.beams.copy_from_slice(&metadata.beams);
        }
    }

    /// Returns the number of subbands.
    pub fn nr_subbands(&self) -> usize {
        self.subband_to_sap.len()
    }

    /// Returns the subband sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Returns the SAP index of every subband.
    pub fn subband_to_sap(&self) -> &[usize] {
        &self.subband_to_sap
    }

    /// Returns zero'd output buffers for [`MetaDataGenerator::generate`].
    pub fn template(&self) -> Vec<SubbandMetaData> {
        self.subband_to_sap
            .iter()
            .map(|sap| SubbandMetaData::new(self.per_sap[*sap].beams.len()))
            .collect()
    }

    /// Set all read offsets and fine delays to zero, used when no delays are tracked.
    pub fn zero(output: &mut [SubbandMetaData]) {
        output.iter_mut().for_each(SubbandMetaData::clear);
    }
}
