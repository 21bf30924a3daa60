use crate::base::Epoch;
use log::debug;
use thiserror::Error;

/// Errors associated with reading samples from a [`BeamletSource`].
#[allow(missing_docs)]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SourceError {
    #[error("samples {begin}..{end} of subband {subband} are not available (stored {first}..{last})")]
    OutOfRange {
        subband: usize,
        begin: i64,
        end: i64,
        first: i64,
        last: i64,
    },
    #[error("unknown subband {0}")]
    UnknownSubband(usize),
}

/// A trait that is shared by all stores of received beamlet samples.
pub trait BeamletSource {
    /// The sample type, e.g. a complex integer pair.
    type Sample: Copy + Default;

    /// Copy the samples `begin..begin + output.len()` of `subband` into `output`.
    ///
    /// The window is addressed in samples since the observation start and may start before it.
    fn read(
        &self,
        subband: usize,
        begin: i64,
        output: &mut [Self::Sample],
    ) -> Result<(), SourceError>;
}

/// An in-memory [`BeamletSource`] that stores a contiguous range of samples per subband.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryBeamletBuffer<S> {
    first: i64,
    subbands: Vec<Vec<S>>,
}

impl<S> MemoryBeamletBuffer<S>
where
    S: Copy + Default,
{
    /// Create a new [`MemoryBeamletBuffer`] holding `nr_samples` zero samples per subband, the
    /// first one at sample `first`.
    pub fn new(nr_subbands: usize, first: i64, nr_samples: usize) -> Self {
        debug!(
            "allocating beamlet buffer ({} subbands, {} samples starting at {})",
            nr_subbands, nr_samples, first
        );

        Self {
            first,
            subbands: vec![vec![S::default(); nr_samples]; nr_subbands],
        }
    }

    /// Create a new [`MemoryBeamletBuffer`] from a sample generating function.
    ///
    /// The function is called with the subband index and the sample index (since the
    /// observation start).
    pub fn from_fn<F>(nr_subbands: usize, first: i64, nr_samples: usize, func: F) -> Self
    where
        F: Fn(usize, i64) -> S,
    {
        Self {
            first,
            subbands: (0..nr_subbands)
                .map(|subband| {
                    (0..nr_samples as i64)
                        .map(|idx| func(subband, first + idx))
                        .collect()
                })
                .collect(),
        }
    }

    /// Returns the first stored sample index.
    pub fn first(&self) -> i64 {
        self.first
    }

    /// Returns the index one past the last stored sample.
    pub fn last(&self) -> i64 {
        self.first + self.subbands.first().map_or(0, |samples| samples.len()) as i64
    }

    /// Returns the number of subbands.
    pub fn nr_subbands(&self) -> usize {
        self.subbands.len()
    }

    /// Overwrite the samples of `subband` starting at `epoch`.
    pub fn write(&mut self, subband: usize, epoch: Epoch, samples: &[S]) -> Result<(), SourceError> {
        let (first, last) = (self.first, self.last());
        let begin = epoch.samples() as i64;
        let end = begin + samples.len() as i64;

        let stored = self
            .subbands
            .get_mut(subband)
            .ok_or(SourceError::UnknownSubband(subband))?;

        if begin < first || end > last {
            return Err(SourceError::OutOfRange {
                subband,
                begin,
                end,
                first,
                last,
            });
        }

        stored[(begin - first) as usize..(end - first) as usize].copy_from_slice(samples);

        Ok(())
    }
}

impl<S> BeamletSource for MemoryBeamletBuffer<S>
where
    S: Copy + Default,
{
    type Sample = S;

    fn read(&self, subband: usize, begin: i64, output: &mut [S]) -> Result<(), SourceError> {
        let stored = self
            .subbands
            .get(subband)
            .ok_or(SourceError::UnknownSubband(subband))?;

        let end = begin + output.len() as i64;

        if begin < self.first || end > self.last() {
            return Err(SourceError::OutOfRange {
                subband,
                begin,
                end,
                first: self.first,
                last: self.last(),
            });
        }

        output.copy_from_slice(&stored[(begin - self.first) as usize..(end - self.first) as usize]);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_window() {
        let buffer = MemoryBeamletBuffer::from_fn(2, -10, 30, |subband, idx| (subband as i64, idx));
        let mut output = [(0, 0); 4];

        buffer.read(1, -3, &mut output).unwrap();

        assert_eq!(output, [(1, -3), (1, -2), (1, -1), (1, 0)]);
        assert_eq!(buffer.last(), 20);
    }

    #[test]
    fn test_out_of_range() {
        let buffer = MemoryBeamletBuffer::<i16>::new(1, 0, 16);
        let mut output = [0; 4];

        assert!(matches!(
            buffer.read(0, -1, &mut output),
            Err(SourceError::OutOfRange { begin: -1, end: 3, .. })
        ));
        assert!(buffer.read(0, 12, &mut output).is_ok());
        assert!(buffer.read(0, 13, &mut output).is_err());
        assert_eq!(
            buffer.read(1, 0, &mut output),
            Err(SourceError::UnknownSubband(1))
        );
    }

    #[test]
    fn test_write() {
        let mut buffer = MemoryBeamletBuffer::<i16>::new(1, 100, 8);
        let mut output = [0; 3];

        buffer.write(0, Epoch::new(102), &[1, 2, 3]).unwrap();
        buffer.read(0, 101, &mut output).unwrap();

        assert_eq!(output, [0, 1, 2]);
        assert!(buffer.write(0, Epoch::new(106), &[1, 2, 3]).is_err());
    }
}
