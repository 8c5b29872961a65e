//! Owned, validated spectrum.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::histogram::view::{Bin, HistogramView};

/// An ordered, immutable sequence of bins.
///
/// Invariants (checked by [`Spectrum::new`]):
/// - centers strictly increasing
/// - widths positive
/// - all values finite, errors non-negative
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Spectrum {
    bins: Vec<Bin>,
}

impl Spectrum {
    pub fn new(bins: Vec<Bin>) -> EngineResult<Self> {
        for (i, b) in bins.iter().enumerate() {
            if !(b.center.is_finite() && b.content.is_finite() && b.width.is_finite()) {
                return Err(EngineError::InvalidSpectrum(format!(
                    "bin {i} has a non-finite value"
                )));
            }
            if b.width <= 0.0 {
                return Err(EngineError::InvalidSpectrum(format!(
                    "bin {i} has non-positive width {}",
                    b.width
                )));
            }
            if let Some(e) = b.error {
                if !(e.is_finite() && e >= 0.0) {
                    return Err(EngineError::InvalidSpectrum(format!(
                        "bin {i} has invalid error {e}"
                    )));
                }
            }
        }
        for (i, w) in bins.windows(2).enumerate() {
            if w[1].center <= w[0].center {
                return Err(EngineError::InvalidSpectrum(format!(
                    "centers not strictly increasing at bin {}",
                    i + 1
                )));
            }
        }
        Ok(Self { bins })
    }

    pub fn as_slice(&self) -> &[Bin] {
        &self.bins
    }

    /// `(first center, last center)`, or `None` when empty.
    pub fn center_range(&self) -> Option<(f64, f64)> {
        Some((self.bins.first()?.center, self.bins.last()?.center))
    }
}

impl HistogramView for Spectrum {
    fn len(&self) -> usize {
        self.bins.len()
    }

    fn bin(&self, index: usize) -> Bin {
        self.bins[index]
    }
}

impl<'de> Deserialize<'de> for Spectrum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            bins: Vec<Bin>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Spectrum::new(raw.bins).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unordered_centers() {
        let err = Spectrum::new(vec![Bin::new(2.0, 1.0, 1.0), Bin::new(1.0, 1.0, 1.0)]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSpectrum(_)));

        let dup = Spectrum::new(vec![Bin::new(1.0, 1.0, 1.0), Bin::new(1.0, 1.0, 1.0)]);
        assert!(dup.is_err());
    }

    #[test]
    fn rejects_bad_width_and_error() {
        assert!(Spectrum::new(vec![Bin::new(1.0, 1.0, 0.0)]).is_err());
        assert!(Spectrum::new(vec![Bin::new(1.0, 1.0, 1.0).with_error(-0.1)]).is_err());
        assert!(Spectrum::new(vec![Bin::new(f64::NAN, 1.0, 1.0)]).is_err());
    }

    #[test]
    fn empty_spectrum_is_valid() {
        let s = Spectrum::new(Vec::new()).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.center_range(), None);
    }

    #[test]
    fn json_roundtrip_revalidates() {
        let s = Spectrum::new(vec![Bin::new(1.0, 2.0, 0.5), Bin::new(2.0, 3.0, 0.5).with_error(0.1)]).unwrap();
        let txt = serde_json::to_string(&s).unwrap();
        let back: Spectrum = serde_json::from_str(&txt).unwrap();
        assert_eq!(back, s);

        let bad = r#"{"bins":[{"center":2.0,"content":1.0,"width":1.0},{"center":1.0,"content":1.0,"width":1.0}]}"#;
        assert!(serde_json::from_str::<Spectrum>(bad).is_err());
    }
}
