//! Spectrum preprocessing.
//!
//! `weight_by_center` turns a per-pT yield density `dN/dpT` into the pT-weighted
//! density `pT * dN/dpT`, so moment integrals over the result are directly
//! mean-pT style quantities.

use crate::error::EngineResult;
use crate::histogram::{Bin, HistogramView, Spectrum};

/// Return a new spectrum with every content multiplied by its bin center.
///
/// Bin errors scale by `|center|`; centers and widths are unchanged. The input
/// is never mutated. Fails with `InvalidSpectrum` only if the view breaks the
/// ordering contract or a product overflows to a non-finite value.
pub fn weight_by_center<H: HistogramView>(view: &H) -> EngineResult<Spectrum> {
    let bins = view
        .bins()
        .map(|b| Bin {
            center: b.center,
            content: b.content * b.center,
            width: b.width,
            error: b.error.map(|e| e * b.center.abs()),
        })
        .collect();
    Spectrum::new(bins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::BinnedHistogram;

    #[test]
    fn multiplies_content_by_center() {
        let s = Spectrum::new(vec![
            Bin::new(0.5, 4.0, 1.0).with_error(2.0),
            Bin::new(2.0, 3.0, 2.0),
        ])
        .unwrap();
        let w = weight_by_center(&s).unwrap();

        assert_eq!(w.bin(0).content, 2.0);
        assert_eq!(w.bin(0).error, Some(1.0));
        assert_eq!(w.bin(1).content, 6.0);
        assert_eq!(w.bin(1).error, None);
        assert_eq!(w.bin(1).width, 2.0);

        // Input untouched.
        assert_eq!(s.bin(0).content, 4.0);
    }

    #[test]
    fn empty_in_empty_out() {
        let w = weight_by_center(&Spectrum::default()).unwrap();
        assert!(w.is_empty());
    }

    #[test]
    fn works_on_edge_histograms() {
        let h = BinnedHistogram::from_edges(&[0.0, 2.0, 4.0], vec![1.0, 1.0], None).unwrap();
        let w = weight_by_center(&h).unwrap();
        assert_eq!(w.as_slice().iter().map(|b| b.content).collect::<Vec<_>>(), vec![1.0, 3.0]);
    }

    #[test]
    fn overflow_is_reported() {
        let s = Spectrum::new(vec![Bin::new(1e200, 1e200, 1.0)]).unwrap();
        assert!(weight_by_center(&s).is_err());
    }
}
