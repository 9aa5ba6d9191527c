//! Adaptive per-band energy normalization.

use std::collections::VecDeque;

/// Samples required per band before normalization kicks in. Below this the
/// rolling statistics are too noisy to be useful, so the band reads 0.
const MIN_SAMPLES: usize = 20;

/// Converts raw band energies into a stable 0..1-ish signal by comparing
/// each sample against the rolling median/90th-percentile of its band.
///
/// This adapts to volume changes and source loudness without fixed
/// thresholds: a band only lights up when its current energy stands out
/// from its own recent history.
pub struct BandNormalizer {
    histories: Vec<VecDeque<f32>>,
    capacity: usize,
}

impl BandNormalizer {
    /// Creates a normalizer for `num_bands` bands with a rolling history of
    /// `history_len` samples per band.
    pub fn new(num_bands: usize, history_len: usize) -> Self {
        Self {
            histories: (0..num_bands)
                .map(|_| VecDeque::with_capacity(history_len))
                .collect(),
            capacity: history_len,
        }
    }

    /// Appends one energy sample per band and returns the normalized
    /// values. Always returns exactly one value per band.
    pub fn update_and_normalize(&mut self, band_energies: &[f32]) -> Vec<f32> {
        let mut normalized = Vec::with_capacity(self.histories.len());

        for (history, &energy) in self.histories.iter_mut().zip(band_energies) {
            if history.len() == self.capacity {
                history.pop_front();
            }
            history.push_back(energy);

            if history.len() < MIN_SAMPLES {
                normalized.push(0.0);
                continue;
            }

            let mut sorted: Vec<f32> = history.iter().copied().collect();
            sorted.sort_by(f32::total_cmp);

            let median = percentile(&sorted, 50.0);
            let p90 = percentile(&sorted, 90.0);

            if p90 <= median {
                normalized.push(0.0);
                continue;
            }

            let raw = ((energy - median) / (p90 - median + 1e-9)).clamp(0.0, 2.0);
            normalized.push(raw.tanh());
        }

        normalized
    }
}

/// Linearly interpolated percentile of a sorted slice, matching numpy's
/// default method.
fn percentile(sorted: &[f32], pct: f32) -> f32 {
    debug_assert!(!sorted.is_empty());
    let rank = pct / 100.0 * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cold_start_emits_zero() {
        let mut norm = BandNormalizer::new(2, 300);
        for _ in 0..MIN_SAMPLES - 1 {
            let out = norm.update_and_normalize(&[1.0, 5.0]);
            assert_eq!(out, vec![0.0, 0.0]);
        }
    }

    #[test]
    fn test_flat_history_emits_zero() {
        let mut norm = BandNormalizer::new(1, 300);
        let mut last = vec![1.0];
        for _ in 0..50 {
            last = norm.update_and_normalize(&[3.5]);
        }
        // Median equals p90 on a constant history
        assert_eq!(last, vec![0.0]);
    }

    #[test]
    fn test_outlier_reads_positive_and_bounded() {
        let mut norm = BandNormalizer::new(1, 300);
        // Alternate low/high so the history has spread
        for i in 0..40 {
            let energy = if i % 4 == 0 { 1.0 } else { 0.2 };
            norm.update_and_normalize(&[energy]);
        }
        let out = norm.update_and_normalize(&[1.5]);
        assert!(out[0] > 0.0);
        assert!(out[0] < 1.0); // tanh keeps the output inside (-1, 1)
    }

    #[test]
    fn test_output_always_in_tanh_range() {
        let mut norm = BandNormalizer::new(3, 50);
        for i in 0..200 {
            let e = (i as f32 * 0.7).sin().abs() * 10.0;
            let out = norm.update_and_normalize(&[e, e * 0.01, 1000.0 - e]);
            assert_eq!(out.len(), 3);
            for v in out {
                assert!(v > -1.0 && v < 1.0);
            }
        }
    }

    #[test]
    fn test_history_is_bounded() {
        let mut norm = BandNormalizer::new(1, 30);
        for i in 0..100 {
            norm.update_and_normalize(&[i as f32]);
        }
        assert_eq!(norm.histories[0].len(), 30);
        // Oldest entries were evicted
        assert_eq!(*norm.histories[0].front().unwrap(), 70.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [0.0, 1.0, 2.0, 3.0];
        assert!((percentile(&sorted, 50.0) - 1.5).abs() < 1e-6);
        assert!((percentile(&sorted, 90.0) - 2.7).abs() < 1e-6);
        assert_eq!(percentile(&sorted, 0.0), 0.0);
        assert_eq!(percentile(&sorted, 100.0), 3.0);
    }
}
