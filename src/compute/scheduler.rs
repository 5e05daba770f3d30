//! Adaptive selection of the pattern length to search for next.

use log::debug;

use crate::schema::LengthSchedulerConfig;

use super::search::GeneRng;

/// Probability vector over candidate pattern lengths.
///
/// Lengths that keep yielding patterns are rewarded, lengths that fail are
/// penalized. Weights always sum to 1 and never drop below the configured
/// floor, so every length stays reachable.
#[derive(Debug, Clone)]
pub struct LengthScheduler {
    min_length: usize,
    delta: f64,
    min_weight: f64,
    weights: Vec<f64>,
}

impl LengthScheduler {
    /// Create a scheduler with uniform weights.
    pub fn new(config: &LengthSchedulerConfig) -> Self {
        let n = config.max_length - config.min_length + 1;
        Self {
            min_length: config.min_length,
            delta: config.delta,
            min_weight: config.min_weight,
            weights: vec![1.0 / n as f64; n],
        }
    }

    /// Reset to uniform weights.
    pub fn reset(&mut self) {
        let n = self.weights.len();
        self.weights.iter_mut().for_each(|w| *w = 1.0 / n as f64);
    }

    /// Current weights, index 0 being the minimum length.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Weight of a given length.
    pub fn weight(&self, length: usize) -> f64 {
        self.weights[length - self.min_length]
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn max_length(&self) -> usize {
        self.min_length + self.weights.len() - 1
    }

    /// Draw a length by cumulative-probability sampling.
    pub fn sample(&self, rng: &mut GeneRng) -> usize {
        self.select(rng.unit())
    }

    /// Map a uniform draw in `[0, 1)` to a length.
    ///
    /// Falls back to the maximum length if rounding leaves the draw above the
    /// last cumulative bound.
    pub fn select(&self, draw: f64) -> usize {
        let mut cumulative = 0.0;
        for (i, w) in self.weights.iter().enumerate() {
            cumulative += w;
            if draw <= cumulative {
                return self.min_length + i;
            }
        }
        self.max_length()
    }

    /// Increase the weight of a length that produced a pattern.
    pub fn reward(&mut self, length: usize) {
        self.adjust(length, self.delta);
    }

    /// Decrease the weight of a length that failed to produce a pattern.
    pub fn penalize(&mut self, length: usize) {
        self.adjust(length, -self.delta);
    }

    fn adjust(&mut self, length: usize, delta: f64) {
        let index = length - self.min_length;
        let n = self.weights.len();
        if n == 1 {
            return;
        }

        let total: f64 = self.weights.iter().sum();
        let others_before = total - self.weights[index];

        // Leave room for every other entry to sit at the floor. Rounding can
        // push the ceiling under the floor when the floor fills the vector.
        let ceiling = (1.0 - (n - 1) as f64 * self.min_weight)
            .min(1.0)
            .max(self.min_weight);
        self.weights[index] = (self.weights[index] + delta).clamp(self.min_weight, ceiling);

        // Rescale the other entries, preserving their ratios, so that they sum
        // to what the adjusted entry left over.
        let target = total - self.weights[index];
        if others_before > 0.0 {
            let scale = target / others_before;
            for (i, w) in self.weights.iter_mut().enumerate() {
                if i != index {
                    *w *= scale;
                }
            }
        }
        self.lift_to_floor(index);

        // Normalize to exactly 1.
        let sum: f64 = self.weights.iter().sum();
        self.weights.iter_mut().for_each(|w| *w /= sum);

        debug!(
            "Updated pattern length weights: {}",
            self.weights
                .iter()
                .enumerate()
                .map(|(i, w)| format!("{}={:.3}", self.min_length + i, w))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    /// Pin non-adjusted entries that fell under the floor to the floor, taking
    /// the difference proportionally from the remaining free entries.
    fn lift_to_floor(&mut self, adjusted: usize) {
        let mut pinned = vec![false; self.weights.len()];
        pinned[adjusted] = true;

        loop {
            let below: Vec<usize> = (0..self.weights.len())
                .filter(|&i| !pinned[i] && self.weights[i] < self.min_weight)
                .collect();
            if below.is_empty() {
                break;
            }

            let mut deficit = 0.0;
            for &i in &below {
                deficit += self.min_weight - self.weights[i];
                self.weights[i] = self.min_weight;
                pinned[i] = true;
            }

            let free: f64 = (0..self.weights.len())
                .filter(|&i| !pinned[i])
                .map(|i| self.weights[i])
                .sum();
            if free <= 0.0 {
                break;
            }
            let scale = (free - deficit) / free;
            for (i, w) in self.weights.iter_mut().enumerate() {
                if !pinned[i] {
                    *w *= scale;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> LengthScheduler {
        LengthScheduler::new(&LengthSchedulerConfig::default())
    }

    fn assert_invariants(s: &LengthScheduler) {
        let sum: f64 = s.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum = {}", sum);
        for w in s.weights() {
            assert!(*w >= 0.1 - 1e-9, "weight {} below floor", w);
        }
    }

    #[test]
    fn test_uniform_start() {
        let s = scheduler();
        assert_eq!(s.weights().len(), 3);
        for w in s.weights() {
            assert!((w - 1.0 / 3.0).abs() < 1e-12);
        }
        assert_eq!(s.min_length(), 2);
        assert_eq!(s.max_length(), 4);
    }

    #[test]
    fn test_reward_rescales_then_normalizes() {
        let mut s = scheduler();
        s.reward(2);

        let expected_first = 1.0 / 3.0 + 0.1;
        let expected_rest = (1.0 - expected_first) / 2.0;
        assert!((s.weight(2) - expected_first).abs() < 1e-9);
        assert!((s.weight(3) - expected_rest).abs() < 1e-9);
        assert!((s.weight(4) - expected_rest).abs() < 1e-9);
        assert_invariants(&s);
    }

    #[test]
    fn test_penalize_respects_floor() {
        let mut s = scheduler();
        for _ in 0..10 {
            s.penalize(4);
        }
        assert!((s.weight(4) - 0.1).abs() < 1e-9);
        assert!((s.weight(2) - 0.45).abs() < 1e-9);
        assert_invariants(&s);
    }

    #[test]
    fn test_repeated_reward_keeps_others_at_floor() {
        let mut s = scheduler();
        for _ in 0..20 {
            s.reward(3);
        }
        assert!((s.weight(3) - 0.8).abs() < 1e-9);
        assert_invariants(&s);
    }

    #[test]
    fn test_floor_filling_vector_stays_uniform() {
        let mut s = LengthScheduler::new(&LengthSchedulerConfig {
            min_length: 2,
            max_length: 6,
            delta: 0.1,
            min_weight: 0.2,
        });
        s.reward(2);
        s.penalize(6);
        s.reward(4);
        let sum: f64 = s.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        for w in s.weights() {
            assert!((w - 0.2).abs() < 1e-9, "weight {}", w);
        }
    }

    #[test]
    fn test_reset() {
        let mut s = scheduler();
        s.reward(2);
        s.penalize(3);
        s.reset();
        for w in s.weights() {
            assert!((w - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_select_boundaries() {
        let s = scheduler();
        assert_eq!(s.select(0.0), 2);
        assert_eq!(s.select(0.5), 3);
        assert_eq!(s.select(0.99), 4);
        // Past the final cumulative bound falls back to the maximum length.
        assert_eq!(s.select(1.5), 4);
    }

    #[test]
    fn test_sample_in_range() {
        let s = scheduler();
        let mut rng = GeneRng::new(7);
        for _ in 0..200 {
            let len = s.sample(&mut rng);
            assert!((2..=4).contains(&len));
        }
    }
}
