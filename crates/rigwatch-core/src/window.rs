//! Fixed-capacity history of one graphed metric.

use std::collections::VecDeque;

/// Default number of retained samples.
pub const DEFAULT_CAPACITY: usize = 60;

/// Insertion-ordered samples, oldest evicted first once full.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RollingWindow {
    /// A zero capacity is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    /// Samples oldest-first.
    pub fn values(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Map the samples onto a `width` x `height` plot for a polyline.
    ///
    /// Point `i` sits at `x = i * width / len`; `y` maps `[0, 100]` onto
    /// `[height, 0]`, so 100 is the top edge. Out-of-range samples are
    /// clamped to the plot. Fewer than two samples draw nothing.
    pub fn polyline(&self, width: f64, height: f64) -> Vec<(f64, f64)> {
        if self.values.len() < 2 {
            return Vec::new();
        }
        let step = width / self.values.len() as f64;
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) };
                (i as f64 * step, height - v / 100.0 * height)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_min_of_pushes_and_capacity() {
        let mut w = RollingWindow::new(60);
        for n in 1..=150usize {
            w.push(n as f64);
            assert_eq!(w.len(), n.min(60));
            let expected: Vec<f64> = ((n.saturating_sub(60) + 1)..=n).map(|v| v as f64).collect();
            assert_eq!(w.values(), expected);
        }
        assert_eq!(w.latest(), Some(150.0));
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let mut w = RollingWindow::new(0);
        assert_eq!(w.capacity(), 1);
        w.push(1.0);
        w.push(2.0);
        assert_eq!(w.values(), vec![2.0]);
    }

    #[test]
    fn clear_empties() {
        let mut w = RollingWindow::default();
        assert_eq!(w.capacity(), DEFAULT_CAPACITY);
        w.push(5.0);
        assert!(!w.is_empty());
        w.clear();
        assert!(w.is_empty());
        assert_eq!(w.latest(), None);
    }

    #[test]
    fn polyline_needs_two_points() {
        let mut w = RollingWindow::new(4);
        assert!(w.polyline(100.0, 50.0).is_empty());
        w.push(50.0);
        assert!(w.polyline(100.0, 50.0).is_empty());
    }

    #[test]
    fn polyline_inverts_y_axis() {
        let mut w = RollingWindow::new(4);
        for v in [0.0, 50.0, 100.0, 25.0] {
            w.push(v);
        }
        let pts = w.polyline(200.0, 80.0);
        assert_eq!(pts, vec![(0.0, 80.0), (50.0, 40.0), (100.0, 0.0), (150.0, 60.0)]);
    }

    #[test]
    fn polyline_clamps_out_of_range() {
        let mut w = RollingWindow::new(2);
        w.push(-20.0);
        w.push(180.0);
        let pts = w.polyline(10.0, 10.0);
        assert_eq!(pts, vec![(0.0, 10.0), (5.0, 0.0)]);
    }
}
