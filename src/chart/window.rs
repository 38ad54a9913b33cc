use crate::error::{Error, Result};
use std::collections::VecDeque;

/// Minimum horizontal pixels per visually distinguishable point
const PIXELS_PER_POINT: f64 = 1.5;

/// Number of points a surface `width_px` wide can show.
pub fn capacity_for_width(width_px: u32) -> usize {
    ((width_px as f64 / PIXELS_PER_POINT).round() as usize).max(1)
}

/// Owned column snapshot handed to a renderer.
///
/// `time` is the first column; `series[i]` is the column of the series with
/// index `i`. `None` marks a missing point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartData {
    pub time: Vec<i64>,
    pub series: Vec<Vec<Option<f64>>>,
}

impl ChartData {
    pub fn empty(series_count: usize) -> Self {
        ChartData {
            time: Vec::new(),
            series: vec![Vec::new(); series_count],
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Every series column matches the time column's length.
    pub fn is_aligned(&self) -> bool {
        self.series.iter().all(|c| c.len() == self.time.len())
    }

    pub fn latest_time(&self) -> Option<i64> {
        self.time.last().copied()
    }

    pub fn latest(&self, index: usize) -> Option<f64> {
        self.series.get(index)?.last().copied().flatten()
    }
}

/// Fixed-capacity, column-oriented FIFO window.
#[derive(Debug)]
pub struct SlidingWindowStore {
    capacity: usize,
    time: VecDeque<i64>,
    series: Vec<VecDeque<Option<f64>>>,
}

impl SlidingWindowStore {
    pub fn new(series_count: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        SlidingWindowStore {
            capacity,
            time: VecDeque::with_capacity(capacity + 1),
            series: (0..series_count)
                .map(|_| VecDeque::with_capacity(capacity + 1))
                .collect(),
        }
    }

    pub fn for_width(series_count: usize, width_px: u32) -> Self {
        Self::new(series_count, capacity_for_width(width_px))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Append one row, then drop the oldest row if the window overflowed.
    /// `values[i]` belongs to series `i`; timestamps are taken as given.
    pub fn append(&mut self, timestamp: i64, values: &[Option<f64>]) -> Result<()> {
        if values.len() != self.series.len() {
            return Err(Error::ColumnMismatch {
                expected: self.series.len(),
                actual: values.len(),
            });
        }

        self.time.push_back(timestamp);
        for (column, value) in self.series.iter_mut().zip(values) {
            column.push_back(*value);
        }

        if self.time.len() > self.capacity {
            self.time.pop_front();
            for column in &mut self.series {
                column.pop_front();
            }
        }

        Ok(())
    }

    pub fn time(&self) -> &VecDeque<i64> {
        &self.time
    }

    pub fn column(&self, index: usize) -> Option<&VecDeque<Option<f64>>> {
        self.series.get(index)
    }

    /// Copy of every column, for a full redraw.
    pub fn snapshot(&self) -> ChartData {
        ChartData {
            time: self.time.iter().copied().collect(),
            series: self
                .series
                .iter()
                .map(|c| c.iter().copied().collect())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_heuristic() {
        assert_eq!(capacity_for_width(800), 533);
        assert_eq!(capacity_for_width(3), 2);
        assert_eq!(capacity_for_width(1), 1);
        assert_eq!(capacity_for_width(0), 1);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut store = SlidingWindowStore::new(1, 3);
        for (t, v) in [(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0)] {
            store.append(t, &[Some(v)]).unwrap();
        }

        let data = store.snapshot();
        assert_eq!(data.time, vec![2, 3, 4]);
        assert_eq!(data.series[0], vec![Some(20.0), Some(30.0), Some(40.0)]);
    }

    #[test]
    fn test_length_is_min_of_appends_and_capacity() {
        let capacity = 5;
        let mut store = SlidingWindowStore::new(2, capacity);
        for n in 1..=12i64 {
            store.append(n, &[Some(n as f64), None]).unwrap();
            let expected = (n as usize).min(capacity);
            assert_eq!(store.len(), expected);
            assert_eq!(store.column(0).unwrap().len(), expected);
            assert_eq!(store.column(1).unwrap().len(), expected);
        }
        let data = store.snapshot();
        assert_eq!(data.time, vec![8, 9, 10, 11, 12]);
        assert!(data.is_aligned());
    }

    #[test]
    fn test_missing_values_stay_missing() {
        let mut store = SlidingWindowStore::new(2, 4);
        store.append(1, &[Some(1.0), Some(2.0)]).unwrap();
        store.append(2, &[Some(3.0), None]).unwrap();

        let data = store.snapshot();
        assert_eq!(data.latest(0), Some(3.0));
        assert_eq!(data.latest(1), None);
        assert_eq!(data.series[1], vec![Some(2.0), None]);
    }

    #[test]
    fn test_row_width_must_match() {
        let mut store = SlidingWindowStore::new(2, 4);
        let err = store.append(1, &[Some(1.0)]).unwrap_err();
        assert!(matches!(
            err,
            Error::ColumnMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_zero_series_window_still_tracks_time() {
        let mut store = SlidingWindowStore::new(0, 2);
        store.append(1, &[]).unwrap();
        store.append(2, &[]).unwrap();
        store.append(3, &[]).unwrap();
        assert_eq!(store.snapshot().time, vec![2, 3]);
    }

    #[test]
    fn test_timestamps_not_reordered() {
        let mut store = SlidingWindowStore::new(1, 4);
        store.append(5, &[Some(1.0)]).unwrap();
        store.append(3, &[Some(2.0)]).unwrap();
        store.append(3, &[Some(3.0)]).unwrap();
        assert_eq!(store.snapshot().time, vec![5, 3, 3]);
    }
}
