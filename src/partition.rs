use std::ops::Range;

use crate::error::{Result, TraceError};

/// Contiguous band of image rows owned by one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowRange {
  pub worker_id: usize,
  pub start_row: u32,
  pub row_count: u32,
}

impl RowRange {
  pub fn rows(&self) -> Range<u32> {
    self.start_row..self.start_row + self.row_count
  }

  pub fn end_row(&self) -> u32 {
    self.start_row + self.row_count
  }
}

/// Splits `height` rows between `workers`. Worker `r` gets `height / workers`
/// rows plus one if `r < height % workers`; its start is the exclusive prefix
/// sum of the counts before it.
pub fn partition(height: u32, workers: usize) -> Result<Vec<RowRange>> {
  if workers == 0 {
    return Err(TraceError::InvalidSettings("worker count must be at least 1".to_string()));
  }
  let w = workers as u64;
  let (base, extra) = (height as u64 / w, height as u64 % w);
  let mut start_row = 0;
  let ranges = (0..workers)
    .map(|worker_id| {
      let row_count = (base + u64::from((worker_id as u64) < extra)) as u32;
      let range = RowRange { worker_id, start_row, row_count };
      start_row += row_count;
      range
    })
    .collect();
  Ok(ranges)
}

#[cfg(test)]
mod test {
  use super::*;
  use rand::Rng;

  fn check_partition(height: u32, workers: usize) {
    let ranges = partition(height, workers).unwrap();
    assert_eq!(ranges.len(), workers);
    let mut next = 0;
    for (ix, r) in ranges.iter().enumerate() {
      assert_eq!(r.worker_id, ix);
      assert_eq!(r.start_row, next, "gap or overlap at worker {}", ix);
      next = r.end_row();
    }
    assert_eq!(next, height);
    let min = ranges.iter().map(|r| r.row_count).min().unwrap();
    let max = ranges.iter().map(|r| r.row_count).max().unwrap();
    assert!(max - min <= 1, "imbalance {}..{} for {} rows / {} workers", min, max, height, workers);
  }

  #[test]
  fn partition_test() {
    let ranges = partition(10, 3).unwrap();
    assert_eq!(
      ranges,
      vec![
        RowRange { worker_id: 0, start_row: 0, row_count: 4 },
        RowRange { worker_id: 1, start_row: 4, row_count: 3 },
        RowRange { worker_id: 2, start_row: 7, row_count: 3 },
      ]
    );
  }

  #[test]
  fn partition_single_worker() {
    let whole = RowRange { worker_id: 0, start_row: 0, row_count: 400 };
    assert_eq!(partition(400, 1).unwrap(), vec![whole]);
  }

  #[test]
  fn partition_more_workers_than_rows() {
    let ranges = partition(2, 5).unwrap();
    let counts: Vec<u32> = ranges.iter().map(|r| r.row_count).collect();
    assert_eq!(counts, vec![1, 1, 0, 0, 0]);
    check_partition(2, 5);
  }

  #[test]
  fn partition_zero_workers() {
    assert!(matches!(partition(10, 0), Err(TraceError::InvalidSettings(_))));
  }

  #[test]
  fn partition_exhaustive_small() {
    for height in 1..64 {
      for workers in 1..20 {
        check_partition(height, workers);
      }
    }
  }

  #[test]
  fn partition_random() {
    let mut rng = rand::rng();
    for _ in 0..500 {
      let height = rng.random_range(1..5000);
      let workers = rng.random_range(1..128);
      check_partition(height, workers);
    }
  }
}
