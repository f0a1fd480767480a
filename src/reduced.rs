// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use getset::CopyGetters;
use serde::{Deserialize, Serialize};


/// One precomputed statistics bucket of a channel.
///
/// Data files store these alongside the full-rate samples: the recording is
/// cut into windows of fixed duration and five aggregates are kept per
/// window. Field order matches the vendor record, which makes positional
/// access via `Reduction` well defined.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct ReducedRecord {
  /// Bucket start in seconds relative to recording start.
  time_stamp: f64,
  ave:        f64,
  min:        f64,
  max:        f64,
  rms:        f64,
}

impl ReducedRecord {
  pub fn new(time_stamp: f64, ave: f64, min: f64, max: f64, rms: f64) -> Self {
    Self { time_stamp,
           ave,
           min,
           max,
           rms }
  }

  /// Returns the field selected by `reduction`.
  pub fn field(&self, reduction: Reduction) -> f64 {
    match reduction {
      Reduction::TimeStamp => self.time_stamp,
      Reduction::Average => self.ave,
      Reduction::Minimum => self.min,
      Reduction::Maximum => self.max,
      Reduction::Rms => self.rms,
    }
  }
}


/// The five aggregates stored per bucket, in record field order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reduction {
  TimeStamp,
  Average,
  Minimum,
  Maximum,
  Rms,
}

impl Reduction {
  /// All reduction kinds in record field order.
  pub const ALL: [Reduction; 5] = [Reduction::TimeStamp,
                                   Reduction::Average,
                                   Reduction::Minimum,
                                   Reduction::Maximum,
                                   Reduction::Rms];

  /// Position of this reduction within a record, `0..5`.
  pub fn position(self) -> usize {
    self as usize
  }

  /// Inverse of `position`; `None` outside `0..5`.
  pub fn from_position(position: usize) -> Option<Self> {
    Self::ALL.get(position).copied()
  }
}


/// Reduced data geometry of one channel: how many buckets exist and how many
/// seconds each bucket covers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct ReducedCount {
  count:           usize,
  time_resolution: f64,
}

impl ReducedCount {
  pub fn new(count: usize, time_resolution: f64) -> Self {
    Self { count,
           time_resolution }
  }
}
