// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{channel::{Channel, ChannelData},
            error::Result,
            reduced::{ReducedCount, ReducedRecord},
            session::FileInfo};
use std::{fmt::Debug, path::Path};


/// Decoding collaborator behind a `Session`.
///
/// This is the narrow boundary to whatever understands the proprietary file
/// format. `NativeDecoder` implements it over Dewesoft's shared library;
/// `sim::SimRecording` implements it in memory so the full access contract
/// is exercisable without the vendor stack. A decoder holds at most one
/// open file; the session above it enforces lifecycle order, resolves
/// channel identities to vendor indices and bounds-checks windows before
/// calling down.
pub trait Decoder: Debug + Send {
  /// Version tag of the decoding service. Valid from construction on,
  /// independent of any open file.
  fn version(&self) -> i32;

  /// Opens the file at `path` and returns its header. `path` names an
  /// existing file; whether its contents are decodable is decided here.
  fn open(&mut self, path: &Path) -> Result<FileInfo>;

  /// Releases the open file. Without an open file this is a no-op.
  fn close(&mut self) -> Result<()>;

  /// The channel table of the open file.
  fn channel_list(&mut self) -> Result<Vec<Channel>>;

  /// Reduced data geometry of the channel with vendor index `index`.
  fn reduced_count(&mut self, index: i32) -> Result<ReducedCount>;

  /// Reduced records `start..start + count` of the channel with vendor
  /// index `index`. Callers validate the window against `reduced_count`
  /// first.
  fn reduced_window(&mut self,
                    index: i32,
                    start: usize,
                    count: usize)
                    -> Result<Vec<ReducedRecord>>;

  /// Number of full-rate sample ticks of the channel with vendor index
  /// `index`.
  fn scaled_count(&mut self, index: i32) -> Result<usize>;

  /// Scaled samples for ticks `start..start + count`. `array_size` is the
  /// value count per tick from the channel record; the foreign read call
  /// sizes its output with it.
  fn scaled_window(&mut self,
                   index: i32,
                   start: usize,
                   count: usize,
                   array_size: usize)
                   -> Result<ChannelData>;
}
