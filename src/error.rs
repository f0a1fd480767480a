// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use std::path::PathBuf;
use thiserror::Error;


/// Crate-wide result type; all fallible operations return this.
pub type Result<T> = std::result::Result<T, DwError>;


/// Errors produced by the data file access layer.
///
/// Every variant maps to one failure class of the open/read/close lifecycle;
/// nothing is retried or swallowed on the way up. `Close` is only ever
/// surfaced by `Decoder` implementations - `Session::close` logs it and
/// keeps its idempotent success contract.
#[derive(Debug, Error)]
pub enum DwError {
  /// The decoding service could not be loaded or initialized. Fatal and
  /// non-retryable; the environment must be fixed first.
  #[error("decoding service unavailable: {reason}")]
  Init { reason: String },

  /// The given path does not point to a readable file.
  #[error("no data file at '{}'", .0.display())]
  NotFound(PathBuf),

  /// The decoding service rejected the file contents.
  #[error("data file '{}' cannot be parsed", .0.display())]
  Corrupt(PathBuf),

  /// A recording is already open; it must be closed before the next open.
  #[error("a data file is already open")]
  AlreadyOpen,

  /// A catalog or reader operation was attempted without an open recording.
  #[error("no data file is open")]
  NotOpen,

  /// No channel in the open recording matches the given index or name.
  #[error("no channel matching {0}")]
  UnknownChannel(String),

  /// A record window reaches past the end of the available data.
  #[error("window {start}+{count} exceeds {avail} available records")]
  WindowOutOfRange {
    start: usize,
    count: usize,
    avail: usize,
  },

  /// The decoding service reported a failure while releasing the open file.
  #[error("data file release failed: {reason}")]
  Close { reason: String },

  /// Any other non-OK status from the decoding service, named after the
  /// foreign call which produced it.
  #[error("'{call}' failed with status {status}")]
  Service { call: &'static str, status: i32 },
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;


  #[test]
  fn display_test() {
    assert_eq!("a data file is already open",
               DwError::AlreadyOpen.to_string());
    assert_eq!("no data file is open", DwError::NotOpen.to_string());
    assert_eq!("no channel matching name \"warbl\"",
               DwError::UnknownChannel("name \"warbl\"".to_string())
                 .to_string());
    assert_eq!("window 180+20 exceeds 192 available records",
               DwError::WindowOutOfRange { start: 180,
                                           count: 20,
                                           avail: 192 }.to_string());
    assert_eq!("'DWGetChannelList' failed with status 1",
               DwError::Service { call:   "DWGetChannelList",
                                  status: 1, }.to_string());
  }

  #[test]
  fn path_display_test() {
    let path = PathBuf::from("/data/drive01.d7d");
    assert_eq!("no data file at '/data/drive01.d7d'",
               DwError::NotFound(path.clone()).to_string());
    assert_eq!("data file '/data/drive01.d7d' cannot be parsed",
               DwError::Corrupt(path).to_string());
  }
}
