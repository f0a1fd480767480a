// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{catalog::Catalog,
            channel::{Channel, ChannelData, ChannelId},
            decoder::Decoder,
            error::{DwError, Result},
            native::NativeDecoder,
            reduced::{ReducedCount, ReducedRecord, Reduction}};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use getset::CopyGetters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};


/// Global header of a data file.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct FileInfo {
  /// Sample ticks per second.
  sample_rate:      f64,
  /// Recording start, stored as days since 1899-12-30 (automation date).
  start_store_time: f64,
  /// Recording length in seconds.
  duration:         f64,
}

impl FileInfo {
  pub fn new(sample_rate: f64, start_store_time: f64, duration: f64) -> Self {
    Self { sample_rate,
           start_store_time,
           duration }
  }

  /// Recording start as calendar date and time, with microsecond
  /// granularity. `None` if the stored value lies outside the representable
  /// date range.
  pub fn start_datetime(&self) -> Option<NaiveDateTime> {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let micros =
      (self.start_store_time * 86_400.0 * 1_000_000.0).round() as i64;
    base.checked_add_signed(Duration::microseconds(micros))
  }
}


/// A file the session currently holds open, with everything fetched at open
/// time.
#[derive(Debug)]
struct OpenFile {
  path:    PathBuf,
  info:    FileInfo,
  catalog: Catalog,
}


/// Handle on the decoding service with an explicit open/close lifecycle.
///
/// A session is constructed over a decoding collaborator and then cycles
/// through open and closed states: at most one data file is open per
/// session at any time. All catalog and reader operations require an open
/// file and fail with `NotOpen` otherwise. Dropping the session closes any
/// open file.
///
/// ```no_run
/// use dwdat::{Reduction, Session};
/// # fn main() -> dwdat::Result<()> {
/// let mut session = Session::native()?;
/// session.open(std::path::Path::new("drive01.d7d"))?;
///
/// for channel in session.channels()?.to_vec() {
///   let speeds = session.channel_reduced(channel.index(), Reduction::Average)?;
///   println!("{}: {} buckets", channel.name(), speeds.len());
/// }
///
/// session.close()
/// # }
/// ```
#[derive(Debug)]
pub struct Session {
  decoder: Box<dyn Decoder>,
  open:    Option<OpenFile>,
}

impl Session {
  // SESSION LIFECYCLE -------------------------------------------------- //
  /// Creates a session over the native vendor library.
  ///
  /// Loads and initializes the library when no live session holds it;
  /// concurrent sessions share the loaded instance and the last one going
  /// away tears it down. Fails with `Init` when the library cannot be
  /// found, loaded or initialized - that is an environment problem and not
  /// retryable.
  pub fn native() -> Result<Self> {
    Ok(Self::with_decoder(Box::new(NativeDecoder::acquire()?)))
  }

  /// Creates a session over any decoding collaborator, e.g. the in-memory
  /// one from the `sim` module.
  pub fn with_decoder(decoder: Box<dyn Decoder>) -> Self {
    Self { decoder,
           open: None }
  }

  /// Version tag of the decoding service behind this session.
  pub fn version(&self) -> i32 {
    self.decoder.version()
  }

  pub fn is_open(&self) -> bool {
    self.open.is_some()
  }

  /// Path of the currently open data file.
  pub fn path(&self) -> Option<&Path> {
    self.open.as_ref().map(|file| file.path.as_path())
  }

  /// Opens the data file at `path` and returns its header.
  ///
  /// The channel table is fetched here as well, so catalog lookups later on
  /// cannot fail for service reasons. Fails with `AlreadyOpen` while
  /// another file is open, `NotFound` when `path` is not a readable file
  /// and `Corrupt` when the decoding service rejects its contents. On any
  /// failure the session stays closed and holds no file handle.
  pub fn open(&mut self, path: &Path) -> Result<&FileInfo> {
    if self.open.is_some() {
      return Err(DwError::AlreadyOpen);
    }
    if !path.is_file() {
      return Err(DwError::NotFound(path.to_owned()));
    }

    let info = self.decoder.open(path)?;
    let channels = match self.decoder.channel_list() {
      Ok(channels) => channels,
      Err(err) => {
        // half-open is not a state: give the handle back before reporting
        if let Err(close_err) = self.decoder.close() {
          warn!(error = %close_err, "release after failed open also failed");
        }
        return Err(err);
      }
    };

    debug!(path = %path.display(),
           channels = channels.len(),
           "data file open");

    let open = self.open.insert(OpenFile { path:    path.to_owned(),
                                           info,
                                           catalog:
                                             Catalog::new(channels), });
    Ok(&open.info)
  }

  /// Closes the currently open data file.
  ///
  /// Idempotent: closing a session without an open file does nothing. A
  /// release failure inside the decoding service is logged, not returned -
  /// the session transitions to closed regardless, so a new open is always
  /// possible afterwards.
  pub fn close(&mut self) -> Result<()> {
    if let Some(file) = self.open.take() {
      match self.decoder.close() {
        Ok(()) => debug!(path = %file.path.display(), "data file closed"),
        Err(err) => warn!(path = %file.path.display(),
                          error = %err,
                          "data file release reported failure"),
      }
    }

    Ok(())
  }

  // FILE METADATA ------------------------------------------------------ //
  /// Header of the open data file.
  pub fn file_info(&self) -> Result<&FileInfo> {
    Ok(&self.require_open()?.info)
  }

  // CHANNEL CATALOG ---------------------------------------------------- //
  /// Number of channels in the open data file.
  pub fn channel_count(&self) -> Result<usize> {
    Ok(self.require_open()?.catalog.len())
  }

  /// All channels of the open data file, in channel table order.
  pub fn channels(&self) -> Result<&[Channel]> {
    Ok(self.require_open()?.catalog.channels())
  }

  /// The channel matching `id`, by vendor index or by name.
  pub fn channel<'a>(&self, id: impl Into<ChannelId<'a>>) -> Result<&Channel> {
    self.require_open()?.catalog.resolve(id.into())
  }

  // REDUCED DATA ------------------------------------------------------- //
  /// Reduced data geometry of the channel matching `id`.
  pub fn reduced_count<'a>(&mut self,
                           id: impl Into<ChannelId<'a>>)
                           -> Result<ReducedCount> {
    let index = self.require_open()?.catalog.resolve(id.into())?.index();
    self.decoder.reduced_count(index)
  }

  /// Reduced records `start..start + count` of the channel matching `id`.
  ///
  /// The window is validated against the channel's current record count and
  /// fails with `WindowOutOfRange` when it reaches past the end. An empty
  /// window is valid anywhere within bounds.
  pub fn reduced_values<'a>(&mut self,
                            id: impl Into<ChannelId<'a>>,
                            start: usize,
                            count: usize)
                            -> Result<Vec<ReducedRecord>> {
    let index = self.require_open()?.catalog.resolve(id.into())?.index();
    let avail = self.decoder.reduced_count(index)?.count();
    validate_window(start, count, avail)?;
    self.decoder.reduced_window(index, start, count)
  }

  /// All values of one reduction kind over the full reduced timeline of the
  /// channel matching `id`.
  ///
  /// This is a projection of `reduced_values` over the complete range:
  /// element `i` equals field `reduction` of record `i`, always.
  pub fn channel_reduced<'a>(&mut self,
                             id: impl Into<ChannelId<'a>>,
                             reduction: Reduction)
                             -> Result<Vec<f64>> {
    let id = id.into();
    let count = self.reduced_count(id)?.count();
    let records = self.reduced_values(id, 0, count)?;

    Ok(records.iter().map(|record| record.field(reduction)).collect())
  }

  // SCALED DATA -------------------------------------------------------- //
  /// Number of full-rate sample ticks of the channel matching `id`.
  pub fn scaled_count<'a>(&mut self,
                          id: impl Into<ChannelId<'a>>)
                          -> Result<usize> {
    let index = self.require_open()?.catalog.resolve(id.into())?.index();
    self.decoder.scaled_count(index)
  }

  /// Scaled samples with timestamps for ticks `start..start + count` of the
  /// channel matching `id`, bounds-checked like `reduced_values`.
  pub fn scaled_samples<'a>(&mut self,
                            id: impl Into<ChannelId<'a>>,
                            start: usize,
                            count: usize)
                            -> Result<ChannelData> {
    let channel = self.require_open()?.catalog.resolve(id.into())?;
    let (index, array_size) = (channel.index(), channel.array_size());

    let avail = self.decoder.scaled_count(index)?;
    validate_window(start, count, avail)?;
    self.decoder.scaled_window(index, start, count, array_size)
  }

  // HELPER FUNCTIONS --------------------------------------------------- //
  fn require_open(&self) -> Result<&OpenFile> {
    self.open.as_ref().ok_or(DwError::NotOpen)
  }
}

impl Drop for Session {
  /// Point of no return: closes the open data file, if any.
  fn drop(&mut self) {
    let _ = self.close();
  }
}

fn validate_window(start: usize, count: usize, avail: usize) -> Result<()> {
  match start.checked_add(count) {
    Some(end) if end <= avail => Ok(()),
    _ => Err(DwError::WindowOutOfRange { start,
                                         count,
                                         avail }),
  }
}
