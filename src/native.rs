// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{bindings::{DWChannel, DWFileInfo, DWReducedValue, DwLib,
                       DWSTAT_OK},
            channel::{Channel, ChannelData},
            decoder::Decoder,
            error::{DwError, Result},
            reduced::{ReducedCount, ReducedRecord},
            service as srv,
            session::FileInfo};
use lazy_static::lazy_static;
use std::{cmp::Ordering,
          env,
          path::{Path, PathBuf},
          sync::{Arc, Mutex}};
use tracing::{debug, warn};


#[cfg(all(windows, target_pointer_width = "64"))]
const LIB_FILE: &str = "DWDataReaderLib64.dll";
#[cfg(all(windows, target_pointer_width = "32"))]
const LIB_FILE: &str = "DWDataReaderLib.dll";
#[cfg(all(unix, target_pointer_width = "64"))]
const LIB_FILE: &str = "DWDataReaderLib64.so";
#[cfg(all(unix, target_pointer_width = "32"))]
const LIB_FILE: &str = "DWDataReaderLib.so";


lazy_static! {
  /// Process-global handle on the initialized decoding service. The vendor
  /// library pairs `DWInit`/`DWDeInit` per process, so all decoders share
  /// one instance; the last decoder tears it down. Initialization and
  /// teardown both run inside this lock's critical section, so one
  /// generation's `DWDeInit` always completes before the next `DWInit`
  /// starts.
  static ref SERVICE: Mutex<Option<Arc<NativeService>>> = Mutex::new(None);
}


/// The loaded and initialized vendor library plus the process-wide gates
/// around it.
///
/// `call_mtx` serializes the foreign calls of a live service - the library
/// is not threadsafe. `DWInit` and `DWDeInit` are not under it; they run
/// inside the `SERVICE` registry lock, which orders them across service
/// generations. `open_slot` guards the library's single implicit current
/// file: whichever decoder holds the slot owns all file-scoped calls until
/// it releases them.
#[derive(Debug)]
struct NativeService {
  lib:       DwLib,
  call_mtx:  Mutex<()>,
  open_slot: Mutex<bool>,
}

impl NativeService {
  /// Attaches to the process-wide service, loading and initializing the
  /// vendor library when no other decoder holds it.
  fn acquire() -> Result<Arc<Self>> {
    let mut registry = SERVICE.lock().unwrap();
    if let Some(service) = registry.as_ref() {
      return Ok(Arc::clone(service));
    }

    let path = library_path();
    let lib = DwLib::load(&path)?;

    let status = lib.init();
    if status != DWSTAT_OK {
      return Err(DwError::Init { reason: format!("DWInit returned status \
                                                  {}",
                                                 status), });
    }

    let service = Arc::new(Self { lib,
                                  call_mtx: Mutex::new(()),
                                  open_slot: Mutex::new(false) });
    debug!(path = %path.display(),
           version = service.lib.version(),
           "decoding service initialized");

    *registry = Some(Arc::clone(&service));
    Ok(service)
  }

  /// Deinitializes the vendor library. Callers hold the `SERVICE` registry
  /// lock; no decoder besides the caller exists at this point.
  fn shut_down(&self) {
    let _guard = self.call_mtx.lock().unwrap();
    let status = self.lib.de_init();
    if status == DWSTAT_OK {
      debug!("decoding service deinitialized");
    } else {
      warn!(status, "DWDeInit reported failure");
    }
  }
}


/// `Decoder` over Dewesoft's `DWDataReaderLib` shared library.
///
/// The library is searched for as `DWDataReaderLib64.so` (resp. `.dll`, or
/// the non-64 names on 32 bit targets) in the directory named by the
/// `DWDAT_LIBDIR` environment variable, falling back to the system loader
/// search path when the variable is unset.
#[derive(Debug)]
pub struct NativeDecoder {
  service:    Arc<NativeService>,
  holds_file: bool,
}

impl NativeDecoder {
  /// Loads and initializes the vendor library, or attaches to the already
  /// loaded instance. Fails with `Init` when the library cannot be found,
  /// lacks entry points or refuses to initialize.
  pub fn acquire() -> Result<Self> {
    Ok(Self { service:    NativeService::acquire()?,
              holds_file: false, })
  }
}

impl Decoder for NativeDecoder {
  fn version(&self) -> i32 {
    let _guard = self.service.call_mtx.lock().unwrap();
    self.service.lib.version()
  }

  fn open(&mut self, path: &Path) -> Result<FileInfo> {
    let mut open_slot = self.service.open_slot.lock().unwrap();
    if *open_slot {
      return Err(DwError::AlreadyOpen);
    }

    let cpath = srv::path_to_cstring(path)?;
    let mut raw = DWFileInfo::default();

    let _guard = self.service.call_mtx.lock().unwrap();
    let status = self.service.lib.open_data_file(&cpath, &mut raw);
    if status != DWSTAT_OK {
      debug!(status, path = %path.display(), "DWOpenDataFile rejected file");
      return Err(DwError::Corrupt(path.to_owned()));
    }

    *open_slot = true;
    self.holds_file = true;
    Ok(FileInfo::new(raw.sample_rate, raw.start_store_time, raw.duration))
  }

  fn close(&mut self) -> Result<()> {
    if !self.holds_file {
      return Ok(());
    }

    let mut open_slot = self.service.open_slot.lock().unwrap();
    let status = {
      let _guard = self.service.call_mtx.lock().unwrap();
      self.service.lib.close_data_file()
    };

    // the slot frees regardless of status; a failed release must not wedge
    // the service for the next open
    *open_slot = false;
    self.holds_file = false;

    if status != DWSTAT_OK {
      return Err(DwError::Close { reason: format!("DWCloseDataFile \
                                                   returned status {}",
                                                  status), });
    }
    Ok(())
  }

  fn channel_list(&mut self) -> Result<Vec<Channel>> {
    let _guard = self.service.call_mtx.lock().unwrap();

    let count = self.service.lib.channel_list_count();
    match count.cmp(&0) {
      Ordering::Greater => {
        let mut raw = vec![DWChannel::zeroed(); count as usize];
        srv::check_status("DWGetChannelList",
                          self.service.lib.channel_list(&mut raw))?;
        Ok(raw.iter().map(srv::channel_from_raw).collect())
      }
      Ordering::Equal => Ok(Vec::new()),
      Ordering::Less => Err(DwError::Service { call:
                                                 "DWGetChannelListCount",
                                               status: count, }),
    }
  }

  fn reduced_count(&mut self, index: i32) -> Result<ReducedCount> {
    let (mut count, mut seconds) = (0i32, 0.0f64);

    let _guard = self.service.call_mtx.lock().unwrap();
    srv::check_status("DWGetReducedValuesCount",
                      self.service.lib.reduced_values_count(index,
                                                            &mut count,
                                                            &mut seconds))?;

    if count < 0 {
      return Err(DwError::Service { call:   "DWGetReducedValuesCount",
                                    status: count, });
    }
    Ok(ReducedCount::new(count as usize, seconds))
  }

  fn reduced_window(&mut self,
                    index: i32,
                    start: usize,
                    count: usize)
                    -> Result<Vec<ReducedRecord>> {
    let mut raw = vec![DWReducedValue::default(); count];

    let _guard = self.service.call_mtx.lock().unwrap();
    srv::check_status("DWGetReducedValues",
                      self.service.lib.reduced_values(index,
                                                      start as i32,
                                                      count as i32,
                                                      &mut raw))?;

    Ok(raw.iter()
          .map(|value| {
            ReducedRecord::new(value.time_stamp,
                               value.ave,
                               value.min,
                               value.max,
                               value.rms)
          })
          .collect())
  }

  fn scaled_count(&mut self, index: i32) -> Result<usize> {
    let _guard = self.service.call_mtx.lock().unwrap();

    let count = self.service.lib.scaled_samples_count(index);
    if count < 0 {
      return Err(DwError::Service { call:   "DWGetScaledSamplesCount",
                                    status: count as i32, });
    }
    Ok(count as usize)
  }

  fn scaled_window(&mut self,
                   index: i32,
                   start: usize,
                   count: usize,
                   array_size: usize)
                   -> Result<ChannelData> {
    let (mut timestamps, mut samples) =
      ChannelData::allocate(count, array_size);

    let _guard = self.service.call_mtx.lock().unwrap();
    srv::check_status("DWGetScaledSamples",
                      self.service.lib.scaled_samples(index,
                                                      start as i64,
                                                      count as i32,
                                                      &mut samples,
                                                      &mut timestamps))?;

    Ok(ChannelData::from_buffers(timestamps, samples, array_size))
  }
}

impl Drop for NativeDecoder {
  /// Releases the open slot should the decoder be dropped mid-file, then
  /// detaches from the decoding service, deinitializing it when this was
  /// the last decoder.
  fn drop(&mut self) {
    if self.holds_file {
      if let Err(err) = self.close() {
        warn!(error = %err, "release on decoder drop failed");
      }
    }

    let mut registry = SERVICE.lock().unwrap();
    // two strong references are the registry's and this decoder's; the
    // lock is held until `DWDeInit` returns, so a concurrent `acquire`
    // cannot start a fresh `DWInit` against a half-torn-down library
    if Arc::strong_count(&self.service) == 2 {
      registry.take();
      self.service.shut_down();
    }
  }
}

/// Location of the vendor library: `DWDAT_LIBDIR` joined with the platform
/// library name, or the bare name for the system loader to resolve.
fn library_path() -> PathBuf {
  match env::var_os("DWDAT_LIBDIR") {
    Some(dir) => Path::new(&dir).join(LIB_FILE),
    None => PathBuf::from(LIB_FILE),
  }
}


#[cfg(test)]
mod tests {
  use super::{super::session::Session, *};
  use pretty_assertions::assert_eq;


  const D7D_PATH: &str = "./testdata/Example_Drive01.d7d";

  #[test]
  fn library_path_test() {
    let path = library_path();
    assert!(path.to_string_lossy().contains("DWDataReaderLib"));
  }

  // needs the vendor library on the loader path
  #[test]
  #[ignore]
  fn service_cycling_test() {
    {
      let first = Session::native().unwrap();
      let second = Session::native().unwrap();
      assert_eq!(first.version(), second.version());
    }

    // both sessions are gone and the service was deinitialized; the next
    // session initializes a fresh one
    let session = Session::native().unwrap();
    assert!(session.version() > 0);
    drop(session);

    // teardown of the last session and initialization by the next are
    // ordered through the registry lock, also across threads
    let churn: Vec<_> = (0..4).map(|_| {
                                std::thread::spawn(|| {
                                  for _ in 0..25 {
                                    let session = Session::native().unwrap();
                                    assert!(session.version() > 0);
                                  }
                                })
                              })
                              .collect();
    for worker in churn {
      worker.join().unwrap();
    }
  }

  // needs the vendor library on the loader path and the example recording
  #[test]
  #[ignore]
  fn native_walkthrough_test() {
    let mut session = Session::native().unwrap();
    assert!(session.version() > 0);

    let info = session.open(Path::new(D7D_PATH)).unwrap();
    assert!(info.sample_rate() > 0.0);
    assert!(info.duration() >= 0.0);

    let channels = session.channels().unwrap().to_vec();
    assert!(!channels.is_empty());

    for channel in &channels {
      let count = session.reduced_count(channel.index()).unwrap();
      let records = session.reduced_values(channel.index(), 0, count.count())
                           .unwrap();
      assert_eq!(count.count(), records.len());
    }

    session.close().unwrap();
  }
}
