// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

//! Hand-maintained bindings for Dewesoft's `DWDataReaderLib`, resolved at
//! runtime via `libloading`. Layouts follow `DWDataReaderLib.h`; the library
//! is loaded the same way the vendor examples do it, so no link-time
//! dependency on the shared object exists.

use super::error::{DwError, Result};
use libloading::Library;
use std::{os::raw::{c_char, c_double, c_int, c_uint},
          path::Path};


// STATUS CODES --------------------------------------------------------- //
// `DWStatus` from the vendor header. Only `OK` is acted upon by name; all
// other codes travel verbatim inside `DwError::Service`.
pub const DWSTAT_OK: c_int = 0;


// RAW RECORD LAYOUTS --------------------------------------------------- //
/// `DWFileInfo`: global header of an open data file.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct DWFileInfo {
  pub sample_rate:      c_double,
  pub start_store_time: c_double,
  pub duration:         c_double,
}

/// `DWChannel`: one entry of the channel table. Strings are fixed-width,
/// NUL-padded byte fields.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct DWChannel {
  pub index:       c_int,
  pub name:        [c_char; 100],
  pub unit:        [c_char; 20],
  pub description: [c_char; 200],
  pub color:       c_uint,
  pub array_size:  c_int,
  pub data_type:   c_int,
}

impl DWChannel {
  /// All-zero value for output buffers the library writes into.
  pub fn zeroed() -> Self {
    unsafe { std::mem::zeroed() }
  }
}

/// `DWReducedValue`: one time bucket of precomputed channel statistics.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct DWReducedValue {
  pub time_stamp: c_double,
  pub ave:        c_double,
  pub min:        c_double,
  pub max:        c_double,
  pub rms:        c_double,
}


// ENTRY POINT SIGNATURES ----------------------------------------------- //
type DWInitFn = unsafe extern "C" fn() -> c_int;
type DWDeInitFn = unsafe extern "C" fn() -> c_int;
type DWGetVersionFn = unsafe extern "C" fn() -> c_int;
type DWOpenDataFileFn =
  unsafe extern "C" fn(*const c_char, *mut DWFileInfo) -> c_int;
type DWCloseDataFileFn = unsafe extern "C" fn() -> c_int;
type DWGetChannelListCountFn = unsafe extern "C" fn() -> c_int;
type DWGetChannelListFn = unsafe extern "C" fn(*mut DWChannel) -> c_int;
type DWGetReducedValuesCountFn =
  unsafe extern "C" fn(c_int, *mut c_int, *mut c_double) -> c_int;
type DWGetReducedValuesFn =
  unsafe extern "C" fn(c_int, c_int, c_int, *mut DWReducedValue) -> c_int;
type DWGetScaledSamplesCountFn = unsafe extern "C" fn(c_int) -> i64;
type DWGetScaledSamplesFn =
  unsafe extern "C" fn(c_int, i64, c_int, *mut c_double, *mut c_double)
    -> c_int;


// LIBRARY HANDLE ------------------------------------------------------- //
/// The loaded vendor library with every entry point resolved up front.
///
/// Resolving all symbols at load time turns an incomplete or mismatched
/// library into a single early `Init` failure instead of a surprise at the
/// first read. The function pointers stay valid for as long as `_lib` keeps
/// the shared object mapped, which is the lifetime of this struct.
#[derive(Debug)]
pub struct DwLib {
  dw_init:                    DWInitFn,
  dw_de_init:                 DWDeInitFn,
  dw_get_version:             DWGetVersionFn,
  dw_open_data_file:          DWOpenDataFileFn,
  dw_close_data_file:         DWCloseDataFileFn,
  dw_get_channel_list_count:  DWGetChannelListCountFn,
  dw_get_channel_list:        DWGetChannelListFn,
  dw_get_reduced_values_count: DWGetReducedValuesCountFn,
  dw_get_reduced_values:      DWGetReducedValuesFn,
  dw_get_scaled_samples_count: DWGetScaledSamplesCountFn,
  dw_get_scaled_samples:      DWGetScaledSamplesFn,
  _lib:                       Library,
}

impl DwLib {
  /// Loads the shared object at `path` and resolves all entry points.
  pub fn load(path: &Path) -> Result<Self> {
    let lib = unsafe { Library::new(path) }.map_err(|err| DwError::Init {
                reason: format!("cannot load '{}': {}", path.display(), err),
              })?;

    Ok(Self { dw_init:                     find(&lib, "DWInit")?,
              dw_de_init:                  find(&lib, "DWDeInit")?,
              dw_get_version:              find(&lib, "DWGetVersion")?,
              dw_open_data_file:           find(&lib, "DWOpenDataFile")?,
              dw_close_data_file:          find(&lib, "DWCloseDataFile")?,
              dw_get_channel_list_count:
                find(&lib, "DWGetChannelListCount")?,
              dw_get_channel_list:         find(&lib, "DWGetChannelList")?,
              dw_get_reduced_values_count:
                find(&lib, "DWGetReducedValuesCount")?,
              dw_get_reduced_values:       find(&lib, "DWGetReducedValues")?,
              dw_get_scaled_samples_count:
                find(&lib, "DWGetScaledSamplesCount")?,
              dw_get_scaled_samples:       find(&lib, "DWGetScaledSamples")?,
              _lib:                        lib, })
  }

  pub fn init(&self) -> c_int {
    unsafe { (self.dw_init)() }
  }

  pub fn de_init(&self) -> c_int {
    unsafe { (self.dw_de_init)() }
  }

  pub fn version(&self) -> c_int {
    unsafe { (self.dw_get_version)() }
  }

  /// `path` must be NUL-terminated; `info` is overwritten on success.
  pub fn open_data_file(&self,
                        path: &std::ffi::CStr,
                        info: &mut DWFileInfo)
                        -> c_int {
    unsafe { (self.dw_open_data_file)(path.as_ptr(), info) }
  }

  pub fn close_data_file(&self) -> c_int {
    unsafe { (self.dw_close_data_file)() }
  }

  pub fn channel_list_count(&self) -> c_int {
    unsafe { (self.dw_get_channel_list_count)() }
  }

  /// `buffer` must hold as many entries as `channel_list_count` reported.
  pub fn channel_list(&self, buffer: &mut [DWChannel]) -> c_int {
    unsafe { (self.dw_get_channel_list)(buffer.as_mut_ptr()) }
  }

  pub fn reduced_values_count(&self,
                              channel: c_int,
                              count: &mut c_int,
                              seconds: &mut c_double)
                              -> c_int {
    unsafe { (self.dw_get_reduced_values_count)(channel, count, seconds) }
  }

  /// `buffer` must hold `count` entries.
  pub fn reduced_values(&self,
                        channel: c_int,
                        position: c_int,
                        count: c_int,
                        buffer: &mut [DWReducedValue])
                        -> c_int {
    unsafe {
      (self.dw_get_reduced_values)(channel,
                                   position,
                                   count,
                                   buffer.as_mut_ptr())
    }
  }

  pub fn scaled_samples_count(&self, channel: c_int) -> i64 {
    unsafe { (self.dw_get_scaled_samples_count)(channel) }
  }

  /// `data` must hold `count * array_size` values, `timestamps` `count`.
  pub fn scaled_samples(&self,
                        channel: c_int,
                        position: i64,
                        count: c_int,
                        data: &mut [c_double],
                        timestamps: &mut [c_double])
                        -> c_int {
    unsafe {
      (self.dw_get_scaled_samples)(channel,
                                   position,
                                   count,
                                   data.as_mut_ptr(),
                                   timestamps.as_mut_ptr())
    }
  }
}

/// Resolves one entry point or reports the library as incompatible.
fn find<T: Copy>(lib: &Library, name: &'static str) -> Result<T> {
  let symbol = unsafe { lib.get::<T>(name.as_bytes()) };
  match symbol {
    Ok(symbol) => Ok(*symbol),
    Err(err) => Err(DwError::Init { reason: format!("no '{}' entry point: \
                                                     {}",
                                                    name, err), }),
  }
}
