// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

//! Conversion helpers between vendor library data and crate types. All raw
//! memory handling of the foreign boundary lives here and in `bindings`.

use super::{bindings::{DWChannel, DWSTAT_OK},
            channel::Channel,
            error::{DwError, Result}};
use std::{ffi::CString, os::raw::c_char, path::Path};


/// Converts a fixed-width, NUL-padded `char` field to an owned `String`.
///
/// Vendor strings carry no encoding guarantee, so decoding is lossy; a
/// mangled byte decodes to U+FFFD on every read, which keeps name lookups
/// internally consistent.
pub fn chararr_to_string(chars: &[c_char]) -> String {
  let bytes: Vec<u8> = chars.iter()
                            .take_while(|&&byte| byte != 0)
                            .map(|&byte| byte as u8)
                            .collect();

  String::from_utf8_lossy(&bytes).into_owned()
}

/// Converts a `Path` to a NUL-terminated `CString` for the foreign open
/// call. Canonicalizes first since the vendor library wants absolute paths.
pub fn path_to_cstring(path: &Path) -> Result<CString> {
  let canonical = path.canonicalize()
                      .map_err(|_| DwError::NotFound(path.to_owned()))?;

  CString::new(canonical.to_string_lossy().into_owned())
    .map_err(|_| DwError::NotFound(path.to_owned()))
}

/// Maps a vendor status code to `Ok` or a `Service` error carrying the
/// foreign call name.
pub fn check_status(call: &'static str, status: i32) -> Result<()> {
  if status == DWSTAT_OK {
    Ok(())
  } else {
    Err(DwError::Service { call, status })
  }
}

/// Builds a `Channel` record from one raw channel table entry.
pub fn channel_from_raw(raw: &DWChannel) -> Channel {
  Channel::new(raw.index,
               chararr_to_string(&raw.name),
               chararr_to_string(&raw.unit),
               chararr_to_string(&raw.description),
               raw.color,
               raw.array_size.max(1) as usize,
               raw.data_type)
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;


  fn chararr<const N: usize>(text: &[u8]) -> [c_char; N] {
    let mut field = [0 as c_char; N];
    for (slot, byte) in field.iter_mut().zip(text) {
      *slot = *byte as c_char;
    }
    field
  }

  #[test]
  fn chararr_to_string_test() {
    let padded: [c_char; 20] = chararr(b"Vehicle_Speed");
    assert_eq!("Vehicle_Speed", chararr_to_string(&padded));

    let empty = [0 as c_char; 20];
    assert_eq!("", chararr_to_string(&empty));

    // full-width field without NUL terminator
    let full: [c_char; 4] = chararr(b"km/h");
    assert_eq!("km/h", chararr_to_string(&full));
  }

  #[test]
  fn chararr_to_string_lossy_test() {
    // 0xb0 is '°' in Latin-1 and invalid on its own in UTF-8
    let mut mangled: [c_char; 8] = chararr(b"temp ");
    mangled[5] = 0xb0u8 as c_char;
    assert_eq!("temp \u{fffd}", chararr_to_string(&mangled));
  }

  #[test]
  fn path_to_cstring_test() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let canonical = file.path().canonicalize().unwrap();

    let as_cstring = CString::new(canonical.to_str().unwrap()).unwrap();
    assert_eq!(as_cstring, path_to_cstring(file.path()).unwrap());
  }

  #[test]
  fn path_to_cstring_missing_test() {
    let missing = Path::new("/no/such/file.d7d");
    assert!(matches!(path_to_cstring(missing),
                     Err(DwError::NotFound(path)) if path == missing));
  }

  #[test]
  fn check_status_test() {
    assert!(check_status("DWGetChannelList", 0).is_ok());
    assert!(matches!(check_status("DWGetChannelList", 4),
                     Err(DwError::Service { call: "DWGetChannelList",
                                            status: 4, })));
  }

  #[test]
  fn channel_from_raw_test() {
    let mut raw = DWChannel::zeroed();
    raw.index = 7;
    raw.name = chararr(b"Engine_RPM");
    raw.unit = chararr(b"rpm");
    raw.description = chararr(b"crankshaft speed");
    raw.color = 0x00ff_0000;
    raw.array_size = 0;
    raw.data_type = 5;

    let channel = channel_from_raw(&raw);
    assert_eq!(7, channel.index());
    assert_eq!("Engine_RPM", channel.name());
    assert_eq!("rpm", channel.unit());
    assert_eq!("crankshaft speed", channel.description());
    assert_eq!(0x00ff_0000, channel.color());
    // a zero array size from the library means a scalar channel
    assert_eq!(1, channel.array_size());
    assert_eq!(5, channel.data_type());
  }
}
