// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::fmt;


/// Metadata of one channel as listed in the channel table of a data file.
///
/// `index` is the key the decoding service knows the channel by. It is
/// opaque: consecutive catalog entries need not carry consecutive indices,
/// so it must never be used as a position into the channel list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, CopyGetters,
         Getters)]
#[serde(try_from = "ChannelFields")]
pub struct Channel {
  #[getset(get_copy = "pub")]
  index:       i32,
  #[getset(get = "pub")]
  name:        String,
  #[getset(get = "pub")]
  unit:        String,
  #[getset(get = "pub")]
  description: String,
  #[getset(get_copy = "pub")]
  color:       u32,
  /// Values recorded per sample tick; `1` for scalar channels.
  #[getset(get_copy = "pub")]
  array_size:  usize,
  /// Vendor storage type tag, passed through without interpretation.
  #[getset(get_copy = "pub")]
  data_type:   i32,
}

impl Channel {
  pub fn new(index: i32,
             name: String,
             unit: String,
             description: String,
             color: u32,
             array_size: usize,
             data_type: i32)
             -> Self {
    assert!(array_size >= 1, "channels carry at least one value per tick");
    Self { index,
           name,
           unit,
           description,
           color,
           array_size,
           data_type }
  }
}

// deserialization runs through this mirror; `try_from` holds stored channel
// tables to the same array size invariant as the constructor
#[derive(Deserialize)]
struct ChannelFields {
  index:       i32,
  name:        String,
  unit:        String,
  description: String,
  color:       u32,
  array_size:  usize,
  data_type:   i32,
}

impl TryFrom<ChannelFields> for Channel {
  type Error = String;

  fn try_from(fields: ChannelFields) -> Result<Self, Self::Error> {
    if fields.array_size < 1 {
      return Err("channels carry at least one value per tick".to_string());
    }

    Ok(Self { index:       fields.index,
              name:        fields.name,
              unit:        fields.unit,
              description: fields.description,
              color:       fields.color,
              array_size:  fields.array_size,
              data_type:   fields.data_type, })
  }
}


/// Identity of a channel for lookups: either its vendor index or its name.
///
/// Both address the same channel; equality of results over both forms is
/// part of the access contract. Names are matched exactly, first match wins
/// should a file carry duplicate channel names.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChannelId<'a> {
  Index(i32),
  Name(&'a str),
}

impl<'a> From<i32> for ChannelId<'a> {
  fn from(index: i32) -> Self {
    Self::Index(index)
  }
}

impl<'a> From<&'a str> for ChannelId<'a> {
  fn from(name: &'a str) -> Self {
    Self::Name(name)
  }
}

impl<'a> From<&'a String> for ChannelId<'a> {
  fn from(name: &'a String) -> Self {
    Self::Name(name)
  }
}

impl fmt::Display for ChannelId<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Index(index) => write!(f, "index {}", index),
      Self::Name(name) => write!(f, "name \"{}\"", name),
    }
  }
}


/// Scaled samples of one channel: full-rate values with their timestamps.
///
/// For scalar channels, sample `i` belongs to timestamp `i`. For array
/// channels, each timestamp owns a block of `array_size` consecutive
/// samples; `records` yields those blocks in timestamp order. Serializable
/// for export; construction always goes through `from_buffers`, which ties
/// the buffer lengths to `array_size`.
#[derive(Clone, Debug, PartialEq, Serialize, Getters, CopyGetters)]
pub struct ChannelData {
  #[getset(get = "pub")]
  timestamps: Vec<f64>,
  #[getset(get = "pub")]
  samples:    Vec<f64>,
  #[getset(get_copy = "pub")]
  array_size: usize,
}

impl ChannelData {
  /// Allocates zeroed timestamp and sample buffers for `count` ticks of
  /// `array_size` values each, sized the way the foreign read call fills
  /// them.
  pub fn allocate(count: usize, array_size: usize) -> (Vec<f64>, Vec<f64>) {
    (vec![0.0; count], vec![0.0; count * array_size])
  }

  /// Creates a `ChannelData` from filled buffers. Panics if the buffer
  /// lengths do not agree with `array_size`; buffers from `allocate` always
  /// do.
  pub fn from_buffers(timestamps: Vec<f64>,
                      samples: Vec<f64>,
                      array_size: usize)
                      -> Self {
    assert!(array_size >= 1, "channels carry at least one value per tick");
    assert_eq!(timestamps.len() * array_size,
               samples.len(),
               "sample buffer does not hold {} values per timestamp",
               array_size);

    Self { timestamps,
           samples,
           array_size }
  }

  pub fn len(&self) -> usize {
    self.timestamps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.timestamps.is_empty()
  }

  /// Sample blocks in timestamp order, `array_size` values each.
  pub fn records(&self) -> std::slice::ChunksExact<'_, f64> {
    self.samples.chunks_exact(self.array_size)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::{assert_eq, assert_ne};


  fn speed() -> Channel {
    Channel::new(4,
                 "Vehicle_Speed".to_string(),
                 "km/h".to_string(),
                 "GPS based speed over ground".to_string(),
                 0x0000_00ff,
                 1,
                 5)
  }

  #[test]
  fn channel_test() {
    let channel = speed();
    assert_eq!(4, channel.index());
    assert_eq!("Vehicle_Speed", channel.name());
    assert_eq!("km/h", channel.unit());
    assert_eq!("GPS based speed over ground", channel.description());
    assert_eq!(0x0000_00ff, channel.color());
    assert_eq!(1, channel.array_size());
    assert_eq!(5, channel.data_type());

    let other = Channel::new(5,
                             "Engine_RPM".to_string(),
                             "rpm".to_string(),
                             String::new(),
                             0x0000_ff00,
                             1,
                             5);
    assert_ne!(channel, other);
  }

  #[test]
  fn channel_deserialize_test() {
    let valid = r#"{"index":4,"name":"Vehicle_Speed","unit":"km/h",
                    "description":"GPS based speed over ground",
                    "color":255,"array_size":1,"data_type":5}"#;
    let channel: Channel = serde_json::from_str(valid).unwrap();
    assert_eq!(speed(), channel);

    // a stored channel table is held to the array size invariant of the
    // constructor
    let zero = valid.replace("\"array_size\":1", "\"array_size\":0");
    assert!(serde_json::from_str::<Channel>(&zero).is_err());
  }

  #[test]
  fn channel_id_test() {
    assert_eq!(ChannelId::Index(4), 4.into());
    assert_eq!(ChannelId::Name("Vehicle_Speed"), "Vehicle_Speed".into());

    let name = "Vehicle_Speed".to_string();
    assert_eq!(ChannelId::Name("Vehicle_Speed"), (&name).into());

    assert_eq!("index 4", ChannelId::Index(4).to_string());
    assert_eq!("name \"Vehicle_Speed\"",
               ChannelId::Name("Vehicle_Speed").to_string());
  }

  #[test]
  fn channel_data_test() {
    let (timestamps, samples) = ChannelData::allocate(42, 1);
    assert_eq!(42, timestamps.len());
    assert_eq!(42, samples.len());

    let data = ChannelData::from_buffers(timestamps, samples, 1);
    assert_eq!(42, data.len());
    assert_eq!(false, data.is_empty());

    let (timestamps, samples) = ChannelData::allocate(1337, 1);
    let other = ChannelData::from_buffers(timestamps, samples, 1);
    assert_ne!(data, other);

    let empty = ChannelData::from_buffers(Vec::new(), Vec::new(), 1);
    assert_eq!(true, empty.is_empty());
  }

  #[test]
  fn channel_data_records_test() {
    let (timestamps, samples) = ChannelData::allocate(3, 3);
    assert_eq!(3, timestamps.len());
    assert_eq!(9, samples.len());

    let samples: Vec<f64> = (0..9).map(f64::from).collect();
    let data = ChannelData::from_buffers(timestamps, samples, 3);
    assert_eq!(3, data.len());

    let records: Vec<&[f64]> = data.records().collect();
    assert_eq!(3, records.len());
    assert_eq!(&[0.0, 1.0, 2.0], records[0]);
    assert_eq!(&[3.0, 4.0, 5.0], records[1]);
    assert_eq!(&[6.0, 7.0, 8.0], records[2]);
  }

  #[test]
  #[should_panic]
  fn channel_data_mismatch_panic_test() {
    let _panic = ChannelData::from_buffers(vec![0.0; 42], vec![0.0; 43], 1);
  }

  #[test]
  #[should_panic]
  fn channel_data_array_size_panic_test() {
    let _panic = ChannelData::from_buffers(vec![0.0; 4], vec![0.0; 8], 3);
  }

  #[test]
  #[should_panic]
  fn channel_data_zero_array_panic_test() {
    let _panic = ChannelData::from_buffers(Vec::new(), Vec::new(), 0);
  }
}
