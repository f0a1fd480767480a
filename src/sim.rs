// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

//! In-memory decoding collaborator.
//!
//! `SimRecording` implements `Decoder` over data assembled in memory, so the
//! complete access contract - lifecycle, catalog, reduced and scaled reads -
//! runs without the vendor library or a real data file. Downstream crates
//! use it the same way this crate's tests do: build a recording, hand it to
//! `Session::with_decoder`, exercise code under test.

use super::{channel::{Channel, ChannelData, ChannelId},
            decoder::Decoder,
            error::{DwError, Result},
            reduced::{ReducedCount, ReducedRecord},
            session::FileInfo};
use std::path::Path;


const SAMPLE_RATE: f64 = 100.0;
const DURATION: f64 = 96.0;
const RESOLUTION: f64 = 0.5;
const BUCKETS: usize = 192;
const TICKS: usize = 9600;
// 2021-03-12 15:00:00 as days since 1899-12-30
const START_STORE_TIME: f64 = 44_267.625;

const PALETTE: [u32; 5] =
  [0x0000_00ff, 0x0000_ff00, 0x00ff_0000, 0x0000_ffff, 0x00ff_00ff];

// (name, unit, description, array_size, data_type)
const EXAMPLE_CHANNELS: [(&str, &str, &str, usize, i32); 20] =
  [("Acc_X", "g", "chassis acceleration, longitudinal", 1, 5),
   ("Acc_Y", "g", "chassis acceleration, lateral", 1, 5),
   ("Acc_Z", "g", "chassis acceleration, vertical", 1, 5),
   ("Gyro_X", "deg/s", "roll rate", 1, 5),
   ("Gyro_Y", "deg/s", "pitch rate", 1, 5),
   ("Gyro_Z", "deg/s", "yaw rate", 1, 5),
   ("Engine_RPM", "rpm", "crankshaft speed", 1, 5),
   ("Vehicle_Speed", "km/h", "GPS based speed over ground", 1, 5),
   ("Throttle", "%", "throttle pedal position", 1, 5),
   ("Brake_Pressure", "bar", "front brake circuit pressure", 1, 5),
   ("Coolant_Temp", "C", "engine coolant temperature", 1, 5),
   ("Oil_Temp", "C", "engine oil temperature", 1, 5),
   ("Oil_Press", "bar", "engine oil pressure", 1, 5),
   ("Fuel_Level", "%", "tank fill level", 1, 5),
   ("Battery_U", "V", "board net voltage", 1, 5),
   ("Lambda", "-", "air fuel equivalence ratio", 1, 5),
   ("Gear", "-", "engaged gear", 1, 4),
   ("Steering_Angle", "deg", "steering wheel angle", 1, 5),
   ("GPS_Altitude", "m", "altitude above sea level", 1, 5),
   ("GPS_Position", "deg", "latitude, longitude, altitude", 3, 4)];


/// A recording assembled in memory, usable as a `Decoder`.
#[derive(Debug)]
pub struct SimRecording {
  version:    i32,
  info:       FileInfo,
  resolution: f64,
  channels:   Vec<SimChannel>,
  corrupt:    bool,
  open:       bool,
}

#[derive(Debug)]
struct SimChannel {
  meta:    Channel,
  reduced: Vec<ReducedRecord>,
  samples: ChannelData,
}

impl SimRecording {
  /// An empty recording; add channels with `with_channel`.
  pub fn new(version: i32, info: FileInfo, resolution: f64) -> Self {
    Self { version,
           info,
           resolution,
           channels: Vec::new(),
           corrupt: false,
           open: false }
  }

  /// Adds one channel with its reduced records and scaled samples. Panics
  /// when `samples` disagrees with the channel's array size.
  pub fn with_channel(mut self,
                      meta: Channel,
                      reduced: Vec<ReducedRecord>,
                      samples: ChannelData)
                      -> Self {
    assert_eq!(meta.array_size(),
               samples.array_size(),
               "sample blocks do not match channel '{}'",
               meta.name());

    self.channels.push(SimChannel { meta,
                                    reduced,
                                    samples });
    self
  }

  /// A recording whose contents the decoder rejects: every open fails with
  /// `Corrupt`.
  pub fn corrupt() -> Self {
    Self { corrupt: true,
           ..Self::new(4007, FileInfo::new(0.0, 0.0, 0.0), 0.0) }
  }

  /// The stock fixture: a 96 second drive recorded at 100 ticks per second
  /// with 20 channels, each carrying 192 reduced buckets of half a second.
  /// Channel 19, `GPS_Position`, is an array channel with three values per
  /// tick; everything else is scalar. All data is deterministic.
  pub fn example_drive() -> Self {
    let info = FileInfo::new(SAMPLE_RATE, START_STORE_TIME, DURATION);
    let mut recording = Self::new(4007, info, RESOLUTION);

    for (position, (name, unit, description, array_size, data_type)) in
      EXAMPLE_CHANNELS.iter().enumerate()
    {
      let index = position as i32;
      let meta = Channel::new(index,
                              name.to_string(),
                              unit.to_string(),
                              description.to_string(),
                              PALETTE[position % PALETTE.len()],
                              *array_size,
                              *data_type);

      recording =
        recording.with_channel(meta,
                               reduced_table(index, BUCKETS, RESOLUTION),
                               scaled_table(index, TICKS, *array_size));
    }

    recording
  }

  fn require_open(&self) -> Result<()> {
    if self.open {
      Ok(())
    } else {
      Err(DwError::NotOpen)
    }
  }

  fn channel(&self, index: i32) -> Result<&SimChannel> {
    self.require_open()?;
    self.channels
        .iter()
        .find(|channel| channel.meta.index() == index)
        .ok_or_else(|| {
          DwError::UnknownChannel(ChannelId::Index(index).to_string())
        })
  }
}

impl Decoder for SimRecording {
  fn version(&self) -> i32 {
    self.version
  }

  fn open(&mut self, path: &Path) -> Result<FileInfo> {
    if self.corrupt {
      return Err(DwError::Corrupt(path.to_owned()));
    }
    if self.open {
      return Err(DwError::AlreadyOpen);
    }

    self.open = true;
    Ok(self.info)
  }

  fn close(&mut self) -> Result<()> {
    self.open = false;
    Ok(())
  }

  fn channel_list(&mut self) -> Result<Vec<Channel>> {
    self.require_open()?;
    Ok(self.channels.iter().map(|channel| channel.meta.clone()).collect())
  }

  fn reduced_count(&mut self, index: i32) -> Result<ReducedCount> {
    let channel = self.channel(index)?;
    Ok(ReducedCount::new(channel.reduced.len(), self.resolution))
  }

  fn reduced_window(&mut self,
                    index: i32,
                    start: usize,
                    count: usize)
                    -> Result<Vec<ReducedRecord>> {
    let channel = self.channel(index)?;
    let avail = channel.reduced.len();

    let window = start.checked_add(count)
                      .and_then(|end| channel.reduced.get(start..end))
                      .ok_or(DwError::WindowOutOfRange { start,
                                                         count,
                                                         avail })?;
    Ok(window.to_vec())
  }

  fn scaled_count(&mut self, index: i32) -> Result<usize> {
    Ok(self.channel(index)?.samples.len())
  }

  fn scaled_window(&mut self,
                   index: i32,
                   start: usize,
                   count: usize,
                   _array_size: usize)
                   -> Result<ChannelData> {
    let channel = self.channel(index)?;
    let array_size = channel.samples.array_size();
    let avail = channel.samples.len();

    let end = start.checked_add(count)
                   .filter(|&end| end <= avail)
                   .ok_or(DwError::WindowOutOfRange { start,
                                                      count,
                                                      avail })?;

    let timestamps = channel.samples.timestamps()[start..end].to_vec();
    let samples = channel.samples.samples()
                    [start * array_size..end * array_size].to_vec();
    Ok(ChannelData::from_buffers(timestamps, samples, array_size))
  }
}

/// Deterministic reduced records: a slow sine around a per-channel base
/// level, with `rms^2 = ave^2 + 0.04` so the aggregates stay coherent.
fn reduced_table(index: i32,
                 buckets: usize,
                 resolution: f64)
                 -> Vec<ReducedRecord> {
  let base = 10.0 * (index as f64 + 1.0);

  (0..buckets).map(|bucket| {
                let time_stamp = bucket as f64 * resolution;
                let ave = base + (0.25 * bucket as f64 + index as f64).sin();
                ReducedRecord::new(time_stamp,
                                   ave,
                                   ave - 0.75,
                                   ave + 0.75,
                                   (ave * ave + 0.04).sqrt())
              })
              .collect()
}

/// Deterministic scaled samples at full rate; array channels offset each
/// component slightly so blocks are distinguishable.
fn scaled_table(index: i32, ticks: usize, array_size: usize) -> ChannelData {
  let base = 10.0 * (index as f64 + 1.0);
  let (mut timestamps, mut samples) = ChannelData::allocate(ticks,
                                                            array_size);

  for tick in 0..ticks {
    timestamps[tick] = tick as f64 / SAMPLE_RATE;
    for component in 0..array_size {
      samples[tick * array_size + component] = base
                                               + component as f64 * 0.001
                                               + (0.025 * tick as f64
                                                  + index as f64).sin();
    }
  }

  ChannelData::from_buffers(timestamps, samples, array_size)
}
