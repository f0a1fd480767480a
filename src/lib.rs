// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

mod bindings;
mod catalog;
mod channel;
mod decoder;
mod error;
mod native;
mod reduced;
mod service;
mod session;
pub mod sim;

pub use channel::{Channel, ChannelData, ChannelId};
pub use decoder::Decoder;
pub use error::{DwError, Result};
pub use native::NativeDecoder;
pub use reduced::{ReducedCount, ReducedRecord, Reduction};
pub use session::{FileInfo, Session};
