// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{channel::{Channel, ChannelId},
            error::{DwError, Result}};


/// Channel table of one open recording, fetched once at open time.
///
/// The table is the stable source for presence checks and for mapping a
/// channel identity to its vendor index. List order is the file's table
/// order; the vendor index is a key, not a position.
#[derive(Clone, Debug)]
pub struct Catalog {
  channels: Vec<Channel>,
}

impl Catalog {
  pub fn new(channels: Vec<Channel>) -> Self {
    Self { channels }
  }

  pub fn len(&self) -> usize {
    self.channels.len()
  }

  pub fn channels(&self) -> &[Channel] {
    &self.channels
  }

  /// Resolves a channel identity to its table entry. Index lookups compare
  /// against the stored key; name lookups match exactly, first match wins.
  pub fn resolve(&self, id: ChannelId<'_>) -> Result<&Channel> {
    let channel = match id {
      ChannelId::Index(index) => {
        self.channels.iter().find(|channel| channel.index() == index)
      }
      ChannelId::Name(name) => {
        self.channels.iter().find(|channel| channel.name() == name)
      }
    };

    channel.ok_or_else(|| DwError::UnknownChannel(id.to_string()))
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;


  fn channel(index: i32, name: &str, unit: &str) -> Channel {
    Channel::new(index,
                 name.to_string(),
                 unit.to_string(),
                 String::new(),
                 0,
                 1,
                 5)
  }

  // vendor indices are not contiguous on purpose
  fn catalog() -> Catalog {
    Catalog::new(vec![channel(3, "Acc_X", "g"),
                      channel(7, "Acc_Y", "g"),
                      channel(12, "Vehicle_Speed", "km/h")])
  }

  #[test]
  fn resolve_by_index_test() {
    let catalog = catalog();
    assert_eq!("Acc_X", catalog.resolve(ChannelId::Index(3)).unwrap().name());
    assert_eq!("Vehicle_Speed",
               catalog.resolve(ChannelId::Index(12)).unwrap().name());

    // 1 is a valid list position here but no channel's key
    assert!(matches!(catalog.resolve(ChannelId::Index(1)),
                     Err(DwError::UnknownChannel(_))));
  }

  #[test]
  fn resolve_by_name_test() {
    let catalog = catalog();
    assert_eq!(7, catalog.resolve(ChannelId::Name("Acc_Y")).unwrap().index());

    assert!(matches!(catalog.resolve(ChannelId::Name("Acc_Z")),
                     Err(DwError::UnknownChannel(_))));
    // matching is exact, not case insensitive
    assert!(matches!(catalog.resolve(ChannelId::Name("acc_y")),
                     Err(DwError::UnknownChannel(_))));
  }

  #[test]
  fn resolve_duplicate_name_test() {
    let catalog = Catalog::new(vec![channel(1, "Temp", "C"),
                                    channel(2, "Temp", "C")]);
    assert_eq!(1, catalog.resolve(ChannelId::Name("Temp")).unwrap().index());
  }

  #[test]
  fn error_names_identity_test() {
    let catalog = catalog();

    match catalog.resolve(ChannelId::Index(99)) {
      Err(DwError::UnknownChannel(identity)) => {
        assert_eq!("index 99", identity)
      }
      other => panic!("unexpected result: {:?}", other),
    }

    match catalog.resolve(ChannelId::Name("Lambda")) {
      Err(DwError::UnknownChannel(identity)) => {
        assert_eq!("name \"Lambda\"", identity)
      }
      other => panic!("unexpected result: {:?}", other),
    }
  }

  #[test]
  fn list_accessors_test() {
    let catalog = catalog();
    assert_eq!(3, catalog.len());
    assert_eq!("Acc_X", catalog.channels()[0].name());

    let empty = Catalog::new(Vec::new());
    assert_eq!(0, empty.len());
  }
}
