//! Optional hex index: the `--` / `00`..`FE` cells of every tracker table.
//!
//! Internally a [`Slot`] is an `Option<u8>`. On disk it is an integer where
//! `-1` means empty, so saved compositions stay compatible with the classic
//! sentinel layout. Anything outside `-1..=254` loads as empty.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Highest value a slot may hold (`FE`).
pub const SLOT_MAX: u8 = 0xFE;

/// An optional hex value in `0x00..=0xFE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Slot(Option<u8>);

impl Slot {
    /// The empty (`--`) slot.
    pub const EMPTY: Slot = Slot(None);

    /// Create a set slot. Values above `FE` yield an empty slot.
    pub fn new(value: u8) -> Self {
        if value > SLOT_MAX {
            Self::EMPTY
        } else {
            Slot(Some(value))
        }
    }

    /// Build a slot from a raw integer, mapping the sentinel and out-of-range
    /// values to empty.
    pub fn from_raw(raw: i64) -> Self {
        if (0..=SLOT_MAX as i64).contains(&raw) {
            Slot(Some(raw as u8))
        } else {
            Self::EMPTY
        }
    }

    /// Raw integer form with `-1` for empty.
    pub fn to_raw(self) -> i32 {
        self.0.map_or(-1, i32::from)
    }

    pub fn is_set(self) -> bool {
        self.0.is_some()
    }

    pub fn get(self) -> Option<u8> {
        self.0
    }

    /// Value as a table index.
    pub fn index(self) -> Option<usize> {
        self.0.map(usize::from)
    }

    /// Value, or the column's virtual default when unset.
    pub fn or_default(self, default: u8) -> u8 {
        self.0.unwrap_or(default)
    }
}

impl From<Option<u8>> for Slot {
    fn from(value: Option<u8>) -> Self {
        value.map_or(Slot::EMPTY, Slot::new)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:02X}"),
            None => write!(f, "--"),
        }
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.to_raw())
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok(Slot::from_raw(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_unset() {
        assert!(!Slot::EMPTY.is_set());
        assert_eq!(Slot::EMPTY.get(), None);
        assert_eq!(Slot::default(), Slot::EMPTY);
    }

    #[test]
    fn ff_is_not_a_valid_value() {
        assert_eq!(Slot::new(0xFF), Slot::EMPTY);
        assert_eq!(Slot::new(0xFE).get(), Some(0xFE));
    }

    #[test]
    fn sentinel_and_out_of_range_load_as_empty() {
        assert_eq!(Slot::from_raw(-1), Slot::EMPTY);
        assert_eq!(Slot::from_raw(-7), Slot::EMPTY);
        assert_eq!(Slot::from_raw(255), Slot::EMPTY);
        assert_eq!(Slot::from_raw(0).get(), Some(0));
    }

    #[test]
    fn raw_form_uses_minus_one() {
        assert_eq!(Slot::EMPTY.to_raw(), -1);
        assert_eq!(Slot::new(0x10).to_raw(), 16);
    }

    #[test]
    fn virtual_default() {
        assert_eq!(Slot::EMPTY.or_default(0x80), 0x80);
        assert_eq!(Slot::new(3).or_default(0x80), 3);
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(Slot::new(0x2A).to_string(), "2A");
        assert_eq!(Slot::EMPTY.to_string(), "--");
    }

    #[test]
    fn yaml_uses_sentinel() {
        let yaml = serde_yaml::to_string(&vec![Slot::new(5), Slot::EMPTY]).unwrap();
        let parsed: Vec<Slot> = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, vec![Slot::new(5), Slot::EMPTY]);
        assert!(yaml.contains("-1"));
    }
}
