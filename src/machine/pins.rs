/// Pin positions and the 5-slot pin-state vector
///
/// Index order is fixed: far-left (L2), near-left (L3), center (C5),
/// near-right (R3), far-right (R2). A slot is `true` when the pin is down.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Point value of each pin, in index order.
pub const PIN_VALUES: [u32; 5] = [2, 3, 5, 3, 2];

/// Score of a full rack.
pub const RACK_VALUE: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PinPosition {
    #[serde(rename = "l2")]
    LeftTwo,
    #[serde(rename = "l3")]
    LeftThree,
    #[serde(rename = "c5")]
    CenterFive,
    #[serde(rename = "r3")]
    RightThree,
    #[serde(rename = "r2")]
    RightTwo,
}

impl PinPosition {
    pub const ALL: [PinPosition; 5] = [
        PinPosition::LeftTwo,
        PinPosition::LeftThree,
        PinPosition::CenterFive,
        PinPosition::RightThree,
        PinPosition::RightTwo,
    ];

    pub fn index(self) -> usize {
        match self {
            PinPosition::LeftTwo => 0,
            PinPosition::LeftThree => 1,
            PinPosition::CenterFive => 2,
            PinPosition::RightThree => 3,
            PinPosition::RightTwo => 4,
        }
    }

    pub fn value(self) -> u32 {
        PIN_VALUES[self.index()]
    }

    pub fn label(self) -> &'static str {
        match self {
            PinPosition::LeftTwo => "L2",
            PinPosition::LeftThree => "L3",
            PinPosition::CenterFive => "C5",
            PinPosition::RightThree => "R3",
            PinPosition::RightTwo => "R2",
        }
    }
}

impl fmt::Display for PinPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Standing/down record for the five pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinState([bool; 5]);

impl PinState {
    pub const fn all_standing() -> Self {
        Self([false; 5])
    }

    pub const fn all_down() -> Self {
        Self([true; 5])
    }

    pub const fn from_slots(slots: [bool; 5]) -> Self {
        Self(slots)
    }

    /// Parse a 5-character `0`/`1` pattern such as `"00100"` (1 = down).
    pub fn from_pattern(pattern: &str) -> Option<Self> {
        let bytes = pattern.as_bytes();
        if bytes.len() != 5 {
            return None;
        }
        let mut slots = [false; 5];
        for (slot, byte) in slots.iter_mut().zip(bytes) {
            *slot = match byte {
                b'0' => false,
                b'1' => true,
                _ => return None,
            };
        }
        Some(Self(slots))
    }

    /// The 5-bit pattern string with index 0 first.
    pub fn pattern(&self) -> String {
        self.0.iter().map(|down| if *down { '1' } else { '0' }).collect()
    }

    pub fn slots(&self) -> [bool; 5] {
        self.0
    }

    pub fn is_down(&self, position: PinPosition) -> bool {
        self.0[position.index()]
    }

    pub fn set_down(&mut self, position: PinPosition) {
        self.0[position.index()] = true;
    }

    pub fn down_count(&self) -> usize {
        self.0.iter().filter(|down| **down).count()
    }

    pub fn is_all_down(&self) -> bool {
        self.0.iter().all(|down| *down)
    }

    pub fn is_all_standing(&self) -> bool {
        self.0.iter().all(|down| !*down)
    }

    /// Sum of the values of the pins that are down.
    pub fn value(&self) -> u32 {
        self.down_positions().map(PinPosition::value).sum()
    }

    pub fn down_positions(&self) -> impl Iterator<Item = PinPosition> + '_ {
        PinPosition::ALL.into_iter().filter(move |p| self.is_down(*p))
    }

    pub fn standing_positions(&self) -> impl Iterator<Item = PinPosition> + '_ {
        PinPosition::ALL.into_iter().filter(move |p| !self.is_down(*p))
    }

    /// Pins down in `self` that were standing in `before`.
    pub fn newly_down_since(&self, before: PinState) -> PinState {
        let mut slots = [false; 5];
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = self.0[i] && !before.0[i];
        }
        PinState(slots)
    }

    /// Pins down in either state. Used to keep a throw monotonic.
    pub fn union(&self, other: PinState) -> PinState {
        let mut slots = self.0;
        for (slot, down) in slots.iter_mut().zip(other.0) {
            *slot |= down;
        }
        PinState(slots)
    }
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern())
    }
}
