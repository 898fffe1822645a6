//! Board-addressable frame memory.
//!
//! Every board exposes two kinds of frame regions behind its PCIe window:
//!
//! ```text
//! ┌──────────────────────────┐
//! │  Slot A                  │  one panel frame   ┐ write_image double buffer:
//! ├──────────────────────────┤                    │ stage into the shadow slot,
//! │  Slot B                  │  one panel frame   ┘ then latch it
//! ├──────────────────────────┤
//! │  Sequence bank A [0..N)  │  N = sequence_capacity ┐ load_sequence writes the
//! ├──────────────────────────┤                        │ inactive bank, then flips
//! │  Sequence bank B [0..N)  │                        ┘
//! └──────────────────────────┘
//! ```
//!
//! The display plane scans out whichever region was last latched through
//! [`DisplayPort::latch`](crate::transport::DisplayPort::latch). A latch is a
//! single register write, so the sequencer can issue one per tick without
//! touching frame data.

use std::fmt;

/// Default per-bank sequence capacity, in frames.
///
/// 1024 frames of 512 × 512 × 16 bit is 512 MiB per bank, half of the
/// on-board DRAM.
pub const DEFAULT_SEQUENCE_CAPACITY: usize = 1024;

/// One half of a double-buffered memory area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Bank {
    /// First half.
    #[default]
    A,
    /// Second half.
    B,
}

impl Bank {
    /// The other bank.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    const fn bit(self) -> u64 {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// Address of one full-panel frame in board memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameRegion {
    /// On-the-fly display slot used by single-frame writes.
    Slot(Bank),
    /// Frame `index` of a sequence bank.
    Sequence {
        /// Which sequence bank.
        bank: Bank,
        /// Zero-based frame index within the bank.
        index: u32,
    },
}

// Raw register encoding:
//   bit 63      : valid (0 = nothing latched)
//   bit 33      : kind  (0 = slot, 1 = sequence)
//   bit 32      : bank
//   bits 0..32  : frame index (sequence only)
const VALID_BIT: u64 = 1 << 63;
const SEQUENCE_BIT: u64 = 1 << 33;
const BANK_SHIFT: u32 = 32;
const INDEX_MASK: u64 = 0xFFFF_FFFF;

impl FrameRegion {
    /// Frame `index` of sequence `bank`.
    #[must_use]
    pub const fn sequence(bank: Bank, index: u32) -> Self {
        Self::Sequence { bank, index }
    }

    /// Encode as the 64-bit value written to the display pointer register.
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        match self {
            Self::Slot(bank) => VALID_BIT | (bank.bit() << BANK_SHIFT),
            Self::Sequence { bank, index } => {
                VALID_BIT | SEQUENCE_BIT | (bank.bit() << BANK_SHIFT) | index as u64
            }
        }
    }

    /// Decode a display pointer register value. Returns `None` for the
    /// reset value (nothing latched yet).
    #[must_use]
    pub const fn from_raw(raw: u64) -> Option<Self> {
        if raw & VALID_BIT == 0 {
            return None;
        }
        let bank = if (raw >> BANK_SHIFT) & 1 == 1 {
            Bank::B
        } else {
            Bank::A
        };
        if raw & SEQUENCE_BIT == 0 {
            Some(Self::Slot(bank))
        } else {
            // Masked to 32 bits above.
            #[allow(clippy::cast_possible_truncation)]
            let index = (raw & INDEX_MASK) as u32;
            Some(Self::Sequence { bank, index })
        }
    }
}

impl fmt::Display for FrameRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slot(bank) => write!(f, "slot {}", bank_name(*bank)),
            Self::Sequence { bank, index } => {
                write!(f, "sequence bank {} frame {index}", bank_name(*bank))
            }
        }
    }
}

const fn bank_name(bank: Bank) -> &'static str {
    match bank {
        Bank::A => "A",
        Bank::B => "B",
    }
}
