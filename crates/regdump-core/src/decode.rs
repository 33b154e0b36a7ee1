//! Bitfield decoding of raw distributor register values.
//!
//! A register is split into `fields_per_register` equal-width fields, least
//! significant first. Decoding is lossless: [`encode`] rebuilds the raw value
//! from the decoded fields.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::catalog::{FieldKind, RegisterFamily};

/// One bitfield extracted from a raw register value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecodedField {
    /// Position of the field within the register, counting from bit 0.
    pub index: u8,
    /// Lowest bit occupied by the field.
    pub bit_position: u8,
    /// Number of bits in the field.
    pub width: u8,
    /// Field contents shifted down to bit 0.
    pub value: u32,
}

impl DecodedField {
    /// Interprets the raw field contents according to `kind`.
    #[must_use]
    pub const fn interpret(&self, kind: FieldKind) -> FieldValue {
        match kind {
            FieldKind::Enabled | FieldKind::Pending | FieldKind::Active | FieldKind::Group => {
                FieldValue::Flag(self.value & 1 != 0)
            }
            FieldKind::Trigger => FieldValue::Trigger(TriggerConfig::from_bits(self.value)),
            #[allow(clippy::cast_possible_truncation)]
            FieldKind::Priority => FieldValue::Priority((self.value & 0xFF) as u8),
            #[allow(clippy::cast_possible_truncation)]
            FieldKind::Targets => FieldValue::Targets(CpuTargets((self.value & 0xFF) as u8)),
        }
    }

    /// Interrupt ID this field controls in register instance `index`.
    #[must_use]
    pub fn interrupt_id(&self, index: u32, family: &RegisterFamily) -> u64 {
        u64::from(index) * u64::from(family.fields_per_register()) + u64::from(self.index)
    }
}

/// Edge/level trigger configuration code from a two-bit configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriggerConfig {
    /// Bit 1: edge-triggered when set, level-sensitive when clear.
    pub edge_triggered: bool,
    /// Bit 0: reserved or implementation defined, reported as read.
    pub reserved: bool,
}

impl TriggerConfig {
    /// Splits a two-bit configuration code.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            edge_triggered: bits & 0b10 != 0,
            reserved: bits & 0b01 != 0,
        }
    }

    /// Reassembles the two-bit configuration code.
    #[must_use]
    pub const fn bits(self) -> u32 {
        ((self.edge_triggered as u32) << 1) | self.reserved as u32
    }
}

impl fmt::Display for TriggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.edge_triggered {
            "edge"
        } else {
            "level"
        };
        write!(f, "{mode}")?;
        if self.reserved {
            write!(f, " (reserved bit set)")?;
        }
        Ok(())
    }
}

/// CPU interfaces an interrupt is forwarded to, one bit per interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CpuTargets(pub u8);

impl CpuTargets {
    /// Returns `true` when CPU interface `cpu` is targeted.
    #[must_use]
    pub const fn contains(self, cpu: u8) -> bool {
        cpu < 8 && self.0 & (1 << cpu) != 0
    }

    /// Targeted CPU interfaces in ascending order.
    pub fn cpus(self) -> impl Iterator<Item = u8> {
        (0..8).filter(move |cpu| self.contains(*cpu))
    }
}

impl fmt::Display for CpuTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "none");
        }
        for (position, cpu) in self.cpus().enumerate() {
            if position > 0 {
                write!(f, ",")?;
            }
            write!(f, "cpu{cpu}")?;
        }
        Ok(())
    }
}

/// Semantic value of a decoded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FieldValue {
    /// Single-bit state: enabled, pending, active or group 1.
    Flag(bool),
    /// Two-bit trigger configuration.
    Trigger(TriggerConfig),
    /// Eight-bit priority, lower is more urgent.
    Priority(u8),
    /// Eight-bit CPU target mask.
    Targets(CpuTargets),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(set) => write!(f, "{}", u8::from(*set)),
            Self::Trigger(config) => write!(f, "{:#04b} {config}", config.bits()),
            Self::Priority(priority) => write!(f, "{priority:#04x}"),
            Self::Targets(targets) => write!(f, "{:#010b} {targets}", targets.0),
        }
    }
}

/// Splits `raw` into the fields of `family`, lowest bit position first.
///
/// Always yields exactly `family.fields_per_register()` fields.
#[must_use]
pub fn decode(raw: u32, family: &RegisterFamily) -> Vec<DecodedField> {
    let width = family.bits_per_field;
    let mask = family.field_mask();

    (0..family.fields_per_register())
        .map(|index| {
            let bit_position = index * width;
            DecodedField {
                index,
                bit_position,
                width,
                value: (raw >> bit_position) & mask,
            }
        })
        .collect()
}

/// Reassembles a raw register value from decoded fields.
///
/// Field contents wider than the family's field width are truncated to it.
#[must_use]
pub fn encode(fields: &[DecodedField], family: &RegisterFamily) -> u32 {
    let mask = family.field_mask();
    fields.iter().fold(0, |raw, field| {
        raw | (field.value & mask)
            .checked_shl(u32::from(field.bit_position))
            .unwrap_or(0)
    })
}
