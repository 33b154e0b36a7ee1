//! Register reference to target address resolution.

use std::fmt;

use thiserror::Error;

use crate::catalog::RegisterCatalog;
use crate::reference::RegisterReference;

/// Byte stride between consecutive instances of a register family.
pub const REGISTER_WIDTH_BYTES: u64 = 4;

/// Distributor base of the QEMU `virt` machine's GIC.
pub const QEMU_VIRT_GICD_BASE: u64 = 0x0800_0000;

/// Where the distributor lives in the target and how many lines it implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ControllerLayout {
    /// Address of the distributor register block.
    pub distributor_base: u64,
    /// Number of implemented interrupt lines, when known.
    ///
    /// When `None` no upper bound is applied to instance indices.
    pub interrupt_lines: Option<u32>,
}

impl Default for ControllerLayout {
    fn default() -> Self {
        Self {
            distributor_base: QEMU_VIRT_GICD_BASE,
            interrupt_lines: None,
        }
    }
}

impl ControllerLayout {
    /// Layout for a distributor at `distributor_base` with no line limit.
    #[must_use]
    pub const fn at(distributor_base: u64) -> Self {
        Self {
            distributor_base,
            interrupt_lines: None,
        }
    }

    /// Returns the layout with the implemented line count set.
    #[must_use]
    pub const fn with_interrupt_lines(mut self, lines: u32) -> Self {
        self.interrupt_lines = Some(lines);
        self
    }
}

/// A concrete byte address in the inspected target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ResolvedAddress(pub u64);

impl ResolvedAddress {
    /// Raw address value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Failure to map a register reference onto a target address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The reference names a family missing from the catalog.
    #[error("register family `{0}` is not supported by the catalog")]
    UnsupportedFamily(String),
    /// The instance covers no implemented interrupt line.
    #[error(
        "{reference} is out of range: first interrupt {first_interrupt} but only {interrupt_lines} lines are implemented"
    )]
    IndexOutOfRange {
        /// The offending reference.
        reference: RegisterReference,
        /// Interrupt ID held by field 0 of the instance.
        first_interrupt: u64,
        /// Implemented line count from the controller layout.
        interrupt_lines: u32,
    },
    /// The computed address does not fit in 64 bits.
    #[error("address of {0} overflows the target address space")]
    AddressOverflow(RegisterReference),
}

/// Computes `base + family offset + index * 4` for `reference`.
///
/// The family is looked up again here so a reference built without the
/// parser is still checked against `catalog`.
///
/// # Errors
///
/// Returns [`ResolveError::UnsupportedFamily`] for an uncatalogued family,
/// [`ResolveError::IndexOutOfRange`] when `layout` limits the line count and
/// the instance lies beyond it, and [`ResolveError::AddressOverflow`] when the
/// sum exceeds `u64`.
pub fn resolve(
    layout: &ControllerLayout,
    reference: &RegisterReference,
    catalog: &RegisterCatalog,
) -> Result<ResolvedAddress, ResolveError> {
    let family = catalog
        .get(&reference.family)
        .ok_or_else(|| ResolveError::UnsupportedFamily(reference.family.clone()))?;

    if let Some(interrupt_lines) = layout.interrupt_lines {
        let first_interrupt =
            u64::from(reference.index) * u64::from(family.fields_per_register());
        if first_interrupt >= u64::from(interrupt_lines) {
            return Err(ResolveError::IndexOutOfRange {
                reference: reference.clone(),
                first_interrupt,
                interrupt_lines,
            });
        }
    }

    layout
        .distributor_base
        .checked_add(u64::from(family.block_offset))
        .and_then(|bank| bank.checked_add(u64::from(reference.index) * REGISTER_WIDTH_BYTES))
        .map(ResolvedAddress)
        .ok_or_else(|| ResolveError::AddressOverflow(reference.clone()))
}
