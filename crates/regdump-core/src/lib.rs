//! GIC distributor register inspection core.
//!
//! Turns operator queries like `GIC.ISENABLER3` into target addresses, reads
//! the register through a [`TargetMemory`] and decodes it into per-interrupt
//! bitfields.

/// Register family table and catalog lookup.
pub mod catalog;
pub use catalog::{
    CatalogError, FieldKind, RegisterCatalog, RegisterFamily, GIC_DISTRIBUTOR_FAMILIES,
    REGISTER_BITS,
};

/// Operator query parsing.
pub mod reference;
pub use reference::{
    parse_reference, FormatIssue, ParseError, RegisterReference, REFERENCE_PREFIX,
};

/// Address resolution against a controller layout.
pub mod resolve;
pub use resolve::{
    resolve, ControllerLayout, ResolveError, ResolvedAddress, QEMU_VIRT_GICD_BASE,
    REGISTER_WIDTH_BYTES,
};

/// Target memory contract and memory sources.
pub mod target;
pub use target::{FileMemory, ImageMemory, TargetMemory, TargetUnreachable};

/// Lossless bitfield decoding.
pub mod decode;
pub use decode::{decode, encode, CpuTargets, DecodedField, FieldValue, TriggerConfig};

/// Query pipeline.
pub mod query;
pub use query::{inspect, DecodedRegister, Inspector, InterruptField, QueryError};

/// Text rendering of decoded registers and catalog rows.
pub mod render;
pub use render::FamilyRow;

#[cfg(test)]
use proptest as _;
