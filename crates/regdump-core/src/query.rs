//! End-to-end register query: parse, resolve, read, decode.

use thiserror::Error;

use crate::catalog::{RegisterCatalog, RegisterFamily};
use crate::decode::{decode, DecodedField, FieldValue};
use crate::reference::{parse_reference, ParseError, RegisterReference};
use crate::resolve::{resolve, ControllerLayout, ResolveError, ResolvedAddress};
use crate::target::{TargetMemory, TargetUnreachable};

/// Any failure of a register query. Exactly one stage fails per query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The query text could not be parsed against the catalog.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The reference could not be mapped to an address.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// The target refused the read.
    #[error(transparent)]
    Target(#[from] TargetUnreachable),
}

impl QueryError {
    /// Returns `true` when the operator can fix the failure by retyping the
    /// query or adjusting the controller layout.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Parse(_) | Self::Resolve(ResolveError::IndexOutOfRange { .. })
        )
    }
}

/// One field of a read register together with the interrupt it controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InterruptField {
    /// Interrupt ID controlled by the field.
    pub intid: u64,
    /// The raw field.
    pub field: DecodedField,
    /// The field's meaning for the register's family.
    pub value: FieldValue,
}

/// A fully decoded register read.
///
/// Serializes with an extra `interrupts` array holding every
/// [`InterruptField`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRegister {
    /// The register that was read.
    pub reference: RegisterReference,
    /// Layout of the register's family.
    pub family: RegisterFamily,
    /// Address the value was read from.
    pub address: ResolvedAddress,
    /// Value as read from the target.
    pub raw: u32,
    /// Every field of the register in ascending bit order.
    pub fields: Vec<DecodedField>,
}

impl DecodedRegister {
    /// Decodes `raw` as read from `address` for `reference`.
    #[must_use]
    pub fn new(
        reference: RegisterReference,
        family: RegisterFamily,
        address: ResolvedAddress,
        raw: u32,
    ) -> Self {
        let fields = decode(raw, &family);
        Self {
            reference,
            family,
            address,
            raw,
            fields,
        }
    }

    /// Fields paired with the interrupt ID they control and their meaning.
    pub fn interrupts(&self) -> impl Iterator<Item = InterruptField> + '_ {
        self.fields.iter().map(|field| InterruptField {
            intid: field.interrupt_id(self.reference.index, &self.family),
            field: *field,
            value: field.interpret(self.family.kind),
        })
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for DecodedRegister {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let interrupts: Vec<InterruptField> = self.interrupts().collect();
        let mut state = serializer.serialize_struct("DecodedRegister", 6)?;
        state.serialize_field("reference", &self.reference)?;
        state.serialize_field("family", &self.family)?;
        state.serialize_field("address", &self.address)?;
        state.serialize_field("raw", &self.raw)?;
        state.serialize_field("fields", &self.fields)?;
        state.serialize_field("interrupts", &interrupts)?;
        state.end()
    }
}

/// Runs register queries against one target.
///
/// Holds no state between queries beyond its borrowed catalog, the layout and
/// the memory source; every query reads the target afresh.
#[derive(Debug)]
pub struct Inspector<'c, M> {
    catalog: &'c RegisterCatalog,
    layout: ControllerLayout,
    memory: M,
}

impl<'c, M: TargetMemory> Inspector<'c, M> {
    /// Creates an inspector reading registers through `memory`.
    pub const fn new(catalog: &'c RegisterCatalog, layout: ControllerLayout, memory: M) -> Self {
        Self {
            catalog,
            layout,
            memory,
        }
    }

    /// Controller layout used for address resolution.
    #[must_use]
    pub const fn layout(&self) -> &ControllerLayout {
        &self.layout
    }

    /// Releases the memory source.
    pub fn into_memory(self) -> M {
        self.memory
    }

    /// Parses `text`, then reads and decodes the register it names.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's error; no partial result is
    /// produced.
    pub fn query(&mut self, text: &str) -> Result<DecodedRegister, QueryError> {
        let reference = parse_reference(text, self.catalog)?;
        log::debug!("parsed `{}` as {reference}", text.trim());
        self.read(reference)
    }

    /// Reads and decodes an already parsed reference.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Resolve`] when the reference cannot be mapped and
    /// [`QueryError::Target`] when the read fails.
    pub fn read(&mut self, reference: RegisterReference) -> Result<DecodedRegister, QueryError> {
        let address = resolve(&self.layout, &reference, self.catalog)?;
        let family = *self
            .catalog
            .get(&reference.family)
            .ok_or_else(|| ResolveError::UnsupportedFamily(reference.family.clone()))?;
        log::debug!("{reference} resolves to {address}");

        let raw = self.memory.read_word(address).map_err(|error| {
            log::warn!("read of {reference} at {address} failed: {error}");
            error
        })?;
        log::debug!("{reference} = {raw:#010x}");

        Ok(DecodedRegister::new(reference, family, address, raw))
    }
}

/// One-shot query without constructing an [`Inspector`].
///
/// # Errors
///
/// See [`Inspector::query`].
pub fn inspect(
    text: &str,
    catalog: &RegisterCatalog,
    layout: ControllerLayout,
    memory: impl TargetMemory,
) -> Result<DecodedRegister, QueryError> {
    Inspector::new(catalog, layout, memory).query(text)
}

#[cfg(test)]
mod tests {
    use super::{inspect, Inspector, QueryError};
    use crate::catalog::RegisterCatalog;
    use crate::decode::FieldValue;
    use crate::reference::{ParseError, RegisterReference};
    use crate::resolve::{ControllerLayout, ResolveError, ResolvedAddress};
    use crate::target::{ImageMemory, TargetMemory, TargetUnreachable};

    const BASE: u64 = 0x0800_0000;

    fn distributor_image() -> ImageMemory {
        let mut image = ImageMemory::zeroed(BASE, 0x1000);
        image.write_word(BASE + 0x104, 0x0000_0005).expect("ISENABLER1");
        image.write_word(BASE + 0xC00, 0b1011).expect("ICFGR0");
        image
    }

    #[test]
    fn query_reads_and_decodes_register() {
        let catalog = RegisterCatalog::gic_distributor();
        let mut inspector = Inspector::new(&catalog, ControllerLayout::at(BASE), distributor_image());

        let register = inspector.query("GIC.ISENABLER1").expect("query succeeds");
        assert_eq!(register.reference, RegisterReference::new("ISENABLER", 1));
        assert_eq!(register.address, ResolvedAddress(BASE + 0x104));
        assert_eq!(register.raw, 5);
        assert_eq!(register.fields.len(), 32);

        let enabled: Vec<u64> = register
            .interrupts()
            .filter(|interrupt| interrupt.value == FieldValue::Flag(true))
            .map(|interrupt| interrupt.intid)
            .collect();
        assert_eq!(enabled, vec![32, 34]);
    }

    #[test]
    fn parse_failures_skip_the_read() {
        struct PanickingMemory;
        impl TargetMemory for PanickingMemory {
            fn read_bytes(&mut self, _: u64, _: &mut [u8]) -> Result<(), TargetUnreachable> {
                panic!("no read expected");
            }
        }

        let catalog = RegisterCatalog::gic_distributor();
        let result = inspect("GIC.FOO1", &catalog, ControllerLayout::default(), PanickingMemory);
        assert!(matches!(
            result,
            Err(QueryError::Parse(ParseError::UnknownFamily { .. }))
        ));
    }

    #[test]
    fn unmapped_register_surfaces_target_error() {
        let catalog = RegisterCatalog::gic_distributor();
        let result = inspect(
            "GIC.ICFGR1024",
            &catalog,
            ControllerLayout::at(BASE),
            distributor_image(),
        );
        assert_eq!(
            result,
            Err(QueryError::Target(TargetUnreachable::Unmapped {
                address: BASE + 0xC00 + 4096,
                len: 4
            }))
        );
    }

    #[test]
    fn unvalidated_reference_is_rejected_by_resolver() {
        let catalog = RegisterCatalog::gic_distributor();
        let mut inspector = Inspector::new(&catalog, ControllerLayout::at(BASE), distributor_image());
        let result = inspector.read(RegisterReference::new("ISPENDRX", 0));
        assert_eq!(
            result,
            Err(QueryError::Resolve(ResolveError::UnsupportedFamily(
                "ISPENDRX".into()
            )))
        );
        assert!(!result.expect_err("unsupported").is_user_error());
    }

    #[test]
    fn user_errors_are_classified() {
        let catalog = RegisterCatalog::gic_distributor();
        let layout = ControllerLayout::at(BASE).with_interrupt_lines(64);
        let mut inspector = Inspector::new(&catalog, layout, distributor_image());

        let bad_syntax = inspector.query("GIC.").expect_err("bad syntax");
        assert!(bad_syntax.is_user_error());

        let out_of_range = inspector.query("GIC.ISENABLER2").expect_err("beyond 64 lines");
        assert!(out_of_range.is_user_error());

        let detached = QueryError::from(TargetUnreachable::Detached("gone".into()));
        assert!(!detached.is_user_error());
    }

    #[test]
    fn error_messages_pass_through_stage_errors() {
        let error = QueryError::from(TargetUnreachable::Detached("no session".into()));
        assert_eq!(error.to_string(), "target not attached: no session");
    }

    #[test]
    fn memory_is_returned_intact() {
        let catalog = RegisterCatalog::gic_distributor();
        let inspector = Inspector::new(&catalog, ControllerLayout::at(BASE), distributor_image());
        assert_eq!(inspector.layout().distributor_base, BASE);
        assert_eq!(inspector.into_memory(), distributor_image());
    }
}
