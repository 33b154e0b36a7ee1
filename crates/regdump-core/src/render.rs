//! Human-readable rendering of decoded registers.

use std::fmt;

use crate::catalog::RegisterFamily;
use crate::query::DecodedRegister;

impl fmt::Display for DecodedRegister {
    /// Header line with address and raw value, then one line per field:
    ///
    /// ```text
    /// GIC.ICFGR2 @ 0x08000c08 = 0x0000000b
    ///   [ 0] intid  32  trigger  = 0b11 edge (reserved bit set)
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} @ {} = {:#010x}",
            self.reference, self.address, self.raw
        )?;
        let label = self.family.kind.label();
        for interrupt in self.interrupts() {
            writeln!(
                f,
                "  [{:>2}] intid {:>3}  {label:<8} = {}",
                interrupt.field.index, interrupt.intid, interrupt.value
            )?;
        }
        Ok(())
    }
}

/// One catalog row: name, offset, field width and fields per register.
#[derive(Debug, Clone, Copy)]
pub struct FamilyRow<'a>(pub &'a RegisterFamily);

impl fmt::Display for FamilyRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let family = self.0;
        write!(
            f,
            "{:<10} {:#05x}  {} bit x {:>2}  {}",
            family.name,
            family.block_offset,
            family.bits_per_field,
            family.fields_per_register(),
            family.kind.label()
        )
    }
}
