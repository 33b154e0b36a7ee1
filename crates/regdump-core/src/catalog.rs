//! Register family catalog for the GIC distributor block.
//!
//! Each family describes a bank of consecutive 32-bit registers, one bitfield
//! per interrupt line, starting at a fixed offset from the distributor base.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width in bits of every distributor register handled by the catalog.
pub const REGISTER_BITS: u8 = 32;

/// Semantic meaning of each bitfield within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FieldKind {
    /// Interrupt forwarding enabled (set/clear-enable banks).
    Enabled,
    /// Interrupt pending (set/clear-pending banks).
    Pending,
    /// Interrupt active (set/clear-active banks).
    Active,
    /// Interrupt assigned to group 1.
    Group,
    /// Two-bit trigger configuration code.
    Trigger,
    /// Eight-bit priority value.
    Priority,
    /// Eight-bit mask of CPU interfaces the interrupt is forwarded to.
    Targets,
}

impl FieldKind {
    /// Short label used when presenting a field value.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Group => "group1",
            Self::Trigger => "trigger",
            Self::Priority => "priority",
            Self::Targets => "targets",
        }
    }
}

/// A named bank of distributor registers with a uniform bit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct RegisterFamily {
    /// Symbolic name as typed by the operator, e.g. `ISENABLER`.
    pub name: &'static str,
    /// Byte offset of instance 0 from the distributor base.
    pub block_offset: u32,
    /// Bits occupied by each interrupt line's field.
    pub bits_per_field: u8,
    /// Meaning of each field.
    pub kind: FieldKind,
}

impl RegisterFamily {
    /// Number of fields packed into one 32-bit register.
    ///
    /// Zero for a family with zero-width fields, which no catalog accepts.
    #[must_use]
    pub const fn fields_per_register(&self) -> u8 {
        match REGISTER_BITS.checked_div(self.bits_per_field) {
            Some(fields) => fields,
            None => 0,
        }
    }

    /// Mask selecting a single field once shifted down to bit 0.
    #[must_use]
    pub const fn field_mask(&self) -> u32 {
        if self.bits_per_field >= REGISTER_BITS {
            u32::MAX
        } else {
            (1 << self.bits_per_field) - 1
        }
    }

    /// Checks that the family can be decoded losslessly and addressed.
    ///
    /// # Errors
    ///
    /// Returns the first layout problem found: an empty name, a field width
    /// that does not tile a 32-bit register, or a bank that is not word
    /// aligned.
    pub const fn validate(&self) -> Result<(), CatalogError> {
        if self.name.is_empty() {
            return Err(CatalogError::EmptyName);
        }
        if self.bits_per_field == 0 || REGISTER_BITS % self.bits_per_field != 0 {
            return Err(CatalogError::FieldWidth {
                name: self.name,
                bits_per_field: self.bits_per_field,
            });
        }
        if self.block_offset % 4 != 0 {
            return Err(CatalogError::UnalignedOffset {
                name: self.name,
                block_offset: self.block_offset,
            });
        }
        Ok(())
    }
}

/// A register family rejected by [`RegisterCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The family has no name to query it by.
    #[error("register family name must not be empty")]
    EmptyName,
    /// Fields of this width do not tile a 32-bit register exactly.
    #[error("family `{name}` uses {bits_per_field}-bit fields, which do not tile a 32-bit register")]
    FieldWidth {
        /// Offending family.
        name: &'static str,
        /// Declared field width.
        bits_per_field: u8,
    },
    /// The register bank does not start on a word boundary.
    #[error("family `{name}` starts at unaligned offset {block_offset:#x}")]
    UnalignedOffset {
        /// Offending family.
        name: &'static str,
        /// Declared bank offset.
        block_offset: u32,
    },
    /// A family with the same name is already catalogued.
    #[error("family `{0}` is already catalogued")]
    DuplicateName(&'static str),
}

/// Distributor register families known to the tool, in ascending offset order.
pub const GIC_DISTRIBUTOR_FAMILIES: &[RegisterFamily] = &[
    RegisterFamily {
        name: "IGROUPR",
        block_offset: 0x080,
        bits_per_field: 1,
        kind: FieldKind::Group,
    },
    RegisterFamily {
        name: "ISENABLER",
        block_offset: 0x100,
        bits_per_field: 1,
        kind: FieldKind::Enabled,
    },
    RegisterFamily {
        name: "ICENABLER",
        block_offset: 0x180,
        bits_per_field: 1,
        kind: FieldKind::Enabled,
    },
    RegisterFamily {
        name: "ISPENDR",
        block_offset: 0x200,
        bits_per_field: 1,
        kind: FieldKind::Pending,
    },
    RegisterFamily {
        name: "ICPENDR",
        block_offset: 0x280,
        bits_per_field: 1,
        kind: FieldKind::Pending,
    },
    RegisterFamily {
        name: "ISACTIVER",
        block_offset: 0x300,
        bits_per_field: 1,
        kind: FieldKind::Active,
    },
    RegisterFamily {
        name: "ICACTIVER",
        block_offset: 0x380,
        bits_per_field: 1,
        kind: FieldKind::Active,
    },
    RegisterFamily {
        name: "IPRIORITYR",
        block_offset: 0x400,
        bits_per_field: 8,
        kind: FieldKind::Priority,
    },
    RegisterFamily {
        name: "ITARGETSR",
        block_offset: 0x800,
        bits_per_field: 8,
        kind: FieldKind::Targets,
    },
    RegisterFamily {
        name: "ICFGR",
        block_offset: 0xC00,
        bits_per_field: 2,
        kind: FieldKind::Trigger,
    },
];

const _: () = assert_family_table(GIC_DISTRIBUTOR_FAMILIES);

const fn assert_family_table(families: &[RegisterFamily]) {
    let mut index = 0;
    while index < families.len() {
        let family = families[index];
        assert!(
            family.validate().is_ok(),
            "families need a name, word alignment and fields that tile the register"
        );

        if index > 0 {
            assert!(
                families[index - 1].block_offset < family.block_offset,
                "families must be listed in ascending offset order"
            );
        }

        index += 1;
    }
}

/// Read-only lookup table of register families.
///
/// Built once at startup and shared by reference between the parser and
/// the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterCatalog {
    families: Vec<RegisterFamily>,
}

impl Default for RegisterCatalog {
    fn default() -> Self {
        Self::gic_distributor()
    }
}

impl RegisterCatalog {
    /// Catalog of the standard GIC distributor families.
    #[must_use]
    pub fn gic_distributor() -> Self {
        Self {
            families: GIC_DISTRIBUTOR_FAMILIES.to_vec(),
        }
    }

    /// Catalog containing exactly `families`.
    ///
    /// # Errors
    ///
    /// Fails on the first family [`Self::try_with_family`] would reject.
    pub fn from_families(
        families: impl IntoIterator<Item = RegisterFamily>,
    ) -> Result<Self, CatalogError> {
        families
            .into_iter()
            .try_fold(Self { families: Vec::new() }, Self::try_with_family)
    }

    /// Adds `family` after checking its layout.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateName`] when the name is taken, or the
    /// error from [`RegisterFamily::validate`].
    pub fn try_with_family(mut self, family: RegisterFamily) -> Result<Self, CatalogError> {
        family.validate()?;
        if self.contains(family.name) {
            return Err(CatalogError::DuplicateName(family.name));
        }
        log::debug!("catalogued custom family {}", family.name);
        self.families.push(family);
        Ok(self)
    }

    /// Looks up a family by its exact symbolic name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisterFamily> {
        self.families.iter().find(|family| family.name == name)
    }

    /// Returns `true` when `name` is a known family.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates families in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisterFamily> + '_ {
        self.families.iter()
    }

    /// Known family names in catalog order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.families.iter().map(|family| family.name).collect()
    }

    /// Closest known family name to `name`, if any is plausibly a typo of it.
    ///
    /// A candidate qualifies when its edit distance is at most a third of the
    /// longer name, rounded up.
    #[must_use]
    pub fn suggest(&self, name: &str) -> Option<&'static str> {
        self.families
            .iter()
            .map(|family| (edit_distance(name, family.name), family.name))
            .filter(|(distance, candidate)| {
                let longest = name.len().max(candidate.len());
                *distance <= longest.div_ceil(3)
            })
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate)
    }
}

/// Levenshtein distance over bytes; family names are ASCII.
fn edit_distance(a: &str, b: &str) -> usize {
    let b = b.as_bytes();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, left) in a.bytes().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, right) in b.iter().enumerate() {
            let substitution = diagonal + usize::from(left != *right);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(diagonal + 1);
        }
    }

    row[b.len()]
}
