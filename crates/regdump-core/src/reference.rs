//! Operator query parser for `GIC.<FAMILY><N>` register references.

use std::fmt;

use thiserror::Error;

use crate::catalog::RegisterCatalog;

/// Literal prefix every register reference starts with.
pub const REFERENCE_PREFIX: &str = "GIC.";

/// A parsed register reference: family name plus instance index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegisterReference {
    /// Register family name, e.g. `ISENABLER`.
    pub family: String,
    /// Instance index selecting one register of the family.
    pub index: u32,
}

impl RegisterReference {
    /// Creates a reference without consulting any catalog.
    #[must_use]
    pub fn new(family: impl Into<String>, index: u32) -> Self {
        Self {
            family: family.into(),
            index,
        }
    }
}

impl fmt::Display for RegisterReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{REFERENCE_PREFIX}{}{}", self.family, self.index)
    }
}

/// Structural reason a query did not match the reference shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatIssue {
    /// Query does not begin with `GIC.`.
    MissingPrefix,
    /// No uppercase family name follows the prefix.
    MissingFamily,
    /// Family name is not followed by a decimal index.
    MissingIndex,
    /// Characters remain after the index digits.
    TrailingCharacters,
    /// Index digits do not fit in a 32-bit instance number.
    IndexTooLarge,
}

impl fmt::Display for FormatIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingPrefix => "expected `GIC.` prefix",
            Self::MissingFamily => "expected uppercase register family after `GIC.`",
            Self::MissingIndex => "expected decimal instance index after family",
            Self::TrailingCharacters => "unexpected characters after instance index",
            Self::IndexTooLarge => "instance index out of range",
        };
        f.write_str(text)
    }
}

/// Failure to turn an operator query into a catalogued register reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Query text is not shaped like `GIC.<FAMILY><N>`.
    #[error("invalid register reference `{input}`: {issue}")]
    InvalidReferenceFormat {
        /// The query as supplied.
        input: String,
        /// What was wrong with it.
        issue: FormatIssue,
    },
    /// Query is well formed but names a family the catalog does not know.
    #[error("unknown register family `{name}`{}", describe_alternatives(.suggestion, .known))]
    UnknownFamily {
        /// The unrecognised family name.
        name: String,
        /// Closest catalogued name, when one is near enough.
        suggestion: Option<&'static str>,
        /// Every catalogued family name.
        known: Vec<&'static str>,
    },
}

fn describe_alternatives(suggestion: &Option<&'static str>, known: &[&'static str]) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean {name}?)"),
        None if known.is_empty() => String::new(),
        None => format!(" (known families: {})", known.join(", ")),
    }
}

impl ParseError {
    const fn format(input: String, issue: FormatIssue) -> Self {
        Self::InvalidReferenceFormat { input, issue }
    }
}

/// Parses an operator query such as `GIC.ISENABLER3`.
///
/// Surrounding whitespace is ignored. The family segment is the longest run of
/// ASCII uppercase letters after the prefix; the digits that follow are the
/// instance index and must end the query.
///
/// # Errors
///
/// Returns [`ParseError::InvalidReferenceFormat`] when the text does not have
/// the reference shape, and [`ParseError::UnknownFamily`] when the family is
/// not present in `catalog`.
pub fn parse_reference(
    text: &str,
    catalog: &RegisterCatalog,
) -> Result<RegisterReference, ParseError> {
    let input = text.trim();

    let Some(rest) = input.strip_prefix(REFERENCE_PREFIX) else {
        return Err(ParseError::format(input.to_string(), FormatIssue::MissingPrefix));
    };

    let family_len = rest
        .bytes()
        .take_while(u8::is_ascii_uppercase)
        .count();
    if family_len == 0 {
        return Err(ParseError::format(input.to_string(), FormatIssue::MissingFamily));
    }
    let (family, rest) = rest.split_at(family_len);

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(ParseError::format(input.to_string(), FormatIssue::MissingIndex));
    }
    let (digits, trailing) = rest.split_at(digits_len);

    if !trailing.is_empty() {
        return Err(ParseError::format(
            input.to_string(),
            FormatIssue::TrailingCharacters,
        ));
    }

    let index = digits
        .parse::<u32>()
        .map_err(|_| ParseError::format(input.to_string(), FormatIssue::IndexTooLarge))?;

    if !catalog.contains(family) {
        return Err(ParseError::UnknownFamily {
            name: family.to_string(),
            suggestion: catalog.suggest(family),
            known: catalog.names(),
        });
    }

    Ok(RegisterReference::new(family, index))
}
