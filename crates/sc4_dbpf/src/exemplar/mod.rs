//! Exemplar and Cohort entries.
//!
//! Both kinds hold an ordered bag of typed properties plus the TGI of a parent cohort whose
//! properties they inherit. Bodies start with an 8 byte tag naming the kind and the
//! sub-encoding:
//!
//! | Tag        | Kind     | Encoding |
//! |------------|----------|----------|
//! | `EQZB1###` | Exemplar | Binary   |
//! | `CQZB1###` | Cohort   | Binary   |
//! | `EQZT1###` | Exemplar | Text     |
//! | `CQZT1###` | Cohort   | Text     |

pub mod binary;
pub mod property;
pub mod text;

use std::borrow::Cow;

use encoding_rs::WINDOWS_1252;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{DataQualityError, PayloadError};
use crate::tgi::Tgi;

pub use property::{
    DataType, IntegerKind, Property, PropertyBag, PropertyNames, PropertyValue,
};

/// ID of the property holding the exemplar type
pub const EXEMPLAR_TYPE: u32 = 0x0000_0010;

/// ID of the property holding the exemplar name
pub const EXEMPLAR_NAME: u32 = 0x0000_0020;

/// Length of the tag at the start of every body
pub const TAG_SIZE: usize = 8;

/// Whether a body describes an object or a shared base
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExemplarKind {
    #[default]
    Exemplar,
    Cohort,
}

/// How the body is stored
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Encoding {
    #[default]
    Binary,
    Text,
}

fn tag(kind: ExemplarKind, encoding: Encoding) -> &'static [u8; TAG_SIZE] {
    match (kind, encoding) {
        (ExemplarKind::Exemplar, Encoding::Binary) => b"EQZB1###",
        (ExemplarKind::Cohort, Encoding::Binary) => b"CQZB1###",
        (ExemplarKind::Exemplar, Encoding::Text) => b"EQZT1###",
        (ExemplarKind::Cohort, Encoding::Text) => b"CQZT1###",
    }
}

/// Text of stored string bytes, one character per byte
fn decode_string(bytes: &[u8]) -> String {
    WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned()
}

/// Stored bytes of a string, one byte per character
fn encode_string(text: &str) -> core::result::Result<Cow<'_, [u8]>, PayloadError> {
    let (bytes, _, unmappable) = WINDOWS_1252.encode(text);
    if unmappable {
        return Err(PayloadError::Malformed(format!(
            "{text:?} holds characters that cannot be stored in a single byte"
        )));
    }
    Ok(bytes)
}

/// Reject strings the line oriented text form cannot carry
fn check_text_line(id: u32, text: &str) -> core::result::Result<(), PayloadError> {
    if text.contains(['\r', '\n']) || text.contains("\"}") {
        return Err(PayloadError::Malformed(format!(
            "property {id:#010x} holds a line break or a closing \"}} and cannot be written as text"
        )));
    }
    Ok(())
}

fn parse_tag(tag: &[u8]) -> Option<(ExemplarKind, Encoding)> {
    Some(match tag {
        b"EQZB1###" => (ExemplarKind::Exemplar, Encoding::Binary),
        b"CQZB1###" => (ExemplarKind::Cohort, Encoding::Binary),
        b"EQZT1###" => (ExemplarKind::Exemplar, Encoding::Text),
        b"CQZT1###" => (ExemplarKind::Cohort, Encoding::Text),
        _ => return None,
    })
}

/// Decoded Exemplar or Cohort body
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Exemplar {
    pub kind: ExemplarKind,
    pub encoding: Encoding,
    pub parent_cohort: Tgi,
    pub properties: PropertyBag,
}

impl Exemplar {
    /// An empty body with no parent cohort
    pub fn new(kind: ExemplarKind, encoding: Encoding) -> Self {
        Self {
            kind,
            encoding,
            ..Default::default()
        }
    }

    /// Parse a decompressed body
    ///
    /// Problems with individual properties do not fail the parse. They are returned next to
    /// the partial bag: unreadable records, repeated IDs (the first one is kept) and a
    /// missing exemplar type or name.
    pub fn decode(data: &[u8]) -> core::result::Result<(Self, Vec<DataQualityError>), PayloadError> {
        if data.len() < TAG_SIZE {
            return Err(PayloadError::Truncated {
                needed: TAG_SIZE,
                available: data.len(),
            });
        }

        let (tag, body) = data.split_at(TAG_SIZE);
        let (kind, encoding) = parse_tag(tag)
            .ok_or_else(|| PayloadError::UnknownTag(String::from_utf8_lossy(tag).into_owned()))?;

        let (parent_cohort, records, mut issues) = match encoding {
            Encoding::Binary => binary::read_body(body)?,
            Encoding::Text => text::read_body(&decode_string(body))?,
        };

        let mut properties = PropertyBag::new();
        for property in records {
            if let Err(duplicate) = properties.try_insert(property) {
                issues.push(DataQualityError::DuplicateProperty(duplicate.id));
            }
        }

        for id in [EXEMPLAR_TYPE, EXEMPLAR_NAME] {
            if !properties.contains_key(&id) {
                issues.push(DataQualityError::MissingProperty(id));
            }
        }

        let exemplar = Self {
            kind,
            encoding,
            parent_cohort,
            properties,
        };
        Ok((exemplar, issues))
    }

    /// Serialize the body in its own encoding
    ///
    /// Strings are stored one byte per character, so characters outside Windows-1252 are
    /// rejected. The text encoding also rejects names and strings holding line breaks or a
    /// closing `"}`.
    pub fn encode(&self) -> core::result::Result<Vec<u8>, PayloadError> {
        match self.encoding {
            Encoding::Binary => {
                let mut out = tag(self.kind, self.encoding).to_vec();
                binary::write_body(&mut out, &self.parent_cohort, &self.properties)?;
                Ok(out)
            }
            Encoding::Text => {
                for property in self.iter() {
                    check_text_line(property.id, property.name.as_deref().unwrap_or_default())?;
                    if let Some(text) = property.value.as_str() {
                        check_text_line(property.id, text)?;
                    }
                }
                Ok(encode_string(&self.to_text())?.into_owned())
            }
        }
    }

    /// The body rendered as text, tag line included, whatever its stored encoding
    pub fn to_text(&self) -> String {
        let tag = tag(self.kind, Encoding::Text);
        let mut out = String::from_utf8_lossy(tag).into_owned();
        out.push_str("\r\n");
        out.push_str(&text::write_body(&self.parent_cohort, &self.properties));
        out
    }

    /// Property with the given ID
    pub fn get(&self, id: u32) -> Option<&Property> {
        self.properties.get(&id)
    }

    /// Mutable property with the given ID
    pub fn get_mut(&mut self, id: u32) -> Option<&mut Property> {
        self.properties.get_mut(id)
    }

    /// Property called `name` according to `names`
    pub fn get_by_name<N: PropertyNames + ?Sized>(&self, names: &N, name: &str) -> Option<&Property> {
        names.id_of(name).and_then(|id| self.get(id))
    }

    /// Add a property, replacing one with the same ID in place
    pub fn insert(&mut self, property: Property) -> Option<Property> {
        self.properties.insert(property)
    }

    /// Remove the property with the given ID
    pub fn remove(&mut self, id: u32) -> Option<Property> {
        self.properties.remove(id)
    }

    /// Properties in stored order
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether there are no properties
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Value of the exemplar type property
    pub fn exemplar_type(&self) -> Option<u32> {
        self.get(EXEMPLAR_TYPE)
            .and_then(|p| p.value.as_integer())
            .map(|v| v as u32)
    }

    /// Value of the exemplar name property
    pub fn exemplar_name(&self) -> Option<&str> {
        self.get(EXEMPLAR_NAME).and_then(|p| p.value.as_str())
    }
}
