//! Typed exemplar properties and the ordered bag holding them.

use derive_more::Deref;
use indexmap::IndexMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Storage type of a property's values
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u16)]
pub enum DataType {
    Uint8 = 0x0100,
    Uint16 = 0x0200,
    Uint32 = 0x0300,
    Sint32 = 0x0700,
    Sint64 = 0x0800,
    Float32 = 0x0900,
    Bool = 0x0B00,
    String = 0x0C00,
}

impl DataType {
    /// Code stored in binary records
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Size of one value in binary records
    pub const fn width(&self) -> usize {
        match self {
            DataType::Uint8 | DataType::Bool | DataType::String => 1,
            DataType::Uint16 => 2,
            DataType::Uint32 | DataType::Sint32 | DataType::Float32 => 4,
            DataType::Sint64 => 8,
        }
    }

    /// Name used in text records
    pub const fn name(&self) -> &'static str {
        match self {
            DataType::Uint8 => "Uint8",
            DataType::Uint16 => "Uint16",
            DataType::Uint32 => "Uint32",
            DataType::Sint32 => "Sint32",
            DataType::Sint64 => "Sint64",
            DataType::Float32 => "Float32",
            DataType::Bool => "Bool",
            DataType::String => "String",
        }
    }

    /// Inverse of [`DataType::name`]
    pub fn from_name(name: &str) -> Option<Self> {
        [
            DataType::Uint8,
            DataType::Uint16,
            DataType::Uint32,
            DataType::Sint32,
            DataType::Sint64,
            DataType::Float32,
            DataType::Bool,
            DataType::String,
        ]
        .into_iter()
        .find(|t| t.name().eq_ignore_ascii_case(name))
    }
}

impl TryFrom<u16> for DataType {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0x0100 => DataType::Uint8,
            0x0200 => DataType::Uint16,
            0x0300 => DataType::Uint32,
            0x0700 => DataType::Sint32,
            0x0800 => DataType::Sint64,
            0x0900 => DataType::Float32,
            0x0B00 => DataType::Bool,
            0x0C00 => DataType::String,
            other => return Err(other),
        })
    }
}

/// Integer storage types, all widened to `i64` once decoded
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IntegerKind {
    Uint8,
    Uint16,
    Uint32,
    Sint32,
    Sint64,
}

impl IntegerKind {
    /// The matching [`DataType`]
    pub const fn data_type(&self) -> DataType {
        match self {
            IntegerKind::Uint8 => DataType::Uint8,
            IntegerKind::Uint16 => DataType::Uint16,
            IntegerKind::Uint32 => DataType::Uint32,
            IntegerKind::Sint32 => DataType::Sint32,
            IntegerKind::Sint64 => DataType::Sint64,
        }
    }

    /// Narrow a raw two's complement value to this kind and widen it back
    pub(crate) const fn from_bits(&self, bits: u64) -> i64 {
        match self {
            IntegerKind::Uint8 => bits as u8 as i64,
            IntegerKind::Uint16 => bits as u16 as i64,
            IntegerKind::Uint32 => bits as u32 as i64,
            IntegerKind::Sint32 => bits as u32 as i32 as i64,
            IntegerKind::Sint64 => bits as i64,
        }
    }

    /// The stored bits of `value`, masked to this kind's width
    pub(crate) const fn to_bits(&self, value: i64) -> u64 {
        match self {
            IntegerKind::Uint8 => value as u8 as u64,
            IntegerKind::Uint16 => value as u16 as u64,
            IntegerKind::Uint32 | IntegerKind::Sint32 => value as u32 as u64,
            IntegerKind::Sint64 => value as u64,
        }
    }
}

/// Decoded values of a property
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PropertyValue {
    Bool(Vec<bool>),
    Integer(IntegerKind, Vec<i64>),
    Float32(Vec<f32>),
    String(String),
}

impl PropertyValue {
    /// Storage type of these values
    pub const fn data_type(&self) -> DataType {
        match self {
            PropertyValue::Bool(_) => DataType::Bool,
            PropertyValue::Integer(kind, _) => kind.data_type(),
            PropertyValue::Float32(_) => DataType::Float32,
            PropertyValue::String(_) => DataType::String,
        }
    }

    /// Number of stored values, the character count for strings
    pub fn len(&self) -> usize {
        match self {
            PropertyValue::Bool(v) => v.len(),
            PropertyValue::Integer(_, v) => v.len(),
            PropertyValue::Float32(v) => v.len(),
            PropertyValue::String(s) => s.chars().count(),
        }
    }

    /// Whether no values are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The first integer value, if this is an integer property
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(_, values) => values.first().copied(),
            _ => None,
        }
    }

    /// The text, if this is a string property
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// A typed value keyed by a numeric ID
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Property {
    /// Property ID
    pub id: u32,
    /// Display name carried by text records, not used for lookups
    pub name: Option<String>,
    /// Decoded values
    pub value: PropertyValue,
    /// Stored with a repetition count even when holding one value
    pub repeated: bool,
}

impl Property {
    /// A property holding `value`, repeated unless it is a single non-string value
    pub fn new(id: u32, value: PropertyValue) -> Self {
        let repeated = value.len() != 1 || value.data_type() == DataType::String;
        Self {
            id,
            name: None,
            value,
            repeated,
        }
    }

    /// Attach a display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Storage type of the values
    pub const fn data_type(&self) -> DataType {
        self.value.data_type()
    }

    /// Whether the record needs a repetition count
    pub fn is_array(&self) -> bool {
        self.repeated || self.value.len() != 1
    }

    /// Repetition count as written to records, zero for scalars
    pub fn repetition_count(&self) -> u32 {
        if self.is_array() {
            self.value.len() as u32
        } else {
            0
        }
    }
}

/// Resolves property names to IDs and back
///
/// Names are not part of the file format; they come from an external definition table.
pub trait PropertyNames {
    /// Name of the property `id`
    fn name_of(&self, id: u32) -> Option<&str>;

    /// ID of the property called `name`
    fn id_of(&self, name: &str) -> Option<u32>;
}

impl PropertyNames for [(u32, &str)] {
    fn name_of(&self, id: u32) -> Option<&str> {
        self.iter().find(|(i, _)| *i == id).map(|(_, n)| *n)
    }

    fn id_of(&self, name: &str) -> Option<u32> {
        self.iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(i, _)| *i)
    }
}

impl PropertyNames for IndexMap<u32, String> {
    fn name_of(&self, id: u32) -> Option<&str> {
        self.get(&id).map(String::as_str)
    }

    fn id_of(&self, name: &str) -> Option<u32> {
        self.iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(i, _)| *i)
    }
}

/// Properties keyed by ID, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Deref)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PropertyBag(IndexMap<u32, Property>);

impl PropertyBag {
    /// An empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `property` unless its ID is already present, handing it back in that case
    pub fn try_insert(&mut self, property: Property) -> Result<(), Property> {
        if self.0.contains_key(&property.id) {
            return Err(property);
        }
        self.0.insert(property.id, property);
        Ok(())
    }

    /// Add `property`, replacing one with the same ID in place
    pub fn insert(&mut self, property: Property) -> Option<Property> {
        self.0.insert(property.id, property)
    }

    /// Remove the property `id`, keeping the order of the rest
    pub fn remove(&mut self, id: u32) -> Option<Property> {
        self.0.shift_remove(&id)
    }

    /// Mutable access to the property `id`
    pub fn get_mut(&mut self, id: u32) -> Option<&mut Property> {
        self.0.get_mut(&id)
    }
}

impl FromIterator<Property> for PropertyBag {
    fn from_iter<T: IntoIterator<Item = Property>>(iter: T) -> Self {
        let mut bag = PropertyBag::new();
        for property in iter {
            bag.insert(property);
        }
        bag
    }
}
