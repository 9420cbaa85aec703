//! Binary exemplar bodies.
//!
//! | Offset | Size | Field            |
//! |--------|------|------------------|
//! | 0x00   | 12   | Parent cohort TGI |
//! | 0x0C   | 4    | Property count   |
//! | 0x10   | ...  | Property records |
//!
//! Each record is the property ID (4), data type code (2), key type (2) and one unused byte,
//! followed by a repetition count (4) when the key type is `0x80`, then the values.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::error::{DataQualityError, PayloadError};
use crate::exemplar::{decode_string, encode_string};
use crate::exemplar::property::{DataType, IntegerKind, Property, PropertyBag, PropertyValue};
use crate::tgi::Tgi;

const KEY_SCALAR: u16 = 0x00;
const KEY_REPEATED: u16 = 0x80;

/// Size of the parent cohort and property count
const HEADER_SIZE: usize = 16;

#[derive(Error, Debug)]
enum RecordError {
    #[error("unknown data type {0:#06x}")]
    UnknownType(u16),

    #[error("unknown key type {0:#06x}")]
    UnknownKeyType(u16),

    #[error("{count} values of {width} bytes need {needed} bytes but only {available} remain")]
    Truncated {
        count: usize,
        width: usize,
        needed: usize,
        available: usize,
    },

    #[error("record ends early")]
    Eof(#[from] std::io::Error),
}

fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    cursor
        .get_ref()
        .len()
        .saturating_sub(cursor.position() as usize)
}

fn read_record(cursor: &mut Cursor<&[u8]>) -> Result<Property, RecordError> {
    let id = cursor.read_u32::<LittleEndian>()?;
    let code = cursor.read_u16::<LittleEndian>()?;
    let data_type = DataType::try_from(code).map_err(RecordError::UnknownType)?;
    let key_type = cursor.read_u16::<LittleEndian>()?;
    let _unused = cursor.read_u8()?;

    let (count, repeated) = match key_type {
        KEY_SCALAR => (1, false),
        KEY_REPEATED => (cursor.read_u32::<LittleEndian>()? as usize, true),
        other => return Err(RecordError::UnknownKeyType(other)),
    };

    let width = data_type.width();
    let available = remaining(cursor);
    let needed = count.saturating_mul(width);
    if needed > available {
        return Err(RecordError::Truncated {
            count,
            width,
            needed,
            available,
        });
    }

    let value = match data_type {
        DataType::Bool => PropertyValue::Bool(
            (0..count)
                .map(|_| cursor.read_u8().map(|b| b != 0))
                .collect::<Result<_, _>>()?,
        ),
        DataType::Float32 => PropertyValue::Float32(
            (0..count)
                .map(|_| cursor.read_f32::<LittleEndian>())
                .collect::<Result<_, _>>()?,
        ),
        DataType::String => {
            let mut text = vec![0u8; count];
            cursor.read_exact(&mut text)?;
            PropertyValue::String(decode_string(&text))
        }
        DataType::Uint8 => integers(cursor, IntegerKind::Uint8, count)?,
        DataType::Uint16 => integers(cursor, IntegerKind::Uint16, count)?,
        DataType::Uint32 => integers(cursor, IntegerKind::Uint32, count)?,
        DataType::Sint32 => integers(cursor, IntegerKind::Sint32, count)?,
        DataType::Sint64 => integers(cursor, IntegerKind::Sint64, count)?,
    };

    Ok(Property {
        id,
        name: None,
        value,
        repeated,
    })
}

fn integers(
    cursor: &mut Cursor<&[u8]>,
    kind: IntegerKind,
    count: usize,
) -> Result<PropertyValue, RecordError> {
    let values = (0..count)
        .map(|_| {
            let bits = match kind {
                IntegerKind::Uint8 => cursor.read_u8()? as u64,
                IntegerKind::Uint16 => cursor.read_u16::<LittleEndian>()? as u64,
                IntegerKind::Uint32 | IntegerKind::Sint32 => {
                    cursor.read_u32::<LittleEndian>()? as u64
                }
                IntegerKind::Sint64 => cursor.read_u64::<LittleEndian>()?,
            };
            Ok(kind.from_bits(bits))
        })
        .collect::<Result<_, std::io::Error>>()?;

    Ok(PropertyValue::Integer(kind, values))
}

/// Parse the body following the tag
///
/// Records are read until the declared count is reached or one cannot be read. A record
/// that fails leaves the cursor in an unknown place, so nothing after it is read.
pub(super) fn read_body(
    body: &[u8],
) -> Result<(Tgi, Vec<Property>, Vec<DataQualityError>), PayloadError> {
    if body.len() < HEADER_SIZE {
        return Err(PayloadError::Truncated {
            needed: HEADER_SIZE,
            available: body.len(),
        });
    }

    let mut cursor = Cursor::new(body);
    let mut header = || cursor.read_u32::<LittleEndian>();
    let (Ok(type_id), Ok(group_id), Ok(instance_id), Ok(count)) =
        (header(), header(), header(), header())
    else {
        return Err(PayloadError::Truncated {
            needed: HEADER_SIZE,
            available: body.len(),
        });
    };
    let parent = Tgi::new(type_id, group_id, instance_id);

    let mut properties = Vec::new();
    let mut issues = Vec::new();
    for index in 0..count as usize {
        match read_record(&mut cursor) {
            Ok(property) => properties.push(property),
            Err(err) => {
                issues.push(DataQualityError::UnreadableProperty {
                    index,
                    reason: err.to_string(),
                });
                break;
            }
        }
    }

    Ok((parent, properties, issues))
}

fn write_record<W: Write>(writer: &mut W, property: &Property) -> Result<(), PayloadError> {
    let text = match &property.value {
        PropertyValue::String(text) => Some(encode_string(text)?),
        _ => None,
    };

    write_fields(writer, property, text.as_deref()).map_err(|e| {
        PayloadError::Malformed(format!("writing property {:#010x}: {e}", property.id))
    })
}

fn write_fields<W: Write>(
    writer: &mut W,
    property: &Property,
    text: Option<&[u8]>,
) -> std::io::Result<()> {
    writer.write_u32::<LittleEndian>(property.id)?;
    writer.write_u16::<LittleEndian>(property.data_type().code())?;

    if property.is_array() {
        writer.write_u16::<LittleEndian>(KEY_REPEATED)?;
        writer.write_u8(0)?;
        let count = text.map_or(property.repetition_count(), |t| t.len() as u32);
        writer.write_u32::<LittleEndian>(count)?;
    } else {
        writer.write_u16::<LittleEndian>(KEY_SCALAR)?;
        writer.write_u8(0)?;
    }

    match &property.value {
        PropertyValue::Bool(values) => {
            for value in values {
                writer.write_u8(*value as u8)?;
            }
        }
        PropertyValue::Float32(values) => {
            for value in values {
                writer.write_f32::<LittleEndian>(*value)?;
            }
        }
        PropertyValue::String(_) => writer.write_all(text.unwrap_or_default())?,
        PropertyValue::Integer(kind, values) => {
            for value in values {
                let bits = kind.to_bits(*value);
                match kind {
                    IntegerKind::Uint8 => writer.write_u8(bits as u8)?,
                    IntegerKind::Uint16 => writer.write_u16::<LittleEndian>(bits as u16)?,
                    IntegerKind::Uint32 | IntegerKind::Sint32 => {
                        writer.write_u32::<LittleEndian>(bits as u32)?
                    }
                    IntegerKind::Sint64 => writer.write_u64::<LittleEndian>(bits)?,
                }
            }
        }
    }

    Ok(())
}

/// Write the body following the tag
pub(super) fn write_body<W: Write>(
    writer: &mut W,
    parent: &Tgi,
    properties: &PropertyBag,
) -> Result<(), PayloadError> {
    let header = |writer: &mut W| -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(parent.type_id)?;
        writer.write_u32::<LittleEndian>(parent.group_id)?;
        writer.write_u32::<LittleEndian>(parent.instance_id)?;
        writer.write_u32::<LittleEndian>(properties.len() as u32)
    };
    header(&mut *writer).map_err(|e| PayloadError::Malformed(format!("writing header: {e}")))?;

    for property in properties.values() {
        write_record(writer, property)?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{DataQualityError, PayloadError};
    use crate::exemplar::binary::{read_body, write_body};
    use crate::exemplar::property::{IntegerKind, Property, PropertyBag, PropertyValue};
    use crate::tgi::Tgi;

    #[rustfmt::skip]
    fn body() -> Vec<u8> {
        vec![
            // parent cohort
            0x61, 0x28, 0x34, 0x05,
            0x01, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            // count
            0x02, 0x00, 0x00, 0x00,
            // 0x10 Uint32 scalar
            0x10, 0x00, 0x00, 0x00,
            0x00, 0x03,
            0x00, 0x00,
            0x00,
            0x02, 0x00, 0x00, 0x00,
            // 0x20 String x 5
            0x20, 0x00, 0x00, 0x00,
            0x00, 0x0C,
            0x80, 0x00,
            0x00,
            0x05, 0x00, 0x00, 0x00,
            b'P', b'a', b'r', b'k', b's',
        ]
    }

    fn properties() -> Vec<Property> {
        vec![
            Property::new(0x10, PropertyValue::Integer(IntegerKind::Uint32, vec![2])),
            Property::new(0x20, PropertyValue::String("Parks".into())),
        ]
    }

    #[test]
    fn read() {
        let (parent, actual, issues) = read_body(&body()).unwrap();

        assert_eq!(parent, Tgi::new(0x0534_2861, 1, 2));
        assert_eq!(actual, properties());
        assert!(issues.is_empty());
    }

    #[test]
    fn write() {
        let bag: PropertyBag = properties().into_iter().collect();
        let mut actual = Vec::new();
        write_body(&mut actual, &Tgi::new(0x0534_2861, 1, 2), &bag).unwrap();

        assert_eq!(actual, body());
    }

    #[test]
    fn signed_and_repeated_values() {
        let bag: PropertyBag = [
            Property::new(0x1, PropertyValue::Integer(IntegerKind::Sint32, vec![-5, 7])),
            Property::new(0x2, PropertyValue::Integer(IntegerKind::Sint64, vec![i64::MIN])),
            Property::new(0x3, PropertyValue::Float32(vec![0.5, -1.25, 3.0])),
            Property::new(0x4, PropertyValue::Bool(vec![true, false])),
            Property {
                repeated: true,
                ..Property::new(0x5, PropertyValue::Integer(IntegerKind::Uint8, vec![0xFF]))
            },
        ]
        .into_iter()
        .collect();

        let mut bytes = Vec::new();
        write_body(&mut bytes, &Tgi::default(), &bag).unwrap();
        let (_, actual, issues) = read_body(&bytes).unwrap();

        assert!(issues.is_empty());
        assert_eq!(actual, bag.values().cloned().collect::<Vec<_>>());
    }

    #[test]
    fn short_header() {
        assert_eq!(
            read_body(&[0u8; 10]),
            Err(PayloadError::Truncated {
                needed: 16,
                available: 10
            })
        );
    }

    #[test]
    fn truncated_record_keeps_earlier_ones() {
        let mut bytes = body();
        bytes.truncate(bytes.len() - 2);

        let (_, actual, issues) = read_body(&bytes).unwrap();

        assert_eq!(actual, properties()[..1].to_vec());
        assert_eq!(issues.len(), 1);
        assert!(matches!(
            &issues[0],
            DataQualityError::UnreadableProperty { index: 1, .. }
        ));
    }

    #[test]
    fn huge_count_is_rejected() {
        #[rustfmt::skip]
        let bytes = vec![
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x00,
            0x00, 0x03,
            0x80, 0x00,
            0x00,
            0xFF, 0xFF, 0xFF, 0xFF,
        ];

        let (_, actual, issues) = read_body(&bytes).unwrap();

        assert!(actual.is_empty());
        assert_eq!(
            issues,
            vec![DataQualityError::UnreadableProperty {
                index: 0,
                reason: "4294967295 values of 4 bytes need 17179869180 bytes but only 0 remain"
                    .into()
            }]
        );
    }

    #[test]
    fn unknown_type_stops_reading() {
        let mut bytes = body();
        bytes[20] = 0x00;
        bytes[21] = 0x04;

        let (_, actual, issues) = read_body(&bytes).unwrap();

        assert!(actual.is_empty());
        assert_eq!(
            issues,
            vec![DataQualityError::UnreadableProperty {
                index: 0,
                reason: "unknown data type 0x0400".into()
            }]
        );
    }

    #[test]
    fn single_byte_strings_keep_their_bytes() {
        let mut bytes = body();
        let end = bytes.len();
        bytes.splice(end - 5.., *b"Stra\xDFe");
        bytes[38] = 0x06;

        let (_, actual, issues) = read_body(&bytes).unwrap();
        assert!(issues.is_empty());
        assert_eq!(actual[1].value, PropertyValue::String("Stra\u{df}e".into()));
        assert_eq!(actual[1].repetition_count(), 6);

        let bag: PropertyBag = actual.into_iter().collect();
        let mut written = Vec::new();
        write_body(&mut written, &Tgi::new(0x0534_2861, 1, 2), &bag).unwrap();
        assert_eq!(written, bytes);
    }

    #[test]
    fn scalar_string_stays_scalar() {
        #[rustfmt::skip]
        let bytes = vec![
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x20, 0x00, 0x00, 0x00,
            0x00, 0x0C,
            0x00, 0x00,
            0x00,
            b'A',
        ];

        let (_, actual, issues) = read_body(&bytes).unwrap();
        assert!(issues.is_empty());
        assert!(!actual[0].is_array());
        assert_eq!(actual[0].value, PropertyValue::String("A".into()));

        let bag: PropertyBag = actual.into_iter().collect();
        let mut written = Vec::new();
        write_body(&mut written, &Tgi::default(), &bag).unwrap();
        assert_eq!(written, bytes);
    }

    #[test]
    fn wide_characters_are_rejected() {
        let bag: PropertyBag = [Property::new(0x20, PropertyValue::String("Park \u{2603}".into()))]
            .into_iter()
            .collect();

        let mut written = Vec::new();
        assert!(matches!(
            write_body(&mut written, &Tgi::default(), &bag),
            Err(PayloadError::Malformed(_))
        ));
    }
}
