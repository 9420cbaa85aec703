//! Text exemplar bodies.
//!
//! ```text
//! ParentCohort=Key:{0x00000000,0x00000000,0x00000000}
//! PropCount=0x00000002
//! 0x00000010:{"Exemplar Type"}=Uint32:0:{0x00000002}
//! 0x00000020:{"Exemplar Name"}=String:1:{"Parks Aura"}
//! ```
//!
//! Every line ends in CRLF.

use winnow::ascii::{alphanumeric1, dec_int, dec_uint, float, hex_uint, space0};
use winnow::combinator::{alt, delimited, preceded, separated};
use winnow::prelude::*;
use winnow::token::take_until;
use winnow::PResult;

use crate::error::{DataQualityError, PayloadError};
use crate::exemplar::property::{DataType, IntegerKind, Property, PropertyBag, PropertyValue};
use crate::tgi::Tgi;

const LINE_END: &str = "\r\n";

fn hex_prefix(input: &mut &str) -> PResult<()> {
    alt(("0x", "0X")).void().parse_next(input)
}

fn hex32(input: &mut &str) -> PResult<u32> {
    preceded((space0, hex_prefix), hex_uint).parse_next(input)
}

fn parent_cohort(input: &mut &str) -> PResult<Tgi> {
    let (_, type_id, _, group_id, _, instance_id, _, _) = (
        "ParentCohort=Key:{",
        hex32,
        ',',
        hex32,
        ',',
        hex32,
        space0,
        '}',
    )
        .parse_next(input)?;

    Ok(Tgi::new(type_id, group_id, instance_id))
}

fn property_count(input: &mut &str) -> PResult<u32> {
    preceded("PropCount=", hex32).parse_next(input)
}

fn repetition_count(input: &mut &str) -> PResult<u32> {
    alt((hex32, dec_uint)).parse_next(input)
}

fn integer(input: &mut &str) -> PResult<u64> {
    preceded(
        space0,
        alt((
            preceded(hex_prefix, hex_uint::<_, u64, _>),
            dec_int::<_, i64, _>.map(|v| v as u64),
        )),
    )
    .parse_next(input)
}

fn boolean(input: &mut &str) -> PResult<bool> {
    preceded(
        space0,
        alphanumeric1.verify_map(|word: &str| match word.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }),
    )
    .parse_next(input)
}

fn values(data_type: DataType) -> impl FnMut(&mut &str) -> PResult<PropertyValue> {
    move |input: &mut &str| {
        let value = match data_type {
            DataType::String => {
                PropertyValue::String(delimited('"', take_until(0.., "\"}"), '"').parse_next(input)?.into())
            }
            DataType::Bool => PropertyValue::Bool(separated(0.., boolean, ',').parse_next(input)?),
            DataType::Float32 => PropertyValue::Float32(
                separated(0.., preceded(space0, float::<_, f32, _>), ',').parse_next(input)?,
            ),
            DataType::Uint8 => integers(IntegerKind::Uint8, input)?,
            DataType::Uint16 => integers(IntegerKind::Uint16, input)?,
            DataType::Uint32 => integers(IntegerKind::Uint32, input)?,
            DataType::Sint32 => integers(IntegerKind::Sint32, input)?,
            DataType::Sint64 => integers(IntegerKind::Sint64, input)?,
        };
        Ok(value)
    }
}

fn integers(kind: IntegerKind, input: &mut &str) -> PResult<PropertyValue> {
    let bits: Vec<u64> = separated(0.., integer, ',').parse_next(input)?;
    Ok(PropertyValue::Integer(
        kind,
        bits.into_iter().map(|b| kind.from_bits(b)).collect(),
    ))
}

fn property(input: &mut &str) -> PResult<Property> {
    let id = hex32.parse_next(input)?;
    let name = delimited(":{\"", take_until(0.., "\"}"), "\"}=").parse_next(input)?;
    let data_type = alphanumeric1
        .verify_map(DataType::from_name)
        .parse_next(input)?;
    let count = delimited(':', repetition_count, ':').parse_next(input)?;
    let value = delimited('{', values(data_type), (space0, '}', space0)).parse_next(input)?;

    let name = (!name.is_empty()).then(|| name.to_string());
    Ok(Property {
        id,
        name,
        repeated: count != 0 || data_type == DataType::String,
        value,
    })
}

/// Parse the body following the tag line
///
/// Each record sits on its own line, so one that cannot be parsed is skipped and reading
/// continues with the next.
pub(super) fn read_body(
    body: &str,
) -> Result<(Tgi, Vec<Property>, Vec<DataQualityError>), PayloadError> {
    let mut lines = body.lines().map(str::trim).filter(|line| !line.is_empty());

    let parent = lines
        .next()
        .ok_or_else(|| PayloadError::Malformed("missing ParentCohort line".into()))?;
    let parent = parent_cohort
        .parse(parent)
        .map_err(|e| PayloadError::Malformed(format!("unreadable ParentCohort line:\n{e}")))?;

    let count = lines
        .next()
        .ok_or_else(|| PayloadError::Malformed("missing PropCount line".into()))?;
    let count = property_count
        .parse(count)
        .map_err(|e| PayloadError::Malformed(format!("unreadable PropCount line:\n{e}")))?;

    let mut properties = Vec::new();
    let mut issues = Vec::new();
    for index in 0..count as usize {
        let Some(line) = lines.next() else {
            issues.push(DataQualityError::UnreadableProperty {
                index,
                reason: format!("body ends after {index} of {count} records"),
            });
            break;
        };

        match property.parse(line) {
            Ok(property) => properties.push(property),
            Err(e) => issues.push(DataQualityError::UnreadableProperty {
                index,
                reason: e.to_string(),
            }),
        }
    }

    Ok((parent, properties, issues))
}

fn write_values(out: &mut String, value: &PropertyValue) {
    let rendered: Vec<String> = match value {
        PropertyValue::String(text) => vec![format!("\"{text}\"")],
        PropertyValue::Bool(values) => values
            .iter()
            .map(|v| if *v { "True" } else { "False" }.to_string())
            .collect(),
        PropertyValue::Float32(values) => values.iter().map(f32::to_string).collect(),
        PropertyValue::Integer(kind, values) => {
            let width = kind.data_type().width() * 2;
            values
                .iter()
                .map(|v| format!("0x{:0width$x}", kind.to_bits(*v)))
                .collect()
        }
    };
    out.push_str(&rendered.join(","));
}

/// Render the body following the tag line
pub(super) fn write_body(parent: &Tgi, properties: &PropertyBag) -> String {
    let mut out = format!(
        "ParentCohort=Key:{{0x{:08x},0x{:08x},0x{:08x}}}{LINE_END}",
        parent.type_id, parent.group_id, parent.instance_id
    );
    out.push_str(&format!("PropCount=0x{:08x}{LINE_END}", properties.len()));

    for property in properties.values() {
        let count = match property.value {
            PropertyValue::String(_) => 1,
            _ => property.repetition_count(),
        };
        out.push_str(&format!(
            "0x{:08x}:{{\"{}\"}}={}:{count}:{{",
            property.id,
            property.name.as_deref().unwrap_or_default(),
            property.data_type().name(),
        ));
        write_values(&mut out, &property.value);
        out.push('}');
        out.push_str(LINE_END);
    }

    out
}
