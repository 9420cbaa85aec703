//! Localized text entries.
//!
//! | Offset | Size | Field                     |
//! |--------|------|---------------------------|
//! | 0x00   | 2    | Number of UTF-16 units    |
//! | 0x02   | 2    | Marker, always `0x1000`   |
//! | 0x04   | ...  | UTF-16LE text             |

use byteorder::{ByteOrder, LittleEndian};
use encoding_rs::WINDOWS_1252;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use widestring::{U16Str, U16String};

use crate::error::{DataQualityError, PayloadError};

/// Value of the second field of every well formed body
pub const MARKER: u16 = 0x1000;

/// Decoded LTEXT body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LText {
    pub text: String,
}

impl LText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Parse a decompressed body
    ///
    /// Bodies without the marker are read as plain single byte text and reported.
    pub fn decode(data: &[u8]) -> (Self, Vec<DataQualityError>) {
        let mut issues = Vec::new();

        if data.len() < 4 || LittleEndian::read_u16(&data[2..4]) != MARKER {
            issues.push(DataQualityError::UndecodableText(
                "missing 0x1000 marker, read as plain bytes".into(),
            ));
            let text = WINDOWS_1252.decode_without_bom_handling(data).0.into_owned();
            return (Self { text }, issues);
        }
        let count = LittleEndian::read_u16(&data[0..2]);

        let available = (data.len() - 4) / 2;
        let count = count as usize;
        if count > available {
            issues.push(DataQualityError::UndecodableText(format!(
                "declares {count} characters but only holds {available}"
            )));
        }

        let count = count.min(available);
        let mut units = vec![0u16; count];
        LittleEndian::read_u16_into(&data[4..4 + count * 2], &mut units);

        let wide = U16String::from_vec(units);
        let text = match U16Str::to_string(&wide) {
            Ok(text) => text,
            Err(e) => {
                issues.push(DataQualityError::UndecodableText(e.to_string()));
                wide.to_string_lossy()
            }
        };

        (Self { text }, issues)
    }

    /// Serialize the body
    pub fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        let units = U16String::from_str(&self.text).into_vec();
        let count = u16::try_from(units.len()).map_err(|_| {
            PayloadError::Malformed(format!(
                "{} characters do not fit in a text entry",
                units.len()
            ))
        })?;

        let mut out = vec![0u8; 4 + units.len() * 2];
        LittleEndian::write_u16(&mut out[0..2], count);
        LittleEndian::write_u16(&mut out[2..4], MARKER);
        LittleEndian::write_u16_into(&units, &mut out[4..]);

        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{DataQualityError, PayloadError};
    use crate::ltext::LText;

    #[rustfmt::skip]
    const PARKS: [u8; 14] = [
        0x05, 0x00,
        0x00, 0x10,
        b'P', 0x00, b'a', 0x00, b'r', 0x00, b'k', 0x00, b's', 0x00,
    ];

    #[test]
    fn decode() {
        let (actual, issues) = LText::decode(&PARKS);

        assert_eq!(actual, LText::new("Parks"));
        assert!(issues.is_empty());
    }

    #[test]
    fn encode() {
        assert_eq!(LText::new("Parks").encode(), Ok(PARKS.to_vec()));
    }

    #[test]
    fn non_ascii() {
        let expected = LText::new("Rathaus für 100 §");
        let (actual, issues) = LText::decode(&expected.encode().unwrap());

        assert_eq!(actual, expected);
        assert!(issues.is_empty());
    }

    #[test]
    fn missing_marker_falls_back_to_bytes() {
        let (actual, issues) = LText::decode(b"Plain text");

        assert_eq!(actual, LText::new("Plain text"));
        assert_eq!(
            issues,
            vec![DataQualityError::UndecodableText(
                "missing 0x1000 marker, read as plain bytes".into()
            )]
        );
    }

    #[test]
    fn plain_bytes_keep_single_byte_characters() {
        let (actual, issues) = LText::decode(b"Stra\xDFe");

        assert_eq!(actual, LText::new("Stra\u{df}e"));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn odd_length_body() {
        let mut data = PARKS.to_vec();
        data.push(0xFF);
        let (actual, issues) = LText::decode(&data);

        assert_eq!(actual, LText::new("Parks"));
        assert!(issues.is_empty());
    }

    #[test]
    fn short_body_keeps_what_is_there() {
        let (actual, issues) = LText::decode(&PARKS[..10]);

        assert_eq!(actual, LText::new("Par"));
        assert_eq!(
            issues,
            vec![DataQualityError::UndecodableText(
                "declares 5 characters but only holds 3".into()
            )]
        );
    }

    #[test]
    fn too_long() {
        let text = LText::new("x".repeat(0x1_0000));
        assert!(matches!(text.encode(), Err(PayloadError::Malformed(_))));
    }
}
