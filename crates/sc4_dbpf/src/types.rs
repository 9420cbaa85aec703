//! Base types for structure of DBPF file.

use binrw::{BinRead, BinWrite};

use crate::error::FormatError;
use crate::tgi::Tgi;

/// Size of [`DbpfHeader`] in bytes
pub const HEADER_SIZE: u32 = 96;

/// Size of [`IndexRecord`] in bytes
pub const INDEX_RECORD_SIZE: u32 = 20;

/// Identifier every DBPF file starts with
pub const MAGIC: [u8; 4] = *b"DBPF";

/// DBPF file header
///
/// Defines the header of the DBPF file which always starts with "DBPF" and is followed by
/// the format and index versions. SimCity 4 only ever reads version 1.0 with index version 7.
/// All data is stored in little endian format
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct DbpfHeader {
    /// Always "DBPF"
    pub identifier: [u8; 4],

    /// Major version of the file format
    pub major_version: u32,

    /// Minor version of the file format
    pub minor_version: u32,

    #[allow(dead_code)]
    reserved_0c: [u8; 12],

    /// Creation time, in seconds since the unix epoch
    pub date_created: u32,

    /// Last modification time, in seconds since the unix epoch
    pub date_modified: u32,

    /// Version of the index table layout
    pub index_major_version: u32,

    /// The number of records in the index table
    pub index_entry_count: u32,

    /// The offset from the beginning of the file where the index table starts
    pub index_offset: u32,

    /// The size of the index table in bytes
    pub index_size: u32,

    /// The number of records in the hole table
    pub hole_entry_count: u32,

    /// The offset from the beginning of the file where the hole table starts
    pub hole_offset: u32,

    /// The size of the hole table in bytes
    pub hole_size: u32,

    /// Minor version of the index table layout
    pub index_minor_version: u32,

    #[allow(dead_code)]
    reserved_40: [u8; 32],
}

impl Default for DbpfHeader {
    fn default() -> Self {
        Self {
            identifier: MAGIC,
            major_version: 1,
            minor_version: 0,
            reserved_0c: Default::default(),
            date_created: Default::default(),
            date_modified: Default::default(),
            index_major_version: 7,
            index_entry_count: Default::default(),
            index_offset: HEADER_SIZE,
            index_size: Default::default(),
            hole_entry_count: Default::default(),
            hole_offset: Default::default(),
            hole_size: Default::default(),
            index_minor_version: Default::default(),
            reserved_40: Default::default(),
        }
    }
}

impl DbpfHeader {
    /// A fresh header stamped with `timestamp` as both creation and modification time
    pub fn with_timestamp(timestamp: u32) -> Self {
        Self {
            date_created: timestamp,
            date_modified: timestamp,
            ..Default::default()
        }
    }

    /// Check every field with a fixed value
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.identifier != MAGIC {
            return Err(FormatError::BadMagic(self.identifier));
        }

        for (field, expected, found) in [
            ("major version", 1, self.major_version),
            ("minor version", 0, self.minor_version),
            ("index major version", 7, self.index_major_version),
        ] {
            if found != expected {
                return Err(FormatError::UnsupportedVersion {
                    field,
                    expected,
                    found,
                });
            }
        }

        if self.index_size < self.index_entry_count.saturating_mul(INDEX_RECORD_SIZE) {
            return Err(FormatError::IndexSizeMismatch {
                count: self.index_entry_count,
                size: self.index_size,
            });
        }

        Ok(())
    }
}

/// DBPF index record
///
/// Locates one entry in the file
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct IndexRecord {
    /// Type ID of the entry
    pub type_id: u32,

    /// Group ID of the entry
    pub group_id: u32,

    /// Instance ID of the entry
    pub instance_id: u32,

    /// The offset to the data for this entry from the start of the file
    pub offset: u32,

    /// The size of this entry's data as stored in the file
    pub size: u32,
}

impl IndexRecord {
    /// Identity of the entry this record locates
    pub fn tgi(&self) -> Tgi {
        Tgi::new(self.type_id, self.group_id, self.instance_id)
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::BinRead;
    use binrw::BinWrite;
    use pretty_assertions::assert_eq;

    use crate::error::{FormatError, Result};
    use crate::tgi::Tgi;
    use crate::types::{DbpfHeader, IndexRecord, HEADER_SIZE};

    #[rustfmt::skip]
    fn header_bytes() -> Vec<u8> {
        let mut bytes = vec![
            b'D', b'B', b'P', b'F',
            0x01, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0xB0, 0x9E, 0x65,
            0x10, 0xB0, 0x9E, 0x65,
            0x07, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            0x80, 0x00, 0x00, 0x00,
            0x28, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];
        bytes.extend_from_slice(&[0u8; 32]);
        bytes
    }

    fn header() -> DbpfHeader {
        DbpfHeader {
            date_created: 0x659E_B000,
            date_modified: 0x659E_B010,
            index_entry_count: 2,
            index_offset: 0x80,
            index_size: 0x28,
            ..Default::default()
        }
    }

    #[test]
    fn read_header() -> Result<()> {
        let bytes = header_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE as usize);

        let actual = DbpfHeader::read(&mut Cursor::new(bytes))?;
        assert_eq!(actual, header());
        assert_eq!(actual.validate(), Ok(()));

        Ok(())
    }

    #[test]
    fn write_header() -> Result<()> {
        let mut actual = Vec::new();
        header().write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, header_bytes());

        Ok(())
    }

    #[test]
    fn validate_rejects_bad_magic() {
        let header = DbpfHeader {
            identifier: *b"DBPX",
            ..Default::default()
        };
        assert_eq!(header.validate(), Err(FormatError::BadMagic(*b"DBPX")));
    }

    #[test]
    fn validate_rejects_versions() {
        let header = DbpfHeader {
            major_version: 2,
            ..Default::default()
        };
        assert_eq!(
            header.validate(),
            Err(FormatError::UnsupportedVersion {
                field: "major version",
                expected: 1,
                found: 2
            })
        );

        let header = DbpfHeader {
            index_major_version: 3,
            ..Default::default()
        };
        assert!(matches!(
            header.validate(),
            Err(FormatError::UnsupportedVersion {
                field: "index major version",
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_short_index() {
        let header = DbpfHeader {
            index_entry_count: 3,
            index_size: 40,
            ..Default::default()
        };
        assert_eq!(
            header.validate(),
            Err(FormatError::IndexSizeMismatch { count: 3, size: 40 })
        );
    }

    #[test]
    fn read_record() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x4A, 0x28, 0x34, 0x65,
            0x93, 0xED, 0x21, 0x28,
            0x34, 0x12, 0x00, 0x00,
            0x60, 0x00, 0x00, 0x00,
            0x0B, 0x00, 0x00, 0x00,
        ]);

        let expected = IndexRecord {
            type_id: 0x6534_284A,
            group_id: 0x2821_ED93,
            instance_id: 0x1234,
            offset: 0x60,
            size: 11,
        };

        let actual = IndexRecord::read(&mut input)?;
        assert_eq!(actual, expected);
        assert_eq!(actual.tgi(), Tgi::new(0x6534_284A, 0x2821_ED93, 0x1234));

        Ok(())
    }

    #[test]
    fn write_record() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x0B, 0x96, 0x26, 0x20,
            0x01, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            0x60, 0x00, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x00,
        ];

        let record = IndexRecord {
            type_id: 0x2026_960B,
            group_id: 1,
            instance_id: 2,
            offset: 0x60,
            size: 0x10,
        };

        let mut actual = Vec::new();
        record.write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, expected);

        Ok(())
    }
}
