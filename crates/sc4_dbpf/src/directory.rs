//! The compressed entry directory.
//!
//! Lists the decompressed size of every QFS compressed entry in the file. It always has the
//! TGI [`DIRECTORY`](crate::tgi::DIRECTORY) and is itself never compressed.

use std::io::Cursor;

use binrw::{binrw, helpers::until_eof, BinRead, BinWrite};
use derive_more::Deref;
use indexmap::IndexMap;

use crate::error::{DataQualityError, Result};
use crate::tgi::Tgi;

/// Size of one [`DirectoryRecord`] in bytes
pub const RECORD_SIZE: usize = 16;

/// One line of the directory
#[binrw]
#[brw(little)]
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct DirectoryRecord {
    pub type_id: u32,
    pub group_id: u32,
    pub instance_id: u32,
    pub decompressed_size: u32,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Default)]
struct DirectoryBody {
    #[br(parse_with = until_eof)]
    records: Vec<DirectoryRecord>,
}

/// Decompressed sizes keyed by entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct Directory(IndexMap<Tgi, u32>);

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a directory body
    ///
    /// Bytes after the last whole record are reported and ignored.
    pub fn decode(data: &[u8]) -> Result<(Self, Vec<DataQualityError>)> {
        let mut issues = Vec::new();

        let whole = data.len() - data.len() % RECORD_SIZE;
        if whole != data.len() {
            issues.push(DataQualityError::TrailingBytes(data.len() - whole));
        }

        let body = DirectoryBody::read(&mut Cursor::new(&data[..whole]))?;
        let directory = body
            .records
            .into_iter()
            .map(|r| {
                (
                    Tgi::new(r.type_id, r.group_id, r.instance_id),
                    r.decompressed_size,
                )
            })
            .collect();

        Ok((Self(directory), issues))
    }

    /// Serialize the directory body
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = DirectoryBody {
            records: self
                .0
                .iter()
                .map(|(tgi, size)| DirectoryRecord {
                    type_id: tgi.type_id,
                    group_id: tgi.group_id,
                    instance_id: tgi.instance_id,
                    decompressed_size: *size,
                })
                .collect(),
        };

        let mut out = Cursor::new(Vec::with_capacity(self.0.len() * RECORD_SIZE));
        body.write(&mut out)?;
        Ok(out.into_inner())
    }

    /// Record the decompressed size of `tgi`
    pub fn insert(&mut self, tgi: Tgi, decompressed_size: u32) -> Option<u32> {
        self.0.insert(tgi, decompressed_size)
    }

    /// Forget `tgi`
    pub fn remove(&mut self, tgi: &Tgi) -> Option<u32> {
        self.0.shift_remove(tgi)
    }
}

impl FromIterator<(Tgi, u32)> for Directory {
    fn from_iter<T: IntoIterator<Item = (Tgi, u32)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
