//! Entries stored in a DBPF file.
//!
//! An [`Entry`] owns the bytes of one index record together with the decoded form of those
//! bytes. Which decoder runs is decided by classifying the entry's TGI:
//!
//! | Classification       | Payload                 |
//! |----------------------|-------------------------|
//! | Exemplar or Cohort   | [`Payload::Exemplar`]   |
//! | LTEXT                | [`Payload::Text`]       |
//! | Directory            | [`Payload::Directory`]  |
//! | anything else        | [`Payload::Opaque`]     |

use std::borrow::Cow;

use tracing::{debug, instrument, warn};

use crate::directory::Directory;
use crate::error::{DataQualityError, Error, Result};
use crate::exemplar::Exemplar;
use crate::ltext::LText;
use crate::qfs;
use crate::tgi::{Tgi, TgiKind, DIRECTORY};

/// Decoded form of an entry
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// Exemplar or Cohort properties
    Exemplar(Exemplar),
    /// Localized text
    Text(LText),
    /// Decompressed sizes of the compressed entries in the file
    Directory(Directory),
    /// Bytes this crate does not interpret, or an entry that has not been decoded
    #[default]
    Opaque,
}

/// One entry of a DBPF file
#[derive(Debug, Clone)]
pub struct Entry {
    tgi: Tgi,
    kind: TgiKind,
    offset: u32,
    index: usize,
    decompressed_size: u32,
    is_compressed: bool,
    is_compressed_now: bool,
    decoded: bool,
    data: Vec<u8>,
    payload: Payload,
    issues: Vec<DataQualityError>,
}

impl Entry {
    /// An entry holding `data` as stored in a file
    ///
    /// QFS compression is detected from the bytes themselves.
    pub fn from_bytes(tgi: Tgi, data: Vec<u8>) -> Self {
        let is_compressed = qfs::is_compressed(&data);
        let decompressed_size = if is_compressed {
            qfs::decompressed_size(&data)
        } else {
            data.len()
        };

        Self {
            tgi,
            kind: tgi.classify(),
            offset: 0,
            index: 0,
            decompressed_size: decompressed_size as u32,
            is_compressed,
            is_compressed_now: is_compressed,
            decoded: false,
            data,
            payload: Payload::Opaque,
            issues: Vec::new(),
        }
    }

    pub(crate) fn from_file(tgi: Tgi, index: usize, offset: u32, data: Vec<u8>) -> Self {
        Self {
            index,
            offset,
            ..Self::from_bytes(tgi, data)
        }
    }

    fn from_payload(tgi: Tgi, payload: Payload, compress: bool) -> Result<Self> {
        let mut entry = Self {
            is_compressed: compress,
            decoded: true,
            payload,
            ..Self::from_bytes(tgi, Vec::new())
        };
        entry.encode(compress)?;
        Ok(entry)
    }

    /// A new Exemplar or Cohort entry
    pub fn new_exemplar(tgi: Tgi, exemplar: Exemplar, compress: bool) -> Result<Self> {
        Self::from_payload(tgi, Payload::Exemplar(exemplar), compress)
    }

    /// A new LTEXT entry
    pub fn new_text(tgi: Tgi, text: LText, compress: bool) -> Result<Self> {
        Self::from_payload(tgi, Payload::Text(text), compress)
    }

    /// A new directory entry, always stored uncompressed under [`DIRECTORY`]
    pub fn new_directory(directory: Directory) -> Result<Self> {
        Self::from_payload(DIRECTORY, Payload::Directory(directory), false)
    }

    /// Identity of the entry
    pub fn tgi(&self) -> Tgi {
        self.tgi
    }

    /// Classification of the TGI
    pub fn kind(&self) -> TgiKind {
        self.kind
    }

    /// Offset of the bytes in the file they were read from, or were last written to
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Position in the index table
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_position(&mut self, index: usize, offset: u32) {
        self.index = index;
        self.offset = offset;
    }

    /// Length of the bytes as they are stored
    pub fn compressed_size(&self) -> u32 {
        self.data.len() as u32
    }

    /// Length of the bytes once decompressed
    pub fn decompressed_size(&self) -> u32 {
        self.decompressed_size
    }

    /// Whether the entry is meant to be stored compressed
    pub fn is_compressed(&self) -> bool {
        self.is_compressed
    }

    /// Whether the bytes currently held are compressed
    pub fn is_compressed_now(&self) -> bool {
        self.is_compressed_now
    }

    /// Whether [`Entry::decode`] has completed
    pub fn is_decoded(&self) -> bool {
        self.decoded
    }

    /// Bytes as they are stored
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes with any compression removed
    pub fn decompressed_data(&self) -> Result<Cow<'_, [u8]>> {
        if self.is_compressed_now {
            Ok(Cow::Owned(qfs::decompress(&self.data)?))
        } else {
            Ok(Cow::Borrowed(&self.data))
        }
    }

    /// Decoded form, [`Payload::Opaque`] until decoded
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Mutable decoded form
    ///
    /// Changes only reach the stored bytes after [`Entry::encode`].
    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    /// Decoded Exemplar or Cohort
    pub fn exemplar(&self) -> Option<&Exemplar> {
        match &self.payload {
            Payload::Exemplar(exemplar) => Some(exemplar),
            _ => None,
        }
    }

    /// Mutable decoded Exemplar or Cohort
    pub fn exemplar_mut(&mut self) -> Option<&mut Exemplar> {
        match &mut self.payload {
            Payload::Exemplar(exemplar) => Some(exemplar),
            _ => None,
        }
    }

    /// Decoded text
    pub fn text(&self) -> Option<&LText> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Decoded directory
    pub fn directory(&self) -> Option<&Directory> {
        match &self.payload {
            Payload::Directory(directory) => Some(directory),
            _ => None,
        }
    }

    /// Data quality problems found while decoding
    pub fn issues(&self) -> &[DataQualityError] {
        &self.issues
    }

    pub(crate) fn push_issue(&mut self, issue: DataQualityError) {
        warn!(tgi = %self.tgi, "{issue}");
        self.issues.push(issue);
    }

    /// Record an issue unless the same one is already recorded
    pub(crate) fn push_issue_once(&mut self, issue: DataQualityError) {
        if !self.issues.contains(&issue) {
            self.push_issue(issue);
        }
    }

    /// Decompress the bytes if needed and decode them according to the classification
    ///
    /// Calling this again after it succeeded does nothing. Problems that leave part of the
    /// payload usable are collected in [`Entry::issues`] instead of failing.
    #[instrument(skip(self), fields(tgi = %self.tgi), err)]
    pub fn decode(&mut self) -> Result<()> {
        if self.decoded {
            return Ok(());
        }

        if self.is_compressed_now {
            self.data = qfs::decompress(&self.data)?;
            self.is_compressed_now = false;
        }
        self.decompressed_size = self.data.len() as u32;

        let invalid = |source| Error::InvalidPayload {
            tgi: self.tgi,
            source,
        };

        let (payload, issues) = match self.kind {
            kind if kind.is_exemplar() => {
                let (exemplar, issues) = Exemplar::decode(&self.data).map_err(invalid)?;
                (Payload::Exemplar(exemplar), issues)
            }
            TgiKind::LText => {
                let (text, issues) = LText::decode(&self.data);
                (Payload::Text(text), issues)
            }
            TgiKind::Directory => {
                let (directory, issues) = Directory::decode(&self.data)?;
                (Payload::Directory(directory), issues)
            }
            _ => (Payload::Opaque, Vec::new()),
        };

        debug!(kind = %self.kind, size = self.data.len(), "decoded entry");
        self.payload = payload;
        for issue in issues {
            self.push_issue(issue);
        }
        self.decoded = true;

        Ok(())
    }

    /// Rebuild the stored bytes from the payload
    ///
    /// Entries that were never decoded are decoded first. Opaque entries have no payload to
    /// rebuild from and fail with [`Error::Unsupported`]. Directory entries are never
    /// compressed.
    #[instrument(skip(self), fields(tgi = %self.tgi), err)]
    pub fn encode(&mut self, compress: bool) -> Result<()> {
        self.decode()?;

        let body = match &self.payload {
            Payload::Exemplar(exemplar) => exemplar.encode().map_err(|source| {
                Error::InvalidPayload {
                    tgi: self.tgi,
                    source,
                }
            })?,
            Payload::Text(text) => text.encode().map_err(|source| Error::InvalidPayload {
                tgi: self.tgi,
                source,
            })?,
            Payload::Directory(directory) => directory.encode()?,
            Payload::Opaque => {
                return Err(Error::Unsupported {
                    tgi: self.tgi,
                    kind: self.kind,
                })
            }
        };

        let compress = compress && self.kind != TgiKind::Directory;
        self.decompressed_size = body.len() as u32;
        self.data = if compress { qfs::compress(&body)? } else { body };
        self.is_compressed_now = compress;

        Ok(())
    }

    /// Compress or decompress the stored bytes without touching the payload
    ///
    /// This also becomes the entry's expected compression state.
    #[instrument(skip(self), fields(tgi = %self.tgi), err)]
    pub fn set_compressed(&mut self, compress: bool) -> Result<()> {
        if compress != self.is_compressed_now {
            self.data = if compress {
                qfs::compress(&self.data)?
            } else {
                qfs::decompress(&self.data)?
            };
            self.is_compressed_now = compress;
        }
        self.is_compressed = compress;

        Ok(())
    }
}
