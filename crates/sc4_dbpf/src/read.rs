//! Types for reading DBPF files
//!

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use binrw::BinRead;
use indexmap::IndexMap;
use tracing::{debug, info, instrument, warn};

use crate::entry::{Entry, Payload};
use crate::error::{DataQualityError, EntryNotFoundError, Error, FormatError, Result};
use crate::tgi::{Tgi, TgiMask};
use crate::types::{DbpfHeader, IndexRecord, HEADER_SIZE, INDEX_RECORD_SIZE};

pub(crate) fn now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or_default()
}

/// A DBPF file held in memory
///
/// ```no_run
/// fn list_exemplars(path: &str) -> sc4_dbpf::error::Result<()> {
///     let mut dbpf = sc4_dbpf::DbpfFile::open(path)?;
///     dbpf.decode_all();
///
///     for entry in dbpf.iter() {
///         if let Some(exemplar) = entry.exemplar() {
///             println!("{}: {:?}", entry.tgi(), exemplar.exemplar_name());
///         }
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DbpfFile {
    pub(crate) path: Option<PathBuf>,
    pub(crate) header: DbpfHeader,
    pub(crate) entries: Vec<Entry>,
}

impl Default for DbpfFile {
    fn default() -> Self {
        Self::create()
    }
}

impl DbpfFile {
    /// An empty file that only exists in memory
    pub fn create() -> Self {
        Self {
            path: None,
            header: DbpfHeader::with_timestamp(now()),
            entries: Vec::new(),
        }
    }

    /// Read the file at `path`
    ///
    /// A path that does not exist yet gives an empty file which [`DbpfFile::save`] will
    /// create.
    #[instrument(skip(path), fields(path = %path.as_ref().display()), err)]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!("file does not exist, starting an empty one");
            return Ok(Self {
                path: Some(path.to_path_buf()),
                ..Self::create()
            });
        }

        let mut dbpf = Self::read(BufReader::new(File::open(path)?))?;
        dbpf.path = Some(path.to_path_buf());
        Ok(dbpf)
    }

    /// Read a file from memory
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read(Cursor::new(data))
    }

    /// Read a file from any seekable source
    ///
    /// The header and index are checked against the length of the source before any entry is
    /// read. Entries are not decoded.
    #[instrument(skip_all, err)]
    pub fn read<R: Read + Seek>(mut reader: R) -> Result<Self> {
        let length = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if length < HEADER_SIZE as u64 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }

        let header = DbpfHeader::read(&mut reader)?;
        header.validate()?;

        let index_end = header.index_offset as u64 + header.index_size as u64;
        if header.index_entry_count > 0 && index_end > length {
            return Err(FormatError::IndexOutOfBounds {
                offset: header.index_offset,
                size: header.index_size,
                length,
            }
            .into());
        }

        reader.seek(SeekFrom::Start(header.index_offset as u64))?;
        let records = (0..header.index_entry_count)
            .map(|_| IndexRecord::read(&mut reader).map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;

        let mut entries = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if record.offset as u64 + record.size as u64 > length {
                return Err(FormatError::EntryOutOfBounds {
                    tgi: record.tgi(),
                    offset: record.offset,
                    size: record.size,
                    length,
                }
                .into());
            }

            reader.seek(SeekFrom::Start(record.offset as u64))?;
            let mut data = vec![0u8; record.size as usize];
            reader.read_exact(&mut data)?;

            entries.push(Entry::from_file(record.tgi(), index, record.offset, data));
        }

        debug!(entries = entries.len(), "read index");

        Ok(Self {
            path: None,
            header,
            entries,
        })
    }

    /// Where the file was read from or will be saved to
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The header as read, or as last written
    pub fn header(&self) -> &DbpfHeader {
        &self.header
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the file has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the file if it were written now
    pub fn size(&self) -> u64 {
        HEADER_SIZE as u64
            + self
                .entries
                .iter()
                .map(|e| e.compressed_size() as u64 + INDEX_RECORD_SIZE as u64)
                .sum::<u64>()
    }

    /// Entries in index order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Iterate over the entries in index order
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Iterate mutably over the entries in index order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.iter_mut()
    }

    /// Identities of all entries in index order
    pub fn tgis(&self) -> impl Iterator<Item = Tgi> + '_ {
        self.entries.iter().map(Entry::tgi)
    }

    /// Entries whose identity matches `pattern`
    pub fn find<'a>(&'a self, pattern: &'a TgiMask) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries.iter().filter(move |e| e.tgi().matches(pattern))
    }

    /// Entry at `index`
    pub fn by_index(&self, index: usize) -> Result<&Entry> {
        self.entries
            .get(index)
            .ok_or(Error::EntryNotFound(EntryNotFoundError::Index(index)))
    }

    /// Mutable entry at `index`
    pub fn by_index_mut(&mut self, index: usize) -> Result<&mut Entry> {
        self.entries
            .get_mut(index)
            .ok_or(Error::EntryNotFound(EntryNotFoundError::Index(index)))
    }

    /// First entry with the instance ID `instance_id`
    pub fn by_instance(&self, instance_id: u32) -> Result<&Entry> {
        self.entries
            .iter()
            .find(|e| e.tgi().instance_id == instance_id)
            .ok_or(Error::EntryNotFound(EntryNotFoundError::Instance(instance_id)))
    }

    /// First entry with the identity `tgi`
    pub fn by_tgi(&self, tgi: &Tgi) -> Result<&Entry> {
        self.position(tgi).map(|i| &self.entries[i])
    }

    /// Mutable first entry with the identity `tgi`
    pub fn by_tgi_mut(&mut self, tgi: &Tgi) -> Result<&mut Entry> {
        let index = self.position(tgi)?;
        Ok(&mut self.entries[index])
    }

    fn position(&self, tgi: &Tgi) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.tgi() == *tgi)
            .ok_or(Error::EntryNotFound(EntryNotFoundError::Tgi(*tgi)))
    }

    fn reindex(&mut self) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            let offset = entry.offset();
            entry.set_position(index, offset);
        }
    }

    /// Append an entry to the end of the index
    pub fn add_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
        self.reindex();
    }

    /// Remove the entry at `index`
    pub fn remove_at(&mut self, index: usize) -> Result<Entry> {
        if index >= self.entries.len() {
            return Err(Error::EntryNotFound(EntryNotFoundError::Index(index)));
        }
        let entry = self.entries.remove(index);
        self.reindex();
        Ok(entry)
    }

    /// Remove the first entry with the identity `tgi`
    pub fn remove_by_tgi(&mut self, tgi: &Tgi) -> Result<Entry> {
        let index = self.position(tgi)?;
        self.remove_at(index)
    }

    /// Remove every entry whose identity matches `pattern`, returning how many were removed
    pub fn remove_all(&mut self, pattern: &TgiMask) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !e.tgi().matches(pattern));
        self.reindex();
        before - self.entries.len()
    }

    /// Decode every entry
    ///
    /// An entry that fails to decode is left as it was and the failure is added to its
    /// issues once, however often this is called. Returns the number of entries that failed.
    #[instrument(skip(self))]
    pub fn decode_all(&mut self) -> usize {
        let mut failed = 0;
        for entry in self.entries.iter_mut() {
            if let Err(e) = entry.decode() {
                failed += 1;
                entry.push_issue_once(DataQualityError::DecodeFailed(e.to_string()));
            }
        }
        if failed > 0 {
            warn!(failed, "some entries failed to decode");
        }
        failed
    }

    /// Rebuild the bytes of every decoded entry that has a payload
    ///
    /// Entries keep their expected compression state. Failures are added to the entry's
    /// issues, and the number of them is returned.
    #[instrument(skip(self))]
    pub fn encode_all(&mut self) -> usize {
        let mut failed = 0;
        for entry in self.entries.iter_mut() {
            if !entry.is_decoded() || matches!(entry.payload(), Payload::Opaque) {
                continue;
            }
            let compress = entry.is_compressed();
            if let Err(e) = entry.encode(compress) {
                failed += 1;
                entry.push_issue_once(DataQualityError::EncodeFailed(e.to_string()));
            }
        }
        failed
    }

    /// Data quality problems of every entry that has any, keyed by identity
    pub fn issues(&self) -> IndexMap<Tgi, Vec<DataQualityError>> {
        let mut issues: IndexMap<Tgi, Vec<DataQualityError>> = IndexMap::new();
        for entry in self.entries.iter().filter(|e| !e.issues().is_empty()) {
            issues
                .entry(entry.tgi())
                .or_default()
                .extend_from_slice(entry.issues());
        }
        issues
    }
}
