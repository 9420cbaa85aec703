//! Types for writing DBPF files
//!

use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use binrw::BinWrite;
use bon::Builder;
use tracing::{debug, instrument, warn};

use crate::directory::Directory;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::read::{now, DbpfFile};
use crate::tgi::{TgiKind, DIRECTORY};
use crate::types::{IndexRecord, HEADER_SIZE, INDEX_RECORD_SIZE};

/// Options for how a DBPF file should be written
#[derive(Debug, Clone, Copy, Builder)]
pub struct SaveOptions {
    /// Stamp the header with the current time as its modification date
    #[builder(default = true)]
    pub update_timestamp: bool,

    /// Rebuild the directory entry from the compressed entries, if the file has one
    #[builder(default = true)]
    pub refresh_directory: bool,

    /// Compress entries that were compressed when read but have since been decoded
    #[builder(default = true)]
    pub restore_compression: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DbpfFile {
    /// Rebuild the directory entry from the entries that are currently compressed
    ///
    /// The directory is added when there are compressed entries and none exists, and
    /// removed when nothing is compressed.
    #[instrument(skip(self), err)]
    pub fn update_directory(&mut self) -> Result<()> {
        let directory: Directory = self
            .entries
            .iter()
            .filter(|e| e.kind() != TgiKind::Directory && e.is_compressed_now())
            .map(|e| (e.tgi(), e.decompressed_size()))
            .collect();

        let existing = self.entries.iter().position(|e| e.tgi() == DIRECTORY);
        match existing {
            Some(index) if directory.is_empty() => {
                debug!("nothing is compressed, removing directory");
                self.remove_at(index)?;
            }
            Some(index) => {
                debug!(entries = directory.len(), "refreshing directory");
                let offset = self.entries[index].offset();
                let mut entry = Entry::new_directory(directory)?;
                entry.set_position(index, offset);
                self.entries[index] = entry;
            }
            None if directory.is_empty() => {}
            None => {
                debug!(entries = directory.len(), "adding directory");
                self.add_entry(Entry::new_directory(directory)?);
            }
        }

        Ok(())
    }

    fn prepare(&mut self, options: &SaveOptions) -> Result<()> {
        if options.restore_compression {
            for entry in self.entries.iter_mut() {
                if entry.is_compressed() && !entry.is_compressed_now() {
                    if let Err(e) = entry.set_compressed(true) {
                        warn!(tgi = %entry.tgi(), "storing uncompressed: {e}");
                    }
                }
            }
        }

        if options.refresh_directory && self.entries.iter().any(|e| e.tgi() == DIRECTORY) {
            self.update_directory()?;
        }

        Ok(())
    }

    /// Write the whole file to `writer`
    ///
    /// Entries are laid out in index order right after the header, followed by the index.
    /// Entry offsets and the header are updated to match what was written.
    #[instrument(skip_all, err)]
    pub fn write<W: Write>(&mut self, mut writer: W, options: SaveOptions) -> Result<()> {
        self.prepare(&options)?;

        let mut offset = HEADER_SIZE;
        let mut records = Vec::with_capacity(self.entries.len());
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.set_position(index, offset);
            let tgi = entry.tgi();
            records.push(IndexRecord {
                type_id: tgi.type_id,
                group_id: tgi.group_id,
                instance_id: tgi.instance_id,
                offset,
                size: entry.compressed_size(),
            });
            offset = offset
                .checked_add(entry.compressed_size())
                .ok_or_else(|| Error::CustomError("file would exceed 4 GiB".to_string()))?;
        }

        let timestamp = now();
        let header = &mut self.header;
        header.index_entry_count = records.len() as u32;
        header.index_offset = offset;
        header.index_size = records.len() as u32 * INDEX_RECORD_SIZE;
        header.hole_entry_count = 0;
        header.hole_offset = 0;
        header.hole_size = 0;
        if header.date_created == 0 {
            header.date_created = timestamp;
        }
        if options.update_timestamp {
            header.date_modified = timestamp;
        }

        let mut head = Cursor::new(Vec::with_capacity(HEADER_SIZE as usize));
        self.header.write(&mut head)?;
        writer.write_all(head.get_ref())?;

        for entry in self.entries.iter() {
            writer.write_all(entry.data())?;
        }

        let mut index = Cursor::new(Vec::with_capacity(self.header.index_size as usize));
        for record in records.iter() {
            record.write(&mut index)?;
        }
        writer.write_all(index.get_ref())?;
        writer.flush()?;

        debug!(entries = records.len(), size = offset + self.header.index_size, "wrote file");

        Ok(())
    }

    /// Write the file back to the path it was opened from
    pub fn save(&mut self, options: SaveOptions) -> Result<()> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| Error::CustomError("file has no path to save to".to_string()))?;
        self.save_as(path, options)
    }

    /// Write the file to `path`, which becomes its path from then on
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()), err)]
    pub fn save_as(&mut self, path: impl AsRef<Path>, options: SaveOptions) -> Result<()> {
        let path = path.as_ref();

        let mut buffer = Vec::with_capacity(self.size() as usize);
        self.write(&mut buffer, options)?;

        let mut file = BufWriter::new(File::create(path)?);
        file.write_all(&buffer)?;
        file.flush()?;

        self.path = Some(path.to_path_buf());
        Ok(())
    }
}
