//! This library handles reading, editing and creating **DBPF** files used by *SimCity 4*.
//!
//! # DBPF File Format Documentation
//!
//! DBPF ("Database Packed File") is the container the game keeps nearly all of its assets in.
//! Files usually carry the `.dat`, `.sc4lot`, `.sc4desc` or `.sc4model` extension. Every entry
//! is identified by three 32 bit numbers, its type, group and instance (TGI).
//!
//! ## File Structure
//!
//! A DBPF file consists of a 96 byte header, the entry data and an index table locating each
//! entry. The index is usually written last.
//!
//! | Offset (bytes) | Field                  | Description                                        |
//! |----------------|------------------------|----------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: "DBPF"                                    |
//! | 0x0004         | Major version          | 4 bytes: always 1                                  |
//! | 0x0008         | Minor version          | 4 bytes: always 0                                  |
//! | 0x000C         | Reserved               | 12 bytes                                           |
//! | 0x0018         | Date created           | 4 bytes: seconds since the unix epoch              |
//! | 0x001C         | Date modified          | 4 bytes: seconds since the unix epoch              |
//! | 0x0020         | Index major version    | 4 bytes: always 7                                  |
//! | 0x0024         | Index entry count      | 4 bytes: number of index records                   |
//! | 0x0028         | Index offset           | 4 bytes: offset of the index from the file start   |
//! | 0x002C         | Index size             | 4 bytes: size of the index in bytes                |
//! | 0x0030         | Hole entry count       | 4 bytes: number of hole records                    |
//! | 0x0034         | Hole offset            | 4 bytes: offset of the hole table                  |
//! | 0x0038         | Hole size              | 4 bytes: size of the hole table in bytes           |
//! | 0x003C         | Index minor version    | 4 bytes                                            |
//! | 0x0040         | Reserved               | 32 bytes                                           |
//!
//! ### Index
//!
//! The index holds one 20 byte record per entry:
//!
//! | Offset (bytes) | Field       | Description                                        |
//! |----------------|-------------|----------------------------------------------------|
//! | 0x0000         | Type ID     | 4 bytes                                            |
//! | 0x0004         | Group ID    | 4 bytes                                            |
//! | 0x0008         | Instance ID | 4 bytes                                            |
//! | 0x000C         | Offset      | 4 bytes: offset of the entry from the file start   |
//! | 0x0010         | Size        | 4 bytes: size of the entry as stored               |
//!
//! ### Entries
//!
//! Entry data may be compressed with QFS (see [`qfs`]). A file holding compressed entries
//! should also hold a directory entry ([`directory`]) listing their decompressed sizes.
//!
//! The TGI decides how an entry is interpreted ([`tgi`]). Exemplars and Cohorts
//! ([`exemplar`]) describe game objects through typed properties, LTEXT entries ([`ltext`])
//! hold localized strings. Everything else is kept as raw bytes.
//!
//! ## Additional Information
//!
//! - **Endianness**: Little-endian for all multi-byte integers, except the size in the QFS
//!   header
//! - **Compression**: QFS, also known as RefPack
//!

pub mod directory;
pub mod entry;
pub mod error;
pub mod exemplar;
pub mod ltext;
pub mod qfs;
pub mod read;
pub mod tgi;
pub mod types;
pub mod write;

pub use entry::{Entry, Payload};
pub use exemplar::Exemplar;
pub use read::DbpfFile;
pub use tgi::{Tgi, TgiKind, TgiMask};
pub use write::SaveOptions;
