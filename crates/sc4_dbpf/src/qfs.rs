//! QFS (RefPack) compression and decompression.
//!
//! A QFS stream is laid out as
//!
//! | Offset (bytes) | Field             | Description                                          |
//! |----------------|-------------------|------------------------------------------------------|
//! | 0x0000         | Compressed Size   | 4 bytes: little endian length of the whole stream    |
//! | 0x0004         | Signature         | 2 bytes: `0x10 0xFB`                                 |
//! | 0x0006         | Uncompressed Size | 3 bytes: big endian length of the expanded data      |
//! | 0x0009         | Commands          | LZ77 command stream, ended by a `0xFC..=0xFF` byte   |
//!
//! Every command copies up to a few literal bytes from the stream and then copies a run
//! from earlier in the output:
//!
//! | Command      | Extra bytes | Literals               | Copy length                | Copy offset                          |
//! |--------------|-------------|------------------------|----------------------------|--------------------------------------|
//! | `0x00..0x7F` | c2          | `c & 3`                | `((c & 0x1C) >> 2) + 3`    | `((c & 0x60) << 3) + c2 + 1`         |
//! | `0x80..0xBF` | c2 c3       | `c2 >> 6`              | `(c & 0x3F) + 4`           | `((c2 & 0x3F) << 8) + c3 + 1`        |
//! | `0xC0..0xDF` | c2 c3 c4    | `c & 3`                | `((c & 0x0C) << 6) + c4 + 5` | `((c & 0x10) << 12) + (c2 << 8) + c3 + 1` |
//! | `0xE0..0xFB` | none        | `((c & 0x1F) << 2) + 4` | 0                         |                                      |
//! | `0xFC..0xFF` | none        | `c & 3`                | 0, end of stream           |                                      |

use tracing::instrument;

use crate::error::{CorruptStreamError, Error, Result};

/// The two bytes at offset 4 of every compressed stream
pub const SIGNATURE: [u8; 2] = [0x10, 0xFB];

/// Leading tag of uncompressed data whose bytes 4..6 happen to equal [`SIGNATURE`]
pub const FALSE_POSITIVE_TAG: [u8; 4] = *b"MEMO";

/// The largest input the 24 bit size field can describe
pub const MAX_UNCOMPRESSED_SIZE: usize = 0xFF_FFFF;

const HEADER_SIZE: usize = 9;

const MAX_OFFSET: usize = 0x20000;
const MAX_MATCH: usize = 0x404;
const MAX_LITERAL_RUN: usize = 112;

const HASH_BITS: u32 = 16;
const MAX_CHAIN: usize = 256;
const NO_POSITION: usize = usize::MAX;

/// Whether `data` starts with a QFS header
///
/// This is a heuristic: bytes 4..6 must hold the signature, except when the data
/// starts with [`FALSE_POSITIVE_TAG`].
pub fn is_compressed(data: &[u8]) -> bool {
    if data.len() < HEADER_SIZE || data[4..6] != SIGNATURE {
        return false;
    }

    data[0..4] != FALSE_POSITIVE_TAG
}

/// Size of `data` once expanded
///
/// For uncompressed data this is simply its length, otherwise it is read from the header.
pub fn decompressed_size(data: &[u8]) -> usize {
    if !is_compressed(data) {
        return data.len();
    }

    u32::from_be_bytes([0, data[6], data[7], data[8]]) as usize
}

/// Size recorded in the leading length field of a compressed stream
pub fn compressed_size(data: &[u8]) -> Option<usize> {
    is_compressed(data).then(|| u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize)
}

fn byte_at(data: &[u8], index: usize, position: usize) -> core::result::Result<usize, CorruptStreamError> {
    data.get(index)
        .map(|&b| b as usize)
        .ok_or(CorruptStreamError::SourceOverrun { position })
}

/// Expand a QFS stream
///
/// Data that is not compressed is returned as is.
#[instrument(skip_all, err, fields(size = data.len()))]
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    if !is_compressed(data) {
        return Ok(data.to_vec());
    }

    let expected = decompressed_size(data);
    let mut output = vec![0u8; expected];
    let mut src = HEADER_SIZE;
    let mut dst = 0usize;

    while src < data.len() {
        let position = src;
        let control = data[src] as usize;

        let (command_size, literals, length, offset) = match control {
            0x00..=0x7F => {
                let c2 = byte_at(data, src + 1, position)?;
                (
                    2,
                    control & 0x03,
                    ((control & 0x1C) >> 2) + 3,
                    ((control & 0x60) << 3) + c2 + 1,
                )
            }
            0x80..=0xBF => {
                let c2 = byte_at(data, src + 1, position)?;
                let c3 = byte_at(data, src + 2, position)?;
                (
                    3,
                    (c2 >> 6) & 0x03,
                    (control & 0x3F) + 4,
                    ((c2 & 0x3F) << 8) + c3 + 1,
                )
            }
            0xC0..=0xDF => {
                let c2 = byte_at(data, src + 1, position)?;
                let c3 = byte_at(data, src + 2, position)?;
                let c4 = byte_at(data, src + 3, position)?;
                (
                    4,
                    control & 0x03,
                    ((control & 0x0C) << 6) + c4 + 5,
                    ((control & 0x10) << 12) + (c2 << 8) + c3 + 1,
                )
            }
            0xE0..=0xFB => (1, ((control & 0x1F) << 2) + 4, 0, 0),
            _ => (1, control & 0x03, 0, 0),
        };
        src += command_size;

        if src + literals > data.len() {
            return Err(CorruptStreamError::SourceOverrun { position }.into());
        }
        if dst + literals > expected {
            return Err(CorruptStreamError::OutputOverflow { position, expected }.into());
        }
        output[dst..dst + literals].copy_from_slice(&data[src..src + literals]);
        src += literals;
        dst += literals;

        if length > 0 {
            if offset > dst {
                return Err(CorruptStreamError::BackReferenceOutOfRange {
                    offset,
                    position: dst,
                }
                .into());
            }
            if dst + length > expected {
                return Err(CorruptStreamError::OutputOverflow { position, expected }.into());
            }

            // The source range may overlap the bytes being written, so this has to go one
            // byte at a time.
            let mut from = dst - offset;
            for _ in 0..length {
                output[dst] = output[from];
                dst += 1;
                from += 1;
            }
        }

        if control >= 0xFC {
            break;
        }
    }

    if dst != expected {
        return Err(CorruptStreamError::LengthMismatch {
            expected,
            actual: dst,
        }
        .into());
    }

    Ok(output)
}

/// Compress `data` into a QFS stream
///
/// The output is not byte identical to the game's own compressor, but [`decompress`]
/// always restores the input.
#[instrument(skip_all, err, fields(size = data.len()))]
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() > MAX_UNCOMPRESSED_SIZE {
        return Err(Error::TooLarge(data.len()));
    }

    let mut output = Vec::with_capacity(HEADER_SIZE + data.len() / 2 + 16);
    output.extend_from_slice(&[0u8; 4]);
    output.extend_from_slice(&SIGNATURE);
    output.extend_from_slice(&(data.len() as u32).to_be_bytes()[1..]);

    let mut matcher = Matcher::new(data.len());
    let mut position = 0usize;
    let mut literal_start = 0usize;

    while position < data.len() {
        match matcher.longest_match(data, position) {
            Some((length, offset)) => {
                let pending = write_literal_runs(&mut output, &data[literal_start..position]);
                write_copy(&mut output, pending, length, offset);

                for p in position..position + length {
                    matcher.insert(data, p);
                }
                position += length;
                literal_start = position;
            }
            None => {
                matcher.insert(data, position);
                position += 1;
            }
        }
    }

    let pending = write_literal_runs(&mut output, &data[literal_start..]);
    output.push(0xFC | pending.len() as u8);
    output.extend_from_slice(pending);

    let total = output.len() as u32;
    output[0..4].copy_from_slice(&total.to_le_bytes());

    Ok(output)
}

/// Emits `0xE0..=0xFB` commands until at most three literals are left, returning those
fn write_literal_runs<'a>(output: &mut Vec<u8>, mut literals: &'a [u8]) -> &'a [u8] {
    while literals.len() > 3 {
        let run = (literals.len() & !0x03).min(MAX_LITERAL_RUN);
        output.push(0xE0 | ((run - 4) >> 2) as u8);
        output.extend_from_slice(&literals[..run]);
        literals = &literals[run..];
    }
    literals
}

/// Emits the smallest command able to carry the copy and up to three leading literals
fn write_copy(output: &mut Vec<u8>, literals: &[u8], length: usize, offset: usize) {
    let count = literals.len();
    let off = offset - 1;

    if length <= 10 && offset <= 0x400 {
        output.push((((off >> 3) & 0x60) | ((length - 3) << 2) | count) as u8);
        output.push(off as u8);
    } else if length <= 67 && offset <= 0x4000 {
        output.push((0x80 | (length - 4)) as u8);
        output.push(((count << 6) | (off >> 8)) as u8);
        output.push(off as u8);
    } else {
        let len = length - 5;
        output.push((0xC0 | ((off >> 12) & 0x10) | ((len >> 6) & 0x0C) | count) as u8);
        output.push((off >> 8) as u8);
        output.push(off as u8);
        output.push(len as u8);
    }

    output.extend_from_slice(literals);
}

fn encodable(length: usize, offset: usize) -> bool {
    match length {
        0..=2 => false,
        3 => offset <= 0x400,
        4 => offset <= 0x4000,
        _ => offset <= MAX_OFFSET,
    }
}

/// Hash chains over every 3 byte window seen so far
struct Matcher {
    head: Vec<usize>,
    prev: Vec<usize>,
}

impl Matcher {
    fn new(size: usize) -> Self {
        Self {
            head: vec![NO_POSITION; 1 << HASH_BITS],
            prev: vec![NO_POSITION; size],
        }
    }

    fn hash(data: &[u8], position: usize) -> usize {
        let key = (data[position] as u32) << 16
            | (data[position + 1] as u32) << 8
            | data[position + 2] as u32;
        (key.wrapping_mul(0x9E37_79B1) >> (32 - HASH_BITS)) as usize
    }

    fn insert(&mut self, data: &[u8], position: usize) {
        if position + 3 > data.len() {
            return;
        }
        let hash = Self::hash(data, position);
        self.prev[position] = self.head[hash];
        self.head[hash] = position;
    }

    fn longest_match(&self, data: &[u8], position: usize) -> Option<(usize, usize)> {
        if position + 3 > data.len() {
            return None;
        }

        let limit = MAX_MATCH.min(data.len() - position);
        let mut best: Option<(usize, usize)> = None;
        let mut candidate = self.head[Self::hash(data, position)];
        let mut chain = 0;

        while candidate != NO_POSITION && chain < MAX_CHAIN {
            let offset = position - candidate;
            if offset > MAX_OFFSET {
                break;
            }

            let length = data[candidate..]
                .iter()
                .zip(&data[position..position + limit])
                .take_while(|(a, b)| a == b)
                .count();

            if length > best.map_or(0, |(l, _)| l) && encodable(length, offset) {
                best = Some((length, offset));
                if length == limit {
                    break;
                }
            }

            candidate = self.prev[candidate];
            chain += 1;
        }

        best
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use proptest::collection::vec;
    use proptest::num;
    use proptest::prop_assert_eq;
    use test_strategy::proptest;

    use crate::error::{CorruptStreamError, Error, Result};
    use crate::qfs::{compress, compressed_size, decompress, decompressed_size, is_compressed};

    fn stream(size: u32, commands: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; 4];
        data.extend_from_slice(&[0x10, 0xFB]);
        data.extend_from_slice(&size.to_be_bytes()[1..]);
        data.extend_from_slice(commands);
        let total = data.len() as u32;
        data[0..4].copy_from_slice(&total.to_le_bytes());
        data
    }

    #[test]
    fn detects_signature() {
        let data = stream(0, &[0xFC]);
        assert!(is_compressed(&data));
        assert!(!is_compressed(b"EQZB1###"));
        assert!(!is_compressed(&[0x00, 0x00, 0x00, 0x00, 0x10, 0xFB]));
    }

    #[test]
    fn false_positive_tag_is_not_compressed() {
        #[rustfmt::skip]
        let data = [
            b'M', b'E', b'M', b'O',
            0x10, 0xFB,
            0x00, 0x00, 0x20,
            0x41, 0x42, 0x43,
        ];
        assert!(!is_compressed(&data));
        assert_eq!(decompressed_size(&data), data.len());
    }

    #[test]
    fn sizes() {
        let data = stream(0x01BE, &[0xFC]);
        assert_eq!(decompressed_size(&data), 446);
        assert_eq!(compressed_size(&data), Some(10));
        assert_eq!(decompressed_size(b"Hello"), 5);
        assert_eq!(compressed_size(b"Hello"), None);
    }

    #[test]
    fn literal_run_and_terminator() -> Result<()> {
        let data = stream(
            7,
            &[0xE0, b'a', b'b', b'c', b'd', 0xFF, b'e', b'f', b'g'],
        );
        assert_eq!(decompress(&data)?, b"abcdefg");
        Ok(())
    }

    #[test]
    fn short_copy_expands_runs() -> Result<()> {
        // one literal 'a', then copy 10 bytes from 1 byte back
        let data = stream(11, &[0x1D, 0x00, b'a', 0xFC]);
        assert_eq!(decompress(&data)?, b"aaaaaaaaaaa");
        Ok(())
    }

    #[test]
    fn medium_copy() -> Result<()> {
        // two literals "ab", then copy 6 bytes from 2 back
        let data = stream(8, &[0x82, 0x80, 0x01, b'a', b'b', 0xFC]);
        assert_eq!(decompress(&data)?, b"abababab");
        Ok(())
    }

    #[test]
    fn long_copy() -> Result<()> {
        // three literals "xyz", then copy 300 bytes from 3 back
        let len = 300 - 5;
        let control = 0xC0 | ((len >> 6) & 0x0C) as u8 | 0x03;
        let data = stream(303, &[control, 0x00, 0x02, len as u8, b'x', b'y', b'z', 0xFC]);

        let expected = b"xyz".repeat(101);
        assert_eq!(decompress(&data)?, expected);
        Ok(())
    }

    #[test]
    fn uncompressed_passes_through() -> Result<()> {
        assert_eq!(decompress(b"plain bytes")?, b"plain bytes");
        Ok(())
    }

    #[test]
    fn back_reference_before_start() {
        let data = stream(4, &[0x04, 0x05, b'a', 0xFC]);
        let result = decompress(&data);
        assert!(matches!(
            result,
            Err(Error::CorruptStream(
                CorruptStreamError::BackReferenceOutOfRange { .. }
            ))
        ));
    }

    #[test]
    fn truncated_command() {
        let data = stream(4, &[0xC0, 0x00]);
        assert!(matches!(
            decompress(&data),
            Err(Error::CorruptStream(CorruptStreamError::SourceOverrun { .. }))
        ));
    }

    #[test]
    fn output_overflow() {
        let data = stream(2, &[0xE0, b'a', b'b', b'c', b'd', 0xFC]);
        assert!(matches!(
            decompress(&data),
            Err(Error::CorruptStream(CorruptStreamError::OutputOverflow { .. }))
        ));
    }

    #[test]
    fn short_output() {
        let data = stream(9, &[0xE0, b'a', b'b', b'c', b'd', 0xFC]);
        assert!(matches!(
            decompress(&data),
            Err(Error::CorruptStream(CorruptStreamError::LengthMismatch {
                expected: 9,
                actual: 4
            }))
        ));
    }

    #[test]
    fn compress_empty() -> Result<()> {
        let compressed = compress(&[])?;
        assert_eq!(
            compressed,
            vec![0x0A, 0x00, 0x00, 0x00, 0x10, 0xFB, 0x00, 0x00, 0x00, 0xFC]
        );
        assert_eq!(decompress(&compressed)?, Vec::<u8>::new());
        Ok(())
    }

    #[test]
    fn compress_repetitive_data_shrinks() -> Result<()> {
        let data = b"DataView: Parks Aura ".repeat(64);
        let compressed = compress(&data)?;

        assert!(is_compressed(&compressed));
        assert!(compressed.len() < data.len() / 4);
        assert_eq!(compressed_size(&compressed), Some(compressed.len()));
        assert_eq!(decompressed_size(&compressed), data.len());
        assert_eq!(decompress(&compressed)?, data);
        Ok(())
    }

    #[test]
    fn compress_uses_far_references() -> Result<()> {
        let block: Vec<u8> = (0..2000u32).map(|i| (i * 7 % 251) as u8).collect();
        let mut data = block.clone();
        data.extend((0..70_000u32).map(|i| (i % 13) as u8));
        data.extend_from_slice(&block);

        let compressed = compress(&data)?;
        assert_eq!(decompress(&compressed)?, data);
        Ok(())
    }

    #[test]
    fn compress_too_large() {
        let data = vec![0u8; 0x100_0000];
        assert!(matches!(compress(&data), Err(Error::TooLarge(0x100_0000))));
    }

    #[proptest]
    fn symmetrical_read_write(#[strategy(vec(num::u8::ANY, 0..2000))] data: Vec<u8>) {
        let compressed = compress(&data).unwrap();

        let got = decompress(&compressed).unwrap();

        prop_assert_eq!(data, got);
    }

    #[proptest]
    fn symmetrical_read_write_low_entropy(
        #[strategy(vec(0u8..4, 0..4000))] data: Vec<u8>,
    ) {
        let compressed = compress(&data).unwrap();

        let got = decompress(&compressed).unwrap();

        prop_assert_eq!(data, got);
    }
}
