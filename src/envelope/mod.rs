use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::warn;

use crate::errors::{Error, Result};

/// Byte order of the 8-byte block headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Default for Endian {
    fn default() -> Self {
        Endian::Little
    }
}

// Reads until the buffer is full or the stream ends, returning the byte
// count actually read.
fn read_fully<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        let n = input.read(&mut buf[filled..])?;

        if n == 0 {
            break;
        }

        filled += n;
    }

    Ok(filled)
}

/// Unwraps an LZ4 block stream: repeated 8-byte headers of
/// `{ uncompressed_u32, compressed_u32 }` followed by `compressed` bytes
/// of LZ4 block data. A compressed length of zero denotes a run of
/// `uncompressed` zero bytes.
///
/// Returns the number of bytes written. A block that decompresses to a
/// different size than declared is a warning, not an error; truncated
/// headers or payloads fail with [`Error::TruncatedStream`].
pub fn decode<R: Read, W: Write>(input: &mut R, output: &mut W, endian: Endian) -> Result<u64> {
    let mut written: u64 = 0;
    let mut block = 0usize;

    loop {
        let mut header = [0u8; 8];
        let got = read_fully(input, &mut header)?;

        if got == 0 {
            // A stream with no blocks at all is not a stream.
            if block == 0 {
                return Err(Error::TruncatedStream {
                    block: 0,
                    needed: 8,
                    got: 0,
                });
            }
            break;
        }

        if got < 8 {
            return Err(Error::TruncatedStream {
                block,
                needed: 8,
                got,
            });
        }

        let (uncompressed, compressed) = match endian {
            Endian::Little => (
                LittleEndian::read_u32(&header[..4]) as usize,
                LittleEndian::read_u32(&header[4..]) as usize,
            ),
            Endian::Big => (
                BigEndian::read_u32(&header[..4]) as usize,
                BigEndian::read_u32(&header[4..]) as usize,
            ),
        };

        if compressed == 0 {
            if uncompressed != 0 {
                output.write_all(&vec![0u8; uncompressed])?;
                written += uncompressed as u64;
            }
            block += 1;
            continue;
        }

        let mut payload = vec![0u8; compressed];
        let got = read_fully(input, &mut payload)?;

        if got < compressed {
            return Err(Error::TruncatedStream {
                block,
                needed: compressed,
                got,
            });
        }

        let data = lz4_flex::block::decompress(&payload, uncompressed)?;

        if data.len() != uncompressed {
            warn!(
                "block {} decompressed to {} bytes, expected {}",
                block,
                data.len(),
                uncompressed
            );
        }

        output.write_all(&data)?;
        written += data.len() as u64;
        block += 1;
    }

    Ok(written)
}

/// [`decode`] over an in-memory envelope.
pub fn decode_to_vec(data: &[u8], endian: Endian) -> Result<Vec<u8>> {
    let mut input = data;
    let mut output = Vec::new();

    decode(&mut input, &mut output, endian)?;

    Ok(output)
}

/// Decompresses `in_path` into `out_path`, returning the bytes written.
pub fn decode_file(in_path: &Path, out_path: &Path, endian: Endian) -> Result<u64> {
    let mut input = BufReader::new(File::open(in_path)?);
    let mut output = BufWriter::new(File::create(out_path)?);

    let written = decode(&mut input, &mut output, endian)?;

    output.flush()?;

    Ok(written)
}
