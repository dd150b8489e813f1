//! Payload decoder for XEX2 images.
//!
//! Expands the payload that follows the headers into the image the guest executes. Two
//! encodings are handled:
//!
//! - `NONE`: the payload is the image; exactly `image_size` bytes are copied.
//! - `BASIC`: the payload is a sequence of data runs. For every block `data_size` bytes are
//!   copied and then `zero_size` zero bytes are written, so sparse sections such as `.bss`
//!   don't take up space on disk.
//!
//! The destination is always exactly `image_size` bytes. All block sizes are checked against the
//! source and the destination before anything is written, so a corrupt block table never touches
//! guest memory.

use tracing::trace;

use crate::{xex::info::CompressionFormat, Error, Result};

/// Expands `source` into `destination` according to `format`.
///
/// # Arguments
/// * `format` - Payload encoding, from [`crate::xex::FileFormatInfo::format`]
/// * `source` - Payload bytes, starting at the module's header size
/// * `destination` - The image range in guest memory, `image_size` bytes long
///
/// # Errors
///
/// Returns [`crate::Error::Corrupt`] if the source holds fewer bytes than the encoding consumes,
/// or if a `BASIC` block table does not produce exactly `destination.len()` bytes.
pub fn decode(format: CompressionFormat<'_>, source: &[u8], destination: &mut [u8]) -> Result<()> {
    match format {
        CompressionFormat::None => decode_none(source, destination),
        CompressionFormat::Basic(blocks) => {
            let mut produced = 0usize;
            let mut consumed = 0usize;
            for block in blocks {
                produced = produced
                    .saturating_add(block.data_size as usize)
                    .saturating_add(block.zero_size as usize);
                consumed = consumed.saturating_add(block.data_size as usize);
            }

            if produced != destination.len() {
                return Err(Error::Corrupt {
                    expected: destination.len(),
                    actual: produced,
                });
            }

            if consumed > source.len() {
                return Err(Error::Corrupt {
                    expected: consumed,
                    actual: source.len(),
                });
            }

            let mut src = 0usize;
            let mut dst = 0usize;
            for block in blocks {
                let data_size = block.data_size as usize;
                let zero_size = block.zero_size as usize;

                destination[dst..dst + data_size].copy_from_slice(&source[src..src + data_size]);
                src += data_size;
                dst += data_size;

                destination[dst..dst + zero_size].fill(0);
                dst += zero_size;
            }

            trace!(
                "expanded {} blocks, {} payload bytes into {} image bytes",
                blocks.len(),
                src,
                dst
            );
            Ok(())
        }
    }
}

fn decode_none(source: &[u8], destination: &mut [u8]) -> Result<()> {
    let Some(payload) = source.get(..destination.len()) else {
        return Err(Error::Corrupt {
            expected: destination.len(),
            actual: source.len(),
        });
    };

    destination.copy_from_slice(payload);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xex::info::BasicBlock;

    const fn block(data_size: u32, zero_size: u32) -> BasicBlock {
        BasicBlock {
            data_size,
            zero_size,
        }
    }

    #[test]
    fn test_none_copies_image_size() {
        let source: Vec<u8> = (0u8..24).collect();
        let mut destination = [0xFFu8; 16];

        decode(CompressionFormat::None, &source, &mut destination).unwrap();
        assert_eq!(&destination[..], &source[..16]);
    }

    #[test]
    fn test_none_short_source() {
        let mut destination = [0u8; 16];
        let result = decode(CompressionFormat::None, &[1, 2, 3], &mut destination);

        assert!(matches!(
            result,
            Err(Error::Corrupt {
                expected: 16,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_basic_interleaves_zero_runs() {
        let blocks = [block(4, 4), block(4, 0)];
        let source = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x11];
        let mut destination = [0x55u8; 12];

        decode(CompressionFormat::Basic(&blocks), &source, &mut destination).unwrap();
        assert_eq!(
            destination,
            [0xAA, 0xBB, 0xCC, 0xDD, 0x00, 0x00, 0x00, 0x00, 0xEE, 0xFF, 0x00, 0x11]
        );
    }

    #[test]
    fn test_basic_size_mismatch() {
        let blocks = [block(4, 4), block(4, 0)];
        let source = [0u8; 8];
        let mut destination = [0x55u8; 16];

        let result = decode(CompressionFormat::Basic(&blocks), &source, &mut destination);
        assert!(matches!(
            result,
            Err(Error::Corrupt {
                expected: 16,
                actual: 12
            })
        ));
        // Nothing is written when the table is rejected
        assert_eq!(destination, [0x55u8; 16]);
    }

    #[test]
    fn test_basic_source_over_read() {
        let blocks = [block(8, 0), block(8, 0)];
        let source = [0u8; 12];
        let mut destination = [0u8; 16];

        let result = decode(CompressionFormat::Basic(&blocks), &source, &mut destination);
        assert!(matches!(
            result,
            Err(Error::Corrupt {
                expected: 16,
                actual: 12
            })
        ));
    }

    #[test]
    fn test_basic_huge_block_sizes() {
        let blocks = [block(u32::MAX, u32::MAX), block(u32::MAX, u32::MAX)];
        let mut destination = [0u8; 16];

        assert!(decode(CompressionFormat::Basic(&blocks), &[0u8; 16], &mut destination).is_err());
    }

    #[test]
    fn test_basic_empty_table() {
        let mut destination: [u8; 0] = [];
        decode(CompressionFormat::Basic(&[]), &[], &mut destination).unwrap();

        let mut destination = [0u8; 4];
        assert!(decode(CompressionFormat::Basic(&[]), &[1, 2, 3, 4], &mut destination).is_err());
    }
}
