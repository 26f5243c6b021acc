use thiserror::Error;

/// Widest field a single read or write can cover.
pub const MAX_BIT_WIDTH: u32 = 64;

/// A bit range that does not fit into the buffer or exceeds [`MAX_BIT_WIDTH`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bit range {offset}+{size} does not fit into {len_bits} bits")]
pub struct BitRangeError {
    pub offset: u32,
    pub size: u32,
    pub len_bits: u64,
}

fn check_range(len: usize, offset: u32, size: u32) -> Result<(), BitRangeError> {
    let len_bits = len as u64 * 8;
    let end = u64::from(offset) + u64::from(size);
    if size == 0 || size > MAX_BIT_WIDTH || end > len_bits {
        return Err(BitRangeError {
            offset,
            size,
            len_bits,
        });
    }
    Ok(())
}

/// Read `size` bits starting at `offset` and zero-extend them.
///
/// Bit 0 is the least significant bit of byte `offset / 8`; fields spanning
/// several bytes are little-endian.
pub fn read_bits(buf: &[u8], offset: u32, size: u32) -> Result<u64, BitRangeError> {
    check_range(buf.len(), offset, size)?;

    let mut value = 0u64;
    let mut done = 0u32;
    let mut pos = offset;
    while done < size {
        let byte = buf[(pos / 8) as usize];
        let shift = pos % 8;
        let take = (8 - shift).min(size - done);
        let mask = ((1u16 << take) - 1) as u8;
        let chunk = (byte >> shift) & mask;
        value |= u64::from(chunk) << done;
        done += take;
        pos += take;
    }
    Ok(value)
}

/// Write the low `size` bits of `value` starting at `offset`.
///
/// Bits outside the range are preserved.
pub fn write_bits(
    buf: &mut [u8],
    offset: u32,
    size: u32,
    value: u64,
) -> Result<(), BitRangeError> {
    check_range(buf.len(), offset, size)?;

    let mut rest = value;
    let mut done = 0u32;
    let mut pos = offset;
    while done < size {
        let idx = (pos / 8) as usize;
        let shift = pos % 8;
        let take = (8 - shift).min(size - done);
        let low = ((1u16 << take) - 1) as u8;
        let mask = low << shift;
        let chunk = ((rest as u8) & low) << shift;
        buf[idx] = (buf[idx] & !mask) | chunk;
        rest >>= take;
        done += take;
        pos += take;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_single_bits_lsb_first() {
        let buf = [0b0000_0101u8, 0x80];
        assert_eq!(read_bits(&buf, 0, 1), Ok(1));
        assert_eq!(read_bits(&buf, 1, 1), Ok(0));
        assert_eq!(read_bits(&buf, 2, 1), Ok(1));
        assert_eq!(read_bits(&buf, 15, 1), Ok(1));
    }

    #[test]
    fn reads_little_endian_words() {
        let buf = [0x34u8, 0x12, 0xff, 0x7f];
        assert_eq!(read_bits(&buf, 0, 16), Ok(0x1234));
        assert_eq!(read_bits(&buf, 16, 16), Ok(0x7fff));
        assert_eq!(read_bits(&buf, 0, 32), Ok(0x7fff_1234));
    }

    #[test]
    fn reads_unaligned_nibble_across_bytes() {
        // bits 6..10 = 0b1011
        let buf = [0b1100_0000u8, 0b0000_0010];
        assert_eq!(read_bits(&buf, 6, 4), Ok(0b1011));
    }

    #[test]
    fn rejects_out_of_range() {
        let buf = [0u8; 2];
        assert!(read_bits(&buf, 9, 8).is_err());
        assert!(read_bits(&buf, 0, 0).is_err());
        assert!(read_bits(&[0u8; 16], 0, 65).is_err());
        assert!(read_bits(&buf, 15, 1).is_ok());
    }

    #[test]
    fn write_preserves_neighbours() {
        let mut buf = [0xffu8, 0xff];
        write_bits(&mut buf, 4, 6, 0).unwrap();
        assert_eq!(buf, [0x0f, 0xfc]);
        write_bits(&mut buf, 4, 6, 0b10_1010).unwrap();
        assert_eq!(read_bits(&buf, 4, 6), Ok(0b10_1010));
        assert_eq!(buf[0] & 0x0f, 0x0f);
        assert_eq!(buf[1] & 0xfc, 0xfc);
    }

    #[test]
    fn write_truncates_to_width() {
        let mut buf = [0u8; 1];
        write_bits(&mut buf, 0, 3, 0xff).unwrap();
        assert_eq!(buf[0], 0b111);
    }

    #[test]
    fn full_width_round_trip() {
        let mut buf = [0u8; 9];
        write_bits(&mut buf, 3, 64, u64::MAX - 5).unwrap();
        assert_eq!(read_bits(&buf, 3, 64), Ok(u64::MAX - 5));
    }
}
