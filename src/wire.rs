//! Little-endian field access for the packed user-client structs.
//!
//! Callers check the buffer length up front; out-of-range offsets panic.

pub(crate) fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(word)
}

pub(crate) fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(word)
}

pub(crate) fn read_u32s<const N: usize>(buf: &[u8], offset: usize) -> [u32; N] {
    std::array::from_fn(|i| read_u32(buf, offset + i * 4))
}

pub(crate) fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn write_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn write_u32s(buf: &mut [u8], offset: usize, values: &[u32]) {
    for (i, value) in values.iter().enumerate() {
        write_u32(buf, offset + i * 4, *value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_are_little_endian() {
        let mut buf = [0u8; 16];
        write_u32(&mut buf, 0, 0x0403_0201);
        write_u64(&mut buf, 4, 0x0C0B_0A09_0807_0605);
        assert_eq!(&buf[..12], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        assert_eq!(read_u32s::<2>(&buf, 4), [0x0807_0605, 0x0C0B_0A09]);
    }
}
