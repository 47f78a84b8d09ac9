// compute complete u64 with lower address and high address
#[inline]
pub fn compute_u64(lower: u32, high: u32) -> u64 {
    ((high as u64) << 32) | (lower as u64)
}

// trim the NUL padding of a fixed-width on-disk string
pub fn trim_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).to_string()
}

#[cfg(test)]
mod tests {
    use super::{compute_u64, trim_nul};

    #[test]
    fn test_compute_u64() {
        assert_eq!(compute_u64(0x01, 0x01), 0x0000_0001_0000_0001);
        assert_eq!(compute_u64(0x00, 0x01), 0x0000_0001_0000_0000);
        assert_eq!(compute_u64(0x01, 0x00), 0x0000_0000_0000_0001);
    }

    #[test]
    fn test_trim_nul() {
        assert_eq!(trim_nul(b"rootfs\0\0\0\0"), "rootfs");
        assert_eq!(trim_nul(b"full"), "full");
        assert_eq!(trim_nul(b"\0\0"), "");
    }
}
