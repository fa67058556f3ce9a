//! Power consumption models.
pub mod aes;
pub mod hypotheses;

/// Number of differing bits among the `bits` lowest bits of `a` and `b`.
pub fn hamming_distance(a: usize, b: usize, bits: u32) -> usize {
    let mask = if bits >= usize::BITS {
        usize::MAX
    } else {
        (1 << bits) - 1
    };

    ((a ^ b) & mask).count_ones() as usize
}

/// Hamming distance between two bytes.
pub fn hd(a: u8, b: u8) -> u8 {
    hamming_distance(a.into(), b.into(), 8) as u8
}

#[cfg(test)]
mod tests {
    use super::{hamming_distance, hd};

    #[test]
    fn test_hd() {
        assert_eq!(hd(0x00, 0xff), 8);
        assert_eq!(hd(0b1010_0000, 0b0110_0001), 3);

        for a in 0..=255u8 {
            assert_eq!(hd(a, a), 0);
            for b in 0..=255u8 {
                assert_eq!(hd(a, b), hd(b, a));
                assert!(hd(a, b) <= 8);
            }
        }
    }

    #[test]
    fn test_hamming_distance_width() {
        assert_eq!(hamming_distance(0x1ff, 0x000, 8), 8);
        assert_eq!(hamming_distance(0x1ff, 0x000, 9), 9);
        assert_eq!(hamming_distance(0b1111, 0b0000, 2), 2);
        assert_eq!(hamming_distance(usize::MAX, 0, 64), usize::BITS as usize);
    }
}
