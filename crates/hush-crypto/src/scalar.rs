//! Scalar reduction modulo the Ed25519 group order.
//!
//! ℓ = 2^252 + 27742317777372353535851937790883648493
//!
//! [`reduce32`] maps any 256-bit little-endian integer into `[0, ℓ)`. Any
//! 32-byte input is below 16ℓ, so four conditional subtractions of 8ℓ, 4ℓ, 2ℓ
//! and ℓ are enough. Every subtraction is computed and then kept or dropped
//! with a constant-time select, so timing does not depend on the input.

use subtle::{Choice, ConditionallySelectable};

/// Ed25519 group order ℓ, little-endian 64-bit limbs.
const L: [u64; 4] = [
    0x5812_631a_5cf5_d3ed,
    0x14de_f9de_a2f7_9cd6,
    0x0000_0000_0000_0000,
    0x1000_0000_0000_0000,
];

/// Ed25519 group order ℓ, little-endian bytes.
pub const GROUP_ORDER: [u8; 32] = [
    0xed, 0xd3, 0xf5, 0x5c, 0x1a, 0x63, 0x12, 0x58, 0xd6, 0x9c, 0xf7, 0xa2, 0xde, 0xf9, 0xde, 0x14,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10,
];

fn to_limbs(bytes: &[u8; 32]) -> [u64; 4] {
    let mut limbs = [0u64; 4];
    for (i, limb) in limbs.iter_mut().enumerate() {
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
        *limb = u64::from_le_bytes(word);
    }
    limbs
}

fn from_limbs(limbs: &[u64; 4]) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    for (i, limb) in limbs.iter().enumerate() {
        bytes[i * 8..i * 8 + 8].copy_from_slice(&limb.to_le_bytes());
    }
    bytes
}

/// Shift left by `shift` bits (0..64). Bits shifted past 2^256 are dropped;
/// callers only shift ℓ by at most 3, which stays below 2^256.
fn shl(limbs: &[u64; 4], shift: u32) -> [u64; 4] {
    if shift == 0 {
        return *limbs;
    }
    let mut out = [0u64; 4];
    for i in 0..4 {
        out[i] = limbs[i] << shift;
        if i > 0 {
            out[i] |= limbs[i - 1] >> (64 - shift);
        }
    }
    out
}

/// `a - b` with the final borrow (1 when `a < b`).
fn sub_with_borrow(a: &[u64; 4], b: &[u64; 4]) -> ([u64; 4], u64) {
    let mut out = [0u64; 4];
    let mut borrow = 0u64;
    for i in 0..4 {
        let (d1, b1) = a[i].overflowing_sub(b[i]);
        let (d2, b2) = d1.overflowing_sub(borrow);
        out[i] = d2;
        borrow = u64::from(b1 | b2);
    }
    (out, borrow)
}

/// Reduce a 32-byte little-endian integer modulo ℓ.
#[must_use]
pub fn reduce32(input: &[u8; 32]) -> [u8; 32] {
    let mut x = to_limbs(input);

    for shift in (0..4).rev() {
        let multiple = shl(&L, shift);
        let (diff, borrow) = sub_with_borrow(&x, &multiple);
        // No borrow means x >= multiple; keep the difference.
        let keep = Choice::from((borrow ^ 1) as u8);
        for i in 0..4 {
            x[i] = u64::conditional_select(&x[i], &diff[i], keep);
        }
    }

    from_limbs(&x)
}

/// Whether `bytes` is already a canonical scalar (strictly below ℓ).
#[must_use]
pub fn is_canonical(bytes: &[u8; 32]) -> bool {
    let (_, borrow) = sub_with_borrow(&to_limbs(bytes), &L);
    borrow == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_hex(s: &str) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&hex::decode(s).unwrap());
        out
    }

    #[test]
    fn test_group_order_matches_limbs() {
        assert_eq!(from_limbs(&L), GROUP_ORDER);
    }

    #[test]
    fn test_reduce_order_is_zero() {
        assert_eq!(reduce32(&GROUP_ORDER), [0u8; 32]);
    }

    #[test]
    fn test_reduce_below_order_is_identity() {
        let mut l_minus_one = GROUP_ORDER;
        l_minus_one[0] -= 1;
        assert_eq!(reduce32(&l_minus_one), l_minus_one);
        assert_eq!(reduce32(&[0u8; 32]), [0u8; 32]);
    }

    #[test]
    fn test_reduce_all_ones() {
        let expected = from_hex("1c95988d7431ecd670cf7d73f45befc6feffffffffffffffffffffffffffff0f");
        assert_eq!(reduce32(&[0xffu8; 32]), expected);
    }

    #[test]
    fn test_reduce_counting_bytes() {
        let input = from_hex("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f");
        let expected = from_hex("132d0ca6e9a1f3ae316c12682d132ffa0f1112131415161718191a1b1c1d1e0f");
        assert_eq!(reduce32(&input), expected);
    }

    #[test]
    fn test_reduce_eight_order_plus_five() {
        let input = from_hex("6d9faee7d21893c0b2e6bc17f5cef7a600000000000000000000000000000080");
        let mut expected = [0u8; 32];
        expected[0] = 5;
        assert_eq!(reduce32(&input), expected);
    }

    #[test]
    fn test_reduced_output_is_canonical() {
        assert!(is_canonical(&reduce32(&[0xffu8; 32])));
        assert!(!is_canonical(&GROUP_ORDER));
        assert!(!is_canonical(&[0xffu8; 32]));
    }
}
