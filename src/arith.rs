//! Modular arithmetic primitives.
//!
//! Every value the system produces is a fold of [`mul_mod`] calls, so this is the one
//! place where overflow has to be handled. Multiplication is done by binary double-and-add,
//! which keeps every intermediate value strictly below the modulus.

/// Add two residues modulo `m` without overflowing.
///
/// Both `a` and `b` must already be reduced, i.e. `a < m` and `b < m`.
fn add_mod(a: u64, b: u64, m: u64) -> u64 {
    if a >= m - b { a - (m - b) } else { a + b }
}

/// Compute `a * b mod m` for any 64-bit operands.
///
/// `a` is reduced once, then for every set bit of `b` the current power-of-two multiple
/// of `a` is added into the accumulator. The result is always in `0..m`.
///
/// # Panics
/// If `m` is zero.
pub fn mul_mod(a: u64, mut b: u64, m: u64) -> u64 {
    let mut a = a % m;
    let mut acc = 0;

    while b > 0 {
        if b & 1 == 1 {
            acc = add_mod(acc, a, m);
        }
        a = add_mod(a, a, m);
        b >>= 1;
    }

    acc
}

/// Product of every integer in `begin..=end`, modulo `m`.
///
/// An empty range (`begin > end`) yields the multiplicative identity reduced by `m`.
pub fn factorial(begin: u64, end: u64, m: u64) -> u64 {
    (begin..=end).fold(1 % m, |acc, i| mul_mod(acc, i, m))
}

/// Fold partial products into a single residue.
pub fn fold_mod<I>(values: I, m: u64) -> u64
where
    I: IntoIterator<Item = u64>,
{
    values.into_iter().fold(1 % m, |acc, v| mul_mod(acc, v, m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(a: u64, b: u64, m: u64) -> u64 {
        ((a as u128 * b as u128) % m as u128) as u64
    }

    #[test]
    fn small_operands() {
        assert_eq!(mul_mod(3, 4, 5), 2);
        assert_eq!(mul_mod(0, 12345, 7), 0);
        assert_eq!(mul_mod(12345, 0, 7), 0);
        assert_eq!(mul_mod(6, 7, 1), 0);
    }

    #[test]
    fn operands_near_u64_max() {
        let cases = [
            (u64::MAX, u64::MAX, u64::MAX),
            (u64::MAX, u64::MAX, u64::MAX - 1),
            (u64::MAX - 1, u64::MAX - 2, 1_000_000_007),
            (u64::MAX, 2, u64::MAX - 58),
            (1 << 63, 1 << 63, (1 << 63) + 1),
            (0xDEAD_BEEF_CAFE_BABE, 0x1234_5678_9ABC_DEF0, 0xFFFF_FFFF_FFFF_FFC5),
        ];

        for (a, b, m) in cases {
            assert_eq!(mul_mod(a, b, m), reference(a, b, m), "{a} * {b} mod {m}");
        }
    }

    #[test]
    fn matches_reference_over_a_spread_of_values() {
        let mut x: u64 = 0x9E37_79B9_7F4A_7C15;
        for _ in 0..500 {
            // xorshift
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            let a = x;
            let b = x.rotate_left(29);
            let m = (x.rotate_right(11) | 1).max(2);
            assert_eq!(mul_mod(a, b, m), reference(a, b, m));
        }
    }

    #[test]
    #[should_panic(expected = "remainder with a divisor of zero")]
    fn zero_modulus_panics() {
        mul_mod(1, 1, 0);
    }

    #[test]
    fn factorial_of_ranges() {
        assert_eq!(factorial(1, 10, 1000), 800);
        assert_eq!(factorial(1, 1, 7), 1);
        assert_eq!(factorial(5, 5, 3), 2);
        assert_eq!(factorial(1, 96, 97), 96);
    }

    #[test]
    fn fold_order_does_not_matter() {
        let m = 1_000_000_007;
        let partials = [123_456_789, 987_654_321, 42, 999_999_999, 7];
        let expected = fold_mod(partials, m);

        let mut reversed = partials;
        reversed.reverse();
        assert_eq!(fold_mod(reversed, m), expected);

        let mut rotated = partials;
        for _ in 0..partials.len() {
            rotated.rotate_left(1);
            assert_eq!(fold_mod(rotated, m), expected);
        }

        let mut swapped = partials;
        swapped.swap(0, 3);
        swapped.swap(1, 4);
        assert_eq!(fold_mod(swapped, m), expected);
    }

    #[test]
    fn fold_of_nothing_is_one() {
        assert_eq!(fold_mod([], 97), 1);
    }
}
