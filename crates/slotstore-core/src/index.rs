/// Slot for `id` in a store of `capacity` slots.
///
/// Reads the id as a base-36 number the way `parseInt(id, 36)` does: leading
/// whitespace is skipped, then digits (`0-9`, `a-z`, case-insensitive) are
/// consumed up to the first character that is not one. For a UUID that is
/// the first eight hex digits. The result is reduced modulo `capacity` with
/// exact integer arithmetic. An id without a leading digit maps to slot 0.
///
/// There is deliberately no probing: distinct ids with the same index share
/// one slot and the later write evicts the earlier record.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn slot_index(id: &str, capacity: usize) -> usize {
    assert!(capacity > 0, "slot_index requires a non-zero capacity");
    let modulus = capacity as u128;
    id.trim_start()
        .chars()
        .map_while(|c| c.to_digit(36))
        .fold(0u128, |acc, digit| (acc * 36 + u128::from(digit)) % modulus) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_uses_first_segment() {
        // "1a" in base 36 is 46; everything after the first hyphen is ignored.
        assert_eq!(slot_index("1a-ffff-4fff-bfff-ffffffffffff", 1000), 46);
        assert_eq!(
            slot_index("0000001a-0000-4000-8000-000000000000", 1000),
            slot_index("0000001a-ffff-4fff-bfff-ffffffffffff", 1000)
        );
    }

    #[test]
    fn matches_plain_base36_mod_capacity() {
        // 0x… digits are valid base-36 digits: "ff" = 15 * 36 + 15 = 555.
        assert_eq!(slot_index("ff", 1000), 555);
        // "zz" = 35 * 36 + 35 = 1295 -> 295.
        assert_eq!(slot_index("zz", 1000), 295);
        // "3f2a9c1b" = 267_882_391_343 (base 36) -> 343.
        assert_eq!(slot_index("3f2a9c1b", 1000), 343);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(slot_index("ABCDEF12", 1000), slot_index("abcdef12", 1000));
    }

    #[test]
    fn leading_whitespace_skipped() {
        assert_eq!(slot_index("  zz", 1000), slot_index("zz", 1000));
    }

    #[test]
    fn no_leading_digit_maps_to_zero() {
        assert_eq!(slot_index("-abc", 1000), 0);
        assert_eq!(slot_index("", 1000), 0);
    }

    #[test]
    fn long_prefix_stays_exact() {
        // 36^30 overflows f64 precision; modular folding must not care.
        let id = "z".repeat(30);
        let expected = (0..30).fold(0u128, |acc, _| (acc * 36 + 35) % 997) as usize;
        assert_eq!(slot_index(&id, 997), expected);
    }

    #[test]
    fn deterministic() {
        let id = "c0ffee00-1234-4abc-8def-0123456789ab";
        let first = slot_index(id, 1000);
        for _ in 0..16 {
            assert_eq!(slot_index(id, 1000), first);
        }
        assert!(first < 1000);
    }
}
