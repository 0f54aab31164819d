//! 32-bit extension of a narrower free running counter

use crate::hal::timer::HardwareTick;

/// Return the 32-bit time for counter value `cur` given the last known time.
///
/// Valid as long as the counter wrapped at most once since `last`.
#[inline(always)]
pub fn extend<T: HardwareTick>(last: u32, cur: T) -> u32 {
    if T::BITS >= 32 {
        return cur.widen();
    }
    let span = 1u32 << T::BITS;
    let low_mask = span - 1;
    let mut high = last & !low_mask;
    if cur.widen() < last & low_mask {
        high = high.wrapping_add(span);
    }
    high | cur.widen()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_same_period() {
        assert_eq!(extend(0x0002_1000, 0x2000u16), 0x0002_2000);
        assert_eq!(extend(0x0002_1000, 0x1000u16), 0x0002_1000);
    }

    #[test]
    fn test_extend_one_wrap() {
        assert_eq!(extend(0x0002_ff00, 0x0010u16), 0x0003_0010);
    }

    #[test]
    fn test_extend_wraps_whole_timeline() {
        assert_eq!(extend(0xffff_ff00, 0x0001u16), 0x0000_0001);
    }

    #[test]
    fn test_extend_wide_counter_is_identity() {
        assert_eq!(extend(0x1234_5678, 0x0000_0010u32), 0x0000_0010);
        assert_eq!(extend(0, 0xdead_beefu32), 0xdead_beef);
    }

    #[test]
    fn test_extend_sequence_is_monotonic() {
        let mut last = 0u32;
        let mut cur = 0u16;
        for _ in 0..1000 {
            cur = cur.wrapping_add(4000);
            let next = extend(last, cur);
            assert!(crate::sched::is_before(last, next));
            last = next;
        }
        assert_eq!(last, 4_000_000);
    }
}
