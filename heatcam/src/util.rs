// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

/// Check if the n-th bit is set.
///
/// Bits are 0-indexed, from the LSB.
pub(crate) fn is_bit_set<B>(value: B, index: usize) -> bool
where
    B: num_traits::PrimInt + num_traits::Unsigned,
{
    (value & (B::one() << index)) > B::zero()
}

/// Microseconds from `start` to `end`, clamped into a `u32`.
///
/// A clock that goes backwards yields zero rather than wrapping around.
pub(crate) fn micros_between(start: u64, end: u64) -> u32 {
    let elapsed = end.saturating_sub(start);
    u32::try_from(elapsed).unwrap_or(u32::MAX)
}
