//! In-place byte reversal applied to every payload before it becomes readable.
//!
//! The transform is its own inverse: reversing the same region twice restores
//! the original bytes.

use tracing::trace;

/// Reverse the first `length` bytes of `region` in place.
///
/// Performs `length / 2` swaps and needs no scratch space. A `length` beyond
/// the end of `region` is clamped to `region.len()`; lengths 0 and 1 are no-ops.
///
/// # Example
///
/// ```
/// let mut phrase = *b"hello world";
/// revdev::transform::reverse(&mut phrase, 5);
/// assert_eq!(&phrase, b"olleh world");
/// ```
pub fn reverse(region: &mut [u8], length: usize) {
    let length = length.min(region.len());
    trace!(length, "reversing phrase");

    let mut front = 0;
    let mut back = length;
    while front + 1 < back {
        back -= 1;
        region.swap(front, back);
        front += 1;
    }
}

/// Reverse an entire slice in place.
#[inline]
pub fn reverse_all(region: &mut [u8]) {
    let length = region.len();
    reverse(region, length);
}

/// Return a reversed copy of `bytes`, leaving the input untouched.
#[must_use]
pub fn reversed(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    reverse_all(&mut out);
    out
}
