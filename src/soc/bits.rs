//! Width-aware bit arithmetic shared by the field codec, the bank's bit
//! operations and the register report.

/// Returns a right-aligned mask of `len` ones, saturating at 64 bits.
#[inline]
pub fn mask_bits(len: u32) -> u64 {
    if len >= 64 {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

/// Extracts `width` bits starting at LSB offset `offset`, returned right-aligned.
#[inline]
pub fn extract(value: u64, offset: u32, width: u32) -> u64 {
    if width == 0 || offset >= 64 {
        return 0;
    }
    (value >> offset) & mask_bits(width)
}

/// Replaces `width` bits at `offset` in `original` with the low bits of `field`.
#[inline]
pub fn insert(original: u64, offset: u32, width: u32, field: u64) -> u64 {
    if width == 0 || offset >= 64 {
        return original;
    }
    let mask = mask_bits(width) << offset;
    (original & !mask) | ((field << offset) & mask)
}

/// Circular left shift within a `width`-bit container.
pub fn rotate_left(value: u64, count: u32, width: u32) -> u64 {
    let width = width.clamp(1, 64);
    let value = value & mask_bits(width);
    let count = count % width;
    if count == 0 {
        return value;
    }
    ((value << count) | (value >> (width - count))) & mask_bits(width)
}

/// Circular right shift within a `width`-bit container.
pub fn rotate_right(value: u64, count: u32, width: u32) -> u64 {
    let width = width.clamp(1, 64);
    let count = count % width;
    rotate_left(value, width - count, width)
}

#[inline]
pub fn count_ones(value: u64) -> u32 {
    value.count_ones()
}

/// Position of the least significant set bit.
#[inline]
pub fn first_set(value: u64) -> Option<u32> {
    (value != 0).then(|| value.trailing_zeros())
}

/// Position of the most significant set bit.
#[inline]
pub fn last_set(value: u64) -> Option<u32> {
    (value != 0).then(|| 63 - value.leading_zeros())
}

/// Renders `value` as a zero-padded `width`-bit binary string, MSB first, with a
/// space between every `group` bits (`group == 0` disables grouping).
pub fn binary_string(value: u64, width: u32, group: usize) -> String {
    let width = width.clamp(1, 64) as usize;
    let digits = format!("{:0width$b}", value & mask_bits(width as u32), width = width);
    if group == 0 || group >= width {
        return digits;
    }
    let mut out = String::with_capacity(width + width / group);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (width - index) % group == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}
