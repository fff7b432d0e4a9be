//! Named bit ranges inside a register and the pure codec that moves values in
//! and out of them.

use std::{fmt, ops::Range};

use crate::soc::bits;

/// Access policy of one field as seen by CPU writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FieldAccess {
    ReadOnly,
    WriteOnly,
    #[default]
    ReadWrite,
}

impl FieldAccess {
    pub fn is_readable(self) -> bool {
        !matches!(self, FieldAccess::WriteOnly)
    }

    pub fn is_writable(self) -> bool {
        !matches!(self, FieldAccess::ReadOnly)
    }
}

impl fmt::Display for FieldAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldAccess::ReadOnly => "RO",
            FieldAccess::WriteOnly => "WO",
            FieldAccess::ReadWrite => "RW",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    /// LSB position of the field inside the register.
    pub bit_offset: u32,
    pub bit_width: u32,
    pub access: FieldAccess,
    pub reset_value: u64,
}

impl FieldSpec {
    /// Read-write field covering `bit_width` bits from `bit_offset`, resetting to zero.
    pub fn new(name: impl Into<String>, bit_offset: u32, bit_width: u32) -> Self {
        Self {
            name: name.into(),
            bit_offset,
            bit_width,
            access: FieldAccess::ReadWrite,
            reset_value: 0,
        }
    }

    /// Field from an LSB0 half-open range, e.g. `1..3` for bits 1 and 2.
    pub fn from_lsb0_range(name: impl Into<String>, lsb0_range: Range<u32>) -> Self {
        let width = lsb0_range.end.saturating_sub(lsb0_range.start);
        Self::new(name, lsb0_range.start, width)
    }

    /// Field from an MSB0 half-open range as found in PowerPC-style manuals.
    pub fn from_msb0_range(
        name: impl Into<String>,
        register_bits: u32,
        msb0_range: Range<u32>,
    ) -> Self {
        let offset = register_bits.saturating_sub(msb0_range.end);
        let width = msb0_range.end.saturating_sub(msb0_range.start);
        Self::new(name, offset, width)
    }

    pub fn with_access(mut self, access: FieldAccess) -> Self {
        self.access = access;
        self
    }

    pub fn with_reset(mut self, reset_value: u64) -> Self {
        self.reset_value = reset_value;
        self
    }

    pub fn read_only(self) -> Self {
        self.with_access(FieldAccess::ReadOnly)
    }

    pub fn write_only(self) -> Self {
        self.with_access(FieldAccess::WriteOnly)
    }

    /// One past the most significant bit covered by the field.
    #[inline(always)]
    pub fn end_bit(&self) -> u32 {
        self.bit_offset.saturating_add(self.bit_width)
    }

    /// Right-aligned mask of the field's width.
    #[inline(always)]
    pub fn value_mask(&self) -> u64 {
        bits::mask_bits(self.bit_width)
    }

    /// Mask of the field's bits in register position.
    #[inline(always)]
    pub fn register_mask(&self) -> u64 {
        if self.bit_offset >= 64 {
            0
        } else {
            self.value_mask() << self.bit_offset
        }
    }

    /// True if `value` can be stored without truncation.
    #[inline(always)]
    pub fn fits(&self, value: u64) -> bool {
        value & !self.value_mask() == 0
    }

    #[inline(always)]
    pub fn decode(&self, raw: u64) -> u64 {
        bits::extract(raw, self.bit_offset, self.bit_width)
    }

    #[inline(always)]
    pub fn encode(&self, raw: u64, field_value: u64) -> u64 {
        bits::insert(raw, self.bit_offset, self.bit_width, field_value)
    }

    pub fn overlaps(&self, other: &FieldSpec) -> bool {
        self.register_mask() & other.register_mask() != 0
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bit_width == 1 {
            write!(f, "{}[{}] {}", self.name, self.bit_offset, self.access)
        } else {
            write!(
                f,
                "{}[{}:{}] {}",
                self.name,
                self.end_bit() - 1,
                self.bit_offset,
                self.access
            )
        }
    }
}
