use std::fmt;

use crate::soc::bits;

use super::{field::FieldAccess, spec::RegisterWidth};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldReport {
    pub name: String,
    pub bit_offset: u32,
    pub bit_width: u32,
    pub access: FieldAccess,
    /// `None` for write-only fields, whose contents are not readable.
    pub value: Option<u64>,
}

/// Point-in-time status of one register.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterReport {
    pub name: String,
    pub address: u64,
    pub width: RegisterWidth,
    pub value: u64,
    pub fields: Vec<FieldReport>,
    pub breakpoints: usize,
}

impl RegisterReport {
    pub fn set_bits(&self) -> u32 {
        bits::count_ones(self.value)
    }

    pub fn binary(&self) -> String {
        bits::binary_string(self.value, self.width.bits(), 4)
    }
}

impl fmt::Display for RegisterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = (self.width.bits() / 4) as usize;
        writeln!(f, "Register: {} ({}) @ 0x{:08X}", self.name, self.width, self.address)?;
        writeln!(f, "Value: 0x{:0digits$X} ({})", self.value, self.value, digits = digits)?;
        writeln!(f, "Binary: {}", self.binary())?;
        write!(f, "Set bits: {}", self.set_bits())?;
        if let (Some(first), Some(last)) = (bits::first_set(self.value), bits::last_set(self.value)) {
            write!(f, "\nFirst set bit: {first}\nLast set bit: {last}")?;
        }
        for field in &self.fields {
            let hi = field.bit_offset + field.bit_width - 1;
            write!(f, "\n  {:<12} [{hi:>2}:{:<2}] {}", field.name, field.bit_offset, field.access)?;
            match field.value {
                Some(value) => write!(f, " = 0x{value:X}")?,
                None => write!(f, " (write-only)")?,
            }
        }
        if self.breakpoints > 0 {
            write!(f, "\nBreakpoints: {}", self.breakpoints)?;
        }
        Ok(())
    }
}
