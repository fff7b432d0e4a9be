//! Register definitions and the layout table the bank compiles from them.

use std::fmt;

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::soc::bits;

use super::{
    error::{RegisterError, RegisterResult},
    field::FieldSpec,
};

pub type FieldList = SmallVec<[FieldSpec; 8]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegisterWidth {
    W8,
    W16,
    W32,
    W64,
}

impl RegisterWidth {
    #[inline(always)]
    pub fn bits(self) -> u32 {
        match self {
            RegisterWidth::W8 => 8,
            RegisterWidth::W16 => 16,
            RegisterWidth::W32 => 32,
            RegisterWidth::W64 => 64,
        }
    }

    #[inline(always)]
    pub fn mask(self) -> u64 {
        bits::mask_bits(self.bits())
    }
}

impl fmt::Display for RegisterWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterSpec {
    pub name: String,
    pub address: u64,
    pub width: RegisterWidth,
    pub fields: FieldList,
    pub reset_value: u64,
}

impl RegisterSpec {
    /// Register without fields; every bit is read-write.
    pub fn new(name: impl Into<String>, address: u64, width: RegisterWidth) -> Self {
        Self {
            name: name.into(),
            address,
            width,
            fields: SmallVec::new(),
            reset_value: 0,
        }
    }

    pub fn builder(name: impl Into<String>, address: u64, width: RegisterWidth) -> RegisterSpecBuilder {
        RegisterSpecBuilder::new(name, address, width)
    }
}

/// Accumulates fields for one register. Unless [`RegisterSpecBuilder::reset`] is
/// called, the register reset value is composed from the field reset values.
pub struct RegisterSpecBuilder {
    name: String,
    address: u64,
    width: RegisterWidth,
    fields: FieldList,
    reset_value: Option<u64>,
}

impl RegisterSpecBuilder {
    fn new(name: impl Into<String>, address: u64, width: RegisterWidth) -> Self {
        Self {
            name: name.into(),
            address,
            width,
            fields: SmallVec::new(),
            reset_value: None,
        }
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a read-write field over `offset..offset + width`.
    pub fn range(self, name: impl Into<String>, offset: u32, width: u32) -> Self {
        self.field(FieldSpec::new(name, offset, width))
    }

    pub fn reset(mut self, reset_value: u64) -> Self {
        self.reset_value = Some(reset_value);
        self
    }

    pub fn finish(self) -> RegisterSpec {
        let reset_value = self.reset_value.unwrap_or_else(|| {
            self.fields
                .iter()
                .fold(0, |raw, field| field.encode(raw, field.reset_value))
        });
        RegisterSpec {
            name: self.name,
            address: self.address,
            width: self.width,
            fields: self.fields,
            reset_value,
        }
    }
}

/// Validated register definition with a name index and precomputed access masks.
#[derive(Debug)]
pub(crate) struct RegisterLayout {
    pub(crate) spec: RegisterSpec,
    index: AHashMap<String, usize>,
    read_only_mask: u64,
}

impl RegisterLayout {
    pub(crate) fn compile(spec: RegisterSpec) -> RegisterResult<Self> {
        let width = spec.width.bits();
        if spec.reset_value & !spec.width.mask() != 0 {
            return Err(RegisterError::layout(
                &spec.name,
                format!("reset value 0x{:X} exceeds {}", spec.reset_value, spec.width),
            ));
        }

        let mut index = AHashMap::with_capacity(spec.fields.len());
        let mut claimed = 0u64;
        let mut read_only_mask = 0u64;
        for (position, field) in spec.fields.iter().enumerate() {
            if field.bit_width == 0 {
                return Err(RegisterError::layout(
                    &spec.name,
                    format!("field '{}' has zero width", field.name),
                ));
            }
            if field.end_bit() > width {
                return Err(RegisterError::layout(
                    &spec.name,
                    format!("field '{}' ends at bit {} beyond {}", field.name, field.end_bit(), spec.width),
                ));
            }
            let mask = field.register_mask();
            if claimed & mask != 0 {
                let other = spec.fields[..position]
                    .iter()
                    .find(|earlier| earlier.overlaps(field))
                    .map(|earlier| earlier.name.as_str())
                    .unwrap_or("?");
                return Err(RegisterError::layout(
                    &spec.name,
                    format!("field '{}' overlaps '{other}'", field.name),
                ));
            }
            if !field.fits(field.reset_value) {
                return Err(RegisterError::layout(
                    &spec.name,
                    format!("field '{}' reset value 0x{:X} exceeds its width", field.name, field.reset_value),
                ));
            }
            if field.decode(spec.reset_value) != field.reset_value {
                return Err(RegisterError::layout(
                    &spec.name,
                    format!(
                        "field '{}' resets to 0x{:X} but the register reset value holds 0x{:X}",
                        field.name,
                        field.reset_value,
                        field.decode(spec.reset_value)
                    ),
                ));
            }
            if index.insert(field.name.clone(), position).is_some() {
                return Err(RegisterError::layout(
                    &spec.name,
                    format!("field '{}' is declared twice", field.name),
                ));
            }
            claimed |= mask;
            if !field.access.is_writable() {
                read_only_mask |= mask;
            }
        }

        Ok(Self {
            spec,
            index,
            read_only_mask,
        })
    }

    #[inline(always)]
    pub(crate) fn address(&self) -> u64 {
        self.spec.address
    }

    #[inline(always)]
    pub(crate) fn width_mask(&self) -> u64 {
        self.spec.width.mask()
    }

    pub(crate) fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.index.get(name).map(|&position| &self.spec.fields[position])
    }

    pub(crate) fn fields(&self) -> &[FieldSpec] {
        &self.spec.fields
    }

    /// First read-only field touched by `mask`, in declaration order.
    pub(crate) fn read_only_hit(&self, mask: u64) -> Option<&FieldSpec> {
        if self.read_only_mask & mask == 0 {
            return None;
        }
        self.spec
            .fields
            .iter()
            .find(|field| !field.access.is_writable() && field.register_mask() & mask != 0)
    }
}
