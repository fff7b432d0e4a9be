//! Small control/status register map used by the `regsim` binary and the
//! script tests.

use crate::soc::register::{
    BankConfig, FieldSpec, RegisterBank, RegisterResult, RegisterSpec, RegisterWidth,
};

pub const CTRL: u64 = 0x1000;
pub const STATUS: u64 = 0x1004;
pub const CONFIG: u64 = 0x1008;
pub const DATA: u64 = 0x100C;

pub fn demo_specs() -> Vec<RegisterSpec> {
    vec![
        RegisterSpec::builder("CTRL", CTRL, RegisterWidth::W32)
            .range("ENABLE", 0, 1)
            .range("MODE", 1, 2)
            .range("CLK_EN", 4, 1)
            .range("IRQ_EN", 8, 1)
            .field(FieldSpec::from_msb0_range("MASTER", 32, 0..1))
            .finish(),
        RegisterSpec::builder("STATUS", STATUS, RegisterWidth::W16)
            .field(FieldSpec::new("BUSY", 0, 1))
            .field(FieldSpec::new("ERROR", 1, 1))
            .field(FieldSpec::new("KICK", 4, 1).write_only())
            .field(FieldSpec::new("READY", 15, 1).read_only().with_reset(1))
            .finish(),
        RegisterSpec::builder("CONFIG", CONFIG, RegisterWidth::W16)
            .field(FieldSpec::new("MODE", 0, 2).with_reset(1))
            .field(FieldSpec::from_lsb0_range("COUNT", 2..6))
            .field(FieldSpec::from_lsb0_range("PRIORITY", 8..11))
            .field(FieldSpec::from_lsb0_range("STATE", 12..16))
            .finish(),
        RegisterSpec::new("DATA", DATA, RegisterWidth::W32),
    ]
}

pub fn demo_bank(config: BankConfig) -> RegisterResult<RegisterBank> {
    let mut bank = RegisterBank::with_config(config);
    for spec in demo_specs() {
        bank.register(spec)?;
    }
    Ok(bank)
}

/// Walkthrough executed by `regsim` when no script is given.
pub const DEMO_SCRIPT: &str = "\
# power-on state
dump
report 0x1004

# bring the block up bit by bit
set-bit 0x1000 0
set-bit 0x1000 4
set-bit 0x1000 8
set-bit 0x1000 31
write-field 0x1000 MODE 2
read-field 0x1000 MODE
report 0x1000

# access policy
write 0x1004 0x0
write-field 0x1000 MODE 4
write-field 0x1008 COUNT 0xF
read 0x1008

# breakpoints
break 0x1000 field MODE
break 0x100C equals 0xDEADBEEF
write-field 0x1000 MODE 2
write-field 0x1000 MODE 1
write 0x100C 0xDEADBEEF
rotate-left 0x100C 8
rotate-right 0x100C 8

# bank switching
save boot
write 0x100C 0xCAFEBABE
stage next 0x1008 0x0123
shadow next
activate boot
read 0x100C
activate next
read 0x1008
reset
dump
";
