#![allow(dead_code)]

use regbank::{BankConfig, EventLog, FieldSpec, RegisterBank, RegisterSpec, RegisterWidth};

pub const CTRL: u64 = 0x1000;
pub const STATUS: u64 = 0x1004;
pub const WIDE: u64 = 0x2000;

/// CTRL (ENABLE, MODE), STATUS (BUSY, RO READY) and a fieldless 64-bit WIDE.
pub fn control_bank() -> RegisterBank {
    let mut bank = RegisterBank::with_config(BankConfig::new("fixture").with_history(64));
    bank.register(
        RegisterSpec::builder("CTRL", CTRL, RegisterWidth::W32)
            .range("ENABLE", 0, 1)
            .range("MODE", 1, 2)
            .finish(),
    )
    .expect("register CTRL");
    bank.register(
        RegisterSpec::builder("STATUS", STATUS, RegisterWidth::W16)
            .range("BUSY", 0, 1)
            .field(FieldSpec::new("READY", 15, 1).read_only().with_reset(1))
            .finish(),
    )
    .expect("register STATUS");
    bank.register(RegisterSpec::new("WIDE", WIDE, RegisterWidth::W64))
        .expect("register WIDE");
    bank
}

/// Installs a fresh event recorder on `bank` and returns a handle to it.
pub fn record_events(bank: &mut RegisterBank) -> EventLog {
    let log = EventLog::new();
    bank.set_handler(log.clone());
    log
}
