//! Bounded trace of bank accesses.

use std::{collections::VecDeque, fmt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
    Reset,
    ShadowSwap,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            AccessKind::Read => "READ",
            AccessKind::Write => "WRITE",
            AccessKind::Reset => "RESET",
            AccessKind::ShadowSwap => "SHADOW",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessRecord {
    pub kind: AccessKind,
    pub address: u64,
    pub old: u64,
    pub new: u64,
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<6} 0x{:08X}: 0x{:X} -> 0x{:X}",
            self.kind, self.address, self.old, self.new
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct History {
    depth: usize,
    records: VecDeque<AccessRecord>,
}

impl History {
    pub(crate) fn new(depth: usize) -> Self {
        Self {
            depth,
            records: VecDeque::with_capacity(depth.min(1024)),
        }
    }

    pub(crate) fn record(&mut self, kind: AccessKind, address: u64, old: u64, new: u64) {
        if self.depth == 0 {
            return;
        }
        if self.records.len() == self.depth {
            self.records.pop_front();
        }
        self.records.push_back(AccessRecord {
            kind,
            address,
            old,
            new,
        });
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &AccessRecord> {
        self.records.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }
}
