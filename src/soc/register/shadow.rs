//! Register state tables and the named shadow sets used for bank switching.

use std::collections::BTreeMap;

use ahash::AHashMap;

/// Current value of one register instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterState {
    pub address: u64,
    pub raw_value: u64,
}

impl RegisterState {
    pub fn new(address: u64, raw_value: u64) -> Self {
        Self { address, raw_value }
    }
}

/// Visible state of a bank, ordered by address.
pub(crate) type StateTable = BTreeMap<u64, RegisterState>;

/// Named alternate mapping from address to register state. Sets may cover a
/// subset of the bank; activation only replaces the addresses they hold.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShadowSet {
    states: AHashMap<u64, RegisterState>,
}

impl ShadowSet {
    pub(crate) fn capture<'a>(states: impl IntoIterator<Item = &'a RegisterState>) -> Self {
        Self {
            states: states
                .into_iter()
                .map(|state| (state.address, *state))
                .collect(),
        }
    }

    pub(crate) fn stage(&mut self, address: u64, raw_value: u64) {
        self.states
            .insert(address, RegisterState::new(address, raw_value));
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, address: u64) -> Option<u64> {
        self.states.get(&address).map(|state| state.raw_value)
    }

    /// Builds the table that results from overlaying this set on `visible`.
    /// Addresses not present in `visible` are ignored.
    pub(crate) fn overlay(&self, visible: &StateTable) -> StateTable {
        let mut next = visible.clone();
        for (address, state) in &self.states {
            if let Some(slot) = next.get_mut(address) {
                *slot = *state;
            }
        }
        next
    }
}
