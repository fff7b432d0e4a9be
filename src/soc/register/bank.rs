//! RegisterBank owns register definitions, their current values, breakpoints and
//! shadow sets. Every access goes through it, so it is the single place where
//! access policy is enforced and breakpoints are evaluated.
use std::{collections::BTreeMap, sync::Arc};

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::soc::{bits, device::AccessContext};

use super::{
    breakpoint::{BreakCondition, Breakpoint, BreakpointEvent, BreakpointHandler, BreakpointId},
    config::BankConfig,
    error::{RegisterError, RegisterResult},
    field::FieldSpec,
    history::{AccessKind, AccessRecord, History},
    report::{FieldReport, RegisterReport},
    shadow::{RegisterState, ShadowSet, StateTable},
    spec::{RegisterLayout, RegisterSpec},
};

type EventBuffer = SmallVec<[BreakpointEvent; 4]>;

pub struct RegisterBank {
    config: BankConfig,
    layouts: BTreeMap<u64, RegisterLayout>,
    // Replaced wholesale on shadow activation so readers never see a partial swap.
    state: Arc<StateTable>,
    shadows: AHashMap<String, ShadowSet>,
    // Registration order is evaluation order.
    breakpoints: Vec<(BreakpointId, Breakpoint)>,
    next_breakpoint: u64,
    handler: Option<Box<dyn BreakpointHandler>>,
    history: History,
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBank {
    pub fn new() -> Self {
        Self::with_config(BankConfig::default())
    }

    pub fn with_config(config: BankConfig) -> Self {
        let history = History::new(config.history_depth);
        Self {
            config,
            layouts: BTreeMap::new(),
            state: Arc::new(StateTable::new()),
            shadows: AHashMap::new(),
            breakpoints: Vec::new(),
            next_breakpoint: 0,
            handler: None,
            history,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    pub fn contains(&self, address: u64) -> bool {
        self.layouts.contains_key(&address)
    }

    pub fn spec(&self, address: u64) -> Option<&RegisterSpec> {
        self.layouts.get(&address).map(|layout| &layout.spec)
    }

    /// Register definitions in address order.
    pub fn specs(&self) -> impl Iterator<Item = &RegisterSpec> {
        self.layouts.values().map(|layout| &layout.spec)
    }

    pub fn field_spec(&self, address: u64, field: &str) -> RegisterResult<&FieldSpec> {
        self.layout(address)?
            .field(field)
            .ok_or_else(|| RegisterError::UnknownField {
                address,
                field: field.to_string(),
            })
    }

    /// Installs the breakpoint handler, returning the previous one.
    pub fn set_handler(
        &mut self,
        handler: impl BreakpointHandler + 'static,
    ) -> Option<Box<dyn BreakpointHandler>> {
        self.handler.replace(Box::new(handler))
    }

    pub fn take_handler(&mut self) -> Option<Box<dyn BreakpointHandler>> {
        self.handler.take()
    }

    /// Swaps in an already boxed handler (or none), returning the previous one.
    pub fn replace_handler(
        &mut self,
        handler: Option<Box<dyn BreakpointHandler>>,
    ) -> Option<Box<dyn BreakpointHandler>> {
        std::mem::replace(&mut self.handler, handler)
    }
}

// Registration and value access.
impl RegisterBank {
    pub fn register(&mut self, spec: RegisterSpec) -> RegisterResult<()> {
        if self.layouts.contains_key(&spec.address) {
            return Err(RegisterError::DuplicateAddress {
                address: spec.address,
            });
        }
        let layout = RegisterLayout::compile(spec)?;
        let address = layout.address();
        let reset = layout.spec.reset_value;
        log::debug!(
            "{}: registered '{}' at 0x{address:08X} ({}, {} fields, reset 0x{reset:X})",
            self.config.name,
            layout.spec.name,
            layout.spec.width,
            layout.spec.fields.len()
        );
        Arc::make_mut(&mut self.state).insert(address, RegisterState::new(address, reset));
        self.layouts.insert(address, layout);
        Ok(())
    }

    pub fn read(&mut self, address: u64) -> RegisterResult<u64> {
        self.read_with(address, AccessContext::CPU)
    }

    pub fn read_with(&mut self, address: u64, ctx: AccessContext) -> RegisterResult<u64> {
        let value = self.current(address)?;
        if ctx.has_side_effects() {
            log::trace!("{}: read 0x{address:08X} -> 0x{value:X}", self.config.name);
            self.history.record(AccessKind::Read, address, value, value);
            let events = read_events(&self.breakpoints, address, value);
            self.dispatch(address, events)?;
        }
        Ok(value)
    }

    /// Full-width write.
    pub fn write(&mut self, address: u64, value: u64) -> RegisterResult<()> {
        self.write_with(address, value, u64::MAX, AccessContext::CPU)
    }

    /// Updates only the bits selected by `mask`; all other bits keep their value.
    pub fn write_masked(&mut self, address: u64, value: u64, mask: u64) -> RegisterResult<()> {
        self.write_with(address, value, mask, AccessContext::CPU)
    }

    pub fn write_with(
        &mut self,
        address: u64,
        value: u64,
        mask: u64,
        ctx: AccessContext,
    ) -> RegisterResult<()> {
        let layout = self
            .layouts
            .get(&address)
            .ok_or(RegisterError::UnknownAddress { address })?;
        let mask = mask & layout.width_mask();
        if !ctx.debug {
            if let Some(field) = layout.read_only_hit(mask) {
                return Err(RegisterError::WriteToReadOnly {
                    address,
                    field: field.name.clone(),
                });
            }
        }

        let table = Arc::make_mut(&mut self.state);
        let slot = table
            .get_mut(&address)
            .ok_or(RegisterError::UnknownAddress { address })?;
        let old = slot.raw_value;
        let new = (old & !mask) | (value & mask);
        slot.raw_value = new;

        if !ctx.has_side_effects() {
            log::trace!("{}: debug write 0x{address:08X}: 0x{old:X} -> 0x{new:X}", self.config.name);
            return Ok(());
        }
        log::trace!(
            "{}: write 0x{address:08X} mask 0x{mask:X}: 0x{old:X} -> 0x{new:X}",
            self.config.name
        );
        self.history.record(AccessKind::Write, address, old, new);
        let events = write_events(&self.breakpoints, layout, old, new);
        self.dispatch(address, events)
    }

    pub fn read_field(&mut self, address: u64, field: &str) -> RegisterResult<u64> {
        self.read_field_with(address, field, AccessContext::CPU)
    }

    pub fn read_field_with(
        &mut self,
        address: u64,
        field: &str,
        ctx: AccessContext,
    ) -> RegisterResult<u64> {
        let spec = self.field_spec(address, field)?.clone();
        let raw = self.read_with(address, ctx)?;
        Ok(spec.decode(raw))
    }

    pub fn write_field(&mut self, address: u64, field: &str, value: u64) -> RegisterResult<()> {
        self.write_field_with(address, field, value, AccessContext::CPU)
    }

    pub fn write_field_with(
        &mut self,
        address: u64,
        field: &str,
        value: u64,
        ctx: AccessContext,
    ) -> RegisterResult<()> {
        let spec = self.field_spec(address, field)?;
        if !spec.fits(value) {
            return Err(RegisterError::ValueOutOfRange {
                address,
                field: field.to_string(),
                value,
                width: spec.bit_width,
            });
        }
        let (shifted, mask) = (value << spec.bit_offset, spec.register_mask());
        self.write_with(address, shifted, mask, ctx)
    }

    /// Restores one register, or every register when `address` is `None`, to its
    /// reset value. Resets never evaluate breakpoints.
    pub fn reset(&mut self, address: Option<u64>) -> RegisterResult<()> {
        match address {
            Some(address) => {
                let reset = self.layout(address)?.spec.reset_value;
                self.restore(address, reset);
                log::debug!("{}: reset 0x{address:08X} to 0x{reset:X}", self.config.name);
            }
            None => {
                let resets: SmallVec<[(u64, u64); 16]> = self
                    .layouts
                    .values()
                    .map(|layout| (layout.address(), layout.spec.reset_value))
                    .collect();
                for (address, reset) in resets {
                    self.restore(address, reset);
                }
                log::debug!("{}: reset all {} registers", self.config.name, self.layouts.len());
            }
        }
        Ok(())
    }

    pub fn reset_all(&mut self) {
        // `None` cannot fail.
        let _ = self.reset(None);
    }

    /// Copy-out of every register value in address order.
    pub fn snapshot(&self) -> Vec<RegisterState> {
        self.state.values().copied().collect()
    }
}

// Bit helpers routed through the masked write path.
impl RegisterBank {
    pub fn set_bit(&mut self, address: u64, bit: u32) -> RegisterResult<()> {
        let mask = self.bit_mask(address, bit)?;
        self.write_masked(address, mask, mask)
    }

    pub fn clear_bit(&mut self, address: u64, bit: u32) -> RegisterResult<()> {
        let mask = self.bit_mask(address, bit)?;
        self.write_masked(address, 0, mask)
    }

    pub fn toggle_bit(&mut self, address: u64, bit: u32) -> RegisterResult<()> {
        let mask = self.bit_mask(address, bit)?;
        let current = self.current(address)?;
        self.write_masked(address, !current, mask)
    }

    pub fn test_bit(&mut self, address: u64, bit: u32) -> RegisterResult<bool> {
        let mask = self.bit_mask(address, bit)?;
        Ok(self.read(address)? & mask != 0)
    }

    /// Circular left shift within the register width. Only the bits that move
    /// are written, so read-only fields block the rotation only if they change.
    pub fn rotate_left(&mut self, address: u64, count: u32) -> RegisterResult<()> {
        let width = self.layout(address)?.spec.width.bits();
        let current = self.current(address)?;
        let rotated = bits::rotate_left(current, count, width);
        self.write_masked(address, rotated, current ^ rotated)
    }

    pub fn rotate_right(&mut self, address: u64, count: u32) -> RegisterResult<()> {
        let width = self.layout(address)?.spec.width.bits();
        let current = self.current(address)?;
        let rotated = bits::rotate_right(current, count, width);
        self.write_masked(address, rotated, current ^ rotated)
    }

    fn bit_mask(&self, address: u64, bit: u32) -> RegisterResult<u64> {
        let width = self.layout(address)?.spec.width.bits();
        if bit >= width {
            return Err(RegisterError::ValueOutOfRange {
                address,
                field: "bit".into(),
                value: u64::from(bit),
                width,
            });
        }
        Ok(1u64 << bit)
    }
}

// Breakpoints.
impl RegisterBank {
    /// Adds a breakpoint. The address must be registered and an
    /// `OnFieldChange` condition must name one of its fields.
    pub fn add_breakpoint(&mut self, breakpoint: Breakpoint) -> RegisterResult<BreakpointId> {
        let layout = self.layout(breakpoint.address)?;
        if let BreakCondition::OnFieldChange(field) = &breakpoint.condition {
            if layout.field(field).is_none() {
                return Err(RegisterError::UnknownField {
                    address: breakpoint.address,
                    field: field.clone(),
                });
            }
        }
        let id = BreakpointId(self.next_breakpoint);
        self.next_breakpoint += 1;
        log::debug!(
            "{}: breakpoint {id} at 0x{:08X} {}",
            self.config.name,
            breakpoint.address,
            breakpoint.condition
        );
        self.breakpoints.push((id, breakpoint));
        Ok(id)
    }

    pub fn remove_breakpoint(&mut self, id: BreakpointId) -> Option<Breakpoint> {
        let position = self.breakpoints.iter().position(|(bp_id, _)| *bp_id == id)?;
        Some(self.breakpoints.remove(position).1)
    }

    pub fn breakpoint(&self, id: BreakpointId) -> Option<&Breakpoint> {
        self.breakpoints
            .iter()
            .find(|(bp_id, _)| *bp_id == id)
            .map(|(_, bp)| bp)
    }

    /// Returns false if `id` is unknown.
    pub fn set_breakpoint_enabled(&mut self, id: BreakpointId, enabled: bool) -> bool {
        match self.breakpoints.iter_mut().find(|(bp_id, _)| *bp_id == id) {
            Some((_, bp)) => {
                bp.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = (BreakpointId, &Breakpoint)> {
        self.breakpoints.iter().map(|(id, bp)| (*id, bp))
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    /// Invokes the handler for every event. All events are delivered even if one
    /// fails; the first failure is returned.
    fn dispatch(&mut self, address: u64, events: EventBuffer) -> RegisterResult<()> {
        let mut failure = None;
        for event in &events {
            log::info!(
                "{}: breakpoint {} hit at 0x{:08X} ({}): 0x{:X} -> 0x{:X}",
                self.config.name,
                event.id,
                event.address,
                event.condition,
                event.old,
                event.new
            );
            let Some(handler) = self.handler.as_mut() else {
                continue;
            };
            if let Err(err) = handler.on_trigger(event) {
                log::warn!("{}: breakpoint {} handler failed: {err}", self.config.name, event.id);
                failure.get_or_insert(err);
            }
        }
        match failure {
            Some(source) => Err(RegisterError::Handler { address, source }),
            None => Ok(()),
        }
    }
}

// Shadow sets.
impl RegisterBank {
    /// Snapshots every register under `name`, replacing any earlier set.
    pub fn save_shadow(&mut self, name: &str) {
        let set = ShadowSet::capture(self.state.values());
        log::debug!("{}: saved shadow '{name}' ({} registers)", self.config.name, set.len());
        self.shadows.insert(name.to_string(), set);
    }

    /// Snapshots only `addresses`. Nothing is stored if any address is unknown.
    pub fn save_shadow_subset(&mut self, name: &str, addresses: &[u64]) -> RegisterResult<()> {
        let states = addresses
            .iter()
            .map(|&address| {
                self.state
                    .get(&address)
                    .ok_or(RegisterError::UnknownAddress { address })
            })
            .collect::<RegisterResult<Vec<_>>>()?;
        let set = ShadowSet::capture(states);
        log::debug!("{}: saved shadow '{name}' ({} registers)", self.config.name, set.len());
        self.shadows.insert(name.to_string(), set);
        Ok(())
    }

    /// Places `value` in shadow set `name` (created if missing) without
    /// touching the visible register.
    pub fn stage_shadow(&mut self, name: &str, address: u64, value: u64) -> RegisterResult<()> {
        let width_mask = self.layout(address)?.width_mask();
        self.shadows
            .entry(name.to_string())
            .or_default()
            .stage(address, value & width_mask);
        log::trace!("{}: staged 0x{value:X} for 0x{address:08X} in '{name}'", self.config.name);
        Ok(())
    }

    /// Makes the values held by shadow set `name` visible. Addresses outside the
    /// set keep their current value. Activation is not a write and evaluates no
    /// breakpoints.
    pub fn activate_shadow(&mut self, name: &str) -> RegisterResult<()> {
        let set = self
            .shadows
            .get(name)
            .ok_or_else(|| RegisterError::UnknownShadowSet {
                name: name.to_string(),
            })?;
        let next = set.overlay(&self.state);
        for (address, state) in &next {
            let old = self.state.get(address).map_or(state.raw_value, |s| s.raw_value);
            if old != state.raw_value {
                self.history
                    .record(AccessKind::ShadowSwap, *address, old, state.raw_value);
            }
        }
        self.state = Arc::new(next);
        log::debug!("{}: activated shadow '{name}' ({} registers)", self.config.name, set.len());
        Ok(())
    }

    pub fn shadow(&self, name: &str) -> Option<&ShadowSet> {
        self.shadows.get(name)
    }

    pub fn discard_shadow(&mut self, name: &str) -> bool {
        self.shadows.remove(name).is_some()
    }

    /// Saved shadow set names, sorted.
    pub fn shadow_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.shadows.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// History and reporting.
impl RegisterBank {
    pub fn history(&self) -> impl Iterator<Item = &AccessRecord> {
        self.history.iter()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Status of one register. Built from a debug view, so it triggers nothing.
    pub fn report(&self, address: u64) -> RegisterResult<RegisterReport> {
        let layout = self.layout(address)?;
        let value = self.current(address)?;
        let fields = layout
            .fields()
            .iter()
            .map(|field| FieldReport {
                name: field.name.clone(),
                bit_offset: field.bit_offset,
                bit_width: field.bit_width,
                access: field.access,
                value: field.access.is_readable().then(|| field.decode(value)),
            })
            .collect();
        let breakpoints = self
            .breakpoints
            .iter()
            .filter(|(_, bp)| bp.address == address)
            .count();
        Ok(RegisterReport {
            name: layout.spec.name.clone(),
            address,
            width: layout.spec.width,
            value,
            fields,
            breakpoints,
        })
    }
}

impl RegisterBank {
    fn layout(&self, address: u64) -> RegisterResult<&RegisterLayout> {
        self.layouts
            .get(&address)
            .ok_or(RegisterError::UnknownAddress { address })
    }

    fn current(&self, address: u64) -> RegisterResult<u64> {
        self.state
            .get(&address)
            .map(|state| state.raw_value)
            .ok_or(RegisterError::UnknownAddress { address })
    }

    fn restore(&mut self, address: u64, reset: u64) {
        if let Some(slot) = Arc::make_mut(&mut self.state).get_mut(&address) {
            let old = slot.raw_value;
            slot.raw_value = reset;
            self.history.record(AccessKind::Reset, address, old, reset);
        }
    }
}

fn read_events(breakpoints: &[(BreakpointId, Breakpoint)], address: u64, value: u64) -> EventBuffer {
    breakpoints
        .iter()
        .filter(|(_, bp)| bp.enabled && bp.address == address && bp.condition == BreakCondition::OnRead)
        .map(|(id, bp)| BreakpointEvent {
            id: *id,
            address,
            condition: bp.condition.clone(),
            old: value,
            new: value,
            field_values: None,
        })
        .collect()
}

/// Events for one write in evaluation order: every `OnWrite`, then every
/// matching `OnValueEquals`, then every `OnFieldChange` whose field changed.
fn write_events(
    breakpoints: &[(BreakpointId, Breakpoint)],
    layout: &RegisterLayout,
    old: u64,
    new: u64,
) -> EventBuffer {
    let address = layout.address();
    let armed = || {
        breakpoints
            .iter()
            .filter(move |(_, bp)| bp.enabled && bp.address == address)
    };
    let event = |id: BreakpointId, condition: &BreakCondition, field_values| BreakpointEvent {
        id,
        address,
        condition: condition.clone(),
        old,
        new,
        field_values,
    };

    let mut events = EventBuffer::new();
    for (id, bp) in armed() {
        if bp.condition == BreakCondition::OnWrite {
            events.push(event(*id, &bp.condition, None));
        }
    }
    for (id, bp) in armed() {
        if bp.condition == BreakCondition::OnValueEquals(new) {
            events.push(event(*id, &bp.condition, None));
        }
    }
    for (id, bp) in armed() {
        let BreakCondition::OnFieldChange(name) = &bp.condition else {
            continue;
        };
        let Some(field) = layout.field(name) else {
            continue;
        };
        let (before, after) = (field.decode(old), field.decode(new));
        if before != after {
            events.push(event(*id, &bp.condition, Some((before, after))));
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::register::{EventLog, FieldSpec, RegisterWidth};

    const CTRL: u64 = 0x1000;
    const STATUS: u64 = 0x1004;

    fn bank() -> RegisterBank {
        let mut bank = RegisterBank::with_config(BankConfig::new("test").with_history(16));
        bank.register(
            RegisterSpec::builder("CTRL", CTRL, RegisterWidth::W32)
                .range("ENABLE", 0, 1)
                .range("MODE", 1, 2)
                .finish(),
        )
        .expect("register CTRL");
        bank.register(
            RegisterSpec::builder("STATUS", STATUS, RegisterWidth::W16)
                .field(FieldSpec::new("BUSY", 0, 1))
                .field(FieldSpec::new("READY", 15, 1).read_only().with_reset(1))
                .finish(),
        )
        .expect("register STATUS");
        bank
    }

    fn recording(bank: &mut RegisterBank) -> EventLog {
        let log = EventLog::new();
        bank.set_handler(log.clone());
        log
    }

    #[test]
    fn mode_field_write_sets_expected_bits() {
        let mut bank = bank();
        bank.write_field(CTRL, "MODE", 2).expect("write MODE");
        assert_eq!(bank.read(CTRL).expect("read CTRL"), 0b100);
        assert_eq!(bank.read_field(CTRL, "ENABLE").expect("read ENABLE"), 0);
        assert_eq!(bank.read_field(CTRL, "MODE").expect("read MODE"), 2);
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        let mut bank = bank();
        let err = bank.register(RegisterSpec::new("AGAIN", CTRL, RegisterWidth::W8));
        assert!(matches!(err, Err(RegisterError::DuplicateAddress { address: CTRL })));
        assert_eq!(bank.len(), 2, "bank should still hold two registers");
        assert_eq!(bank.spec(CTRL).map(|spec| spec.name.as_str()), Some("CTRL"));
    }

    #[test]
    fn invalid_layout_is_not_registered() {
        let mut bank = bank();
        let spec = RegisterSpec::builder("BAD", 0x2000, RegisterWidth::W8)
            .range("WIDE", 4, 8)
            .finish();
        assert!(matches!(bank.register(spec), Err(RegisterError::InvalidFieldLayout { .. })));
        assert!(!bank.contains(0x2000), "failed registration must not leave state behind");
        assert!(matches!(bank.read(0x2000), Err(RegisterError::UnknownAddress { .. })));
    }

    #[test]
    fn masked_write_preserves_untouched_bits() {
        let mut bank = bank();
        bank.write(CTRL, 0xFFFF_0000).expect("seed");
        bank.write_masked(CTRL, 0x0000_12FF, 0x0000_FF00).expect("masked write");
        assert_eq!(bank.read(CTRL).expect("read"), 0xFFFF_1200);
    }

    #[test]
    fn writes_are_truncated_to_register_width() {
        let mut bank = bank();
        bank.write(CTRL, 0x1_2345_6789).expect("wide write");
        assert_eq!(bank.read(CTRL).expect("read"), 0x2345_6789, "bits above 32 are dropped");
    }

    #[test]
    fn read_only_fields_reject_cpu_writes_but_not_debug() {
        let mut bank = bank();
        let err = bank.write(STATUS, 0).expect_err("full write touches READY");
        assert!(matches!(err, RegisterError::WriteToReadOnly { ref field, .. } if field == "READY"));
        assert_eq!(bank.read(STATUS).expect("read"), 0x8000, "rejected write changes nothing");

        bank.write_masked(STATUS, 1, 0x1).expect("BUSY is writable");
        assert!(matches!(
            bank.write_field(STATUS, "READY", 0),
            Err(RegisterError::WriteToReadOnly { .. })
        ));

        bank.write_with(STATUS, 0, 0x8000, AccessContext::DEBUG)
            .expect("debugger may force RO bits");
        assert_eq!(bank.read(STATUS).expect("read"), 0x0001);
    }

    #[test]
    fn field_value_out_of_range_leaves_value() {
        let mut bank = bank();
        bank.write(CTRL, 0x5).expect("seed");
        let err = bank.write_field(CTRL, "MODE", 4).expect_err("4 needs 3 bits");
        assert!(matches!(err, RegisterError::ValueOutOfRange { value: 4, width: 2, .. }));
        assert_eq!(bank.read(CTRL).expect("read"), 0x5);
        assert!(matches!(
            bank.write_field(CTRL, "NOPE", 0),
            Err(RegisterError::UnknownField { .. })
        ));
    }

    #[test]
    fn reset_restores_without_triggering() {
        let mut bank = bank();
        let log = recording(&mut bank);
        bank.add_breakpoint(Breakpoint::on_write(CTRL)).expect("bp");
        bank.add_breakpoint(Breakpoint::on_field_change(STATUS, "BUSY")).expect("bp");
        bank.write(CTRL, 0xAA).expect("write");
        bank.write_field(STATUS, "BUSY", 1).expect("write");
        log.take();

        bank.reset(Some(CTRL)).expect("reset CTRL");
        assert_eq!(bank.read(CTRL).expect("read"), 0);
        assert_eq!(bank.read(STATUS).expect("read"), 0x8001, "single reset leaves others");

        bank.reset(None).expect("reset all");
        assert_eq!(bank.read(STATUS).expect("read"), 0x8000);
        assert!(log.is_empty(), "resets must not fire breakpoints");
        assert!(matches!(bank.reset(Some(0x9999)), Err(RegisterError::UnknownAddress { .. })));
    }

    #[test]
    fn write_breakpoints_fire_in_fixed_order() {
        let mut bank = bank();
        let log = recording(&mut bank);
        let change = bank.add_breakpoint(Breakpoint::on_field_change(CTRL, "MODE")).expect("bp");
        let equals = bank.add_breakpoint(Breakpoint::on_value(CTRL, 0b100)).expect("bp");
        let write = bank.add_breakpoint(Breakpoint::on_write(CTRL)).expect("bp");
        let second_write = bank.add_breakpoint(Breakpoint::on_write(CTRL)).expect("bp");
        bank.add_breakpoint(Breakpoint::on_write(STATUS)).expect("bp");

        bank.write_field(CTRL, "MODE", 2).expect("write");
        assert_eq!(
            log.ids(),
            vec![write, second_write, equals, change],
            "OnWrite, then OnValueEquals, then OnFieldChange, registration order within each"
        );
        let events = log.take();
        assert_eq!(events[3].field_values, Some((0, 2)));
        assert_eq!((events[0].old, events[0].new), (0, 0b100));
    }

    #[test]
    fn field_change_ignores_noop_and_other_fields() {
        let mut bank = bank();
        let log = recording(&mut bank);
        let id = bank.add_breakpoint(Breakpoint::on_field_change(CTRL, "MODE")).expect("bp");
        bank.write_field(CTRL, "ENABLE", 1).expect("write");
        bank.write_field(CTRL, "MODE", 0).expect("no-op write");
        assert!(log.is_empty(), "MODE never changed");
        bank.write(CTRL, 0b011).expect("write");
        assert_eq!(log.ids(), vec![id]);
    }

    #[test]
    fn disabled_and_removed_breakpoints_stay_quiet() {
        let mut bank = bank();
        let log = recording(&mut bank);
        let id = bank.add_breakpoint(Breakpoint::on_read(CTRL)).expect("bp");
        bank.add_breakpoint(Breakpoint::on_write(CTRL).disabled()).expect("bp");
        bank.write(CTRL, 1).expect("write");
        assert!(log.is_empty(), "disabled breakpoint should not fire");

        bank.read(CTRL).expect("read");
        bank.read_with(CTRL, AccessContext::DEBUG).expect("debug read");
        assert_eq!(log.take().len(), 1, "debug reads have no side effects");

        assert!(bank.set_breakpoint_enabled(id, false));
        bank.read(CTRL).expect("read");
        assert!(log.is_empty());
        assert!(bank.remove_breakpoint(id).is_some());
        assert!(bank.remove_breakpoint(id).is_none(), "handles are not reusable");
        assert!(!bank.set_breakpoint_enabled(id, true));
    }

    #[test]
    fn breakpoint_targets_are_validated() {
        let mut bank = bank();
        assert!(matches!(
            bank.add_breakpoint(Breakpoint::on_write(0x4444)),
            Err(RegisterError::UnknownAddress { .. })
        ));
        assert!(matches!(
            bank.add_breakpoint(Breakpoint::on_field_change(CTRL, "MOOD")),
            Err(RegisterError::UnknownField { .. })
        ));
        assert_eq!(bank.breakpoints().count(), 0);
    }

    #[test]
    fn handler_failure_propagates_after_commit() {
        let mut bank = bank();
        let calls = EventLog::new();
        let mut recorder = calls.clone();
        bank.set_handler(move |event: &BreakpointEvent| -> Result<(), crate::soc::register::HandlerError> {
            recorder.on_trigger(event)?;
            Err(format!("unexpected write of 0x{:X}", event.new).into())
        });
        bank.add_breakpoint(Breakpoint::on_write(CTRL)).expect("bp");
        bank.add_breakpoint(Breakpoint::on_value(CTRL, 7)).expect("bp");

        let err = bank.write(CTRL, 7).expect_err("handler fails");
        match &err {
            RegisterError::Handler { address, source } => {
                assert_eq!(*address, CTRL);
                assert_eq!(source.to_string(), "unexpected write of 0x7");
            }
            other => panic!("expected handler error, got {other:?}"),
        }
        assert_eq!(calls.len(), 2, "every matching breakpoint is still invoked");
        assert_eq!(bank.read_with(CTRL, AccessContext::DEBUG).expect("read"), 7);
    }

    #[test]
    fn shadow_activation_restores_saved_values() {
        let mut bank = bank();
        bank.write(CTRL, 0x11).expect("write");
        bank.save_shadow("boot");
        bank.write(CTRL, 0x22).expect("write");
        bank.write_field(STATUS, "BUSY", 1).expect("write");
        bank.activate_shadow("boot").expect("activate");
        assert_eq!(bank.read(CTRL).expect("read"), 0x11);
        assert_eq!(bank.read(STATUS).expect("read"), 0x8000);

        assert!(matches!(
            bank.activate_shadow("missing"),
            Err(RegisterError::UnknownShadowSet { .. })
        ));
    }

    #[test]
    fn partial_shadow_keeps_uncovered_registers() {
        let mut bank = bank();
        bank.write(CTRL, 0x1).expect("write");
        bank.save_shadow_subset("ctrl-only", &[CTRL]).expect("subset");
        bank.write(CTRL, 0x2).expect("write");
        bank.write_field(STATUS, "BUSY", 1).expect("write");
        bank.activate_shadow("ctrl-only").expect("activate");
        assert_eq!(bank.read(CTRL).expect("read"), 0x1);
        assert_eq!(bank.read(STATUS).expect("read"), 0x8001, "STATUS is outside the set");

        assert!(bank.save_shadow_subset("bad", &[CTRL, 0x7]).is_err());
        assert!(bank.shadow("bad").is_none(), "failed subset stores nothing");
    }

    #[test]
    fn staged_values_commit_on_activation() {
        let mut bank = bank();
        let log = recording(&mut bank);
        bank.add_breakpoint(Breakpoint::on_write(CTRL)).expect("bp");
        bank.stage_shadow("next", CTRL, 0x1_0000_00AB).expect("stage");
        assert_eq!(bank.read(CTRL).expect("read"), 0, "staging leaves visible state alone");
        bank.activate_shadow("next").expect("activate");
        assert_eq!(bank.read(CTRL).expect("read"), 0xAB, "staged value is width-truncated");
        assert!(log.is_empty(), "activation is not a write");
        assert_eq!(bank.shadow_names(), vec!["next"]);
        assert!(bank.discard_shadow("next"));
        assert!(matches!(bank.stage_shadow("x", 0x5, 1), Err(RegisterError::UnknownAddress { .. })));
    }

    #[test]
    fn bit_helpers_use_write_path() {
        let mut bank = bank();
        bank.set_bit(CTRL, 31).expect("set");
        bank.toggle_bit(CTRL, 0).expect("toggle");
        assert_eq!(bank.read(CTRL).expect("read"), 0x8000_0001);
        bank.clear_bit(CTRL, 31).expect("clear");
        assert!(bank.test_bit(CTRL, 0).expect("test"));
        assert!(!bank.test_bit(CTRL, 31).expect("test"));
        assert!(matches!(bank.set_bit(STATUS, 15), Err(RegisterError::WriteToReadOnly { .. })));
        assert!(matches!(
            bank.set_bit(STATUS, 16),
            Err(RegisterError::ValueOutOfRange { width: 16, .. })
        ));
    }

    #[test]
    fn rotations_go_through_the_write_path() {
        let mut bank = bank();
        let log = recording(&mut bank);
        let id = bank.add_breakpoint(Breakpoint::on_write(CTRL)).expect("bp");
        bank.write(CTRL, 0x8000_0001).expect("seed");
        log.take();

        bank.rotate_left(CTRL, 1).expect("rotate left");
        assert_eq!(bank.read(CTRL).expect("read"), 0x0000_0003, "bit 31 wraps into bit 0");
        let events = log.take();
        assert_eq!(events.iter().map(|e| e.id).collect::<Vec<_>>(), vec![id]);
        assert_eq!((events[0].old, events[0].new), (0x8000_0001, 0x0000_0003));

        bank.rotate_right(CTRL, 33).expect("rotate right");
        assert_eq!(bank.read(CTRL).expect("read"), 0x8000_0001, "count wraps modulo the width");
        assert!(matches!(bank.rotate_left(0x9999, 1), Err(RegisterError::UnknownAddress { .. })));
    }

    #[test]
    fn rotations_respect_read_only_fields() {
        let mut bank = bank();
        bank.write_field(STATUS, "BUSY", 1).expect("seed");
        let err = bank.rotate_left(STATUS, 1).expect_err("READY would move");
        assert!(matches!(err, RegisterError::WriteToReadOnly { ref field, .. } if field == "READY"));
        assert_eq!(bank.read(STATUS).expect("read"), 0x8001, "rejected rotation changes nothing");

        bank.write_with(STATUS, 0, 0x8000, AccessContext::DEBUG).expect("debug clear");
        bank.rotate_left(STATUS, 3).expect("READY stays clear");
        assert_eq!(bank.read(STATUS).expect("read"), 0x0008);
    }

    #[test]
    fn value_breakpoint_ignores_other_values() {
        let mut bank = bank();
        let log = recording(&mut bank);
        let id = bank.add_breakpoint(Breakpoint::on_value(CTRL, 5)).expect("bp");
        bank.write(CTRL, 4).expect("write 4");
        assert!(log.is_empty(), "4 does not match");
        bank.write(CTRL, 5).expect("write 5");
        assert_eq!(log.ids(), vec![id], "exactly one hit for the matching write");
        bank.write_masked(CTRL, 0, 0x1).expect("clear bit 0 of 5");
        assert_eq!(log.len(), 1, "writes away from the value stay quiet");
    }

    #[test]
    fn report_hides_write_only_fields() {
        let mut bank = RegisterBank::new();
        bank.register(
            RegisterSpec::builder("CMD", 0x20, RegisterWidth::W8)
                .field(FieldSpec::new("GO", 0, 1).write_only())
                .range("ARG", 4, 4)
                .finish(),
        )
        .expect("register CMD");
        bank.write(0x20, 0x31).expect("write-only bits are writable");
        let report = bank.report(0x20).expect("report");
        assert_eq!(report.fields[0].value, None, "GO is not readable");
        assert_eq!(report.fields[1].value, Some(3));
        assert_eq!(report.value, 0x31, "raw value still includes write-only bits");
    }

    #[test]
    fn history_tracks_accesses() {
        let mut bank = bank();
        bank.write(CTRL, 3).expect("write");
        bank.read(CTRL).expect("read");
        bank.read_with(CTRL, AccessContext::DEBUG).expect("debug read");
        bank.reset(Some(CTRL)).expect("reset");
        let kinds: Vec<_> = bank.history().map(|record| record.kind).collect();
        assert_eq!(kinds, vec![AccessKind::Write, AccessKind::Read, AccessKind::Reset]);
        bank.clear_history();
        assert_eq!(bank.history().count(), 0);
    }

    #[test]
    fn report_decodes_fields() {
        let mut bank = bank();
        bank.write_field(CTRL, "MODE", 3).expect("write");
        bank.add_breakpoint(Breakpoint::on_read(CTRL)).expect("bp");
        let report = bank.report(CTRL).expect("report");
        assert_eq!(report.value, 0b110);
        assert_eq!(
            report.fields.iter().map(|f| f.value).collect::<Vec<_>>(),
            vec![Some(0), Some(3)]
        );
        assert_eq!(report.breakpoints, 1);
        assert_eq!(bank.history().count(), 1, "reports do not count as reads");
    }
}
