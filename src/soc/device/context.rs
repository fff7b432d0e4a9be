/// Who is touching the bank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccessContext {
    /// If true, this is a "debugger" view:
    /// 1. Do NOT evaluate breakpoints
    /// 2. Do NOT record the access in the bank history
    /// 3. Bypass Read-Only checks (allow force-writes to RO fields)
    pub debug: bool,
}

impl AccessContext {
    pub const CPU: Self = Self { debug: false };
    pub const DEBUG: Self = Self { debug: true };

    #[inline(always)]
    pub fn has_side_effects(self) -> bool {
        !self.debug
    }
}
