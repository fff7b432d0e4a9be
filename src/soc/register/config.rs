/// Construction-time options for a [`RegisterBank`](super::RegisterBank).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BankConfig {
    /// Label used in log lines.
    pub name: String,
    /// Number of access records retained; 0 disables the history.
    pub history_depth: usize,
}

impl BankConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_history(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            name: "bank".into(),
            history_depth: 0,
        }
    }
}
