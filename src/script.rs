//! Line-oriented command scripts for driving a bank from the demo harness.
//!
//! ```text
//! write 0x1000 0x5 0xFF     # address, value, optional mask
//! write-field 0x1000 MODE 2
//! break 0x1000 field MODE
//! ```
//!
//! Operation failures are reported in the output and execution continues.

use std::fmt::{self, Write};

use thiserror::Error;

use crate::soc::{
    device::AccessContext,
    register::{BreakCondition, Breakpoint, EventLog, RegisterBank, RegisterError},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },
    #[error("line {line}: '{command}' expects {expected}")]
    Arity {
        line: usize,
        command: String,
        expected: &'static str,
    },
    #[error("line {line}: invalid number '{text}'")]
    Number { line: usize, text: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Read(u64),
    Write { address: u64, value: u64, mask: Option<u64> },
    ReadField { address: u64, field: String },
    WriteField { address: u64, field: String, value: u64 },
    SetBit(u64, u32),
    ClearBit(u64, u32),
    ToggleBit(u64, u32),
    TestBit(u64, u32),
    RotateLeft(u64, u32),
    RotateRight(u64, u32),
    Reset(Option<u64>),
    Save(String),
    Activate(String),
    Stage { name: String, address: u64, value: u64 },
    Shadow(String),
    Break(Breakpoint),
    Report(u64),
    Dump,
}

/// Parses `0x`, `0b` and decimal literals; `_` separators are ignored.
pub fn parse_number(text: &str) -> Option<u64> {
    let clean: String = text.chars().filter(|&c| c != '_').collect();
    let lower = clean.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).ok()
    } else {
        lower.parse().ok()
    }
}

struct Line<'a> {
    line: usize,
    command: &'a str,
    args: Vec<&'a str>,
}

impl<'a> Line<'a> {
    fn expect(&self, counts: &[usize], expected: &'static str) -> Result<(), ScriptError> {
        if counts.contains(&self.args.len()) {
            Ok(())
        } else {
            Err(ScriptError::Arity {
                line: self.line,
                command: self.command.to_string(),
                expected,
            })
        }
    }

    fn number(&self, index: usize) -> Result<u64, ScriptError> {
        let text = self.args[index];
        parse_number(text).ok_or_else(|| ScriptError::Number {
            line: self.line,
            text: text.to_string(),
        })
    }

    fn bit(&self, index: usize) -> Result<u32, ScriptError> {
        let value = self.number(index)?;
        u32::try_from(value).map_err(|_| ScriptError::Number {
            line: self.line,
            text: self.args[index].to_string(),
        })
    }

    fn text(&self, index: usize) -> String {
        self.args[index].to_string()
    }

    fn parse(&self) -> Result<Command, ScriptError> {
        let command = match self.command {
            "read" => {
                self.expect(&[1], "<addr>")?;
                Command::Read(self.number(0)?)
            }
            "write" => {
                self.expect(&[2, 3], "<addr> <value> [mask]")?;
                Command::Write {
                    address: self.number(0)?,
                    value: self.number(1)?,
                    mask: if self.args.len() == 3 { Some(self.number(2)?) } else { None },
                }
            }
            "read-field" => {
                self.expect(&[2], "<addr> <field>")?;
                Command::ReadField {
                    address: self.number(0)?,
                    field: self.text(1),
                }
            }
            "write-field" => {
                self.expect(&[3], "<addr> <field> <value>")?;
                Command::WriteField {
                    address: self.number(0)?,
                    field: self.text(1),
                    value: self.number(2)?,
                }
            }
            "set-bit" | "clear-bit" | "toggle-bit" | "test-bit" => {
                self.expect(&[2], "<addr> <bit>")?;
                let (address, bit) = (self.number(0)?, self.bit(1)?);
                match self.command {
                    "set-bit" => Command::SetBit(address, bit),
                    "clear-bit" => Command::ClearBit(address, bit),
                    "toggle-bit" => Command::ToggleBit(address, bit),
                    _ => Command::TestBit(address, bit),
                }
            }
            "rotate-left" | "rotate-right" => {
                self.expect(&[2], "<addr> <count>")?;
                let (address, count) = (self.number(0)?, self.bit(1)?);
                if self.command == "rotate-left" {
                    Command::RotateLeft(address, count)
                } else {
                    Command::RotateRight(address, count)
                }
            }
            "reset" => {
                self.expect(&[0, 1], "[addr]")?;
                Command::Reset(if self.args.is_empty() { None } else { Some(self.number(0)?) })
            }
            "save" => {
                self.expect(&[1], "<name>")?;
                Command::Save(self.text(0))
            }
            "activate" => {
                self.expect(&[1], "<name>")?;
                Command::Activate(self.text(0))
            }
            "stage" => {
                self.expect(&[3], "<name> <addr> <value>")?;
                Command::Stage {
                    name: self.text(0),
                    address: self.number(1)?,
                    value: self.number(2)?,
                }
            }
            "shadow" => {
                self.expect(&[1], "<name>")?;
                Command::Shadow(self.text(0))
            }
            "break" => self.parse_break()?,
            "report" => {
                self.expect(&[1], "<addr>")?;
                Command::Report(self.number(0)?)
            }
            "dump" => {
                self.expect(&[0], "no arguments")?;
                Command::Dump
            }
            other => {
                return Err(ScriptError::UnknownCommand {
                    line: self.line,
                    command: other.to_string(),
                });
            }
        };
        Ok(command)
    }

    fn parse_break(&self) -> Result<Command, ScriptError> {
        const USAGE: &str = "<addr> write|read|equals <value>|field <name>";
        self.expect(&[2, 3], USAGE)?;
        let address = self.number(0)?;
        let condition = match (self.args[1], self.args.len()) {
            ("write", 2) => BreakCondition::OnWrite,
            ("read", 2) => BreakCondition::OnRead,
            ("equals", 3) => BreakCondition::OnValueEquals(self.number(2)?),
            ("field", 3) => BreakCondition::OnFieldChange(self.text(2)),
            _ => {
                return Err(ScriptError::Arity {
                    line: self.line,
                    command: self.command.to_string(),
                    expected: USAGE,
                });
            }
        };
        Ok(Command::Break(Breakpoint::new(address, condition)))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Script {
    commands: Vec<(usize, Command)>,
}

impl Script {
    /// Parses a whole script. `#` starts a comment; blank lines are skipped.
    pub fn parse(source: &str) -> Result<Self, ScriptError> {
        let mut commands = Vec::new();
        for (index, raw) in source.lines().enumerate() {
            let text = raw.split('#').next().unwrap_or("").trim();
            let mut words = text.split_whitespace();
            let Some(command) = words.next() else {
                continue;
            };
            let line = Line {
                line: index + 1,
                command,
                args: words.collect(),
            };
            commands.push((line.line, line.parse()?));
        }
        Ok(Self { commands })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().map(|(_, command)| command)
    }

    /// Executes every command against `bank`, writing one report per command to
    /// `out` followed by any breakpoint hits it caused. The bank's handler is
    /// replaced for the duration of the run and restored afterwards.
    /// Returns the number of commands that failed.
    pub fn run(&self, bank: &mut RegisterBank, out: &mut impl Write) -> Result<usize, fmt::Error> {
        let hits = EventLog::new();
        let previous = bank.take_handler();
        bank.set_handler(hits.clone());

        let result = self.run_with_hits(bank, out, &hits);

        bank.replace_handler(previous);
        result
    }

    fn run_with_hits(
        &self,
        bank: &mut RegisterBank,
        out: &mut impl Write,
        hits: &EventLog,
    ) -> Result<usize, fmt::Error> {
        let mut failures = 0;
        for (line, command) in &self.commands {
            match execute(bank, command, out) {
                Ok(()) => {}
                Err(StepError::Output(err)) => return Err(err),
                Err(StepError::Register(err)) => {
                    failures += 1;
                    log::debug!("line {line}: {err}");
                    writeln!(out, "error: {err}")?;
                }
            }
            for event in hits.take() {
                writeln!(
                    out,
                    "  ! breakpoint {} at 0x{:08X} ({}): 0x{:X} -> 0x{:X}",
                    event.id, event.address, event.condition, event.old, event.new
                )?;
            }
        }
        Ok(failures)
    }
}

fn register_name(bank: &RegisterBank, address: u64) -> &str {
    bank.spec(address).map_or("?", |spec| spec.name.as_str())
}

#[derive(Debug, Error)]
enum StepError {
    #[error(transparent)]
    Register(#[from] RegisterError),
    #[error(transparent)]
    Output(#[from] fmt::Error),
}

fn execute(bank: &mut RegisterBank, command: &Command, out: &mut impl Write) -> Result<(), StepError> {
    match command {
        Command::Read(address) => {
            let value = bank.read(*address)?;
            writeln!(out, "{} 0x{address:08X} = 0x{value:X}", register_name(bank, *address))?;
        }
        Command::Write { address, value, mask } => {
            match mask {
                Some(mask) => bank.write_masked(*address, *value, *mask)?,
                None => bank.write(*address, *value)?,
            }
            let value = bank.read_with(*address, AccessContext::DEBUG)?;
            writeln!(out, "{} 0x{address:08X} <- 0x{value:X}", register_name(bank, *address))?;
        }
        Command::ReadField { address, field } => {
            let value = bank.read_field(*address, field)?;
            writeln!(out, "{}.{field} = 0x{value:X}", register_name(bank, *address))?;
        }
        Command::WriteField { address, field, value } => {
            bank.write_field(*address, field, *value)?;
            writeln!(out, "{}.{field} <- 0x{value:X}", register_name(bank, *address))?;
        }
        Command::SetBit(address, bit) => {
            bank.set_bit(*address, *bit)?;
            writeln!(out, "{} bit {bit} set", register_name(bank, *address))?;
        }
        Command::ClearBit(address, bit) => {
            bank.clear_bit(*address, *bit)?;
            writeln!(out, "{} bit {bit} cleared", register_name(bank, *address))?;
        }
        Command::ToggleBit(address, bit) => {
            bank.toggle_bit(*address, *bit)?;
            writeln!(out, "{} bit {bit} toggled", register_name(bank, *address))?;
        }
        Command::TestBit(address, bit) => {
            let set = bank.test_bit(*address, *bit)?;
            writeln!(out, "{} bit {bit} = {}", register_name(bank, *address), u8::from(set))?;
        }
        Command::RotateLeft(address, count) => {
            bank.rotate_left(*address, *count)?;
            let value = bank.read_with(*address, AccessContext::DEBUG)?;
            writeln!(out, "{} rotated left by {count} -> 0x{value:X}", register_name(bank, *address))?;
        }
        Command::RotateRight(address, count) => {
            bank.rotate_right(*address, *count)?;
            let value = bank.read_with(*address, AccessContext::DEBUG)?;
            writeln!(out, "{} rotated right by {count} -> 0x{value:X}", register_name(bank, *address))?;
        }
        Command::Reset(address) => {
            bank.reset(*address)?;
            match address {
                Some(address) => writeln!(out, "{} reset", register_name(bank, *address))?,
                None => writeln!(out, "all registers reset")?,
            }
        }
        Command::Save(name) => {
            bank.save_shadow(name);
            writeln!(out, "saved shadow '{name}'")?;
        }
        Command::Activate(name) => {
            bank.activate_shadow(name)?;
            writeln!(out, "activated shadow '{name}'")?;
        }
        Command::Stage { name, address, value } => {
            bank.stage_shadow(name, *address, *value)?;
            writeln!(out, "staged 0x{value:X} for {} in '{name}'", register_name(bank, *address))?;
        }
        Command::Shadow(name) => {
            let set = bank
                .shadow(name)
                .ok_or_else(|| RegisterError::UnknownShadowSet { name: name.clone() })?;
            writeln!(out, "shadow '{name}' ({} registers)", set.len())?;
            for spec in bank.specs() {
                if let Some(value) = set.get(spec.address) {
                    writeln!(out, "  0x{:08X} {:<8} = 0x{value:X}", spec.address, spec.name)?;
                }
            }
        }
        Command::Break(breakpoint) => {
            let id = bank.add_breakpoint(breakpoint.clone())?;
            writeln!(
                out,
                "breakpoint {id} at 0x{:08X} {}",
                breakpoint.address, breakpoint.condition
            )?;
        }
        Command::Report(address) => {
            writeln!(out, "{}", bank.report(*address)?)?;
        }
        Command::Dump => {
            for state in bank.snapshot() {
                let spec = bank.spec(state.address);
                let digits = spec.map_or(8, |spec| (spec.width.bits() / 4) as usize);
                writeln!(
                    out,
                    "0x{:08X} {:<8} = 0x{:0digits$X}",
                    state.address,
                    register_name(bank, state.address),
                    state.raw_value,
                    digits = digits
                )?;
            }
        }
    }
    Ok(())
}
