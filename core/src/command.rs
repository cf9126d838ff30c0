//! Single-key file system test commands
//!
//! | Key | Command |
//! |-----|---------|
//! | `a` | format the store |
//! | `b` | delete every file |
//! | `c` | write the test record |
//! | `d` | read the test record back |
//! | `e` | remove the test record |
//!
//! Any other byte is ignored after a short sleep.

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{BlockFileSystem, BoardPrimitives};

use crate::config::{DispatcherConfig, TEST_RECORD_LEN};
use crate::error::StorageError;
use crate::storage::{DeleteReport, ReadReport, StorageManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    Format,
    DeleteAll,
    WriteTestRecord,
    ReadTestRecord,
    RemoveTestRecord,
}

pub struct CommandEntry {
    pub key: u8,
    pub command: Command,
    pub description: &'static str,
}

/// Key table, indexed by `Command as usize`
pub const COMMANDS: [CommandEntry; 5] = [
    CommandEntry {
        key: b'a',
        command: Command::Format,
        description: "format storage",
    },
    CommandEntry {
        key: b'b',
        command: Command::DeleteAll,
        description: "delete all files",
    },
    CommandEntry {
        key: b'c',
        command: Command::WriteTestRecord,
        description: "write the test record",
    },
    CommandEntry {
        key: b'd',
        command: Command::ReadTestRecord,
        description: "read the test record",
    },
    CommandEntry {
        key: b'e',
        command: Command::RemoveTestRecord,
        description: "remove the test record",
    },
];

impl Command {
    pub fn from_key(key: u8) -> Option<Self> {
        COMMANDS
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.command)
    }

    pub fn key(self) -> u8 {
        COMMANDS[self as usize].key
    }

    pub fn description(self) -> &'static str {
        COMMANDS[self as usize].description
    }
}

/// Successful command result, printed on the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Formatted,
    Deleted(DeleteReport),
    Written { len: usize },
    Read(ReadReport),
    Removed,
}

impl core::fmt::Display for Outcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Formatted => write!(f, "Formatted"),
            Self::Deleted(report) => write!(f, "{}", report),
            Self::Written { len } => write!(f, "Wrote {} bytes", len),
            Self::Read(report) => write!(f, "{}", report),
            Self::Removed => write!(f, "Removed"),
        }
    }
}

/// Runs commands strictly one after the other against the file store
pub struct CommandDispatcher<F> {
    storage: StorageManager<F>,
    config: DispatcherConfig,
}

impl<F: BlockFileSystem> CommandDispatcher<F> {
    pub fn new(storage: StorageManager<F>, config: DispatcherConfig) -> Self {
        Self { storage, config }
    }

    pub fn storage(&mut self) -> &mut StorageManager<F> {
        &mut self.storage
    }

    /// Run one command to completion
    pub fn execute(&mut self, command: Command) -> Result<Outcome, StorageError> {
        let path = self.config.record_path;
        match command {
            Command::Format => self.storage.format().map(|()| Outcome::Formatted),
            Command::DeleteAll => self.storage.delete_prefixed(None).map(Outcome::Deleted),
            Command::WriteTestRecord => {
                let data = self.config.record_data;
                self.storage
                    .write_file(path, &data)
                    .map(|()| Outcome::Written { len: data.len() })
            }
            Command::ReadTestRecord => {
                let mut buf = [0u8; TEST_RECORD_LEN];
                self.storage.read_file(path, &mut buf).map(Outcome::Read)
            }
            Command::RemoveTestRecord => self.storage.remove_file(path).map(|()| Outcome::Removed),
        }
    }

    /// Handle at most one input byte
    ///
    /// Returns the executed command and its result, or `None` when no valid
    /// key was pending (after sleeping the invalid-input delay).
    pub async fn step<B, D>(
        &mut self,
        board: &mut B,
        delay: &mut D,
    ) -> Option<(Command, Result<Outcome, StorageError>)>
    where
        B: BoardPrimitives,
        D: DelayNs,
    {
        let Some(command) = board.get_char().and_then(Command::from_key) else {
            delay.delay_ms(self.config.invalid_input_delay_ms).await;
            return None;
        };

        board.put_fmt(format_args!("Option: {}.", command.key() as char));
        debug!("Running {=str}", command.description());

        let result = self.execute(command);
        match &result {
            Ok(outcome) => board.put_fmt(format_args!(" {}\n", outcome)),
            Err(e) => board.put_fmt(format_args!(" {}\n", e)),
        }
        Some((command, result))
    }

    /// Serve commands forever
    pub async fn run<B, D>(mut self, board: &mut B, delay: &mut D) -> !
    where
        B: BoardPrimitives,
        D: DelayNs,
    {
        delay.delay_ms(self.config.startup_delay_ms).await;
        loop {
            self.step(board, delay).await;
        }
    }
}
