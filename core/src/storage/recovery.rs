//! Operator-confirmed destructive recovery

use hal_abstractions::{BlockFileSystem, BoardPrimitives};

use super::StorageManager;
use crate::error::StorageError;

/// Proof that the operator agreed to erase the flash
///
/// Only [`await_wipe_consent`] hands these out to firmware code.
#[derive(Debug)]
pub struct WipeConsent {
    key: u8,
}

impl WipeConsent {
    #[cfg(test)]
    pub(crate) fn from_key(key: u8) -> Self {
        Self { key }
    }

    /// Key the operator pressed
    pub fn key(&self) -> u8 {
        self.key
    }
}

/// Prompt on the console and block until one key arrives
pub fn await_wipe_consent<B: BoardPrimitives>(board: &mut B) -> WipeConsent {
    board.put_str("Could not init filesystem.\n");
    board.put_str("Press a key to wipe the memory.\n");

    loop {
        if let Some(key) = board.get_char() {
            return WipeConsent { key };
        }
        board.delay_ms(1);
    }
}

/// Boot-time recovery after a failed mount
///
/// Asks for consent, switches the indicator off and chip-erases the flash.
/// The caller is expected to halt afterwards.
pub fn wipe_with_consent<B, F>(
    board: &mut B,
    storage: &mut StorageManager<F>,
) -> Result<(), StorageError>
where
    B: BoardPrimitives,
    F: BlockFileSystem,
{
    let consent = await_wipe_consent(board);
    board.set_indicator(false);
    board.put_str("Wiping...\n");

    let result = storage.wipe(consent);
    match &result {
        Ok(()) => board.put_str("Done, restart the board..\n"),
        Err(e) => board.put_fmt(format_args!("Wipe failed: {}\n", e)),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemFs, MockBoard};
    use crate::storage::StorageState;

    #[test]
    fn test_consent_waits_for_a_key() {
        let mut board = MockBoard::with_input(b"x");
        board.idle_polls = 5;

        let consent = await_wipe_consent(&mut board);
        assert_eq!(consent.key(), b'x');
        assert_eq!(board.tick_ms(), 5);
        assert!(board.output().contains("Press a key to wipe the memory."));
    }

    #[test]
    fn test_wipe_flow() {
        let mut board = MockBoard::with_input(b"\n");
        let mut storage = StorageManager::new(MemFs::blank());
        assert!(storage.mount().is_err());

        assert_eq!(wipe_with_consent(&mut board, &mut storage), Ok(()));
        assert_eq!(storage.state(), StorageState::Wiped);
        assert_eq!(board.indicator(), Some(false));
        assert!(board.output().ends_with("Wiping...\nDone, restart the board..\n"));
        assert!(storage.fs_mut().device().is_blank());
    }

    #[test]
    fn test_wipe_failure_reported() {
        let mut board = MockBoard::with_input(b"y");
        let mut storage = StorageManager::new(MemFs::blank());
        let _ = storage.mount();
        storage.fs_mut().device().fail_erase = true;

        assert!(wipe_with_consent(&mut board, &mut storage).is_err());
        assert!(board.output().contains("Wipe failed: Device error: Timeout"));
    }
}
