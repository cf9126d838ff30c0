//! Board primitives consumed by the platform-agnostic logic

/// Minimal primitive API every board exposes after bring-up
///
/// Clock tree, pin multiplexing and peripheral setup happen in the BSP's
/// `init`; once it returns the primitives below are all the core needs.
pub trait BoardPrimitives {
    /// Next console byte, or `None` when nothing is pending
    fn get_char(&mut self) -> Option<u8>;

    /// Write one byte to the console
    fn put_char(&mut self, byte: u8);

    /// Busy-wait for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);

    /// Milliseconds since boot (wraps)
    fn tick_ms(&self) -> u32;

    /// Drive the status indicator
    fn set_indicator(&mut self, on: bool);

    /// Write a whole string to the console
    fn put_str(&mut self, text: &str) {
        for byte in text.bytes() {
            self.put_char(byte);
        }
    }

    /// Write formatted text to the console
    fn put_fmt(&mut self, args: core::fmt::Arguments<'_>) {
        struct Console<'a, B: ?Sized>(&'a mut B);

        impl<B: BoardPrimitives + ?Sized> core::fmt::Write for Console<'_, B> {
            fn write_str(&mut self, s: &str) -> core::fmt::Result {
                self.0.put_str(s);
                Ok(())
            }
        }

        // console writes cannot fail
        let _ = core::fmt::write(&mut Console(self), args);
    }
}
