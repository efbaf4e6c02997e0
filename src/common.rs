// Licensed under the Apache-2.0 license

//! Shared infrastructure used across the driver modules.

/// Minimal logging seam for driver diagnostics.
///
/// Drivers are generic over a `Logger` so production builds can run with
/// [`NoOpLogger`] (zero cost) while bring-up builds route messages to a
/// serial console via [`WriteLogger`].
pub trait Logger {
    fn log(&mut self, msg: &str);
}

/// Logger that discards everything.
#[derive(Clone, Copy, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&mut self, _msg: &str) {}
}

/// Logger backed by any blocking [`embedded_io::Write`] sink, typically a
/// UART. Write errors are swallowed; logging must never fail the driver.
pub struct WriteLogger<W: embedded_io::Write> {
    writer: W,
}

impl<W: embedded_io::Write> WriteLogger<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the underlying sink.
    pub fn release(self) -> W {
        self.writer
    }
}

impl<W: embedded_io::Write> Logger for WriteLogger<W> {
    fn log(&mut self, msg: &str) {
        let _ = self.writer.write_all(msg.as_bytes());
        let _ = self.writer.write_all(b"\r\n");
    }
}
