use std::io::{self, Write};

/// Wraps a writer and records whether anything was written through it.
///
/// Used to tell if a failed render already sent part of a page to the client.
pub struct WriteRecorder<W> {
    inner: W,
    wrote: bool,
}

impl<W: Write> WriteRecorder<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            wrote: false,
        }
    }

    /// Returns true once any bytes have been forwarded to the inner writer.
    pub fn wrote(&self) -> bool {
        self.wrote
    }
}

impl<W: Write> Write for WriteRecorder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !buf.is_empty() {
            self.wrote = true;
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
