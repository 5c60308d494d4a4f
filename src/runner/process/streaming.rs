//! Forwarding of child output to the parent's streams.

use std::io::{self, Read, Write};

/// Byte counts for one forwarded stream.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub(super) struct ForwardStats {
    pub(super) bytes_read: u64,
    pub(super) bytes_written: u64,
    pub(super) write_failed: bool,
}

struct Counting<T> {
    inner: T,
    count: u64,
}

impl<T> Counting<T> {
    const fn new(inner: T) -> Self {
        Self { inner, count: 0 }
    }

    fn add(&mut self, bytes: usize) {
        self.count = self.count.saturating_add(u64::try_from(bytes).unwrap_or(u64::MAX));
    }
}

impl<R: Read> Read for Counting<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.add(read);
        Ok(read)
    }
}

impl<W: Write> Write for Counting<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.add(written);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Copy `reader` into `writer`. If the writer fails (the parent's stream was
/// closed), the rest of the child's output is drained so the child never
/// blocks on a full pipe.
pub(super) fn forward_child_output<R, W>(
    reader: R,
    writer: W,
    stream_name: &'static str,
) -> ForwardStats
where
    R: Read,
    W: Write,
{
    let mut source = Counting::new(reader);
    let mut sink = Counting::new(writer);
    let write_failed = match io::copy(&mut source, &mut sink) {
        Ok(_) => false,
        Err(err) => {
            tracing::debug!("could not forward child {stream_name}: {err}; draining");
            if let Err(drain_err) = io::copy(&mut source, &mut io::sink()) {
                tracing::debug!("could not drain child {stream_name}: {drain_err}");
            }
            true
        }
    };
    ForwardStats {
        bytes_read: source.count,
        bytes_written: sink.count,
        write_failed,
    }
}
