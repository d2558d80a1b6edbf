use std::io::{self, Chain, Cursor, Read};

/// Input handed to a format probe.
pub trait ProbeInput: Read {
    /// Asks for the input to be closed. While sniffing is in progress the
    /// request is only recorded; the underlying stream stays open.
    fn close(&mut self);
}

/// Buffered bytes followed by the rest of the underlying stream.
pub type Replay<R> = Chain<Cursor<Vec<u8>>, R>;

/// Mark/reset decorator used for format sniffing.
///
/// While marked, every byte read from the underlying stream is kept, up to
/// `limit` bytes; reading past the limit looks like the end of input.
/// [reset](SniffStream::reset) rewinds to the mark, and
/// [into_replay](SniffStream::into_replay) hands the kept bytes and the
/// untouched rest of the stream to the real reader, so nothing is lost.
pub struct SniffStream<R: Read> {
    inner: R,
    limit: usize,
    buffer: Vec<u8>,
    cursor: usize,
    marked: bool,
    close_suppressed: bool,
    close_requested: bool,
    closed: bool,
}

impl<R: Read> SniffStream<R> {
    pub fn new(inner: R, limit: usize) -> Self {
        Self {
            inner,
            limit: limit.max(1),
            buffer: Vec::new(),
            cursor: 0,
            marked: false,
            close_suppressed: false,
            close_requested: false,
            closed: false,
        }
    }

    /// Sets the mark at the current position and suppresses `close`.
    pub fn mark(&mut self) {
        _ = self.buffer.drain(..self.cursor);
        self.cursor = 0;
        self.marked = true;
        self.close_suppressed = true;
        self.close_requested = false;
    }

    /// Rewinds to the mark and forgets any recorded close request.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.close_requested = false;
    }

    /// Whether a close was requested since the last mark or reset.
    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Ends sniffing. The result reads the bytes from the current position
    /// on, buffered ones first.
    pub fn into_replay(self) -> Replay<R> {
        let mut buffered = Cursor::new(self.buffer);
        buffered.set_position(self.cursor as u64);
        buffered.chain(self.inner)
    }
}

impl<R: Read> Read for SniffStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed || self.close_requested || buf.is_empty() {
            return Ok(0);
        }

        if self.cursor < self.buffer.len() {
            let n = buf.len().min(self.buffer.len() - self.cursor);
            buf[..n].copy_from_slice(&self.buffer[self.cursor..self.cursor + n]);
            self.cursor += n;
            return Ok(n);
        }

        if !self.marked {
            return self.inner.read(buf);
        }

        let remaining = self.limit.saturating_sub(self.buffer.len());
        if remaining == 0 {
            return Ok(0);
        }
        let want = buf.len().min(remaining);
        let n = self.inner.read(&mut buf[..want])?;
        self.buffer.extend_from_slice(&buf[..n]);
        self.cursor += n;
        Ok(n)
    }
}

impl<R: Read> ProbeInput for SniffStream<R> {
    fn close(&mut self) {
        if self.close_suppressed {
            self.close_requested = true;
        } else {
            self.closed = true;
        }
    }
}
