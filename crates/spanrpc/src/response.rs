//! Response Buffer - Length-Bounded Append-Only Output
//!
//! The engine writes responses into a byte region the caller owns; nothing
//! is allocated and nothing grows. Appends are all-or-nothing: a write
//! whose formatted length does not fit the remaining capacity (leaving room
//! for the trailing NUL) is rejected with [`RpcError::OutOfResBuf`] and the
//! recorded length stays where it was. Bytes physically written past the
//! recorded length by a rejected attempt are not erased, but they are
//! invisible to [`ResponseBuffer::as_bytes`] and later appends overwrite
//! them.
//!
//! Successful appends keep a NUL byte directly after the content (not
//! counted in the length), so embedders handing the region to C-side
//! transports see a terminated string.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
// (None)

// Layer 3: Internal module imports
use crate::error::{RpcError, RpcResult};

/// Append-only view over a caller-owned output region.
pub struct ResponseBuffer<'a> {
    data: &'a mut [u8],
    len: usize,
}

impl<'a> ResponseBuffer<'a> {
    /// Wrap a caller-owned byte region. The region's full length is the
    /// buffer capacity; the recorded content length starts at zero.
    pub fn new(data: &'a mut [u8]) -> Self {
        ResponseBuffer { data, len: 0 }
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes of content recorded so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no content has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The recorded content.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The recorded content as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }

    /// Reset the recorded length to zero without touching the bytes.
    pub fn rewind(&mut self) {
        self.len = 0;
    }

    /// Reset to an empty, NUL-led region: zero length, first byte zero.
    pub fn clear(&mut self) {
        self.len = 0;
        if let Some(first) = self.data.first_mut() {
            *first = 0;
        }
    }

    /// Append formatted text.
    ///
    /// ```rust
    /// use spanrpc::ResponseBuffer;
    ///
    /// let mut region = [0u8; 32];
    /// let mut buffer = ResponseBuffer::new(&mut region);
    /// buffer.append(format_args!("{{\"x\":{}}}", 41 + 1)).unwrap();
    /// assert_eq!(buffer.as_bytes(), br#"{"x":42}"#);
    /// ```
    pub fn append(&mut self, args: fmt::Arguments<'_>) -> RpcResult<()> {
        let available = self.data.len() - self.len;
        let mut cursor = Cursor {
            target: &mut self.data[self.len..],
            written: 0,
        };
        let outcome = fmt::Write::write_fmt(&mut cursor, args);
        let written = cursor.written;
        if outcome.is_err() || written >= available {
            return Err(RpcError::OutOfResBuf);
        }
        self.data[self.len + written] = 0;
        self.len += written;
        Ok(())
    }

    /// Append raw bytes, same overflow contract as [`ResponseBuffer::append`].
    ///
    /// Used for echoing spans of the request buffer (ids, string params),
    /// which need not be valid UTF-8.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> RpcResult<()> {
        let available = self.data.len() - self.len;
        if bytes.len() >= available {
            // Truncated prefix lands in the region but stays unrecorded.
            let fits = available.min(bytes.len());
            self.data[self.len..self.len + fits].copy_from_slice(&bytes[..fits]);
            return Err(RpcError::OutOfResBuf);
        }
        self.data[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.data[self.len + bytes.len()] = 0;
        self.len += bytes.len();
        Ok(())
    }
}

impl fmt::Debug for ResponseBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBuffer")
            .field("len", &self.len)
            .field("capacity", &self.data.len())
            .finish()
    }
}

/// `fmt::Write` adapter over the unrecorded tail of the region. Stops the
/// formatting machinery as soon as a fragment does not fit.
struct Cursor<'b> {
    target: &'b mut [u8],
    written: usize,
}

impl fmt::Write for Cursor<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let room = self.target.len() - self.written;
        let take = room.min(bytes.len());
        self.target[self.written..self.written + take].copy_from_slice(&bytes[..take]);
        self.written += take;
        if take < bytes.len() {
            return Err(fmt::Error);
        }
        Ok(())
    }
}
