use bytes::Bytes;
use bytes::BytesMut;

/// A window over caller-owned bytes.
///
/// Bytes are never copied nor modified: slicing [`Bytes`] shares the
/// underlying storage.
#[derive(Clone, Debug)]
pub struct RawWindow {
    bytes: Bytes,
    start: usize,
    len: Option<usize>,
}

impl RawWindow {
    /// Creates a window of `len` bytes starting at `start`.
    ///
    /// `len` set to [`None`] means "up to the end of `bytes`".
    /// Bounds are checked by [`RawWindow::normalize`].
    #[inline(always)]
    pub fn new(bytes: Bytes, start: usize, len: Option<usize>) -> Self {
        Self { bytes, start, len }
    }

    /// Creates a window covering the whole of `bytes`.
    #[inline(always)]
    pub fn full(bytes: Bytes) -> Self {
        let len = bytes.len();
        Self::new(bytes, 0, Some(len))
    }

    /// Clamps the window inside the underlying buffer.
    ///
    /// Returns the window unchanged as [`Err`] if `start` is beyond the end
    /// of the buffer.
    pub fn normalize(self) -> Result<Self, Self> {
        let available = match self.bytes.len().checked_sub(self.start) {
            Some(available) => available,
            None => return Err(self),
        };
        let len = self.len.unwrap_or(available).min(available);

        Ok(Self {
            bytes: self.bytes,
            start: self.start,
            len: Some(len),
        })
    }

    /// Offset of the first byte not yet consumed.
    #[inline(always)]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Remaining number of bytes in the window.
    #[inline(always)]
    pub fn len(&self) -> usize {
        let available = self.bytes.len().saturating_sub(self.start);
        self.len.map_or(available, |len| len.min(available))
    }

    /// Whether no byte remains.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the remaining bytes of the window.
    pub fn as_slice(&self) -> &[u8] {
        let start = self.start.min(self.bytes.len());
        &self.bytes[start..start + self.len()]
    }

    /// Consumes up to `budget` bytes from the front of the window.
    ///
    /// The returned slice shares storage with the caller's buffer.
    pub(crate) fn take_front(&mut self, budget: usize) -> Bytes {
        let amount = self.len().min(budget);
        let chunk = self.bytes.slice(self.start..self.start + amount);

        self.start += amount;
        self.len = Some(self.len() - amount);

        chunk
    }
}

/// The payload source of a response.
///
/// At most one source exists at a time.
#[derive(Debug, Default)]
pub enum Payload {
    /// Nothing to transmit.
    #[default]
    Empty,

    /// A window over caller-owned bytes.
    Raw(RawWindow),

    /// A response-owned growable buffer.
    Body(BytesMut),
}

impl Payload {
    /// Number of bytes this payload would transmit.
    pub fn len(&self) -> usize {
        match self {
            Payload::Empty => 0,
            Payload::Raw(window) => window.len(),
            Payload::Body(body) => body.len(),
        }
    }

    /// Whether there is nothing to transmit.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Turns a growable buffer into a window over its own storage.
    ///
    /// No copy happens; the buffer is consumed. Other variants are returned as they are.
    pub(crate) fn into_raw(self) -> Self {
        match self {
            Payload::Body(body) => Payload::Raw(RawWindow::full(body.freeze())),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_rest() {
        let window = RawWindow::new(Bytes::from_static(b"0123456789"), 4, None)
            .normalize()
            .unwrap();

        assert_eq!(window.start(), 4);
        assert_eq!(window.len(), 6);
        assert_eq!(window.as_slice(), b"456789");
    }

    #[test]
    fn normalize_clamp() {
        let window = RawWindow::new(Bytes::from_static(b"0123456789"), 8, Some(100))
            .normalize()
            .unwrap();

        assert_eq!(window.len(), 2);
        assert_eq!(window.as_slice(), b"89");
    }

    #[test]
    fn normalize_out_of_range() {
        assert!(RawWindow::new(Bytes::from_static(b"0123"), 5, None)
            .normalize()
            .is_err());

        let empty = RawWindow::new(Bytes::from_static(b"0123"), 4, Some(1))
            .normalize()
            .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn take_front() {
        let mut window = RawWindow::full(Bytes::from_static(b"abcdefg"));

        assert_eq!(&window.take_front(3)[..], b"abc");
        assert_eq!(window.start(), 3);
        assert_eq!(window.len(), 4);

        assert_eq!(&window.take_front(10)[..], b"defg");
        assert!(window.is_empty());
    }

    #[test]
    fn body_into_raw() {
        let mut body = BytesMut::new();
        body.extend_from_slice(b"body");
        let ptr = body.as_ptr();

        match Payload::Body(body).into_raw() {
            Payload::Raw(window) => {
                assert_eq!(window.as_slice(), b"body");
                assert_eq!(window.as_slice().as_ptr(), ptr);
            }
            _ => panic!("expected raw window"),
        }
    }
}
