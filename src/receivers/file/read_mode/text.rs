// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Read};

const REPLACEMENT: &[u8] = "\u{FFFD}".as_bytes();
const CHUNK_SIZE: usize = 8192;

/// Fixed-charset text decoder: passes through valid UTF-8 and replaces
/// malformed sequences with U+FFFD, so everything read from it is valid UTF-8.
///
/// A multi-byte sequence split across two reads of the inner stream is held
/// back until it completes. One still incomplete at end of stream becomes U+FFFD.
pub struct Utf8Decoder<R> {
    inner: R,
    /// Undecoded tail of the last chunk (an incomplete sequence)
    pending: Vec<u8>,
    /// Decoded bytes not yet handed out
    decoded: Vec<u8>,
    pos: usize,
    eof: bool,
}

impl<R: Read> Utf8Decoder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            decoded: Vec::new(),
            pos: 0,
            eof: false,
        }
    }

    /// Bytes read from the inner stream but not yet decoded.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> io::Result<()> {
        self.decoded.clear();
        self.pos = 0;

        let mut chunk = [0u8; CHUNK_SIZE];
        let n = loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };

        if n == 0 {
            self.eof = true;
            if !self.pending.is_empty() {
                self.pending.clear();
                self.decoded.extend_from_slice(REPLACEMENT);
            }
            return Ok(());
        }

        self.pending.extend_from_slice(&chunk[..n]);
        self.decode_pending();
        Ok(())
    }

    fn decode_pending(&mut self) {
        let input = std::mem::take(&mut self.pending);
        let mut rest = input.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.decoded.extend_from_slice(valid.as_bytes());
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.decoded.extend_from_slice(valid);
                    match e.error_len() {
                        Some(len) => {
                            self.decoded.extend_from_slice(REPLACEMENT);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end of the chunk
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
    }
}

impl<R: Read> Read for Utf8Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.pos >= self.decoded.len() {
            if self.eof {
                return Ok(0);
            }
            self.fill()?;
        }

        let available = &self.decoded[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out its input one byte per read to split every multi-byte sequence.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((first, rest)) if !buf.is_empty() => {
                    buf[0] = *first;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    fn decode(input: impl Read) -> String {
        let mut out = String::new();
        Utf8Decoder::new(input).read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_valid_utf8_passes_through() {
        assert_eq!(decode("héllo wörld ✓\n".as_bytes()), "héllo wörld ✓\n");
    }

    #[test]
    fn test_split_sequences_are_reassembled() {
        let text = "naïve café ✓ 日本";
        assert_eq!(decode(Trickle(text.as_bytes())), text);
    }

    #[test]
    fn test_malformed_bytes_are_replaced() {
        assert_eq!(decode(&b"ok \xff bad\n"[..]), "ok \u{FFFD} bad\n");
    }

    #[test]
    fn test_truncated_tail_is_replaced() {
        // First two bytes of a three-byte sequence
        assert_eq!(decode(&b"end \xe2\x9c"[..]), "end \u{FFFD}");
    }

    #[test]
    fn test_pending_bytes_tracked() {
        let mut decoder = Utf8Decoder::new(Trickle(b"\xe2\x9c\x93"));
        let mut buf = [0u8; 8];

        let n = decoder.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], "✓".as_bytes());
        assert_eq!(decoder.pending_len(), 0);
        assert_eq!(decoder.read(&mut buf).unwrap(), 0);
    }
}
