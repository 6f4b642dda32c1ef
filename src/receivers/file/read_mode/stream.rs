// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use super::release::{Closeable, ResourceKind};
use super::text::Utf8Decoder;

type TextLayer = Utf8Decoder<GzDecoder<File>>;

/// The stack of streams opened over one archive, named by its outermost layer.
///
/// Acquisition order is raw file, gzip decoder, UTF-8 decoder, line reader.
/// Closing a layer yields the layer beneath it.
pub enum ArchiveStream {
    Lines(BufReader<TextLayer>),
    Text(TextLayer),
    Gzip(GzDecoder<File>),
    Raw(File),
}

impl ArchiveStream {
    /// Raw file plus decompressor, for decoding without text handling.
    pub fn open_gzip(path: &Path) -> io::Result<Self> {
        let raw = File::open(path)?;
        Ok(ArchiveStream::Gzip(GzDecoder::new(raw)))
    }

    /// All four layers, ready for [`ArchiveStream::next_line`].
    pub fn open_lines(path: &Path) -> io::Result<Self> {
        let raw = File::open(path)?;
        let gzip = GzDecoder::new(raw);
        let text = Utf8Decoder::new(gzip);
        Ok(ArchiveStream::Lines(BufReader::new(text)))
    }

    /// Read the next line into `buf` without its terminator.
    /// Returns false at end of stream.
    pub fn next_line(&mut self, buf: &mut String) -> io::Result<bool> {
        let ArchiveStream::Lines(reader) = self else {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "archive stream is not open for line reading",
            ));
        };

        buf.clear();
        if reader.read_line(buf)? == 0 {
            return Ok(false);
        }
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') {
                buf.pop();
            }
        }
        Ok(true)
    }
}

impl Read for ArchiveStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ArchiveStream::Lines(r) => r.read(buf),
            ArchiveStream::Text(r) => r.read(buf),
            ArchiveStream::Gzip(r) => r.read(buf),
            ArchiveStream::Raw(r) => r.read(buf),
        }
    }
}

impl Closeable for ArchiveStream {
    fn kind(&self) -> ResourceKind {
        match self {
            ArchiveStream::Lines(_) => ResourceKind::LineReader,
            ArchiveStream::Text(_) => ResourceKind::TextDecoder,
            ArchiveStream::Gzip(_) => ResourceKind::Decompressor,
            ArchiveStream::Raw(_) => ResourceKind::RawFile,
        }
    }

    fn close(self) -> (io::Result<()>, Option<Self>) {
        match self {
            ArchiveStream::Lines(reader) => {
                (Ok(()), Some(ArchiveStream::Text(reader.into_inner())))
            }
            ArchiveStream::Text(decoder) => {
                let pending = decoder.pending_len();
                let result = if pending == 0 {
                    Ok(())
                } else {
                    Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("discarded {} bytes of an incomplete UTF-8 sequence", pending),
                    ))
                };
                (result, Some(ArchiveStream::Gzip(decoder.into_inner())))
            }
            ArchiveStream::Gzip(decoder) => {
                (Ok(()), Some(ArchiveStream::Raw(decoder.into_inner())))
            }
            ArchiveStream::Raw(file) => (close_file(file), None),
        }
    }
}

#[cfg(unix)]
fn close_file(file: File) -> io::Result<()> {
    use std::os::fd::IntoRawFd;

    let fd = file.into_raw_fd();
    // SAFETY: `fd` was just released by `file`, so nothing else owns or closes it.
    if unsafe { libc::close(fd) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn close_file(file: File) -> io::Result<()> {
    drop(file);
    Ok(())
}
