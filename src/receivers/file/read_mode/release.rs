// SPDX-License-Identifier: Apache-2.0

//! Teardown of layered streams.
//!
//! Reading an archive stacks several streams on top of each other. Each layer
//! is closed on its own, outermost first, and a failure closing one layer is
//! logged and otherwise ignored so the layers beneath it still get closed.

use std::fmt;
use std::io;

use tracing::warn;

/// Which layer of an archive stream a resource is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    RawFile,
    Decompressor,
    TextDecoder,
    LineReader,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::RawFile => "file",
            ResourceKind::Decompressor => "gzip decoder",
            ResourceKind::TextDecoder => "utf-8 decoder",
            ResourceKind::LineReader => "line reader",
        };
        f.write_str(name)
    }
}

/// One layer of a stack of streams.
pub trait Closeable: Sized {
    fn kind(&self) -> ResourceKind;

    /// Close this layer and hand back the layer it wrapped, if any.
    ///
    /// The inner layer must come back even when closing this one failed.
    fn close(self) -> (io::Result<()>, Option<Self>);
}

/// Close every layer from `outermost` inwards, returning how many closes failed.
pub fn release_all<C: Closeable>(outermost: Option<C>) -> usize {
    let mut failures = 0;
    let mut next = outermost;

    while let Some(layer) = next {
        let kind = layer.kind();
        let (result, inner) = layer.close();
        if let Err(e) = result {
            failures += 1;
            warn!(
                resource = %kind,
                error_kind = ?e.kind(),
                error = %e,
                "Ignoring an error when closing {}", kind
            );
        }
        next = inner;
    }

    failures
}

/// Owns a stream stack and releases it on every exit path, including unwinding.
pub struct ReleaseGuard<C: Closeable> {
    stream: Option<C>,
}

impl<C: Closeable> ReleaseGuard<C> {
    pub fn new(stream: C) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    pub fn get_mut(&mut self) -> io::Result<&mut C> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::other("stream already released"))
    }

    /// Release now instead of at drop, returning the number of failed closes.
    pub fn release(mut self) -> usize {
        release_all(self.stream.take())
    }
}

impl<C: Closeable> Drop for ReleaseGuard<C> {
    fn drop(&mut self) {
        release_all(self.stream.take());
    }
}
