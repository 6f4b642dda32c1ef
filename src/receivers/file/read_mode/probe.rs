// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Read};
use std::path::Path;
use std::time::Instant;

use tracing::{debug, warn};

use super::release::ReleaseGuard;
use super::stream::ArchiveStream;

const PROBE_BUFFER_SIZE: usize = 8192;

/// Validity check run over an archive before any of its lines are emitted.
pub trait ArchiveProbe: Send {
    fn is_corrupt(&self, path: &Path) -> bool;
}

/// Decompresses the whole archive into a discard buffer.
///
/// gzip exposes no cheap partial check, so the only reliable signal is a full
/// decode. Any error, including failing to open the file, counts as corrupt.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullDecodeProbe;

impl ArchiveProbe for FullDecodeProbe {
    fn is_corrupt(&self, path: &Path) -> bool {
        let start = Instant::now();

        match decode_to_end(path) {
            Ok(decompressed) => {
                debug!(
                    path = %path.display(),
                    decompressed_bytes = decompressed,
                    "Archive passed validity check"
                );
                false
            }
            Err(e) => {
                let duration = (start.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;
                warn!(
                    path = %path.display(),
                    error = %e,
                    duration,
                    "Detected corrupted archive {}, file won't be processed",
                    path.display()
                );
                true
            }
        }
    }
}

fn decode_to_end(path: &Path) -> io::Result<u64> {
    let mut guard = ReleaseGuard::new(ArchiveStream::open_gzip(path)?);
    let stream = guard.get_mut()?;

    let mut buf = [0u8; PROBE_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        match stream.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => total += n as u64,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
