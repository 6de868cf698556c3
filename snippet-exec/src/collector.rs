use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, warn};

use crate::error::Error;

/// Bytes read from one pipe, plus the read error that cut it short, if any
#[derive(Debug)]
struct Drained {
    bytes: Vec<u8>,
    discarded: usize,
    error: Option<std::io::Error>,
}

/// Background drains of a child's stdout and stderr.
///
/// Both pipes are read from the moment the process starts so that a child
/// filling one pipe can never block while the other is being waited on.
pub struct StreamCollector {
    stdout: JoinHandle<Drained>,
    stderr: JoinHandle<Drained>,
}

impl StreamCollector {
    pub fn start<O, E>(stdout: O, stderr: E, limit: usize) -> Self
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        Self {
            stdout: tokio::spawn(drain(stdout, limit)),
            stderr: tokio::spawn(drain(stderr, limit)),
        }
    }

    /// Join both drains and decode them, degrading to what was read on errors.
    ///
    /// Returns `None`, dropping the capture, when the pipes are still open after
    /// `limit`: something outside the process group kept a copy of them.
    pub async fn finish_within(mut self, limit: Duration) -> Option<(String, String)> {
        let joined = time::timeout(limit, async {
            tokio::join!(&mut self.stdout, &mut self.stderr)
        })
        .await;

        match joined {
            Ok((stdout, stderr)) => Some((decode("stdout", stdout), decode("stderr", stderr))),
            Err(_) => {
                warn!("Output pipes still open {:?} after exit, giving up", limit);
                self.discard();
                None
            }
        }
    }

    /// Drop whatever was captured; used when the process was killed.
    pub fn discard(self) {
        self.stdout.abort();
        self.stderr.abort();
    }
}

async fn drain<R>(mut pipe: R, limit: usize) -> Drained
where
    R: AsyncRead + Unpin,
{
    let mut drained = Drained {
        bytes: Vec::new(),
        discarded: 0,
        error: None,
    };
    let mut chunk = [0u8; 8192];

    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let room = limit.saturating_sub(drained.bytes.len());
                let keep = n.min(room);
                drained.bytes.extend_from_slice(&chunk[..keep]);
                drained.discarded += n - keep;
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                drained.error = Some(e);
                break;
            }
        }
    }

    drained
}

fn decode(stream: &str, joined: Result<Drained, tokio::task::JoinError>) -> String {
    let drained = match joined.map_err(|e| Error::Stream(format!("{} drain task failed: {}", stream, e))) {
        Ok(drained) => drained,
        Err(e) => {
            warn!("{}", e);
            return String::new();
        }
    };

    if let Some(e) = &drained.error {
        warn!("Read error on {} after {} bytes: {}", stream, drained.bytes.len(), e);
    }
    if drained.discarded > 0 {
        warn!("{} exceeded the output limit, {} bytes dropped", stream, drained.discarded);
    }

    match String::from_utf8(drained.bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!("{} is not valid UTF-8, decoding lossily", stream);
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}
