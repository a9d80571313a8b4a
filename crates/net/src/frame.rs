//! Wire framing
//!
//! Every frame is a little-endian `u32` length followed by the payload. The
//! first frame on a connection is a bincode-encoded [`Hello`] naming the
//! service the publisher intends to send.

use msgbridge_ports::{TransportError, TransportResult};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

/// Largest payload accepted in one frame
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Handshake protocol version
pub const PROTOCOL_VERSION: u8 = 1;

const LEN_SIZE: usize = 4;
const READ_CHUNK: usize = 64 * 1024;

/// Connection handshake sent by the publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Hello {
    pub version: u8,
    pub service: String,
}

impl Hello {
    pub(crate) fn new(service: &str) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            service: service.to_string(),
        }
    }

    pub(crate) fn encode(&self) -> TransportResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| TransportError::Handshake(e.to_string()))
    }

    pub(crate) fn decode(data: &[u8]) -> TransportResult<Self> {
        let hello: Hello =
            bincode::deserialize(data).map_err(|e| TransportError::Handshake(e.to_string()))?;
        if hello.version != PROTOCOL_VERSION {
            return Err(TransportError::Handshake(format!(
                "unsupported protocol version {}",
                hello.version
            )));
        }
        Ok(hello)
    }
}

/// Write one frame in a single `write_all`
pub(crate) fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let mut buf = Vec::with_capacity(LEN_SIZE + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    writer.write_all(&buf)
}

/// Incremental frame decoder
///
/// Tolerates read timeouts in the middle of a frame: partial data stays
/// buffered until the rest arrives.
#[derive(Debug)]
pub(crate) struct FrameReader {
    buf: Vec<u8>,
    chunk: Vec<u8>,
}

impl FrameReader {
    pub(crate) fn new() -> Self {
        Self {
            buf: Vec::new(),
            chunk: vec![0; READ_CHUNK],
        }
    }

    fn take_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.buf.len() < LEN_SIZE {
            return Ok(None);
        }
        let mut len_bytes = [0u8; LEN_SIZE];
        len_bytes.copy_from_slice(&self.buf[..LEN_SIZE]);
        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame of {} bytes exceeds limit", len),
            ));
        }
        if self.buf.len() < LEN_SIZE + len {
            return Ok(None);
        }
        let frame = self.buf[LEN_SIZE..LEN_SIZE + len].to_vec();
        self.buf.drain(..LEN_SIZE + len);
        Ok(Some(frame))
    }

    /// Next complete frame.
    ///
    /// Returns `Ok(None)` when the reader timed out before a frame completed,
    /// and `UnexpectedEof` when the peer closed the connection.
    pub(crate) fn next_frame<R: Read>(&mut self, reader: &mut R) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(frame) = self.take_frame()? {
                return Ok(Some(frame));
            }
            match reader.read(&mut self.chunk) {
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(n) => self.buf.extend_from_slice(&self.chunk[..n]),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Ok(None);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}
