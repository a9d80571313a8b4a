//! Single-writer, multi-reader byte ring
//!
//! Records are a `u32` length followed by the payload, padded to 8 bytes.
//! When a record does not fit in the tail of the ring the writer leaves a
//! [`WRAP`] marker and starts again at offset 0.
//!
//! The writer publishes `reserve` before touching any byte and `commit`
//! after the record is complete. A reader copies a record out, then checks
//! that `reserve` never came within one lap of the record start; otherwise
//! the copy may be torn and the reader skips to the newest data.

use crate::segment::Segment;
use log::{debug, warn};
use msgbridge_core::Message;
use msgbridge_ports::{TransportError, TransportResult};
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering, fence};

const LEN_SIZE: u64 = 4;
const WRAP: u32 = u32::MAX;

fn align8(n: u64) -> u64 {
    (n + 7) & !7
}

/// Largest payload a ring of `capacity` bytes accepts
pub(crate) fn max_message_size(capacity: u64) -> usize {
    (capacity / 4 - LEN_SIZE) as usize
}

/// Length word at ring offset `off`
///
/// # Safety
/// `off` must be 8-aligned and at most `capacity - 4`.
unsafe fn len_word<'a>(ring: *const u8, off: u64) -> &'a AtomicU32 {
    unsafe { &*(ring.add(off as usize) as *const AtomicU32) }
}

/// Writing end of a ring
pub(crate) struct RingWriter {
    segment: Segment,
    pos: u64,
}

impl RingWriter {
    pub(crate) fn new(segment: Segment) -> Self {
        let header = segment.header();
        let pos = header.commit.load(Ordering::Acquire);
        // A writer that died mid-record may have left reserve ahead of commit
        header.reserve.store(pos, Ordering::Release);
        Self { segment, pos }
    }

    /// Append one record
    pub(crate) fn write(&mut self, data: &[u8]) -> TransportResult<()> {
        let capacity = self.segment.capacity();
        let limit = max_message_size(capacity);
        if data.len() > limit {
            return Err(TransportError::MessageTooLarge {
                size: data.len(),
                limit,
            });
        }

        let record = align8(LEN_SIZE + data.len() as u64);
        let mut start = self.pos;
        let off = start % capacity;
        let skip = if off + record > capacity {
            capacity - off
        } else {
            0
        };
        let end = start + skip + record;

        let ring = self.segment.ring_mut_ptr();
        let header = self.segment.header();
        header.reserve.store(end, Ordering::SeqCst);

        // SAFETY: `off` and 0 are 8-aligned offsets with at least 8 bytes left
        // in the ring, and `off + record <= capacity` after the wrap, so the
        // payload copy stays inside the mapping.
        unsafe {
            if skip > 0 {
                len_word(ring, off).store(WRAP, Ordering::Relaxed);
                start += skip;
            }
            let off = start % capacity;
            ptr::copy_nonoverlapping(
                data.as_ptr(),
                ring.add((off + LEN_SIZE) as usize),
                data.len(),
            );
            len_word(ring, off).store(data.len() as u32, Ordering::Relaxed);
        }

        header.commit.store(end, Ordering::Release);
        self.pos = end;
        Ok(())
    }
}

/// Reading end of a ring
pub(crate) struct RingReader {
    segment: Segment,
    pos: u64,
}

impl RingReader {
    /// Reader positioned at the newest data: only later records are seen
    pub(crate) fn new(segment: Segment) -> Self {
        let pos = segment.header().commit.load(Ordering::Acquire);
        Self { segment, pos }
    }

    /// Whether committed data is waiting
    pub(crate) fn has_pending(&self) -> bool {
        self.segment.header().commit.load(Ordering::Acquire) != self.pos
    }

    /// Skip to the newest committed position, dropping whatever was unread
    fn resync(&mut self, commit: u64) {
        warn!(
            "msgq reader on {} overrun by writer, dropped {} bytes",
            self.segment.path().display(),
            commit.saturating_sub(self.pos)
        );
        self.pos = commit;
    }

    /// Whether bytes starting at `pos` may have been overwritten
    fn clobbered(&self, pos: u64) -> bool {
        fence(Ordering::Acquire);
        self.segment.header().reserve.load(Ordering::Relaxed) > pos + self.segment.capacity()
    }

    /// Read the next record, if any
    pub(crate) fn read(&mut self) -> Option<Message> {
        let capacity = self.segment.capacity();
        let ring = self.segment.ring_ptr();

        loop {
            let commit = self.segment.header().commit.load(Ordering::Acquire);
            if commit == self.pos {
                return None;
            }
            if commit < self.pos {
                // The segment was re-created underneath us
                debug!(
                    "msgq segment {} restarted, resetting reader",
                    self.segment.path().display()
                );
                self.pos = commit;
                return None;
            }
            if commit - self.pos > capacity {
                self.resync(commit);
                return None;
            }

            let off = self.pos % capacity;
            // SAFETY: `pos` only ever advances by 8-aligned amounts, so `off`
            // is 8-aligned and at least 8 bytes remain before the ring end.
            let len = unsafe { len_word(ring, off) }.load(Ordering::Relaxed);

            if len == WRAP {
                if self.clobbered(self.pos) {
                    self.resync(commit);
                    return None;
                }
                self.pos += capacity - off;
                continue;
            }

            let len = len as u64;
            if off + LEN_SIZE + len > capacity {
                // Torn length word
                self.resync(commit);
                return None;
            }

            let mut data = vec![0u8; len as usize];
            // SAFETY: the source range was bounds-checked against the ring above
            unsafe {
                ptr::copy_nonoverlapping(
                    ring.add((off + LEN_SIZE) as usize),
                    data.as_mut_ptr(),
                    len as usize,
                );
            }

            if self.clobbered(self.pos) {
                self.resync(commit);
                return None;
            }

            self.pos += align8(LEN_SIZE + len);
            return Some(Message::new(data));
        }
    }

    /// Read every pending record and keep only the newest
    pub(crate) fn read_latest(&mut self) -> Option<Message> {
        let mut latest = None;
        while let Some(msg) = self.read() {
            latest = Some(msg);
        }
        latest
    }
}
