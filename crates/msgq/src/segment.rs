//! Memory-mapped segment file
//!
//! Owns the mapping and hands out the shared header. The mapping is released
//! when the segment is dropped; the file itself stays so that late
//! subscribers and restarted publishers find the same ring.

use memmap2::{MmapMut, MmapOptions};
use msgbridge_ports::{TransportError, TransportResult};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const MAGIC: u64 = 0x4d53_4751_5249_4e47; // "MSGQRING"
const INITIALIZING: u64 = 1;

/// Header size in bytes; the ring starts right after it
pub(crate) const HEADER_SIZE: usize = 64;

/// Smallest ring we accept
pub(crate) const MIN_CAPACITY: usize = 4096;

const INIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Shared header at the start of every segment
///
/// `reserve` is the end of the byte range the writer may currently be
/// touching and `commit` the end of fully written data. Both are monotonic
/// byte counters; `pos % capacity` is the offset in the ring.
#[repr(C)]
pub(crate) struct Header {
    magic: AtomicU64,
    capacity: AtomicU64,
    pub(crate) reserve: AtomicU64,
    pub(crate) commit: AtomicU64,
}

const _: () = assert!(std::mem::size_of::<Header>() <= HEADER_SIZE);

pub(crate) struct Segment {
    map: MmapMut,
    capacity: u64,
    path: PathBuf,
}

impl Segment {
    /// Open the segment at `path`, creating and initializing it with a ring of
    /// `capacity` bytes when it does not exist yet
    pub(crate) fn open(path: &Path, capacity: usize) -> TransportResult<Self> {
        let capacity = capacity & !7;
        if capacity < MIN_CAPACITY {
            return Err(TransportError::Config(format!(
                "segment size {} is below the minimum of {}",
                capacity, MIN_CAPACITY
            )));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                TransportError::Io(format!("cannot open segment {}: {}", path.display(), e))
            })?;

        let len = file.metadata()?.len();
        if len == 0 {
            file.set_len((HEADER_SIZE + capacity) as u64)?;
        } else if len < (HEADER_SIZE + MIN_CAPACITY) as u64 {
            return Err(TransportError::Config(format!(
                "segment {} is truncated ({} bytes)",
                path.display(),
                len
            )));
        }

        // SAFETY: the file stays open for the duration of the call and the
        // mapping is only accessed through the atomics in `Header` and the
        // bounds-checked copies in `ring`.
        let map = unsafe { MmapOptions::new().map_mut(&file)? };

        let mut segment = Self {
            capacity: 0,
            map,
            path: path.to_path_buf(),
        };
        segment.capacity = segment.initialize()?;
        Ok(segment)
    }

    /// Initialize the header exactly once across all processes and return the
    /// ring capacity recorded in it
    fn initialize(&self) -> TransportResult<u64> {
        let header = self.header();
        let mapped = (self.map.len() - HEADER_SIZE) as u64 & !7;

        match header
            .magic
            .compare_exchange(0, INITIALIZING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                header.capacity.store(mapped, Ordering::Relaxed);
                header.reserve.store(0, Ordering::Relaxed);
                header.commit.store(0, Ordering::Relaxed);
                header.magic.store(MAGIC, Ordering::Release);
                Ok(mapped)
            }
            Err(_) => {
                let deadline = Instant::now() + INIT_TIMEOUT;
                loop {
                    match header.magic.load(Ordering::Acquire) {
                        MAGIC => break,
                        INITIALIZING if Instant::now() < deadline => {
                            thread::sleep(Duration::from_millis(1))
                        }
                        other => {
                            return Err(TransportError::Config(format!(
                                "segment {} has an invalid header (magic {:#x})",
                                self.path.display(),
                                other
                            )));
                        }
                    }
                }
                let capacity = header.capacity.load(Ordering::Relaxed);
                if capacity == 0 || capacity > mapped || capacity % 8 != 0 {
                    return Err(TransportError::Config(format!(
                        "segment {} records capacity {} but maps {} bytes",
                        self.path.display(),
                        capacity,
                        mapped
                    )));
                }
                Ok(capacity)
            }
        }
    }

    pub(crate) fn header(&self) -> &Header {
        // SAFETY: the mapping is page aligned and at least HEADER_SIZE long,
        // and every header field is an atomic, so shared access from several
        // processes is sound.
        unsafe { &*(self.map.as_ptr() as *const Header) }
    }

    /// Ring capacity in bytes
    pub(crate) fn capacity(&self) -> u64 {
        self.capacity
    }

    /// First byte of the ring
    pub(crate) fn ring_ptr(&self) -> *const u8 {
        // SAFETY: HEADER_SIZE is within the mapping (checked in `open`)
        unsafe { self.map.as_ptr().add(HEADER_SIZE) }
    }

    /// First byte of the ring, writable
    pub(crate) fn ring_mut_ptr(&mut self) -> *mut u8 {
        // SAFETY: HEADER_SIZE is within the mapping (checked in `open`)
        unsafe { self.map.as_mut_ptr().add(HEADER_SIZE) }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}
