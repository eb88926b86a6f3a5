//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees). The halo
//! exchange only ever talks to immediate rank neighbours through
//! [`Communicator::sendrecv`]; the per-storm reduction and start-up
//! synchronisation use the collectives [`Communicator::allgather`] and
//! [`Communicator::barrier`].

use bytes::Bytes;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::storm_error::StormError;

/// Message tag. Each logical exchange uses its own tag so that messages of
/// different phases never match each other.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

impl CommTag {
    pub const fn new(base: u16) -> Self {
        Self(base)
    }
    pub const fn base(self) -> u16 {
        self.0
    }
    pub const fn offset(self, by: u16) -> Self {
        Self(self.0.wrapping_add(by))
    }
}

/// Tags for one halo exchange: one per travel direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HaloTags {
    /// First real cell travelling to the left neighbour's right ghost.
    pub leftward: CommTag,
    /// Last real cell travelling to the right neighbour's left ghost.
    pub rightward: CommTag,
}

impl HaloTags {
    pub const fn from_base(base: CommTag) -> Self {
        Self {
            leftward: base,
            rightward: base.offset(1),
        }
    }
}

/// Blocking communication interface.
pub trait Communicator {
    /// This worker's rank in `[0, size)`.
    fn rank(&self) -> usize;
    /// Number of workers in the run.
    fn size(&self) -> usize;

    /// True for the serial stand-in that never talks to anyone.
    fn is_no_comm(&self) -> bool {
        false
    }

    /// Block until every worker has reached the barrier.
    fn barrier(&self) -> Result<(), StormError>;

    /// Send `send` to `dest` and receive `recv.len()` bytes from `source`.
    ///
    /// A `None` peer skips that direction and leaves the buffer untouched,
    /// the same contract as `MPI_Sendrecv` with `MPI_PROC_NULL`.
    fn sendrecv(
        &self,
        send: &[u8],
        dest: Option<usize>,
        recv: &mut [u8],
        source: Option<usize>,
        tag: CommTag,
    ) -> Result<(), StormError>;

    /// Gather `send` from every rank into `recv`, ordered by rank.
    /// `recv.len()` must equal `send.len() * size()`.
    fn allgather(&self, send: &[u8], recv: &mut [u8]) -> Result<(), StormError>;

    /// Tear the whole run down after a fatal local failure.
    fn abort(&self, reason: &str);
}

impl<C: Communicator + ?Sized> Communicator for &C {
    fn rank(&self) -> usize {
        (**self).rank()
    }
    fn size(&self) -> usize {
        (**self).size()
    }
    fn is_no_comm(&self) -> bool {
        (**self).is_no_comm()
    }
    fn barrier(&self) -> Result<(), StormError> {
        (**self).barrier()
    }
    fn sendrecv(
        &self,
        send: &[u8],
        dest: Option<usize>,
        recv: &mut [u8],
        source: Option<usize>,
        tag: CommTag,
    ) -> Result<(), StormError> {
        (**self).sendrecv(send, dest, recv, source, tag)
    }
    fn allgather(&self, send: &[u8], recv: &mut [u8]) -> Result<(), StormError> {
        (**self).allgather(send, recv)
    }
    fn abort(&self, reason: &str) {
        (**self).abort(reason)
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

fn check_gather_len(send: &[u8], recv: &[u8], size: usize) -> Result<(), StormError> {
    if send.len() * size != recv.len() {
        return Err(StormError::Comm(format!(
            "allgather buffer holds {} bytes, expected {} x {}",
            recv.len(),
            send.len(),
            size
        )));
    }
    Ok(())
}

/// Compile-time no-op comm for single-worker runs and serial unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn is_no_comm(&self) -> bool {
        true
    }
    fn barrier(&self) -> Result<(), StormError> {
        Ok(())
    }
    fn sendrecv(
        &self,
        _send: &[u8],
        dest: Option<usize>,
        _recv: &mut [u8],
        source: Option<usize>,
        _tag: CommTag,
    ) -> Result<(), StormError> {
        match dest.or(source) {
            Some(peer) => Err(StormError::Comm(format!(
                "single-worker communicator has no peer {peer}"
            ))),
            None => Ok(()),
        }
    }
    fn allgather(&self, send: &[u8], recv: &mut [u8]) -> Result<(), StormError> {
        check_gather_len(send, recv, 1)?;
        recv.copy_from_slice(send);
        Ok(())
    }
    fn abort(&self, reason: &str) {
        log::error!("aborting single-worker run: {reason}");
    }
}

// --- RayonComm: intra-process / multi-thread ---
type Key = (usize, usize, u16); // (src, dst, tag)

// Reserved for collectives; halo tags are chosen well below these.
const TAG_ALLGATHER: u16 = 0xFFF0;
const TAG_BARRIER: u16 = 0xFFF1;

#[derive(Debug, Default)]
struct Mailbox {
    slots: DashMap<Key, VecDeque<Bytes>>,
    aborted: AtomicBool,
}

impl Mailbox {
    fn post(&self, key: Key, data: Bytes) {
        self.slots.entry(key).or_default().push_back(data);
    }

    fn take(&self, key: &Key) -> Option<Bytes> {
        self.slots.get_mut(key).and_then(|mut q| q.pop_front())
    }

    /// Block until a message for `key` arrives; `None` once the world aborts.
    fn take_blocking(&self, key: &Key) -> Option<Bytes> {
        loop {
            if let Some(bytes) = self.take(key) {
                return Some(bytes);
            }
            if self.aborted.load(Ordering::Acquire) {
                return None;
            }
            std::thread::yield_now();
        }
    }
}

/// Pending receive on a [`RayonComm`] mailbox.
pub struct LocalHandle {
    mailbox: Arc<Mailbox>,
    key: Key,
    len: usize,
}

impl Wait for LocalHandle {
    /// Messages longer than the posted length are truncated.
    fn wait(self) -> Option<Vec<u8>> {
        let bytes = self.mailbox.take_blocking(&self.key)?;
        let n = self.len.min(bytes.len());
        Some(bytes[..n].to_vec())
    }
}

/// In-process communicator: every rank is a thread of the same process and
/// messages travel through a shared mailbox, FIFO per (source, destination, tag).
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl RayonComm {
    /// Build the communicators of a `size`-rank world sharing one mailbox.
    pub fn world(size: usize) -> Vec<RayonComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| RayonComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }

    fn check_peer(&self, peer: usize) -> Result<(), StormError> {
        if peer >= self.size {
            return Err(StormError::Comm(format!(
                "rank {} addressed peer {peer} in a world of {}",
                self.rank, self.size
            )));
        }
        Ok(())
    }

    /// Post `buf` for `peer`. Never blocks.
    pub fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Result<(), StormError> {
        self.check_peer(peer)?;
        self.mailbox
            .post((self.rank, peer, tag), Bytes::copy_from_slice(buf));
        Ok(())
    }

    /// Post a receive of up to `len` bytes from `peer`.
    pub fn irecv(&self, peer: usize, tag: u16, len: usize) -> Result<LocalHandle, StormError> {
        self.check_peer(peer)?;
        Ok(LocalHandle {
            mailbox: Arc::clone(&self.mailbox),
            key: (peer, self.rank, tag),
            len,
        })
    }

    /// Receive a message of exactly `out.len()` bytes.
    fn recv_exact(&self, peer: usize, tag: u16, out: &mut [u8]) -> Result<(), StormError> {
        self.check_peer(peer)?;
        let data = self
            .mailbox
            .take_blocking(&(peer, self.rank, tag))
            .ok_or_else(|| StormError::Aborted(format!("rank {} stopped waiting on {peer}", self.rank)))?;
        if data.len() != out.len() {
            return Err(StormError::MessageLength {
                peer,
                expected: out.len(),
                got: data.len(),
            });
        }
        out.copy_from_slice(&data);
        Ok(())
    }
}

impl Communicator for RayonComm {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) -> Result<(), StormError> {
        let mut sink = vec![0u8; self.size];
        self.gather_with_tag(&[0u8], &mut sink, TAG_BARRIER)
    }

    fn sendrecv(
        &self,
        send: &[u8],
        dest: Option<usize>,
        recv: &mut [u8],
        source: Option<usize>,
        tag: CommTag,
    ) -> Result<(), StormError> {
        if let Some(peer) = dest {
            self.isend(peer, tag.base(), send)?;
        }
        if let Some(peer) = source {
            self.recv_exact(peer, tag.base(), recv)?;
        }
        Ok(())
    }

    fn allgather(&self, send: &[u8], recv: &mut [u8]) -> Result<(), StormError> {
        self.gather_with_tag(send, recv, TAG_ALLGATHER)
    }

    fn abort(&self, reason: &str) {
        log::error!("rank {} aborting in-process run: {reason}", self.rank);
        self.mailbox.aborted.store(true, Ordering::Release);
    }
}

impl RayonComm {
    fn gather_with_tag(&self, send: &[u8], recv: &mut [u8], tag: u16) -> Result<(), StormError> {
        check_gather_len(send, recv, self.size)?;
        for peer in (0..self.size).filter(|&p| p != self.rank) {
            self.isend(peer, tag, send)?;
        }
        let n = send.len();
        for peer in 0..self.size {
            let slot = &mut recv[peer * n..(peer + 1) * n];
            if peer == self.rank {
                slot.copy_from_slice(send);
            } else {
                self.recv_exact(peer, tag, slot)?;
            }
        }
        Ok(())
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{CommTag, Communicator, check_gather_len};
    use crate::storm_error::StormError;
    use mpi::collective::CommunicatorCollectives as _;
    use mpi::environment::Universe;
    use mpi::point_to_point::{Destination as _, Source as _, send_receive_into_with_tags};
    use mpi::topology::{Communicator as _, SimpleCommunicator};

    /// MPI world communicator. Dropping it finalizes MPI.
    pub struct MpiComm {
        pub world: SimpleCommunicator,
        rank: usize,
        size: usize,
        _universe: Universe,
    }

    impl MpiComm {
        pub fn new() -> Result<Self, StormError> {
            let universe = mpi::initialize()
                .ok_or_else(|| StormError::Comm("MPI is already initialized".to_string()))?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                world,
                rank,
                size,
                _universe: universe,
            })
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.size
        }

        fn barrier(&self) -> Result<(), StormError> {
            self.world.barrier();
            Ok(())
        }

        fn sendrecv(
            &self,
            send: &[u8],
            dest: Option<usize>,
            recv: &mut [u8],
            source: Option<usize>,
            tag: CommTag,
        ) -> Result<(), StormError> {
            let tag = i32::from(tag.base());
            match (dest, source) {
                (Some(d), Some(s)) => {
                    let to = self.world.process_at_rank(d as i32);
                    let from = self.world.process_at_rank(s as i32);
                    send_receive_into_with_tags(send, &to, tag, recv, &from, tag);
                }
                (Some(d), None) => {
                    self.world.process_at_rank(d as i32).send_with_tag(send, tag);
                }
                (None, Some(s)) => {
                    self.world
                        .process_at_rank(s as i32)
                        .receive_into_with_tag(recv, tag);
                }
                (None, None) => {}
            }
            Ok(())
        }

        fn allgather(&self, send: &[u8], recv: &mut [u8]) -> Result<(), StormError> {
            check_gather_len(send, recv, self.size)?;
            self.world.all_gather_into(send, recv);
            Ok(())
        }

        fn abort(&self, reason: &str) {
            log::error!("rank {} aborting MPI run: {reason}", self.rank);
            self.world.abort(1)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
