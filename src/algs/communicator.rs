//! Process identity for mesh partitioning.
//!
//! The mesh only needs to know which rank it runs on and how many ranks
//! share the work. `NoComm` is the serial default, `StaticComm` pins a rank
//! explicitly (tests and simulated multi-rank runs) and `MpiComm` reads both
//! from an MPI communicator.

/// Rank and size of the current process group.
pub trait Communicator: Send + Sync + std::fmt::Debug + 'static {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
}

/// Compile-time no-op comm for pure serial runs.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
}

/// Fixed rank/size pair, e.g. to emulate rank 1 of 4 in a serial test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticComm {
    rank: usize,
    size: usize,
}

impl StaticComm {
    /// # Panics
    /// Panics if `rank >= size`.
    pub fn new(rank: usize, size: usize) -> Self {
        assert!(rank < size, "rank {rank} out of range for size {size}");
        Self { rank, size }
    }
}

impl Communicator for StaticComm {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
}

#[cfg(feature = "mpi-support")]
mod mpi_comm {
    use super::Communicator;
    use mpi::traits::Communicator as RawCommunicator;

    /// Rank and size captured from an MPI communicator.
    #[derive(Clone, Copy, Debug)]
    pub struct MpiComm {
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        pub fn from_comm<C: RawCommunicator>(comm: &C) -> Self {
            Self {
                rank: comm.rank() as usize,
                size: comm.size() as usize,
            }
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.size
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_comm::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_defaults() {
        assert_eq!((NoComm.rank(), NoComm.size()), (0, 1));
        let c = StaticComm::new(1, 3);
        assert_eq!((c.rank(), c.size()), (1, 3));
    }

    #[test]
    #[should_panic]
    fn static_comm_rejects_bad_rank() {
        let _ = StaticComm::new(2, 2);
    }
}
