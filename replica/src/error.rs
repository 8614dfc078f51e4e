use thiserror::Error;

use crate::poll::{PollId, PollStatus};
use crate::tree::MerkleTreeError;

pub type Result<T> = core::result::Result<T, Error>;

/// How a failure should be treated by the driving service.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass
{
    /// The caller asked for something the current state does not permit. Nothing was mutated.
    Misuse,

    /// The replica disagrees with a value it previously recorded or was handed as ground truth.
    /// No further circuit inputs may be produced until this is resolved.
    Integrity
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error
{
    #[error("signup registry is full ({capacity} leaves)")]
    RegistryFull { capacity: u64 },

    #[error("index {index} is out of range (length {len})")]
    IndexOutOfRange { index: u64, len: u64 },

    #[error("poll {0} does not exist")]
    PollDoesNotExist(PollId),

    #[error("the maximum number of polls ({0}) has been deployed")]
    PollLimitReached(u32),

    #[error("poll configuration is invalid: {0}")]
    PollConfigInvalid(&'static str),

    #[error("poll {poll_id} is {actual:?}, expected {expected}")]
    InvalidPollState { poll_id: PollId, expected: &'static str, actual: PollStatus },

    #[error("poll {0} message log is full")]
    MessageLimitReached(PollId),

    #[error("poll {0} has no unprocessed message batches")]
    NoUnprocessedBatches(PollId),

    #[error("poll {0} has no untallied ballots")]
    NoUntalliedBallots(PollId),

    #[error("poll {poll_id} ends at {end_timestamp}, now is {now}")]
    PollNotEnded { poll_id: PollId, end_timestamp: u64, now: u64 },

    #[error("public key is not a point of the prime order subgroup")]
    MalformedPublicKey,

    #[error("{what} {value} is out of range")]
    ValueOutOfRange { what: &'static str, value: u128 },

    #[error("registry root {actual} does not match the expected root {expected}")]
    RootMismatch { expected: String, actual: String },

    #[error("recomputed {what} {actual} diverges from the recorded {expected}")]
    CheckpointMismatch { what: &'static str, expected: String, actual: String },

    #[error("snapshot version {found} is not supported (expected {expected})")]
    SnapshotVersionMismatch { expected: u32, found: u32 },

    #[error("hash computation failed: {0}")]
    HashFailed(String),

    #[error("snapshot is malformed: {0}")]
    MalformedSnapshot(String)
}

impl Error
{
    pub fn class(&self) -> ErrorClass
    {
        match self
        {
            Error::RootMismatch { .. }
            | Error::CheckpointMismatch { .. }
            | Error::SnapshotVersionMismatch { .. }
            | Error::HashFailed(_)
            | Error::MalformedSnapshot(_) => ErrorClass::Integrity,
            _ => ErrorClass::Misuse
        }
    }

    pub fn is_integrity(&self) -> bool
    {
        self.class() == ErrorClass::Integrity
    }
}

impl From<MerkleTreeError> for Error
{
    fn from(error: MerkleTreeError) -> Self
    {
        match error
        {
            MerkleTreeError::TreeFull { capacity } => Error::RegistryFull { capacity },
            MerkleTreeError::IndexOutOfRange { index, len } => Error::IndexOutOfRange { index, len },
            MerkleTreeError::HashFailed(reason) => Error::HashFailed(reason)
        }
    }
}
