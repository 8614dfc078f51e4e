//! An off-chain replica of a collusion resistant voting apparatus.
//!
//! Voters sign up into a shared registry and cast encrypted, signed commands
//! into polls. Once a poll closes its coordinator decrypts the message log,
//! applies the valid commands in batches and tallies the resulting ballots,
//! producing for every batch the input record of the corresponding circuit.

pub mod circuit;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod hash;
pub mod keys;
pub mod maci;
pub mod poll;
pub mod registry;
pub mod snapshot;
pub mod tree;

#[cfg(test)]
mod mock;


pub use circuit::{ProcessMessagesInputs, TallyVotesInputs};
pub use command::{Command, DecodeFailure, Message, ValidationFailure};
pub use config::{Config, DefaultConfig};
pub use error::{Error, ErrorClass, Result};
pub use event::Event;
pub use keys::{Keypair, PrivateKey, PublicKey, Signature};
pub use maci::MaciState;
pub use poll::{
    Ballot,
    Poll,
    PollConfiguration,
    PollId,
    PollProvider,
    PollStatus,
    ProcessedBatch,
    SlotOutcome,
    TalliedBatch,
    VoteMode
};
pub use registry::{SignupRegistry, StateLeaf, Timestamp, VoiceCredits};
pub use snapshot::{StateSnapshot, SNAPSHOT_VERSION};
