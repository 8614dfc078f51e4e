use crate::hash::HashBytes;
use crate::keys::PublicKey;
use crate::poll::PollId;
use crate::registry::{Timestamp, VoiceCredits};

/// Notifications emitted as the replica's state advances.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event
{
    /// A voter was added to the registry. [ state index, key, credits, timestamp, new root ]
    SignedUp {
        state_index: u32,
        public_key: PublicKey,
        voice_credits: VoiceCredits,
        timestamp: Timestamp,
        root: HashBytes
    },

    /// A poll was created. [ poll id, end time, voters visible to the poll, coordinator key ]
    PollDeployed {
        poll_id: PollId,
        end_timestamp: Timestamp,
        num_signups: u32,
        coordinator: PublicKey
    },

    /// A message was appended to a poll's log. [ poll id, message index, chain hash ]
    MessagePublished {
        poll_id: PollId,
        index: u32,
        chain_hash: HashBytes
    },

    /// A poll's log was sealed. [ poll id, padded message count, batch count ]
    PollClosed {
        poll_id: PollId,
        num_messages: u32,
        num_batches: u32
    },

    /// A message batch was processed. [ poll id, batch index, applied commands, new commitment ]
    BatchProcessed {
        poll_id: PollId,
        batch_index: u32,
        applied: u32,
        sb_commitment: HashBytes
    },

    /// A ballot batch was tallied. [ poll id, batch index, new tally commitment ]
    TallyBatchProcessed {
        poll_id: PollId,
        batch_index: u32,
        tally_commitment: HashBytes
    },

    /// The final tally commitment is available. [ poll id, tally commitment ]
    PollFinalized {
        poll_id: PollId,
        tally_commitment: HashBytes
    }
}
