//! Persistence of a replica.
//!
//! A snapshot records the inputs of the replica together with the roots and
//! commitments derived from them. Loading rebuilds every tree from the inputs and
//! refuses a snapshot whose recorded checkpoints cannot be reproduced.

use core::marker::PhantomData;
use std::collections::BTreeMap;

use ark_bn254::Fr;
use ark_ff::Zero;
use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::command::Message;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hash::{fr_from_bytes, fr_to_bytes, hash2, hash3, HashBytes};
use crate::keys::{Keypair, PrivateKey};
use crate::maci::MaciState;
use crate::poll::poll::checkpoint;
use crate::poll::{Ballot, Coordinator, Poll, PollConfiguration, PollId, PollStatus, TallyState};
use crate::registry::{SignupRegistry, StateLeaf, Timestamp};
use crate::tree::MerkleTree;

/// The snapshot layout produced by this version of the replica.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, Eq, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct StateSnapshot
{
    /// Always the first field, so that it can be read on its own.
    pub version: u32,

    pub state_tree_depth: u8,

    /// The registry leaves in signup order, the blank leaf excluded.
    pub signups: Vec<StateLeaf>,

    pub state_root: HashBytes,

    pub polls: Vec<PollSnapshot>
}

#[derive(Clone, Debug, Eq, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct PollSnapshot
{
    pub id: PollId,
    pub end_timestamp: Timestamp,
    pub config: PollConfiguration,
    pub coordinator_private_key: HashBytes,
    pub status: PollStatus,

    pub messages: Vec<Message>,
    pub chain_hash: HashBytes,
    pub batch_hashes: Vec<HashBytes>,
    pub num_batches_processed: u32,

    pub num_signups: u32,

    /// The poll's working state leaves, the blank leaf included.
    pub state_leaves: Vec<StateLeaf>,

    /// The ballots that differ from the blank ballot.
    pub ballots: Vec<(u32, Ballot)>,

    pub state_root: HashBytes,
    pub ballot_root: HashBytes,
    pub sb_salt: HashBytes,
    pub sb_commitment: HashBytes,

    pub tally: TallySnapshot
}

#[derive(Clone, Debug, Eq, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct TallySnapshot
{
    pub results: Vec<u128>,
    pub per_vote_option_spent: Vec<u128>,
    pub total_spent: u128,
    pub results_salt: HashBytes,
    pub spent_salt: HashBytes,
    pub per_vote_option_salt: HashBytes,
    pub commitment: HashBytes,
    pub num_batches_processed: u32
}

#[derive(Deserialize)]
struct VersionProbe
{
    version: u32
}

fn malformed(reason: &str) -> Error
{
    Error::MalformedSnapshot(reason.to_string())
}

fn field(bytes: &HashBytes, what: &str) -> Result<Fr>
{
    fr_from_bytes(bytes).ok_or_else(|| malformed(what))
}

fn check_version(found: u32) -> Result<()>
{
    if found != SNAPSHOT_VERSION
    {
        Err(Error::SnapshotVersionMismatch { expected: SNAPSHOT_VERSION, found })?
    }
    Ok(())
}

impl StateSnapshot
{
    pub fn to_json(&self) -> Result<String>
    {
        serde_json::to_string(self).map_err(|e| malformed(&e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self>
    {
        let probe: VersionProbe = serde_json::from_str(json).map_err(|e| malformed(&e.to_string()))?;
        check_version(probe.version)?;
        serde_json::from_str(json).map_err(|e| malformed(&e.to_string()))
    }

    /// The SCALE encoding of the snapshot.
    pub fn to_bytes(&self) -> Vec<u8>
    {
        self.encode()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self>
    {
        let version = u32::decode(&mut &bytes[..]).map_err(|e| malformed(&e.to_string()))?;
        check_version(version)?;
        <Self as Decode>::decode(&mut &bytes[..]).map_err(|e| malformed(&e.to_string()))
    }
}

impl TallySnapshot
{
    fn capture(tally: &TallyState) -> Self
    {
        TallySnapshot {
            results: tally.results.clone(),
            per_vote_option_spent: tally.per_vote_option_spent.clone(),
            total_spent: tally.total_spent,
            results_salt: fr_to_bytes(&tally.results_salt),
            spent_salt: fr_to_bytes(&tally.spent_salt),
            per_vote_option_salt: fr_to_bytes(&tally.per_vote_option_salt),
            commitment: fr_to_bytes(&tally.commitment),
            num_batches_processed: tally.num_batches_processed
        }
    }

    fn restore(&self, num_options: usize) -> Result<TallyState>
    {
        if self.results.len() != num_options || self.per_vote_option_spent.len() != num_options
        {
            Err(malformed("tally width does not match the vote option tree"))?
        }

        Ok(TallyState {
            results: self.results.clone(),
            per_vote_option_spent: self.per_vote_option_spent.clone(),
            total_spent: self.total_spent,
            results_salt: field(&self.results_salt, "results salt")?,
            spent_salt: field(&self.spent_salt, "spent salt")?,
            per_vote_option_salt: field(&self.per_vote_option_salt, "per option salt")?,
            commitment: field(&self.commitment, "tally commitment")?,
            num_batches_processed: self.num_batches_processed
        })
    }
}

/// Rebuild the chain hash and the batch boundary hashes of a message log.
pub(crate) fn replay_chain(messages: &[Message], batch_size: u32) -> Result<(Fr, Vec<Fr>)>
{
    let mut chain_hash = Fr::zero();
    let mut batch_hashes = vec![chain_hash];
    for (i, message) in messages.iter().enumerate()
    {
        chain_hash = hash2(chain_hash, message.hash()?)?;
        if (i + 1) % batch_size as usize == 0 { batch_hashes.push(chain_hash); }
    }
    Ok((chain_hash, batch_hashes))
}

impl<T: Config> Poll<T>
{
    pub fn to_snapshot(&self) -> PollSnapshot
    {
        PollSnapshot {
            id: self.id,
            end_timestamp: self.end_timestamp,
            config: self.config,
            coordinator_private_key: self.coordinator.private_key().to_bytes(),
            status: self.status,
            messages: self.messages.clone(),
            chain_hash: fr_to_bytes(&self.chain_hash),
            batch_hashes: self.batch_hashes.iter().map(fr_to_bytes).collect(),
            num_batches_processed: self.num_batches_processed,
            num_signups: self.num_signups,
            state_leaves: self.state_leaves.clone(),
            ballots: self.ballots.iter().map(|(index, ballot)| (*index, ballot.clone())).collect(),
            state_root: fr_to_bytes(&self.state_tree.root()),
            ballot_root: fr_to_bytes(&self.ballot_tree.root()),
            sb_salt: fr_to_bytes(&self.sb_salt),
            sb_commitment: fr_to_bytes(&self.sb_commitment),
            tally: TallySnapshot::capture(&self.tally)
        }
    }

    /// Rebuild a poll, checking every recorded root and commitment.
    pub fn from_snapshot(snapshot: &PollSnapshot, registry: &SignupRegistry) -> Result<Self>
    {
        let config = snapshot.config;
        config.validate::<T>(registry.depth())?;

        let Some(private_key) = PrivateKey::from_bytes(&snapshot.coordinator_private_key)
        else
        {
            Err(malformed("coordinator private key"))?
        };

        let arity = T::TREE_ARITY;
        let vote_option_depth = config.tree_depths.vote_option_tree_depth;
        let num_options = config.vote_option_capacity::<T>() as usize;
        let num_signups = snapshot.num_signups;

        if num_signups > registry.num_signups() || snapshot.state_leaves.len() != num_signups as usize + 1
        {
            Err(malformed("poll state leaves do not match its signup count"))?
        }
        if snapshot.messages.len() > config.max_values.max_messages as usize
        {
            Err(malformed("message log exceeds the poll limit"))?
        }

        let blank_leaf_hash = StateLeaf::blank().hash()?;
        let leaf_hashes = snapshot.state_leaves.iter().map(|leaf| leaf.hash()).collect::<Result<Vec<_>>>()?;
        let state_tree = MerkleTree::from_leaves(arity, registry.depth(), blank_leaf_hash, &leaf_hashes)?;

        let mut ballots = BTreeMap::new();
        for (index, ballot) in &snapshot.ballots
        {
            if *index == 0 || *index > num_signups || ballot.votes.len() != num_options
            {
                Err(malformed("ballot does not fit the poll"))?
            }
            ballots.insert(*index, ballot.clone());
        }

        let blank_ballot_hash = Ballot::blank(num_options).hash(arity, vote_option_depth)?;
        let mut ballot_tree = MerkleTree::from_leaves(
            arity,
            registry.depth(),
            blank_ballot_hash,
            &vec![blank_ballot_hash; snapshot.state_leaves.len()]
        )?;
        for (index, ballot) in &ballots
        {
            ballot_tree.update(*index as u64, ballot.hash(arity, vote_option_depth)?)?;
        }

        checkpoint("state root", field(&snapshot.state_root, "state root")?, state_tree.root())?;
        checkpoint("ballot root", field(&snapshot.ballot_root, "ballot root")?, ballot_tree.root())?;

        let sb_salt = field(&snapshot.sb_salt, "state ballot salt")?;
        let sb_commitment = field(&snapshot.sb_commitment, "state ballot commitment")?;
        checkpoint("state ballot commitment", sb_commitment, hash3([state_tree.root(), ballot_tree.root(), sb_salt])?)?;

        let (chain_hash, batch_hashes) = replay_chain(&snapshot.messages, config.batch_sizes.message_batch_size)?;
        checkpoint("message chain hash", field(&snapshot.chain_hash, "chain hash")?, chain_hash)?;
        if snapshot.batch_hashes.len() != batch_hashes.len()
        {
            Err(malformed("batch hash count does not match the message log"))?
        }
        for (recorded, replayed) in snapshot.batch_hashes.iter().zip(batch_hashes.iter())
        {
            checkpoint("message batch hash", field(recorded, "batch hash")?, *replayed)?;
        }

        let tally = snapshot.tally.restore(num_options)?;
        checkpoint("tally commitment", tally.commitment, tally.compute_commitment(arity, vote_option_depth)?)?;

        let poll = Poll {
            id: snapshot.id,
            end_timestamp: snapshot.end_timestamp,
            config,
            coordinator: Coordinator::new(Keypair::from_private_key(private_key)),
            status: snapshot.status,
            messages: snapshot.messages.clone(),
            chain_hash,
            batch_hashes,
            num_batches_processed: snapshot.num_batches_processed,
            num_signups,
            state_leaves: snapshot.state_leaves.clone(),
            state_tree,
            ballots,
            ballot_tree,
            sb_salt,
            sb_commitment,
            tally,
            _config: PhantomData
        };

        if !poll.progress_matches_status()
        {
            log::error!("poll {} snapshot records {:?} with inconsistent progress", poll.id, poll.status);
            Err(malformed("poll status does not match its progress counters"))?
        }

        Ok(poll)
    }

    /// Whether the counters and the log are reachable under the recorded status.
    fn progress_matches_status(&self) -> bool
    {
        let processed = self.num_batches_processed;
        let tallied = self.tally.num_batches_processed;
        let (batches, tally_batches) = (self.num_batches(), self.num_tally_batches());

        let size = self.message_batch_size() as usize;
        let sealed = !self.messages.is_empty() && self.messages.len() % size == 0;

        match self.status
        {
            PollStatus::Open => processed == 0 && tallied == 0,
            PollStatus::Closed => sealed && processed == 0 && tallied == 0,
            PollStatus::Processing => sealed && 0 < processed && processed < batches && tallied == 0,
            PollStatus::ProcessingComplete => sealed && processed == batches && tallied == 0,
            PollStatus::Tallying => sealed && processed == batches && 0 < tallied && tallied < tally_batches,
            PollStatus::Finalized => sealed && processed == batches && tallied == tally_batches
        }
    }
}

impl<T: Config> MaciState<T>
{
    pub fn to_snapshot(&self) -> StateSnapshot
    {
        StateSnapshot {
            version: SNAPSHOT_VERSION,
            state_tree_depth: self.registry.depth(),
            signups: self.registry.leaves()[1..].to_vec(),
            state_root: fr_to_bytes(&self.registry.root()),
            polls: self.polls.iter().map(|poll| poll.to_snapshot()).collect()
        }
    }

    /// Rebuild a replica. Events are not persisted.
    pub fn from_snapshot(snapshot: &StateSnapshot) -> Result<Self>
    {
        check_version(snapshot.version)?;

        let mut state = Self::new(snapshot.state_tree_depth)?;
        state.registry = SignupRegistry::from_signups(T::TREE_ARITY, snapshot.state_tree_depth, &snapshot.signups)?;
        checkpoint("registry root", field(&snapshot.state_root, "registry root")?, state.registry.root())?;

        if snapshot.polls.len() > T::MAX_POLLS as usize { Err(Error::PollLimitReached(T::MAX_POLLS))? }
        for (position, poll) in snapshot.polls.iter().enumerate()
        {
            if poll.id as usize != position { Err(malformed("poll ids are not sequential"))? }
            state.polls.push(Poll::from_snapshot(poll, &state.registry)?);
        }

        log::info!(
            "restored replica with {} voters and {} polls",
            state.registry.num_signups(),
            state.polls.len()
        );

        Ok(state)
    }
}
