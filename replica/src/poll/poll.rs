use core::marker::PhantomData;
use std::collections::BTreeMap;

use ark_bn254::Fr;
use ark_ff::Zero;

use crate::circuit::{ProcessContext, ProcessMessagesInputs, ProcessWitness, SlotWitness};
use crate::command::{self, DecodeFailure, Message, ValidationFailure};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hash::{fr_to_bytes, hash2, hash3, hex_of};
use crate::keys::Keypair;
use crate::poll::{Ballot, Coordinator, PollConfiguration, PollStatus, SaltDomain, TallyState};
use crate::registry::{SignupRegistry, StateLeaf, Timestamp};
use crate::tree::MerkleTree;

pub type PollId = u32;

/// What consuming a single message slot did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotOutcome
{
    /// The command was authentic and valid, and its effects were applied.
    Applied,

    /// The message did not decode into an authentic command.
    DecodeFailed(DecodeFailure),

    /// The command was authentic but could not be applied.
    Invalid(ValidationFailure)
}

/// The result of processing one message batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessedBatch
{
    /// The position of the batch in the message log.
    pub batch_index: u32,

    /// The outcome of every slot, in publish order.
    pub outcomes: Vec<SlotOutcome>,

    pub inputs: ProcessMessagesInputs
}

/// A poll over a frozen copy of the registry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Poll<T: Config>
{
    /// The poll id.
    pub(crate) id: PollId,

    /// The earliest time at which the poll may be closed.
    pub(crate) end_timestamp: Timestamp,

    /// The poll config.
    pub(crate) config: PollConfiguration,

    /// The poll operator.
    pub(crate) coordinator: Coordinator,

    pub(crate) status: PollStatus,

    /// The published messages, in publish order.
    pub(crate) messages: Vec<Message>,

    /// The running hash chain over `messages`.
    pub(crate) chain_hash: Fr,

    /// The chain hash at every batch boundary, starting from the empty chain.
    pub(crate) batch_hashes: Vec<Fr>,

    pub(crate) num_batches_processed: u32,

    /// The number of voters visible to the poll.
    pub(crate) num_signups: u32,

    /// The poll's working copy of the state leaves.
    pub(crate) state_leaves: Vec<StateLeaf>,
    pub(crate) state_tree: MerkleTree,

    /// The ballots that differ from the blank ballot.
    pub(crate) ballots: BTreeMap<u32, Ballot>,
    pub(crate) ballot_tree: MerkleTree,

    pub(crate) sb_salt: Fr,

    /// `hash3(stateRoot, ballotRoot, sbSalt)`
    pub(crate) sb_commitment: Fr,

    pub(crate) tally: TallyState,

    pub(crate) _config: PhantomData<T>
}

/// The working state a batch is computed on before it is committed.
struct BatchTransition
{
    witness: ProcessWitness,
    outcomes: Vec<SlotOutcome>,
    state_leaves: Vec<StateLeaf>,
    state_tree: MerkleTree,
    ballots: BTreeMap<u32, Ballot>,
    ballot_tree: MerkleTree
}

pub(crate) fn checkpoint(what: &'static str, expected: Fr, actual: Fr) -> Result<()>
{
    if expected != actual
    {
        log::error!("{what} diverged from its recorded checkpoint");
        Err(Error::CheckpointMismatch {
            what,
            expected: hex_of(&fr_to_bytes(&expected)),
            actual: hex_of(&fr_to_bytes(&actual))
        })?
    }
    Ok(())
}

impl<T: Config> Poll<T>
{
    /// Open a poll over the registry as it stands.
    pub(crate) fn new(
        id: PollId,
        end_timestamp: Timestamp,
        config: PollConfiguration,
        coordinator: Keypair,
        registry: &SignupRegistry
    ) -> Result<Self>
    {
        let num_options = config.vote_option_capacity::<T>() as usize;
        let blank_ballot_hash = Ballot::blank(num_options).hash(T::TREE_ARITY, config.tree_depths.vote_option_tree_depth)?;

        let state_leaves = registry.leaves().to_vec();
        let state_tree = registry.tree().clone();
        let ballot_tree = MerkleTree::from_leaves(
            T::TREE_ARITY,
            registry.depth(),
            blank_ballot_hash,
            &vec![blank_ballot_hash; state_leaves.len()]
        )?;
        let sb_commitment = hash3([state_tree.root(), ballot_tree.root(), Fr::zero()])?;

        Ok(Poll {
            id,
            end_timestamp,
            config,
            coordinator: Coordinator::new(coordinator),
            status: PollStatus::Open,
            messages: Vec::new(),
            chain_hash: Fr::zero(),
            batch_hashes: vec![Fr::zero()],
            num_batches_processed: 0,
            num_signups: registry.num_signups(),
            state_leaves,
            state_tree,
            ballots: BTreeMap::new(),
            ballot_tree,
            sb_salt: Fr::zero(),
            sb_commitment,
            tally: TallyState::new(num_options),
            _config: PhantomData
        })
    }

    pub fn id(&self) -> PollId
    {
        self.id
    }

    pub fn end_timestamp(&self) -> Timestamp
    {
        self.end_timestamp
    }

    pub fn config(&self) -> &PollConfiguration
    {
        &self.config
    }

    pub fn coordinator(&self) -> &Coordinator
    {
        &self.coordinator
    }

    pub fn status(&self) -> PollStatus
    {
        self.status
    }

    pub fn messages(&self) -> &[Message]
    {
        &self.messages
    }

    pub fn chain_hash(&self) -> Fr
    {
        self.chain_hash
    }

    /// `batch_hashes()[0]` is the empty chain, `batch_hashes()[k]` the chain after `k` full batches.
    pub fn batch_hashes(&self) -> &[Fr]
    {
        &self.batch_hashes
    }

    pub fn num_signups(&self) -> u32
    {
        self.num_signups
    }

    pub fn num_batches_processed(&self) -> u32
    {
        self.num_batches_processed
    }

    pub fn state_leaves(&self) -> &[StateLeaf]
    {
        &self.state_leaves
    }

    pub fn state_root(&self) -> Fr
    {
        self.state_tree.root()
    }

    pub fn ballot_root(&self) -> Fr
    {
        self.ballot_tree.root()
    }

    pub fn sb_salt(&self) -> Fr
    {
        self.sb_salt
    }

    pub fn sb_commitment(&self) -> Fr
    {
        self.sb_commitment
    }

    pub fn tally(&self) -> &TallyState
    {
        &self.tally
    }

    pub(crate) fn vote_option_depth(&self) -> u8
    {
        self.config.tree_depths.vote_option_tree_depth
    }

    pub(crate) fn message_batch_size(&self) -> u32
    {
        self.config.batch_sizes.message_batch_size
    }

    /// The ballot of a state leaf, blank if no command was ever applied to it.
    pub fn ballot(&self, index: u32) -> Ballot
    {
        ballot_or_blank(&self.ballots, index, self.tally.results.len())
    }

    /// The number of message batches, counting a trailing partial batch.
    pub fn num_batches(&self) -> u32
    {
        let size = self.message_batch_size() as usize;
        self.messages.len().div_ceil(size) as u32
    }

    pub(crate) fn invalid_state(&self, expected: &'static str) -> Error
    {
        Error::InvalidPollState { poll_id: self.id, expected, actual: self.status }
    }

    /// Extend the chain hash by `message`, returning the new chain hash and
    /// whether the message completed a batch.
    fn chain(&self, chain_hash: Fr, length: usize, message: &Message) -> Result<(Fr, bool)>
    {
        let next = hash2(chain_hash, message.hash()?)?;
        Ok((next, (length + 1) % self.message_batch_size() as usize == 0))
    }

    /// Append a message to the log, returning its index.
    pub(crate) fn publish_message(&mut self, message: Message) -> Result<u32>
    {
        if self.status != PollStatus::Open { Err(self.invalid_state("Open"))? }
        if self.messages.len() >= self.config.max_values.max_messages as usize
        {
            Err(Error::MessageLimitReached(self.id))?
        }

        let index = self.messages.len();
        let (chain_hash, boundary) = self.chain(self.chain_hash, index, &message)?;

        self.chain_hash = chain_hash;
        if boundary { self.batch_hashes.push(chain_hash); }
        self.messages.push(message);

        log::debug!("poll {} message {} published", self.id, index);

        Ok(index as u32)
    }

    /// Append blank messages until the log ends on a batch boundary, returning how
    /// many were appended. An empty log is padded to one full batch.
    pub(crate) fn pad_to_batch_boundary(&mut self) -> Result<u32>
    {
        let size = self.message_batch_size() as usize;
        let mut chain_hash = self.chain_hash;
        let mut boundaries = Vec::new();
        let mut padding = 0usize;
        let mut length = self.messages.len();
        while length == 0 || length % size != 0
        {
            let (next, boundary) = self.chain(chain_hash, length, &Message::blank())?;
            chain_hash = next;
            if boundary { boundaries.push(next); }
            padding += 1;
            length += 1;
        }

        self.chain_hash = chain_hash;
        self.batch_hashes.extend(boundaries);
        self.messages.extend(core::iter::repeat(Message::blank()).take(padding));

        Ok(padding as u32)
    }

    /// Seal the message log and pad it to a batch boundary.
    pub(crate) fn close(&mut self) -> Result<()>
    {
        if self.status != PollStatus::Open { Err(self.invalid_state("Open"))? }

        let padding = self.pad_to_batch_boundary()?;
        self.status = PollStatus::Closed;

        log::info!(
            "poll {} closed with {} messages ({} padding) in {} batches",
            self.id,
            self.messages.len(),
            padding,
            self.num_batches()
        );

        Ok(())
    }

    /// Close the poll if `now` has reached its end time, reporting whether it did.
    pub(crate) fn close_if_ended(&mut self, now: Timestamp) -> Result<bool>
    {
        if self.status != PollStatus::Open || now < self.end_timestamp { return Ok(false); }
        self.close()?;
        Ok(true)
    }

    pub fn has_unprocessed_messages(&self) -> bool
    {
        self.num_batches_processed < self.num_batches()
    }

    /// The index of the batch processed next. Batches are consumed from the tail.
    fn next_batch_index(&self) -> Result<u32>
    {
        match self.status
        {
            PollStatus::Closed | PollStatus::Processing => {},
            PollStatus::ProcessingComplete | PollStatus::Tallying | PollStatus::Finalized =>
                Err(Error::NoUnprocessedBatches(self.id))?,
            PollStatus::Open => Err(self.invalid_state("Closed"))?
        }
        if !self.has_unprocessed_messages() { Err(Error::NoUnprocessedBatches(self.id))? }

        Ok(self.num_batches() - 1 - self.num_batches_processed)
    }

    /// Recompute the recorded checkpoints a batch builds on.
    fn verify_processing_checkpoints(&self, batch_index: u32) -> Result<()>
    {
        let commitment = hash3([self.state_tree.root(), self.ballot_tree.root(), self.sb_salt])?;
        checkpoint("state ballot commitment", self.sb_commitment, commitment)?;

        let size = self.message_batch_size() as usize;
        let start = batch_index as usize * size;
        let (Some(input), Some(output)) = (
            self.batch_hashes.get(batch_index as usize),
            self.batch_hashes.get(batch_index as usize + 1)
        )
        else
        {
            Err(Error::IndexOutOfRange { index: batch_index as u64 + 1, len: self.batch_hashes.len() as u64 })?
        };

        let mut chain_hash = *input;
        for message in &self.messages[start..start + size]
        {
            chain_hash = hash2(chain_hash, message.hash()?)?;
        }
        checkpoint("message batch hash", *output, chain_hash)
    }

    fn compute_next_batch(&self) -> Result<BatchTransition>
    {
        let batch_index = self.next_batch_index()?;
        self.verify_processing_checkpoints(batch_index)?;

        let arity = T::TREE_ARITY;
        let vote_option_depth = self.vote_option_depth();
        let num_options = self.tally.results.len();
        let max_vote_options = self.config.max_values.max_vote_options;
        let mode = self.config.mode;

        let size = self.message_batch_size();
        let batch_start = batch_index * size;
        let batch_end = batch_start + size;

        let mut state_leaves = self.state_leaves.clone();
        let mut state_tree = self.state_tree.clone();
        let mut ballots = self.ballots.clone();
        let mut ballot_tree = self.ballot_tree.clone();

        let mut slots = Vec::with_capacity(size as usize);
        for position in (batch_start..batch_end).rev()
        {
            let message = self.messages[position as usize];
            let decoded = command::decode(&message, self.coordinator.private_key(), self.id, &state_leaves);

            let (outcome, state_index, vote_option_index, command) = match decoded
            {
                Err(failure) => (SlotOutcome::DecodeFailed(failure), 0, 0, None),
                Ok(signed) =>
                {
                    let command = signed.command;
                    let index = command.state_index;
                    let ballot = ballot_or_blank(&ballots, index, num_options);
                    let leaf = &state_leaves[index as usize];
                    let option = u32::try_from(command.vote_option_index)
                        .ok()
                        .filter(|option| *option < max_vote_options)
                        .unwrap_or(0);

                    match command::validate(&command, &ballot, leaf, max_vote_options, mode)
                    {
                        Ok(()) => (SlotOutcome::Applied, index, option, Some(command)),
                        Err(failure) => (SlotOutcome::Invalid(failure), index, option, None)
                    }
                }
            };

            let state_leaf = state_leaves[state_index as usize];
            let ballot = ballot_or_blank(&ballots, state_index, num_options);
            let vote_option_tree = ballot.vote_option_tree(arity, vote_option_depth)?;

            let witness = SlotWitness {
                message,
                outcome,
                state_index,
                state_leaf,
                state_leaf_path: state_tree.path_to(state_index as u64)?,
                ballot_vote_option_root: vote_option_tree.root(),
                ballot_path: ballot_tree.path_to(state_index as u64)?,
                vote_option_index,
                current_vote_weight: ballot.votes.get(vote_option_index as usize).copied().unwrap_or(0),
                vote_weight_path: vote_option_tree.path_to(vote_option_index as u64)?,
                ballot
            };

            if let Some(command) = command
            {
                let (new_leaf, new_ballot) = command::apply(&command, &witness.ballot, &state_leaf, mode);
                state_tree.update(state_index as u64, new_leaf.hash()?)?;
                ballot_tree.update(state_index as u64, new_ballot.hash(arity, vote_option_depth)?)?;
                state_leaves[state_index as usize] = new_leaf;
                ballots.insert(state_index, new_ballot);
            }

            log::debug!("poll {} message {} -> {:?}", self.id, position, outcome);
            slots.push(witness);
        }
        slots.reverse();

        let new_sb_salt = self.coordinator.salt(self.id, SaltDomain::StateBallot, self.num_batches_processed + 1)?;
        let new_sb_commitment = hash3([state_tree.root(), ballot_tree.root(), new_sb_salt])?;

        let witness = ProcessWitness {
            batch_index,
            batch_start,
            batch_end,
            input_batch_hash: self.batch_hashes[batch_index as usize],
            output_batch_hash: self.batch_hashes[batch_index as usize + 1],
            current_state_root: self.state_tree.root(),
            current_ballot_root: self.ballot_tree.root(),
            current_sb_salt: self.sb_salt,
            current_sb_commitment: self.sb_commitment,
            new_state_root: state_tree.root(),
            new_ballot_root: ballot_tree.root(),
            new_sb_salt,
            new_sb_commitment,
            slots
        };

        Ok(BatchTransition {
            outcomes: witness.slots.iter().map(|slot| slot.outcome).collect(),
            witness,
            state_leaves,
            state_tree,
            ballots,
            ballot_tree
        })
    }

    fn process_context(&self) -> ProcessContext<'_>
    {
        ProcessContext {
            coordinator_private_key: self.coordinator.private_key(),
            coordinator_public_key: self.coordinator.public_key(),
            end_timestamp: self.end_timestamp,
            num_signups: self.num_signups,
            max_vote_options: self.config.max_values.max_vote_options
        }
    }

    /// The witness of the next batch, without committing it.
    pub fn preview_next_batch(&self) -> Result<ProcessWitness>
    {
        Ok(self.compute_next_batch()?.witness)
    }

    /// Consume the next message batch and commit its effects.
    pub(crate) fn process_next_batch(&mut self) -> Result<ProcessedBatch>
    {
        let transition = self.compute_next_batch()?;
        let inputs = ProcessMessagesInputs::build(&self.process_context(), &transition.witness)?;

        let witness = transition.witness;
        self.state_leaves = transition.state_leaves;
        self.state_tree = transition.state_tree;
        self.ballots = transition.ballots;
        self.ballot_tree = transition.ballot_tree;
        self.sb_salt = witness.new_sb_salt;
        self.sb_commitment = witness.new_sb_commitment;
        self.num_batches_processed += 1;
        self.status = if self.has_unprocessed_messages() { PollStatus::Processing } else { PollStatus::ProcessingComplete };

        log::info!(
            "poll {} processed batch {} ({}/{})",
            self.id,
            witness.batch_index,
            self.num_batches_processed,
            self.num_batches()
        );

        Ok(ProcessedBatch { batch_index: witness.batch_index, outcomes: transition.outcomes, inputs })
    }
}

pub(crate) fn ballot_or_blank(ballots: &BTreeMap<u32, Ballot>, index: u32, num_options: usize) -> Ballot
{
    ballots.get(&index).cloned().unwrap_or_else(|| Ballot::blank(num_options))
}
