use core::marker::PhantomData;

use crate::command::Message;
use crate::config::{Config, DefaultConfig};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::hash::{fr_to_bytes, HashBytes};
use crate::keys::{Keypair, PublicKey};
use crate::poll::{Poll, PollConfiguration, PollId, PollStatus, ProcessedBatch, SlotOutcome, TalliedBatch};
use crate::registry::{SignupRegistry, Timestamp, VoiceCredits};

/// The replica: one signup registry and the polls deployed over it.
#[derive(Clone, Debug)]
pub struct MaciState<T: Config = DefaultConfig>
{
    /// The registry of voters shared by every poll.
    pub(crate) registry: SignupRegistry,

    /// The polls, indexed by their id.
    pub(crate) polls: Vec<Poll<T>>,

    /// Events not yet taken by the driving service.
    pub(crate) events: Vec<Event>,

    pub(crate) _config: PhantomData<T>
}

impl<T: Config> PartialEq for MaciState<T>
{
    fn eq(&self, other: &Self) -> bool
    {
        self.registry == other.registry && self.polls == other.polls
    }
}

impl<T: Config> MaciState<T>
{
    /// Create an empty replica whose registry holds up to `arity^state_tree_depth` leaves.
    pub fn new(state_tree_depth: u8) -> Result<Self>
    {
        if state_tree_depth == 0 || state_tree_depth > T::MAX_STATE_TREE_DEPTH
        {
            Err(Error::ValueOutOfRange { what: "state tree depth", value: state_tree_depth as u128 })?
        }

        Ok(MaciState {
            registry: SignupRegistry::new(T::TREE_ARITY, state_tree_depth)?,
            polls: Vec::new(),
            events: Vec::new(),
            _config: PhantomData
        })
    }

    pub fn registry(&self) -> &SignupRegistry
    {
        &self.registry
    }

    pub fn state_tree_depth(&self) -> u8
    {
        self.registry.depth()
    }

    pub fn num_signups(&self) -> u32
    {
        self.registry.num_signups()
    }

    pub fn polls(&self) -> &[Poll<T>]
    {
        &self.polls
    }

    pub fn num_polls(&self) -> u32
    {
        self.polls.len() as u32
    }

    pub fn poll(&self, poll_id: PollId) -> Result<&Poll<T>>
    {
        self.polls.get(poll_id as usize).ok_or(Error::PollDoesNotExist(poll_id))
    }

    pub(crate) fn poll_mut(&mut self, poll_id: PollId) -> Result<&mut Poll<T>>
    {
        self.polls.get_mut(poll_id as usize).ok_or(Error::PollDoesNotExist(poll_id))
    }

    /// Drain the events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<Event>
    {
        core::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event]
    {
        &self.events
    }

    fn deposit_event(&mut self, event: Event)
    {
        log::debug!("{:?}", event);
        self.events.push(event);
    }

    /// Register a voter in the registry.
    ///
    /// - `public_key`: The key the voter's commands must be signed with.
    /// - `voice_credits`: The budget the voter receives.
    /// - `timestamp`: The signup time.
    /// - `expected_root`: The registry root reported by the source of truth before this signup.
    ///
    /// Emits `SignedUp`.
    pub fn sign_up(
        &mut self,
        public_key: PublicKey,
        voice_credits: VoiceCredits,
        timestamp: Timestamp,
        expected_root: Option<&HashBytes>
    ) -> Result<u32>
    {
        let state_index = self.registry.sign_up(public_key, voice_credits, timestamp, expected_root)?;
        let root = fr_to_bytes(&self.registry.root());

        log::info!("voter signed up at state index {state_index}");
        self.deposit_event(Event::SignedUp { state_index, public_key, voice_credits, timestamp, root });

        Ok(state_index)
    }

    /// Create a poll over the voters signed up so far.
    ///
    /// - `end_timestamp`: The earliest time at which the poll may be closed.
    /// - `config`: The tree shapes and limits of the poll.
    /// - `coordinator`: The key pair messages are encrypted to.
    ///
    /// Emits `PollDeployed`.
    pub fn deploy_poll(
        &mut self,
        end_timestamp: Timestamp,
        config: PollConfiguration,
        coordinator: Keypair
    ) -> Result<PollId>
    {
        if self.polls.len() >= T::MAX_POLLS as usize { Err(Error::PollLimitReached(T::MAX_POLLS))? }
        config.validate::<T>(self.registry.depth())?;

        let poll_id = self.polls.len() as PollId;
        let poll = Poll::<T>::new(poll_id, end_timestamp, config, coordinator, &self.registry)?;
        let num_signups = poll.num_signups();
        self.polls.push(poll);

        log::info!("poll {poll_id} deployed over {num_signups} voters, ending at {end_timestamp}");
        self.deposit_event(Event::PollDeployed {
            poll_id,
            end_timestamp,
            num_signups,
            coordinator: coordinator.public_key
        });

        Ok(poll_id)
    }

    /// Append an encrypted message to an open poll.
    ///
    /// Emits `MessagePublished`.
    pub fn publish_message(&mut self, poll_id: PollId, message: Message) -> Result<u32>
    {
        let poll = self.poll_mut(poll_id)?;
        let index = poll.publish_message(message)?;
        let chain_hash = fr_to_bytes(&poll.chain_hash());

        self.deposit_event(Event::MessagePublished { poll_id, index, chain_hash });

        Ok(index)
    }

    /// Seal a poll's message log, regardless of its end time.
    ///
    /// Emits `PollClosed`.
    pub fn close_poll(&mut self, poll_id: PollId) -> Result<()>
    {
        self.poll_mut(poll_id)?.close()?;
        self.deposit_closed(poll_id)
    }

    /// Seal a poll's message log once `now` has reached its end time.
    ///
    /// Returns whether the poll was closed. Emits `PollClosed` if it was.
    pub fn close_poll_if_ended(&mut self, poll_id: PollId, now: Timestamp) -> Result<bool>
    {
        let closed = self.poll_mut(poll_id)?.close_if_ended(now)?;
        if closed { self.deposit_closed(poll_id)?; }
        Ok(closed)
    }

    /// Seal a poll's message log, failing with `PollNotEnded` before its end time.
    pub fn close_ended_poll(&mut self, poll_id: PollId, now: Timestamp) -> Result<()>
    {
        let poll = self.poll(poll_id)?;
        if poll.status() != PollStatus::Open { Err(poll.invalid_state("Open"))? }
        if now < poll.end_timestamp()
        {
            Err(Error::PollNotEnded { poll_id, end_timestamp: poll.end_timestamp(), now })?
        }
        self.close_poll(poll_id)
    }

    fn deposit_closed(&mut self, poll_id: PollId) -> Result<()>
    {
        let poll = self.poll(poll_id)?;
        let event = Event::PollClosed {
            poll_id,
            num_messages: poll.messages().len() as u32,
            num_batches: poll.num_batches()
        };
        self.deposit_event(event);
        Ok(())
    }

    /// Consume a closed poll's next message batch.
    ///
    /// Emits `BatchProcessed`.
    pub fn process_next_batch(&mut self, poll_id: PollId) -> Result<ProcessedBatch>
    {
        let poll = self.poll_mut(poll_id)?;
        let batch = poll.process_next_batch()?;
        let sb_commitment = fr_to_bytes(&poll.sb_commitment());

        let applied = batch.outcomes.iter().filter(|outcome| **outcome == SlotOutcome::Applied).count() as u32;
        self.deposit_event(Event::BatchProcessed { poll_id, batch_index: batch.batch_index, applied, sb_commitment });

        Ok(batch)
    }

    /// Fold a processed poll's next ballot batch into its tally.
    ///
    /// Emits `TallyBatchProcessed`, and `PollFinalized` after the last batch.
    pub fn process_next_tally_batch(&mut self, poll_id: PollId) -> Result<TalliedBatch>
    {
        let poll = self.poll_mut(poll_id)?;
        let batch = poll.process_next_tally_batch()?;
        let finalized = poll.status() == PollStatus::Finalized;
        let tally_commitment = fr_to_bytes(&batch.commitment);

        self.deposit_event(Event::TallyBatchProcessed { poll_id, batch_index: batch.batch_index, tally_commitment });
        if finalized
        {
            log::info!("poll {poll_id} finalized");
            self.deposit_event(Event::PollFinalized { poll_id, tally_commitment });
        }

        Ok(batch)
    }
}
