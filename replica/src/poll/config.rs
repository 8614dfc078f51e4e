use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct TreeDepths
{
    /// The depth of the ballot subtree tallied per batch.
    pub int_state_tree_depth: u8,

    /// The depth of each ballot's vote option tree.
    pub vote_option_tree_depth: u8
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct BatchSizes
{
    /// The number of messages consumed per processing batch.
    pub message_batch_size: u32,

    /// The number of ballots consumed per tally batch.
    pub tally_batch_size: u32
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct MaxValues
{
    /// The maximum number of messages the poll accepts.
    pub max_messages: u32,

    /// The number of selectable vote options.
    pub max_vote_options: u32
}

/// How vote weights are charged and aggregated.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub enum VoteMode
{
    /// A weight of `w` costs `w²` voice credits.
    Quadratic,

    /// A weight of `w` costs `w` voice credits.
    NonQuadratic
}

fn quadratic(weight: u64) -> u128
{
    (weight as u128) * (weight as u128)
}

fn linear(weight: u64) -> u128
{
    weight as u128
}

impl VoteMode
{
    /// The voice credits committed by a weight, selected once per poll.
    pub fn spend_fn(self) -> fn(u64) -> u128
    {
        match self
        {
            VoteMode::Quadratic => quadratic,
            VoteMode::NonQuadratic => linear
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct PollConfiguration
{
    pub tree_depths: TreeDepths,
    pub batch_sizes: BatchSizes,
    pub max_values: MaxValues,
    pub mode: VoteMode
}

impl PollConfiguration
{
    /// The number of slots in each ballot's vote option tree.
    pub fn vote_option_capacity<T: Config>(&self) -> u64
    {
        (T::TREE_ARITY as u64).saturating_pow(self.tree_depths.vote_option_tree_depth as u32)
    }

    /// Check the shape against the registry depth and the protocol limits.
    pub fn validate<T: Config>(&self, state_tree_depth: u8) -> Result<()>
    {
        let arity = T::TREE_ARITY as u64;
        let TreeDepths { int_state_tree_depth, vote_option_tree_depth } = self.tree_depths;
        let BatchSizes { message_batch_size, tally_batch_size } = self.batch_sizes;
        let MaxValues { max_messages, max_vote_options } = self.max_values;

        if vote_option_tree_depth == 0 || vote_option_tree_depth > T::MAX_VOTE_OPTION_TREE_DEPTH
        {
            Err(Error::PollConfigInvalid("vote option tree depth"))?
        }
        if int_state_tree_depth > state_tree_depth
        {
            Err(Error::PollConfigInvalid("intermediate state tree depth exceeds the state tree depth"))?
        }
        if tally_batch_size as u64 != arity.saturating_pow(int_state_tree_depth as u32)
        {
            Err(Error::PollConfigInvalid("tally batch size must be arity^intStateTreeDepth"))?
        }
        if message_batch_size == 0
        {
            Err(Error::PollConfigInvalid("message batch size"))?
        }
        if max_messages == 0 || max_messages % message_batch_size != 0
        {
            Err(Error::PollConfigInvalid("max messages must be a multiple of the message batch size"))?
        }
        if max_vote_options == 0
            || max_vote_options as u64 > self.vote_option_capacity::<T>()
            || max_vote_options > T::MAX_VOTE_OPTIONS
        {
            Err(Error::PollConfigInvalid("max vote options"))?
        }

        Ok(())
    }
}
