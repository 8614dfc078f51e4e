use ark_bn254::Fr;
use ark_ff::Zero;
use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hash::{hash2, hash3};
use crate::tree::{root_of, trim_zeroes, MerkleTree};

/// The lifecycle of a poll. Transitions only ever move forward.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Encode, Decode, Serialize, Deserialize)]
pub enum PollStatus
{
    /// Messages are accepted.
    Open,

    /// The message log is sealed and padded, no batch has been processed.
    Closed,

    /// Some, but not all, message batches have been processed.
    Processing,

    /// Every message batch has been processed.
    ProcessingComplete,

    /// Some, but not all, ballot batches have been tallied.
    Tallying,

    /// The tally is complete and its commitment is final.
    Finalized
}

/// A voter's per poll record of vote weights.
#[derive(Clone, Debug, Eq, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct Ballot
{
    /// The number of commands applied to the ballot.
    pub nonce: u64,

    /// The weight assigned to each vote option.
    pub votes: Vec<u64>
}

impl Ballot
{
    pub fn blank(num_options: usize) -> Self
    {
        Ballot { nonce: 0, votes: vec![0; num_options] }
    }

    pub fn vote_fields(&self) -> Vec<Fr>
    {
        self.votes.iter().map(|v| Fr::from(*v)).collect()
    }

    /// The tree over the vote weights, with zero in every unused slot.
    pub fn vote_option_tree(&self, arity: u8, depth: u8) -> Result<MerkleTree>
    {
        let votes = self.vote_fields();
        Ok(MerkleTree::from_leaves(arity, depth, Fr::zero(), trim_zeroes(&votes, Fr::zero()))?)
    }

    pub fn vote_option_root(&self, arity: u8, depth: u8) -> Result<Fr>
    {
        Ok(root_of(arity, depth, Fr::zero(), &self.vote_fields())?)
    }

    /// `hash2(nonce, voteOptionRoot)`
    pub fn hash(&self, arity: u8, depth: u8) -> Result<Fr>
    {
        hash2(Fr::from(self.nonce), self.vote_option_root(arity, depth)?)
    }
}

/// The running totals of a tally, with the salts of their last commitments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TallyState
{
    /// The summed weight per vote option.
    pub results: Vec<u128>,

    /// The summed spend per vote option.
    pub per_vote_option_spent: Vec<u128>,

    /// The summed spend over every option.
    pub total_spent: u128,

    pub results_salt: Fr,
    pub spent_salt: Fr,
    pub per_vote_option_salt: Fr,

    /// `hash3(resultsCommitment, spentCommitment, perOptionCommitment)`, zero
    /// until the first batch has been tallied.
    pub commitment: Fr,

    /// The number of ballot batches folded into the totals.
    pub num_batches_processed: u32
}

fn to_fields(values: &[u128]) -> Vec<Fr>
{
    values.iter().map(|v| Fr::from(*v)).collect()
}

impl TallyState
{
    pub fn new(num_options: usize) -> Self
    {
        TallyState {
            results: vec![0; num_options],
            per_vote_option_spent: vec![0; num_options],
            total_spent: 0,
            results_salt: Fr::zero(),
            spent_salt: Fr::zero(),
            per_vote_option_salt: Fr::zero(),
            commitment: Fr::zero(),
            num_batches_processed: 0
        }
    }

    pub fn results_root(&self, arity: u8, depth: u8) -> Result<Fr>
    {
        Ok(root_of(arity, depth, Fr::zero(), &to_fields(&self.results))?)
    }

    pub fn per_vote_option_spent_root(&self, arity: u8, depth: u8) -> Result<Fr>
    {
        Ok(root_of(arity, depth, Fr::zero(), &to_fields(&self.per_vote_option_spent))?)
    }

    /// Recompute the tally commitment from the totals and salts.
    pub fn compute_commitment(&self, arity: u8, depth: u8) -> Result<Fr>
    {
        if self.num_batches_processed == 0 { return Ok(Fr::zero()); }

        let results = hash2(self.results_root(arity, depth)?, self.results_salt)?;
        let spent = hash2(Fr::from(self.total_spent), self.spent_salt)?;
        let per_vote_option = hash2(self.per_vote_option_spent_root(arity, depth)?, self.per_vote_option_salt)?;

        hash3([results, spent, per_vote_option])
    }
}
