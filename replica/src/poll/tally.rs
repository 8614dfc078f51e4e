use ark_bn254::Fr;

use crate::circuit::{TallyVotesInputs, TallyWitness};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hash::hash3;
use crate::poll::{Poll, PollStatus, SaltDomain, TallyState};
use crate::poll::poll::{ballot_or_blank, checkpoint};

/// The result of tallying one ballot batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TalliedBatch
{
    pub batch_index: u32,

    /// The tally commitment after the batch.
    pub commitment: Fr,

    pub inputs: TallyVotesInputs
}

struct TallyTransition
{
    witness: TallyWitness,
    tally: TallyState
}

impl<T: Config> Poll<T>
{
    /// The number of ballot batches, the blank ballot at index 0 included.
    pub fn num_tally_batches(&self) -> u32
    {
        let size = self.config.batch_sizes.tally_batch_size;
        (self.num_signups + 1).div_ceil(size)
    }

    pub fn has_untallied_ballots(&self) -> bool
    {
        matches!(self.status, PollStatus::ProcessingComplete | PollStatus::Tallying)
            && self.tally.num_batches_processed < self.num_tally_batches()
    }

    fn next_tally_batch_index(&self) -> Result<u32>
    {
        match self.status
        {
            PollStatus::ProcessingComplete | PollStatus::Tallying => {},
            PollStatus::Finalized => Err(Error::NoUntalliedBallots(self.id))?,
            _ => Err(self.invalid_state("ProcessingComplete"))?
        }
        if !self.has_untallied_ballots() { Err(Error::NoUntalliedBallots(self.id))? }

        Ok(self.tally.num_batches_processed)
    }

    fn compute_next_tally_batch(&self) -> Result<TallyTransition>
    {
        let batch_index = self.next_tally_batch_index()?;

        let arity = T::TREE_ARITY;
        let depth = self.vote_option_depth();

        let commitment = hash3([self.state_tree.root(), self.ballot_tree.root(), self.sb_salt])?;
        checkpoint("state ballot commitment", self.sb_commitment, commitment)?;
        checkpoint("tally commitment", self.tally.commitment, self.tally.compute_commitment(arity, depth)?)?;

        let size = self.config.batch_sizes.tally_batch_size;
        let batch_start = batch_index * size;
        let spend = self.config.mode.spend_fn();
        let num_options = self.tally.results.len();

        let mut tally = self.tally.clone();
        let mut ballots = Vec::with_capacity(size as usize);
        for index in batch_start..batch_start + size
        {
            let ballot = ballot_or_blank(&self.ballots, index, num_options);
            for (option, weight) in ballot.votes.iter().enumerate()
            {
                tally.results[option] = tally.results[option].saturating_add(*weight as u128);
                tally.per_vote_option_spent[option] = tally.per_vote_option_spent[option].saturating_add(spend(*weight));
                tally.total_spent = tally.total_spent.saturating_add(spend(*weight));
            }

            let root = ballot.vote_option_root(arity, depth)?;
            let path = self.ballot_tree.path_to(index as u64)?;
            ballots.push((ballot, root, path));
        }

        let counter = batch_index + 1;
        tally.results_salt = self.coordinator.salt(self.id, SaltDomain::Results, counter)?;
        tally.spent_salt = self.coordinator.salt(self.id, SaltDomain::SpentSubtotal, counter)?;
        tally.per_vote_option_salt = self.coordinator.salt(self.id, SaltDomain::PerOptionSpent, counter)?;
        tally.num_batches_processed = counter;
        tally.commitment = tally.compute_commitment(arity, depth)?;

        let witness = TallyWitness {
            batch_index,
            batch_start,
            num_signups: self.num_signups,
            state_root: self.state_tree.root(),
            ballot_root: self.ballot_tree.root(),
            sb_salt: self.sb_salt,
            sb_commitment: self.sb_commitment,
            ballots,
            current_results: self.tally.results.clone(),
            current_results_salt: self.tally.results_salt,
            current_total_spent: self.tally.total_spent,
            current_spent_salt: self.tally.spent_salt,
            current_per_vote_option_spent: self.tally.per_vote_option_spent.clone(),
            current_per_vote_option_salt: self.tally.per_vote_option_salt,
            current_tally_commitment: self.tally.commitment,
            new_results: tally.results.clone(),
            new_results_salt: tally.results_salt,
            new_total_spent: tally.total_spent,
            new_spent_salt: tally.spent_salt,
            new_per_vote_option_spent: tally.per_vote_option_spent.clone(),
            new_per_vote_option_salt: tally.per_vote_option_salt,
            new_tally_commitment: tally.commitment
        };

        Ok(TallyTransition { witness, tally })
    }

    /// The witness of the next tally batch, without committing it.
    pub fn preview_next_tally_batch(&self) -> Result<TallyWitness>
    {
        Ok(self.compute_next_tally_batch()?.witness)
    }

    /// Fold the next ballot batch into the tally.
    pub(crate) fn process_next_tally_batch(&mut self) -> Result<TalliedBatch>
    {
        let TallyTransition { witness, tally } = self.compute_next_tally_batch()?;
        let inputs = TallyVotesInputs::build(&witness)?;

        self.tally = tally;
        self.status = if self.tally.num_batches_processed < self.num_tally_batches()
        {
            PollStatus::Tallying
        }
        else
        {
            PollStatus::Finalized
        };

        log::info!(
            "poll {} tallied batch {} ({}/{})",
            self.id,
            witness.batch_index,
            self.tally.num_batches_processed,
            self.num_tally_batches()
        );

        Ok(TalliedBatch { batch_index: witness.batch_index, commitment: self.tally.commitment, inputs })
    }

    /// The summed weight per vote option.
    pub fn results(&self) -> &[u128]
    {
        &self.tally.results
    }

    pub fn per_vote_option_spent(&self) -> &[u128]
    {
        &self.tally.per_vote_option_spent
    }

    pub fn total_spent(&self) -> u128
    {
        self.tally.total_spent
    }

    pub fn tally_commitment(&self) -> Fr
    {
        self.tally.commitment
    }
}
