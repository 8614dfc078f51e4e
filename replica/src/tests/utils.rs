use ark_bn254::Fr;

use crate::command::{Command, Message};
use crate::keys::{Keypair, PublicKey};
use crate::mock::*;
use crate::poll::{
    BatchSizes,
    MaxValues,
    PollConfiguration,
    PollId,
    ProcessedBatch,
    TalliedBatch,
    TreeDepths,
    VoteMode
};

pub const END_TIMESTAMP: u64 = 1_000;

pub fn get_coordinator_data() -> Keypair
{
    Keypair::random(&mut test_rng(0))
}

pub fn get_voters(count: usize) -> Vec<Keypair>
{
    let mut rng = test_rng(1);
    (0..count).map(|_| Keypair::random(&mut rng)).collect()
}

/// Five options, five messages per batch and five ballots per tally batch.
pub fn get_poll_config() -> PollConfiguration
{
    PollConfiguration {
        tree_depths: TreeDepths { int_state_tree_depth: 1, vote_option_tree_depth: 1 },
        batch_sizes: BatchSizes { message_batch_size: 5, tally_batch_size: 5 },
        max_values: MaxValues { max_messages: 25, max_vote_options: 5 },
        mode: VoteMode::Quadratic
    }
}

pub fn get_command(state_index: u32, vote_option_index: u32, new_vote_weight: u64, nonce: u64, poll_id: PollId) -> Command
{
    Command {
        state_index,
        new_public_key: None,
        vote_option_index: vote_option_index as u64,
        new_vote_weight,
        nonce,
        poll_id,
        salt: Fr::from(((state_index as u64) << 32) | nonce)
    }
}

/// Sign with `voter` and encrypt to `coordinator`, deterministically per command.
pub fn get_message(voter: &Keypair, command: &Command, coordinator: &PublicKey) -> Message
{
    let seed = ((command.state_index as u64) << 40)
        ^ (command.nonce << 20)
        ^ (command.vote_option_index << 8)
        ^ command.new_vote_weight;
    command
        .sign_and_encrypt(&voter.private_key, coordinator, &mut test_rng(seed))
        .unwrap()
}

/// A replica with `count` voters holding `credits` each and one open poll.
pub fn get_poll_scenario(count: usize, credits: u128, config: PollConfiguration) -> (Maci, PollId, Keypair, Vec<Keypair>)
{
    let mut maci = new_test_state();
    let voters = get_voters(count);
    for (i, voter) in voters.iter().enumerate()
    {
        maci.sign_up(voter.public_key, credits, 10 + i as u64, None).unwrap();
    }

    let coordinator = get_coordinator_data();
    let poll_id = maci.deploy_poll(END_TIMESTAMP, config, coordinator).unwrap();

    (maci, poll_id, coordinator, voters)
}

/// Publish a vote from the voter at `state_index` (1-based).
pub fn vote(
    maci: &mut Maci,
    poll_id: PollId,
    voters: &[Keypair],
    coordinator: &Keypair,
    state_index: u32,
    vote_option_index: u32,
    new_vote_weight: u64,
    nonce: u64
) -> u32
{
    let command = get_command(state_index, vote_option_index, new_vote_weight, nonce, poll_id);
    let message = get_message(&voters[state_index as usize - 1], &command, &coordinator.public_key);
    maci.publish_message(poll_id, message).unwrap()
}

pub fn process_all(maci: &mut Maci, poll_id: PollId) -> Vec<ProcessedBatch>
{
    let mut batches = Vec::new();
    while maci.poll(poll_id).unwrap().has_unprocessed_messages()
    {
        batches.push(maci.process_next_batch(poll_id).unwrap());
    }
    batches
}

pub fn tally_all(maci: &mut Maci, poll_id: PollId) -> Vec<TalliedBatch>
{
    let mut batches = Vec::new();
    while maci.poll(poll_id).unwrap().has_untallied_ballots()
    {
        batches.push(maci.process_next_tally_batch(poll_id).unwrap());
    }
    batches
}
