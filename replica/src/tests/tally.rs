use ark_bn254::Fr;
use ark_ff::Zero;

use crate::error::Error;
use crate::event::Event;
use crate::hash::{fr_to_bytes, fr_to_decimal, hash2, hash3};
use crate::mock::*;
use crate::poll::{PollConfiguration, PollProvider, PollStatus, SaltDomain, VoteMode};
use crate::tests::*;
use crate::tree::root_of;

/// Six voters, one vote each, processed and ready to be tallied.
fn get_processed_poll(mode: VoteMode) -> (Maci, u32)
{
    let config = PollConfiguration { mode, ..get_poll_config() };
    let (mut maci, poll_id, coordinator, voters) = get_poll_scenario(6, 100, config);
    for state_index in 1..=6
    {
        vote(&mut maci, poll_id, &voters, &coordinator, state_index, state_index % 5, state_index as u64, 1);
    }
    maci.close_poll(poll_id).unwrap();
    process_all(&mut maci, poll_id);

    (maci, poll_id)
}

/// Tallying waits for processing to complete.
#[test]
fn tally_before_processing_complete()
{
    let (mut maci, poll_id, coordinator, voters) = get_poll_scenario(2, 100, get_poll_config());
    vote(&mut maci, poll_id, &voters, &coordinator, 1, 0, 1, 1);

    assert!(matches!(
        maci.process_next_tally_batch(poll_id),
        Err(Error::InvalidPollState { expected: "ProcessingComplete", actual: PollStatus::Open, .. })
    ));

    maci.close_poll(poll_id).unwrap();
    let before = maci.clone();
    assert!(matches!(
        maci.process_next_tally_batch(poll_id),
        Err(Error::InvalidPollState { actual: PollStatus::Closed, .. })
    ));
    assert!(matches!(maci.poll(poll_id).unwrap().preview_next_tally_batch(), Err(Error::InvalidPollState { .. })));
    assert_eq!(maci, before);
}

/// Ballots are tallied in batches, the blank ballot included.
#[test]
fn tally_in_batches()
{
    let (mut maci, poll_id) = get_processed_poll(VoteMode::Quadratic);
    let poll = maci.poll(poll_id).unwrap();
    assert_eq!(poll.num_tally_batches(), 2);
    assert!(poll.has_untallied_ballots());

    let first = maci.process_next_tally_batch(poll_id).unwrap();
    assert_eq!(first.batch_index, 0);
    assert_eq!(first.inputs.ballots.len(), 5);
    assert_eq!(maci.poll(poll_id).unwrap().status(), PollStatus::Tallying);

    // Ballots 0 to 4: voters 1 to 4 voted for options 1 to 4 with weights 1 to 4.
    assert_eq!(maci.poll(poll_id).unwrap().results(), &[0, 1, 2, 3, 4]);

    let second = maci.process_next_tally_batch(poll_id).unwrap();
    assert_eq!(second.batch_index, 1);
    assert_eq!(second.inputs.current_tally_commitment, fr_to_decimal(&first.commitment));

    let poll = maci.poll(poll_id).unwrap();
    assert_eq!(poll.status(), PollStatus::Finalized);
    assert!(poll.is_finalized());
    assert_eq!(poll.results(), &[5, 7, 2, 3, 4]);
    assert_eq!(poll.per_vote_option_spent(), &[25, 37, 4, 9, 16]);
    assert_eq!(poll.total_spent(), 91);
    assert_eq!(poll.tally_commitment(), second.commitment);
}

/// Non quadratic polls sum the weights as spend.
#[test]
fn tally_non_quadratic()
{
    let (mut maci, poll_id) = get_processed_poll(VoteMode::NonQuadratic);
    tally_all(&mut maci, poll_id);

    let poll = maci.poll(poll_id).unwrap();
    assert_eq!(poll.results(), &[5, 7, 2, 3, 4]);
    assert_eq!(poll.per_vote_option_spent(), &[5, 7, 2, 3, 4]);
    assert_eq!(poll.total_spent(), 21);
}

/// The tally commitment binds the totals under per batch salts.
#[test]
fn tally_commitment()
{
    let (mut maci, poll_id) = get_processed_poll(VoteMode::Quadratic);
    assert_eq!(maci.poll(poll_id).unwrap().tally_commitment(), Fr::zero());
    tally_all(&mut maci, poll_id);

    let poll = maci.poll(poll_id).unwrap();
    let coordinator = poll.coordinator();
    let to_fields = |values: &[u128]| values.iter().map(|v| Fr::from(*v)).collect::<Vec<_>>();

    let results_salt = coordinator.salt(poll_id, SaltDomain::Results, 2).unwrap();
    let spent_salt = coordinator.salt(poll_id, SaltDomain::SpentSubtotal, 2).unwrap();
    let per_vote_option_salt = coordinator.salt(poll_id, SaltDomain::PerOptionSpent, 2).unwrap();
    assert_eq!(poll.tally().results_salt, results_salt);

    let results_root = root_of(5, 1, Fr::zero(), &to_fields(poll.results())).unwrap();
    let per_vote_option_root = root_of(5, 1, Fr::zero(), &to_fields(poll.per_vote_option_spent())).unwrap();
    let expected = hash3([
        hash2(results_root, results_salt).unwrap(),
        hash2(Fr::from(poll.total_spent()), spent_salt).unwrap(),
        hash2(per_vote_option_root, per_vote_option_salt).unwrap()
    ])
    .unwrap();

    assert_eq!(poll.tally_commitment(), expected);
    assert_eq!(poll.tally().compute_commitment(5, 1), Ok(expected));
}

/// A preview of a tally batch matches the batch once committed.
#[test]
fn preview_tally_batch()
{
    let (mut maci, poll_id) = get_processed_poll(VoteMode::Quadratic);

    let before = maci.clone();
    let witness = maci.poll(poll_id).unwrap().preview_next_tally_batch().unwrap();
    assert_eq!(maci, before);
    assert_eq!(witness.batch_start, 0);
    assert_eq!(witness.ballots.len(), 5);
    assert_eq!(witness.current_tally_commitment, Fr::zero());

    let batch = maci.process_next_tally_batch(poll_id).unwrap();
    assert_eq!(batch.commitment, witness.new_tally_commitment);
    assert_eq!(batch.inputs.new_results, vec!["0", "1", "2", "3", "4"]);
}

/// Finalizing emits the final commitment and closes the tally.
#[test]
fn finalize_poll()
{
    let (mut maci, poll_id) = get_processed_poll(VoteMode::Quadratic);
    maci.take_events();

    let batches = tally_all(&mut maci, poll_id);
    let tally_commitment = fr_to_bytes(&batches[1].commitment);
    assert_eq!(
        maci.take_events(),
        vec![
            Event::TallyBatchProcessed { poll_id, batch_index: 0, tally_commitment: fr_to_bytes(&batches[0].commitment) },
            Event::TallyBatchProcessed { poll_id, batch_index: 1, tally_commitment },
            Event::PollFinalized { poll_id, tally_commitment }
        ]
    );

    let before = maci.clone();
    assert_eq!(maci.process_next_tally_batch(poll_id), Err(Error::NoUntalliedBallots(poll_id)));
    assert!(!maci.poll(poll_id).unwrap().has_untallied_ballots());
    assert_eq!(maci, before);
}
