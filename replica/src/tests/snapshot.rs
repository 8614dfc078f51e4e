use ark_bn254::Fr;

use crate::command::Message;
use crate::error::{Error, ErrorClass};
use crate::hash::fr_to_bytes;
use crate::mock::*;
use crate::poll::PollStatus;
use crate::snapshot::{StateSnapshot, SNAPSHOT_VERSION};
use crate::tests::*;

/// A replica with two polls: one processed half way, one still open.
fn get_busy_state() -> Maci
{
    let (mut maci, poll_id, coordinator, voters) = get_poll_scenario(3, 100, get_poll_config());
    for nonce in 1..=4
    {
        vote(&mut maci, poll_id, &voters, &coordinator, 1, 0, nonce, nonce);
    }
    vote(&mut maci, poll_id, &voters, &coordinator, 2, 1, 6, 1);
    vote(&mut maci, poll_id, &voters, &coordinator, 3, 4, 2, 1);
    maci.close_poll(poll_id).unwrap();
    maci.process_next_batch(poll_id).unwrap();

    let second = maci.deploy_poll(END_TIMESTAMP, get_poll_config(), coordinator).unwrap();
    vote(&mut maci, second, &voters, &coordinator, 2, 3, 1, 1);

    maci
}

/// Snapshots survive both encodings unchanged.
#[test]
fn snapshot_round_trip()
{
    let maci = get_busy_state();
    let snapshot = maci.to_snapshot();
    assert_eq!(snapshot.version, SNAPSHOT_VERSION);
    assert_eq!(snapshot.signups.len(), 3);

    let json = snapshot.to_json().unwrap();
    assert_eq!(StateSnapshot::from_json(&json), Ok(snapshot.clone()));

    let bytes = snapshot.to_bytes();
    assert_eq!(StateSnapshot::from_bytes(&bytes), Ok(snapshot.clone()));

    let restored = Maci::from_snapshot(&snapshot).unwrap();
    assert_eq!(restored, maci);
    assert_eq!(restored.to_snapshot(), snapshot);
    assert!(restored.events().is_empty());
}

/// An empty replica can be restored too.
#[test]
fn snapshot_empty_state()
{
    let maci = new_test_state();
    let snapshot = StateSnapshot::from_json(&maci.to_snapshot().to_json().unwrap()).unwrap();
    assert_eq!(Maci::from_snapshot(&snapshot), Ok(maci));
}

/// A restored replica continues exactly where the original would have.
#[test]
fn snapshot_resume()
{
    let mut original = get_busy_state();
    let bytes = original.to_snapshot().to_bytes();
    let mut restored = Maci::from_snapshot(&StateSnapshot::from_bytes(&bytes).unwrap()).unwrap();

    let expected = original.process_next_batch(0).unwrap();
    assert_eq!(restored.process_next_batch(0), Ok(expected));

    let expected = tally_all(&mut original, 0);
    assert_eq!(tally_all(&mut restored, 0), expected);

    original.close_poll(1).unwrap();
    restored.close_poll(1).unwrap();
    assert_eq!(process_all(&mut restored, 1), process_all(&mut original, 1));
    assert_eq!(restored, original);
}

/// Snapshots from another layout are refused before anything else is read.
#[test]
fn snapshot_version_mismatch()
{
    let mut snapshot = new_test_state().to_snapshot();
    snapshot.version = SNAPSHOT_VERSION + 1;
    let expected = Error::SnapshotVersionMismatch { expected: SNAPSHOT_VERSION, found: SNAPSHOT_VERSION + 1 };

    assert_eq!(StateSnapshot::from_json(&snapshot.to_json().unwrap()), Err(expected.clone()));
    assert_eq!(StateSnapshot::from_bytes(&snapshot.to_bytes()), Err(expected.clone()));
    assert_eq!(Maci::from_snapshot(&snapshot), Err(expected));
}

/// Garbage input is reported as a malformed snapshot.
#[test]
fn snapshot_malformed()
{
    assert!(matches!(StateSnapshot::from_json("{\"version\": 1}"), Err(Error::MalformedSnapshot(_))));
    assert!(matches!(StateSnapshot::from_json("not json"), Err(Error::MalformedSnapshot(_))));
    assert!(matches!(StateSnapshot::from_bytes(&[1, 0]), Err(Error::MalformedSnapshot(_))));

    let mut snapshot = get_busy_state().to_snapshot();
    snapshot.polls[1].id = 5;
    assert!(matches!(Maci::from_snapshot(&snapshot), Err(Error::MalformedSnapshot(_))));
}

/// Recorded commitments that cannot be reproduced are integrity failures.
#[test]
fn snapshot_tampered()
{
    let snapshot = get_busy_state().to_snapshot();

    let mut tampered = snapshot.clone();
    tampered.state_root = fr_to_bytes(&Fr::from(7u64));
    let error = Maci::from_snapshot(&tampered).unwrap_err();
    assert!(matches!(error, Error::CheckpointMismatch { what: "registry root", .. }));
    assert_eq!(error.class(), ErrorClass::Integrity);

    let mut tampered = snapshot.clone();
    tampered.polls[0].sb_commitment = fr_to_bytes(&Fr::from(7u64));
    assert!(matches!(
        Maci::from_snapshot(&tampered),
        Err(Error::CheckpointMismatch { what: "state ballot commitment", .. })
    ));

    let mut tampered = snapshot.clone();
    tampered.polls[0].tally.commitment = fr_to_bytes(&Fr::from(7u64));
    assert!(matches!(
        Maci::from_snapshot(&tampered),
        Err(Error::CheckpointMismatch { what: "tally commitment", .. })
    ));

    let mut tampered = snapshot.clone();
    tampered.polls[0].state_leaves[1].voice_credit_balance += 1;
    assert!(matches!(Maci::from_snapshot(&tampered), Err(Error::CheckpointMismatch { what: "state root", .. })));

    let mut tampered = snapshot;
    tampered.polls[1].messages[0] = Message::blank();
    assert!(matches!(
        Maci::from_snapshot(&tampered),
        Err(Error::CheckpointMismatch { what: "message chain hash", .. })
    ));
}

/// The recorded status must agree with the recorded progress.
#[test]
fn snapshot_status_tampered()
{
    let (mut maci, poll_id, coordinator, voters) = get_poll_scenario(2, 100, get_poll_config());
    vote(&mut maci, poll_id, &voters, &coordinator, 1, 0, 5, 1);
    maci.close_poll(poll_id).unwrap();
    process_all(&mut maci, poll_id);

    let mut tampered = maci.to_snapshot();
    tampered.polls[0].status = PollStatus::Open;
    let error = Maci::from_snapshot(&tampered).unwrap_err();
    assert!(matches!(error, Error::MalformedSnapshot(_)));
    assert_eq!(error.class(), ErrorClass::Integrity);

    for status in [PollStatus::Closed, PollStatus::Processing, PollStatus::Tallying, PollStatus::Finalized]
    {
        let mut tampered = maci.to_snapshot();
        tampered.polls[0].status = status;
        assert!(matches!(Maci::from_snapshot(&tampered), Err(Error::MalformedSnapshot(_))), "{status:?}");
    }

    // A finalized poll still loads.
    tally_all(&mut maci, poll_id);
    assert_eq!(Maci::from_snapshot(&maci.to_snapshot()), Ok(maci.clone()));

    let busy = get_busy_state().to_snapshot();
    assert_eq!(busy.polls[0].status, PollStatus::Processing);

    let mut tampered = busy.clone();
    tampered.polls[0].num_batches_processed = 0;
    assert!(matches!(Maci::from_snapshot(&tampered), Err(Error::MalformedSnapshot(_))));

    // The second poll's log is not padded, so it cannot be closed.
    let mut tampered = busy;
    tampered.polls[1].status = PollStatus::Closed;
    assert!(matches!(Maci::from_snapshot(&tampered), Err(Error::MalformedSnapshot(_))));
}
