//! Circuit input records.
//!
//! Processing and tallying capture everything a proof needs into a witness; the
//! builders here render a witness into the decimal string record the proving
//! toolchain consumes. Building never touches poll state.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::command::Message;
use crate::error::Result;
use crate::hash::{fr_to_decimal, pack, sha256_to_field};
use crate::keys::{PrivateKey, PublicKey};
use crate::poll::{Ballot, SlotOutcome};
use crate::registry::{StateLeaf, Timestamp};
use crate::tree::{MerklePath, PathElements};

/// One message slot of a processing batch, as seen just before it was consumed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SlotWitness
{
    pub message: Message,
    pub outcome: SlotOutcome,

    /// The leaf the slot acted on, 0 when the message did not decode.
    pub state_index: u32,
    pub state_leaf: StateLeaf,
    pub state_leaf_path: MerklePath,

    pub ballot: Ballot,
    pub ballot_vote_option_root: Fr,
    pub ballot_path: MerklePath,

    /// The option the slot addressed, 0 when it could not be used.
    pub vote_option_index: u32,
    pub current_vote_weight: u64,
    pub vote_weight_path: MerklePath
}

/// The before and after state of one processing batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessWitness
{
    pub batch_index: u32,
    pub batch_start: u32,
    pub batch_end: u32,

    pub input_batch_hash: Fr,
    pub output_batch_hash: Fr,

    pub current_state_root: Fr,
    pub current_ballot_root: Fr,
    pub current_sb_salt: Fr,
    pub current_sb_commitment: Fr,

    pub new_state_root: Fr,
    pub new_ballot_root: Fr,
    pub new_sb_salt: Fr,
    pub new_sb_commitment: Fr,

    /// In publish order.
    pub slots: Vec<SlotWitness>
}

/// Poll level values shared by every processing batch.
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext<'a>
{
    pub coordinator_private_key: &'a PrivateKey,
    pub coordinator_public_key: &'a PublicKey,
    pub end_timestamp: Timestamp,
    pub num_signups: u32,
    pub max_vote_options: u32
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMessagesInputs
{
    /// SHA-256 of the public inputs, reduced into the field.
    pub input_hash: String,
    pub packed_vals: String,
    pub poll_end_timestamp: String,

    pub msgs: Vec<Vec<String>>,
    pub enc_pub_keys: Vec<Vec<String>>,
    pub coord_priv_key: String,
    pub coord_pub_key: Vec<String>,

    pub input_batch_hash: String,
    pub output_batch_hash: String,

    pub current_state_root: String,
    pub current_ballot_root: String,
    pub current_sb_commitment: String,
    pub current_sb_salt: String,

    pub new_state_root: String,
    pub new_ballot_root: String,
    pub new_sb_commitment: String,
    pub new_sb_salt: String,

    pub current_state_leaves: Vec<Vec<String>>,
    pub current_state_leaves_path_elements: Vec<PathElements>,
    pub current_ballots: Vec<Vec<String>>,
    pub current_ballots_path_elements: Vec<PathElements>,
    pub current_vote_weights: Vec<String>,
    pub current_vote_weights_path_elements: Vec<PathElements>
}

/// The before and after state of one tally batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TallyWitness
{
    pub batch_index: u32,
    pub batch_start: u32,
    pub num_signups: u32,

    pub state_root: Fr,
    pub ballot_root: Fr,
    pub sb_salt: Fr,
    pub sb_commitment: Fr,

    /// The ballots of the batch with their vote option roots and ballot tree paths.
    pub ballots: Vec<(Ballot, Fr, MerklePath)>,

    pub current_results: Vec<u128>,
    pub current_results_salt: Fr,
    pub current_total_spent: u128,
    pub current_spent_salt: Fr,
    pub current_per_vote_option_spent: Vec<u128>,
    pub current_per_vote_option_salt: Fr,
    pub current_tally_commitment: Fr,

    pub new_results: Vec<u128>,
    pub new_results_salt: Fr,
    pub new_total_spent: u128,
    pub new_spent_salt: Fr,
    pub new_per_vote_option_spent: Vec<u128>,
    pub new_per_vote_option_salt: Fr,
    pub new_tally_commitment: Fr
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyVotesInputs
{
    pub input_hash: String,
    pub packed_vals: String,

    pub state_root: String,
    pub ballot_root: String,
    pub sb_salt: String,
    pub sb_commitment: String,

    pub current_tally_commitment: String,
    pub new_tally_commitment: String,

    pub ballots: Vec<Vec<String>>,
    pub ballot_path_elements: Vec<PathElements>,
    pub votes: Vec<Vec<String>>,

    pub current_results: Vec<String>,
    pub current_results_root_salt: String,
    pub current_spent_voice_credit_subtotal: String,
    pub current_spent_voice_credit_subtotal_salt: String,
    #[serde(rename = "currentPerVOSpentVoiceCredits")]
    pub current_per_vo_spent_voice_credits: Vec<String>,
    #[serde(rename = "currentPerVOSpentVoiceCreditsRootSalt")]
    pub current_per_vo_spent_voice_credits_root_salt: String,

    pub new_results: Vec<String>,
    pub new_results_root_salt: String,
    pub new_spent_voice_credit_subtotal: String,
    pub new_spent_voice_credit_subtotal_salt: String,
    #[serde(rename = "newPerVOSpentVoiceCredits")]
    pub new_per_vo_spent_voice_credits: Vec<String>,
    #[serde(rename = "newPerVOSpentVoiceCreditsRootSalt")]
    pub new_per_vo_spent_voice_credits_root_salt: String
}

fn decimal(value: Fr) -> String
{
    fr_to_decimal(&value)
}

fn decimals(values: &[u128]) -> Vec<String>
{
    values.iter().map(|v| v.to_string()).collect()
}

fn key_decimals(key: &PublicKey) -> Vec<String>
{
    key.coordinates().iter().map(fr_to_decimal).collect()
}

fn leaf_decimals(leaf: &StateLeaf) -> Vec<String>
{
    let [x, y] = leaf.public_key.coordinates();
    vec![
        decimal(x),
        decimal(y),
        leaf.voice_credit_balance.to_string(),
        leaf.timestamp.to_string()
    ]
}

impl ProcessMessagesInputs
{
    /// The packed scalar `maxVoteOptions | numSignUps << 50 | batchStart << 100 | batchEnd << 150`.
    pub fn packed_vals(context: &ProcessContext, witness: &ProcessWitness) -> Result<Fr>
    {
        pack(&[
            context.max_vote_options as u64,
            context.num_signups as u64,
            witness.batch_start as u64,
            witness.batch_end as u64
        ])
    }

    pub fn build(context: &ProcessContext, witness: &ProcessWitness) -> Result<Self>
    {
        let packed_vals = Self::packed_vals(context, witness)?;
        let input_hash = sha256_to_field(&[
            packed_vals,
            context.coordinator_public_key.hash()?,
            witness.input_batch_hash,
            witness.output_batch_hash,
            witness.current_sb_commitment,
            witness.new_sb_commitment,
            Fr::from(context.end_timestamp)
        ]);

        let slots = &witness.slots;
        let mut msgs = Vec::with_capacity(slots.len());
        let mut enc_pub_keys = Vec::with_capacity(slots.len());
        for slot in slots
        {
            let elements = slot.message.elements();
            msgs.push(elements.iter().map(fr_to_decimal).collect());
            enc_pub_keys.push(key_decimals(&slot.message.public_key));
        }

        Ok(ProcessMessagesInputs {
            input_hash: decimal(input_hash),
            packed_vals: decimal(packed_vals),
            poll_end_timestamp: context.end_timestamp.to_string(),
            msgs,
            enc_pub_keys,
            coord_priv_key: decimal(context.coordinator_private_key.as_field()),
            coord_pub_key: key_decimals(context.coordinator_public_key),
            input_batch_hash: decimal(witness.input_batch_hash),
            output_batch_hash: decimal(witness.output_batch_hash),
            current_state_root: decimal(witness.current_state_root),
            current_ballot_root: decimal(witness.current_ballot_root),
            current_sb_commitment: decimal(witness.current_sb_commitment),
            current_sb_salt: decimal(witness.current_sb_salt),
            new_state_root: decimal(witness.new_state_root),
            new_ballot_root: decimal(witness.new_ballot_root),
            new_sb_commitment: decimal(witness.new_sb_commitment),
            new_sb_salt: decimal(witness.new_sb_salt),
            current_state_leaves: slots.iter().map(|s| leaf_decimals(&s.state_leaf)).collect(),
            current_state_leaves_path_elements: slots.iter().map(|s| s.state_leaf_path.to_elements()).collect(),
            current_ballots: slots
                .iter()
                .map(|s| vec![s.ballot.nonce.to_string(), decimal(s.ballot_vote_option_root)])
                .collect(),
            current_ballots_path_elements: slots.iter().map(|s| s.ballot_path.to_elements()).collect(),
            current_vote_weights: slots.iter().map(|s| s.current_vote_weight.to_string()).collect(),
            current_vote_weights_path_elements: slots.iter().map(|s| s.vote_weight_path.to_elements()).collect()
        })
    }
}

impl TallyVotesInputs
{
    /// The packed scalar `batchStart | numSignUps << 50`.
    pub fn packed_vals(witness: &TallyWitness) -> Result<Fr>
    {
        pack(&[witness.batch_start as u64, witness.num_signups as u64])
    }

    pub fn build(witness: &TallyWitness) -> Result<Self>
    {
        let packed_vals = Self::packed_vals(witness)?;
        let input_hash = sha256_to_field(&[
            packed_vals,
            witness.sb_commitment,
            witness.current_tally_commitment,
            witness.new_tally_commitment
        ]);

        Ok(TallyVotesInputs {
            input_hash: decimal(input_hash),
            packed_vals: decimal(packed_vals),
            state_root: decimal(witness.state_root),
            ballot_root: decimal(witness.ballot_root),
            sb_salt: decimal(witness.sb_salt),
            sb_commitment: decimal(witness.sb_commitment),
            current_tally_commitment: decimal(witness.current_tally_commitment),
            new_tally_commitment: decimal(witness.new_tally_commitment),
            ballots: witness.ballots
                .iter()
                .map(|(ballot, root, _)| vec![ballot.nonce.to_string(), decimal(*root)])
                .collect(),
            ballot_path_elements: witness.ballots.iter().map(|(_, _, path)| path.to_elements()).collect(),
            votes: witness.ballots
                .iter()
                .map(|(ballot, _, _)| ballot.votes.iter().map(|v| v.to_string()).collect())
                .collect(),
            current_results: decimals(&witness.current_results),
            current_results_root_salt: decimal(witness.current_results_salt),
            current_spent_voice_credit_subtotal: witness.current_total_spent.to_string(),
            current_spent_voice_credit_subtotal_salt: decimal(witness.current_spent_salt),
            current_per_vo_spent_voice_credits: decimals(&witness.current_per_vote_option_spent),
            current_per_vo_spent_voice_credits_root_salt: decimal(witness.current_per_vote_option_salt),
            new_results: decimals(&witness.new_results),
            new_results_root_salt: decimal(witness.new_results_salt),
            new_spent_voice_credit_subtotal: witness.new_total_spent.to_string(),
            new_spent_voice_credit_subtotal_salt: decimal(witness.new_spent_salt),
            new_per_vo_spent_voice_credits: decimals(&witness.new_per_vote_option_spent),
            new_per_vo_spent_voice_credits_root_salt: decimal(witness.new_per_vote_option_salt)
        })
    }
}
