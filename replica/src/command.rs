use ark_bn254::Fr;
use ark_ff::{PrimeField, Zero};
use ark_std::UniformRand;
use codec::{Decode, Encode};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hash::{fr_from_bytes, fr_to_bytes, hash4, hash5, pack, unpack, HashBytes};
use crate::keys::{Keypair, PrivateKey, PublicKey, Signature};
use crate::poll::{Ballot, PollId, VoteMode};
use crate::registry::StateLeaf;

/// The number of field elements carried by a message.
pub const MESSAGE_DATA_LENGTH: usize = 10;

/// `[packed, newPubKey.x, newPubKey.y, salt, R8.x, R8.y, S]`
const PLAINTEXT_LENGTH: usize = 7;

/// The plaintext is zero padded to this many elements before encryption.
const PADDED_LENGTH: usize = MESSAGE_DATA_LENGTH - 1;

pub type MessageData = [HashBytes; MESSAGE_DATA_LENGTH];

/// An encrypted command as published on chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct Message
{
    /// `[iv, c0, .., c8]`.
    pub data: MessageData,

    /// The ephemeral key the command was encrypted towards the coordinator with.
    pub public_key: PublicKey
}

/// A vote (and optionally a key change) addressed to a state leaf.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Command
{
    /// The state leaf the command acts on.
    pub state_index: u32,

    /// Replaces the leaf's key once the command is applied.
    pub new_public_key: Option<PublicKey>,

    /// The option the weight is assigned to.
    pub vote_option_index: u64,

    /// The weight replacing any previous weight on the option.
    pub new_vote_weight: u64,

    /// Must be exactly one more than the ballot's nonce.
    pub nonce: u64,

    pub poll_id: PollId,

    pub salt: Fr
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignedCommand
{
    pub command: Command,
    pub signature: Signature
}

/// Why a message could not be turned into an authentic command.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DecodeFailure
{
    /// A blank message appended to fill the last batch.
    PaddingMessage,
    /// The ephemeral key is not a subgroup point.
    InvalidEphemeralKey,
    /// The ciphertext or the decrypted plaintext is not well formed.
    MalformedPlaintext,
    /// The requested replacement key is not a subgroup point.
    MalformedPublicKey,
    /// The signature point or response is not well formed.
    MalformedSignature,
    /// The command was produced for another poll.
    WrongPoll,
    /// The command targets the blank leaf or an index beyond the signups.
    UnknownStateIndex,
    /// The signature does not verify against the leaf's current key.
    BadSignature
}

/// Why an authentic command has no effect.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationFailure
{
    NonceMismatch,
    OptionOutOfRange,
    InsufficientVoiceCredits
}

fn coordinates_or_zero(key: &Option<PublicKey>) -> [Fr; 2]
{
    key.map(|k| k.coordinates()).unwrap_or([Fr::zero(), Fr::zero()])
}

fn keystream(shared_key: &[Fr; 2], iv: Fr, index: usize) -> Result<Fr>
{
    hash4([shared_key[0], shared_key[1], iv, Fr::from(index as u64)])
}

impl Command
{
    /// The five scalar fields packed 50 bits apiece.
    pub fn packed(&self) -> Result<Fr>
    {
        pack(&[
            self.state_index as u64,
            self.vote_option_index,
            self.new_vote_weight,
            self.nonce,
            self.poll_id as u64
        ])
    }

    /// The value a voter signs.
    pub fn hash(&self) -> Result<Fr>
    {
        let [x, y] = coordinates_or_zero(&self.new_public_key);
        hash4([self.packed()?, x, y, self.salt])
    }

    pub fn sign(&self, key: &PrivateKey) -> Result<SignedCommand>
    {
        Ok(SignedCommand { command: *self, signature: key.sign(self.hash()?)? })
    }

    /// Sign with `voter`, then encrypt to `coordinator` under a fresh ephemeral key.
    pub fn sign_and_encrypt<R: Rng + ?Sized>(
        &self,
        voter: &PrivateKey,
        coordinator: &PublicKey,
        rng: &mut R
    ) -> Result<Message>
    {
        let ephemeral = Keypair::random(rng);
        let iv = Fr::rand(rng);
        self.sign(voter)?.encrypt(&ephemeral, coordinator, iv)
    }
}

impl SignedCommand
{
    pub fn plaintext(&self) -> Result<[Fr; PLAINTEXT_LENGTH]>
    {
        let [x, y] = coordinates_or_zero(&self.command.new_public_key);
        Ok([
            self.command.packed()?,
            x,
            y,
            self.command.salt,
            self.signature.r8[0],
            self.signature.r8[1],
            self.signature.s
        ])
    }

    pub fn encrypt(&self, ephemeral: &Keypair, coordinator: &PublicKey, iv: Fr) -> Result<Message>
    {
        let shared_key = ephemeral.private_key.shared_key(coordinator)?;
        let plaintext = self.plaintext()?;

        let mut data = [[0u8; 32]; MESSAGE_DATA_LENGTH];
        data[0] = fr_to_bytes(&iv);
        for i in 0..PADDED_LENGTH
        {
            let element = plaintext.get(i).copied().unwrap_or_else(Fr::zero);
            data[i + 1] = fr_to_bytes(&(element + keystream(&shared_key, iv, i)?));
        }

        Ok(Message { data, public_key: ephemeral.public_key })
    }
}

impl Message
{
    /// A message that decodes to nothing, used to fill the last batch.
    pub fn blank() -> Self
    {
        Message { data: [[0u8; 32]; MESSAGE_DATA_LENGTH], public_key: PublicKey::identity() }
    }

    pub fn is_blank(&self) -> bool
    {
        self.public_key.is_identity()
    }

    pub fn elements(&self) -> [Fr; MESSAGE_DATA_LENGTH]
    {
        self.data.map(|bytes| Fr::from_be_bytes_mod_order(&bytes))
    }

    /// `hash4(hash5(data[0..5]), hash5(data[5..10]), key.x, key.y)`
    pub fn hash(&self) -> Result<Fr>
    {
        let d = self.elements();
        let left = hash5([d[0], d[1], d[2], d[3], d[4]])?;
        let right = hash5([d[5], d[6], d[7], d[8], d[9]])?;
        let [x, y] = self.public_key.coordinates();
        hash4([left, right, x, y])
    }
}

/// Decrypt `message` with the coordinator's key and authenticate it against the
/// current key of the leaf it targets.
///
/// - `leaves`: the poll's working state leaves, so that key changes applied
///   earlier in the poll are honoured.
pub fn decode(
    message: &Message,
    coordinator: &PrivateKey,
    poll_id: PollId,
    leaves: &[StateLeaf]
) -> core::result::Result<SignedCommand, DecodeFailure>
{
    if message.is_blank() { return Err(DecodeFailure::PaddingMessage); }

    let shared_key = coordinator
        .shared_key(&message.public_key)
        .map_err(|_| DecodeFailure::InvalidEphemeralKey)?;

    let mut ciphertext = [Fr::zero(); MESSAGE_DATA_LENGTH];
    for (element, bytes) in ciphertext.iter_mut().zip(message.data.iter())
    {
        *element = fr_from_bytes(bytes).ok_or(DecodeFailure::MalformedPlaintext)?;
    }

    let iv = ciphertext[0];
    let mut plaintext = [Fr::zero(); PADDED_LENGTH];
    for (i, element) in plaintext.iter_mut().enumerate()
    {
        let stream = keystream(&shared_key, iv, i).map_err(|_| DecodeFailure::MalformedPlaintext)?;
        *element = ciphertext[i + 1] - stream;
    }
    if plaintext[PLAINTEXT_LENGTH..].iter().any(|p| !p.is_zero())
    {
        return Err(DecodeFailure::MalformedPlaintext);
    }

    let Some(fields) = unpack(&plaintext[0], 5) else { return Err(DecodeFailure::MalformedPlaintext) };
    let (state_index, vote_option_index, new_vote_weight, nonce, command_poll) =
        (fields[0], fields[1], fields[2], fields[3], fields[4]);

    let new_public_key = if plaintext[1].is_zero() && plaintext[2].is_zero()
    {
        None
    }
    else
    {
        let key = PublicKey { x: fr_to_bytes(&plaintext[1]), y: fr_to_bytes(&plaintext[2]) };
        if !key.is_valid() { return Err(DecodeFailure::MalformedPublicKey); }
        Some(key)
    };

    let signature = Signature { r8: [plaintext[4], plaintext[5]], s: plaintext[6] };
    let r8 = PublicKey { x: fr_to_bytes(&signature.r8[0]), y: fr_to_bytes(&signature.r8[1]) };
    if !r8.is_valid() || signature.s.into_bigint() >= ark_ed_on_bn254::Fr::MODULUS
    {
        return Err(DecodeFailure::MalformedSignature);
    }

    if command_poll != poll_id as u64 { return Err(DecodeFailure::WrongPoll); }

    if state_index == 0 || state_index >= leaves.len() as u64
    {
        return Err(DecodeFailure::UnknownStateIndex);
    }

    let command = Command {
        state_index: state_index as u32,
        new_public_key,
        vote_option_index,
        new_vote_weight,
        nonce,
        poll_id,
        salt: plaintext[3]
    };

    let digest = command.hash().map_err(|_| DecodeFailure::MalformedPlaintext)?;
    if !signature.verify(&leaves[state_index as usize].public_key, digest)
    {
        return Err(DecodeFailure::BadSignature);
    }

    Ok(SignedCommand { command, signature })
}

/// Check an authentic command against the voter's ballot and balance.
pub fn validate(
    command: &Command,
    ballot: &Ballot,
    leaf: &StateLeaf,
    max_vote_options: u32,
    mode: VoteMode
) -> core::result::Result<(), ValidationFailure>
{
    if ballot.nonce.checked_add(1) != Some(command.nonce)
    {
        return Err(ValidationFailure::NonceMismatch);
    }

    if command.vote_option_index >= max_vote_options as u64
    {
        return Err(ValidationFailure::OptionOutOfRange);
    }

    let spend = mode.spend_fn();
    let current = ballot.votes.get(command.vote_option_index as usize).copied().unwrap_or(0);
    if spend(command.new_vote_weight) > leaf.voice_credit_balance.saturating_add(spend(current))
    {
        return Err(ValidationFailure::InsufficientVoiceCredits);
    }

    Ok(())
}

/// The leaf and ballot produced by a validated command.
pub fn apply(command: &Command, ballot: &Ballot, leaf: &StateLeaf, mode: VoteMode) -> (StateLeaf, Ballot)
{
    let spend = mode.spend_fn();
    let option = command.vote_option_index as usize;
    let current = ballot.votes.get(option).copied().unwrap_or(0);

    let mut new_leaf = *leaf;
    new_leaf.voice_credit_balance = leaf.voice_credit_balance
        .saturating_add(spend(current))
        .saturating_sub(spend(command.new_vote_weight));
    if let Some(key) = command.new_public_key { new_leaf.public_key = key; }

    let mut new_ballot = ballot.clone();
    new_ballot.nonce += 1;
    if let Some(vote) = new_ballot.votes.get_mut(option) { *vote = command.new_vote_weight; }

    (new_leaf, new_ballot)
}
