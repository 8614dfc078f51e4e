use ark_bn254::Fr;
use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::{fr_to_bytes, hash4, hex_of, HashBytes};
use crate::keys::PublicKey;
use crate::tree::MerkleTree;

pub type Timestamp = u64;
pub type VoiceCredits = u128;

/// A voter's key, remaining budget and signup time.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct StateLeaf
{
    /// The key commands targeting this leaf must be signed with.
    pub public_key: PublicKey,

    /// The voice credits not yet committed to a vote.
    pub voice_credit_balance: VoiceCredits,

    /// The signup time.
    pub timestamp: Timestamp
}

impl StateLeaf
{
    /// The sentinel occupying index 0 of every registry.
    pub fn blank() -> Self
    {
        StateLeaf {
            public_key: PublicKey::identity(),
            voice_credit_balance: 0,
            timestamp: 0
        }
    }

    pub fn hash(&self) -> Result<Fr>
    {
        let [x, y] = self.public_key.coordinates();
        hash4([x, y, Fr::from(self.voice_credit_balance), Fr::from(self.timestamp)])
    }
}

/// Append-only table of signups, mirrored into a Merkle tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignupRegistry
{
    /// The leaves in signup order, the blank leaf first.
    leaves: Vec<StateLeaf>,

    /// The tree of leaf hashes.
    tree: MerkleTree,

    /// `roots[n]` is the root once `n` voters have signed up.
    roots: Vec<Fr>
}

impl SignupRegistry
{
    pub fn new(arity: u8, depth: u8) -> Result<Self>
    {
        let blank = StateLeaf::blank();
        let mut tree = MerkleTree::new(arity, depth, blank.hash()?)?;
        tree.insert(blank.hash()?)?;

        Ok(SignupRegistry {
            roots: vec![tree.root()],
            leaves: vec![blank],
            tree
        })
    }

    /// Rebuild a registry from persisted signups (the blank leaf excluded).
    pub fn from_signups(arity: u8, depth: u8, signups: &[StateLeaf]) -> Result<Self>
    {
        let mut registry = Self::new(arity, depth)?;
        for leaf in signups
        {
            registry.append(*leaf)?;
        }
        Ok(registry)
    }

    /// Register a voter, returning their state index.
    ///
    /// - `expected_root`: the root reported by the source of truth before this signup;
    ///   a divergence is surfaced as `RootMismatch` and nothing is appended.
    pub fn sign_up(
        &mut self,
        public_key: PublicKey,
        voice_credits: VoiceCredits,
        timestamp: Timestamp,
        expected_root: Option<&HashBytes>
    ) -> Result<u32>
    {
        if let Some(expected) = expected_root
        {
            let actual = fr_to_bytes(&self.root());
            if *expected != actual
            {
                log::error!("registry diverged from source of truth at signup {}", self.num_signups());
                Err(Error::RootMismatch { expected: hex_of(expected), actual: hex_of(&actual) })?
            }
        }

        if !public_key.is_valid() { Err(Error::MalformedPublicKey)? }

        self.append(StateLeaf { public_key, voice_credit_balance: voice_credits, timestamp })
    }

    fn append(&mut self, leaf: StateLeaf) -> Result<u32>
    {
        let capacity = self.capacity();
        if self.tree.len() >= capacity { Err(Error::RegistryFull { capacity })? }

        let index = self.tree.insert(leaf.hash()?)?;
        self.leaves.push(leaf);
        self.roots.push(self.tree.root());

        Ok(index as u32)
    }

    pub fn capacity(&self) -> u64
    {
        self.tree.capacity()
    }

    pub fn depth(&self) -> u8
    {
        self.tree.depth()
    }

    pub fn arity(&self) -> u8
    {
        self.tree.arity()
    }

    /// The number of voters, not counting the blank leaf.
    pub fn num_signups(&self) -> u32
    {
        (self.leaves.len() - 1) as u32
    }

    pub fn root(&self) -> Fr
    {
        self.tree.root()
    }

    /// The root as of the `n`-th signup.
    pub fn root_at_signup_count(&self, n: u32) -> Result<Fr>
    {
        self.roots
            .get(n as usize)
            .copied()
            .ok_or(Error::IndexOutOfRange { index: n as u64, len: self.roots.len() as u64 })
    }

    pub fn leaf(&self, index: u32) -> Option<&StateLeaf>
    {
        self.leaves.get(index as usize)
    }

    /// Every leaf, the blank leaf included.
    pub fn leaves(&self) -> &[StateLeaf]
    {
        &self.leaves
    }

    pub fn tree(&self) -> &MerkleTree
    {
        &self.tree
    }
}
