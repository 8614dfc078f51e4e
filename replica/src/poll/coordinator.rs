use ark_bn254::Fr;

use crate::error::Result;
use crate::hash::hash4;
use crate::keys::{Keypair, PrivateKey, PublicKey};
use crate::poll::PollId;

/// Separates the salts of the commitments a coordinator reveals.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SaltDomain
{
    StateBallot = 1,
    Results = 2,
    SpentSubtotal = 3,
    PerOptionSpent = 4
}

/// The poll operator: decrypts messages and salts commitments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Coordinator
{
    /// The coordinators key pair.
    pub keypair: Keypair
}

impl Coordinator
{
    pub fn new(keypair: Keypair) -> Self
    {
        Coordinator { keypair }
    }

    pub fn private_key(&self) -> &PrivateKey
    {
        &self.keypair.private_key
    }

    pub fn public_key(&self) -> &PublicKey
    {
        &self.keypair.public_key
    }

    /// The salt of the `counter`-th commitment in `domain`. Only the coordinator can
    /// derive it, and re-running a poll reproduces it.
    pub fn salt(&self, poll_id: PollId, domain: SaltDomain, counter: u32) -> Result<Fr>
    {
        hash4([
            self.keypair.private_key.as_field(),
            Fr::from(poll_id as u64),
            Fr::from(domain as u64),
            Fr::from(counter as u64)
        ])
    }
}
