use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::config::Config;
use crate::maci::MaciState;

/// Small limits so that the test trees stay cheap to hash.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Test;

impl Config for Test
{
    const MAX_STATE_TREE_DEPTH: u8 = 4;
    const MAX_VOTE_OPTION_TREE_DEPTH: u8 = 2;
    const MAX_VOTE_OPTIONS: u32 = 25;
    const MAX_POLLS: u32 = 3;
}

/// The registry depth used throughout the tests.
pub const STATE_TREE_DEPTH: u8 = 2;

pub type Maci = MaciState<Test>;

pub fn new_test_state() -> Maci
{
    Maci::new(STATE_TREE_DEPTH).expect("depth is within the test limits")
}

/// A deterministic rng, so that keys and ciphertexts are reproducible.
pub fn test_rng(seed: u64) -> ChaCha20Rng
{
    ChaCha20Rng::seed_from_u64(seed)
}
