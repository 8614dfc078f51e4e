/// Protocol limits shared by the registry and every poll.
///
/// The circuits are compiled against fixed tree shapes, so these are constants
/// of a deployment rather than runtime parameters.
pub trait Config: Clone + core::fmt::Debug + Eq + 'static
{
    /// The arity of the state, ballot, vote option and result trees.
    const TREE_ARITY: u8 = 5;

    /// The maximum depth of the signup registry.
    const MAX_STATE_TREE_DEPTH: u8;

    /// The maximum depth of the per ballot vote option tree.
    const MAX_VOTE_OPTION_TREE_DEPTH: u8;

    /// The maximum number of poll outcomes.
    const MAX_VOTE_OPTIONS: u32;

    /// The maximum number of polls a single replica may host.
    const MAX_POLLS: u32;
}

/// Limits matching the production circuits.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DefaultConfig;

impl Config for DefaultConfig
{
    const MAX_STATE_TREE_DEPTH: u8 = 10;
    const MAX_VOTE_OPTION_TREE_DEPTH: u8 = 3;
    const MAX_VOTE_OPTIONS: u32 = 125;
    const MAX_POLLS: u32 = 1028;
}
