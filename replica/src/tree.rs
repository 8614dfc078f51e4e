use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::hash::{fr_to_decimal, hash_n};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MerkleTreeError
{
    /// The tree is full and cannot be inserted into.
    TreeFull { capacity: u64 },

    /// The leaf index lies beyond the occupied (update) or addressable (path) region.
    IndexOutOfRange { index: u64, len: u64 },

    /// The hash function did not succeed.
    HashFailed(String)
}

/// A fixed arity, fixed depth Merkle tree which is filled from the left.
///
/// Only occupied nodes are stored; every other node takes the zero value of its
/// level, so the root is defined at all times and paths may be requested for any
/// index below the capacity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree
{
    /// The immutable arity of the tree.
    arity: u8,

    /// The maximal depth of the tree.
    depth: u8,

    /// The number of inserted leaves.
    count: u64,

    /// `zeroes[l]` is the root of an empty subtree of height `l`.
    zeroes: Vec<Fr>,

    /// The occupied nodes of each level, leaves first.
    levels: Vec<Vec<Fr>>
}

/// The sibling hashes from a leaf to the root, together with the position of
/// the path node inside each sibling group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath
{
    /// The leaf index the path was taken for.
    pub index: u64,

    /// The position (0..arity) of the path node in its group, leaf level first.
    pub indices: Vec<u8>,

    /// The `arity - 1` siblings of the path node, leaf level first.
    pub siblings: Vec<Vec<Fr>>
}

/// Decimal rendering of a `MerklePath` as handed to the proving toolchain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathElements
{
    pub indices: Vec<u8>,
    pub siblings: Vec<Vec<String>>
}

impl MerkleTree
{
    /// Create an empty tree whose unused slots hold `zero`.
    pub fn new(arity: u8, depth: u8, zero: Fr) -> Result<Self, MerkleTreeError>
    {
        let mut zeroes = Vec::with_capacity(depth as usize + 1);
        zeroes.push(zero);
        for level in 0..depth as usize
        {
            let children = vec![zeroes[level]; arity as usize];
            zeroes.push(Self::hash(&children)?);
        }

        Ok(MerkleTree {
            arity,
            depth,
            count: 0,
            zeroes,
            levels: vec![Vec::new(); depth as usize + 1]
        })
    }

    /// Build a tree by inserting `leaves` in order.
    pub fn from_leaves(arity: u8, depth: u8, zero: Fr, leaves: &[Fr]) -> Result<Self, MerkleTreeError>
    {
        let mut tree = Self::new(arity, depth, zero)?;
        for leaf in leaves
        {
            tree.insert(*leaf)?;
        }
        Ok(tree)
    }

    pub fn arity(&self) -> u8
    {
        self.arity
    }

    pub fn depth(&self) -> u8
    {
        self.depth
    }

    /// The number of leaves the tree can hold.
    pub fn capacity(&self) -> u64
    {
        (self.arity as u64).saturating_pow(self.depth as u32)
    }

    /// The number of inserted leaves.
    pub fn len(&self) -> u64
    {
        self.count
    }

    pub fn is_empty(&self) -> bool
    {
        self.count == 0
    }

    pub fn zero(&self, level: u8) -> Option<Fr>
    {
        self.zeroes.get(level as usize).copied()
    }

    pub fn root(&self) -> Fr
    {
        self.node(self.depth as usize, 0)
    }

    pub fn leaf(&self, index: u64) -> Option<Fr>
    {
        self.levels[0].get(index as usize).copied()
    }

    pub fn leaves(&self) -> &[Fr]
    {
        &self.levels[0]
    }

    /// Append `leaf` as the right-most leaf, returning its index.
    pub fn insert(&mut self, leaf: Fr) -> Result<u64, MerkleTreeError>
    {
        let capacity = self.capacity();
        if self.count >= capacity { Err(MerkleTreeError::TreeFull { capacity })? }

        let index = self.count;
        self.levels[0].push(leaf);
        self.count += 1;
        self.refresh(index)?;

        Ok(index)
    }

    /// Replace an occupied leaf.
    pub fn update(&mut self, index: u64, leaf: Fr) -> Result<(), MerkleTreeError>
    {
        if index >= self.count { Err(MerkleTreeError::IndexOutOfRange { index, len: self.count })? }

        self.levels[0][index as usize] = leaf;
        self.refresh(index)
    }

    /// Obtain the siblings needed to recompute the root from the leaf at `index`.
    pub fn path_to(&self, index: u64) -> Result<MerklePath, MerkleTreeError>
    {
        let capacity = self.capacity();
        if index >= capacity { Err(MerkleTreeError::IndexOutOfRange { index, len: capacity })? }

        let arity = self.arity as usize;
        let mut position = index as usize;
        let mut indices = Vec::with_capacity(self.depth as usize);
        let mut siblings = Vec::with_capacity(self.depth as usize);

        for level in 0..self.depth as usize
        {
            let digit = position % arity;
            let start = position - digit;
            siblings.push(
                (start..start + arity)
                    .filter(|i| *i != position)
                    .map(|i| self.node(level, i))
                    .collect()
            );
            indices.push(digit as u8);
            position /= arity;
        }

        Ok(MerklePath { index, indices, siblings })
    }

    /// Poseidon hash of a group of `arity` children.
    pub fn hash(children: &[Fr]) -> Result<Fr, MerkleTreeError>
    {
        hash_n(children).map_err(|e| MerkleTreeError::HashFailed(e.to_string()))
    }

    fn node(&self, level: usize, index: usize) -> Fr
    {
        self.levels[level]
            .get(index)
            .copied()
            .unwrap_or(self.zeroes[level])
    }

    /// Recompute every ancestor of the leaf at `index`.
    fn refresh(&mut self, index: u64) -> Result<(), MerkleTreeError>
    {
        let arity = self.arity as usize;
        let mut position = index as usize;

        for level in 0..self.depth as usize
        {
            let parent = position / arity;
            let start = parent * arity;
            let children: Vec<Fr> = (start..start + arity)
                .map(|i| self.node(level, i))
                .collect();
            let hash = Self::hash(&children)?;

            let above = &mut self.levels[level + 1];
            if parent < above.len() { above[parent] = hash; }
            else { above.push(hash); }

            position = parent;
        }

        Ok(())
    }
}

impl MerklePath
{
    /// Fold the path over `leaf`, producing the root it commits to.
    pub fn compute_root(&self, leaf: Fr) -> Result<Fr, MerkleTreeError>
    {
        let mut node = leaf;
        for (digit, siblings) in self.indices.iter().zip(self.siblings.iter())
        {
            let mut children = siblings.clone();
            children.insert((*digit as usize).min(children.len()), node);
            node = MerkleTree::hash(&children)?;
        }
        Ok(node)
    }

    pub fn verify(&self, leaf: Fr, root: Fr) -> Result<bool, MerkleTreeError>
    {
        Ok(self.compute_root(leaf)? == root)
    }

    pub fn to_elements(&self) -> PathElements
    {
        PathElements {
            indices: self.indices.clone(),
            siblings: self.siblings
                .iter()
                .map(|group| group.iter().map(fr_to_decimal).collect())
                .collect()
        }
    }
}

/// The root of a tree holding exactly `leaves`, with `zero` elsewhere.
pub fn root_of(arity: u8, depth: u8, zero: Fr, leaves: &[Fr]) -> Result<Fr, MerkleTreeError>
{
    Ok(MerkleTree::from_leaves(arity, depth, zero, trim_zeroes(leaves, zero))?.root())
}

/// `leaves` without its trailing run of `zero`; both describe the same tree.
pub fn trim_zeroes(leaves: &[Fr], zero: Fr) -> &[Fr]
{
    let used = leaves.iter().rposition(|leaf| *leaf != zero).map_or(0, |i| i + 1);
    &leaves[..used]
}
