//! Commutative Merkle accumulator over note commitments.
//!
//! Each level is reduced pairwise after padding odd lengths with an empty
//! slot. A pair is ordered by value before hashing, so the parent does not
//! depend on which sibling sat on the left; an empty slot (zero) lets its
//! partner pass through unhashed.
//!
//! ```text
//!                 root
//!               /      \
//!          H(lo,hi)    c4        <- c4 paired with an empty slot
//!          /     \      |
//!      H(c0,c1) H(c2,c3) c4
//!       /  \     /  \    |  \
//!      c0  c1   c2  c3   c4  ∅
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PoolError, Result};
use crate::field::FieldElement;
use crate::hash::{HashBackend, HashHandle};

/// How two nodes combine into their parent, and how raw leaves are admitted.
///
/// Two incompatible versions of the pool exist; an accumulator picks one at
/// construction and uses it for both building and verifying paths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairingRule {
    /// Zero is the identity; every other pair is hashed.
    #[default]
    ZeroIdentity,
    /// Leaves are made even, combined values are forced odd, so no real node
    /// can ever be confused with the zero sentinel.
    OddParity,
}

impl PairingRule {
    pub fn filter_leaf(self, leaf: FieldElement) -> FieldElement {
        match self {
            PairingRule::ZeroIdentity => leaf,
            PairingRule::OddParity => clear_low_bit(leaf),
        }
    }

    /// Symmetric in `x` and `y`.
    pub fn combine(
        self,
        hasher: &dyn HashBackend,
        x: FieldElement,
        y: FieldElement,
    ) -> Result<FieldElement> {
        let (lo, hi) = if y < x { (y, x) } else { (x, y) };
        let raw = if lo.is_zero() { hi } else { hasher.hash2(lo, hi)? };
        Ok(match self {
            PairingRule::ZeroIdentity => raw,
            PairingRule::OddParity if raw.is_odd() => raw,
            PairingRule::OddParity => raw + FieldElement::one(),
        })
    }
}

impl core::str::FromStr for PairingRule {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s {
            "zero-identity" => Ok(PairingRule::ZeroIdentity),
            "odd-parity" => Ok(PairingRule::OddParity),
            other => Err(format!("unknown pairing rule {other:?}")),
        }
    }
}

fn clear_low_bit(v: FieldElement) -> FieldElement {
    if v.is_odd() {
        // v >= 1, so the subtraction cannot wrap
        v.checked_sub(FieldElement::one()).unwrap_or(v)
    } else {
        v
    }
}

/// A position in a tree level: a real value or the padding slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    Value(FieldElement),
    EmptySlot,
}

impl Node {
    /// Collapse to the value fed into `combine`; the empty slot is zero.
    pub fn value(self) -> FieldElement {
        match self {
            Node::Value(v) => v,
            Node::EmptySlot => FieldElement::zero(),
        }
    }
}

/// Siblings from a leaf up to, not including, the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationPath {
    pub index: usize,
    pub siblings: Vec<FieldElement>,
    /// The final singleton of the reduction. Not a hash input.
    pub terminator: FieldElement,
}

impl AuthenticationPath {
    /// Right-pad the siblings with zero up to `slots` entries.
    pub fn padded(&self, slots: usize) -> Result<Vec<FieldElement>> {
        if self.siblings.len() > slots {
            return Err(PoolError::PathTooLong {
                len: self.siblings.len(),
                max: slots,
            });
        }
        let mut out = self.siblings.clone();
        out.resize(slots, FieldElement::zero());
        Ok(out)
    }
}

/// Root and path computation under a fixed [`PairingRule`].
#[derive(Clone)]
pub struct MerkleAccumulator {
    hasher: HashHandle,
    rule: PairingRule,
}

impl MerkleAccumulator {
    pub fn new(hasher: HashHandle, rule: PairingRule) -> Self {
        Self { hasher, rule }
    }

    pub fn rule(&self) -> PairingRule {
        self.rule
    }

    pub fn hasher(&self) -> &dyn HashBackend {
        self.hasher.as_ref()
    }

    pub fn handle(&self) -> HashHandle {
        self.hasher.clone()
    }

    pub fn combine(&self, x: FieldElement, y: FieldElement) -> Result<FieldElement> {
        self.rule.combine(self.hasher(), x, y)
    }

    fn leaf_level(&self, leaves: &[FieldElement]) -> Vec<Node> {
        leaves
            .iter()
            .map(|leaf| Node::Value(self.rule.filter_leaf(*leaf)))
            .collect()
    }

    fn pad(level: &mut Vec<Node>) {
        if level.len() % 2 != 0 {
            level.push(Node::EmptySlot);
        }
    }

    /// Reduce one even-length level to its parents.
    pub fn next_level(&self, level: &[Node]) -> Result<Vec<Node>> {
        level
            .chunks(2)
            .map(|pair| {
                let right = pair.get(1).copied().unwrap_or(Node::EmptySlot);
                self.combine(pair[0].value(), right.value()).map(Node::Value)
            })
            .collect()
    }

    /// Root of an ordered leaf sequence. A single leaf is its own root.
    pub fn root(&self, leaves: &[FieldElement]) -> Result<FieldElement> {
        if leaves.is_empty() {
            return Err(PoolError::EmptyAccumulator);
        }
        let mut level = self.leaf_level(leaves);
        while level.len() > 1 {
            Self::pad(&mut level);
            level = self.next_level(&level)?;
        }
        Ok(level[0].value())
    }

    /// Authentication path for the leaf at `index`.
    ///
    /// Siblings are recorded at their structural position, before the pair is
    /// value-ordered.
    pub fn authentication_path(
        &self,
        leaves: &[FieldElement],
        index: usize,
    ) -> Result<AuthenticationPath> {
        if leaves.is_empty() {
            return Err(PoolError::EmptyAccumulator);
        }
        if index >= leaves.len() {
            return Err(PoolError::IndexOutOfRange {
                index,
                len: leaves.len(),
            });
        }

        let mut level = self.leaf_level(leaves);
        let mut siblings = Vec::new();
        let mut position = index;
        while level.len() > 1 {
            Self::pad(&mut level);
            let sibling = if position % 2 == 0 {
                level[position + 1]
            } else {
                level[position - 1]
            };
            siblings.push(sibling.value());
            position /= 2;
            level = self.next_level(&level)?;
        }
        debug!(index, depth = siblings.len(), "built authentication path");

        Ok(AuthenticationPath {
            index,
            siblings,
            terminator: level[0].value(),
        })
    }

    /// Replay `siblings` against a raw leaf.
    pub fn root_from_path(
        &self,
        leaf: FieldElement,
        siblings: &[FieldElement],
    ) -> Result<FieldElement> {
        siblings
            .iter()
            .try_fold(self.rule.filter_leaf(leaf), |acc, sibling| {
                self.combine(acc, *sibling)
            })
    }

    /// Check that `path` takes `leaf` to `root`.
    pub fn verify(
        &self,
        leaf: FieldElement,
        path: &AuthenticationPath,
        root: FieldElement,
    ) -> Result<()> {
        let computed = self.root_from_path(leaf, &path.siblings)?;
        if computed != root {
            return Err(PoolError::RootMismatch {
                expected: root,
                computed,
            });
        }
        Ok(())
    }

    pub fn is_member(
        &self,
        leaf: FieldElement,
        path: &AuthenticationPath,
        root: FieldElement,
    ) -> bool {
        self.verify(leaf, path, root).is_ok()
    }
}

/// Ordered leaves as published by the ledger at one instant.
///
/// Index is the only identity of a leaf; leaves are never removed or
/// rewritten.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatorSnapshot {
    leaves: Vec<FieldElement>,
}

impl AccumulatorSnapshot {
    pub fn new(leaves: Vec<FieldElement>) -> Self {
        Self { leaves }
    }

    /// Append a leaf and return its index.
    pub fn push(&mut self, leaf: FieldElement) -> usize {
        self.leaves.push(leaf);
        self.leaves.len() - 1
    }

    pub fn leaves(&self) -> &[FieldElement] {
        &self.leaves
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// First index holding `commitment`.
    pub fn position_of(&self, commitment: FieldElement) -> Option<usize> {
        self.leaves.iter().position(|leaf| *leaf == commitment)
    }

    pub fn root(&self, accumulator: &MerkleAccumulator) -> Result<FieldElement> {
        accumulator.root(&self.leaves)
    }

    pub fn path(
        &self,
        accumulator: &MerkleAccumulator,
        index: usize,
    ) -> Result<AuthenticationPath> {
        accumulator.authentication_path(&self.leaves, index)
    }
}
