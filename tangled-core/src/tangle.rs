// src/tangle.rs

//! The tangle: message store, tip set, and branch-based conflict
//! resolution.
//!
//! Conflict resolution is keyed per `(issuer, index)`: once an issuer's
//! message at a given index is contradicted by another message claiming
//! the same index, a [`BranchManager`] tracks the resulting fork until
//! one side outweighs the other by [`MAIN_THRESHOLD`] or reaches
//! [`FINALITY_SCORE`].

use crate::errors::{CoreError, Result};
use crate::invalid_pool::InvalidPool;
use crate::message::Message;
use crate::state::TangleState;
use crate::tip_selection;
use crate::types::{Address, Hash};
use crate::{FINALITY_SCORE, MAIN_THRESHOLD, MAX_PARENTS};
use std::collections::{HashMap, HashSet};
use tangled_crypto::pow::{adaptive_difficulty, TIME_WINDOW};
use tracing::{debug, info};

/// A single side of a fork: the messages that descend from one of two
/// conflicting claims at an `(issuer, index)` slot
#[derive(Clone)]
pub struct Branch {
    msgs: HashMap<Hash, Message>,
}

impl Branch {
    fn new(founder: Message) -> Self {
        let mut msgs = HashMap::new();
        msgs.insert(founder.hash.clone(), founder);
        Self { msgs }
    }

    /// Sum of issuer-balance-weighted approval across every message in
    /// this branch, evaluated against the tangle's main state
    fn approval_weight(&self, state: &TangleState) -> f64 {
        self.msgs
            .values()
            .map(|m| state.get_balance(&m.node_id).max(1) as f64)
            .sum()
    }

    fn is_final(&self, state: &TangleState) -> bool {
        self.approval_weight(state) >= FINALITY_SCORE
    }
}

/// Tracks the main branch and any open conflicts for one `(issuer,
/// index)` slot
pub struct BranchManager {
    issuer: Address,
    index: u64,
    main_branch: Branch,
    conflicts: HashMap<Hash, Branch>,
}

impl BranchManager {
    fn new(issuer: Address, index: u64, main_branch: Branch) -> Self {
        Self {
            issuer,
            index,
            main_branch,
            conflicts: HashMap::new(),
        }
    }

    fn heaviest_conflict(&self, state: &TangleState) -> Option<&Hash> {
        self.conflicts
            .iter()
            .max_by(|(_, a), (_, b)| {
                a.approval_weight(state)
                    .partial_cmp(&b.approval_weight(state))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(hash, _)| hash)
    }

    /// Registers `branch` as a new conflict and swaps it in as the main
    /// branch if it has become heavy enough. Returns the displaced main
    /// branch's messages when a swap occurs.
    fn update_conflict(&mut self, branch: Branch, state: &TangleState) -> Option<Branch> {
        let key = branch
            .msgs
            .keys()
            .next()
            .cloned()
            .unwrap_or_default();
        self.conflicts.insert(key, branch);

        if self.main_branch.is_final(state) {
            return None;
        }

        let heaviest_hash = self.heaviest_conflict(state)?.clone();
        let heaviest_weight = self.conflicts[&heaviest_hash].approval_weight(state);
        let main_weight = self.main_branch.approval_weight(state);

        let should_swap = self.conflicts[&heaviest_hash].is_final(state)
            || heaviest_weight >= main_weight * (1.0 + MAIN_THRESHOLD);

        if !should_swap {
            return None;
        }

        let new_main = self.conflicts.remove(&heaviest_hash)?;
        let old_main = std::mem::replace(&mut self.main_branch, new_main);
        self.conflicts.insert(
            old_main
                .msgs
                .keys()
                .next()
                .cloned()
                .unwrap_or_default(),
            old_main.clone(),
        );

        Some(old_main)
    }

    fn is_final(&self, state: &TangleState) -> bool {
        self.main_branch.is_final(state)
    }

    /// The `(issuer, index)` slot this manager tracks
    pub fn id(&self) -> (Address, u64) {
        (self.issuer.clone(), self.index)
    }
}

/// The full tangle: message store, tip sets, balance ledger, open
/// branches, and invalid-message pool
pub struct Tangle {
    genesis: Message,
    msgs: HashMap<Hash, Message>,
    strong_tips: HashMap<Hash, Message>,
    weak_tips: HashMap<Hash, Message>,
    state: TangleState,
    branches: HashMap<(Address, u64), BranchManager>,
    invalid_pool: InvalidPool,
}

impl Tangle {
    /// Builds a tangle seeded with the genesis message
    pub fn new(invalid_pool_size: usize, invalid_pool_purge_time: i64) -> Self {
        let genesis = Message::genesis();
        let mut state = TangleState::new();
        state.update_tx_on_tangle(&genesis, true);

        let mut msgs = HashMap::new();
        msgs.insert(genesis.hash.clone(), genesis.clone());

        Self {
            genesis,
            msgs,
            strong_tips: HashMap::new(),
            weak_tips: HashMap::new(),
            state,
            branches: HashMap::new(),
            invalid_pool: InvalidPool::new(invalid_pool_size, invalid_pool_purge_time),
        }
    }

    /// The genesis message
    pub fn genesis(&self) -> &Message {
        &self.genesis
    }

    /// Looks up a message by hash, checking the confirmed store and
    /// both tip sets
    pub fn get_msg(&self, hash: &str) -> Option<&Message> {
        self.msgs
            .get(hash)
            .or_else(|| self.strong_tips.get(hash))
            .or_else(|| self.weak_tips.get(hash))
    }

    /// Current balance of an address
    pub fn get_balance(&self, address: &str) -> i64 {
        self.state.get_balance(address)
    }

    /// Whether a hash is in the invalid-message pool
    pub fn is_invalid(&mut self, hash: &str) -> bool {
        self.invalid_pool.contains(hash)
    }

    /// Whether a hash is in the invalid-message pool, without
    /// refreshing its access time — for read-only callers such as
    /// [`crate::message::Message::analyze_parents`]
    pub fn in_invalid_pool(&self, hash: &str) -> bool {
        self.invalid_pool.contains_ref(hash)
    }

    /// Marks a hash as invalid
    pub fn mark_invalid(&mut self, hash: Hash) {
        self.invalid_pool.insert(hash);
    }

    fn all_msgs(&self) -> impl Iterator<Item = &Message> {
        self.msgs
            .values()
            .chain(self.strong_tips.values())
            .chain(self.weak_tips.values())
    }

    fn count_children(&self, hash: &str) -> usize {
        self.all_msgs()
            .filter(|m| m.parents.contains_key(hash))
            .count()
    }

    /// Every message that names `hash` as a parent
    pub fn get_direct_children(&self, hash: &str) -> Vec<&Message> {
        self.all_msgs()
            .filter(|m| m.parents.contains_key(hash))
            .collect()
    }

    fn find_msg_by_index(&self, issuer: &str, index: u64) -> Option<Message> {
        self.all_msgs()
            .find(|m| m.node_id == issuer && m.index == index)
            .cloned()
    }

    /// Computes the adaptive proof-of-work difficulty this message must
    /// meet, based on how many messages its issuer has sent within the
    /// trailing window
    pub fn get_difficulty(&self, msg: &Message) -> u32 {
        let count = self
            .msgs
            .values()
            .filter(|m| {
                m.node_id == msg.node_id
                    && m.timestamp > msg.timestamp - TIME_WINDOW
                    && m.timestamp < msg.timestamp
            })
            .count();
        adaptive_difficulty(count)
    }

    fn purge_tips(&mut self, now: i64) {
        let (_, stale_strong) =
            tip_selection::partition_stale(&self.strong_tips, now, &self.genesis.hash);
        let (_, stale_weak) =
            tip_selection::partition_stale(&self.weak_tips, now, &self.genesis.hash);

        for hash in stale_strong {
            if let Some(m) = self.strong_tips.remove(&hash) {
                self.state.update_tx_on_tangle(&m, false);
            }
        }
        for hash in stale_weak {
            if let Some(m) = self.weak_tips.remove(&hash) {
                self.state.update_tx_on_tangle(&m, false);
            }
        }
    }

    /// Picks up to `MAX_PARENTS` tips uniformly at random, marking
    /// which were drawn from the weak set
    pub fn select_tips(&mut self) -> HashMap<Hash, bool> {
        let now = crate::types::now();
        self.purge_tips(now);

        let total = self.strong_tips.len() + self.weak_tips.len();
        if total == 0 {
            let mut parents = HashMap::new();
            parents.insert(self.genesis.hash.clone(), false);
            return parents;
        }

        let amt = total.min(MAX_PARENTS);
        tip_selection::select(&self.strong_tips, &self.weak_tips, amt)
    }

    fn add_approved_msg(&mut self, msg: Message) {
        self.state.update_tx_on_tangle(&msg, true);
        self.msgs.insert(msg.hash.clone(), msg);
    }

    fn promote_saturated_tips(&mut self, parents: &HashMap<Hash, bool>) {
        for (parent_hash, is_weak) in parents {
            if *parent_hash == self.genesis.hash {
                continue;
            }

            let in_tips = self.strong_tips.contains_key(parent_hash)
                || self.weak_tips.contains_key(parent_hash);
            if !in_tips || self.count_children(parent_hash) <= 1 {
                continue;
            }

            let removed = if *is_weak {
                self.weak_tips.remove(parent_hash)
            } else {
                self.strong_tips.remove(parent_hash)
            };

            if let Some(p_msg) = removed {
                self.add_approved_msg(p_msg);
            }
        }
    }

    /// Admits a message into the tangle: promotes saturated parent
    /// tips, resolves any index conflict into a branch, and adds the
    /// message as a new tip. A non-empty `invalid_parents` routes the
    /// message into the weak tip set instead of the strong one.
    pub fn add_msg(&mut self, msg: Message, invalid_parents: HashSet<Hash>) -> Result<()> {
        if msg.hash == self.genesis.hash {
            return Ok(());
        }

        if self.get_msg(&msg.hash).is_some() {
            return Err(CoreError::DuplicateMessage(msg.hash));
        }

        if let Some(existing) = self.find_msg_by_index(&msg.node_id, msg.index) {
            if existing.hash != msg.hash {
                self.create_new_branch(msg, existing)?;
                return Ok(());
            }
        }

        self.promote_saturated_tips(&msg.parents);
        self.admit_tip(msg, !invalid_parents.is_empty());

        Ok(())
    }

    fn admit_tip(&mut self, msg: Message, weak: bool) {
        self.state.update_tx_on_tangle(&msg, true);
        if weak {
            debug!(hash = %msg.hash, node_id = %msg.node_id, "admitting message as weak tip");
            self.weak_tips.insert(msg.hash.clone(), msg);
        } else {
            debug!(hash = %msg.hash, node_id = %msg.node_id, "admitting message as strong tip");
            self.strong_tips.insert(msg.hash.clone(), msg);
        }
    }

    /// Removes a message from wherever it currently lives, unwinding its
    /// effect on the balance ledger
    pub fn remove_msg(&mut self, hash: &str) {
        let removed = self
            .msgs
            .remove(hash)
            .or_else(|| self.strong_tips.remove(hash))
            .or_else(|| self.weak_tips.remove(hash));

        if let Some(msg) = removed {
            self.state.update_tx_on_tangle(&msg, false);
        }
    }

    fn create_new_branch(&mut self, msg: Message, conflict: Message) -> Result<()> {
        let key = (msg.node_id.clone(), msg.index);

        let challenger = Branch::new(msg);

        let displaced = if let Some(manager) = self.branches.get_mut(&key) {
            manager.update_conflict(challenger, &self.state)
        } else {
            let mut manager = BranchManager::new(key.0.clone(), key.1, Branch::new(conflict));
            let displaced = manager.update_conflict(challenger, &self.state);
            self.branches.insert(key.clone(), manager);
            displaced
        };

        if let Some(old_main) = displaced {
            for m in old_main.msgs.values() {
                self.remove_msg(&m.hash);
            }

            let new_main_msgs: Vec<Message> = self
                .branches
                .get(&key)
                .map(|m| m.main_branch.msgs.values().cloned().collect())
                .unwrap_or_default();

            for m in new_main_msgs.into_iter().rev() {
                self.state.update_tx_on_tangle(&m, true);
                self.msgs.insert(m.hash.clone(), m);
            }

            info!(issuer = %key.0, index = key.1, "main branch swapped");
        }

        if self
            .branches
            .get(&key)
            .map(|m| m.is_final(&self.state))
            .unwrap_or(false)
        {
            self.branches.remove(&key);
        }

        Ok(())
    }

    /// Next unused sequence index for an issuer, counting every message
    /// of theirs currently stored, confirmed or tip
    pub fn next_index(&self, issuer: &str) -> u64 {
        self.all_msgs().filter(|m| m.node_id == issuer).count() as u64
    }

    /// Snapshots every message this tangle currently holds, for
    /// persistence via [`crate::storage::Snapshot`]
    pub fn snapshot(&self) -> crate::storage::Snapshot {
        crate::storage::Snapshot {
            msgs: self.msgs.values().cloned().collect(),
            strong_tips: self.strong_tips.values().cloned().collect(),
            weak_tips: self.weak_tips.values().cloned().collect(),
        }
    }

    /// Rebuilds a tangle from a loaded snapshot, re-admitting every
    /// message through [`Tangle::add_msg`]
    pub fn restore(
        snapshot: crate::storage::Snapshot,
        invalid_pool_size: usize,
        invalid_pool_purge_time: i64,
    ) -> Self {
        let mut tangle = Self::new(invalid_pool_size, invalid_pool_purge_time);
        let genesis_hash = tangle.genesis.hash.clone();

        for msg in snapshot.msgs.into_iter().chain(snapshot.strong_tips) {
            if msg.hash == genesis_hash {
                continue;
            }
            if let Err(e) = tangle.add_msg(msg, HashSet::new()) {
                tracing::warn!(error = %e, "skipped message while restoring snapshot");
            }
        }

        for msg in snapshot.weak_tips {
            if msg.hash == genesis_hash || tangle.get_msg(&msg.hash).is_some() {
                continue;
            }
            tangle.promote_saturated_tips(&msg.parents);
            tangle.admit_tip(msg, true);
        }

        tangle
    }

    /// Number of confirmed (non-tip) messages
    pub fn msg_count(&self) -> usize {
        self.msgs.len()
    }

    /// Number of currently open conflict branches
    pub fn open_branch_count(&self) -> usize {
        self.branches.len()
    }
}
