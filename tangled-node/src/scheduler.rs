// src/scheduler.rs

//! Per-issuer scheduling and pending-parent vote aggregation.
//!
//! Messages admitted off the wire aren't applied to the tangle
//! immediately: they sit in a per-issuer FIFO queue and are drained one
//! at a time by issuer reputation, so no single high-volume issuer can
//! starve the rest. A message naming a parent this node hasn't seen yet
//! is parked as a [`PendingMessage`] until enough reputation-weighted
//! peer votes resolve each missing parent, one way or the other.

use std::collections::HashMap;
use tangled_core::tangle::Tangle;
use tangled_core::types::{now, Address, Hash, Timestamp};
use tangled_core::Message;

#[derive(Clone, Debug)]
struct Vote {
    weight: i64,
    accepted: bool,
}

/// A message waiting on one or more parents this node hasn't seen yet
pub struct PendingMessage {
    /// The message itself, held until every missing parent resolves
    pub msg: Message,
    missing: HashMap<Hash, Vec<Vote>>,
    first_vote_at: Option<Timestamp>,
}

impl PendingMessage {
    fn new(msg: Message, missing: Vec<Hash>) -> Self {
        Self {
            msg,
            missing: missing.into_iter().map(|h| (h, Vec::new())).collect(),
            first_vote_at: None,
        }
    }

    fn cast_vote(&mut self, parent: &Hash, weight: i64, accepted: bool, at: Timestamp) {
        if let Some(votes) = self.missing.get_mut(parent) {
            votes.push(Vote { weight, accepted });
        }
        self.first_vote_at.get_or_insert(at);
    }

    fn resolve(&mut self, threshold: f64, window: i64, at: Timestamp) -> PendingOutcome {
        let Some(first) = self.first_vote_at else {
            return PendingOutcome::StillPending;
        };
        let expired = at - first > window;

        let mut all_accepted = true;
        for votes in self.missing.values() {
            let score: f64 = votes
                .iter()
                .map(|v| if v.accepted { v.weight as f64 } else { -(v.weight as f64) })
                .sum();

            if score <= -threshold {
                return PendingOutcome::Rejected;
            }
            if score >= threshold {
                continue;
            }

            if expired {
                if score <= 0.0 {
                    return PendingOutcome::Rejected;
                }
            } else {
                all_accepted = false;
            }
        }

        if all_accepted {
            PendingOutcome::Ready
        } else {
            PendingOutcome::StillPending
        }
    }
}

/// Result of casting a vote on a pending message's missing parents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOutcome {
    /// At least one parent hasn't cleared `pending_threshold` yet, and
    /// `pending_window` hasn't elapsed since the first vote
    StillPending,
    /// Every missing parent cleared threshold; the message is ready for
    /// admission into the tangle
    Ready,
    /// A parent failed to clear threshold within the window; the
    /// message should be dropped into the invalid pool
    Rejected,
}

/// Per-issuer FIFO admission queue plus the pending-parent vote table
#[derive(Default)]
pub struct Scheduler {
    queue: HashMap<Address, HashMap<Hash, Message>>,
    pending: HashMap<Hash, PendingMessage>,
}

impl Scheduler {
    /// Creates an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a message for admission, keyed by its issuer
    pub fn queue_msg(&mut self, msg: Message) {
        self.queue
            .entry(msg.node_id.clone())
            .or_default()
            .insert(msg.hash.clone(), msg);
    }

    /// `balance(issuer) / admissible_queue_depth(issuer)` for every
    /// issuer with at least one non-future-timestamped queued message
    fn scores(&self, tangle: &Tangle) -> HashMap<Address, f64> {
        let current = now();
        self.queue
            .iter()
            .filter_map(|(issuer, msgs)| {
                let admissible = msgs.values().filter(|m| m.timestamp <= current).count();
                if admissible == 0 {
                    return None;
                }
                let balance = tangle.get_balance(issuer).max(0) as f64;
                Some((issuer.clone(), balance / admissible as f64))
            })
            .collect()
    }

    /// Removes and returns the oldest queued message belonging to the
    /// highest-scoring issuer, or `None` if no issuer has an admissible
    /// message
    pub fn process_next(&mut self, tangle: &Tangle) -> Option<Message> {
        let scores = self.scores(tangle);
        let (issuer, _) = scores
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).expect("scores are never NaN"))?;

        let msgs = self.queue.get_mut(&issuer)?;
        let oldest = msgs.values().min_by_key(|m| m.timestamp)?.hash.clone();
        let msg = msgs.remove(&oldest);

        if msgs.is_empty() {
            self.queue.remove(&issuer);
        }
        msg
    }

    /// Number of messages currently queued across every issuer
    pub fn queue_len(&self) -> usize {
        self.queue.values().map(|m| m.len()).sum()
    }

    /// Parks `msg` pending resolution of `missing` parent hashes,
    /// merging with an existing pending entry for the same message
    pub fn add_pending(&mut self, msg: Message, missing: Vec<Hash>) {
        self.pending
            .entry(msg.hash.clone())
            .and_modify(|p| {
                for h in &missing {
                    p.missing.entry(h.clone()).or_default();
                }
            })
            .or_insert_with(|| PendingMessage::new(msg, missing));
    }

    /// Casts a reputation-weighted vote on whether `parent` is valid for
    /// the pending message `msg_hash`. Returns `None` if nothing is
    /// pending under that hash.
    pub fn vote(
        &mut self,
        msg_hash: &Hash,
        parent: &Hash,
        voter_weight: i64,
        accepted: bool,
        threshold: f64,
        window: i64,
    ) -> Option<PendingOutcome> {
        let at = now();
        let pending = self.pending.get_mut(msg_hash)?;
        pending.cast_vote(parent, voter_weight, accepted, at);
        let outcome = pending.resolve(threshold, window, at);

        if matches!(outcome, PendingOutcome::Ready | PendingOutcome::Rejected) {
            self.pending.remove(msg_hash);
        }
        Some(outcome)
    }

    /// Takes back the message parked under `msg_hash`, if still pending
    pub fn take_pending(&mut self, msg_hash: &Hash) -> Option<Message> {
        self.pending.remove(msg_hash).map(|p| p.msg)
    }

    /// Number of messages currently parked on missing parents
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether a message is still parked under `msg_hash`
    pub fn is_pending(&self, msg_hash: &Hash) -> bool {
        self.pending.contains_key(msg_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;
    use tangled_core::message::Payload;
    use tangled_crypto::{address, keys::generate_keypair};

    fn message(issuer: &str, index: u64, timestamp: Timestamp) -> Message {
        let mut msg = Message::new(
            issuer.to_string(),
            index,
            Payload::Transaction {
                receiver: "Treceiver".to_string(),
                amt: 1,
            },
            Map::new(),
        );
        msg.timestamp = timestamp;
        msg.hash = format!("{}-{}", issuer, index);
        msg
    }

    #[test]
    fn test_queue_and_process_picks_higher_balance_issuer() {
        let mut tangle = Tangle::new(1000, 3600);
        let keypair = generate_keypair();
        let rich = address::address_from_public_key(&keypair.public_key);
        let mut parents = Map::new();
        parents.insert(tangle.genesis().hash.clone(), false);
        let mut funding = Message::new(
            rich.clone(),
            0,
            Payload::Transaction {
                receiver: "Tsomeone".to_string(),
                amt: 1,
            },
            parents,
        );
        funding.do_work(1).unwrap();
        funding.sign(&keypair).unwrap();
        tangle.add_msg(funding, std::collections::HashSet::new()).unwrap();

        let mut scheduler = Scheduler::new();
        scheduler.queue_msg(message(&rich, 1, now() - 10));
        scheduler.queue_msg(message("Tpoor", 1, now() - 10));

        let picked = scheduler.process_next(&tangle).unwrap();
        assert_eq!(picked.node_id, rich);
        assert_eq!(scheduler.queue_len(), 1);
    }

    #[test]
    fn test_process_next_empty_scheduler() {
        let tangle = Tangle::new(1000, 3600);
        let mut scheduler = Scheduler::new();
        assert!(scheduler.process_next(&tangle).is_none());
    }

    #[test]
    fn test_future_timestamped_messages_are_not_admissible() {
        let tangle = Tangle::new(1000, 3600);
        let mut scheduler = Scheduler::new();
        scheduler.queue_msg(message("T1", 0, now() + 10_000));
        assert!(scheduler.process_next(&tangle).is_none());
    }

    #[test]
    fn test_pending_ready_once_votes_clear_threshold() {
        let mut scheduler = Scheduler::new();
        let msg = message("T1", 0, now());
        scheduler.add_pending(msg, vec!["parent-a".to_string()]);

        let outcome = scheduler
            .vote(&"T1-0".to_string(), &"parent-a".to_string(), 4, true, 3.0, 4)
            .unwrap();
        assert_eq!(outcome, PendingOutcome::Ready);
        assert_eq!(scheduler.pending_len(), 0);
    }

    #[test]
    fn test_pending_stays_pending_below_threshold_within_window() {
        let mut scheduler = Scheduler::new();
        let msg = message("T1", 0, now());
        scheduler.add_pending(msg, vec!["parent-a".to_string()]);

        let outcome = scheduler
            .vote(&"T1-0".to_string(), &"parent-a".to_string(), 1, true, 3.0, 4)
            .unwrap();
        assert_eq!(outcome, PendingOutcome::StillPending);
        assert_eq!(scheduler.pending_len(), 1);
    }

    #[test]
    fn test_pending_rejected_after_window_expires() {
        let mut scheduler = Scheduler::new();
        let mut msg = message("T1", 0, now());
        msg.hash = "T1-0".to_string();
        scheduler.add_pending(msg, vec!["parent-a".to_string()]);

        // first vote establishes the window at `now`
        scheduler.vote(&"T1-0".to_string(), &"parent-a".to_string(), 1, false, 3.0, -1);
        let outcome = scheduler
            .vote(&"T1-0".to_string(), &"parent-a".to_string(), 0, false, 3.0, -1)
            .unwrap();
        assert_eq!(outcome, PendingOutcome::Rejected);
    }

    #[test]
    fn test_vote_on_unknown_message_returns_none() {
        let mut scheduler = Scheduler::new();
        assert!(scheduler.vote(&"nope".to_string(), &"parent".to_string(), 1, true, 1.0, 4).is_none());
    }
}
