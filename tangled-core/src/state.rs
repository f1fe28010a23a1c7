// src/state.rs

//! Per-address balance ledger.
//!
//! A [`TangleState`] is folded incrementally as messages are applied to
//! (or removed from) the main tangle, and merged when a branch swap
//! pulls a conflicting branch's effects into place.

use crate::message::{Message, Payload};
use std::collections::HashMap;

/// Balance ledger keyed by address
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TangleState {
    balances: HashMap<String, i64>,
}

impl TangleState {
    /// An empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an address's balance, or zero if it has never received value
    pub fn get_balance(&self, address: &str) -> i64 {
        *self.balances.get(address).unwrap_or(&0)
    }

    /// Applies (or, with `add = false`, unwinds) a message's effect
    ///
    /// The issuer's balance is debited and the payload's receiver is
    /// credited; the genesis message (`node_id == "0"`) only credits.
    pub fn update_tx_on_tangle(&mut self, msg: &Message, add: bool) {
        let mut amt = msg.payload.amount();
        if !add {
            amt = -amt;
        }

        if msg.node_id != "0" {
            let sender_balance = self.get_balance(&msg.node_id) - amt;
            if sender_balance == 0 {
                self.balances.remove(&msg.node_id);
            } else {
                self.balances.insert(msg.node_id.clone(), sender_balance);
            }
        }

        let receiver = msg.payload.receiver().to_string();
        let receiver_balance = self.get_balance(&receiver) + amt;
        self.balances.insert(receiver, receiver_balance);
    }

    /// Merges another state's balances into (or, with `add = false`, out
    /// of) this one
    pub fn merge(&self, other: &TangleState, add: bool) -> TangleState {
        let mut keys: Vec<&String> = self.balances.keys().collect();
        keys.extend(other.balances.keys());

        let mut balances = HashMap::new();
        for key in keys {
            let lhs = self.get_balance(key);
            let rhs = other.get_balance(key);
            let merged = if add { lhs + rhs } else { lhs - rhs };
            if merged != 0 {
                balances.insert(key.clone(), merged);
            }
        }

        TangleState { balances }
    }
}
