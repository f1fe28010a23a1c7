// src/tip_selection.rs

//! Tip selection and pruning.
//!
//! Parents for a new message are drawn uniformly at random from the
//! current tip set — no weighted walk, no scoring. A tip that sits
//! unapproved past [`MAX_TIP_AGE`](crate::MAX_TIP_AGE) is pruned before
//! selection runs.

use crate::message::Message;
use crate::types::Hash;
use crate::MAX_TIP_AGE;
use rand::seq::IteratorRandom;
use std::collections::HashMap;

/// Splits `tips` into those still young enough to use as a parent and
/// those that should be purged, leaving the genesis message untouched
pub fn partition_stale(
    tips: &HashMap<Hash, Message>,
    now: i64,
    genesis_hash: &str,
) -> (Vec<Hash>, Vec<Hash>) {
    let mut fresh = Vec::new();
    let mut stale = Vec::new();

    for (hash, msg) in tips {
        if hash == genesis_hash || msg.timestamp + MAX_TIP_AGE >= now {
            fresh.push(hash.clone());
        } else {
            stale.push(hash.clone());
        }
    }

    (fresh, stale)
}

/// Uniformly samples up to `amt` hashes from the combined strong and
/// weak tip sets, tagging each with whether it came from the weak set
pub fn select(
    strong_tips: &HashMap<Hash, Message>,
    weak_tips: &HashMap<Hash, Message>,
    amt: usize,
) -> HashMap<Hash, bool> {
    let mut rng = rand::thread_rng();

    strong_tips
        .keys()
        .map(|h| (h.clone(), false))
        .chain(weak_tips.keys().map(|h| (h.clone(), true)))
        .choose_multiple(&mut rng, amt)
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Payload;
    use std::collections::HashMap as Map;

    fn tip(hash: &str, timestamp: i64) -> Message {
        Message {
            node_id: "T1".to_string(),
            index: 0,
            parents: Map::new(),
            payload: Payload::Transaction {
                receiver: "T2".to_string(),
                amt: 1,
            },
            timestamp,
            nonce: 0,
            hash: hash.to_string(),
            signature: "s".to_string(),
        }
    }

    #[test]
    fn test_partition_stale_keeps_fresh() {
        let mut tips = HashMap::new();
        tips.insert("fresh".to_string(), tip("fresh", 1000));
        tips.insert("stale".to_string(), tip("stale", 0));

        let (fresh, stale) = partition_stale(&tips, 1000, "genesis");
        assert_eq!(fresh, vec!["fresh".to_string()]);
        assert_eq!(stale, vec!["stale".to_string()]);
    }

    #[test]
    fn test_partition_stale_protects_genesis() {
        let mut tips = HashMap::new();
        tips.insert("genesis".to_string(), tip("genesis", 0));

        let (fresh, stale) = partition_stale(&tips, 1_000_000, "genesis");
        assert_eq!(fresh, vec!["genesis".to_string()]);
        assert!(stale.is_empty());
    }

    #[test]
    fn test_select_respects_amount_bound() {
        let mut strong = HashMap::new();
        for i in 0..5 {
            strong.insert(format!("s{}", i), tip(&format!("s{}", i), 1000));
        }

        let selected = select(&strong, &HashMap::new(), 3);
        assert_eq!(selected.len(), 3);
        assert!(selected.values().all(|weak| !weak));
    }

    #[test]
    fn test_select_tags_weak_tips() {
        let mut weak = HashMap::new();
        weak.insert("w0".to_string(), tip("w0", 1000));

        let selected = select(&HashMap::new(), &weak, 1);
        assert_eq!(selected.get("w0"), Some(&true));
    }
}
