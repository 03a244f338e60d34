//! Node picking strategies.
//!
//! A picker reduces the candidate list produced by a
//! [`ShardSelector`](crate::ShardSelector) to a single node.

use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

use rand::Rng;

use crate::shard::ServiceNode;

/// Strategy for choosing one node among candidates.
pub trait NodePicker: Send + Sync + fmt::Debug {
    /// Picks one node, or `None` when `candidates` is empty.
    fn pick(&self, candidates: &[ServiceNode]) -> Option<ServiceNode>;
}

/// Cycles through candidates using a shared atomic counter.
///
/// Concurrent callers each advance the counter exactly once, so no pick is
/// lost; the rotation is approximate when the candidate list changes between
/// calls.
#[derive(Debug, Default)]
pub struct RoundRobinPicker {
    next: AtomicUsize,
}

impl RoundRobinPicker {
    /// Creates a round-robin picker starting at the first candidate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodePicker for RoundRobinPicker {
    fn pick(&self, candidates: &[ServiceNode]) -> Option<ServiceNode> {
        if candidates.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % candidates.len();
        candidates.get(index).cloned()
    }
}

/// Picks a uniformly random candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPicker;

impl NodePicker for RandomPicker {
    fn pick(&self, candidates: &[ServiceNode]) -> Option<ServiceNode> {
        if candidates.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..candidates.len());
        candidates.get(index).cloned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::{collections::HashSet, sync::Arc, thread};

    use super::*;
    use crate::shard::ShardInfo;

    fn candidates(count: u16) -> Vec<ServiceNode> {
        (0..count).map(|i| ServiceNode::new("host", 8000 + i, ShardInfo::new("prod"))).collect()
    }

    #[test]
    fn test_round_robin_cycles() {
        let picker = RoundRobinPicker::new();
        let nodes = candidates(3);

        let ports: Vec<_> = (0..6).map(|_| picker.pick(&nodes).unwrap().port()).collect();
        assert_eq!(ports, vec![8000, 8001, 8002, 8000, 8001, 8002]);
    }

    #[test]
    fn test_round_robin_empty() {
        let picker = RoundRobinPicker::new();
        assert!(picker.pick(&[]).is_none());
    }

    #[test]
    fn test_round_robin_shrinking_list_stays_in_bounds() {
        let picker = RoundRobinPicker::new();
        let nodes = candidates(5);
        for _ in 0..4 {
            picker.pick(&nodes);
        }
        assert!(picker.pick(&candidates(2)).is_some());
    }

    #[test]
    fn test_round_robin_concurrent_picks_are_not_lost() {
        let picker = Arc::new(RoundRobinPicker::new());
        let nodes = Arc::new(candidates(4));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let picker = Arc::clone(&picker);
                let nodes = Arc::clone(&nodes);
                thread::spawn(move || {
                    for _ in 0..100 {
                        picker.pick(&nodes).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(picker.next.load(Ordering::Relaxed), 800);
    }

    #[test]
    fn test_random_picks_from_candidates() {
        let picker = RandomPicker;
        let nodes = candidates(3);
        let ports: HashSet<_> = nodes.iter().map(ServiceNode::port).collect();

        for _ in 0..50 {
            let picked = picker.pick(&nodes).unwrap();
            assert!(ports.contains(&picked.port()));
        }
    }

    #[test]
    fn test_random_empty() {
        assert!(RandomPicker.pick(&[]).is_none());
    }

    #[test]
    fn test_single_candidate() {
        let nodes = candidates(1);
        assert_eq!(RandomPicker.pick(&nodes).unwrap().port(), 8000);
        assert_eq!(RoundRobinPicker::new().pick(&nodes).unwrap().port(), 8000);
    }
}
