//! Tool-call identifier resolution for AG-UI runs.
//!
//! Internal tool events carry an optional correlation key. Wire events need a
//! stable `toolCallId` shared by a call's start and its result. Keyed events
//! resolve through a key map; unkeyed events fall back to a per-tool-name
//! FIFO of open calls.

use agentgate_protocol::ToolCallId;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Default)]
pub struct ToolCallCorrelator {
    allocated: u64,
    by_key: HashMap<String, ToolCallId>,
    open_by_name: HashMap<String, VecDeque<ToolCallId>>,
}

/// Outcome of resolving a tool start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartResolution {
    pub id: ToolCallId,
    /// True when the id was allocated by this call; a repeated start for a
    /// known key reuses its id.
    pub is_new: bool,
}

impl ToolCallCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve_start(&mut self, tool_name: &str, key: Option<&str>) -> StartResolution {
        let key = key.filter(|key| !key.is_empty());
        if let Some(existing) = key.and_then(|key| self.by_key.get(key)) {
            return StartResolution {
                id: existing.clone(),
                is_new: false,
            };
        }
        let id = self.allocate();
        if let Some(key) = key {
            self.by_key.insert(key.to_owned(), id.clone());
        }
        self.open_by_name
            .entry(tool_name.to_owned())
            .or_default()
            .push_back(id.clone());
        StartResolution { id, is_new: true }
    }

    /// Resolve the id a tool end pairs with. Ends that match no open call
    /// get a fresh id.
    pub fn resolve_end(&mut self, tool_name: &str, key: Option<&str>) -> ToolCallId {
        if let Some(id) = key
            .filter(|key| !key.is_empty())
            .and_then(|key| self.by_key.remove(key))
        {
            if let Some(open) = self.open_by_name.get_mut(tool_name) {
                open.retain(|candidate| candidate != &id);
            }
            return id;
        }
        if let Some(id) = self
            .open_by_name
            .get_mut(tool_name)
            .and_then(VecDeque::pop_front)
        {
            return id;
        }
        self.allocate()
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    fn allocate(&mut self) -> ToolCallId {
        self.allocated += 1;
        ToolCallId::numbered(self.allocated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_keyed_calls_pair_correctly() {
        let mut correlator = ToolCallCorrelator::new();
        let a = correlator.resolve_start("relay_set", Some("call_a"));
        let b = correlator.resolve_start("relay_set", Some("call_b"));
        assert!(a.is_new && b.is_new);
        assert_ne!(a.id, b.id);

        assert_eq!(correlator.resolve_end("relay_set", Some("call_b")), b.id);
        assert_eq!(correlator.resolve_end("relay_set", Some("call_a")), a.id);
    }

    #[test]
    fn unkeyed_calls_resolve_first_in_first_out() {
        let mut correlator = ToolCallCorrelator::new();
        let first = correlator.resolve_start("api_soil", None).id;
        let second = correlator.resolve_start("api_soil", None).id;
        assert_eq!(correlator.resolve_end("api_soil", None), first);
        assert_eq!(correlator.resolve_end("api_soil", None), second);
    }

    #[test]
    fn repeated_keyed_start_reuses_the_id() {
        let mut correlator = ToolCallCorrelator::new();
        let first = correlator.resolve_start("t", Some("k"));
        let again = correlator.resolve_start("t", Some("k"));
        assert_eq!(first.id, again.id);
        assert!(!again.is_new);
        assert_eq!(correlator.allocated(), 1);
    }

    #[test]
    fn keyed_end_removes_the_call_from_the_name_queue() {
        let mut correlator = ToolCallCorrelator::new();
        let keyed = correlator.resolve_start("t", Some("k")).id;
        let unkeyed = correlator.resolve_start("t", None).id;
        assert_eq!(correlator.resolve_end("t", Some("k")), keyed);
        assert_eq!(correlator.resolve_end("t", None), unkeyed);
    }

    #[test]
    fn unmatched_end_gets_a_fresh_id() {
        let mut correlator = ToolCallCorrelator::new();
        let id = correlator.resolve_end("t", Some("unknown"));
        assert!(id.as_str().starts_with("tool_1_"));
    }

    #[test]
    fn ids_follow_the_numbered_format() {
        let mut correlator = ToolCallCorrelator::new();
        let id = correlator.resolve_start("t", None).id;
        let parts: Vec<&str> = id.as_str().split('_').collect();
        assert_eq!(parts[..2], ["tool", "1"]);
        assert_eq!(parts[2].len(), 8);
    }
}
