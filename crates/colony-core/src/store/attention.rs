//! Attention item ledger: ranking and unread accounting.
//!
//! Unread counts are maintained incrementally on every mutating op so reads
//! are O(1); a full recount exists only for tests to check the cache against.
//! Dismissal removes an item from unread counts and displays in the same
//! mutation but never forces the `read` flag, so the audit trail keeps what
//! the user actually looked at.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::MAX_ATTENTION_ITEMS_PER_SESSION;
use crate::models::Attention;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Default)]
pub struct AttentionLedger {
    items: HashMap<String, Attention>,
    /// Per-session insertion index ordered by created_at ascending, used for
    /// oldest-first eviction.
    order_by_session: HashMap<String, Vec<(u64, String)>>,
    unread_by_session: HashMap<String, usize>,
    unread_by_agent: HashMap<String, usize>,
}

impl AttentionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an attention item by id. Returns true when the item
    /// is new. Replaying the same event leaves counts untouched.
    pub fn upsert(&mut self, attention: Attention) -> bool {
        let id = attention.id.clone();
        let is_new = !self.items.contains_key(&id);

        if let Some(existing) = self.items.get(&id) {
            let was_unread = existing.is_unread();
            let session_id = existing.session_id.clone();
            let agent_id = existing.agent_id.clone();
            let old_created_at = existing.created_at;

            if was_unread {
                self.decrement_unread(&session_id, &agent_id);
            }
            if let Some(order) = self.order_by_session.get_mut(&session_id) {
                order.retain(|(ts, oid)| !(*ts == old_created_at && oid == &id));
            }
            self.items.remove(&id);
        }

        let session_id = attention.session_id.clone();
        let agent_id = attention.agent_id.clone();
        let created_at = attention.created_at;
        let unread = attention.is_unread();

        self.items.insert(id.clone(), attention);
        let order = self.order_by_session.entry(session_id.clone()).or_default();
        let pos = order.partition_point(|(ts, _)| *ts <= created_at);
        order.insert(pos, (created_at, id));
        if unread {
            self.increment_unread(&session_id, &agent_id);
        }

        self.evict_over_cap(&session_id);
        is_new
    }

    /// Mark an item read. Idempotent; dismissed items can still be marked
    /// read without affecting counts twice.
    pub fn mark_read(&mut self, attention_id: &str) -> bool {
        let Some(item) = self.items.get_mut(attention_id) else {
            return false;
        };
        if item.read {
            return false;
        }
        let was_unread = item.is_unread();
        item.read = true;
        if was_unread {
            let (session_id, agent_id) = (item.session_id.clone(), item.agent_id.clone());
            self.decrement_unread(&session_id, &agent_id);
        }
        true
    }

    /// Dismiss an item: excluded from unread counts and displays immediately
    /// and atomically, retained for audit, `read` flag untouched.
    pub fn dismiss(&mut self, attention_id: &str) -> bool {
        let Some(item) = self.items.get_mut(attention_id) else {
            return false;
        };
        if item.dismissed {
            return false;
        }
        let was_unread = item.is_unread();
        item.dismissed = true;
        if was_unread {
            let (session_id, agent_id) = (item.session_id.clone(), item.agent_id.clone());
            self.decrement_unread(&session_id, &agent_id);
        }
        true
    }

    /// Dismiss every non-dismissed item for an agent. Returns how many items
    /// were dismissed.
    pub fn dismiss_all_for_agent(&mut self, session_id: &str, agent_id: &str) -> usize {
        let ids: Vec<String> = self
            .items
            .values()
            .filter(|a| a.session_id == session_id && a.agent_id == agent_id && !a.dismissed)
            .map(|a| a.id.clone())
            .collect();
        ids.iter().filter(|id| self.dismiss(id)).count()
    }

    /// Mark every unread item of a session read, e.g. when the user returns
    /// focus after being away. Returns how many items changed.
    pub fn mark_all_read_for_session(&mut self, session_id: &str) -> usize {
        let ids: Vec<String> = self
            .items
            .values()
            .filter(|a| a.session_id == session_id && !a.read)
            .map(|a| a.id.clone())
            .collect();
        ids.iter().filter(|id| self.mark_read(id)).count()
    }

    /// The single most urgent non-dismissed, non-expired item for an agent:
    /// critical before high before medium before low, newest first within a
    /// priority, id as the final tie-break. Deterministic regardless of
    /// insertion order.
    pub fn highest_priority(&self, session_id: &str, agent_id: &str) -> Option<&Attention> {
        let now = now_secs();
        self.items
            .values()
            .filter(|a| {
                a.session_id == session_id
                    && a.agent_id == agent_id
                    && !a.dismissed
                    && !a.is_expired_at(now)
            })
            .min_by(|a, b| {
                a.priority
                    .rank()
                    .cmp(&b.priority.rank())
                    .then(b.created_at.cmp(&a.created_at))
                    .then(b.id.cmp(&a.id))
            })
    }

    pub fn unread_count(&self, session_id: &str) -> usize {
        self.unread_by_session.get(session_id).copied().unwrap_or(0)
    }

    pub fn unread_count_for_agent(&self, agent_id: &str) -> usize {
        self.unread_by_agent.get(agent_id).copied().unwrap_or(0)
    }

    pub fn get(&self, attention_id: &str) -> Option<&Attention> {
        self.items.get(attention_id)
    }

    /// Items for a session, newest first, dismissed included.
    pub fn items_for_session(&self, session_id: &str) -> Vec<&Attention> {
        let mut items: Vec<_> = self
            .items
            .values()
            .filter(|a| a.session_id == session_id)
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        items
    }

    /// Full scan of {not read, not dismissed} for a session. Exists to
    /// verify the incremental cache in tests.
    pub fn recount(&self, session_id: &str) -> usize {
        self.items
            .values()
            .filter(|a| a.session_id == session_id && a.is_unread())
            .count()
    }

    fn increment_unread(&mut self, session_id: &str, agent_id: &str) {
        *self
            .unread_by_session
            .entry(session_id.to_string())
            .or_insert(0) += 1;
        *self
            .unread_by_agent
            .entry(agent_id.to_string())
            .or_insert(0) += 1;
    }

    fn decrement_unread(&mut self, session_id: &str, agent_id: &str) {
        if let Some(count) = self.unread_by_session.get_mut(session_id) {
            *count = count.saturating_sub(1);
        }
        if let Some(count) = self.unread_by_agent.get_mut(agent_id) {
            *count = count.saturating_sub(1);
        }
    }

    fn evict_over_cap(&mut self, session_id: &str) {
        loop {
            let oldest_id = {
                let Some(order) = self.order_by_session.get_mut(session_id) else {
                    return;
                };
                if order.len() <= MAX_ATTENTION_ITEMS_PER_SESSION {
                    return;
                }
                order.remove(0).1
            };
            if let Some(evicted) = self.items.remove(&oldest_id) {
                if evicted.is_unread() {
                    let (session_id, agent_id) =
                        (evicted.session_id.clone(), evicted.agent_id.clone());
                    self.decrement_unread(&session_id, &agent_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttentionKind, AttentionPriority};

    fn attention(id: &str, agent: &str, priority: AttentionPriority, created_at: u64) -> Attention {
        Attention {
            id: id.to_string(),
            agent_id: agent.to_string(),
            session_id: "s1".to_string(),
            kind: AttentionKind::Question,
            priority,
            title: String::new(),
            read: false,
            dismissed: false,
            created_at,
            expires_at: None,
        }
    }

    #[test]
    fn test_upsert_idempotent_counts() {
        let mut ledger = AttentionLedger::new();
        assert!(ledger.upsert(attention("a1", "ag1", AttentionPriority::High, 10)));
        assert!(!ledger.upsert(attention("a1", "ag1", AttentionPriority::High, 10)));
        assert_eq!(ledger.unread_count("s1"), 1);
        assert_eq!(ledger.recount("s1"), 1);
    }

    #[test]
    fn test_critical_wins_regardless_of_insertion_order() {
        let orders: [[&str; 3]; 3] = [
            ["a-high", "a-critical", "a-low"],
            ["a-critical", "a-low", "a-high"],
            ["a-low", "a-high", "a-critical"],
        ];
        for order in orders {
            let mut ledger = AttentionLedger::new();
            for (i, id) in order.iter().enumerate() {
                let priority = match *id {
                    "a-critical" => AttentionPriority::Critical,
                    "a-high" => AttentionPriority::High,
                    _ => AttentionPriority::Low,
                };
                ledger.upsert(attention(id, "ag1", priority, i as u64));
            }
            let top = ledger.highest_priority("s1", "ag1").unwrap();
            assert_eq!(top.id, "a-critical");
        }
    }

    #[test]
    fn test_ties_break_newest_first() {
        let mut ledger = AttentionLedger::new();
        ledger.upsert(attention("a1", "ag1", AttentionPriority::High, 10));
        ledger.upsert(attention("a2", "ag1", AttentionPriority::High, 20));
        assert_eq!(ledger.highest_priority("s1", "ag1").unwrap().id, "a2");
    }

    #[test]
    fn test_dismissed_and_expired_excluded_from_ranking() {
        let mut ledger = AttentionLedger::new();
        ledger.upsert(attention("a1", "ag1", AttentionPriority::Critical, 10));
        let mut expired = attention("a2", "ag1", AttentionPriority::Critical, 20);
        expired.expires_at = Some(1); // long past
        ledger.upsert(expired);
        ledger.upsert(attention("a3", "ag1", AttentionPriority::Low, 30));

        ledger.dismiss("a1");
        assert_eq!(ledger.highest_priority("s1", "ag1").unwrap().id, "a3");
    }

    #[test]
    fn test_ranking_scoped_to_agent() {
        let mut ledger = AttentionLedger::new();
        ledger.upsert(attention("a1", "ag1", AttentionPriority::High, 10));
        ledger.upsert(attention("a2", "ag2", AttentionPriority::Critical, 20));
        assert_eq!(ledger.highest_priority("s1", "ag1").unwrap().id, "a1");
        assert!(ledger.highest_priority("s1", "ag9").is_none());
    }

    #[test]
    fn test_mark_read_and_dismiss_update_counts_once() {
        let mut ledger = AttentionLedger::new();
        ledger.upsert(attention("a1", "ag1", AttentionPriority::High, 10));
        ledger.upsert(attention("a2", "ag1", AttentionPriority::Low, 20));
        assert_eq!(ledger.unread_count("s1"), 2);
        assert_eq!(ledger.unread_count_for_agent("ag1"), 2);

        assert!(ledger.mark_read("a1"));
        assert!(!ledger.mark_read("a1"));
        assert_eq!(ledger.unread_count("s1"), 1);

        assert!(ledger.dismiss("a2"));
        assert!(!ledger.dismiss("a2"));
        assert_eq!(ledger.unread_count("s1"), 0);
        assert_eq!(ledger.unread_count_for_agent("ag1"), 0);
        assert_eq!(ledger.recount("s1"), 0);

        // dismissing an already-read item must not double-decrement
        ledger.upsert(attention("a3", "ag1", AttentionPriority::Low, 30));
        ledger.mark_read("a3");
        ledger.dismiss("a3");
        assert_eq!(ledger.unread_count("s1"), 0);
    }

    #[test]
    fn test_dismiss_all_for_agent_leaves_read_flags() {
        let mut ledger = AttentionLedger::new();
        ledger.upsert(attention("a1", "ag1", AttentionPriority::High, 10));
        ledger.upsert(attention("a2", "ag1", AttentionPriority::Medium, 20));
        ledger.upsert(attention("a3", "ag1", AttentionPriority::Low, 30));
        ledger.upsert(attention("b1", "ag2", AttentionPriority::Low, 40));

        assert_eq!(ledger.dismiss_all_for_agent("s1", "ag1"), 3);
        assert_eq!(ledger.unread_count_for_agent("ag1"), 0);
        assert_eq!(ledger.unread_count("s1"), 1); // ag2's item untouched
        for id in ["a1", "a2", "a3"] {
            let item = ledger.get(id).unwrap();
            assert!(item.dismissed);
            assert!(!item.read);
        }
    }

    #[test]
    fn test_cache_matches_recount_after_mixed_ops() {
        let mut ledger = AttentionLedger::new();
        for i in 0..20 {
            let priority = match i % 4 {
                0 => AttentionPriority::Critical,
                1 => AttentionPriority::High,
                2 => AttentionPriority::Medium,
                _ => AttentionPriority::Low,
            };
            ledger.upsert(attention(&format!("a{i}"), "ag1", priority, i));
        }
        ledger.mark_read("a3");
        ledger.dismiss("a4");
        ledger.dismiss("a4");
        ledger.mark_read("a4");
        ledger.upsert(attention("a5", "ag1", AttentionPriority::High, 5));
        ledger.dismiss_all_for_agent("s1", "ag2");

        assert_eq!(ledger.unread_count("s1"), ledger.recount("s1"));
    }

    #[test]
    fn test_eviction_oldest_first_keeps_counts_consistent() {
        let mut ledger = AttentionLedger::new();
        for i in 0..(MAX_ATTENTION_ITEMS_PER_SESSION + 5) {
            ledger.upsert(attention(
                &format!("a{i}"),
                "ag1",
                AttentionPriority::Low,
                i as u64,
            ));
        }
        assert!(ledger.get("a0").is_none());
        assert!(ledger.get("a5").is_some());
        assert_eq!(
            ledger.items_for_session("s1").len(),
            MAX_ATTENTION_ITEMS_PER_SESSION
        );
        assert_eq!(ledger.unread_count("s1"), ledger.recount("s1"));
    }

    #[test]
    fn test_mark_all_read_for_session() {
        let mut ledger = AttentionLedger::new();
        ledger.upsert(attention("a1", "ag1", AttentionPriority::High, 1));
        ledger.upsert(attention("a2", "ag2", AttentionPriority::Low, 2));
        assert_eq!(ledger.mark_all_read_for_session("s1"), 2);
        assert_eq!(ledger.unread_count("s1"), 0);
        assert_eq!(ledger.mark_all_read_for_session("s1"), 0);
    }
}
