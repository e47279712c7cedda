use serde::{Deserialize, Serialize};

/// What kind of user awareness an attention item asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionKind {
    /// Agent is waiting on an approval decision.
    Approval,
    /// Agent asked the user a question.
    Question,
    /// A task or run finished.
    Completion,
    /// Something went wrong; the only channel user-visible failures take.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttentionPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl AttentionPriority {
    /// Ordering rank, lower is more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

/// A notification requiring user awareness, scoped to an agent within a
/// session.
///
/// `read` and `dismissed` are independent: dismissing hides an item from
/// unread counts and displays but leaves the read flag as-is so the audit
/// trail stays truthful.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attention {
    pub id: String,
    pub agent_id: String,
    pub session_id: String,
    pub kind: AttentionKind,
    pub priority: AttentionPriority,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub dismissed: bool,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub expires_at: Option<u64>,
}

impl Attention {
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }

    /// Counts toward unread accounting.
    pub fn is_unread(&self) -> bool {
        !self.read && !self.dismissed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attention(priority: AttentionPriority) -> Attention {
        Attention {
            id: "att1".into(),
            agent_id: "ag1".into(),
            session_id: "s1".into(),
            kind: AttentionKind::Question,
            priority,
            title: String::new(),
            read: false,
            dismissed: false,
            created_at: 100,
            expires_at: None,
        }
    }

    #[test]
    fn test_priority_rank_order() {
        assert!(AttentionPriority::Critical.rank() < AttentionPriority::High.rank());
        assert!(AttentionPriority::High.rank() < AttentionPriority::Medium.rank());
        assert!(AttentionPriority::Medium.rank() < AttentionPriority::Low.rank());
    }

    #[test]
    fn test_dismissed_is_not_unread() {
        let mut att = attention(AttentionPriority::High);
        assert!(att.is_unread());
        att.dismissed = true;
        assert!(!att.is_unread());
        // read flag untouched by dismissal
        assert!(!att.read);
    }

    #[test]
    fn test_expiry() {
        let mut att = attention(AttentionPriority::Low);
        att.expires_at = Some(200);
        assert!(!att.is_expired_at(199));
        assert!(att.is_expired_at(200));
    }

    #[test]
    fn test_wire_shape() {
        let att: Attention = serde_json::from_str(
            r#"{"id":"a1","agentId":"ag1","sessionId":"s1","kind":"approval","priority":"critical","title":"Run tests?","createdAt":5}"#,
        )
        .unwrap();
        assert_eq!(att.kind, AttentionKind::Approval);
        assert_eq!(att.priority, AttentionPriority::Critical);
        assert!(att.is_unread());
    }
}
