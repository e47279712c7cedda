use serde::{Deserialize, Serialize};

/// An ordered message thread shared by one or more agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub session_id: String,
    /// Agents attached to this conversation, in attach order, deduplicated.
    #[serde(default)]
    pub agent_ids: Vec<String>,
    /// Denormalized count of currently retained messages.
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub created_at: u64,
}

impl Conversation {
    pub fn placeholder(id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            agent_ids: Vec::new(),
            message_count: 0,
            created_at: 0,
        }
    }

    /// Attach an agent, keeping `agent_ids` an ordered set.
    pub fn attach_agent(&mut self, agent_id: &str) {
        if !self.agent_ids.iter().any(|a| a == agent_id) {
            self.agent_ids.push(agent_id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_agent_is_ordered_set() {
        let mut conv = Conversation::placeholder("c1", "s1");
        conv.attach_agent("a1");
        conv.attach_agent("a2");
        conv.attach_agent("a1");
        assert_eq!(conv.agent_ids, vec!["a1", "a2"]);
    }
}
