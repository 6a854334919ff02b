use anyhow::Result;

/// Index-aligned correspondence between Signal groups and Telegram chats.
/// The group at position `i` is bridged with the chat at position `i`.
#[derive(Debug, Clone)]
pub struct ChatMap {
    signal: Vec<String>,
    telegram: Vec<i64>,
}

impl ChatMap {
    pub fn new(signal: Vec<String>, telegram: Vec<i64>) -> Result<Self> {
        if signal.len() != telegram.len() {
            anyhow::bail!(
                "Chat lists differ in length: {} Signal groups vs {} Telegram chats",
                signal.len(),
                telegram.len()
            );
        }
        Ok(Self { signal, telegram })
    }

    /// Telegram chat bridged with the given Signal group.
    pub fn telegram_for(&self, group_id: &str) -> Option<i64> {
        let index = self.signal.iter().position(|g| g == group_id)?;
        self.telegram.get(index).copied()
    }

    /// Signal group bridged with the given Telegram chat.
    pub fn signal_for(&self, chat_id: i64) -> Option<&str> {
        let index = self.telegram.iter().position(|c| *c == chat_id)?;
        self.signal.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.signal.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> ChatMap {
        ChatMap::new(
            vec!["G1".to_string(), "G2".to_string(), "G3".to_string()],
            vec![-1001, -1002, -1003],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_is_index_aligned_both_ways() {
        let chats = map();
        for (group, chat) in [("G1", -1001), ("G2", -1002), ("G3", -1003)] {
            assert_eq!(chats.telegram_for(group), Some(chat));
            assert_eq!(chats.signal_for(chat), Some(group));
        }
    }

    #[test]
    fn test_unknown_ids_resolve_to_none() {
        let chats = map();
        assert_eq!(chats.telegram_for("G4"), None);
        assert_eq!(chats.telegram_for(""), None);
        assert_eq!(chats.signal_for(42), None);
    }

    #[test]
    fn test_first_match_wins_for_duplicates() {
        let chats = ChatMap::new(
            vec!["G1".to_string(), "G1".to_string()],
            vec![1, 2],
        )
        .unwrap();
        assert_eq!(chats.telegram_for("G1"), Some(1));
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let err = ChatMap::new(vec!["G1".to_string()], vec![1, 2]).unwrap_err();
        assert!(err.to_string().contains("differ in length"));
    }

    #[test]
    fn test_len() {
        assert_eq!(map().len(), 3);
    }
}
