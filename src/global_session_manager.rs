use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use crate::models::user_session::UserSession;

#[derive(Clone, Default)]
pub struct GlobalSessionManager {
    sessions: Arc<Mutex<HashMap<String, UserSession>>>,
}

impl GlobalSessionManager {
    pub fn new() -> Self {
        GlobalSessionManager {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // Recovers the map if a previous holder panicked
    fn lock(&self) -> MutexGuard<'_, HashMap<String, UserSession>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts or updates a session
    pub fn insert(&self, session_id: String, session: UserSession) {
        self.lock().insert(session_id, session);
    }

    /// Retrieves a session if it exists
    pub fn get(&self, session_id: &str) -> Option<UserSession> {
        self.lock().get(session_id).cloned()
    }

    /// Applies `f` to the stored session in place
    pub fn update<R>(&self, session_id: &str, f: impl FnOnce(&mut UserSession) -> R) -> Option<R> {
        self.lock().get_mut(session_id).map(f)
    }

    pub fn remove(&self, session_id: &str) -> Option<UserSession> {
        self.lock().remove(session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Message;

    #[test]
    fn test_update_is_visible_through_clones() {
        let manager = GlobalSessionManager::new();
        let handle = manager.clone();
        manager.insert("s1".to_string(), UserSession::default());

        let pushed = handle.update("s1", |s| {
            s.push(Message::user("hello"));
            s.history.len()
        });
        assert_eq!(pushed, Some(1));
        assert_eq!(manager.get("s1").unwrap().history.len(), 1);
    }

    #[test]
    fn test_update_missing_session() {
        let manager = GlobalSessionManager::new();
        assert!(manager.update("nope", |s| s.history.len()).is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_remove() {
        let manager = GlobalSessionManager::new();
        manager.insert("s1".to_string(), UserSession::default());
        assert!(manager.contains("s1"));
        assert!(manager.remove("s1").is_some());
        assert!(!manager.contains("s1"));
    }
}
