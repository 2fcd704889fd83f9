use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{HardwareSet, Project, User};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("corrupt document: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of the conditional decrement that guards a check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reserve {
    /// The full amount came off the shelf; `available` is the new count.
    Reserved { available: i64 },
    /// Not enough on the shelf; nothing was changed.
    Insufficient { available: i64 },
    /// No such hardware set.
    Missing,
}

/// Result of a clamped restock. `added` is how many units actually landed
/// back in the pool, which is less than the requested amount when the
/// capacity ceiling clamped the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restocked {
    pub available: i64,
    pub added: i64,
}

/// Persistence contract for the allocation engine: document lookups plus the
/// atomic single-field updates the accounting rules depend on. Handed to the
/// engine and handlers by constructor injection so tests can swap in
/// [`MemoryStore`].
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_user(&self, username: &str) -> StoreResult<Option<User>>;
    /// Inserts only if the username is free; returns false on a duplicate.
    async fn insert_user(&self, user: &User) -> StoreResult<bool>;
    /// Atomically bumps the user's project counter, returning the new value.
    async fn next_project_seq(&self, username: &str) -> StoreResult<Option<u64>>;

    async fn get_hardware_set(&self, name: &str) -> StoreResult<Option<HardwareSet>>;
    async fn insert_hardware_set(&self, set: &HardwareSet) -> StoreResult<bool>;
    async fn list_hardware_sets(&self) -> StoreResult<Vec<HardwareSet>>;
    /// Conditional decrement of `available`: succeeds only when the full
    /// `amount` is on the shelf at the moment of the update.
    async fn reserve(&self, name: &str, amount: i64) -> StoreResult<Reserve>;
    /// Raises `available` by `amount`, clamped at `capacity`.
    async fn restock(&self, name: &str, amount: i64) -> StoreResult<Option<Restocked>>;

    async fn get_project(&self, id: &str) -> StoreResult<Option<Project>>;
    async fn insert_project(&self, project: &Project) -> StoreResult<bool>;
    async fn list_projects(&self) -> StoreResult<Vec<Project>>;
    /// Atomic increment of one allocation entry, floored at zero. Returns
    /// the stored value after the update, or None for an unknown project.
    async fn adjust_allocation(
        &self,
        project_id: &str,
        hwset: &str,
        delta: i64,
    ) -> StoreResult<Option<i64>>;
    /// Adds or removes a member; returns the post-update membership status,
    /// or None for an unknown project.
    async fn set_membership(
        &self,
        project_id: &str,
        username: &str,
        join: bool,
    ) -> StoreResult<Option<bool>>;

    async fn put_token(&self, token: &str, username: &str, ttl_secs: u64) -> StoreResult<()>;
    async fn get_token(&self, token: &str) -> StoreResult<Option<String>>;
    async fn delete_token(&self, token: &str) -> StoreResult<bool>;
}

/// In-memory store: one mutex over plain maps. Every trait method is a
/// single critical section, so each call is atomic the same way a single
/// Redis command is. Used by the test suites and handy for local runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    users: HashMap<String, User>,
    hardware: HashMap<String, HardwareSet>,
    projects: HashMap<String, Project>,
    tokens: HashMap<String, (String, Instant)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // Lock poisoning only follows a panic elsewhere; propagating it
        // here would just cascade the same panic.
        self.inner.lock().expect("memory store mutex poisoned")
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.lock().users.get(username).cloned())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<bool> {
        let mut inner = self.lock();
        if inner.users.contains_key(&user.username) {
            return Ok(false);
        }
        inner.users.insert(user.username.clone(), user.clone());
        Ok(true)
    }

    async fn next_project_seq(&self, username: &str) -> StoreResult<Option<u64>> {
        let mut inner = self.lock();
        Ok(inner.users.get_mut(username).map(|user| {
            user.project_seq += 1;
            user.project_seq
        }))
    }

    async fn get_hardware_set(&self, name: &str) -> StoreResult<Option<HardwareSet>> {
        Ok(self.lock().hardware.get(name).cloned())
    }

    async fn insert_hardware_set(&self, set: &HardwareSet) -> StoreResult<bool> {
        let mut inner = self.lock();
        if inner.hardware.contains_key(&set.name) {
            return Ok(false);
        }
        inner.hardware.insert(set.name.clone(), set.clone());
        Ok(true)
    }

    async fn list_hardware_sets(&self) -> StoreResult<Vec<HardwareSet>> {
        Ok(self.lock().hardware.values().cloned().collect())
    }

    async fn reserve(&self, name: &str, amount: i64) -> StoreResult<Reserve> {
        let mut inner = self.lock();
        let Some(set) = inner.hardware.get_mut(name) else {
            return Ok(Reserve::Missing);
        };
        if set.available < amount {
            return Ok(Reserve::Insufficient {
                available: set.available,
            });
        }
        set.available -= amount;
        Ok(Reserve::Reserved {
            available: set.available,
        })
    }

    async fn restock(&self, name: &str, amount: i64) -> StoreResult<Option<Restocked>> {
        let mut inner = self.lock();
        Ok(inner.hardware.get_mut(name).map(|set| {
            let before = set.available;
            set.available = (set.available + amount).min(set.capacity);
            Restocked {
                available: set.available,
                added: set.available - before,
            }
        }))
    }

    async fn get_project(&self, id: &str) -> StoreResult<Option<Project>> {
        Ok(self.lock().projects.get(id).cloned())
    }

    async fn insert_project(&self, project: &Project) -> StoreResult<bool> {
        let mut inner = self.lock();
        if inner.projects.contains_key(&project.id) {
            return Ok(false);
        }
        inner.projects.insert(project.id.clone(), project.clone());
        Ok(true)
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        Ok(self.lock().projects.values().cloned().collect())
    }

    async fn adjust_allocation(
        &self,
        project_id: &str,
        hwset: &str,
        delta: i64,
    ) -> StoreResult<Option<i64>> {
        let mut inner = self.lock();
        Ok(inner.projects.get_mut(project_id).map(|project| {
            let entry = project.hardware.entry(hwset.to_string()).or_insert(0);
            *entry = (*entry + delta).max(0);
            *entry
        }))
    }

    async fn set_membership(
        &self,
        project_id: &str,
        username: &str,
        join: bool,
    ) -> StoreResult<Option<bool>> {
        let mut inner = self.lock();
        Ok(inner.projects.get_mut(project_id).map(|project| {
            if join {
                project.members.insert(username.to_string());
            } else {
                project.members.remove(username);
            }
            join
        }))
    }

    async fn put_token(&self, token: &str, username: &str, ttl_secs: u64) -> StoreResult<()> {
        let expires = Instant::now() + Duration::from_secs(ttl_secs);
        self.lock()
            .tokens
            .insert(token.to_string(), (username.to_string(), expires));
        Ok(())
    }

    async fn get_token(&self, token: &str) -> StoreResult<Option<String>> {
        let mut inner = self.lock();
        match inner.tokens.get(token) {
            Some((username, expires)) if *expires > Instant::now() => Ok(Some(username.clone())),
            Some(_) => {
                // Expired; drop it the way Redis would have
                inner.tokens.remove(token);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete_token(&self, token: &str) -> StoreResult<bool> {
        Ok(self.lock().tokens.remove(token).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User {
            username: name.to_string(),
            password_hash: "$2b$04$test".to_string(),
            project_seq: 0,
        }
    }

    #[tokio::test]
    async fn duplicate_user_insert_is_rejected() {
        let store = MemoryStore::new();
        assert!(store.insert_user(&user("bob")).await.unwrap());
        assert!(!store.insert_user(&user("bob")).await.unwrap());
    }

    #[tokio::test]
    async fn project_seq_increments_per_user() {
        let store = MemoryStore::new();
        store.insert_user(&user("alice")).await.unwrap();
        assert_eq!(store.next_project_seq("alice").await.unwrap(), Some(1));
        assert_eq!(store.next_project_seq("alice").await.unwrap(), Some(2));
        assert_eq!(store.next_project_seq("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn reserve_is_all_or_nothing() {
        let store = MemoryStore::new();
        store
            .insert_hardware_set(&HardwareSet {
                name: "HWSet1".to_string(),
                available: 5,
                capacity: 10,
            })
            .await
            .unwrap();

        assert_eq!(
            store.reserve("HWSet1", 3).await.unwrap(),
            Reserve::Reserved { available: 2 }
        );
        assert_eq!(
            store.reserve("HWSet1", 3).await.unwrap(),
            Reserve::Insufficient { available: 2 }
        );
        assert_eq!(store.reserve("HWSet9", 1).await.unwrap(), Reserve::Missing);
    }

    #[tokio::test]
    async fn restock_reports_clamped_added_amount() {
        let store = MemoryStore::new();
        store
            .insert_hardware_set(&HardwareSet {
                name: "HWSet1".to_string(),
                available: 8,
                capacity: 10,
            })
            .await
            .unwrap();

        let restocked = store.restock("HWSet1", 5).await.unwrap().unwrap();
        assert_eq!(restocked.available, 10);
        assert_eq!(restocked.added, 2);
    }

    #[tokio::test]
    async fn allocation_adjustment_floors_at_zero() {
        let store = MemoryStore::new();
        store
            .insert_project(&Project {
                id: "alice_1".to_string(),
                name: "p".to_string(),
                description: String::new(),
                members: Default::default(),
                hardware: Default::default(),
            })
            .await
            .unwrap();

        assert_eq!(
            store.adjust_allocation("alice_1", "HWSet1", 4).await.unwrap(),
            Some(4)
        );
        assert_eq!(
            store
                .adjust_allocation("alice_1", "HWSet1", -10)
                .await
                .unwrap(),
            Some(0)
        );
    }

    #[tokio::test]
    async fn expired_tokens_are_gone() {
        let store = MemoryStore::new();
        store.put_token("t1", "bob", 0).await.unwrap();
        assert_eq!(store.get_token("t1").await.unwrap(), None);

        store.put_token("t2", "bob", 3600).await.unwrap();
        assert_eq!(store.get_token("t2").await.unwrap(), Some("bob".into()));
        assert!(store.delete_token("t2").await.unwrap());
        assert_eq!(store.get_token("t2").await.unwrap(), None);
    }
}
