use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::auth::store::{
    CredentialStore, LoginField, NewUser, StoreError, StoreResult, User, UserProfile,
    normalize_login,
};

/// In-process [`CredentialStore`].
///
/// Per-record updates run under the map's entry lock, so the refresh-token
/// compare-and-set is atomic. Writes that touch uniqueness (create, email
/// change) are serialised by `unique_guard`.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: DashMap<Uuid, User>,
    unique_guard: Mutex<()>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete an identity outright.
    pub fn remove(&self, id: Uuid) -> bool {
        self.users.remove(&id).is_some()
    }

    fn taken(&self, field: LoginField, value: &str, except: Option<Uuid>) -> bool {
        self.users.iter().any(|entry| {
            let user = entry.value();
            Some(user.id) != except && field.value_of(user) == value
        })
    }
}

#[rocket::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let username = normalize_login(&user.username);
        let email = normalize_login(&user.email);

        let _guard = self.unique_guard.lock();
        if self.taken(LoginField::Username, &username, None) {
            return Err(StoreError::Duplicate("username"));
        }
        if self.taken(LoginField::Email, &email, None) {
            return Err(StoreError::Duplicate("email"));
        }

        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            username,
            email,
            full_name: user.full_name.trim().to_string(),
            avatar: user.avatar,
            cover_image: user.cover_image,
            password_hash: user.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<UserProfile>> {
        Ok(self.users.get(&id).map(|entry| entry.value().profile()))
    }

    async fn find_by_login(&self, identifier: &str) -> StoreResult<Option<User>> {
        let needle = normalize_login(identifier);
        let field = LoginField::of(&needle);
        Ok(self
            .users
            .iter()
            .find(|entry| field.value_of(entry.value()) == needle)
            .map(|entry| entry.value().clone()))
    }

    async fn replace_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool> {
        match self.users.get_mut(&id) {
            Some(mut entry) => {
                entry.refresh_token = token.map(str::to_string);
                entry.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn swap_refresh_token(&self, id: Uuid, expected: &str, new: &str) -> StoreResult<bool> {
        let Some(mut entry) = self.users.get_mut(&id) else {
            return Ok(false);
        };
        if entry.refresh_token.as_deref() != Some(expected) {
            return Ok(false);
        }
        entry.refresh_token = Some(new.to_string());
        entry.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        match self.users.get_mut(&id) {
            Some(mut entry) => {
                entry.password_hash = password_hash.to_string();
                entry.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> StoreResult<Option<UserProfile>> {
        let email = normalize_login(email);

        let _guard = self.unique_guard.lock();
        if self.taken(LoginField::Email, &email, Some(id)) {
            return Err(StoreError::Duplicate("email"));
        }

        Ok(self.users.get_mut(&id).map(|mut entry| {
            entry.full_name = full_name.trim().to_string();
            entry.email = email;
            entry.updated_at = Utc::now();
            entry.profile()
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            full_name: "Test User".into(),
            avatar: None,
            cover_image: None,
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn enforces_unique_username_and_email() {
        let store = MemoryCredentialStore::new();
        store
            .create(new_user("alice", "alice@example.com"))
            .await
            .expect("first insert");

        let err = store
            .create(new_user("ALICE", "other@example.com"))
            .await
            .expect_err("duplicate username");
        assert!(matches!(err, StoreError::Duplicate("username")));

        let err = store
            .create(new_user("bob", "Alice@Example.com"))
            .await
            .expect_err("duplicate email");
        assert!(matches!(err, StoreError::Duplicate("email")));
    }

    #[tokio::test]
    async fn finds_by_username_or_email() {
        let store = MemoryCredentialStore::new();
        let user = store
            .create(new_user("alice", "alice@example.com"))
            .await
            .expect("insert");

        let by_name = store.find_by_login("Alice").await.expect("lookup");
        let by_email = store
            .find_by_login("alice@example.com")
            .await
            .expect("lookup");
        assert_eq!(by_name.map(|u| u.id), Some(user.id));
        assert_eq!(by_email.map(|u| u.id), Some(user.id));
        assert!(store.find_by_login("carol").await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn swap_only_succeeds_against_current_value() {
        let store = MemoryCredentialStore::new();
        let user = store
            .create(new_user("alice", "alice@example.com"))
            .await
            .expect("insert");

        assert!(!store.swap_refresh_token(user.id, "t0", "t1").await.expect("swap"));
        assert!(store.replace_refresh_token(user.id, Some("t0")).await.expect("set"));
        assert!(store.swap_refresh_token(user.id, "t0", "t1").await.expect("swap"));
        assert!(!store.swap_refresh_token(user.id, "t0", "t2").await.expect("swap"));

        let stored = store.find_by_id(user.id).await.expect("find").expect("user");
        assert_eq!(stored.refresh_token.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn concurrent_swaps_have_a_single_winner() {
        let store = Arc::new(MemoryCredentialStore::new());
        let user = store
            .create(new_user("alice", "alice@example.com"))
            .await
            .expect("insert");
        store
            .replace_refresh_token(user.id, Some("original"))
            .await
            .expect("set");

        let mut handles = Vec::new();
        for attempt in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .swap_refresh_token(user.id, "original", &format!("next-{attempt}"))
                    .await
                    .expect("swap")
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.expect("join") {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn email_change_respects_uniqueness() {
        let store = MemoryCredentialStore::new();
        let alice = store
            .create(new_user("alice", "alice@example.com"))
            .await
            .expect("insert");
        store
            .create(new_user("bob", "bob@example.com"))
            .await
            .expect("insert");

        let err = store
            .update_account(alice.id, "Alice", "bob@example.com")
            .await
            .expect_err("taken");
        assert!(matches!(err, StoreError::Duplicate("email")));

        let profile = store
            .update_account(alice.id, "Alice L.", "alice@wonderland.test")
            .await
            .expect("update")
            .expect("present");
        assert_eq!(profile.email, "alice@wonderland.test");
        assert_eq!(profile.full_name, "Alice L.");
    }
}
