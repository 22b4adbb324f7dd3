mod error;
mod password;
mod types;

pub use error::StoreError;
pub use types::{NewUser, Subscription, User, UserUpdate};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

/// Durable, unique-keyed storage of user credentials and profile metadata.
///
/// The in-memory index (keyed by normalized email) is the source of truth
/// while the process is alive; the backing file is rewritten in full on
/// every mutation. Mutations hold the write lock across the whole
/// check-mutate-persist sequence and commit to the index only after the
/// file write succeeds, so a failed write never leaves a phantom record.
pub struct UserStore {
    path: PathBuf,
    users: RwLock<HashMap<String, User>>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UserStore {
    /// Open the store at `path`, loading any existing records.
    ///
    /// A missing, unreadable or unparseable file starts an empty store so
    /// first-run bootstrap never fails.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let users = Self::load(&path).await;
        Self {
            path,
            users: RwLock::new(users),
        }
    }

    async fn load(path: &Path) -> HashMap<String, User> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read user records; starting empty");
                return HashMap::new();
            }
        };
        match serde_json::from_str::<Vec<User>>(&raw) {
            Ok(records) => records
                .into_iter()
                .map(|u| (normalize_email(&u.email), u))
                .collect(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse user records; starting empty");
                HashMap::new()
            }
        }
    }

    /// Write the full record set as an indented JSON array, via a temp file
    /// and rename so a torn write cannot clobber the previous state.
    async fn persist(&self, users: &HashMap<String, User>) -> Result<(), StoreError> {
        let mut records: Vec<&User> = users.values().collect();
        records.sort_by_key(|u| u.created_at);

        let payload =
            serde_json::to_vec_pretty(&records).map_err(|e| StoreError::Persistence {
                message: format!("failed to encode user records: {e}"),
            })?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Persistence {
                    message: format!("failed to prepare data directory: {e}"),
                })?;
        }

        let tmp = self
            .path
            .with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, payload)
            .await
            .map_err(|e| StoreError::Persistence {
                message: format!("failed to write user records: {e}"),
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Persistence {
                message: format!("failed to finalize user records: {e}"),
            })
    }

    /// Create a user, hashing the password with a fresh salt.
    ///
    /// Fails with [`StoreError::Duplicate`] when the normalized email is
    /// taken; the existence check and the insert happen under one write
    /// lock, so two concurrent registrations cannot both win.
    pub async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let key = normalize_email(&new.email);
        let hashed_password = password::hash_password(&new.password)?;

        let mut users = self.users.write().await;
        if users.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }

        let user = User {
            id: Uuid::new_v4(),
            email: new.email.trim().to_string(),
            first_name: new.first_name,
            last_name: new.last_name,
            company: new.company,
            phone: new.phone,
            hashed_password,
            is_verified: new.is_verified,
            created_at: OffsetDateTime::now_utc(),
            last_login: None,
            subscription: None,
        };

        let mut next = users.clone();
        next.insert(key, user.clone());
        self.persist(&next).await?;
        *users = next;
        Ok(user)
    }

    /// Case-insensitive lookup by email.
    pub async fn get_user_by_email(&self, email: &str) -> Option<User> {
        self.users
            .read()
            .await
            .get(&normalize_email(email))
            .cloned()
    }

    /// Check a plaintext password against the stored hash.
    ///
    /// An unknown email folds into `Ok(false)`; distinguishing the two
    /// cases is left to callers that need it, and the HTTP layer never
    /// does.
    pub async fn verify_password(&self, email: &str, plain: &str) -> Result<bool, StoreError> {
        let Some(user) = self.get_user_by_email(email).await else {
            return Ok(false);
        };
        password::verify_password(plain, &user.hashed_password)
    }

    /// Apply a partial update to the record with the given id.
    ///
    /// Only fields present in `update` change. The updated record set is
    /// persisted before the new record becomes visible to readers.
    pub async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let Some((key, current)) = users
            .iter()
            .find(|(_, u)| u.id == id)
            .map(|(k, u)| (k.clone(), u.clone()))
        else {
            return Err(StoreError::NotFound);
        };

        let mut updated = current;
        if let Some(first_name) = update.first_name {
            updated.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            updated.last_name = last_name;
        }
        if let Some(company) = update.company {
            updated.company = Some(company);
        }
        if let Some(phone) = update.phone {
            updated.phone = Some(phone);
        }
        if let Some(is_verified) = update.is_verified {
            updated.is_verified = is_verified;
        }
        if let Some(last_login) = update.last_login {
            updated.last_login = Some(last_login);
        }
        if let Some(subscription) = update.subscription {
            updated.subscription = Some(subscription);
        }

        let mut next = users.clone();
        next.insert(key, updated.clone());
        self.persist(&next).await?;
        *users = next;
        Ok(updated)
    }

    /// Full record list, oldest first. Administrative use only.
    pub async fn get_all_users(&self) -> Vec<User> {
        let mut records: Vec<User> = self.users.read().await.values().cloned().collect();
        records.sort_by_key(|u| u.created_at);
        records
    }
}
