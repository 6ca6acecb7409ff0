use std::{
    collections::{BTreeMap, HashMap},
    io::Write,
    path::{Path, PathBuf},
};

use apkman_core::models::users::User;
use log::{debug, warn};

use crate::error::{ClientError, ClientResult};

pub const TOKEN_KEY: &str = "apk-token";
pub const USER_KEY: &str = "apk-user";

/// String key-value storage backing the persisted session.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> ClientResult<()>;
    fn remove(&mut self, key: &str) -> ClientResult<()>;
}

/// TOML file holding a flat string map, rewritten on every change.
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open<P>(path: P) -> ClientResult<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(FileStore { path, entries })
    }

    fn persist(&self) -> ClientResult<()> {
        if let Some(parent) = self.path.parent().filter(|x| !x.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        write_private(&self.path, &toml::to_string(&self.entries)?)?;
        debug!("Session store written to {}", self.path.to_string_lossy());
        Ok(())
    }
}

/// Writes `contents` readable by the owner only, tightening the mode of a
/// file that already exists.
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents.as_bytes())?;
    file.flush()
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> ClientResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove(&mut self, key: &str) -> ClientResult<()> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> ClientResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> ClientResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }
}

/// Reads and writes the session as two entries: the raw token and the user as JSON.
pub struct SessionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        SessionStore { store }
    }

    pub fn load(&self) -> Option<Session> {
        let token = self.store.get(TOKEN_KEY)?;
        let user = self.store.get(USER_KEY)?;
        match serde_json::from_str::<User>(&user) {
            Ok(user) => Some(Session { token, user }),
            Err(err) => {
                warn!("Ignoring unreadable stored user: {}", err);
                None
            }
        }
    }

    pub fn save(&mut self, session: &Session) -> ClientResult<()> {
        let user = serde_json::to_string(&session.user)
            .map_err(|x| ClientError::Store(x.to_string()))?;
        self.store.set(TOKEN_KEY, &session.token)?;
        self.store.set(USER_KEY, &user)
    }

    pub fn clear(&mut self) -> ClientResult<()> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(USER_KEY)
    }

    pub fn inner(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkman_core::{api::UserId, Role};

    fn session() -> Session {
        Session {
            token: "tok".to_string(),
            user: User {
                id: UserId(7),
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                role: Role::Admin,
                created_at: None,
            },
        }
    }

    #[test]
    fn session_needs_both_entries() {
        let mut store = MemoryStore::default();
        store.set(TOKEN_KEY, "tok").unwrap();
        let sessions = SessionStore::new(store);
        assert!(sessions.load().is_none());
    }

    #[test]
    fn corrupt_user_entry_is_ignored() {
        let mut store = MemoryStore::default();
        store.set(TOKEN_KEY, "tok").unwrap();
        store.set(USER_KEY, "{not json").unwrap();
        assert!(SessionStore::new(store).load().is_none());
    }

    #[test]
    fn file_store_survives_reopen_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.toml");

        let mut sessions = SessionStore::new(FileStore::open(&path).unwrap());
        sessions.save(&session()).unwrap();

        let reopened = SessionStore::new(FileStore::open(&path).unwrap());
        assert_eq!(reopened.load(), Some(session()));
        assert_eq!(reopened.inner().get(TOKEN_KEY).as_deref(), Some("tok"));

        let mut reopened = reopened;
        reopened.clear().unwrap();
        let cleared = SessionStore::new(FileStore::open(&path).unwrap());
        assert!(cleared.load().is_none());
        assert!(cleared.inner().get(USER_KEY).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_private_to_the_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, "").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut store = FileStore::open(&path).unwrap();
        store.set(TOKEN_KEY, "secret-bearer").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);

        let fresh = dir.path().join("fresh").join("session.toml");
        let mut store = FileStore::open(&fresh).unwrap();
        store.set(TOKEN_KEY, "secret-bearer").unwrap();
        let mode = std::fs::metadata(&fresh).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }
}
