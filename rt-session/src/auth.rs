use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username already registered")]
    AlreadyRegistered,
    #[error("invalid username or password")]
    AuthFailed,
    #[error("credential file io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("username or password must not contain ':'")]
    InvalidCharacter,
}

/// `username:password\n` records in a flat file. Access is serialized behind one mutex: register
/// and login each read the file fully while holding it, matching the "credential file I/O is
/// serialized" concurrency rule.
pub struct CredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> CredentialStore {
        CredentialStore { path: path.into(), lock: Mutex::new(()) }
    }

    fn read_all(&self) -> Result<Vec<(String, String)>, AuthError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut out = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if let Some((user, pass)) = line.split_once(':') {
                out.push((user.to_string(), pass.to_string()));
            }
        }
        Ok(out)
    }

    pub fn register(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.contains(':') || password.contains(':') {
            return Err(AuthError::InvalidCharacter);
        }

        let _guard = self.lock.lock().unwrap();
        let records = self.read_all()?;
        if records.iter().any(|(u, _)| u == username) {
            return Err(AuthError::AlreadyRegistered);
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}:{}", username, password)?;
        Ok(())
    }

    pub fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let _guard = self.lock.lock().unwrap();
        let records = self.read_all()?;
        if records.iter().any(|(u, p)| u == username && p == password) {
            Ok(())
        } else {
            Err(AuthError::AuthFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rt-session-test-{}-{}", std::process::id(), name))
    }

    #[test]
    fn register_then_login_round_trip() {
        let path = temp_path("login.txt");
        let _ = std::fs::remove_file(&path);
        let store = CredentialStore::new(&path);

        store.register("alice", "pw").unwrap();
        store.login("alice", "pw").unwrap();
        assert!(store.login("alice", "wrong").is_err());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let path = temp_path("dup.txt");
        let _ = std::fs::remove_file(&path);
        let store = CredentialStore::new(&path);

        store.register("bob", "pw").unwrap();
        assert!(matches!(store.register("bob", "other"), Err(AuthError::AlreadyRegistered)));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn a_colon_in_either_field_is_rejected() {
        let path = temp_path("colon.txt");
        let _ = std::fs::remove_file(&path);
        let store = CredentialStore::new(&path);

        assert!(matches!(store.register("evil:name", "pw"), Err(AuthError::InvalidCharacter)));
        assert!(matches!(store.register("eve", "pw:word"), Err(AuthError::InvalidCharacter)));

        std::fs::remove_file(&path).ok();
    }
}
