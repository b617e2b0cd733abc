// src/accounts.rs
use crate::error::{StoreError, StoreResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Login accounts, a username -> plaintext password map bound to a JSON
/// file. Every mutation rewrites the whole file.
pub struct AccountStore {
    accounts: BTreeMap<String, String>,
    filepath: PathBuf,
}

const DEFAULT_ACCOUNTS: &[(&str, &str)] = &[
    ("admin", "admin123"),
    ("user", "password"),
    ("test", "test123"),
];

impl AccountStore {
    /// Loads the accounts file if it exists. A missing file seeds the
    /// default accounts and persists them; an unreadable or unparseable
    /// file is logged and leaves the store empty rather than aborting
    /// the program.
    pub fn load(filepath: &Path) -> Self {
        let mut store = AccountStore {
            accounts: BTreeMap::new(),
            filepath: filepath.to_path_buf(),
        };

        if !filepath.exists() {
            log::info!(
                "Accounts file {:?} not found, seeding default accounts.",
                filepath
            );
            for (username, password) in DEFAULT_ACCOUNTS {
                store
                    .accounts
                    .insert(username.to_string(), password.to_string());
            }
            if let Err(e) = store.save() {
                log::warn!("Failed to persist seeded accounts to {:?}: {}", filepath, e);
            }
            return store;
        }

        match fs::read_to_string(filepath) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(accounts) => {
                    log::info!("Loaded {} accounts from {:?}.", accounts.len(), filepath);
                    store.accounts = accounts;
                }
                Err(e) => {
                    log::error!(
                        "Failed to parse accounts file {:?}: {}. Starting with no accounts.",
                        filepath,
                        e
                    );
                }
            },
            Err(e) => {
                log::error!(
                    "Failed to read accounts file {:?}: {}. Starting with no accounts.",
                    filepath,
                    e
                );
            }
        }
        store
    }

    /// Exact-match credential check. Usernames are case-sensitive and
    /// passwords are compared in plaintext.
    pub fn authenticate(&self, username: &str, password: &str) -> bool {
        self.accounts
            .get(username)
            .is_some_and(|stored| stored == password)
    }

    /// Registers a new account and persists the map.
    pub fn create(&mut self, username: &str, password: &str) -> StoreResult<()> {
        if username.is_empty() || password.is_empty() {
            return Err(StoreError::InvalidInput(
                "username and password cannot be empty",
            ));
        }
        if self.accounts.contains_key(username) {
            return Err(StoreError::DuplicateUsername);
        }
        self.accounts
            .insert(username.to_string(), password.to_string());
        log::info!("Created account '{}'.", username);
        self.save()
    }

    /// Replaces a password after verifying the old one, then persists.
    /// An unknown username reports `WrongPassword`: there is no stored
    /// value the old password could match.
    pub fn change_password(
        &mut self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> StoreResult<()> {
        match self.accounts.get(username) {
            Some(stored) if stored == old_password => {}
            _ => return Err(StoreError::WrongPassword),
        }
        if new_password.is_empty() {
            return Err(StoreError::InvalidInput("new password cannot be empty"));
        }
        self.accounts
            .insert(username.to_string(), new_password.to_string());
        log::info!("Changed password for '{}'.", username);
        self.save()
    }

    /// Serializes the full map to the accounts file, overwriting it.
    /// On failure the in-memory map keeps any mutation that preceded
    /// the save; callers surface the error to the user instead.
    pub fn save(&self) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(&self.accounts)?;
        fs::write(&self.filepath, json)?;
        log::debug!(
            "Saved {} accounts to {:?}.",
            self.accounts.len(),
            self.filepath
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
