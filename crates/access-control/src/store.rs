use crate::{CredentialError, LoginError};
use anyhow::Context;
use narration::VerbosityTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const BUILTIN_USERS: &str = include_str!("../assets/users.yaml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub password: String,
    pub name: String,
    pub tier: VerbosityTier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialFile {
    pub users: Vec<UserRecord>,
}

/// An authenticated operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub name: String,
    pub tier: VerbosityTier,
}

/// Static credential table. User ids are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: BTreeMap<String, UserRecord>,
}

impl CredentialStore {
    pub fn from_file(file: CredentialFile) -> Result<Self, CredentialError> {
        let mut users = BTreeMap::new();
        for mut user in file.users {
            let key = user.user_id.trim().to_lowercase();
            if key.is_empty() {
                return Err(CredentialError::EmptyUserId);
            }
            if users.contains_key(&key) {
                return Err(CredentialError::DuplicateUser(key));
            }
            user.user_id = key.clone();
            users.insert(key, user);
        }
        Ok(Self { users })
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let file: CredentialFile = serde_yaml::from_str(raw).context("parsing credentials yaml")?;
        Ok(Self::from_file(file)?)
    }

    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_yaml_str(BUILTIN_USERS).context("loading built-in credentials")
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Users in id order, without passwords.
    pub fn users(&self) -> impl Iterator<Item = (&str, &str, VerbosityTier)> {
        self.users
            .values()
            .map(|u| (u.user_id.as_str(), u.name.as_str(), u.tier))
    }

    /// Authenticate `user_id` and check that `requested` is the tier the
    /// user is assigned to.
    pub fn login(
        &self,
        user_id: &str,
        password: &str,
        requested: VerbosityTier,
    ) -> Result<Session, LoginError> {
        let user_id = user_id.trim().to_lowercase();
        let password = password.trim();
        if user_id.is_empty() || password.is_empty() {
            return Err(LoginError::MissingInput);
        }

        let Some(user) = self.users.get(&user_id).filter(|u| u.password == password) else {
            tracing::warn!(user = %user_id, "login rejected: invalid credentials");
            return Err(LoginError::InvalidCredentials);
        };

        if user.tier != requested {
            tracing::warn!(
                user = %user_id,
                assigned = %user.tier,
                %requested,
                "login rejected: access mismatch"
            );
            return Err(LoginError::AccessMismatch {
                assigned: user.tier,
                requested,
            });
        }

        tracing::info!(user = %user_id, tier = %user.tier, "login successful");
        Ok(Session {
            user_id,
            name: user.name.clone(),
            tier: user.tier,
        })
    }
}

pub fn load_credentials_file(path: impl AsRef<Path>) -> anyhow::Result<CredentialStore> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading credentials: {}", path.display()))?;
    CredentialStore::from_yaml_str(&raw)
        .with_context(|| format!("decoding credentials: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store() -> CredentialStore {
        CredentialStore::builtin().unwrap()
    }

    #[test]
    fn test_builtin_users() {
        let s = store();
        assert_eq!(s.len(), 3);
        let ids: Vec<&str> = s.users().map(|(id, _, _)| id).collect();
        assert_eq!(ids, vec!["gayan", "sai", "susmitha"]);
    }

    #[test]
    fn test_login_at_assigned_tier() {
        let session = store().login("sai", "123", VerbosityTier::Level1).unwrap();
        assert_eq!(session.name, "Sai");
        assert_eq!(session.tier, VerbosityTier::Level1);
    }

    #[test]
    fn test_wrong_tier_is_access_mismatch() {
        assert_eq!(
            store().login("sai", "123", VerbosityTier::Level2),
            Err(LoginError::AccessMismatch {
                assigned: VerbosityTier::Level1,
                requested: VerbosityTier::Level2,
            })
        );
    }

    #[test]
    fn test_invalid_credentials() {
        let s = store();
        assert_eq!(
            s.login("sai", "456", VerbosityTier::Level1),
            Err(LoginError::InvalidCredentials)
        );
        assert_eq!(
            s.login("nobody", "123", VerbosityTier::Level1),
            Err(LoginError::InvalidCredentials)
        );
    }

    #[test]
    fn test_missing_input() {
        let s = store();
        assert_eq!(
            s.login("  ", "123", VerbosityTier::Level1),
            Err(LoginError::MissingInput)
        );
        assert_eq!(
            s.login("sai", "", VerbosityTier::Level1),
            Err(LoginError::MissingInput)
        );
    }

    #[test]
    fn test_user_id_case_and_whitespace() {
        let session = store()
            .login("  Gayan ", " 456 ", VerbosityTier::Level2)
            .unwrap();
        assert_eq!(session.user_id, "gayan");
    }

    #[test]
    fn test_duplicate_users_rejected() {
        let raw = r#"
users:
  - { user_id: op, password: "1", name: A, tier: Level1 }
  - { user_id: OP, password: "2", name: B, tier: Level2 }
"#;
        let err = CredentialStore::from_yaml_str(raw).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate user id 'op'"));
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "users:\n  - {{ user_id: lead, password: pw, name: Lead, tier: Level3 }}"
        )
        .unwrap();
        let s = load_credentials_file(file.path()).unwrap();
        assert!(s.login("lead", "pw", VerbosityTier::Level3).is_ok());

        let err = load_credentials_file("/nonexistent/users.yaml").unwrap_err();
        assert!(err.to_string().contains("reading credentials"));
    }
}
