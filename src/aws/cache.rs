use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha1::{Digest, Sha1};
use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use super::profile::LoginProfile;
use crate::constants;

/// Identity Center access token obtained by the device login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Short-lived role credentials for the profile's account and role.
#[derive(Clone, PartialEq, Eq)]
pub struct RoleCredential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

impl RoleCredential {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

impl std::fmt::Debug for RoleCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleCredential")
            .field("access_key_id", &self.access_key_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("credential cache I/O failed at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("credential cache entry is invalid: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("could not determine home directory for the credential cache")]
    NoHomeDirectory,
    #[error("credential cache is unavailable: {0}")]
    Unavailable(String),
}

/// Persistence port for tokens and role credentials obtained by login.
#[async_trait]
pub trait CredentialCache: Send + Sync {
    async fn write_session(
        &self,
        profile: &LoginProfile,
        token: &SessionToken,
    ) -> Result<(), CacheError>;

    async fn write_role(
        &self,
        profile: &LoginProfile,
        credential: &RoleCredential,
    ) -> Result<(), CacheError>;

    async fn read_session(
        &self,
        profile: &LoginProfile,
    ) -> Result<Option<SessionToken>, CacheError>;

    async fn read_role(
        &self,
        profile: &LoginProfile,
    ) -> Result<Option<RoleCredential>, CacheError>;
}

/// `~/.aws/sso/cache/<sha1(start url)>.json`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionCacheEntry {
    start_url: String,
    region: String,
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// `~/.aws/cli/cache/sso-<profile>.json`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoleCacheEntry {
    credentials: RoleCacheCredentials,
    expiration: DateTime<Utc>,
    provider_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoleCacheCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
}

/// Credential cache laid out the way the AWS CLI lays out its own.
#[derive(Debug, Clone)]
pub struct FileCredentialCache {
    sso_dir: PathBuf,
    cli_dir: PathBuf,
}

impl FileCredentialCache {
    pub fn new(sso_dir: PathBuf, cli_dir: PathBuf) -> Self {
        Self { sso_dir, cli_dir }
    }

    pub fn new_default() -> Result<Self, CacheError> {
        let sso_dir = constants::get_sso_cache_dir().ok_or(CacheError::NoHomeDirectory)?;
        let cli_dir = constants::get_cli_cache_dir().ok_or(CacheError::NoHomeDirectory)?;
        Ok(Self::new(sso_dir, cli_dir))
    }

    pub fn session_path(&self, profile: &LoginProfile) -> PathBuf {
        let digest = Sha1::digest(profile.start_url.as_bytes());
        self.sso_dir.join(format!("{digest:x}.json"))
    }

    pub fn role_path(&self, profile: &LoginProfile) -> PathBuf {
        self.cli_dir
            .join(format!("sso-{}.json", profile.profile_name))
    }
}

#[async_trait]
impl CredentialCache for FileCredentialCache {
    async fn write_session(
        &self,
        profile: &LoginProfile,
        token: &SessionToken,
    ) -> Result<(), CacheError> {
        let entry = SessionCacheEntry {
            start_url: profile.start_url.clone(),
            region: profile.sso_region.clone(),
            access_token: token.access_token.clone(),
            expires_at: token.expires_at.trunc_subsecs(0),
        };
        let path = self.session_path(profile);
        write_private_json(&path, &entry).await?;
        debug!("SSO token cached at: {}", path.display());
        Ok(())
    }

    async fn write_role(
        &self,
        profile: &LoginProfile,
        credential: &RoleCredential,
    ) -> Result<(), CacheError> {
        let entry = RoleCacheEntry {
            credentials: RoleCacheCredentials {
                access_key_id: credential.access_key_id.clone(),
                secret_access_key: credential.secret_access_key.clone(),
                session_token: credential.session_token.clone(),
            },
            expiration: credential.expires_at.trunc_subsecs(0),
            provider_type: "sso".to_string(),
        };
        let path = self.role_path(profile);
        write_private_json(&path, &entry).await?;
        debug!("Role credentials cached at: {}", path.display());
        Ok(())
    }

    async fn read_session(
        &self,
        profile: &LoginProfile,
    ) -> Result<Option<SessionToken>, CacheError> {
        let entry: Option<SessionCacheEntry> = read_json(&self.session_path(profile)).await?;
        Ok(entry.map(|e| SessionToken {
            access_token: e.access_token,
            expires_at: e.expires_at,
        }))
    }

    async fn read_role(
        &self,
        profile: &LoginProfile,
    ) -> Result<Option<RoleCredential>, CacheError> {
        let entry: Option<RoleCacheEntry> = read_json(&self.role_path(profile)).await?;
        Ok(entry.map(|e| RoleCredential {
            access_key_id: e.credentials.access_key_id,
            secret_access_key: e.credentials.secret_access_key,
            session_token: e.credentials.session_token,
            expires_at: e.expiration,
        }))
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `value` through a 0600 sibling temp file renamed into place.
async fn write_private_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CacheError> {
    let data = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(io_error(parent))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))
                .await
                .map_err(io_error(parent))?;
        }
    }

    let tmp_path = path.with_extension("json.tmp");
    let written = match write_temp(&tmp_path, &data).await {
        Ok(()) => fs::rename(&tmp_path, path).await.map_err(io_error(path)),
        Err(e) => Err(e),
    };
    if written.is_err() {
        let _ = fs::remove_file(&tmp_path).await;
    }
    written
}

async fn write_temp(tmp_path: &Path, data: &[u8]) -> Result<(), CacheError> {
    use tokio::io::AsyncWriteExt;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(tmp_path).await.map_err(io_error(tmp_path))?;
    file.write_all(data).await.map_err(io_error(tmp_path))?;
    file.sync_all().await.map_err(io_error(tmp_path))?;
    drop(file);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp_path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(io_error(tmp_path))?;
    }
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CacheError> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path)(e)),
    };
    Ok(Some(serde_json::from_slice(&raw)?))
}

/// In-process cache keyed the same way as [`FileCredentialCache`].
#[derive(Debug, Default)]
pub struct MemoryCredentialCache {
    sessions: Mutex<HashMap<String, SessionToken>>,
    roles: Mutex<HashMap<String, RoleCredential>>,
}

impl MemoryCredentialCache {
    fn lock<T>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, CacheError> {
        mutex
            .lock()
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl CredentialCache for MemoryCredentialCache {
    async fn write_session(
        &self,
        profile: &LoginProfile,
        token: &SessionToken,
    ) -> Result<(), CacheError> {
        Self::lock(&self.sessions)?.insert(profile.start_url.clone(), token.clone());
        Ok(())
    }

    async fn write_role(
        &self,
        profile: &LoginProfile,
        credential: &RoleCredential,
    ) -> Result<(), CacheError> {
        Self::lock(&self.roles)?.insert(profile.profile_name.clone(), credential.clone());
        Ok(())
    }

    async fn read_session(
        &self,
        profile: &LoginProfile,
    ) -> Result<Option<SessionToken>, CacheError> {
        Ok(Self::lock(&self.sessions)?.get(&profile.start_url).cloned())
    }

    async fn read_role(
        &self,
        profile: &LoginProfile,
    ) -> Result<Option<RoleCredential>, CacheError> {
        Ok(Self::lock(&self.roles)?.get(&profile.profile_name).cloned())
    }
}
