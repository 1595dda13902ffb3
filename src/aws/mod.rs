//! AWS IAM Identity Center login, credential caching and Secrets Manager
//! storage for the SimpleFIN access credential.

pub mod cache;
pub mod login;
pub mod profile;
pub mod provider;
pub mod secrets;
pub mod session;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{
    CacheError, CredentialCache, FileCredentialCache, MemoryCredentialCache, RoleCredential,
    SessionToken,
};
pub use login::{LoginError, LoginFlow};
pub use profile::{LoginProfile, ProfileError};
pub use provider::{
    AwsSsoProvider, ClientRegistration, DeviceAuthorization, ProbeError, ProviderError,
    SsoProvider, TokenPoll,
};
pub use secrets::{MemorySecretStore, SecretError, SecretStore, SecretSummary, SecretsManagerStore};
pub use session::ResolvedCredentials;
pub use status::CredentialStatus;
