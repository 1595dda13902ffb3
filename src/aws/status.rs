use tracing::debug;

use super::{LoginProfile, ProbeError, SsoProvider};

/// Whether the profile's existing credentials are usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    Valid,
    Expired,
    NotFound,
    Error(String),
}

const EXPIRED_MARKERS: [&str; 5] = [
    "ExpiredToken",
    "TokenExpired",
    "InvalidGrantException",
    "expired",
    "refresh",
];

const NOT_FOUND_MARKERS: [&str; 2] = ["NoCredentialProviders", "no valid credential"];

fn mentions_any(message: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| message.contains(marker))
}

/// Probe identity with the profile's credential chain and classify the outcome.
pub async fn check<P: SsoProvider + ?Sized>(
    provider: &P,
    profile: &LoginProfile,
) -> CredentialStatus {
    let status = match provider.probe_identity(profile).await {
        Ok(()) => CredentialStatus::Valid,
        Err(e) => classify(&e),
    };
    debug!(
        "Credential status for profile '{}': {:?}",
        profile.profile_name, status
    );
    status
}

pub fn classify(error: &ProbeError) -> CredentialStatus {
    match error {
        ProbeError::Construction(message) => {
            if mentions_any(message, &EXPIRED_MARKERS) {
                CredentialStatus::Expired
            } else if mentions_any(message, &NOT_FOUND_MARKERS) {
                CredentialStatus::NotFound
            } else {
                CredentialStatus::Error(message.clone())
            }
        }
        // Unrecognised probe failures count as expired.
        ProbeError::Probe(message) => {
            if !mentions_any(message, &EXPIRED_MARKERS) && mentions_any(message, &NOT_FOUND_MARKERS)
            {
                CredentialStatus::NotFound
            } else {
                CredentialStatus::Expired
            }
        }
    }
}
