use ini::{Ini, Properties};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::constants::DEFAULT_AWS_REGION;

/// IAM Identity Center parameters for a named profile in `~/.aws/config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginProfile {
    pub profile_name: String,
    /// Region for service calls (Secrets Manager, STS)
    pub region: String,
    /// Region of the Identity Center instance used for the device login
    pub sso_region: String,
    pub start_url: String,
    pub account_id: String,
    pub role_name: String,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("AWS config file not found at {}", .0.display())]
    ConfigNotFound(PathBuf),
    #[error("failed to parse AWS config file: {0}")]
    Parse(String),
    #[error("profile '{0}' not found in AWS config")]
    ProfileNotFound(String),
    #[error("incomplete SSO configuration for profile '{profile}': missing {}", .missing.join(", "))]
    IncompleteProfile {
        profile: String,
        missing: Vec<&'static str>,
    },
}

/// Raw values read from one profile section, before indirection.
#[derive(Debug, Default)]
struct SsoSettings {
    start_url: Option<String>,
    sso_region: Option<String>,
    account_id: Option<String>,
    role_name: Option<String>,
    region: Option<String>,
    session: Option<String>,
}

impl SsoSettings {
    fn from_ini_section(section: &Properties) -> Self {
        let value = |key: &str| {
            section
                .get(key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        Self {
            start_url: value("sso_start_url"),
            sso_region: value("sso_region"),
            account_id: value("sso_account_id"),
            role_name: value("sso_role_name"),
            region: value("region"),
            session: value("sso_session"),
        }
    }

    /// Fill gaps from an `[sso-session <name>]` section. Profile values win.
    fn merge_session(&mut self, section: &Properties) {
        let session = Self::from_ini_section(section);
        self.start_url = self.start_url.take().or(session.start_url);
        self.sso_region = self.sso_region.take().or(session.sso_region);
    }
}

fn profile_section_name(profile: &str) -> String {
    if profile == "default" {
        profile.to_string()
    } else {
        format!("profile {profile}")
    }
}

impl LoginProfile {
    /// Resolve `profile` from an already parsed config.
    pub fn from_ini(ini: &Ini, profile: &str) -> Result<Self, ProfileError> {
        let section = ini
            .section(Some(profile_section_name(profile)))
            .ok_or_else(|| ProfileError::ProfileNotFound(profile.to_string()))?;

        let mut settings = SsoSettings::from_ini_section(section);

        if let Some(session_name) = settings.session.clone() {
            match ini.section(Some(format!("sso-session {session_name}"))) {
                Some(session) => settings.merge_session(session),
                None => debug!(
                    "sso-session '{}' referenced by profile '{}' not found",
                    session_name, profile
                ),
            }
        }

        let missing: Vec<&'static str> = [
            ("sso_start_url", settings.start_url.is_none()),
            ("sso_account_id", settings.account_id.is_none()),
            ("sso_role_name", settings.role_name.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect();

        let (Some(start_url), Some(account_id), Some(role_name)) =
            (settings.start_url, settings.account_id, settings.role_name)
        else {
            return Err(ProfileError::IncompleteProfile {
                profile: profile.to_string(),
                missing,
            });
        };

        let region = settings
            .region
            .clone()
            .or_else(|| settings.sso_region.clone())
            .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());
        let sso_region = settings.sso_region.unwrap_or_else(|| region.clone());

        Ok(Self {
            profile_name: profile.to_string(),
            region,
            sso_region,
            start_url,
            account_id,
            role_name,
        })
    }

    /// Override the service region, e.g. from `--region`.
    pub fn with_region(mut self, region: Option<&str>) -> Self {
        if let Some(region) = region {
            self.region = region.to_string();
        }
        self
    }
}

/// Load `profile` from the AWS config file at `path`.
pub fn load(path: &Path, profile: &str) -> Result<LoginProfile, ProfileError> {
    if !path.exists() {
        return Err(ProfileError::ConfigNotFound(path.to_path_buf()));
    }

    let ini = Ini::load_from_file(path).map_err(|e| ProfileError::Parse(e.to_string()))?;
    let login = LoginProfile::from_ini(&ini, profile)?;
    debug!(
        "Loaded SSO profile '{}' (account {}, role {}, region {})",
        login.profile_name, login.account_id, login.role_name, login.region
    );
    Ok(login)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(content: &str) -> Ini {
        Ini::load_from_str(content).unwrap()
    }

    #[test]
    fn test_named_profile() {
        let ini = parse(
            "[profile demo]\n\
             sso_start_url = https://x/start\n\
             sso_account_id = 123\n\
             sso_role_name = R\n\
             region = us-east-1\n",
        );

        let profile = LoginProfile::from_ini(&ini, "demo").unwrap();
        assert_eq!(
            profile,
            LoginProfile {
                profile_name: "demo".to_string(),
                region: "us-east-1".to_string(),
                sso_region: "us-east-1".to_string(),
                start_url: "https://x/start".to_string(),
                account_id: "123".to_string(),
                role_name: "R".to_string(),
            }
        );
    }

    #[test]
    fn test_default_profile_uses_bare_section() {
        let ini = parse(
            "[default]\n\
             sso_start_url = https://d/start\n\
             sso_region = eu-west-1\n\
             sso_account_id = 999\n\
             sso_role_name = Admin\n\
             [profile default]\n\
             sso_start_url = https://wrong/start\n",
        );

        let profile = LoginProfile::from_ini(&ini, "default").unwrap();
        assert_eq!(profile.start_url, "https://d/start");
        assert_eq!(profile.sso_region, "eu-west-1");
        assert_eq!(profile.region, "eu-west-1");
    }

    #[test]
    fn test_sso_session_indirection() {
        let ini = parse(
            "[profile work]\n\
             sso_session = corp\n\
             sso_account_id = 111\n\
             sso_role_name = Dev\n\
             region = ap-southeast-2\n\
             [sso-session corp]\n\
             sso_start_url = https://corp.awsapps.com/start\n\
             sso_region = us-west-2\n",
        );

        let profile = LoginProfile::from_ini(&ini, "work").unwrap();
        assert_eq!(profile.start_url, "https://corp.awsapps.com/start");
        assert_eq!(profile.sso_region, "us-west-2");
        assert_eq!(profile.region, "ap-southeast-2");
    }

    #[test]
    fn test_profile_values_win_over_session() {
        let ini = parse(
            "[profile work]\n\
             sso_session = corp\n\
             sso_start_url = https://profile/start\n\
             sso_region = eu-central-1\n\
             sso_account_id = 111\n\
             sso_role_name = Dev\n\
             [sso-session corp]\n\
             sso_start_url = https://session/start\n\
             sso_region = us-west-2\n",
        );

        let profile = LoginProfile::from_ini(&ini, "work").unwrap();
        assert_eq!(profile.start_url, "https://profile/start");
        assert_eq!(profile.sso_region, "eu-central-1");
    }

    #[test]
    fn test_missing_region_defaults() {
        let ini = parse(
            "[profile demo]\n\
             sso_start_url = https://x/start\n\
             sso_account_id = 123\n\
             sso_role_name = R\n",
        );

        let profile = LoginProfile::from_ini(&ini, "demo").unwrap();
        assert_eq!(profile.region, DEFAULT_AWS_REGION);
        assert_eq!(profile.sso_region, DEFAULT_AWS_REGION);
    }

    #[test]
    fn test_incomplete_profile_lists_missing_fields() {
        let ini = parse(
            "[profile demo]\n\
             sso_start_url = https://x/start\n\
             sso_role_name =\n",
        );

        match LoginProfile::from_ini(&ini, "demo") {
            Err(ProfileError::IncompleteProfile { profile, missing }) => {
                assert_eq!(profile, "demo");
                assert_eq!(missing, vec!["sso_account_id", "sso_role_name"]);
            }
            other => panic!("expected incomplete profile, got {other:?}"),
        }
    }

    #[test]
    fn test_each_required_field_is_enforced() {
        let complete = [
            "sso_start_url = https://x/start",
            "sso_account_id = 123",
            "sso_role_name = R",
        ];
        for skip in 0..complete.len() {
            let body: Vec<&str> = complete
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, line)| *line)
                .collect();
            let ini = parse(&format!("[profile demo]\n{}\n", body.join("\n")));
            assert!(matches!(
                LoginProfile::from_ini(&ini, "demo"),
                Err(ProfileError::IncompleteProfile { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_profile() {
        let ini = parse("[profile other]\nsso_start_url = https://x\n");
        assert!(matches!(
            LoginProfile::from_ini(&ini, "demo"),
            Err(ProfileError::ProfileNotFound(name)) if name == "demo"
        ));
    }

    #[test]
    fn test_with_region_override() {
        let ini = parse(
            "[profile demo]\n\
             sso_start_url = https://x/start\n\
             sso_account_id = 123\n\
             sso_role_name = R\n\
             region = us-east-1\n",
        );
        let profile = LoginProfile::from_ini(&ini, "demo").unwrap();

        assert_eq!(profile.clone().with_region(None).region, "us-east-1");
        assert_eq!(profile.with_region(Some("eu-west-1")).region, "eu-west-1");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[profile demo]\nsso_start_url = https://x/start\nsso_account_id = 123\nsso_role_name = R\nregion = us-east-1"
        )
        .unwrap();

        let profile = load(file.path(), "demo").unwrap();
        assert_eq!(profile.account_id, "123");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        assert!(matches!(
            load(&path, "demo"),
            Err(ProfileError::ConfigNotFound(p)) if p == path
        ));
    }
}
