use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::aws::{FileCredentialCache, LoginProfile, profile};
use crate::constants::{self, DEFAULT_SECRET_NAME};

/// Run-wide settings resolved once from flags, environment and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub profile: String,
    /// Overrides the profile's service region when set
    pub region: Option<String>,
    pub secret_name: Option<String>,
    pub aws_config_path: PathBuf,
    pub sso_cache_dir: PathBuf,
    pub cli_cache_dir: PathBuf,
    pub database_path: PathBuf,
}

impl Settings {
    pub fn new(
        profile: String,
        region: Option<String>,
        secret_name: Option<String>,
    ) -> Result<Self> {
        let aws_config_path =
            constants::get_aws_config_path().context("Could not determine AWS config path")?;
        let sso_cache_dir =
            constants::get_sso_cache_dir().context("Could not determine SSO cache directory")?;
        let cli_cache_dir =
            constants::get_cli_cache_dir().context("Could not determine CLI cache directory")?;
        let database_path =
            constants::get_database_path().context("Could not determine database path")?;

        Ok(Self {
            profile,
            region,
            secret_name,
            aws_config_path,
            sso_cache_dir,
            cli_cache_dir,
            database_path,
        })
    }

    pub fn login_profile(&self) -> Result<LoginProfile> {
        let login = profile::load(&self.aws_config_path, &self.profile)
            .with_context(|| format!("Failed to load SSO profile '{}'", self.profile))?;
        Ok(login.with_region(self.region.as_deref()))
    }

    pub fn credential_cache(&self) -> FileCredentialCache {
        FileCredentialCache::new(self.sso_cache_dir.clone(), self.cli_cache_dir.clone())
    }

    /// Secret name for `store`, falling back to the default name.
    pub fn secret_name_or_default(&self) -> &str {
        self.secret_name.as_deref().unwrap_or(DEFAULT_SECRET_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn settings_with_config(path: PathBuf, region: Option<&str>) -> Settings {
        Settings {
            profile: "demo".to_string(),
            region: region.map(String::from),
            secret_name: None,
            aws_config_path: path,
            sso_cache_dir: PathBuf::from("/tmp/sso"),
            cli_cache_dir: PathBuf::from("/tmp/cli"),
            database_path: PathBuf::from("/tmp/monies.db"),
        }
    }

    #[test]
    #[serial]
    fn test_new_honours_database_path_env() {
        let original = env::var(constants::DATABASE_PATH_ENV).ok();
        unsafe {
            env::set_var(constants::DATABASE_PATH_ENV, "/data/custom.db");
        }

        let settings = Settings::new("default".to_string(), None, None).unwrap();
        assert_eq!(settings.database_path, PathBuf::from("/data/custom.db"));

        unsafe {
            match original {
                Some(value) => env::set_var(constants::DATABASE_PATH_ENV, value),
                None => env::remove_var(constants::DATABASE_PATH_ENV),
            }
        }
    }

    #[test]
    #[serial]
    fn test_new_honours_aws_config_file() {
        let original = env::var("AWS_CONFIG_FILE").ok();
        unsafe {
            env::set_var("AWS_CONFIG_FILE", "/custom/aws/config");
        }

        let settings = Settings::new("default".to_string(), None, None).unwrap();
        assert_eq!(settings.aws_config_path, PathBuf::from("/custom/aws/config"));

        unsafe {
            match original {
                Some(value) => env::set_var("AWS_CONFIG_FILE", value),
                None => env::remove_var("AWS_CONFIG_FILE"),
            }
        }
    }

    #[test]
    fn test_secret_name_default() {
        let mut settings = settings_with_config(PathBuf::from("/nonexistent"), None);
        assert_eq!(settings.secret_name_or_default(), DEFAULT_SECRET_NAME);

        settings.secret_name = Some("custom".to_string());
        assert_eq!(settings.secret_name_or_default(), "custom");
    }

    #[test]
    fn test_login_profile_applies_region_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[profile demo]\nsso_start_url = https://x/start\nsso_account_id = 123\nsso_role_name = R\nregion = us-east-1"
        )
        .unwrap();

        let settings = settings_with_config(file.path().to_path_buf(), Some("eu-west-1"));
        let profile = settings.login_profile().unwrap();
        assert_eq!(profile.region, "eu-west-1");
        assert_eq!(profile.sso_region, "us-east-1");
    }

    #[test]
    fn test_login_profile_missing_config() {
        let settings = settings_with_config(PathBuf::from("/nonexistent/aws/config"), None);
        let err = settings.login_profile().unwrap_err();
        assert!(format!("{err:#}").contains("AWS config file not found"));
    }
}
