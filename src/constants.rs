use std::{env, path::PathBuf, time::Duration};

/// Application directory name under the user's data directory
pub const APP_DIR_NAME: &str = "monies";

/// SQLite database file name
pub const DATABASE_FILE_NAME: &str = "monies.db";

/// Environment variable overriding the database location
pub const DATABASE_PATH_ENV: &str = "MONIES_DB_PATH";

/// AWS configuration directory name
pub const AWS_CONFIG_DIR_NAME: &str = ".aws";

/// AWS configuration file name
pub const AWS_CONFIG_FILE_NAME: &str = "config";

/// Default AWS region when neither the profile nor the command line names one
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Client name registered with IAM Identity Center for the device login
pub const SSO_CLIENT_NAME: &str = "monies-cli";

/// Secret name used by `store` when none is given
pub const DEFAULT_SECRET_NAME: &str = "monies-access-token";

/// Name filter used by `secrets list` unless `--all` is passed
pub const SECRET_NAME_PREFIX: &str = "monies";

/// Description attached to secrets created by `store`
pub const SECRET_DESCRIPTION: &str = "SimpleFIN access credential for monies";

/// Upper bound on a single SimpleFIN request, claim or fetch
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Get the AWS config file path
/// Respects AWS_CONFIG_FILE environment variable if set
pub fn get_aws_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("AWS_CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|home| home.join(AWS_CONFIG_DIR_NAME).join(AWS_CONFIG_FILE_NAME))
}

/// Directory holding cached Identity Center session tokens (~/.aws/sso/cache)
pub fn get_sso_cache_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(AWS_CONFIG_DIR_NAME).join("sso").join("cache"))
}

/// Directory holding cached role credentials (~/.aws/cli/cache)
pub fn get_cli_cache_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(AWS_CONFIG_DIR_NAME).join("cli").join("cache"))
}

/// Get the database path
/// Respects MONIES_DB_PATH environment variable if set
pub fn get_database_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(DATABASE_PATH_ENV) {
        return Some(PathBuf::from(path));
    }

    dirs::data_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join(APP_DIR_NAME).join(DATABASE_FILE_NAME))
}
