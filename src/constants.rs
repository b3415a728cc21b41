use std::{env, path::PathBuf};

/// Version reported by `--version`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment selected when `--env` is not given
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Per-environment database settings, relative to the home directory
pub const RDSAUTH_CONFIG_FILE_NAME: &str = ".rdsauth.ini";

/// AWS configuration directory name
pub const AWS_CONFIG_DIR_NAME: &str = ".aws";

/// AWS shared credentials file name
pub const AWS_CREDENTIALS_FILE_NAME: &str = "credentials";

/// AWS shared config file name
pub const AWS_CONFIG_FILE_NAME: &str = "config";

/// Where the synthesized role profile is written on every role-assuming run
pub const EPHEMERAL_PROFILE_PATH: &str = "/tmp/rdsauthcredentials";

/// Section name of the synthesized role profile
pub const EPHEMERAL_PROFILE_NAME: &str = "rdsauth";

/// Prefix of the per-user database role name
pub const RDS_ROLE_NAME_PREFIX: &str = "RDS_";

/// Appended to the username when a write-capable login is requested
pub const WRITE_USER_SUFFIX: &str = "_write";

/// Primary config fields, in lookup order
pub const RDSAUTH_FIELDS: [&str; 3] = ["db", "region", "user"];

/// Credentials file fields used for role assumption, in lookup order
pub const ROLE_FIELDS: [&str; 3] = ["role_arn", "role_session_name", "source_profile"];

/// Resolve the invoking user's home directory.
/// `HOME` wins; the platform lookup is the fallback.
pub fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
}
