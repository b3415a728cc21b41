use ini::{Ini, Properties};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{
    constants::{
        self, AWS_CONFIG_DIR_NAME, AWS_CONFIG_FILE_NAME, AWS_CREDENTIALS_FILE_NAME,
        EPHEMERAL_PROFILE_PATH, RDSAUTH_CONFIG_FILE_NAME, RDSAUTH_FIELDS, ROLE_FIELDS,
    },
    error::{RdsAuthError, Result},
};

/// File locations for one run.
///
/// Built once at the binary boundary; components receive the paths they
/// need instead of reading the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub rdsauth_config_path: PathBuf,
    pub aws_credentials_path: PathBuf,
    pub aws_config_path: PathBuf,
    pub ephemeral_profile_path: PathBuf,
}

impl Settings {
    /// Lay out the standard files under `home`.
    pub fn for_home(home: &Path) -> Self {
        let aws_dir = home.join(AWS_CONFIG_DIR_NAME);
        Self {
            rdsauth_config_path: home.join(RDSAUTH_CONFIG_FILE_NAME),
            aws_credentials_path: aws_dir.join(AWS_CREDENTIALS_FILE_NAME),
            aws_config_path: aws_dir.join(AWS_CONFIG_FILE_NAME),
            ephemeral_profile_path: PathBuf::from(EPHEMERAL_PROFILE_PATH),
        }
    }

    pub fn from_env() -> Result<Self> {
        let home = constants::home_dir().ok_or(RdsAuthError::HomeDirUnavailable)?;
        Ok(Self::for_home(&home))
    }
}

/// Read three fields from the `environment` section of an ini file.
///
/// Missing sections and missing fields come back as empty strings; only an
/// unreadable or malformed file is an error.
pub fn read_section(environment: &str, path: &Path, fields: [&str; 3]) -> Result<[String; 3]> {
    let ini = Ini::load_from_file(path).map_err(|e| RdsAuthError::ConfigFileUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let section = ini.section(Some(environment));
    if section.is_none() {
        debug!("No section [{}] in {}", environment, path.display());
    }

    Ok(fields.map(|field| field_value(section, field)))
}

fn field_value(section: Option<&Properties>, field: &str) -> String {
    section
        .and_then(|props| props.get(field))
        .unwrap_or("")
        .to_string()
}

/// Database target for one environment, from `~/.rdsauth.ini`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentProfile {
    pub name: String,
    pub database: String,
    pub region: String,
    pub username: String,
}

impl EnvironmentProfile {
    pub fn load(environment: &str, path: &Path) -> Result<Self> {
        let [database, region, username] = read_section(environment, path, RDSAUTH_FIELDS)?;
        Ok(Self {
            name: environment.to_string(),
            database,
            region,
            username,
        })
    }
}

/// Role assumption fields for one environment, from the AWS credentials file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSettings {
    pub role_arn: String,
    pub role_session_name: String,
    pub source_profile: String,
}

impl RoleSettings {
    pub fn load(environment: &str, path: &Path) -> Result<Self> {
        let [role_arn, role_session_name, source_profile] =
            read_section(environment, path, ROLE_FIELDS)?;
        Ok(Self {
            role_arn,
            role_session_name,
            source_profile,
        })
    }

    /// Role assumption only happens when a role ARN is configured.
    pub fn requires_role(&self) -> bool {
        !self.role_arn.is_empty()
    }
}
