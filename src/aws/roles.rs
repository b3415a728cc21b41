use ini::Ini;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::{
    config::RoleSettings,
    constants::{EPHEMERAL_PROFILE_NAME, RDS_ROLE_NAME_PREFIX},
    error::{RdsAuthError, Result},
};

/// Marker separating the account part of an IAM role ARN from the role path
const ROLE_RESOURCE_MARKER: &str = "role/";

/// Per-user suffix of the database role name: the username minus its first
/// character (`alice` -> `lice`).
pub fn user_suffix(username: &str) -> Result<&str> {
    let mut chars = username.chars();
    chars.next();
    let suffix = chars.as_str();

    if suffix.is_empty() {
        return Err(RdsAuthError::InvalidUsername {
            username: username.to_string(),
        });
    }
    Ok(suffix)
}

/// Everything in front of the role resource path, e.g.
/// `arn:aws:iam::123:role/Admin` -> `arn:aws:iam::123:`.
pub fn role_arn_base(role_arn: &str) -> &str {
    role_arn
        .split_once(ROLE_RESOURCE_MARKER)
        .map_or(role_arn, |(base, _)| base)
}

/// Point the role resource of `role_arn` at the per-user database role.
pub fn derive_role_arn(role_arn: &str, suffix: &str) -> String {
    format!(
        "{}{ROLE_RESOURCE_MARKER}{RDS_ROLE_NAME_PREFIX}{suffix}",
        role_arn_base(role_arn)
    )
}

/// Everything needed to assume the per-user database role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssumptionDescriptor {
    pub base_role_arn: String,
    pub role_arn: String,
    pub session_name: String,
    pub source_profile: String,
}

impl RoleAssumptionDescriptor {
    pub fn derive(username: &str, settings: &RoleSettings) -> Result<Self> {
        let suffix = user_suffix(username)?;
        let role_arn = derive_role_arn(&settings.role_arn, suffix);
        debug!("Derived role ARN {} from {}", role_arn, settings.role_arn);

        Ok(Self {
            base_role_arn: role_arn_base(&settings.role_arn).to_string(),
            role_arn,
            session_name: settings.role_session_name.clone(),
            source_profile: settings.source_profile.clone(),
        })
    }
}

/// Short-lived named profile handed to the credential provider chain.
///
/// Rewritten on every role-assuming run and never removed. Two concurrent
/// runs by the same user race on the file; nothing guards against that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemeralProfile {
    pub name: String,
    pub role_arn: String,
    pub role_session_name: String,
    pub source_profile: String,
    pub alias: String,
}

impl From<&RoleAssumptionDescriptor> for EphemeralProfile {
    fn from(descriptor: &RoleAssumptionDescriptor) -> Self {
        Self {
            name: EPHEMERAL_PROFILE_NAME.to_string(),
            role_arn: descriptor.role_arn.clone(),
            role_session_name: descriptor.session_name.clone(),
            source_profile: descriptor.source_profile.clone(),
            alias: EPHEMERAL_PROFILE_NAME.to_string(),
        }
    }
}

impl EphemeralProfile {
    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some(self.name.as_str()))
            .set("role_arn", &self.role_arn)
            .set("role_session_name", &self.role_session_name)
            .set("source_profile", &self.source_profile)
            .set("alias", &self.alias);
        ini
    }

    /// Replace whatever is at `path` with this profile, readable by the owner only.
    pub async fn write(&self, path: &Path) -> Result<()> {
        let write_failed = |source: std::io::Error| RdsAuthError::EphemeralProfileWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(write_failed)?;
        }

        self.to_ini().write_to_file(path).map_err(write_failed)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = fs::metadata(path).await.map_err(write_failed)?.permissions();
            permissions.set_mode(0o600);
            fs::set_permissions(path, permissions)
                .await
                .map_err(write_failed)?;
        }

        info!("Temporary profile '{}' written to {}", self.name, path.display());
        Ok(())
    }

    /// Read a profile named `name` back from `path`.
    pub fn load(path: &Path, name: &str) -> Result<Option<Self>> {
        let ini = Ini::load_from_file(path).map_err(|e| RdsAuthError::ConfigFileUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(ini.section(Some(name)).map(|section| {
            let field = |key: &str| section.get(key).unwrap_or("").to_string();
            Self {
                name: name.to_string(),
                role_arn: field("role_arn"),
                role_session_name: field("role_session_name"),
                source_profile: field("source_profile"),
                alias: field("alias"),
            }
        }))
    }
}
