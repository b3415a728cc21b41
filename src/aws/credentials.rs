use aws_config::{
    BehaviorVersion, Region, profile::ProfileFileCredentialsProvider,
    provider_config::ProviderConfig,
};
use aws_credential_types::provider::ProvideCredentials;
use aws_runtime::env_config::file::{EnvConfigFileKind, EnvConfigFiles};
use aws_types::SdkConfig;
use ini::Ini;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{
    config::Settings,
    error::{RdsAuthError, Result},
};

/// Shape of a profile file, which decides how sections are named
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `[name]` sections, e.g. `~/.aws/credentials`
    Credentials,
    /// `[profile name]` sections plus `[default]`, e.g. `~/.aws/config`
    Config,
}

impl From<SourceKind> for EnvConfigFileKind {
    fn from(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Credentials => EnvConfigFileKind::Credentials,
            SourceKind::Config => EnvConfigFileKind::Config,
        }
    }
}

/// One file the credential provider chain reads profiles from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSource {
    pub kind: SourceKind,
    pub path: PathBuf,
}

impl ProfileSource {
    pub fn credentials(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: SourceKind::Credentials,
            path: path.into(),
        }
    }

    pub fn config(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: SourceKind::Config,
            path: path.into(),
        }
    }

    fn section_name(&self, profile: &str) -> String {
        match self.kind {
            SourceKind::Config if profile != "default" => format!("profile {profile}"),
            _ => profile.to_string(),
        }
    }

    /// Whether this file defines `profile`. A file that does not exist
    /// defines nothing; one that exists but cannot be parsed is an error.
    pub fn defines(&self, profile: &str) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }

        let ini = Ini::load_from_file(&self.path).map_err(|e| {
            RdsAuthError::CredentialResolutionFailed {
                profile: profile.to_string(),
                reason: format!("failed to parse {}: {e}", self.path.display()),
            }
        })?;

        Ok(ini.section(Some(self.section_name(profile))).is_some())
    }
}

/// Selects a profile across an ordered list of sources, highest priority first
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    sources: Vec<ProfileSource>,
}

impl CredentialResolver {
    pub fn new(sources: Vec<ProfileSource>) -> Self {
        Self { sources }
    }

    /// Standard chain for a run. The ephemeral profile file only takes part
    /// when this run wrote it, and then it outranks the user's files.
    pub fn from_settings(settings: &Settings, ephemeral: Option<&Path>) -> Self {
        let mut sources = Vec::with_capacity(3);
        if let Some(path) = ephemeral {
            sources.push(ProfileSource::credentials(path));
        }
        sources.push(ProfileSource::credentials(&settings.aws_credentials_path));
        sources.push(ProfileSource::config(&settings.aws_config_path));
        Self::new(sources)
    }

    pub fn sources(&self) -> &[ProfileSource] {
        &self.sources
    }

    /// First source defining `profile`; that source wins over the others.
    pub fn locate(&self, profile: &str) -> Result<Option<&ProfileSource>> {
        for source in &self.sources {
            if source.defines(profile)? {
                return Ok(Some(source));
            }
        }
        Ok(None)
    }

    /// An empty region after a successful config load means the environment
    /// section does not exist.
    pub fn check_region(environment: &str, region: &str) -> Result<()> {
        if region.is_empty() {
            return Err(RdsAuthError::EnvironmentNotFound {
                environment: environment.to_string(),
            });
        }
        Ok(())
    }

    pub fn resolve(
        &self,
        environment: &str,
        region: &str,
        profile: &str,
    ) -> Result<ResolvedCredentialContext> {
        Self::check_region(environment, region)?;

        let source = self.locate(profile)?.ok_or_else(|| {
            let searched = self
                .sources
                .iter()
                .map(|s| s.path.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            RdsAuthError::CredentialResolutionFailed {
                profile: profile.to_string(),
                reason: format!("profile not found in any of: {searched}"),
            }
        })?;
        debug!("Profile '{}' supplied by {}", profile, source.path.display());

        Ok(ResolvedCredentialContext {
            region: region.to_string(),
            profile_name: profile.to_string(),
            sources: self.sources.clone(),
        })
    }
}

/// Region, profile and provider sources the token is signed with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredentialContext {
    pub region: String,
    pub profile_name: String,
    pub sources: Vec<ProfileSource>,
}

impl ResolvedCredentialContext {
    /// Profile files in the order the SDK merges them. Later files override
    /// earlier ones, so the highest priority source goes last.
    pub fn profile_files(&self) -> EnvConfigFiles {
        self.sources
            .iter()
            .rev()
            .filter(|source| source.path.exists())
            .fold(EnvConfigFiles::builder(), |builder, source| {
                builder.with_file(source.kind.into(), &source.path)
            })
            .build()
    }

    /// Build the SDK configuration and make sure the selected profile
    /// actually yields credentials. Credentials come only from the profile
    /// sources, never from environment variables or instance metadata.
    pub async fn load_sdk_config(&self) -> Result<SdkConfig> {
        let region = Region::new(self.region.clone());

        let provider = ProfileFileCredentialsProvider::builder()
            .configure(&ProviderConfig::without_region().with_region(Some(region.clone())))
            .profile_files(self.profile_files())
            .profile_name(&self.profile_name)
            .build();

        provider
            .provide_credentials()
            .await
            .map_err(|e| RdsAuthError::CredentialResolutionFailed {
                profile: self.profile_name.clone(),
                reason: e.to_string(),
            })?;

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .profile_files(self.profile_files())
            .profile_name(&self.profile_name)
            .credentials_provider(provider)
            .load()
            .await;

        info!(
            "Loaded AWS configuration for profile '{}' in {}",
            self.profile_name, self.region
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_empty_region_is_environment_not_found() {
        let dir = TempDir::new().unwrap();
        let creds = write_file(&dir, "credentials", "[dev]\naws_access_key_id = AKID\n");
        let resolver = CredentialResolver::new(vec![ProfileSource::credentials(creds)]);

        let err = resolver.resolve("nope", "", "dev").unwrap_err();
        match err {
            RdsAuthError::EnvironmentNotFound { environment } => assert_eq!(environment, "nope"),
            other => panic!("Expected EnvironmentNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_ephemeral_source_wins_over_default_credentials() {
        let dir = TempDir::new().unwrap();
        let ephemeral = write_file(
            &dir,
            "rdsauthcredentials",
            "[rdsauth]\nrole_arn = arn:aws:iam::123:role/RDS_lice\n",
        );
        let creds = write_file(
            &dir,
            "credentials",
            "[rdsauth]\nrole_arn = arn:aws:iam::123:role/Stale\n",
        );

        let resolver = CredentialResolver::new(vec![
            ProfileSource::credentials(&ephemeral),
            ProfileSource::credentials(&creds),
        ]);
        let winner = resolver.locate("rdsauth").unwrap().unwrap();
        assert_eq!(winner.path, ephemeral);

        let context = resolver.resolve("dev", "us-east-1", "rdsauth").unwrap();
        assert_eq!(context.sources[0].path, ephemeral);
    }

    #[test]
    fn test_falls_through_to_later_sources() {
        let dir = TempDir::new().unwrap();
        let ephemeral = dir.path().join("rdsauthcredentials");
        let creds = write_file(&dir, "credentials", "[dev]\naws_access_key_id = AKID\n");

        let resolver = CredentialResolver::new(vec![
            ProfileSource::credentials(&ephemeral),
            ProfileSource::credentials(&creds),
        ]);
        let winner = resolver.locate("dev").unwrap().unwrap();
        assert_eq!(winner.path, creds);
    }

    #[test]
    fn test_config_file_profile_sections() {
        let dir = TempDir::new().unwrap();
        let config = write_file(
            &dir,
            "config",
            "[default]\nregion = us-east-1\n\n[profile dev]\nregion = eu-west-1\n",
        );
        let source = ProfileSource::config(config);

        assert!(source.defines("dev").unwrap());
        assert!(source.defines("default").unwrap());
        assert!(!source.defines("prod").unwrap());
    }

    #[test]
    fn test_unknown_profile_fails() {
        let dir = TempDir::new().unwrap();
        let creds = write_file(&dir, "credentials", "[dev]\naws_access_key_id = AKID\n");
        let resolver = CredentialResolver::new(vec![ProfileSource::credentials(creds)]);

        let result = resolver.resolve("prod", "us-east-1", "prod");
        assert!(matches!(
            result,
            Err(RdsAuthError::CredentialResolutionFailed { .. })
        ));
    }

    #[test]
    fn test_malformed_source_fails() {
        let dir = TempDir::new().unwrap();
        let creds = write_file(&dir, "credentials", "[dev\naws_access_key_id = AKID\n");
        let resolver = CredentialResolver::new(vec![ProfileSource::credentials(creds)]);

        let result = resolver.resolve("dev", "us-east-1", "dev");
        assert!(matches!(
            result,
            Err(RdsAuthError::CredentialResolutionFailed { .. })
        ));
    }

    #[test]
    fn test_from_settings_orders_ephemeral_first() {
        let settings = Settings::for_home(Path::new("/home/alice"));
        let ephemeral = PathBuf::from("/tmp/rdsauthcredentials");

        let resolver = CredentialResolver::from_settings(&settings, Some(&ephemeral));
        let paths: Vec<&Path> = resolver.sources().iter().map(|s| s.path.as_path()).collect();
        assert_eq!(
            paths,
            vec![
                Path::new("/tmp/rdsauthcredentials"),
                Path::new("/home/alice/.aws/credentials"),
                Path::new("/home/alice/.aws/config"),
            ]
        );

        let resolver = CredentialResolver::from_settings(&settings, None);
        assert_eq!(resolver.sources().len(), 2);
        assert_eq!(resolver.sources()[0].kind, SourceKind::Credentials);
        assert_eq!(
            resolver.sources()[0].path,
            PathBuf::from("/home/alice/.aws/credentials")
        );
    }

    #[tokio::test]
    async fn test_load_sdk_config_uses_region_and_profile() {
        let dir = TempDir::new().unwrap();
        let creds = write_file(
            &dir,
            "credentials",
            "[dev]\naws_access_key_id = AKIDEXAMPLE\naws_secret_access_key = secret\n",
        );
        let resolver = CredentialResolver::new(vec![ProfileSource::credentials(creds)]);
        let context = resolver.resolve("dev", "eu-central-1", "dev").unwrap();

        let config = context.load_sdk_config().await.unwrap();
        assert_eq!(config.region().map(|r| r.as_ref()), Some("eu-central-1"));
        assert!(config.credentials_provider().is_some());
    }

    #[tokio::test]
    async fn test_profile_without_credentials_fails_resolution() {
        let dir = TempDir::new().unwrap();
        let config = write_file(&dir, "config", "[profile dev]\nregion = us-east-1\n");
        let resolver = CredentialResolver::new(vec![ProfileSource::config(config)]);
        let context = resolver.resolve("dev", "us-east-1", "dev").unwrap();

        let err = context.load_sdk_config().await.unwrap_err();
        match err {
            RdsAuthError::CredentialResolutionFailed { profile, .. } => assert_eq!(profile, "dev"),
            other => panic!("Expected CredentialResolutionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sdk_loads_ephemeral_credentials_over_default() {
        let dir = TempDir::new().unwrap();
        let ephemeral = write_file(
            &dir,
            "rdsauthcredentials",
            "[rdsauth]\naws_access_key_id = EPHEMERAL\naws_secret_access_key = ephemeral-secret\n",
        );
        let creds = write_file(
            &dir,
            "credentials",
            "[rdsauth]\naws_access_key_id = DEFAULT\naws_secret_access_key = default-secret\n",
        );
        let resolver = CredentialResolver::new(vec![
            ProfileSource::credentials(&ephemeral),
            ProfileSource::credentials(&creds),
        ]);
        let context = resolver.resolve("dev", "us-east-1", "rdsauth").unwrap();

        let config = context.load_sdk_config().await.unwrap();
        let credentials = config
            .credentials_provider()
            .unwrap()
            .provide_credentials()
            .await
            .unwrap();
        assert_eq!(credentials.access_key_id(), "EPHEMERAL");
        assert_eq!(credentials.secret_access_key(), "ephemeral-secret");
    }
}
