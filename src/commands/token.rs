use clap::Args;
use colored::Colorize;
use std::fmt;
use tracing::{debug, info};

use crate::{
    aws::{
        AuthToken, CredentialResolver, EphemeralProfile, RdsTokenSigner,
        RoleAssumptionDescriptor, TokenIssuer, TokenSigner, token::effective_username,
    },
    config::{EnvironmentProfile, RoleSettings, Settings},
    constants::DEFAULT_ENVIRONMENT,
    error::Result,
    sink::{ResultSink, TerminalSink},
};

#[derive(Debug, Clone, Args)]
pub struct TokenCommand {
    #[arg(
        short = 'e',
        long = "env",
        default_value = DEFAULT_ENVIRONMENT,
        help = "Config environment"
    )]
    pub environment: String,

    #[arg(short = 'w', long = "write", help = "Login with write permissions user")]
    pub write: bool,

    #[arg(long, help = "Print the token without copying it to the clipboard")]
    pub no_clipboard: bool,
}

/// Progress of one run; any stage can end the run with an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    ConfigLoaded,
    RoleSynthesized,
    DirectProfile,
    CredentialResolved,
    TokenIssued,
    Delivered,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::ConfigLoaded => "config loaded",
            Self::RoleSynthesized => "role synthesized",
            Self::DirectProfile => "direct profile",
            Self::CredentialResolved => "credential resolved",
            Self::TokenIssued => "token issued",
            Self::Delivered => "delivered",
        };
        f.write_str(name)
    }
}

fn enter(stage: Stage) {
    debug!("Stage: {}", stage);
}

/// Result of the pipeline before delivery
#[derive(Debug)]
pub struct IssuedToken {
    pub profile_name: String,
    pub ephemeral_profile: Option<EphemeralProfile>,
    pub token: AuthToken,
}

impl TokenCommand {
    pub async fn execute(self, settings: &Settings) -> Result<()> {
        let issuer = TokenIssuer::new(RdsTokenSigner);
        let sink = TerminalSink {
            copy_to_clipboard: !self.no_clipboard,
        };

        let issued = self.issue(settings, &issuer).await?;
        sink.deliver(&issued.token).await;
        enter(Stage::Delivered);
        Ok(())
    }

    /// Load the environment, synthesize the role profile when one is
    /// configured, resolve credentials and sign the token.
    pub async fn issue<S: TokenSigner>(
        &self,
        settings: &Settings,
        issuer: &TokenIssuer<S>,
    ) -> Result<IssuedToken> {
        enter(Stage::Start);
        info!("Loading environment: {}", self.environment);

        let env = EnvironmentProfile::load(&self.environment, &settings.rdsauth_config_path)?;
        let role = RoleSettings::load(&self.environment, &settings.aws_credentials_path)?;
        enter(Stage::ConfigLoaded);

        CredentialResolver::check_region(&self.environment, &env.region)?;

        let (profile_name, ephemeral_profile) = if role.requires_role() {
            let descriptor = RoleAssumptionDescriptor::derive(&env.username, &role)?;
            println!("{}", descriptor.role_arn.cyan());

            let profile = EphemeralProfile::from(&descriptor);
            profile.write(&settings.ephemeral_profile_path).await?;
            enter(Stage::RoleSynthesized);
            (profile.name.clone(), Some(profile))
        } else {
            println!("{}", format!("Profile: {}", self.environment).cyan());
            enter(Stage::DirectProfile);
            (self.environment.clone(), None)
        };

        let ephemeral_path = ephemeral_profile
            .as_ref()
            .map(|_| settings.ephemeral_profile_path.as_path());
        let context = CredentialResolver::from_settings(settings, ephemeral_path).resolve(
            &self.environment,
            &env.region,
            &profile_name,
        )?;
        println!("{}", format!("Running in region: {}", context.region).cyan());
        enter(Stage::CredentialResolved);

        println!(
            "{}",
            format!(
                "Fetching token for user: {}",
                effective_username(&env.username, self.write)
            )
            .cyan()
        );
        let token = issuer
            .issue(
                &context,
                &env.database,
                &env.region,
                &env.username,
                self.write,
            )
            .await?;
        enter(Stage::TokenIssued);

        Ok(IssuedToken {
            profile_name,
            ephemeral_profile,
            token,
        })
    }
}
