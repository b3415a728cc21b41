pub mod credentials;
pub mod roles;
pub mod token;

// Re-export commonly used types (functions should be accessed via module path)
pub use credentials::{CredentialResolver, ProfileSource, ResolvedCredentialContext};
pub use roles::{EphemeralProfile, RoleAssumptionDescriptor};
pub use token::{AuthToken, RdsTokenSigner, TokenIssuer, TokenSigner};
