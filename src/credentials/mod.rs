//! Provider credential resolution.
//!
//! Credentials come from an ordered list of [`CredentialSource`]s. The first
//! source that yields a value wins; a source with nothing to offer passes to
//! the next one. Running out of sources is not an error, it only means the
//! engine runs in heuristic mode.

pub mod file;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use std::fmt;
use std::io::{IsTerminal, Write};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CredentialsConfig;
pub use file::{CredentialFile, StoredCredential};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("credential must be in 'login:password' form (plain or Base64-encoded)")]
    Malformed,

    #[error("could not read credential file {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("credential prompt failed: {0}")]
    Prompt(String),
}

/// Where a credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialOrigin {
    Explicit,
    Environment,
    ConfigFile,
    Prompt,
}

impl fmt::Display for CredentialOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Explicit => "command-line override",
            Self::Environment => "environment variable",
            Self::ConfigFile => "config file",
            Self::Prompt => "interactive prompt",
        };
        f.write_str(s)
    }
}

/// A `login:password` pair for HTTP Basic auth.
///
/// `Debug` never prints the password and only a prefix of the login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    login: String,
    password: String,
}

impl Credential {
    /// Parses a raw credential, decoding Base64 transparently.
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let decoded = decode_base64_credentials(raw);
        let (login, password) = split_pair(&decoded).ok_or(CredentialError::Malformed)?;

        Ok(Self {
            login: login.to_string(),
            password: password.to_string(),
        })
    }

    #[must_use]
    pub fn login(&self) -> &str {
        &self.login
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[must_use]
    pub fn masked_login(&self) -> String {
        mask(&self.login)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("login", &self.masked_login())
            .field("password", &"<redacted>")
            .finish()
    }
}

fn split_pair(value: &str) -> Option<(&str, &str)> {
    let (login, password) = value.split_once(':')?;
    let login = login.trim();
    if login.is_empty() || password.is_empty() || value.chars().any(char::is_control) {
        return None;
    }
    Some((login, password))
}

/// Decodes a Base64 credential when the decoded text looks like
/// `login:password`; anything else is returned trimmed and unchanged.
#[must_use]
pub fn decode_base64_credentials(raw: &str) -> String {
    let trimmed = raw.trim();

    BASE64
        .decode(trimmed)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|decoded| split_pair(decoded).is_some())
        .unwrap_or_else(|| trimmed.to_string())
}

#[must_use]
pub fn looks_like_base64_credentials(raw: &str) -> bool {
    let trimmed = raw.trim();
    decode_base64_credentials(trimmed) != trimmed
}

/// Shows at most the first few characters of a secret.
#[must_use]
pub fn mask(value: &str) -> String {
    let visible: String = value.chars().take(3).collect();
    if value.chars().count() > 3 {
        format!("{visible}***")
    } else {
        "***".to_string()
    }
}

/// One step of the resolution chain.
pub trait CredentialSource {
    fn origin(&self) -> CredentialOrigin;

    /// `Ok(None)` hands over to the next source.
    fn lookup(&self) -> Result<Option<String>, CredentialError>;
}

/// Value passed explicitly by the caller.
pub struct ExplicitSource(pub Option<String>);

impl CredentialSource for ExplicitSource {
    fn origin(&self) -> CredentialOrigin {
        CredentialOrigin::Explicit
    }

    fn lookup(&self) -> Result<Option<String>, CredentialError> {
        Ok(non_blank(self.0.clone()))
    }
}

/// Environment variable, captured when the source is built.
pub struct EnvSource {
    var: String,
    value: Option<String>,
}

impl EnvSource {
    #[must_use]
    pub fn capture(var: &str) -> Self {
        Self {
            var: var.to_string(),
            value: std::env::var(var).ok(),
        }
    }

    #[must_use]
    pub fn with_value(var: &str, value: Option<String>) -> Self {
        Self {
            var: var.to_string(),
            value,
        }
    }
}

impl CredentialSource for EnvSource {
    fn origin(&self) -> CredentialOrigin {
        CredentialOrigin::Environment
    }

    fn lookup(&self) -> Result<Option<String>, CredentialError> {
        let value = non_blank(self.value.clone());
        if value.is_some() {
            debug!(var = %self.var, "Credential present in environment");
        }
        Ok(value)
    }
}

/// The user-scoped JSON credential file.
pub struct FileSource(pub CredentialFile);

impl CredentialSource for FileSource {
    fn origin(&self) -> CredentialOrigin {
        CredentialOrigin::ConfigFile
    }

    fn lookup(&self) -> Result<Option<String>, CredentialError> {
        Ok(non_blank(self.0.read_api_key()?))
    }
}

/// Interactive prompt on the terminal, read without echo. Never fires
/// without a terminal.
pub struct PromptSource {
    pub enabled: bool,
}

impl CredentialSource for PromptSource {
    fn origin(&self) -> CredentialOrigin {
        CredentialOrigin::Prompt
    }

    fn lookup(&self) -> Result<Option<String>, CredentialError> {
        if !self.enabled || !std::io::stdin().is_terminal() {
            return Ok(None);
        }

        let mut stderr = std::io::stderr();
        stderr
            .write_all(
                b"Provider API key not found in environment or config file.\n\
                  Enter it as login:password or Base64 (empty line for heuristic mode).\n",
            )
            .and_then(|()| stderr.flush())
            .map_err(|e| CredentialError::Prompt(e.to_string()))?;

        let input = rpassword::prompt_password("API Key: ")
            .map_err(|e| CredentialError::Prompt(e.to_string()))?;

        Ok(non_blank(Some(input)))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found {
        credential: Credential,
        origin: CredentialOrigin,
    },
    /// A source produced a value that is not a usable credential.
    Rejected {
        origin: CredentialOrigin,
        error: CredentialError,
    },
    Absent,
}

/// Outcome of a resolution run, including sources that failed softly.
#[derive(Debug, Clone)]
pub struct ResolutionReport {
    pub resolution: Resolution,
    pub skipped: Vec<(CredentialOrigin, CredentialError)>,
}

pub struct CredentialResolver {
    sources: Vec<Box<dyn CredentialSource + Send + Sync>>,
}

impl CredentialResolver {
    #[must_use]
    pub fn new(sources: Vec<Box<dyn CredentialSource + Send + Sync>>) -> Self {
        Self { sources }
    }

    /// Environment, credential file, then the prompt. An explicit override
    /// passed to [`Self::resolve`] is tried before all of them.
    #[must_use]
    pub fn standard(config: &CredentialsConfig, interactive: bool) -> Self {
        Self::new(vec![
            Box::new(EnvSource::capture(&config.env_var)),
            Box::new(FileSource(CredentialFile::new(config.resolved_config_file()))),
            Box::new(PromptSource {
                enabled: interactive,
            }),
        ])
    }

    #[must_use]
    pub fn resolve(&self, explicit: Option<&str>) -> ResolutionReport {
        let mut skipped = Vec::new();
        let explicit = ExplicitSource(explicit.map(str::to_string));
        let chain = std::iter::once(&explicit as &dyn CredentialSource)
            .chain(self.sources.iter().map(|s| s.as_ref() as &dyn CredentialSource));

        for source in chain {
            let origin = source.origin();
            let raw = match source.lookup() {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(error) => {
                    warn!(%origin, %error, "Credential source failed, trying next");
                    skipped.push((origin, error));
                    continue;
                }
            };

            let resolution = match Credential::parse(&raw) {
                Ok(credential) => {
                    debug!(%origin, login = %credential.masked_login(), "Credential resolved");
                    Resolution::Found { credential, origin }
                }
                Err(error) => {
                    warn!(%origin, %error, "Credential rejected");
                    Resolution::Rejected { origin, error }
                }
            };

            return ResolutionReport {
                resolution,
                skipped,
            };
        }

        ResolutionReport {
            resolution: Resolution::Absent,
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl CredentialSource for Failing {
        fn origin(&self) -> CredentialOrigin {
            CredentialOrigin::ConfigFile
        }

        fn lookup(&self) -> Result<Option<String>, CredentialError> {
            Err(CredentialError::Unreadable {
                path: "config.json".to_string(),
                message: "bad json".to_string(),
            })
        }
    }

    fn resolver(sources: Vec<Box<dyn CredentialSource + Send + Sync>>) -> CredentialResolver {
        CredentialResolver::new(sources)
    }

    #[test]
    fn test_plain_credential_parses() {
        let credential = Credential::parse("user@example.com:secret").unwrap();
        assert_eq!(credential.login(), "user@example.com");
        assert_eq!(credential.password(), "secret");
    }

    #[test]
    fn test_password_may_contain_colon() {
        let credential = Credential::parse("user:pa:ss").unwrap();
        assert_eq!(credential.password(), "pa:ss");
    }

    #[test]
    fn test_base64_credential_is_decoded() {
        let encoded = BASE64.encode("user@example.com:secret");
        assert!(looks_like_base64_credentials(&encoded));

        let credential = Credential::parse(&encoded).unwrap();
        assert_eq!(credential.login(), "user@example.com");
        assert_eq!(credential.password(), "secret");
    }

    #[test]
    fn test_base64_without_pair_is_kept_raw() {
        let encoded = BASE64.encode("justatoken");
        assert_eq!(decode_base64_credentials(&encoded), encoded);
        assert_eq!(Credential::parse(&encoded), Err(CredentialError::Malformed));
    }

    #[test]
    fn test_malformed_credentials() {
        assert_eq!(Credential::parse("nocolon"), Err(CredentialError::Malformed));
        assert_eq!(Credential::parse(":password"), Err(CredentialError::Malformed));
        assert_eq!(Credential::parse("login:"), Err(CredentialError::Malformed));
    }

    #[test]
    fn test_debug_redacts_password() {
        let credential = Credential::parse("someone:hunter2").unwrap();
        let debug = format!("{credential:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("someone"));
        assert!(debug.contains("som***"));
    }

    #[test]
    fn test_priority_order() {
        let report = resolver(vec![
            Box::new(EnvSource::with_value("KEY", Some("env:pass".to_string()))),
            Box::new(ExplicitSource(Some("later:pass".to_string()))),
        ])
        .resolve(None);

        match report.resolution {
            Resolution::Found { credential, origin } => {
                assert_eq!(origin, CredentialOrigin::Environment);
                assert_eq!(credential.login(), "env");
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn test_explicit_wins_over_environment() {
        let report = resolver(vec![Box::new(EnvSource::with_value(
            "KEY",
            Some("env:pass".to_string()),
        ))])
        .resolve(Some("cli:pass"));

        assert!(matches!(
            report.resolution,
            Resolution::Found {
                origin: CredentialOrigin::Explicit,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_override_is_rejected_not_skipped() {
        let report = resolver(vec![Box::new(EnvSource::with_value(
            "KEY",
            Some("env:pass".to_string()),
        ))])
        .resolve(Some("garbage"));

        assert_eq!(
            report.resolution,
            Resolution::Rejected {
                origin: CredentialOrigin::Explicit,
                error: CredentialError::Malformed,
            }
        );
    }

    #[test]
    fn test_failing_source_is_skipped() {
        let report = resolver(vec![
            Box::new(Failing),
            Box::new(ExplicitSource(Some("a:b".to_string()))),
        ])
        .resolve(None);

        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(report.resolution, Resolution::Found { .. }));
    }

    #[test]
    fn test_absent_when_nothing_found() {
        let report = resolver(vec![
            Box::new(EnvSource::with_value("KEY", None)),
            Box::new(PromptSource { enabled: false }),
        ])
        .resolve(Some("   "));

        assert_eq!(report.resolution, Resolution::Absent);
        assert!(report.skipped.is_empty());
    }
}
