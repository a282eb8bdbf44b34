use anyhow::Context;
use std::io::{BufRead, IsTerminal, Write};

use crate::config::Config;
use crate::credentials::{Credential, CredentialFile, looks_like_base64_credentials, mask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    Saved,
    Cancelled,
}

pub fn cmd_setup(config: &Config) -> anyhow::Result<()> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("Setup is interactive; run it from a terminal");
    }

    let file = CredentialFile::new(config.credentials.resolved_config_file());
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut stderr = std::io::stderr();

    let mut read_secret = |prompt: &str| rpassword::prompt_password(prompt);

    if run_setup(&file, &mut input, &mut stderr, &mut read_secret)? == SetupOutcome::Saved {
        eprintln!("You can now run research without passing credentials:");
        eprintln!("  keyscout research \"your topic\" --limit 5");
    }
    Ok(())
}

/// Walks the user through storing a credential. The key is read through
/// `read_secret` so it never echoes, and only a masked prefix is shown back.
/// Yes/no answers come from `input`.
pub fn run_setup<R, W, S>(
    file: &CredentialFile,
    input: &mut R,
    out: &mut W,
    read_secret: &mut S,
) -> anyhow::Result<SetupOutcome>
where
    R: BufRead,
    W: Write,
    S: FnMut(&str) -> std::io::Result<String>,
{
    writeln!(out, "{:=<60}", "")?;
    writeln!(out, "DataForSEO API Credential Setup")?;
    writeln!(out, "{:=<60}\n", "")?;
    writeln!(out, "Credentials will be stored at:")?;
    writeln!(out, "  {}\n", file.path().display())?;

    if file.exists() {
        writeln!(out, "⚠ Credential file already exists!")?;
        if let Ok(Some(existing)) = file.read_api_key() {
            writeln!(out, "Current API key: {}", mask(&existing))?;
        }
        if !confirm(input, out, "Overwrite? (y/N): ")? {
            writeln!(out, "Cancelled.")?;
            return Ok(SetupOutcome::Cancelled);
        }
        writeln!(out)?;
    }

    writeln!(out, "Enter your DataForSEO API credentials:")?;
    writeln!(out, "Format options:")?;
    writeln!(out, "  1. Plain text: login:password")?;
    writeln!(out, "  2. Base64-encoded: [base64 string from DataForSEO]")?;
    writeln!(out, "Example: username@example.com:your_password\n")?;

    out.flush()?;
    let api_key = read_secret("API Key: ")?.trim().to_string();
    if api_key.is_empty() {
        writeln!(out, "No API key provided. Cancelled.")?;
        return Ok(SetupOutcome::Cancelled);
    }

    match Credential::parse(&api_key) {
        Ok(credential) => {
            if looks_like_base64_credentials(&api_key) {
                writeln!(out, "✓ Detected Base64-encoded credentials")?;
            }
            writeln!(out, "  Login: {}", credential.masked_login())?;
        }
        Err(_) => {
            writeln!(
                out,
                "⚠ Warning: API key should be in format 'login:password' or Base64-encoded"
            )?;
            if !confirm(input, out, "Continue anyway? (y/N): ")? {
                writeln!(out, "Cancelled.")?;
                return Ok(SetupOutcome::Cancelled);
            }
        }
    }

    file.write_api_key(&api_key)
        .with_context(|| format!("Failed to write {}", file.path().display()))?;

    writeln!(out, "\n✓ Credential file created successfully!")?;
    writeln!(out, "  Location: {}", file.path().display())?;
    Ok(SetupOutcome::Saved)
}

fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, text: &str) -> anyhow::Result<String> {
    write!(out, "{text}")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W, text: &str) -> anyhow::Result<bool> {
    let answer = prompt(input, out, text)?.to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn setup(file: &CredentialFile, key: &str, answers: &str) -> (SetupOutcome, String) {
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut out = Vec::new();
        let mut prompts = Vec::new();
        let mut read_secret = |prompt: &str| {
            prompts.push(prompt.to_string());
            Ok::<_, std::io::Error>(key.to_string())
        };

        let outcome = run_setup(file, &mut input, &mut out, &mut read_secret).unwrap();
        let transcript = String::from_utf8(out).unwrap();
        if outcome == SetupOutcome::Saved {
            assert_eq!(prompts, vec!["API Key: ".to_string()]);
        }
        (outcome, transcript)
    }

    #[test]
    fn test_saves_plain_credential() {
        let dir = TempDir::new().unwrap();
        let file = CredentialFile::new(dir.path().join("config.json"));

        let (outcome, transcript) = setup(&file, "someone@example.com:secret", "");
        assert_eq!(outcome, SetupOutcome::Saved);
        assert_eq!(
            file.read_api_key().unwrap().as_deref(),
            Some("someone@example.com:secret")
        );
        assert!(!transcript.contains("secret"));
    }

    #[test]
    fn test_key_is_read_through_secret_reader() {
        let dir = TempDir::new().unwrap();
        let file = CredentialFile::new(dir.path().join("config.json"));

        // a key typed on the visible input must not be picked up
        let (outcome, _) = setup(&file, "", "visible:typed\n");
        assert_eq!(outcome, SetupOutcome::Cancelled);
        assert!(!file.exists());
    }

    #[test]
    fn test_detects_base64() {
        let dir = TempDir::new().unwrap();
        let file = CredentialFile::new(dir.path().join("config.json"));

        // "user@example.com:pw"
        let (outcome, transcript) = setup(&file, "dXNlckBleGFtcGxlLmNvbTpwdw==", "");
        assert_eq!(outcome, SetupOutcome::Saved);
        assert!(transcript.contains("Detected Base64-encoded credentials"));
    }

    #[test]
    fn test_empty_key_cancels() {
        let dir = TempDir::new().unwrap();
        let file = CredentialFile::new(dir.path().join("config.json"));

        let (outcome, _) = setup(&file, "  ", "");
        assert_eq!(outcome, SetupOutcome::Cancelled);
        assert!(!file.exists());
    }

    #[test]
    fn test_malformed_key_needs_confirmation() {
        let dir = TempDir::new().unwrap();
        let file = CredentialFile::new(dir.path().join("config.json"));

        let (outcome, transcript) = setup(&file, "no-colon-here", "n\n");
        assert_eq!(outcome, SetupOutcome::Cancelled);
        assert!(transcript.contains("Warning"));
        assert!(!file.exists());

        let (outcome, _) = setup(&file, "no-colon-here", "y\n");
        assert_eq!(outcome, SetupOutcome::Saved);
        assert_eq!(file.read_api_key().unwrap().as_deref(), Some("no-colon-here"));
    }

    #[test]
    fn test_existing_file_is_kept_unless_confirmed() {
        let dir = TempDir::new().unwrap();
        let file = CredentialFile::new(dir.path().join("config.json"));
        file.write_api_key("old-login:old-password").unwrap();

        let (outcome, transcript) = setup(&file, "new:pass", "n\n");
        assert_eq!(outcome, SetupOutcome::Cancelled);
        assert!(transcript.contains("Current API key: old***"));
        assert!(!transcript.contains("old-password"));

        let (outcome, _) = setup(&file, "new:pass", "y\n");
        assert_eq!(outcome, SetupOutcome::Saved);
        assert_eq!(file.read_api_key().unwrap().as_deref(), Some("new:pass"));
    }
}
