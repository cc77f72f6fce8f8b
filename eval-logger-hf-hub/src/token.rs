//! Resolution of the access token.
use crate::HfHubError;
use std::{env, fs, path::PathBuf};

/// Location of the token file written by `huggingface-cli login`.
fn token_file(hf_home: Option<PathBuf>, home: Option<PathBuf>) -> Option<PathBuf> {
    hf_home
        .or_else(|| home.map(|h| h.join(".cache").join("huggingface")))
        .map(|d| d.join("token"))
}

fn resolve(
    env_token: Option<String>,
    hf_home: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Result<String, HfHubError> {
    if let Some(token) = env_token.filter(|t| !t.trim().is_empty()) {
        return Ok(token.trim().to_string());
    }
    let path = token_file(hf_home, home);
    let token = path
        .as_ref()
        .and_then(|p| fs::read_to_string(p).ok())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    token.ok_or(HfHubError::MissingToken(path))
}

/// Reads the token from `HF_TOKEN`, then from `$HF_HOME/token`
/// (`~/.cache/huggingface/token` by default).
pub fn resolve_token() -> Result<String, HfHubError> {
    resolve(
        env::var("HF_TOKEN").ok(),
        env::var_os("HF_HOME").map(PathBuf::from),
        dirs::home_dir(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempdir::TempDir;

    #[test]
    fn test_env_token_comes_first() -> anyhow::Result<()> {
        let dir = TempDir::new("hf_home")?;
        fs::File::create(dir.path().join("token"))?.write_all(b"hf_file\n")?;

        let token = resolve(Some("hf_env".into()), Some(dir.path().into()), None)?;
        assert_eq!(token, "hf_env");

        let token = resolve(None, Some(dir.path().into()), None)?;
        assert_eq!(token, "hf_file");
        Ok(())
    }

    #[test]
    fn test_default_token_file_under_home() -> anyhow::Result<()> {
        let home = TempDir::new("home")?;
        let dir = home.path().join(".cache").join("huggingface");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("token"), "hf_home_token")?;

        assert_eq!(resolve(None, None, Some(home.path().into()))?, "hf_home_token");
        Ok(())
    }

    #[test]
    fn test_missing_token() {
        let home = TempDir::new("home").unwrap();
        let err = resolve(Some(" ".into()), None, Some(home.path().into())).unwrap_err();
        assert!(matches!(err, HfHubError::MissingToken(Some(_))));
    }
}
