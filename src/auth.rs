use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CidagError, Result};

/// A GitLab personal access token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads a token file, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds only whitespace.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let token = content.trim();
        if token.is_empty() {
            return Err(CidagError::Config(format!(
                "Token file {} is empty",
                path.display()
            )));
        }
        Ok(Self(token.to_string()))
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// `$XDG_CONFIG_HOME/gitlab-token` (or the platform equivalent).
pub fn default_token_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gitlab-token"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_and_trims_token_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  glpat-secret  ").unwrap();

        let token = Token::from_file(file.path()).unwrap();

        assert_eq!(token.as_str(), "glpat-secret");
    }

    #[test]
    fn empty_token_file_is_rejected() {
        let file = NamedTempFile::new().unwrap();

        assert!(Token::from_file(file.path()).is_err());
    }

    #[test]
    fn missing_token_file_is_an_io_error() {
        let result = Token::from_file(Path::new("/nonexistent/gitlab-token"));

        assert!(matches!(result, Err(CidagError::Io(_))));
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let token = Token::from("glpat-secret");

        assert!(!format!("{token:?}").contains("secret"));
    }
}
