use std::fmt;

/// A validated host name used as the registry key, the vhost file name and
/// the `server_name` of the rendered config.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomainName(String);

#[derive(Debug, thiserror::Error)]
pub enum DomainNameError {
    #[error("Domain name cannot be empty")]
    Empty,

    #[error("Domain name too long ({0} characters, max 253)")]
    TooLong(usize),

    #[error("Domain name contains a path separator or traversal: {0}")]
    PathTraversal(String),

    #[error("Domain name contains invalid characters: {0}")]
    InvalidCharacters(String),

    #[error("Domain name has an empty or malformed label: {0}")]
    InvalidLabel(String),
}

impl DomainName {
    pub fn new(name: impl Into<String>) -> Result<Self, DomainNameError> {
        let name = name.into().trim().to_lowercase();

        if name.is_empty() {
            return Err(DomainNameError::Empty);
        }

        if name.len() > 253 {
            return Err(DomainNameError::TooLong(name.len()));
        }

        // The name becomes a file name under sites-available and sites-enabled
        if name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(DomainNameError::PathTraversal(name));
        }

        // Anything else (spaces, quotes, braces, semicolons) could inject nginx directives
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
        {
            return Err(DomainNameError::InvalidCharacters(name));
        }

        let labels_ok = name.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
        });
        if !labels_ok {
            return Err(DomainNameError::InvalidLabel(name));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DomainName {
    type Err = DomainNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
