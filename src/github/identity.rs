//! Identity wrappers for the pull request source.

use super::error::SourceError;

/// Organization name wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationName(String);

impl OrganizationName {
    /// Validates that the organization name is non-blank.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingOrganization`] when the supplied string
    /// is blank.
    pub fn new(value: impl AsRef<str>) -> Result<Self, SourceError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(SourceError::MissingOrganization);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the organization name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for OrganizationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Personal access token wrapper enforcing presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingToken`] when the supplied string is
    /// blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, SourceError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(SourceError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PersonalAccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}

#[cfg(test)]
mod tests {
    use super::{OrganizationName, PersonalAccessToken};
    use crate::github::error::SourceError;

    #[test]
    fn organization_name_trims_whitespace() {
        let name = OrganizationName::new("  acme  ").expect("name should be accepted");
        assert_eq!(name.as_str(), "acme");
    }

    #[test]
    fn blank_organization_name_is_rejected() {
        assert_eq!(
            OrganizationName::new("   "),
            Err(SourceError::MissingOrganization)
        );
    }

    #[test]
    fn blank_token_is_rejected() {
        assert_eq!(PersonalAccessToken::new(""), Err(SourceError::MissingToken));
    }
}
