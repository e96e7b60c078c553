//! Identity wrappers for the project being scored.

use std::fmt;

use url::Url;

use super::error::UpvoteError;

/// Default endpoint for github.com.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Organisation login wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationLogin(String);

impl OrganizationLogin {
    /// Validates that the login is non-empty after trimming.
    ///
    /// # Errors
    ///
    /// Returns [`UpvoteError::Configuration`] when the login is blank.
    pub fn new(value: &str) -> Result<Self, UpvoteError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(UpvoteError::Configuration {
                message: "organization login must not be blank".to_owned(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the login value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Project (v2) number within an organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectNumber(u32);

impl ProjectNumber {
    /// Validates that the project number is positive.
    ///
    /// # Errors
    ///
    /// Returns [`UpvoteError::Configuration`] when the number is zero.
    pub fn new(value: u32) -> Result<Self, UpvoteError> {
        if value == 0 {
            return Err(UpvoteError::Configuration {
                message: "project number must be a positive integer".to_owned(),
            });
        }
        Ok(Self(value))
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

macro_rules! node_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a GraphQL node identifier.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier.
            #[must_use]
            pub const fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }
    };
}

node_id!(
    /// GraphQL node identifier of a Project (v2).
    ProjectId
);
node_id!(
    /// GraphQL node identifier of a Project (v2) custom field.
    FieldId
);
node_id!(
    /// GraphQL node identifier of a Project (v2) item.
    ProjectItemId
);

/// Personal access token wrapper enforcing presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns `UpvoteError::MissingToken` when the supplied string is blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, UpvoteError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UpvoteError::MissingToken);
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

/// Normalises a configured API base, mapping the github.com web host onto
/// its API host.
fn normalise_api_base(input: &str) -> Result<Url, UpvoteError> {
    let parsed = Url::parse(input).map_err(|error| UpvoteError::InvalidUrl(error.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| UpvoteError::InvalidUrl("URL must include a host".to_owned()))?;

    if host.eq_ignore_ascii_case("github.com") {
        return Url::parse(DEFAULT_API_BASE)
            .map_err(|error| UpvoteError::InvalidUrl(error.to_string()));
    }
    Ok(parsed)
}

/// The organisation project targeted by a run, plus the API base to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLocator {
    api_base: Url,
    organization: OrganizationLogin,
    number: ProjectNumber,
}

impl ProjectLocator {
    /// Builds a locator from validated parts and a raw API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`UpvoteError::InvalidUrl`] when the API base cannot be parsed.
    pub fn new(
        api_base: &str,
        organization: OrganizationLogin,
        number: ProjectNumber,
    ) -> Result<Self, UpvoteError> {
        Ok(Self {
            api_base: normalise_api_base(api_base)?,
            organization,
            number,
        })
    }

    /// API base URL the GraphQL endpoint hangs off.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Organisation owning the project.
    #[must_use]
    pub const fn organization(&self) -> &OrganizationLogin {
        &self.organization
    }

    /// Project number within the organisation.
    #[must_use]
    pub const fn number(&self) -> ProjectNumber {
        self.number
    }
}
