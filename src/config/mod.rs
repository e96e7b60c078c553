//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.upvotes.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `UPVOTES_ORGANIZATION`, `UPVOTES_TOKEN`,
//!    and so on, plus `GITHUB_TOKEN` and `GITHUB_OUTPUT` as fallbacks
//! 4. **Command-line arguments** – `--organization`/`-o`, `--token`/`-t`, ...
//!
//! # Configuration File
//!
//! ```toml
//! organization = "octo-org"
//! project_number = 7
//! field_name = "Upvotes"
//! page_size = 20
//! concurrency = true
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::github::cursor::OuterCursor;
use crate::github::error::UpvoteError;
use crate::github::locator::{
    DEFAULT_API_BASE, FieldId, OrganizationLogin, PersonalAccessToken, ProjectId, ProjectLocator,
    ProjectNumber,
};
use crate::github::rate_limit::DEFAULT_RESERVE_FLOOR;
use crate::upvotes::{DEFAULT_MUTATION_DELAY_MS, DEFAULT_PAGE_SIZE, RunSettings};

/// Name of the number field written when none is configured.
pub const DEFAULT_FIELD_NAME: &str = "Upvotes";

/// Largest page the GraphQL API accepts.
pub const MAX_PAGE_SIZE: u8 = 100;

/// Configuration for an upvote run.
///
/// # Example
///
/// ```no_run
/// use github_upvotes::UpvotesConfig;
/// use ortho_config::OrthoConfig;
///
/// let config = UpvotesConfig::load().expect("failed to load configuration");
/// config.validate().expect("configuration should be complete");
/// let locator = config.locator().expect("locator should build");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "UPVOTES",
    discovery(
        dotfile_name = ".upvotes.toml",
        config_file_name = "upvotes.toml",
        app_name = "upvotes"
    )
)]
pub struct UpvotesConfig {
    /// Login of the organisation owning the project.
    ///
    /// Can be provided via:
    /// - CLI: `--organization <LOGIN>` or `-o <LOGIN>`
    /// - Environment: `UPVOTES_ORGANIZATION`
    /// - Config file: `organization = "..."`
    #[ortho_config(cli_short = 'o')]
    pub organization: Option<String>,

    /// Project number within the organisation, as shown in its URL.
    #[ortho_config(cli_short = 'p')]
    pub project_number: Option<u32>,

    /// Project node id; looked up from the number when absent.
    #[ortho_config()]
    pub project_id: Option<String>,

    /// Name of the number field that stores scores.
    #[ortho_config(cli_short = 'f')]
    pub field_name: String,

    /// Field node id; looked up from `field_name` when absent.
    #[ortho_config()]
    pub field_id: Option<String>,

    /// Personal access token for GitHub API authentication.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `UPVOTES_TOKEN` or `GITHUB_TOKEN`
    /// - Config file: `token = "..."`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// Cursor persisted by a previous run; empty starts from the beginning.
    #[ortho_config(cli_short = 'c')]
    pub cursor: Option<String>,

    /// Writes scores back. Without it the run only logs them.
    ///
    /// Note: `UPVOTES_WRITE` is not supported because `ortho_config` does
    /// not load boolean values from the environment.
    #[ortho_config(cli_short = 'w')]
    pub write: bool,

    /// Enables debug logging and JSON run telemetry on stderr.
    #[ortho_config(cli_short = 'v')]
    pub verbose: bool,

    /// Scores the items of a page concurrently.
    #[ortho_config()]
    pub concurrency: bool,

    /// Project items fetched per page, 1 to 100.
    #[ortho_config()]
    pub page_size: u8,

    /// Rate limit points kept in reserve.
    #[ortho_config()]
    pub reserve_floor: u64,

    /// Pause after each mutation, in milliseconds.
    #[ortho_config()]
    pub mutation_delay_ms: u64,

    /// File receiving `cursor=<value>`; defaults to `GITHUB_OUTPUT`.
    #[ortho_config()]
    pub output_file: Option<String>,

    /// GitHub API base URL, for GitHub Enterprise Server.
    #[ortho_config()]
    pub api_base: String,
}

impl Default for UpvotesConfig {
    fn default() -> Self {
        Self {
            organization: None,
            project_number: None,
            project_id: None,
            field_name: DEFAULT_FIELD_NAME.to_owned(),
            field_id: None,
            token: None,
            cursor: None,
            write: false,
            verbose: false,
            concurrency: false,
            page_size: DEFAULT_PAGE_SIZE,
            reserve_floor: DEFAULT_RESERVE_FLOOR,
            mutation_delay_ms: DEFAULT_MUTATION_DELAY_MS,
            output_file: None,
            api_base: DEFAULT_API_BASE.to_owned(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|trimmed| !trimmed.is_empty())
}

impl UpvotesConfig {
    /// Resolves the token from configuration or the `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`UpvoteError::MissingToken`] when no token source provides a
    /// value.
    pub fn resolve_token(&self) -> Result<PersonalAccessToken, UpvoteError> {
        let token = self
            .token
            .clone()
            .or_else(|| env::var("GITHUB_TOKEN").ok())
            .ok_or(UpvoteError::MissingToken)?;
        PersonalAccessToken::new(token)
    }

    /// Returns the organisation login or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`UpvoteError::Configuration`] when no organisation is set.
    pub fn require_organization(&self) -> Result<OrganizationLogin, UpvoteError> {
        let login = self
            .organization
            .as_deref()
            .ok_or_else(|| UpvoteError::Configuration {
                message: "organization is required (use --organization or -o)".to_owned(),
            })?;
        OrganizationLogin::new(login)
    }

    /// Returns the project number or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`UpvoteError::Configuration`] when the number is absent or
    /// zero.
    pub fn require_project_number(&self) -> Result<ProjectNumber, UpvoteError> {
        let number = self
            .project_number
            .ok_or_else(|| UpvoteError::Configuration {
                message: "project number is required (use --project-number or -p)".to_owned(),
            })?;
        ProjectNumber::new(number)
    }

    /// Checks that the configuration describes a runnable job.
    ///
    /// # Errors
    ///
    /// Returns [`UpvoteError::Configuration`] naming the first problem found.
    pub fn validate(&self) -> Result<(), UpvoteError> {
        self.require_organization()?;
        self.require_project_number()?;

        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(UpvoteError::Configuration {
                message: format!(
                    "page size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                    self.page_size
                ),
            });
        }
        if self.field_name.trim().is_empty() {
            return Err(UpvoteError::Configuration {
                message: "field name must not be blank".to_owned(),
            });
        }
        if self.api_base.trim().is_empty() {
            return Err(UpvoteError::Configuration {
                message: "API base URL must not be blank".to_owned(),
            });
        }
        Ok(())
    }

    /// Builds the project locator from the organisation, number, and API base.
    ///
    /// # Errors
    ///
    /// Returns [`UpvoteError::Configuration`] for missing parts and
    /// [`UpvoteError::InvalidUrl`] for an unparseable API base.
    pub fn locator(&self) -> Result<ProjectLocator, UpvoteError> {
        ProjectLocator::new(
            self.api_base.trim(),
            self.require_organization()?,
            self.require_project_number()?,
        )
    }

    /// Configured project id, if any.
    #[must_use]
    pub fn project_id(&self) -> Option<ProjectId> {
        non_blank(self.project_id.as_deref()).map(ProjectId::new)
    }

    /// Configured field id, if any.
    #[must_use]
    pub fn field_id(&self) -> Option<FieldId> {
        non_blank(self.field_id.as_deref()).map(FieldId::new)
    }

    /// Trimmed name of the upvote field.
    #[must_use]
    pub fn field_name(&self) -> &str {
        self.field_name.trim()
    }

    /// Pause applied after each mutation.
    #[must_use]
    pub const fn mutation_delay(&self) -> Duration {
        Duration::from_millis(self.mutation_delay_ms)
    }

    /// Cursor output destination: `output_file`, else `GITHUB_OUTPUT`.
    #[must_use]
    pub fn output_path(&self) -> Option<PathBuf> {
        non_blank(self.output_file.as_deref())
            .map(PathBuf::from)
            .or_else(|| {
                env::var("GITHUB_OUTPUT")
                    .ok()
                    .filter(|path| !path.trim().is_empty())
                    .map(PathBuf::from)
            })
    }

    /// Settings handed to the walker.
    #[must_use]
    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            page_size: self.page_size,
            concurrency: self.concurrency,
            start: OuterCursor::resume_from(self.cursor.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests;
