//! Error handling for the scaffold installer.
//!
//! The error system is designed around two core principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! The module consists of two main types:
//! - [`ScaffoldError`] - Enumerated error types for every failure mode in the
//!   acquisition pipeline
//! - [`ErrorContext`] - Wrapper that adds user-friendly suggestions and details
//!
//! # Error Categories
//!
//! - **Catalog**: [`ScaffoldError::CatalogUnavailable`], [`ScaffoldError::CatalogCorrupt`]
//! - **Resolution**: [`ScaffoldError::VersionNotFound`]
//! - **Transfer**: [`ScaffoldError::Download`], [`ScaffoldError::Aborted`]
//! - **Extraction**: [`ScaffoldError::CorruptArchive`], [`ScaffoldError::EmptyArchive`],
//!   [`ScaffoldError::TargetNotWritable`], [`ScaffoldError::ExtractionFailed`]
//! - **Preflight**: [`ScaffoldError::PreflightFailed`]
//!
//! [`Aborted`](ScaffoldError::Aborted) is deliberately part of the same union:
//! the pipeline driver checks for it once at the top instead of threading a
//! separate cancellation channel through every stage. It is a distinct,
//! non-fatal outcome - callers render it as a cancellation, not an error.
//!
//! # Examples
//!
//! ```rust,no_run
//! use scaffold_cli::core::{ScaffoldError, user_friendly_error};
//!
//! fn lookup() -> Result<(), ScaffoldError> {
//!     Err(ScaffoldError::VersionNotFound { request: "9.0".to_string() })
//! }
//!
//! if let Err(e) = lookup() {
//!     let ctx = user_friendly_error(anyhow::Error::from(e));
//!     ctx.display(); // colored error plus the "install latest" suggestion
//! }
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for scaffold operations.
///
/// Each variant represents one failure mode of the acquisition pipeline and
/// carries enough context (requested version, attempted URL, underlying
/// cause) to render an actionable message. None of these are locally
/// recoverable: each one aborts the pipeline, triggers cleanup and surfaces
/// to the caller. Best-effort conditions (a missing `.gitignore` template,
/// an absent requirements file) never become a `ScaffoldError` - they
/// degrade to a logged skip at the call site.
#[derive(Error, Debug)]
pub enum ScaffoldError {
    /// The remote release catalog could not be fetched and no usable cache
    /// entry existed.
    #[error("Failed to download version data from {url}: {reason}")]
    CatalogUnavailable {
        /// The catalog endpoint that was contacted
        url: String,
        /// The underlying transport error
        reason: String,
    },

    /// The catalog payload (freshly fetched or cached) was not a valid
    /// release index. A corrupted cache entry is reported, never silently
    /// treated as a miss.
    #[error("Version catalog is malformed: {reason}")]
    CatalogCorrupt {
        /// Why parsing failed
        reason: String,
    },

    /// No release in the catalog satisfies the requested version, or the
    /// release archive for the requested version does not exist upstream.
    #[error("The selected version ({request}) cannot be installed because it does not exist")]
    VersionNotFound {
        /// The version request as the user typed it
        request: String,
    },

    /// Transport-level download failure (connection, HTTP status, mid-stream
    /// read error).
    #[error("There was an error downloading {url}: {reason}")]
    Download {
        /// The URL being fetched
        url: String,
        /// The underlying cause
        reason: String,
    },

    /// The user interrupted the run. Not a failure: callers report this as a
    /// cancellation and exit with code 1.
    #[error("Aborted")]
    Aborted,

    /// The downloaded archive is structurally invalid.
    #[error("The downloaded package at {path} is corrupted")]
    CorruptArchive {
        /// Path of the archive that failed to parse
        path: String,
    },

    /// The downloaded archive is zero bytes or contains no entries.
    #[error("The downloaded package at {path} is empty")]
    EmptyArchive {
        /// Path of the empty archive
        path: String,
    },

    /// The extraction destination (or its parent) is not writable.
    #[error("Not enough permissions to unpack into {path}")]
    TargetNotWritable {
        /// The directory that rejected writes
        path: String,
    },

    /// Any other unpack failure, including an extraction that reported
    /// success but wrote nothing. Callers must not assume they can
    /// distinguish further.
    #[error("Extraction failed: {reason}")]
    ExtractionFailed {
        /// The underlying cause
        reason: String,
    },

    /// A pre-network validation gate failed: the target directory already
    /// holds a project, or its parent is not writable.
    #[error("{reason}")]
    PreflightFailed {
        /// Human-readable description of the failed gate
        reason: String,
    },

    /// Configuration file problems (unreadable or malformed global config).
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// IO errors from [`std::io::Error`]
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors that don't fit other categories
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

/// Stable, data-free classification of a [`ScaffoldError`].
///
/// [`AcquisitionOutcome::Failed`](crate::pipeline::AcquisitionOutcome)
/// carries the full error; this kind exists so callers can branch on the
/// category without destructuring variant fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Catalog endpoint unreachable with no usable cache
    CatalogUnavailable,
    /// Catalog payload unparseable
    CatalogCorrupt,
    /// No matching release
    VersionNotFound,
    /// Transport-level download failure
    Download,
    /// User cancellation
    Aborted,
    /// Structurally invalid archive
    CorruptArchive,
    /// Zero-byte or entry-less archive
    EmptyArchive,
    /// Unwritable extraction destination
    TargetNotWritable,
    /// Any other unpack failure
    ExtractionFailed,
    /// Pre-network validation failure
    PreflightFailed,
    /// Everything else (IO, config, generic)
    Other,
}

impl ScaffoldError {
    /// Classify this error into its [`ErrorKind`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::CatalogUnavailable { .. } => ErrorKind::CatalogUnavailable,
            Self::CatalogCorrupt { .. } => ErrorKind::CatalogCorrupt,
            Self::VersionNotFound { .. } => ErrorKind::VersionNotFound,
            Self::Download { .. } => ErrorKind::Download,
            Self::Aborted => ErrorKind::Aborted,
            Self::CorruptArchive { .. } => ErrorKind::CorruptArchive,
            Self::EmptyArchive { .. } => ErrorKind::EmptyArchive,
            Self::TargetNotWritable { .. } => ErrorKind::TargetNotWritable,
            Self::ExtractionFailed { .. } => ErrorKind::ExtractionFailed,
            Self::PreflightFailed { .. } => ErrorKind::PreflightFailed,
            Self::ConfigError { .. } | Self::IoError(_) | Self::Other { .. } => ErrorKind::Other,
        }
    }
}

impl Clone for ScaffoldError {
    fn clone(&self) -> Self {
        match self {
            Self::CatalogUnavailable { url, reason } => Self::CatalogUnavailable {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::CatalogCorrupt { reason } => Self::CatalogCorrupt {
                reason: reason.clone(),
            },
            Self::VersionNotFound { request } => Self::VersionNotFound {
                request: request.clone(),
            },
            Self::Download { url, reason } => Self::Download {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::Aborted => Self::Aborted,
            Self::CorruptArchive { path } => Self::CorruptArchive { path: path.clone() },
            Self::EmptyArchive { path } => Self::EmptyArchive { path: path.clone() },
            Self::TargetNotWritable { path } => Self::TargetNotWritable { path: path.clone() },
            Self::ExtractionFailed { reason } => Self::ExtractionFailed {
                reason: reason.clone(),
            },
            Self::PreflightFailed { reason } => Self::PreflightFailed {
                reason: reason.clone(),
            },
            Self::ConfigError { message } => Self::ConfigError {
                message: message.clone(),
            },
            // io::Error does not implement Clone; degrade to Other
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::Other { message } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// A [`ScaffoldError`] enriched with a user-facing suggestion and details.
///
/// Suggestions are actionable steps (displayed green), details explain why
/// the error occurred (displayed yellow). This is the type `main` renders
/// just before choosing the exit code.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying scaffold error
    pub error: ScaffoldError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: ScaffoldError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add an actionable suggestion for resolving the error.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining why the error occurred.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details and suggestion to stderr with terminal
    /// colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`] with actionable
/// suggestions.
///
/// Recognizes [`ScaffoldError`] variants (attaching tailored suggestions),
/// raw [`std::io::Error`]s, and already-contextualized [`ErrorContext`]
/// values (returned untouched so command code can attach run-specific
/// suggestions that survive the trip through `anyhow`). Everything else is
/// rendered generically with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    // A context attached close to the failure site knows more than we do.
    let error = match error.downcast::<ErrorContext>() {
        Ok(ctx) => return ctx,
        Err(other) => other,
    };

    if let Some(scaffold_error) = error.downcast_ref::<ScaffoldError>() {
        return create_error_context(scaffold_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(ScaffoldError::Other {
                message: format!("Permission denied: {io_error}"),
            })
            .with_suggestion(
                "Check the ownership of the target directory or run from a writable location",
            );
        }
    }

    // Generic error - include the full chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(ScaffoldError::Other { message })
}

/// Attach the default suggestion and details for a [`ScaffoldError`].
fn create_error_context(error: ScaffoldError) -> ErrorContext {
    match &error {
        ScaffoldError::CatalogUnavailable { .. } => ErrorContext::new(error)
            .with_suggestion("Check your network connection and proxy settings, then try again")
            .with_details("The release catalog could not be reached and no cached copy was fresh"),
        ScaffoldError::CatalogCorrupt { .. } => ErrorContext::new(error)
            .with_suggestion("Try again in a minute; the cached copy expires after 60 seconds"),
        ScaffoldError::VersionNotFound { .. } => ErrorContext::new(error).with_suggestion(
            "Omit the version argument to install the latest stable release",
        ),
        ScaffoldError::Download { .. } => {
            ErrorContext::new(error).with_suggestion("Try executing the command again")
        }
        ScaffoldError::CorruptArchive { .. } | ScaffoldError::EmptyArchive { .. } => {
            ErrorContext::new(error).with_suggestion(
                "The download may have been truncated; try executing the command again",
            )
        }
        ScaffoldError::TargetNotWritable { .. } => ErrorContext::new(error)
            .with_suggestion("Check the permissions of the target directory and try again"),
        ScaffoldError::PreflightFailed { .. } => ErrorContext::new(error).with_suggestion(
            "Change the project name or create the project in another directory",
        ),
        _ => ErrorContext::new(error),
    }
}
