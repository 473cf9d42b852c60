//! Build-time validation of the command tree.
//!
//! Every error here is a programming or registration mistake: the tree is
//! assembled from code, never from user input, so a [`BuildError`] is fatal
//! at startup.

use thiserror::Error;

use crate::types::FlagSpec;

/// Command tree construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A parent already has a child with this name.
    #[error("duplicate command '{child}' under '{parent}'")]
    DuplicateName { parent: String, child: String },
    /// A node already declares a flag with this long or short name.
    #[error("duplicate flag '{flag}' on command '{command}'")]
    DuplicateFlag { command: String, flag: String },
    /// Command name is empty, contains whitespace or looks like a flag.
    #[error("invalid command name: {0:?}")]
    InvalidCommandName(String),
    /// Flag name is empty, contains whitespace, `=`, a leading dash, or the
    /// short name is not alphanumeric.
    #[error("invalid flag name: {0:?}")]
    InvalidFlagName(String),
    /// Flag default does not match the declared kind.
    #[error("default value of flag '--{0}' does not match its kind")]
    DefaultKindMismatch(String),
}

pub(crate) fn check_command_name(name: &str) -> Result<(), BuildError> {
    if name.is_empty() || name.starts_with('-') || name.chars().any(char::is_whitespace) {
        return Err(BuildError::InvalidCommandName(name.to_string()));
    }
    Ok(())
}

pub(crate) fn check_flag(spec: &FlagSpec) -> Result<(), BuildError> {
    let long = spec.long();
    if long.is_empty()
        || long.starts_with('-')
        || long.contains('=')
        || long.chars().any(char::is_whitespace)
    {
        return Err(BuildError::InvalidFlagName(long.to_string()));
    }

    if let Some(short) = spec.short() {
        if !short.is_ascii_alphanumeric() {
            return Err(BuildError::InvalidFlagName(format!("-{short}")));
        }
    }

    if spec.default_value().kind() != spec.kind() {
        return Err(BuildError::DefaultKindMismatch(long.to_string()));
    }

    Ok(())
}
