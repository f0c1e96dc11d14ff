use std::path::PathBuf;
use thiserror::Error;

/// Recoverable errors surfaced to callers.
///
/// Programmer errors — duplicate shorthands in one command, malformed
/// positional-arg declarations, value lookup on an unparsed file, asking for
/// an option that was never registered — are construction-time bugs and panic
/// instead of appearing here.
#[derive(Debug, Error)]
pub enum OptfigError {
    #[error("Option '{name}' is not defined ({origin})")]
    OptionNotDefined { name: String, origin: String },

    #[error("Option '{name}' requires a value ({origin})")]
    OptionMissingValue { name: String, origin: String },

    #[error("{problem} in {} (line {line})", .path.display())]
    FileFormat {
        problem: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("Command '{command}' accepts at most {max} positional argument(s)")]
    TooManyArgs { command: String, max: usize },

    #[error("Command '{command}' requires {expected} positional argument(s), {supplied} supplied")]
    MissingRequiredArgs {
        command: String,
        expected: usize,
        supplied: usize,
    },

    #[error("Invalid value '{value}' for option '{name}': allowed values are {allowed}")]
    InvalidEnum {
        name: String,
        value: String,
        allowed: String,
    },

    #[error("Invalid integer value '{value}' for option '{name}'")]
    InvalidInt { name: String, value: String },

    #[error("Invalid byte-size value '{value}' for option '{name}'")]
    InvalidSize { name: String, value: String },

    #[error("Failed to read {}: {source}", .path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_format_includes_path_and_line() {
        let err = OptfigError::FileFormat {
            problem: "unterminated quote".into(),
            path: "/etc/tool/tool.cnf".into(),
            line: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("unterminated quote"));
        assert!(msg.contains("tool.cnf"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn option_not_defined_names_the_source() {
        let err = OptfigError::OptionNotDefined {
            name: "prot".into(),
            origin: "command-line".into(),
        };
        assert!(err.to_string().contains("prot"));
        assert!(err.to_string().contains("command-line"));
    }

    #[test]
    fn invalid_enum_lists_allowed() {
        let err = OptfigError::InvalidEnum {
            name: "mode".into(),
            value: "sideways".into(),
            allowed: "\"fast\", \"slow\"".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sideways"));
        assert!(msg.contains("fast"));
    }
}
