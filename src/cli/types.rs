use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Error, Debug)]
pub enum CliError {
    /// A command or category was not found in the registry.
    ///
    /// This occurs when users specify a command that doesn't exist, either
    /// because the category is invalid or the command name is wrong within
    /// a valid category.
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// Invalid arguments were provided to a command.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Loading the configuration failed, or the requested key or catalog
    /// entry does not exist.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The scheduler or an async runtime could not be started.
    #[error("Service error: {0}")]
    ServiceError(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result of running a command: text to print, or what went wrong.
pub type CommandResult = Result<String, CliError>;

/// Specification for a single command argument.
#[derive(Debug, Clone)]
pub struct CommandArg {
    /// The name of the argument (e.g., "key", "prefix", "name").
    pub name: String,

    /// Human-readable description of what this argument does.
    pub description: String,

    /// Whether this argument is required for command execution.
    pub required: bool,

    /// The expected type of this argument, shown in help text.
    pub value_type: ArgType,
}

/// Kind of value an argument expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    /// Free text, such as a publisher name.
    String,

    /// A full configuration key.
    Key,

    /// A key prefix; `*` matches one segment.
    Prefix,

    /// One of a fixed set of words.
    Choice(Vec<String>),
}

/// Complete metadata for a CLI command.
///
/// Used for help output, argument count validation and command discovery.
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    /// The command name (e.g., "get", "dump", "watch").
    pub name: String,

    /// Brief description of what this command does.
    pub description: String,

    /// Specification of all arguments this command accepts.
    pub args: Vec<CommandArg>,

    /// Example usage strings to show in help text.
    pub examples: Vec<String>,

    /// Category this command belongs to (e.g., "config", "tdb").
    pub category: String,
}

/// Interface shared by every CLI command.
///
/// Commands receive their dependencies through their constructors.
pub trait Command: Send + Sync {
    /// Executes the command with the provided arguments.
    ///
    /// The registry has already checked the argument count against
    /// [`metadata`](Self::metadata).
    ///
    /// # Errors
    ///
    /// Returns `CliError` for invalid argument values, configuration load
    /// failures and missing keys or catalog entries.
    fn execute(&self, args: &[String]) -> CommandResult;

    /// Returns the complete metadata for this command.
    fn metadata(&self) -> CommandMetadata;
}
