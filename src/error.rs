use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum CapsError {
    #[error("Failed to register handle for {capability} on component {component}")]
    HandleRegistration {
        capability: &'static str,
        component: String,
    },

    #[error("Failed to register command callbacks for {capability}: {commands:?}")]
    CommandRegistration {
        capability: &'static str,
        commands: Vec<&'static str>,
    },

    #[error("Failed to send {attribute} (sequence number {seq})")]
    Transmission { attribute: &'static str, seq: i32 },

    #[error("No handle for capability {0}")]
    MissingHandle(&'static str),

    #[error("Attribute {0} has no value")]
    MissingValue(&'static str),

    #[error("Invalid argument {index} for command {command}: {reason}")]
    InvalidArgument {
        command: String,
        index: usize,
        reason: String,
    },

    #[error("Command {command} takes {expected} argument(s), got {actual}")]
    ArgumentCount {
        command: String,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown command {command} for handle {handle}")]
    UnknownCommand { handle: u32, command: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CapsError>;
