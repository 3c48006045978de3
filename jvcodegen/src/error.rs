use jvinstr::list::InsnRef;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration file '{file}': {source}")]
    ConfigParseError {
        source: toml::de::Error,
        file: String,
    },

    #[error(transparent)]
    Instruction(#[from] jvinstr::utils::Error),

    #[error("Type test node {node:?} is not part of the instruction list being rewritten")]
    NodeNotInList { node: InsnRef },

    #[error("Node {node:?} holds `{found}`, expected an `instanceof` instruction")]
    NotATypeTest { node: InsnRef, found: String },

    #[error("Type test node {node:?} is listed more than once in the same batch")]
    DuplicateSite { node: InsnRef },

    #[error("Replacing `{original}` with `{replacement}` changes the operand stack effect")]
    StackEffectMismatch {
        original: String,
        replacement: String,
    },
}

pub type CodegenResult<T> = Result<T, CodegenError>;
