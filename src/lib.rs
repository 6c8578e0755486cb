use thiserror::Error;

pub mod labels;
pub mod lexer;
pub mod op;
pub mod pass_one;
pub mod pass_two;
pub mod record;

pub use record::Record;

/// One assembly source file. Each source gets its own token stream, label
/// table, and zero-based address space.
#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ErrorKind {
    // Lexical
    #[error("'[' while a bracket is already open")]
    BracketReopened,
    #[error("']' without a matching '['")]
    BracketNotOpen,
    #[error("unclosed '[' at end of line")]
    BracketUnclosed,
    #[error("number {0} does not fit in 64 bits")]
    NumberOverflow(String),

    // Syntactic
    #[error("unexpected {found} in {name} operands")]
    UnexpectedToken {
        name: &'static str,
        found: &'static str,
    },
    #[error("stray {found} after {name} operands")]
    StrayOperand {
        name: &'static str,
        found: &'static str,
    },
    #[error("missing ',' before second operand of {0}")]
    MissingSeparator(&'static str),
    #[error("missing operand for {0}")]
    MissingOperand(&'static str),
    #[error("label ':' without a name")]
    UnnamedLabel,

    // Semantic
    #[error("unknown operand {0}")]
    UnknownOperand(String),
    #[error("{name} cannot take bare constant {value}")]
    BareConstant { name: &'static str, value: u64 },
    #[error("invalid instruction mnemonic {0}")]
    InvalidMnemonic(String),
}

impl ErrorKind {
    pub(crate) fn at(self, file: &str, line: usize) -> AsmError {
        AsmError {
            kind: self,
            file: file.to_owned(),
            line,
        }
    }
}

/// A fatal assembly error, positioned at the 1-based source line where it was
/// detected. The first error aborts the whole run; nothing is emitted.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{kind} in file {file}, on line {line}")]
pub struct AsmError {
    pub kind: ErrorKind,
    pub file: String,
    pub line: usize,
}

/// Assemble a single source file into its ordered record list.
pub fn assemble_program(name: &str, text: &str) -> Result<Vec<Record>, AsmError> {
    let tokens = lexer::lex(name, text)?;
    log::debug!("{}: lexed {} tokens", name, tokens.len());

    let labels = pass_one::resolve_labels(name, &tokens)?;
    for (label, address) in labels.iter() {
        log::debug!("{}: label {} = {:#x}", name, label, address);
    }

    let records = pass_two::encode_program(name, &tokens, &labels)?;
    log::info!("{}: {} records", name, records.len());
    Ok(records)
}

/// Assemble every source and emit the concatenated byte stream. Emission only
/// happens after all files have passed both passes, so an error in any file
/// yields no output at all.
pub fn assemble(sources: &[Source]) -> Result<Vec<u8>, AsmError> {
    let mut records = Vec::new();
    for source in sources {
        records.extend(assemble_program(&source.name, &source.text)?);
    }
    Ok(record::emit(&records))
}
