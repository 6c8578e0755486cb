use std::mem;

use crate::{AsmError, ErrorKind};

/// Tokens are produced once per file and then read by both passes without
/// mutation. Single-character punctuation keeps its own kind so the passes
/// never re-inspect source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Identifier(String),
    Number(u64),
    Space,
    ParamSep,
    LabelEnd,
    Tab,
    BracketOpen,
    BracketClose,
    Newline,
}

impl Token {
    /// Diagnostic name for this token's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Token::Identifier(_) => "identifier",
            Token::Number(_) => "number",
            Token::Space => "space",
            Token::ParamSep => "param_sep",
            Token::LabelEnd => "label_end",
            Token::Tab => "tab",
            Token::BracketOpen => "bracket_open",
            Token::BracketClose => "bracket_close",
            Token::Newline => "newline",
        }
    }
}

fn flush_number(tokens: &mut Vec<Token>, number: &mut String) -> Result<(), ErrorKind> {
    if !number.is_empty() {
        let value = number
            .parse::<u64>()
            .map_err(|_| ErrorKind::NumberOverflow(mem::take(number)))?;
        tokens.push(Token::Number(value));
        number.clear();
    }
    Ok(())
}

fn flush_identifier(tokens: &mut Vec<Token>, identifier: &mut String) {
    if !identifier.is_empty() {
        tokens.push(Token::Identifier(mem::take(identifier)));
    }
}

/// Lex one file into its full token sequence. Every physical line ends with
/// exactly one Newline token, blank lines included, so a file that ends with
/// a newline character produces a trailing Newline for the empty final line.
///
/// Bracket balance is a per-line lexical property: reopening an open bracket,
/// closing a closed one, and leaving one open at end of line are all fatal
/// here, before either pass runs.
pub fn lex(file: &str, text: &str) -> Result<Vec<Token>, AsmError> {
    let mut tokens = Vec::new();

    for (index, line) in text.split('\n').enumerate() {
        let line_no = index + 1;
        let mut identifier = String::new();
        let mut number = String::new();
        let mut bracket_open = false;

        for c in line.chars() {
            // A digit only extends a numeric run while no identifier is
            // pending; `r0` stays one identifier.
            if c.is_ascii_digit() && identifier.is_empty() {
                number.push(c);
                continue;
            }
            match c {
                ' ' | ',' | ':' | '\t' | '[' | ']' => {
                    flush_number(&mut tokens, &mut number)
                        .map_err(|kind| kind.at(file, line_no))?;
                    flush_identifier(&mut tokens, &mut identifier);
                    let token = match c {
                        ' ' => Token::Space,
                        ',' => Token::ParamSep,
                        ':' => Token::LabelEnd,
                        '\t' => Token::Tab,
                        '[' => {
                            if bracket_open {
                                return Err(ErrorKind::BracketReopened.at(file, line_no));
                            }
                            bracket_open = true;
                            Token::BracketOpen
                        }
                        ']' => {
                            if !bracket_open {
                                return Err(ErrorKind::BracketNotOpen.at(file, line_no));
                            }
                            bracket_open = false;
                            Token::BracketClose
                        }
                        _ => unreachable!(),
                    };
                    tokens.push(token);
                }
                _ => {
                    flush_number(&mut tokens, &mut number)
                        .map_err(|kind| kind.at(file, line_no))?;
                    identifier.push(c);
                }
            }
        }

        flush_number(&mut tokens, &mut number).map_err(|kind| kind.at(file, line_no))?;
        flush_identifier(&mut tokens, &mut identifier);
        if bracket_open {
            return Err(ErrorKind::BracketUnclosed.at(file, line_no));
        }
        tokens.push(Token::Newline);
    }

    Ok(tokens)
}
