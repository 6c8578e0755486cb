use crate::labels::Labels;
use crate::lexer::Token;
use crate::op::{
    self, Directive, Mnemonic, DATA_WORD_SIZE, INSTRUCTION_SIZE, INST_FLAG_DST_CONST,
    INST_FLAG_DST_MEM, INST_FLAG_DST_REG, INST_FLAG_SRC_CONST, INST_FLAG_SRC_MEM,
    INST_FLAG_SRC_REG,
};
use crate::record::{Instruction, Record};
use crate::{AsmError, ErrorKind};

/// What an operand identifier or number resolved to, before flag
/// composition. Labels collapse into constants here; the distinction only
/// matters for diagnostics.
#[derive(Debug, Clone, Copy)]
enum Binding {
    Register(u8),
    Constant(u64),
}

struct PassTwo<'a> {
    file: &'a str,
    tokens: &'a [Token],
    labels: &'a Labels,
    records: Vec<Record>,
    address: u64,
    line: usize,
}

/// Pass 2: re-walk the token stream, dispatching every mnemonic and
/// directive to the operand grammar and resolving identifiers against the
/// pass-1 label table. Address arithmetic mirrors pass 1 exactly.
pub fn encode_program(
    file: &str,
    tokens: &[Token],
    labels: &Labels,
) -> Result<Vec<Record>, AsmError> {
    PassTwo {
        file,
        tokens,
        labels,
        records: Vec::new(),
        address: 0,
        line: 1,
    }
    .encode()
}

/// The instruction body runs to the end of the physical line; the Newline
/// itself stays in the stream so the line counter advances.
fn body_of(rest: &[Token]) -> &[Token] {
    let end = rest
        .iter()
        .position(|token| matches!(token, Token::Newline))
        .unwrap_or(rest.len());
    &rest[..end]
}

impl<'a> PassTwo<'a> {
    fn encode(mut self) -> Result<Vec<Record>, AsmError> {
        let mut skip = 0usize;

        for (index, token) in self.tokens.iter().enumerate() {
            if skip > 0 {
                skip -= 1;
                continue;
            }
            match token {
                Token::Identifier(name) => {
                    if let Some(mnemonic) = Mnemonic::from_name(name) {
                        let body = body_of(&self.tokens[index + 1..]);
                        skip = body.len();
                        let instruction = self.encode_instruction(mnemonic, body)?;
                        log::debug!(
                            "{}: {:#06x}: {} flags {:#04x} data1 {} data2 {}",
                            self.file,
                            self.address,
                            name,
                            instruction.flags,
                            instruction.data1,
                            instruction.data2
                        );
                        self.records.push(Record::Instruction(instruction));
                        self.address += INSTRUCTION_SIZE;
                    } else if Directive::from_name(name).is_some() {
                        let body = body_of(&self.tokens[index + 1..]);
                        skip = body.len();
                        let word = self.encode_data_word(body)?;
                        log::debug!("{}: {:#06x}: dw {}", self.file, self.address, word);
                        self.records.push(Record::Data(word));
                        self.address += DATA_WORD_SIZE;
                    } else if !matches!(self.tokens.get(index + 1), Some(Token::LabelEnd)) {
                        return Err(
                            ErrorKind::InvalidMnemonic(name.clone()).at(self.file, self.line)
                        );
                    }
                }
                Token::Newline => self.line += 1,
                _ => {}
            }
        }

        Ok(self.records)
    }

    /// The `dw` body must hold exactly one number among non-space tokens.
    fn encode_data_word(&self, body: &[Token]) -> Result<u64, AsmError> {
        let name: &'static str = Directive::Dw.into();
        let mut value = None;

        for token in body {
            match token {
                Token::Space => {}
                Token::Number(word) => {
                    if value.is_some() {
                        return Err(ErrorKind::StrayOperand {
                            name,
                            found: token.kind(),
                        }
                        .at(self.file, self.line));
                    }
                    value = Some(*word);
                }
                other => {
                    return Err(ErrorKind::UnexpectedToken {
                        name,
                        found: other.kind(),
                    }
                    .at(self.file, self.line))
                }
            }
        }

        value.ok_or_else(|| ErrorKind::MissingOperand(name).at(self.file, self.line))
    }

    /// One state machine for every mnemonic, parameterized by its
    /// `OperandRules`: tracks operands bound so far, whether the comma was
    /// seen before the second operand, and whether parsing sits inside an
    /// unmatched bracket (the operand under construction is indirect).
    fn encode_instruction(
        &self,
        mnemonic: Mnemonic,
        body: &[Token],
    ) -> Result<Instruction, AsmError> {
        let rules = mnemonic.rules();
        let name: &'static str = mnemonic.into();
        let max = rules.arity.operands();

        let mut instruction = Instruction {
            opcode: mnemonic.opcode(),
            flags: 0,
            data1: 0,
            data2: 0,
        };
        let mut bound = 0usize;
        let mut separated = false;
        let mut indirect = false;

        for token in body {
            match token {
                Token::Space => {}
                Token::BracketOpen => {
                    if indirect {
                        return Err(ErrorKind::BracketReopened.at(self.file, self.line));
                    }
                    if bound >= max {
                        return Err(ErrorKind::StrayOperand {
                            name,
                            found: token.kind(),
                        }
                        .at(self.file, self.line));
                    }
                    indirect = true;
                }
                Token::BracketClose => {
                    indirect = false;
                }
                Token::ParamSep => {
                    if indirect || bound == 0 || max < 2 {
                        return Err(ErrorKind::UnexpectedToken {
                            name,
                            found: token.kind(),
                        }
                        .at(self.file, self.line));
                    }
                    if separated || bound == max {
                        return Err(ErrorKind::StrayOperand {
                            name,
                            found: token.kind(),
                        }
                        .at(self.file, self.line));
                    }
                    separated = true;
                }
                Token::Number(value) => {
                    self.check_slot(name, token, bound, max, separated)?;
                    self.bind(
                        &mut instruction,
                        &rules,
                        name,
                        bound,
                        indirect,
                        Binding::Constant(*value),
                    )?;
                    bound += 1;
                }
                Token::Identifier(ident) => {
                    self.check_slot(name, token, bound, max, separated)?;
                    let binding = self.resolve(ident)?;
                    self.bind(&mut instruction, &rules, name, bound, indirect, binding)?;
                    bound += 1;
                }
                other => {
                    return Err(ErrorKind::UnexpectedToken {
                        name,
                        found: other.kind(),
                    }
                    .at(self.file, self.line))
                }
            }
        }

        if bound < max {
            return Err(ErrorKind::MissingOperand(name).at(self.file, self.line));
        }

        Ok(instruction)
    }

    /// Arity and separator checks for the slot an operand is about to bind
    /// into.
    fn check_slot(
        &self,
        name: &'static str,
        token: &Token,
        bound: usize,
        max: usize,
        separated: bool,
    ) -> Result<(), AsmError> {
        if bound >= max {
            return Err(ErrorKind::StrayOperand {
                name,
                found: token.kind(),
            }
            .at(self.file, self.line));
        }
        if bound == 1 && !separated {
            return Err(ErrorKind::MissingSeparator(name).at(self.file, self.line));
        }
        Ok(())
    }

    /// Operand identifiers resolve label-table-first, then register names,
    /// so a label may shadow a register name.
    fn resolve(&self, ident: &str) -> Result<Binding, AsmError> {
        if let Some(address) = self.labels.get(ident) {
            Ok(Binding::Constant(address))
        } else if let Some(index) = op::register(ident) {
            Ok(Binding::Register(index))
        } else {
            Err(ErrorKind::UnknownOperand(ident.to_owned()).at(self.file, self.line))
        }
    }

    /// Compose flags and store the operand value: dst bits for the first
    /// operand, src bits for the second. A bracketed constant sets only the
    /// memory bit; a bracketed register sets register and memory bits.
    fn bind(
        &self,
        instruction: &mut Instruction,
        rules: &op::OperandRules,
        name: &'static str,
        bound: usize,
        indirect: bool,
        binding: Binding,
    ) -> Result<(), AsmError> {
        let (mem_bit, const_bit, reg_bit) = if bound == 0 {
            (INST_FLAG_DST_MEM, INST_FLAG_DST_CONST, INST_FLAG_DST_REG)
        } else {
            (INST_FLAG_SRC_MEM, INST_FLAG_SRC_CONST, INST_FLAG_SRC_REG)
        };

        let value = match binding {
            Binding::Register(index) => {
                instruction.flags |= reg_bit;
                if indirect {
                    instruction.flags |= mem_bit;
                }
                u64::from(index)
            }
            Binding::Constant(value) => {
                if indirect {
                    instruction.flags |= mem_bit;
                } else {
                    if bound == 0 && !rules.bare_const_first {
                        return Err(
                            ErrorKind::BareConstant { name, value }.at(self.file, self.line)
                        );
                    }
                    instruction.flags |= const_bit;
                }
                value
            }
        };

        if bound == 0 {
            instruction.data1 = value;
        } else {
            instruction.data2 = value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::pass_one::resolve_labels;

    fn encode(text: &str) -> Result<Vec<Record>, AsmError> {
        let tokens = lex("test.lasm", text)?;
        let labels = resolve_labels("test.lasm", &tokens)?;
        encode_program("test.lasm", &tokens, &labels)
    }

    fn single(text: &str) -> Instruction {
        let records = encode(text).unwrap();
        assert_eq!(records.len(), 1);
        match records[0] {
            Record::Instruction(instruction) => instruction,
            Record::Data(word) => panic!("expected instruction, got data word {}", word),
        }
    }

    fn kind_of(text: &str) -> ErrorKind {
        encode(text).unwrap_err().kind
    }

    #[test]
    fn zero_operand_mnemonics() {
        let hlt = single("hlt");
        assert_eq!(hlt.opcode, 2);
        assert_eq!(hlt.flags, 0);
        assert_eq!(hlt.data1, 0);
        assert_eq!(hlt.data2, 0);

        // Trailing whitespace is not an operand
        assert_eq!(single("ret  ").opcode, 9);
        assert_eq!(
            kind_of("ret 5"),
            ErrorKind::StrayOperand {
                name: "ret",
                found: "number"
            }
        );
        assert_eq!(
            kind_of("nop [r0]"),
            ErrorKind::StrayOperand {
                name: "nop",
                found: "bracket_open"
            }
        );
    }

    #[test]
    fn jmp_register_direct_and_indirect() {
        let direct = single("jmp r3");
        assert_eq!(direct.flags, INST_FLAG_DST_REG);
        assert_eq!(direct.data1, 3);

        let indirect = single("jmp [r3]");
        assert_eq!(indirect.flags, INST_FLAG_DST_REG | INST_FLAG_DST_MEM);
        assert_eq!(indirect.data1, 3);
    }

    #[test]
    fn jmp_label_sets_only_the_constant_bit() {
        let records = encode("jmp fin\nfin: hlt").unwrap();
        let jmp = match records[0] {
            Record::Instruction(instruction) => instruction,
            _ => unreachable!(),
        };
        assert_eq!(jmp.flags, INST_FLAG_DST_CONST);
        assert_eq!(jmp.data1, 19);
    }

    #[test]
    fn bracketed_constants_set_memory_only() {
        let inst = single("push [40]");
        assert_eq!(inst.flags, INST_FLAG_DST_MEM);
        assert_eq!(inst.data1, 40);
    }

    #[test]
    fn inc_rejects_bare_constants() {
        assert_eq!(single("inc r0").flags, INST_FLAG_DST_REG);
        assert_eq!(
            single("inc [r0]").flags,
            INST_FLAG_DST_REG | INST_FLAG_DST_MEM
        );
        assert_eq!(single("inc [5]").flags, INST_FLAG_DST_MEM);
        assert_eq!(
            kind_of("inc 5"),
            ErrorKind::BareConstant {
                name: "inc",
                value: 5
            }
        );
        assert_eq!(
            kind_of("dec 5"),
            ErrorKind::BareConstant {
                name: "dec",
                value: 5
            }
        );
    }

    #[test]
    fn pop_rejects_an_immediate_target() {
        assert_eq!(single("pop r6").data1, 6);
        assert_eq!(
            kind_of("pop 9"),
            ErrorKind::BareConstant {
                name: "pop",
                value: 9
            }
        );
    }

    #[test]
    fn push_allows_a_bare_constant() {
        let inst = single("push 9");
        assert_eq!(inst.flags, INST_FLAG_DST_CONST);
        assert_eq!(inst.data1, 9);
    }

    #[test]
    fn mov_binds_destination_then_source() {
        let inst = single("mov [r1], 42");
        assert_eq!(
            inst.flags,
            INST_FLAG_DST_REG | INST_FLAG_DST_MEM | INST_FLAG_SRC_CONST
        );
        assert_eq!(inst.data1, 1);
        assert_eq!(inst.data2, 42);
    }

    #[test]
    fn mov_allows_a_bracketed_constant_destination() {
        let inst = single("mov [64], r2");
        assert_eq!(inst.flags, INST_FLAG_DST_MEM | INST_FLAG_SRC_REG);
        assert_eq!(inst.data1, 64);
        assert_eq!(inst.data2, 2);
    }

    #[test]
    fn mov_rejects_a_bare_constant_destination() {
        assert_eq!(
            kind_of("mov 5, r0"),
            ErrorKind::BareConstant {
                name: "mov",
                value: 5
            }
        );
    }

    #[test]
    fn mov_source_may_be_indirect() {
        let inst = single("mov r0, [r1]");
        assert_eq!(
            inst.flags,
            INST_FLAG_DST_REG | INST_FLAG_SRC_REG | INST_FLAG_SRC_MEM
        );
    }

    #[test]
    fn mov_requires_the_separator() {
        assert_eq!(kind_of("mov r0 5"), ErrorKind::MissingSeparator("mov"));
    }

    #[test]
    fn excess_operands_are_rejected() {
        assert_eq!(
            kind_of("mov r0, r1, r2"),
            ErrorKind::StrayOperand {
                name: "mov",
                found: "param_sep"
            }
        );
        assert_eq!(
            kind_of("jmp r0 r1"),
            ErrorKind::StrayOperand {
                name: "jmp",
                found: "identifier"
            }
        );
    }

    #[test]
    fn separator_without_a_first_operand_is_rejected() {
        assert_eq!(
            kind_of("mov , r0"),
            ErrorKind::UnexpectedToken {
                name: "mov",
                found: "param_sep"
            }
        );
    }

    #[test]
    fn separator_on_a_one_operand_mnemonic_is_rejected() {
        assert_eq!(
            kind_of("jmp r0,"),
            ErrorKind::UnexpectedToken {
                name: "jmp",
                found: "param_sep"
            }
        );
    }

    #[test]
    fn missing_operands_are_rejected() {
        assert_eq!(kind_of("jmp"), ErrorKind::MissingOperand("jmp"));
        assert_eq!(kind_of("mov r0,"), ErrorKind::MissingOperand("mov"));
        assert_eq!(kind_of("inc [ ]"), ErrorKind::MissingOperand("inc"));
    }

    #[test]
    fn tabs_inside_an_operand_body_are_rejected() {
        assert_eq!(
            kind_of("jmp\tr0"),
            ErrorKind::UnexpectedToken {
                name: "jmp",
                found: "tab"
            }
        );
    }

    #[test]
    fn unknown_operands_are_semantic_errors() {
        assert_eq!(
            kind_of("jmp nowhere"),
            ErrorKind::UnknownOperand("nowhere".to_string())
        );
    }

    #[test]
    fn a_label_shadows_a_register_name() {
        let records = encode("r0: hlt\njmp r0").unwrap();
        let jmp = match records[1] {
            Record::Instruction(instruction) => instruction,
            _ => unreachable!(),
        };
        assert_eq!(jmp.flags, INST_FLAG_DST_CONST);
        assert_eq!(jmp.data1, 0);
    }

    #[test]
    fn unknown_top_level_identifiers_are_rejected() {
        let err = encode("hlt\nfrobnicate r0").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::InvalidMnemonic("frobnicate".to_string())
        );
        assert_eq!(err.line, 2);
    }

    #[test]
    fn label_declarations_encode_nothing() {
        let records = encode("start: hlt").unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn data_directive_takes_exactly_one_number() {
        assert_eq!(encode("dw 42").unwrap(), vec![Record::Data(42)]);
        assert_eq!(kind_of("dw"), ErrorKind::MissingOperand("dw"));
        assert_eq!(
            kind_of("dw 1 2"),
            ErrorKind::StrayOperand {
                name: "dw",
                found: "number"
            }
        );
        assert_eq!(
            kind_of("dw r0"),
            ErrorKind::UnexpectedToken {
                name: "dw",
                found: "identifier"
            }
        );
    }

    #[test]
    fn stray_top_level_numbers_are_ignored() {
        // Anything that isn't an identifier or newline is walked past at
        // the top level.
        let records = encode("5\nhlt").unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn errors_carry_the_right_line() {
        let err = encode("hlt\nhlt\ninc 5").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.file, "test.lasm");
    }
}
