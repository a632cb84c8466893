//! Two-pass assembly from source text to a [Program].
//!
//! Pass 1 walks every line, collecting label definitions and counting
//! instructions. Pass 2 re-walks the lines, decodes each mnemonic and its
//! operands, and resolves branch and jump targets. Targets naming a label
//! that is not yet known are queued as unresolved references and patched in a
//! single fix-up sweep once every line has been processed.

use logos::Logos;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::one_of,
    combinator::{all_consuming, map, map_opt, opt},
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::error::Error;
use crate::instruction::{Instruction, OpCode, Program, Register};
use crate::lexer::{lex_line, split_lines, Line, Source};
use crate::limits;
use crate::symbol_table::LabelTable;

/// What the first token of a line names: a real operation, or one of the two
/// pseudo-mnemonics the assembler expands inline.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Mnemonic {
    Op(OpCode),

    /// Expands to `addi x0, x0, 0`.
    Nop,

    /// Expands to `jalr x0, ra, 0`.
    Ret,
}

/// Tokenizer used to classify mnemonics. A token counts as a mnemonic only
/// if the lexer consumes it completely.
#[derive(Logos, Debug, PartialEq)]
enum MnemonicToken {
    /// Errorneous token that does not name any operation.
    #[error]
    Error,

    #[regex(
        "(?i)lui|auipc|jal|jalr|beq|bne|blt|bge|bltu|bgeu|lb|lh|lw|lbu|lhu|sb|sh|sw|addi|slti|sltiu|xori|ori|andi|slli|srli|srai|add|sub|sll|slt|sltu|xor|srl|sra|or|and|fence|fence\\.i|ecall|ebreak|nop|ret",
        mnemonic_callback
    )]
    Mnemonic(Mnemonic),
}

fn mnemonic_callback(lex: &mut logos::Lexer<MnemonicToken>) -> Result<Mnemonic, ()> {
    let mnemonic = match lex.slice().to_ascii_lowercase().as_ref() {
        "lui" => Mnemonic::Op(OpCode::Lui),
        "auipc" => Mnemonic::Op(OpCode::Auipc),
        "jal" => Mnemonic::Op(OpCode::Jal),
        "jalr" => Mnemonic::Op(OpCode::Jalr),
        "beq" => Mnemonic::Op(OpCode::Beq),
        "bne" => Mnemonic::Op(OpCode::Bne),
        "blt" => Mnemonic::Op(OpCode::Blt),
        "bge" => Mnemonic::Op(OpCode::Bge),
        "bltu" => Mnemonic::Op(OpCode::Bltu),
        "bgeu" => Mnemonic::Op(OpCode::Bgeu),
        "lb" => Mnemonic::Op(OpCode::Lb),
        "lh" => Mnemonic::Op(OpCode::Lh),
        "lw" => Mnemonic::Op(OpCode::Lw),
        "lbu" => Mnemonic::Op(OpCode::Lbu),
        "lhu" => Mnemonic::Op(OpCode::Lhu),
        "sb" => Mnemonic::Op(OpCode::Sb),
        "sh" => Mnemonic::Op(OpCode::Sh),
        "sw" => Mnemonic::Op(OpCode::Sw),
        "addi" => Mnemonic::Op(OpCode::Addi),
        "slti" => Mnemonic::Op(OpCode::Slti),
        "sltiu" => Mnemonic::Op(OpCode::Sltiu),
        "xori" => Mnemonic::Op(OpCode::Xori),
        "ori" => Mnemonic::Op(OpCode::Ori),
        "andi" => Mnemonic::Op(OpCode::Andi),
        "slli" => Mnemonic::Op(OpCode::Slli),
        "srli" => Mnemonic::Op(OpCode::Srli),
        "srai" => Mnemonic::Op(OpCode::Srai),
        "add" => Mnemonic::Op(OpCode::Add),
        "sub" => Mnemonic::Op(OpCode::Sub),
        "sll" => Mnemonic::Op(OpCode::Sll),
        "slt" => Mnemonic::Op(OpCode::Slt),
        "sltu" => Mnemonic::Op(OpCode::Sltu),
        "xor" => Mnemonic::Op(OpCode::Xor),
        "srl" => Mnemonic::Op(OpCode::Srl),
        "sra" => Mnemonic::Op(OpCode::Sra),
        "or" => Mnemonic::Op(OpCode::Or),
        "and" => Mnemonic::Op(OpCode::And),
        "fence" => Mnemonic::Op(OpCode::Fence),
        "fence.i" => Mnemonic::Op(OpCode::FenceI),
        "ecall" => Mnemonic::Op(OpCode::Ecall),
        "ebreak" => Mnemonic::Op(OpCode::Ebreak),
        "nop" => Mnemonic::Nop,
        "ret" => Mnemonic::Ret,
        _ => return Err(()),
    };

    Ok(mnemonic)
}

/// Maps the first token of a line to a mnemonic, case-insensitively.
/// Returns `None` for anything the instruction set does not know.
pub fn classify_mnemonic(token: &str) -> Option<Mnemonic> {
    let mut lexer = MnemonicToken::lexer(token);

    match lexer.next() {
        Some(MnemonicToken::Mnemonic(mnemonic)) if lexer.span() == (0..token.len()) => {
            Some(mnemonic)
        }
        _ => None,
    }
}

/// A memory operand: `imm(reg)`, `(reg)` or a bare immediate.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MemoryOperand {
    pub offset: i32,
    pub base: Option<Register>,
}

fn hex_value(byte: u8) -> u32 {
    match byte {
        b'0'..=b'9' => u32::from(byte - b'0'),
        b'a'..=b'f' => u32::from(byte - b'a') + 10,
        b'A'..=b'F' => u32::from(byte - b'A') + 10,
        _ => 0,
    }
}

fn hex_number(input: &str) -> IResult<&str, u32> {
    map(
        preceded(
            tag_no_case("0x"),
            take_while1(|c: char| c.is_ascii_hexdigit()),
        ),
        |digits: &str| {
            digits
                .bytes()
                .fold(0u32, |value, digit| value.wrapping_shl(4) + hex_value(digit))
        },
    )(input)
}

fn decimal_number(input: &str) -> IResult<&str, u32> {
    map(take_while1(|c: char| c.is_ascii_digit()), |digits: &str| {
        digits.bytes().fold(0i64, |value, digit| {
            value.wrapping_mul(10).wrapping_add(i64::from(digit - b'0'))
        }) as u32
    })(input)
}

/// Parses a signed immediate: optional sign, then decimal or `0x`-prefixed
/// hexadecimal, wrapped to 32 bits.
fn immediate(input: &str) -> IResult<&str, i32> {
    map(
        tuple((opt(one_of("+-")), alt((hex_number, decimal_number)))),
        |(sign, magnitude)| {
            let value = match sign {
                Some('-') => magnitude.wrapping_neg(),
                Some(_) | None => magnitude,
            };

            value as i32
        },
    )(input)
}

fn register_name(input: &str) -> IResult<&str, Register> {
    map_opt(
        take_while1(|c: char| c.is_ascii_alphanumeric()),
        Register::from_name,
    )(input)
}

fn memory_reference(input: &str) -> IResult<&str, MemoryOperand> {
    map(
        tuple((
            opt(immediate),
            delimited(tag("("), register_name, tag(")")),
        )),
        |(offset, base)| MemoryOperand {
            offset: offset.unwrap_or(0),
            base: Some(base),
        },
    )(input)
}

/// Parses a register token: `x0`-`x31` or an ABI name.
pub fn parse_register(token: &str) -> Option<Register> {
    all_consuming(register_name)(token)
        .ok()
        .map(|(_, register)| register)
}

/// Parses an immediate token.
pub fn parse_immediate(token: &str) -> Option<i32> {
    all_consuming(immediate)(token).ok().map(|(_, value)| value)
}

/// Parses a memory operand token. The base register defaults to none for a
/// bare immediate; text trailing the closing parenthesis is ignored.
pub fn parse_memory_operand(token: &str) -> Option<MemoryOperand> {
    if let Ok((_, operand)) = memory_reference(token) {
        return Some(operand);
    }

    all_consuming(immediate)(token)
        .ok()
        .map(|(_, offset)| MemoryOperand {
            offset,
            base: None,
        })
}

/// Pass 1: collects label definitions and counts instructions.
///
/// A label binds to the instruction counter at its declaration, which is the
/// index of the next instruction emitted. Returns the total instruction
/// count.
pub fn first_pass<'a>(source: &Source<'a>, labels: &mut LabelTable<'a>) -> Result<usize, Error> {
    let mut count = 0;

    for (index, text) in source.lines().enumerate() {
        let line = lex_line(text);

        if line.empty {
            continue;
        }

        let line_no = (index + 1) as i32;

        if let Some(label) = line.label {
            labels.add(label, count as i32, line_no)?;
        }

        if line.tokens.is_empty() {
            continue;
        }

        if count >= limits::MAX_INSNS {
            return Err(Error {
                message: "too many instructions",
                line: line_no,
            });
        }

        count += 1;
    }

    Ok(count)
}

/// A branch or jump whose label was not yet defined when the instruction was
/// decoded.
struct UnresolvedReference<'a> {
    instruction: usize,
    label: &'a str,
}

fn need_register(token: &str, line: i32) -> Result<Register, Error> {
    parse_register(token).ok_or(Error {
        message: "bad register",
        line,
    })
}

fn need_immediate(token: &str, line: i32) -> Result<i32, Error> {
    parse_immediate(token).ok_or(Error {
        message: "bad immediate",
        line,
    })
}

fn need_memory(token: &str, line: i32) -> Result<MemoryOperand, Error> {
    parse_memory_operand(token).ok_or(Error {
        message: "bad mem operand",
        line,
    })
}

/// The expected operand shape of an operation, for arity diagnostics.
fn operand_usage(opcode: OpCode) -> &'static str {
    use OpCode::*;

    match opcode {
        Lui | Auipc => "need rd, imm",
        Jal => "need jal [rd,] label",
        Jalr => "need jalr rd, rs1, imm",
        Beq => "need beq rs1, rs2, label",
        Bne => "need bne rs1, rs2, label",
        Blt => "need blt rs1, rs2, label",
        Bge => "need bge rs1, rs2, label",
        Bltu => "need bltu rs1, rs2, label",
        Bgeu => "need bgeu rs1, rs2, label",
        Lb => "need lb rd, imm(rs1)",
        Lh => "need lh rd, imm(rs1)",
        Lw => "need lw rd, imm(rs1)",
        Lbu => "need lbu rd, imm(rs1)",
        Lhu => "need lhu rd, imm(rs1)",
        Sb => "need sb rs2, imm(rs1)",
        Sh => "need sh rs2, imm(rs1)",
        Sw => "need sw rs2, imm(rs1)",
        Addi => "need addi rd, rs1, imm",
        Slti => "need slti rd, rs1, imm",
        Sltiu => "need sltiu rd, rs1, imm",
        Xori => "need xori rd, rs1, imm",
        Ori => "need ori rd, rs1, imm",
        Andi => "need andi rd, rs1, imm",
        Slli => "need slli rd, rs1, shamt",
        Srli => "need srli rd, rs1, shamt",
        Srai => "need srai rd, rs1, shamt",
        Add => "need add rd, rs1, rs2",
        Sub => "need sub rd, rs1, rs2",
        Sll => "need sll rd, rs1, rs2",
        Slt => "need slt rd, rs1, rs2",
        Sltu => "need sltu rd, rs1, rs2",
        Xor => "need xor rd, rs1, rs2",
        Srl => "need srl rd, rs1, rs2",
        Sra => "need sra rd, rs1, rs2",
        Or => "need or rd, rs1, rs2",
        And => "need and rd, rs1, rs2",
        Fence | FenceI | Ecall | Ebreak | Invalid => "takes no operands",
    }
}

fn expect_operands(line: &Line, count: usize, opcode: OpCode, line_no: i32) -> Result<(), Error> {
    if line.tokens.len() != count {
        return Err(Error {
            message: operand_usage(opcode),
            line: line_no,
        });
    }

    Ok(())
}

/// Resolves a branch/jump label immediately when it is already known, or
/// queues the reference for the fix-up sweep.
fn resolve_target<'a>(
    instruction: &mut Instruction,
    index: usize,
    token: &'a str,
    labels: &LabelTable<'a>,
    unresolved: &mut Vec<UnresolvedReference<'a>>,
) {
    match labels.find(token) {
        Some(pc) => instruction.target = pc,
        None => unresolved.push(UnresolvedReference {
            instruction: index,
            label: token,
        }),
    }
}

fn emit(program: &mut Program, instruction: Instruction, line: i32) -> Result<(), Error> {
    if !program.push(instruction) {
        return Err(Error {
            message: "too many instructions",
            line,
        });
    }

    Ok(())
}

/// Pass 2: decodes every instruction line, validating operand arity and
/// kinds per operation, and resolves branch/jump targets. Any reference
/// still unresolved after the fix-up sweep is an `"unknown label"` error on
/// the referencing instruction's line.
pub fn second_pass<'a>(source: &Source<'a>, labels: &LabelTable<'a>) -> Result<Program, Error> {
    let mut program = Program::new();
    let mut unresolved: Vec<UnresolvedReference<'a>> = Vec::new();

    for (index, text) in source.lines().enumerate() {
        let line = lex_line(text);

        if line.empty || line.tokens.is_empty() {
            continue;
        }

        let line_no = (index + 1) as i32;

        let mnemonic = match classify_mnemonic(line.tokens[0]) {
            Some(mnemonic) => mnemonic,
            None => {
                return Err(Error {
                    message: "unknown mnemonic",
                    line: line_no,
                })
            }
        };

        let mut instruction = Instruction {
            line: line_no,
            ..Instruction::default()
        };

        let opcode = match mnemonic {
            Mnemonic::Nop => {
                instruction.opcode = OpCode::Addi;
                emit(&mut program, instruction, line_no)?;
                continue;
            }
            Mnemonic::Ret => {
                instruction.opcode = OpCode::Jalr;
                instruction.rs1 = Register::RA;
                emit(&mut program, instruction, line_no)?;
                continue;
            }
            Mnemonic::Op(opcode) => opcode,
        };

        instruction.opcode = opcode;

        use OpCode::*;

        match opcode {
            Lui | Auipc => {
                expect_operands(&line, 3, opcode, line_no)?;
                instruction.rd = need_register(line.tokens[1], line_no)?;
                instruction.imm = need_immediate(line.tokens[2], line_no)?;
            }

            Jal => match line.tokens.len() {
                2 => {
                    instruction.rd = Register::RA;
                    resolve_target(
                        &mut instruction,
                        program.len(),
                        line.tokens[1],
                        labels,
                        &mut unresolved,
                    );
                }
                3 => {
                    instruction.rd = need_register(line.tokens[1], line_no)?;
                    resolve_target(
                        &mut instruction,
                        program.len(),
                        line.tokens[2],
                        labels,
                        &mut unresolved,
                    );
                }
                _ => {
                    return Err(Error {
                        message: operand_usage(opcode),
                        line: line_no,
                    })
                }
            },

            Jalr => {
                expect_operands(&line, 4, opcode, line_no)?;
                instruction.rd = need_register(line.tokens[1], line_no)?;
                instruction.rs1 = need_register(line.tokens[2], line_no)?;
                instruction.imm = need_immediate(line.tokens[3], line_no)?;
            }

            Beq | Bne | Blt | Bge | Bltu | Bgeu => {
                expect_operands(&line, 4, opcode, line_no)?;
                instruction.rs1 = need_register(line.tokens[1], line_no)?;
                instruction.rs2 = need_register(line.tokens[2], line_no)?;
                resolve_target(
                    &mut instruction,
                    program.len(),
                    line.tokens[3],
                    labels,
                    &mut unresolved,
                );
            }

            Lb | Lh | Lw | Lbu | Lhu => {
                expect_operands(&line, 3, opcode, line_no)?;
                instruction.rd = need_register(line.tokens[1], line_no)?;

                let operand = need_memory(line.tokens[2], line_no)?;
                instruction.rs1 = operand.base.unwrap_or(Register::ZERO);
                instruction.imm = operand.offset;
            }

            Sb | Sh | Sw => {
                expect_operands(&line, 3, opcode, line_no)?;
                instruction.rs2 = need_register(line.tokens[1], line_no)?;

                let operand = need_memory(line.tokens[2], line_no)?;
                instruction.rs1 = operand.base.unwrap_or(Register::ZERO);
                instruction.imm = operand.offset;
            }

            Addi | Slti | Sltiu | Xori | Ori | Andi => {
                expect_operands(&line, 4, opcode, line_no)?;
                instruction.rd = need_register(line.tokens[1], line_no)?;
                instruction.rs1 = need_register(line.tokens[2], line_no)?;
                instruction.imm = need_immediate(line.tokens[3], line_no)?;
            }

            Slli | Srli | Srai => {
                expect_operands(&line, 4, opcode, line_no)?;
                instruction.rd = need_register(line.tokens[1], line_no)?;
                instruction.rs1 = need_register(line.tokens[2], line_no)?;
                instruction.imm = need_immediate(line.tokens[3], line_no)?;

                if instruction.imm < 0 || instruction.imm > 31 {
                    return Err(Error {
                        message: "bad shamt",
                        line: line_no,
                    });
                }
            }

            Add | Sub | Sll | Slt | Sltu | Xor | Srl | Sra | Or | And => {
                expect_operands(&line, 4, opcode, line_no)?;
                instruction.rd = need_register(line.tokens[1], line_no)?;
                instruction.rs1 = need_register(line.tokens[2], line_no)?;
                instruction.rs2 = need_register(line.tokens[3], line_no)?;
            }

            // These take no operands and ignore any extras.
            Fence | FenceI | Ecall | Ebreak => {}

            Invalid => {
                return Err(Error {
                    message: "unknown mnemonic",
                    line: line_no,
                })
            }
        }

        emit(&mut program, instruction, line_no)?;
    }

    for reference in &unresolved {
        match labels.find(reference.label) {
            Some(pc) => program.instructions[reference.instruction].target = pc,
            None => {
                let line = program.instructions[reference.instruction].line;
                return Err(Error {
                    message: "unknown label",
                    line,
                });
            }
        }
    }

    Ok(program)
}

/// Assembles `text` into a program in one call.
pub fn assemble(text: &str) -> Result<Program, Error> {
    let source = split_lines(text);
    let mut labels = LabelTable::new();

    first_pass(&source, &mut labels)?;
    second_pass(&source, &labels)
}

#[test]
fn test_classify_mnemonic() {
    assert_eq!(classify_mnemonic("addi"), Some(Mnemonic::Op(OpCode::Addi)));
    assert_eq!(classify_mnemonic("ADDI"), Some(Mnemonic::Op(OpCode::Addi)));
    assert_eq!(classify_mnemonic("fence.i"), Some(Mnemonic::Op(OpCode::FenceI)));
    assert_eq!(classify_mnemonic("fence"), Some(Mnemonic::Op(OpCode::Fence)));
    assert_eq!(classify_mnemonic("nop"), Some(Mnemonic::Nop));
    assert_eq!(classify_mnemonic("ret"), Some(Mnemonic::Ret));

    // Prefixes of longer mnemonics stay distinct.
    assert_eq!(classify_mnemonic("add"), Some(Mnemonic::Op(OpCode::Add)));
    assert_eq!(classify_mnemonic("slt"), Some(Mnemonic::Op(OpCode::Slt)));
    assert_eq!(classify_mnemonic("sltiu"), Some(Mnemonic::Op(OpCode::Sltiu)));

    assert_eq!(classify_mnemonic("addiq"), None);
    assert_eq!(classify_mnemonic("fence.x"), None);
    assert_eq!(classify_mnemonic("mul"), None);
    assert_eq!(classify_mnemonic(""), None);
}

#[test]
fn test_parse_immediate() {
    assert_eq!(parse_immediate("0"), Some(0));
    assert_eq!(parse_immediate("42"), Some(42));
    assert_eq!(parse_immediate("+42"), Some(42));
    assert_eq!(parse_immediate("-42"), Some(-42));
    assert_eq!(parse_immediate("0x10"), Some(16));
    assert_eq!(parse_immediate("0XFF"), Some(255));
    assert_eq!(parse_immediate("-0x10"), Some(-16));
    assert_eq!(parse_immediate("0xFFFFFFFF"), Some(-1));
    assert_eq!(parse_immediate("0x1FFFFFFFF"), Some(-1));
    assert_eq!(parse_immediate("4294967296"), Some(0));

    assert_eq!(parse_immediate(""), None);
    assert_eq!(parse_immediate("-"), None);
    assert_eq!(parse_immediate("0x"), None);
    assert_eq!(parse_immediate("12ab"), None);
    assert_eq!(parse_immediate("zz"), None);
}

#[test]
fn test_parse_memory_operand() {
    assert_eq!(
        parse_memory_operand("8(sp)"),
        Some(MemoryOperand {
            offset: 8,
            base: Some(Register::SP),
        })
    );
    assert_eq!(
        parse_memory_operand("-4(s0)"),
        Some(MemoryOperand {
            offset: -4,
            base: Register::from_number(8),
        })
    );
    assert_eq!(
        parse_memory_operand("(a0)"),
        Some(MemoryOperand {
            offset: 0,
            base: Some(Register::A0),
        })
    );
    assert_eq!(
        parse_memory_operand("16"),
        Some(MemoryOperand {
            offset: 16,
            base: None,
        })
    );
    assert_eq!(
        parse_memory_operand("0x20(t0)"),
        Some(MemoryOperand {
            offset: 32,
            base: Register::from_number(5),
        })
    );

    assert_eq!(parse_memory_operand("8(qq)"), None);
    assert_eq!(parse_memory_operand("8(sp"), None);
    assert_eq!(parse_memory_operand("zz(sp)"), None);
    assert_eq!(parse_memory_operand("8x"), None);
}

#[test]
fn test_first_pass_counts_and_labels() {
    let source = split_lines(
        "start: addi x1, x0, 1\n\
         # comment only\n\
         middle:\n\
         add x2, x1, x1\n\
         end: ret\n",
    );
    let mut labels = LabelTable::new();

    let count = first_pass(&source, &mut labels).unwrap();

    assert_eq!(count, 3);
    assert_eq!(labels.find("start"), Some(0));
    assert_eq!(labels.find("middle"), Some(1));
    assert_eq!(labels.find("end"), Some(2));
}

#[test]
fn test_assemble_simple_program() {
    let program = assemble(
        "addi t0, zero, 5\n\
         slli t1, t0, 2\n\
         sw t1, 0(sp)\n",
    )
    .unwrap();

    assert_eq!(program.len(), 3);

    let addi = &program.instructions[0];
    assert_eq!(addi.opcode, OpCode::Addi);
    assert_eq!(addi.rd, Register::from_number(5).unwrap());
    assert_eq!(addi.rs1, Register::ZERO);
    assert_eq!(addi.imm, 5);
    assert_eq!(addi.line, 1);

    let sw = &program.instructions[2];
    assert_eq!(sw.opcode, OpCode::Sw);
    assert_eq!(sw.rs2, Register::from_number(6).unwrap());
    assert_eq!(sw.rs1, Register::SP);
    assert_eq!(sw.imm, 0);
}

#[test]
fn test_forward_references_are_patched() {
    let program = assemble(
        "beq x1, x2, ahead\n\
         jal x0, ahead\n\
         nop\n\
         ahead: nop\n",
    )
    .unwrap();

    assert_eq!(program.instructions[0].target, 3);
    assert_eq!(program.instructions[1].target, 3);
}

#[test]
fn test_backward_references_resolve_immediately() {
    let program = assemble(
        "top: nop\n\
         jal x0, top\n",
    )
    .unwrap();

    assert_eq!(program.instructions[1].target, 0);
}

#[test]
fn test_jal_forms() {
    let program = assemble(
        "jal sub\n\
         jal t0, sub\n\
         sub: nop\n",
    )
    .unwrap();

    assert_eq!(program.instructions[0].rd, Register::RA);
    assert_eq!(program.instructions[0].target, 2);
    assert_eq!(program.instructions[1].rd, Register::from_number(5).unwrap());
    assert_eq!(program.instructions[1].target, 2);

    let error = assemble("jal x1, t0, extra").unwrap_err();
    assert_eq!(error.message, "need jal [rd,] label");
}

#[test]
fn test_pseudo_expansion() {
    let program = assemble("nop\nret\n").unwrap();

    let nop = &program.instructions[0];
    assert_eq!(nop.opcode, OpCode::Addi);
    assert_eq!(nop.rd, Register::ZERO);
    assert_eq!(nop.rs1, Register::ZERO);
    assert_eq!(nop.imm, 0);

    let ret = &program.instructions[1];
    assert_eq!(ret.opcode, OpCode::Jalr);
    assert_eq!(ret.rd, Register::ZERO);
    assert_eq!(ret.rs1, Register::RA);
    assert_eq!(ret.imm, 0);

    // Pseudo-mnemonics ignore operands.
    assert!(assemble("nop x1, x2").is_ok());
}

#[test]
fn test_decode_errors() {
    let error = assemble("frobnicate x1, x2").unwrap_err();
    assert_eq!(error.message, "unknown mnemonic");
    assert_eq!(error.line, 1);

    let error = assemble("addi q0, x0, 1").unwrap_err();
    assert_eq!(error.message, "bad register");

    let error = assemble("addi x1, x0, zz").unwrap_err();
    assert_eq!(error.message, "bad immediate");

    let error = assemble("lw x1, 4[sp]").unwrap_err();
    assert_eq!(error.message, "bad mem operand");

    let error = assemble("beq x1, x2").unwrap_err();
    assert_eq!(error.message, "need beq rs1, rs2, label");

    let error = assemble("add x1, x2").unwrap_err();
    assert_eq!(error.message, "need add rd, rs1, rs2");

    let error = assemble("nop\njal x0, nowhere\n").unwrap_err();
    assert_eq!(error.message, "unknown label");
    assert_eq!(error.line, 2);
}

#[test]
fn test_shift_amount_bounds() {
    assert!(assemble("slli x1, x2, 0").is_ok());
    assert!(assemble("srai x1, x2, 31").is_ok());

    let error = assemble("slli x1, x2, 32").unwrap_err();
    assert_eq!(error.message, "bad shamt");

    let error = assemble("srli x1, x2, -1").unwrap_err();
    assert_eq!(error.message, "bad shamt");
}

#[test]
fn test_duplicate_label_is_first_pass_error() {
    let error = assemble("x: nop\nx: nop\n").unwrap_err();
    assert_eq!(error.message, "duplicate label");
    assert_eq!(error.line, 2);
}

#[test]
fn test_numeric_branch_targets_are_labels() {
    // A numeric operand in a target position is looked up as a label name.
    let error = assemble("beq x1, x2, 5").unwrap_err();
    assert_eq!(error.message, "unknown label");
}

#[test]
fn test_bare_operations_ignore_extras() {
    let program = assemble("fence\nfence.i\necall iorw\n").unwrap();

    assert_eq!(program.instructions[0].opcode, OpCode::Fence);
    assert_eq!(program.instructions[1].opcode, OpCode::FenceI);
    assert_eq!(program.instructions[2].opcode, OpCode::Ecall);
}
