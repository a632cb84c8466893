//! Types for representing instructions and their parts.

use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use lazy_static::lazy_static;

use crate::limits;

/// Operations of the reduced RV32I instruction set.
///
/// The enumeration is closed: the decoder, the validator and the emulator all
/// match on it exhaustively, so adding an operation forces every consumer to
/// handle it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpCode {
    /// Loads the immediate into a register, verbatim.
    Lui,

    /// Adds the immediate to the byte view of the program counter.
    Auipc,

    /// Jumps to a label, linking the return address.
    Jal,

    /// Jumps to a register-relative byte address, linking the return address.
    Jalr,

    /// Branches if the source registers are equal.
    Beq,

    /// Branches if the source registers differ.
    Bne,

    /// Branches on signed less-than.
    Blt,

    /// Branches on signed greater-or-equal.
    Bge,

    /// Branches on unsigned less-than.
    Bltu,

    /// Branches on unsigned greater-or-equal.
    Bgeu,

    /// Loads a sign-extended byte.
    Lb,

    /// Loads a sign-extended half-word. Traps on odd addresses.
    Lh,

    /// Loads a word. Traps on addresses not divisible by four.
    Lw,

    /// Loads a zero-extended byte.
    Lbu,

    /// Loads a zero-extended half-word. Traps on odd addresses.
    Lhu,

    /// Stores the low byte of a register.
    Sb,

    /// Stores the low half-word of a register. Traps on odd addresses.
    Sh,

    /// Stores a word. Traps on addresses not divisible by four.
    Sw,

    /// Adds an immediate to a register.
    Addi,

    /// Signed compare of a register against an immediate.
    Slti,

    /// Unsigned compare of a register against an immediate.
    Sltiu,

    /// Exclusive-or with an immediate.
    Xori,

    /// Or with an immediate.
    Ori,

    /// And with an immediate.
    Andi,

    /// Shift left by an immediate in `[0, 31]`.
    Slli,

    /// Logical shift right by an immediate in `[0, 31]`.
    Srli,

    /// Arithmetic shift right by an immediate in `[0, 31]`.
    Srai,

    /// 32-bit wraparound addition.
    Add,

    /// 32-bit wraparound subtraction.
    Sub,

    /// Shift left by the low five bits of a register.
    Sll,

    /// Signed register compare.
    Slt,

    /// Unsigned register compare.
    Sltu,

    /// Register exclusive-or.
    Xor,

    /// Logical shift right by the low five bits of a register.
    Srl,

    /// Arithmetic shift right by the low five bits of a register.
    Sra,

    /// Register or.
    Or,

    /// Register and.
    And,

    /// Memory ordering fence; a no-op on this machine.
    Fence,

    /// Instruction stream fence; a no-op on this machine.
    FenceI,

    /// Environment call. Always traps.
    Ecall,

    /// Breakpoint. Always traps.
    Ebreak,

    /// Placeholder opcode of a default-initialized instruction.
    /// Executing it traps.
    Invalid,
}

impl OpCode {
    /// The canonical lower-case spelling of the operation.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Lui => "lui",
            OpCode::Auipc => "auipc",
            OpCode::Jal => "jal",
            OpCode::Jalr => "jalr",
            OpCode::Beq => "beq",
            OpCode::Bne => "bne",
            OpCode::Blt => "blt",
            OpCode::Bge => "bge",
            OpCode::Bltu => "bltu",
            OpCode::Bgeu => "bgeu",
            OpCode::Lb => "lb",
            OpCode::Lh => "lh",
            OpCode::Lw => "lw",
            OpCode::Lbu => "lbu",
            OpCode::Lhu => "lhu",
            OpCode::Sb => "sb",
            OpCode::Sh => "sh",
            OpCode::Sw => "sw",
            OpCode::Addi => "addi",
            OpCode::Slti => "slti",
            OpCode::Sltiu => "sltiu",
            OpCode::Xori => "xori",
            OpCode::Ori => "ori",
            OpCode::Andi => "andi",
            OpCode::Slli => "slli",
            OpCode::Srli => "srli",
            OpCode::Srai => "srai",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Sll => "sll",
            OpCode::Slt => "slt",
            OpCode::Sltu => "sltu",
            OpCode::Xor => "xor",
            OpCode::Srl => "srl",
            OpCode::Sra => "sra",
            OpCode::Or => "or",
            OpCode::And => "and",
            OpCode::Fence => "fence",
            OpCode::FenceI => "fence.i",
            OpCode::Ecall => "ecall",
            OpCode::Ebreak => "ebreak",
            OpCode::Invalid => "<invalid>",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// One of the 32 general-purpose registers.
///
/// Register 0 is hard-wired to zero: the emulator discards writes to it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Register(u8);

lazy_static! {
    static ref ABI_NAMES: HashMap<&'static str, Register> = {
        let mut names = HashMap::new();

        for (name, number) in &[
            ("zero", 0u8),
            ("ra", 1),
            ("sp", 2),
            ("gp", 3),
            ("tp", 4),
            ("t0", 5),
            ("t1", 6),
            ("t2", 7),
            ("s0", 8),
            ("fp", 8),
            ("s1", 9),
            ("a0", 10),
            ("a1", 11),
            ("a2", 12),
            ("a3", 13),
            ("a4", 14),
            ("a5", 15),
            ("a6", 16),
            ("a7", 17),
            ("s2", 18),
            ("s3", 19),
            ("s4", 20),
            ("s5", 21),
            ("s6", 22),
            ("s7", 23),
            ("s8", 24),
            ("s9", 25),
            ("s10", 26),
            ("s11", 27),
            ("t3", 28),
            ("t4", 29),
            ("t5", 30),
            ("t6", 31),
        ] {
            names.insert(*name, Register(*number));
        }

        names
    };
}

impl Register {
    pub const ZERO: Register = Register(0);
    pub const RA: Register = Register(1);
    pub const SP: Register = Register(2);
    pub const A0: Register = Register(10);

    /// Returns the register with the given number, which must be below 32.
    pub fn from_number(number: u8) -> Option<Register> {
        if number < 32 {
            Some(Register(number))
        } else {
            None
        }
    }

    /// Parses a register name: either `x<N>` with `N` in `[0, 31]` or one of
    /// the standard ABI names (`zero`, `ra`, `sp`, `gp`, `tp`, `t0`-`t6`,
    /// `s0`-`s11`, `fp`, `a0`-`a7`). Matching is case-insensitive.
    pub fn from_name(name: &str) -> Option<Register> {
        if name.len() >= 2 && (name.starts_with('x') || name.starts_with('X')) {
            let digits = &name[1..];

            if !digits.bytes().all(|byte| byte.is_ascii_digit()) {
                return None;
            }

            return digits.parse::<u8>().ok().and_then(Register::from_number);
        }

        ABI_NAMES.get(name.to_ascii_lowercase().as_str()).copied()
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// A single decoded instruction.
///
/// Register fields the operation has no use for stay at register 0; `target`
/// is a resolved instruction index and stays at -1 for operations without a
/// branch or jump target.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub rd: Register,
    pub rs1: Register,
    pub rs2: Register,
    /// Immediate operand, wrapped to 32 bits by the assembler.
    pub imm: i32,
    /// Resolved branch/jump target as an instruction index, -1 if not
    /// applicable.
    pub target: i32,
    /// 1-based source line the instruction was assembled from.
    pub line: i32,
}

impl Default for Instruction {
    fn default() -> Instruction {
        Instruction {
            opcode: OpCode::Invalid,
            rd: Register::ZERO,
            rs1: Register::ZERO,
            rs2: Register::ZERO,
            imm: 0,
            target: -1,
            line: -1,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use OpCode::*;

        match self.opcode {
            Lui | Auipc => write!(f, "{} {}, {}", self.opcode, self.rd, self.imm),
            Jal => write!(f, "{} {}, @{}", self.opcode, self.rd, self.target),
            Jalr => write!(f, "{} {}, {}, {}", self.opcode, self.rd, self.rs1, self.imm),
            Beq | Bne | Blt | Bge | Bltu | Bgeu => {
                write!(f, "{} {}, {}, @{}", self.opcode, self.rs1, self.rs2, self.target)
            }
            Lb | Lh | Lw | Lbu | Lhu => {
                write!(f, "{} {}, {}({})", self.opcode, self.rd, self.imm, self.rs1)
            }
            Sb | Sh | Sw => {
                write!(f, "{} {}, {}({})", self.opcode, self.rs2, self.imm, self.rs1)
            }
            Addi | Slti | Sltiu | Xori | Ori | Andi | Slli | Srli | Srai => {
                write!(f, "{} {}, {}, {}", self.opcode, self.rd, self.rs1, self.imm)
            }
            Add | Sub | Sll | Slt | Sltu | Xor | Srl | Sra | Or | And => {
                write!(f, "{} {}, {}, {}", self.opcode, self.rd, self.rs1, self.rs2)
            }
            Fence | FenceI | Ecall | Ebreak | Invalid => write!(f, "{}", self.opcode),
        }
    }
}

/// The ordered sequence of resolved instructions produced by the assembler,
/// bounded by [limits::MAX_INSNS].
#[derive(Clone, Debug, Default)]
pub struct Program {
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn new() -> Program {
        Program {
            instructions: Vec::new(),
        }
    }

    /// Appends an instruction. Returns `false` when the program is full.
    pub fn push(&mut self, instruction: Instruction) -> bool {
        if self.instructions.len() >= limits::MAX_INSNS {
            return false;
        }

        self.instructions.push(instruction);
        true
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let listing = self
            .instructions
            .iter()
            .enumerate()
            .map(|(pc, instruction)| format!("{:4}: {}", pc, instruction))
            .join("\n");

        write!(f, "{}", listing)
    }
}

#[test]
fn test_register_from_name() {
    assert_eq!(Register::from_name("x0"), Some(Register::ZERO));
    assert_eq!(Register::from_name("x31"), Register::from_number(31));
    assert_eq!(Register::from_name("X5"), Register::from_number(5));
    assert_eq!(Register::from_name("x032"), None);
    assert_eq!(Register::from_name("x32"), None);
    assert_eq!(Register::from_name("x1a"), None);
    assert_eq!(Register::from_name("x"), None);

    assert_eq!(Register::from_name("zero"), Some(Register::ZERO));
    assert_eq!(Register::from_name("ra"), Some(Register::RA));
    assert_eq!(Register::from_name("SP"), Some(Register::SP));
    assert_eq!(Register::from_name("fp"), Register::from_number(8));
    assert_eq!(Register::from_name("s0"), Register::from_number(8));
    assert_eq!(Register::from_name("s10"), Register::from_number(26));
    assert_eq!(Register::from_name("t6"), Register::from_number(31));
    assert_eq!(Register::from_name("a8"), None);
    assert_eq!(Register::from_name("q0"), None);
    assert_eq!(Register::from_name(""), None);
}

#[test]
fn test_instruction_display() {
    let instruction = Instruction {
        opcode: OpCode::Add,
        rd: Register::from_number(5).unwrap(),
        rs1: Register::from_number(6).unwrap(),
        rs2: Register::from_number(7).unwrap(),
        ..Default::default()
    };

    assert_eq!(instruction.to_string(), "add x5, x6, x7");

    let instruction = Instruction {
        opcode: OpCode::Lw,
        rd: Register::A0,
        rs1: Register::SP,
        imm: -4,
        ..Default::default()
    };

    assert_eq!(instruction.to_string(), "lw x10, -4(x2)");
}

#[test]
fn test_program_capacity() {
    let mut program = Program::new();

    for _ in 0..limits::MAX_INSNS {
        assert!(program.push(Instruction::default()));
    }

    assert!(!program.push(Instruction::default()));
    assert_eq!(program.len(), limits::MAX_INSNS);
}
