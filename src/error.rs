//! Error types shared by the assembler and the emulator.

use std::fmt;

use edit_distance::edit_distance;

/// An assembly or runtime failure: a fixed message tag and the 1-based source
/// line it was raised on, or -1 when no line applies.
///
/// The first error aborts its stage; nothing is repaired or retried
/// internally. Errors travel by value, never by unwinding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub message: &'static str,
    pub line: i32,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.line < 0 {
            write!(f, "{}", self.message)
        } else {
            write!(f, "line {}: {}", self.line, self.message)
        }
    }
}

const MNEMONICS: [&str; 43] = [
    "lui", "auipc", "jal", "jalr", "beq", "bne", "blt", "bge", "bltu", "bgeu", "lb", "lh", "lw",
    "lbu", "lhu", "sb", "sh", "sw", "addi", "slti", "sltiu", "xori", "ori", "andi", "slli", "srli",
    "srai", "add", "sub", "sll", "slt", "sltu", "xor", "srl", "sra", "or", "and", "fence",
    "fence.i", "ecall", "ebreak", "nop", "ret",
];

/// Suggests the closest known mnemonic for an unrecognized one, if any is
/// close enough to be a plausible typo.
pub fn suggest_mnemonic(text: &str) -> Option<&'static str> {
    let text = text.to_ascii_lowercase();

    MNEMONICS
        .iter()
        .map(|mnemonic| (edit_distance(&text, mnemonic), *mnemonic))
        .min()
        .filter(|(distance, _)| *distance <= 2)
        .map(|(_, mnemonic)| mnemonic)
}

#[test]
fn test_display() {
    let error = Error {
        message: "duplicate label",
        line: 3,
    };
    assert_eq!(error.to_string(), "line 3: duplicate label");

    let error = Error {
        message: "step budget exceeded",
        line: -1,
    };
    assert_eq!(error.to_string(), "step budget exceeded");
}

#[test]
fn test_suggest_mnemonic() {
    assert_eq!(suggest_mnemonic("subb"), Some("sub"));
    assert_eq!(suggest_mnemonic("ecal"), Some("ecall"));
    assert_eq!(suggest_mnemonic("ADDI"), Some("addi"));
    assert_eq!(suggest_mnemonic("qqqqqq"), None);
}
