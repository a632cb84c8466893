//! [VirtualMachine] for executing assembled [programs](crate::instruction::Program).
//!
//! The machine owns two independent byte segments (data and stack) mapped
//! into one 32-bit address space, a 32-register file, and a program counter
//! expressed as an instruction index. Execution is a tight fetch-by-index
//! loop bounded by [limits::STEP_BUDGET], so every run terminates.

use crate::error::Error;
use crate::instruction::{OpCode, Program, Register};
use crate::limits;

/// A fixed-capacity byte region with little-endian accessors.
///
/// Reads outside the region yield 0 and writes outside it are dropped.
/// Alignment is enforced by the emulator at the instruction level, not here.
#[derive(Clone, Debug)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Creates a zeroed region of `size` bytes, at most
    /// [limits::MEM_BYTES_MAX].
    pub fn new(size: usize) -> Memory {
        assert!(size <= limits::MEM_BYTES_MAX, "memory region too big");

        Memory {
            bytes: vec![0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn read_byte(&self, address: u32) -> u8 {
        self.bytes.get(address as usize).copied().unwrap_or(0)
    }

    pub fn write_byte(&mut self, address: u32, value: u8) {
        if let Some(byte) = self.bytes.get_mut(address as usize) {
            *byte = value;
        }
    }

    pub fn read_half(&self, address: u32) -> u16 {
        u16::from(self.read_byte(address)) | u16::from(self.read_byte(address.wrapping_add(1))) << 8
    }

    pub fn write_half(&mut self, address: u32, value: u16) {
        self.write_byte(address, value as u8);
        self.write_byte(address.wrapping_add(1), (value >> 8) as u8);
    }

    pub fn read_word(&self, address: u32) -> u32 {
        u32::from(self.read_byte(address))
            | u32::from(self.read_byte(address.wrapping_add(1))) << 8
            | u32::from(self.read_byte(address.wrapping_add(2))) << 16
            | u32::from(self.read_byte(address.wrapping_add(3))) << 24
    }

    pub fn write_word(&mut self, address: u32, value: u32) {
        self.write_byte(address, value as u8);
        self.write_byte(address.wrapping_add(1), (value >> 8) as u8);
        self.write_byte(address.wrapping_add(2), (value >> 16) as u8);
        self.write_byte(address.wrapping_add(3), (value >> 24) as u8);
    }
}

/// Placement and size of the two memory segments in the address space.
///
/// Addresses at or above `stack_base` route to the stack segment; addresses
/// inside the data window route to the data segment; everything else reads
/// as zero and swallows writes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemoryLayout {
    pub data_base: u32,
    pub data_size: usize,
    pub stack_base: u32,
    pub stack_size: usize,
}

impl MemoryLayout {
    /// The default bases with a data window of `data_size` bytes and a 4 KiB
    /// stack.
    pub fn with_data_size(data_size: usize) -> MemoryLayout {
        MemoryLayout {
            data_base: limits::DATA_BASE,
            data_size,
            stack_base: limits::STACK_BASE,
            stack_size: 4096,
        }
    }

    /// First address above the stack window; the default stack pointer.
    pub fn stack_top(&self) -> u32 {
        self.stack_base.wrapping_add(self.stack_size as u32)
    }

    fn data_top(&self) -> u32 {
        self.data_base.wrapping_add(self.data_size as u32)
    }
}

/// Register file and program counter handed to [VirtualMachine::run].
///
/// The program counter is an instruction index, not a byte address.
/// Register 2 (`sp`) defaults to the top of the stack window and register 10
/// (`a0`) to the data base when the caller leaves them at zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Context {
    pub registers: [u32; 32],
    pub pc: i32,
}

impl Default for Context {
    fn default() -> Context {
        Context {
            registers: [0; 32],
            pc: 0,
        }
    }
}

/// Final machine state of a run, captured even when the run trapped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    pub registers: [u32; 32],
    /// Final program counter as an instruction index.
    pub pc: i32,
    /// Number of instructions executed.
    pub steps: usize,
    /// Full final contents of the data segment.
    pub data: Vec<u8>,
    /// Full final contents of the stack segment.
    pub stack: Vec<u8>,
    /// Base address of the stack segment, for caller-side address
    /// translation.
    pub stack_base: u32,
}

impl Default for ExecutionResult {
    fn default() -> ExecutionResult {
        ExecutionResult {
            registers: [0; 32],
            pc: -1,
            steps: 0,
            data: Vec::new(),
            stack: Vec::new(),
            stack_base: 0,
        }
    }
}

/// A runtime failure together with the machine snapshot at the failure
/// point.
#[derive(Clone, Debug)]
pub struct Trap {
    pub error: Error,
    pub execution: ExecutionResult,
}

/// Executes a [Program] against the segmented data/stack memory.
#[derive(Clone, Debug)]
pub struct VirtualMachine {
    pub program: Program,
    layout: MemoryLayout,
    data: Memory,
    stack: Memory,
    registers: [u32; 32],
    pc: i32,
    steps: usize,
}

impl VirtualMachine {
    /// Creates a machine for `program` with zeroed registers and memory.
    /// The stack segment must sit above the data segment.
    pub fn new(program: Program, layout: MemoryLayout) -> VirtualMachine {
        assert!(
            layout.stack_base > layout.data_base,
            "stack segment must sit above the data segment"
        );

        VirtualMachine {
            data: Memory::new(layout.data_size),
            stack: Memory::new(layout.stack_size),
            program,
            layout,
            registers: [0; 32],
            pc: 0,
            steps: 0,
        }
    }

    /// Copies `bytes` to the start of the data segment.
    pub fn load_data(&mut self, bytes: &[u8]) {
        assert!(
            bytes.len() <= self.data.len(),
            "initial data larger than the data segment"
        );

        for (offset, byte) in bytes.iter().enumerate() {
            self.data.write_byte(offset as u32, *byte);
        }
    }

    /// Copies `bytes` into the stack segment starting at `offset`.
    pub fn load_stack(&mut self, bytes: &[u8], offset: u32) {
        assert!(
            bytes.len() <= self.stack.len(),
            "initial bytes larger than the stack segment"
        );

        for (index, byte) in bytes.iter().enumerate() {
            self.stack.write_byte(offset.wrapping_add(index as u32), *byte);
        }
    }

    pub fn registers(&self) -> &[u32; 32] {
        &self.registers
    }

    pub fn pc(&self) -> i32 {
        self.pc
    }

    fn read8(&self, address: u32) -> u8 {
        if address >= self.layout.stack_base {
            return self.stack.read_byte(address - self.layout.stack_base);
        }

        if address >= self.layout.data_base && address < self.layout.data_top() {
            return self.data.read_byte(address - self.layout.data_base);
        }

        0
    }

    fn read16(&self, address: u32) -> u16 {
        if address >= self.layout.stack_base {
            return self.stack.read_half(address - self.layout.stack_base);
        }

        if address >= self.layout.data_base && address < self.layout.data_top() {
            return self.data.read_half(address - self.layout.data_base);
        }

        0
    }

    fn read32(&self, address: u32) -> u32 {
        if address >= self.layout.stack_base {
            return self.stack.read_word(address - self.layout.stack_base);
        }

        if address >= self.layout.data_base && address < self.layout.data_top() {
            return self.data.read_word(address - self.layout.data_base);
        }

        0
    }

    fn write8(&mut self, address: u32, value: u8) {
        if address >= self.layout.stack_base {
            self.stack.write_byte(address - self.layout.stack_base, value);
        } else if address >= self.layout.data_base && address < self.layout.data_top() {
            self.data.write_byte(address - self.layout.data_base, value);
        }
    }

    fn write16(&mut self, address: u32, value: u16) {
        if address >= self.layout.stack_base {
            self.stack.write_half(address - self.layout.stack_base, value);
        } else if address >= self.layout.data_base && address < self.layout.data_top() {
            self.data.write_half(address - self.layout.data_base, value);
        }
    }

    fn write32(&mut self, address: u32, value: u32) {
        if address >= self.layout.stack_base {
            self.stack.write_word(address - self.layout.stack_base, value);
        } else if address >= self.layout.data_base && address < self.layout.data_top() {
            self.data.write_word(address - self.layout.data_base, value);
        }
    }

    fn read_register(&self, register: Register) -> u32 {
        self.registers[register.index()]
    }

    fn write_register(&mut self, register: Register, value: u32) {
        if register.number() != 0 {
            self.registers[register.index()] = value;
        }
    }

    /// Executes exactly one instruction.
    ///
    /// The program counter is an instruction index throughout; only
    /// PC-relative operations see the byte view `pc * 4`. After the step,
    /// register 0 is forced back to zero. A trap leaves the program counter
    /// on the trapping instruction.
    pub fn step(&mut self) -> Result<(), Error> {
        if self.pc < 0 || self.pc as usize >= self.program.len() {
            return Err(Error {
                message: "pc out of range",
                line: -1,
            });
        }

        let instruction = self.program.instructions[self.pc as usize];
        let pc_bytes = (self.pc as u32).wrapping_mul(4);
        let mut next_pc = self.pc + 1;

        use OpCode::*;

        match instruction.opcode {
            Lui => {
                self.write_register(instruction.rd, instruction.imm as u32);
            }

            Auipc => {
                self.write_register(instruction.rd, pc_bytes.wrapping_add(instruction.imm as u32));
            }

            Jal => {
                self.write_register(instruction.rd, pc_bytes.wrapping_add(4));
                next_pc = instruction.target;
            }

            Jalr => {
                let target = self
                    .read_register(instruction.rs1)
                    .wrapping_add(instruction.imm as u32)
                    & !1;

                self.write_register(instruction.rd, pc_bytes.wrapping_add(4));
                next_pc = (target / 4) as i32;
            }

            Beq => {
                if self.read_register(instruction.rs1) == self.read_register(instruction.rs2) {
                    next_pc = instruction.target;
                }
            }

            Bne => {
                if self.read_register(instruction.rs1) != self.read_register(instruction.rs2) {
                    next_pc = instruction.target;
                }
            }

            Blt => {
                let lhs = self.read_register(instruction.rs1) as i32;
                let rhs = self.read_register(instruction.rs2) as i32;

                if lhs < rhs {
                    next_pc = instruction.target;
                }
            }

            Bge => {
                let lhs = self.read_register(instruction.rs1) as i32;
                let rhs = self.read_register(instruction.rs2) as i32;

                if lhs >= rhs {
                    next_pc = instruction.target;
                }
            }

            Bltu => {
                if self.read_register(instruction.rs1) < self.read_register(instruction.rs2) {
                    next_pc = instruction.target;
                }
            }

            Bgeu => {
                if self.read_register(instruction.rs1) >= self.read_register(instruction.rs2) {
                    next_pc = instruction.target;
                }
            }

            Lb => {
                let address = self
                    .read_register(instruction.rs1)
                    .wrapping_add(instruction.imm as u32);
                let value = self.read8(address) as i8;

                self.write_register(instruction.rd, value as i32 as u32);
            }

            Lh => {
                let address = self
                    .read_register(instruction.rs1)
                    .wrapping_add(instruction.imm as u32);

                if address & 1 != 0 {
                    return Err(Error {
                        message: "unaligned lh",
                        line: instruction.line,
                    });
                }

                let value = self.read16(address) as i16;
                self.write_register(instruction.rd, value as i32 as u32);
            }

            Lw => {
                let address = self
                    .read_register(instruction.rs1)
                    .wrapping_add(instruction.imm as u32);

                if address & 3 != 0 {
                    return Err(Error {
                        message: "unaligned lw",
                        line: instruction.line,
                    });
                }

                let value = self.read32(address);
                self.write_register(instruction.rd, value);
            }

            Lbu => {
                let address = self
                    .read_register(instruction.rs1)
                    .wrapping_add(instruction.imm as u32);

                self.write_register(instruction.rd, u32::from(self.read8(address)));
            }

            Lhu => {
                let address = self
                    .read_register(instruction.rs1)
                    .wrapping_add(instruction.imm as u32);

                if address & 1 != 0 {
                    return Err(Error {
                        message: "unaligned lhu",
                        line: instruction.line,
                    });
                }

                self.write_register(instruction.rd, u32::from(self.read16(address)));
            }

            Sb => {
                let address = self
                    .read_register(instruction.rs1)
                    .wrapping_add(instruction.imm as u32);

                self.write8(address, self.read_register(instruction.rs2) as u8);
            }

            Sh => {
                let address = self
                    .read_register(instruction.rs1)
                    .wrapping_add(instruction.imm as u32);

                if address & 1 != 0 {
                    return Err(Error {
                        message: "unaligned sh",
                        line: instruction.line,
                    });
                }

                self.write16(address, self.read_register(instruction.rs2) as u16);
            }

            Sw => {
                let address = self
                    .read_register(instruction.rs1)
                    .wrapping_add(instruction.imm as u32);

                if address & 3 != 0 {
                    return Err(Error {
                        message: "unaligned sw",
                        line: instruction.line,
                    });
                }

                self.write32(address, self.read_register(instruction.rs2));
            }

            Addi => {
                let value = self
                    .read_register(instruction.rs1)
                    .wrapping_add(instruction.imm as u32);

                self.write_register(instruction.rd, value);
            }

            Slti => {
                let value = (self.read_register(instruction.rs1) as i32) < instruction.imm;
                self.write_register(instruction.rd, value as u32);
            }

            Sltiu => {
                let value = self.read_register(instruction.rs1) < instruction.imm as u32;
                self.write_register(instruction.rd, value as u32);
            }

            Xori => {
                let value = self.read_register(instruction.rs1) ^ instruction.imm as u32;
                self.write_register(instruction.rd, value);
            }

            Ori => {
                let value = self.read_register(instruction.rs1) | instruction.imm as u32;
                self.write_register(instruction.rd, value);
            }

            Andi => {
                let value = self.read_register(instruction.rs1) & instruction.imm as u32;
                self.write_register(instruction.rd, value);
            }

            Slli => {
                let value = self
                    .read_register(instruction.rs1)
                    .wrapping_shl(instruction.imm as u32);

                self.write_register(instruction.rd, value);
            }

            Srli => {
                let value = self
                    .read_register(instruction.rs1)
                    .wrapping_shr(instruction.imm as u32);

                self.write_register(instruction.rd, value);
            }

            Srai => {
                let value = (self.read_register(instruction.rs1) as i32)
                    .wrapping_shr(instruction.imm as u32);

                self.write_register(instruction.rd, value as u32);
            }

            Add => {
                let value = self
                    .read_register(instruction.rs1)
                    .wrapping_add(self.read_register(instruction.rs2));

                self.write_register(instruction.rd, value);
            }

            Sub => {
                let value = self
                    .read_register(instruction.rs1)
                    .wrapping_sub(self.read_register(instruction.rs2));

                self.write_register(instruction.rd, value);
            }

            Sll => {
                let value = self
                    .read_register(instruction.rs1)
                    .wrapping_shl(self.read_register(instruction.rs2));

                self.write_register(instruction.rd, value);
            }

            Slt => {
                let lhs = self.read_register(instruction.rs1) as i32;
                let rhs = self.read_register(instruction.rs2) as i32;

                self.write_register(instruction.rd, (lhs < rhs) as u32);
            }

            Sltu => {
                let lhs = self.read_register(instruction.rs1);
                let rhs = self.read_register(instruction.rs2);

                self.write_register(instruction.rd, (lhs < rhs) as u32);
            }

            Xor => {
                let value =
                    self.read_register(instruction.rs1) ^ self.read_register(instruction.rs2);

                self.write_register(instruction.rd, value);
            }

            Srl => {
                let value = self
                    .read_register(instruction.rs1)
                    .wrapping_shr(self.read_register(instruction.rs2));

                self.write_register(instruction.rd, value);
            }

            Sra => {
                let value = (self.read_register(instruction.rs1) as i32)
                    .wrapping_shr(self.read_register(instruction.rs2));

                self.write_register(instruction.rd, value as u32);
            }

            Or => {
                let value =
                    self.read_register(instruction.rs1) | self.read_register(instruction.rs2);

                self.write_register(instruction.rd, value);
            }

            And => {
                let value =
                    self.read_register(instruction.rs1) & self.read_register(instruction.rs2);

                self.write_register(instruction.rd, value);
            }

            Fence | FenceI => {}

            Ecall => {
                return Err(Error {
                    message: "ecall trap",
                    line: instruction.line,
                })
            }

            Ebreak => {
                return Err(Error {
                    message: "ebreak trap",
                    line: instruction.line,
                })
            }

            Invalid => {
                return Err(Error {
                    message: "invalid op",
                    line: instruction.line,
                })
            }
        }

        self.registers[0] = 0;
        self.pc = next_pc;

        Ok(())
    }

    /// Runs the program until the program counter leaves it (normal halt), an
    /// instruction traps, or the step budget is exhausted.
    ///
    /// Registers are seeded from `ctx`, with the stack pointer and first
    /// argument defaulted as described on [Context].
    pub fn run(&mut self, ctx: &Context) -> Result<ExecutionResult, Trap> {
        self.registers = ctx.registers;

        if self.registers[2] == 0 {
            self.registers[2] = self.layout.stack_top();
        }

        if self.registers[10] == 0 {
            self.registers[10] = self.layout.data_base;
        }

        self.pc = ctx.pc;
        self.steps = 0;

        let mut error = None;

        while self.pc >= 0 && (self.pc as usize) < self.program.len() {
            if self.steps >= limits::STEP_BUDGET {
                error = Some(Error {
                    message: "step budget exceeded",
                    line: -1,
                });
                break;
            }

            self.steps += 1;

            if let Err(trap) = self.step() {
                error = Some(trap);
                break;
            }
        }

        let execution = self.snapshot();

        match error {
            None => Ok(execution),
            Some(error) => Err(Trap { error, execution }),
        }
    }

    /// The current machine state as an owned snapshot.
    pub fn snapshot(&self) -> ExecutionResult {
        ExecutionResult {
            registers: self.registers,
            pc: self.pc,
            steps: self.steps,
            data: self.data.as_bytes().to_vec(),
            stack: self.stack.as_bytes().to_vec(),
            stack_base: self.layout.stack_base,
        }
    }
}

#[cfg(test)]
macro_rules! assert_register {
    ($vm:expr, $register:expr, $value:expr) => {
        assert_eq!(
            $vm.registers()[$register],
            $value,
            "register x{} != {}",
            $register,
            $value
        );
    };
}

#[cfg(test)]
fn machine(source: &str, data_size: usize) -> VirtualMachine {
    let program = crate::assembler::assemble(source).expect("could not assemble program");
    VirtualMachine::new(program, MemoryLayout::with_data_size(data_size))
}

#[test]
fn test_memory_little_endian() {
    let mut memory = Memory::new(16);

    memory.write_word(0, 0x1234_5678);

    assert_eq!(memory.read_byte(0), 0x78);
    assert_eq!(memory.read_byte(1), 0x56);
    assert_eq!(memory.read_byte(2), 0x34);
    assert_eq!(memory.read_byte(3), 0x12);
    assert_eq!(memory.read_half(0), 0x5678);
    assert_eq!(memory.read_half(2), 0x1234);
    assert_eq!(memory.read_word(0), 0x1234_5678);
}

#[test]
fn test_memory_out_of_range_is_silent() {
    let mut memory = Memory::new(4);

    memory.write_byte(100, 0xff);
    assert_eq!(memory.read_byte(100), 0);

    // A straddling word write keeps the in-range bytes only.
    memory.write_word(2, 0xAABB_CCDD);
    assert_eq!(memory.read_byte(2), 0xDD);
    assert_eq!(memory.read_byte(3), 0xCC);
    assert_eq!(memory.read_word(2), 0x0000_CCDD);
}

#[test]
fn test_register_zero_is_hardwired() {
    let mut vm = machine("addi x0, x5, 123\naddi x1, x0, 7\n", 0);

    let result = vm.run(&Context::default()).unwrap();

    assert_eq!(result.registers[0], 0);
    assert_eq!(result.registers[1], 7);
}

#[test]
fn test_alu_wraparound_and_shifts() {
    let source = "lui t0, 0x7FFFFFFF\n\
                  addi t0, t0, 1\n\
                  addi t1, x0, -1\n\
                  srli t2, t1, 28\n\
                  srai t3, t1, 28\n\
                  slli t4, t1, 4\n\
                  sub t5, x0, t1\n";
    let mut vm = machine(source, 0);

    let result = vm.run(&Context::default()).unwrap();

    assert_eq!(result.registers[5], 0x8000_0000);
    assert_eq!(result.registers[6], 0xFFFF_FFFF);
    assert_eq!(result.registers[7], 0x0000_000F);
    assert_eq!(result.registers[28], 0xFFFF_FFFF);
    assert_eq!(result.registers[29], 0xFFFF_FFF0);
    assert_eq!(result.registers[30], 1);
}

#[test]
fn test_register_shifts_mask_to_five_bits() {
    let source = "addi t0, x0, 1\n\
                  addi t1, x0, 33\n\
                  sll t2, t0, t1\n";
    let mut vm = machine(source, 0);

    let result = vm.run(&Context::default()).unwrap();

    // 33 & 31 == 1
    assert_eq!(result.registers[7], 2);
}

#[test]
fn test_comparisons() {
    let source = "addi t0, x0, -1\n\
                  addi t1, x0, 1\n\
                  slt t2, t0, t1\n\
                  sltu t3, t0, t1\n\
                  slti t4, t0, 0\n\
                  sltiu t5, t1, -1\n";
    let mut vm = machine(source, 0);

    let result = vm.run(&Context::default()).unwrap();

    assert_eq!(result.registers[7], 1);
    assert_eq!(result.registers[28], 0);
    assert_eq!(result.registers[29], 1);
    assert_eq!(result.registers[30], 1);
}

#[test]
fn test_jal_and_jalr_link_byte_addresses() {
    let source = "jal ra, sub\n\
                  jal x0, done\n\
                  sub: jalr t0, ra, 0\n\
                  done: nop\n";
    let mut vm = machine(source, 0);

    let result = vm.run(&Context::default()).unwrap();

    // jal at pc 0 links byte address 4 and jumps to pc 2; jalr links 2*4+4
    // and returns to byte address 4 / 4 = pc 1.
    assert_eq!(result.registers[1], 4);
    assert_eq!(result.registers[5], 12);
    assert_eq!(result.steps, 4);
    assert_eq!(result.pc, 4);
}

#[test]
fn test_jalr_clears_bit_zero() {
    let source = "addi t0, x0, 9\n\
                  jalr x0, t0, 0\n";
    let mut vm = machine(source, 0);

    let result = vm.run(&Context::default()).unwrap();

    // (9 & !1) / 4 == 2 == the end of the program.
    assert_eq!(result.pc, 2);
}

#[test]
fn test_branches() {
    let source = "addi t0, x0, -1\n\
                  addi t1, x0, 1\n\
                  blt t0, t1, signed\n\
                  ecall\n\
                  signed: bltu t1, t0, unsigned\n\
                  ecall\n\
                  unsigned: beq t0, t0, done\n\
                  ecall\n\
                  done: nop\n";
    let mut vm = machine(source, 0);

    let result = vm.run(&Context::default()).unwrap();

    assert_eq!(result.pc, 9);
    assert_eq!(result.steps, 6);
}

#[test]
fn test_sp_and_a0_defaults() {
    let mut vm = machine("nop\n", 16);
    let result = vm.run(&Context::default()).unwrap();

    let layout = MemoryLayout::with_data_size(16);
    assert_eq!(result.registers[2], layout.stack_top());
    assert_eq!(result.registers[10], limits::DATA_BASE);

    // Caller-provided values are kept.
    let mut vm = machine("nop\n", 16);
    let mut ctx = Context::default();
    ctx.registers[2] = 0x8000_0100;
    ctx.registers[10] = 0x1000_0004;

    let result = vm.run(&ctx).unwrap();

    assert_eq!(result.registers[2], 0x8000_0100);
    assert_eq!(result.registers[10], 0x1000_0004);
}

#[test]
fn test_loads_and_stores_route_between_segments() {
    let source = "lui t0, 0x11223344\n\
                  sw t0, 0(a0)\n\
                  lw t1, 0(a0)\n\
                  sw t0, -4(sp)\n\
                  lhu t2, -4(sp)\n\
                  lb t3, 3(a0)\n";
    let mut vm = machine(source, 8);

    let result = vm.run(&Context::default()).unwrap();

    assert_eq!(result.registers[6], 0x1122_3344);
    assert_eq!(result.registers[7], 0x3344);
    assert_eq!(result.registers[28], 0x11);
    assert_eq!(&result.data[..4], &[0x44, 0x33, 0x22, 0x11]);
    assert_eq!(&result.stack[4092..], &[0x44, 0x33, 0x22, 0x11]);
    assert_eq!(result.stack_base, limits::STACK_BASE);
}

#[test]
fn test_unmapped_addresses_read_zero_and_drop_writes() {
    let source = "addi t0, x0, 77\n\
                  sb t0, 64(a0)\n\
                  lbu t1, 64(a0)\n\
                  lbu t2, 0(x0)\n";
    // Data segment of 8 bytes: offset 64 is inside the routing window of
    // nothing at all.
    let mut vm = machine(source, 8);

    let result = vm.run(&Context::default()).unwrap();

    assert_eq!(result.registers[6], 0);
    assert_eq!(result.registers[7], 0);
}

#[test]
fn test_unaligned_accesses_trap() {
    let cases = [
        ("lh t0, 1(x0)\n", "unaligned lh"),
        ("lhu t0, 3(x0)\n", "unaligned lhu"),
        ("lw t0, 2(x0)\n", "unaligned lw"),
        ("sh t0, 1(x0)\n", "unaligned sh"),
        ("sw t0, 4(t1)\n", "unaligned sw"),
    ];

    for (source, message) in &cases {
        let mut vm = machine(source, 0);
        let mut ctx = Context::default();
        ctx.registers[6] = 2;

        let trap = vm.run(&ctx).unwrap_err();

        assert_eq!(trap.error.message, *message);
        assert_eq!(trap.error.line, 1);
        assert_eq!(trap.execution.pc, 0);
    }

    // Byte accesses never trap, whatever the address parity.
    let mut vm = machine("lb t0, 1(x0)\nsb t0, 3(x0)\n", 0);
    assert!(vm.run(&Context::default()).is_ok());
}

#[test]
fn test_load_stack_seeds_stack_segment() {
    let source = "lui t1, 0x80000000\n\
                  lbu t0, 2(t1)\n\
                  lw t2, 4(t1)\n";
    let mut vm = machine(source, 0);

    vm.load_stack(&[1, 2, 3, 4], 0);
    vm.load_stack(&[0x78, 0x56, 0x34, 0x12], 4);

    let result = vm.run(&Context::default()).unwrap();

    assert_eq!(result.registers[5], 3);
    assert_eq!(result.registers[7], 0x1234_5678);
    assert_eq!(&result.stack[..8], &[1, 2, 3, 4, 0x78, 0x56, 0x34, 0x12]);
}

#[test]
fn test_ecall_and_ebreak_trap() {
    let mut vm = machine("nop\necall\n", 0);
    let trap = vm.run(&Context::default()).unwrap_err();

    assert_eq!(trap.error.message, "ecall trap");
    assert_eq!(trap.error.line, 2);
    assert_eq!(trap.execution.steps, 2);

    let mut vm = machine("ebreak\n", 0);
    let trap = vm.run(&Context::default()).unwrap_err();

    assert_eq!(trap.error.message, "ebreak trap");
}

#[test]
fn test_invalid_opcode_traps() {
    let mut program = Program::new();
    program.push(crate::instruction::Instruction::default());

    let mut vm = VirtualMachine::new(program, MemoryLayout::with_data_size(0));
    let trap = vm.run(&Context::default()).unwrap_err();

    assert_eq!(trap.error.message, "invalid op");
}

#[test]
fn test_step_out_of_range() {
    let mut vm = machine("nop\n", 0);

    vm.run(&Context::default()).unwrap();

    let error = vm.step().unwrap_err();
    assert_eq!(error.message, "pc out of range");
    assert_eq!(error.line, -1);
}

#[test]
fn test_step_budget() {
    let mut vm = machine("loop: jal x0, loop\n", 0);
    let trap = vm.run(&Context::default()).unwrap_err();

    assert_eq!(trap.error.message, "step budget exceeded");
    assert_eq!(trap.error.line, -1);
    assert_eq!(trap.execution.steps, limits::STEP_BUDGET);
}

#[test]
fn test_lui_loads_immediate_verbatim() {
    let mut vm = machine("lui t0, 0x12345\n", 0);
    let result = vm.run(&Context::default()).unwrap();

    assert_register!(vm, 5, 0x12345);
    assert_eq!(result.registers[5], 0x12345);
}

#[test]
fn test_auipc_sees_byte_pc() {
    let mut vm = machine("nop\nnop\nauipc t0, 8\n", 0);
    let result = vm.run(&Context::default()).unwrap();

    // pc 2 in bytes is 8.
    assert_eq!(result.registers[5], 16);
}
