use rv32::{
    emulator::Context,
    limits,
    outcome::{run, Stage},
};

#[test]
fn test_stack_and_data_are_independent() {
    // Write the same offsets in both segments and read them back.
    let source = "addi t0, x0, 0x55\n\
                  addi t1, x0, 0x77\n\
                  sb t0, 0(a0)\n\
                  lui t2, 0x80000000\n\
                  sb t1, 0(t2)\n\
                  lbu t3, 0(a0)\n\
                  lbu t4, 0(t2)\n";

    let outcome = run(source, &[0], &Context::default());

    assert!(outcome.ok);
    assert_eq!(outcome.execution.registers[28], 0x55);
    assert_eq!(outcome.execution.registers[29], 0x77);
    assert_eq!(outcome.execution.data[0], 0x55);
    assert_eq!(outcome.execution.stack[0], 0x77);
}

#[test]
fn test_word_roundtrip_through_stack() {
    let source = "lui t0, 0xDEADBEEF\n\
                  sw t0, -8(sp)\n\
                  lw t1, -8(sp)\n\
                  lhu t2, -8(sp)\n\
                  lh t3, -6(sp)\n";

    let outcome = run(source, &[], &Context::default());

    assert!(outcome.ok);
    assert_eq!(outcome.execution.registers[6], 0xDEAD_BEEF);
    assert_eq!(outcome.execution.registers[7], 0xBEEF);
    // lh sign-extends 0xDEAD.
    assert_eq!(outcome.execution.registers[28], 0xFFFF_DEAD);
}

#[test]
fn test_writes_past_segment_end_are_dropped() {
    // The data segment is 4 bytes; offset 16 is past its window but below
    // the stack base, so the store vanishes and the load reads zero.
    let source = "addi t0, x0, 99\n\
                  sb t0, 16(a0)\n\
                  lbu t1, 16(a0)\n";

    let outcome = run(source, &[1, 2, 3, 4], &Context::default());

    assert!(outcome.ok);
    assert_eq!(outcome.execution.registers[6], 0);
    assert_eq!(&outcome.execution.data[..], &[1, 2, 3, 4]);
}

#[test]
fn test_writes_past_stack_end_are_dropped() {
    // Addresses at or above the stack base always route to the stack
    // segment; past its declared size they degrade to no-ops.
    let source = "addi t0, x0, 99\n\
                  lui t1, 0x80002000\n\
                  sb t0, 0(t1)\n\
                  lbu t2, 0(t1)\n";

    let outcome = run(source, &[], &Context::default());

    assert!(outcome.ok);
    assert_eq!(outcome.execution.registers[7], 0);
    assert!(outcome.execution.stack.iter().all(|byte| *byte == 0));
}

#[test]
fn test_reads_below_data_base_are_zero() {
    let source = "lw t0, 0(x0)\n\
                  lw t1, 0x100(x0)\n";

    let outcome = run(source, &[0xFF; 4], &Context::default());

    assert!(outcome.ok);
    assert_eq!(outcome.execution.registers[5], 0);
    assert_eq!(outcome.execution.registers[6], 0);
}

#[test]
fn test_misaligned_half_word_traps() {
    let outcome = run("lh t0, 1(a0)\n", &[0; 8], &Context::default());

    assert!(!outcome.ok);
    assert_eq!(outcome.stage, Stage::Runtime);
    assert_eq!(outcome.line, 1);
    assert_eq!(outcome.error.map(|e| e.message), Some("unaligned lh"));

    let outcome = run("nop\nsw t0, 2(a0)\n", &[0; 8], &Context::default());

    assert_eq!(outcome.line, 2);
    assert_eq!(outcome.error.map(|e| e.message), Some("unaligned sw"));
    // The trap snapshot still carries the machine state.
    assert_eq!(outcome.execution.pc, 1);
    assert_eq!(outcome.execution.steps, 2);
}

#[test]
fn test_byte_accesses_never_trap() {
    let source = "lb t0, 1(a0)\n\
                  lbu t1, 3(a0)\n\
                  sb t0, 5(a0)\n";

    let outcome = run(source, &[0; 8], &Context::default());

    assert!(outcome.ok);
}

#[test]
fn test_data_buffer_is_copied_to_offset_zero() {
    let outcome = run("nop\n", b"\x01\x02\x03", &Context::default());

    assert!(outcome.ok);
    assert_eq!(&outcome.execution.data[..], b"\x01\x02\x03");
    assert_eq!(outcome.execution.stack.len(), 4096);
    assert_eq!(outcome.execution.stack_base, limits::STACK_BASE);
}
