use rv32::{
    emulator::Context,
    limits,
    outcome::{run, Stage},
};

#[test]
fn test_infinite_loop_hits_step_budget() {
    let outcome = run("loop: jal x0, loop\n", &[], &Context::default());

    assert!(!outcome.ok);
    assert_eq!(outcome.stage, Stage::Runtime);
    assert_eq!(outcome.line, -1);
    assert_eq!(
        outcome.error.map(|e| e.message),
        Some("step budget exceeded")
    );
    assert_eq!(outcome.execution.steps, limits::STEP_BUDGET);
}

#[test]
fn test_self_branch_hits_step_budget() {
    let outcome = run("spin: beq x0, x0, spin\n", &[], &Context::default());

    assert_eq!(outcome.stage, Stage::Runtime);
    assert_eq!(outcome.execution.steps, limits::STEP_BUDGET);
}

#[test]
fn test_nop_stream_changes_nothing_but_pc() {
    let source = "nop\n".repeat(100);
    let data = [7u8, 8, 9];

    let outcome = run(&source, &data, &Context::default());

    assert!(outcome.ok);
    assert_eq!(outcome.execution.pc, 100);
    assert_eq!(outcome.execution.steps, 100);
    assert_eq!(&outcome.execution.data[..], &data[..]);

    for (index, value) in outcome.execution.registers.iter().enumerate() {
        match index {
            // Only the defaulted stack pointer and first argument moved.
            2 => assert_eq!(*value, outcome.execution.stack_base + 4096),
            10 => assert_eq!(*value, limits::DATA_BASE),
            _ => assert_eq!(*value, 0, "register x{} changed", index),
        }
    }
}

#[test]
fn test_countdown_loop() {
    let source = "addi t0, x0, 10\n\
                  addi t1, x0, 0\n\
                  again: add t1, t1, t0\n\
                  addi t0, t0, -1\n\
                  bne t0, x0, again\n";

    let outcome = run(source, &[], &Context::default());

    assert!(outcome.ok);
    // 10 + 9 + ... + 1
    assert_eq!(outcome.execution.registers[6], 55);
    assert_eq!(outcome.execution.registers[5], 0);
    assert_eq!(outcome.execution.steps, 2 + 10 * 3);
}

#[test]
fn test_ret_through_link_register() {
    // A leaf call: jal links the return address, ret jumps back through ra.
    let source = "jal double\n\
                  jal x0, end\n\
                  double: add a1, a1, a1\n\
                  ret\n\
                  end: nop\n";

    let mut ctx = Context::default();
    ctx.registers[11] = 21;

    let outcome = run(source, &[], &ctx);

    assert!(outcome.ok);
    assert_eq!(outcome.execution.registers[11], 42);
    assert_eq!(outcome.execution.pc, 5);
}
