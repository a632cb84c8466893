use rv32::{
    emulator::Context,
    limits,
    outcome::{run, Stage},
};

/// Walks a NUL-terminated string in the data segment and lowercases every
/// ASCII letter in place.
const LOWERCASE: &str = r#"
addi t4, x0, 65
addi t5, x0, 91
addi t6, x0, 32
.loop:
lb t0, 0(a0)
beq t0, x0, .done
blt t0, t4, .store
bltu t0, t5, .make
jal x0, .store
.make:
add t0, t0, t6
.store:
sb t0, 0(a0)
addi a0, a0, 1
jal x0, .loop
.done:
jal x0, exit
exit:
"#;

#[test]
fn test_lowercase_hello_world() {
    let outcome = run(LOWERCASE, b"HELLO, WORLD!\0", &Context::default());

    assert!(outcome.ok);
    assert_eq!(outcome.stage, Stage::Ok);
    assert!(outcome.error.is_none());
    assert_eq!(&outcome.execution.data[..], b"hello, world!\0");

    // A normal halt: the trailing jump lands one past the last instruction.
    assert_eq!(outcome.execution.pc, 13);
    assert_eq!(outcome.execution.steps, 104);

    // a0 walked to the terminator.
    assert_eq!(outcome.execution.registers[10], limits::DATA_BASE + 13);
}

#[test]
fn test_lowercase_leaves_non_letters_alone() {
    let outcome = run(LOWERCASE, b"a0-B!\0", &Context::default());

    assert!(outcome.ok);
    assert_eq!(&outcome.execution.data[..], b"a0-b!\0");
}

#[test]
fn test_lowercase_empty_string() {
    let outcome = run(LOWERCASE, b"\0", &Context::default());

    assert!(outcome.ok);
    assert_eq!(&outcome.execution.data[..], b"\0");
    // Setup, then one trip through the loop head straight to the exit.
    assert_eq!(outcome.execution.steps, 6);
}

#[test]
fn test_identical_runs_are_bit_identical() {
    let first = run(LOWERCASE, b"MiXeD cAsE\0", &Context::default());
    let second = run(LOWERCASE, b"MiXeD cAsE\0", &Context::default());

    assert_eq!(first.execution, second.execution);
    assert_eq!(&first.execution.data[..], b"mixed case\0");
}
