//! Driving a complete assemble-and-execute cycle and reporting the result.
//!
//! The driver runs pass 1, pass 2 and the virtual machine in sequence,
//! short-circuiting at the first failure and tagging the [Outcome] with the
//! stage it happened in. Only a clean run through all three stages is `ok`.

use slog::{debug, o, Discard, Logger};

use crate::assembler::{first_pass, second_pass};
use crate::emulator::{Context, ExecutionResult, MemoryLayout, VirtualMachine};
use crate::error::Error;
use crate::lexer::split_lines;
use crate::symbol_table::LabelTable;

/// The pipeline stage a run failed in, or [Stage::Ok] for a clean run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Ok,
    FirstPass,
    SecondPass,
    Runtime,
}

/// The envelope returned to the caller: overall success, the failing stage
/// and line (if any), and the final execution snapshot.
///
/// The snapshot is populated for every run that reached the virtual machine,
/// runtime traps included; assembly failures carry an empty default.
#[derive(Clone, Debug)]
pub struct Outcome {
    pub ok: bool,
    pub stage: Stage,
    /// 1-based source line of the failure, or -1.
    pub line: i32,
    pub error: Option<Error>,
    pub execution: ExecutionResult,
}

impl Outcome {
    fn failure(stage: Stage, error: Error, execution: ExecutionResult) -> Outcome {
        Outcome {
            ok: false,
            stage,
            line: error.line,
            error: Some(error),
            execution,
        }
    }
}

/// Assembles and runs `text` with the default memory placement: the data
/// segment sized to `data`, a 4 KiB stack, and the standard segment bases.
///
/// `data` is copied to the start of the data segment before execution.
/// Repeated invocation with identical inputs yields identical outcomes.
pub fn run(text: &str, data: &[u8], ctx: &Context) -> Outcome {
    run_with(text, data, ctx, MemoryLayout::with_data_size(data.len()), None)
}

/// Like [run], with a caller-chosen [MemoryLayout] and an optional logger.
pub fn run_with<L>(text: &str, data: &[u8], ctx: &Context, layout: MemoryLayout, logger: L) -> Outcome
where
    L: Into<Option<Logger>>,
{
    let logger = logger
        .into()
        .unwrap_or_else(|| Logger::root(Discard, o!()));

    let assembly_log = logger.new(o!("stage" => "assembly"));

    let source = split_lines(text);
    let mut labels = LabelTable::new();

    let count = match first_pass(&source, &mut labels) {
        Ok(count) => count,
        Err(error) => {
            debug!(assembly_log, "first pass failed"; "error" => %error);
            return Outcome::failure(Stage::FirstPass, error, ExecutionResult::default());
        }
    };

    debug!(assembly_log, "first pass complete";
           "instructions" => count, "labels" => labels.len());

    let program = match second_pass(&source, &labels) {
        Ok(program) => program,
        Err(error) => {
            debug!(assembly_log, "second pass failed"; "error" => %error);
            return Outcome::failure(Stage::SecondPass, error, ExecutionResult::default());
        }
    };

    debug!(assembly_log, "second pass complete"; "instructions" => program.len());

    let execution_log = logger.new(o!("stage" => "execution"));

    let mut vm = VirtualMachine::new(program, layout);
    vm.load_data(data);

    match vm.run(ctx) {
        Ok(execution) => {
            debug!(execution_log, "halted";
                   "steps" => execution.steps, "pc" => execution.pc);

            Outcome {
                ok: true,
                stage: Stage::Ok,
                line: -1,
                error: None,
                execution,
            }
        }
        Err(trap) => {
            debug!(execution_log, "trapped";
                   "error" => %trap.error, "steps" => trap.execution.steps);

            Outcome::failure(Stage::Runtime, trap.error, trap.execution)
        }
    }
}

#[test]
fn test_clean_run() {
    let outcome = run("addi a1, x0, 3\n", &[], &Context::default());

    assert!(outcome.ok);
    assert_eq!(outcome.stage, Stage::Ok);
    assert_eq!(outcome.line, -1);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.execution.registers[11], 3);
    assert_eq!(outcome.execution.pc, 1);
}

#[test]
fn test_first_pass_failure() {
    let outcome = run("x: nop\nx: nop\n", &[], &Context::default());

    assert!(!outcome.ok);
    assert_eq!(outcome.stage, Stage::FirstPass);
    assert_eq!(outcome.line, 2);
    assert_eq!(outcome.error.map(|e| e.message), Some("duplicate label"));
    assert_eq!(outcome.execution.steps, 0);
    assert!(outcome.execution.data.is_empty());
}

#[test]
fn test_second_pass_failure() {
    let outcome = run("jal x0, nowhere\n", &[], &Context::default());

    assert!(!outcome.ok);
    assert_eq!(outcome.stage, Stage::SecondPass);
    assert_eq!(outcome.line, 1);
    assert_eq!(outcome.error.map(|e| e.message), Some("unknown label"));
}

#[test]
fn test_runtime_failure_keeps_snapshot() {
    let outcome = run("addi t0, x0, 9\necall\n", b"ab", &Context::default());

    assert!(!outcome.ok);
    assert_eq!(outcome.stage, Stage::Runtime);
    assert_eq!(outcome.line, 2);
    assert_eq!(outcome.error.map(|e| e.message), Some("ecall trap"));
    // The partial snapshot survives the trap.
    assert_eq!(outcome.execution.registers[5], 9);
    assert_eq!(outcome.execution.steps, 2);
    assert_eq!(&outcome.execution.data[..], b"ab");
}

#[test]
fn test_repeated_runs_are_identical() {
    let source = "lb t0, 0(a0)\naddi t0, t0, 1\nsb t0, 0(a0)\n";

    let first = run(source, b"a", &Context::default());
    let second = run(source, b"a", &Context::default());

    assert_eq!(first.execution, second.execution);
    assert_eq!(first.execution.data, b"b");
}

#[test]
fn test_run_with_terminal_logger() {
    use slog::Drain;

    let decorator = slog_term::PlainSyncDecorator::new(slog_term::TestStdoutWriter);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = Logger::root(drain, o!());

    let outcome = run_with(
        "nop\n",
        &[],
        &Context::default(),
        MemoryLayout::with_data_size(0),
        logger,
    );

    assert!(outcome.ok);
}
