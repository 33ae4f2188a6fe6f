use slog::{o, Drain, Logger};
use slog_term::{FullFormat, PlainSyncDecorator};

use fpcore::{
    compile_with_logger,
    instruction::{INPUT_COL0, MAX_INPUTS},
    interpreter::{Interpreter, Outcome, TestSampler},
    Context, Fragment, Span,
};

fn logger() -> Logger {
    let decorator = PlainSyncDecorator::new(std::io::stdout());
    let drain = FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Logger::root(drain, o!())
}

#[test]
fn test_logged_compile_and_run() {
    let logger = logger();

    let source = "!!FP1.0\n\
        DEFINE limit = 0.5;\n\
        SUBC RC.x, f[COL0].x, limit;\n\
        KIL LT.x;\n\
        MUL R0, f[COL0], f[COL0];\n\
        DDX R1, R0;\n\
        ADD o[COLR], R0, R1;\n\
        END\n";

    let program = compile_with_logger(source, logger.clone()).unwrap();

    let mut live = [[0.0; 4]; MAX_INPUTS];
    live[INPUT_COL0] = [1.0; 4];

    let mut dead = [[0.0; 4]; MAX_INPUTS];
    dead[INPUT_COL0] = [0.25; 4];

    let mut span = Span::new(vec![Fragment::new(live), Fragment::new(dead)]);
    span.step_x[INPUT_COL0] = [1.0; 4];

    let mut interpreter = Interpreter::with_logger(&program, TestSampler::new(), logger.clone());

    assert_eq!(interpreter.execute(&span, 1), Outcome::Killed);
    assert_eq!(interpreter.run_span(&mut span), 1);

    // x^2 + d(x^2)/dx = 1 + 3 for a unit step.
    assert_eq!(span.fragments[0].color, [4.0; 4]);

    let mut context = Context::with_logger(logger);
    assert!(context.load_program("!!FP1.0\nMOV o[COLR], f[COL0]\nEND\n").is_err());
}
