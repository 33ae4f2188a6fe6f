use fpcore::{
    compile,
    instruction::{OpCode, INPUT_COL0, INPUT_TEX0, INPUT_WPOS, MAX_INPUTS, OUTPUT_COLR, OUTPUT_DEPR},
    interpreter::{Interpreter, Machine, Outcome, TestSampler},
    Context, Fragment, Program, Span,
};

fn fragment_with(inputs: &[(usize, [f32; 4])]) -> Fragment {
    let mut values = [[0.0; 4]; MAX_INPUTS];

    for (index, value) in inputs {
        values[*index] = *value;
    }

    Fragment::new(values)
}

fn run_color(program: &Program, col0: [f32; 4]) -> [f32; 4] {
    let span = Span::single(fragment_with(&[(INPUT_COL0, col0)]));
    let mut interpreter = Interpreter::new(program, TestSampler::new());

    assert_eq!(interpreter.execute(&span, 0), Outcome::Complete);

    interpreter.machine.outputs[OUTPUT_COLR]
}

fn assert_close(a: [f32; 4], b: [f32; 4]) {
    for i in 0..4 {
        assert!((a[i] - b[i]).abs() < 1e-5, "{:?} != {:?}", a, b);
    }
}

#[test]
fn test_passthrough() {
    let program = compile(include_str!("passthrough.fp")).unwrap();

    assert_eq!(program.instructions.len(), 2);
    assert_eq!(program.instructions[0].opcode, OpCode::Move);
    assert_eq!(program.instructions[1].opcode, OpCode::End);
    assert!(program.reads_input(INPUT_COL0));
    assert!(program.writes_output(OUTPUT_COLR));
    assert_eq!(program.inputs_read, 1 << INPUT_COL0);
    assert_eq!(program.outputs_written, 1 << OUTPUT_COLR);

    assert_eq!(run_color(&program, [0.2, 0.4, 0.6, 1.0]), [0.2, 0.4, 0.6, 1.0]);
}

#[test]
fn test_double() {
    let program = compile(include_str!("double.fp")).unwrap();

    assert_eq!(run_color(&program, [0.1, 0.1, 0.1, 0.5]), [0.2, 0.2, 0.2, 1.0]);
    assert_close(run_color(&program, [0.6, 0.6, 0.6, 0.6]), [1.2; 4]);
}

#[test]
fn test_double_saturated() {
    let program = compile(include_str!("double_sat.fp")).unwrap();

    assert_eq!(run_color(&program, [0.6, 0.6, 0.6, 0.6]), [1.0; 4]);
    assert_eq!(run_color(&program, [-0.2, 0.25, 0.0, 0.5]), [0.0, 0.5, 0.0, 1.0]);
}

#[test]
fn test_swizzle_identity() {
    let explicit = compile("!!FP1.0\nMOV o[COLR], f[COL0].xyzw;\nEND\n").unwrap();
    let implicit = compile("!!FP1.0\nMOV o[COLR], f[COL0];\nEND\n").unwrap();

    assert_eq!(explicit.instructions[0].sources, implicit.instructions[0].sources);

    let col0 = [0.3, -0.7, 0.0, 2.0];
    assert_eq!(run_color(&explicit, col0), run_color(&implicit, col0));
}

#[test]
fn test_condition_gating_with_preloaded_codes() {
    use fpcore::interpreter::CondCode;

    let program = compile("!!FP1.0\nMOV o[COLR] (GT), {1, 1, 1, 1};\nEND\n").unwrap();
    let span = Span::single(Fragment::default());

    let mut interpreter = Interpreter::new(&program, TestSampler::new());
    interpreter.load_inputs(&span.fragments[0].inputs);
    interpreter.machine.cond_codes = [CondCode::Gt, CondCode::Eq, CondCode::Lt, CondCode::Un];

    assert_eq!(interpreter.execute_until(&span, 0, usize::MAX), Outcome::Complete);
    assert_eq!(interpreter.machine.outputs[OUTPUT_COLR], [1.0, 0.0, 0.0, 0.0]);
}

#[test]
fn test_compile_is_deterministic() {
    let source = include_str!("alpha_test.fp");

    let a = compile(source).unwrap();
    let b = compile(source).unwrap();

    assert_eq!(a, b);
}

#[test]
fn test_disassembly_recompiles() {
    for source in &[
        include_str!("passthrough.fp"),
        include_str!("double_sat.fp"),
        include_str!("alpha_test.fp"),
        include_str!("edge.fp"),
    ] {
        let program = compile(source).unwrap();
        let text = program.to_string();
        let recompiled = compile(&text).unwrap();

        assert_eq!(program.instructions.len(), recompiled.instructions.len());

        for (a, b) in program.instructions.iter().zip(recompiled.instructions.iter()) {
            assert_eq!(a.opcode, b.opcode);
            assert_eq!(a.destination, b.destination);
            assert_eq!(a.condition, b.condition);
            assert_eq!(a.saturate, b.saturate);
            assert_eq!(a.update_cond_register, b.update_cond_register);
            assert_eq!(a.texture, b.texture);
        }

        assert_eq!(program.inputs_read, recompiled.inputs_read);
        assert_eq!(program.outputs_written, recompiled.outputs_written);
    }
}

#[test]
fn test_alpha_test_span() {
    let mut context = Context::new();
    context.load_program(include_str!("alpha_test.fp")).unwrap();
    context.set_named_parameter("tint", [0.5, 1.0, 1.0, 1.0]).unwrap();

    let mut span = Span::new(vec![
        fragment_with(&[
            (INPUT_COL0, [1.0, 0.5, 1.0, 1.0]),
            (INPUT_TEX0, [0.0, 0.0, 0.0, 1.0]),
            (INPUT_WPOS, [10.0, 20.0, 0.75, 1.0]),
        ]),
        fragment_with(&[(INPUT_COL0, [1.0; 4])]),
    ]);

    // Every texture lookup returns the same color, so only the inputs differ per fragment.
    let opaque = TestSampler::with_color([0.8, 0.6, 0.4, 0.9]);
    assert_eq!(context.execute_span(&mut span, opaque), Ok(0));

    assert_close(span.fragments[0].color, [0.4, 0.3, 0.4, 0.9]);
    assert_eq!(span.fragments[0].depth, 0.75);
    assert_close(span.fragments[1].color, [0.4, 0.6, 0.4, 0.9]);

    let mut sampler = TestSampler::with_color([1.0, 1.0, 1.0, 0.25]);
    assert_eq!(context.execute_span(&mut span, &mut sampler), Ok(2));
    assert_eq!(span.live_count(), 0);
    assert_eq!(sampler.requests().len(), 2);
}

#[test]
fn test_gradient_by_reexecution() {
    let program = compile(include_str!("edge.fp")).unwrap();

    let mut span = Span::single(fragment_with(&[(INPUT_TEX0, [1.0, 1.5, 0.0, 1.0])]));
    span.step_x[INPUT_TEX0] = [1.0, 0.0, 0.0, 0.0];
    span.step_y[INPUT_TEX0] = [0.0, 1.0, 0.0, 0.0];

    let mut interpreter = Interpreter::new(&program, TestSampler::new());
    assert_eq!(interpreter.run_span(&mut span), 0);

    // d(u^2)/dx = 2u + 1 = 3 and d(v^2)/dy = 2v + 1 = 4 for unit steps.
    assert_close(span.fragments[0].color, [5.0, 0.0, 0.0, 1.0]);
}

#[test]
fn test_machine_reset_between_fragments() {
    let program = compile(
        "!!FP1.0\n\
        ADD R0, R0, f[COL0];\n\
        MOV o[COLR], R0;\n\
        END\n",
    ).unwrap();

    let mut span = Span::new(vec![
        fragment_with(&[(INPUT_COL0, [1.0; 4])]),
        fragment_with(&[(INPUT_COL0, [2.0; 4])]),
    ]);

    let mut interpreter = Interpreter::new(&program, TestSampler::new());
    interpreter.run_span(&mut span);

    assert_eq!(span.fragments[0].color, [1.0; 4]);
    assert_eq!(span.fragments[1].color, [2.0; 4]);
}

#[test]
fn test_unread_inputs_are_not_loaded() {
    let program = compile(include_str!("passthrough.fp")).unwrap();
    let span = Span::single(fragment_with(&[
        (INPUT_COL0, [1.0; 4]),
        (INPUT_TEX0, [5.0; 4]),
    ]));

    let mut interpreter = Interpreter::new(&program, TestSampler::new());
    interpreter.execute(&span, 0);

    let machine: &Machine = &interpreter.machine;

    assert_eq!(machine.inputs[INPUT_COL0], [1.0; 4]);
    assert_eq!(machine.inputs[INPUT_TEX0], [0.0; 4]);
    assert_eq!(machine.outputs[OUTPUT_DEPR], [0.0; 4]);
}
