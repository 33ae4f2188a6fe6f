//! [Interpreter] for executing compiled [programs](crate::program::Program) on fragments.
//!
//! The interpreter walks the instruction array of a program for one fragment at a time.
//! Every instruction reads its source operands as four component vectors, computes its
//! result and stores it through the write mask and the condition code test of its
//! destination. `KIL` ends the run early and discards the fragment, `END` completes it.
//!
//! `DDX` and `DDY` of fragment inputs come straight from the step values of the [Span]. The
//! derivative of any other value has no closed form, so the interpreter runs the program
//! again up to the derivative instruction on a copy of the machine whose inputs are moved
//! one pixel along the axis, and takes the difference of the two results. This makes
//! programs with many derivatives of computed values quadratic in their length.

pub mod pack;
pub mod texture;

use slog::{o, trace, Discard, Logger};

use crate::event::{Event, EventDispatcher, EventListener};
use crate::instruction::{
    CondMask, Instruction, OpCode, RegisterFile, SourceRegister, Vec4, INPUT_TEX0, MAX_INPUTS,
    MAX_OUTPUTS, MAX_TEMPORARIES, OUTPUT_COLH, OUTPUT_COLR, OUTPUT_DEPR,
};
use crate::program::Program;
use crate::span::Span;

pub use texture::{compute_lambda, SampleRequest, SolidColor, TestSampler, TextureSampler};

/// How many times derivative re-execution can nest before derivatives read as zero.
pub const MAX_DERIVATIVE_DEPTH: usize = 4;

/// Classification of a value stored in a condition code slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CondCode {
    Gt,
    Lt,
    Eq,
    /// Unordered, the value was NaN.
    Un,
}

impl CondCode {
    pub fn from_value(value: f32) -> CondCode {
        if value.is_nan() {
            CondCode::Un
        } else if value > 0.0 {
            CondCode::Gt
        } else if value < 0.0 {
            CondCode::Lt
        } else {
            CondCode::Eq
        }
    }

    /// Whether the condition code passes the test `mask`.
    pub fn test(self, mask: CondMask) -> bool {
        match mask {
            CondMask::Eq => self == CondCode::Eq,
            CondMask::Ne => self != CondCode::Eq,
            CondMask::Gt => self == CondCode::Gt,
            CondMask::Ge => self == CondCode::Gt || self == CondCode::Eq,
            CondMask::Lt => self == CondCode::Lt,
            CondMask::Le => self == CondCode::Lt || self == CondCode::Eq,
            CondMask::Tr => true,
            CondMask::Fl => false,
        }
    }
}

/// Register state of a single program run.
#[derive(Clone, Debug)]
pub struct Machine {
    pub temporaries: [Vec4; MAX_TEMPORARIES],
    pub inputs: [Vec4; MAX_INPUTS],
    pub outputs: [Vec4; MAX_OUTPUTS],
    pub cond_codes: [CondCode; 4],
}

impl Machine {
    pub fn new() -> Machine {
        Machine {
            temporaries: [[0.0; 4]; MAX_TEMPORARIES],
            inputs: [[0.0; 4]; MAX_INPUTS],
            outputs: [[0.0; 4]; MAX_OUTPUTS],
            cond_codes: [CondCode::Eq; 4],
        }
    }

    /// Clears the temporaries, the outputs and the condition codes.
    pub fn reset(&mut self) {
        self.temporaries = [[0.0; 4]; MAX_TEMPORARIES];
        self.outputs = [[0.0; 4]; MAX_OUTPUTS];
        self.cond_codes = [CondCode::Eq; 4];
    }
}

impl Default for Machine {
    fn default() -> Machine {
        Machine::new()
    }
}

/// How a program run ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The run reached `END` or the requested end of the program.
    Complete,
    /// A `KIL` instruction discarded the fragment.
    Killed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

enum Step {
    Continue,
    Kill,
    End,
}

fn swizzle(value: Vec4, swizzle: &[usize; 4]) -> Vec4 {
    [value[swizzle[0]], value[swizzle[1]], value[swizzle[2]], value[swizzle[3]]]
}

fn map1<F: Fn(f32) -> f32>(a: Vec4, f: F) -> Vec4 {
    [f(a[0]), f(a[1]), f(a[2]), f(a[3])]
}

fn map2<F: Fn(f32, f32) -> f32>(a: Vec4, b: Vec4, f: F) -> Vec4 {
    [f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2]), f(a[3], b[3])]
}

fn set_on<F: Fn(f32, f32) -> bool>(a: Vec4, b: Vec4, f: F) -> Vec4 {
    map2(a, b, |a, b| if f(a, b) { 1.0 } else { 0.0 })
}

fn dot3(a: Vec4, b: Vec4) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn dot4(a: Vec4, b: Vec4) -> f32 {
    dot3(a, b) + a[3] * b[3]
}

/// Clamps to `[0, 1]`. NaN is left as is.
fn saturate(value: Vec4) -> Vec4 {
    map1(value, |v| if v < 0.0 { 0.0 } else if v > 1.0 { 1.0 } else { v })
}

/// Applies the negation and absolute value modifiers of a source operand.
fn apply_modifiers(src: &SourceRegister, mut value: Vec4) -> Vec4 {
    if src.negate_base {
        value = map1(value, |v| -v);
    }

    if src.abs {
        value = map1(value, f32::abs);
    }

    if src.negate_abs {
        value = map1(value, |v| -v);
    }

    value
}

/// Derivative of a modified source operand, given the swizzled value and derivative of the
/// register it reads.
fn derivative_modifiers(src: &SourceRegister, mut value: Vec4, mut derivative: Vec4) -> Vec4 {
    if src.negate_base {
        value = map1(value, |v| -v);
        derivative = map1(derivative, |d| -d);
    }

    if src.abs {
        derivative = map2(value, derivative, |v, d| if v < 0.0 { -d } else { d });
    }

    if src.negate_abs {
        derivative = map1(derivative, |d| -d);
    }

    derivative
}

/// Utility struct for running a program on one machine.
///
/// Derivative re-execution creates nested contexts with a higher `depth` and no event
/// dispatcher.
struct ExecutionContext<'a, 'p, S: ?Sized> {
    program: &'p Program,
    span: &'a Span,
    fragment: usize,
    sampler: &'a mut S,
    events: Option<&'a mut EventDispatcher>,
    logger: &'a Logger,
    depth: usize,
    /// Condition codes the top-level run started with. Shadow machines start from these.
    initial_cond_codes: [CondCode; 4],
    /// Set when a derivative needed re-execution past `MAX_DERIVATIVE_DEPTH`.
    too_deep: bool,
}

impl<'a, 'p, S> ExecutionContext<'a, 'p, S>
    where S: TextureSampler + ?Sized,
{
    fn dispatch(&mut self, event: Event) {
        if let Some(events) = self.events.as_mut() {
            events.dispatch(event);
        }
    }

    /// Runs instructions `0..end`, stopping early at `END` or a kill.
    fn run(&mut self, machine: &mut Machine, end: usize) -> Outcome {
        let program = self.program;
        let end = std::cmp::min(end, program.instructions.len());

        for (pc, ins) in program.instructions[..end].iter().enumerate() {
            self.dispatch(Event::Instruction {
                pc,
                position: ins.position,
                opcode: ins.opcode,
            });

            match self.emulate(machine, pc, ins) {
                // The shadow result is discarded by the caller, no need to finish it.
                Step::Continue if self.too_deep => return Outcome::Complete,
                Step::Continue => (),
                Step::End => return Outcome::Complete,
                Step::Kill => {
                    if self.depth == 0 {
                        trace!(self.logger, "fragment killed"; "pc" => pc, "fragment" => self.fragment);
                    }

                    self.dispatch(Event::Kill { pc });

                    return Outcome::Killed;
                },
            }
        }

        Outcome::Complete
    }

    fn register(&self, machine: &Machine, file: RegisterFile, index: usize) -> Vec4 {
        match file {
            RegisterFile::Temporary => machine.temporaries[index],
            RegisterFile::Input => machine.inputs[index],
            RegisterFile::LocalParameter => self.program.local_parameters[index],
            RegisterFile::Parameter => self.program.parameters.value(index),
            file => unreachable!("{:?} registers can not be read", file),
        }
    }

    fn fetch_vector(&self, machine: &Machine, src: &SourceRegister) -> Vec4 {
        let value = self.register(machine, src.file, src.index);
        apply_modifiers(src, swizzle(value, &src.swizzle))
    }

    /// Value of the source operand `n` of `ins`.
    fn vector(&self, machine: &Machine, ins: &Instruction, n: usize) -> Vec4 {
        self.fetch_vector(machine, &ins.sources[n])
    }

    /// First component of the source operand `n` of `ins`.
    fn scalar(&self, machine: &Machine, ins: &Instruction, n: usize) -> f32 {
        self.vector(machine, ins, n)[0]
    }

    fn store(&mut self, machine: &mut Machine, ins: &Instruction, value: Vec4) {
        self.store_masked(machine, ins, value, [true; 4])
    }

    /// Stores the result of `ins`.
    ///
    /// Components outside `computed` are treated as if they were not in the write mask.
    fn store_masked(&mut self, machine: &mut Machine, ins: &Instruction, value: Vec4, computed: [bool; 4]) {
        let dst = match ins.destination {
            Some(ref dst) => dst,
            None => return,
        };

        let value = if ins.saturate { saturate(value) } else { value };

        let mut declared = dst.write_mask;

        for (enabled, computed) in declared.iter_mut().zip(computed.iter()) {
            *enabled = *enabled && *computed;
        }

        let mut mask = declared;

        if !ins.condition.is_always() {
            for (i, enabled) in mask.iter_mut().enumerate() {
                let cond = machine.cond_codes[ins.condition.swizzle[i]];
                *enabled = *enabled && cond.test(ins.condition.mask);
            }
        }

        if ins.update_cond_register {
            for i in 0..4 {
                if declared[i] {
                    machine.cond_codes[i] = CondCode::from_value(value[i]);
                }
            }
        }

        let register = match dst.file {
            RegisterFile::Temporary => &mut machine.temporaries[dst.index],
            RegisterFile::Output => &mut machine.outputs[dst.index],
            RegisterFile::WriteOnly => return,
            file => unreachable!("{:?} registers can not be written", file),
        };

        if !mask.iter().any(|enabled| *enabled) {
            return;
        }

        for i in 0..4 {
            if mask[i] {
                register[i] = value[i];
            }
        }

        let value = *register;

        self.dispatch(Event::RegisterWrite {
            file: dst.file,
            index: dst.index,
            value,
        });
    }

    /// Derivative of an input register along `axis`, taken from the span.
    ///
    /// Texture coordinates are divided by their `q` component.
    fn input_derivative(&self, machine: &Machine, input: usize, axis: Axis) -> Vec4 {
        let step = match axis {
            Axis::X => self.span.step_x[input],
            Axis::Y => self.span.step_y[input],
        };

        if input >= INPUT_TEX0 {
            let inv_q = 1.0 / machine.inputs[input][3];
            map1(step, |s| s * inv_q)
        } else {
            step
        }
    }

    fn derivative(&mut self, machine: &Machine, pc: usize, src: &SourceRegister, axis: Axis) -> Vec4 {
        match src.file {
            RegisterFile::Input => {
                let value = swizzle(machine.inputs[src.index], &src.swizzle);
                let step = swizzle(self.input_derivative(machine, src.index, axis), &src.swizzle);

                derivative_modifiers(src, value, step)
            },
            RegisterFile::Parameter | RegisterFile::LocalParameter => [0.0; 4],
            _ if self.depth >= MAX_DERIVATIVE_DEPTH => {
                self.too_deep = true;
                [0.0; 4]
            },
            _ => {
                let value = self.reexecute_derivative(machine, pc, src, axis);

                // Every derivative enclosing a too deep one is invalid, so the outermost
                // one yields zero.
                if self.too_deep && self.depth == 0 {
                    trace!(self.logger, "derivative nested too deep"; "pc" => pc);
                    self.too_deep = false;
                    [0.0; 4]
                } else {
                    value
                }
            },
        }
    }

    /// Computes a derivative by running instructions `0..pc` again with every input moved
    /// one pixel along `axis`.
    fn reexecute_derivative(
        &mut self,
        machine: &Machine,
        pc: usize,
        src: &SourceRegister,
        axis: Axis,
    ) -> Vec4 {
        trace!(self.logger, "re-execute for derivative";
            "pc" => pc, "depth" => self.depth + 1, "axis" => ?axis);

        let mut shadow = Machine::new();
        shadow.cond_codes = self.initial_cond_codes;

        for input in 0..MAX_INPUTS {
            if self.program.reads_input(input) {
                let step = self.input_derivative(machine, input, axis);
                shadow.inputs[input] = map2(machine.inputs[input], step, |v, s| v + s);
            }
        }

        let value = self.fetch_vector(machine, src);

        let mut context = ExecutionContext {
            program: self.program,
            span: self.span,
            fragment: self.fragment,
            sampler: &mut *self.sampler,
            events: None,
            logger: self.logger,
            depth: self.depth + 1,
            initial_cond_codes: self.initial_cond_codes,
            too_deep: false,
        };

        context.run(&mut shadow, pc);

        if context.too_deep {
            self.too_deep = true;
            return [0.0; 4];
        }

        let next = context.fetch_vector(&shadow, src);

        map2(next, value, |next, value| next - value)
    }

    fn sample(&mut self, machine: &Machine, ins: &Instruction) -> Vec4 {
        let image = match ins.texture {
            Some(image) => image,
            None => unreachable!("{} without a texture image", ins.opcode),
        };

        let mut coord = self.vector(machine, ins, 0);
        let fragment_lambda = self.span.fragments[self.fragment].lambda[image.unit];

        let lambda = match ins.opcode {
            OpCode::TextureBias => fragment_lambda + coord[3],
            OpCode::TextureProjective => {
                if coord[3] != 0.0 {
                    let w = coord[3];
                    coord[0] /= w;
                    coord[1] /= w;
                    coord[2] /= w;
                }

                fragment_lambda
            },
            OpCode::TextureDerivative => {
                let ddx = self.vector(machine, ins, 1);
                let ddy = self.vector(machine, ins, 2);
                let (width, height) = self.sampler.image_size(image.unit);

                compute_lambda(ddx, ddy, width, height)
            },
            _ => fragment_lambda,
        };

        self.sampler.sample(image.unit, image.target, coord, lambda)
    }

    fn emulate(&mut self, machine: &mut Machine, pc: usize, ins: &Instruction) -> Step {
        match ins.opcode {
            OpCode::Add => {
                let (a, b) = (self.vector(machine, ins, 0), self.vector(machine, ins, 1));
                self.store(machine, ins, map2(a, b, |a, b| a + b));
            },
            OpCode::Subtract => {
                let (a, b) = (self.vector(machine, ins, 0), self.vector(machine, ins, 1));
                self.store(machine, ins, map2(a, b, |a, b| a - b));
            },
            OpCode::Multiply => {
                let (a, b) = (self.vector(machine, ins, 0), self.vector(machine, ins, 1));
                self.store(machine, ins, map2(a, b, |a, b| a * b));
            },
            OpCode::MultiplyAdd => {
                let a = self.vector(machine, ins, 0);
                let b = self.vector(machine, ins, 1);
                let c = self.vector(machine, ins, 2);
                let ab = map2(a, b, |a, b| a * b);
                self.store(machine, ins, map2(ab, c, |ab, c| ab + c));
            },
            OpCode::Lerp => {
                let a = self.vector(machine, ins, 0);
                let b = self.vector(machine, ins, 1);
                let c = self.vector(machine, ins, 2);
                let ab = map2(a, b, |a, b| a * b);
                let ac = map2(a, c, |a, c| (1.0 - a) * c);
                self.store(machine, ins, map2(ab, ac, |ab, ac| ab + ac));
            },
            OpCode::Min => {
                let (a, b) = (self.vector(machine, ins, 0), self.vector(machine, ins, 1));
                self.store(machine, ins, map2(a, b, |a, b| if a < b { a } else { b }));
            },
            OpCode::Max => {
                let (a, b) = (self.vector(machine, ins, 0), self.vector(machine, ins, 1));
                self.store(machine, ins, map2(a, b, |a, b| if a > b { a } else { b }));
            },
            OpCode::Move => {
                let a = self.vector(machine, ins, 0);
                self.store(machine, ins, a);
            },
            OpCode::Floor => {
                let a = self.vector(machine, ins, 0);
                self.store(machine, ins, map1(a, f32::floor));
            },
            OpCode::Fraction => {
                let a = self.vector(machine, ins, 0);
                self.store(machine, ins, map1(a, |a| a - a.floor()));
            },
            OpCode::Dot3 => {
                let (a, b) = (self.vector(machine, ins, 0), self.vector(machine, ins, 1));
                self.store(machine, ins, [dot3(a, b); 4]);
            },
            OpCode::Dot4 => {
                let (a, b) = (self.vector(machine, ins, 0), self.vector(machine, ins, 1));
                self.store(machine, ins, [dot4(a, b); 4]);
            },
            OpCode::Distance => {
                let (a, b) = (self.vector(machine, ins, 0), self.vector(machine, ins, 1));
                self.store(machine, ins, [1.0, a[1] * b[1], a[2], b[3]]);
            },
            OpCode::Reflect => {
                let axis = self.vector(machine, ins, 0);
                let dir = self.vector(machine, ins, 1);
                let scale = 2.0 * dot3(axis, dir) / dot3(axis, axis);
                let result = [
                    scale * axis[0] - dir[0],
                    scale * axis[1] - dir[1],
                    scale * axis[2] - dir[2],
                    0.0,
                ];

                self.store_masked(machine, ins, result, [true, true, true, false]);
            },
            OpCode::Lighting => {
                const EPSILON: f32 = 1.0 / 256.0;

                let a = self.vector(machine, ins, 0);
                let diffuse = a[0].max(0.0);
                let shininess = a[1].max(0.0);
                let exponent = a[3].max(-(128.0 - EPSILON)).min(128.0 - EPSILON);
                let specular = if diffuse > 0.0 { shininess.powf(exponent) } else { 0.0 };

                self.store(machine, ins, [1.0, diffuse, specular, 1.0]);
            },
            OpCode::Transform2D => {
                let a = self.vector(machine, ins, 0);
                let b = self.vector(machine, ins, 1);
                let c = self.vector(machine, ins, 2);

                self.store(machine, ins, [
                    a[0] + b[0] * c[0] + b[1] * c[1],
                    a[1] + b[0] * c[2] + b[1] * c[3],
                    a[2] + b[0] * c[0] + b[1] * c[1],
                    a[3] + b[0] * c[2] + b[1] * c[3],
                ]);
            },
            OpCode::Cosine => {
                let a = self.scalar(machine, ins, 0);
                self.store(machine, ins, [a.cos(); 4]);
            },
            OpCode::Sine => {
                let a = self.scalar(machine, ins, 0);
                self.store(machine, ins, [a.sin(); 4]);
            },
            OpCode::Exp2 => {
                let a = self.scalar(machine, ins, 0);
                self.store(machine, ins, [2.0f32.powf(a); 4]);
            },
            OpCode::Log2 => {
                let a = self.scalar(machine, ins, 0);
                self.store(machine, ins, [a.log2(); 4]);
            },
            OpCode::Reciprocal => {
                let a = self.scalar(machine, ins, 0);
                self.store(machine, ins, [1.0 / a; 4]);
            },
            OpCode::ReciprocalSqrt => {
                let a = self.scalar(machine, ins, 0);
                self.store(machine, ins, [1.0 / a.abs().sqrt(); 4]);
            },
            OpCode::Power => {
                let (a, b) = (self.scalar(machine, ins, 0), self.scalar(machine, ins, 1));
                self.store(machine, ins, [a.powf(b); 4]);
            },
            OpCode::SetEqual => {
                let (a, b) = (self.vector(machine, ins, 0), self.vector(machine, ins, 1));
                self.store(machine, ins, set_on(a, b, |a, b| a == b));
            },
            OpCode::SetNotEqual => {
                let (a, b) = (self.vector(machine, ins, 0), self.vector(machine, ins, 1));
                self.store(machine, ins, set_on(a, b, |a, b| a != b));
            },
            OpCode::SetGreater => {
                let (a, b) = (self.vector(machine, ins, 0), self.vector(machine, ins, 1));
                self.store(machine, ins, set_on(a, b, |a, b| a > b));
            },
            OpCode::SetGreaterEqual => {
                let (a, b) = (self.vector(machine, ins, 0), self.vector(machine, ins, 1));
                self.store(machine, ins, set_on(a, b, |a, b| a >= b));
            },
            OpCode::SetLess => {
                let (a, b) = (self.vector(machine, ins, 0), self.vector(machine, ins, 1));
                self.store(machine, ins, set_on(a, b, |a, b| a < b));
            },
            OpCode::SetLessEqual => {
                let (a, b) = (self.vector(machine, ins, 0), self.vector(machine, ins, 1));
                self.store(machine, ins, set_on(a, b, |a, b| a <= b));
            },
            OpCode::SetFalse => self.store(machine, ins, [0.0; 4]),
            OpCode::SetTrue => self.store(machine, ins, [1.0; 4]),
            OpCode::PackHalf2 => {
                let a = self.vector(machine, ins, 0);
                self.store(machine, ins, pack::pack_half_2(a));
            },
            OpCode::PackUnsignedShort2 => {
                let a = self.vector(machine, ins, 0);
                self.store(machine, ins, pack::pack_unsigned_short_2(a));
            },
            OpCode::PackByte4 => {
                let a = self.vector(machine, ins, 0);
                self.store(machine, ins, pack::pack_byte_4(a));
            },
            OpCode::PackUnsignedByte4 => {
                let a = self.vector(machine, ins, 0);
                self.store(machine, ins, pack::pack_unsigned_byte_4(a));
            },
            OpCode::UnpackHalf2 => {
                let a = self.scalar(machine, ins, 0);
                self.store(machine, ins, pack::unpack_half_2(a));
            },
            OpCode::UnpackUnsignedShort2 => {
                let a = self.scalar(machine, ins, 0);
                self.store(machine, ins, pack::unpack_unsigned_short_2(a));
            },
            OpCode::UnpackByte4 => {
                let a = self.scalar(machine, ins, 0);
                self.store(machine, ins, pack::unpack_byte_4(a));
            },
            OpCode::UnpackUnsignedByte4 => {
                let a = self.scalar(machine, ins, 0);
                self.store(machine, ins, pack::unpack_unsigned_byte_4(a));
            },
            OpCode::DerivativeX => {
                let result = self.derivative(machine, pc, &ins.sources[0], Axis::X);
                self.store(machine, ins, result);
            },
            OpCode::DerivativeY => {
                let result = self.derivative(machine, pc, &ins.sources[0], Axis::Y);
                self.store(machine, ins, result);
            },
            OpCode::Texture
            | OpCode::TextureBias
            | OpCode::TextureDerivative
            | OpCode::TextureProjective => {
                let color = self.sample(machine, ins);
                self.store(machine, ins, color);
            },
            OpCode::Kill => {
                let test = &ins.condition;

                let kill = test.swizzle
                    .iter()
                    .any(|slot| machine.cond_codes[*slot].test(test.mask));

                if kill {
                    return Step::Kill;
                }
            },
            OpCode::End => return Step::End,
        }

        Step::Continue
    }
}

/// The interpreter runs a compiled [Program] on the fragments of a [Span].
pub struct Interpreter<'p, S> {
    program: &'p Program,

    /// Register state of the most recent run.
    pub machine: Machine,

    /// Interface to the texture units. Implements [TextureSampler].
    pub sampler: S,

    events: EventDispatcher,
    logger: Logger,
}

impl<'p, S> Interpreter<'p, S> where S: TextureSampler {
    /// Create a new interpreter.
    ///
    /// # Parameters
    /// - `program`: The compiled program to run.
    /// - `sampler`: A [texture sampler](TextureSampler) for the texture instructions.
    pub fn new(program: &'p Program, sampler: S) -> Interpreter<'p, S> {
        Interpreter::with_logger(program, sampler, None)
    }

    pub fn with_logger<L>(program: &'p Program, sampler: S, logger: L) -> Interpreter<'p, S>
    where
        L: Into<Option<Logger>>,
    {
        let logger = logger
            .into()
            .unwrap_or(Logger::root(Discard, o!()))
            .new(o!("stage" => "execution"));

        Interpreter {
            program,
            machine: Machine::new(),
            sampler,
            events: EventDispatcher::new(),
            logger,
        }
    }

    pub fn add_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.events.add_listener(listener);
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Resets the machine and loads the inputs the program reads.
    pub fn load_inputs(&mut self, inputs: &[Vec4; MAX_INPUTS]) {
        self.machine.reset();

        for (index, input) in inputs.iter().enumerate() {
            if self.program.reads_input(index) {
                self.machine.inputs[index] = *input;
            }
        }
    }

    /// Runs the program on a fragment of `span` from a freshly reset machine.
    ///
    /// # Panics
    /// Panics if `fragment` is not an index of `span.fragments`.
    pub fn execute(&mut self, span: &Span, fragment: usize) -> Outcome {
        self.load_inputs(&span.fragments[fragment].inputs);
        self.execute_until(span, fragment, self.program.instructions.len())
    }

    /// Runs the instructions before `end` on the current machine state, without reloading the
    /// inputs.
    pub fn execute_until(&mut self, span: &Span, fragment: usize, end: usize) -> Outcome {
        let events = if self.events.is_empty() {
            None
        } else {
            Some(&mut self.events)
        };

        let initial_cond_codes = self.machine.cond_codes;

        let mut context = ExecutionContext {
            program: self.program,
            span,
            fragment,
            sampler: &mut self.sampler,
            events,
            logger: &self.logger,
            depth: 0,
            initial_cond_codes,
            too_deep: false,
        };

        context.run(&mut self.machine, end)
    }

    /// The color result of the last run, from `o[COLH]` if the program writes it.
    pub fn color(&self) -> Vec4 {
        if self.program.writes_output(OUTPUT_COLH) {
            self.machine.outputs[OUTPUT_COLH]
        } else {
            self.machine.outputs[OUTPUT_COLR]
        }
    }

    /// Runs the program on every live fragment of `span`.
    ///
    /// Killed fragments are marked dead. Completed fragments get the color result and, if
    /// the program writes `o[DEPR]`, the depth result.
    ///
    /// # Returns
    /// The number of fragments killed.
    pub fn run_span(&mut self, span: &mut Span) -> usize {
        let mut killed = 0;

        for index in 0..span.fragments.len() {
            if !span.fragments[index].live {
                continue;
            }

            let outcome = self.execute(span, index);
            let color = self.color();
            let fragment = &mut span.fragments[index];

            match outcome {
                Outcome::Killed => {
                    fragment.live = false;
                    killed += 1;
                },
                Outcome::Complete => {
                    fragment.color = color;

                    if self.program.writes_output(OUTPUT_DEPR) {
                        fragment.depth = self.machine.outputs[OUTPUT_DEPR][2];
                    }
                },
            }
        }

        trace!(self.logger, "span done"; "fragments" => span.fragments.len(), "killed" => killed);

        killed
    }
}
