//! Compilation from fragment program text to a [Program].
//!
//! The compiler checks the `!!FP1.0` header, then reads statements until `END`. `DEFINE` and
//! `DECLARE` statements extend the parameter table. Every other statement is an instruction,
//! which is looked up in a table of instruction patterns describing its operands and allowed
//! mnemonic suffixes. The operands are then read in the order the pattern gives.
//!
//! The first error ends the compilation.

use lazy_static::lazy_static;
use nom::{bytes::complete::tag, IResult};
use slog::{debug, o, trace, Discard, Logger};

use crate::error::{ErrorExt, ErrorKind, ParseError};
use crate::instruction::{Instruction, OpCode, Precision, MAX_INSTRUCTIONS, MAX_LOCAL_PARAMETERS};
use crate::parameters::ParameterKind;
use crate::parser::operand::{
    is_reserved_identifier, parse_condition, parse_constant, parse_masked_destination,
    parse_scalar_source, parse_texture_image, parse_vector_source,
};
use crate::parser::{ParseState, Result, Token};
use crate::program::Program;

const SUFFIX_R: u8 = 1 << 0;
const SUFFIX_H: u8 = 1 << 1;
const SUFFIX_X: u8 = 1 << 2;
const SUFFIX_C: u8 = 1 << 3;
const SUFFIX_S: u8 = 1 << 4;

const RHXCS: u8 = SUFFIX_R | SUFFIX_H | SUFFIX_X | SUFFIX_C | SUFFIX_S;
const RHCS: u8 = SUFFIX_R | SUFFIX_H | SUFFIX_C | SUFFIX_S;
const CS: u8 = SUFFIX_C | SUFFIX_S;
const NONE: u8 = 0;

/// Source operands an instruction takes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Inputs {
    Vector1,
    Vector2,
    Vector3,
    Scalar1,
    Scalar2,
    /// A texture coordinate vector followed by a texture image.
    Vector1Texture,
    /// A texture coordinate vector, two derivative vectors and a texture image.
    Vector3Texture,
    /// Only a condition code test.
    ConditionCode,
}

/// Destination operand an instruction takes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Output {
    Vector,
    Scalar,
    None,
}

#[derive(Debug)]
struct InstructionPattern {
    name: &'static str,
    opcode: OpCode,
    inputs: Inputs,
    output: Output,
    suffixes: u8,
}

const fn pattern(
    name: &'static str,
    opcode: OpCode,
    inputs: Inputs,
    output: Output,
    suffixes: u8,
) -> InstructionPattern {
    InstructionPattern { name, opcode, inputs, output, suffixes }
}

lazy_static! {
    /// All instruction patterns, longest name first so that `PK2US` is not read as `PK2`.
    static ref PATTERNS: Vec<InstructionPattern> = {
        use Inputs::*;

        let mut patterns = vec![
            pattern("ADD",   OpCode::Add,                  Vector2,        Output::Vector, RHXCS),
            pattern("COS",   OpCode::Cosine,               Scalar1,        Output::Scalar, RHCS),
            pattern("DDX",   OpCode::DerivativeX,          Vector1,        Output::Vector, RHCS),
            pattern("DDY",   OpCode::DerivativeY,          Vector1,        Output::Vector, RHCS),
            pattern("DP3",   OpCode::Dot3,                 Vector2,        Output::Scalar, RHXCS),
            pattern("DP4",   OpCode::Dot4,                 Vector2,        Output::Scalar, RHXCS),
            pattern("DST",   OpCode::Distance,             Vector2,        Output::Vector, RHCS),
            pattern("EX2",   OpCode::Exp2,                 Scalar1,        Output::Scalar, RHCS),
            pattern("FLR",   OpCode::Floor,                Vector1,        Output::Vector, RHXCS),
            pattern("FRC",   OpCode::Fraction,             Vector1,        Output::Vector, RHXCS),
            pattern("KIL",   OpCode::Kill,                 ConditionCode,  Output::None,   NONE),
            pattern("LG2",   OpCode::Log2,                 Scalar1,        Output::Scalar, RHCS),
            pattern("LIT",   OpCode::Lighting,             Vector1,        Output::Vector, RHCS),
            pattern("LRP",   OpCode::Lerp,                 Vector3,        Output::Vector, RHXCS),
            pattern("MAD",   OpCode::MultiplyAdd,          Vector3,        Output::Vector, RHXCS),
            pattern("MAX",   OpCode::Max,                  Vector2,        Output::Vector, RHXCS),
            pattern("MIN",   OpCode::Min,                  Vector2,        Output::Vector, RHXCS),
            pattern("MOV",   OpCode::Move,                 Vector1,        Output::Vector, RHXCS),
            pattern("MUL",   OpCode::Multiply,             Vector2,        Output::Vector, RHXCS),
            pattern("PK2H",  OpCode::PackHalf2,            Vector1,        Output::Scalar, NONE),
            pattern("PK2US", OpCode::PackUnsignedShort2,   Vector1,        Output::Scalar, NONE),
            pattern("PK4B",  OpCode::PackByte4,            Vector1,        Output::Scalar, NONE),
            pattern("PK4UB", OpCode::PackUnsignedByte4,    Vector1,        Output::Scalar, NONE),
            pattern("POW",   OpCode::Power,                Scalar2,        Output::Scalar, RHCS),
            pattern("RCP",   OpCode::Reciprocal,           Scalar1,        Output::Scalar, RHCS),
            pattern("RFL",   OpCode::Reflect,              Vector2,        Output::Vector, RHCS),
            pattern("RSQ",   OpCode::ReciprocalSqrt,       Scalar1,        Output::Scalar, RHCS),
            pattern("SEQ",   OpCode::SetEqual,             Vector2,        Output::Vector, RHXCS),
            pattern("SFL",   OpCode::SetFalse,             Vector2,        Output::Vector, RHXCS),
            pattern("SGE",   OpCode::SetGreaterEqual,      Vector2,        Output::Vector, RHXCS),
            pattern("SGT",   OpCode::SetGreater,           Vector2,        Output::Vector, RHXCS),
            pattern("SIN",   OpCode::Sine,                 Scalar1,        Output::Scalar, RHCS),
            pattern("SLE",   OpCode::SetLessEqual,         Vector2,        Output::Vector, RHXCS),
            pattern("SLT",   OpCode::SetLess,              Vector2,        Output::Vector, RHXCS),
            pattern("SNE",   OpCode::SetNotEqual,          Vector2,        Output::Vector, RHXCS),
            pattern("STR",   OpCode::SetTrue,              Vector2,        Output::Vector, RHXCS),
            pattern("SUB",   OpCode::Subtract,             Vector2,        Output::Vector, RHXCS),
            pattern("TEX",   OpCode::Texture,              Vector1Texture, Output::Vector, CS),
            pattern("TXB",   OpCode::TextureBias,          Vector1Texture, Output::Vector, CS),
            pattern("TXD",   OpCode::TextureDerivative,    Vector3Texture, Output::Vector, CS),
            pattern("TXP",   OpCode::TextureProjective,    Vector1Texture, Output::Vector, CS),
            pattern("UP2H",  OpCode::UnpackHalf2,          Scalar1,        Output::Vector, CS),
            pattern("UP2US", OpCode::UnpackUnsignedShort2, Scalar1,        Output::Vector, CS),
            pattern("UP4B",  OpCode::UnpackByte4,          Scalar1,        Output::Vector, CS),
            pattern("UP4UB", OpCode::UnpackUnsignedByte4,  Scalar1,        Output::Vector, CS),
            pattern("X2D",   OpCode::Transform2D,          Vector3,        Output::Vector, RHCS),
        ];

        patterns.sort_by_key(|pattern| std::cmp::Reverse(pattern.name.len()));

        patterns
    };
}

/// Mnemonic suffixes read from an opcode token.
#[derive(Debug, Default, PartialEq)]
struct Suffixes {
    precision: Option<Precision>,
    update_cond: bool,
    saturate: bool,
}

/// Splits `rest` into precision, condition update and saturation suffixes.
///
/// Returns `None` if anything else remains.
fn parse_suffixes(mut rest: &str) -> Option<Suffixes> {
    let mut suffixes = Suffixes::default();

    suffixes.precision = match rest.as_bytes().first() {
        Some(b'R') => Some(Precision::Full),
        Some(b'H') => Some(Precision::Half),
        Some(b'X') => Some(Precision::Fixed),
        _ => None,
    };

    if suffixes.precision.is_some() {
        rest = &rest[1..];
    }

    if let Some(r) = rest.strip_prefix('C') {
        suffixes.update_cond = true;
        rest = r;
    }

    if let Some(r) = rest.strip_prefix("_SAT") {
        suffixes.saturate = true;
        rest = r;
    }

    if rest.is_empty() {
        Some(suffixes)
    } else {
        None
    }
}

impl Suffixes {
    fn allowed_by(&self, allowed: u8) -> bool {
        let precision = match self.precision {
            Some(Precision::Full) => SUFFIX_R,
            Some(Precision::Half) => SUFFIX_H,
            Some(Precision::Fixed) => SUFFIX_X,
            None => 0,
        };

        let mut used = precision;

        if self.update_cond {
            used |= SUFFIX_C;
        }

        if self.saturate {
            used |= SUFFIX_S;
        }

        used & !allowed == 0
    }
}

/// The known mnemonic closest to an unknown one, if any is close enough to be a likely typo.
fn suggest_mnemonic(name: &str) -> Option<&'static str> {
    PATTERNS
        .iter()
        .map(|pattern| (edit_distance::edit_distance(name, pattern.name), pattern.name))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, name)| name)
}

/// Looks up the pattern and the suffixes of an opcode token.
fn lookup_opcode(state: &ParseState, name: &str) -> Result<(&'static InstructionPattern, Suffixes)> {
    let pattern = PATTERNS
        .iter()
        .find(|pattern| name.starts_with(pattern.name))
        .ok_or_else(|| state.error(ErrorKind::UnknownInstruction {
            name: name.to_string(),
            suggestion: suggest_mnemonic(name),
        }))?;

    let suffixes = parse_suffixes(&name[pattern.name.len()..])
        .filter(|suffixes| suffixes.allowed_by(pattern.suffixes))
        .ok_or_else(|| state.error(ErrorKind::InvalidSuffix))?;

    Ok((pattern, suffixes))
}

fn parse_instruction(state: &mut ParseState, name: &str) -> Result<Instruction> {
    let position = state.token_start();
    let (pattern, suffixes) = lookup_opcode(state, name)?;

    let mut instruction = Instruction::new(pattern.opcode, position);
    instruction.precision = suffixes.precision.unwrap_or_default();
    instruction.update_cond_register = suffixes.update_cond;
    instruction.saturate = suffixes.saturate;

    match pattern.output {
        Output::Vector | Output::Scalar => {
            let (destination, condition) = parse_masked_destination(state)
                .context("destination register")?;

            instruction.destination = Some(destination);
            instruction.condition = condition;

            state.expect(",")?;
        },
        Output::None => (),
    }

    match pattern.inputs {
        Inputs::Vector1 | Inputs::Vector2 | Inputs::Vector3 => {
            let count = match pattern.inputs {
                Inputs::Vector1 => 1,
                Inputs::Vector2 => 2,
                _ => 3,
            };

            for i in 0..count {
                if i > 0 {
                    state.expect(",")?;
                }

                instruction.sources.push(parse_vector_source(state)?);
            }
        },
        Inputs::Scalar1 | Inputs::Scalar2 => {
            instruction.sources.push(parse_scalar_source(state)?);

            if pattern.inputs == Inputs::Scalar2 {
                state.expect(",")?;
                instruction.sources.push(parse_scalar_source(state)?);
            }
        },
        Inputs::Vector1Texture | Inputs::Vector3Texture => {
            instruction.sources.push(parse_vector_source(state)?);

            if pattern.inputs == Inputs::Vector3Texture {
                for _ in 0..2 {
                    state.expect(",")?;
                    instruction.sources.push(parse_vector_source(state)?);
                }
            }

            state.expect(",")?;

            instruction.texture = Some(parse_texture_image(state).context("texture image")?);
        },
        Inputs::ConditionCode => {
            instruction.condition = parse_condition(state).context("condition code")?;
        },
    }

    state.expect(";")?;

    Ok(instruction)
}

/// Parses the rest of a `DEFINE` or `DECLARE` statement.
fn parse_definition(state: &mut ParseState, kind: ParameterKind) -> Result<()> {
    let name = state.parse_identifier()?;

    if is_reserved_identifier(name) {
        return Err(state.error(ErrorKind::ReservedIdentifier(name.to_string())));
    }

    if state.parameters.lookup(name).is_some() {
        return Err(state.error(ErrorKind::DuplicateSymbol(name.to_string())));
    }

    let value = match kind {
        ParameterKind::Declared if !state.parse_string("=") => [0.0; 4],
        ParameterKind::Declared => parse_constant(state)?,
        _ => {
            state.expect("=")?;
            parse_constant(state)?
        },
    };

    state.expect(";")?;

    let index = state.parameters.add_named(name, kind, value);

    trace!(state.logger, "define parameter";
        "name" => name, "kind" => ?kind, "index" => index, "value" => ?value);

    Ok(())
}

fn parse_header(state: &mut ParseState) -> Result<()> {
    let rest = state.rest();

    let header: IResult<&str, &str> = tag("!!FP1.0")(rest);

    match header {
        Ok((remaining, _)) => {
            state.advance(rest.len() - remaining.len());
            Ok(())
        },
        Err(_) if rest.starts_with("!!FCP1.0") =>
            Err(ParseError::new(ErrorKind::UnsupportedCombinerProgram, 0)),
        Err(_) => Err(ParseError::new(ErrorKind::InvalidHeader, 0)),
    }
}

fn parse_program(state: &mut ParseState) -> Result<Vec<Instruction>> {
    parse_header(state)?;

    let mut instructions = Vec::new();

    loop {
        let token = match state.next_token() {
            Some(token) => token,
            None => return Err(state.error(ErrorKind::MissingEnd)),
        };

        let name = match token {
            Token::Identifier(name) => name,
            _ => return Err(state.error(ErrorKind::UnexpectedToken)),
        };

        if instructions.len() >= MAX_INSTRUCTIONS {
            return Err(state.error(ErrorKind::ProgramTooLong));
        }

        match name {
            "DEFINE" => parse_definition(state, ParameterKind::Constant)
                .context("DEFINE statement")?,
            "DECLARE" => parse_definition(state, ParameterKind::Declared)
                .context("DECLARE statement")?,
            "END" => {
                instructions.push(Instruction::new(OpCode::End, state.token_start()));

                if !state.at_end() {
                    return Err(state.error_ahead(ErrorKind::CodeAfterEnd));
                }

                return Ok(instructions);
            },
            name => {
                let instruction = parse_instruction(state, name).context("instruction")?;

                trace!(state.logger, "append instruction";
                    "opcode" => %instruction.opcode,
                    "position" => instruction.position,
                    "line" => state.line());

                instructions.push(instruction);
            },
        }
    }
}

/// Compiles program text into a [Program].
pub fn compile(source: &str) -> std::result::Result<Program, ParseError> {
    compile_with_logger(source, None)
}

pub fn compile_with_logger<L>(source: &str, logger: L) -> std::result::Result<Program, ParseError>
where
    L: Into<Option<Logger>>,
{
    let logger = logger
        .into()
        .unwrap_or(Logger::root(Discard, o!()))
        .new(o!("stage" => "compilation"));

    let mut state = ParseState::new(source, logger.clone());

    let parsed = parse_program(&mut state).and_then(|instructions| {
        if state.outputs_written == 0 {
            Err(ParseError::new(ErrorKind::NoOutputsWritten, source.len()))
        } else {
            Ok(instructions)
        }
    });

    let instructions = match parsed {
        Ok(instructions) => instructions,
        Err(err) => {
            debug!(logger, "compilation failed"; "position" => err.position, "error" => %err);
            return Err(err);
        },
    };

    debug!(logger, "compiled program";
        "instructions" => instructions.len(),
        "parameters" => state.parameters.len());

    Ok(Program {
        instructions: instructions.into_boxed_slice(),
        inputs_read: state.inputs_read,
        outputs_written: state.outputs_written,
        textures_used: state.textures_used,
        parameters: state.parameters,
        local_parameters: [[0.0; 4]; MAX_LOCAL_PARAMETERS],
        source: source.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ErrorCategory;
    use crate::instruction::{
        CondMask, RegisterFile, TextureTarget, INPUT_COL0, INPUT_TEX0, OUTPUT_COLR,
    };

    #[test]
    fn test_suffixes() {
        assert_eq!(parse_suffixes(""), Some(Suffixes::default()));
        assert_eq!(
            parse_suffixes("HC_SAT"),
            Some(Suffixes { precision: Some(Precision::Half), update_cond: true, saturate: true }),
        );
        assert_eq!(parse_suffixes("_SATC"), None);
        assert_eq!(parse_suffixes("Q"), None);
    }

    #[test]
    fn test_longest_mnemonic_first() {
        let source = "!!FP1.0\nPK2US R0.x, f[COL0];\nUP4UB o[COLR], R0.x;\nEND";
        let program = compile(source).unwrap();

        assert_eq!(program.instructions[0].opcode, OpCode::PackUnsignedShort2);
        assert_eq!(program.instructions[1].opcode, OpCode::UnpackUnsignedByte4);
    }

    #[test]
    fn test_passthrough() {
        let program = compile("!!FP1.0\nMOV o[COLR], f[COL0];\nEND\n").unwrap();

        assert_eq!(program.instructions.len(), 2);
        assert_eq!(program.instructions[1].opcode, OpCode::End);
        assert_eq!(program.inputs_read, 1 << INPUT_COL0);
        assert_eq!(program.outputs_written, 1 << OUTPUT_COLR);
    }

    #[test]
    fn test_instruction_fields() {
        let source = "!!FP1.0\n\
            DECLARE bias = {0.5, 0.25};\n\
            MADHC_SAT R1.xy (GT.x), f[TEX0], -bias, |R2|;\n\
            TXP o[COLR], f[TEX0], TEX2, RECT;\n\
            KIL LT.xxyy;\n\
            END";

        let program = compile(source).unwrap();
        let mad = &program.instructions[0];

        assert_eq!(mad.opcode, OpCode::MultiplyAdd);
        assert_eq!(mad.precision, Precision::Half);
        assert!(mad.update_cond_register);
        assert!(mad.saturate);
        assert_eq!(mad.condition.mask, CondMask::Gt);
        assert_eq!(mad.sources.len(), 3);
        assert_eq!(mad.sources[1].file, RegisterFile::Parameter);
        assert!(mad.sources[1].negate_base);
        assert!(mad.sources[2].abs);

        let txp = &program.instructions[1];
        let image = txp.texture.unwrap();

        assert_eq!(image.unit, 2);
        assert_eq!(image.target, TextureTarget::Rect);
        assert_eq!(program.textures_used[2], Some(TextureTarget::Rect));
        assert_eq!(program.inputs_read, 1 << INPUT_TEX0);

        let kil = &program.instructions[2];

        assert!(kil.destination.is_none());
        assert_eq!(kil.condition.mask, CondMask::Lt);
        assert_eq!(kil.condition.swizzle, [0, 0, 1, 1]);
    }

    #[test]
    fn test_unknown_instruction() {
        let err = compile("!!FP1.0\nMOVE o[COLR], f[COL0];\nEND").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSuffix);

        let err = compile("!!FP1.0\nMVO o[COLR], f[COL0];\nEND").unwrap_err();

        match err.kind {
            ErrorKind::UnknownInstruction { ref name, suggestion: Some(_) } => assert_eq!(name, "MVO"),
            ref kind => panic!("unexpected error {:?}", kind),
        }

        assert_eq!(err.position, 8);
        assert_eq!(err.category(), ErrorCategory::Semantic);
    }

    #[test]
    fn test_disallowed_suffixes() {
        for source in &[
            "!!FP1.0\nKILC EQ;\nMOV o[COLR], f[COL0];\nEND",
            "!!FP1.0\nPK2H_SAT R0.x, f[COL0];\nMOV o[COLR], R0;\nEND",
            "!!FP1.0\nTEXR o[COLR], f[TEX0], TEX0, 2D;\nEND",
            "!!FP1.0\nCOSX o[COLR], f[COL0].x;\nEND",
        ] {
            assert_eq!(compile(source).unwrap_err().kind, ErrorKind::InvalidSuffix, "{}", source);
        }
    }

    #[test]
    fn test_headers() {
        let err = compile("!!FCP1.0\nMOV o[COLR], f[COL0];\nEND").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedCombinerProgram);
        assert_eq!(err.position, 0);

        let err = compile("!!ARBfp1.0\nEND").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidHeader);

        let err = compile(" !!FP1.0\nMOV o[COLR], f[COL0];\nEND").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidHeader);
    }

    #[test]
    fn test_end_handling() {
        let err = compile("!!FP1.0\nMOV o[COLR], f[COL0];\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingEnd);

        let err = compile("!!FP1.0\nMOV o[COLR], f[COL0];\nEND\nMOV R0, R1;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::CodeAfterEnd);

        assert!(compile("!!FP1.0\nMOV o[COLR], f[COL0];\nEND # done\n").is_ok());
    }

    #[test]
    fn test_no_outputs() {
        let err = compile("!!FP1.0\nMOV R0, f[COL0];\nEND").unwrap_err();

        assert_eq!(err.kind, ErrorKind::NoOutputsWritten);
        assert_eq!(err.category(), ErrorCategory::Semantic);
    }

    /// Collects the messages of every record logged through it.
    struct Recorder(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

    impl slog::Drain for Recorder {
        type Ok = ();
        type Err = slog::Never;

        fn log(&self, record: &slog::Record, _: &slog::OwnedKVList) -> std::result::Result<(), slog::Never> {
            if let Ok(mut messages) = self.0.lock() {
                messages.push(record.msg().to_string());
            }

            Ok(())
        }
    }

    #[test]
    fn test_failures_are_logged() {
        let messages = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let logger = Logger::root(Recorder(messages.clone()), o!());

        let err = compile_with_logger("!!FP1.0\nMOV R0, f[COL0];\nEND", logger.clone()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoOutputsWritten);

        let err = compile_with_logger("!!FP1.0\nMOV o[COLR], f[COL0];\n", logger).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingEnd);

        let messages = messages.lock().unwrap();
        let failures = messages.iter().filter(|m| *m == "compilation failed").count();

        assert_eq!(failures, 2);
    }

    #[test]
    fn test_definitions() {
        let err = compile("!!FP1.0\nDEFINE a = 1;\nDEFINE a = 2;\nEND").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateSymbol("a".to_string()));

        let err = compile("!!FP1.0\nDEFINE R1 = 1;\nEND").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReservedIdentifier("R1".to_string()));

        let err = compile("!!FP1.0\nDEFINE a;\nEND").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Expected("="));

        let program = compile("!!FP1.0\nDECLARE a;\nDEFINE b = -1.5;\nMUL o[COLR], a, b;\nEND")
            .unwrap();

        let a = program.parameters.lookup("a").unwrap();
        let b = program.parameters.lookup("b").unwrap();

        assert_eq!(program.parameters.value(a), [0.0; 4]);
        assert_eq!(program.parameters.value(b), [-1.5; 4]);
    }

    #[test]
    fn test_too_many_instructions() {
        let mut source = String::from("!!FP1.0\n");

        for _ in 0..MAX_INSTRUCTIONS - 1 {
            source.push_str("MOV o[COLR], f[COL0];\n");
        }

        let mut accepted = source.clone();
        accepted.push_str("END\n");
        assert!(compile(&accepted).is_ok());

        source.push_str("MOV o[COLR], f[COL0];\nEND\n");
        assert_eq!(compile(&source).unwrap_err().kind, ErrorKind::ProgramTooLong);
    }

    #[test]
    fn test_first_error_wins() {
        let source = "!!FP1.0\nMOV o[COLR], f[FOO];\nMOV o[COLR], R200;\nEND";
        let err = compile(source).unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidInputRegister);
        assert_eq!(err.position, source.find("FOO").unwrap());
    }
}
