//! Parsers for instruction operands.
//!
//! Each parser consumes one construct at the cursor of a [ParseState] and returns it in its
//! compiled form. Register references are checked against the hardware limits and recorded in
//! the usage masks of the state as they are read.

use slog::trace;

use crate::error::{ErrorExt, ErrorKind};
use crate::instruction::{
    CondMask, ConditionTest, DestinationRegister, RegisterFile, SourceRegister, TextureImage,
    TextureTarget, Vec4, HALF_TEMPORARY_OFFSET, INPUT_NAMES, MAX_LOCAL_PARAMETERS,
    MAX_TEMPORARIES, MAX_TEXTURE_IMAGE_UNITS, OUTPUT_COLH, OUTPUT_COLR, OUTPUT_NAMES,
};

use super::{ParseState, Result, Token};

/// Names that can not be used for `DEFINE` and `DECLARE` symbols.
pub(crate) fn is_reserved_identifier(name: &str) -> bool {
    match name {
        "RC" | "HC" | "f" | "o" | "p" => true,
        name => temporary_index(name).is_some(),
    }
}

/// Index of a `R<n>` or `H<n>` temporary name, without a range check.
///
/// The bank letter is accepted in either case.
fn temporary_index(name: &str) -> Option<usize> {
    let (bank, digits) = match name.as_bytes().first() {
        Some(b'R') | Some(b'r') => (0, &name[1..]),
        Some(b'H') | Some(b'h') => (HALF_TEMPORARY_OFFSET, &name[1..]),
        _ => return None,
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // Out of range digit strings still name a temporary, they are rejected by the caller.
    Some(digits.parse::<usize>().map(|n| bank + n).unwrap_or(usize::MAX))
}

fn parse_temporary(state: &mut ParseState, name: &str) -> Result<usize> {
    match temporary_index(name) {
        Some(index) if index < MAX_TEMPORARIES => Ok(index),
        _ => Err(state.error(ErrorKind::InvalidTemporary)),
    }
}

/// Parses the `[NAME]` part of an `f[NAME]` register.
fn parse_input_register(state: &mut ParseState) -> Result<usize> {
    state.expect("[")?;

    let name = state.parse_identifier()?;

    let index = INPUT_NAMES
        .iter()
        .position(|n| *n == name)
        .ok_or_else(|| state.error(ErrorKind::InvalidInputRegister))?;

    state.expect("]")?;

    state.inputs_read |= 1 << index;

    Ok(index)
}

/// Parses the `[NAME]` part of an `o[NAME]` register.
fn parse_output_register(state: &mut ParseState) -> Result<usize> {
    state.expect("[")?;

    let name = state.parse_identifier()?;

    let index = OUTPUT_NAMES
        .iter()
        .position(|n| *n == name)
        .ok_or_else(|| state.error(ErrorKind::InvalidOutputRegister))?;

    state.expect("]")?;

    state.outputs_written |= 1 << index;

    let both_colors = (1 << OUTPUT_COLR) | (1 << OUTPUT_COLH);

    if state.outputs_written & both_colors == both_colors {
        return Err(state.error(ErrorKind::ConflictingColorOutputs));
    }

    Ok(index)
}

/// Parses the `[n]` part of a `p[n]` register.
fn parse_local_parameter(state: &mut ParseState) -> Result<usize> {
    state.expect("[")?;

    let index = state.parse_integer()?;

    if index >= MAX_LOCAL_PARAMETERS {
        return Err(state.error(ErrorKind::InvalidLocalParameter));
    }

    state.expect("]")?;

    Ok(index)
}

/// Parses a `{x, y, z, w}` literal after the opening brace has been consumed.
///
/// Missing trailing components default to `(0, 0, 0, 1)`.
fn parse_vector_literal_body(state: &mut ParseState) -> Result<Vec4> {
    let mut value = [0.0, 0.0, 0.0, 1.0];

    value[0] = state.parse_float()?;

    for component in value.iter_mut().skip(1) {
        if !state.parse_string(",") {
            break;
        }

        *component = state.parse_float()?;
    }

    state.expect("}")?;

    Ok(value)
}

/// Parses the value of a `DEFINE` or `DECLARE` statement.
///
/// A scalar is broadcast to all four components.
pub(crate) fn parse_constant(state: &mut ParseState) -> Result<Vec4> {
    if state.parse_string("{") {
        return parse_vector_literal_body(state).context("vector constant");
    }

    let value = state.parse_float().context("scalar constant")?;

    Ok([value; 4])
}

/// Parses a `.x` or `.xyzw` style swizzle after the dot has been consumed.
pub(crate) fn parse_swizzle(state: &mut ParseState) -> Result<[usize; 4]> {
    let letters = match state.parse_token()? {
        Token::Identifier(letters) => letters,
        _ => return Err(state.error(ErrorKind::InvalidSwizzle)),
    };

    let component = |ch: char| match ch {
        'x' => Some(0),
        'y' => Some(1),
        'z' => Some(2),
        'w' => Some(3),
        _ => None,
    };

    let components = letters.chars().map(component).collect::<Option<Vec<usize>>>();

    match components.as_ref().map(Vec::as_slice) {
        Some(&[c]) => Ok([c; 4]),
        Some(&[x, y, z, w]) => Ok([x, y, z, w]),
        _ => Err(state.error(ErrorKind::InvalidSwizzle)),
    }
}

/// Parses a write mask after the dot has been consumed.
///
/// The components must appear in `xyzw` order, each at most once.
fn parse_write_mask(state: &mut ParseState) -> Result<[bool; 4]> {
    let letters = match state.parse_token()? {
        Token::Identifier(letters) => letters,
        _ => return Err(state.error(ErrorKind::InvalidWriteMask)),
    };

    let mut mask = [false; 4];
    let mut next = 0;

    for ch in letters.chars() {
        let index = match "xyzw"[next..].find(ch) {
            Some(offset) => next + offset,
            None => return Err(state.error(ErrorKind::InvalidWriteMask)),
        };

        mask[index] = true;
        next = index + 1;
    }

    Ok(mask)
}

/// Parses a condition code test such as `GT` or `NE.xxyy`.
pub(crate) fn parse_condition(state: &mut ParseState) -> Result<ConditionTest> {
    let name = match state.parse_token()? {
        Token::Identifier(name) => name,
        _ => return Err(state.error(ErrorKind::InvalidConditionMask)),
    };

    let mask = CondMask::ALL
        .iter()
        .find(|mask| mask.name() == name)
        .copied()
        .ok_or_else(|| state.error(ErrorKind::InvalidConditionMask))?;

    let mut test = ConditionTest {
        mask,
        ..ConditionTest::default()
    };

    if state.parse_string(".") {
        test.swizzle = parse_swizzle(state)?;
    }

    Ok(test)
}

/// Parses a destination register with its optional write mask and condition test.
pub(crate) fn parse_masked_destination(
    state: &mut ParseState,
) -> Result<(DestinationRegister, ConditionTest)> {
    let name = match state.parse_token()? {
        Token::Identifier(name) => name,
        _ => return Err(state.error(ErrorKind::InvalidDestination)),
    };

    let (file, index) = match name {
        "RC" => (RegisterFile::WriteOnly, 0),
        "HC" => (RegisterFile::WriteOnly, 1),
        "o" => (RegisterFile::Output, parse_output_register(state)?),
        name if temporary_index(name).is_some() =>
            (RegisterFile::Temporary, parse_temporary(state, name)?),
        _ => return Err(state.error(ErrorKind::InvalidDestination)),
    };

    let mut destination = DestinationRegister::new(file, index);

    if state.parse_string(".") {
        destination.write_mask = parse_write_mask(state)?;
    }

    let mut condition = ConditionTest::default();

    if state.parse_string("(") {
        condition = parse_condition(state).context("condition code")?;
        state.expect(")")?;
    }

    Ok((destination, condition))
}

/// Parses a source register reference without modifiers.
///
/// Returns the register and whether it names a constant. Inline literals are added to the
/// parameter table.
fn parse_source_base(state: &mut ParseState) -> Result<(SourceRegister, bool)> {
    // Numeric literals span multiple tokens, so they are scanned from the raw text.
    if let Some(Token::Integer(_)) | Some(Token::Punctuation(".")) = state.peek_token() {
        let value = state.parse_float()?;
        let index = state.parameters.add_anonymous([value; 4]);

        trace!(state.logger, "add scalar literal"; "index" => index, "value" => value);

        return Ok((SourceRegister::new(RegisterFile::Parameter, index), true));
    }

    let token = state.parse_token()?;

    let register = match token {
        Token::Identifier("RC") | Token::Identifier("HC") =>
            return Err(state.error(ErrorKind::InvalidSource)),
        Token::Identifier("f") =>
            SourceRegister::new(RegisterFile::Input, parse_input_register(state)?),
        Token::Identifier("p") =>
            SourceRegister::new(RegisterFile::LocalParameter, parse_local_parameter(state)?),
        Token::Identifier(name) if temporary_index(name).is_some() =>
            SourceRegister::new(RegisterFile::Temporary, parse_temporary(state, name)?),
        Token::Identifier(name) => {
            let index = state
                .parameters
                .lookup(name)
                .ok_or_else(|| state.error(ErrorKind::UndefinedSymbol(name.to_string())))?;

            return Ok((SourceRegister::new(RegisterFile::Parameter, index), true));
        },
        Token::Punctuation("{") => {
            let value = parse_vector_literal_body(state)?;
            let index = state.parameters.add_anonymous(value);

            trace!(state.logger, "add vector literal"; "index" => index, "value" => ?value);

            return Ok((SourceRegister::new(RegisterFile::Parameter, index), true));
        },
        _ => return Err(state.error(ErrorKind::InvalidSource)),
    };

    Ok((register, false))
}

/// Parses the sign, absolute value bars and the register of a source operand, with the
/// suffix parsed by `suffix`.
fn parse_source_with<F>(state: &mut ParseState, suffix: F) -> Result<SourceRegister>
where
    F: FnOnce(&mut ParseState, bool) -> Result<Option<[usize; 4]>>,
{
    let outer_negate = if state.parse_string("-") {
        true
    } else {
        state.parse_string("+");
        false
    };

    let abs = state.parse_string("|");

    let inner_negate = if abs {
        if state.parse_string("-") {
            true
        } else {
            state.parse_string("+");
            false
        }
    } else {
        outer_negate
    };

    let (mut register, is_constant) = parse_source_base(state)?;

    if let Some(swizzle) = suffix(state, is_constant)? {
        register.swizzle = swizzle;
    }

    if abs {
        state.expect("|")?;
    }

    register.negate_base = inner_negate;
    register.abs = abs;
    register.negate_abs = abs && outer_negate;

    Ok(register)
}

/// Parses a four component source operand.
pub(crate) fn parse_vector_source(state: &mut ParseState) -> Result<SourceRegister> {
    parse_source_with(state, |state, _| {
        if state.parse_string(".") {
            parse_swizzle(state).map(Some)
        } else {
            Ok(None)
        }
    })
    .context("vector source")
}

/// Parses a scalar source operand.
///
/// Registers need a single component suffix. Constants read `x` if the suffix is absent.
pub(crate) fn parse_scalar_source(state: &mut ParseState) -> Result<SourceRegister> {
    parse_source_with(state, |state, is_constant| {
        if !state.parse_string(".") {
            if is_constant {
                return Ok(Some([0; 4]));
            }

            return Err(state.error_ahead(ErrorKind::Expected("scalar suffix")));
        }

        let swizzle = parse_swizzle(state)?;

        if swizzle.iter().any(|c| *c != swizzle[0]) {
            return Err(state.error(ErrorKind::InvalidSwizzle));
        }

        Ok(Some(swizzle))
    })
    .context("scalar source")
}

/// Parses a `TEX<n>, <target>` texture image reference and records the unit's target.
pub(crate) fn parse_texture_image(state: &mut ParseState) -> Result<TextureImage> {
    let name = state.parse_identifier()?;

    let unit = match name.strip_prefix("TEX") {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) =>
            digits.parse::<usize>().unwrap_or(usize::MAX),
        _ => return Err(state.error(ErrorKind::Expected("texture image unit"))),
    };

    if unit >= MAX_TEXTURE_IMAGE_UNITS {
        return Err(state.error(ErrorKind::InvalidTextureUnit));
    }

    state.expect(",")?;

    let target = TextureTarget::ALL
        .iter()
        .find(|target| state.parse_keyword(target.name()))
        .copied()
        .ok_or_else(|| state.error_ahead(ErrorKind::InvalidTextureTarget))?;

    match state.textures_used[unit] {
        Some(used) if used != target =>
            return Err(state.error(ErrorKind::TextureTargetConflict { unit })),
        _ => state.textures_used[unit] = Some(target),
    }

    Ok(TextureImage { unit, target })
}

#[cfg(test)]
mod tests {
    use super::*;

    use slog::{o, Discard, Logger};

    use crate::instruction::{INPUT_COL0, INPUT_TEX0, OUTPUT_DEPR};
    use crate::parameters::ParameterKind;

    fn state(source: &str) -> ParseState {
        ParseState::new(source, Logger::root(Discard, o!()))
    }

    #[test]
    fn test_swizzles() {
        assert_eq!(parse_swizzle(&mut state("x")), Ok([0, 0, 0, 0]));
        assert_eq!(parse_swizzle(&mut state("wzyx")), Ok([3, 2, 1, 0]));
        assert_eq!(parse_swizzle(&mut state("xy")).unwrap_err().kind, ErrorKind::InvalidSwizzle);
        assert_eq!(parse_swizzle(&mut state("xyzwx")).unwrap_err().kind, ErrorKind::InvalidSwizzle);
        assert_eq!(parse_swizzle(&mut state("xyzq")).unwrap_err().kind, ErrorKind::InvalidSwizzle);
    }

    #[test]
    fn test_write_masks() {
        assert_eq!(parse_write_mask(&mut state("xw")), Ok([true, false, false, true]));
        assert_eq!(parse_write_mask(&mut state("xyzw")), Ok([true; 4]));
        assert!(parse_write_mask(&mut state("yx")).is_err());
        assert!(parse_write_mask(&mut state("xx")).is_err());
        assert!(parse_write_mask(&mut state("xq")).is_err());
    }

    #[test]
    fn test_destination() {
        let mut s = state("H2.xz (NE.y)");
        let (dst, cond) = parse_masked_destination(&mut s).unwrap();

        assert_eq!(dst.file, RegisterFile::Temporary);
        assert_eq!(dst.index, HALF_TEMPORARY_OFFSET + 2);
        assert_eq!(dst.write_mask, [true, false, true, false]);
        assert_eq!(cond.mask, CondMask::Ne);
        assert_eq!(cond.swizzle, [1; 4]);

        let mut s = state("o[DEPR].z");
        let (dst, cond) = parse_masked_destination(&mut s).unwrap();

        assert_eq!(dst.file, RegisterFile::Output);
        assert_eq!(dst.index, OUTPUT_DEPR);
        assert!(cond.is_always());
        assert_eq!(s.outputs_written, 1 << OUTPUT_DEPR);

        let (dst, _) = parse_masked_destination(&mut state("RC")).unwrap();
        assert_eq!(dst.file, RegisterFile::WriteOnly);

        let err = parse_masked_destination(&mut state("R96")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTemporary);

        let err = parse_masked_destination(&mut state("f[COL0]")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidDestination);
    }

    #[test]
    fn test_color_outputs_conflict() {
        let mut s = state("o[COLR], o[COLH]");

        parse_masked_destination(&mut s).unwrap();
        s.expect(",").unwrap();

        let err = parse_masked_destination(&mut s).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConflictingColorOutputs);
    }

    #[test]
    fn test_source_modifiers() {
        let src = parse_vector_source(&mut state("-|-R1.yzwx|")).unwrap();

        assert_eq!(src.index, 1);
        assert_eq!(src.swizzle, [1, 2, 3, 0]);
        assert!(src.negate_base);
        assert!(src.abs);
        assert!(src.negate_abs);

        let src = parse_vector_source(&mut state("-f[COL0]")).unwrap();

        assert!(src.negate_base);
        assert!(!src.abs);
        assert!(!src.negate_abs);

        let src = parse_vector_source(&mut state("|f[TEX0]|")).unwrap();

        assert!(!src.negate_base);
        assert!(src.abs);
        assert!(!src.negate_abs);
    }

    #[test]
    fn test_inputs_read() {
        let mut s = state("f[COL0], f[TEX0]");

        parse_vector_source(&mut s).unwrap();
        s.expect(",").unwrap();
        parse_vector_source(&mut s).unwrap();

        assert_eq!(s.inputs_read, (1 << INPUT_COL0) | (1 << INPUT_TEX0));

        let err = parse_vector_source(&mut state("f[TEX8]")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInputRegister);
    }

    #[test]
    fn test_literals() {
        let mut s = state("{1, 2}, 0.5, {1, 2, 0, 1}");

        let a = parse_vector_source(&mut s).unwrap();
        s.expect(",").unwrap();
        let b = parse_vector_source(&mut s).unwrap();
        s.expect(",").unwrap();
        let c = parse_vector_source(&mut s).unwrap();

        assert_eq!(a.file, RegisterFile::Parameter);
        assert_eq!(s.parameters.value(a.index), [1.0, 2.0, 0.0, 1.0]);
        assert_eq!(s.parameters.value(b.index), [0.5; 4]);
        assert_eq!(a.index, c.index);
    }

    #[test]
    fn test_named_parameters() {
        let mut s = state("scale.x, missing");
        s.parameters.add_named("scale", ParameterKind::Declared, [2.0; 4]);

        let src = parse_scalar_source(&mut s).unwrap();
        assert_eq!(src.file, RegisterFile::Parameter);
        assert_eq!(src.swizzle, [0; 4]);

        s.expect(",").unwrap();

        let err = parse_vector_source(&mut s).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedSymbol("missing".to_string()));
    }

    #[test]
    fn test_scalar_suffix() {
        let src = parse_scalar_source(&mut state("R0.w")).unwrap();
        assert_eq!(src.swizzle, [3; 4]);

        let src = parse_scalar_source(&mut state("2.0")).unwrap();
        assert_eq!(src.swizzle, [0; 4]);

        assert!(parse_scalar_source(&mut state("R0")).is_err());
        assert!(parse_scalar_source(&mut state("R0.xyzw")).is_err());
    }

    #[test]
    fn test_local_parameters() {
        let src = parse_vector_source(&mut state("p[63]")).unwrap();
        assert_eq!(src.file, RegisterFile::LocalParameter);
        assert_eq!(src.index, 63);

        let err = parse_vector_source(&mut state("p[64]")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidLocalParameter);
    }

    #[test]
    fn test_texture_images() {
        let mut s = state("TEX3, 2D TEX3, 2D TEX3, CUBE");

        assert_eq!(
            parse_texture_image(&mut s),
            Ok(TextureImage { unit: 3, target: TextureTarget::Texture2D }),
        );
        assert!(parse_texture_image(&mut s).is_ok());

        let err = parse_texture_image(&mut s).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TextureTargetConflict { unit: 3 });

        let err = parse_texture_image(&mut state("TEX16, 2D")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTextureUnit);

        let err = parse_texture_image(&mut state("TEX0, 4D")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTextureTarget);
    }

    #[test]
    fn test_reserved_identifiers() {
        assert!(is_reserved_identifier("R3"));
        assert!(is_reserved_identifier("H15"));
        assert!(is_reserved_identifier("RC"));
        assert!(is_reserved_identifier("o"));
        assert!(is_reserved_identifier("r0"));
        assert!(!is_reserved_identifier("Red"));
        assert!(!is_reserved_identifier("color"));
    }
}
