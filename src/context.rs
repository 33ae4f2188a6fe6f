//! The rendering context that owns the currently bound fragment program.
//!
//! Loading a program compiles it and, only if the compilation succeeds, replaces the bound
//! program. A failed load leaves the previous program bound and records the error position and
//! message until the next load attempt.
//!
//! The bound program is shared through an [Arc], so callers can keep executing an old program
//! after a new one has been loaded. Setting a parameter on a program that is still shared makes
//! a private copy first.

use std::sync::Arc;

use slog::{debug, o, Discard, Logger};

use crate::compiler::compile_with_logger;
use crate::error::{ContextError, ParseError};
use crate::instruction::{Vec4, MAX_LOCAL_PARAMETERS};
use crate::interpreter::{Interpreter, TextureSampler};
use crate::parameters::ParameterKind;
use crate::program::Program;
use crate::span::Span;

pub struct Context {
    current: Option<Arc<Program>>,
    error_position: Option<usize>,
    error_string: String,
    logger: Logger,
}

impl Context {
    pub fn new() -> Context {
        Context::with_logger(None)
    }

    pub fn with_logger<L: Into<Option<Logger>>>(logger: L) -> Context {
        let logger = logger
            .into()
            .unwrap_or(Logger::root(Discard, o!()));

        Context {
            current: None,
            error_position: None,
            error_string: String::new(),
            logger,
        }
    }

    /// Compiles `source` and binds the result.
    ///
    /// On failure the previously bound program stays bound and the error is available from
    /// [Context::error_position] and [Context::error_string].
    pub fn load_program(&mut self, source: &str) -> Result<(), ParseError> {
        self.error_position = None;
        self.error_string.clear();

        match compile_with_logger(source, self.logger.clone()) {
            Ok(program) => {
                debug!(self.logger, "program bound";
                    "instructions" => program.instructions.len(),
                    "inputs_read" => program.inputs_read,
                    "outputs_written" => program.outputs_written);

                self.current = Some(Arc::new(program));

                Ok(())
            },
            Err(err) => {
                debug!(self.logger, "program rejected"; "position" => err.position, "error" => %err);

                self.error_position = Some(err.position);
                self.error_string = err.kind.to_string();

                Err(err)
            },
        }
    }

    /// The bound program.
    pub fn program(&self) -> Option<&Arc<Program>> {
        self.current.as_ref()
    }

    /// Byte offset of the error of the last load attempt, `None` if it succeeded.
    pub fn error_position(&self) -> Option<usize> {
        self.error_position
    }

    /// Message of the error of the last load attempt, empty if it succeeded.
    pub fn error_string(&self) -> &str {
        &self.error_string
    }

    fn program_mut(&mut self) -> Result<&mut Program, ContextError> {
        match self.current.as_mut() {
            Some(program) => Ok(Arc::make_mut(program)),
            None => Err(ContextError::NoProgram),
        }
    }

    /// Sets the program local parameter `p[index]` of the bound program.
    pub fn set_local_parameter(&mut self, index: usize, value: Vec4) -> Result<(), ContextError> {
        if index >= MAX_LOCAL_PARAMETERS {
            return Err(ContextError::InvalidLocalParameter(index));
        }

        self.program_mut()?.local_parameters[index] = value;

        Ok(())
    }

    /// Sets a parameter introduced with `DECLARE` in the bound program.
    pub fn set_named_parameter(&mut self, name: &str, value: Vec4) -> Result<(), ContextError> {
        let program = self.program_mut()?;

        let index = program
            .parameters
            .lookup(name)
            .ok_or_else(|| ContextError::UndefinedParameter(name.to_string()))?;

        match program.parameters.get(index).map(|parameter| parameter.kind) {
            Some(ParameterKind::Declared) => (),
            _ => return Err(ContextError::ConstantParameter(name.to_string())),
        }

        program.parameters.set_value(index, value);

        Ok(())
    }

    /// Runs the bound program on every live fragment of `span`.
    ///
    /// # Returns
    /// The number of fragments killed.
    pub fn execute_span<S>(&self, span: &mut Span, sampler: S) -> Result<usize, ContextError>
    where
        S: TextureSampler,
    {
        let program = self.current.as_ref().ok_or(ContextError::NoProgram)?;

        let mut interpreter = Interpreter::with_logger(program, sampler, self.logger.clone());

        Ok(interpreter.run_span(span))
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ErrorKind;
    use crate::instruction::{INPUT_COL0, MAX_INPUTS};
    use crate::interpreter::SolidColor;
    use crate::span::Fragment;

    const PASSTHROUGH: &str = "!!FP1.0\nMOV o[COLR], f[COL0];\nEND\n";

    #[test]
    fn test_failed_load_keeps_program() {
        let mut context = Context::new();

        context.load_program(PASSTHROUGH).unwrap();
        let bound = context.program().cloned().unwrap();

        let err = context.load_program("!!FP1.0\nMOV o[COLR], R0\nEND\n").unwrap_err();

        assert_eq!(context.error_position(), Some(err.position));
        assert!(!context.error_string().is_empty());
        assert!(Arc::ptr_eq(context.program().unwrap(), &bound));

        context.load_program(PASSTHROUGH).unwrap();

        assert_eq!(context.error_position(), None);
        assert_eq!(context.error_string(), "");
        assert!(!Arc::ptr_eq(context.program().unwrap(), &bound));
    }

    #[test]
    fn test_header_error_position() {
        let mut context = Context::new();

        let err = context.load_program("!!FCP1.0\nEND\n").unwrap_err();

        assert_eq!(err.kind, ErrorKind::UnsupportedCombinerProgram);
        assert_eq!(context.error_position(), Some(0));
        assert!(context.program().is_none());
    }

    #[test]
    fn test_parameters() {
        let mut context = Context::new();

        assert_eq!(context.set_local_parameter(0, [1.0; 4]), Err(ContextError::NoProgram));

        context.load_program(
            "!!FP1.0\n\
            DEFINE half = 0.5;\n\
            DECLARE tint = {1, 0, 0, 1};\n\
            MUL R0, tint, half;\n\
            ADD o[COLR], R0, p[2];\n\
            END\n",
        ).unwrap();

        let shared = context.program().cloned().unwrap();

        context.set_local_parameter(2, [0.25; 4]).unwrap();
        context.set_named_parameter("tint", [0.0, 1.0, 0.0, 1.0]).unwrap();

        assert_eq!(
            context.set_local_parameter(64, [0.0; 4]),
            Err(ContextError::InvalidLocalParameter(64)),
        );
        assert_eq!(
            context.set_named_parameter("half", [1.0; 4]),
            Err(ContextError::ConstantParameter("half".to_string())),
        );
        assert_eq!(
            context.set_named_parameter("missing", [1.0; 4]),
            Err(ContextError::UndefinedParameter("missing".to_string())),
        );

        // The copy handed out before the changes is not affected.
        assert_eq!(shared.local_parameters[2], [0.0; 4]);

        let mut span = Span::single(Fragment::default());
        context.execute_span(&mut span, SolidColor([0.0; 4])).unwrap();

        assert_eq!(span.fragments[0].color, [0.25, 0.75, 0.25, 0.75]);
    }

    #[test]
    fn test_execute_span() {
        let mut context = Context::new();
        let mut span = Span::single(Fragment::default());

        assert_eq!(
            context.execute_span(&mut span, SolidColor([0.0; 4])),
            Err(ContextError::NoProgram),
        );

        context.load_program(PASSTHROUGH).unwrap();

        let mut inputs = [[0.0; 4]; MAX_INPUTS];
        inputs[INPUT_COL0] = [0.2, 0.4, 0.6, 1.0];

        let mut span = Span::single(Fragment::new(inputs));

        assert_eq!(context.execute_span(&mut span, SolidColor([0.0; 4])), Ok(0));
        assert_eq!(span.fragments[0].color, [0.2, 0.4, 0.6, 1.0]);
    }
}
