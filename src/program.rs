//! The compiled form of a fragment program.

use std::fmt;

use crate::instruction::{
    swizzle_suffix, Instruction, OpCode, RegisterFile, SourceRegister, TextureTarget, Vec4,
    HALF_TEMPORARY_OFFSET, INPUT_NAMES, MAX_LOCAL_PARAMETERS, MAX_TEXTURE_IMAGE_UNITS,
};
use crate::parameters::{ParameterKind, ParameterList};

/// A compiled fragment program.
///
/// Created by [crate::compiler::compile]. The instruction array always ends with
/// [OpCode::End].
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub instructions: Box<[Instruction]>,
    /// Bit `n` is set if input register `n` is read.
    pub inputs_read: u32,
    /// Bit `n` is set if output register `n` is written.
    pub outputs_written: u32,
    /// The target each texture image unit is sampled with, if any.
    pub textures_used: [Option<TextureTarget>; MAX_TEXTURE_IMAGE_UNITS],
    pub parameters: ParameterList,
    /// Values of the `p[n]` registers.
    pub local_parameters: [Vec4; MAX_LOCAL_PARAMETERS],
    /// The program text the program was compiled from.
    pub source: String,
}

impl Program {
    pub fn reads_input(&self, index: usize) -> bool {
        self.inputs_read & (1 << index) != 0
    }

    pub fn writes_output(&self, index: usize) -> bool {
        self.outputs_written & (1 << index) != 0
    }

    /// Instructions without the terminating `END`.
    pub fn body(&self) -> &[Instruction] {
        match self.instructions.split_last() {
            Some((last, body)) if last.opcode == OpCode::End => body,
            _ => &self.instructions,
        }
    }

    /// The texture image units the program samples from, in ascending order.
    pub fn texture_units(&self) -> impl Iterator<Item = (usize, TextureTarget)> + '_ {
        self.textures_used
            .iter()
            .enumerate()
            .filter_map(|(unit, target)| target.map(|target| (unit, target)))
    }

    fn fmt_source(&self, f: &mut fmt::Formatter, src: &SourceRegister) -> fmt::Result {
        if src.abs {
            if src.negate_abs {
                write!(f, "-")?;
            }

            write!(f, "|")?;
        }

        if src.negate_base {
            write!(f, "-")?;
        }

        match src.file {
            RegisterFile::Temporary if src.index >= HALF_TEMPORARY_OFFSET =>
                write!(f, "H{}", src.index - HALF_TEMPORARY_OFFSET)?,
            RegisterFile::Temporary => write!(f, "R{}", src.index)?,
            RegisterFile::Input => write!(f, "f[{}]", INPUT_NAMES[src.index])?,
            RegisterFile::LocalParameter => write!(f, "p[{}]", src.index)?,
            RegisterFile::Parameter => match self.parameters.get(src.index) {
                Some(param) => match param.name {
                    Some(ref name) => write!(f, "{}", name)?,
                    None => fmt_vector(f, &param.value)?,
                },
                None => write!(f, "<invalid parameter {}>", src.index)?,
            },
            file => write!(f, "<{:?} {}>", file, src.index)?,
        }

        if let Some(suffix) = swizzle_suffix(&src.swizzle) {
            write!(f, ".{}", suffix)?;
        }

        if src.abs {
            write!(f, "|")?;
        }

        Ok(())
    }

    fn fmt_instruction(&self, f: &mut fmt::Formatter, ins: &Instruction) -> fmt::Result {
        write!(f, "{}", ins.full_mnemonic())?;

        let mut separator = " ";

        if let Some(ref dst) = ins.destination {
            write!(f, " {}", dst)?;

            if !ins.condition.is_always() || ins.condition.swizzle != [0, 1, 2, 3] {
                write!(f, " ({})", ins.condition)?;
            }

            separator = ", ";
        }

        if ins.opcode == OpCode::Kill {
            write!(f, " {}", ins.condition)?;
        }

        for src in ins.sources.iter() {
            write!(f, "{}", separator)?;
            self.fmt_source(f, src)?;
            separator = ", ";
        }

        if let Some(image) = ins.texture {
            write!(f, ", TEX{}, {}", image.unit, image.target.name())?;
        }

        write!(f, ";")
    }
}

fn fmt_vector(f: &mut fmt::Formatter, value: &Vec4) -> fmt::Result {
    write!(f, "{{{:?}, {:?}, {:?}, {:?}}}", value[0], value[1], value[2], value[3])
}

/// Renders the program as program text that compiles to the same instructions.
///
/// Named parameters are emitted before the instructions, so a program that defines symbols
/// after using inline literals compiles to different parameter indices.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "!!FP1.0")?;

        for param in self.parameters.iter() {
            let keyword = match param.kind {
                ParameterKind::Constant => "DEFINE",
                ParameterKind::Declared => "DECLARE",
                ParameterKind::Anonymous => continue,
            };

            if let Some(ref name) = param.name {
                write!(f, "{} {} = ", keyword, name)?;
                fmt_vector(f, &param.value)?;
                writeln!(f, ";")?;
            }
        }

        for ins in self.body() {
            self.fmt_instruction(f, ins)?;
            writeln!(f)?;
        }

        writeln!(f, "END")
    }
}
