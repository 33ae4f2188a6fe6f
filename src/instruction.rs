//! Types for representing compiled fragment program instructions and their operands.

use std::fmt;

/// Maximum number of instructions in a program, including the terminating `END`.
pub const MAX_INSTRUCTIONS: usize = 1024;

/// Number of temporary registers. `R<n>` and `H<n>` share this bank.
pub const MAX_TEMPORARIES: usize = 96;

/// Index offset added to `H<n>` temporaries.
pub const HALF_TEMPORARY_OFFSET: usize = 32;

/// Number of fragment attribute input registers (`f[...]`).
pub const MAX_INPUTS: usize = 12;

/// Number of result registers (`o[...]`).
pub const MAX_OUTPUTS: usize = 3;

/// Number of program local parameter registers (`p[n]`).
pub const MAX_LOCAL_PARAMETERS: usize = 64;

/// Number of texture image units addressable with `TEX<n>`.
pub const MAX_TEXTURE_IMAGE_UNITS: usize = 16;

/// Number of texture coordinate sets (`f[TEX0]` to `f[TEX7]`).
pub const MAX_TEXTURE_COORD_UNITS: usize = 8;

/// A four component register value.
pub type Vec4 = [f32; 4];

pub const INPUT_WPOS: usize = 0;
pub const INPUT_COL0: usize = 1;
pub const INPUT_COL1: usize = 2;
pub const INPUT_FOGC: usize = 3;
pub const INPUT_TEX0: usize = 4;

/// Names of the input registers, in register index order.
pub const INPUT_NAMES: [&str; MAX_INPUTS] = [
    "WPOS", "COL0", "COL1", "FOGC",
    "TEX0", "TEX1", "TEX2", "TEX3", "TEX4", "TEX5", "TEX6", "TEX7",
];

pub const OUTPUT_COLR: usize = 0;
pub const OUTPUT_COLH: usize = 1;
pub const OUTPUT_DEPR: usize = 2;

/// Names of the output registers, in register index order.
pub const OUTPUT_NAMES: [&str; MAX_OUTPUTS] = ["COLR", "COLH", "DEPR"];

/// Operations of the fragment program instruction set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Component-wise addition. (`ADD`)
    Add,
    /// Cosine of a scalar. (`COS`)
    Cosine,
    /// Partial derivative with respect to the window x coordinate. (`DDX`)
    DerivativeX,
    /// Partial derivative with respect to the window y coordinate. (`DDY`)
    DerivativeY,
    /// Three component dot product. (`DP3`)
    Dot3,
    /// Four component dot product. (`DP4`)
    Dot4,
    /// Distance vector. (`DST`)
    Distance,
    /// Base 2 exponential of a scalar. (`EX2`)
    Exp2,
    /// Component-wise floor. (`FLR`)
    Floor,
    /// Component-wise fractional part. (`FRC`)
    Fraction,
    /// Discards the fragment if any selected condition code passes the test. (`KIL`)
    Kill,
    /// Base 2 logarithm of a scalar. (`LG2`)
    Log2,
    /// Lighting coefficients. (`LIT`)
    Lighting,
    /// Linear interpolation. (`LRP`)
    Lerp,
    /// Multiply and add. (`MAD`)
    MultiplyAdd,
    /// Component-wise maximum. (`MAX`)
    Max,
    /// Component-wise minimum. (`MIN`)
    Min,
    /// Copy. (`MOV`)
    Move,
    /// Component-wise multiplication. (`MUL`)
    Multiply,
    /// Packs two half floats into 32 bits. (`PK2H`)
    PackHalf2,
    /// Packs two unsigned shorts into 32 bits. (`PK2US`)
    PackUnsignedShort2,
    /// Packs four signed bytes into 32 bits. (`PK4B`)
    PackByte4,
    /// Packs four unsigned bytes into 32 bits. (`PK4UB`)
    PackUnsignedByte4,
    /// Scalar exponentiation. (`POW`)
    Power,
    /// Scalar reciprocal. (`RCP`)
    Reciprocal,
    /// Reflection of a direction about an axis. (`RFL`)
    Reflect,
    /// Scalar reciprocal square root. (`RSQ`)
    ReciprocalSqrt,
    /// Set on equal. (`SEQ`)
    SetEqual,
    /// Set to false. (`SFL`)
    SetFalse,
    /// Set on greater or equal. (`SGE`)
    SetGreaterEqual,
    /// Set on greater. (`SGT`)
    SetGreater,
    /// Sine of a scalar. (`SIN`)
    Sine,
    /// Set on less or equal. (`SLE`)
    SetLessEqual,
    /// Set on less. (`SLT`)
    SetLess,
    /// Set on not equal. (`SNE`)
    SetNotEqual,
    /// Set to true. (`STR`)
    SetTrue,
    /// Component-wise subtraction. (`SUB`)
    Subtract,
    /// Texture lookup. (`TEX`)
    Texture,
    /// Texture lookup with a level of detail bias in `w`. (`TXB`)
    TextureBias,
    /// Texture lookup with explicit partial derivatives. (`TXD`)
    TextureDerivative,
    /// Texture lookup with projective divide. (`TXP`)
    TextureProjective,
    /// Unpacks two half floats. (`UP2H`)
    UnpackHalf2,
    /// Unpacks two unsigned shorts. (`UP2US`)
    UnpackUnsignedShort2,
    /// Unpacks four signed bytes. (`UP4B`)
    UnpackByte4,
    /// Unpacks four unsigned bytes. (`UP4UB`)
    UnpackUnsignedByte4,
    /// Two dimensional transform. (`X2D`)
    Transform2D,
    /// End of the program.
    End,
}

impl OpCode {
    /// The assembly mnemonic of the opcode, without suffixes.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Add => "ADD",
            OpCode::Cosine => "COS",
            OpCode::DerivativeX => "DDX",
            OpCode::DerivativeY => "DDY",
            OpCode::Dot3 => "DP3",
            OpCode::Dot4 => "DP4",
            OpCode::Distance => "DST",
            OpCode::Exp2 => "EX2",
            OpCode::Floor => "FLR",
            OpCode::Fraction => "FRC",
            OpCode::Kill => "KIL",
            OpCode::Log2 => "LG2",
            OpCode::Lighting => "LIT",
            OpCode::Lerp => "LRP",
            OpCode::MultiplyAdd => "MAD",
            OpCode::Max => "MAX",
            OpCode::Min => "MIN",
            OpCode::Move => "MOV",
            OpCode::Multiply => "MUL",
            OpCode::PackHalf2 => "PK2H",
            OpCode::PackUnsignedShort2 => "PK2US",
            OpCode::PackByte4 => "PK4B",
            OpCode::PackUnsignedByte4 => "PK4UB",
            OpCode::Power => "POW",
            OpCode::Reciprocal => "RCP",
            OpCode::Reflect => "RFL",
            OpCode::ReciprocalSqrt => "RSQ",
            OpCode::SetEqual => "SEQ",
            OpCode::SetFalse => "SFL",
            OpCode::SetGreaterEqual => "SGE",
            OpCode::SetGreater => "SGT",
            OpCode::Sine => "SIN",
            OpCode::SetLessEqual => "SLE",
            OpCode::SetLess => "SLT",
            OpCode::SetNotEqual => "SNE",
            OpCode::SetTrue => "STR",
            OpCode::Subtract => "SUB",
            OpCode::Texture => "TEX",
            OpCode::TextureBias => "TXB",
            OpCode::TextureDerivative => "TXD",
            OpCode::TextureProjective => "TXP",
            OpCode::UnpackHalf2 => "UP2H",
            OpCode::UnpackUnsignedShort2 => "UP2US",
            OpCode::UnpackByte4 => "UP4B",
            OpCode::UnpackUnsignedByte4 => "UP4UB",
            OpCode::Transform2D => "X2D",
            OpCode::End => "END",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Arithmetic precision requested by the `R`, `H` or `X` mnemonic suffix.
///
/// The interpreter always computes in full precision.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Precision {
    Full,
    Half,
    Fixed,
}

impl Default for Precision {
    fn default() -> Precision {
        Precision::Full
    }
}

/// Register files an operand can refer to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegisterFile {
    /// `R<n>` and `H<n>`.
    Temporary,
    /// `f[NAME]`.
    Input,
    /// `o[NAME]`.
    Output,
    /// `p[n]`.
    LocalParameter,
    /// Named constants, declared parameters and inline literals of the parameter table.
    Parameter,
    /// `RC` and `HC`. Writes only update the condition codes.
    WriteOnly,
}

/// Predicate tested against the condition code register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CondMask {
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
    Ne,
    Tr,
    Fl,
}

impl CondMask {
    pub const ALL: [CondMask; 8] = [
        CondMask::Eq, CondMask::Ge, CondMask::Gt, CondMask::Le,
        CondMask::Lt, CondMask::Ne, CondMask::Tr, CondMask::Fl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CondMask::Eq => "EQ",
            CondMask::Ge => "GE",
            CondMask::Gt => "GT",
            CondMask::Le => "LE",
            CondMask::Lt => "LT",
            CondMask::Ne => "NE",
            CondMask::Tr => "TR",
            CondMask::Fl => "FL",
        }
    }
}

/// Texture targets a `TEX<n>` image source can name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureTarget {
    Texture1D,
    Texture2D,
    Texture3D,
    Cube,
    Rect,
}

impl TextureTarget {
    pub const ALL: [TextureTarget; 5] = [
        TextureTarget::Texture1D,
        TextureTarget::Texture2D,
        TextureTarget::Texture3D,
        TextureTarget::Cube,
        TextureTarget::Rect,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TextureTarget::Texture1D => "1D",
            TextureTarget::Texture2D => "2D",
            TextureTarget::Texture3D => "3D",
            TextureTarget::Cube => "CUBE",
            TextureTarget::Rect => "RECT",
        }
    }
}

/// Identity component selection.
pub const SWIZZLE_IDENTITY: [usize; 4] = [0, 1, 2, 3];

/// A source operand.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceRegister {
    pub file: RegisterFile,
    pub index: usize,
    /// Component of the register read for each of the four operand components.
    pub swizzle: [usize; 4],
    /// Negate the register value before taking the absolute value.
    pub negate_base: bool,
    /// Take the absolute value.
    pub abs: bool,
    /// Negate after taking the absolute value.
    pub negate_abs: bool,
}

impl SourceRegister {
    pub fn new(file: RegisterFile, index: usize) -> SourceRegister {
        SourceRegister {
            file,
            index,
            swizzle: SWIZZLE_IDENTITY,
            negate_base: false,
            abs: false,
            negate_abs: false,
        }
    }
}

/// A destination operand.
#[derive(Clone, Debug, PartialEq)]
pub struct DestinationRegister {
    pub file: RegisterFile,
    pub index: usize,
    pub write_mask: [bool; 4],
}

impl DestinationRegister {
    pub fn new(file: RegisterFile, index: usize) -> DestinationRegister {
        DestinationRegister {
            file,
            index,
            write_mask: [true; 4],
        }
    }
}

/// Condition code test of an instruction.
///
/// Gates the destination write of ordinary instructions and decides the outcome of `KIL`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionTest {
    pub mask: CondMask,
    /// Condition code slot tested for each of the four components.
    pub swizzle: [usize; 4],
}

impl Default for ConditionTest {
    fn default() -> ConditionTest {
        ConditionTest {
            mask: CondMask::Tr,
            swizzle: SWIZZLE_IDENTITY,
        }
    }
}

impl ConditionTest {
    pub fn is_always(&self) -> bool {
        self.mask == CondMask::Tr
    }
}

/// The texture image a texture instruction samples from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureImage {
    pub unit: usize,
    pub target: TextureTarget,
}

/// A single compiled instruction.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub sources: Vec<SourceRegister>,
    pub destination: Option<DestinationRegister>,
    pub condition: ConditionTest,
    pub precision: Precision,
    pub saturate: bool,
    pub update_cond_register: bool,
    pub texture: Option<TextureImage>,
    /// Byte offset of the instruction in the program text.
    pub position: usize,
}

impl Instruction {
    pub fn new(opcode: OpCode, position: usize) -> Instruction {
        Instruction {
            opcode,
            sources: Vec::new(),
            destination: None,
            condition: ConditionTest::default(),
            precision: Precision::default(),
            saturate: false,
            update_cond_register: false,
            texture: None,
            position,
        }
    }

    /// The mnemonic including the precision, condition update and saturation suffixes.
    pub fn full_mnemonic(&self) -> String {
        let mut name = self.opcode.mnemonic().to_string();

        match self.precision {
            Precision::Half => name.push('H'),
            Precision::Fixed => name.push('X'),
            Precision::Full => (),
        }

        if self.update_cond_register {
            name.push('C');
        }

        if self.saturate {
            name.push_str("_SAT");
        }

        name
    }
}

/// Formats a swizzle as a suffix, `None` for the identity selection.
pub(crate) fn swizzle_suffix(swizzle: &[usize; 4]) -> Option<String> {
    const COMPONENTS: [char; 4] = ['x', 'y', 'z', 'w'];

    if *swizzle == SWIZZLE_IDENTITY {
        return None;
    }

    if swizzle.iter().all(|c| *c == swizzle[0]) {
        return Some(COMPONENTS[swizzle[0]].to_string());
    }

    Some(swizzle.iter().map(|c| COMPONENTS[*c]).collect())
}

impl fmt::Display for ConditionTest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mask.name())?;

        if let Some(suffix) = swizzle_suffix(&self.swizzle) {
            write!(f, ".{}", suffix)?;
        }

        Ok(())
    }
}

impl fmt::Display for DestinationRegister {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.file {
            RegisterFile::Temporary if self.index >= HALF_TEMPORARY_OFFSET =>
                write!(f, "H{}", self.index - HALF_TEMPORARY_OFFSET)?,
            RegisterFile::Temporary => write!(f, "R{}", self.index)?,
            RegisterFile::Output => write!(f, "o[{}]", OUTPUT_NAMES[self.index])?,
            RegisterFile::WriteOnly if self.index == 0 => write!(f, "RC")?,
            RegisterFile::WriteOnly => write!(f, "HC")?,
            file => unreachable!("{:?} is not a destination register file", file),
        }

        if self.write_mask != [true; 4] {
            write!(f, ".")?;

            for (component, name) in self.write_mask.iter().zip("xyzw".chars()) {
                if *component {
                    write!(f, "{}", name)?;
                }
            }
        }

        Ok(())
    }
}
