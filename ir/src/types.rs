//! Type system: scalar types, shapes, and shaped memref types.
//!
//! Shapes follow the symbolic-dimension approach: a [`Shape`] is a sequence
//! of [`Dim`]s, each either a fixed extent or [`Dim::Dynamic`] ("unknown at
//! this stage"). Rank is fixed once a ranked type exists; extents may
//! individually be unknown.

use std::fmt;

use smallvec::SmallVec;

/// Integer signedness interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signedness {
    Signless,
    Signed,
    Unsigned,
}

/// Floating-point type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatKind {
    F16,
    BF16,
    F32,
    F64,
}

/// One dimension extent: fixed or unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    Fixed(u64),
    Dynamic,
}

impl Dim {
    pub fn is_fixed(&self) -> bool {
        matches!(self, Dim::Fixed(_))
    }

    pub fn as_fixed(&self) -> Option<u64> {
        match self {
            Dim::Fixed(v) => Some(*v),
            Dim::Dynamic => None,
        }
    }
}

impl From<u64> for Dim {
    fn from(v: u64) -> Self {
        Dim::Fixed(v)
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(v) => write!(f, "{v}"),
            Dim::Dynamic => write!(f, "?"),
        }
    }
}

/// Shape type - ordered sequence of dimension extents.
///
/// Inline capacity of 4 avoids heap allocation for the common 1D-4D case.
pub type Shape = SmallVec<[Dim; 4]>;

/// Check that every extent of a shape is fixed.
pub fn is_static(shape: &Shape) -> bool {
    shape.iter().all(Dim::is_fixed)
}

/// IR types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Fixed-width integer with a signedness interpretation.
    Integer { width: u32, signedness: Signedness },
    /// Floating-point scalar.
    Float(FloatKind),
    /// Platform-width index type used for all memory indexing arithmetic.
    Index,
    /// Ranked memory reference: shape, element type, optional memory space.
    MemRef { shape: Shape, element: Box<Type>, space: Option<u32> },
    /// Memory reference of unknown rank.
    UnrankedMemRef { element: Box<Type>, space: Option<u32> },
    /// Function type.
    Function { inputs: Vec<Type>, results: Vec<Type> },
}

impl Type {
    pub fn i1() -> Self {
        Self::int(1)
    }

    pub fn i8() -> Self {
        Self::int(8)
    }

    pub fn i16() -> Self {
        Self::int(16)
    }

    pub fn i32() -> Self {
        Self::int(32)
    }

    pub fn i64() -> Self {
        Self::int(64)
    }

    /// Signless integer of the given width.
    pub fn int(width: u32) -> Self {
        Type::Integer { width, signedness: Signedness::Signless }
    }

    pub fn signed(width: u32) -> Self {
        Type::Integer { width, signedness: Signedness::Signed }
    }

    pub fn unsigned(width: u32) -> Self {
        Type::Integer { width, signedness: Signedness::Unsigned }
    }

    pub fn f16() -> Self {
        Type::Float(FloatKind::F16)
    }

    pub fn bf16() -> Self {
        Type::Float(FloatKind::BF16)
    }

    pub fn f32() -> Self {
        Type::Float(FloatKind::F32)
    }

    pub fn f64() -> Self {
        Type::Float(FloatKind::F64)
    }

    pub fn index() -> Self {
        Type::Index
    }

    /// Ranked memref in the default memory space.
    pub fn memref(dims: impl IntoIterator<Item = Dim>, element: Type) -> Self {
        Type::MemRef { shape: dims.into_iter().collect(), element: Box::new(element), space: None }
    }

    pub fn unranked_memref(element: Type) -> Self {
        Type::UnrankedMemRef { element: Box::new(element), space: None }
    }

    pub fn function(inputs: Vec<Type>, results: Vec<Type>) -> Self {
        Type::Function { inputs, results }
    }

    pub fn is_memref(&self) -> bool {
        matches!(self, Type::MemRef { .. } | Type::UnrankedMemRef { .. })
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Type::Index)
    }

    /// Element type of a memref, if this is one.
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::MemRef { element, .. } | Type::UnrankedMemRef { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Shape of a ranked memref, if this is one.
    pub fn shape(&self) -> Option<&Shape> {
        match self {
            Type::MemRef { shape, .. } => Some(shape),
            _ => None,
        }
    }

    pub fn has_rank(&self) -> bool {
        matches!(self, Type::MemRef { .. })
    }

    pub fn has_static_shape(&self) -> bool {
        self.shape().is_some_and(is_static)
    }

    /// Short identifier-safe rendering, used to suffix specialized symbols.
    pub fn suffix(&self) -> String {
        let rendered = self.to_string();
        rendered
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer { width, signedness } => {
                let prefix = match signedness {
                    Signedness::Signless => "i",
                    Signedness::Signed => "si",
                    Signedness::Unsigned => "ui",
                };
                write!(f, "{prefix}{width}")
            }
            Type::Float(FloatKind::F16) => write!(f, "f16"),
            Type::Float(FloatKind::BF16) => write!(f, "bf16"),
            Type::Float(FloatKind::F32) => write!(f, "f32"),
            Type::Float(FloatKind::F64) => write!(f, "f64"),
            Type::Index => write!(f, "index"),
            Type::MemRef { shape, element, space } => {
                write!(f, "memref<")?;
                for dim in shape {
                    write!(f, "{dim}x")?;
                }
                write!(f, "{element}")?;
                if let Some(space) = space {
                    write!(f, ", {space}")?;
                }
                write!(f, ">")
            }
            Type::UnrankedMemRef { element, space } => {
                write!(f, "memref<*x{element}")?;
                if let Some(space) = space {
                    write!(f, ", {space}")?;
                }
                write!(f, ">")
            }
            Type::Function { inputs, results } => {
                write!(f, "(")?;
                for (i, ty) in inputs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                write!(f, ") -> (")?;
                for (i, ty) in results.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                write!(f, ")")
            }
        }
    }
}
