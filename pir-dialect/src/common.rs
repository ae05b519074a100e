//! Plain tensor descriptors used as attribute keys: element types, layouts,
//! placements, integer arrays and scalars.
use std::{fmt, hash::Hash};

use strum::{Display, EnumDiscriminants, EnumIs, EnumIter, EnumString, FromRepr};

/// Element type of a tensor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, FromRepr,
)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum DataType {
    Undefined,
    Bool,
    UInt8,
    Int8,
    UInt16,
    Int16,
    Int32,
    Int64,
    Float16,
    BFloat16,
    Float32,
    Float64,
    Complex64,
    Complex128,
    PString,
}

impl DataType {
    /// Size of one element in bytes, `None` for variable sized or undefined types.
    pub fn size_of(self) -> Option<usize> {
        match self {
            DataType::Undefined | DataType::PString => None,
            DataType::Bool | DataType::UInt8 | DataType::Int8 => Some(1),
            DataType::UInt16 | DataType::Int16 | DataType::Float16 | DataType::BFloat16 => Some(2),
            DataType::Int32 | DataType::Float32 => Some(4),
            DataType::Int64 | DataType::Float64 | DataType::Complex64 => Some(8),
            DataType::Complex128 => Some(16),
        }
    }
}

/// Memory layout of a tensor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, FromRepr,
)]
#[repr(u8)]
pub enum DataLayout {
    #[strum(serialize = "Undefined")]
    Undefined,
    #[strum(serialize = "AnyLayout")]
    Any,
    #[strum(serialize = "NHWC")]
    Nhwc,
    #[strum(serialize = "NCHW")]
    Nchw,
    #[strum(serialize = "NCDHW")]
    Ncdhw,
    #[strum(serialize = "NDHWC")]
    Ndhwc,
    #[strum(serialize = "ONEDNN")]
    OneDnn,
    #[strum(serialize = "SPARSE_COO")]
    SparseCoo,
    #[strum(serialize = "SPARSE_CSR")]
    SparseCsr,
    #[strum(serialize = "STRINGS")]
    Strings,
}

/// Kind of device memory a tensor lives in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, FromRepr,
)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum AllocationType {
    Undefined,
    Cpu,
    Gpu,
    GpuPinned,
    Xpu,
    Npu,
    NpuPinned,
    Ipu,
    Mlu,
    Custom,
}

/// Device placement: allocation kind plus device index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Place {
    pub allocation: AllocationType,
    pub device: i8,
}

impl Place {
    pub const fn new(allocation: AllocationType, device: i8) -> Self {
        Self { allocation, device }
    }

    pub const fn cpu() -> Self {
        Self::new(AllocationType::Cpu, 0)
    }

    pub const fn gpu(device: i8) -> Self {
        Self::new(AllocationType::Gpu, device)
    }
}

impl Default for Place {
    fn default() -> Self {
        Self::new(AllocationType::Undefined, 0)
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.allocation {
            AllocationType::Cpu | AllocationType::Undefined => write!(f, "Place({})", self.allocation),
            _ => write!(f, "Place({}:{})", self.allocation, self.device),
        }
    }
}

/// A list of integers (a shape, a list of axes, ...), possibly computed from a
/// tensor at run time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IntArray {
    pub data: Vec<i64>,
    pub from_tensor: bool,
}

impl IntArray {
    pub fn new(data: impl Into<Vec<i64>>) -> Self {
        Self {
            data: data.into(),
            from_tensor: false,
        }
    }

    pub fn from_tensor(data: impl Into<Vec<i64>>) -> Self {
        Self {
            data: data.into(),
            from_tensor: true,
        }
    }
}

impl<const N: usize> From<[i64; N]> for IntArray {
    fn from(data: [i64; N]) -> Self {
        Self::new(data)
    }
}

impl From<Vec<i64>> for IntArray {
    fn from(data: Vec<i64>) -> Self {
        Self::new(data)
    }
}

impl From<&[i64]> for IntArray {
    fn from(data: &[i64]) -> Self {
        Self::new(data)
    }
}

impl fmt::Display for IntArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.data.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}

/// Payload of a [`Scalar`].
#[derive(Debug, Clone, Copy, EnumIs, EnumDiscriminants)]
#[strum_discriminants(derive(Hash))]
#[strum_discriminants(name(ScalarKind))]
pub enum ScalarValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
}

impl ScalarValue {
    /// Element type this value converts to.
    pub fn dtype(&self) -> DataType {
        match self {
            ScalarValue::Bool(_) => DataType::Bool,
            ScalarValue::Int32(_) => DataType::Int32,
            ScalarValue::Int64(_) => DataType::Int64,
            ScalarValue::Float32(_) => DataType::Float32,
            ScalarValue::Float64(_) => DataType::Float64,
        }
    }

    /// Kind plus raw bits; floats compare bitwise so that keys stay `Eq`.
    fn canonical(&self) -> (ScalarKind, u64) {
        let bits = match *self {
            ScalarValue::Bool(v) => v as u64,
            ScalarValue::Int32(v) => v as u32 as u64,
            ScalarValue::Int64(v) => v as u64,
            ScalarValue::Float32(v) => v.to_bits() as u64,
            ScalarValue::Float64(v) => v.to_bits(),
        };
        (self.into(), bits)
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(v) => write!(f, "{v}"),
            ScalarValue::Int32(v) => write!(f, "{v}"),
            ScalarValue::Int64(v) => write!(f, "{v}"),
            ScalarValue::Float32(v) => write!(f, "{v:?}"),
            ScalarValue::Float64(v) => write!(f, "{v:?}"),
        }
    }
}

/// A single number, possibly computed from a tensor at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scalar {
    pub value: ScalarValue,
    pub from_tensor: bool,
}

impl Scalar {
    pub fn new(value: ScalarValue) -> Self {
        Self {
            value,
            from_tensor: false,
        }
    }

    pub fn dtype(&self) -> DataType {
        self.value.dtype()
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::new(ScalarValue::$variant(value))
                }
            }
        )*
    };
}

scalar_from!(bool => Bool, i32 => Int32, i64 => Int64, f32 => Float32, f64 => Float64);

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar({}:{})", self.dtype(), self.value)
    }
}
