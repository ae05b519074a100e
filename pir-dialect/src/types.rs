//! Dense tensor type of the `pd` dialect.
use std::fmt;

use pir::{
    context::IrContext,
    storage::{AbstractStorage, ParametricStorage},
    types::{Type, TypeStorage, TypeView},
    utils::hash::{hash_combine, hash_iter, hash_of},
};

use crate::common::{DataLayout, DataType};

/// Extent used for dimensions unknown until run time.
pub const DYNAMIC_DIM: i64 = -1;

/// Everything identifying a dense tensor type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DenseTensorDesc {
    pub dtype: DataType,
    pub dims: Vec<i64>,
    pub layout: DataLayout,
    /// Level-of-detail offsets of variable length sequences.
    pub lod: Vec<Vec<usize>>,
    pub offset: usize,
}

impl DenseTensorDesc {
    /// A tensor with the default layout and no level of detail.
    pub fn new(dtype: DataType, dims: impl Into<Vec<i64>>) -> Self {
        Self {
            dtype,
            dims: dims.into(),
            layout: DataLayout::Nchw,
            lod: Vec::new(),
            offset: 0,
        }
    }

    pub fn with_layout(mut self, layout: DataLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_lod(mut self, lod: Vec<Vec<usize>>) -> Self {
        self.lod = lod;
        self
    }

    /// Number of elements, `None` if a dimension is dynamic.
    pub fn numel(&self) -> Option<i64> {
        self.dims
            .iter()
            .try_fold(1i64, |acc, &dim| (dim >= 0).then(|| acc * dim))
    }
}

#[derive(Debug)]
pub struct DenseTensorTypeStorage {
    desc: DenseTensorDesc,
}

impl AbstractStorage for DenseTensorTypeStorage {
    fn kind_name(&self) -> &'static str {
        "pd.dense_tensor"
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("pd.tensor<")?;
        for dim in &self.desc.dims {
            if *dim == DYNAMIC_DIM {
                f.write_str("?x")?;
            } else {
                write!(f, "{dim}x")?;
            }
        }
        write!(f, "{}>", self.desc.dtype)
    }
}

impl ParametricStorage for DenseTensorTypeStorage {
    type ParamKey = DenseTensorDesc;

    fn construct(key: DenseTensorDesc) -> Self {
        Self { desc: key }
    }

    fn hash_value(key: &DenseTensorDesc) -> u64 {
        let mut seed = hash_combine(hash_of(&key.dtype), hash_iter(0, &key.dims));
        seed = hash_combine(seed, hash_of(&key.layout));
        seed = hash_combine(seed, hash_iter(0, &key.lod));
        hash_combine(seed, hash_of(&key.offset))
    }

    fn matches(&self, key: &DenseTensorDesc) -> bool {
        self.desc == *key
    }

    fn as_key(&self) -> DenseTensorDesc {
        self.desc.clone()
    }
}

impl TypeStorage for DenseTensorTypeStorage {}

/// A dense tensor: element type, shape, layout and level of detail.
#[derive(Debug, Clone, Copy)]
pub struct DenseTensorType<'ctx>(&'ctx DenseTensorTypeStorage);

impl<'ctx> DenseTensorType<'ctx> {
    pub fn get(ctx: &'ctx IrContext, desc: DenseTensorDesc) -> Self {
        Self(ctx.intern_type::<DenseTensorTypeStorage>(desc))
    }

    pub fn desc(&self) -> &'ctx DenseTensorDesc {
        &self.0.desc
    }

    pub fn dtype(&self) -> DataType {
        self.0.desc.dtype
    }

    pub fn dims(&self) -> &'ctx [i64] {
        &self.0.desc.dims
    }

    pub fn layout(&self) -> DataLayout {
        self.0.desc.layout
    }
}

impl<'ctx> TypeView<'ctx> for DenseTensorType<'ctx> {
    type Storage = DenseTensorTypeStorage;

    fn from_storage(storage: &'ctx DenseTensorTypeStorage) -> Self {
        Self(storage)
    }

    fn storage(&self) -> &'ctx DenseTensorTypeStorage {
        self.0
    }
}

impl<'ctx> From<DenseTensorType<'ctx>> for Type<'ctx> {
    fn from(view: DenseTensorType<'ctx>) -> Self {
        Type::from_storage(view.0)
    }
}

impl PartialEq for DenseTensorType<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl Eq for DenseTensorType<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_types_unique_by_description() {
        let ctx = IrContext::new();
        let a = DenseTensorType::get(&ctx, DenseTensorDesc::new(DataType::Float32, [2i64, 3]));
        let b = DenseTensorType::get(&ctx, DenseTensorDesc::new(DataType::Float32, vec![2i64, 3]));
        let c = DenseTensorType::get(
            &ctx,
            DenseTensorDesc::new(DataType::Float32, [2i64, 3]).with_layout(DataLayout::Nhwc),
        );
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(ctx.num_interned_types(), 2);
        assert_eq!(Type::from(a).to_string(), "pd.tensor<2x3xfloat32>");
    }

    #[test]
    fn dynamic_dims_print_as_question_marks() {
        let ctx = IrContext::new();
        let desc = DenseTensorDesc::new(DataType::Int64, [DYNAMIC_DIM, 4]);
        assert_eq!(desc.numel(), None);
        assert_eq!(DenseTensorDesc::new(DataType::Int64, [3i64, 4]).numel(), Some(12));
        let ty: Type = DenseTensorType::get(&ctx, desc).into();
        assert_eq!(ty.to_string(), "pd.tensor<?x4xint64>");
        assert!(ty.isa::<DenseTensorType>());
    }
}
