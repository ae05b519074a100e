//! The IR context
//!
//! An [`IrContext`] owns everything that operations merely point to: the
//! interned attribute and type storages and the registry of op kinds. Every
//! handle handed out by the context borrows it for `'ctx`, so the borrow checker
//! rejects any attribute, type or operation outliving its context.
use std::{collections::HashMap, ptr::NonNull};

use log::debug;
use parking_lot::RwLock;

use crate::{
    attribute::AttributeStorage,
    dialect::{Dialect, builtin::BuiltinDialect},
    op_info::{Op, OpInfo, OpInfoImpl},
    storage::StorageUniquer,
    types::TypeStorage,
    utils::{
        conf::IrConfig,
        error::{IrError, IrResult},
    },
};

/// Leaked op description, freed when the context drops.
struct OpInfoEntry(NonNull<OpInfoImpl>);

// SAFETY: `OpInfoImpl` only holds `Send + Sync` data and is never mutated
// after registration.
unsafe impl Send for OpInfoEntry {}
unsafe impl Sync for OpInfoEntry {}

pub struct IrContext {
    config: IrConfig,
    attributes: StorageUniquer,
    types: StorageUniquer,
    registry: RwLock<HashMap<&'static str, OpInfoEntry>>,
    dialects: RwLock<Vec<&'static str>>,
}

impl IrContext {
    /// Create a context with the default configuration.
    pub fn new() -> Self {
        Self::with_config(IrConfig::default())
    }

    /// Create a context; the builtin dialect is always registered.
    pub fn with_config(config: IrConfig) -> Self {
        let ctx = Self {
            attributes: StorageUniquer::new(config.uniquer.clone()),
            types: StorageUniquer::new(config.uniquer.clone()),
            registry: RwLock::new(HashMap::new()),
            dialects: RwLock::new(Vec::new()),
            config,
        };
        if let Err(err) = ctx.register_dialect::<BuiltinDialect>() {
            unreachable!("builtin dialect failed to register in a fresh context: {err}");
        }
        ctx
    }

    pub fn config(&self) -> &IrConfig {
        &self.config
    }

    /// The unique attribute storage of kind `S` for `key`.
    pub fn intern_attribute<S: AttributeStorage>(&self, key: S::ParamKey) -> &S {
        self.attributes.get::<S>(key)
    }

    /// The unique type storage of kind `S` for `key`.
    pub fn intern_type<S: TypeStorage>(&self, key: S::ParamKey) -> &S {
        self.types.get::<S>(key)
    }

    pub fn num_interned_attributes(&self) -> usize {
        self.attributes.len()
    }

    pub fn num_interned_types(&self) -> usize {
        self.types.len()
    }

    /// Register the op kind `O`.
    ///
    /// Fails with [`IrError::DuplicateOperation`] if a kind with the same name
    /// is already known.
    pub fn register_op<'ctx, O: Op<'ctx>>(&'ctx self) -> IrResult<OpInfo<'ctx>> {
        let mut registry = self.registry.write();
        if registry.contains_key(O::NAME) {
            return Err(IrError::DuplicateOperation(O::NAME.to_string()));
        }

        let imp = NonNull::from(Box::leak(Box::new(OpInfoImpl::new::<O>())));
        registry.insert(O::NAME, OpInfoEntry(imp));
        debug!("Registered operation `{}`", O::NAME);

        // SAFETY: entries live as long as the context.
        Ok(OpInfo::from_impl(unsafe { imp.as_ref() }, self))
    }

    /// Register the dialect `D` and its operations. Registering a dialect
    /// twice is a no-op.
    pub fn register_dialect<D: Dialect>(&self) -> IrResult<()> {
        {
            let mut dialects = self.dialects.write();
            if dialects.contains(&D::NAME) {
                return Ok(());
            }
            dialects.push(D::NAME);
        }

        match D::initialize(self) {
            Ok(()) => {
                debug!("Registered dialect `{}`", D::NAME);
                Ok(())
            }
            Err(err) => {
                self.dialects.write().retain(|name| *name != D::NAME);
                Err(err)
            }
        }
    }

    pub fn is_dialect_registered(&self, name: &str) -> bool {
        self.dialects.read().contains(&name)
    }

    /// Look an op kind up by its fully qualified name.
    pub fn op_info(&self, name: &str) -> Option<OpInfo<'_>> {
        let registry = self.registry.read();
        registry
            .get(name)
            // SAFETY: entries live as long as the context.
            .map(|entry| OpInfo::from_impl(unsafe { entry.0.as_ref() }, self))
    }

    /// Number of registered op kinds.
    pub fn num_registered_ops(&self) -> usize {
        self.registry.read().len()
    }
}

impl Default for IrContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IrContext {
    fn drop(&mut self) {
        for (_, entry) in self.registry.get_mut().drain() {
            // SAFETY: produced by `Box::leak` in `register_op`, freed once here.
            drop(unsafe { Box::from_raw(entry.0.as_ptr()) });
        }
    }
}
