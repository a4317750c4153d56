//! Group Walker - Recursive Traversal of Metric Groups
//!
//! Visits every field of a metric group in declaration order, descending
//! into nested groups and handing metric slots to the accessor
//! synthesizer. Tracks the namespace path (joined with `_` for builders)
//! and the field path (joined with `.` for error context).

use tracing::trace;

use crate::domain::meta::{self, Meta};
use crate::error::{BindError, BindErrorKind};
use crate::ports::registrar::Registrar;
use crate::usecases::registry::BuilderRegistry;

/// One declared field: its Rust name and its metadata.
#[derive(Debug, Clone, Copy)]
pub struct FieldDecl<'a> {
    pub name: &'a str,
    pub meta: Meta<'a>,
}

impl<'a> FieldDecl<'a> {
    pub const fn new(name: &'a str, meta: Meta<'a>) -> Self {
        Self { name, meta }
    }
}

/// A value that can appear as a field of a metric group: a metric slot
/// or a nested group.
pub trait GroupField {
    /// Bind this field. Called by [`Walker::field`] with the field's path
    /// already pushed.
    fn bind_field(&mut self, decl: &FieldDecl<'_>, walker: &mut Walker<'_>) -> Result<(), BindError>;

    /// Return this field to its unbound state.
    fn unbind_field(&mut self);

    fn is_field_bound(&self) -> bool;
}

/// A declared aggregate of metric slots and nested groups.
///
/// Implemented by [`metric_group!`](crate::metric_group).
pub trait MetricGroup {
    /// Bind every field in declaration order, stopping at the first error.
    fn bind_fields(&mut self, walker: &mut Walker<'_>) -> Result<(), BindError>;

    /// Reset every metric slot, recursively, to unbound.
    fn unbind_fields(&mut self);

    /// Whether any metric slot, recursively, is bound.
    fn any_bound(&self) -> bool;
}

/// Traversal state for one bind operation.
pub struct Walker<'a> {
    builders: &'a BuilderRegistry,
    registrar: &'a dyn Registrar,
    namespace: Vec<String>,
    path: Vec<String>,
    registered: usize,
}

impl<'a> Walker<'a> {
    pub(crate) fn new(builders: &'a BuilderRegistry, registrar: &'a dyn Registrar, root: &str) -> Self {
        let namespace = if root.is_empty() {
            Vec::new()
        } else {
            vec![root.to_string()]
        };
        Self {
            builders,
            registrar,
            namespace,
            path: Vec::new(),
            registered: 0,
        }
    }

    /// Bind one field of the current group.
    pub fn field<F: GroupField + ?Sized>(
        &mut self,
        decl: &FieldDecl<'_>,
        field: &mut F,
    ) -> Result<(), BindError> {
        self.path.push(decl.name.to_string());
        let result = field.bind_field(decl, self);
        self.path.pop();
        result
    }

    /// Reject a field whose type is neither a metric slot nor a group.
    pub fn unsupported_field(
        &mut self,
        decl: &FieldDecl<'_>,
        type_name: &'static str,
    ) -> Result<(), BindError> {
        self.reject_field(decl, |_, walker| {
            walker.error(BindErrorKind::UnsupportedFieldKind { type_name })
        })
    }

    /// Reject a field that can never bind, with the error `check` derives
    /// for it at the field's path.
    pub fn reject_field<F>(&mut self, decl: &FieldDecl<'_>, check: F) -> Result<(), BindError>
    where
        F: FnOnce(&FieldDecl<'_>, &Self) -> BindError,
    {
        self.path.push(decl.name.to_string());
        let err = check(decl, self);
        self.path.pop();
        Err(err)
    }

    /// Descend into a nested group under its `namespace` segment.
    ///
    /// # Errors
    /// `MissingNamespaceTag` if the entry is absent or empty, otherwise
    /// the first error of the nested group.
    pub fn group<G: MetricGroup + ?Sized>(
        &mut self,
        decl: &FieldDecl<'_>,
        group: &mut G,
    ) -> Result<(), BindError> {
        let segment = match decl.meta.get(meta::NAMESPACE) {
            Some(segment) if !segment.is_empty() => segment,
            _ => return Err(self.error(BindErrorKind::MissingNamespaceTag)),
        };

        trace!(field = decl.name, namespace = segment, "Descending into nested group");

        self.namespace.push(segment.to_string());
        let result = group.bind_fields(self);
        self.namespace.pop();
        result
    }

    /// Current namespace, path segments joined with `_`.
    pub fn namespace(&self) -> String {
        self.namespace.join("_")
    }

    /// Current field path, joined with `.`.
    pub fn path(&self) -> String {
        self.path.join(".")
    }

    /// Build an error located at the current field path.
    pub fn error(&self, kind: BindErrorKind) -> BindError {
        BindError::new(self.path(), kind)
    }

    pub fn builders(&self) -> &'a BuilderRegistry {
        self.builders
    }

    /// Hand a built collector to the registrar.
    pub(crate) fn register(&mut self, collector: Box<dyn prometheus::core::Collector>) -> prometheus::Result<()> {
        self.registrar.register(collector)?;
        self.registered += 1;
        Ok(())
    }

    /// Collectors registered so far in this bind.
    pub fn registered(&self) -> usize {
        self.registered
    }
}
