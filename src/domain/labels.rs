//! Label Schema Extraction
//!
//! Derives the ordered set of label descriptors of a label record and
//! renders a record value into label strings at call time.
//!
//! Label records are declared with [`label_set!`](crate::label_set), which
//! implements [`LabelSet`] and [`LabelArg`] for the record. Nested records
//! are flattened into the parent's schema, which is how shared label groups
//! are composed across metrics. Descriptor order is declaration order
//! (depth-first), so the label name list handed to a builder is stable for
//! a given record type.

use std::any::type_name;
use std::borrow::Cow;
use std::collections::HashMap;

use crate::domain::meta::{self, Meta};
use crate::error::LabelError;

/// Value kind of one label dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    String,
    Bool,
    /// Signed integer of any width, rendered in base 10.
    Int,
}

/// A label field value read from a record, before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelValue<'a> {
    Str(&'a str),
    Bool(bool),
    Int(i128),
}

impl<'a> LabelValue<'a> {
    /// Whether this is the zero value of its kind (`""`, `false`, `0`).
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Str(s) => s.is_empty(),
            Self::Bool(b) => !b,
            Self::Int(i) => *i == 0,
        }
    }

    pub fn kind(&self) -> LabelKind {
        match self {
            Self::Str(_) => LabelKind::String,
            Self::Bool(_) => LabelKind::Bool,
            Self::Int(_) => LabelKind::Int,
        }
    }

    /// Render as the wire label value.
    pub fn render(self) -> Cow<'a, str> {
        match self {
            Self::Str(s) => Cow::Borrowed(s),
            Self::Bool(true) => Cow::Borrowed("true"),
            Self::Bool(false) => Cow::Borrowed("false"),
            Self::Int(i) => Cow::Owned(i.to_string()),
        }
    }
}

/// Schema entry for one label dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDescriptor {
    /// Wire label name, from the field's `label` metadata.
    pub name: String,
    pub kind: LabelKind,
    /// Substituted verbatim when the field holds its kind's zero value.
    pub default: Option<String>,
}

/// Scalar types accepted as label field values.
pub trait LabelScalar {
    const KIND: LabelKind;

    fn label_value(&self) -> LabelValue<'_>;
}

impl LabelScalar for String {
    const KIND: LabelKind = LabelKind::String;

    fn label_value(&self) -> LabelValue<'_> {
        LabelValue::Str(self)
    }
}

impl LabelScalar for &'static str {
    const KIND: LabelKind = LabelKind::String;

    fn label_value(&self) -> LabelValue<'_> {
        LabelValue::Str(self)
    }
}

impl LabelScalar for bool {
    const KIND: LabelKind = LabelKind::Bool;

    fn label_value(&self) -> LabelValue<'_> {
        LabelValue::Bool(*self)
    }
}

macro_rules! int_scalar {
    ($($ty:ty),*) => {
        $(
            impl LabelScalar for $ty {
                const KIND: LabelKind = LabelKind::Int;

                fn label_value(&self) -> LabelValue<'_> {
                    LabelValue::Int(i128::from(*self))
                }
            }
        )*
    };
}

int_scalar!(i8, i16, i32, i64, i128);

impl LabelScalar for isize {
    const KIND: LabelKind = LabelKind::Int;

    fn label_value(&self) -> LabelValue<'_> {
        LabelValue::Int(*self as i128)
    }
}

/// A label record: a struct whose fields are label scalars or nested records.
///
/// `describe` and `emit` must visit fields in the same order; the
/// [`label_set!`](crate::label_set) macro guarantees this.
pub trait LabelSet: Send + Sync + 'static {
    /// Append this record's descriptors to `schema`.
    fn describe(schema: &mut SchemaBuilder) -> Result<(), LabelError>;

    /// Append this record's field values, in descriptor order.
    fn emit<'a>(&'a self, out: &mut Vec<LabelValue<'a>>);
}

/// The parameter list of a metric slot.
///
/// `()` takes no parameters, a label record takes one. Any other single
/// type is a parameter that is not a record, and tuples (up to twelve
/// elements) are multiple parameters; both are rejected when binding.
pub trait LabelArg: Send + Sync + 'static {
    const PARAMS: usize = 1;
    const IS_RECORD: bool = false;

    fn describe(_schema: &mut SchemaBuilder) -> Result<(), LabelError> {
        Ok(())
    }

    fn emit<'a>(&'a self, _out: &mut Vec<LabelValue<'a>>) {}
}

impl LabelArg for () {
    const PARAMS: usize = 0;
}

macro_rules! non_record_arg {
    ($($ty:ty),*) => {
        $( impl LabelArg for $ty {} )*
    };
}

non_record_arg!(
    String, &'static str, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
    usize, f32, f64
);

macro_rules! tuple_arg {
    ($($count:literal => ($($name:ident),+)),* $(,)?) => {
        $(
            impl<$($name),+> LabelArg for ($($name,)+)
            where
                $($name: Send + Sync + 'static,)+
            {
                const PARAMS: usize = $count;
            }
        )*
    };
}

tuple_arg!(
    2 => (A, B),
    3 => (A, B, C),
    4 => (A, B, C, D),
    5 => (A, B, C, D, E),
    6 => (A, B, C, D, E, F),
    7 => (A, B, C, D, E, F, G),
    8 => (A, B, C, D, E, F, G, H),
    9 => (A, B, C, D, E, F, G, H, I),
    10 => (A, B, C, D, E, F, G, H, I, J),
    11 => (A, B, C, D, E, F, G, H, I, J, K),
    12 => (A, B, C, D, E, F, G, H, I, J, K, L),
);

/// Accumulates descriptors while a label record describes itself.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    descriptors: Vec<LabelDescriptor>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a scalar label field of `kind`.
    ///
    /// Requires a `label` entry in `meta`; an optional `default` entry is
    /// recorded as the zero-value substitute.
    pub fn scalar(&mut self, field: &str, meta: &Meta<'_>, kind: LabelKind) -> Result<(), LabelError> {
        let label = Self::label_of(field, meta)?;

        if self.descriptors.iter().any(|d| d.name == label) {
            return Err(LabelError::DuplicateLabel {
                label: label.to_string(),
            });
        }

        self.descriptors.push(LabelDescriptor {
            name: label.to_string(),
            kind,
            default: meta.get(meta::DEFAULT).map(str::to_string),
        });
        Ok(())
    }

    /// Declare a field whose type can't be a label value.
    ///
    /// Always fails: with `MissingLabelTag` when the `label` entry is also
    /// absent, otherwise with `UnsupportedLabelKind`.
    pub fn unsupported(
        &mut self,
        field: &str,
        meta: &Meta<'_>,
        type_name: &'static str,
    ) -> Result<(), LabelError> {
        let label = Self::label_of(field, meta)?;
        Err(LabelError::UnsupportedLabelKind {
            field: field.to_string(),
            label: label.to_string(),
            type_name,
        })
    }

    /// Flatten a nested record's descriptors into this schema.
    pub fn nested<T: LabelSet>(&mut self) -> Result<(), LabelError> {
        T::describe(self)
    }

    pub fn finish(self) -> LabelSchema {
        LabelSchema {
            descriptors: self.descriptors,
        }
    }

    fn label_of<'m>(field: &str, meta: &Meta<'m>) -> Result<&'m str, LabelError> {
        meta.get(meta::LABEL).ok_or_else(|| LabelError::MissingLabelTag {
            field: field.to_string(),
        })
    }
}

/// The ordered label descriptors of one slot's parameter type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSchema {
    descriptors: Vec<LabelDescriptor>,
}

impl LabelSchema {
    /// Extract the schema of a slot parameter list `L`.
    ///
    /// Zero parameters yield an empty schema. A single parameter must be a
    /// label record. Callers validate the parameter count first.
    pub fn extract<L: LabelArg>() -> Result<Self, LabelError> {
        if L::PARAMS == 0 {
            return Ok(Self::default());
        }
        if !L::IS_RECORD {
            return Err(LabelError::NotAStruct {
                type_name: type_name::<L>(),
            });
        }

        let mut builder = SchemaBuilder::new();
        L::describe(&mut builder)?;
        Ok(builder.finish())
    }

    pub fn descriptors(&self) -> &[LabelDescriptor] {
        &self.descriptors
    }

    /// Label names in descriptor order.
    pub fn names(&self) -> Vec<String> {
        self.descriptors.iter().map(|d| d.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Render `labels` into one string per descriptor, substituting
    /// defaults for zero values.
    pub fn render<'a, L: LabelArg>(&'a self, labels: &'a L) -> Vec<Cow<'a, str>> {
        let mut raw = Vec::with_capacity(self.descriptors.len());
        labels.emit(&mut raw);

        self.descriptors
            .iter()
            .zip(raw)
            .map(|(descriptor, value)| match &descriptor.default {
                Some(default) if value.is_zero() => Cow::Borrowed(default.as_str()),
                _ => value.render(),
            })
            .collect()
    }
}

/// Rendered label values handed to a builder's value factory.
///
/// Values are positional: `values()[i]` belongs to `names()[i]`, in the
/// same order as the label names the builder received.
#[derive(Debug, Clone)]
pub struct LabelValues<'a> {
    names: &'a [String],
    values: Vec<Cow<'a, str>>,
}

impl<'a> LabelValues<'a> {
    pub fn new(names: &'a [String], values: Vec<Cow<'a, str>>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    pub fn names(&self) -> &[String] {
        self.names
    }

    /// Values as `&str`, ready for `with_label_values`.
    pub fn values(&self) -> Vec<&str> {
        self.values.iter().map(AsRef::as_ref).collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.values.get(i))
            .map(AsRef::as_ref)
    }

    /// Label name → value mapping, for backends keyed by name.
    pub fn to_map(&self) -> HashMap<&str, &str> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(AsRef::as_ref))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
