//! Field kind dispatch used by the declaration macros.
//!
//! The macros know each field's concrete type, so method resolution on a
//! stack of references to `Probe::<T>` picks the most specific impl whose
//! bounds hold (autoref probing). Types that fit no supported kind fall
//! through to a variant that reports the error at bind time.

use std::any::type_name;
use std::marker::PhantomData;

use crate::domain::labels::{LabelArg, LabelScalar, LabelSet, LabelValue, SchemaBuilder};
use crate::domain::meta::Meta;
use crate::error::{BindError, LabelError};
use crate::ports::builder::MetricOutput;
use crate::usecases::accessor::{non_record_labels_error, unknown_output_error, Metric};
use crate::usecases::walker::{FieldDecl, GroupField, Walker};

pub struct Probe<T>(PhantomData<T>);

impl<T> Probe<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

// ── Metric group fields ─────────────────────────────────────
//
// Probed through `&&&&&Probe<T>`, most specific first: group fields,
// then `Metric` slots whose output has no `MetricOutput` impl, whose
// labels are no `LabelArg`, or both, then anything else.

pub struct Supported<T>(PhantomData<T>);

impl<T: GroupField> Supported<T> {
    pub fn bind(self, field: &mut T, decl: &FieldDecl<'_>, walker: &mut Walker<'_>) -> Result<(), BindError> {
        walker.field(decl, field)
    }

    pub fn unbind(self, field: &mut T) {
        field.unbind_field();
    }

    pub fn is_bound(self, field: &T) -> bool {
        field.is_field_bound()
    }
}

/// A slot whose output type can have no builder.
pub struct UnknownOutput<L, M>(PhantomData<(L, M)>);

impl<L: LabelArg, M> UnknownOutput<L, M> {
    pub fn bind(
        self,
        _field: &mut Metric<L, M>,
        decl: &FieldDecl<'_>,
        walker: &mut Walker<'_>,
    ) -> Result<(), BindError> {
        walker.reject_field(decl, unknown_output_error::<L, M>)
    }

    pub fn unbind(self, _field: &mut Metric<L, M>) {}

    pub fn is_bound(self, _field: &Metric<L, M>) -> bool {
        false
    }
}

/// A slot whose parameter is not a label record.
pub struct NonRecordLabels<L, M>(PhantomData<(L, M)>);

impl<L, M: MetricOutput> NonRecordLabels<L, M> {
    pub fn bind(
        self,
        _field: &mut Metric<L, M>,
        decl: &FieldDecl<'_>,
        walker: &mut Walker<'_>,
    ) -> Result<(), BindError> {
        walker.reject_field(decl, |decl, walker| {
            non_record_labels_error::<L>(decl, walker, M::RETURN_VALUES)
        })
    }

    pub fn unbind(self, _field: &mut Metric<L, M>) {}

    pub fn is_bound(self, _field: &Metric<L, M>) -> bool {
        false
    }
}

/// A slot with neither a record parameter nor a known output.
pub struct MisdeclaredSlot<L, M>(PhantomData<(L, M)>);

impl<L, M> MisdeclaredSlot<L, M> {
    pub fn bind(
        self,
        _field: &mut Metric<L, M>,
        decl: &FieldDecl<'_>,
        walker: &mut Walker<'_>,
    ) -> Result<(), BindError> {
        walker.reject_field(decl, |decl, walker| non_record_labels_error::<L>(decl, walker, 1))
    }

    pub fn unbind(self, _field: &mut Metric<L, M>) {}

    pub fn is_bound(self, _field: &Metric<L, M>) -> bool {
        false
    }
}

pub struct Unsupported<T>(PhantomData<T>);

impl<T> Unsupported<T> {
    pub fn bind(self, _field: &mut T, decl: &FieldDecl<'_>, walker: &mut Walker<'_>) -> Result<(), BindError> {
        walker.unsupported_field(decl, type_name::<T>())
    }

    pub fn unbind(self, _field: &mut T) {}

    pub fn is_bound(self, _field: &T) -> bool {
        false
    }
}

pub trait SupportedField<T> {
    fn field_kind(&self) -> Supported<T> {
        Supported(PhantomData)
    }
}

impl<T: GroupField> SupportedField<T> for &&&&Probe<T> {}

pub trait UnknownOutputField<L, M> {
    fn field_kind(&self) -> UnknownOutput<L, M> {
        UnknownOutput(PhantomData)
    }
}

impl<L: LabelArg, M> UnknownOutputField<L, M> for &&&Probe<Metric<L, M>> {}

pub trait NonRecordLabelsField<L, M> {
    fn field_kind(&self) -> NonRecordLabels<L, M> {
        NonRecordLabels(PhantomData)
    }
}

impl<L, M: MetricOutput> NonRecordLabelsField<L, M> for &&Probe<Metric<L, M>> {}

pub trait MisdeclaredSlotField<L, M> {
    fn field_kind(&self) -> MisdeclaredSlot<L, M> {
        MisdeclaredSlot(PhantomData)
    }
}

impl<L, M> MisdeclaredSlotField<L, M> for &Probe<Metric<L, M>> {}

pub trait UnsupportedField<T> {
    fn field_kind(&self) -> Unsupported<T> {
        Unsupported(PhantomData)
    }
}

impl<T> UnsupportedField<T> for Probe<T> {}

// ── Label record fields ─────────────────────────────────────

pub struct RecordLabelField<T>(PhantomData<T>);

impl<T: LabelSet> RecordLabelField<T> {
    pub fn describe(self, schema: &mut SchemaBuilder, _field: &str, _meta: &Meta<'_>) -> Result<(), LabelError> {
        schema.nested::<T>()
    }

    pub fn emit<'a>(self, value: &'a T, out: &mut Vec<LabelValue<'a>>) {
        LabelSet::emit(value, out);
    }
}

pub struct ScalarLabelField<T>(PhantomData<T>);

impl<T: LabelScalar> ScalarLabelField<T> {
    pub fn describe(self, schema: &mut SchemaBuilder, field: &str, meta: &Meta<'_>) -> Result<(), LabelError> {
        schema.scalar(field, meta, T::KIND)
    }

    pub fn emit<'a>(self, value: &'a T, out: &mut Vec<LabelValue<'a>>) {
        out.push(value.label_value());
    }
}

pub struct OtherLabelField<T>(PhantomData<T>);

impl<T> OtherLabelField<T> {
    pub fn describe(self, schema: &mut SchemaBuilder, field: &str, meta: &Meta<'_>) -> Result<(), LabelError> {
        schema.unsupported(field, meta, type_name::<T>())
    }

    // Unreachable in practice: a record with such a field never binds.
    pub fn emit<'a>(self, _value: &'a T, _out: &mut Vec<LabelValue<'a>>) {}
}

pub trait RecordLabel<T> {
    fn label_kind(&self) -> RecordLabelField<T> {
        RecordLabelField(PhantomData)
    }
}

impl<T: LabelSet> RecordLabel<T> for &&Probe<T> {}

pub trait ScalarLabel<T> {
    fn label_kind(&self) -> ScalarLabelField<T> {
        ScalarLabelField(PhantomData)
    }
}

impl<T: LabelScalar> ScalarLabel<T> for &Probe<T> {}

pub trait OtherLabel<T> {
    fn label_kind(&self) -> OtherLabelField<T> {
        OtherLabelField(PhantomData)
    }
}

impl<T> OtherLabel<T> for Probe<T> {}
