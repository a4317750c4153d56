//! Declaration macros for metric groups and label records.
//!
//! Fields take optional doc comments followed by an optional
//! `#[meta(key = "value", ...)]` attribute, in that order.

/// Declares a metric group: a struct of [`Metric`](crate::Metric) slots and
/// nested groups, bound with [`Initializer::bind`](crate::Initializer::bind).
///
/// The struct derives `Default` (all slots unbound). Metric slots need
/// `name` and `help` metadata plus any builder-specific keys; nested groups
/// need a `namespace` segment.
///
/// ```
/// use promgroup::{label_set, metric_group, Initializer, Metric};
///
/// label_set! {
///     #[derive(Debug, Default)]
///     pub struct Route {
///         #[meta(label = "route", default = "unknown")]
///         pub route: String,
///     }
/// }
///
/// metric_group! {
///     pub struct Server {
///         #[meta(name = "hits_total", help = "Requests served")]
///         pub hits: Metric<Route, prometheus::Counter>,
///     }
/// }
///
/// metric_group! {
///     pub struct ServiceMetrics {
///         /// Front door metrics.
///         #[meta(namespace = "server")]
///         pub server: Server,
///         #[meta(name = "latency_seconds", help = "Latency", buckets = "0.1,0.5,1")]
///         pub latency: Metric<(), prometheus::Histogram>,
///     }
/// }
///
/// let registry = prometheus::Registry::new();
/// let initializer = Initializer::with_default_builders(&registry);
/// let mut metrics = ServiceMetrics::default();
/// initializer.bind(&mut metrics, "svc")?;
///
/// metrics.server.hits.with(&Route::default()).inc();
/// metrics.latency.get().observe(0.2);
/// # Ok::<_, promgroup::BindError>(())
/// ```
#[macro_export]
macro_rules! metric_group {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $doc:literal])*
                $(#[meta( $($key:ident = $value:literal),* $(,)? )])?
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Default)]
        $vis struct $name {
            $(
                $(#[doc = $doc])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::MetricGroup for $name {
            #[allow(unused_variables, unused_imports)]
            fn bind_fields(
                &mut self,
                walker: &mut $crate::Walker<'_>,
            ) -> ::std::result::Result<(), $crate::BindError> {
                use $crate::__private::{
                    MisdeclaredSlotField as _, NonRecordLabelsField as _, SupportedField as _,
                    UnknownOutputField as _, UnsupportedField as _,
                };
                $(
                    let decl = $crate::FieldDecl::new(
                        stringify!($field),
                        $crate::Meta::new(&[ $( $( (stringify!($key), $value) ),* )? ]),
                    );
                    (&&&&&$crate::__private::Probe::<$ty>::new())
                        .field_kind()
                        .bind(&mut self.$field, &decl, walker)?;
                )*
                ::std::result::Result::Ok(())
            }

            #[allow(unused_imports)]
            fn unbind_fields(&mut self) {
                use $crate::__private::{
                    MisdeclaredSlotField as _, NonRecordLabelsField as _, SupportedField as _,
                    UnknownOutputField as _, UnsupportedField as _,
                };
                $(
                    (&&&&&$crate::__private::Probe::<$ty>::new())
                        .field_kind()
                        .unbind(&mut self.$field);
                )*
            }

            #[allow(unused_imports)]
            fn any_bound(&self) -> bool {
                use $crate::__private::{
                    MisdeclaredSlotField as _, NonRecordLabelsField as _, SupportedField as _,
                    UnknownOutputField as _, UnsupportedField as _,
                };
                false $(
                    || (&&&&&$crate::__private::Probe::<$ty>::new())
                        .field_kind()
                        .is_bound(&self.$field)
                )*
            }
        }

        impl $crate::GroupField for $name {
            fn bind_field(
                &mut self,
                decl: &$crate::FieldDecl<'_>,
                walker: &mut $crate::Walker<'_>,
            ) -> ::std::result::Result<(), $crate::BindError> {
                walker.group(decl, self)
            }

            fn unbind_field(&mut self) {
                $crate::MetricGroup::unbind_fields(self);
            }

            fn is_field_bound(&self) -> bool {
                $crate::MetricGroup::any_bound(self)
            }
        }
    };
}

/// Declares a label record usable as the labels of a
/// [`Metric`](crate::Metric) slot, or nested inside another record.
///
/// Scalar fields (`String`, `&'static str`, `bool`, `i8` through `i128`,
/// `isize`) need a `label` entry and may carry a `default` substituted for
/// zero values.
/// Nested record fields contribute their labels without metadata.
///
/// ```
/// use promgroup::{label_set, LabelSchema};
///
/// label_set! {
///     pub struct Common {
///         #[meta(label = "region")]
///         pub region: String,
///     }
/// }
///
/// label_set! {
///     pub struct Request {
///         pub common: Common,
///         #[meta(label = "status", default = "none")]
///         pub status: String,
///         #[meta(label = "retried")]
///         pub retried: bool,
///     }
/// }
///
/// let schema = LabelSchema::extract::<Request>()?;
/// assert_eq!(schema.names(), ["region", "status", "retried"]);
/// # Ok::<_, promgroup::LabelError>(())
/// ```
#[macro_export]
macro_rules! label_set {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $doc:literal])*
                $(#[meta( $($key:ident = $value:literal),* $(,)? )])?
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$attr])*
        $vis struct $name {
            $(
                $(#[doc = $doc])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::LabelSet for $name {
            #[allow(unused_variables, unused_imports)]
            fn describe(
                schema: &mut $crate::SchemaBuilder,
            ) -> ::std::result::Result<(), $crate::LabelError> {
                use $crate::__private::{OtherLabel as _, RecordLabel as _, ScalarLabel as _};
                $(
                    (&&&$crate::__private::Probe::<$ty>::new())
                        .label_kind()
                        .describe(
                            schema,
                            stringify!($field),
                            &$crate::Meta::new(&[ $( $( (stringify!($key), $value) ),* )? ]),
                        )?;
                )*
                ::std::result::Result::Ok(())
            }

            #[allow(unused_variables, unused_imports)]
            fn emit<'a>(&'a self, out: &mut ::std::vec::Vec<$crate::LabelValue<'a>>) {
                use $crate::__private::{OtherLabel as _, RecordLabel as _, ScalarLabel as _};
                $(
                    (&&&$crate::__private::Probe::<$ty>::new())
                        .label_kind()
                        .emit(&self.$field, out);
                )*
            }
        }

        impl $crate::LabelArg for $name {
            const IS_RECORD: bool = true;

            fn describe(
                schema: &mut $crate::SchemaBuilder,
            ) -> ::std::result::Result<(), $crate::LabelError> {
                <Self as $crate::LabelSet>::describe(schema)
            }

            fn emit<'a>(&'a self, out: &mut ::std::vec::Vec<$crate::LabelValue<'a>>) {
                <Self as $crate::LabelSet>::emit(self, out);
            }
        }
    };
}
