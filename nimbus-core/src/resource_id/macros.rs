//! Declarative resource ID types

/// Declare a typed resource ID and its shape.
///
/// Fields are listed once in the struct body; the path interleaves string
/// literals with `{field}` placeholders. Fields are private and read through
/// generated accessors, so a typed ID only ever holds non-empty values.
///
/// ```
/// mod ids {
///     nimbus_core::define_resource_id! {
///         /// A resource group
///         pub struct ResourceGroupId {
///             subscription_id,
///             resource_group,
///         }
///         shape = "ResourceGroup", "Resource Group";
///         path = "subscriptions" / {subscription_id} / "resourceGroups" / {resource_group};
///     }
/// }
///
/// use nimbus_core::resource_id::ResourceIdentifier;
///
/// let id = ids::ResourceGroupId::parse("/subscriptions/sub1/resourceGroups/rg1").unwrap();
/// assert_eq!(id.resource_group(), "rg1");
/// assert!(ids::ResourceGroupId::new("sub1", "").is_err());
/// ```
///
/// Values cannot be replaced after parsing:
///
/// ```compile_fail
/// mod ids {
///     nimbus_core::define_resource_id! {
///         pub struct ResourceGroupId {
///             subscription_id,
///             resource_group,
///         }
///         shape = "ResourceGroup", "Resource Group";
///         path = "subscriptions" / {subscription_id} / "resourceGroups" / {resource_group};
///     }
/// }
///
/// use nimbus_core::resource_id::ResourceIdentifier;
///
/// let mut id = ids::ResourceGroupId::parse("/subscriptions/sub1/resourceGroups/rg1").unwrap();
/// id.resource_group = String::new();
/// ```
#[macro_export]
macro_rules! define_resource_id {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($field:ident),+ $(,)?
        }
        shape = $shape_name:literal, $description:literal;
        path = $($segment:tt)/+;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        $vis struct $name {
            $($field: String,)+
        }

        impl $name {
            $(
                pub fn $field(&self) -> &str {
                    &self.$field
                }
            )+

            /// Build from field values; every value must be non-empty
            #[allow(clippy::too_many_arguments)]
            pub fn new(
                $($field: impl Into<String>),+
            ) -> Result<Self, $crate::resource_id::ResourceIdError> {
                let id = Self {
                    $($field: $field.into(),)+
                };
                <Self as $crate::resource_id::ResourceIdentifier>::SHAPE
                    .build(&$crate::resource_id::ResourceIdentifier::values(&id))?;
                Ok(id)
            }
        }

        impl $crate::resource_id::ResourceIdentifier for $name {
            const SHAPE: &'static $crate::resource_id::IdShape = &$crate::resource_id::IdShape {
                name: $shape_name,
                description: $description,
                segments: &[$($crate::__resource_id_segment!($segment)),+],
            };

            fn from_parsed(
                parsed: $crate::resource_id::ParsedId,
            ) -> Result<Self, $crate::resource_id::ResourceIdError> {
                parsed.expect_shape(<Self as $crate::resource_id::ResourceIdentifier>::SHAPE)?;
                Ok(Self {
                    $($field: parsed.get(stringify!($field)).unwrap_or_default().to_string(),)+
                })
            }

            fn field(&self, name: &str) -> Option<&str> {
                match name {
                    $(stringify!($field) => Some(self.$field.as_str()),)+
                    _ => None,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                $crate::resource_id::ResourceIdentifier::describe(self, f)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::resource_id::ResourceIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <Self as $crate::resource_id::ResourceIdentifier>::parse(s)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __resource_id_segment {
    ({ $field:ident }) => {
        $crate::resource_id::Segment::UserValue(stringify!($field))
    };
    ($token:literal) => {
        $crate::resource_id::Segment::Literal($token)
    };
}
