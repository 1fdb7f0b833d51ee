//! Macros for reducing boilerplate when defining entities
//!
//! Every server record carries `id`, `created_at` and `updated_at` fields,
//! so the [`Entity`](crate::core::entity::Entity) and
//! [`Resource`](crate::core::entity::Resource) impls are pure repetition.

/// Implement `Entity` and `Resource` for a record struct
///
/// The struct must have `id: Uuid`, `created_at: DateTime<Utc>` and
/// `updated_at: DateTime<Utc>` fields.
///
/// # Example
/// ```rust,ignore
/// impl_resource!(
///     WorkEntry,
///     "WorkEntry",
///     "/api/work-entries",
///     create: WorkEntryCreate,
///     update: WorkEntryUpdate,
///     patch: WorkEntryPatch,
///     filter: WorkEntryFilter,
/// );
/// ```
#[macro_export]
macro_rules! impl_resource {
    (
        $type:ty,
        $entity_name:expr,
        $base_path:expr,
        create: $create:ty,
        update: $update:ty,
        patch: $patch:ty,
        filter: $filter:ty $(,)?
    ) => {
        impl $crate::core::entity::Entity for $type {
            fn entity_name() -> &'static str {
                $entity_name
            }

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.created_at
            }

            fn updated_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.updated_at
            }
        }

        impl $crate::core::entity::Resource for $type {
            type Create = $create;
            type Update = $update;
            type Patch = $patch;
            type Filter = $filter;

            fn base_path() -> &'static str {
                $base_path
            }
        }
    };
}

/// Generate `as_str` and `Display` for a unit-only enum with fixed wire names
///
/// # Example
/// ```rust,ignore
/// wire_enum!(WorkEntryStatus {
///     Draft => "draft",
///     Pending => "pending",
/// });
/// ```
#[macro_export]
macro_rules! wire_enum {
    ($type:ident { $( $variant:ident => $wire:expr ),* $(,)? }) => {
        impl $type {
            /// Name used on the wire
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $type::$variant => $wire ),*
                }
            }
        }

        impl ::std::fmt::Display for $type {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}
