//! Canonical type names for externally stored values.
//!
//! Every storable type carries a deterministic string identifier that is
//! written next to its records and checked again at load time. Container
//! types compose recursively, so a list of users is `list[User]` and a
//! string-keyed map of integers is `dict[str, int]` — stable across
//! processes built from the same type definitions.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// A type with a canonical external name.
///
/// Leaf types (your own structs and enums) are usually wired up with the
/// [`external_type!`](crate::external_type) macro:
///
/// ```
/// use exostore::ExternalType;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     name: String,
/// }
/// exostore::external_type!(User);
///
/// assert_eq!(User::type_name(), "User");
/// assert_eq!(Vec::<User>::type_name(), "list[User]");
/// ```
pub trait ExternalType {
    /// Returns the canonical name of this type.
    fn type_name() -> String;
}

/// Implements [`ExternalType`] for one or more named types, using the bare
/// type name as the canonical identifier.
#[macro_export]
macro_rules! external_type {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::ExternalType for $ty {
                fn type_name() -> String {
                    stringify!($ty).to_string()
                }
            }
        )+
    };
}

// Primitive names follow the stored wire format rather than Rust
// spellings, so records written by differently-typed producers agree.
macro_rules! primitive_type_name {
    ($name:literal => $($ty:ty),+ $(,)?) => {
        $(
            impl ExternalType for $ty {
                fn type_name() -> String {
                    $name.to_string()
                }
            }
        )+
    };
}

primitive_type_name!("str" => String, &str);
primitive_type_name!("int" => i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, isize, usize);
primitive_type_name!("float" => f32, f64);
primitive_type_name!("bool" => bool);
primitive_type_name!("UUID" => Uuid);
primitive_type_name!("datetime" => DateTime<Utc>);
primitive_type_name!("any" => Value);

impl<T: ExternalType> ExternalType for Vec<T> {
    fn type_name() -> String {
        format!("list[{}]", T::type_name())
    }
}

impl<K: ExternalType, V: ExternalType> ExternalType for HashMap<K, V> {
    fn type_name() -> String {
        format!("dict[{}, {}]", K::type_name(), V::type_name())
    }
}

impl<K: ExternalType, V: ExternalType> ExternalType for BTreeMap<K, V> {
    fn type_name() -> String {
        format!("dict[{}, {}]", K::type_name(), V::type_name())
    }
}
