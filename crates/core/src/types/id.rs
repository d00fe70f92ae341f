//! Newtype IDs for type-safe entity references.
//!
//! All identifiers in the storefront are opaque strings issued by the
//! backend; the client never generates or interprets them. The `define_id!`
//! macro creates one wrapper per entity so that, for example, an [`OrderId`]
//! can never be passed where a [`ProductId`] is expected.

/// Macro to define a type-safe ID wrapper around an opaque backend string.
///
/// Creates a newtype with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>`, `AsRef<str>`, and `Display`
///
/// # Example
///
/// ```rust
/// # use saffron_core::define_id;
/// define_id!(CouponId);
///
/// let coupon = CouponId::new("c-9081");
/// assert_eq!(coupon.as_str(), "c-9081");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a backend-issued value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Standard entity IDs
define_id!(UserId);
define_id!(ProductId);
define_id!(OrderId);

// The payment provider's reference for a confirmed payment attempt. Opaque
// like the entity IDs, but issued by the provider rather than the backend.
define_id!(PaymentReference);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = ProductId::new("6651f2a9c4");
        assert_eq!(id.as_str(), "6651f2a9c4");
        assert_eq!(id.to_string(), "6651f2a9c4");
        assert_eq!(id.clone().into_inner(), "6651f2a9c4");
    }

    #[test]
    fn test_ids_are_distinct_types() {
        // Same inner value, different entity types: equality only compiles
        // within a single type.
        let order = OrderId::new("abc");
        let same = OrderId::from("abc");
        assert_eq!(order, same);
    }

    #[test]
    fn test_serde_transparent() {
        let reference = PaymentReference::new("pi_123");
        let json = serde_json::to_string(&reference).unwrap();
        assert_eq!(json, "\"pi_123\"");

        let parsed: PaymentReference = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, reference);
    }
}
