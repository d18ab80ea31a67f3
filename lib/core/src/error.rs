//! Error handling foundation for support-relay.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own domain-specific error enums in its own
//! error module and wraps them in a [`Report`] where layered context is
//! useful (startup, storage bootstrap).

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Unavailable;

    impl std::fmt::Display for Unavailable {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "store unavailable")
        }
    }

    impl std::error::Error for Unavailable {}

    fn open(ok: bool) -> Result<u8, Unavailable> {
        if ok {
            Ok(1)
        } else {
            Err(Unavailable.into())
        }
    }

    #[test]
    fn result_type_works() {
        let ok: Result<i32> = Ok(42);
        assert_eq!(ok.expect("should be ok"), 42);
    }

    #[test]
    fn typed_context_becomes_report() {
        assert_eq!(open(true).expect("should be ok"), 1);
        let err = open(false).expect_err("should fail");
        assert!(err.to_string().contains("store unavailable"));
    }
}
