//! Internal helpers shared across the crate.

/// Returns early with `$error` unless `$predicate` holds.
///
/// Like `assert!`, but for conditions the caller should see as an `Err`:
///
/// ```text
/// ensure!(!state.eof_queued, ProtocolError::ChunkAfterEnd);
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(value: u8) -> Result<u8, &'static str> {
        ensure!(value < 10, "too large");
        Ok(value)
    }

    #[test]
    fn ensure_returns_error() {
        assert_eq!(checked(3), Ok(3));
        assert_eq!(checked(10), Err("too large"));
    }

    #[test]
    fn panic_messages() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload = std::panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "code 7");
    }
}
