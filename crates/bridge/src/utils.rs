//! Internal helper macros.

/// Returns early with `$error` unless `$predicate` holds.
///
/// Works like `assert!` but produces an `Err` instead of panicking, which keeps
/// validation chains in the translator and decoder flat.
///
/// ```ignore
/// ensure!(headers.len() <= MAX_HEADER_NUM, ParseError::too_many_headers(MAX_HEADER_NUM));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
