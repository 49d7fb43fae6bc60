//! Exit code constants shared by every command.

/// Successful operation; for `check`, the transaction is allowed.
pub const EXIT_SUCCESS: i32 = 0;

/// The rule denied the transaction.
///
/// Covers every evaluation outcome other than a match, including malformed
/// transaction bytes and rules that cannot be evaluated.
pub const EXIT_POLICY_DENIED: i32 = 1;

/// General error (configuration, I/O, invalid arguments).
pub const EXIT_ERROR: i32 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_values() {
        assert_eq!(EXIT_SUCCESS, 0);
        assert_eq!(EXIT_POLICY_DENIED, 1);
        assert_eq!(EXIT_ERROR, 2);
    }
}
