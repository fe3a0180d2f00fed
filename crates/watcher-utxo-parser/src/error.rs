use thiserror::Error;

/// Not-a-transfer is the overwhelmingly common case for any given mainchain
/// transaction — these variants exist for completeness and debugging, not
/// because callers branch on them. [`crate::parser::Parser::extract_transfers`]
/// never surfaces them; it silently skips non-matching transactions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no OP_RETURN output")]
    NoOpReturn,

    #[error("magic bytes mismatch")]
    MagicMismatch,

    #[error("no output paying a covenant address")]
    NoCovenantOutput,

    #[error("malformed destination address, got {0} bytes")]
    InvalidDestAddress(usize),
}
