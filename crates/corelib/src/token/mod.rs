//! Token abstraction for the hash ring.
//!
//! Tokens are fixed-width digests that mark positions on the ring. They are
//! ordered by raw bytes, which matches the lexicographic order of their
//! lowercase hex rendering.

pub mod digest;

pub use digest::{Token, TokenError, TOKEN_LEN};
