//! MD5 partitioner implementation.

use crate::partitioner::traits::Partitioner;
use crate::token::Token;

/// MD5 partitioner, the default for every ring.
#[derive(Clone, Copy, Debug, Default)]
pub struct Md5Partitioner;

impl Partitioner for Md5Partitioner {
    fn partition(&self, key: &[u8]) -> Token {
        Token::from_bytes(key)
    }

    fn name(&self) -> &'static str {
        "Md5Partitioner"
    }
}
