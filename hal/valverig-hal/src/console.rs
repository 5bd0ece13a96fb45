//! Operator console abstractions
//!
//! The operator types commands on a line-oriented console. Reading a
//! line is a suspension point: implementations must let other tasks run
//! while no complete line is available.

use heapless::String;

/// Longest accepted command line (excess input is dropped by the source)
pub const MAX_LINE_LEN: usize = 64;

/// One operator line without its terminator
pub type Line = String<MAX_LINE_LEN>;

/// Source of operator command lines
#[allow(async_fn_in_trait)]
pub trait LineSource {
    /// Error type for read operations
    type Error;

    /// Wait for the next complete line
    ///
    /// Returns `Ok(None)` once the input is closed (end of file).
    async fn read_line(&mut self) -> Result<Option<Line>, Self::Error>;
}
