//! External classifier boundary: process invocation and result decoding.

pub mod invoke;
pub mod result;

pub use invoke::{InvocationDescriptor, InvocationError, InvocationReport, invoke};
pub use result::{ResultParseError, parse_results, read_results};
