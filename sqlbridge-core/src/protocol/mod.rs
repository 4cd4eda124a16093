//! Wire format between host and sandbox.
//!
//! Every call crosses the boundary as one line of text, `name(arg, ...)`,
//! and every result comes back as one line of text. Values that text cannot
//! carry exactly travel through [`HostMemory`](crate::memory::HostMemory)
//! and are referenced by address.

mod command;
mod envelope;
mod error;
pub mod escape;
mod reply;
mod request;

pub use command::Command;
pub use envelope::{Arg, Call};
pub use error::ProtocolError;
pub use reply::{parse_code, parse_int, parse_pair, parse_text, Reply};
pub use request::{BlockRef, Request};
