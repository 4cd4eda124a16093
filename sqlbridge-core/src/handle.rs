//! Opaque handle types exchanged across the bridge.
//!
//! The host never dereferences a handle; it is a capability token the
//! dispatcher resolves through its registry. `0` is never minted, so it plays
//! the role of the native `NULL` pointer.

use std::fmt;

/// Maps a registry slot index to a handle value and back.
pub trait Handle: Copy {
    /// Builds the handle for slot `index`, `None` when it does not fit.
    fn from_slot(index: usize) -> Option<Self>;

    /// The slot index this handle refers to, `None` for the null handle.
    fn slot(self) -> Option<usize>;
}

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Wraps a raw handle value received over the wire.
            #[must_use]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// The raw value rendered into envelopes.
            #[must_use]
            pub const fn get(self) -> u32 {
                self.0
            }

            /// `true` for the null handle.
            #[must_use]
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl Handle for $name {
            fn from_slot(index: usize) -> Option<Self> {
                let raw = u32::try_from(index.checked_add(1)?).ok()?;
                Some(Self(raw))
            }

            fn slot(self) -> Option<usize> {
                let raw = usize::try_from(self.0).ok()?;
                raw.checked_sub(1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

handle_type!(
    /// Identifies one open database inside the sandbox.
    ConnectionHandle
);

handle_type!(
    /// Identifies one prepared statement inside the sandbox.
    StatementHandle
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_zero_is_handle_one() {
        let h = ConnectionHandle::from_slot(0).expect("fits");
        assert_eq!(h.get(), 1);
        assert_eq!(h.slot(), Some(0));
    }

    #[test]
    fn null_handle_has_no_slot() {
        let h = StatementHandle::from_raw(0);
        assert!(h.is_null());
        assert_eq!(h.slot(), None);
    }
}
