//! Error taxonomy for the tracker.
//!
//! A [`ContractViolation`] means the instrumented native code (or the tracker
//! itself) has desynchronized from the registry: a double free, a realloc or
//! tag of a pointer the tracker never saw, or the allocator handing out an
//! address that is already live. It is always fatal to the current operation.
//! Continuing with a corrupted registry would make every later statistic
//! meaningless, so callers must not swallow it.
//!
//! Underlying-allocator failures (null results) are *not* errors of the
//! tracker and never appear here; they are forwarded to the caller as-is.

use thiserror::Error;

/// Fatal bookkeeping contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// The allocator returned an address that is already registered as live.
    /// A double insert without an intervening free indicates allocator or
    /// tracker corruption and must not silently overwrite the old record.
    #[error("address {addr:#x} is already registered with {existing} live bytes")]
    DoubleRegister {
        /// Address the operation tried to register.
        addr: usize,
        /// Size of the record already occupying that address.
        existing: usize,
    },

    /// An operation referenced an address absent from the registry
    /// (double free, stray tag, realloc of an unknown pointer).
    #[error("{operation} references unknown address {addr:#x}")]
    UnknownAddress {
        /// The intercepted operation that observed the address.
        operation: &'static str,
        /// The unregistered address.
        addr: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_messages_name_the_address() {
        let double = ContractViolation::DoubleRegister {
            addr: 0x1000,
            existing: 64,
        };
        assert_eq!(
            double.to_string(),
            "address 0x1000 is already registered with 64 live bytes"
        );

        let unknown = ContractViolation::UnknownAddress {
            operation: "deallocate",
            addr: 0xBEEF,
        };
        assert_eq!(
            unknown.to_string(),
            "deallocate references unknown address 0xbeef"
        );
    }
}
