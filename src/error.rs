//! Error types for the AGX IOKit shim
//!
//! Two kinds, kept apart on purpose:
//! - [`AbiError`] is an invariant violation (wrong OS image, buffer layout
//!   drift). There is no degraded mode; [`fatal`] aborts with it.
//! - [`DeviceError`] is a recoverable, caller-checked condition such as a
//!   selector the active revision does not have.

use thiserror::Error;

use crate::selector::SelectorLabel;
use crate::version::AgxVersion;

/// Unrecoverable ABI/environment errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("Failed to get macOS version from sysctl: {0}")]
    VersionUnavailable(String),

    #[error("Unparseable macOS product version: {0:?}")]
    UnparseableVersion(String),

    #[error("Invalid macOS version: {0} (no AGX interface revision exists for 16-25)")]
    UnsupportedMacosVersion(u32),

    #[error("Allocate-resource response size mismatch for {version}: expected {expected} bytes, got {actual}")]
    ResponseSizeMismatch {
        version: AgxVersion,
        expected: usize,
        actual: usize,
    },
}

/// Recoverable errors surfaced by [`crate::device::AgxDevice`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Selector {label} is not available on {version}")]
    UnsupportedSelector {
        label: SelectorLabel,
        version: AgxVersion,
    },

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Abort on an ABI invariant violation.
///
/// The panic payload is the [`AbiError`] itself so tests can recover it with
/// `catch_unwind` and `downcast_ref::<AbiError>()`.
pub fn fatal(err: AbiError) -> ! {
    log::error!("{}", err);
    std::panic::panic_any(err)
}
