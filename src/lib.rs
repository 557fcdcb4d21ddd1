//! AGX IOKit interface shim
//!
//! The macOS AGX accelerator user client has no public ABI, and it changed
//! between macOS 15 and macOS 26: selectors were renumbered (and some
//! removed), and the `ALLOCATE_MEM` reply was re-laid out. This crate detects
//! the revision once and translates both directions:
//!
//! - [`version`]: which revision the running OS uses
//! - [`selector`]: symbolic method <-> selector number, per revision
//! - [`resource`]: raw allocation replies -> [`AllocateResourceResp`]
//! - [`device`]: ties the above to a caller-supplied [`Transport`]
//!
//! ```
//! use agx_iokit::{AgxAbi, AgxVersion, SelectorLabel, VersionOracle, SELECTOR_INVALID};
//!
//! let abi = AgxAbi::new(VersionOracle::fixed(AgxVersion::V26));
//! assert_eq!(abi.selector(SelectorLabel::AllocateMem), 0x9);
//! assert_eq!(abi.selector(SelectorLabel::SetApi), SELECTOR_INVALID);
//! ```

pub mod device;
pub mod error;
pub mod resource;
pub mod selector;
pub mod submit;
pub mod version;

mod wire;

pub use device::{AgxAbi, AgxDevice, Transport};
pub use error::{fatal, AbiError, DeviceError};
pub use resource::{
    allocate_resource_resp, try_allocate_resource_resp, AllocateResourceResp,
    AllocateResourceRespV13, AllocateResourceRespV26,
};
pub use selector::{
    selector, selector_label, SelectorEntry, SelectorLabel, SelectorStatus, SELECTOR_INVALID,
};
pub use submit::{SubmitCommand, AGX_SERVICE_TYPE};
pub use version::{
    AgxVersion, FixedVersionSource, SysctlVersionSource, VersionOracle, VersionSource,
};
