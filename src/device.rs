//! Revision-aware device front end
//!
//! [`AgxAbi`] bundles the version oracle with the selector and reply lookups.
//! [`AgxDevice`] pairs it with a [`Transport`] that performs the actual
//! user-client calls.

use crate::error::{AbiError, DeviceError};
use crate::resource::{self, AllocateResourceResp};
use crate::selector::{self, SelectorLabel, SELECTOR_INVALID};
use crate::submit::{encode_commands, SubmitCommand};
use crate::version::{AgxVersion, SysctlVersionSource, VersionOracle, VersionSource};

/// Invoke a user-client method by number and get the raw output struct back.
pub trait Transport {
    fn call_method(
        &mut self,
        selector: u32,
        input: &[u8],
        output_len: usize,
    ) -> Result<Vec<u8>, DeviceError>;
}

/// Revision-dependent lookups for one process.
#[derive(Debug)]
pub struct AgxAbi<S = SysctlVersionSource> {
    oracle: VersionOracle<S>,
}

impl AgxAbi<SysctlVersionSource> {
    pub fn system() -> Self {
        Self::new(VersionOracle::system())
    }
}

impl<S: VersionSource> AgxAbi<S> {
    pub fn new(oracle: VersionOracle<S>) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &VersionOracle<S> {
        &self.oracle
    }

    /// Active revision; aborts if it cannot be determined.
    pub fn version(&self) -> AgxVersion {
        self.oracle.version()
    }

    pub fn try_version(&self) -> Result<AgxVersion, AbiError> {
        self.oracle.try_version()
    }

    /// Selector for `label`, or [`SELECTOR_INVALID`].
    pub fn selector(&self, label: SelectorLabel) -> u32 {
        selector::selector(self.version(), label)
    }

    /// Label for a raw selector, or [`SelectorLabel::Invalid`].
    pub fn selector_label(&self, selector: u32) -> SelectorLabel {
        selector::selector_label(self.version(), selector)
    }

    /// Output struct size for `ALLOCATE_MEM`.
    pub fn allocate_resource_resp_size(&self) -> usize {
        resource::expected_size(self.version())
    }

    /// Normalize an `ALLOCATE_MEM` reply; aborts on a size mismatch.
    pub fn allocate_resource_resp(&self, bytes: &[u8]) -> AllocateResourceResp {
        resource::allocate_resource_resp(self.version(), bytes)
    }
}

/// AGX user client bound to a transport.
pub struct AgxDevice<T, S = SysctlVersionSource> {
    abi: AgxAbi<S>,
    transport: T,
}

impl<T: Transport, S: VersionSource> AgxDevice<T, S> {
    pub fn new(abi: AgxAbi<S>, transport: T) -> Self {
        Self { abi, transport }
    }

    pub fn abi(&self) -> &AgxAbi<S> {
        &self.abi
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Invoke `label` with an opaque input struct.
    ///
    /// Methods the active revision lacks are refused here rather than sent
    /// to the kernel as [`SELECTOR_INVALID`].
    pub fn call(
        &mut self,
        label: SelectorLabel,
        input: &[u8],
        output_len: usize,
    ) -> Result<Vec<u8>, DeviceError> {
        let version = self.abi.version();
        let code = selector::selector(version, label);
        if code == SELECTOR_INVALID {
            log::debug!("Refusing {} on {}: no selector", label, version);
            return Err(DeviceError::UnsupportedSelector { label, version });
        }

        log::trace!(
            "call {} (selector 0x{:x}, in={}, out={})",
            label,
            code,
            input.len(),
            output_len
        );
        self.transport.call_method(code, input, output_len)
    }

    /// Allocate GPU memory and return the normalized reply.
    pub fn allocate_resource(&mut self, input: &[u8]) -> Result<AllocateResourceResp, DeviceError> {
        let output_len = self.abi.allocate_resource_resp_size();
        let reply = self.call(SelectorLabel::AllocateMem, input, output_len)?;
        let resp = self.abi.allocate_resource_resp(&reply);

        log::debug!(
            "Allocated resource: handle={} gpu_va=0x{:x} cpu=0x{:x} sub_size=0x{:x}",
            resp.handle,
            resp.gpu_va,
            resp.cpu,
            resp.sub_size
        );
        Ok(resp)
    }

    /// Submit command buffers; the reply, if any, is discarded.
    pub fn submit_command_buffers(&mut self, commands: &[SubmitCommand]) -> Result<(), DeviceError> {
        let input = encode_commands(commands);
        self.call(SelectorLabel::SubmitCommandBuffers, &input, 0)?;
        Ok(())
    }
}
