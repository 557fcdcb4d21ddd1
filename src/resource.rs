//! Allocate-resource reply decoding
//!
//! `ALLOCATE_MEM` fills a fixed-size output struct whose size and field order
//! depend on the interface revision. The per-revision structs below mirror the
//! kernel's packed layout byte for byte, filler included. Everything outside
//! this module works with [`AllocateResourceResp`] only.

use crate::error::{fatal, AbiError};
use crate::wire::{read_u32, read_u32s, read_u64, write_u32, write_u32s, write_u64};
use crate::version::AgxVersion;

/// Revision-independent view of an allocation reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocateResourceResp {
    /// GPU virtual address of the resource
    pub gpu_va: u64,
    /// CPU virtual address of the resource
    pub cpu: u64,
    /// Handle used to identify the resource in the segment list
    pub handle: u32,
    /// Usable size from `cpu` to the end of the backing allocation
    pub sub_size: u64,
}

/// Allocation reply on macOS 13-15.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocateResourceRespV13 {
    pub gpu_va: u64,
    pub cpu: u64,
    pub unk4: [u32; 3],
    pub handle: u32,
    pub root_size: u64,
    pub guid: u32,
    pub unk11: [u32; 7],
    /// Maximum size of the suballocation. For a suballocation this is
    /// `root_size - (sub_cpu - root_cpu)`; for a root allocation, the size.
    pub sub_size: u64,
}

impl AllocateResourceRespV13 {
    pub const SIZE_BYTES: usize = 80;

    pub fn decode_from_le_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE_BYTES {
            return None;
        }
        Some(Self {
            gpu_va: read_u64(buf, 0),
            cpu: read_u64(buf, 8),
            unk4: read_u32s(buf, 16),
            handle: read_u32(buf, 28),
            root_size: read_u64(buf, 32),
            guid: read_u32(buf, 40),
            unk11: read_u32s(buf, 44),
            sub_size: read_u64(buf, 72),
        })
    }

    pub fn encode_to_le_bytes(&self) -> [u8; Self::SIZE_BYTES] {
        let mut buf = [0u8; Self::SIZE_BYTES];
        let Self {
            gpu_va,
            cpu,
            unk4,
            handle,
            root_size,
            guid,
            unk11,
            sub_size,
        } = *self;
        write_u64(&mut buf, 0, gpu_va);
        write_u64(&mut buf, 8, cpu);
        write_u32s(&mut buf, 16, &unk4);
        write_u32(&mut buf, 28, handle);
        write_u64(&mut buf, 32, root_size);
        write_u32(&mut buf, 40, guid);
        write_u32s(&mut buf, 44, &unk11);
        write_u64(&mut buf, 72, sub_size);
        buf
    }
}

/// Allocation reply on macOS 26.
///
/// Same fields as [`AllocateResourceRespV13`] but shifted by a leading pair of
/// words, with `cpu` and `gpu_va` swapped.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocateResourceRespV26 {
    pub unk0: [u32; 2],
    /// Returned CPU virtual address
    pub cpu: u64,
    /// Returned GPU virtual address
    pub gpu_va: u64,
    pub unk4: [u32; 3],
    /// Handle used to identify the resource in the segment list
    pub handle: u32,
    /// Size of the root resource we are allocated from; equal to the size
    /// when this is not a suballocation.
    pub root_size: u64,
    /// Globally unique identifier for the resource, shown in Instruments
    pub guid: u32,
    pub unk11: [u32; 7],
    /// Might or might not correspond to `sub_size` on macOS 13.
    pub unk_size: u64,
}

impl AllocateResourceRespV26 {
    pub const SIZE_BYTES: usize = 88;

    pub fn decode_from_le_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE_BYTES {
            return None;
        }
        Some(Self {
            unk0: read_u32s(buf, 0),
            cpu: read_u64(buf, 8),
            gpu_va: read_u64(buf, 16),
            unk4: read_u32s(buf, 24),
            handle: read_u32(buf, 36),
            root_size: read_u64(buf, 40),
            guid: read_u32(buf, 48),
            unk11: read_u32s(buf, 52),
            unk_size: read_u64(buf, 80),
        })
    }

    pub fn encode_to_le_bytes(&self) -> [u8; Self::SIZE_BYTES] {
        let mut buf = [0u8; Self::SIZE_BYTES];
        let Self {
            unk0,
            cpu,
            gpu_va,
            unk4,
            handle,
            root_size,
            guid,
            unk11,
            unk_size,
        } = *self;
        write_u32s(&mut buf, 0, &unk0);
        write_u64(&mut buf, 8, cpu);
        write_u64(&mut buf, 16, gpu_va);
        write_u32s(&mut buf, 24, &unk4);
        write_u32(&mut buf, 36, handle);
        write_u64(&mut buf, 40, root_size);
        write_u32(&mut buf, 48, guid);
        write_u32s(&mut buf, 52, &unk11);
        write_u64(&mut buf, 80, unk_size);
        buf
    }
}

const _: () = assert!(
    std::mem::size_of::<AllocateResourceRespV13>() == AllocateResourceRespV13::SIZE_BYTES
);
const _: () = assert!(
    std::mem::size_of::<AllocateResourceRespV26>() == AllocateResourceRespV26::SIZE_BYTES
);

impl From<AllocateResourceRespV13> for AllocateResourceResp {
    fn from(resp: AllocateResourceRespV13) -> Self {
        Self {
            gpu_va: resp.gpu_va,
            cpu: resp.cpu,
            handle: resp.handle,
            sub_size: resp.sub_size,
        }
    }
}

impl From<AllocateResourceRespV26> for AllocateResourceResp {
    fn from(resp: AllocateResourceRespV26) -> Self {
        Self {
            gpu_va: resp.gpu_va,
            cpu: resp.cpu,
            handle: resp.handle,
            // Unconfirmed equivalence; carried over as-is.
            sub_size: resp.unk_size,
        }
    }
}

/// Output struct size `ALLOCATE_MEM` uses on `version`.
pub fn expected_size(version: AgxVersion) -> usize {
    match version {
        AgxVersion::V13 => AllocateResourceRespV13::SIZE_BYTES,
        AgxVersion::V26 => AllocateResourceRespV26::SIZE_BYTES,
    }
}

/// Decode a raw allocation reply. `bytes` must be exactly
/// [`expected_size`] long.
pub fn try_allocate_resource_resp(
    version: AgxVersion,
    bytes: &[u8],
) -> Result<AllocateResourceResp, AbiError> {
    let expected = expected_size(version);
    if bytes.len() != expected {
        return Err(AbiError::ResponseSizeMismatch {
            version,
            expected,
            actual: bytes.len(),
        });
    }

    let resp: Option<AllocateResourceResp> = match version {
        AgxVersion::V13 => AllocateResourceRespV13::decode_from_le_bytes(bytes).map(Into::into),
        AgxVersion::V26 => AllocateResourceRespV26::decode_from_le_bytes(bytes).map(Into::into),
    };
    resp.ok_or(AbiError::ResponseSizeMismatch {
        version,
        expected,
        actual: bytes.len(),
    })
}

/// Decode a raw allocation reply, aborting if its length does not match the
/// active revision.
pub fn allocate_resource_resp(version: AgxVersion, bytes: &[u8]) -> AllocateResourceResp {
    match try_allocate_resource_resp(version, bytes) {
        Ok(resp) => resp,
        Err(err) => fatal(err),
    }
}
