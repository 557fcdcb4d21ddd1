//! Command-queue submission records
//!
//! `SUBMIT_COMMAND_BUFFERS` takes an array of fixed-size records, each naming
//! the shared-memory regions holding a command buffer and its segment list.
//! The record layout is the same on every known revision.

use crate::wire::{read_u32, read_u64, write_u32, write_u64};

/// IOService type passed when opening the AGX accelerator user client.
pub const AGX_SERVICE_TYPE: u32 = 0x100005;

/// One command buffer submission.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmitCommand {
    pub command_buffer_shmem_id: u32,
    pub segment_list_shmem_id: u32,
    /// Always 0, new in 12.x
    pub unk1b: u64,
    pub notify_1: u64,
    pub notify_2: u64,
    pub unk2: u32,
    pub unk3: u32,
}

const _: () = assert!(std::mem::size_of::<SubmitCommand>() == SubmitCommand::SIZE_BYTES);

impl SubmitCommand {
    pub const SIZE_BYTES: usize = 40;

    pub fn new(command_buffer_shmem_id: u32, segment_list_shmem_id: u32) -> Self {
        Self {
            command_buffer_shmem_id,
            segment_list_shmem_id,
            ..Self::default()
        }
    }

    /// Set the two notification-queue words.
    pub fn with_notify(mut self, notify_1: u64, notify_2: u64) -> Self {
        self.notify_1 = notify_1;
        self.notify_2 = notify_2;
        self
    }

    pub fn decode_from_le_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE_BYTES {
            return None;
        }
        Some(Self {
            command_buffer_shmem_id: read_u32(buf, 0),
            segment_list_shmem_id: read_u32(buf, 4),
            unk1b: read_u64(buf, 8),
            notify_1: read_u64(buf, 16),
            notify_2: read_u64(buf, 24),
            unk2: read_u32(buf, 32),
            unk3: read_u32(buf, 36),
        })
    }

    pub fn encode_to_le_bytes(&self) -> [u8; Self::SIZE_BYTES] {
        let mut buf = [0u8; Self::SIZE_BYTES];
        write_u32(&mut buf, 0, self.command_buffer_shmem_id);
        write_u32(&mut buf, 4, self.segment_list_shmem_id);
        write_u64(&mut buf, 8, self.unk1b);
        write_u64(&mut buf, 16, self.notify_1);
        write_u64(&mut buf, 24, self.notify_2);
        write_u32(&mut buf, 32, self.unk2);
        write_u32(&mut buf, 36, self.unk3);
        buf
    }
}

/// Concatenate records into the method's input struct.
pub fn encode_commands(commands: &[SubmitCommand]) -> Vec<u8> {
    let mut out = Vec::with_capacity(commands.len() * SubmitCommand::SIZE_BYTES);
    for command in commands {
        out.extend_from_slice(&command.encode_to_le_bytes());
    }
    out
}
