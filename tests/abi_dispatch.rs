//! End-to-end dispatch through `AgxDevice` with a recording transport.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};

use agx_iokit::{
    AbiError, AgxAbi, AgxDevice, AgxVersion, AllocateResourceResp, AllocateResourceRespV13,
    AllocateResourceRespV26, DeviceError, FixedVersionSource, SelectorLabel, SubmitCommand,
    Transport, VersionOracle,
};
use pretty_assertions::assert_eq;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Call {
    selector: u32,
    input: Vec<u8>,
    output_len: usize,
}

#[derive(Default)]
struct FakeTransport {
    calls: Vec<Call>,
    replies: VecDeque<Result<Vec<u8>, DeviceError>>,
}

impl FakeTransport {
    fn replying(reply: Vec<u8>) -> Self {
        Self {
            calls: Vec::new(),
            replies: VecDeque::from([Ok(reply)]),
        }
    }
}

impl Transport for FakeTransport {
    fn call_method(
        &mut self,
        selector: u32,
        input: &[u8],
        output_len: usize,
    ) -> Result<Vec<u8>, DeviceError> {
        self.calls.push(Call {
            selector,
            input: input.to_vec(),
            output_len,
        });
        self.replies.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn device(version: AgxVersion, transport: FakeTransport) -> AgxDevice<FakeTransport, FixedVersionSource> {
    AgxDevice::new(AgxAbi::new(VersionOracle::fixed(version)), transport)
}

#[test]
fn test_allocate_on_v13() {
    let reply = AllocateResourceRespV13 {
        gpu_va: 0x1000,
        cpu: 0x2000,
        handle: 7,
        root_size: 0x10000,
        sub_size: 4096,
        ..Default::default()
    };
    let mut dev = device(AgxVersion::V13, FakeTransport::replying(reply.encode_to_le_bytes().to_vec()));

    let resp = dev.allocate_resource(&[1, 2, 3]).unwrap();
    assert_eq!(
        resp,
        AllocateResourceResp {
            gpu_va: 0x1000,
            cpu: 0x2000,
            handle: 7,
            sub_size: 4096,
        }
    );

    let transport = dev.into_transport();
    assert_eq!(
        transport.calls,
        vec![Call {
            selector: 0xA,
            input: vec![1, 2, 3],
            output_len: 80,
        }]
    );
}

#[test]
fn test_allocate_on_v26() {
    let reply = AllocateResourceRespV26 {
        cpu: 0x2000,
        gpu_va: 0x1000,
        handle: 11,
        unk_size: 0x3000,
        ..Default::default()
    };
    let mut dev = device(AgxVersion::V26, FakeTransport::replying(reply.encode_to_le_bytes().to_vec()));

    let resp = dev.allocate_resource(&[]).unwrap();
    assert_eq!(resp.gpu_va, 0x1000);
    assert_eq!(resp.cpu, 0x2000);
    assert_eq!(resp.handle, 11);
    assert_eq!(resp.sub_size, 0x3000);

    let call = &dev.transport().calls[0];
    assert_eq!(call.selector, 0x9);
    assert_eq!(call.output_len, 88);
}

#[test]
fn test_missing_selector_is_not_forwarded() {
    let mut dev = device(AgxVersion::V26, FakeTransport::default());

    let err = dev.call(SelectorLabel::SetApi, &[], 0).unwrap_err();
    assert_eq!(
        err,
        DeviceError::UnsupportedSelector {
            label: SelectorLabel::SetApi,
            version: AgxVersion::V26,
        }
    );

    let err = dev.call(SelectorLabel::Invalid, &[], 0).unwrap_err();
    assert!(matches!(err, DeviceError::UnsupportedSelector { .. }));

    assert!(dev.transport().calls.is_empty());
}

#[test]
fn test_transport_errors_propagate() {
    let transport = FakeTransport {
        calls: Vec::new(),
        replies: VecDeque::from([Err(DeviceError::Transport("kIOReturnNoMemory".to_string()))]),
    };
    let mut dev = device(AgxVersion::V13, transport);

    let err = dev.allocate_resource(&[]).unwrap_err();
    assert_eq!(err, DeviceError::Transport("kIOReturnNoMemory".to_string()));
}

#[test]
fn test_reply_from_wrong_revision_aborts() {
    // v13-sized reply while the oracle says v26
    let mut dev = device(AgxVersion::V26, FakeTransport::replying(vec![0u8; 80]));

    let result = catch_unwind(AssertUnwindSafe(|| dev.allocate_resource(&[])));
    assert_eq!(
        result.unwrap_err().downcast_ref::<AbiError>(),
        Some(&AbiError::ResponseSizeMismatch {
            version: AgxVersion::V26,
            expected: 88,
            actual: 80,
        })
    );
}

#[test]
fn test_submit_command_buffers() {
    let mut dev = device(AgxVersion::V13, FakeTransport::default());
    let cmds = [SubmitCommand::new(1, 2).with_notify(3, 4)];

    dev.submit_command_buffers(&cmds).unwrap();

    let call = &dev.transport().calls[0];
    assert_eq!(call.selector, 0x1E);
    assert_eq!(call.input.len(), SubmitCommand::SIZE_BYTES);
    assert_eq!(call.output_len, 0);
}

#[test]
fn test_abi_detects_from_source_once() {
    let abi = AgxAbi::new(VersionOracle::new(FixedVersionSource::new("15.7.1")));
    assert!(!abi.oracle().is_cached());

    assert_eq!(abi.version(), AgxVersion::V13);
    assert_eq!(abi.selector(SelectorLabel::CreateCommandQueue), 0x8);
    assert_eq!(abi.selector_label(0x8), SelectorLabel::CreateCommandQueue);
    assert!(abi.oracle().is_cached());
}

#[test]
fn test_abi_unsupported_os_aborts() {
    let abi = AgxAbi::new(VersionOracle::new(FixedVersionSource::new("20.1")));
    assert_eq!(abi.try_version(), Err(AbiError::UnsupportedMacosVersion(20)));

    let result = catch_unwind(|| abi.selector(SelectorLabel::AllocateMem));
    assert_eq!(
        result.unwrap_err().downcast_ref::<AbiError>(),
        Some(&AbiError::UnsupportedMacosVersion(20))
    );
}
