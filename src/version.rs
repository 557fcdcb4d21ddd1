//! AGX interface revision detection
//!
//! The accelerator user client changed its selector numbering and reply
//! layouts between macOS releases. The active revision is a property of the
//! OS image, so it is read once from `kern.osproductversion` and cached for
//! the lifetime of the owning [`VersionOracle`].

use std::fmt;
use std::sync::OnceLock;

use crate::error::{fatal, AbiError};

/// Last macOS major release using the early interface.
pub const LAST_V13_MAJOR: u32 = 15;

/// First macOS major release using the current interface.
pub const FIRST_V26_MAJOR: u32 = 26;

/// AGX user-client interface revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgxVersion {
    /// macOS 13 through 15.
    V13,
    /// macOS 26 and later.
    V26,
}

impl AgxVersion {
    pub const ALL: [AgxVersion; 2] = [AgxVersion::V13, AgxVersion::V26];

    /// Representative product version for the revision.
    pub fn product_version(self) -> &'static str {
        match self {
            AgxVersion::V13 => "13.0",
            AgxVersion::V26 => "26.0",
        }
    }
}

impl fmt::Display for AgxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgxVersion::V13 => write!(f, "macOS 13"),
            AgxVersion::V26 => write!(f, "macOS 26"),
        }
    }
}

/// Somewhere to read the OS product version string from.
pub trait VersionSource {
    fn product_version(&self) -> Result<String, AbiError>;
}

/// Reads `kern.osproductversion` via `sysctlbyname(3)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysctlVersionSource;

impl VersionSource for SysctlVersionSource {
    #[cfg(target_os = "macos")]
    fn product_version(&self) -> Result<String, AbiError> {
        let mut buf = [0u8; 32];
        let mut size = buf.len();

        let rc = unsafe {
            libc::sysctlbyname(
                c"kern.osproductversion".as_ptr(),
                buf.as_mut_ptr().cast(),
                &mut size,
                std::ptr::null_mut(),
                0,
            )
        };
        if rc != 0 {
            return Err(AbiError::VersionUnavailable(
                std::io::Error::last_os_error().to_string(),
            ));
        }

        let bytes = &buf[..size.min(buf.len())];
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    #[cfg(not(target_os = "macos"))]
    fn product_version(&self) -> Result<String, AbiError> {
        Err(AbiError::VersionUnavailable(
            "kern.osproductversion is only available on macOS".to_string(),
        ))
    }
}

/// A product version supplied by the caller instead of the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedVersionSource(pub String);

impl FixedVersionSource {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }
}

impl VersionSource for FixedVersionSource {
    fn product_version(&self) -> Result<String, AbiError> {
        Ok(self.0.clone())
    }
}

/// Parse the leading major number of a product version ("26.0.1" -> 26).
pub fn parse_major(product_version: &str) -> Result<u32, AbiError> {
    let trimmed = product_version.trim_start();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());

    trimmed[..digits_end]
        .parse()
        .map_err(|_| AbiError::UnparseableVersion(product_version.to_string()))
}

/// Map a macOS major version onto an interface revision.
///
/// Majors 16-25 were never shipped; seeing one means the detection is broken.
pub fn classify_major(major: u32) -> Result<AgxVersion, AbiError> {
    match major {
        m if m <= LAST_V13_MAJOR => Ok(AgxVersion::V13),
        m if m >= FIRST_V26_MAJOR => Ok(AgxVersion::V26),
        m => Err(AbiError::UnsupportedMacosVersion(m)),
    }
}

/// Query `source` and classify the result.
pub fn detect_version(source: &dyn VersionSource) -> Result<AgxVersion, AbiError> {
    let product_version = source.product_version()?;
    log::debug!("kern.osproductversion = {:?}", product_version);

    let major = parse_major(&product_version)?;
    classify_major(major)
}

/// Memoized interface revision.
///
/// Owned by whoever builds the device layer and handed to the selector and
/// reply lookups, rather than living in a global.
#[derive(Debug)]
pub struct VersionOracle<S = SysctlVersionSource> {
    source: S,
    cached: OnceLock<AgxVersion>,
}

impl VersionOracle<SysctlVersionSource> {
    /// Oracle backed by the running OS.
    pub fn system() -> Self {
        Self::new(SysctlVersionSource)
    }
}

impl VersionOracle<FixedVersionSource> {
    /// Oracle pinned to `version`; never queries anything.
    pub fn fixed(version: AgxVersion) -> Self {
        Self {
            source: FixedVersionSource::new(version.product_version()),
            cached: OnceLock::from(version),
        }
    }
}

impl<S: VersionSource> VersionOracle<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: OnceLock::new(),
        }
    }

    /// The active revision. Aborts via [`fatal`] if it cannot be determined.
    ///
    /// The source is queried at most once, even with concurrent callers.
    pub fn version(&self) -> AgxVersion {
        *self.cached.get_or_init(|| match self.detect() {
            Ok(version) => version,
            Err(err) => fatal(err),
        })
    }

    /// Like [`version`](Self::version) but hands the error back. Failures are
    /// not cached.
    pub fn try_version(&self) -> Result<AgxVersion, AbiError> {
        if let Some(version) = self.cached.get() {
            return Ok(*version);
        }
        let version = self.detect()?;
        Ok(*self.cached.get_or_init(|| version))
    }

    /// True once the revision has been computed.
    pub fn is_cached(&self) -> bool {
        self.cached.get().is_some()
    }

    fn detect(&self) -> Result<AgxVersion, AbiError> {
        let version = detect_version(&self.source)?;
        log::info!("Detected AGX interface revision: {}", version);
        Ok(version)
    }
}
