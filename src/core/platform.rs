//! Host platform capabilities

/// How the ramdisk image is opened on this host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    /// The image can be attached as a filesystem (`hdiutil`)
    NativeMount,
    /// The image is edited through `hfsplus` primitives
    ExternalPrimitives,
}

impl HostPlatform {
    /// Platform of the running host
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            Self::NativeMount
        } else {
            Self::ExternalPrimitives
        }
    }

    /// Program used to manipulate the ramdisk image
    pub fn image_tool(self) -> &'static str {
        match self {
            Self::NativeMount => "hdiutil",
            Self::ExternalPrimitives => "hfsplus",
        }
    }
}
