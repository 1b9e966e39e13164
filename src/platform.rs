/// Release asset platforms the Core Tools feed publishes builds for.
///
/// `Unknown` is the bucket for hosts without a published build; it matches no
/// asset, so resolution on such hosts comes up empty instead of guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    WinX64,
    WinX86,
    OsxX64,
    LinuxX64,
    Unknown,
}

impl Platform {
    pub fn current() -> Platform {
        match (std::env::consts::OS, std::env::consts::ARCH) {
            ("windows", "x86") => Platform::WinX86,
            ("windows", _) => Platform::WinX64,
            ("macos", _) => Platform::OsxX64,
            ("linux", _) => Platform::LinuxX64,
            (os, arch) => {
                tracing::warn!("No Core Tools build is published for {}/{}", os, arch);
                Platform::Unknown
            }
        }
    }

    /// Asset file name prefix published for this platform.
    pub fn asset_prefix(&self) -> Option<&'static str> {
        match self {
            Platform::WinX64 => Some("Azure.Functions.Cli.win-x64"),
            Platform::WinX86 => Some("Azure.Functions.Cli.win-x86"),
            Platform::OsxX64 => Some("Azure.Functions.Cli.osx-x64"),
            Platform::LinuxX64 => Some("Azure.Functions.Cli.linux-x64"),
            Platform::Unknown => None,
        }
    }

    /// Whether a release asset with this name is downloadable on this platform.
    /// Matches `<prefix>*.zip`, case-insensitively.
    pub fn matches_asset(&self, asset_name: &str) -> bool {
        let Some(prefix) = self.asset_prefix() else {
            return false;
        };
        let name = asset_name.to_ascii_lowercase();
        name.starts_with(&prefix.to_ascii_lowercase()) && name.ends_with(".zip")
    }
}
