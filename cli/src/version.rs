use curve_cli_core::VersionProvider;

/// Version baked in at build time.
pub struct BuildVersion;

impl VersionProvider for BuildVersion {
    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }
}
