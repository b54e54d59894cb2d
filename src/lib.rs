//! Locate installed instances of Visual Studio and read product versions from executables.
//!
//! Instances are found through the Visual Studio setup-configuration COM API
//! ([`Microsoft.VisualStudio.Setup.Configuration`]). Each call asks the installer
//! once and returns owned [`InstanceRecord`]s. Nothing is cached and no COM
//! object outlives the call.
//!
//! ## Example
//!
//! ```rust
//! # #[cfg(windows)]
//! fn main() -> Result<(), findvs::Error> {
//!     for instance in findvs::enumerate()? {
//!         println!("{} {}", instance.display_name, instance.version);
//!         println!("    {}", instance.install_path.display());
//!     }
//!     Ok(())
//! }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! A system without the Visual Studio installer simply has no instances:
//! [`enumerate()`] returns an empty list, not an error.
//!
//! [`Microsoft.VisualStudio.Setup.Configuration`]: https://learn.microsoft.com/en-us/dotnet/api/microsoft.visualstudio.setup.configuration

// COM names follow the official documentation
#![allow(nonstandard_style)]
#![allow(clippy::upper_case_acronyms)]

pub mod com;
pub mod enumerate;
pub mod error;
pub mod marshal;
mod record;
pub mod version_info;

#[cfg(windows)]
mod defs;
#[cfg(windows)]
mod raw;
#[cfg(windows)]
mod setup;

pub use error::Error;
pub use record::{InstanceRecord, PackageRecord};
pub use windows_result::HRESULT;

#[cfg(windows)]
pub use setup::SetupConfiguration;
#[cfg(windows)]
pub use version_info::read_product_version;

/// Every installed instance of Visual Studio, in the installer's order.
///
/// COM is initialized on the calling thread for the duration of the call.
/// Any failing query fails the whole call.
#[cfg(windows)]
pub fn enumerate() -> Result<Vec<InstanceRecord>, Error> {
    let com = com::ComGuard::new()?;
    enumerate::enumerate_with(|| SetupConfiguration::new(&com))
}

/// Instances that have every one of `ids` installed.
///
/// ```rust
/// # fn main() -> Result<(), findvs::Error> {
/// let msvc = findvs::find_with_all(&["Microsoft.VisualStudio.Component.VC.Tools.x86.x64"])?;
/// # Ok(()) }
/// ```
#[cfg(windows)]
pub fn find_with_all<S: AsRef<str>>(ids: &[S]) -> Result<Vec<InstanceRecord>, Error> {
    let mut instances = enumerate()?;
    instances.retain(|instance| instance.has_all_packages(ids));
    Ok(instances)
}

/// Instances that have at least one of `ids` installed.
#[cfg(windows)]
pub fn find_with_any<S: AsRef<str>>(ids: &[S]) -> Result<Vec<InstanceRecord>, Error> {
    let mut instances = enumerate()?;
    instances.retain(|instance| instance.has_any_package(ids));
    Ok(instances)
}
