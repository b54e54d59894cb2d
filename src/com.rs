//! Scoped COM initialization.
//!
//! The setup API needs COM initialized on the calling thread.
//! [`ComGuard`] initializes it for as long as the guard lives and
//! uninitializes it on drop. COM objects borrow the guard, so they are
//! always released before it.

use windows_result::HRESULT;

use crate::error::{Error, RPC_E_CHANGED_MODE};

pub const COINIT_MULTITHREADED: u32 = 0x0;
pub const COINIT_APARTMENTTHREADED: u32 = 0x2;

/// Initialize with the multithreaded model, falling back to apartment
/// threading if the thread already runs in an apartment.
///
/// Any success, including `S_FALSE` for "already initialized", must be
/// balanced by one `CoUninitialize`.
#[cfg_attr(not(windows), allow(dead_code))]
fn initialize_with<F: FnMut(u32) -> HRESULT>(mut co_initialize: F) -> Result<(), Error> {
    let mut result = co_initialize(COINIT_MULTITHREADED);
    if result == RPC_E_CHANGED_MODE {
        result = co_initialize(COINIT_APARTMENTTHREADED);
    }
    if result.is_ok() { Ok(()) } else { Err(result.into()) }
}

#[cfg(windows)]
pub use guard::ComGuard;

#[cfg(windows)]
mod guard {
    use core::marker::PhantomData;

    use log::trace;

    use super::initialize_with;
    use crate::error::Error;

    /// Keeps COM initialized on the current thread.
    ///
    /// The guard is `!Send`: it has to be dropped on the thread that created it.
    ///
    /// ```rust
    /// # fn main() -> Result<(), findvs::Error> {
    /// let com = findvs::com::ComGuard::new()?;
    /// // use COM objects here
    /// drop(com);
    /// # Ok(()) }
    /// ```
    pub struct ComGuard {
        _thread: PhantomData<*mut ()>,
    }

    impl ComGuard {
        pub fn new() -> Result<Self, Error> {
            initialize_with(|mode| unsafe { CoInitializeEx(core::ptr::null(), mode) })?;
            trace!("COM initialized");
            Ok(Self {
                _thread: PhantomData,
            })
        }
    }

    impl Drop for ComGuard {
        fn drop(&mut self) {
            unsafe { CoUninitialize() };
            trace!("COM uninitialized");
        }
    }

    mod api {
        use windows_result::HRESULT;
        #[cfg(not(target_vendor = "win7"))]
        windows_link::link!("combase.dll" "system" fn CoInitializeEx(pvReserved: *const (), dwCoInit: u32) -> HRESULT);
        #[cfg(target_vendor = "win7")]
        windows_link::link!("ole32.dll" "system" fn CoInitializeEx(pvReserved: *const (), dwCoInit: u32) -> HRESULT);
        #[cfg(not(target_vendor = "win7"))]
        windows_link::link!("combase.dll" "system" fn CoUninitialize());
        #[cfg(target_vendor = "win7")]
        windows_link::link!("ole32.dll" "system" fn CoUninitialize());
    }
    use api::*;

}
