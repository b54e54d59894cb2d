//! The setup-configuration COM objects behind the `enumerate` traits.
//!
//! Every handle here owns one COM reference and releases it on drop.
//! Strings are copied out of their `BSTR` and the `BSTR` freed straight away.
//!
//! Each handle borrows the [`ComGuard`] it was created under, so none of them
//! can be released after COM is uninitialized.

use core::marker::PhantomData;
use core::ptr::null_mut as null;
use std::path::PathBuf;

use windows_result::HRESULT;
use windows_strings::BSTR;

use crate::com::ComGuard;
use crate::defs::*;
use crate::enumerate::{InstanceCursor, InstanceHandle, PackageHandle, PackageReference, SetupSource};
use crate::error::{AssertOk, E_POINTER, E_UNEXPECTED, OkHresult, S_FALSE};
use crate::marshal::{path_from_bstr, string_from_bstr};
use crate::raw::*;

/// Borrow of the guard a handle was created under.
///
/// The `Drop` impl makes dropping a handle count as a use of the borrow, so a
/// handle can't be released after its guard.
struct Com<'com>(PhantomData<&'com ComGuard>);

impl Com<'_> {
    const fn new() -> Self {
        Self(PhantomData)
    }
}

impl Drop for Com<'_> {
    fn drop(&mut self) {}
}

/// The entry point of the setup API.
///
/// Borrows the [`ComGuard`] it was created under:
///
/// ```rust,compile_fail
/// # fn main() -> Result<(), findvs::Error> {
/// let com = findvs::com::ComGuard::new()?;
/// let setup = findvs::SetupConfiguration::new(&com)?;
/// drop(com); // COM can't be uninitialized while `setup` holds a reference
/// # Ok(()) }
/// ```
pub struct SetupConfiguration<'com> {
    raw: ISetupConfiguration,
    _com: Com<'com>,
}

impl<'com> SetupConfiguration<'com> {
    /// Create the in-process `SetupConfiguration` class.
    ///
    /// Fails with `REGDB_E_CLASSNOTREG` when the Visual Studio installer has
    /// never been installed.
    pub fn new(_guard: &'com ComGuard) -> Result<Self, HRESULT> {
        unsafe {
            let mut interface = null();
            CoCreateInstance(
                &SETUP_CONFIGURATION_CLSID,
                null(),
                CLSCTX_INPROC_SERVER,
                &ISetupConfiguration::IID,
                &mut interface,
            )
            .ok_hresult()?;
            if interface.is_null() {
                debug_assert!(!interface.is_null());
                return Err(E_POINTER);
            }
            Ok(Self {
                raw: ISetupConfiguration::from_raw(interface),
                _com: Com::new(),
            })
        }
    }
}

impl<'com> SetupSource for SetupConfiguration<'com> {
    type Instances = EnumSetupInstances<'com>;

    /// All instances, including incomplete and unlaunchable ones.
    fn instances(&self) -> Result<EnumSetupInstances<'com>, HRESULT> {
        unsafe {
            let setup: ISetupConfiguration2 = self.raw.cast()?;
            let mut instances = None;
            setup.EnumAllInstances(&mut instances).ok_hresult()?;
            Ok(EnumSetupInstances {
                raw: instances.assert_ok()?,
                _com: Com::new(),
            })
        }
    }
}

pub struct EnumSetupInstances<'com> {
    raw: IEnumSetupInstances,
    _com: Com<'com>,
}

impl<'com> InstanceCursor for EnumSetupInstances<'com> {
    type Instance = SetupInstance<'com>;

    fn next_instance(&mut self) -> Result<Option<SetupInstance<'com>>, HRESULT> {
        unsafe {
            let mut instance = None;
            let mut fetched = 0;
            let hresult = self.raw.Next(1, &mut instance, &mut fetched);
            if hresult.is_err() {
                Err(hresult)
            } else if hresult == S_FALSE || fetched == 0 {
                Ok(None)
            } else {
                let raw = instance.assert_ok()?;
                Ok(Some(SetupInstance {
                    raw,
                    _com: Com::new(),
                }))
            }
        }
    }
}

pub struct SetupInstance<'com> {
    raw: ISetupInstance,
    _com: Com<'com>,
}

/// Call a getter that writes a `BSTR` out-parameter.
fn get_bstr(getter: impl FnOnce(*mut BSTR) -> HRESULT) -> Result<BSTR, HRESULT> {
    let mut bstr = BSTR::new();
    getter(core::ptr::from_mut(&mut bstr)).ok_hresult().map(|_| bstr)
}

impl SetupInstance<'_> {
    fn instance2(&self) -> Result<ISetupInstance2, HRESULT> {
        self.raw.cast()
    }
}

impl<'com> InstanceHandle for SetupInstance<'com> {
    type Package = PackageElement<'com>;
    type Packages = SafeArray<'com, PackageElement<'com>>;

    fn instance_id(&self) -> Result<String, HRESULT> {
        get_bstr(|id| unsafe { self.raw.GetInstanceId(id) }).map(string_from_bstr)
    }

    fn display_name(&self) -> Result<String, HRESULT> {
        get_bstr(|name| unsafe { self.raw.GetDisplayName(LOCALE_USER_DEFAULT, name) })
            .map(string_from_bstr)
    }

    fn installation_version(&self) -> Result<String, HRESULT> {
        get_bstr(|version| unsafe { self.raw.GetInstallationVersion(version) })
            .map(string_from_bstr)
    }

    fn installation_path(&self) -> Result<PathBuf, HRESULT> {
        get_bstr(|path| unsafe { self.raw.GetInstallationPath(path) }).map(path_from_bstr)
    }

    fn engine_path(&self) -> Result<PathBuf, HRESULT> {
        let instance = self.instance2()?;
        get_bstr(|path| unsafe { instance.GetEnginePath(path) }).map(path_from_bstr)
    }

    fn packages(&self) -> Result<SafeArray<'com, PackageElement<'com>>, HRESULT> {
        let instance = self.instance2()?;
        unsafe {
            let mut packages = null();
            instance.GetPackages(&mut packages).ok_hresult()?;
            if packages.is_null() {
                debug_assert!(!packages.is_null());
                Err(E_POINTER)
            } else {
                SafeArray::from_raw(packages)
            }
        }
    }
}

/// An element of an instance's package array.
///
/// The array holds `IUnknown` pointers, so each element is queried for
/// `ISetupPackageReference` once before its fields are read.
#[repr(transparent)]
pub struct PackageElement<'com> {
    raw: ISetupPackageReference,
    _com: Com<'com>,
}

impl<'com> PackageHandle for PackageElement<'com> {
    type Reference = SetupPackageReference<'com>;

    fn reference(&self) -> Result<SetupPackageReference<'com>, HRESULT> {
        Ok(SetupPackageReference {
            raw: self.raw.cast()?,
            _com: Com::new(),
        })
    }
}

pub struct SetupPackageReference<'com> {
    raw: ISetupPackageReference,
    _com: Com<'com>,
}

impl PackageReference for SetupPackageReference<'_> {
    fn id(&self) -> Result<String, HRESULT> {
        get_bstr(|id| unsafe { self.raw.GetId(id) }).map(string_from_bstr)
    }

    fn version(&self) -> Result<String, HRESULT> {
        get_bstr(|version| unsafe { self.raw.GetVersion(version) }).map(string_from_bstr)
    }

    fn kind(&self) -> Result<String, HRESULT> {
        get_bstr(|kind| unsafe { self.raw.GetType(kind) }).map(string_from_bstr)
    }
}

/// An owned, locked, one-dimensional `SAFEARRAY`.
///
/// Derefs to a slice of `T`. Drop unlocks and destroys the array, which
/// also releases the COM references it holds.
pub struct SafeArray<'com, T> {
    raw: *mut SAFEARRAY,
    _item: PhantomData<*mut T>,
    _com: Com<'com>,
}

impl<T> SafeArray<'_, T> {
    pub fn as_slice(&self) -> &[T] {
        unsafe {
            let len = (*self.raw).rgsabound[0].cElements as usize;
            if len == 0 {
                return &[];
            }
            core::slice::from_raw_parts((*self.raw).pvData.cast::<T>(), len)
        }
    }

    /// Takes ownership of `raw`, destroying it even if it can't be locked.
    ///
    /// # Safety
    ///
    /// `raw` must be a valid `SAFEARRAY` whose elements have the layout of `T`.
    unsafe fn from_raw(raw: *mut SAFEARRAY) -> Result<Self, HRESULT> {
        unsafe {
            if let Err(hresult) = SafeArrayLock(raw).ok_hresult() {
                let _ = SafeArrayDestroy(raw);
                return Err(hresult);
            }
            let array = Self {
                raw,
                _item: PhantomData,
                _com: Com::new(),
            };
            if (*raw).cDims != 1 {
                debug_assert_eq!((*raw).cDims, 1);
                return Err(E_UNEXPECTED);
            }
            Ok(array)
        }
    }
}

impl<T> core::ops::Deref for SafeArray<'_, T> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> Drop for SafeArray<'_, T> {
    fn drop(&mut self) {
        unsafe {
            let _ = SafeArrayUnlock(self.raw);
            let _ = SafeArrayDestroy(self.raw);
        }
    }
}

mod api {
    use super::*;
    use windows_core::GUID;
    #[cfg(not(target_vendor = "win7"))]
    windows_link::link!("combase.dll" "system" fn CoCreateInstance(
        rclsid: *const GUID,
        pUnkOuter: *mut core::ffi::c_void,
        dwClsContext: u32,
        riid: *const GUID,
        ppv: *mut *mut core::ffi::c_void,
    ) -> HRESULT);
    #[cfg(target_vendor = "win7")]
    windows_link::link!("ole32.dll" "system" fn CoCreateInstance(
        rclsid: *const GUID,
        pUnkOuter: *mut core::ffi::c_void,
        dwClsContext: u32,
        riid: *const GUID,
        ppv: *mut *mut core::ffi::c_void,
    ) -> HRESULT);
    windows_link::link!("oleaut32.dll" "system" fn SafeArrayLock(psa: *const SAFEARRAY) -> HRESULT);
    windows_link::link!("oleaut32.dll" "system" fn SafeArrayUnlock(psa: *const SAFEARRAY) -> HRESULT);
    windows_link::link!("oleaut32.dll" "system" fn SafeArrayDestroy(psa: *const SAFEARRAY) -> HRESULT);
}
use api::*;
