//! Vtable layouts of the setup-configuration COM interfaces.
//!
//! Only the methods this crate calls have precise signatures. The remaining
//! slots keep their position with untyped pointer arguments.

use core::ffi::c_void;

use windows_core::{GUID, IUnknown, IUnknown_Vtbl};
use windows_result::HRESULT;
use windows_strings::BSTR;

use crate::defs::*;
use crate::error::{E_POINTER, OkHresult};

macro_rules! com_interface {
    ($(
        #[interface($iid:literal)]
        pub unsafe interface $interface:ident: $parent:ident {
            $(
                fn $method:ident(&self $(, $arg:ident:$ty:ty)*$(,)?) -> $rtn:ty;
            )*
        }
    )+) => {
        use crate::raw as interface;
        $(
        #[repr(transparent)]
        #[derive(Clone)]
        pub struct $interface($parent);
        #[allow(unused)]
        impl $interface {
            $(
            #[inline(always)]
            pub unsafe fn $method(&self, $($arg: $ty,)*) -> $rtn {
                unsafe {
                    let (vtable, raw) = Interface::vtable(self);
                    ((**vtable).$method)(raw, $($arg,)*)
                }
            }
            )*
        }

        unsafe impl Interface for $interface {
            const IID: GUID = GUID::from_u128($iid);
            type Vtable = vtable::$interface;
        }
        )*

        #[allow(dead_code)]
        mod vtable {
            use super::*;
            #[allow(unused_imports)]
            use crate::raw as interface;
            type IUnknown = IUnknown_Vtbl;

            $(
                #[repr(C)]
                pub struct $interface {
                    pub base__: $parent,
                    $(
                        pub $method: unsafe extern "system" fn(this: *mut c_void, $($arg:$ty,)*) -> $rtn,
                    )*
                }
            )+
        }
    };
}

com_interface!(
    #[interface(0x_42843719_db4c_46c2_8e7c_64f1816efd5b)]
    pub unsafe interface ISetupConfiguration: IUnknown {
        fn EnumInstances(&self, ppEnumInstances: *mut Option<interface::IEnumSetupInstances>) -> HRESULT;
        fn GetInstanceForCurrentProcess(&self, ppInstance: *mut Option<interface::ISetupInstance>) -> HRESULT;
        fn GetInstanceForPath(&self, wzPath: *const u16, ppInstance: *mut Option<interface::ISetupInstance>) -> HRESULT;
    }

    #[interface(0x_26aab78c_4a60_49d6_af3b_3c35bc93365d)]
    pub unsafe interface ISetupConfiguration2: ISetupConfiguration {
        fn EnumAllInstances(&self, ppEnumInstances: *mut Option<interface::IEnumSetupInstances>) -> HRESULT;
    }

    #[interface(0x_6380bcff_41d3_4b2e_8b2e_bf8a6810c848)]
    pub unsafe interface IEnumSetupInstances: IUnknown {
        fn Next(
            &self,
            celt: u32,
            rgelt: *mut Option<interface::ISetupInstance>,
            pceltFetched: *mut u32,
        ) -> HRESULT;
    }

    #[interface(0x_b41463c3_8866_43b5_bc33_2b0676f7f42e)]
    pub unsafe interface ISetupInstance: IUnknown {
        fn GetInstanceId(&self, pbstrInstanceId: *mut BSTR) -> HRESULT;
        fn GetInstallDate(&self, pInstallDate: *mut c_void) -> HRESULT;
        fn GetInstallationName(&self, pbstrInstallationName: *mut BSTR) -> HRESULT;
        fn GetInstallationPath(&self, pbstrInstallationPath: *mut BSTR) -> HRESULT;
        fn GetInstallationVersion(&self, pbstrInstallationVersion: *mut BSTR) -> HRESULT;
        fn GetDisplayName(&self, lcid: LCID, pbstrDisplayName: *mut BSTR) -> HRESULT;
        fn GetDescription(&self, lcid: LCID, pbstrDescription: *mut BSTR) -> HRESULT;
        fn ResolvePath(&self, pwszRelativePath: *const u16, pbstrAbsolutePath: *mut BSTR) -> HRESULT;
    }

    #[interface(0x_89143c9a_05af_49b0_b717_72e218a2185c)]
    pub unsafe interface ISetupInstance2: ISetupInstance {
        fn GetState(&self, pState: *mut i32) -> HRESULT;
        fn GetPackages(&self, ppsaPackages: *mut *mut SAFEARRAY) -> HRESULT;
        fn GetProduct(&self, ppPackage: *mut *mut c_void) -> HRESULT;
        fn GetProductPath(&self, pbstrProductPath: *mut BSTR) -> HRESULT;
        fn GetErrors(&self, ppErrorState: *mut *mut c_void) -> HRESULT;
        fn IsLaunchable(&self, pfIsLaunchable: *mut i16) -> HRESULT;
        fn IsComplete(&self, pfIsComplete: *mut i16) -> HRESULT;
        fn GetProperties(&self, ppProperties: *mut *mut c_void) -> HRESULT;
        fn GetEnginePath(&self, pbstrEnginePath: *mut BSTR) -> HRESULT;
    }

    #[interface(0xda8d8a16_b2b6_4487_a2f1_594ccccd6bf5)]
    pub unsafe interface ISetupPackageReference: IUnknown {
        fn GetId(&self, pbstrId: *mut BSTR) -> HRESULT;
        fn GetVersion(&self, pbstrVersion: *mut BSTR) -> HRESULT;
        fn GetChip(&self, pbstrChip: *mut BSTR) -> HRESULT;
        fn GetLanguage(&self, pbstrLanguage: *mut BSTR) -> HRESULT;
        fn GetBranch(&self, pbstrBranch: *mut BSTR) -> HRESULT;
        fn GetType(&self, pbstrType: *mut BSTR) -> HRESULT;
    }
);

pub const SETUP_CONFIGURATION_CLSID: GUID = GUID::from_u128(0x177F0C4A_1CD3_4DE7_A32C_71DBBB9FA36D);

pub(crate) unsafe trait Interface: Sized {
    const IID: GUID;
    type Vtable;

    #[inline(always)]
    unsafe fn vtable(&self) -> (*const *mut Self::Vtable, *mut c_void) {
        unsafe {
            let raw = *(core::ptr::from_ref(self).cast::<*mut c_void>());
            let vtable = raw.cast::<*mut Self::Vtable>();
            (vtable, raw)
        }
    }

    /// `QueryInterface` for `I`.
    #[inline(always)]
    fn cast<I: Interface>(&self) -> Result<I, HRESULT> {
        unsafe {
            let (vtable, raw) = self.vtable();
            let vtable = vtable.cast::<*mut IUnknown_Vtbl>();
            let mut interface = None;
            ((**vtable).QueryInterface)(raw, &I::IID, core::ptr::from_mut(&mut interface).cast())
                .ok_hresult()?;
            interface.ok_or(E_POINTER)
        }
    }

    /// Takes ownership of one reference.
    ///
    /// # Safety
    ///
    /// `raw` must be a non-null pointer to an object implementing this interface.
    unsafe fn from_raw(raw: *mut c_void) -> Self {
        unsafe { core::mem::transmute_copy(&raw) }
    }
}
