// Windows.Win32.System.Com.SAFEARRAYBOUND
#[repr(C)]
pub struct SAFEARRAYBOUND {
    pub cElements: u32,
    pub lLbound: i32,
}

// Windows.Win32.System.Com.SAFEARRAY
#[repr(C)]
pub struct SAFEARRAY {
    pub cDims: u16,
    pub fFeatures: u16,
    pub cbElements: u32,
    pub cLocks: u32,
    pub pvData: *mut (),
    pub rgsabound: [SAFEARRAYBOUND; 1],
}

pub type LCID = u32;

pub const CLSCTX_INPROC_SERVER: u32 = 0x1;
/// Display names are requested in the user's default locale.
pub const LOCALE_USER_DEFAULT: LCID = 0x400;
