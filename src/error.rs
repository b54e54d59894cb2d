use core::fmt;

use windows_result::HRESULT;

pub const S_OK: HRESULT = HRESULT(0);
pub const S_FALSE: HRESULT = HRESULT(0x1);
pub const E_POINTER: HRESULT = HRESULT(0x80004003_u32 as i32);
pub const E_INVALIDARG: HRESULT = HRESULT(0x80070057_u32 as i32);
pub const E_UNEXPECTED: HRESULT = HRESULT(0x8000FFFF_u32 as i32);
/// Returned by `CoCreateInstance` when no provider has registered the class.
pub const REGDB_E_CLASSNOTREG: HRESULT = HRESULT(0x80040154_u32 as i32);
/// COM was already initialized on this thread with a different concurrency model.
pub const RPC_E_CHANGED_MODE: HRESULT = HRESULT(0x80010106_u32 as i32);

/// A failed platform call.
///
/// Carries the failing `HRESULT` and displays it the way the status is usually
/// quoted in Windows tooling, e.g. `Error 80070002`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Error {
    code: HRESULT,
}

impl Error {
    /// Creates an error from a failure status.
    ///
    /// Building an error from a success code is a bug in the caller.
    /// It panics in debug builds and still yields an error value in release builds.
    pub fn from_status(code: HRESULT) -> Self {
        debug_assert!(code.is_err(), "success status {:08x} used as an error", code.0 as u32);
        Self { code }
    }

    pub fn code(&self) -> HRESULT {
        self.code
    }
}

impl From<HRESULT> for Error {
    fn from(code: HRESULT) -> Self {
        Self::from_status(code)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        core::write!(f, "Error {:08x}", self.code.0 as u32)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        core::write!(f, "Error({:#010x})", self.code.0 as u32)
    }
}

impl std::error::Error for Error {}

pub(crate) trait OkHresult {
    fn ok_hresult(self) -> Result<(), HRESULT>;
}

impl OkHresult for HRESULT {
    fn ok_hresult(self) -> Result<(), HRESULT> {
        if self.is_ok() { Ok(()) } else { Err(self) }
    }
}

pub(crate) trait AssertOk {
    type T;
    fn assert_ok(self) -> Result<Self::T, HRESULT>;
}

impl<T> AssertOk for Option<T> {
    type T = T;

    /// Use this where an API that returned success must also have written its out pointer.
    ///
    /// Panics in debug mode, returns `Err(E_POINTER)` in release mode.
    #[inline(always)]
    fn assert_ok(self) -> Result<T, HRESULT> {
        debug_assert!(self.is_some());
        self.ok_or(E_POINTER)
    }
}
