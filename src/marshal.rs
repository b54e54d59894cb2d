//! Copying platform wide strings into owned Rust values.

/// Decode an explicit-length UTF-16 slice.
///
/// The slice is not scanned for a terminator, embedded NULs are kept.
/// Unpaired surrogates are replaced with U+FFFD.
pub fn string_from_wide(wide: &[u16]) -> String {
    String::from_utf16_lossy(wide)
}

/// Strip the NUL padding some fixed-size resource slots carry at the end.
pub fn trim_trailing_nuls(wide: &[u16]) -> &[u16] {
    let mut len = wide.len();
    while len > 0 && wide[len - 1] == 0 {
        len -= 1;
    }
    &wide[..len]
}

#[cfg(windows)]
pub(crate) use bstr::*;

#[cfg(windows)]
mod bstr {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    use std::path::PathBuf;

    use windows_strings::BSTR;

    use super::string_from_wide;

    /// Copy a `BSTR` out and free it.
    ///
    /// Exactly `SysStringLen` units are copied, a `BSTR` may hold embedded NULs.
    pub(crate) fn string_from_bstr(bstr: BSTR) -> String {
        let string = string_from_wide(&bstr);
        drop(bstr);
        string
    }

    /// Like [`string_from_bstr`] but keeps unpaired surrogates, which paths may contain.
    pub(crate) fn path_from_bstr(bstr: BSTR) -> PathBuf {
        let path = OsString::from_wide(&bstr);
        drop(bstr);
        path.into()
    }
}
