//! Reading the product version from a file's version resource.
//!
//! The resource is loaded and queried by the OS (`version.dll`); this module
//! only picks which entry to ask for. The first language/codepage pair in the
//! translation table selects the string table, and `ProductVersion` is read
//! from it.

use crate::marshal::{string_from_wide, trim_trailing_nuls};

pub const TRANSLATION: &str = r"\VarFileInfo\Translation";

/// A loaded version-information block.
pub trait VersionBlock {
    /// A binary value such as the translation table, measured in bytes.
    fn query_value(&self, sub_block: &str) -> Option<&[u8]>;
    /// A string value, measured in UTF-16 code units.
    fn query_string(&self, sub_block: &str) -> Option<&[u16]>;
}

/// The string-table path of `ProductVersion` for one language/codepage pair.
///
/// ```
/// assert_eq!(
///     findvs::version_info::translation_key(0x0409, 0x04b0),
///     r"\StringFileInfo\040904b0\ProductVersion",
/// );
/// ```
pub fn translation_key(language: u16, codepage: u16) -> String {
    format!(r"\StringFileInfo\{language:04x}{codepage:04x}\ProductVersion")
}

/// The first (language, codepage) entry of a translation table.
fn first_translation(table: &[u8]) -> Option<(u16, u16)> {
    match *table {
        [l0, l1, c0, c1, ..] => Some((u16::from_le_bytes([l0, l1]), u16::from_le_bytes([c0, c1]))),
        _ => None,
    }
}

/// Look up `ProductVersion` under the block's first translation.
///
/// Returns `None` when the block has no translation table or no such string.
pub fn product_version<B: VersionBlock + ?Sized>(block: &B) -> Option<String> {
    let (language, codepage) = first_translation(block.query_value(TRANSLATION)?)?;
    let version = block.query_string(&translation_key(language, codepage))?;
    Some(string_from_wide(trim_trailing_nuls(version)))
}

#[cfg(windows)]
pub use os::read_product_version;

#[cfg(windows)]
mod os {
    use core::ffi::c_void;
    use core::ptr::null_mut;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;

    use log::debug;

    use super::{VersionBlock, product_version};
    use crate::error::{E_INVALIDARG, Error};

    /// Read the `ProductVersion` string embedded in `path`.
    ///
    /// Files without a version resource, or whose resource lacks a translation
    /// table or a `ProductVersion` entry, give `Ok(None)`. The only error is a
    /// path containing an interior NUL.
    pub fn read_product_version<P: AsRef<Path>>(path: P) -> Result<Option<String>, Error> {
        let path = path.as_ref();
        let wide = to_wide_nul(path)?;
        let Some(info) = FileVersionInfo::load(&wide) else {
            debug!("no version resource in {}", path.display());
            return Ok(None);
        };
        let version = product_version(&info);
        if version.is_none() {
            debug!("no ProductVersion entry in {}", path.display());
        }
        Ok(version)
    }

    fn to_wide_nul(path: &Path) -> Result<Vec<u16>, Error> {
        let mut wide: Vec<u16> = path.as_os_str().encode_wide().collect();
        if wide.contains(&0) {
            return Err(E_INVALIDARG.into());
        }
        wide.push(0);
        Ok(wide)
    }

    /// An owned copy of a file's version resource.
    struct FileVersionInfo {
        // u32 storage keeps the block DWORD aligned, which its u16 strings rely on.
        data: Vec<u32>,
    }

    impl FileVersionInfo {
        fn load(path: &[u16]) -> Option<Self> {
            unsafe {
                let mut handle = 0;
                let size = GetFileVersionInfoSizeW(path.as_ptr(), &mut handle);
                if size == 0 {
                    return None;
                }
                let mut data = vec![0_u32; (size as usize).div_ceil(4)];
                if GetFileVersionInfoW(path.as_ptr(), 0, size, data.as_mut_ptr().cast()) == 0 {
                    return None;
                }
                Some(Self { data })
            }
        }

        /// Returns the raw pointer and length `VerQueryValueW` reports.
        fn query(&self, sub_block: &str) -> Option<(*const c_void, usize)> {
            let sub_block: Vec<u16> = sub_block.encode_utf16().chain([0]).collect();
            let mut value = null_mut();
            let mut len = 0;
            let found = unsafe {
                VerQueryValueW(
                    self.data.as_ptr().cast(),
                    sub_block.as_ptr(),
                    &mut value,
                    &mut len,
                )
            };
            if found == 0 || value.is_null() {
                None
            } else {
                Some((value.cast_const(), len as usize))
            }
        }
    }

    impl VersionBlock for FileVersionInfo {
        fn query_value(&self, sub_block: &str) -> Option<&[u8]> {
            let (value, len) = self.query(sub_block)?;
            // SAFETY: the value points into `self.data`, which outlives the borrow.
            Some(unsafe { core::slice::from_raw_parts(value.cast::<u8>(), len) })
        }

        fn query_string(&self, sub_block: &str) -> Option<&[u16]> {
            let (value, len) = self.query(sub_block)?;
            // SAFETY: as above. String values are counted in characters.
            Some(unsafe { core::slice::from_raw_parts(value.cast::<u16>(), len) })
        }
    }

    mod api {
        use core::ffi::c_void;
        windows_link::link!("version.dll" "system" fn GetFileVersionInfoSizeW(lptstrFilename: *const u16, lpdwHandle: *mut u32) -> u32);
        windows_link::link!("version.dll" "system" fn GetFileVersionInfoW(lptstrFilename: *const u16, dwHandle: u32, dwLen: u32, lpData: *mut c_void) -> i32);
        windows_link::link!("version.dll" "system" fn VerQueryValueW(pBlock: *const c_void, lpSubBlock: *const u16, lplpBuffer: *mut *mut c_void, puLen: *mut u32) -> i32);
    }
    use api::*;

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeBlock {
        values: HashMap<String, Vec<u8>>,
        strings: HashMap<String, Vec<u16>>,
    }

    impl FakeBlock {
        fn translation(mut self, pairs: &[(u16, u16)]) -> Self {
            let table = pairs
                .iter()
                .flat_map(|(language, codepage)| {
                    language.to_le_bytes().into_iter().chain(codepage.to_le_bytes())
                })
                .collect();
            self.values.insert(TRANSLATION.into(), table);
            self
        }

        fn string(mut self, key: String, value: &str) -> Self {
            self.strings.insert(key, value.encode_utf16().collect());
            self
        }
    }

    impl VersionBlock for FakeBlock {
        fn query_value(&self, sub_block: &str) -> Option<&[u8]> {
            self.values.get(sub_block).map(Vec::as_slice)
        }
        fn query_string(&self, sub_block: &str) -> Option<&[u16]> {
            self.strings.get(sub_block).map(Vec::as_slice)
        }
    }

    #[test]
    fn key_is_fixed_width_hex() {
        assert_eq!(translation_key(0x0409, 0x04b0), r"\StringFileInfo\040904b0\ProductVersion");
        assert_eq!(translation_key(0, 0), r"\StringFileInfo\00000000\ProductVersion");
        assert_eq!(translation_key(0xffff, 0x1), r"\StringFileInfo\ffff0001\ProductVersion");
    }

    #[test]
    fn strips_nul_padding() {
        let block = FakeBlock::default()
            .translation(&[(0x0409, 0x04b0)])
            .string(translation_key(0x0409, 0x04b0), "1.2.3.4\0\0");
        assert_eq!(product_version(&block).as_deref(), Some("1.2.3.4"));
    }

    #[test]
    fn uses_first_translation_only() {
        let block = FakeBlock::default()
            .translation(&[(0x0407, 0x04e4), (0x0409, 0x04b0)])
            .string(translation_key(0x0407, 0x04e4), "14.0.24215.1")
            .string(translation_key(0x0409, 0x04b0), "99.0");
        assert_eq!(product_version(&block).as_deref(), Some("14.0.24215.1"));

        let block = FakeBlock::default()
            .translation(&[(0x0407, 0x04e4), (0x0409, 0x04b0)])
            .string(translation_key(0x0409, 0x04b0), "99.0");
        assert_eq!(product_version(&block), None);
    }

    #[test]
    fn absent_without_metadata() {
        assert_eq!(product_version(&FakeBlock::default()), None);

        let no_table = FakeBlock::default().string(translation_key(0x0409, 0x04b0), "1.0");
        assert_eq!(product_version(&no_table), None);

        let mut short_table = FakeBlock::default();
        short_table.values.insert(TRANSLATION.into(), vec![0x09, 0x04]);
        assert_eq!(product_version(&short_table), None);

        let no_string = FakeBlock::default().translation(&[(0x0409, 0x04b0)]);
        assert_eq!(product_version(&no_string), None);
    }
}
