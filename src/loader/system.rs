//! Windows module loader.
//!
//! Loads modules with `LOAD_LIBRARY_AS_DATAFILE`, which maps the image for
//! resource access only: no relocations, no imports resolved, no `DllMain`.
use std::ffi::OsStr;
use std::iter::once;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;

use windows::core::{Error, PCWSTR, PWSTR};
use windows::Win32::Foundation::{BOOL, FALSE, HANDLE, HMODULE};
use windows::Win32::System::LibraryLoader::{
    EnumResourceNamesW, FreeLibrary, LoadLibraryExW, LOAD_LIBRARY_AS_DATAFILE,
};

use super::{ModuleLoader, ResourceView};
use crate::error::ErrorCode;
use crate::models::ResourceType;

const FACILITY_WIN32_MASK: u32 = 0xFFFF_0000;
const FACILITY_WIN32_PREFIX: u32 = 0x8007_0000;

/// Loader backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLoader;

impl ModuleLoader for SystemLoader {
    type View = SystemView;

    fn open_resource_view(&self, path: &Path) -> Result<Self::View, ErrorCode> {
        let wide = to_wide(path.as_os_str());
        let module = unsafe {
            LoadLibraryExW(PCWSTR(wide.as_ptr()), HANDLE::default(), LOAD_LIBRARY_AS_DATAFILE)
        }
        .map_err(|e| win32_code(&e))?;
        Ok(SystemView { module })
    }

    fn name(&self) -> &'static str {
        "system"
    }
}

/// A module mapped as a data file; unmapped on drop
#[derive(Debug)]
pub struct SystemView {
    module: HMODULE,
}

impl ResourceView for SystemView {
    fn has_resource_of_type(&mut self, kind: ResourceType) -> Result<bool, ErrorCode> {
        let mut found = false;
        // MAKEINTRESOURCE
        let kind = PCWSTR(usize::from(kind.id()) as *const u16);
        let result = unsafe {
            EnumResourceNamesW(
                self.module,
                kind,
                Some(stop_at_first),
                &mut found as *mut bool as isize,
            )
        };

        if found {
            return Ok(true);
        }
        match result {
            Ok(()) => Ok(false),
            Err(err) => {
                let code = win32_code(&err);
                if code.means_absent() {
                    Ok(false)
                } else {
                    Err(code)
                }
            }
        }
    }
}

impl Drop for SystemView {
    fn drop(&mut self) {
        if let Err(err) = unsafe { FreeLibrary(self.module) } {
            log::warn!("FreeLibrary failed: {}", win32_code(&err));
        }
    }
}

unsafe extern "system" fn stop_at_first(
    _module: HMODULE,
    _kind: PCWSTR,
    _name: PWSTR,
    found: isize,
) -> BOOL {
    *(found as *mut bool) = true;
    FALSE
}

fn to_wide(value: &OsStr) -> Vec<u16> {
    value.encode_wide().chain(once(0)).collect()
}

fn win32_code(err: &Error) -> ErrorCode {
    let hresult = err.code().0 as u32;
    if hresult & FACILITY_WIN32_MASK == FACILITY_WIN32_PREFIX {
        ErrorCode(hresult & 0xFFFF)
    } else {
        ErrorCode(hresult)
    }
}
