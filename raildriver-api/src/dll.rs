//! Backend bound to the simulator's RailDriver plugin library
//!
//! Train Simulator ships the plugin as `raildriver64.dll` (and a 32-bit
//! `raildriver.dll`) under `steamapps/common/railworks/plugins`. The library
//! is loaded at runtime and its five entry points are resolved once.

use std::ffi::{c_char, c_float, c_int, CStr};
use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;
use parking_lot::Mutex;

use crate::driver::RawDriver;
use crate::error::{ApiError, Result};
use crate::value::ValueKind;

type GetStringFn = unsafe extern "C" fn() -> *const c_char;
type GetValueFn = unsafe extern "C" fn(c_int, c_int) -> c_float;
type SetValueFn = unsafe extern "C" fn(c_int, c_float);
type SetConnectedFn = unsafe extern "C" fn(bool);

/// Which build of the plugin to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PluginArch {
    #[default]
    X64,
    X86,
}

impl PluginArch {
    pub fn file_name(self) -> &'static str {
        match self {
            PluginArch::X64 => "raildriver64.dll",
            PluginArch::X86 => "raildriver.dll",
        }
    }
}

/// Where the plugin lives inside a Steam installation
pub fn plugin_path(steam_root: impl AsRef<Path>, arch: PluginArch) -> PathBuf {
    steam_root
        .as_ref()
        .join("steamapps")
        .join("common")
        .join("railworks")
        .join("plugins")
        .join(arch.file_name())
}

/// A [`RawDriver`] calling into the loaded plugin library
pub struct DllDriver {
    path: PathBuf,
    get_controller_list: GetStringFn,
    get_loco_name: GetStringFn,
    get_controller_value: GetValueFn,
    set_controller_value: SetValueFn,
    set_rail_driver_connected: SetConnectedFn,
    // Serializes calls; returned strings live in a buffer owned by the plugin
    call_lock: Mutex<()>,
    // Must outlive the function pointers above
    _library: Library,
}

impl DllDriver {
    /// Load the plugin from an explicit path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // SAFETY: loading runs the library's initialisers; the RailDriver
        // plugin has none beyond the C runtime's own.
        let library = unsafe { Library::new(&path) }.map_err(|e| {
            ApiError::Driver(format!("failed to load {}: {}", path.display(), e))
        })?;

        // SAFETY: signatures match the plugin's exported C functions.
        let driver = unsafe {
            Self {
                get_controller_list: symbol(&library, b"GetControllerList\0")?,
                get_loco_name: symbol(&library, b"GetLocoName\0")?,
                get_controller_value: symbol(&library, b"GetControllerValue\0")?,
                set_controller_value: symbol(&library, b"SetControllerValue\0")?,
                set_rail_driver_connected: symbol(&library, b"SetRailDriverConnected\0")?,
                call_lock: Mutex::new(()),
                path,
                _library: library,
            }
        };

        tracing::info!("Loaded RailDriver plugin from {}", driver.path.display());
        Ok(driver)
    }

    /// Load the plugin from a Steam installation rooted at `steam_root`
    pub fn from_steam(steam_root: impl AsRef<Path>, arch: PluginArch) -> Result<Self> {
        let path = plugin_path(steam_root, arch);
        if !path.is_file() {
            return Err(ApiError::Driver(format!(
                "unable to locate {} at {}",
                arch.file_name(),
                path.display()
            )));
        }
        Self::load(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_string(&self, call: GetStringFn) -> String {
        let _guard = self.call_lock.lock();
        // SAFETY: the plugin returns either null or a NUL-terminated buffer
        // that stays valid until its next call, which the lock prevents.
        unsafe {
            let ptr = call();
            if ptr.is_null() {
                return String::new();
            }
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}

/// Resolve `name` and copy the function pointer out of the symbol
///
/// # Safety
///
/// `T` must match the exported function's real signature.
unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T> {
    library.get::<T>(name).map(|symbol| *symbol).map_err(|e| {
        let name = String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name));
        ApiError::Driver(format!("missing plugin entry point {}: {}", name, e))
    })
}

fn to_index(index: u32) -> Result<c_int> {
    c_int::try_from(index)
        .map_err(|_| ApiError::InvalidParameter(format!("controller index {} out of range", index)))
}

impl RawDriver for DllDriver {
    fn controller_list(&self) -> Result<String> {
        Ok(self.read_string(self.get_controller_list))
    }

    fn loco_name(&self) -> Result<String> {
        Ok(self.read_string(self.get_loco_name))
    }

    fn controller_value(&self, index: u32, kind: ValueKind) -> Result<f32> {
        let index = to_index(index)?;
        let _guard = self.call_lock.lock();
        // SAFETY: plain value call into the plugin.
        Ok(unsafe { (self.get_controller_value)(index, kind.as_raw()) })
    }

    fn set_controller_value(&self, index: u32, value: f32) -> Result<()> {
        let index = to_index(index)?;
        let _guard = self.call_lock.lock();
        // SAFETY: plain value call into the plugin.
        unsafe { (self.set_controller_value)(index, value) };
        Ok(())
    }

    fn set_connected(&self, connected: bool) -> Result<()> {
        let _guard = self.call_lock.lock();
        // SAFETY: plain value call into the plugin.
        unsafe { (self.set_rail_driver_connected)(connected) };
        Ok(())
    }
}

impl fmt::Debug for DllDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DllDriver").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PluginArch::X64, "raildriver64.dll")]
    #[case(PluginArch::X86, "raildriver.dll")]
    fn test_plugin_path(#[case] arch: PluginArch, #[case] file: &str) {
        let path = plugin_path("C:/Steam", arch);
        assert_eq!(
            path,
            Path::new("C:/Steam/steamapps/common/railworks/plugins").join(file)
        );
    }

    #[test]
    fn test_from_steam_reports_missing_plugin() {
        let root = std::env::temp_dir().join("raildriver-no-steam-here");
        match DllDriver::from_steam(&root, PluginArch::X64) {
            Err(ApiError::Driver(message)) => {
                assert!(message.contains("raildriver64.dll"));
            }
            other => panic!("Expected Driver error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_non_library() {
        let path = std::env::temp_dir().join("raildriver-not-a-library.dll");
        std::fs::write(&path, b"definitely not a shared library").unwrap();

        let result = DllDriver::load(&path);
        std::fs::remove_file(&path).ok();

        match result {
            Err(ApiError::Driver(message)) => assert!(message.contains("failed to load")),
            other => panic!("Expected Driver error, got {:?}", other),
        }
    }

    #[test]
    fn test_index_conversion() {
        assert_eq!(to_index(402), Ok(402));
        assert!(matches!(
            to_index(u32::MAX),
            Err(ApiError::InvalidParameter(_))
        ));
    }
}
