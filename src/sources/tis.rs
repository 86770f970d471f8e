//! Text Input Sources backend
//!
//! Talks to the HIToolbox TIS API through Core Foundation types. Handles
//! are retained `CFType`s, so this backend is confined to the thread that
//! created it.

use std::os::raw::c_void;

use core_foundation::array::{CFArray, CFArrayRef};
use core_foundation::base::{CFType, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
use core_foundation::string::{CFString, CFStringRef};
use tracing::{debug, warn};

use super::backend::{InputSource, InputSourceBackend, NativeSource};

type TISInputSourceRef = *const c_void;
type OSStatus = i32;

#[link(name = "Carbon", kind = "framework")]
extern "C" {
    static kTISPropertyInputSourceCategory: CFStringRef;
    static kTISCategoryKeyboardInputSource: CFStringRef;
    static kTISPropertyInputSourceIsSelectCapable: CFStringRef;
    static kTISPropertyInputSourceID: CFStringRef;
    static kTISPropertyLocalizedName: CFStringRef;

    fn TISCreateInputSourceList(properties: CFDictionaryRef, include_all_installed: u8)
        -> CFArrayRef;
    fn TISCopyCurrentKeyboardInputSource() -> TISInputSourceRef;
    fn TISGetInputSourceProperty(source: TISInputSourceRef, key: CFStringRef) -> *const c_void;
    fn TISSelectInputSource(source: TISInputSourceRef) -> OSStatus;
}

/// Input source backend for macOS
#[derive(Debug, Default)]
pub struct TisBackend;

impl InputSourceBackend for TisBackend {
    type Handle = CFType;

    fn enumerate(&self) -> Vec<NativeSource<CFType>> {
        let list = unsafe {
            let filter = CFDictionary::from_CFType_pairs(&[
                (
                    CFString::wrap_under_get_rule(kTISPropertyInputSourceCategory).as_CFType(),
                    CFString::wrap_under_get_rule(kTISCategoryKeyboardInputSource).as_CFType(),
                ),
                (
                    CFString::wrap_under_get_rule(kTISPropertyInputSourceIsSelectCapable)
                        .as_CFType(),
                    CFBoolean::true_value().as_CFType(),
                ),
            ]);
            let list = TISCreateInputSourceList(filter.as_concrete_TypeRef(), 0);
            if list.is_null() {
                warn!("TISCreateInputSourceList returned no list");
                return Vec::new();
            }
            CFArray::<CFType>::wrap_under_create_rule(list)
        };

        list.iter()
            .filter_map(|item| {
                let handle = CFType::clone(&item);
                let source = handle.as_CFTypeRef();
                let id = unsafe { string_property(source, kTISPropertyInputSourceID) }?;
                let name = unsafe { string_property(source, kTISPropertyLocalizedName) }?;
                Some(NativeSource {
                    source: InputSource::new(id, name),
                    handle,
                })
            })
            .collect()
    }

    fn current_id(&self) -> Option<String> {
        unsafe {
            let current = TISCopyCurrentKeyboardInputSource();
            if current.is_null() {
                return None;
            }
            let current = CFType::wrap_under_create_rule(current);
            string_property(current.as_CFTypeRef(), kTISPropertyInputSourceID)
        }
    }

    fn select(&self, handle: &CFType) {
        let status = unsafe { TISSelectInputSource(handle.as_CFTypeRef()) };
        if status != 0 {
            warn!(status, "TISSelectInputSource failed");
        } else {
            debug!("input source selected");
        }
    }
}

/// Read a string-valued TIS property without taking ownership of it
unsafe fn string_property(source: TISInputSourceRef, key: CFStringRef) -> Option<String> {
    let value = TISGetInputSourceProperty(source, key);
    if value.is_null() {
        return None;
    }
    Some(CFString::wrap_under_get_rule(value as CFStringRef).to_string())
}
