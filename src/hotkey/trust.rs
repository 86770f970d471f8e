//! Accessibility trust check
//!
//! The event tap only works for processes the user has trusted under
//! Privacy & Security > Accessibility.

/// Permission collaborator consulted before installing the tap
pub trait TrustCheck {
    /// Whether the process is trusted right now
    fn is_trusted(&self) -> bool;

    /// Ask the OS to prompt the user; returns the trust state at call time
    fn request_prompt(&self) -> bool;
}

/// Accessibility trust as reported by the system
#[derive(Debug, Default)]
pub struct AccessibilityTrust;

#[cfg(target_os = "macos")]
mod ffi {
    use core_foundation::dictionary::CFDictionaryRef;
    use core_foundation::string::CFStringRef;

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        pub static kAXTrustedCheckOptionPrompt: CFStringRef;
        pub fn AXIsProcessTrusted() -> bool;
        pub fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
    }
}

#[cfg(target_os = "macos")]
impl TrustCheck for AccessibilityTrust {
    fn is_trusted(&self) -> bool {
        unsafe { ffi::AXIsProcessTrusted() }
    }

    fn request_prompt(&self) -> bool {
        use core_foundation::base::TCFType;
        use core_foundation::boolean::CFBoolean;
        use core_foundation::dictionary::CFDictionary;
        use core_foundation::string::CFString;

        unsafe {
            let key = CFString::wrap_under_get_rule(ffi::kAXTrustedCheckOptionPrompt);
            let options = CFDictionary::from_CFType_pairs(&[(
                key.as_CFType(),
                CFBoolean::true_value().as_CFType(),
            )]);
            ffi::AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef())
        }
    }
}

#[cfg(not(target_os = "macos"))]
impl TrustCheck for AccessibilityTrust {
    fn is_trusted(&self) -> bool {
        false
    }

    fn request_prompt(&self) -> bool {
        false
    }
}

/// Check trust, prompting once if needed
pub fn ensure_trusted(trust: &impl TrustCheck) -> bool {
    trust.is_trusted() || trust.request_prompt()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct FakeTrust {
        trusted: bool,
        prompt_grants: bool,
        prompts: Cell<u32>,
    }

    impl TrustCheck for FakeTrust {
        fn is_trusted(&self) -> bool {
            self.trusted
        }

        fn request_prompt(&self) -> bool {
            self.prompts.set(self.prompts.get() + 1);
            self.prompt_grants
        }
    }

    #[test]
    fn test_trusted_skips_prompt() {
        let trust = FakeTrust {
            trusted: true,
            prompt_grants: false,
            prompts: Cell::new(0),
        };
        assert!(ensure_trusted(&trust));
        assert_eq!(trust.prompts.get(), 0);
    }

    #[test]
    fn test_untrusted_prompts_once() {
        let trust = FakeTrust {
            trusted: false,
            prompt_grants: false,
            prompts: Cell::new(0),
        };
        assert!(!ensure_trusted(&trust));
        assert_eq!(trust.prompts.get(), 1);
    }
}
