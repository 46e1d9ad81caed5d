//! Navigator identity

use crate::capability::{CapResult, CapabilityError, PageHost, PropertyValue};
use crate::protections::define_guarded;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const PLATFORM: &str = "Win32";
pub const LANGUAGE: &str = "en-US";
pub const LANGUAGES: &[&str] = &["en-US", "en"];

pub fn install<P: PageHost>(host: &P) -> CapResult<()> {
    let navigator = host.navigator().ok_or(CapabilityError::Unavailable("navigator"))?;
    let values = [
        ("userAgent", PropertyValue::Text(USER_AGENT)),
        ("platform", PropertyValue::Text(PLATFORM)),
        ("languages", PropertyValue::TextList(LANGUAGES)),
        ("language", PropertyValue::Text(LANGUAGE)),
    ];
    define_guarded(navigator.as_ref(), &values);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;

    #[test]
    fn pins_desktop_signature() {
        let page = FakePage::new();
        install(&page).unwrap();
        let navigator = page.navigator_bag();
        assert_eq!(navigator.value("userAgent"), Some(PropertyValue::Text(USER_AGENT)));
        assert_eq!(navigator.value("platform"), Some(PropertyValue::Text("Win32")));
        assert_eq!(navigator.value("languages"), Some(PropertyValue::TextList(&["en-US", "en"])));
    }

    #[test]
    fn locked_user_agent_is_left_alone() {
        let page = FakePage::new();
        page.navigator_bag().lock("userAgent");
        install(&page).unwrap();
        let navigator = page.navigator_bag();
        assert_eq!(navigator.value("userAgent"), None);
        assert_eq!(navigator.value("language"), Some(PropertyValue::Text("en-US")));
    }
}
