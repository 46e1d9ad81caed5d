//! Page-context payload
//!
//! Holds the live [`CountermeasureConfig`] and installs protections into a
//! [`PageHost`]. `apply_all` can be called any number of times: protections
//! already installed are skipped, disabled ones are left alone, and a
//! protection that fails to install does not stop the rest.
//!
//! Installed protections stay installed for the page's lifetime. Turning a
//! flag off later only prevents installation on pages that have not applied
//! it yet.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use serde_json::Value;

use crate::capability::PageHost;
use crate::config::CountermeasureConfig;
use crate::message::PageMessage;
use crate::noise::Noise;
use crate::protections::Protection;

pub struct Payload<P: PageHost> {
    host: P,
    config: RefCell<CountermeasureConfig>,
    installed: RefCell<BTreeSet<Protection>>,
    noise: Rc<Noise>,
}

impl<P: PageHost> Payload<P> {
    /// Payload seeded from the configuration global, if the relay set one.
    pub fn new(host: P, seed: Option<&Value>) -> Self {
        Self::with_noise(host, seed, Noise::from_entropy())
    }

    pub fn with_noise(host: P, seed: Option<&Value>, noise: Noise) -> Self {
        Self {
            host,
            config: RefCell::new(CountermeasureConfig::from_seed(seed)),
            installed: RefCell::new(BTreeSet::new()),
            noise: Rc::new(noise),
        }
    }

    pub fn host(&self) -> &P {
        &self.host
    }

    pub fn config(&self) -> CountermeasureConfig {
        *self.config.borrow()
    }

    pub fn installed(&self) -> Vec<Protection> {
        self.installed.borrow().iter().copied().collect()
    }

    /// Run every protection against the current config. Returns the
    /// protections newly installed by this call.
    pub fn apply_all(&self) -> Vec<Protection> {
        let config = self.config();
        let mut applied = Vec::new();

        for protection in Protection::ALL {
            if !protection.enabled(&config) || self.installed.borrow().contains(&protection) {
                continue;
            }
            match protection.install(&self.host, &self.noise) {
                Ok(()) => {
                    self.installed.borrow_mut().insert(protection);
                    applied.push(protection);
                }
                Err(e) => log::debug!("{} protection not applied: {}", protection, e),
            }
        }

        if !applied.is_empty() {
            log::info!("Applied {} protections", applied.len());
        }
        applied
    }

    /// Handle one page message event. Our own config updates are merged and
    /// every protection re-applied; anything else is ignored. Returns whether
    /// the message was ours.
    pub fn handle_message(&self, data: &Value) -> bool {
        match PageMessage::parse(data) {
            Some(PageMessage::UpdateConfig { config, .. }) => {
                let changed = self.config.borrow_mut().merge(&config);
                log::debug!("Config update changed {} flags", changed);
                self.apply_all();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityError, PropertyValue};
    use crate::testing::FakePage;
    use serde_json::json;

    fn payload(seed: Option<Value>) -> Payload<FakePage> {
        Payload::with_noise(FakePage::new(), seed.as_ref(), Noise::seeded(99))
    }

    #[test]
    fn applies_everything_by_default() {
        let payload = payload(None);
        let applied = payload.apply_all();
        assert_eq!(applied, Protection::ALL.to_vec());
        assert!(payload.apply_all().is_empty());
    }

    #[test]
    fn seeded_flags_are_honoured() {
        let payload = payload(Some(json!({ "canvas": false, "userAgent": false })));
        let applied = payload.apply_all();
        assert!(!applied.contains(&Protection::Canvas));
        assert!(!applied.contains(&Protection::Navigator));
        assert!(applied.contains(&Protection::Battery));
        assert_eq!(payload.host().navigator_bag().value("userAgent"), None);
    }

    #[test]
    fn update_message_enables_and_reapplies() {
        let payload = payload(Some(json!({ "webgl": false })));
        payload.apply_all();
        assert!(!payload.installed().contains(&Protection::WebGl));

        let handled = payload.handle_message(&json!({
            "type": "TRACERY_UPDATE_CONFIG",
            "config": { "webgl": true }
        }));
        assert!(handled);
        assert!(payload.config().webgl);
        assert!(payload.installed().contains(&Protection::WebGl));

        // Re-applying never wraps a slot twice.
        let webgl_wraps = payload.host().replaced.borrow().iter().filter(|s| **s == "webgl").count();
        assert_eq!(webgl_wraps, 1);
    }

    #[test]
    fn foreign_messages_are_ignored() {
        let payload = payload(None);
        assert!(!payload.handle_message(&json!({ "type": "chat", "text": "hi" })));
        assert!(payload.installed().is_empty());
    }

    #[test]
    fn one_failure_does_not_block_others() {
        let payload = Payload::with_noise(FakePage::bare(), None, Noise::seeded(1));
        assert!(payload.apply_all().is_empty());

        let page = FakePage::new();
        page.navigator_bag().lock("userAgent");
        let payload = Payload::with_noise(page, None, Noise::seeded(2));
        payload.apply_all();
        let host = payload.host();
        assert_eq!(host.navigator_bag().value("userAgent"), None);
        assert_eq!(host.navigator_bag().value("platform"), Some(PropertyValue::Text("Win32")));

        let err = host.battery().unwrap().get_battery().unwrap_err();
        assert!(matches!(err, CapabilityError::Blocked(_)));
    }
}
