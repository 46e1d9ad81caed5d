//! Battery status blocking

use std::rc::Rc;

use crate::capability::{BatteryApi, BatterySlot, CapResult, CapabilityError, PageHost};

pub const BATTERY_BLOCKED: &str = "Battery API blocked for privacy";

pub struct BlockedBattery;

impl<V> BatteryApi<V> for BlockedBattery {
    fn get_battery(&self) -> CapResult<V> {
        Err(CapabilityError::Blocked(BATTERY_BLOCKED))
    }
}

pub fn install<P: PageHost>(host: &P) -> CapResult<()> {
    if host.battery().is_none() {
        return Err(CapabilityError::Unavailable("navigator.getBattery"));
    }
    let blocked: BatterySlot<P::Value> = Rc::new(BlockedBattery);
    host.set_battery(blocked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;

    #[test]
    fn battery_query_rejects() {
        let page = FakePage::new();
        assert!(page.battery().unwrap().get_battery().is_ok());
        install(&page).unwrap();
        let err = page.battery().unwrap().get_battery().unwrap_err();
        assert_eq!(err, CapabilityError::Blocked(BATTERY_BLOCKED));
    }
}
