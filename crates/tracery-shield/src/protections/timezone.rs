//! Timezone normalization

use std::rc::Rc;

use crate::capability::{CapResult, CapabilityError, PageHost, TimezoneApi, TimezoneSlot};

pub const TIME_ZONE: &str = "UTC";

pub struct UtcTimezone;

impl<H> TimezoneApi<H> for UtcTimezone {
    fn timezone_offset(&self, _date: &H) -> i32 {
        0
    }

    fn time_zone(&self) -> String {
        TIME_ZONE.to_string()
    }
}

pub fn install<P: PageHost>(host: &P) -> CapResult<()> {
    if host.timezone().is_none() {
        return Err(CapabilityError::Unavailable("Intl.DateTimeFormat"));
    }
    let utc: TimezoneSlot<P::Handle> = Rc::new(UtcTimezone);
    host.set_timezone(utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;

    #[test]
    fn reports_utc() {
        let page = FakePage::new();
        assert_eq!(page.timezone().unwrap().timezone_offset(&0), -120);
        install(&page).unwrap();
        let tz = page.timezone().unwrap();
        assert_eq!(tz.timezone_offset(&0), 0);
        assert_eq!(tz.time_zone(), "UTC");
    }
}
