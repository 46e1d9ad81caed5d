//! WebRTC leak prevention
//!
//! Peer connections can still be constructed, but every data channel request
//! fails. Camera and microphone capture is refused outright.

use std::rc::Rc;

use crate::capability::{
    CapResult, CapabilityError, MediaDevicesApi, MediaDevicesSlot, PageHost, PeerConnectionApi,
    PeerConnectionSlot,
};

pub const DATA_CHANNEL_BLOCKED: &str = "WebRTC data channels blocked for privacy";
pub const MEDIA_BLOCKED: &str = "Media access blocked for privacy";

pub struct BlockedDataChannels<H, V> {
    inner: PeerConnectionSlot<H, V>,
}

impl<H, V> PeerConnectionApi<H, V> for BlockedDataChannels<H, V> {
    fn construct(&self, args: &[V]) -> CapResult<H> {
        self.inner.construct(args)
    }

    fn create_data_channel(&self, _connection: &H, _args: &[V]) -> CapResult<V> {
        Err(CapabilityError::Blocked(DATA_CHANNEL_BLOCKED))
    }
}

pub struct BlockedMediaCapture;

impl<V> MediaDevicesApi<V> for BlockedMediaCapture {
    fn get_user_media(&self, _args: &[V]) -> CapResult<V> {
        Err(CapabilityError::Blocked(MEDIA_BLOCKED))
    }
}

/// Wrap whichever of the two APIs the page exposes.
pub fn install<P: PageHost>(host: &P) -> CapResult<()> {
    let peers = host.peer_connections();
    let media = host.media_devices();
    if peers.is_none() && media.is_none() {
        return Err(CapabilityError::Unavailable("RTCPeerConnection"));
    }

    if let Some(inner) = peers {
        host.set_peer_connections(Rc::new(BlockedDataChannels { inner }))?;
    }
    if media.is_some() {
        let blocked: MediaDevicesSlot<P::Value> = Rc::new(BlockedMediaCapture);
        host.set_media_devices(blocked)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;

    #[test]
    fn data_channels_and_capture_fail() {
        let page = FakePage::new();
        install(&page).unwrap();

        let peers = page.peer_connections().unwrap();
        let connection = peers.construct(&[]).unwrap();
        let err = peers.create_data_channel(&connection, &["chat".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), DATA_CHANNEL_BLOCKED);

        let err = page.media_devices().unwrap().get_user_media(&[]).unwrap_err();
        assert_eq!(err.to_string(), MEDIA_BLOCKED);
    }

    #[test]
    fn page_without_webrtc_reports_unavailable() {
        let page = FakePage::bare();
        assert!(matches!(install(&page), Err(CapabilityError::Unavailable(_))));
    }
}
