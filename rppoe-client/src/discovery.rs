//! Discovery state machine and frame processing
//!
//! All methods run under the context lock and never perform I/O:
//! anything that must hit the wire comes back as an [`Outbound`] for
//! the caller to transmit. Malformed or unexpected inbound packets are
//! dropped silently (at trace/debug level), matching the best-effort
//! nature of RFC2516 discovery.

use rppoe_core::{Error, RawFrame, Result, SendKind};
use rppoe_packet::{
    append_tag, EtherType, EthernetHeader, FrameBuf, MacAddr, PppoeCode, PppoeHeader, TagIter,
    TagType,
};
use tracing::{debug, trace, warn};

use crate::context::{
    CachedTag, ClientContext, ConnectOutcome, DiscoveryState, Outbound, TagCaches,
    ERROR_AC_SYSTEM, ERROR_GENERIC, ERROR_SERVICE_NAME,
};
use crate::retry::{RetryPhase, TickAction};

const HEADERS_LEN: usize = EthernetHeader::LEN + PppoeHeader::LEN;

/// Tag-walk tallies used by the PADO/PADS acceptance rules.
#[derive(Debug, Default)]
struct TagTally {
    ac_name_count: u32,
    service_name_count: u32,
    service_name_valid: bool,
    host_uniq_count: u32,
    host_uniq_valid: bool,
}

impl ClientContext {
    // ---- outbound builders -------------------------------------------------

    fn begin_discovery(&self) -> Result<FrameBuf> {
        let mut buf = self.pool.allocate().ok_or(Error::NoTxBuffer)?;
        // Reserve header space; filled in once the payload length is
        // known.
        buf.put_zeros(HEADERS_LEN)?;
        Ok(buf)
    }

    fn finish_discovery(
        &self,
        mut buf: FrameBuf,
        code: PppoeCode,
        session_id: u16,
        dst: MacAddr,
    ) -> Result<Outbound> {
        let payload_len = (buf.len() - HEADERS_LEN) as u16;
        PppoeHeader::new(code, session_id, payload_len)
            .write(&mut buf.as_mut_slice()[EthernetHeader::LEN..]);
        EthernetHeader {
            dst,
            src: self.local_mac,
            ethertype: EtherType::Discovery,
        }
        .write(buf.as_mut_slice());
        buf.pad_to(EthernetHeader::MIN_FRAME_SIZE)?;

        Ok(Outbound {
            frame: buf.freeze(),
            dst,
            kind: SendKind::Discovery,
        })
    }

    /// PADI: broadcast, Service-Name (zero-length means any service)
    /// plus the optional Host-Uniq.
    pub(crate) fn build_padi(&self) -> Result<Outbound> {
        let mut buf = self.begin_discovery()?;
        append_tag(&mut buf, TagType::ServiceName, &self.service_name)?;
        if let Some(host_uniq) = &self.host_uniq {
            append_tag(&mut buf, TagType::HostUniq, host_uniq)?;
        }
        self.finish_discovery(buf, PppoeCode::Padi, 0, MacAddr::BROADCAST)
    }

    /// PADR: unicast to the offering concentrator, echoing back the
    /// AC-Cookie and Relay-Session-Id it supplied.
    pub(crate) fn build_padr(&self) -> Result<Outbound> {
        let mut buf = self.begin_discovery()?;
        append_tag(&mut buf, TagType::ServiceName, &self.service_name)?;
        if let Some(host_uniq) = &self.host_uniq {
            append_tag(&mut buf, TagType::HostUniq, host_uniq)?;
        }
        if !self.caches.ac_cookie.is_empty() {
            append_tag(&mut buf, TagType::AcCookie, &self.caches.ac_cookie)?;
        }
        if !self.caches.relay_session_id.is_empty() {
            append_tag(&mut buf, TagType::RelaySessionId, &self.caches.relay_session_id)?;
        }
        self.finish_discovery(buf, PppoeCode::Padr, 0, self.session.mac)
    }

    /// PADT: unicast with the established session id; relays carry
    /// their Relay-Session-Id through the teardown too.
    pub(crate) fn build_padt(&self) -> Result<Outbound> {
        let mut buf = self.begin_discovery()?;
        if !self.caches.relay_session_id.is_empty() {
            append_tag(&mut buf, TagType::RelaySessionId, &self.caches.relay_session_id)?;
        }
        self.finish_discovery(buf, PppoeCode::Padt, self.session.session_id, self.session.mac)
    }

    /// Session data frame, code 0 with the established session id.
    pub(crate) fn build_session(&self, payload: &[u8]) -> Result<Outbound> {
        let mut buf = self.pool.allocate().ok_or(Error::NoTxBuffer)?;
        buf.put_zeros(HEADERS_LEN)?;
        buf.put_slice(payload)?;
        PppoeHeader::new(PppoeCode::SessionData, self.session.session_id, payload.len() as u16)
            .write(&mut buf.as_mut_slice()[EthernetHeader::LEN..]);
        EthernetHeader {
            dst: self.session.mac,
            src: self.local_mac,
            ethertype: EtherType::Session,
        }
        .write(buf.as_mut_slice());
        buf.pad_to(EthernetHeader::MIN_FRAME_SIZE)?;

        Ok(Outbound {
            frame: buf.freeze(),
            dst: self.session.mac,
            kind: SendKind::Session,
        })
    }

    // ---- connect / tick ----------------------------------------------------

    /// Enter `PadiSent` and arm the PADI retry schedule. The state
    /// transition happens before any transmission; the caller sends
    /// the frame built afterwards.
    pub(crate) fn start_connect(&mut self) -> Option<Outbound> {
        self.state = DiscoveryState::PadiSent;
        self.retry.arm(RetryPhase::Padi, self.config.padi);
        match self.build_padi() {
            Ok(out) => Some(out),
            Err(e) => {
                // The retry supervisor will try again at the next
                // expiry; discovery is not aborted by one failed send.
                warn!(error = %e, "failed to build PADI, leaving it to the retry timer");
                None
            }
        }
    }

    /// Advance the retry timer by one tick.
    pub(crate) fn handle_tick(&mut self) -> Option<Outbound> {
        match self.retry.tick() {
            TickAction::Idle | TickAction::Waiting => None,
            TickAction::Resend(phase) => {
                let built = match phase {
                    RetryPhase::Padi => self.build_padi(),
                    RetryPhase::Padr => self.build_padr(),
                };
                match built {
                    Ok(out) => {
                        debug!(?phase, "retransmitting discovery packet");
                        Some(out)
                    }
                    Err(e) => {
                        warn!(?phase, error = %e, "retransmission build failed");
                        None
                    }
                }
            }
            TickAction::Exhausted(phase) => {
                debug!(?phase, "discovery retries exhausted");
                self.reset();
                self.resolve_waiter(ConnectOutcome::Exhausted);
                None
            }
        }
    }

    // ---- inbound -----------------------------------------------------------

    /// Process one inbound frame. Returns the response to transmit,
    /// if the frame advanced discovery.
    pub(crate) fn handle_frame(&mut self, raw: &RawFrame) -> Option<Outbound> {
        if raw.truncated {
            trace!("dropping truncated frame");
            return None;
        }

        let eth = EthernetHeader::parse(&raw.data)?;

        // A client only acts on frames addressed to a unicast
        // destination, from a real source.
        if eth.dst.is_zero() || eth.dst.is_broadcast() {
            trace!(dst = %eth.dst, "dropping frame with invalid destination");
            return None;
        }
        if eth.src.is_zero() {
            trace!("dropping frame with zero source address");
            return None;
        }

        match eth.ethertype {
            EtherType::Discovery => self.handle_discovery(&eth, &raw.data[EthernetHeader::LEN..]),
            EtherType::Session => {
                self.handle_session(&eth, raw);
                None
            }
            EtherType::Other(_) => None,
        }
    }

    fn handle_discovery(&mut self, eth: &EthernetHeader, payload: &[u8]) -> Option<Outbound> {
        let hdr = PppoeHeader::parse(payload)?;
        if !hdr.version_ok() {
            trace!(ver_type = hdr.ver_type, "dropping packet with bad version/type");
            return None;
        }
        let code = PppoeCode::from_u8(hdr.code)?;

        // Gate on the state/code pairing first: anything else is
        // either a stray response or a server-side packet.
        match (self.state, code) {
            (DiscoveryState::PadiSent, PppoeCode::Pado) => {
                if hdr.session_id != 0 {
                    trace!(session_id = hdr.session_id, "dropping PADO with nonzero session id");
                    return None;
                }
            }
            (DiscoveryState::PadrSent, PppoeCode::Pads) => {
                if hdr.session_id == 0 {
                    trace!("dropping PADS without a session id");
                    return None;
                }
                if eth.src != self.session.mac {
                    trace!(src = %eth.src, "dropping PADS from unexpected peer");
                    return None;
                }
            }
            (DiscoveryState::Established, PppoeCode::Padt) => {
                if hdr.session_id == 0 || hdr.session_id != self.session.session_id {
                    trace!(session_id = hdr.session_id, "dropping PADT with wrong session id");
                    return None;
                }
                if eth.src != self.session.mac {
                    trace!(src = %eth.src, "dropping PADT from unexpected peer");
                    return None;
                }
            }
            (state, code) => {
                trace!(?state, ?code, "dropping discovery packet not expected in this state");
                return None;
            }
        }

        // Fresh walk: forget tags cached from any previous packet.
        self.caches.clear();
        self.error_flags = 0;

        let tag_bytes = &payload[PppoeHeader::LEN..];
        let declared = hdr.length as usize;
        if declared > tag_bytes.len() {
            trace!(declared, available = tag_bytes.len(), "dropping packet with bad length");
            return None;
        }

        let tally = match self.walk_tags(tag_bytes, declared) {
            Some(tally) => tally,
            None => {
                // Nothing half-parsed survives a rejected packet.
                self.caches.clear();
                self.error_flags = 0;
                return None;
            }
        };

        match code {
            PppoeCode::Pado => self.accept_pado(eth.src, &tally),
            PppoeCode::Pads => {
                self.accept_pads(hdr.session_id, &tally);
                None
            }
            PppoeCode::Padt => {
                debug!(session_id = hdr.session_id, "session terminated by peer");
                self.reset();
                None
            }
            _ => None,
        }
    }

    /// Walk the tag list, caching AC-Name / AC-Cookie /
    /// Relay-Session-Id and tallying what the acceptance rules need.
    /// `None` drops the whole packet (overrun or oversized tag).
    fn walk_tags(&mut self, tag_bytes: &[u8], declared: usize) -> Option<TagTally> {
        let mut tally = TagTally::default();

        for tag in TagIter::new(tag_bytes, declared) {
            let tag = match tag {
                Ok(tag) => tag,
                Err(e) => {
                    trace!(error = %e, "dropping packet with malformed tag");
                    return None;
                }
            };

            match tag.tag_type() {
                Some(TagType::EndOfList) => break,
                Some(TagType::ServiceName) => {
                    tally.service_name_count += 1;
                    // Zero length means "any service is acceptable".
                    if tag.value.is_empty() || tag.value == self.service_name {
                        tally.service_name_valid = true;
                    }
                }
                Some(TagType::AcName) => {
                    if tag.value.len() > TagCaches::limit_for(CachedTag::AcName) {
                        trace!(len = tag.value.len(), "dropping packet with oversized AC-Name");
                        return None;
                    }
                    tally.ac_name_count += 1;
                    self.caches.ac_name.clear();
                    self.caches.ac_name.extend_from_slice(tag.value);
                }
                Some(TagType::HostUniq) => {
                    tally.host_uniq_count += 1;
                    if let Some(host_uniq) = &self.host_uniq {
                        if tag.value == &host_uniq[..] {
                            tally.host_uniq_valid = true;
                        }
                    }
                }
                Some(TagType::AcCookie) => {
                    if tag.value.len() > TagCaches::limit_for(CachedTag::AcCookie) {
                        trace!(len = tag.value.len(), "dropping packet with oversized AC-Cookie");
                        return None;
                    }
                    self.caches.ac_cookie.clear();
                    self.caches.ac_cookie.extend_from_slice(tag.value);
                }
                Some(TagType::RelaySessionId) => {
                    if tag.value.len() > TagCaches::limit_for(CachedTag::RelaySessionId) {
                        trace!(
                            len = tag.value.len(),
                            "dropping packet with oversized Relay-Session-Id"
                        );
                        return None;
                    }
                    self.caches.relay_session_id.clear();
                    self.caches.relay_session_id.extend_from_slice(tag.value);
                }
                Some(TagType::ServiceNameError) => self.error_flags |= ERROR_SERVICE_NAME,
                Some(TagType::AcSystemError) => self.error_flags |= ERROR_AC_SYSTEM,
                Some(TagType::GenericError) => self.error_flags |= ERROR_GENERIC,
                // Vendor-specific and unknown tags are skipped.
                Some(TagType::VendorSpecific) | None => {}
            }
        }

        Some(tally)
    }

    /// PADO acceptance per RFC2516 section 5.2: exactly one AC-Name, a
    /// Service-Name matching the request (or the any-service
    /// wildcard), the Host-Uniq echoed iff one was sent, no error
    /// tags. The first acceptable offer wins; a matching PADR goes
    /// straight back.
    fn accept_pado(&mut self, server_mac: MacAddr, tally: &TagTally) -> Option<Outbound> {
        if tally.ac_name_count != 1 {
            trace!(count = tally.ac_name_count, "rejecting PADO: AC-Name count");
            return None;
        }
        match &self.host_uniq {
            Some(_) => {
                if tally.host_uniq_count != 1 || !tally.host_uniq_valid {
                    trace!("rejecting PADO: Host-Uniq not echoed correctly");
                    return None;
                }
            }
            None => {
                if tally.host_uniq_count != 0 {
                    trace!("rejecting PADO: unsolicited Host-Uniq");
                    return None;
                }
            }
        }
        if !tally.service_name_valid {
            trace!("rejecting PADO: no acceptable Service-Name");
            return None;
        }
        if self.error_flags != 0 {
            debug!(flags = self.error_flags, "rejecting PADO carrying error tags");
            return None;
        }

        debug!(server = %server_mac, ac_name = ?String::from_utf8_lossy(&self.caches.ac_name),
               "accepting PADO offer");
        self.session.mac = server_mac;
        self.state = DiscoveryState::PadrSent;
        self.retry.arm(RetryPhase::Padr, self.config.padr);

        match self.build_padr() {
            Ok(out) => Some(out),
            Err(e) => {
                warn!(error = %e, "failed to build PADR, leaving it to the retry timer");
                None
            }
        }
    }

    /// PADS acceptance per RFC2516 section 5.4: exactly one matching
    /// Service-Name and no error tags. Confirms the session and wakes
    /// the connect waiter.
    fn accept_pads(&mut self, session_id: u16, tally: &TagTally) {
        if tally.service_name_count != 1 || !tally.service_name_valid {
            trace!("rejecting PADS: Service-Name invalid");
            return;
        }
        if self.error_flags != 0 {
            debug!(flags = self.error_flags, "rejecting PADS carrying error tags");
            return;
        }

        debug!(session_id, peer = %self.session.mac, "session established");
        self.session.session_id = session_id;
        self.state = DiscoveryState::Established;
        self.retry.disarm();
        self.resolve_waiter(ConnectOutcome::Established);
    }

    /// Deliver one inbound session-stage frame to the upper layer.
    fn handle_session(&mut self, eth: &EthernetHeader, raw: &RawFrame) {
        let payload = &raw.data[EthernetHeader::LEN..];
        let Some(hdr) = PppoeHeader::parse(payload) else {
            return;
        };
        if !hdr.version_ok() || hdr.code != PppoeCode::SessionData as u8 {
            return;
        }
        if self.state != DiscoveryState::Established {
            trace!("dropping session data: no established session");
            return;
        }
        if hdr.session_id == 0
            || hdr.session_id != self.session.session_id
            || eth.src != self.session.mac
        {
            trace!(session_id = hdr.session_id, src = %eth.src,
                   "dropping session data for unknown session");
            return;
        }

        let data_len = hdr.length as usize;
        if data_len > payload.len() - PppoeHeader::LEN {
            trace!(declared = data_len, "dropping session data with bad length");
            return;
        }

        // Slicing to the declared length strips any Ethernet minimum-
        // frame padding.
        let start = EthernetHeader::LEN + PppoeHeader::LEN;
        let data = raw.data.slice(start..start + data_len);
        if let Err(e) = self.session_tx.try_send(data) {
            debug!(error = %e, "session consumer lagging, dropping payload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::test_context;
    use bytes::Bytes;
    use rppoe_core::RetryParams;

    const LOCAL: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 1]);
    const SERVER: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 2]);

    /// Server-side frame builder for the tests.
    fn server_frame(code: PppoeCode, session_id: u16, tags: &[(TagType, &[u8])]) -> RawFrame {
        let mut buf = FrameBuf::new(1514);
        buf.put_zeros(HEADERS_LEN).unwrap();
        for (tag_type, value) in tags {
            append_tag(&mut buf, *tag_type, value).unwrap();
        }
        let payload_len = (buf.len() - HEADERS_LEN) as u16;
        PppoeHeader::new(code, session_id, payload_len)
            .write(&mut buf.as_mut_slice()[EthernetHeader::LEN..]);
        EthernetHeader {
            dst: LOCAL,
            src: SERVER,
            ethertype: EtherType::Discovery,
        }
        .write(buf.as_mut_slice());
        buf.pad_to(EthernetHeader::MIN_FRAME_SIZE).unwrap();
        RawFrame::new(buf.freeze())
    }

    fn session_frame(session_id: u16, data: &[u8]) -> RawFrame {
        let mut buf = FrameBuf::new(1514);
        buf.put_zeros(HEADERS_LEN).unwrap();
        buf.put_slice(data).unwrap();
        PppoeHeader::new(PppoeCode::SessionData, session_id, data.len() as u16)
            .write(&mut buf.as_mut_slice()[EthernetHeader::LEN..]);
        EthernetHeader {
            dst: LOCAL,
            src: SERVER,
            ethertype: EtherType::Session,
        }
        .write(buf.as_mut_slice());
        buf.pad_to(EthernetHeader::MIN_FRAME_SIZE).unwrap();
        RawFrame::new(buf.freeze())
    }

    fn pado(tags: &[(TagType, &[u8])]) -> RawFrame {
        server_frame(PppoeCode::Pado, 0, tags)
    }

    fn parse_out(out: &Outbound) -> (EthernetHeader, PppoeHeader, Vec<(u16, Vec<u8>)>) {
        let eth = EthernetHeader::parse(&out.frame).unwrap();
        let payload = &out.frame[EthernetHeader::LEN..];
        let hdr = PppoeHeader::parse(payload).unwrap();
        let tags = TagIter::new(&payload[PppoeHeader::LEN..], hdr.length as usize)
            .map(|t| t.map(|t| (t.raw_type, t.value.to_vec())))
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        (eth, hdr, tags)
    }

    fn advance_to_padr_sent(ctx: &mut ClientContext) {
        let padi = ctx.start_connect();
        assert!(padi.is_some());
        let padr = ctx.handle_frame(&pado(&[
            (TagType::AcName, b"BRAS1"),
            (TagType::ServiceName, b""),
            (TagType::AcCookie, b"cookie"),
        ]));
        assert!(padr.is_some());
        assert_eq!(ctx.state, DiscoveryState::PadrSent);
    }

    fn establish(ctx: &mut ClientContext) {
        advance_to_padr_sent(ctx);
        ctx.handle_frame(&server_frame(
            PppoeCode::Pads,
            0x1234,
            &[(TagType::ServiceName, b"")],
        ));
        assert_eq!(ctx.state, DiscoveryState::Established);
        assert_eq!(ctx.session.session_id, 0x1234);
    }

    #[test]
    fn test_padi_layout() {
        let mut ctx = test_context();
        ctx.service_name = Bytes::from_static(b"broadband");
        ctx.host_uniq = Some(Bytes::from_static(b"\x01\x02\x03\x04"));

        let out = ctx.start_connect().unwrap();
        let (eth, hdr, tags) = parse_out(&out);

        assert_eq!(out.frame.len(), EthernetHeader::MIN_FRAME_SIZE);
        assert!(eth.dst.is_broadcast());
        assert_eq!(eth.src, LOCAL);
        assert_eq!(eth.ethertype, EtherType::Discovery);
        assert_eq!(hdr.code, PppoeCode::Padi as u8);
        assert_eq!(hdr.session_id, 0);
        assert_eq!(
            tags,
            vec![
                (0x0101, b"broadband".to_vec()),
                (0x0103, vec![1, 2, 3, 4]),
            ]
        );
    }

    #[test]
    fn test_state_advances_before_transmission() {
        let mut ctx = test_context();
        let out = ctx.start_connect();
        // By the time the PADI frame exists, the machine is already
        // in PadiSent with the retry timer armed.
        assert!(out.is_some());
        assert_eq!(ctx.state, DiscoveryState::PadiSent);
        assert!(ctx.retry.is_armed());
    }

    #[test]
    fn test_full_handshake() {
        let mut ctx = test_context();
        ctx.start_connect().unwrap();

        let padr = ctx
            .handle_frame(&pado(&[
                (TagType::AcName, b"BRAS1"),
                (TagType::ServiceName, b""),
                (TagType::AcCookie, b"chocolate"),
                (TagType::RelaySessionId, b"relay-id"),
            ]))
            .unwrap();

        assert_eq!(ctx.state, DiscoveryState::PadrSent);
        assert_eq!(ctx.session.mac, SERVER);

        let (eth, hdr, tags) = parse_out(&padr);
        assert_eq!(eth.dst, SERVER);
        assert_eq!(hdr.code, PppoeCode::Padr as u8);
        assert_eq!(hdr.session_id, 0);
        // The cookie and relay id come back under their own types.
        assert!(tags.contains(&(0x0104, b"chocolate".to_vec())));
        assert!(tags.contains(&(0x0110, b"relay-id".to_vec())));

        let none = ctx.handle_frame(&server_frame(
            PppoeCode::Pads,
            0x00AB,
            &[(TagType::ServiceName, b"")],
        ));
        assert!(none.is_none());
        assert_eq!(ctx.state, DiscoveryState::Established);
        assert_eq!(ctx.session.session_id, 0x00AB);
        assert!(!ctx.retry.is_armed());
    }

    #[test]
    fn test_pado_outside_padi_sent_dropped() {
        let offer = || pado(&[(TagType::AcName, b"ac"), (TagType::ServiceName, b"")]);

        // Idle client: no discovery in flight, offer ignored.
        let mut ctx = test_context();
        assert!(ctx.handle_frame(&offer()).is_none());
        assert_eq!(ctx.state, DiscoveryState::Initial);

        // Established client: a stray offer changes nothing.
        let mut ctx = test_context();
        establish(&mut ctx);
        assert!(ctx.handle_frame(&offer()).is_none());
        assert_eq!(ctx.state, DiscoveryState::Established);
        assert_eq!(ctx.session.session_id, 0x1234);
    }

    #[test]
    fn test_pado_requires_exactly_one_ac_name() {
        let mut ctx = test_context();
        ctx.start_connect().unwrap();

        assert!(ctx
            .handle_frame(&pado(&[(TagType::ServiceName, b"")]))
            .is_none());
        assert!(ctx
            .handle_frame(&pado(&[
                (TagType::AcName, b"a"),
                (TagType::AcName, b"b"),
                (TagType::ServiceName, b""),
            ]))
            .is_none());
        assert_eq!(ctx.state, DiscoveryState::PadiSent);
    }

    #[test]
    fn test_pado_host_uniq_must_match_when_configured() {
        let mut ctx = test_context();
        ctx.host_uniq = Some(Bytes::from_static(b"mine"));
        ctx.start_connect().unwrap();

        // Missing echo.
        assert!(ctx
            .handle_frame(&pado(&[(TagType::AcName, b"ac"), (TagType::ServiceName, b"")]))
            .is_none());
        // Wrong echo.
        assert!(ctx
            .handle_frame(&pado(&[
                (TagType::AcName, b"ac"),
                (TagType::ServiceName, b""),
                (TagType::HostUniq, b"other"),
            ]))
            .is_none());
        // Correct echo.
        assert!(ctx
            .handle_frame(&pado(&[
                (TagType::AcName, b"ac"),
                (TagType::ServiceName, b""),
                (TagType::HostUniq, b"mine"),
            ]))
            .is_some());
    }

    #[test]
    fn test_pado_unsolicited_host_uniq_rejected() {
        let mut ctx = test_context();
        ctx.start_connect().unwrap();

        assert!(ctx
            .handle_frame(&pado(&[
                (TagType::AcName, b"ac"),
                (TagType::ServiceName, b""),
                (TagType::HostUniq, b"surprise"),
            ]))
            .is_none());
    }

    #[test]
    fn test_pado_service_name_matching() {
        let mut ctx = test_context();
        ctx.service_name = Bytes::from_static(b"gold");
        ctx.start_connect().unwrap();

        // Different service: rejected.
        assert!(ctx
            .handle_frame(&pado(&[
                (TagType::AcName, b"ac"),
                (TagType::ServiceName, b"silver"),
            ]))
            .is_none());
        // Zero-length wildcard: accepted even with a configured name.
        assert!(ctx
            .handle_frame(&pado(&[(TagType::AcName, b"ac"), (TagType::ServiceName, b"")]))
            .is_some());
    }

    #[test]
    fn test_pado_with_error_tag_rejected() {
        let mut ctx = test_context();
        ctx.start_connect().unwrap();

        assert!(ctx
            .handle_frame(&pado(&[
                (TagType::AcName, b"ac"),
                (TagType::ServiceName, b""),
                (TagType::AcSystemError, b"out of sessions"),
            ]))
            .is_none());
        assert_eq!(ctx.state, DiscoveryState::PadiSent);
    }

    #[test]
    fn test_first_acceptable_pado_wins() {
        let mut ctx = test_context();
        ctx.start_connect().unwrap();

        assert!(ctx
            .handle_frame(&pado(&[(TagType::AcName, b"first"), (TagType::ServiceName, b"")]))
            .is_some());
        let chosen = ctx.session.mac;

        // A second offer (same source here, but any offer) no longer
        // matches the PadrSent state and is dropped.
        assert!(ctx
            .handle_frame(&pado(&[(TagType::AcName, b"second"), (TagType::ServiceName, b"")]))
            .is_none());
        assert_eq!(ctx.session.mac, chosen);
    }

    #[test]
    fn test_pads_requires_single_valid_service_name() {
        let mut ctx = test_context();
        advance_to_padr_sent(&mut ctx);

        ctx.handle_frame(&server_frame(PppoeCode::Pads, 9, &[]));
        assert_eq!(ctx.state, DiscoveryState::PadrSent);

        ctx.handle_frame(&server_frame(
            PppoeCode::Pads,
            9,
            &[(TagType::ServiceName, b""), (TagType::ServiceName, b"")],
        ));
        assert_eq!(ctx.state, DiscoveryState::PadrSent);

        ctx.handle_frame(&server_frame(PppoeCode::Pads, 9, &[(TagType::ServiceName, b"")]));
        assert_eq!(ctx.state, DiscoveryState::Established);
    }

    #[test]
    fn test_pads_zero_session_id_rejected() {
        let mut ctx = test_context();
        advance_to_padr_sent(&mut ctx);

        ctx.handle_frame(&server_frame(PppoeCode::Pads, 0, &[(TagType::ServiceName, b"")]));
        assert_eq!(ctx.state, DiscoveryState::PadrSent);
    }

    #[test]
    fn test_pads_from_other_peer_rejected() {
        let mut ctx = test_context();
        advance_to_padr_sent(&mut ctx);

        let mut raw = server_frame(PppoeCode::Pads, 7, &[(TagType::ServiceName, b"")]);
        let mut bytes = raw.data.to_vec();
        bytes[6..12].copy_from_slice(&[0x02, 0, 0, 0, 0, 0x99]);
        raw.data = Bytes::from(bytes);

        ctx.handle_frame(&raw);
        assert_eq!(ctx.state, DiscoveryState::PadrSent);
    }

    #[test]
    fn test_peer_padt_tears_down_session() {
        let mut ctx = test_context();
        establish(&mut ctx);

        ctx.handle_frame(&server_frame(PppoeCode::Padt, 0x1234, &[]));
        assert_eq!(ctx.state, DiscoveryState::Initial);
        assert_eq!(ctx.session.session_id, 0);
    }

    #[test]
    fn test_padt_wrong_session_id_ignored() {
        let mut ctx = test_context();
        establish(&mut ctx);

        ctx.handle_frame(&server_frame(PppoeCode::Padt, 0x4321, &[]));
        assert_eq!(ctx.state, DiscoveryState::Established);
    }

    #[test]
    fn test_bad_version_type_dropped() {
        let mut ctx = test_context();
        ctx.start_connect().unwrap();

        let raw = pado(&[(TagType::AcName, b"ac"), (TagType::ServiceName, b"")]);
        let mut bytes = raw.data.to_vec();
        bytes[EthernetHeader::LEN] = 0x21;
        assert!(ctx.handle_frame(&RawFrame::new(Bytes::from(bytes))).is_none());
        assert_eq!(ctx.state, DiscoveryState::PadiSent);
    }

    #[test]
    fn test_truncated_frame_dropped() {
        let mut ctx = test_context();
        ctx.start_connect().unwrap();

        let mut raw = pado(&[(TagType::AcName, b"ac"), (TagType::ServiceName, b"")]);
        raw.truncated = true;
        assert!(ctx.handle_frame(&raw).is_none());
        assert_eq!(ctx.state, DiscoveryState::PadiSent);
    }

    #[test]
    fn test_tag_overrun_drops_packet_and_caches() {
        let mut ctx = test_context();
        ctx.start_connect().unwrap();

        // Hand-build a PADO whose last tag declares more value bytes
        // than the payload holds.
        let mut buf = FrameBuf::new(1514);
        buf.put_zeros(HEADERS_LEN).unwrap();
        append_tag(&mut buf, TagType::AcName, b"ac").unwrap();
        append_tag(&mut buf, TagType::AcCookie, b"cookie").unwrap();
        buf.put_slice(&[0x01, 0x01, 0x00, 0x40]).unwrap(); // Service-Name, length 64, no value
        let payload_len = (buf.len() - HEADERS_LEN) as u16;
        PppoeHeader::new(PppoeCode::Pado, 0, payload_len)
            .write(&mut buf.as_mut_slice()[EthernetHeader::LEN..]);
        EthernetHeader {
            dst: LOCAL,
            src: SERVER,
            ethertype: EtherType::Discovery,
        }
        .write(buf.as_mut_slice());
        buf.pad_to(EthernetHeader::MIN_FRAME_SIZE).unwrap();

        assert!(ctx.handle_frame(&RawFrame::new(buf.freeze())).is_none());
        assert_eq!(ctx.state, DiscoveryState::PadiSent);
        // The cookie seen before the bad tag must not linger.
        assert!(ctx.caches.ac_cookie.is_empty());
        assert!(ctx.caches.ac_name.is_empty());
    }

    #[test]
    fn test_oversized_cached_tag_drops_packet() {
        let mut ctx = test_context();
        ctx.start_connect().unwrap();

        let big_cookie = vec![0xAA; 65]; // limit is 64
        assert!(ctx
            .handle_frame(&pado(&[
                (TagType::AcName, b"ac"),
                (TagType::ServiceName, b""),
                (TagType::AcCookie, &big_cookie),
            ]))
            .is_none());
        assert_eq!(ctx.state, DiscoveryState::PadiSent);
        assert!(ctx.caches.ac_cookie.is_empty());
    }

    #[test]
    fn test_retry_exhaustion_resets_and_resolves_waiter() {
        let mut ctx = test_context();
        ctx.config.padi = RetryParams {
            initial_timeout: 1,
            count: 2,
        };
        ctx.start_connect().unwrap();

        let (tx, mut rx) = tokio::sync::oneshot::channel();
        ctx.waiter = Some(tx);

        // count 2, initial timeout 1: one resend at tick 1,
        // exhaustion at tick 1 + 2 = 3.
        let resend = ctx.handle_tick();
        assert!(resend.is_some());
        assert!(ctx.handle_tick().is_none()); // waiting
        assert!(ctx.handle_tick().is_none()); // exhausted

        assert_eq!(ctx.state, DiscoveryState::Initial);
        assert_eq!(rx.try_recv().unwrap(), ConnectOutcome::Exhausted);
    }

    #[test]
    fn test_padr_retransmission_echoes_cached_cookie() {
        let mut ctx = test_context();
        advance_to_padr_sent(&mut ctx);

        let out = ctx.handle_tick().unwrap();
        let (_, hdr, tags) = parse_out(&out);
        assert_eq!(hdr.code, PppoeCode::Padr as u8);
        assert!(tags.contains(&(0x0104, b"cookie".to_vec())));
    }

    #[test]
    fn test_padt_layout() {
        let mut ctx = test_context();
        establish(&mut ctx);

        let out = ctx.build_padt().unwrap();
        let (eth, hdr, _) = parse_out(&out);
        assert_eq!(eth.dst, SERVER);
        assert_eq!(hdr.code, PppoeCode::Padt as u8);
        assert_eq!(hdr.session_id, 0x1234);
        assert_eq!(out.kind, SendKind::Discovery);
    }

    #[test]
    fn test_session_frame_layout_and_padding() {
        let mut ctx = test_context();
        establish(&mut ctx);

        let out = ctx.build_session(&[0x00, 0x21, 0xDE, 0xAD]).unwrap();
        let eth = EthernetHeader::parse(&out.frame).unwrap();
        let hdr = PppoeHeader::parse(&out.frame[EthernetHeader::LEN..]).unwrap();
        assert_eq!(eth.ethertype, EtherType::Session);
        assert_eq!(hdr.code, 0);
        assert_eq!(hdr.session_id, 0x1234);
        assert_eq!(hdr.length, 4);
        // Padded to the Ethernet minimum; length still says 4.
        assert_eq!(out.frame.len(), EthernetHeader::MIN_FRAME_SIZE);
        assert_eq!(out.kind, SendKind::Session);
    }

    #[test]
    fn test_inbound_session_data_delivered_without_padding() {
        let mut ctx = test_context();
        let (session_tx, mut session_rx) = tokio::sync::mpsc::channel(4);
        ctx.session_tx = session_tx;
        establish(&mut ctx);

        ctx.handle_frame(&session_frame(0x1234, &[0xC0, 0x21, 0x01, 0x01]));
        let delivered = session_rx.try_recv().unwrap();
        assert_eq!(&delivered[..], &[0xC0, 0x21, 0x01, 0x01]);
    }

    #[test]
    fn test_inbound_session_data_wrong_id_dropped() {
        let mut ctx = test_context();
        let (session_tx, mut session_rx) = tokio::sync::mpsc::channel(4);
        ctx.session_tx = session_tx;
        establish(&mut ctx);

        ctx.handle_frame(&session_frame(0x9999, &[1, 2]));
        assert!(session_rx.try_recv().is_err());
    }

    #[test]
    fn test_inbound_session_data_before_establishment_dropped() {
        let mut ctx = test_context();
        let (session_tx, mut session_rx) = tokio::sync::mpsc::channel(4);
        ctx.session_tx = session_tx;
        ctx.start_connect().unwrap();

        ctx.handle_frame(&session_frame(0x1234, &[1, 2]));
        assert!(session_rx.try_recv().is_err());
    }

    #[test]
    fn test_full_session_consumer_drops_not_blocks() {
        let mut ctx = test_context();
        let (session_tx, _session_rx) = tokio::sync::mpsc::channel(1);
        ctx.session_tx = session_tx;
        establish(&mut ctx);

        ctx.handle_frame(&session_frame(0x1234, &[1]));
        // Queue now full; the next delivery is dropped silently.
        ctx.handle_frame(&session_frame(0x1234, &[2]));
        assert_eq!(ctx.state, DiscoveryState::Established);
    }
}
