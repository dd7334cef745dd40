//! Captive-portal DNS responder.
//!
//! Only relevant while no uplink has an address: devices joining the node's
//! configuration hotspot resolve every name to the portal address. Each
//! query gets a single A record answer (TTL 60) regardless of the queried
//! name; malformed or truncated frames are silently discarded.

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::Result;

/// Fixed DNS header size; anything shorter is discarded.
const HEADER_LEN: usize = 12;

/// Largest frame we accept or emit.
const MAX_FRAME: usize = 512;

/// Answer TTL in seconds.
const ANSWER_TTL: u32 = 60;

/// Standard response, no error, recursion available.
const RESPONSE_FLAGS: u16 = 0x8180;

/// Compressed-name pointer back to the question at offset 12.
const QUESTION_POINTER: u16 = 0xC00C;

/// UDP responder answering every query with the portal address.
pub struct CaptivePortalDns {
    socket: UdpSocket,
    redirect: Ipv4Addr,
    cancel: CancellationToken,
}

impl CaptivePortalDns {
    /// Bind the responder socket.
    pub async fn bind(
        listen: SocketAddr,
        redirect: Ipv4Addr,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(listen).await?;
        info!("captive portal DNS bound on {} -> {redirect}", socket.local_addr()?);
        Ok(Self { socket, redirect, cancel })
    }

    /// Address the socket actually bound (port 0 resolves here).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Serve queries until cancelled.
    pub async fn run(self) {
        let mut buf = [0u8; MAX_FRAME];
        loop {
            let (len, peer) = tokio::select! {
                _ = self.cancel.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok(received) => received,
                    Err(e) => {
                        warn!("DNS receive failed: {e}");
                        continue;
                    }
                },
            };

            let Some(response) = build_response(&buf[..len], self.redirect) else {
                trace!("discarding malformed DNS frame ({len} bytes) from {peer}");
                continue;
            };
            if let Err(e) = self.socket.send_to(&response, peer).await {
                warn!("DNS send to {peer} failed: {e}");
            }
        }
        info!("captive portal DNS stopped");
    }
}

/// Build the redirect answer for one query frame.
///
/// Returns `None` for frames shorter than the header or with a truncated
/// question section; those are dropped without a response.
pub(crate) fn build_response(query: &[u8], redirect: Ipv4Addr) -> Option<Vec<u8>> {
    if query.len() < HEADER_LEN {
        return None;
    }

    // Walk the QNAME labels to find the end of the question section,
    // collecting the printable name for the log line.
    let mut offset = HEADER_LEN;
    let mut name = String::new();
    loop {
        let len = *query.get(offset)? as usize;
        offset += 1;
        if len == 0 {
            break;
        }
        // Compression pointers never appear in the question we serve.
        if len & 0xC0 != 0 {
            return None;
        }
        let label = query.get(offset..offset + len)?;
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(&String::from_utf8_lossy(label));
        offset += len;
    }
    // QTYPE + QCLASS must be present in full.
    let question_end = offset.checked_add(4)?;
    if query.len() < question_end {
        return None;
    }
    debug!("DNS query for '{name}', answering with {redirect}");

    // Echo the header and question, then append our single answer.
    let mut response = Vec::with_capacity(question_end + 16);
    response.extend_from_slice(&query[..question_end]);
    response[2..4].copy_from_slice(&RESPONSE_FLAGS.to_be_bytes());
    response[6..8].copy_from_slice(&1u16.to_be_bytes()); // ANCOUNT
    response[8..10].copy_from_slice(&0u16.to_be_bytes()); // NSCOUNT
    response[10..12].copy_from_slice(&0u16.to_be_bytes()); // ARCOUNT

    response.extend_from_slice(&QUESTION_POINTER.to_be_bytes());
    response.extend_from_slice(&1u16.to_be_bytes()); // TYPE A
    response.extend_from_slice(&1u16.to_be_bytes()); // CLASS IN
    response.extend_from_slice(&ANSWER_TTL.to_be_bytes());
    response.extend_from_slice(&4u16.to_be_bytes()); // RDLENGTH
    response.extend_from_slice(&redirect.octets());

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTAL: Ipv4Addr = Ipv4Addr::new(192, 168, 11, 111);

    /// A-record query for the given dotted name.
    fn query_for(name: &str) -> Vec<u8> {
        let mut frame = vec![
            0x12, 0x34, // ID
            0x01, 0x00, // RD
            0x00, 0x01, // QDCOUNT
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        for label in name.split('.') {
            frame.push(label.len() as u8);
            frame.extend_from_slice(label.as_bytes());
        }
        frame.push(0);
        frame.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]); // QTYPE A, CLASS IN
        frame
    }

    #[test]
    fn answers_any_name_with_portal_address() {
        for name in ["www.espconf.com", "connectivitycheck.gstatic.com", "a.b"] {
            let response = build_response(&query_for(name), PORTAL).unwrap();

            // ID echoed, response flags, one answer.
            assert_eq!(&response[0..2], &[0x12, 0x34]);
            assert_eq!(u16::from_be_bytes([response[2], response[3]]), 0x8180);
            assert_eq!(u16::from_be_bytes([response[6], response[7]]), 1);

            // The answer record sits after the echoed question.
            let answer = &response[response.len() - 16..];
            assert_eq!(u16::from_be_bytes([answer[0], answer[1]]), 0xC00C);
            assert_eq!(u16::from_be_bytes([answer[2], answer[3]]), 1); // A
            assert_eq!(u16::from_be_bytes([answer[4], answer[5]]), 1); // IN
            assert_eq!(
                u32::from_be_bytes([answer[6], answer[7], answer[8], answer[9]]),
                60
            );
            assert_eq!(u16::from_be_bytes([answer[10], answer[11]]), 4);
            assert_eq!(&answer[12..16], &PORTAL.octets());
        }
    }

    #[test]
    fn short_frames_are_discarded() {
        assert!(build_response(&[], PORTAL).is_none());
        assert!(build_response(&[0u8; 11], PORTAL).is_none());
    }

    #[test]
    fn truncated_question_is_discarded() {
        let mut frame = query_for("www.espconf.com");
        // Cut inside the QNAME.
        frame.truncate(HEADER_LEN + 2);
        assert!(build_response(&frame, PORTAL).is_none());

        // Cut inside QTYPE/QCLASS.
        let mut frame = query_for("www.espconf.com");
        let len = frame.len();
        frame.truncate(len - 3);
        assert!(build_response(&frame, PORTAL).is_none());
    }

    #[test]
    fn header_only_frame_is_discarded() {
        // 12 bytes of header but no question to echo an answer pointer at.
        let frame = [0u8; HEADER_LEN];
        // QNAME walk immediately reads offset 12, which is absent.
        assert!(build_response(&frame, PORTAL).is_none());
    }

    #[tokio::test]
    async fn responds_over_a_real_socket() {
        let cancel = CancellationToken::new();
        let server = CaptivePortalDns::bind("127.0.0.1:0".parse().unwrap(), PORTAL, cancel.clone())
            .await
            .unwrap();
        let server_addr = server.local_addr().unwrap();
        let task = tokio::spawn(server.run());

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(&query_for("portal.test"), server_addr).await.unwrap();

        let mut buf = [0u8; MAX_FRAME];
        let (len, _) = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            client.recv_from(&mut buf),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(&buf[len - 4..len], &PORTAL.octets());

        cancel.cancel();
        task.await.unwrap();
    }
}
