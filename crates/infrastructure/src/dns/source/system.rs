use super::{RequestContext, ResolutionContext, Source, SourceKind, SYNTHESIZED_TTL};
use crate::dns::message::{fqdn, reply_to};
use async_trait::async_trait;
use hickory_proto::op::Message;
use hickory_proto::rr::rdata::{A, AAAA, PTR};
use hickory_proto::rr::{RData, Record, RecordType};
use std::ffi::CStr;
use std::net::IpAddr;
use tracing::debug;
use weir_dns_domain::domain_name::ip_from_reverse_domain;
use weir_dns_domain::{normalize_domain, DomainError};

const HOST_BUFFER_LEN: usize = 1025;

/// Delegates A, AAAA, CNAME and PTR questions to the operating system resolver.
#[derive(Debug, Default)]
pub struct SystemSource;

impl SystemSource {
    pub fn new() -> Self {
        Self
    }

    async fn forward(&self, name: &str, qtype: RecordType) -> Vec<RData> {
        let addrs = match tokio::net::lookup_host((name, 0)).await {
            Ok(addrs) => addrs,
            Err(e) => {
                debug!(name, error = %e, "System lookup failed");
                return Vec::new();
            }
        };

        let mut seen = Vec::new();
        let mut rdatas = Vec::new();
        for addr in addrs {
            let ip = addr.ip();
            if seen.contains(&ip) {
                continue;
            }
            seen.push(ip);

            match (ip, qtype) {
                (IpAddr::V4(v4), RecordType::A | RecordType::CNAME) => rdatas.push(RData::A(A(v4))),
                (IpAddr::V6(v6), RecordType::AAAA | RecordType::CNAME) => {
                    rdatas.push(RData::AAAA(AAAA(v6)))
                }
                _ => {}
            }
        }
        rdatas
    }

    async fn reverse(&self, name: &str) -> Vec<RData> {
        let Some(ip) = ip_from_reverse_domain(name) else {
            return Vec::new();
        };

        let host = match tokio::task::spawn_blocking(move || reverse_lookup(ip)).await {
            Ok(Some(host)) => host,
            Ok(None) => return Vec::new(),
            Err(e) => {
                debug!(%ip, error = %e, "Reverse lookup task failed");
                return Vec::new();
            }
        };

        fqdn(&host)
            .map(|target| vec![RData::PTR(PTR(target))])
            .unwrap_or_default()
    }
}

/// Blocking `getnameinfo` call that insists on a name (`NI_NAMEREQD`).
fn reverse_lookup(ip: IpAddr) -> Option<String> {
    let mut host = [0 as libc::c_char; HOST_BUFFER_LEN];

    // SAFETY: the socket address structs are zero-initialized plain data with
    // only the family and address set, and `host` outlives the call.
    let rc = unsafe {
        match ip {
            IpAddr::V4(v4) => {
                let mut sin: libc::sockaddr_in = std::mem::zeroed();
                sin.sin_family = libc::AF_INET as libc::sa_family_t;
                sin.sin_addr.s_addr = u32::from_ne_bytes(v4.octets());
                libc::getnameinfo(
                    &sin as *const libc::sockaddr_in as *const libc::sockaddr,
                    std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                    host.as_mut_ptr(),
                    HOST_BUFFER_LEN as libc::socklen_t,
                    std::ptr::null_mut(),
                    0,
                    libc::NI_NAMEREQD,
                )
            }
            IpAddr::V6(v6) => {
                let mut sin6: libc::sockaddr_in6 = std::mem::zeroed();
                sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
                sin6.sin6_addr.s6_addr = v6.octets();
                libc::getnameinfo(
                    &sin6 as *const libc::sockaddr_in6 as *const libc::sockaddr,
                    std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
                    host.as_mut_ptr(),
                    HOST_BUFFER_LEN as libc::socklen_t,
                    std::ptr::null_mut(),
                    0,
                    libc::NI_NAMEREQD,
                )
            }
        }
    };

    if rc != 0 {
        return None;
    }

    // SAFETY: getnameinfo NUL-terminates `host` on success.
    let name = unsafe { CStr::from_ptr(host.as_ptr()) };
    name.to_str().ok().map(str::to_string).filter(|n| !n.is_empty())
}

#[async_trait]
impl Source for SystemSource {
    fn name(&self) -> String {
        "system".to_string()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::System
    }

    async fn answer(
        &self,
        _rcon: &RequestContext,
        ctx: &mut ResolutionContext<'_>,
        request: &Message,
    ) -> Result<Option<Message>, DomainError> {
        let Some(question) = request.queries().first() else {
            return Ok(None);
        };

        let qtype = question.query_type();
        let name = normalize_domain(&question.name().to_ascii());

        let rdatas = match qtype {
            RecordType::A | RecordType::AAAA | RecordType::CNAME => self.forward(&name, qtype).await,
            RecordType::PTR => self.reverse(&name).await,
            _ => return Ok(None),
        };

        if rdatas.is_empty() {
            return Ok(None);
        }

        let owner = question.name().clone();
        let mut response = reply_to(request);
        response.set_authoritative(true);
        response.add_answers(
            rdatas
                .into_iter()
                .map(|rdata| Record::from_rdata(owner.clone(), SYNTHESIZED_TTL, rdata)),
        );

        ctx.source_used = Some(self.name());
        Ok(Some(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::Query;

    fn request(name: &str, qtype: RecordType) -> Message {
        let mut message = Message::new();
        message.add_query(Query::query(fqdn(name).unwrap(), qtype));
        message
    }

    #[tokio::test]
    async fn test_literal_forward_lookup() {
        let source = SystemSource::new();
        let mut ctx = ResolutionContext::new();
        let response = source
            .answer(&RequestContext::default(), &mut ctx, &request("127.0.0.1", RecordType::A))
            .await
            .unwrap()
            .expect("address literals resolve without a network");

        assert_eq!(response.answers().len(), 1);
        assert_eq!(response.answers()[0].ttl(), SYNTHESIZED_TTL);
        assert_eq!(response.answers()[0].name(), &fqdn("127.0.0.1").unwrap());
        assert_eq!(ctx.source_used.as_deref(), Some("system"));
    }

    #[tokio::test]
    async fn test_unsupported_type_is_skipped() {
        let source = SystemSource::new();
        let mut ctx = ResolutionContext::new();
        let response = source
            .answer(&RequestContext::default(), &mut ctx, &request("localhost", RecordType::MX))
            .await
            .unwrap();
        assert!(response.is_none());
        assert!(ctx.source_used.is_none());
    }
}
