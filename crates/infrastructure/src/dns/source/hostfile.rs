use super::{RequestContext, ResolutionContext, Source, SourceKind};
use crate::dns::message::{fqdn, reply_to};
use async_trait::async_trait;
use hickory_proto::op::Message;
use hickory_proto::rr::rdata::{A, AAAA, CNAME, PTR};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use rustc_hash::FxHashMap;
use std::net::IpAddr;
use std::path::Path;
use tracing::debug;
use weir_dns_domain::domain_name::{reverse_lookup_domain, trim_comments};
use weir_dns_domain::{glob_match, normalize_domain, DomainError};

/// Answers from a hosts-style file (`ip name...` and `target alias...` lines).
/// Everything is held in memory and answered with a zero TTL.
pub struct HostFileSource {
    path: String,
    hosts: FxHashMap<String, Vec<IpAddr>>,
    wildcards: Vec<(String, Vec<IpAddr>)>,
    aliases: FxHashMap<String, String>,
    reverse: FxHashMap<String, Vec<String>>,
}

impl HostFileSource {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DomainError::IoError(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_lines(path.display().to_string(), content.lines()))
    }

    pub fn from_lines<'l>(path: impl Into<String>, lines: impl IntoIterator<Item = &'l str>) -> Self {
        let mut source = Self {
            path: path.into(),
            hosts: FxHashMap::default(),
            wildcards: Vec::new(),
            aliases: FxHashMap::default(),
            reverse: FxHashMap::default(),
        };

        for line in lines {
            source.parse_line(line);
        }

        debug!(
            path = %source.path,
            hosts = source.hosts.len(),
            wildcards = source.wildcards.len(),
            aliases = source.aliases.len(),
            "Host file loaded"
        );
        source
    }

    fn parse_line(&mut self, line: &str) {
        let line = line.to_ascii_lowercase();
        let line = trim_comments(&line).trim().replace([',', '\t'], " ");
        if line.is_empty() || line.starts_with('*') {
            return;
        }

        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            return;
        };
        let names: Vec<String> = tokens.map(normalize_domain).filter(|n| !n.is_empty()).collect();
        if names.is_empty() {
            return;
        }

        match first.parse::<IpAddr>() {
            Ok(ip) => {
                self.reverse
                    .entry(reverse_lookup_domain(&ip))
                    .or_default()
                    .extend(names.iter().cloned());

                for name in names {
                    if name.contains('*') {
                        match self.wildcards.iter_mut().find(|(pattern, _)| *pattern == name) {
                            Some((_, ips)) => ips.push(ip),
                            None => self.wildcards.push((name, vec![ip])),
                        }
                    } else {
                        self.hosts.entry(name).or_default().push(ip);
                    }
                }
            }
            Err(_) => {
                let target = normalize_domain(first);
                for alias in names {
                    self.aliases.entry(alias).or_insert_with(|| target.clone());
                }
            }
        }
    }

    fn addresses(&self, name: &str) -> Option<&[IpAddr]> {
        if let Some(ips) = self.hosts.get(name) {
            return Some(ips);
        }
        self.wildcards
            .iter()
            .find(|(pattern, _)| glob_match(pattern, name))
            .map(|(_, ips)| ips.as_slice())
    }

    fn address_records(&self, owner: &Name, name: &str, qtype: RecordType, out: &mut Vec<Record>) {
        let Some(ips) = self.addresses(name) else {
            return;
        };
        for ip in ips {
            let rdata = match (ip, qtype) {
                (IpAddr::V4(v4), RecordType::A | RecordType::ANY) => RData::A(A(*v4)),
                (IpAddr::V6(v6), RecordType::AAAA | RecordType::ANY) => RData::AAAA(AAAA(*v6)),
                _ => continue,
            };
            out.push(Record::from_rdata(owner.clone(), 0, rdata));
        }
    }

    fn alias_record(&self, owner: &Name, name: &str) -> Option<(Record, String)> {
        let target = self.aliases.get(name)?;
        let target_name = fqdn(target).ok()?;
        Some((
            Record::from_rdata(owner.clone(), 0, RData::CNAME(CNAME(target_name))),
            target.clone(),
        ))
    }

    fn pointer_records(&self, owner: &Name, name: &str, out: &mut Vec<Record>) {
        let Some(names) = self.reverse.get(name) else {
            return;
        };
        for target in names.iter().filter(|n| !n.contains('*')) {
            if let Ok(target) = fqdn(target) {
                out.push(Record::from_rdata(owner.clone(), 0, RData::PTR(PTR(target))));
            }
        }
    }
}

#[async_trait]
impl Source for HostFileSource {
    fn name(&self) -> String {
        format!("hostfile:{}", self.path)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::HostFile
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
        if !matches!(
            qtype,
            RecordType::A | RecordType::AAAA | RecordType::PTR | RecordType::CNAME | RecordType::ANY
        ) {
            return Ok(None);
        }

        let owner = question.name().clone();
        let name = normalize_domain(&owner.to_ascii());
        let mut answers = Vec::new();

        match qtype {
            RecordType::CNAME => {
                if let Some((cname, _)) = self.alias_record(&owner, &name) {
                    answers.push(cname);
                }
            }
            RecordType::A | RecordType::AAAA => match self.alias_record(&owner, &name) {
                Some((cname, target)) => {
                    answers.push(cname);
                    if let Ok(target_owner) = fqdn(&target) {
                        self.address_records(&target_owner, &target, qtype, &mut answers);
                    }
                }
                None => self.address_records(&owner, &name, qtype, &mut answers),
            },
            RecordType::PTR => self.pointer_records(&owner, &name, &mut answers),
            _ => {
                if let Some((cname, _)) = self.alias_record(&owner, &name) {
                    answers.push(cname);
                }
                self.address_records(&owner, &name, qtype, &mut answers);
                self.pointer_records(&owner, &name, &mut answers);
            }
        }

        if answers.is_empty() {
            return Ok(None);
        }

        let mut response = reply_to(request);
        response.set_authoritative(true);
        response.add_answers(answers);

        ctx.stored = true;
        ctx.source_used = Some(self.name());
        Ok(Some(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::Query;
    use std::net::{Ipv4Addr, Ipv6Addr};

    const HOSTS: &str = "\
# local network
192.168.1.10   nas.lan nas
192.168.1.20\tprinter.lan,printer   // office
fe80::1        router.lan
10.0.0.5       *.dev.lan
nas.lan        files.lan storage
127.0.0.1      localhost
";

    fn source() -> HostFileSource {
        HostFileSource::from_lines("hosts", HOSTS.lines())
    }

    fn request(name: &str, qtype: RecordType) -> Message {
        let mut message = Message::new();
        message.set_id(3);
        message.add_query(Query::query(fqdn(name).unwrap(), qtype));
        message
    }

    async fn ask(source: &HostFileSource, name: &str, qtype: RecordType) -> Option<Message> {
        let mut ctx = ResolutionContext::new();
        source
            .answer(&RequestContext::default(), &mut ctx, &request(name, qtype))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_forward_lookup() {
        let source = source();
        let response = ask(&source, "NAS.lan", RecordType::A).await.unwrap();
        assert_eq!(response.id(), 3);
        assert_eq!(response.answers().len(), 1);
        assert_eq!(response.answers()[0].ttl(), 0);
        assert_eq!(
            response.answers()[0].data(),
            Some(&RData::A(A(Ipv4Addr::new(192, 168, 1, 10))))
        );
    }

    #[tokio::test]
    async fn test_tabs_and_commas_separate_names() {
        let source = source();
        assert!(ask(&source, "printer", RecordType::A).await.is_some());
        assert!(ask(&source, "printer.lan", RecordType::A).await.is_some());
    }

    #[tokio::test]
    async fn test_aaaa_only_for_v6() {
        let source = source();
        assert!(ask(&source, "router.lan", RecordType::A).await.is_none());
        let response = ask(&source, "router.lan", RecordType::AAAA).await.unwrap();
        assert_eq!(
            response.answers()[0].data(),
            Some(&RData::AAAA(AAAA("fe80::1".parse::<Ipv6Addr>().unwrap())))
        );
    }

    #[tokio::test]
    async fn test_wildcard_entries() {
        let source = source();
        let response = ask(&source, "api.dev.lan", RecordType::A).await.unwrap();
        assert_eq!(
            response.answers()[0].data(),
            Some(&RData::A(A(Ipv4Addr::new(10, 0, 0, 5))))
        );
        assert!(ask(&source, "dev.lan", RecordType::A).await.is_none());
    }

    #[tokio::test]
    async fn test_alias_returns_cname_then_target() {
        let source = source();
        let response = ask(&source, "storage", RecordType::A).await.unwrap();
        let answers = response.answers();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].record_type(), RecordType::CNAME);
        assert_eq!(answers[1].record_type(), RecordType::A);
        assert_eq!(answers[1].name(), &fqdn("nas.lan").unwrap());
    }

    #[tokio::test]
    async fn test_reverse_lookup() {
        let source = source();
        let response = ask(&source, "20.1.168.192.in-addr.arpa", RecordType::PTR)
            .await
            .unwrap();
        let targets: Vec<_> = response
            .answers()
            .iter()
            .filter_map(|r| match r.data() {
                Some(RData::PTR(ptr)) => Some(ptr.0.to_ascii()),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec!["printer.lan.", "printer."]);
    }

    #[tokio::test]
    async fn test_marks_context_stored() {
        let source = source();
        let mut ctx = ResolutionContext::new();
        source
            .answer(&RequestContext::default(), &mut ctx, &request("nas", RecordType::A))
            .await
            .unwrap()
            .unwrap();
        assert!(ctx.stored);
        assert_eq!(ctx.source_used.as_deref(), Some("hostfile:hosts"));
    }

    #[tokio::test]
    async fn test_unsupported_type_is_skipped() {
        let source = source();
        assert!(ask(&source, "nas.lan", RecordType::MX).await.is_none());
    }
}
