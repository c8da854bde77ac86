pub mod builders;
pub mod dns_server_mock;

#[allow(unused_imports)]
pub use builders::{filter_list, first_ipv4, query, Behaviour, MockSource};
#[allow(unused_imports)]
pub use dns_server_mock::MockDnsServer;
