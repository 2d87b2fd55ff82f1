#![allow(dead_code)]

use std::{io, net::Ipv6Addr};

use dhcpv6_client::*;
use dhcpv6_protocol::{
    DhcpOption, Duid, IaAddress, IaNa, IaPd, IaTa, Message, MessageType, OptionCode, OptionTree,
    Parent, StatusCode,
};

pub const IFINDEX: u32 = 2;

#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Vec<(u32, Vec<u8>, Destination)>,
}

impl Transport for RecordingTransport {
    fn send(&mut self, interface: u32, packet: &[u8], destination: Destination) -> io::Result<()> {
        self.sent.push((interface, packet.to_vec(), destination));
        Ok(())
    }
}

pub type TestContext = Context<StaticConfig, RamStorage, RecordingTransport>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn address(ia: u16, last: u16) -> DhcpOption {
    DhcpOption::IaAddr(IaAddress {
        address: Ipv6Addr::new(0x2001, 0xdb8, 0, ia, 0, 0, 0, last),
        preferred_lifetime: 3600,
        valid_lifetime: 7200,
    })
}

pub fn server(id: u8) -> Duid {
    Duid::new(vec![0, 3, 0, 1, 0x52, 0x54, 0, 0, 0, id])
}

pub fn client_duid() -> Duid {
    Duid::new(vec![0, 3, 0, 1, 2, 2, 2, 2, 2, 2])
}

pub fn interface() -> InterfaceConfig {
    InterfaceConfig::new(IFINDEX, "eth0")
        .with_ia(IaKind::Na, 7)
        .with_ia(IaKind::Na, 8)
        .with_ia(IaKind::Ta, 2)
        .with_ia(IaKind::Pd, 3)
}

pub fn context(interfaces: Vec<InterfaceConfig>, strip_not_on_link: bool) -> TestContext {
    let mut settings = Settings::new(client_duid());
    settings.strip_not_on_link = strip_not_on_link;
    Context::new(
        StaticConfig::new(interfaces),
        RamStorage::new(),
        RecordingTransport::default(),
        settings,
    )
}

/// The options of the SOLICIT which preceded the exchange.
pub fn solicit() -> OptionTree {
    let mut options = OptionTree::new();
    options.push(Parent::Root, DhcpOption::ClientId(client_duid())).unwrap();
    options.push(Parent::Root, DhcpOption::ElapsedTime(300)).unwrap();
    options.push(Parent::Root, DhcpOption::AaaAuth(vec![1, 2, 3])).unwrap();
    options
        .push(
            Parent::Root,
            DhcpOption::OptionRequest(vec![OptionCode::KeyGeneration, OptionCode::Unicast]),
        )
        .unwrap();
    let na = options
        .push(Parent::Root, DhcpOption::IaNa(IaNa { iaid: 7, t1: 0, t2: 0 }))
        .unwrap();
    options.push(Parent::Option(na), address(7, 0xdead)).unwrap();
    options
        .push(Parent::Root, DhcpOption::IaNa(IaNa { iaid: 8, t1: 0, t2: 0 }))
        .unwrap();
    options.push(Parent::Root, DhcpOption::IaTa(IaTa { iaid: 2 })).unwrap();
    options
        .push(Parent::Root, DhcpOption::IaPd(IaPd { iaid: 3, t1: 0, t2: 0 }))
        .unwrap();
    options
}

pub fn advertise(id: u8) -> Candidate {
    let mut options = OptionTree::new();
    options.push(Parent::Root, DhcpOption::ServerId(server(id))).unwrap();
    for &iaid in [7u32, 8].iter() {
        let na = options
            .push(Parent::Root, DhcpOption::IaNa(IaNa { iaid, t1: 1800, t2: 2880 }))
            .unwrap();
        options
            .push(Parent::Option(na), address(iaid as u16, u16::from(id)))
            .unwrap();
    }
    Candidate::from_advertise(Message::new(MessageType::Advertise, 1, options)).unwrap()
}

pub fn candidates(ids: &[u8]) -> CandidateList {
    CandidateList::new(ids.iter().map(|&id| advertise(id)).collect())
}

pub fn reply(exchange: &RequestExchange, server_id: Duid, not_on_link: Option<u32>) -> Message {
    let mut options = OptionTree::new();
    options.push(Parent::Root, DhcpOption::ServerId(server_id)).unwrap();
    options.push(Parent::Root, DhcpOption::ClientId(client_duid())).unwrap();
    for &iaid in [7u32, 8].iter() {
        let na = options
            .push(Parent::Root, DhcpOption::IaNa(IaNa { iaid, t1: 1800, t2: 2880 }))
            .unwrap();
        if not_on_link == Some(iaid) {
            options
                .push(
                    Parent::Option(na),
                    DhcpOption::StatusCode(StatusCode::NotOnLink, "not on link".to_owned()),
                )
                .unwrap();
        } else {
            options.push(Parent::Option(na), address(iaid as u16, 1)).unwrap();
        }
    }
    Message::new(MessageType::Reply, exchange.transaction_id(), options)
}

pub fn state(ctx: &TestContext, kind: IaKind, iaid: u32) -> ConfigState {
    ctx.config.interface(IFINDEX).unwrap().ia(kind, iaid).unwrap().state
}

pub fn addresses(options: &OptionTree, iaid: u32) -> usize {
    let ia = options.find_ia(OptionCode::IaNa, iaid).unwrap();
    options.find_all(Parent::Option(ia), OptionCode::IaAddr).len()
}
