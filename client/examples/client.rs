//! Requests an address from two simulated servers.
//!
//! The preferred server never answers, so the exchange fails over to the
//! second one. Run with `RUST_LOG=debug` to see the messages.

#[macro_use]
extern crate log;

use std::{
    io, mem,
    net::Ipv6Addr,
    thread,
    time::{Duration, Instant},
};

use eui48::MacAddress;

use dhcpv6_client::*;
use dhcpv6_protocol::{
    DhcpOption, Duid, IaAddress, IaNa, Message, MessageType, OptionCode, OptionTree, Parent,
};

const IFINDEX: u32 = 1;

/// Answers the REQUESTs addressed to one server and drops the rest.
struct LoopbackTransport {
    answering: Duid,
    replies: Vec<Vec<u8>>,
}

impl Transport for LoopbackTransport {
    fn send(&mut self, _interface: u32, packet: &[u8], destination: Destination) -> io::Result<()> {
        let request = Message::from_bytes(packet)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
        if request.server_id() != Some(&self.answering) {
            debug!("Server at {} is silent", destination);
            return Ok(());
        }

        let mut options = OptionTree::new();
        let server_id = DhcpOption::ServerId(self.answering.to_owned());
        options
            .push(Parent::Root, server_id)
            .map_err(|error| io::Error::new(io::ErrorKind::Other, error))?;
        for &code in [OptionCode::ClientId, OptionCode::IaNa].iter() {
            for id in request.options.find_all(Parent::Root, code) {
                options
                    .copy_subtree(Parent::Root, &request.options, id)
                    .map_err(|error| io::Error::new(io::ErrorKind::Other, error))?;
            }
        }
        let reply = Message::new(MessageType::Reply, request.transaction_id, options);
        let packet = reply
            .to_bytes()
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
        self.replies.push(packet);
        Ok(())
    }
}

fn advertise(id: u8, preference: u8) -> Result<Candidate, Error> {
    let mut options = OptionTree::new();
    options.push(Parent::Root, DhcpOption::Preference(preference))?;
    let ia = options.push(Parent::Root, DhcpOption::IaNa(IaNa { iaid: 1, t1: 1800, t2: 2880 }))?;
    options.push(
        Parent::Option(ia),
        DhcpOption::IaAddr(IaAddress {
            address: Ipv6Addr::new(0x2001, 0xdb8, u16::from(id), 0, 0, 0, 0, 0x100),
            preferred_lifetime: 3600,
            valid_lifetime: 7200,
        }),
    )?;
    let duid = Duid::new(vec![0, 3, 0, 1, 0, 0, 0, 0, 0, id]);
    Ok(Candidate::new(duid, preference, options))
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let mut settings = Settings::from_mac(&MacAddress::new([0x52, 0x54, 0x00, 0x12, 0x34, 0x56]));
    settings.timing = Timing {
        irt: Duration::from_millis(200),
        mrt: Duration::from_secs(1),
        mrc: 2,
        mrd: Duration::from_secs(0),
    };

    let mut solicit = OptionTree::new();
    solicit.push(Parent::Root, DhcpOption::ClientId(settings.duid.to_owned()))?;
    solicit.push(Parent::Root, DhcpOption::OptionRequest(vec![OptionCode::Unicast]))?;
    solicit.push(Parent::Root, DhcpOption::IaNa(IaNa { iaid: 1, t1: 0, t2: 0 }))?;

    let iface = InterfaceConfig::new(IFINDEX, "eth0").with_ia(IaKind::Na, 1);
    let config = StaticConfig::new(vec![iface]);
    let transport = LoopbackTransport {
        answering: Duid::new(vec![0, 3, 0, 1, 0, 0, 0, 0, 0, 2]),
        replies: Vec::new(),
    };
    let mut client = Client::new(Context::new(config, RamStorage::new(), transport, settings));

    let candidates = CandidateList::by_preference(vec![advertise(2, 10)?, advertise(1, 255)?]);
    let handle = client.request(IFINDEX, candidates, &solicit, Instant::now())?;

    loop {
        for (handle, progress) in client.on_tick(Instant::now()) {
            info!("{:?}: {:?}", handle, progress);
        }
        let replies = mem::replace(&mut client.context_mut().transport.replies, Vec::new());
        for packet in replies.iter() {
            client.on_reply_received(IFINDEX, packet)?;
        }

        match client.exchange(&handle) {
            Some(exchange) if !exchange.is_done() => thread::sleep(Duration::from_millis(20)),
            Some(exchange) => {
                info!("Exchange finished in state {:?}", exchange.state());
                break;
            }
            None => break,
        }
    }

    if let Some(ia) = client.context().leases.get_ia(IaKind::Na, 1)? {
        for lease in ia.leases() {
            info!("Leased {} from {:?}", lease.address, ia.server());
        }
    }
    Ok(())
}
