//! The REQUEST/REPLY exchange.
//!
//! The exchange is driven by two kinds of events: timer ticks and received
//! replies. Neither blocks; transmissions are handed to the context transport.

use std::time::Instant;

use rand::Rng;

use dhcpv6_protocol::{
    DhcpOption, Duid, Message, MessageType, OptionCode, OptionTree, Parent, StatusCode,
    TRANSACTION_ID_MASK,
};

use crate::{
    backoff::{Backoff, Tick},
    candidates::{Candidate, CandidateList},
    config::{ConfigManager, ConfigState, IaKind},
    context::Context,
    error::Error,
    lease::{Lease, LeaseIa},
    reconciler::LeaseReconciler,
    storage::Storage,
    transport::{Destination, Transport},
};

/// The exchange states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Initializing,
    AwaitingCandidate,
    Building,
    AwaitingReply,
    Retransmitting,
    Answered,
    NoServersLeft,
    Failed,
}

impl State {
    /// No further ticks or replies are processed in a terminal state.
    pub fn is_terminal(self) -> bool {
        match self {
            State::Answered | State::NoServersLeft | State::Failed => true,
            _ => false,
        }
    }
}

/// The outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Nothing to do yet.
    Idle,
    Retransmitted,
    /// The retransmission bounds are exceeded. The caller decides on failover.
    Exhausted,
    /// The exchange has been abandoned because of an error.
    Failed,
    Answered,
    /// The REQUEST has been changed following the server status: either the
    /// addresses reported `NotOnLink` were stripped or the server refused
    /// unicast. The next retransmission carries the change.
    Reissued,
    /// The event does not belong to this exchange.
    Ignored,
}

/// One REQUEST/REPLY exchange on an interface.
#[derive(Debug)]
pub struct RequestExchange {
    interface: u32,
    transaction_id: u32,
    state: State,
    candidates: CandidateList,
    /// The options of the message being (re)transmitted.
    options: OptionTree,
    /// Identity associations whose configuration state the exchange drives.
    pending: Vec<(IaKind, u32)>,
    server_id: Option<Duid>,
    destination: Destination,
    backoff: Option<Backoff>,
    strip_not_on_link: bool,
    error: Option<Error>,
}

impl RequestExchange {
    fn new(interface: u32, candidates: CandidateList, strip_not_on_link: bool) -> Self {
        RequestExchange {
            interface,
            transaction_id: rand::thread_rng().gen::<u32>() & TRANSACTION_ID_MASK,
            state: State::Initializing,
            candidates,
            options: OptionTree::new(),
            pending: Vec::new(),
            server_id: None,
            destination: Destination::Multicast,
            backoff: None,
            strip_not_on_link,
            error: None,
        }
    }

    /// Starts an exchange with the head of `candidates`.
    ///
    /// `previous` holds the options of the discovery phase message. The
    /// identity associations found there are the pending ones.
    ///
    /// A failure to build the message terminates the exchange without trying
    /// the remaining candidates.
    pub fn start<C, L, T>(
        ctx: &mut Context<C, L, T>,
        interface: u32,
        candidates: CandidateList,
        previous: &OptionTree,
        now: Instant,
    ) -> Self
    where
        C: ConfigManager,
        L: Storage,
        T: Transport,
    {
        let mut exchange = Self::new(interface, candidates, ctx.settings.strip_not_on_link);
        exchange.pending = pending_ias(previous);
        exchange.state = State::AwaitingCandidate;

        let candidate = match exchange.candidates.take_head() {
            Some(candidate) => candidate,
            None => {
                error!("Unable to send REQUEST. There are no backup servers left");
                exchange.set_pending_state(&mut ctx.config, ConfigState::NotConfigured);
                exchange.state = State::NoServersLeft;
                return exchange;
            }
        };

        exchange.state = State::Building;
        if let Err(error) = exchange.build(ctx, previous, &candidate) {
            error!(
                "Unable to build REQUEST for server {} on interface {}: {}",
                candidate.duid(),
                interface,
                error
            );
            exchange.fail(ctx, error);
            return exchange;
        }
        exchange.send(ctx, now);
        exchange
    }

    /// Starts an exchange for identity associations already known to the
    /// lease database with a known server.
    pub fn with_server<C, L, T>(
        ctx: &mut Context<C, L, T>,
        interface: u32,
        ias: &[LeaseIa],
        server_id: Option<Duid>,
        now: Instant,
    ) -> Self
    where
        C: ConfigManager,
        L: Storage,
        T: Transport,
    {
        let strip_not_on_link = ctx.settings.strip_not_on_link;
        let mut exchange = Self::new(interface, CandidateList::default(), strip_not_on_link);
        exchange.pending = ias.iter().map(|ia| (ia.kind(), ia.iaid())).collect();
        // recorded only for interfaces accepting unicast
        if let Some(address) = ias.iter().filter_map(LeaseIa::unicast).next() {
            exchange.destination = Destination::Unicast(address);
        }
        exchange.state = State::Building;

        let server_id = match server_id {
            Some(server_id) => server_id,
            None => {
                error!("Unable to send REQUEST: ServerId not specified");
                exchange.fail(ctx, Error::MissingServerId);
                return exchange;
            }
        };

        let options = ctx.builder().request_for_bindings(ias, &server_id);
        match options {
            Ok(options) => {
                exchange.options = options;
                exchange.server_id = Some(server_id);
            }
            Err(error) => {
                exchange.fail(ctx, error.into());
                return exchange;
            }
        }
        exchange.send(ctx, now);
        exchange
    }

    /// Hands the options over to a new exchange with the remaining candidates.
    ///
    /// The server identity and the other transmission-scoped options are not carried over.
    pub fn fail_over<C, L, T>(self, ctx: &mut Context<C, L, T>, now: Instant) -> Self
    where
        C: ConfigManager,
        L: Storage,
        T: Transport,
    {
        info!(
            "REQUEST on interface {} has not been answered, {} server(s) left",
            self.interface,
            self.candidates.count()
        );
        let mut exchange = Self::start(ctx, self.interface, self.candidates, &self.options, now);
        // IAs known only from the bindings are not in the options
        for ia in self.pending.into_iter() {
            if !exchange.pending.contains(&ia) {
                exchange.pending.push(ia);
            }
        }
        if exchange.state == State::NoServersLeft {
            exchange.set_pending_state(&mut ctx.config, ConfigState::NotConfigured);
        }
        exchange
    }

    /// The timer event.
    pub fn on_tick<C, L, T>(&mut self, ctx: &mut Context<C, L, T>, now: Instant) -> Progress
    where
        C: ConfigManager,
        L: Storage,
        T: Transport,
    {
        if self.state != State::AwaitingReply {
            return Progress::Idle;
        }
        let (tick, elapsed) = match self.backoff.as_mut() {
            Some(backoff) => (backoff.poll(now), backoff.elapsed_time(now)),
            None => return Progress::Idle,
        };

        match tick {
            Tick::Pending => Progress::Idle,
            Tick::Retransmit => {
                self.state = State::Retransmitting;
                let refreshed = ctx.builder().set_elapsed_time(&mut self.options, elapsed);
                let result = match refreshed {
                    Ok(()) => self.transmit(ctx),
                    Err(error) => Err(error.into()),
                };
                if let Err(error) = result {
                    error!(
                        "Unable to retransmit REQUEST on interface {}: {}",
                        self.interface, error
                    );
                    self.fail(ctx, error);
                    return Progress::Failed;
                }
                self.state = State::AwaitingReply;
                Progress::Retransmitted
            }
            Tick::Exhausted => {
                warn!(
                    "REQUEST (xid {:#08x}) on interface {} exhausted after {} retransmissions",
                    self.transaction_id,
                    self.interface,
                    self.backoff.as_ref().map(Backoff::rc).unwrap_or_default()
                );
                self.state = State::Failed;
                Progress::Exhausted
            }
        }
    }

    /// The received message event.
    pub fn on_reply_received<C, L, T>(
        &mut self,
        ctx: &mut Context<C, L, T>,
        reply: &Message,
    ) -> Progress
    where
        C: ConfigManager,
        L: Storage,
        T: Transport,
    {
        if self.state != State::AwaitingReply && self.state != State::Retransmitting {
            return Progress::Ignored;
        }
        if reply.message_type != MessageType::Reply {
            debug!("Ignoring {} while awaiting REPLY", reply.message_type);
            return Progress::Ignored;
        }
        if reply.transaction_id & TRANSACTION_ID_MASK != self.transaction_id {
            debug!("Ignoring REPLY with foreign xid {:#08x}", reply.transaction_id);
            return Progress::Ignored;
        }
        if let Some(ref expected) = self.server_id {
            if reply.server_id() != Some(expected) {
                warn!("Ignoring REPLY from an unexpected server {:?}", reply.server_id());
                return Progress::Ignored;
            }
        }
        if reply.client_id() != Some(&ctx.settings.duid) {
            warn!("Ignoring REPLY for another client {:?}", reply.client_id());
            return Progress::Ignored;
        }

        let status = reply.status(Parent::Root);
        if status == StatusCode::UseMulticast {
            if let Destination::Unicast(address) = self.destination {
                info!(
                    "Server refused unicast to {} on interface {}, switching to multicast",
                    address, self.interface
                );
                self.destination = Destination::Multicast;
                return Progress::Reissued;
            }
        }
        if self.strip_not_on_link && self.strip_addresses_not_on_link(reply) {
            return Progress::Reissued;
        }

        if status.is_success() {
            let server = reply.server_id().cloned();
            for &(kind, iaid) in self.pending.iter() {
                let applied = Self::apply_ia(&mut ctx.leases, reply, server.as_ref(), kind, iaid);
                let state = match applied {
                    Ok(state) => state,
                    Err(error) => {
                        error!("Unable to store {} with IAID {}: {}", kind.code(), iaid, error);
                        ConfigState::NotConfigured
                    }
                };
                if let Some(iface) = ctx.config.interface_mut(self.interface) {
                    iface.set_state(kind, iaid, state);
                }
            }
        } else {
            warn!("REPLY on interface {} reports {}", self.interface, status);
            self.set_pending_state(&mut ctx.config, ConfigState::NotConfigured);
        }

        self.state = State::Answered;
        Progress::Answered
    }

    /// Abandons the exchange, releasing its options.
    ///
    /// Pending identity associations of an unfinished exchange become `NotConfigured`.
    pub fn cancel<C, L, T>(&mut self, ctx: &mut Context<C, L, T>)
    where
        C: ConfigManager,
        L: Storage,
        T: Transport,
    {
        self.options = OptionTree::new();
        self.backoff = None;
        if !self.state.is_terminal() {
            info!("REQUEST on interface {} cancelled", self.interface);
            self.set_pending_state(&mut ctx.config, ConfigState::NotConfigured);
            self.state = State::Failed;
        }
    }

    pub fn interface(&self) -> u32 {
        self.interface
    }

    pub fn transaction_id(&self) -> u32 {
        self.transaction_id
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state.is_terminal()
    }

    /// The candidates not tried yet.
    pub fn candidates(&self) -> &CandidateList {
        &self.candidates
    }

    pub fn options(&self) -> &OptionTree {
        &self.options
    }

    pub fn pending(&self) -> &[(IaKind, u32)] {
        self.pending.as_slice()
    }

    pub fn server_id(&self) -> Option<&Duid> {
        self.server_id.as_ref()
    }

    pub fn backoff(&self) -> Option<&Backoff> {
        self.backoff.as_ref()
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// The error which failed the exchange, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Assembles the REQUEST options for the candidate.
    fn build<C, L, T>(
        &mut self,
        ctx: &mut Context<C, L, T>,
        previous: &OptionTree,
        candidate: &Candidate,
    ) -> Result<(), Error>
    where
        C: ConfigManager,
        L: Storage,
        T: Transport,
    {
        let mut options = ctx.builder().carry_over(previous)?;
        let reconciliation = LeaseReconciler::new(&ctx.config, &mut ctx.leases).reconcile(
            self.interface,
            &mut options,
            candidate.options(),
        )?;
        debug!(
            "Reconciled {} IA(s) with the offer of server {}",
            reconciliation.replaced.len(),
            candidate.duid()
        );
        ctx.builder().finish_request(&mut options, candidate.duid())?;

        self.options = options;
        self.server_id = Some(candidate.duid().to_owned());
        // unicast only if the interface accepts it
        self.destination = match reconciliation.unicast.and(candidate.unicast()) {
            Some(address) => Destination::Unicast(address),
            None => Destination::Multicast,
        };
        Ok(())
    }

    /// Transmits the built message for the first time and arms the timer.
    fn send<C, L, T>(&mut self, ctx: &mut Context<C, L, T>, now: Instant)
    where
        C: ConfigManager,
        L: Storage,
        T: Transport,
    {
        if let Err(error) = self.transmit(ctx) {
            error!("Unable to send REQUEST on interface {}: {}", self.interface, error);
            self.fail(ctx, error);
            return;
        }
        self.set_pending_state(&mut ctx.config, ConfigState::Configuring);
        self.backoff = Some(Backoff::new(ctx.settings.timing, now));
        self.state = State::AwaitingReply;
    }

    /// Encodes the options and hands them to the transport.
    ///
    /// A transport failure is not fatal: the message is retransmitted on the next timeout.
    fn transmit<C, L, T>(&self, ctx: &mut Context<C, L, T>) -> Result<(), Error>
    where
        T: Transport,
    {
        let message = Message::new(MessageType::Request, self.transaction_id, self.options.clone());
        let packet = message.to_bytes()?;
        let destination = self.destination;
        log_send!(message, self.interface, destination);
        if let Err(error) = ctx.transport.send(self.interface, &packet, destination) {
            warn!("Socket error on interface {}: {}", self.interface, error);
        }
        Ok(())
    }

    fn fail<C, L, T>(&mut self, ctx: &mut Context<C, L, T>, error: Error)
    where
        C: ConfigManager,
    {
        self.set_pending_state(&mut ctx.config, ConfigState::NotConfigured);
        self.backoff = None;
        self.error = Some(error);
        self.state = State::Failed;
    }

    fn set_pending_state<C: ConfigManager>(&self, config: &mut C, state: ConfigState) {
        let iface = match config.interface_mut(self.interface) {
            Some(iface) => iface,
            None => {
                warn!("Unable to find interface with ifindex {}", self.interface);
                return;
            }
        };
        for &(kind, iaid) in self.pending.iter() {
            if !iface.set_state(kind, iaid, state) {
                debug!("{} with IAID {} is not configured on {}", kind.code(), iaid, iface.name);
            }
        }
    }

    /// Removes the addresses of the IA_NAs the server reports as not on link.
    ///
    /// A message-level `NotOnLink` applies to every IA_NA.
    /// Returns `false` if no address has been removed, in which case the
    /// status is handled as any other failure.
    fn strip_addresses_not_on_link(&mut self, reply: &Message) -> bool {
        let everywhere = reply.status(Parent::Root) == StatusCode::NotOnLink;
        let mut stripped = 0;

        for id in self.options.find_all(Parent::Root, OptionCode::IaNa) {
            let iaid = match self.options.get(id).and_then(DhcpOption::iaid) {
                Some(iaid) => iaid,
                None => continue,
            };
            let not_on_link = everywhere
                || match reply.options.find_ia(OptionCode::IaNa, iaid) {
                    Some(ia) => reply.status(Parent::Option(ia)) == StatusCode::NotOnLink,
                    None => false,
                };
            if not_on_link {
                let removed = self.options.remove_all(Parent::Option(id), OptionCode::IaAddr);
                if removed > 0 {
                    info!(
                        "IA_NA with IAID {} is not on link, {} address(es) removed",
                        iaid, removed
                    );
                }
                stripped += removed;
            }
        }
        stripped > 0
    }

    /// Stores the leases the REPLY assigned to an identity association.
    fn apply_ia<L: Storage>(
        leases: &mut L,
        reply: &Message,
        server: Option<&Duid>,
        kind: IaKind,
        iaid: u32,
    ) -> Result<ConfigState, Error> {
        let id = match reply.options.find_ia(kind.code(), iaid) {
            Some(id) => id,
            None => {
                warn!("REPLY does not contain {} with IAID {}", kind.code(), iaid);
                return Ok(ConfigState::NotConfigured);
            }
        };
        let status = reply.status(Parent::Option(id));
        if !status.is_success() {
            warn!("{} with IAID {} failed: {}", kind.code(), iaid, status);
            return Ok(ConfigState::NotConfigured);
        }

        let assigned: Vec<Lease> = reply
            .options
            .find_all(Parent::Option(id), kind.lease_code())
            .into_iter()
            .filter_map(|lease| reply.options.get(lease))
            .filter_map(Lease::from_option)
            .filter(|lease| lease.valid_lifetime > 0)
            .collect();
        if assigned.is_empty() {
            warn!("{} with IAID {} has no valid leases", kind.code(), iaid);
            return Ok(ConfigState::NotConfigured);
        }

        let updated = leases.update_ia(kind, iaid, &mut |ia: &mut LeaseIa| {
            ia.replace(server.cloned(), assigned.clone())
        })?;
        if !updated {
            let mut ia = LeaseIa::new(kind, iaid);
            ia.replace(server.cloned(), assigned);
            leases.add_ia(ia)?;
        }
        info!("{} with IAID {} configured", kind.code(), iaid);
        Ok(ConfigState::Configured)
    }
}

/// The identity associations requested by a message.
fn pending_ias(options: &OptionTree) -> Vec<(IaKind, u32)> {
    options
        .roots()
        .iter()
        .filter_map(|&id| options.get(id))
        .filter(|option| option.code().is_identity_association())
        .filter_map(|option| match (IaKind::from_code(option.code()), option.iaid()) {
            (Some(kind), Some(iaid)) => Some((kind, iaid)),
            _ => None,
        })
        .collect()
}
