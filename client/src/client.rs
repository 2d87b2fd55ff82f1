//! The client exchange manager.

use std::{collections::HashMap, time::Instant};

use dhcpv6_protocol::{Duid, Message, MessageType, OptionTree};

use crate::{
    candidates::CandidateList,
    config::ConfigManager,
    context::Context,
    error::Error,
    lease::LeaseIa,
    request::{Progress, RequestExchange},
    storage::Storage,
    transport::Transport,
};

/// Identifies the exchange of a message type on an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeHandle {
    pub interface: u32,
    pub message_type: MessageType,
}

impl ExchangeHandle {
    pub fn request(interface: u32) -> Self {
        ExchangeHandle {
            interface,
            message_type: MessageType::Request,
        }
    }
}

/// Owns the context and the active exchanges of one client process.
///
/// At most one exchange per interface and message type is active at a time.
pub struct Client<C, L, T> {
    context: Context<C, L, T>,
    exchanges: HashMap<ExchangeHandle, RequestExchange>,
}

impl<C, L, T> Client<C, L, T>
where
    C: ConfigManager,
    L: Storage,
    T: Transport,
{
    pub fn new(context: Context<C, L, T>) -> Self {
        Client {
            context,
            exchanges: HashMap::new(),
        }
    }

    /// Sends a REQUEST to the best of the `candidates`.
    ///
    /// The returned handle refers to the exchange even if it failed right away.
    ///
    /// # Errors
    /// `Error::ExchangeInProgress` if a REQUEST is already being made on the interface.
    pub fn request(
        &mut self,
        interface: u32,
        candidates: CandidateList,
        previous: &OptionTree,
        now: Instant,
    ) -> Result<ExchangeHandle, Error> {
        let handle = self.vacant(interface)?;
        let exchange =
            RequestExchange::start(&mut self.context, interface, candidates, previous, now);
        self.exchanges.insert(handle, exchange);
        Ok(handle)
    }

    /// Sends a REQUEST for the lease database records to a known server.
    pub fn request_bindings(
        &mut self,
        interface: u32,
        ias: &[LeaseIa],
        server_id: Option<Duid>,
        now: Instant,
    ) -> Result<ExchangeHandle, Error> {
        let handle = self.vacant(interface)?;
        let exchange =
            RequestExchange::with_server(&mut self.context, interface, ias, server_id, now);
        self.exchanges.insert(handle, exchange);
        Ok(handle)
    }

    /// Dispatches the timer event to every active exchange.
    ///
    /// An exhausted exchange is replaced by one with the next candidate.
    pub fn on_tick(&mut self, now: Instant) -> Vec<(ExchangeHandle, Progress)> {
        let handles: Vec<ExchangeHandle> = self.exchanges.keys().cloned().collect();
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let mut exchange = match self.exchanges.remove(&handle) {
                Some(exchange) => exchange,
                None => continue,
            };
            let progress = exchange.on_tick(&mut self.context, now);
            if progress == Progress::Exhausted {
                exchange = exchange.fail_over(&mut self.context, now);
            }
            self.exchanges.insert(handle, exchange);
            if progress != Progress::Idle {
                results.push((handle, progress));
            }
        }
        results
    }

    /// Dispatches a received datagram.
    ///
    /// # Errors
    /// `Error::Codec` if the datagram is not a valid DHCPv6 message.
    pub fn on_reply_received(&mut self, interface: u32, packet: &[u8]) -> Result<Progress, Error> {
        let message = Message::from_bytes(packet)?;
        log_receive!(message, interface);
        if message.message_type != MessageType::Reply {
            return Ok(Progress::Ignored);
        }
        match self.exchanges.get_mut(&ExchangeHandle::request(interface)) {
            Some(exchange) => Ok(exchange.on_reply_received(&mut self.context, &message)),
            None => {
                debug!("No exchange is awaiting a REPLY on interface {}", interface);
                Ok(Progress::Ignored)
            }
        }
    }

    /// Cancels every exchange on the interface, e.g. when the link goes down.
    ///
    /// Returns the number of cancelled exchanges.
    pub fn cancel(&mut self, interface: u32) -> usize {
        let handles: Vec<ExchangeHandle> = self
            .exchanges
            .keys()
            .filter(|handle| handle.interface == interface)
            .cloned()
            .collect();
        for handle in handles.iter() {
            if let Some(mut exchange) = self.exchanges.remove(handle) {
                exchange.cancel(&mut self.context);
            }
        }
        handles.len()
    }

    /// Forgets the finished exchanges. Returns how many were removed.
    pub fn reap(&mut self) -> usize {
        let before = self.exchanges.len();
        self.exchanges.retain(|_, exchange| !exchange.is_done());
        before - self.exchanges.len()
    }

    pub fn exchange(&self, handle: &ExchangeHandle) -> Option<&RequestExchange> {
        self.exchanges.get(handle)
    }

    pub fn context(&self) -> &Context<C, L, T> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context<C, L, T> {
        &mut self.context
    }

    fn vacant(&self, interface: u32) -> Result<ExchangeHandle, Error> {
        let handle = ExchangeHandle::request(interface);
        match self.exchanges.get(&handle) {
            Some(exchange) if !exchange.is_done() => Err(Error::ExchangeInProgress(handle)),
            _ => Ok(handle),
        }
    }
}
