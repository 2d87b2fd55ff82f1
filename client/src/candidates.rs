//! The servers which answered the discovery.

use std::{collections::VecDeque, net::Ipv6Addr};

use dhcpv6_protocol::{DhcpOption, Duid, Message, OptionCode, OptionTree};

use crate::error::Error;

/// A server whose ADVERTISE is eligible to be requested from.
#[derive(Debug, Clone)]
pub struct Candidate {
    duid: Duid,
    unicast: Option<Ipv6Addr>,
    preference: u8,
    /// An owned copy of the advertised options.
    options: OptionTree,
}

impl Candidate {
    pub fn new(duid: Duid, preference: u8, options: OptionTree) -> Self {
        let unicast = match options.get_root(OptionCode::Unicast) {
            Some(DhcpOption::Unicast(address)) => Some(*address),
            _ => None,
        };
        Candidate {
            duid,
            unicast,
            preference,
            options,
        }
    }

    /// Takes the server identity and preference from an ADVERTISE.
    ///
    /// # Errors
    /// `Error::MissingServerId` if the ADVERTISE has no `SERVERID` option.
    pub fn from_advertise(advertise: Message) -> Result<Self, Error> {
        let duid = advertise.server_id().cloned().ok_or(Error::MissingServerId)?;
        let preference = match advertise.options.get_root(OptionCode::Preference) {
            Some(DhcpOption::Preference(preference)) => *preference,
            _ => 0,
        };
        Ok(Self::new(duid, preference, advertise.options))
    }

    pub fn duid(&self) -> &Duid {
        &self.duid
    }

    pub fn unicast(&self) -> Option<Ipv6Addr> {
        self.unicast
    }

    pub fn preference(&self) -> u8 {
        self.preference
    }

    pub fn options(&self) -> &OptionTree {
        &self.options
    }
}

/// The ordered list of candidate servers.
///
/// A candidate is consumed once taken and is never retried.
#[derive(Debug, Clone, Default)]
pub struct CandidateList {
    candidates: VecDeque<Candidate>,
}

impl CandidateList {
    /// Keeps the arrival order.
    pub fn new(candidates: Vec<Candidate>) -> Self {
        CandidateList {
            candidates: candidates.into(),
        }
    }

    /// Orders by descending preference, then by arrival.
    pub fn by_preference(mut candidates: Vec<Candidate>) -> Self {
        candidates.sort_by(|a, b| b.preference.cmp(&a.preference));
        Self::new(candidates)
    }

    pub fn count(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The head candidate identity without consuming it.
    pub fn peek_duid(&self) -> Option<&Duid> {
        self.candidates.front().map(Candidate::duid)
    }

    pub fn take_head(&mut self) -> Option<Candidate> {
        self.candidates.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }
}

#[cfg(test)]
mod tests {
    use dhcpv6_protocol::{MessageType, Parent};

    use super::*;

    fn candidate(id: u8, preference: u8) -> Candidate {
        Candidate::new(Duid::new(vec![id]), preference, OptionTree::new())
    }

    #[test]
    fn take_head_consumes_in_order() {
        let mut list = CandidateList::new(vec![candidate(1, 0), candidate(2, 255)]);
        assert_eq!(list.count(), 2);
        assert_eq!(list.peek_duid(), Some(&Duid::new(vec![1])));
        assert_eq!(list.count(), 2);

        assert_eq!(list.take_head().unwrap().duid(), &Duid::new(vec![1]));
        assert_eq!(list.take_head().unwrap().duid(), &Duid::new(vec![2]));
        assert!(list.is_empty());
        assert!(list.take_head().is_none());
        assert!(list.peek_duid().is_none());
    }

    #[test]
    fn preference_ordering_is_stable() {
        let list = CandidateList::by_preference(vec![
            candidate(1, 10),
            candidate(2, 200),
            candidate(3, 10),
            candidate(4, 200),
        ]);
        let order: Vec<u8> = list.iter().map(|c| c.duid().as_bytes()[0]).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
    }

    #[test]
    fn advertise_provides_identity_and_unicast() {
        let unicast: Ipv6Addr = "2001:db8::547".parse().unwrap();
        let mut options = OptionTree::new();
        options
            .push(Parent::Root, DhcpOption::ServerId(Duid::new(vec![9, 9])))
            .unwrap();
        options.push(Parent::Root, DhcpOption::Preference(7)).unwrap();
        options.push(Parent::Root, DhcpOption::Unicast(unicast)).unwrap();

        let advertise = Message::new(MessageType::Advertise, 1, options);
        let candidate = Candidate::from_advertise(advertise).unwrap();
        assert_eq!(candidate.duid(), &Duid::new(vec![9, 9]));
        assert_eq!(candidate.preference(), 7);
        assert_eq!(candidate.unicast(), Some(unicast));

        let anonymous = Message::new(MessageType::Advertise, 1, OptionTree::new());
        match Candidate::from_advertise(anonymous) {
            Err(Error::MissingServerId) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
