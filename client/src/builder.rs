//! A builder for the client REQUEST options.

use dhcpv6_protocol::*;

use crate::{config::IaKind, lease::LeaseIa};

/// Options which belong to a single transmission and are never carried over
/// from a previous message.
fn is_transmission_scoped(option: &DhcpOption) -> bool {
    match option.code() {
        OptionCode::ElapsedTime
        | OptionCode::AaaAuth
        | OptionCode::Auth
        | OptionCode::ServerId => true,
        _ => false,
    }
}

/// Builds the option trees of client messages with some parameters.
pub struct MessageBuilder<'a> {
    /// Mandatory client identity.
    client_id: &'a Duid,
    /// The optional `AUTH` option payload.
    authentication: Option<&'a [u8]>,
}

impl<'a> MessageBuilder<'a> {
    /// Creates a builder with message parameters which will not be changed.
    pub fn new(client_id: &'a Duid, authentication: Option<&'a [u8]>) -> Self {
        MessageBuilder {
            client_id,
            authentication,
        }
    }

    /// Copies the options of a previous message without its transmission-scoped ones.
    ///
    /// A `CLIENTID` is added if the previous message did not carry one.
    pub fn carry_over(&self, previous: &OptionTree) -> Result<OptionTree, ConsistencyError> {
        let mut options = OptionTree::build(previous, is_transmission_scoped)?;
        if options.find(Parent::Root, OptionCode::ClientId).is_none() {
            options.push(Parent::Root, DhcpOption::ClientId(self.client_id.to_owned()))?;
        }
        Ok(options)
    }

    /// Appends the server identity, a fresh elapsed time and the authentication
    /// option to a REQUEST.
    pub fn finish_request(
        &self,
        options: &mut OptionTree,
        server_id: &Duid,
    ) -> Result<(), ConsistencyError> {
        options.remove_all(Parent::Root, OptionCode::ServerId);
        options.remove_all(Parent::Root, OptionCode::ElapsedTime);
        options.remove_all(Parent::Root, OptionCode::Auth);

        options.push(Parent::Root, DhcpOption::ServerId(server_id.to_owned()))?;
        options.push(Parent::Root, DhcpOption::ElapsedTime(0))?;
        if let Some(authentication) = self.authentication {
            options.push(Parent::Root, DhcpOption::Auth(authentication.to_vec()))?;
        }
        Ok(())
    }

    /// Creates the options of a REQUEST for identity associations already known
    /// to the lease database.
    ///
    /// Every IA is requested with its current leases.
    pub fn request_for_bindings(
        &self,
        ias: &[LeaseIa],
        server_id: &Duid,
    ) -> Result<OptionTree, ConsistencyError> {
        let mut options = OptionTree::new();
        options.push(Parent::Root, DhcpOption::ClientId(self.client_id.to_owned()))?;

        for ia in ias.iter() {
            let option = match ia.kind() {
                IaKind::Na => DhcpOption::IaNa(IaNa {
                    iaid: ia.iaid(),
                    t1: 0,
                    t2: 0,
                }),
                IaKind::Ta => DhcpOption::IaTa(IaTa { iaid: ia.iaid() }),
                IaKind::Pd => DhcpOption::IaPd(IaPd {
                    iaid: ia.iaid(),
                    t1: 0,
                    t2: 0,
                }),
            };
            let parent = options.push(Parent::Root, option)?;
            for lease in ia.leases().iter() {
                options.push(Parent::Option(parent), lease.to_option())?;
            }
        }

        self.finish_request(&mut options, server_id)?;
        Ok(options)
    }

    /// Rewrites the `ELAPSED_TIME` option before a retransmission.
    pub fn set_elapsed_time(
        &self,
        options: &mut OptionTree,
        value: u16,
    ) -> Result<(), ConsistencyError> {
        match options.find(Parent::Root, OptionCode::ElapsedTime) {
            Some(id) => {
                if let Some(DhcpOption::ElapsedTime(elapsed)) = options.get_mut(id) {
                    *elapsed = value;
                }
            }
            None => {
                options.push(Parent::Root, DhcpOption::ElapsedTime(value))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv6Addr;

    use super::*;
    use crate::lease::Lease;

    fn solicit(client_id: &Duid) -> OptionTree {
        let mut options = OptionTree::new();
        options.push(Parent::Root, DhcpOption::ClientId(client_id.to_owned())).unwrap();
        options.push(Parent::Root, DhcpOption::ElapsedTime(1500)).unwrap();
        options.push(Parent::Root, DhcpOption::Auth(vec![9, 9])).unwrap();
        options.push(Parent::Root, DhcpOption::AaaAuth(vec![7])).unwrap();
        options.push(Parent::Root, DhcpOption::RapidCommit).unwrap();
        options
            .push(Parent::Root, DhcpOption::IaNa(IaNa { iaid: 1, t1: 0, t2: 0 }))
            .unwrap();
        options
    }

    fn root_codes(options: &OptionTree) -> Vec<OptionCode> {
        options.roots().iter().filter_map(|&id| options.code(id)).collect()
    }

    #[test]
    fn carry_over_drops_transmission_scoped_options() {
        let client_id = Duid::new(vec![0, 3, 0, 1, 1, 2, 3, 4, 5, 6]);
        let builder = MessageBuilder::new(&client_id, None);

        let options = builder.carry_over(&solicit(&client_id)).unwrap();

        assert_eq!(
            root_codes(&options),
            vec![OptionCode::ClientId, OptionCode::RapidCommit, OptionCode::IaNa]
        );
    }

    #[test]
    fn finish_request_appends_server_elapsed_and_auth() {
        let client_id = Duid::new(vec![1]);
        let server_id = Duid::new(vec![2]);
        let builder = MessageBuilder::new(&client_id, Some(&[5u8, 5, 5][..]));

        let mut options = builder.carry_over(&OptionTree::new()).unwrap();
        builder.finish_request(&mut options, &server_id).unwrap();
        builder.finish_request(&mut options, &server_id).unwrap();

        assert_eq!(
            root_codes(&options),
            vec![
                OptionCode::ClientId,
                OptionCode::ServerId,
                OptionCode::ElapsedTime,
                OptionCode::Auth
            ]
        );
        assert_eq!(
            options.get_root(OptionCode::ServerId),
            Some(&DhcpOption::ServerId(server_id))
        );
    }

    #[test]
    fn bindings_are_requested_with_their_leases() {
        let client_id = Duid::new(vec![1]);
        let server_id = Duid::new(vec![2]);
        let builder = MessageBuilder::new(&client_id, None);

        let mut na = LeaseIa::new(IaKind::Na, 5);
        na.replace(
            Some(server_id.clone()),
            vec![Lease {
                address: Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 5),
                prefix_length: None,
                preferred_lifetime: 10,
                valid_lifetime: 20,
            }],
        );
        let pd = LeaseIa::new(IaKind::Pd, 6);

        let options = builder.request_for_bindings(&[na, pd], &server_id).unwrap();

        let ia = options.find_ia(OptionCode::IaNa, 5).unwrap();
        assert_eq!(options.find_all(Parent::Option(ia), OptionCode::IaAddr).len(), 1);
        let ia = options.find_ia(OptionCode::IaPd, 6).unwrap();
        assert!(options.children(Parent::Option(ia)).is_empty());
        assert_eq!(options.get_root(OptionCode::ElapsedTime), Some(&DhcpOption::ElapsedTime(0)));
        options.check_consistency().unwrap();
    }

    #[test]
    fn elapsed_time_is_rewritten_in_place() {
        let client_id = Duid::new(vec![1]);
        let builder = MessageBuilder::new(&client_id, None);
        let mut options = builder.carry_over(&OptionTree::new()).unwrap();
        builder.finish_request(&mut options, &Duid::new(vec![2])).unwrap();

        builder.set_elapsed_time(&mut options, 250).unwrap();

        assert_eq!(options.find_all(Parent::Root, OptionCode::ElapsedTime).len(), 1);
        assert_eq!(options.get_root(OptionCode::ElapsedTime), Some(&DhcpOption::ElapsedTime(250)));
    }
}
