//! Merging of advertised leases into the pending REQUEST.

use std::net::Ipv6Addr;

use dhcpv6_protocol::{DhcpOption, OptionCode, OptionTree, Parent};

use crate::{
    config::{ConfigManager, IaKind},
    error::Error,
    lease::LeaseIa,
    storage::Storage,
};

/// Option types which are requested once at discovery and never again.
const ONE_SHOT_REQUESTS: [OptionCode; 2] = [OptionCode::KeyGeneration, OptionCode::Auth];

/// The outcome of a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Identity associations whose leases were replaced by the advertised ones.
    pub replaced: Vec<(IaKind, u32)>,
    /// The server unicast address, if both the server and the interface allow it.
    pub unicast: Option<Ipv6Addr>,
}

/// Reconciles a pending REQUEST with the candidate's advertisement.
pub struct LeaseReconciler<'a, C, S> {
    config: &'a C,
    storage: &'a mut S,
}

impl<'a, C, S> LeaseReconciler<'a, C, S>
where
    C: ConfigManager,
    S: Storage,
{
    pub fn new(config: &'a C, storage: &'a mut S) -> Self {
        LeaseReconciler { config, storage }
    }

    /// Rewrites the `request` options for the server which sent `advertised`.
    ///
    /// The advertised leases replace the requested ones of each matching
    /// identity association. The server unicast address is recorded in the
    /// lease database for every IA_NA of the request.
    ///
    /// # Errors
    /// `Error::InterfaceNotFound` before anything is modified.
    pub fn reconcile(
        &mut self,
        interface: u32,
        request: &mut OptionTree,
        advertised: &OptionTree,
    ) -> Result<Reconciliation, Error> {
        let iface = self
            .config
            .interface(interface)
            .ok_or(Error::InterfaceNotFound(interface))?;

        Self::strip_one_shot_requests(request, advertised);
        let replaced = Self::copy_offered(request, advertised)?;

        let unicast = match advertised.get_root(OptionCode::Unicast) {
            Some(DhcpOption::Unicast(address)) if iface.unicast => {
                debug!("Server supports unicast on address {}", address);
                Some(*address)
            }
            Some(DhcpOption::Unicast(address)) => {
                info!(
                    "Server offers unicast ({}) communication, \
                     but this client is not configured to so",
                    address
                );
                None
            }
            _ => None,
        };
        if let Some(address) = unicast {
            self.annotate_unicast(request, address)?;
        }

        Ok(Reconciliation { replaced, unicast })
    }

    /// Removes from the ORO the option types the server has already provided.
    fn strip_one_shot_requests(request: &mut OptionTree, advertised: &OptionTree) {
        let oro = match request.find(Parent::Root, OptionCode::OptionRequest) {
            Some(oro) => oro,
            None => return,
        };
        let provided: Vec<OptionCode> = ONE_SHOT_REQUESTS
            .iter()
            .cloned()
            .filter(|&code| advertised.find(Parent::Root, code).is_some())
            .collect();
        if let Some(DhcpOption::OptionRequest(codes)) = request.get_mut(oro) {
            codes.retain(|code| !provided.contains(code));
        }
    }

    /// Delete-then-copy of the leases for every identity association present in both trees.
    fn copy_offered(
        request: &mut OptionTree,
        advertised: &OptionTree,
    ) -> Result<Vec<(IaKind, u32)>, Error> {
        let mut replaced = Vec::new();
        let roots = request.roots().to_vec();
        for id in roots {
            let (kind, iaid) = match request.get(id) {
                Some(option) => match (IaKind::from_code(option.code()), option.iaid()) {
                    (Some(kind), Some(iaid)) => (kind, iaid),
                    _ => continue,
                },
                None => continue,
            };
            let offered = match advertised.find_ia(kind.code(), iaid) {
                Some(offered) => offered,
                None => continue,
            };

            let leases = advertised.find_all(Parent::Option(offered), kind.lease_code());
            request.remove_all(Parent::Option(id), kind.lease_code());
            for lease in leases {
                request.copy_subtree(Parent::Option(id), advertised, lease)?;
            }
            debug!("Copied the advertised leases of {} with IAID {}", kind.code(), iaid);
            replaced.push((kind, iaid));
        }
        Ok(replaced)
    }

    /// Records the unicast address for the in-flight IA_NAs.
    fn annotate_unicast(&mut self, request: &OptionTree, address: Ipv6Addr) -> Result<(), Error> {
        for id in request.find_all(Parent::Root, OptionCode::IaNa) {
            let iaid = match request.get(id).and_then(DhcpOption::iaid) {
                Some(iaid) => iaid,
                None => continue,
            };
            let found = self.storage.update_ia(IaKind::Na, iaid, &mut |ia: &mut LeaseIa| {
                ia.set_unicast(Some(address))
            })?;
            if !found {
                error!("IA with IAID={} not found", iaid);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use dhcpv6_protocol::{IaAddress, IaNa, IaPd, IaPrefix, IaTa};

    use super::*;
    use crate::{
        config::{InterfaceConfig, StaticConfig},
        lease::LeaseIa,
        storage_ram::RamStorage,
    };

    fn address(last: u16) -> DhcpOption {
        DhcpOption::IaAddr(IaAddress {
            address: Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, last),
            preferred_lifetime: 300,
            valid_lifetime: 600,
        })
    }

    fn request() -> OptionTree {
        let mut tree = OptionTree::new();
        tree.push(
            Parent::Root,
            DhcpOption::OptionRequest(vec![
                OptionCode::KeyGeneration,
                OptionCode::Auth,
                OptionCode::Unicast,
            ]),
        )
        .unwrap();
        let na = tree
            .push(Parent::Root, DhcpOption::IaNa(IaNa { iaid: 1, t1: 0, t2: 0 }))
            .unwrap();
        tree.push(Parent::Option(na), address(100)).unwrap();
        tree.push(Parent::Root, DhcpOption::IaTa(IaTa { iaid: 2 })).unwrap();
        tree.push(Parent::Root, DhcpOption::IaPd(IaPd { iaid: 3, t1: 0, t2: 0 }))
            .unwrap();
        let untouched = tree
            .push(Parent::Root, DhcpOption::IaNa(IaNa { iaid: 4, t1: 0, t2: 0 }))
            .unwrap();
        tree.push(Parent::Option(untouched), address(400)).unwrap();
        tree
    }

    fn advertised(unicast: bool) -> OptionTree {
        let mut tree = OptionTree::new();
        let na = tree
            .push(Parent::Root, DhcpOption::IaNa(IaNa { iaid: 1, t1: 10, t2: 20 }))
            .unwrap();
        tree.push(Parent::Option(na), address(1)).unwrap();
        tree.push(Parent::Option(na), address(2)).unwrap();
        let ta = tree.push(Parent::Root, DhcpOption::IaTa(IaTa { iaid: 2 })).unwrap();
        tree.push(Parent::Option(ta), address(3)).unwrap();
        let pd = tree
            .push(Parent::Root, DhcpOption::IaPd(IaPd { iaid: 3, t1: 0, t2: 0 }))
            .unwrap();
        tree.push(
            Parent::Option(pd),
            DhcpOption::IaPrefix(IaPrefix {
                preferred_lifetime: 1,
                valid_lifetime: 2,
                prefix_length: 48,
                prefix: "2001:db8:1::".parse().unwrap(),
            }),
        )
        .unwrap();
        tree.push(Parent::Root, DhcpOption::KeyGeneration(vec![1])).unwrap();
        if unicast {
            tree.push(Parent::Root, DhcpOption::Unicast("2001:db8::547".parse().unwrap()))
                .unwrap();
        }
        tree
    }

    fn lease_options(tree: &OptionTree, code: OptionCode, iaid: u32) -> Vec<DhcpOption> {
        let ia = tree.find_ia(code, iaid).unwrap();
        tree.children(Parent::Option(ia))
            .iter()
            .filter_map(|&id| tree.get(id).cloned())
            .collect()
    }

    fn config(unicast: bool) -> StaticConfig {
        StaticConfig::new(vec![InterfaceConfig::new(1, "eth0").with_unicast(unicast)])
    }

    #[test]
    fn advertised_leases_replace_requested_ones() {
        let config = config(false);
        let mut storage = RamStorage::new();
        let mut tree = request();

        let result = LeaseReconciler::new(&config, &mut storage)
            .reconcile(1, &mut tree, &advertised(false))
            .unwrap();

        assert_eq!(
            result.replaced,
            vec![(IaKind::Na, 1), (IaKind::Ta, 2), (IaKind::Pd, 3)]
        );
        assert_eq!(lease_options(&tree, OptionCode::IaNa, 1), vec![address(1), address(2)]);
        assert_eq!(lease_options(&tree, OptionCode::IaTa, 2), vec![address(3)]);
        assert_eq!(lease_options(&tree, OptionCode::IaPd, 3).len(), 1);
        assert_eq!(lease_options(&tree, OptionCode::IaNa, 4), vec![address(400)]);
        tree.check_consistency().unwrap();
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let config = config(false);
        let mut storage = RamStorage::new();
        let offer = advertised(false);
        let mut tree = request();

        let mut reconciler = LeaseReconciler::new(&config, &mut storage);
        reconciler.reconcile(1, &mut tree, &offer).unwrap();
        let once = lease_options(&tree, OptionCode::IaNa, 1);
        reconciler.reconcile(1, &mut tree, &offer).unwrap();

        assert_eq!(lease_options(&tree, OptionCode::IaNa, 1), once);
        assert_eq!(lease_options(&tree, OptionCode::IaTa, 2), vec![address(3)]);
    }

    #[test]
    fn provided_one_shot_options_are_not_requested_again() {
        let config = config(false);
        let mut storage = RamStorage::new();
        let mut tree = request();

        LeaseReconciler::new(&config, &mut storage)
            .reconcile(1, &mut tree, &advertised(false))
            .unwrap();

        assert_eq!(
            tree.get_root(OptionCode::OptionRequest),
            Some(&DhcpOption::OptionRequest(vec![OptionCode::Auth, OptionCode::Unicast]))
        );
    }

    #[test]
    fn unicast_is_recorded_only_when_accepted() {
        let mut storage = RamStorage::new();
        storage.add_ia(LeaseIa::new(IaKind::Na, 1)).unwrap();
        let mut tree = request();

        let result = LeaseReconciler::new(&config(false), &mut storage)
            .reconcile(1, &mut tree, &advertised(true))
            .unwrap();
        assert_eq!(result.unicast, None);
        assert_eq!(storage.get_ia(IaKind::Na, 1).unwrap().unwrap().unicast(), None);

        let result = LeaseReconciler::new(&config(true), &mut storage)
            .reconcile(1, &mut tree, &advertised(true))
            .unwrap();
        let expected: Ipv6Addr = "2001:db8::547".parse().unwrap();
        assert_eq!(result.unicast, Some(expected));
        assert_eq!(storage.get_ia(IaKind::Na, 1).unwrap().unwrap().unicast(), Some(expected));
        // IAID 4 has no lease database record and is skipped
        assert!(storage.get_ia(IaKind::Na, 4).unwrap().is_none());
    }

    #[test]
    fn missing_interface_leaves_request_untouched() {
        let config = config(false);
        let mut storage = RamStorage::new();
        let mut tree = request();

        let result =
            LeaseReconciler::new(&config, &mut storage).reconcile(9, &mut tree, &advertised(false));
        match result {
            Err(Error::InterfaceNotFound(9)) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(lease_options(&tree, OptionCode::IaNa, 1), vec![address(100)]);
        assert_eq!(
            tree.get_root(OptionCode::OptionRequest),
            Some(&DhcpOption::OptionRequest(vec![
                OptionCode::KeyGeneration,
                OptionCode::Auth,
                OptionCode::Unicast
            ]))
        );
    }
}
