//! End-to-end flows through the `Ipam` facade.

#![allow(clippy::unwrap_used)]

use ipam_core::{
    AddressQuery, Assignment, Command, CommandResult, CoreError, CreateAddressRequest,
    CreateSubnetRequest, CreateZoneRequest, HostCount, Ipam, IpamConfig, SoaRequest, SubnetId,
    SubnetQuery,
};
use pretty_assertions::assert_eq;

async fn create_subnet(ipam: &Ipam, cidr: &str, name: Option<&str>) -> SubnetId {
    ipam.create_subnet(CreateSubnetRequest {
        cidr: cidr.into(),
        name: name.map(str::to_owned),
        description: None,
    })
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn subnet_view_reports_derived_fields() {
    let ipam = Ipam::in_memory();
    let id = create_subnet(&ipam, "192.168.1.5/24", Some("office")).await;
    let view = ipam.subnet(id).await.unwrap().view();

    assert_eq!(view.cidr, "192.168.1.0/24");
    assert_eq!(view.netmask, "255.255.255.0");
    assert_eq!(view.broadcast, "192.168.1.255");
    assert_eq!(view.first_usable, "192.168.1.1");
    assert_eq!(view.last_usable, "192.168.1.254");
    assert_eq!(view.host_count, HostCount::Finite(256));
    assert_eq!(view.usable_host_count, HostCount::Finite(254));
}

#[tokio::test]
async fn fresh_slash_thirty_allocation_sequence() {
    let ipam = Ipam::in_memory();
    let id = create_subnet(&ipam, "10.0.0.0/30", None).await;

    let first = ipam.allocate_next(id, Assignment::default()).await.unwrap();
    let second = ipam.allocate_next(id, Assignment::default()).await.unwrap();
    assert_eq!(first.address.to_string(), "10.0.0.1");
    assert_eq!(second.address.to_string(), "10.0.0.2");

    let err = ipam.allocate_next(id, Assignment::default()).await.unwrap_err();
    assert!(matches!(err, CoreError::SubnetExhausted { .. }));
}

#[tokio::test]
async fn freed_addresses_are_reused_lowest_first() {
    let ipam = Ipam::in_memory();
    let id = create_subnet(&ipam, "10.0.0.0/29", None).await;
    let mut records = Vec::new();
    for _ in 0..4 {
        records.push(ipam.allocate_next(id, Assignment::default()).await.unwrap());
    }
    ipam.delete_address(records[1].id).await.unwrap();

    let reused = ipam.allocate_next(id, Assignment::default()).await.unwrap();
    assert_eq!(reused.address.to_string(), "10.0.0.2");
}

#[tokio::test]
async fn registering_outside_the_subnet_fails() {
    let ipam = Ipam::in_memory();
    let id = create_subnet(&ipam, "10.0.0.0/24", None).await;
    let err = ipam
        .register(id, "172.16.0.5", Assignment::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AddressNotInSubnet { .. }));
}

#[tokio::test]
async fn duplicate_detection() {
    let ipam = Ipam::in_memory();
    create_subnet(&ipam, "10.0.0.0/24", Some("lab")).await;

    let dup = ipam
        .create_subnet(CreateSubnetRequest {
            cidr: "10.0.0.1/24".into(),
            name: None,
            description: None,
        })
        .await;
    assert!(matches!(dup, Err(CoreError::DuplicateSubnet { .. })));

    let name = ipam
        .create_subnet(CreateSubnetRequest {
            cidr: "10.9.0.0/24".into(),
            name: Some("lab".into()),
            description: None,
        })
        .await;
    assert!(matches!(name, Err(CoreError::DuplicateName { .. })));

    let zone = || CreateZoneRequest {
        name: "example.com".into(),
        description: None,
        soa: SoaRequest::new("ns1.example.com", "hostmaster.example.com"),
    };
    ipam.create_zone(zone()).await.unwrap();
    assert!(matches!(
        ipam.create_zone(zone()).await,
        Err(CoreError::DuplicateZone { .. })
    ));
}

#[tokio::test]
async fn deleting_a_subnet_cascades() {
    let ipam = Ipam::in_memory();
    let id = create_subnet(&ipam, "10.0.0.0/24", None).await;
    let record = ipam.allocate_next(id, Assignment::default()).await.unwrap();

    assert_eq!(ipam.delete_subnet(id).await.unwrap(), 1);
    assert!(matches!(
        ipam.address(record.id).await,
        Err(CoreError::NotFound { .. })
    ));
    assert!(matches!(
        ipam.allocate_next(id, Assignment::default()).await,
        Err(CoreError::NotFound { .. })
    ));
}

#[tokio::test]
async fn containment_query_prefers_longest_prefix() {
    let ipam = Ipam::in_memory();
    create_subnet(&ipam, "10.0.0.0/8", None).await;
    create_subnet(&ipam, "10.20.0.0/16", None).await;
    create_subnet(&ipam, "2001:db8::/32", None).await;

    let found: Vec<String> = ipam
        .find_subnets(&SubnetQuery::Contains("10.20.30.40".into()))
        .await
        .unwrap()
        .iter()
        .map(|s| s.block.to_string())
        .collect();
    assert_eq!(found, ["10.20.0.0/16", "10.0.0.0/8"]);

    let v6: Vec<String> = ipam
        .find_subnets(&SubnetQuery::Contains("2001:db8::42".into()))
        .await
        .unwrap()
        .iter()
        .map(|s| s.block.to_string())
        .collect();
    assert_eq!(v6, ["2001:db8::/32"]);
}

#[tokio::test]
async fn ipv6_allocation_starts_at_the_network_address() {
    let ipam = Ipam::in_memory();
    let id = create_subnet(&ipam, "2001:db8:1::/64", None).await;
    let record = ipam.allocate_next(id, Assignment::default()).await.unwrap();
    assert_eq!(record.address.to_string(), "2001:db8:1::");
    assert_eq!(
        record.view().address_key.to_storage_key(),
        "20010db8000100000000000000000000"
    );
}

#[tokio::test]
async fn parallel_allocations_across_handles_are_distinct() {
    let ipam = Ipam::in_memory();
    let id = create_subnet(&ipam, "10.50.0.0/24", None).await;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..50 {
        let ipam = ipam.clone();
        tasks.spawn(async move { ipam.allocate_next(id, Assignment::default()).await });
    }
    let mut addresses = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        addresses.push(joined.unwrap().unwrap().key());
    }
    addresses.sort();
    addresses.dedup();
    assert_eq!(addresses.len(), 50);

    let listed = ipam
        .addresses(&AddressQuery {
            subnet_id: Some(id),
            limit: Some(1000),
            ..AddressQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_subnets_never_share_a_key() {
    let ipam = Ipam::in_memory();
    let wide = create_subnet(&ipam, "10.60.0.0/16", None).await;
    let narrow = create_subnet(&ipam, "10.60.0.0/26", None).await;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..40 {
        let ipam = ipam.clone();
        let subnet = if i % 2 == 0 { wide } else { narrow };
        tasks.spawn(async move { ipam.allocate_next(subnet, Assignment::default()).await });
    }
    let mut keys = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        // Every attempt either succeeds or reports a conflict; never a duplicate.
        match joined.unwrap() {
            Ok(record) => keys.push(record.key()),
            Err(CoreError::AllocationConflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    let total = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), total);
}

#[tokio::test]
async fn execute_create_address_with_and_without_explicit_address() {
    let ipam = Ipam::in_memory();
    let id = create_subnet(&ipam, "10.70.0.0/24", None).await;

    let explicit = ipam
        .execute(Command::CreateAddress(CreateAddressRequest {
            subnet_id: id,
            address: Some("10.70.0.1".into()),
            dns_name: None,
            description: Some("gateway".into()),
        }))
        .await
        .unwrap();
    let CommandResult::Address(gateway) = explicit else {
        panic!("expected an address");
    };
    assert_eq!(gateway.description.as_deref(), Some("gateway"));

    let auto = ipam
        .execute(Command::CreateAddress(CreateAddressRequest {
            subnet_id: id,
            address: None,
            dns_name: None,
            description: None,
        }))
        .await
        .unwrap();
    let CommandResult::Address(next) = auto else {
        panic!("expected an address");
    };
    assert_eq!(next.address.to_string(), "10.70.0.2");
}

#[tokio::test]
async fn file_backed_ipam_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let config = IpamConfig::file(dir.path().join("ipam.json"));

    let ipam = Ipam::open(config.clone()).await.unwrap();
    let id = create_subnet(&ipam, "10.80.0.0/24", Some("persisted")).await;
    ipam.allocate_next(id, Assignment::default()).await.unwrap();
    drop(ipam);

    let reopened = Ipam::open(config).await.unwrap();
    assert_eq!(reopened.subnet_by_name("persisted").await.unwrap().id, id);
    let next = reopened.allocate_next(id, Assignment::default()).await.unwrap();
    assert_eq!(next.address.to_string(), "10.80.0.2");
}

#[tokio::test]
async fn two_handles_on_one_data_file_do_not_hand_out_the_same_address() {
    let dir = tempfile::tempdir().unwrap();
    let config = IpamConfig::file(dir.path().join("ipam.json"));

    let a = Ipam::open(config.clone()).await.unwrap();
    let b = Ipam::open(config.clone()).await.unwrap();
    let id = create_subnet(&a, "10.90.0.0/24", None).await;

    let first = a.allocate_next(id, Assignment::default()).await.unwrap();
    let second = b.allocate_next(id, Assignment::default()).await.unwrap();
    assert_eq!(first.address.to_string(), "10.90.0.1");
    assert_eq!(second.address.to_string(), "10.90.0.2");
    assert_ne!(first.id, second.id);

    let on_disk = Ipam::open(config)
        .await
        .unwrap()
        .addresses(&AddressQuery {
            subnet_id: Some(id),
            ..AddressQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(on_disk.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_handles_on_one_data_file_get_distinct_addresses() {
    let dir = tempfile::tempdir().unwrap();
    let config = IpamConfig {
        allocation_attempts: 64,
        ..IpamConfig::file(dir.path().join("ipam.json"))
    };

    let a = Ipam::open(config.clone()).await.unwrap();
    let b = Ipam::open(config.clone()).await.unwrap();
    let id = create_subnet(&a, "10.91.0.0/24", None).await;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..20 {
        let ipam = if i % 2 == 0 { a.clone() } else { b.clone() };
        tasks.spawn(async move { ipam.allocate_next(id, Assignment::default()).await });
    }
    let mut keys = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        keys.push(joined.unwrap().unwrap().key());
    }
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 20);

    let on_disk = Ipam::open(config)
        .await
        .unwrap()
        .addresses(&AddressQuery {
            subnet_id: Some(id),
            ..AddressQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(on_disk.len(), 20);
}
