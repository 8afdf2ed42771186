//! End-to-end scenarios driven entirely through `Environment`, the same
//! surface an external placement agent would use.

use vnfnet_sim::domain::ids::GraphNode;
use vnfnet_sim::domain::traffic_pattern::TrafficPattern;
use vnfnet_sim::facade::SENTINEL_DENIED;
use vnfnet_sim::{Environment, Error};

fn small_topology(env: &Environment) -> (vnfnet_sim::domain::ids::HostId, vnfnet_sim::domain::ids::HostId, vnfnet_sim::domain::ids::HostId) {
    let h1 = env.substrate().add_host("h1", 8.0, 8.0, 8.0, 1e9, 1.0, 1e-9, 1.0);
    let h2 = env.substrate().add_host("h2", 8.0, 8.0, 8.0, 1e9, 1.0, 1e-9, 1.0);
    let h3 = env.substrate().add_host("h3", 8.0, 8.0, 8.0, 1e9, 1.0, 1e-9, 1.0);
    env.substrate().add_link(h1, h2, 10.0, 5.0, false).unwrap();
    env.substrate().add_link(h2, h3, 10.0, 5.0, false).unwrap();
    env.substrate().add_link(h1, h3, 10.0, 1.0, false).unwrap();
    (h1, h2, h3)
}

#[test]
fn happy_path_admission_routes_and_scores_traffic() {
    let env = Environment::new();
    let (h1, _h2, h3) = small_topology(&env);

    let service = env.catalog().add_service("firewall", 1.0, 1.0, 1.0, 1.0);
    let chain_id = env.catalog().add_chain("web-chain", vec![service], 50.0, 1000.0).unwrap();
    let user = env.substrate().add_user("alice", h1, chain_id, 2.0, TrafficPattern::Reserved).unwrap();

    env.submit_chain(chain_id);
    let (snapshot, polled_chain) = env.poll().expect("a pending chain should be polled");
    assert_eq!(polled_chain.id, chain_id);
    assert_eq!(snapshot.hosts.len(), 3);
    assert!(!polled_chain.is_embedded());

    env.embed(chain_id, &[h3]).unwrap();

    let conns = env.orchestrator().list_connections();
    assert_eq!(conns.len(), 1);
    let conn = &conns[0];
    assert_eq!(conn.user, user);
    assert_eq!(conn.node_path.first(), Some(&GraphNode::User(user)));

    let ping = env.service_ping(conn.id);
    assert!(ping > 0.0 && ping < SENTINEL_DENIED);

    let score = env.service_performance_score(conn.id);
    assert!(score > 0.0);
}

#[test]
fn saturated_direct_link_is_routed_around() {
    let env = Environment::new();
    let (h1, h2, h3) = small_topology(&env);

    let service = env.catalog().add_service("nat", 1.0, 1.0, 1.0, 1.0);

    // first chain eats 8.0 of the direct h1-h3 link's 10.0 capacity, the
    // cheapest path (delay 1.0) for a user sitting at h1.
    let chain_a = env.catalog().add_chain("chain-a", vec![service], 50.0, 1000.0).unwrap();
    env.substrate().add_user("alice", h1, chain_a, 8.0, TrafficPattern::Reserved).unwrap();
    env.embed(chain_a, &[h3]).unwrap();

    // second chain needs 5.0 more, which no longer fits on the direct
    // link's remaining 2.0 residual; it must detour via h2.
    let chain_b = env.catalog().add_chain("chain-b", vec![service], 50.0, 1000.0).unwrap();
    env.substrate().add_user("bob", h1, chain_b, 5.0, TrafficPattern::Reserved).unwrap();
    env.embed(chain_b, &[h3]).unwrap();

    let conns = env.orchestrator().list_connections();
    let bobs_conn = conns.iter().find(|c| c.bandwidth == 5.0).expect("bob's connection should be admitted");
    assert!(bobs_conn.node_path.contains(&GraphNode::Host(h2)));
}

#[test]
fn admission_is_denied_when_no_route_has_capacity() {
    let env = Environment::new();
    let h1 = env.substrate().add_host("h1", 8.0, 8.0, 8.0, 1e9, 1.0, 1e-9, 1.0);
    let h2 = env.substrate().add_host("h2", 8.0, 8.0, 8.0, 1e9, 1.0, 1e-9, 1.0);
    env.substrate().add_link(h1, h2, 1.0, 5.0, false).unwrap();

    let service = env.catalog().add_service("nat", 1.0, 1.0, 1.0, 1.0);

    // the only link between h1 and h2 has 1.0 capacity; a first user takes
    // 0.8 of it, leaving no room for a second user's 0.5 reservation and
    // nowhere else to route since this topology has a single link.
    let chain_a = env.catalog().add_chain("chain-a", vec![service], 50.0, 1000.0).unwrap();
    env.substrate().add_user("carol", h1, chain_a, 0.8, TrafficPattern::Reserved).unwrap();
    env.embed(chain_a, &[h2]).unwrap();

    let chain_b = env.catalog().add_chain("chain-b", vec![service], 50.0, 1000.0).unwrap();
    env.substrate().add_user("dan", h1, chain_b, 0.5, TrafficPattern::Reserved).unwrap();

    let err = env.embed(chain_b, &[h2]).unwrap_err();
    assert!(matches!(err, Error::Denied(_)));
}

#[test]
fn migration_moves_traffic_and_releases_the_source_host() {
    let env = Environment::new();
    let (h1, h2, h3) = small_topology(&env);

    let service = env.catalog().add_service("lb", 2.0, 2.0, 2.0, 1.0);
    let chain_id = env.catalog().add_chain("chain", vec![service], 50.0, 1000.0).unwrap();
    let _user = env.substrate().add_user("dave", h1, chain_id, 1.0, TrafficPattern::Reserved).unwrap();

    env.embed(chain_id, &[h3]).unwrap();
    let chain = env.catalog().get_chain(chain_id).unwrap();
    let vm_id = chain.vms().next().unwrap();

    let before = env.substrate().query_host(h3).unwrap();
    assert!(before.cpu_used > 0.0);

    env.orchestrator().migrate_vm(vm_id, h3, h2).unwrap();

    let after_src = env.substrate().query_host(h3).unwrap();
    let after_dst = env.substrate().query_host(h2).unwrap();
    assert_eq!(after_src.cpu_used, 0.0);
    assert!(after_dst.cpu_used > 0.0);

    let moved_vm = env.catalog().get_vm(vm_id).unwrap();
    assert_eq!(moved_vm.host, h2);

    let conns = env.orchestrator().list_connections();
    assert_eq!(conns.len(), 1);
    assert!(conns[0].node_path.contains(&GraphNode::Host(h2)));
}

#[test]
fn chain_expires_and_tears_down_its_vms_at_ttl() {
    let env = Environment::new();
    let (h1, _h2, h3) = small_topology(&env);

    let service = env.catalog().add_service("proxy", 1.0, 1.0, 1.0, 1.0);
    let chain_id = env.catalog().add_chain("chain", vec![service], 50.0, 10.0).unwrap();
    let _user = env.substrate().add_user("erin", h1, chain_id, 1.0, TrafficPattern::Reserved).unwrap();
    env.embed(chain_id, &[h3]).unwrap();

    assert!(env.orchestrator().list_connections().len() == 1);
    let before = env.substrate().query_host(h3).unwrap();
    assert!(before.cpu_used > 0.0);

    env.step(11.0).unwrap();

    assert!(env.catalog().get_chain(chain_id).is_err());
    assert!(env.orchestrator().list_connections().is_empty());
    let after = env.substrate().query_host(h3).unwrap();
    assert_eq!(after.cpu_used, 0.0);
}

#[test]
fn traffic_pattern_drives_the_performance_score_sequence() {
    let env = Environment::new();
    let (h1, _h2, h3) = small_topology(&env);

    let service = env.catalog().add_service("ids", 1.0, 1.0, 1.0, 1.0);
    let chain_id = env.catalog().add_chain("chain", vec![service], 50.0, 1000.0).unwrap();
    let _user = env.substrate().add_user("frank", h1, chain_id, 10.0, TrafficPattern::Square).unwrap();
    env.embed(chain_id, &[h3]).unwrap();

    let conn = &env.orchestrator().list_connections()[0];
    let first = env.service_performance_score(conn.id);
    let second = env.service_performance_score(conn.id);
    // Square starts low (0.3x) then jumps to full bandwidth (1.0x); the
    // ping denominator is constant across calls, so the ratio tracks it.
    assert!(second > first);
}

#[test]
fn snapshot_round_trips_through_json_and_binary() {
    let env = Environment::new();
    small_topology(&env);
    let service = env.catalog().add_service("svc", 1.0, 1.0, 1.0, 1.0);
    env.catalog().add_chain("chain", vec![service], 50.0, 1000.0).unwrap();

    let snapshot = vnfnet_sim::api::SubstrateSnapshot::capture(env.substrate(), env.catalog());
    let json = snapshot.to_json().unwrap();
    let from_json = vnfnet_sim::api::SubstrateSnapshot::from_json(&json).unwrap();
    assert_eq!(from_json.hosts.len(), snapshot.hosts.len());

    let bytes = snapshot.to_bytes().unwrap();
    let from_bytes = vnfnet_sim::api::SubstrateSnapshot::from_bytes(&bytes).unwrap();
    assert_eq!(from_bytes.links.len(), snapshot.links.len());
}

#[test]
fn event_log_records_admission_outcomes() {
    let env = Environment::new();
    let (h1, _h2, h3) = small_topology(&env);

    let service = env.catalog().add_service("svc", 1.0, 1.0, 1.0, 1.0);
    let chain_id = env.catalog().add_chain("chain", vec![service], 50.0, 1000.0).unwrap();
    let _user = env.substrate().add_user("gail", h1, chain_id, 1.0, TrafficPattern::Reserved).unwrap();
    env.embed(chain_id, &[h3]).unwrap();

    let events = env.drain_events();
    assert!(events.iter().any(|e| e.event_kind == "start_traffic" && e.outcome == "admitted"));
}

#[test]
fn migration_failure_restores_the_original_connection() {
    let env = Environment::new();
    let (h1, _h2, h3) = small_topology(&env);
    // too little capacity to ever host the vm's service.
    let cramped = env.substrate().add_host("cramped", 0.1, 0.1, 0.1, 1e9, 1.0, 1e-9, 1.0);
    env.substrate().add_link(h3, cramped, 10.0, 1.0, false).unwrap();

    let service = env.catalog().add_service("lb", 1.0, 1.0, 1.0, 1.0);
    let chain_id = env.catalog().add_chain("chain", vec![service], 50.0, 1000.0).unwrap();
    let user = env.substrate().add_user("judy", h1, chain_id, 1.0, TrafficPattern::Reserved).unwrap();
    env.embed(chain_id, &[h3]).unwrap();

    let chain = env.catalog().get_chain(chain_id).unwrap();
    let vm_id = chain.vms().next().unwrap();

    let err = env.orchestrator().migrate_vm(vm_id, h3, cramped).unwrap_err();
    assert!(matches!(err, Error::MigrationFailed(_)));

    // the vm never moved, and the user's original connection is back up.
    let vm = env.catalog().get_vm(vm_id).unwrap();
    assert_eq!(vm.host, h3);
    let conns = env.orchestrator().list_connections();
    assert_eq!(conns.len(), 1);
    assert_eq!(conns[0].user, user);
}

#[test]
fn migration_to_an_unconnected_host_reports_partial_migration() {
    let env = Environment::new();
    let (h1, _h2, h3) = small_topology(&env);
    // an island host with capacity but no links to anywhere else.
    let h4 = env.substrate().add_host("h4", 8.0, 8.0, 8.0, 1e9, 1.0, 1e-9, 1.0);

    let service = env.catalog().add_service("lb", 1.0, 1.0, 1.0, 1.0);
    let chain_id = env.catalog().add_chain("chain", vec![service], 50.0, 1000.0).unwrap();
    let _user = env.substrate().add_user("ivan", h1, chain_id, 1.0, TrafficPattern::Reserved).unwrap();
    env.embed(chain_id, &[h3]).unwrap();

    let chain = env.catalog().get_chain(chain_id).unwrap();
    let vm_id = chain.vms().next().unwrap();
    assert_eq!(env.orchestrator().list_connections().len(), 1);

    let err = env.orchestrator().migrate_vm(vm_id, h3, h4).unwrap_err();
    assert!(matches!(err, Error::PartialMigration(1)));

    // the move itself is not rolled back: the vm now lives on the island host...
    let moved_vm = env.catalog().get_vm(vm_id).unwrap();
    assert_eq!(moved_vm.host, h4);
    assert_eq!(env.substrate().query_host(h4).unwrap().cpu_used, 1.0);
    assert_eq!(env.substrate().query_host(h3).unwrap().cpu_used, 0.0);

    // ...but nothing was double-reserved, and the denied user has no connection.
    assert!(env.orchestrator().list_connections().is_empty());
}

#[test]
fn service_data_matches_the_single_hop_energy_sample() {
    let env = Environment::new();
    let h1 = env.substrate().add_host("h1", 8.0, 8.0, 8.0, 1e9, 1.0, 1e-9, 8_440_000.0);
    let h2 = env.substrate().add_host("h2", 8.0, 8.0, 8.0, 1e9, 1.0, 1e-9, 8_440_000.0);
    env.substrate().add_link(h1, h2, 10.0, 1.0, false).unwrap();

    let service = env.catalog().add_service("probe", 1.0, 1.0, 1.0, 1.0);
    let chain_id = env.catalog().add_chain("chain", vec![service], 50.0, 1000.0).unwrap();
    let _user = env.substrate().add_user("heidi", h1, chain_id, 5.0, TrafficPattern::Reserved).unwrap();
    env.embed(chain_id, &[h2]).unwrap();

    let conn = &env.orchestrator().list_connections()[0];
    let data = env.service_data(conn.id);
    assert!((data - 3.376e-3).abs() < 1e-6);
}

#[test]
fn embed_failure_partway_through_placement_releases_earlier_slots() {
    let env = Environment::new();
    let h1 = env.substrate().add_host("h1", 8.0, 8.0, 8.0, 1e9, 1.0, 1e-9, 1.0);
    let h2 = env.substrate().add_host("h2", 1.0, 8.0, 8.0, 1e9, 1.0, 1e-9, 1.0);
    env.substrate().add_link(h1, h2, 10.0, 1.0, false).unwrap();

    let roomy = env.catalog().add_service("fw", 2.0, 1.0, 1.0, 1.0);
    let cramped = env.catalog().add_service("nat", 2.0, 1.0, 1.0, 1.0);
    let chain_id = env.catalog().add_chain("two-slot", vec![roomy, cramped], 50.0, 1000.0).unwrap();
    env.substrate().add_user("alice", h1, chain_id, 1.0, TrafficPattern::Reserved).unwrap();

    // slot 0 fits on h1, slot 1 needs 2.0 cpu but h2 only has 1.0 left for it.
    let err = env.embed(chain_id, &[h1, h2]).unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded { .. }));

    // slot 0's reservation on h1 must have been rolled back.
    assert_eq!(env.substrate().query_host(h1).unwrap().cpu_used, 0.0);
    assert!(!env.catalog().get_chain(chain_id).unwrap().is_embedded());
    assert!(env.orchestrator().list_connections().is_empty());

    // the chain is left clean enough to retry with a placement that fits.
    env.embed(chain_id, &[h1, h1]).unwrap();
    assert_eq!(env.substrate().query_host(h1).unwrap().cpu_used, 4.0);
}
