use crate::common::server;
use kthw_provision::mesh::{render_config, MeshSettings, MeshTopologyBuilder};
use std::collections::HashSet;

#[test]
fn test_three_host_mesh_renders_two_peers_each() {
    let servers = vec![server("a", 1, &[]), server("b", 2, &[]), server("c", 3, &[])];

    let mesh = MeshTopologyBuilder::new(MeshSettings::default())
        .build_mesh(&servers)
        .unwrap();
    let configs: Vec<String> = mesh.hosts.iter().map(|h| render_config(h).unwrap()).collect();

    assert_eq!(configs.len(), 3);
    for (i, (host, text)) in mesh.hosts.iter().zip(&configs).enumerate() {
        assert!(!text.is_empty());
        assert_eq!(text.matches("[Peer]").count(), 2);
        assert!(!text.contains(&format!("PublicKey = {}", host.keys.public_key_base64())));
        for (j, other) in mesh.hosts.iter().enumerate() {
            if i != j {
                assert!(text.contains(&format!("PublicKey = {}", other.keys.public_key_base64())));
            }
        }
    }
}

#[test]
fn test_overlay_addresses_are_distinct() {
    let servers: Vec<_> = (1..=20).map(|i| server(&format!("n{}", i), i, &[])).collect();

    let mesh = MeshTopologyBuilder::new(MeshSettings::default())
        .build_mesh(&servers)
        .unwrap();

    let addresses: HashSet<_> = mesh.hosts.iter().map(|h| h.private_ip).collect();
    assert_eq!(addresses.len(), 20);
    let keys: HashSet<_> = mesh.hosts.iter().map(|h| h.keys.public_key_base64()).collect();
    assert_eq!(keys.len(), 20);
}
