use serde::Serialize;

use super::topology::{MeshHost, Peer};
use crate::error::MeshError;
use crate::templates;

pub const WIREGUARD_CONFIG_PATH: &str = "/etc/wireguard/wg0.conf";

const WG0_TEMPLATE: &str = "\
[Interface]
PrivateKey = {{ private_key }}
ListenPort = {{ listen_port }}
Address = {{ address }}
{% for peer in peers %}

[Peer]
PublicKey = {{ peer.public_key }}
Endpoint = {{ peer.endpoint }}
AllowedIPs = {{ peer.allowed_ips }}
{% endfor %}
";

#[derive(Serialize)]
struct InterfaceContext<'a> {
    private_key: String,
    listen_port: u16,
    address: String,
    peers: &'a [Peer],
}

/// WireGuard configuration text for one host of the mesh
pub fn render_config(host: &MeshHost) -> Result<String, MeshError> {
    let context = InterfaceContext {
        private_key: host.keys.private_key_base64(),
        listen_port: host.listen_port,
        address: host.address(),
        peers: &host.peers,
    };
    templates::render("wg0.conf", WG0_TEMPLATE, &context).map_err(|source| MeshError::Render {
        host: host.name.clone(),
        source,
    })
}
