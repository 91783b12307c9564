use strata_protocol_core::GameVersion;
use tracing::warn;

/// Every release the proxy understands, ordered by protocol number.
pub const VERSIONS: &[GameVersion] = &[
    GameVersion::new(340, "1.12.2", 1343),
    GameVersion::new(393, "1.13", 1519),
    GameVersion::new(401, "1.13.1", 1628),
    GameVersion::new(404, "1.13.2", 1631),
    GameVersion::new(477, "1.14", 1952),
    GameVersion::new(480, "1.14.1", 1957),
    GameVersion::new(485, "1.14.2", 1963),
    GameVersion::new(490, "1.14.3", 1968),
    GameVersion::new(498, "1.14.4", 1976),
    GameVersion::new(573, "1.15", 2225),
    GameVersion::new(575, "1.15.1", 2227),
    GameVersion::new(578, "1.15.2", 2230),
    GameVersion::new(735, "1.16", 2566),
    GameVersion::new(736, "1.16.1", 2567),
    GameVersion::new(751, "1.16.2", 2578),
    GameVersion::new(753, "1.16.3", 2580),
    GameVersion::new(754, "1.16.5", 2586),
    GameVersion::new(755, "1.17", 2724),
    GameVersion::new(756, "1.17.1", 2730),
    GameVersion::new(757, "1.18.1", 2865),
    GameVersion::new(758, "1.18.2", 2975),
    GameVersion::new(759, "1.19", 3105),
    GameVersion::new(760, "1.19.2", 3120),
    GameVersion::new(761, "1.19.3", 3218),
    GameVersion::new(762, "1.19.4", 3337),
    GameVersion::new(763, "1.20.1", 3465),
];

/// Exact catalog entry for a protocol number.
pub fn lookup(protocol: i32) -> Option<GameVersion> {
    VERSIONS.iter().find(|v| v.protocol == protocol).copied()
}

/// Resolve a handshake protocol number to a game version. Unknown numbers fall
/// back to the closest older release, or the oldest one we have.
pub fn resolve(protocol: i32) -> GameVersion {
    if let Some(version) = lookup(protocol) {
        return version;
    }
    let fallback = VERSIONS
        .iter()
        .rev()
        .find(|v| v.protocol < protocol)
        .copied()
        .unwrap_or(VERSIONS[0]);
    warn!(
        "Unknown protocol version {}, treating it as {} ({})",
        protocol, fallback.name, fallback.protocol
    );
    fallback
}
