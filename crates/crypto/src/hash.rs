use sha3::{Digest, Keccak256};

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// EIP-191 personal-sign digest: keccak of the prefixed payload.
pub fn eip191_digest(payload: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n");
    hasher.update(payload.len().to_string().as_bytes());
    hasher.update(payload);
    hasher.finalize().into()
}

/// The commit hash a voter publishes in `submit1` and must reproduce with
/// its reveal: keccak over `submit_address ‖ voting_round_id:u32_be ‖
/// random ‖ feed_bytes`.
pub fn ftso_commit_hash(
    submit_address: &[u8; 20],
    voting_round_id: u32,
    random: &[u8; 32],
    feed_bytes: &[u8],
) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(submit_address);
    hasher.update(voting_round_id.to_be_bytes());
    hasher.update(random);
    hasher.update(feed_bytes);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_vectors() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(
            hex::encode(keccak256(b"abc")),
            "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
        );
    }

    #[test]
    fn eip191_matches_manual_prefixing() {
        let payload = [0x11u8; 38];
        let mut manual = b"\x19Ethereum Signed Message:\n38".to_vec();
        manual.extend_from_slice(&payload);
        assert_eq!(eip191_digest(&payload), keccak256(&manual));
    }

    #[test]
    fn commit_hash_depends_on_every_input() {
        let addr = [0x01u8; 20];
        let random = [0x02u8; 32];
        let feeds = [0x03u8; 12];

        let base = ftso_commit_hash(&addr, 7, &random, &feeds);
        assert_ne!(base, ftso_commit_hash(&[0x09; 20], 7, &random, &feeds));
        assert_ne!(base, ftso_commit_hash(&addr, 8, &random, &feeds));
        assert_ne!(base, ftso_commit_hash(&addr, 7, &[0x09; 32], &feeds));
        assert_ne!(base, ftso_commit_hash(&addr, 7, &random, &[]));
    }
}
