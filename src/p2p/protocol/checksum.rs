//! Payload checksum: the first four bytes of SHA256(SHA256(payload)).

use sha2::Digest;
use sha2::Sha256;

use super::header::CHECKSUM_SIZE;

pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

pub fn payload_checksum(payload: &[u8]) -> [u8; CHECKSUM_SIZE] {
    let digest = double_sha256(payload);
    let mut checksum = [0u8; CHECKSUM_SIZE];
    checksum.copy_from_slice(&digest[..CHECKSUM_SIZE]);
    checksum
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_checksum() {
        assert_eq!([0x5d, 0xf6, 0xe0, 0xe2], payload_checksum(&[]));
    }

    #[test]
    fn checksum_is_digest_prefix() {
        let payload = 11u64.to_le_bytes();
        assert_eq!(double_sha256(&payload)[..4], payload_checksum(&payload));
    }
}
