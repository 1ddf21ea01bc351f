//! # Ecrecover Precompile (0x01)
//!
//! Recovers the signer address from an ECDSA signature.
//!
//! Input format (128 bytes):
//! - bytes 0-31: message hash
//! - bytes 32-63: v (recovery id, should be 27 or 28)
//! - bytes 64-95: r
//! - bytes 96-127: s

use super::{Precompile, PrecompileOutput};
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

/// Fixed gas cost for ecrecover.
const ECRECOVER_GAS: u64 = 3000;

/// Recovers the signing address from a message hash and (r, s, v).
///
/// Returns `None` for any malformed or non-recoverable signature, matching
/// the precompile's "return empty output" behavior on bad input.
fn recover_address(hash: &[u8; 32], r: &[u8; 32], s: &[u8; 32], recovery_id: u8) -> Option<Address> {
    let signature = Signature::from_scalars(*r, *s).ok()?;
    let id = RecoveryId::from_byte(recovery_id)?;
    let verifying_key = VerifyingKey::recover_from_prehash(hash, &signature, id).ok()?;
    let encoded = verifying_key.to_encoded_point(false);
    let pubkey_bytes = encoded.as_bytes();
    // Uncompressed point is 0x04 || X (32) || Y (32); address is the last 20
    // bytes of keccak256(X || Y).
    let mut hasher = Keccak256::new();
    hasher.update(&pubkey_bytes[1..]);
    let digest = hasher.finalize();
    Address::from_slice(&digest[12..])
}

/// Ecrecover precompile.
pub struct Ecrecover;

impl Precompile for Ecrecover {
    fn execute(&self, input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
        if ECRECOVER_GAS > gas_limit {
            return Err(PrecompileError::OutOfGas);
        }

        // Pad input to 128 bytes
        let mut padded = [0u8; 128];
        let len = input.len().min(128);
        padded[..len].copy_from_slice(&input[..len]);

        // Extract components
        let hash = &padded[0..32];
        let v = &padded[32..64];
        let r = &padded[64..96];
        let s = &padded[96..128];

        // v should be 27 or 28
        let v_value = v[31];
        if v_value != 27 && v_value != 28 {
            // Invalid v, return empty
            return Ok(PrecompileOutput {
                gas_used: ECRECOVER_GAS,
                output: Bytes::new(),
            });
        }

        // Check r and s are valid (non-zero, less than secp256k1 order)
        let r_zero = r.iter().all(|&b| b == 0);
        let s_zero = s.iter().all(|&b| b == 0);
        if r_zero || s_zero {
            return Ok(PrecompileOutput {
                gas_used: ECRECOVER_GAS,
                output: Bytes::new(),
            });
        }

        let mut hash_arr = [0u8; 32];
        hash_arr.copy_from_slice(hash);
        let mut r_arr = [0u8; 32];
        r_arr.copy_from_slice(r);
        let mut s_arr = [0u8; 32];
        s_arr.copy_from_slice(s);

        let output = match recover_address(&hash_arr, &r_arr, &s_arr, v_value - 27) {
            Some(address) => {
                // Left-pad the 20-byte address to a 32-byte word, as the real
                // ecrecover precompile returns it.
                let mut padded = [0u8; 32];
                padded[12..].copy_from_slice(address.as_bytes());
                Bytes::from_vec(padded.to_vec())
            }
            None => Bytes::new(),
        };

        Ok(PrecompileOutput {
            gas_used: ECRECOVER_GAS,
            output,
        })
    }

    fn address(&self) -> Address {
        let mut addr = [0u8; 20];
        addr[19] = 1;
        Address::new(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecrecover_gas() {
        let precompile = Ecrecover;
        let input = [0u8; 128];
        let result = precompile.execute(&input, 100_000).unwrap();
        assert_eq!(result.gas_used, ECRECOVER_GAS);
    }

    #[test]
    fn test_ecrecover_out_of_gas() {
        let precompile = Ecrecover;
        let input = [0u8; 128];
        let result = precompile.execute(&input, 100);
        assert!(matches!(result, Err(PrecompileError::OutOfGas)));
    }

    #[test]
    fn test_ecrecover_invalid_v() {
        let precompile = Ecrecover;
        let mut input = [0u8; 128];
        input[63] = 30; // Invalid v
        let result = precompile.execute(&input, 100_000).unwrap();
        assert!(result.output.is_empty()); // Returns empty on invalid
    }

    #[test]
    fn test_ecrecover_recovers_known_signer() {
        use k256::ecdsa::SigningKey;

        let signing_key = SigningKey::from_bytes(&[7u8; 32].into()).unwrap();
        let verifying_key = signing_key.verifying_key();
        let encoded = verifying_key.to_encoded_point(false);
        let mut hasher = Keccak256::new();
        hasher.update(&encoded.as_bytes()[1..]);
        let digest = hasher.finalize();
        let expected_address = Address::from_slice(&digest[12..]).unwrap();

        let hash = [0x42u8; 32];
        let (signature, recovery_id): (Signature, RecoveryId) =
            signing_key.sign_prehash_recoverable(&hash).unwrap();

        let mut input = [0u8; 128];
        input[0..32].copy_from_slice(&hash);
        input[63] = 27 + recovery_id.to_byte();
        input[64..96].copy_from_slice(&signature.r().to_bytes());
        input[96..128].copy_from_slice(&signature.s().to_bytes());

        let precompile = Ecrecover;
        let result = precompile.execute(&input, 100_000).unwrap();
        assert_eq!(result.output.len(), 32);
        assert_eq!(&result.output.as_slice()[12..], expected_address.as_bytes());
    }
}
