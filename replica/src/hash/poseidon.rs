use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonError, PoseidonHasher};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

pub const HASH_LEN: usize = 32;

/// The widest circom parameter set available for BN254 (`t = 13`).
pub const MAX_INPUTS: usize = 12;

/// A big-endian encoded field element.
pub type HashBytes = [u8; HASH_LEN];

fn hash_failed(error: PoseidonError) -> Error
{
    Error::HashFailed(format!("{error:?}"))
}

/// Poseidon hash (circom parameters) of between one and `MAX_INPUTS` field elements.
pub fn hash_n(inputs: &[Fr]) -> Result<Fr>
{
    if inputs.is_empty() || inputs.len() > MAX_INPUTS
    {
        Err(Error::HashFailed(format!("unsupported arity {}", inputs.len())))?
    }

    let mut hasher = Poseidon::<Fr>::new_circom(inputs.len()).map_err(hash_failed)?;
    hasher.hash(inputs).map_err(hash_failed)
}

pub fn hash2(left: Fr, right: Fr) -> Result<Fr>
{
    hash_n(&[left, right])
}

pub fn hash3(inputs: [Fr; 3]) -> Result<Fr>
{
    hash_n(&inputs)
}

pub fn hash4(inputs: [Fr; 4]) -> Result<Fr>
{
    hash_n(&inputs)
}

pub fn hash5(inputs: [Fr; 5]) -> Result<Fr>
{
    hash_n(&inputs)
}

/// Big-endian encoding of a field element.
pub fn fr_to_bytes(value: &Fr) -> HashBytes
{
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; HASH_LEN];
    out[HASH_LEN - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Strict decoding: rejects encodings of values at or above the modulus.
pub fn fr_from_bytes(bytes: &HashBytes) -> Option<Fr>
{
    let value = Fr::from_be_bytes_mod_order(bytes);
    (fr_to_bytes(&value) == *bytes).then_some(value)
}

/// Decimal rendering, as consumed by the proving toolchain.
pub fn fr_to_decimal(value: &Fr) -> String
{
    BigUint::from_bytes_be(&fr_to_bytes(value)).to_string()
}

pub fn hex_of(bytes: &HashBytes) -> String
{
    format!("0x{}", hex::encode(bytes))
}

/// SHA-256 over the concatenated big-endian encodings, reduced into the field.
pub fn sha256_to_field(inputs: &[Fr]) -> Fr
{
    let mut hasher = Sha256::new();
    for input in inputs
    {
        hasher.update(fr_to_bytes(input));
    }
    Fr::from_be_bytes_mod_order(&hasher.finalize())
}
