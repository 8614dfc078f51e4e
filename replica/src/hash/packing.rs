use ark_bn254::Fr;
use ark_ff::PrimeField;
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

use crate::error::{Error, Result};
use crate::hash::fr_to_bytes;

/// Width in bits of each value packed into a single field element.
pub const PACKED_WIDTH: usize = 50;

/// Packs up to five values of at most `PACKED_WIDTH` bits, least significant first.
pub fn pack(values: &[u64]) -> Result<Fr>
{
    if values.len() * PACKED_WIDTH >= Fr::MODULUS_BIT_SIZE as usize
    {
        Err(Error::ValueOutOfRange { what: "packed value count", value: values.len() as u128 })?
    }

    let mut acc = BigUint::zero();
    for (i, value) in values.iter().enumerate()
    {
        if *value >> PACKED_WIDTH != 0
        {
            Err(Error::ValueOutOfRange { what: "packed value", value: *value as u128 })?
        }
        acc |= BigUint::from(*value) << (i * PACKED_WIDTH);
    }

    Ok(Fr::from_be_bytes_mod_order(&acc.to_bytes_be()))
}

/// Inverse of `pack`. Returns `None` if any bit beyond the last value is set.
pub fn unpack(packed: &Fr, count: usize) -> Option<Vec<u64>>
{
    let mut acc = BigUint::from_bytes_be(&fr_to_bytes(packed));
    let mask = (BigUint::one() << PACKED_WIDTH) - 1u32;

    let mut values = Vec::with_capacity(count);
    for _ in 0..count
    {
        values.push((&acc & &mask).to_u64()?);
        acc >>= PACKED_WIDTH;
    }

    acc.is_zero().then_some(values)
}
