use ark_bn254::Fr;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ed_on_bn254::{EdwardsAffine, EdwardsProjective, Fr as Scalar};
use ark_ff::{BigInteger, PrimeField, Zero};
use ark_std::UniformRand;
use codec::{Decode, Encode};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::{fr_from_bytes, fr_to_bytes, hash2, hash5, HashBytes, HASH_LEN};

/// A public key used to facillitate secret sharing between participants and coordinators.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Encode, Decode, Serialize, Deserialize)]
pub struct PublicKey
{
    /// A 256-bit x-coordinate of the public key.
    pub x: HashBytes,

    /// A 256-bit y-coordinate of the public key.
    pub y: HashBytes
}

/// A Baby Jubjub scalar.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PrivateKey(Scalar);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Keypair
{
    pub private_key: PrivateKey,
    pub public_key: PublicKey
}

/// An EdDSA-Poseidon signature.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Signature
{
    /// The commitment point `R8`.
    pub r8: [Fr; 2],

    /// The response, a subgroup scalar carried as a base field element.
    pub s: Fr
}

pub(crate) fn fr_to_scalar(value: &Fr) -> Scalar
{
    Scalar::from_le_bytes_mod_order(&value.into_bigint().to_bytes_le())
}

pub(crate) fn scalar_to_fr(value: &Scalar) -> Fr
{
    Fr::from_le_bytes_mod_order(&value.into_bigint().to_bytes_le())
}

fn subgroup_point(x: Fr, y: Fr) -> Option<EdwardsAffine>
{
    let point = EdwardsAffine::new_unchecked(x, y);
    (point.is_on_curve() && point.is_in_correct_subgroup_assuming_on_curve()).then_some(point)
}

impl PublicKey
{
    pub fn from_point(point: &EdwardsAffine) -> Self
    {
        PublicKey { x: fr_to_bytes(&point.x), y: fr_to_bytes(&point.y) }
    }

    /// The neutral element `(0, 1)`, used as the key of blank leaves and padding messages.
    pub fn identity() -> Self
    {
        Self::from_point(&EdwardsAffine::zero())
    }

    pub fn is_identity(&self) -> bool
    {
        *self == Self::identity()
    }

    /// The coordinates as field elements, reduced if necessary.
    pub fn coordinates(&self) -> [Fr; 2]
    {
        [Fr::from_be_bytes_mod_order(&self.x), Fr::from_be_bytes_mod_order(&self.y)]
    }

    /// Decode and check that the key lies in the prime order subgroup.
    pub fn to_point(&self) -> Result<EdwardsAffine>
    {
        let (Some(x), Some(y)) = (fr_from_bytes(&self.x), fr_from_bytes(&self.y)) else { Err(Error::MalformedPublicKey)? };
        subgroup_point(x, y).ok_or(Error::MalformedPublicKey)
    }

    pub fn is_valid(&self) -> bool
    {
        self.to_point().is_ok()
    }

    pub fn hash(&self) -> Result<Fr>
    {
        let [x, y] = self.coordinates();
        hash2(x, y)
    }
}

impl PrivateKey
{
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self
    {
        loop
        {
            let scalar = Scalar::rand(rng);
            if !scalar.is_zero() { return PrivateKey(scalar); }
        }
    }

    pub fn from_bytes(bytes: &HashBytes) -> Option<Self>
    {
        let scalar = Scalar::from_be_bytes_mod_order(bytes);
        (!scalar.is_zero() && PrivateKey(scalar).to_bytes() == *bytes).then_some(PrivateKey(scalar))
    }

    pub fn to_bytes(&self) -> HashBytes
    {
        let bytes = self.0.into_bigint().to_bytes_be();
        let mut out = [0u8; HASH_LEN];
        out[HASH_LEN - bytes.len()..].copy_from_slice(&bytes);
        out
    }

    /// The scalar embedded into the base field.
    pub fn as_field(&self) -> Fr
    {
        scalar_to_fr(&self.0)
    }

    pub fn public_key(&self) -> PublicKey
    {
        PublicKey::from_point(&self.public_point())
    }

    fn public_point(&self) -> EdwardsAffine
    {
        (EdwardsAffine::generator() * self.0).into_affine()
    }

    /// Diffie-Hellman against `public`, yielding the shared point's coordinates.
    pub fn shared_key(&self, public: &PublicKey) -> Result<[Fr; 2]>
    {
        let point = (public.to_point()? * self.0).into_affine();
        Ok([point.x, point.y])
    }

    /// Deterministic EdDSA-Poseidon signature over a field element.
    pub fn sign(&self, message: Fr) -> Result<Signature>
    {
        let r = fr_to_scalar(&hash2(self.as_field(), message)?);
        let r8 = (EdwardsAffine::generator() * r).into_affine();
        let a = self.public_point();

        let h = fr_to_scalar(&hash5([r8.x, r8.y, a.x, a.y, message])?);
        let s = r + h * self.0;

        Ok(Signature { r8: [r8.x, r8.y], s: scalar_to_fr(&s) })
    }
}

impl Keypair
{
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self
    {
        Self::from_private_key(PrivateKey::random(rng))
    }

    pub fn from_private_key(private_key: PrivateKey) -> Self
    {
        Keypair { public_key: private_key.public_key(), private_key }
    }
}

impl Signature
{
    /// Check the signature over `message` against `public`. Malformed points,
    /// non-canonical responses and hash failures all verify as false.
    pub fn verify(&self, public: &PublicKey, message: Fr) -> bool
    {
        let Ok(a) = public.to_point() else { return false };
        let Some(r8) = subgroup_point(self.r8[0], self.r8[1]) else { return false };
        if self.s.into_bigint() >= Scalar::MODULUS { return false; }

        let Ok(h) = hash5([r8.x, r8.y, a.x, a.y, message]) else { return false };
        let h = fr_to_scalar(&h);

        let lhs = EdwardsAffine::generator() * fr_to_scalar(&self.s);
        let rhs = EdwardsProjective::from(r8) + a * h;
        lhs == rhs
    }
}
