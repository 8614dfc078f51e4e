use ark_bn254::Fr;

use crate::keys::{Keypair, PrivateKey, PublicKey};
use crate::mock::test_rng;

#[test]
fn signature_verifies()
{
    let keypair = Keypair::random(&mut test_rng(3));
    let message = Fr::from(42u64);

    let signature = keypair.private_key.sign(message).unwrap();
    assert!(signature.verify(&keypair.public_key, message));
    assert!(!signature.verify(&keypair.public_key, Fr::from(43u64)));

    let other = Keypair::random(&mut test_rng(4));
    assert!(!signature.verify(&other.public_key, message));
}

/// Signing is deterministic in the key and the message.
#[test]
fn signing_is_deterministic()
{
    let keypair = Keypair::random(&mut test_rng(5));
    let message = Fr::from(7u64);
    assert_eq!(keypair.private_key.sign(message).unwrap(), keypair.private_key.sign(message).unwrap());
}

/// A tampered response is rejected.
#[test]
fn tampered_signature()
{
    let keypair = Keypair::random(&mut test_rng(6));
    let mut signature = keypair.private_key.sign(Fr::from(1u64)).unwrap();
    signature.s += Fr::from(1u64);
    assert!(!signature.verify(&keypair.public_key, Fr::from(1u64)));
}

/// Both parties derive the same shared key.
#[test]
fn shared_key_agreement()
{
    let alice = Keypair::random(&mut test_rng(7));
    let bob = Keypair::random(&mut test_rng(8));

    assert_eq!(
        alice.private_key.shared_key(&bob.public_key).unwrap(),
        bob.private_key.shared_key(&alice.public_key).unwrap()
    );
}

#[test]
fn key_encodings()
{
    let keypair = Keypair::random(&mut test_rng(9));

    let bytes = keypair.private_key.to_bytes();
    assert_eq!(PrivateKey::from_bytes(&bytes), Some(keypair.private_key));
    assert_eq!(PrivateKey::from_bytes(&[0; 32]), None);

    assert!(keypair.public_key.is_valid());
    assert!(PublicKey::identity().is_valid());
    assert!(PublicKey::identity().is_identity());
    assert!(!PublicKey { x: [0; 32], y: [0; 32] }.is_valid());
    assert!(!PublicKey { x: [0xff; 32], y: keypair.public_key.y }.is_valid());
}
