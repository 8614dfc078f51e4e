use ark_bn254::Fr;
use ark_ff::{BigInteger, Field, One, PrimeField, Zero};

use crate::error::Error;
use crate::hash::{
    fr_from_bytes,
    fr_to_bytes,
    fr_to_decimal,
    hash2,
    hash_n,
    pack,
    sha256_to_field,
    unpack,
    MAX_INPUTS
};

/// Check the hash of `1` as a prime field element.
#[test]
fn fr_one()
{
    let expected = [
        0, 122, 243, 70, 226, 211, 4, 39, 158, 121, 224, 169, 243, 2, 63, 119, 18, 148, 167, 138,
        203, 112, 231, 63, 144, 175, 226, 124, 173, 64, 30, 129,
    ];

    let input = Fr::from_be_bytes_mod_order(&[1u8]);
    assert_eq!(fr_to_bytes(&hash2(input, input).unwrap()), expected);

    let input = Fr::from_be_bytes_mod_order(&[0u8, 0u8, 1u8]);
    assert_eq!(fr_to_bytes(&hash2(input, input).unwrap()), expected);
}

/// Checks the hash of byte slices consistng of ones and twos.
#[test]
fn bytes_ones_twos()
{
    let input1 = Fr::from_be_bytes_mod_order(&[1u8; 32]);
    let input2 = Fr::from_be_bytes_mod_order(&[2u8; 32]);
    assert_eq!(
        fr_to_bytes(&hash2(input1, input2).unwrap()),
        [
            13, 84, 225, 147, 143, 138, 140, 28, 125, 235, 94, 3, 85, 242, 99, 25, 32, 123, 132,
            254, 156, 162, 206, 27, 38, 231, 53, 200, 41, 130, 25, 144
        ]
    );
}

/// Check the hash of one and two.
#[test]
fn fr_one_two()
{
    let hash = hash2(Fr::one(), Fr::from(2u64)).unwrap();
    assert_eq!(
        hash.into_bigint().to_bytes_le(),
        [
            154, 24, 23, 68, 122, 96, 25, 158, 81, 69, 50, 116, 242, 23, 54, 42, 207, 233, 98, 150,
            107, 76, 246, 61, 65, 144, 214, 231, 245, 192, 92, 17
        ]
    );
}

#[test]
fn random_input()
{
    let input1 = Fr::from_be_bytes_mod_order(&[ 93, 202, 70, 122, 46, 238, 242, 161, 142, 171, 237, 131, 78, 254, 47, 96, 170, 173, 24, 112, 8, 112, 73, 123, 248, 7, 9, 75, 55, 214, 196, 114 ]);
    let input2 = Fr::from_be_bytes_mod_order(&[ 131, 162, 129, 115, 20, 245, 254, 5, 200, 101, 156, 226, 102, 57, 207, 152, 105, 122, 29, 235, 131, 196, 247, 239, 5, 252, 253, 181, 251, 93, 114, 219 ]);

    let hash = hash2(input1, input2).unwrap();
    assert_eq!(
        hash.into_bigint().to_bytes_le(),
        [ 64, 118, 212, 28, 127, 187, 234, 52, 44, 113, 111, 106, 189, 79, 8, 95, 185, 37, 62, 152, 72, 127, 150, 110, 238, 135, 124, 47, 20, 139, 115, 36 ]
    )
}

/// Hashing zero or too many inputs should fail rather than panic.
#[test]
fn unsupported_widths()
{
    assert!(matches!(hash_n(&[]), Err(Error::HashFailed(_))));
    assert!(matches!(hash_n(&vec![Fr::one(); MAX_INPUTS + 1]), Err(Error::HashFailed(_))));
    assert!(hash_n(&vec![Fr::one(); MAX_INPUTS]).is_ok());
}

// Test cases were created with circomlibjs poseidon([1, ...]) for 1 to 16 inputs
const CIRCOMLIBJS_TEST_CASES: [[u8; 32]; 12] = [
    [
        41, 23, 97, 0, 234, 169, 98, 189, 193, 254, 108, 101, 77, 106, 60, 19, 14, 150, 164, 209,
        22, 139, 51, 132, 139, 137, 125, 197, 2, 130, 1, 51,
    ],
    [
        0, 122, 243, 70, 226, 211, 4, 39, 158, 121, 224, 169, 243, 2, 63, 119, 18, 148, 167, 138,
        203, 112, 231, 63, 144, 175, 226, 124, 173, 64, 30, 129,
    ],
    [
        2, 192, 6, 110, 16, 167, 42, 189, 43, 51, 195, 178, 20, 203, 62, 129, 188, 177, 182, 227,
        9, 97, 205, 35, 194, 2, 177, 134, 115, 191, 37, 67,
    ],
    [
        8, 44, 156, 55, 10, 13, 36, 244, 65, 111, 188, 65, 74, 55, 104, 31, 120, 68, 45, 39, 216,
        99, 133, 153, 28, 23, 214, 252, 12, 75, 125, 113,
    ],
    [
        16, 56, 150, 5, 174, 104, 141, 79, 20, 219, 133, 49, 34, 196, 125, 102, 168, 3, 199, 43,
        65, 88, 156, 177, 191, 134, 135, 65, 178, 6, 185, 187,
    ],
    [
        42, 115, 246, 121, 50, 140, 62, 171, 114, 74, 163, 229, 189, 191, 80, 179, 144, 53, 215,
        114, 159, 19, 91, 151, 9, 137, 15, 133, 197, 220, 94, 118,
    ],
    [
        34, 118, 49, 10, 167, 243, 52, 58, 40, 66, 20, 19, 157, 157, 169, 89, 190, 42, 49, 178,
        199, 8, 165, 248, 25, 84, 178, 101, 229, 58, 48, 184,
    ],
    [
        23, 126, 20, 83, 196, 70, 225, 176, 125, 43, 66, 51, 66, 81, 71, 9, 92, 79, 202, 187, 35,
        61, 35, 11, 109, 70, 162, 20, 217, 91, 40, 132,
    ],
    [
        14, 143, 238, 47, 228, 157, 163, 15, 222, 235, 72, 196, 46, 187, 68, 204, 110, 231, 5, 95,
        97, 251, 202, 94, 49, 59, 138, 95, 202, 131, 76, 71,
    ],
    [
        46, 196, 198, 94, 99, 120, 171, 140, 115, 48, 133, 79, 74, 112, 119, 193, 255, 146, 96,
        228, 72, 133, 196, 184, 29, 209, 49, 173, 58, 134, 205, 150,
    ],
    [
        0, 113, 61, 65, 236, 166, 53, 241, 23, 212, 236, 188, 235, 95, 58, 102, 220, 65, 66, 235,
        112, 181, 103, 101, 188, 53, 143, 27, 236, 64, 187, 155,
    ],
    [
        20, 57, 11, 224, 186, 239, 36, 155, 212, 124, 101, 221, 172, 101, 194, 229, 46, 133, 19,
        192, 129, 193, 205, 114, 201, 128, 6, 9, 142, 154, 143, 190,
    ],
];

/// Check compatibility with circomlibjs.
#[test]
fn circomlibjs_compat_1_to_12_inputs()
{
    for i in 1..13
    {
        let hash = hash_n(&vec![Fr::one(); i]).unwrap();
        assert_eq!(fr_to_bytes(&hash), CIRCOMLIBJS_TEST_CASES[i - 1]);
    }
    for i in 1..13
    {
        let hash = hash_n(&vec![Fr::from(2u64); i]).unwrap();
        assert!(fr_to_bytes(&hash) != CIRCOMLIBJS_TEST_CASES[i - 1]);
    }
}

/// Encodings at or above the modulus must not silently wrap.
#[test]
fn strict_byte_decoding()
{
    let value = Fr::from(123456789u64);
    assert_eq!(fr_from_bytes(&fr_to_bytes(&value)), Some(value));
    assert_eq!(fr_from_bytes(&[0xff; 32]), None);

    let mut modulus = [0u8; 32];
    let bytes = Fr::MODULUS.to_bytes_be();
    modulus[32 - bytes.len()..].copy_from_slice(&bytes);
    assert_eq!(fr_from_bytes(&modulus), None);
}

#[test]
fn decimal_rendering()
{
    assert_eq!(fr_to_decimal(&Fr::zero()), "0");
    assert_eq!(fr_to_decimal(&Fr::from(1234u64)), "1234");
    assert_eq!(fr_to_decimal(&-Fr::one()), "21888242871839275222246405745257275088548364400416034343698204186575808495616");
}

/// The public input hash is sha256 over the big-endian words, reduced into the field.
#[test]
fn public_input_hash()
{
    let a = sha256_to_field(&[Fr::one(), Fr::from(2u64)]);
    let b = sha256_to_field(&[Fr::one(), Fr::from(2u64)]);
    let c = sha256_to_field(&[Fr::from(2u64), Fr::one()]);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(fr_from_bytes(&fr_to_bytes(&a)), Some(a));
}

#[test]
fn packing()
{
    let values = [3u64, 0, 25, (1 << 50) - 1, 7];
    let packed = pack(&values).unwrap();
    assert_eq!(unpack(&packed, 5), Some(values.to_vec()));
    assert_eq!(packed.into_bigint().to_bytes_le()[0], 3);

    assert!(matches!(pack(&[1 << 50]), Err(Error::ValueOutOfRange { .. })));
    assert!(matches!(pack(&[0; 6]), Err(Error::ValueOutOfRange { .. })));

    // Bits above the packed fields are a decode failure.
    let overflow = packed + Fr::from(2u64).pow([250u64]);
    assert_eq!(unpack(&overflow, 5), None);
}
