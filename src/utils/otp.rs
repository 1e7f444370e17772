use rand::Rng;
use rand::rngs::OsRng;

/// Generates a fixed-length decimal one-time code.
///
/// Every digit is drawn independently from the operating system CSPRNG, so
/// leading zeros are possible and codes are not guaranteed to be unique.
pub fn generate_otp(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
