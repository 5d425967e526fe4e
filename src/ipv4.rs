//! Conversions between dotted-quad IPv4 text and its 32-bit big-endian form.

use std::net::Ipv4Addr;

use crate::error::{EndpointError, Result};

/// Converts `a.b.c.d` into a `u32` whose most significant byte is `a`.
///
/// Malformed input (wrong component count, non-numeric component, octet above
/// 255, surrounding whitespace) is rejected with [`EndpointError::AddressConversionFailure`].
pub fn to_u32(text: &str) -> Result<u32> {
    parse(text).map(u32::from)
}

/// Converts a `u32` back into dotted-quad text.
pub fn from_u32(addr: u32) -> String {
    Ipv4Addr::from(addr).to_string()
}

pub(crate) fn parse(text: &str) -> Result<Ipv4Addr> {
    text.parse::<Ipv4Addr>()
        .map_err(|_| EndpointError::AddressConversionFailure(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_known_address() {
        assert_eq!(to_u32("10.0.0.1").unwrap(), 0x0A00_0001);
        assert_eq!(from_u32(to_u32("10.0.0.1").unwrap()), "10.0.0.1");
        assert_eq!(from_u32(0xC0A8_010A), "192.168.1.10");
    }

    #[test]
    fn text_round_trip_is_stable() {
        for s in ["0.0.0.0", "127.0.0.1", "255.255.255.255", "172.16.254.3"] {
            let n = to_u32(s).unwrap();
            assert_eq!(to_u32(&from_u32(n)).unwrap(), n);
        }
    }

    #[test]
    fn rejects_malformed_input() {
        for s in ["", "1.2.3", "1.2.3.4.5", "a.b.c.d", "256.0.0.1", "1..2.3", " 10.0.0.1", "10.0.0.1 "] {
            assert!(
                matches!(to_u32(s), Err(EndpointError::AddressConversionFailure(_))),
                "{s:?} should be rejected"
            );
        }
    }
}
