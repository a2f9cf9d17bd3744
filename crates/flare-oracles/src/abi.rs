//! Calldata encoding and return decoding for the oracle contracts' view calls.

use crate::error::{OracleError, Result};
use ethers_core::abi::{self as ethabi, ParamType, Token};
use ethers_core::types::{Address, I256, U256};
use ethers_core::utils::keccak256;

/// First four bytes of the Keccak-256 hash of a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Selector followed by the ABI-encoded arguments.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend(ethabi::encode(args));
    data
}

/// Decode return data into one token per type.
pub fn decode<const N: usize>(types: &[ParamType; N], data: &[u8]) -> Result<[Token; N]> {
    let tokens =
        ethabi::decode(types, data).map_err(|e| OracleError::AbiDecode(e.to_string()))?;
    tokens.try_into().map_err(|t: Vec<Token>| {
        OracleError::AbiDecode(format!("expected {} values, got {}", N, t.len()))
    })
}

fn unexpected(expected: &str, token: &Token) -> OracleError {
    OracleError::AbiDecode(format!("expected {}, got {:?}", expected, token))
}

pub fn into_uint(token: Token) -> Result<U256> {
    match token {
        Token::Uint(value) => Ok(value),
        other => Err(unexpected("uint", &other)),
    }
}

pub fn into_u64(token: Token) -> Result<u64> {
    let value = into_uint(token)?;
    u64::try_from(value)
        .map_err(|_| OracleError::AbiDecode(format!("{} does not fit uint64", value)))
}

pub fn into_i8(token: Token) -> Result<i8> {
    match token {
        Token::Int(raw) => {
            let value = I256::from_raw(raw);
            i8::try_from(value)
                .map_err(|_| OracleError::AbiDecode(format!("{} does not fit int8", value)))
        }
        other => Err(unexpected("int", &other)),
    }
}

pub fn into_bool(token: Token) -> Result<bool> {
    match token {
        Token::Bool(value) => Ok(value),
        other => Err(unexpected("bool", &other)),
    }
}

pub fn into_address(token: Token) -> Result<Address> {
    match token {
        Token::Address(address) => Ok(address),
        other => Err(unexpected("address", &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD: usize = 32;

    #[test]
    fn test_known_selectors() {
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
    }

    #[test]
    fn test_encode_string_argument() {
        let data = encode_call(
            "getContractAddressByName(string)",
            &[Token::String("FtsoV2".to_string())],
        );

        assert_eq!(data.len(), 4 + 3 * WORD);
        assert_eq!(&data[..4], &selector("getContractAddressByName(string)"));
        // offset to the tail
        assert_eq!(data[4 + 31], 0x20);
        // string length
        assert_eq!(data[4 + WORD + 31], 6);
        assert_eq!(&data[4 + 2 * WORD..4 + 2 * WORD + 6], b"FtsoV2");
    }

    #[test]
    fn test_encode_fixed_bytes_left_aligned() {
        let id = vec![0x01u8, b'B', b'T', b'C'];
        let data = encode_call("getFeedById(bytes21)", &[Token::FixedBytes(id.clone())]);

        assert_eq!(data.len(), 4 + WORD);
        assert_eq!(&data[4..8], id.as_slice());
        assert!(data[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_decode_feed_tuple() {
        // (uint256 2^200, int8 -3, uint64 1_700_000_000)
        let big = U256::from(1u8) << 200;
        let data = ethabi::encode(&[
            Token::Uint(big),
            Token::Int(I256::from(-3).into_raw()),
            Token::Uint(U256::from(1_700_000_000u64)),
        ]);

        let [value, decimals, timestamp] = decode(
            &[ParamType::Uint(256), ParamType::Int(8), ParamType::Uint(64)],
            &data,
        )
        .unwrap();

        assert_eq!(into_uint(value).unwrap(), big);
        assert_eq!(into_i8(decimals).unwrap(), -3);
        assert_eq!(into_u64(timestamp).unwrap(), 1_700_000_000);
    }

    #[test]
    fn test_decode_rejects_short_data() {
        let data = vec![0u8; WORD];
        let err = decode(&[ParamType::Uint(256), ParamType::Bool], &data).unwrap_err();
        assert!(matches!(err, OracleError::AbiDecode(_)));
    }

    #[test]
    fn test_narrowing_rejects_out_of_range() {
        assert!(into_u64(Token::Uint(U256::MAX)).is_err());
        assert!(into_i8(Token::Int(I256::from(300).into_raw())).is_err());
        assert!(into_bool(Token::Uint(U256::one())).is_err());
    }

    #[test]
    fn test_decode_address() {
        let address = Address::repeat_byte(0xab);
        let data = ethabi::encode(&[Token::Address(address)]);
        let [token] = decode(&[ParamType::Address], &data).unwrap();
        assert_eq!(into_address(token).unwrap(), address);
    }
}
