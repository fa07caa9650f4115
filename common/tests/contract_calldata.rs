// Calldata vectors for the BunkerverseNFT surface, laid out word by word

use orbit_common::{
    abi::{decode, encode_hex, selector, ParamType, Token},
    contract::{ContractInfo, NftCall, BATCH_MINT, SAFE_MINT},
    types::{Address, U256},
};

fn word_uint(value: u64) -> String {
    format!("{:064x}", value)
}

fn word_address(byte: u8) -> String {
    format!("{}{}", "0".repeat(24), format!("{:02x}", byte).repeat(20))
}

// UTF-8 bytes right-padded to whole words, preceded by the length word
fn word_string(value: &str) -> String {
    let mut hex: String = value.bytes().map(|b| format!("{b:02x}")).collect();
    let rem = hex.len() % 64;
    if rem != 0 {
        hex.push_str(&"0".repeat(64 - rem));
    }
    format!("{}{}", word_uint(value.len() as u64), hex)
}

#[test]
fn test_transfer_from_calldata() {
    let call = NftCall::transfer_from(Address::repeat_byte(0x11), Address::repeat_byte(0x22), 7);
    let expected = format!(
        "0x23b872dd{}{}{}",
        word_address(0x11),
        word_address(0x22),
        word_uint(7)
    );
    assert_eq!(encode_hex(&call.calldata()), expected);
}

#[test]
fn test_owner_of_and_token_uri_calldata() {
    assert_eq!(
        encode_hex(&NftCall::owner_of(1).calldata()),
        format!("0x6352211e{}", word_uint(1))
    );
    assert_eq!(
        encode_hex(&NftCall::token_uri(42).calldata()),
        format!("0xc87b56dd{}", word_uint(42))
    );
}

#[test]
fn test_safe_mint_calldata() {
    let call = NftCall::safe_mint(Address::repeat_byte(0xab), "ipfs://QmYourFirstNFTMetadataHash");
    let expected = format!(
        "0x{}{}{}{}",
        hex::encode(selector(SAFE_MINT)),
        word_address(0xab),
        word_uint(0x40),
        word_string("ipfs://QmYourFirstNFTMetadataHash")
    );
    assert_eq!(encode_hex(&call.calldata()), expected);
}

#[test]
fn test_batch_mint_calldata() {
    let recipients = [Address::repeat_byte(0x01), Address::repeat_byte(0x02)];
    let uris = ["ipfs://a".to_string(), "ipfs://b".to_string()];
    let call = NftCall::batch_mint(&recipients, &uris);

    let expected = [
        hex::encode(selector(BATCH_MINT)),
        // Offsets of both arrays
        word_uint(0x40),
        word_uint(0xa0),
        // address[]
        word_uint(2),
        word_address(0x01),
        word_address(0x02),
        // string[]: length, element offsets, elements
        word_uint(2),
        word_uint(0x40),
        word_uint(0x80),
        word_string("ipfs://a"),
        word_string("ipfs://b"),
    ]
    .concat();
    assert_eq!(encode_hex(&call.calldata()), format!("0x{expected}"));

    // The arguments decode back from the calldata
    let types = [
        ParamType::Array(Box::new(ParamType::Address)),
        ParamType::Array(Box::new(ParamType::String)),
    ];
    let tokens = decode(&types, &call.calldata()[4..]).unwrap();
    assert_eq!(tokens, call.args);
}

#[test]
fn test_contract_info_return_data() {
    // (string name, string symbol, uint256 totalSupply, string version, string chainName, uint256 chainId)
    let data = [
        word_uint(0xc0),
        word_uint(0x100),
        word_uint(4),
        word_uint(0x140),
        word_uint(0x180),
        word_uint(33701),
        word_string("Bunkerverse NFT"),
        word_string("BVNFT"),
        word_string("1.0.0"),
        word_string("Bunkerverse L3"),
    ]
    .concat();
    let bytes = hex::decode(data).unwrap();

    let tokens = decode(&ContractInfo::return_types(), &bytes).unwrap();
    let info = ContractInfo::from_tokens(tokens).unwrap();
    assert_eq!(info.name, "Bunkerverse NFT");
    assert_eq!(info.symbol, "BVNFT");
    assert_eq!(info.total_supply, 4);
    assert_eq!(info.version, "1.0.0");
    assert_eq!(info.chain_name, "Bunkerverse L3");
    assert_eq!(info.chain_id, 33701);
}

#[test]
fn test_truncated_return_data_is_rejected() {
    let data = hex::decode(word_uint(0x20)).unwrap();
    assert!(decode(&[ParamType::String], &data).is_err());
    assert_eq!(
        decode(&[ParamType::Uint], &hex::decode(word_uint(9)).unwrap()).unwrap(),
        vec![Token::Uint(U256::from(9u64))]
    );
}
