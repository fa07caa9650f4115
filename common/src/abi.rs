// Minimal Ethereum ABI codec
//
// Covers exactly the value kinds the NFT contract surface uses: address,
// uint256, bool, string, bytes and dynamic arrays of those. Every value
// occupies a single head word (no static tuples or fixed-size arrays).

use std::fmt::{Display, Error, Formatter};

use crate::{
    error::AbiError,
    types::{keccak256, Address, H256, U256},
};

pub const WORD_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(U256),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Uint,
    Bool,
    String,
    Bytes,
    Array(Box<ParamType>),
}

impl ParamType {
    fn is_dynamic(&self) -> bool {
        matches!(
            self,
            ParamType::String | ParamType::Bytes | ParamType::Array(_)
        )
    }
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_) | Token::Bytes(_) | Token::Array(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Token::Address(_) => "address",
            Token::Uint(_) => "uint256",
            Token::Bool(_) => "bool",
            Token::String(_) => "string",
            Token::Bytes(_) => "bytes",
            Token::Array(_) => "array",
        }
    }

    pub fn into_address(self) -> Result<Address, AbiError> {
        match self {
            Token::Address(address) => Ok(address),
            other => Err(mismatch("address", &other)),
        }
    }

    pub fn into_uint(self) -> Result<U256, AbiError> {
        match self {
            Token::Uint(value) => Ok(value),
            other => Err(mismatch("uint256", &other)),
        }
    }

    pub fn into_u64(self) -> Result<u64, AbiError> {
        u256_to_u64(self.into_uint()?)
    }

    pub fn into_bool(self) -> Result<bool, AbiError> {
        match self {
            Token::Bool(value) => Ok(value),
            other => Err(mismatch("bool", &other)),
        }
    }

    pub fn into_string(self) -> Result<String, AbiError> {
        match self {
            Token::String(value) => Ok(value),
            other => Err(mismatch("string", &other)),
        }
    }

    pub fn into_array(self) -> Result<Vec<Token>, AbiError> {
        match self {
            Token::Array(values) => Ok(values),
            other => Err(mismatch("array", &other)),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            Token::Address(address) => write!(f, "{:#x}", address),
            Token::Uint(value) => write!(f, "{}", value),
            Token::Bool(value) => write!(f, "{}", value),
            Token::String(value) => write!(f, "{:?}", value),
            Token::Bytes(value) => write!(f, "0x{}", hex::encode(value)),
            Token::Array(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
        }
    }
}

fn mismatch(expected: &'static str, found: &Token) -> AbiError {
    AbiError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

pub fn u256_to_u64(value: U256) -> Result<u64, AbiError> {
    if value > U256::from(u64::MAX) {
        return Err(AbiError::Overflow("u64"));
    }
    Ok(value.low_u64())
}

/// First four bytes of the keccak hash of a canonical function signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Topic of a non-anonymous event
pub fn event_topic(signature: &str) -> H256 {
    H256::from(keccak256(signature.as_bytes()))
}

pub fn encode_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

pub fn decode_hex(value: &str) -> Result<Vec<u8>, AbiError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).map_err(|e| AbiError::InvalidHex(e.to_string()))
}

// ========================================
// Encoding
// ========================================

fn uint_word(value: U256) -> [u8; WORD_SIZE] {
    let mut word = [0u8; WORD_SIZE];
    for (i, byte) in word.iter_mut().enumerate() {
        *byte = value.byte(WORD_SIZE - 1 - i);
    }
    word
}

fn encode_static(token: &Token) -> [u8; WORD_SIZE] {
    match token {
        Token::Address(address) => {
            let mut word = [0u8; WORD_SIZE];
            word[12..].copy_from_slice(address.as_bytes());
            word
        }
        Token::Uint(value) => uint_word(*value),
        Token::Bool(value) => uint_word(U256::from(*value as u8)),
        // Dynamic tokens never reach this path
        _ => [0u8; WORD_SIZE],
    }
}

fn encode_padded(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(WORD_SIZE + data.len().div_ceil(WORD_SIZE) * WORD_SIZE);
    out.extend_from_slice(&uint_word(U256::from(data.len())));
    out.extend_from_slice(data);
    let rem = data.len() % WORD_SIZE;
    if rem != 0 {
        out.resize(out.len() + WORD_SIZE - rem, 0);
    }
    out
}

fn encode_dynamic(token: &Token) -> Vec<u8> {
    match token {
        Token::String(value) => encode_padded(value.as_bytes()),
        Token::Bytes(value) => encode_padded(value),
        Token::Array(values) => {
            let mut out = uint_word(U256::from(values.len())).to_vec();
            out.extend(encode(values));
            out
        }
        _ => encode_static(token).to_vec(),
    }
}

/// Encode a list of values with the standard head/tail layout
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD_SIZE;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
            tail.extend(encode_dynamic(token));
        } else {
            head.extend_from_slice(&encode_static(token));
        }
    }

    head.extend(tail);
    head
}

// ========================================
// Decoding
// ========================================

fn slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], AbiError> {
    let end = offset.checked_add(len).ok_or(AbiError::Overflow("usize"))?;
    data.get(offset..end).ok_or(AbiError::UnexpectedEnd {
        offset,
        needed: len,
        available: data.len().saturating_sub(offset),
    })
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    slice(data, offset, WORD_SIZE)
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let value = U256::from_big_endian(read_word(data, offset)?);
    if value > U256::from(usize::MAX) {
        return Err(AbiError::Overflow("usize"));
    }
    Ok(value.low_u64() as usize)
}

fn decode_static(ty: &ParamType, data: &[u8], offset: usize) -> Result<Token, AbiError> {
    let word = read_word(data, offset)?;
    match ty {
        ParamType::Address => Ok(Token::Address(Address::from_slice(&word[12..]))),
        ParamType::Uint => Ok(Token::Uint(U256::from_big_endian(word))),
        ParamType::Bool => {
            if word[..31].iter().any(|b| *b != 0) || word[31] > 1 {
                return Err(AbiError::InvalidBool);
            }
            Ok(Token::Bool(word[31] == 1))
        }
        _ => Err(AbiError::TypeMismatch {
            expected: "static type",
            found: "dynamic type",
        }),
    }
}

fn decode_dynamic(ty: &ParamType, data: &[u8], offset: usize) -> Result<Token, AbiError> {
    let len = read_usize(data, offset)?;
    match ty {
        ParamType::String => {
            let bytes = slice(data, offset.saturating_add(WORD_SIZE), len)?;
            let value = String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)?;
            Ok(Token::String(value))
        }
        ParamType::Bytes => Ok(Token::Bytes(
            slice(data, offset.saturating_add(WORD_SIZE), len)?.to_vec(),
        )),
        ParamType::Array(inner) => {
            // Reject lengths that could not possibly be backed by the payload
            if len > data.len() / WORD_SIZE {
                return Err(AbiError::UnexpectedEnd {
                    offset,
                    needed: len * WORD_SIZE,
                    available: data.len().saturating_sub(offset),
                });
            }
            let types = vec![(**inner).clone(); len];
            let values = decode_at(&types, data, offset.saturating_add(WORD_SIZE))?;
            Ok(Token::Array(values))
        }
        _ => decode_static(ty, data, offset),
    }
}

fn decode_at(types: &[ParamType], data: &[u8], base: usize) -> Result<Vec<Token>, AbiError> {
    let mut tokens = Vec::with_capacity(types.len());
    for (i, ty) in types.iter().enumerate() {
        let head = base + i * WORD_SIZE;
        let token = if ty.is_dynamic() {
            let offset = read_usize(data, head)?;
            decode_dynamic(ty, data, base.saturating_add(offset))?
        } else {
            decode_static(ty, data, head)?
        };
        tokens.push(token);
    }
    Ok(tokens)
}

/// Decode `data` as a list of values of the given types
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    decode_at(types, data, 0)
}

/// A contract function invocation: canonical signature, arguments and the
/// types of the values it returns (empty for state-changing calls)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub signature: &'static str,
    pub args: Vec<Token>,
    pub returns: Vec<ParamType>,
}

impl ContractCall {
    pub fn new(signature: &'static str, args: Vec<Token>) -> Self {
        Self {
            signature,
            args,
            returns: Vec::new(),
        }
    }

    pub fn with_returns(mut self, returns: Vec<ParamType>) -> Self {
        self.returns = returns;
        self
    }

    /// Function name without the parameter list
    pub fn name(&self) -> &'static str {
        self.signature
            .split_once('(')
            .map(|(name, _)| name)
            .unwrap_or(self.signature)
    }

    pub fn selector(&self) -> [u8; 4] {
        selector(self.signature)
    }

    pub fn calldata(&self) -> Vec<u8> {
        let mut data = self.selector().to_vec();
        data.extend(encode(&self.args));
        data
    }
}

impl Display for ContractCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}(", self.name())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}
