// CM6 symbol alphabet.
//
// 64 printable characters, `+ - 0-9 A-Z a-z`, where a symbol's position is
// its 6-bit code. Both directions are compile-time tables; nothing is built
// lazily at runtime.

/// Number of symbols in the alphabet.
pub const ALPHABET_LEN: usize = 64;

/// Forward table: 6-bit code -> printable byte.
pub const ALPHABET: [u8; ALPHABET_LEN] =
    *b"+-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Marker stored in [`INVERSE`] for bytes outside the alphabet.
const NOT_A_SYMBOL: u8 = 0xFF;

/// Inverse table: byte -> 6-bit code, or `NOT_A_SYMBOL`.
const INVERSE: [u8; 256] = build_inverse();

const fn build_inverse() -> [u8; 256] {
    let mut table = [NOT_A_SYMBOL; 256];
    let mut code = 0;
    while code < ALPHABET_LEN {
        table[ALPHABET[code] as usize] = code as u8;
        code += 1;
    }
    table
}

/// Map a 6-bit code to its symbol. Only the low six bits of `code` are used.
#[inline]
pub fn symbol(code: u8) -> u8 {
    ALPHABET[(code & 0x3F) as usize]
}

/// Map a byte to its code, or `None` if the byte is not a CM6 symbol.
#[inline]
pub fn lookup(byte: u8) -> Option<u8> {
    match INVERSE[byte as usize] {
        NOT_A_SYMBOL => None,
        code => Some(code),
    }
}

/// Permissive lookup: bytes outside the alphabet map to code 0.
///
/// This is the behaviour legacy GSE readers rely on.
#[inline]
pub fn code(byte: u8) -> u8 {
    lookup(byte).unwrap_or(0)
}

/// True if `byte` belongs to the alphabet.
#[inline]
pub fn is_symbol(byte: u8) -> bool {
    INVERSE[byte as usize] != NOT_A_SYMBOL
}
