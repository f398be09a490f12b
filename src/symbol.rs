//! Terminal symbol ids and the reserved pseudo-symbols.

pub type Symbol = i32;

pub const INVALID: Symbol = 0;
pub const EOF: Symbol = -1;
/// Marks a nullable derivation inside single-symbol sets.
pub const EPSILON: Symbol = -2;
pub const WILDCARD: Symbol = -3;
pub const NOT: Symbol = -4;

/// Lowest reserved symbol, and therefore the bias of lookahead bit sets.
pub const MIN_RESERVED: Symbol = NOT;
/// Lowest symbol an ordinary terminal may carry.
pub const MIN_TYPE: Symbol = 1;

pub fn reserved_name(sym: Symbol) -> Option<&'static str> {
  match sym {
    INVALID => Some("<invalid>"),
    EOF => Some("<EOF>"),
    EPSILON => Some("<epsilon>"),
    WILDCARD => Some("<any>"),
    NOT => Some("<not>"),
    _ => None,
  }
}

pub fn is_reserved(sym: Symbol) -> bool {
  sym < MIN_TYPE
}
