//! # Identity Module
//!
//! The federated-identity half of the pipeline: building the OAuth redirect,
//! catching the callback, and decoding the identity token it carries.
//!
//! 1. **Exchange** — the redirect/callback state machine. Pure: URL in,
//!    URL out, no network.
//! 2. **Token** — JWT claim decoding. Display and prover inputs only; the
//!    prover is the one that validates the token.

pub mod exchange;
pub mod token;

pub use exchange::{scrub_fragment, CallbackOutcome, ExchangeError, ExchangeState, IdentityExchange};
pub use token::{Audience, DisplayClaims, IdentityClaims, IdentityToken, TokenError};
