//! Generator parameter parsing.
//!
//! Parameters arrive as a comma-separated list of `key[=value]` tokens. The
//! only recognized key is `fasttable`; anything else fails generation.

use crate::error::GenError;

/// Parsed generator options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorParams {
    /// Emit fast-decode dispatch tables.
    pub fasttable: bool,
}

impl GeneratorParams {
    /// Parse a `key[=value],key[=value],...` parameter string.
    pub fn parse(parameter: &str) -> Result<Self, GenError> {
        let mut params = Self::default();
        for token in parameter.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let key = token.split_once('=').map_or(token, |(k, _)| k);
            match key {
                "fasttable" => params.fasttable = true,
                _ => return Err(GenError::UnknownParameter(key.to_owned())),
            }
        }
        Ok(params)
    }
}
