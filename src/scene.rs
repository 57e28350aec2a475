//! Scene values and their single-character wire symbols.
//!
//! The GRX processor addresses lighting presets as scenes 0-16, where 0
//! conventionally means "off". On the wire a scene is one ASCII character:
//! `0`-`9` for scenes 0-9, `A`-`G` for 10-16, and `M` marking a status
//! slot with no control unit present at that address.

use crate::errors::GrxClientError;

/// A lighting scene value as reported or commanded over the wire.
///
/// `Missing` only ever appears in status snapshots; it has no command
/// representation and can never be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scene {
    /// Numbered preset 0-16 (0 = off).
    Number(u8),
    /// No control unit present at this status address.
    Missing,
}

impl Scene {
    /// The "off" scene. Off is a normal scene command, not a special case.
    pub const OFF: Scene = Scene::Number(0);

    /// Encode this scene as its wire symbol.
    ///
    /// # Errors
    ///
    /// Returns [`GrxClientError::InvalidScene`] for `Missing` (which has
    /// no command representation) and for numbers above 16.
    pub fn encode(self) -> Result<char, GrxClientError> {
        match self {
            Scene::Number(n @ 0..=9) => Ok((b'0' + n) as char),
            Scene::Number(n @ 10..=16) => Ok((b'A' + (n - 10)) as char),
            Scene::Number(n) => Err(GrxClientError::InvalidScene(format!(
                "scene {n} out of range 0-16"
            ))),
            Scene::Missing => Err(GrxClientError::InvalidScene(
                "Missing has no command representation".to_string(),
            )),
        }
    }

    /// Decode a wire symbol into a scene.
    ///
    /// # Errors
    ///
    /// Returns [`GrxClientError::InvalidSymbol`] for any character outside
    /// the symbol table. Callers treat this as "skip the token", never as
    /// a fatal condition.
    pub fn decode(symbol: char) -> Result<Scene, GrxClientError> {
        match symbol {
            '0'..='9' => Ok(Scene::Number(symbol as u8 - b'0')),
            'A'..='G' => Ok(Scene::Number(symbol as u8 - b'A' + 10)),
            'M' => Ok(Scene::Missing),
            other => Err(GrxClientError::InvalidSymbol(other)),
        }
    }

    /// The numeric scene value, or `None` for `Missing`.
    #[must_use]
    pub fn number(self) -> Option<u8> {
        match self {
            Scene::Number(n) => Some(n),
            Scene::Missing => None,
        }
    }
}

impl std::fmt::Display for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scene::Number(n) => write!(f, "{n}"),
            Scene::Missing => write!(f, "M"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_symbol_table_round_trip() {
        // {0:'0',...,9:'9',10:'A',...,16:'G'}
        let table: Vec<(u8, char)> = (0u8..=9)
            .map(|n| (n, (b'0' + n) as char))
            .chain((10u8..=16).map(|n| (n, (b'A' + n - 10) as char)))
            .collect();

        for (number, symbol) in table {
            let scene = Scene::Number(number);
            assert_eq!(scene.encode().unwrap(), symbol);
            assert_eq!(Scene::decode(symbol).unwrap(), scene);
        }
        assert_eq!(Scene::decode('M').unwrap(), Scene::Missing);
    }

    #[test]
    fn test_encode_missing_fails() {
        assert!(matches!(
            Scene::Missing.encode(),
            Err(GrxClientError::InvalidScene(_))
        ));
    }

    #[test]
    fn test_encode_out_of_range_fails() {
        assert!(matches!(
            Scene::Number(17).encode(),
            Err(GrxClientError::InvalidScene(_))
        ));
    }

    #[test]
    fn test_decode_unknown_symbol_fails() {
        for bad in ['H', 'X', 'g', 'm', ' ', ':'] {
            assert!(matches!(
                Scene::decode(bad),
                Err(GrxClientError::InvalidSymbol(c)) if c == bad
            ));
        }
    }

    #[test]
    fn test_off_is_scene_zero() {
        assert_eq!(Scene::OFF.encode().unwrap(), '0');
    }
}
