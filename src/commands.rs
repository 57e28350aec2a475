//! Outbound command encoding.
//!
//! Thin helpers producing the exact wire bytes the processor expects;
//! every command line is CRLF-terminated.

use crate::errors::GrxClientError;
use crate::scene::Scene;
use bytes::Bytes;

/// Protocol line terminator appended to every outbound command.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Encode the constant full-status request (`:G`).
#[must_use]
pub fn status_request() -> Bytes {
    Bytes::from_static(b":G\r\n")
}

/// Encode a scene-set command (`:A<symbol><unit>`).
///
/// The unit identifier is concatenated exactly as supplied; the processor
/// accepts single units and unit groups there, so range validation is the
/// caller's responsibility. Turning a unit off is `Scene::OFF`, a normal
/// scene command.
///
/// # Errors
///
/// Returns [`GrxClientError::InvalidScene`] if the scene has no command
/// representation (`Missing`, or a number above 16).
pub fn set_scene(scene: Scene, unit: &str) -> Result<Bytes, GrxClientError> {
    let symbol = scene.encode()?;
    Ok(Bytes::from(format!(":A{symbol}{unit}{LINE_TERMINATOR}")))
}

/// Encode a username line for the login handshake.
pub(crate) fn login_line(username: &str) -> Bytes {
    Bytes::from(format!("{username}{LINE_TERMINATOR}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_request_bytes() {
        assert_eq!(status_request().as_ref(), b":G\r\n");
    }

    #[test]
    fn test_set_scene_bytes() {
        let cmd = set_scene(Scene::Number(5), "3").unwrap();
        assert_eq!(cmd.as_ref(), b":A53\r\n");
    }

    #[test]
    fn test_set_scene_off_is_normal_scene() {
        let cmd = set_scene(Scene::OFF, "3").unwrap();
        assert_eq!(cmd.as_ref(), b":A03\r\n");
    }

    #[test]
    fn test_set_scene_high_symbols() {
        let cmd = set_scene(Scene::Number(16), "8").unwrap();
        assert_eq!(cmd.as_ref(), b":AG8\r\n");
    }

    #[test]
    fn test_set_scene_unit_passed_through() {
        // Unit strings are not validated; group addresses pass verbatim.
        let cmd = set_scene(Scene::Number(1), "16").unwrap();
        assert_eq!(cmd.as_ref(), b":A116\r\n");
    }

    #[test]
    fn test_set_scene_missing_fails() {
        assert!(matches!(
            set_scene(Scene::Missing, "3"),
            Err(GrxClientError::InvalidScene(_))
        ));
    }

    #[test]
    fn test_login_line() {
        assert_eq!(login_line("nwk").as_ref(), b"nwk\r\n");
    }
}
