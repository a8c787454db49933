//! Open an authenticated session: cached token first, password second.

use crate::config::Config;
use crate::credentials::TokenStore;
use crate::error::KeepError;
use crate::remote::NoteService;
use anyhow::Result;
use tracing::{debug, warn};

/// Authenticate `service` for the configured account.
///
/// A cached token is tried first. If the server rejects it, the password
/// login runs and the fresh token replaces the cached one. Any other
/// failure, or a rejected password, ends the run.
pub fn open_session<S, T>(config: &Config, store: &T, service: &mut S) -> Result<()>
where
    S: NoteService + ?Sized,
    T: TokenStore + ?Sized,
{
    let username = config.username();

    if let Some(token) = store.get(username)? {
        match service.resume(username, &token) {
            Ok(()) => {
                debug!("Resumed cached session for {}", username);
                return Ok(());
            }
            Err(e) if matches!(e.downcast_ref::<KeepError>(), Some(KeepError::Auth(_))) => {
                warn!("Cached token rejected ({}), logging in again", e);
            }
            Err(e) => return Err(e),
        }
    }

    let token = service.login(username, config.password())?;
    store.set(username, &token)?;
    Ok(())
}
