use tracing::{debug, info};

use super::browser::FormSession;
use super::error::ScrapeError;
use super::form::{POPUP, POPUP_CLOSE};

/// Closes the on-load overlay if the page shows one.
///
/// An absent overlay is not an error. An overlay without a close control is,
/// since it would intercept every following click.
pub async fn dismiss_popup<S: FormSession>(session: &S) -> Result<(), ScrapeError> {
    if !session.exists(&POPUP).await? {
        debug!("popup not found");
        return Ok(());
    }

    if !session.exists(&POPUP_CLOSE).await? {
        return Err(ScrapeError::ElementNotFound(POPUP_CLOSE.to_string()));
    }

    session.click(&POPUP_CLOSE).await?;
    info!("popup closed");
    Ok(())
}
