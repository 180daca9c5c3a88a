use std::sync::Arc;

use crate::config::EmailConfig;
use crate::notify::Notifier;
use crate::stores::RecordStore;

/// Shared state handed to every request.
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub notifier: Arc<dyn Notifier>,
    pub email: EmailConfig,
    pub trust_proxy_headers: bool,
    pub expose_error_details: bool,
}
