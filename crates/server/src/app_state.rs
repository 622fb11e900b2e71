use live_updates::SubscriberRegistry;
use storage::Storage;
use wizard::OrderWizard;

use crate::config::Settings;

pub(crate) type Wizard = OrderWizard<Storage, Storage, Storage>;

pub(crate) struct AppState {
    pub(crate) storage: Storage,
    pub(crate) wizard: Wizard,
    pub(crate) live: SubscriberRegistry,
    pub(crate) session_cookie: String,
}

impl AppState {
    pub(crate) fn new(storage: Storage, settings: &Settings) -> Self {
        let wizard = OrderWizard::new(storage.clone(), storage.clone(), storage.clone())
            .with_gating_policy(settings.gating_redirect);
        Self {
            storage,
            wizard,
            live: SubscriberRegistry::new(),
            session_cookie: settings.session_cookie.clone(),
        }
    }
}
