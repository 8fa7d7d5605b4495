pub mod transport_traits;
pub mod settings_traits;
pub mod source_traits;
pub mod clock;

pub use transport_traits::AccountTransport;
pub use settings_traits::SettingsStore;
pub use source_traits::EventSource;
pub use clock::{Clock, SystemClock};
