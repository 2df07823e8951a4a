//! Write paths. Each function commits to the store first and only then
//! reports the change through a [`ChangeNotifier`], so the product stream
//! sees exactly one notification per committed mutation.
//!
//! [`ChangeNotifier`]: crate::handlers::sse::ChangeNotifier

pub mod catalog;
pub mod orders;

pub use catalog::CatalogError;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use crate::handlers::sse::{ChangeNotifier, ProductsChanged};

    /// Records every notification instead of broadcasting.
    #[derive(Default)]
    pub struct RecordingNotifier {
        events: Mutex<Vec<ProductsChanged>>,
    }

    impl RecordingNotifier {
        pub fn events(&self) -> Vec<ProductsChanged> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ChangeNotifier for RecordingNotifier {
        fn products_changed(&self, event: ProductsChanged) {
            self.events.lock().unwrap().push(event);
        }
    }
}
