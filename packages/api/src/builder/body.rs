//! Request body
//!
//! Setting a body moves the builder into `BodySet`, where the mutating verbs
//! become available.

use serde::Serialize;
use serde_json::Value;

use crate::builder::core::{ApiBuilder, BodyNotSet, BodySet};

impl ApiBuilder<BodyNotSet> {
    /// Serialize `body` as the JSON request body.
    ///
    /// A serialization failure is reported when the request executes.
    #[must_use]
    pub fn body<B: Serialize + ?Sized>(mut self, body: &B) -> ApiBuilder<BodySet> {
        match serde_json::to_value(body) {
            Ok(value) => self.options.body = Some(value),
            Err(e) => {
                self.error.get_or_insert_with(|| civix_client::error::builder(e));
            }
        }
        self.with_state(BodySet)
    }

    /// Use an already built JSON value as the body
    #[must_use]
    pub fn json(mut self, body: Value) -> ApiBuilder<BodySet> {
        self.options.body = Some(body);
        self.with_state(BodySet)
    }
}
