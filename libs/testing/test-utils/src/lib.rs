//! Shared test utilities for domain testing
//!
//! - `TestMongo`: MongoDB container with automatic cleanup (feature: "mongo")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Usage
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestMongo};
//!
//! #[tokio::test]
//! #[ignore] // Requires Docker
//! async fn my_mongo_test() {
//!     let mongo = TestMongo::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_mongo_test");
//!
//!     let db = mongo.database(&builder.database_name());
//!     let author = builder.email("author");
//! }
//! ```

#[cfg(feature = "mongo")]
mod mongo;

#[cfg(feature = "mongo")]
pub use mongo::TestMongo;

/// Builder for test data with deterministic randomization
///
/// The same test name always yields the same emails and names, and different
/// tests get different ones, so tests sharing a container don't collide.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_toggle_join");
    /// assert!(builder.email("ana").ends_with("@example.com"));
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// A user email unique to this builder, e.g. `ana-1234@example.com`
    pub fn email(&self, user: &str) -> String {
        format!("{}-{}@example.com", user, self.seed)
    }

    /// A name unique to this builder, e.g. `test-event-1234-main`
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// A database name unique to this builder
    pub fn database_name(&self) -> String {
        format!("test-{}", self.seed)
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert two string lists hold the same items, ignoring order
    pub fn assert_same_items(actual: &[String], expected: &[&str], context: &str) {
        let mut actual = actual.to_vec();
        let mut expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
        actual.sort();
        expected.sort();
        assert_eq!(actual, expected, "{}: items differ", context);
    }
}
