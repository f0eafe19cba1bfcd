use std::time::Duration;

use crate::cache::Cached;
use crate::datagen::{Charset, TimeDirection};
use crate::error::{ApiStepsError, Result};
use crate::types::Node;

use super::ApiContext;

impl ApiContext {
    fn save_generated(&mut self, key: &str, node: Node) {
        self.debugger.print(&format!("generated {} = {}", key, node.to_plain_string()));
        self.cache.save(key, Cached::Value(node));
    }

    pub fn generate_random_int(&mut self, min: i64, max: i64, key: &str) -> Result<i64> {
        let value = self.generator.int_in_range(min, max)?;
        self.save_generated(key, Node::Int(value));
        Ok(value)
    }

    pub fn generate_random_float(&mut self, min: f64, max: f64, key: &str) -> Result<f64> {
        let value = self.generator.float_in_range(min, max)?;
        self.save_generated(key, Node::Float(value));
        Ok(value)
    }

    pub fn generate_random_bool(&mut self, key: &str) -> bool {
        let value = self.generator.bool();
        self.save_generated(key, Node::Bool(value));
        value
    }

    pub fn generate_random_string(
        &mut self,
        charset: Charset,
        min_len: usize,
        max_len: usize,
        key: &str,
    ) -> Result<String> {
        let value = self.generator.string(charset, min_len, max_len)?;
        self.save_generated(key, Node::String(value.clone()));
        Ok(value)
    }

    pub fn generate_random_sentence(&mut self, min_words: usize, max_words: usize, key: &str) -> Result<String> {
        let value = self.generator.sentence(min_words, max_words)?;
        self.save_generated(key, Node::String(value.clone()));
        Ok(value)
    }

    /// Saves now shifted by `by` into the past or future, as RFC 3339.
    pub fn generate_shifted_time(&mut self, direction: TimeDirection, by: Duration, key: &str) -> Result<String> {
        let by = chrono::Duration::from_std(by)
            .map_err(|e| ApiStepsError::InvalidArgument(format!("time shift {:?} is too large: {}", by, e)))?;
        let value = self.generator.time_shifted(direction, by)?;
        self.save_generated(key, Node::String(value.clone()));
        Ok(value)
    }
}
